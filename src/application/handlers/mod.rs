//! Application handlers.
//!
//! Command handlers that orchestrate domain operations over the ports.

pub mod proposal;

pub use proposal::{GenerateProposalCommand, GenerateProposalError, GenerateProposalHandler};
