//! Proposal command handlers.

mod generate_proposal;

pub use generate_proposal::{
    GenerateProposalCommand, GenerateProposalError, GenerateProposalHandler,
};
