//! Proposal Engine CLI
//!
//! Generates proposal sections from survey notes and works with schema files.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proposal_engine::adapters::ai::LlmGateway;
use proposal_engine::adapters::schema::{load_schema_file, InMemorySchemaRegistry};
use proposal_engine::application::{GenerateProposalCommand, GenerateProposalHandler};
use proposal_engine::config::{AppConfig, LogFormat, LoggingConfig};
use proposal_engine::domain::prompt::PromptBuilder;
use proposal_engine::domain::schema::Schema;
use proposal_engine::ports::SchemaRegistry;

#[derive(Parser)]
#[command(name = "proposal-engine")]
#[command(about = "Schema-driven proposal generation from survey notes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a proposal and print it as JSON
    Generate {
        /// Survey notes file, or `-` for stdin
        #[arg(short, long)]
        notes: String,

        /// Schema id to generate against (defaults to the active schema)
        #[arg(short, long)]
        schema: Option<String>,

        /// Schema file (JSON/YAML) to register and activate first
        #[arg(long)]
        schema_file: Option<PathBuf>,

        /// Extra guidance passed to every section prompt
        #[arg(short, long)]
        guidance: Option<String>,
    },

    /// Schema utilities
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Validate a schema file and print every problem found
    Validate {
        /// Path to schema file (JSON/YAML)
        file: PathBuf,
    },

    /// Print the built-in default schema as JSON
    Default,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Generate {
            notes,
            schema,
            schema_file,
            guidance,
        } => generate(config, notes, schema, schema_file, guidance).await,
        Commands::Schema {
            command: SchemaCommands::Validate { file },
        } => validate_schema(file),
        Commands::Schema {
            command: SchemaCommands::Default,
        } => {
            println!("{}", serde_json::to_string_pretty(&Schema::default_proposal())?);
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn generate(
    config: AppConfig,
    notes: String,
    schema_id: Option<String>,
    schema_file: Option<PathBuf>,
    guidance: Option<String>,
) -> anyhow::Result<()> {
    config.validate()?;

    let registry = Arc::new(InMemorySchemaRegistry::with_default_schema().await?);
    let schema_file = schema_file.or_else(|| config.generation.schema_file.clone().map(PathBuf::from));
    if let Some(path) = schema_file {
        let schema = load_schema_file(&path)?;
        let schema = registry.register(schema).await?;
        registry.set_active(&schema.id).await?;
    }

    let gateway = Arc::new(LlmGateway::from_config(&config.ai)?);
    let handler = GenerateProposalHandler::new(registry, Arc::clone(&gateway))
        .with_fallback_providers(config.ai.fallback_providers.clone())
        .with_prompt_builder(PromptBuilder::new().with_compression(config.generation.compress_prompts));

    let survey_notes = read_notes(&notes).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling generation");
            on_interrupt.cancel();
        }
    });

    let result = match schema_id {
        Some(schema_id) => {
            let cmd = GenerateProposalCommand {
                survey_notes,
                schema_id,
                guidance,
            };
            handler.handle(cmd, &cancel).await?
        }
        None => {
            handler
                .handle_active(&survey_notes, guidance.as_deref(), &cancel)
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    let stats = gateway.usage_stats();
    info!(
        provider = %stats.provider,
        model = %stats.model,
        total_tokens_used = stats.total_tokens_used,
        total_cost = stats.total_cost,
        "Usage statistics"
    );
    Ok(())
}

async fn read_notes(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut notes = String::new();
        tokio::io::stdin().read_to_string(&mut notes).await?;
        return Ok(notes);
    }
    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("failed to read survey notes from {source}"))
}

fn validate_schema(file: PathBuf) -> anyhow::Result<()> {
    let schema = load_schema_file(&file)?;

    match schema.validate() {
        Ok(()) => {
            println!(
                "Schema {} v{} is valid ({} sections, {} global rules)",
                schema.id,
                schema.version,
                schema.sections.len(),
                schema.global_rules.len()
            );
            Ok(())
        }
        Err(errors) => {
            for violation in errors.violations() {
                eprintln!("- {violation}");
            }
            bail!("{} has {} problem(s)", file.display(), errors.len())
        }
    }
}
