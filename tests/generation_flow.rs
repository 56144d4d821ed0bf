//! End-to-end generation through the public API.
//!
//! Wires a schema registry, the gateway over mock providers and the
//! generation handler the same way the binary does, then checks the
//! serialized result that downstream consumers depend on.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use proposal_engine::adapters::ai::{LlmGateway, MockAIProvider, MockError, RetryPolicy};
use proposal_engine::adapters::schema::{parse_schema, InMemorySchemaRegistry};
use proposal_engine::application::{
    GenerateProposalCommand, GenerateProposalError, GenerateProposalHandler,
};
use proposal_engine::ports::{ProviderId, SchemaRegistry};

const SCHEMA: &str = r###"
id: website-redesign
name: Website Redesign Proposal
version: "1.2"
description: Short proposal for agency website work
sections:
  - id: sec-goals
    name: goals
    display_name: Project Goals
    order: 1
    rules:
      - id: goals-list
        name: Goals As List
        type: format
        parameters: { format: list }
      - id: goals-signoff
        name: Goals Sign-off
        type: transformation
        parameters: { type: add_prefix, prefix: "## Goals" }
  - id: sec-budget
    name: budget
    display_name: Budget
    order: 2
    output_format: structured
    rules:
      - id: budget-itemized
        name: Itemized Budget
        type: format
        parameters: { format: itemized }
      - id: budget-currency-word
        name: Currency Named
        type: pattern
        enforcement: warning
        parameters: { pattern: "\\bUSD\\b" }
global_rules:
  - id: no-placeholders
    name: No Placeholders
    type: validation
    parameters: { check_for: ["lorem ipsum", "TBD"] }
"###;

const NOTES: &str = "Bakery wants a faster site, online ordering and a blog. Budget around 10k.";

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_secs(1)).with_backoff_unit(Duration::from_millis(1))
}

async fn registry() -> Arc<InMemorySchemaRegistry> {
    let registry = Arc::new(InMemorySchemaRegistry::new());
    let schema = parse_schema(SCHEMA, "yaml").unwrap();
    registry.register(schema).await.unwrap();
    registry
}

fn command() -> GenerateProposalCommand {
    GenerateProposalCommand {
        survey_notes: NOTES.to_string(),
        schema_id: "website-redesign".to_string(),
        guidance: Some("Write for a small business owner.".to_string()),
    }
}

#[tokio::test]
async fn generates_report_with_wire_shape() {
    let mock = MockAIProvider::new()
        .with_response("- Faster pages\n- Online ordering\n- Weekly blog")
        .with_response("Design: $3,000\nBuild: $6,500");
    let gateway = Arc::new(LlmGateway::new(Arc::new(mock), fast_policy()));
    let handler = GenerateProposalHandler::new(registry().await, Arc::clone(&gateway));

    let result = handler.handle(command(), &CancellationToken::new()).await.unwrap();

    // Budget misses the advisory USD pattern at warning level, which does not fail the run.
    assert!(result.all_rules_passed);
    assert_eq!(result.total_rules_enforced, 3 + 3);
    assert_eq!(result.total_tokens, 60);
    assert_eq!(gateway.usage().total_tokens_used, 60);

    let json: Value = serde_json::to_value(&result).unwrap();
    let goals = &json["sections"][0];
    assert_eq!(goals["section_name"], "goals");
    assert_eq!(goals["order"], 1);
    assert_eq!(
        goals["content"],
        "## Goals\n- Faster pages\n- Online ordering\n- Weekly blog"
    );
    assert_eq!(goals["rule_enforcement"]["passed"], true);

    let budget = &json["sections"][1]["rule_enforcement"];
    assert_eq!(budget["passed"], true);
    assert_eq!(budget["violations"].as_array().unwrap().len(), 1);
    assert_eq!(budget["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(budget["violations"][0]["rule_id"], "budget-currency-word");
    assert_eq!(budget["violations"][0]["severity"], "warning");

    for key in ["sections", "total_rules_enforced", "total_tokens", "total_cost", "all_rules_passed"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn strict_failure_marks_run_as_failed_but_returns_everything() {
    let mock = MockAIProvider::new()
        .with_response("Faster pages, online ordering and a blog.")
        .with_response("Design: $3,000 USD, TBD for hosting");
    let gateway = Arc::new(LlmGateway::new(Arc::new(mock), fast_policy()));
    let handler = GenerateProposalHandler::new(registry().await, gateway);

    let result = handler.handle(command(), &CancellationToken::new()).await.unwrap();

    assert!(!result.all_rules_passed);
    assert_eq!(result.sections.len(), 2);
    assert!(!result.sections[0].passed());
    assert!(!result.sections[1].passed());

    let budget = result.sections[1].rule_enforcement.violations();
    assert_eq!(budget.len(), 1);
    assert_eq!(budget[0].rule_id, "no-placeholders");
}

#[tokio::test]
async fn fallback_chain_recovers_and_primary_stays_configured() {
    let primary = MockAIProvider::new()
        .with_provider(ProviderId::Groq, "llama-3.3-70b-versatile")
        .with_persistent_error(MockError::RateLimited { retry_after_secs: 0 });
    let backup = MockAIProvider::new()
        .with_response("- Faster pages")
        .with_response("Build: $6,500 USD");
    let gateway = Arc::new(
        LlmGateway::new(Arc::new(primary.clone()), fast_policy())
            .with_fallback_provider(Arc::new(backup.clone())),
    );
    let handler = GenerateProposalHandler::new(registry().await, Arc::clone(&gateway))
        .with_fallback_providers(vec![ProviderId::OpenAI]);

    let result = handler.handle(command(), &CancellationToken::new()).await.unwrap();

    assert!(result.all_rules_passed);
    assert_eq!(primary.call_count(), 4);
    assert_eq!(backup.call_count(), 2);
    assert_eq!(gateway.primary(), ProviderId::Groq);
    assert_eq!(gateway.usage_stats().provider, ProviderId::Groq);
}

#[tokio::test]
async fn total_provider_failure_returns_no_partial_result() {
    let primary = MockAIProvider::new()
        .with_provider(ProviderId::Groq, "llama")
        .with_response("- Faster pages")
        .with_persistent_error(MockError::Unavailable {
            message: "maintenance".to_string(),
        });
    let backup = MockAIProvider::new().with_persistent_error(MockError::Network {
        message: "reset".to_string(),
    });
    let gateway = Arc::new(
        LlmGateway::new(Arc::new(primary), fast_policy())
            .with_fallback_provider(Arc::new(backup)),
    );
    let handler = GenerateProposalHandler::new(registry().await, gateway)
        .with_fallback_providers(vec![ProviderId::OpenAI]);

    let err = handler.handle(command(), &CancellationToken::new()).await.unwrap_err();

    match err {
        GenerateProposalError::Gateway(gateway_err) => {
            assert!(gateway_err.to_string().contains("all providers failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn replacing_schema_mid_flight_does_not_affect_running_generation() {
    let registry = registry().await;
    let mock = MockAIProvider::new()
        .with_response("- Faster pages")
        .with_response("Build: $6,500 USD")
        .with_delay(Duration::from_millis(30));
    let gateway = Arc::new(LlmGateway::new(Arc::new(mock), fast_policy()));
    let handler = GenerateProposalHandler::new(registry.clone(), gateway);

    let running = tokio::spawn(async move {
        handler.handle(command(), &CancellationToken::new()).await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let mut replacement = parse_schema(SCHEMA, "yaml").unwrap();
    replacement.sections.truncate(1);
    replacement.version = "2.0".to_string();
    registry.register(replacement).await.unwrap();

    let result = running.await.unwrap().unwrap();
    assert_eq!(result.sections.len(), 2);
    assert_eq!(registry.get("website-redesign").await.unwrap().version, "2.0");
}
