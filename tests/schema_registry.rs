//! Schema registry behavior through the port trait.

use std::io::Write;
use std::sync::Arc;

use proposal_engine::adapters::schema::{load_schema_file, InMemorySchemaRegistry};
use proposal_engine::domain::schema::{
    Rule, RuleType, Schema, SchemaViolation, Section, DEFAULT_SCHEMA_ID,
};
use proposal_engine::ports::{SchemaRegistry, SchemaRegistryError};

fn registry() -> Arc<dyn SchemaRegistry> {
    Arc::new(InMemorySchemaRegistry::new())
}

#[tokio::test]
async fn default_schema_is_active_and_lists_its_shape() {
    let registry = InMemorySchemaRegistry::with_default_schema().await.unwrap();

    let active = registry.get_active().await.unwrap();
    let summaries = registry.list().await;

    assert_eq!(active.id, DEFAULT_SCHEMA_ID);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].sections, 4);
    assert_eq!(summaries[0].global_rules, 2);
    assert!(summaries[0].is_active);
}

#[tokio::test]
async fn invalid_schema_reports_every_problem() {
    let registry = registry();
    let schema = Schema::new("broken", "Broken", "0.1")
        .with_section(Section::new("a", "intro", "Intro", 1).with_length_bounds(Some(500), Some(100)))
        .with_section(
            Section::new("b", "body", "Body", 2)
                .with_rule(Rule::new("r1", "Pattern", RuleType::Pattern).with_parameter("pattern", "(unclosed"))
                .with_rule(Rule::new("r1", "Length", RuleType::Length)),
        );

    let err = registry.register(schema).await.unwrap_err();

    let SchemaRegistryError::Invalid(errors) = err else {
        panic!("expected validation errors");
    };
    let violations = errors.violations();
    assert!(violations
        .iter()
        .any(|v| matches!(v, SchemaViolation::InvertedLengthBounds { .. })));
    assert!(violations.iter().any(|v| matches!(v, SchemaViolation::DuplicateRuleId(id) if id == "r1")));
    assert!(violations.iter().any(|v| matches!(v, SchemaViolation::InvalidPattern { .. })));
    assert!(violations.iter().any(|v| matches!(v, SchemaViolation::RuleParameters(_))));
    assert!(registry.get("broken").await.is_none());
}

#[tokio::test]
async fn schema_file_round_trips_through_registry() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    let json = serde_json::to_string(&Schema::default_proposal()).unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let registry = registry();
    let schema = load_schema_file(file.path()).unwrap();
    let stored = registry.register(schema).await.unwrap();
    registry.set_active(&stored.id).await.unwrap();

    let rules = registry.rules_for(DEFAULT_SCHEMA_ID, "pricing").await.unwrap();
    let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "global-no-mock-data",
            "global-professional-tone",
            "pricing-format",
            "pricing-disclaimer"
        ]
    );
}

#[tokio::test]
async fn concurrent_writers_and_readers_stay_consistent() {
    let registry: Arc<InMemorySchemaRegistry> = Arc::new(InMemorySchemaRegistry::new());

    let writers: Vec<_> = (0..10)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let schema = Schema::new(format!("schema-{i}"), "Generated", "1.0")
                    .with_section(Section::new("s", "only", "Only", 1));
                registry.register(schema).await.unwrap();
                registry.set_active(&format!("schema-{i}")).await.unwrap();
            })
        })
        .collect();
    let readers: Vec<_> = (0..10)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                if let Some(active) = registry.get_active().await {
                    assert!(active.id.starts_with("schema-"));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }

    let summaries = registry.list().await;
    assert_eq!(summaries.len(), 10);
    assert_eq!(summaries.iter().filter(|s| s.is_active).count(), 1);
}
