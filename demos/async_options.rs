//! Async Options
//!
//! This demo resolves option candidates through an asynchronous source and
//! pre-fills machines from externally supplied values with `bind_values`.
//!
//! Key concepts:
//! - Dynamic candidate sources (the engine's only suspension point)
//! - Silent pre-population of suggestion machines
//! - Snapshot capture and restore
//!
//! Run with: cargo run --example async_options

use tokenstate::builder::TemplateBuilder;
use tokenstate::core::{OptionFuture, TokenBinding, TokenValue};
use tokenstate::machine::TokenStateMachine;
use tokenstate::snapshot::Snapshot;

fn fetch_cities(prefix: String) -> OptionFuture {
    Box::pin(async move {
        // stands in for a server round trip
        ["Berlin", "Bergen", "Boston", "Oslo", "Porto"]
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&prefix.to_lowercase()))
            .map(|c| TokenValue::new(*c))
            .collect()
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Async Options Demo ===\n");

    let root = TemplateBuilder::option_entry_async("City", fetch_cities)
        .child(TemplateBuilder::numeric_entry().name("Population at least"))
        .build()
        .unwrap();

    // Interactive path: fetch candidates for a prefix, pick one, advance.
    let mut machine = TokenStateMachine::new(root.clone());
    let matches: Vec<&str> = machine
        .state_mut()
        .fetch_options("be")
        .await
        .iter()
        .map(|v| v.key.as_str())
        .collect();
    println!("Typed 'be', fetched suggestions: {matches:?}");

    machine
        .state_mut()
        .set_unboxed_value(Some("Bergen".to_string()));
    machine.transition().unwrap();
    machine
        .state_mut()
        .set_unboxed_value(Some("250000".to_string()));
    machine.transition().unwrap();
    println!("Interactive token complete: {:?}", machine.committed());

    // Suggestion path: each suggestion is its own silently bound machine.
    let suggestion = TokenBinding::new()
        .single(TokenValue::new("Oslo"))
        .single(TokenValue::new("500000"));
    let mut suggested = TokenStateMachine::new(root.clone());
    suggested.bind_values(&suggestion, false).await.unwrap();
    println!("Suggestion realized: {:?}", suggested.committed());

    // Snapshot round trip.
    let snapshot = Snapshot::capture(&machine);
    let json = snapshot.to_json().unwrap();
    println!("\nSnapshot: {json}");
    let restored = Snapshot::from_json(&json).unwrap().restore(root).await.unwrap();
    assert!(restored.is_complete());
    println!("Restored machine is complete");

    println!("\n=== Demo Complete ===");
}
