//! Simple String
//!
//! This demo walks the canonical two-step grammar: select a field from a
//! list of predefined options, then provide a string value.
//!
//! Key concepts:
//! - Declaring a template graph with the fluent builder
//! - Narrowing suggestions with prefix filtering
//! - Validation-gated transitions and terminal completion
//!
//! Run with: cargo run --example simple_string

use tokenstate::builder::TemplateBuilder;
use tokenstate::core::TokenValue;
use tokenstate::machine::{TokenStateMachine, TransitionOutcome};

fn main() {
    println!("=== Simple String Demo ===\n");

    let root = TemplateBuilder::option_entry(
        "Choose a field",
        vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
    )
    .child(TemplateBuilder::value_entry("Enter a value"))
    .build()
    .unwrap();

    let mut machine = TokenStateMachine::new(root);
    println!("Prompt: {}", machine.current_name());

    // Typing "F" narrows the suggestion list.
    let suggestions: Vec<&str> = machine
        .state_mut()
        .refresh_options("F")
        .iter()
        .map(|v| v.key.as_str())
        .collect();
    println!("Typed 'F', suggestions: {suggestions:?}");

    // Select the suggestion and advance.
    machine
        .state_mut()
        .set_unboxed_value(Some("First Name".to_string()));
    let outcome = machine.transition().unwrap();
    println!("Selected 'First Name' -> {outcome:?}");
    println!("Prompt: {}", machine.current_name());

    // A transition without a valid value is rejected, position unchanged.
    machine.state_mut().set_unboxed_value(Some(String::new()));
    match machine.transition() {
        Err(err) => println!("Empty value rejected: {err}"),
        Ok(_) => unreachable!("empty value must not advance"),
    }

    // Enter a value; the terminal transition finishes the token.
    machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
    let outcome = machine.transition().unwrap();
    assert_eq!(outcome, TransitionOutcome::Completed);

    let binding = machine.committed();
    println!("\nCompleted token:");
    for (index, step) in binding.steps().iter().enumerate() {
        println!("  step {index}: {}", step.last().unwrap().key);
    }

    println!("\n=== Demo Complete ===");
}
