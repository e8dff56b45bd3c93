//! Multivalue Tags
//!
//! This demo accumulates several values at one grammar node before the
//! grammar advances past it: the "any of these tags" shape.
//!
//! Key concepts:
//! - Archiving committed values without moving the position
//! - Unarchiving (LIFO) and removal by index
//! - Rewind discarding the abandoned step
//!
//! Run with: cargo run --example multivalue_tags

use tokenstate::builder::TemplateBuilder;
use tokenstate::core::TokenValue;
use tokenstate::machine::TokenStateMachine;
use tokenstate::template_chain;

fn main() {
    println!("=== Multivalue Tags Demo ===\n");

    let root = template_chain![
        TemplateBuilder::option_entry(
            "Tag",
            vec![
                TokenValue::new("red"),
                TokenValue::new("green"),
                TokenValue::new("blue"),
            ],
        )
        .multivalue(true),
        TemplateBuilder::value_entry("Label"),
    ]
    .build()
    .unwrap();

    let mut machine = TokenStateMachine::new(root);

    for tag in ["red", "green", "blue"] {
        machine.state_mut().set_unboxed_value(Some(tag.to_string()));
        machine.archive().unwrap();
        println!(
            "archived '{tag}', archive now holds {}",
            machine.state().archived_values().len()
        );
    }

    // Archiving never advanced the grammar.
    assert_eq!(machine.depth(), 0);

    // Take the most recent one back out for editing.
    machine.unarchive().unwrap();
    println!(
        "unarchived -> editable value is {:?}",
        machine.state().value().map(|v| v.key.as_str())
    );

    // Drop the oldest archived entry; order of the rest is preserved.
    machine.remove_archived_value(0).unwrap();
    let remaining: Vec<&str> = machine
        .state()
        .archived_values()
        .iter()
        .map(|v| v.key.as_str())
        .collect();
    println!("removed index 0, archive now: {remaining:?}");

    // Advance past the tag node and finish the token.
    machine.transition().unwrap();
    machine
        .state_mut()
        .set_unboxed_value(Some("my-label".to_string()));
    machine.transition().unwrap();

    println!("\nCompleted token: {:?}", machine.committed());
    println!("\n=== Demo Complete ===");
}
