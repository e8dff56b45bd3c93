//! Macros for ergonomic grammar construction.

/// Chain template builders into a linear grammar.
///
/// Each builder becomes the sole child of the one before it; the result is
/// the root builder, ready for further configuration or `build()`.
///
/// # Example
///
/// ```
/// use tokenstate::builder::TemplateBuilder;
/// use tokenstate::core::TokenValue;
/// use tokenstate::template_chain;
///
/// let root = template_chain![
///     TemplateBuilder::option_entry("Field", vec![TokenValue::new("Age")]),
///     TemplateBuilder::numeric_entry(),
/// ]
/// .build()
/// .unwrap();
///
/// assert_eq!(root.children().len(), 1);
/// ```
#[macro_export]
macro_rules! template_chain {
    ($last:expr $(,)?) => { $last };
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $first.child($crate::template_chain!($($rest),+))
    };
}
