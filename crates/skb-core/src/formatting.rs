//! Slack text decoration helpers.

/// Wrap `text` in a fixed-width code block.
pub fn format_code_block(text: &str) -> String {
    format!("```\n{text}\n```")
}
