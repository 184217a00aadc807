//! Post-processing of generated medical records
//!
//! Models occasionally answer in HTML despite being asked for Markdown.
//! The browser renders Markdown, so the common inline tags are rewritten.

const MARKUP_REPLACEMENTS: [(&str, &str); 7] = [
    ("<br>", "\n"),
    ("<b>", "**"),
    ("</b>", "**"),
    ("<strong>", "**"),
    ("</strong>", "**"),
    ("<em>", "*"),
    ("</em>", "*"),
];

/// Rewrite HTML emphasis and line breaks as Markdown
pub fn html_to_markdown(record: &str) -> String {
    MARKUP_REPLACEMENTS
        .iter()
        .fold(record.to_string(), |text, (from, to)| text.replace(from, to))
}
