//! Indented output blocks for listings, prompts, and summaries.
//!
//! A [`Report`] is a titled block: the title line carries short status fragments separated by
//! dim dots, and everything below it indents two spaces per nesting level. Key/value rows
//! align their keys within a block; free text and long values wrap to the terminal width.

use std::fmt::{self, Display, Write};
use yansi::Paint;

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct Report {
    title: String,
    status: Vec<String>,
    items: Vec<Item>,
}

#[derive(Debug)]
enum Item {
    Text(String),
    Row(String, String),
    Child(Report),
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Append a short fragment to the title line, e.g. a verdict or a count.
    pub fn status(mut self, fragment: impl Into<String>) -> Self {
        self.status.push(fragment.into());
        self
    }

    /// Add a paragraph of free text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.items.push(Item::Text(text.into()));
        self
    }

    /// Add one key/value row. Keys of all rows in the block are aligned.
    pub fn row(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.push(Item::Row(key.into(), value.into()));
        self
    }

    /// Add key/value rows in bulk.
    pub fn rows(mut self, rows: impl IntoIterator<Item = (String, String)>) -> Self {
        for (key, value) in rows {
            self.items.push(Item::Row(key, value));
        }
        self
    }

    /// Nest another report one indent level deeper.
    pub fn child(mut self, child: Report) -> Self {
        self.items.push(Item::Child(child));
        self
    }

    fn render(&self, out: &mut String, depth: usize, width: usize) {
        let lead = INDENT.repeat(depth);

        write!(out, "{lead}{}", self.title.bold()).ok();
        for fragment in &self.status {
            write!(out, " {} {}", "·".dim(), fragment).ok();
        }
        out.push('\n');

        let key_width = self
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Row(key, _) => Some(key.len()),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        // Deep nesting must not wrap into unusably narrow columns.
        let body_width = width.saturating_sub(lead.len() + INDENT.len()).max(24);

        for item in &self.items {
            match item {
                Item::Text(text) => {
                    for line in textwrap::wrap(text, body_width) {
                        writeln!(out, "{lead}{INDENT}{line}").ok();
                    }
                }

                Item::Row(key, value) => {
                    // Pad before painting; the escape codes would otherwise count into the
                    // column width.
                    let padded = format!("{key:<key_width$}");
                    let wrapped = textwrap::wrap(value, body_width.saturating_sub(key_width + 1).max(16));

                    if wrapped.is_empty() {
                        writeln!(out, "{lead}{INDENT}{}", padded.dim()).ok();
                    }

                    for (index, line) in wrapped.iter().enumerate() {
                        if index == 0 {
                            writeln!(out, "{lead}{INDENT}{} {line}", padded.dim()).ok();
                        } else {
                            writeln!(out, "{lead}{INDENT}{:key_width$} {line}", "").ok();
                        }
                    }
                }

                Item::Child(child) => {
                    child.render(out, depth + 1, width);
                }
            }
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, 0, textwrap::termwidth().clamp(48, 120));
        f.write_str(out.trim_end_matches('\n'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_wraps_into_indented_lines() {
        let report = Report::new("block").text("word ".repeat(60));
        let rendered = report.to_string();

        let body_lines: Vec<&str> = rendered.lines().skip(1).collect();
        assert!(body_lines.len() > 1);
        for line in body_lines {
            assert!(line.starts_with(INDENT));
        }
    }

    #[test]
    fn children_indent_one_level_deeper() {
        let report = Report::new("parent")
            .text("parent body")
            .child(Report::new("nested").text("nested body"));
        let rendered = report.to_string();

        assert!(rendered.contains("\n  parent body\n"));
        assert!(rendered.contains("\n    nested body"));
    }

    #[test]
    fn empty_row_values_still_print_the_key() {
        let report = Report::new("block").row("key", "");
        assert_eq!(report.to_string().lines().count(), 2);
    }
}
