//! Terminal display helpers for rendering result lists.
//!
//! The search core never truncates titles; that is left to whoever renders
//! the results. These helpers are what the CLI uses.

use comfy_table::{Attribute, Cell, Table};
use unicode_width::UnicodeWidthChar;

use crate::models::SearchResult;

/// Display width of a title column (captions are cut to this)
pub const TITLE_WIDTH: usize = 50;

/// Truncate text to fit within the specified width using unicode-aware truncation.
///
/// Returns a string that fits within `max_width` columns, appending an
/// ellipsis if truncation occurred.
///
/// # Examples
///
/// ```
/// use image_finder::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let mut current_width = 0;
    let mut end_idx = 0;

    for (i, (_c, w)) in char_widths.iter().enumerate() {
        // leave room for "..."
        if current_width + w > max_width.saturating_sub(3) {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    if end_idx == 0 {
        return "...".to_string();
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated.trim_end())
}

/// Build a table with one row per result
pub fn results_table(results: &[SearchResult]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Title", "Provider", "Image", "Source"]);

    for (i, result) in results.iter().enumerate() {
        let title = if result.title.is_empty() {
            "(untitled)".to_string()
        } else {
            truncate_with_ellipsis(&result.title, TITLE_WIDTH)
        };

        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(title).add_attribute(Attribute::Bold),
            Cell::new(&result.provider),
            Cell::new(&result.image_url),
            Cell::new(&result.source_url),
        ]);
    }

    table
}

/// One line per result, for `--output plain`
pub fn plain_lines(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| {
            format!(
                "{} [{}]\n  Open: {}\n  Download: {}",
                truncate_with_ellipsis(&r.title, TITLE_WIDTH),
                r.provider,
                r.source_url,
                r.image_url
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_with_ellipsis("dancing cat", 50), "dancing cat");
        assert_eq!(truncate_with_ellipsis("", 50), "");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "a".repeat(80);
        let truncated = truncate_with_ellipsis(&long, TITLE_WIDTH);
        assert_eq!(truncated.chars().count(), TITLE_WIDTH);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_wide_chars() {
        // each CJK char is two columns wide
        let truncated = truncate_with_ellipsis("猫猫猫猫猫猫", 7);
        assert_eq!(truncated, "猫猫...");
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_with_ellipsis("anything", 0), "");
        assert_eq!(truncate_with_ellipsis("anything", 2), "...");
    }

    #[test]
    fn test_results_table_rows() {
        let results = vec![
            SearchResult::new("https://a.example/1.gif", "giphy"),
            SearchResult::new("https://a.example/2.gif", "tenor"),
        ];
        let rendered = results_table(&results).to_string();
        assert!(rendered.contains("giphy"));
        assert!(rendered.contains("(untitled)"));
    }

    #[test]
    fn test_plain_lines() {
        let lines = plain_lines(&[SearchResult::new("https://a.example/1.gif", "giphy")]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Download: https://a.example/1.gif"));
    }
}
