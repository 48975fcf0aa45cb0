//! Plain-text rendering of query results.
//!
//! Columns are padded to their widest cell; cells that look numeric are
//! right-aligned so counts and means line up on the decimal side.

use std::borrow::Cow;
use std::fmt::Write as _;

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    let mut numeric = vec![!rows.is_empty(); headers.len()];

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
            numeric[idx] &= looks_numeric(cell);
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths, &numeric));
    let rule = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(output, "{rule}");
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((value, width), right_align)| {
            let cell = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&cell)));
            if *right_align {
                format!("{padding}{cell}")
            } else {
                format!("{cell}{padding}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn looks_numeric(value: &str) -> bool {
    !value.is_empty() && value.parse::<f64>().is_ok()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_text_left_and_numbers_right() {
        let rows = vec![
            vec!["TESLA".to_string(), "120".to_string()],
            vec!["BMW".to_string(), "7".to_string()],
        ];
        let rendered = render_table(&["make", "count"], &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec!["make   count", "-----  -----", "TESLA    120", "BMW        7"]
        );
    }

    #[test]
    fn replaces_control_characters() {
        let rows = vec![vec!["line1\nline2\tvalue".to_string()]];
        let rendered = render_table(&["note"], &rows);
        assert_eq!(rendered.lines().nth(2), Some("line1 line2 value"));
    }

    #[test]
    fn empty_result_renders_header_only() {
        let rendered = render_table(&["make", "count"], &[]);
        assert_eq!(rendered.lines().count(), 2);
    }
}
