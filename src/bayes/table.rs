//! Plain-text grid rendering shared by factors, CPDs and datasets.

/// Render a grid with a `=` rule under the header row.
pub(crate) fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .chain(std::iter::once(&header[col]))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |fill: char| -> String {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&fill.to_string().repeat(w + 2));
            line.push('+');
        }
        line
    };
    let line = |cells: &[String]| -> String {
        let mut out = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            // numbers right-aligned, labels left-aligned
            if cell.parse::<f64>().is_ok() {
                out.push_str(&format!(" {cell:>w$} |"));
            } else {
                out.push_str(&format!(" {cell:<w$} |"));
            }
        }
        out
    };

    let mut out = Vec::with_capacity(rows.len() * 2 + 3);
    out.push(rule('-'));
    out.push(line(header));
    out.push(rule('='));
    for row in rows {
        out.push(line(row));
        out.push(rule('-'));
    }
    out.join("\n")
}

/// Render rows separated by `-` rules only (no header distinction).
pub(crate) fn render_plain(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut rule = String::from("+");
    for w in &widths {
        rule.push_str(&"-".repeat(w + 2));
        rule.push('+');
    }

    let mut out = vec![rule.clone()];
    for row in rows {
        let mut line = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            line.push_str(&format!(" {cell:<w$} |"));
        }
        out.push(line);
        out.push(rule.clone());
    }
    out.join("\n")
}

/// Render an indexed, right-aligned frame.
///
/// With `preview = Some(n)` and more than `2n` rows only the first and last
/// `n` rows are shown, followed by a size footer.
pub(crate) fn render_frame(header: &[String], body: &[Vec<String>], preview: Option<usize>) -> String {
    let total = body.len();
    let shown: Vec<(String, &Vec<String>)> = match preview {
        Some(n) if total > 2 * n => body[..n]
            .iter()
            .enumerate()
            .chain(body[total - n..].iter().enumerate().map(|(i, r)| (total - n + i, r)))
            .map(|(i, r)| (i.to_string(), r))
            .collect(),
        _ => body.iter().enumerate().map(|(i, r)| (i.to_string(), r)).collect(),
    };
    let truncated = shown.len() < total;

    let index_width = shown.iter().map(|(i, _)| i.len()).max().unwrap_or(0).max(3);
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(col, h)| {
            shown
                .iter()
                .filter_map(|(_, row)| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |index: &str, cells: &[String]| -> String {
        let mut line = format!("{index:<index_width$}");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            line.push_str(&format!("  {cell:>w$}"));
        }
        line
    };

    let mut out = vec![format_row("", header)];
    for (pos, (index, row)) in shown.iter().enumerate() {
        if truncated && pos == shown.len() / 2 {
            let dots: Vec<String> = header.iter().map(|_| "...".to_string()).collect();
            out.push(format_row("...", &dots));
        }
        out.push(format_row(index, row));
    }
    if truncated {
        out.push(String::new());
        out.push(format!("[{} rows x {} columns]", total, header.len()));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_truncates_middle_rows() {
        let header = vec!["X".to_string()];
        let body: Vec<Vec<String>> = (0..10).map(|i| vec![(i % 2).to_string()]).collect();
        let text = render_frame(&header, &body, Some(2));
        assert!(text.contains("..."));
        assert!(text.contains("[10 rows x 1 columns]"));
        assert!(text.lines().any(|l| l.starts_with("9 ")));
        assert!(!text.lines().any(|l| l.starts_with("5 ")));

        let full = render_frame(&header, &body, None);
        assert_eq!(full.lines().count(), 11);
    }

    #[test]
    fn test_grid_aligns_columns() {
        let header = vec!["A".to_string(), "phi(A)".to_string()];
        let rows = vec![
            vec!["A(True)".to_string(), "0.2500".to_string()],
            vec!["A(False)".to_string(), "0.7500".to_string()],
        ];
        let grid = render_grid(&header, &rows);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[2].starts_with("+=="));
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
        assert!(grid.contains("| A(False) | 0.7500 |"));
    }
}
