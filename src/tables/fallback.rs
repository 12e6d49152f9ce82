//! Unstructured extraction fallback
//!
//! When no candidate clears the confidence bar the caller degrades to one
//! cell per line, split into per-page sheets for multi-page sources. Also
//! hosts the small grid helpers the pdf-to-excel workbook step uses.

use serde::Serialize;

/// A sheet of unstructured content: one single-cell row per source line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstructuredSheet {
    pub title: String,
    pub rows: Vec<Vec<String>>,
}

/// Degrade text to per-line rows, one sheet per estimated page when the
/// source has several pages, a single `Content` sheet otherwise
pub fn unstructured_sheets(text: &str, page_count: usize) -> Vec<UnstructuredSheet> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return Vec::new();
    }

    if page_count > 1 {
        let lines_per_page = lines.len().div_ceil(page_count).max(1);
        lines
            .chunks(lines_per_page)
            .enumerate()
            .map(|(page, chunk)| UnstructuredSheet {
                title: format!("Page_{}", page + 1),
                rows: chunk.iter().map(|line| vec![line.to_string()]).collect(),
            })
            .collect()
    } else {
        vec![UnstructuredSheet {
            title: "Content".to_string(),
            rows: lines.iter().map(|line| vec![line.to_string()]).collect(),
        }]
    }
}

/// Column width hints for workbook rendering: content length plus padding,
/// clamped to 10..=50 characters
pub fn column_widths(rows: &[Vec<String>]) -> Vec<usize> {
    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![10usize; max_cols];

    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max((cell.chars().count() + 2).min(50));
        }
    }

    widths
}

/// Render a grid as CSV, quoting cells that carry commas, quotes, or
/// newlines
pub fn grid_to_csv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let mut first = true;
        for cell in row {
            if !first {
                out.push(',');
            }
            first = false;

            if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
                out.push('"');
                out.push_str(&cell.replace('"', "\"\""));
                out.push('"');
            } else {
                out.push_str(cell);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_falls_back_to_one_sheet() {
        let sheets = unstructured_sheets("first line\n\nsecond line\n", 1);

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].title, "Content");
        assert_eq!(
            sheets[0].rows,
            vec![vec!["first line".to_string()], vec!["second line".to_string()]]
        );
    }

    #[test]
    fn test_multi_page_splits_sheets() {
        let text = "a\nb\nc\nd\ne\nf\n";
        let sheets = unstructured_sheets(text, 2);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].title, "Page_1");
        assert_eq!(sheets[0].rows.len(), 3);
        assert_eq!(sheets[1].title, "Page_2");
        assert_eq!(sheets[1].rows.len(), 3);
    }

    #[test]
    fn test_empty_text_yields_no_sheets() {
        assert!(unstructured_sheets("\n\n  \n", 3).is_empty());
    }

    #[test]
    fn test_column_widths_clamped() {
        let rows = vec![
            vec!["ab".to_string(), "x".repeat(80)],
            vec!["a much longer cell".to_string(), "y".to_string()],
        ];
        let widths = column_widths(&rows);

        assert_eq!(widths, vec![20, 50]);
    }

    #[test]
    fn test_grid_to_csv_quotes_special_cells() {
        let rows = vec![
            vec!["Name".to_string(), "Note".to_string()],
            vec!["Smith, John".to_string(), "said \"hi\"".to_string()],
        ];

        assert_eq!(
            grid_to_csv(&rows),
            "Name,Note\n\"Smith, John\",\"said \"\"hi\"\"\"\n"
        );
    }
}
