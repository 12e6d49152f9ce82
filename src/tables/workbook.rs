//! Sheet assembly for the pdf-to-excel workbook step
//!
//! Detected tables become one sheet each; when nothing clears the confidence
//! bar the whole text degrades to unstructured per-line sheets.

use serde::Serialize;

use super::detect::detect_tables;
use super::fallback::{column_widths, grid_to_csv, unstructured_sheets};

/// One worksheet worth of extracted content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub title: String,
    pub rows: Vec<Vec<String>>,
    /// Per-column width hints for the workbook writer
    pub column_widths: Vec<usize>,
}

impl Sheet {
    pub fn to_csv(&self) -> String {
        grid_to_csv(&self.rows)
    }
}

/// Extract worksheet content from a block of extracted text
///
/// A single detected table is titled `Data`; several get
/// `Table_{n}_Page_{page}` titles in confidence order. With no accepted
/// table the text comes back as unstructured sheets instead.
pub fn build_sheets(text: &str, page_count: usize) -> Vec<Sheet> {
    let tables = detect_tables(text, page_count);

    if tables.is_empty() {
        return unstructured_sheets(text, page_count)
            .into_iter()
            .map(|sheet| Sheet {
                column_widths: column_widths(&sheet.rows),
                title: sheet.title,
                rows: sheet.rows,
            })
            .collect();
    }

    let single = tables.len() == 1;
    tables
        .into_iter()
        .enumerate()
        .map(|(index, table)| Sheet {
            title: if single {
                "Data".to_string()
            } else {
                format!("Table_{}_Page_{}", index + 1, table.page_number)
            },
            column_widths: column_widths(&table.rows),
            rows: table.rows,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_table_is_titled_data() {
        let sheets = build_sheets("Name\tAge\nAlice\t30\nBob\t25\n", 1);

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].title, "Data");
        assert_eq!(sheets[0].rows.len(), 3);
        assert_eq!(sheets[0].column_widths.len(), 2);
    }

    #[test]
    fn test_multiple_tables_carry_page_numbers() {
        let text = "A\tB\n1\t2\n3\t4\n\n\n\nX\tY\n7\t8\n9\t10\n\n";
        let sheets = build_sheets(text, 2);

        assert_eq!(sheets.len(), 2);
        assert!(sheets[0].title.starts_with("Table_1_Page_"));
        assert!(sheets[1].title.starts_with("Table_2_Page_"));
    }

    #[test]
    fn test_prose_degrades_to_unstructured() {
        let text = "Plain prose with no structure.\nAnother paragraph of words.\n";
        let sheets = build_sheets(text, 1);

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].title, "Content");
        assert!(sheets[0].rows.iter().all(|row| row.len() == 1));
    }

    #[test]
    fn test_sheet_to_csv() {
        let sheets = build_sheets("Name\tAge\nAlice\t30\n\nBob\t25\nEve\t41\n", 1);
        let csv = sheets[0].to_csv();
        assert!(csv.ends_with('\n'));
        assert!(csv.contains(','));
    }
}
