//! Table Detection Engine
//!
//! Heuristic extraction of tabular data from plain text pulled out of a PDF
//! (text layer or OCR). Lines are parsed into cells through an ordered chain
//! of delimiter rules, grouped into candidate tables, normalized into
//! rectangular grids, and scored for confidence. Callers fall back to
//! unstructured per-line extraction when nothing clears the confidence bar.
//!
//! The delimiter ordering and the scoring thresholds are load-bearing:
//! detection results change if they move.

mod detect;
mod fallback;
mod types;
mod workbook;

pub use detect::{detect_tables, COLUMN_TOLERANCE, MIN_CONFIDENCE, MIN_TABLE_ROWS};
pub use fallback::{column_widths, grid_to_csv, unstructured_sheets, UnstructuredSheet};
pub use types::DetectedTable;
pub use workbook::{build_sheets, Sheet};
