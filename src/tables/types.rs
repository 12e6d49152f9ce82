use serde::Serialize;

/// A table recovered from extracted text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedTable {
    /// Rectangular grid: every row has the same cell count after
    /// normalization
    pub rows: Vec<Vec<String>>,

    /// Best-guess page of origin, derived from line position relative to the
    /// total line count
    pub page_number: usize,

    /// Heuristic score in [0, 1]; accepted tables score at least 0.5
    pub confidence: f64,
}

impl DetectedTable {
    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}
