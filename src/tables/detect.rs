//! Heuristic table detection over extracted text
//!
//! The scan keeps at most one open candidate table at a time. Lines are
//! parsed into cells by the first delimiter rule that yields two or more
//! non-empty cells; candidate boundaries come from blank lines, non-table
//! lines, and column-count jumps beyond the tolerance.

use super::types::DetectedTable;

/// A finalized table keeps at least a header plus one data row
pub const MIN_TABLE_ROWS: usize = 2;

/// Maximum cell-count drift tolerated between a row and the candidate's
/// expected column count
pub const COLUMN_TOLERANCE: usize = 2;

/// Candidates scoring below this are discarded
pub const MIN_CONFIDENCE: f64 = 0.5;

const WEIGHT_COLUMN_CONSISTENCY: f64 = 0.3;
const WEIGHT_HEADER: f64 = 0.2;
const WEIGHT_NUMERIC_DENSITY: f64 = 0.3;
const WEIGHT_ROW_BONUS: f64 = 0.2;

const HEADER_MAX_CELL_LEN: usize = 20;
const ROW_BONUS_DIVISOR: f64 = 20.0;

/// Detect tables in a block of extracted text
///
/// `page_count` is the page count of the source document; per-line page
/// numbers are an approximation from line position since true page
/// boundaries are not tracked. Results are sorted by descending confidence.
pub fn detect_tables(text: &str, page_count: usize) -> Vec<DetectedTable> {
    let lines: Vec<&str> = text.split('\n').collect();
    let pages = page_count.max(1);
    let lines_per_page = lines.len().div_ceil(pages).max(1);

    let mut tables = Vec::new();
    let mut candidate: Option<Candidate> = None;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        let line_page = i / lines_per_page + 1;

        // A blank line always closes the current candidate
        if line.is_empty() {
            finalize_into(&mut tables, candidate.take());
            continue;
        }

        let cells = parse_cells(line);

        if cells.len() >= 2 {
            match candidate.as_mut() {
                None => candidate = Some(Candidate::open(line_page, cells)),
                Some(open) => {
                    if cells.len().abs_diff(open.expected_cols) <= COLUMN_TOLERANCE {
                        open.push(cells);
                    } else {
                        // Column-count jump: this line starts a different table
                        finalize_into(&mut tables, candidate.take());
                        candidate = Some(Candidate::open(line_page, cells));
                    }
                }
            }
        } else {
            // Non-table line; closes the candidate, the line itself is dropped
            finalize_into(&mut tables, candidate.take());
        }
    }

    // A candidate reaching the last line still counts
    finalize_into(&mut tables, candidate.take());

    tables.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tables
}

/// An in-progress run of parsed lines being evaluated as a possible table
struct Candidate {
    rows: Vec<Vec<String>>,
    /// Cell counts as parsed, before normalization
    raw_counts: Vec<usize>,
    /// Running maximum cell count; the final column count
    expected_cols: usize,
    page_number: usize,
}

impl Candidate {
    fn open(page_number: usize, first_row: Vec<String>) -> Self {
        let cols = first_row.len();
        Self {
            rows: vec![first_row],
            raw_counts: vec![cols],
            expected_cols: cols,
            page_number,
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.expected_cols = self.expected_cols.max(row.len());
        self.raw_counts.push(row.len());
        self.rows.push(row);
    }
}

fn finalize_into(tables: &mut Vec<DetectedTable>, candidate: Option<Candidate>) {
    let Some(candidate) = candidate else { return };
    if candidate.rows.len() < MIN_TABLE_ROWS {
        return;
    }

    let cols = candidate.expected_cols;
    let raw_counts = candidate.raw_counts;

    // Normalization: rectangular grid, shortfall padded with empty cells
    let rows: Vec<Vec<String>> = candidate
        .rows
        .into_iter()
        .map(|mut row| {
            row.truncate(cols);
            row.resize(cols, String::new());
            row
        })
        .collect();

    let confidence = score(&rows, &raw_counts, cols);
    if confidence >= MIN_CONFIDENCE {
        tables.push(DetectedTable {
            rows,
            page_number: candidate.page_number,
            confidence,
        });
    }
}

/// Confidence score: sum of four independently weighted signals, each capped
/// to its weight, total capped at 1.0
fn score(rows: &[Vec<String>], raw_counts: &[usize], cols: usize) -> f64 {
    let consistent = raw_counts.iter().filter(|&&c| c == cols).count();
    let column_consistency =
        WEIGHT_COLUMN_CONSISTENCY * consistent as f64 / raw_counts.len() as f64;

    let header = if rows[0].iter().all(|cell| plausible_header_cell(cell)) {
        WEIGHT_HEADER
    } else {
        0.0
    };

    let mut numeric = 0usize;
    let mut non_empty = 0usize;
    for row in &rows[1..] {
        for cell in row {
            if !cell.is_empty() {
                non_empty += 1;
                if looks_numeric(cell) {
                    numeric += 1;
                }
            }
        }
    }
    let numeric_density = if non_empty == 0 {
        0.0
    } else {
        WEIGHT_NUMERIC_DENSITY * numeric as f64 / non_empty as f64
    };

    let row_bonus = (rows.len() as f64 / ROW_BONUS_DIVISOR).min(WEIGHT_ROW_BONUS);

    (column_consistency + header + numeric_density + row_bonus).min(1.0)
}

fn plausible_header_cell(cell: &str) -> bool {
    cell.chars().all(|c| c.is_alphabetic() || c == ' ')
        || cell.chars().count() < HEADER_MAX_CELL_LEN
}

/// Digits, comma, period, currency symbols, percent, hyphen only
fn looks_numeric(cell: &str) -> bool {
    !cell.is_empty()
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '$' | '€' | '£' | '¥' | '%' | '-'))
}

/// Parse a line into cells via the ordered delimiter fallback chain.
///
/// Order: tab, pipe, semicolon, runs of 3+ whitespace, comma (only with two
/// or more commas in the line, quote-aware), runs of 2+ whitespace. The
/// first rule producing at least two non-empty cells wins; otherwise the
/// whole line is a single cell.
fn parse_cells(line: &str) -> Vec<String> {
    for delimiter in ['\t', '|', ';'] {
        let cells = split_on_char(line, delimiter);
        if cells.len() >= 2 {
            return cells;
        }
    }

    let cells = split_whitespace_runs(line, 3);
    if cells.len() >= 2 {
        return cells;
    }

    if line.matches(',').count() >= 2 {
        let cells = split_quoted_csv(line);
        if cells.len() >= 2 {
            return cells;
        }
    }

    let cells = split_whitespace_runs(line, 2);
    if cells.len() >= 2 {
        return cells;
    }

    vec![line.to_string()]
}

fn split_on_char(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split on runs of at least `min_run` whitespace characters; shorter runs
/// stay inside the cell ("New York" remains one cell)
fn split_whitespace_runs(line: &str, min_run: usize) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut run = String::new();

    for ch in line.chars() {
        if ch.is_whitespace() {
            run.push(ch);
        } else {
            if run.chars().count() >= min_run {
                push_trimmed(&mut cells, &mut current);
            } else {
                current.push_str(&run);
            }
            run.clear();
            current.push(ch);
        }
    }
    push_trimmed(&mut cells, &mut current);

    cells
}

/// Comma split that keeps commas inside double-quoted fields intact
fn split_quoted_csv(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => push_trimmed(&mut cells, &mut current),
            _ => current.push(ch),
        }
    }
    push_trimmed(&mut cells, &mut current);

    cells
}

fn push_trimmed(cells: &mut Vec<String>, current: &mut String) {
    let cell = current.trim();
    if !cell.is_empty() {
        cells.push(cell.to_string());
    }
    current.clear();
}
