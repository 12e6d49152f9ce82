//! Conversion request types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The supported transformations, keyed by their wire strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionType {
    PdfToWord,
    WordToPdf,
    PdfToExcel,
    CompressPdf,
    MergePdf,
    SplitPdf,
    JpgToPdf,
    PdfToJpg,
    ImageToText,
    UnlockPdf,
    RotatePdf,
    ProtectPdf,
}

impl ConversionType {
    pub const ALL: [ConversionType; 12] = [
        ConversionType::PdfToWord,
        ConversionType::WordToPdf,
        ConversionType::PdfToExcel,
        ConversionType::CompressPdf,
        ConversionType::MergePdf,
        ConversionType::SplitPdf,
        ConversionType::JpgToPdf,
        ConversionType::PdfToJpg,
        ConversionType::ImageToText,
        ConversionType::UnlockPdf,
        ConversionType::RotatePdf,
        ConversionType::ProtectPdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionType::PdfToWord => "pdf-to-word",
            ConversionType::WordToPdf => "word-to-pdf",
            ConversionType::PdfToExcel => "pdf-to-excel",
            ConversionType::CompressPdf => "compress-pdf",
            ConversionType::MergePdf => "merge-pdf",
            ConversionType::SplitPdf => "split-pdf",
            ConversionType::JpgToPdf => "jpg-to-pdf",
            ConversionType::PdfToJpg => "pdf-to-jpg",
            ConversionType::ImageToText => "image-to-text",
            ConversionType::UnlockPdf => "unlock-pdf",
            ConversionType::RotatePdf => "rotate-pdf",
            ConversionType::ProtectPdf => "protect-pdf",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == value)
    }

    /// Merge is the one conversion taking several input files
    pub fn is_multi_input(&self) -> bool {
        matches!(self, ConversionType::MergePdf)
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversion request as submitted by the client
///
/// Fields are optional so validation can name the specific missing piece
/// instead of failing deserialization wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub file_id: Option<String>,
    pub file_path: Option<String>,
    pub conversion_type: Option<String>,
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Inputs for multi-file conversions (merge)
    pub file_paths: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported conversion type: {0}")]
    UnsupportedType(String),

    #[error("Input file not found: {0}")]
    InputFileNotFound(String),

    #[error("At least two file paths required for merge")]
    TooFewFilesForMerge,

    #[error("{message}")]
    QuotaExceeded {
        message: String,
        limit: u32,
        remaining: u32,
        reset: chrono::DateTime<chrono::Utc>,
    },
}

impl ConvertError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            Self::InputFileNotFound(_) => StatusCode::NOT_FOUND,
            Self::TooFewFilesForMerge => StatusCode::BAD_REQUEST,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_all_types() {
        for ty in ConversionType::ALL {
            assert_eq!(ConversionType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ConversionType::parse("pdf-to-csv"), None);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ConversionType::PdfToExcel).unwrap();
        assert_eq!(json, "\"pdf-to-excel\"");
    }

    #[test]
    fn test_only_merge_is_multi_input() {
        assert!(ConversionType::MergePdf.is_multi_input());
        assert!(!ConversionType::CompressPdf.is_multi_input());
    }
}
