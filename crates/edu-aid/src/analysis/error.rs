//! Error types for the analysis pipeline.

use thiserror::Error;

/// Accepted upload extensions, lowercase.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xls", "xlsm"];

/// Errors that can surface from decoding and analyzing an upload.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Statistics over zero rows are undefined, not zero.
    #[error("no valid data to analyze")]
    EmptyDataset,

    /// Upload had an extension outside the accepted set.
    #[error("unsupported file type \".{extension}\" (accepted: {})", ACCEPTED_EXTENSIONS.join(", "))]
    UnsupportedFileType { extension: String },

    /// The file could not be decoded as CSV or a spreadsheet.
    #[error("failed to decode file: {message}")]
    Decode { message: String },

    /// Upload was missing or empty.
    #[error("no file content received")]
    MissingFile,
}

impl AnalysisError {
    /// Returns true when the error is the caller's fault (bad upload)
    /// rather than an internal failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::EmptyDataset
                | AnalysisError::UnsupportedFileType { .. }
                | AnalysisError::Decode { .. }
                | AnalysisError::MissingFile
        )
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<calamine::Error> for AnalysisError {
    fn from(err: calamine::Error) -> Self {
        AnalysisError::Decode {
            message: err.to_string(),
        }
    }
}
