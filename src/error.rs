use thiserror::Error;

/// Failures at the I/O boundary. The filtering core itself never errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("no columns selected for export")]
    EmptyExportSelection,

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}
