use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SynthError {
    #[error("invalid synthesis type: {0}")]
    InvalidSynthesisType(String),

    #[error("invalid ORCID: {0}")]
    InvalidOrcid(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid rows: {0}")]
    InvalidRows(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("{0} is not configured")]
    #[diagnostic(help("set it in synth-upload.json or through the environment"))]
    MissingSetting(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("unexpected catalog response: {0}")]
    CatalogResponse(String),

    #[error("Google Sheets request failed: {0}")]
    SheetsHttp(String),

    #[error("Google Sheets returned status {status}: {message}")]
    SheetsStatus { status: u16, message: String },

    #[error("parent link for {field} failed: {outcome}")]
    ParentLink { field: String, outcome: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
