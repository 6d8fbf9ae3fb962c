use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by callers to pick a notification style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidState,
    Validation,
    RemoteFailure,
    StockConflict,
    Config,
    Io,
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Config directory not found at {0}. Run 'desk init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    StateWrite { path: PathBuf, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} {entity} in status '{from}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: String,
    },

    #[error("{0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Insufficient stock for '{product}': requested {requested}, available {available}")]
    StockConflict {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("Payment amount must be greater than zero")]
    InvalidPaymentAmount,

    #[error("Payment would exceed the balance of {document} (max {max:.2} remaining)")]
    OverPayment { document: String, max: f64 },

    #[error("Session expired or token rejected. Log in again.")]
    Unauthorized,

    #[error("Request failed: {}", .detail.as_deref().unwrap_or(GENERIC_REMOTE_MESSAGE))]
    RemoteFailure {
        status: Option<u16>,
        detail: Option<String>,
    },

    #[error("Sale {sale} was created but the payment was not recorded: {detail}")]
    PaymentNotRecorded { sale: String, detail: String },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const GENERIC_REMOTE_MESSAGE: &str = "the server could not complete the request";

impl DeskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskError::InvalidTransition { .. } | DeskError::InvalidState(_) => {
                ErrorKind::InvalidState
            }
            DeskError::Validation(_)
            | DeskError::InvalidPaymentAmount
            | DeskError::OverPayment { .. }
            | DeskError::NotFound { .. } => ErrorKind::Validation,
            DeskError::StockConflict { .. } => ErrorKind::StockConflict,
            DeskError::Unauthorized
            | DeskError::RemoteFailure { .. }
            | DeskError::PaymentNotRecorded { .. }
            | DeskError::MalformedResponse { .. } => ErrorKind::RemoteFailure,
            DeskError::ConfigNotFound(_)
            | DeskError::ConfigFileNotFound(_)
            | DeskError::ConfigParse { .. }
            | DeskError::AlreadyInitialized(_) => ErrorKind::Config,
            DeskError::StateWrite { .. }
            | DeskError::TypstNotFound
            | DeskError::PdfGeneration(_)
            | DeskError::Io(_) => ErrorKind::Io,
        }
    }

    /// Message suitable for a user notification. Remote failures surface the
    /// server detail when one was sent.
    pub fn user_message(&self) -> String {
        match self {
            DeskError::RemoteFailure {
                detail: Some(detail),
                ..
            } => detail.clone(),
            DeskError::RemoteFailure { detail: None, .. } => {
                "Unexpected error communicating with the server".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
