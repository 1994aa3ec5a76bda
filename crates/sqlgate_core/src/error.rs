use thiserror::Error;

/// Errors produced anywhere in the gateway, from config normalization down
/// to a single transaction item.
///
/// Every variant maps to an HTTP status via [`GatewayError::http_status`].
/// Variants carrying `item_idx` identify which item of a `transaction[]`
/// array caused the failure, for the `{reqIdx, error}` response shape.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Discovered at startup; the caller is expected to clean up any files
    /// created during this run and exit the process.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request, forbidden SQL verb, unknown stored statement,
    /// conflicting `values`/`valuesBatch`, etc.
    #[error("{message}")]
    Validation {
        message: String,
        item_idx: Option<usize>,
    },

    /// Wrong credentials, or missing Basic-Auth header.
    #[error("authentication failed")]
    Authentication { custom_code: Option<u16> },

    /// Unknown database id.
    #[error("database not found: {0}")]
    NotFound(String),

    /// Driver error surfaced while preparing, binding, executing, scanning
    /// or committing.
    #[error("{0}")]
    Execution(String),

    /// A panic inside request handling, converted into a normal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            item_idx: None,
        }
    }

    pub fn validation_at(item_idx: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            item_idx: Some(item_idx),
        }
    }

    pub fn item_idx(&self) -> Option<usize> {
        match self {
            Self::Validation { item_idx, .. } => *item_idx,
            _ => None,
        }
    }

    /// HTTP status this error maps to, absent a per-`Authr` override.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Validation { .. } => 400,
            Self::Authentication { custom_code } => custom_code.unwrap_or(401),
            Self::NotFound(_) => 404,
            Self::Execution(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
