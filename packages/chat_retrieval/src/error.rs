//! Error taxonomy for retrieval operations, plus the non-fatal enrichment
//! warnings that travel alongside successful results.

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("store query failed while trying to {stage}")]
    Retrieval {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Adapter for `map_err` that tags a store error with the query stage.
    pub(crate) fn retrieval(stage: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Retrieval { stage, source }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Retrieval { .. } => "retrieval_error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why best-effort enrichment of a chat could not attach its last message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentFailure {
    /// The chat's stored last-message time matched no message row.
    NoMatchingMessage,
    /// The secondary lookup itself failed.
    Store { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentWarning {
    pub chat_jid: String,
    #[serde(flatten)]
    pub failure: EnrichmentFailure,
}

impl std::fmt::Display for EnrichmentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.failure {
            EnrichmentFailure::NoMatchingMessage => {
                write!(f, "no last message found for chat {}", self.chat_jid)
            }
            EnrichmentFailure::Store { message } => {
                write!(f, "last message lookup failed for chat {}: {}", self.chat_jid, message)
            }
        }
    }
}

/// A primary result plus the enrichment diagnostics gathered while building it.
///
/// The value is authoritative; warnings only describe fields that could not be
/// attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enriched<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EnrichmentWarning>,
}

impl<T> Enriched<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}
