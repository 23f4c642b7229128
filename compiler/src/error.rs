use brine_sbe_schema::{CodecError, IrError};
use thiserror::Error;

use crate::traits::Language;

#[derive(Debug, Error)]
pub enum SbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("\"{name}\" is a reserved word in {language}; set a keyword append token to generate it")]
    KeywordCollision {
        name:     String,
        language: Language,
    },

    #[error("Invalid identifier {0}")]
    InvalidIdentifier(String),

    #[error("Unknown message \"{0}\"")]
    UnknownMessage(String),

    #[error("Two schema elements generate the file {0}")]
    DuplicateUnit(String),
}
