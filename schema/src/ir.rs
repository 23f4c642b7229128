use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::primitive::ByteOrder;
use crate::token::{Signal, Token};
use crate::walker::verify_spans;

/// Intermediate representation of a whole schema: one flat token stream per
/// message and per type, plus the message header composite.
///
/// An `Ir` is never mutated by the layout engine or the generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    pub id: i32,
    pub version: i32,
    #[serde(default)]
    pub byte_order: ByteOrder,
    pub header_structure: Vec<Token>,
    #[serde(default)]
    pub messages: Vec<Vec<Token>>,
    #[serde(default)]
    pub types: Vec<Vec<Token>>,
}

impl Ir {
    pub fn message_by_name(&self, name: &str) -> Option<&[Token]> {
        self.messages
            .iter()
            .find(|tokens| tokens.first().is_some_and(|t| t.name == name))
            .map(Vec::as_slice)
    }

    pub fn message_by_id(&self, id: i32) -> Option<&[Token]> {
        self.messages
            .iter()
            .find(|tokens| tokens.first().is_some_and(|t| t.id == id))
            .map(Vec::as_slice)
    }

    pub fn type_by_name(&self, name: &str) -> Option<&[Token]> {
        self.types
            .iter()
            .find(|tokens| tokens.first().is_some_and(|t| t.name == name))
            .map(Vec::as_slice)
    }

    /// Checks the structural shape of every token stream: balanced markers,
    /// consistent component token counts, messages opened by `BEGIN_MESSAGE`.
    pub fn verify(&self) -> Result<(), IrError> {
        verify_spans(&self.header_structure)?;
        for tokens in &self.types {
            verify_spans(tokens)?;
        }
        for tokens in &self.messages {
            verify_spans(tokens)?;
            match tokens.first() {
                Some(t) if t.signal == Signal::BeginMessage => {}
                Some(t) => {
                    return Err(IrError::malformed(
                        0,
                        format!("message stream starts with {:?} \"{}\"", t.signal, t.name),
                    ))
                }
                None => return Err(IrError::malformed(0, "empty message stream")),
            }
        }
        Ok(())
    }
}
