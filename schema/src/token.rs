use serde::{Deserialize, Serialize};

use crate::primitive::{ByteOrder, PrimitiveType, PrimitiveValue};

/// Role of a token in the flattened schema tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    BeginMessage,
    EndMessage,
    BeginComposite,
    EndComposite,
    BeginField,
    EndField,
    BeginGroup,
    EndGroup,
    BeginEnum,
    ValidValue,
    EndEnum,
    BeginSet,
    Choice,
    EndSet,
    BeginVarData,
    EndVarData,
    Encoding,
}

impl Signal {
    /// The end marker closing a container opened by this signal.
    pub fn end_signal(self) -> Option<Signal> {
        match self {
            Signal::BeginMessage => Some(Signal::EndMessage),
            Signal::BeginComposite => Some(Signal::EndComposite),
            Signal::BeginField => Some(Signal::EndField),
            Signal::BeginGroup => Some(Signal::EndGroup),
            Signal::BeginEnum => Some(Signal::EndEnum),
            Signal::BeginSet => Some(Signal::EndSet),
            Signal::BeginVarData => Some(Signal::EndVarData),
            _ => None,
        }
    }

    /// The begin marker a closing signal pairs with.
    pub fn begin_signal(self) -> Option<Signal> {
        match self {
            Signal::EndMessage => Some(Signal::BeginMessage),
            Signal::EndComposite => Some(Signal::BeginComposite),
            Signal::EndField => Some(Signal::BeginField),
            Signal::EndGroup => Some(Signal::BeginGroup),
            Signal::EndEnum => Some(Signal::BeginEnum),
            Signal::EndSet => Some(Signal::BeginSet),
            Signal::EndVarData => Some(Signal::BeginVarData),
            _ => None,
        }
    }

    pub fn is_begin(self) -> bool {
        self.end_signal().is_some()
    }

    pub fn is_end(self) -> bool {
        self.begin_signal().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Required,
    Optional,
    Constant,
}

/// Wire encoding attached to a token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Encoding {
    pub presence: Presence,
    pub primitive_type: Option<PrimitiveType>,
    pub byte_order: ByteOrder,
    pub const_value: Option<PrimitiveValue>,
    pub null_value: Option<PrimitiveValue>,
    pub character_encoding: Option<String>,
}

impl Encoding {
    pub fn new(primitive_type: PrimitiveType, byte_order: ByteOrder) -> Encoding {
        Encoding {
            primitive_type: Some(primitive_type),
            byte_order,
            ..Encoding::default()
        }
    }

    /// The declared null value, or the primitive's sentinel.
    pub fn applicable_null_value(&self) -> Option<PrimitiveValue> {
        self.null_value
            .clone()
            .or_else(|| self.primitive_type.map(PrimitiveType::null_value))
    }
}

fn default_id() -> i32 {
    -1
}

fn default_count() -> usize {
    1
}

/// One node of the flattened schema tree.
///
/// Container-begin tokens carry `component_token_count`: the number of tokens
/// from this one up to and including its matching end marker. Leaves carry 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub signal: Signal,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_id")]
    pub id: i32,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub encoded_length: usize,
    #[serde(default = "default_count")]
    pub component_token_count: usize,
    #[serde(default = "default_count")]
    pub array_length: usize,
    #[serde(default)]
    pub encoding: Encoding,
}

impl Token {
    pub fn new(signal: Signal, name: &str) -> Token {
        Token {
            signal,
            name: name.to_owned(),
            referenced_name: None,
            description: None,
            id: default_id(),
            version: 0,
            offset: 0,
            encoded_length: 0,
            component_token_count: 1,
            array_length: 1,
            encoding: Encoding::default(),
        }
    }

    /// Name of the type this token stands for: the referenced type name when
    /// present, the token name otherwise.
    pub fn applicable_type_name(&self) -> &str {
        self.referenced_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_constant_encoding(&self) -> bool {
        self.encoding.presence == Presence::Constant
    }

    pub fn is_optional_encoding(&self) -> bool {
        self.encoding.presence == Presence::Optional
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        self.encoding.primitive_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_pairs() {
        assert_eq!(Signal::BeginGroup.end_signal(), Some(Signal::EndGroup));
        assert_eq!(Signal::EndVarData.begin_signal(), Some(Signal::BeginVarData));
        assert!(!Signal::Encoding.is_begin());
        assert!(!Signal::Choice.is_end());
    }

    #[test]
    fn token_from_json_defaults() {
        let token: Token = serde_json::from_str(
            r#"{"signal": "ENCODING", "name": "length", "encoding": {"primitive_type": "uint32"}}"#,
        )
        .unwrap();
        assert_eq!(token.signal, Signal::Encoding);
        assert_eq!(token.component_token_count, 1);
        assert_eq!(token.array_length, 1);
        assert_eq!(token.id, -1);
        assert_eq!(token.primitive_type(), Some(PrimitiveType::Uint32));
        assert_eq!(token.encoding.byte_order, ByteOrder::LittleEndian);
        assert_eq!(
            token.encoding.applicable_null_value(),
            Some(PrimitiveValue::UInt(u32::MAX as u64))
        );
    }

    #[test]
    fn unknown_primitive_is_rejected() {
        let result: Result<Token, _> = serde_json::from_str(
            r#"{"signal": "ENCODING", "name": "x", "encoding": {"primitive_type": "uint128"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn applicable_type_name() {
        let mut token = Token::new(Signal::BeginComposite, "engine");
        assert_eq!(token.applicable_type_name(), "engine");
        token.referenced_name = Some("Engine".to_owned());
        assert_eq!(token.applicable_type_name(), "Engine");
    }
}
