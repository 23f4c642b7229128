use thiserror::Error;

/// A token stream that cannot be turned into a layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("Malformed token stream at token {index}: {msg}")]
    Malformed { index: usize, msg: String },

    #[error("Unknown primitive type \"{0}\"")]
    UnknownPrimitive(String),

    #[error("Type \"{type_name}\" referenced by \"{referenced_by}\" is not defined")]
    UnresolvedType { type_name: String, referenced_by: String },

    #[error("\"{container}\" has no \"{member}\" member")]
    MissingMember { container: String, member: String },

    #[error("Block length {declared} of \"{name}\" is smaller than its fields ({required} bytes)")]
    BlockLengthTooSmall { name: String, declared: usize, required: usize },

    #[error("No message named \"{0}\"")]
    UnknownMessage(String),

    #[error("No message with template id {0}")]
    UnknownTemplate(u64),
}

impl IrError {
    pub fn malformed(index: usize, msg: impl Into<String>) -> IrError {
        IrError::Malformed { index, msg: msg.into() }
    }
}

/// Failures of the runtime codec. Every variant carries the dotted path of the
/// element being processed (`car.fuelFigures[2].speed`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("Reading {needed} bytes at offset {offset} for \"{path}\" overruns a buffer of {len} bytes")]
    OutOfBounds { path: String, offset: usize, needed: usize, len: usize },

    #[error("Group \"{path}\" at offset {offset} declares {count} elements of at least {element_length} bytes but only {remaining} bytes remain")]
    GroupOverrun { path: String, offset: usize, count: u64, block_length: u64, element_length: u64, remaining: usize },

    #[error("Unknown value {raw} for enum \"{enum_name}\" at \"{path}\"")]
    UnknownEnumValue { path: String, enum_name: String, raw: String },

    #[error("Unknown choice \"{choice}\" for set \"{set_name}\" at \"{path}\"")]
    UnknownChoice { path: String, set_name: String, choice: String },

    #[error("Missing value for \"{0}\"")]
    MissingValue(String),

    #[error("Value for \"{path}\" has the wrong shape, expected {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("Value {value} for \"{path}\" does not fit in {primitive}")]
    OutOfRange { path: String, value: String, primitive: String },

    #[error("Template id {found} in header does not match message \"{message}\" ({expected})")]
    TemplateMismatch { message: String, expected: i32, found: u64 },

    #[error("Invalid {encoding} text at \"{path}\"")]
    InvalidText { path: String, encoding: String },
}
