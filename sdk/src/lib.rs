//! brine-sbe
//!
//! Runtime support for working with SBE IR and SBE-encoded messages.
//!
//! - Loading IR documents (`load_ir`, `ir_from_json`)
//! - Decoding a buffer to JSON and encoding JSON to a buffer with the
//!   dynamic codec (`decode_to_json`, `encode_from_json`)
//! - Writing generated codecs to a directory (`generate_to_dir`)

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};

pub use brine_sbe_compiler::error::SbeError;
pub use brine_sbe_compiler::{GeneratorConfig, Language};
pub use brine_sbe_schema::{CodecError, Ir, IrError, MessageCodec, MessageHeader, SchemaLayout, Value};

pub mod json;

pub mod error {
    pub use brine_sbe_compiler::error::SbeError;
    pub use brine_sbe_schema::{CodecError, IrError};
}

pub mod schema {
    pub use brine_sbe_schema::*;
}

pub mod compiler {
    pub use brine_sbe_compiler::*;
}

/// Parses an IR document and checks the shape of its token streams.
pub fn ir_from_json(text: &str) -> Result<Ir, SbeError> {
    let ir: Ir = serde_json::from_str(text)?;
    ir.verify()?;
    Ok(ir)
}

/// Reads an IR document from disk.
pub fn load_ir(path: impl AsRef<Path>) -> Result<Ir, SbeError> {
    let path = path.as_ref();
    let ir = ir_from_json(&fs::read_to_string(path)?)?;
    debug!(
        path = %path.display(),
        messages = ir.messages.len(),
        types = ir.types.len(),
        "loaded IR"
    );
    Ok(ir)
}

/// Decodes the message in `buffer`, picked by the template id in its header.
///
/// The result has the message name, the header values and the decoded body:
/// `{"message": "Car", "header": {...}, "body": {...}}`.
pub fn decode_to_json(ir: &Ir, buffer: &[u8]) -> Result<serde_json::Value, SbeError> {
    let codec = MessageCodec::for_buffer(ir, buffer)?;
    let header = MessageHeader::decode(codec.header_layout(), buffer)?;
    let body = codec.decode(buffer)?;
    Ok(json!({
        "message": codec.layout().name,
        "header": {
            "blockLength": header.block_length,
            "templateId": header.template_id,
            "schemaId": header.schema_id,
            "version": header.version,
        },
        "body": json::to_json(&body),
    }))
}

/// Encodes `body` as the message named `message`, header included.
pub fn encode_from_json(ir: &Ir, message: &str, body: &serde_json::Value) -> Result<Vec<u8>, SbeError> {
    let codec = MessageCodec::new(ir, message).map_err(|err| match err {
        CodecError::Ir(IrError::UnknownMessage(name)) => SbeError::UnknownMessage(name),
        err => SbeError::Codec(err),
    })?;
    let value = json::message_from_json(codec.layout(), body)?;
    Ok(codec.encode(&value)?)
}

/// The resolved layout of every type and message, as JSON.
pub fn layout_to_json(ir: &Ir) -> Result<serde_json::Value, SbeError> {
    let schema = SchemaLayout::resolve(ir)?;
    Ok(serde_json::to_value(&schema)?)
}

/// Generates codecs for `ir` under `dir`, in a subdirectory per package
/// segment. Returns the paths written.
pub fn generate_to_dir(ir: &Ir, config: &GeneratorConfig, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SbeError> {
    let mut output = brine_sbe_compiler::DirectoryOutput::new(dir.as_ref(), config.package(ir));
    brine_sbe_compiler::generate(ir, config, &mut output)?;
    info!(dir = %output.dir().display(), files = output.written().len(), "wrote generated codecs");
    Ok(output.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brine_sbe_schema::*;
    use serde_json::json;

    fn ping() -> Ir {
        IrBuilder::new(7, 2, ByteOrder::LittleEndian)
            .add_message(
                MessageDef::new("Ping", 5)
                    .field(FieldDef::primitive("seq", 1, PrimitiveType::Uint32))
                    .var_data(VarDataDef::text("note", 2)),
            )
            .build()
    }

    #[test]
    fn json_round_trip() {
        let ir = ping();
        let bytes = encode_from_json(&ir, "Ping", &json!({"seq": 42, "note": "hi"})).unwrap();
        assert_eq!(bytes, [4, 0, 5, 0, 7, 0, 2, 0, 42, 0, 0, 0, 2, 0, 0, 0, b'h', b'i']);

        let decoded = decode_to_json(&ir, &bytes).unwrap();
        assert_eq!(
            decoded,
            json!({
                "message": "Ping",
                "header": {"blockLength": 4, "templateId": 5, "schemaId": 7, "version": 2},
                "body": {"seq": 42, "note": "hi"},
            })
        );
    }

    #[test]
    fn unknown_message() {
        let ir = ping();
        match encode_from_json(&ir, "Pong", &json!({})) {
            Err(SbeError::UnknownMessage(name)) => assert_eq!(name, "Pong"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_required_field() {
        let ir = ping();
        let err = encode_from_json(&ir, "Ping", &json!({"note": "hi"})).unwrap_err();
        assert!(matches!(err, SbeError::Codec(CodecError::MissingValue(ref path)) if path == "Ping.seq"));
    }
}
