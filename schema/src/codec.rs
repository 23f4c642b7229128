//! Layout-driven encoding and decoding of [`Value`]s.
//!
//! Decoding a body reads the fixed block at the block start, then jumps to
//! block start + acting block length before the groups and var-data. A newer
//! sender's extra trailing fields are skipped that way, and fields of this
//! schema that lie beyond an older sender's block are left out of the result.

use std::collections::HashMap;

use crate::bb::{ByteBuffer, ByteBufferMut};
use crate::error::{CodecError, IrError};
use crate::ir::Ir;
use crate::layout::{
    message_layout, BodyLayout, CompositeLayout, EnumLayout, FieldKind, FieldLayout, GroupLayout,
    HeaderLayout, HeaderSlot, MessageLayout, PrimitiveLayout, SetLayout, VarDataLayout,
};
use crate::primitive::PrimitiveValue;
use crate::token::Token;
use crate::value::Value;

/// Values read from a message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub block_length: u64,
    pub template_id: u64,
    pub schema_id: u64,
    pub version: u64,
}

impl MessageHeader {
    /// Reads a header at the start of `bytes`.
    pub fn decode(header: &HeaderLayout, bytes: &[u8]) -> Result<MessageHeader, CodecError> {
        let mut bb = ByteBuffer::new(bytes);
        Ok(MessageHeader {
            block_length: read_slot(&mut bb, 0, &header.block_length, "header.blockLength")?,
            template_id: read_slot(&mut bb, 0, &header.template_id, "header.templateId")?,
            schema_id: read_slot(&mut bb, 0, &header.schema_id, "header.schemaId")?,
            version: read_slot(&mut bb, 0, &header.version, "header.version")?,
        })
    }

    fn encode(&self, header: &HeaderLayout, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
        let base = bb.len();
        bb.pad_to(base + header.encoded_length());
        put_slot(bb, base, &header.block_length, self.block_length, "header.blockLength")?;
        put_slot(bb, base, &header.template_id, self.template_id, "header.templateId")?;
        put_slot(bb, base, &header.schema_id, self.schema_id, "header.schemaId")?;
        put_slot(bb, base, &header.version, self.version, "header.version")
    }
}

/// Encoder and decoder for one message of an [`Ir`].
///
/// ```
/// use brine_sbe_schema::*;
///
/// let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
///     .add_message(MessageDef::new("Ping", 5).field(FieldDef::primitive("seq", 1, PrimitiveType::Uint32)))
///     .build();
/// let codec = MessageCodec::new(&ir, "Ping").unwrap();
///
/// let value = Value::object("Ping", [("seq", Value::UInt(42))]);
/// let bytes = codec.encode(&value).unwrap();
/// assert_eq!(bytes, [4, 0, 5, 0, 1, 0, 0, 0, 42, 0, 0, 0]);
/// assert_eq!(codec.decode(&bytes).unwrap(), value);
/// ```
pub struct MessageCodec<'a> {
    header: HeaderLayout<'a>,
    message: MessageLayout<'a>,
    schema_id: i32,
    version: i32,
}

impl<'a> MessageCodec<'a> {
    pub fn new(ir: &'a Ir, message_name: &str) -> Result<MessageCodec<'a>, CodecError> {
        let tokens = ir
            .message_by_name(message_name)
            .ok_or_else(|| IrError::UnknownMessage(message_name.to_owned()))?;
        MessageCodec::from_tokens(ir, tokens)
    }

    pub fn for_template(ir: &'a Ir, template_id: u64) -> Result<MessageCodec<'a>, CodecError> {
        let tokens = i32::try_from(template_id)
            .ok()
            .and_then(|id| ir.message_by_id(id))
            .ok_or(IrError::UnknownTemplate(template_id))?;
        MessageCodec::from_tokens(ir, tokens)
    }

    /// Picks the codec for whichever message the header at the start of
    /// `bytes` names.
    pub fn for_buffer(ir: &'a Ir, bytes: &[u8]) -> Result<MessageCodec<'a>, CodecError> {
        let header = HeaderLayout::new(&ir.header_structure)?;
        let decoded = MessageHeader::decode(&header, bytes)?;
        MessageCodec::for_template(ir, decoded.template_id)
    }

    fn from_tokens(ir: &'a Ir, tokens: &'a [Token]) -> Result<MessageCodec<'a>, CodecError> {
        Ok(MessageCodec {
            header: HeaderLayout::new(&ir.header_structure)?,
            message: message_layout(tokens)?,
            schema_id: ir.id,
            version: ir.version,
        })
    }

    pub fn layout(&self) -> &MessageLayout<'a> {
        &self.message
    }

    pub fn header_layout(&self) -> &HeaderLayout<'a> {
        &self.header
    }

    /// Encodes the message header followed by the body.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut bb = ByteBufferMut::new();
        MessageHeader {
            block_length: self.message.block_length() as u64,
            template_id: self.message.id as u64,
            schema_id: self.schema_id as u64,
            version: self.version as u64,
        }
        .encode(&self.header, &mut bb)?;
        encode_body(&self.message.body, value, self.message.name, &mut bb)?;
        Ok(bb.data())
    }

    /// Encodes the body only, without a message header.
    pub fn encode_body(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut bb = ByteBufferMut::new();
        encode_body(&self.message.body, value, self.message.name, &mut bb)?;
        Ok(bb.data())
    }

    /// Decodes a header and body, using the header's block length as the
    /// acting block length.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value<'a>, CodecError> {
        let header = MessageHeader::decode(&self.header, bytes)?;
        if header.template_id != self.message.id as u64 {
            return Err(CodecError::TemplateMismatch {
                message: self.message.name.to_owned(),
                expected: self.message.id,
                found: header.template_id,
            });
        }

        let mut bb = ByteBuffer::new(bytes);
        bb.seek(self.header.encoded_length())
            .map_err(|e| e.at(self.message.name))?;
        decode_body(
            &self.message.body,
            header.block_length as usize,
            self.message.name,
            self.message.name,
            &mut bb,
        )
    }

    /// Decodes a body written with `acting_block_length` bytes of fixed fields.
    pub fn decode_body(&self, bytes: &[u8], acting_block_length: usize) -> Result<Value<'a>, CodecError> {
        let mut bb = ByteBuffer::new(bytes);
        decode_body(
            &self.message.body,
            acting_block_length,
            self.message.name,
            self.message.name,
            &mut bb,
        )
    }
}

fn child(path: &str, name: &str) -> String {
    format!("{}.{}", path, name)
}

fn read_slot(bb: &mut ByteBuffer, base: usize, slot: &HeaderSlot, path: &str) -> Result<u64, CodecError> {
    bb.seek(base + slot.offset).map_err(|e| e.at(path))?;
    bb.read_unsigned(slot.primitive_type, slot.byte_order)
        .map_err(|e| e.at(path))?
        .ok_or_else(|| CodecError::TypeMismatch {
            path: path.to_owned(),
            expected: "a non-negative length".to_owned(),
        })
}

fn put_slot(bb: &mut ByteBufferMut, base: usize, slot: &HeaderSlot, value: u64, path: &str) -> Result<(), CodecError> {
    bb.put_primitive(base + slot.offset, slot.primitive_type, slot.byte_order, &PrimitiveValue::UInt(value))
        .map_err(|_| out_of_range(path, value, slot.primitive_type.name()))
}

fn out_of_range(path: &str, value: impl ToString, primitive: &str) -> CodecError {
    CodecError::OutOfRange {
        path: path.to_owned(),
        value: value.to_string(),
        primitive: primitive.to_owned(),
    }
}

fn mismatch(path: &str, expected: &str) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_owned(),
        expected: expected.to_owned(),
    }
}

// Encoding

fn encode_body(body: &BodyLayout, value: &Value, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    if !matches!(value, Value::Object(..)) {
        return Err(mismatch(path, "an object"));
    }

    let base = bb.len();
    bb.pad_to(base + body.block_length());
    encode_fields(body.fields(), base, value, path, bb)?;

    for group in body.groups() {
        encode_group(group, value.get(group.name), &child(path, group.name), bb)?;
    }

    for var_data in body.var_data() {
        encode_var_data(var_data, value.get(var_data.name), &child(path, var_data.name), bb)?;
    }

    Ok(())
}

fn encode_fields<'f, 'a: 'f>(
    fields: impl Iterator<Item = &'f FieldLayout<'a>>,
    base: usize,
    value: &Value,
    path: &str,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    for field in fields {
        let field_path = child(path, field.name);
        encode_field(field, value.get(field.name), base + field.offset, &field_path, bb)?;
    }
    Ok(())
}

fn encode_field(
    field: &FieldLayout,
    value: Option<&Value>,
    at: usize,
    path: &str,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    match field.kind {
        FieldKind::Primitive(ref p) if p.is_constant() => Ok(()),
        FieldKind::Primitive(ref p) => match value {
            Some(value) => put_primitive(p, value, at, path, bb),
            None if p.is_optional() => put_null(p, at, path, bb),
            None => Err(CodecError::MissingValue(path.to_owned())),
        },
        FieldKind::Composite(ref composite) => {
            let value = value.ok_or_else(|| CodecError::MissingValue(path.to_owned()))?;
            encode_composite(composite, value, at, path, bb)
        }
        FieldKind::Enum(ref layout) => {
            let value = value.ok_or_else(|| CodecError::MissingValue(path.to_owned()))?;
            put_enum(layout, value, at, path, bb)
        }
        FieldKind::Set(ref layout) => {
            let value = value.ok_or_else(|| CodecError::MissingValue(path.to_owned()))?;
            put_set(layout, value, at, path, bb)
        }
    }
}

fn encode_composite(
    composite: &CompositeLayout,
    value: &Value,
    at: usize,
    path: &str,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    if !matches!(value, Value::Object(..)) {
        return Err(mismatch(path, "an object"));
    }
    encode_fields(composite.members.iter(), at, value, path, bb)
}

fn put_scalar(p: &PrimitiveLayout, value: &PrimitiveValue, at: usize, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    bb.put_primitive(at, p.primitive_type, p.byte_order, value)
        .map_err(|_| out_of_range(path, value, p.primitive_type.name()))
}

fn put_null(p: &PrimitiveLayout, at: usize, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let size = p.primitive_type.size();
    for i in 0..p.array_length {
        put_scalar(p, &p.null_value, at + i * size, path, bb)?;
    }
    Ok(())
}

fn put_primitive(p: &PrimitiveLayout, value: &Value, at: usize, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let size = p.primitive_type.size();

    if p.is_text() {
        let text = match value {
            Value::String(text) => encode_text(text, p.character_encoding, path)?,
            Value::Bytes(bytes) => bytes.clone(),
            _ => return Err(mismatch(path, "a string")),
        };
        if text.len() > p.array_length {
            return Err(out_of_range(path, format!("{} bytes", text.len()), &format!("char[{}]", p.array_length)));
        }
        // Unused trailing bytes stay zero from the block reservation.
        for (i, byte) in text.iter().enumerate() {
            put_scalar(p, &PrimitiveValue::UInt(*byte as u64), at + i, path, bb)?;
        }
        return Ok(());
    }

    if p.is_array() {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(mismatch(path, "an array")),
        };
        if items.len() != p.array_length {
            return Err(mismatch(path, &format!("{} elements", p.array_length)));
        }
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", path, i);
            let literal = item.to_primitive().ok_or_else(|| mismatch(&item_path, "a number"))?;
            put_scalar(p, &literal, at + i * size, &item_path, bb)?;
        }
        return Ok(());
    }

    let literal = value.to_primitive().ok_or_else(|| mismatch(path, "a number"))?;
    put_scalar(p, &literal, at, path, bb)
}

fn put_enum(layout: &EnumLayout, value: &Value, at: usize, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let name = match value {
        Value::Enum(_, name) => *name,
        Value::String(name) => name.as_str(),
        _ => return Err(mismatch(path, &format!("a {} value", layout.type_name))),
    };

    let raw = if name == EnumLayout::NULL_NAME {
        &layout.null_value
    } else {
        layout
            .by_name(name)
            .map(|v| v.value)
            .ok_or_else(|| CodecError::UnknownEnumValue {
                path: path.to_owned(),
                enum_name: layout.type_name.to_owned(),
                raw: name.to_owned(),
            })?
    };

    bb.put_primitive(at, layout.encoding, layout.byte_order, raw)
        .map_err(|_| out_of_range(path, raw, layout.encoding.name()))
}

fn put_set(layout: &SetLayout, value: &Value, at: usize, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let choices = match value {
        Value::Set(_, choices) => choices,
        _ => return Err(mismatch(path, &format!("a {} set", layout.type_name))),
    };

    let mut bits = 0u64;
    for choice in choices {
        let found = layout
            .choices
            .iter()
            .find(|c| c.name == *choice)
            .ok_or_else(|| CodecError::UnknownChoice {
                path: path.to_owned(),
                set_name: layout.type_name.to_owned(),
                choice: (*choice).to_owned(),
            })?;
        bits |= 1 << found.bit;
    }

    let raw = PrimitiveValue::UInt(bits);
    bb.put_primitive(at, layout.encoding, layout.byte_order, &raw)
        .map_err(|_| out_of_range(path, bits, layout.encoding.name()))
}

fn encode_group(group: &GroupLayout, value: Option<&Value>, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let elements = match value {
        Some(Value::Array(elements)) => elements.as_slice(),
        Some(_) => return Err(mismatch(path, "an array of group elements")),
        None => return Err(CodecError::MissingValue(path.to_owned())),
    };

    let base = bb.len();
    let dimension = &group.dimension;
    bb.pad_to(base + dimension.encoded_length);
    put_slot(bb, base, &dimension.block_length, group.block_length() as u64, path)?;
    put_slot(bb, base, &dimension.num_in_group, elements.len() as u64, path)?;

    for (i, element) in elements.iter().enumerate() {
        encode_body(&group.body, element, &format!("{}[{}]", path, i), bb)?;
    }
    Ok(())
}

fn encode_var_data(var_data: &VarDataLayout, value: Option<&Value>, path: &str, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let payload = match value {
        Some(Value::String(text)) => encode_text(text, var_data.character_encoding, path)?,
        Some(Value::Bytes(bytes)) => bytes.clone(),
        Some(_) => return Err(mismatch(path, "a string or bytes")),
        None => return Err(CodecError::MissingValue(path.to_owned())),
    };

    let base = bb.len();
    bb.pad_to(base + var_data.length.offset + var_data.length.width());
    put_slot(bb, base, &var_data.length, payload.len() as u64, path)?;
    bb.write_bytes(&payload);
    Ok(())
}

fn is_ascii_encoding(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("ASCII") || encoding.eq_ignore_ascii_case("US-ASCII")
}

fn is_latin1_encoding(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("ISO-8859-1") || encoding.eq_ignore_ascii_case("latin1")
}

fn encode_text(text: &str, encoding: Option<&str>, path: &str) -> Result<Vec<u8>, CodecError> {
    let invalid = |encoding: &str| CodecError::InvalidText {
        path: path.to_owned(),
        encoding: encoding.to_owned(),
    };
    match encoding {
        Some(e) if is_ascii_encoding(e) => {
            if text.is_ascii() {
                Ok(text.as_bytes().to_vec())
            } else {
                Err(invalid(e))
            }
        }
        Some(e) if is_latin1_encoding(e) => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| invalid(e)))
            .collect(),
        _ => Ok(text.as_bytes().to_vec()),
    }
}

/// Text for a declared character encoding, or `None` when the encoding is not
/// one the codec interprets and the payload should stay raw bytes.
fn decode_text(bytes: &[u8], encoding: &str, path: &str) -> Result<Option<String>, CodecError> {
    let invalid = || CodecError::InvalidText {
        path: path.to_owned(),
        encoding: encoding.to_owned(),
    };
    if is_ascii_encoding(encoding) {
        if !bytes.is_ascii() {
            return Err(invalid());
        }
        return Ok(Some(String::from_utf8_lossy(bytes).into_owned()));
    }
    if is_latin1_encoding(encoding) {
        return Ok(Some(bytes.iter().map(|b| char::from(*b)).collect()));
    }
    if encoding.eq_ignore_ascii_case("UTF-8") || encoding.eq_ignore_ascii_case("UTF8") {
        return String::from_utf8(bytes.to_vec()).map(Some).map_err(|_| invalid());
    }
    Ok(None)
}

// Decoding

fn decode_body<'a>(
    body: &BodyLayout<'a>,
    acting_block_length: usize,
    name: &'a str,
    path: &str,
    bb: &mut ByteBuffer,
) -> Result<Value<'a>, CodecError> {
    let base = bb.index();
    let mut fields = HashMap::new();

    for field in body.fields() {
        if field.is_constant() || field.end() <= acting_block_length {
            let field_path = child(path, field.name);
            if let Some(value) = decode_field(field, base + field.offset, &field_path, bb)? {
                fields.insert(field.name, value);
            }
        }
    }

    bb.seek(base + acting_block_length).map_err(|e| e.at(path))?;

    for group in body.groups() {
        let value = decode_group(group, &child(path, group.name), bb)?;
        fields.insert(group.name, value);
    }

    for var_data in body.var_data() {
        let value = decode_var_data(var_data, &child(path, var_data.name), bb)?;
        fields.insert(var_data.name, value);
    }

    Ok(Value::Object(name, fields))
}

fn decode_field<'a>(
    field: &FieldLayout<'a>,
    at: usize,
    path: &str,
    bb: &mut ByteBuffer,
) -> Result<Option<Value<'a>>, CodecError> {
    match field.kind {
        FieldKind::Primitive(ref p) => decode_primitive(p, at, path, bb),
        FieldKind::Composite(ref composite) => decode_composite(composite, at, path, bb).map(Some),
        FieldKind::Enum(ref layout) => decode_enum(layout, at, path, bb).map(Some),
        FieldKind::Set(ref layout) => decode_set(layout, at, path, bb).map(Some),
    }
}

fn decode_composite<'a>(
    composite: &CompositeLayout<'a>,
    at: usize,
    path: &str,
    bb: &mut ByteBuffer,
) -> Result<Value<'a>, CodecError> {
    let mut members = HashMap::new();
    for member in &composite.members {
        let member_path = child(path, member.name);
        if let Some(value) = decode_field(member, at + member.offset, &member_path, bb)? {
            members.insert(member.name, value);
        }
    }
    Ok(Value::Object(composite.type_name, members))
}

fn read_scalar(p: &PrimitiveLayout, at: usize, path: &str, bb: &mut ByteBuffer) -> Result<PrimitiveValue, CodecError> {
    bb.seek(at).map_err(|e| e.at(path))?;
    bb.read_primitive(p.primitive_type, p.byte_order).map_err(|e| e.at(path))
}

fn decode_primitive<'a>(
    p: &PrimitiveLayout<'a>,
    at: usize,
    path: &str,
    bb: &mut ByteBuffer,
) -> Result<Option<Value<'a>>, CodecError> {
    if let Some(constant) = p.const_value.filter(|_| p.is_constant()) {
        return Ok(Some(Value::from_primitive(constant)));
    }

    if p.is_text() {
        bb.seek(at).map_err(|e| e.at(path))?;
        let raw = bb.read_bytes(p.array_length).map_err(|e| e.at(path))?;
        let used = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let encoding = p.character_encoding.unwrap_or("US-ASCII");
        return Ok(Some(match decode_text(&raw[..used], encoding, path)? {
            Some(text) => Value::String(text),
            None => Value::Bytes(raw[..used].to_vec()),
        }));
    }

    let size = p.primitive_type.size();
    if p.is_array() {
        let mut items = Vec::with_capacity(p.array_length);
        for i in 0..p.array_length {
            let item = read_scalar(p, at + i * size, &format!("{}[{}]", path, i), bb)?;
            items.push(Value::from_primitive(&item));
        }
        return Ok(Some(Value::Array(items)));
    }

    let raw = read_scalar(p, at, path, bb)?;
    if p.is_optional() && raw.matches(&p.null_value) {
        return Ok(None);
    }
    Ok(Some(Value::from_primitive(&raw)))
}

fn decode_enum<'a>(layout: &EnumLayout<'a>, at: usize, path: &str, bb: &mut ByteBuffer) -> Result<Value<'a>, CodecError> {
    bb.seek(at).map_err(|e| e.at(path))?;
    let raw = bb.read_primitive(layout.encoding, layout.byte_order).map_err(|e| e.at(path))?;
    match layout.by_value(&raw) {
        Some(v) => Ok(Value::Enum(layout.type_name, v.name)),
        None if raw.matches(&layout.null_value) => Ok(Value::Enum(layout.type_name, EnumLayout::NULL_NAME)),
        None => Err(CodecError::UnknownEnumValue {
            path: path.to_owned(),
            enum_name: layout.type_name.to_owned(),
            raw: raw.to_string(),
        }),
    }
}

fn decode_set<'a>(layout: &SetLayout<'a>, at: usize, path: &str, bb: &mut ByteBuffer) -> Result<Value<'a>, CodecError> {
    bb.seek(at).map_err(|e| e.at(path))?;
    let bits = bb
        .read_unsigned(layout.encoding, layout.byte_order)
        .map_err(|e| e.at(path))?
        .unwrap_or(0);
    let choices = layout
        .choices
        .iter()
        .filter(|c| bits & (1 << c.bit) != 0)
        .map(|c| c.name)
        .collect();
    Ok(Value::Set(layout.type_name, choices))
}

fn decode_group<'a>(group: &GroupLayout<'a>, path: &str, bb: &mut ByteBuffer) -> Result<Value<'a>, CodecError> {
    let base = bb.index();
    let dimension = &group.dimension;
    let block_length = read_slot(bb, base, &dimension.block_length, path)?;
    let count = read_slot(bb, base, &dimension.num_in_group, path)?;
    bb.seek(base + dimension.encoded_length).map_err(|e| e.at(path))?;

    // Counts are bounded by the bytes left, at one byte per element minimum.
    let remaining = bb.remaining();
    let element_length = block_length
        .saturating_add(group.body.trailer_length() as u64)
        .max(1);
    let fits = count
        .checked_mul(element_length)
        .is_some_and(|total| total <= remaining as u64);
    if !fits {
        return Err(CodecError::GroupOverrun {
            path: path.to_owned(),
            offset: base,
            count,
            block_length,
            element_length,
            remaining,
        });
    }

    let mut elements = Vec::with_capacity(count.min(remaining as u64) as usize);
    for i in 0..count {
        let element_path = format!("{}[{}]", path, i);
        elements.push(decode_body(&group.body, block_length as usize, group.name, &element_path, bb)?);
    }
    Ok(Value::Array(elements))
}

fn decode_var_data<'a>(var_data: &VarDataLayout<'a>, path: &str, bb: &mut ByteBuffer) -> Result<Value<'a>, CodecError> {
    let base = bb.index();
    let len = read_slot(bb, base, &var_data.length, path)?;
    bb.seek(base + var_data.length.offset + var_data.length.width())
        .map_err(|e| e.at(path))?;

    let len = usize::try_from(len).map_err(|_| out_of_range(path, len, "usize"))?;
    let payload = bb.read_bytes(len).map_err(|e| e.at(path))?;

    if let Some(encoding) = var_data.character_encoding {
        if let Some(text) = decode_text(payload, encoding, path)? {
            return Ok(Value::String(text));
        }
    }
    Ok(Value::Bytes(payload.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FieldDef, GroupDef, IrBuilder, MessageDef, TypeDef, VarDataDef};
    use crate::primitive::{ByteOrder, PrimitiveType};

    fn scenario(order: ByteOrder) -> Ir {
        IrBuilder::new(1, 0, order)
            .add_message(
                MessageDef::new("Order", 3)
                    .block_length(12)
                    .field(FieldDef::primitive("quantity", 1, PrimitiveType::Uint32))
                    .group(GroupDef::new("fills", 2).field(FieldDef::primitive("value", 3, PrimitiveType::Int32)))
                    .var_data(VarDataDef::text("note", 4)),
            )
            .build()
    }

    fn scenario_value() -> Value<'static> {
        Value::object(
            "Order",
            [
                ("quantity", Value::UInt(42)),
                (
                    "fills",
                    Value::Array(vec![
                        Value::object("fills", [("value", Value::Int(7))]),
                        Value::object("fills", [("value", Value::Int(-3))]),
                    ]),
                ),
                ("note", Value::String("ok".to_owned())),
            ],
        )
    }

    #[test]
    fn thirty_byte_body() {
        let ir = scenario(ByteOrder::LittleEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let body = codec.encode_body(&scenario_value()).unwrap();

        assert_eq!(
            body,
            vec![
                42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // block
                4, 0, 2, 0, // dimensions
                7, 0, 0, 0, 0xfd, 0xff, 0xff, 0xff, // elements
                2, 0, 0, 0, b'o', b'k', // var-data
            ]
        );
        assert_eq!(codec.decode_body(&body, 12).unwrap(), scenario_value());

        let message = codec.encode(&scenario_value()).unwrap();
        assert_eq!(message.len(), 38);
        assert_eq!(&message[..8], &[12, 0, 3, 0, 1, 0, 0, 0]);
        assert_eq!(codec.decode(&message).unwrap(), scenario_value());
    }

    #[test]
    fn big_endian_layout() {
        let ir = scenario(ByteOrder::BigEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let body = codec.encode_body(&scenario_value()).unwrap();
        assert_eq!(&body[..4], &[0, 0, 0, 42]);
        assert_eq!(&body[12..16], &[0, 4, 0, 2]);

        let little_ir = scenario(ByteOrder::LittleEndian);
        let little = MessageCodec::new(&little_ir, "Order").unwrap();
        assert!(matches!(
            little.decode_body(&body, 12),
            Err(CodecError::GroupOverrun { count: 512, block_length: 1024, .. })
        ));
    }

    #[test]
    fn group_overrun_reports_path() {
        let ir = scenario(ByteOrder::LittleEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let mut body = codec.encode_body(&scenario_value()).unwrap();
        body[14] = 200;

        match codec.decode_body(&body, 12) {
            Err(CodecError::GroupOverrun { path, offset, count, block_length, .. }) => {
                assert_eq!(path, "Order.fills");
                assert_eq!(offset, 12);
                assert_eq!(count, 200);
                assert_eq!(block_length, 4);
            }
            other => panic!("expected overrun, got {:?}", other),
        }
    }

    #[test]
    fn truncated_var_data() {
        let ir = scenario(ByteOrder::LittleEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let body = codec.encode_body(&scenario_value()).unwrap();

        match codec.decode_body(&body[..29], 12) {
            Err(CodecError::OutOfBounds { path, offset, needed, len }) => {
                assert_eq!(path, "Order.note");
                assert_eq!((offset, needed, len), (28, 2, 29));
            }
            other => panic!("expected out of bounds, got {:?}", other),
        }
    }

    #[test]
    fn template_mismatch() {
        let ir = scenario(ByteOrder::LittleEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let mut message = codec.encode(&scenario_value()).unwrap();
        message[2] = 9;
        assert!(matches!(
            codec.decode(&message),
            Err(CodecError::TemplateMismatch { expected: 3, found: 9, .. })
        ));
        assert!(matches!(
            MessageCodec::for_buffer(&ir, &message),
            Err(CodecError::Ir(IrError::UnknownTemplate(9)))
        ));
    }

    #[test]
    fn enums_sets_and_optionals() {
        let side = TypeDef::enumeration("Side", PrimitiveType::Uint8, &[("BUY", 1), ("SELL", 2)]);
        let flags = TypeDef::set("Flags", PrimitiveType::Uint16, &[("a", 0), ("b", 9)]);
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(side.clone())
            .add_type(flags.clone())
            .add_message(
                MessageDef::new("M", 1)
                    .field(FieldDef::new("side", 1, side))
                    .field(FieldDef::new("flags", 2, flags))
                    .field(FieldDef::new("maybe", 3, TypeDef::primitive("int32", PrimitiveType::Int32).optional())),
            )
            .build();
        let codec = MessageCodec::new(&ir, "M").unwrap();

        let value = Value::object(
            "M",
            [("side", Value::Enum("Side", "SELL")), ("flags", Value::Set("Flags", vec!["a", "b"]))],
        );
        let body = codec.encode_body(&value).unwrap();
        assert_eq!(body, vec![2, 0x01, 0x02, 0x00, 0x00, 0x00, 0x80]);
        assert_eq!(codec.decode_body(&body, 7).unwrap(), value);

        let mut unknown = body.clone();
        unknown[0] = 9;
        assert!(matches!(
            codec.decode_body(&unknown, 7),
            Err(CodecError::UnknownEnumValue { ref raw, .. }) if raw == "9"
        ));

        unknown[0] = 255;
        assert_eq!(codec.decode_body(&unknown, 7).unwrap()["side"], Value::Enum("Side", "NULL_VAL"));
    }

    #[test]
    fn char_array_text() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_message(MessageDef::new("M", 1).field(FieldDef::new(
                "symbol",
                1,
                TypeDef::primitive("char", PrimitiveType::Char).array(6),
            )))
            .build();
        let codec = MessageCodec::new(&ir, "M").unwrap();

        let value = Value::object("M", [("symbol", Value::String("IBM".to_owned()))]);
        let body = codec.encode_body(&value).unwrap();
        assert_eq!(body, b"IBM\0\0\0".to_vec());
        assert_eq!(codec.decode_body(&body, 6).unwrap(), value);

        let long = Value::object("M", [("symbol", Value::String("TOOLONG".to_owned()))]);
        assert!(matches!(codec.encode_body(&long), Err(CodecError::OutOfRange { .. })));
    }

    #[test]
    fn missing_required_field() {
        let ir = scenario(ByteOrder::LittleEndian);
        let codec = MessageCodec::new(&ir, "Order").unwrap();
        let mut value = scenario_value();
        value.remove("quantity");
        assert_eq!(
            codec.encode_body(&value),
            Err(CodecError::MissingValue("Order.quantity".to_owned()))
        );
    }
}
