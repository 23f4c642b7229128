use std::collections::BTreeMap;

use brine_sbe_schema::{
    BodyLayout, ByteOrder, CompositeLayout, EnumLayout, FieldKind, FieldLayout, HeaderSlot, MessageLayout,
    PrimitiveKind, PrimitiveLayout, PrimitiveType, PrimitiveValue, SchemaLayout, SetLayout,
};

use crate::{
    error::SbeError,
    generator::{body_types, field_types, offset_expr, TypeRef},
    keywords::{KeywordPolicy, Namer},
    naming::quote,
    traits::{CodeGenerator, GeneratedUnit, Language},
};

const FILE_HEADER: &str = "# Generated SBE (Simple Binary Encoding) codec. Do not edit.";

/// Renders dataclasses that pack and unpack themselves with the `struct`
/// module.
#[derive(Debug, Clone, Default)]
pub struct PythonGenerator {
    policy: KeywordPolicy,
}

fn format_char(primitive: PrimitiveType) -> char {
    match primitive {
        PrimitiveType::Char | PrimitiveType::Uint8 => 'B',
        PrimitiveType::Int8 => 'b',
        PrimitiveType::Int16 => 'h',
        PrimitiveType::Int32 => 'i',
        PrimitiveType::Int64 => 'q',
        PrimitiveType::Uint16 => 'H',
        PrimitiveType::Uint32 => 'I',
        PrimitiveType::Uint64 => 'Q',
        PrimitiveType::Float => 'f',
        PrimitiveType::Double => 'd',
    }
}

/// A quoted `struct` format string such as `"<H"` or `"<4i"`.
fn format_string(primitive: PrimitiveType, order: ByteOrder, count: usize) -> String {
    let prefix = match order {
        ByteOrder::LittleEndian => '<',
        ByteOrder::BigEndian => '>',
    };
    match count {
        1 => format!("\"{}{}\"", prefix, format_char(primitive)),
        n => format!("\"{}{}{}\"", prefix, n, format_char(primitive)),
    }
}

fn unpack(primitive: PrimitiveType, order: ByteOrder, at: &str) -> String {
    format!("struct.unpack_from({}, buf, {})[0]", format_string(primitive, order, 1), at)
}

fn pack(primitive: PrimitiveType, order: ByteOrder, buf: &str, at: &str, value: &str) -> String {
    format!("struct.pack_into({}, {}, {}, {})", format_string(primitive, order, 1), buf, at, value)
}

fn slot_unpack(slot: &HeaderSlot, base: &str) -> String {
    unpack(slot.primitive_type, slot.byte_order, &offset_expr(base, slot.offset))
}

fn slot_pack(slot: &HeaderSlot, buf: &str, base: &str, value: &str) -> String {
    pack(slot.primitive_type, slot.byte_order, buf, &offset_expr(base, slot.offset), value)
}

fn py_type(primitive: PrimitiveType) -> &'static str {
    match primitive.kind() {
        PrimitiveKind::Float => "float",
        _ => "int",
    }
}

fn literal(value: &PrimitiveValue, primitive: PrimitiveType) -> String {
    match primitive.kind() {
        PrimitiveKind::Float => match value.as_f64() {
            Some(v) if v.is_nan() => "math.nan".to_string(),
            Some(v) if v.is_infinite() && v > 0.0 => "math.inf".to_string(),
            Some(v) if v.is_infinite() => "-math.inf".to_string(),
            Some(v) => format!("{:?}", v),
            None => "0.0".to_string(),
        },
        PrimitiveKind::Signed => value.as_i64().unwrap_or(0).to_string(),
        PrimitiveKind::Unsigned | PrimitiveKind::Char => match value.as_bytes() {
            Some(bytes) => bytes.first().copied().unwrap_or(0).to_string(),
            None => value.as_u64().unwrap_or(0).to_string(),
        },
    }
}

#[derive(Default)]
struct Block {
    members: Vec<String>,
    consts: Vec<String>,
    encode: Vec<String>,
    reads: Vec<FieldRead>,
}

/// A keyword argument read from the buffer, with the value used when the
/// field lies past the acting block length.
struct FieldRead {
    name: String,
    end: usize,
    read: String,
    null: String,
}

impl Block {
    fn push_read(&mut self, name: &str, field: &FieldLayout, read: String, null: String) {
        self.reads.push(FieldRead {
            name: name.to_string(),
            end: field.end(),
            read,
            null,
        });
    }

    fn decode(&self) -> Vec<String> {
        self.reads.iter().map(|f| format!("{}={},", f.name, f.read)).collect()
    }

    fn decode_within(&self, block_length: &str) -> Vec<String> {
        self.reads
            .iter()
            .map(|f| format!("{}={} if {} >= {} else {},", f.name, f.read, block_length, f.end, f.null))
            .collect()
    }

    fn nulls(&self) -> Vec<String> {
        self.reads.iter().map(|f| format!("{}={},", f.name, f.null)).collect()
    }
}

fn indent(lines: &[String], depth: usize) -> impl Iterator<Item = String> + '_ {
    let pad = "    ".repeat(depth);
    lines.iter().map(move |line| if line.is_empty() { String::new() } else { format!("{}{}", pad, line) })
}

impl PythonGenerator {
    pub fn new(policy: KeywordPolicy) -> Self {
        PythonGenerator { policy }
    }

    fn namer(&self) -> Namer<'_> {
        Namer::new(Language::Python, &self.policy)
    }

    fn unit(&self, name: &str, types: &BTreeMap<&str, TypeRef>, body: Vec<String>) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let mut code = vec![
            FILE_HEADER.to_string(),
            "from __future__ import annotations".to_string(),
            String::new(),
            "import enum".to_string(),
            "import math".to_string(),
            "import struct".to_string(),
            "from dataclasses import dataclass, field".to_string(),
            "from typing import List".to_string(),
            String::new(),
            "from .runtime import DecodeError, EncodeError, check_bounds, check_group, decode_text, read_chars, write_chars"
                .to_string(),
        ];
        for type_name in types.keys() {
            code.push(format!(
                "from .{} import {}",
                namer.module(type_name)?,
                namer.type_name(type_name)?
            ));
        }
        code.push(String::new());
        code.push(String::new());
        code.extend(body);
        Ok(GeneratedUnit::new(format!("{}.py", namer.module(name)?), code.join("\n")))
    }

    fn render_fields(&self, fields: &[&FieldLayout], base: &str) -> Result<Block, SbeError> {
        let namer = self.namer();
        let mut block = Block::default();

        for field in fields {
            let name = namer.member(field.name)?;
            let at = offset_expr(base, field.offset);

            match field.kind {
                FieldKind::Primitive(ref prim) => self.render_primitive(&mut block, field, &name, &at, prim)?,
                FieldKind::Composite(ref composite) => {
                    let ty = namer.type_name(composite.type_name)?;
                    block.members.push(format!("{}: {} = field(default_factory={})", name, ty, ty));
                    block.encode.push(format!("self.{}.encode(buf, {})", name, at));
                    block.push_read(&name, field, format!("{}.decode(buf, {})", ty, at), format!("{}.null()", ty));
                }
                FieldKind::Enum(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    let null = format!("{}.{}", ty, namer.variant(EnumLayout::NULL_NAME)?);
                    block.members.push(format!("{}: {} = {}", name, ty, null));
                    block.encode.push(pack(layout.encoding, layout.byte_order, "buf", &at, &format!("int(self.{})", name)));
                    let read = format!("{}.from_raw({})", ty, unpack(layout.encoding, layout.byte_order, &at));
                    block.push_read(&name, field, read, null);
                }
                FieldKind::Set(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    block.members.push(format!("{}: {} = field(default_factory={})", name, ty, ty));
                    block.encode.push(pack(layout.encoding, layout.byte_order, "buf", &at, &format!("self.{}.bits", name)));
                    let read = format!("{}({})", ty, unpack(layout.encoding, layout.byte_order, &at));
                    block.push_read(&name, field, read, format!("{}()", ty));
                }
            }
        }

        Ok(block)
    }

    fn render_primitive(
        &self,
        block: &mut Block,
        field: &FieldLayout,
        name: &str,
        at: &str,
        prim: &PrimitiveLayout,
    ) -> Result<(), SbeError> {
        let constant = self.namer().constant(field.name)?;
        let order = prim.byte_order;

        if prim.is_constant() {
            let value = prim.const_value.cloned().unwrap_or_else(|| PrimitiveValue::UInt(0));
            let text = match value.as_bytes() {
                Some(bytes) if prim.is_array() || bytes.len() > 1 => quote(&String::from_utf8_lossy(bytes)),
                _ => literal(&value, prim.primitive_type),
            };
            block.consts.push(format!("{} = {}", constant, text));
            return Ok(());
        }

        if prim.is_optional() {
            block
                .consts
                .push(format!("{}_NULL_VALUE = {}", constant, literal(&prim.null_value, prim.primitive_type)));
        }

        let null = literal(&prim.null_value, prim.primitive_type);
        if !prim.is_array() {
            let ty = py_type(prim.primitive_type);
            let zero = if ty == "float" { "0.0" } else { "0" };
            block.members.push(format!("{}: {} = {}", name, ty, zero));
            block.encode.push(pack(prim.primitive_type, order, "buf", at, &format!("self.{}", name)));
            block.push_read(name, field, unpack(prim.primitive_type, order, at), null);
            return Ok(());
        }

        let len = prim.array_length;
        if prim.primitive_type == PrimitiveType::Char {
            block.members.push(format!("{}: str = \"\"", name));
            block.encode.push(format!("write_chars(buf, {}, {}, self.{}, {})", at, len, name, quote(field.name)));
            block.push_read(name, field, format!("read_chars(buf, {}, {})", at, len), "\"\"".to_string());
            return Ok(());
        }

        let fmt = format_string(prim.primitive_type, order, len);
        block.members.push(format!(
            "{}: List[{}] = field(default_factory=lambda: [0] * {})",
            name,
            py_type(prim.primitive_type),
            len
        ));
        block.encode.push(format!("struct.pack_into({}, buf, {}, *self.{})", fmt, at, name));
        block.push_read(
            name,
            field,
            format!("list(struct.unpack_from({}, buf, {}))", fmt, at),
            format!("[{}] * {}", null, len),
        );
        Ok(())
    }

    fn render_body(
        &self,
        schema: &SchemaLayout,
        class_name: &str,
        path: &str,
        body: &BodyLayout,
        message: Option<&MessageLayout>,
        code: &mut Vec<String>,
    ) -> Result<(), SbeError> {
        let namer = self.namer();
        let fields: Vec<&FieldLayout> = body.fields().collect();
        let block = self.render_fields(&fields, "offset")?;

        let mut groups = Vec::new();
        for group in body.groups() {
            let ty = format!("{}{}", class_name, namer.type_name(group.name)?);
            groups.push((group, namer.member(group.name)?, ty));
        }
        let mut var_data = Vec::new();
        for data in body.var_data() {
            var_data.push((data, namer.member(data.name)?));
        }

        code.push("@dataclass".to_string());
        code.push(format!("class {}:", class_name));
        if let Some(description) = message.and_then(|m| m.description) {
            code.push(format!("    {}", quote(description)));
            code.push(String::new());
        }
        code.push(format!("    BLOCK_LENGTH = {}", body.block_length()));
        if let Some(message) = message {
            code.push(format!("    TEMPLATE_ID = {}", message.id));
            code.push(format!("    SCHEMA_ID = {}", schema.id));
            code.push(format!("    SCHEMA_VERSION = {}", schema.version));
        }
        code.extend(indent(&block.consts, 1));
        code.push(String::new());
        code.extend(indent(&block.members, 1));
        for (_, member, ty) in &groups {
            code.push(format!("    {}: List[{}] = field(default_factory=list)", member, ty));
        }
        for (data, member) in &var_data {
            if data.is_text() {
                code.push(format!("    {}: str = \"\"", member));
            } else {
                code.push(format!("    {}: bytes = b\"\"", member));
            }
        }
        code.push(String::new());

        if let Some(message) = message {
            self.render_message_entry(schema, message, class_name, code);
        }

        code.push("    def encode_body(self, out: bytearray) -> None:".to_string());
        code.push("        offset = len(out)".to_string());
        code.push("        out.extend(bytes(self.BLOCK_LENGTH))".to_string());
        if !block.encode.is_empty() {
            code.push("        buf = out".to_string());
            code.extend(indent(&block.encode, 2));
        }
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            code.push("        dim = len(out)".to_string());
            code.push(format!("        out.extend(bytes({}))", dim.encoded_length));
            code.push(format!("        {}", slot_pack(&dim.block_length, "out", "dim", &format!("{}.BLOCK_LENGTH", ty))));
            code.push(format!("        {}", slot_pack(&dim.num_in_group, "out", "dim", &format!("len(self.{})", member))));
            code.push(format!("        for item in self.{}:", member));
            code.push("            item.encode_body(out)".to_string());
        }
        for (data, member) in &var_data {
            let length = &data.length;
            match data.character_encoding {
                Some(encoding) if data.is_text() => {
                    code.push(format!("        data = self.{}.encode({})", member, quote(encoding)));
                }
                _ => code.push(format!("        data = bytes(self.{})", member)),
            }
            code.push(format!(
                "        out.extend(struct.pack({}, len(data)))",
                format_string(length.primitive_type, length.byte_order, 1)
            ));
            code.push("        out.extend(data)".to_string());
        }
        code.push(String::new());

        code.push("    @classmethod".to_string());
        code.push(format!(
            "    def decode_body(cls, buf, offset: int, block_length: int) -> tuple[{}, int]:",
            class_name
        ));
        code.push("        \"\"\"Returns the decoded value and the offset just past it.".to_string());
        code.push(String::new());
        code.push("        Fields past a shorter block take their null value.".to_string());
        code.push("        \"\"\"".to_string());
        code.push(format!(
            "        check_bounds(buf, offset, min(block_length, cls.BLOCK_LENGTH), {})",
            quote(path)
        ));
        code.push("        value = cls(".to_string());
        code.extend(indent(&block.decode_within("block_length"), 3));
        code.push("        )".to_string());
        code.push("        pos = offset + block_length".to_string());
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            let group_path = quote(&format!("{}.{}", path, group.name));
            code.push(format!("        check_bounds(buf, pos, {}, {})", dim.encoded_length, group_path));
            code.push(format!("        group_block_length = {}", slot_unpack(&dim.block_length, "pos")));
            code.push(format!("        count = {}", slot_unpack(&dim.num_in_group, "pos")));
            code.push(format!("        pos += {}", dim.encoded_length));
            code.push(format!(
                "        check_group(buf, pos, count, group_block_length + {}, {})",
                group.body.trailer_length(),
                group_path
            ));
            code.push("        for _ in range(count):".to_string());
            code.push(format!("            item, pos = {}.decode_body(buf, pos, group_block_length)", ty));
            code.push(format!("            value.{}.append(item)", member));
        }
        for (data, member) in &var_data {
            let data_path = quote(&format!("{}.{}", path, data.name));
            let length = &data.length;
            code.push(format!("        check_bounds(buf, pos, {}, {})", length.width(), data_path));
            code.push(format!("        length = {}", unpack(length.primitive_type, length.byte_order, "pos")));
            code.push(format!("        pos += {}", length.width()));
            code.push(format!("        check_bounds(buf, pos, length, {})", data_path));
            match data.character_encoding {
                Some(encoding) if data.is_text() => code.push(format!(
                    "        value.{} = decode_text(bytes(buf[pos:pos + length]), {}, {})",
                    member,
                    quote(encoding),
                    data_path
                )),
                _ => code.push(format!("        value.{} = bytes(buf[pos:pos + length])", member)),
            }
            code.push("        pos += length".to_string());
        }
        code.push("        return value, pos".to_string());

        for (group, _, ty) in &groups {
            code.push(String::new());
            code.push(String::new());
            self.render_body(schema, ty, &format!("{}.{}", path, group.name), &group.body, None, code)?;
        }
        Ok(())
    }

    fn render_message_entry(
        &self,
        schema: &SchemaLayout,
        message: &MessageLayout,
        class_name: &str,
        code: &mut Vec<String>,
    ) {
        let header = &schema.header;
        let header_length = header.encoded_length();

        code.push("    def encode(self) -> bytes:".to_string());
        code.push("        \"\"\"Encodes the message header followed by the body.\"\"\"".to_string());
        code.push(format!("        out = bytearray({})", header_length));
        for (slot, value) in [
            (&header.block_length, "self.BLOCK_LENGTH"),
            (&header.template_id, "self.TEMPLATE_ID"),
            (&header.schema_id, "self.SCHEMA_ID"),
            (&header.version, "self.SCHEMA_VERSION"),
        ] {
            code.push(format!(
                "        {}",
                pack(slot.primitive_type, slot.byte_order, "out", &slot.offset.to_string(), value)
            ));
        }
        code.push("        self.encode_body(out)".to_string());
        code.push("        return bytes(out)".to_string());
        code.push(String::new());

        code.push("    @classmethod".to_string());
        code.push(format!("    def decode(cls, buf) -> {}:", class_name));
        code.push(format!(
            "        check_bounds(buf, 0, {}, {})",
            header_length,
            quote(header.composite.type_name)
        ));
        code.push(format!("        template_id = {}", header_unpack(&header.template_id)));
        code.push("        if template_id != cls.TEMPLATE_ID:".to_string());
        code.push(format!(
            "            raise DecodeError(f\"{} has template id {{cls.TEMPLATE_ID}} but the header says {{template_id}}\")",
            message.name
        ));
        code.push(format!("        block_length = {}", header_unpack(&header.block_length)));
        code.push(format!("        return cls.decode_body(buf, {}, block_length)[0]", header_length));
        code.push(String::new());
    }
}

fn header_unpack(slot: &HeaderSlot) -> String {
    unpack(slot.primitive_type, slot.byte_order, &slot.offset.to_string())
}

impl CodeGenerator for PythonGenerator {
    fn language(&self) -> Language {
        Language::Python
    }

    fn render_composite(&self, _schema: &SchemaLayout, composite: &CompositeLayout) -> Result<GeneratedUnit, SbeError> {
        let name = self.namer().type_name(composite.type_name)?;
        let members: Vec<&FieldLayout> = composite.members.iter().collect();
        let block = self.render_fields(&members, "offset")?;
        let mut types = BTreeMap::new();
        field_types(&composite.members, &mut types);

        let mut code = vec!["@dataclass".to_string(), format!("class {}:", name)];
        if let Some(description) = composite.description {
            code.push(format!("    {}", quote(description)));
            code.push(String::new());
        }
        code.push(format!("    ENCODED_LENGTH = {}", composite.encoded_length));
        code.extend(indent(&block.consts, 1));
        code.push(String::new());
        code.extend(indent(&block.members, 1));
        code.push(String::new());
        code.push("    def encode(self, buf: bytearray, offset: int) -> None:".to_string());
        if block.encode.is_empty() {
            code.push("        pass".to_string());
        }
        code.extend(indent(&block.encode, 2));
        code.push(String::new());
        code.push("    @classmethod".to_string());
        code.push(format!("    def decode(cls, buf, offset: int) -> {}:", name));
        code.push(format!(
            "        check_bounds(buf, offset, cls.ENCODED_LENGTH, {})",
            quote(composite.type_name)
        ));
        code.push("        return cls(".to_string());
        code.extend(indent(&block.decode(), 3));
        code.push("        )".to_string());
        code.push(String::new());
        code.push("    @classmethod".to_string());
        code.push(format!("    def null(cls) -> {}:", name));
        code.push("        \"\"\"Every member at its null value.\"\"\"".to_string());
        code.push("        return cls(".to_string());
        code.extend(indent(&block.nulls(), 3));
        code.push("        )".to_string());
        code.push(String::new());

        self.unit(composite.type_name, &types, code)
    }

    fn render_enum(&self, _schema: &SchemaLayout, layout: &EnumLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;
        let null = namer.variant(EnumLayout::NULL_NAME)?;

        let mut code = vec![format!("class {}(enum.IntEnum):", name)];
        if let Some(description) = layout.description {
            code.push(format!("    {}", quote(description)));
            code.push(String::new());
        }
        for value in &layout.values {
            code.push(format!("    {} = {}", namer.variant(value.name)?, literal(value.value, layout.encoding)));
        }
        code.push(format!("    {} = {}", null, literal(&layout.null_value, layout.encoding)));
        code.push(String::new());
        code.push("    @classmethod".to_string());
        code.push(format!("    def from_raw(cls, raw: int) -> {}:", name));
        code.push("        \"\"\"Unknown values decode as the null value.\"\"\"".to_string());
        code.push("        try:".to_string());
        code.push("            return cls(raw)".to_string());
        code.push("        except ValueError:".to_string());
        code.push(format!("            return cls.{}", null));
        code.push(String::new());
        code.push(format!("{}_ENCODED_LENGTH = {}", namer.constant(layout.type_name)?, layout.width()));
        code.push(String::new());

        self.unit(layout.type_name, &BTreeMap::new(), code)
    }

    fn render_set(&self, _schema: &SchemaLayout, layout: &SetLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;

        let mut code = vec!["@dataclass".to_string(), format!("class {}:", name)];
        if let Some(description) = layout.description {
            code.push(format!("    {}", quote(description)));
            code.push(String::new());
        }
        code.push(format!("    ENCODED_LENGTH = {}", layout.width()));
        code.push(String::new());
        code.push("    bits: int = 0".to_string());
        for choice in &layout.choices {
            let getter = namer.member(choice.name)?;
            let setter = namer.member(&format!("set_{}", choice.name))?;
            code.push(String::new());
            code.push(format!("    def {}(self) -> bool:", getter));
            code.push(format!("        return bool(self.bits & (1 << {}))", choice.bit));
            code.push(String::new());
            code.push(format!("    def {}(self, value: bool) -> {}:", setter, name));
            code.push("        if value:".to_string());
            code.push(format!("            self.bits |= 1 << {}", choice.bit));
            code.push("        else:".to_string());
            code.push(format!("            self.bits &= ~(1 << {})", choice.bit));
            code.push("        return self".to_string());
        }
        code.push(String::new());

        self.unit(layout.type_name, &BTreeMap::new(), code)
    }

    fn render_message(&self, schema: &SchemaLayout, message: &MessageLayout) -> Result<GeneratedUnit, SbeError> {
        let name = self.namer().type_name(message.name)?;
        let mut types = BTreeMap::new();
        body_types(&message.body, &mut types);

        let mut code = Vec::new();
        self.render_body(schema, &name, message.name, &message.body, Some(message), &mut code)?;
        code.push(String::new());
        self.unit(message.name, &types, code)
    }

    fn render_support(&self, _schema: &SchemaLayout) -> Result<Option<GeneratedUnit>, SbeError> {
        Ok(Some(GeneratedUnit::new("runtime.py", format!("{}\n\n{}", FILE_HEADER, RUNTIME))))
    }

    fn render_index(&self, _schema: &SchemaLayout, units: &[GeneratedUnit]) -> Result<Option<GeneratedUnit>, SbeError> {
        let mut code = vec![FILE_HEADER.to_string(), String::new()];
        for unit in units {
            code.push(format!("from .{} import *  # noqa: F401,F403", unit.stem()));
        }
        code.push(String::new());
        Ok(Some(GeneratedUnit::new("__init__.py", code.join("\n"))))
    }
}

const RUNTIME: &str = r#"class DecodeError(ValueError):
    pass


def check_bounds(buf, offset: int, needed: int, path: str) -> None:
    if offset + needed > len(buf):
        raise DecodeError(f"{path} needs {needed} bytes at offset {offset} but the buffer holds {len(buf)}")


class EncodeError(ValueError):
    pass


def check_group(buf, offset: int, count: int, element_length: int, path: str) -> None:
    element_length = max(element_length, 1)
    if count * element_length > len(buf) - offset:
        raise DecodeError(
            f"group {path} at offset {offset} declares {count} elements of at least {element_length} bytes, "
            "more than the buffer holds"
        )


def read_chars(buf, offset: int, length: int) -> str:
    raw = bytes(buf[offset:offset + length])
    return raw.split(b"\0", 1)[0].decode("latin-1")


def write_chars(buf, offset: int, length: int, value: str, path: str) -> None:
    data = value.encode("latin-1")
    if len(data) > length:
        raise EncodeError(f"{path} holds {length} characters but the value has {len(data)}")
    buf[offset:offset + length] = data.ljust(length, b"\0")


def decode_text(data: bytes, encoding: str, path: str) -> str:
    try:
        return data.decode(encoding)
    except (UnicodeDecodeError, LookupError) as err:
        raise DecodeError(f"{path} is not valid {encoding}") from err
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use brine_sbe_schema::*;

    #[test]
    fn struct_formats() {
        assert_eq!(format_string(PrimitiveType::Uint16, ByteOrder::LittleEndian, 1), "\"<H\"");
        assert_eq!(format_string(PrimitiveType::Int32, ByteOrder::BigEndian, 4), "\">4i\"");
        assert_eq!(literal(&PrimitiveValue::Float(f64::NAN), PrimitiveType::Double), "math.nan");
    }

    #[test]
    fn message_unit() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::composite(
                "Price",
                vec![
                    TypeDef::primitive("mantissa", PrimitiveType::Int64),
                    TypeDef::primitive("exponent", PrimitiveType::Int8).constant(PrimitiveValue::Int(-4)),
                ],
            ))
            .add_message(
                MessageDef::new("Quote", 2)
                    .field(FieldDef::new(
                        "bid",
                        1,
                        TypeDef::composite(
                            "Price",
                            vec![
                                TypeDef::primitive("mantissa", PrimitiveType::Int64),
                                TypeDef::primitive("exponent", PrimitiveType::Int8).constant(PrimitiveValue::Int(-4)),
                            ],
                        ),
                    ))
                    .group(GroupDef::new("levels", 2).field(FieldDef::primitive("size", 3, PrimitiveType::Uint32)))
                    .var_data(VarDataDef::bytes("blob", 4)),
            )
            .build();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let generator = PythonGenerator::default();

        let unit = generator.render_message(&schema, &schema.messages[0]).unwrap();
        assert_eq!(unit.file_name, "quote.py");
        let code = &unit.contents;
        assert!(code.contains("from .price import Price"));
        assert!(code.contains("class Quote:"));
        assert!(code.contains("    bid: Price = field(default_factory=Price)"));
        assert!(code.contains("    levels: List[QuoteLevels] = field(default_factory=list)"));
        assert!(code.contains("    blob: bytes = b\"\""));
        assert!(code.contains("struct.pack_into(\"<H\", out, 0, self.BLOCK_LENGTH)"));
        assert!(code.contains("check_group(buf, pos, count, group_block_length + 0, \"Quote.levels\")"));
        assert!(code.contains("bid=Price.decode(buf, offset) if block_length >= 8 else Price.null(),"));
        assert!(code.contains("size=struct.unpack_from(\"<I\", buf, offset)[0] if block_length >= 4 else 4294967295,"));
        assert!(code.contains("class QuoteLevels:"));

        let TypeLayout::Composite(ref price) = schema.types[0] else {
            panic!("expected a composite");
        };
        let unit = generator.render_composite(&schema, price).unwrap();
        assert!(unit.contents.contains("    EXPONENT = -4"));
        assert!(unit.contents.contains("mantissa=struct.unpack_from(\"<q\", buf, offset)[0],"));
        assert!(unit.contents.contains("    def null(cls) -> Price:"));
        assert!(unit.contents.contains("mantissa=-9223372036854775808,"));
    }

    #[test]
    fn char_arrays_and_nested_trailers() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_message(
                MessageDef::new("Order", 1)
                    .field(FieldDef::new("symbol", 1, TypeDef::primitive("symbol", PrimitiveType::Char).array(6)))
                    .group(
                        GroupDef::new("fills", 2)
                            .group(GroupDef::new("legs", 3).field(FieldDef::primitive("qty", 4, PrimitiveType::Uint16)))
                            .var_data(VarDataDef::text("venue", 5)),
                    ),
            )
            .build();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let generator = PythonGenerator::default();

        let code = generator.render_message(&schema, &schema.messages[0]).unwrap().contents;
        assert!(code.contains("write_chars(buf, offset, 6, self.symbol, \"symbol\")"));
        assert!(code.contains("symbol=read_chars(buf, offset, 6) if block_length >= 6 else \"\","));
        // legs dimension (4) plus the venue length prefix (4).
        assert!(code.contains("check_group(buf, pos, count, group_block_length + 8, \"Order.fills\")"));
        assert!(code.contains("check_group(buf, pos, count, group_block_length + 0, \"Order.fills.legs\")"));

        let runtime = generator.render_support(&schema).unwrap().unwrap().contents;
        assert!(runtime.contains("class EncodeError(ValueError):"));
        assert!(runtime.contains("raise EncodeError(f\"{path} holds {length} characters"));
        assert!(runtime.contains("element_length = max(element_length, 1)"));
        assert!(!runtime.contains("[:length]"));
    }
}
