use brine_sbe_schema::{
    BodyLayout, ByteOrder, CompositeLayout, EnumLayout, FieldKind, FieldLayout, HeaderSlot, MessageLayout,
    PrimitiveKind, PrimitiveLayout, PrimitiveType, PrimitiveValue, SchemaLayout, SetLayout,
};

use crate::{
    error::SbeError,
    keywords::{KeywordPolicy, Namer},
    naming::quote,
    traits::{CodeGenerator, GeneratedUnit, Language},
};

const FILE_HEADER: &str = "// Generated SBE (Simple Binary Encoding) codec. Do not edit.";
const UNIT_PRELUDE: &str = "#![allow(unused_imports, unused_variables, unused_mut, clippy::all)]";

/// Renders plain Rust structs with `encode`/`decode` over byte slices. The
/// output needs nothing beyond `std`.
#[derive(Debug, Clone, Default)]
pub struct RustGenerator {
    policy: KeywordPolicy,
}

impl RustGenerator {
    pub fn new(policy: KeywordPolicy) -> Self {
        RustGenerator { policy }
    }

    fn namer(&self) -> Namer<'_> {
        Namer::new(Language::Rust, &self.policy)
    }

    fn unit(&self, name: &str, body: Vec<String>) -> Result<GeneratedUnit, SbeError> {
        let mut code = vec![FILE_HEADER.to_string(), UNIT_PRELUDE.to_string(), String::new()];
        code.push("use super::*;".to_string());
        code.push(String::new());
        code.extend(body);
        Ok(GeneratedUnit::new(format!("{}.rs", self.namer().module(name)?), code.join("\n")))
    }
}

/// Maps SBE primitives to Rust types.
fn rust_type(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Char | PrimitiveType::Uint8 => "u8",
        PrimitiveType::Int8 => "i8",
        PrimitiveType::Int16 => "i16",
        PrimitiveType::Int32 => "i32",
        PrimitiveType::Int64 => "i64",
        PrimitiveType::Uint16 => "u16",
        PrimitiveType::Uint32 => "u32",
        PrimitiveType::Uint64 => "u64",
        PrimitiveType::Float => "f32",
        PrimitiveType::Double => "f64",
    }
}

fn endian(order: ByteOrder) -> &'static str {
    match order {
        ByteOrder::LittleEndian => "le",
        ByteOrder::BigEndian => "be",
    }
}

/// A Rust literal for `value` as the given primitive.
fn literal(value: &PrimitiveValue, primitive: PrimitiveType) -> String {
    let ty = rust_type(primitive);
    match primitive.kind() {
        PrimitiveKind::Float => match value.as_f64() {
            Some(v) if v.is_nan() => format!("{}::NAN", ty),
            Some(v) if v.is_infinite() && v > 0.0 => format!("{}::INFINITY", ty),
            Some(v) if v.is_infinite() => format!("{}::NEG_INFINITY", ty),
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

fn byte_slice_literal(value: &PrimitiveValue) -> String {
    let bytes: Vec<String> = match value.as_bytes() {
        Some(bytes) => bytes.iter().map(|b| b.to_string()).collect(),
        None => vec![value.as_u64().unwrap_or(0).to_string()],
    };
    format!("&[{}]", bytes.join(", "))
}

/// A position in the buffer: a runtime base expression plus a fixed offset.
#[derive(Clone, Copy)]
struct At<'b> {
    base: &'b str,
    offset: usize,
}

impl<'b> At<'b> {
    fn new(base: &'b str, offset: usize) -> Self {
        At { base, offset }
    }

    fn plus(self, offset: usize) -> Self {
        At::new(self.base, self.offset + offset)
    }

    fn expr(self) -> String {
        match (self.base.is_empty(), self.offset) {
            (true, offset) => offset.to_string(),
            (false, 0) => self.base.to_string(),
            (false, offset) => format!("{} + {}", self.base, offset),
        }
    }

    fn range(self, len: usize) -> String {
        format!("{}..{}", self.expr(), self.plus(len).expr())
    }
}

fn read_expr(primitive: PrimitiveType, order: ByteOrder, at: &str, path: &str) -> String {
    format!(
        "{}::from_{}_bytes(read(buf, {}, {})?)",
        rust_type(primitive),
        endian(order),
        at,
        quote(path)
    )
}

fn write_stmt(primitive: PrimitiveType, order: ByteOrder, at: At, value: &str) -> String {
    format!(
        "buf[{}].copy_from_slice(&{}.to_{}_bytes());",
        at.range(primitive.size()),
        value,
        endian(order)
    )
}

fn slot_read(slot: &HeaderSlot, base: &str, path: &str) -> String {
    read_expr(slot.primitive_type, slot.byte_order, &At::new(base, slot.offset).expr(), path)
}

fn slot_write(slot: &HeaderSlot, base: &str, value: &str) -> String {
    write_stmt(slot.primitive_type, slot.byte_order, At::new(base, slot.offset), value)
}

fn indent(lines: &[String], depth: usize) -> impl Iterator<Item = String> + '_ {
    let pad = "    ".repeat(depth);
    lines.iter().map(move |line| if line.is_empty() { String::new() } else { format!("{}{}", pad, line) })
}

/// The pieces a run of fixed-offset fields contributes to a struct.
#[derive(Default)]
struct Block {
    members: Vec<String>,
    consts: Vec<String>,
    encode: Vec<String>,
    reads: Vec<FieldRead>,
}

/// How one field comes out of a buffer, and what it is when the sender's
/// block stops short of it.
struct FieldRead {
    name: String,
    end: usize,
    read: Vec<String>,
    null: String,
}

impl Block {
    fn push_read(&mut self, name: &str, field: &FieldLayout, read: Vec<String>, null: String) {
        self.reads.push(FieldRead {
            name: name.to_string(),
            end: field.end(),
            read,
            null,
        });
    }

    /// Struct initializer lines reading every field.
    fn decode(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for field in &self.reads {
            let last = field.read.len() - 1;
            for (i, line) in field.read.iter().enumerate() {
                let head = if i == 0 { format!("{}: ", field.name) } else { String::new() };
                let tail = if i == last { "," } else { "" };
                lines.push(format!("{}{}{}", head, line, tail));
            }
        }
        lines
    }

    /// Like `decode`, but fields past `block_length` take their null value.
    fn decode_within(&self, block_length: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for field in &self.reads {
            lines.push(format!("{}: if {} >= {} {{", field.name, block_length, field.end));
            lines.extend(field.read.iter().map(|line| format!("    {}", line)));
            lines.push("} else {".to_string());
            lines.push(format!("    {}", field.null));
            lines.push("},".to_string());
        }
        lines
    }

    fn nulls(&self) -> Vec<String> {
        self.reads.iter().map(|f| format!("{}: {},", f.name, f.null)).collect()
    }
}

impl RustGenerator {
    fn render_fields(&self, owner: &str, fields: &[&FieldLayout], base: &str) -> Result<Block, SbeError> {
        let namer = self.namer();
        let mut block = Block::default();

        for field in fields {
            let name = namer.member(field.name)?;
            let path = format!("{}.{}", owner, field.name);
            let at = At::new(base, field.offset);

            match field.kind {
                FieldKind::Primitive(ref prim) => {
                    self.render_primitive(&mut block, field, &name, &path, at, prim)?;
                }
                FieldKind::Composite(ref composite) => {
                    let ty = namer.type_name(composite.type_name)?;
                    block.members.push(format!("pub {}: {},", name, ty));
                    block.encode.push(format!("self.{}.encode(buf, {});", name, at.expr()));
                    let read = format!("{}::decode(buf, {})?", ty, at.expr());
                    block.push_read(&name, field, vec![read], format!("{}::null()", ty));
                }
                FieldKind::Enum(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    let raw = format!("self.{}.to_raw()", name);
                    block.members.push(format!("pub {}: {},", name, ty));
                    block.encode.push(write_stmt(layout.encoding, layout.byte_order, at, &raw));
                    let read = format!(
                        "{}::from_raw({})",
                        ty,
                        read_expr(layout.encoding, layout.byte_order, &at.expr(), &path)
                    );
                    block.push_read(&name, field, vec![read], format!("{}::default()", ty));
                }
                FieldKind::Set(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    let raw = format!("self.{}.0", name);
                    block.members.push(format!("pub {}: {},", name, ty));
                    block.encode.push(write_stmt(layout.encoding, layout.byte_order, at, &raw));
                    let read = format!(
                        "{}({})",
                        ty,
                        read_expr(layout.encoding, layout.byte_order, &at.expr(), &path)
                    );
                    block.push_read(&name, field, vec![read], format!("{}::default()", ty));
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
        path: &str,
        at: At,
        prim: &PrimitiveLayout,
    ) -> Result<(), SbeError> {
        let ty = rust_type(prim.primitive_type);
        let constant = self.namer().constant(field.name)?;
        let size = prim.primitive_type.size();
        let null = literal(&prim.null_value, prim.primitive_type);

        if prim.is_constant() {
            let value = prim.const_value.cloned().unwrap_or_else(|| PrimitiveValue::UInt(0));
            if prim.is_array() || value.as_bytes().map_or(false, |b| b.len() > 1) {
                block.consts.push(format!("pub const {}: &'static [u8] = {};", constant, byte_slice_literal(&value)));
            } else {
                block.consts.push(format!("pub const {}: {} = {};", constant, ty, literal(&value, prim.primitive_type)));
            }
            return Ok(());
        }

        if prim.is_optional() {
            block.consts.push(format!("pub const {}_NULL_VALUE: {} = {};", constant, ty, null));
        }

        if !prim.is_array() {
            block.members.push(format!("pub {}: {},", name, ty));
            block.encode.push(write_stmt(prim.primitive_type, prim.byte_order, at, &format!("self.{}", name)));
            let read = read_expr(prim.primitive_type, prim.byte_order, &at.expr(), path);
            block.push_read(name, field, vec![read], null);
            return Ok(());
        }

        let len = prim.array_length;
        let null_array = format!("[{}; {}]", null, len);
        block.members.push(format!("pub {}: [{}; {}],", name, ty, len));
        if ty == "u8" {
            block.encode.push(format!("buf[{}].copy_from_slice(&self.{});", at.range(len), name));
            let read = format!("read(buf, {}, {})?", at.expr(), quote(path));
            block.push_read(name, field, vec![read], null_array);
            return Ok(());
        }

        let element = format!("{} + i * {}", at.expr(), size);
        block.encode.extend(vec![
            format!("for (i, item) in self.{}.iter().enumerate() {{", name),
            format!("    let at = {};", element),
            format!("    buf[at..at + {}].copy_from_slice(&item.to_{}_bytes());", size, endian(prim.byte_order)),
            "}".to_string(),
        ]);
        let read = vec![
            "{".to_string(),
            format!("    let mut items = [{}::default(); {}];", ty, len),
            "    for (i, item) in items.iter_mut().enumerate() {".to_string(),
            format!("        *item = {};", read_expr(prim.primitive_type, prim.byte_order, &element, path)),
            "    }".to_string(),
            "    items".to_string(),
            "}".to_string(),
        ];
        block.push_read(name, field, read, null_array);
        Ok(())
    }

    /// A message or group element: a struct holding its fields, one `Vec`
    /// per group and one buffer per var-data, followed by the structs of its
    /// groups.
    fn render_body(
        &self,
        schema: &SchemaLayout,
        struct_name: &str,
        path: &str,
        body: &BodyLayout,
        message: Option<&MessageLayout>,
        code: &mut Vec<String>,
    ) -> Result<(), SbeError> {
        let namer = self.namer();
        let fields: Vec<&FieldLayout> = body.fields().collect();
        let block = self.render_fields(path, &fields, "offset")?;

        let mut groups = Vec::new();
        for group in body.groups() {
            let member = namer.member(group.name)?;
            let ty = format!("{}{}", struct_name, namer.type_name(group.name)?);
            groups.push((group, member, ty));
        }
        let mut var_data = Vec::new();
        for data in body.var_data() {
            var_data.push((data, namer.member(data.name)?));
        }

        match message.and_then(|m| m.description) {
            Some(description) => code.push(format!("/// {}", description)),
            None => code.push(format!("/// `{}`", path)),
        }
        code.push("#[derive(Debug, Clone, PartialEq)]".to_string());
        code.push(format!("pub struct {} {{", struct_name));
        code.extend(indent(&block.members, 1));
        for (_, member, ty) in &groups {
            code.push(format!("    pub {}: Vec<{}>,", member, ty));
        }
        for (data, member) in &var_data {
            let ty = if data.is_text() { "String" } else { "Vec<u8>" };
            code.push(format!("    pub {}: {},", member, ty));
        }
        code.push("}".to_string());
        code.push(String::new());

        code.push(format!("impl {} {{", struct_name));
        code.push(format!("    pub const BLOCK_LENGTH: usize = {};", body.block_length()));
        if let Some(message) = message {
            let header = &schema.header;
            code.push(format!(
                "    pub const TEMPLATE_ID: {} = {};",
                rust_type(header.template_id.primitive_type),
                message.id
            ));
            code.push(format!(
                "    pub const SCHEMA_ID: {} = {};",
                rust_type(header.schema_id.primitive_type),
                schema.id
            ));
            code.push(format!(
                "    pub const SCHEMA_VERSION: {} = {};",
                rust_type(header.version.primitive_type),
                schema.version
            ));
        }
        code.extend(indent(&block.consts, 1));
        code.push(String::new());

        if let Some(message) = message {
            self.render_message_entry(schema, message, code);
        }

        code.push("    /// Appends the fixed block, padded to `BLOCK_LENGTH`, then groups and var-data.".to_string());
        code.push("    pub fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {".to_string());
        code.push("        let offset = out.len();".to_string());
        code.push("        out.resize(offset + Self::BLOCK_LENGTH, 0);".to_string());
        if !block.encode.is_empty() {
            code.push("        let buf = &mut out[..];".to_string());
            code.extend(indent(&block.encode, 2));
        }
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            let count_type = rust_type(dim.num_in_group.primitive_type);
            code.push(String::new());
            code.push(format!(
                "        let count = checked_len::<{}>(self.{}.len(), {}::MAX as u64, {})?;",
                count_type,
                member,
                count_type,
                quote(&format!("{}.{}", path, group.name))
            ));
            code.push("        let dim = out.len();".to_string());
            code.push(format!("        out.resize(dim + {}, 0);", dim.encoded_length));
            code.push("        let buf = &mut out[..];".to_string());
            code.push(format!(
                "        {}",
                slot_write(&dim.block_length, "dim", &format!("({}::BLOCK_LENGTH as {})", ty, rust_type(dim.block_length.primitive_type)))
            ));
            code.push(format!("        {}", slot_write(&dim.num_in_group, "dim", "count")));
            code.push(format!("        for item in &self.{} {{", member));
            code.push("            item.encode_body(out)?;".to_string());
            code.push("        }".to_string());
        }
        for (data, member) in &var_data {
            let length = &data.length;
            let bytes = if data.is_text() {
                format!("self.{}.as_bytes()", member)
            } else {
                format!("&self.{}", member)
            };
            code.push(String::new());
            code.push(format!(
                "        let len = checked_len::<{}>(self.{}.len(), {}::MAX as u64, {})?;",
                rust_type(length.primitive_type),
                member,
                rust_type(length.primitive_type),
                quote(&format!("{}.{}", path, data.name))
            ));
            code.push(format!("        out.extend_from_slice(&len.to_{}_bytes());", endian(length.byte_order)));
            code.push(format!("        out.extend_from_slice({});", bytes));
        }
        code.push("        Ok(())".to_string());
        code.push("    }".to_string());
        code.push(String::new());

        let mutable = if body.is_fixed() { "" } else { "mut " };
        code.push("    /// Decodes one body at `offset`. Fields start at `offset` and whatever follows".to_string());
        code.push("    /// them starts at `offset + block_length`, so senders with a longer block are".to_string());
        code.push("    /// skipped over. Fields past a shorter block take their null value. Returns the".to_string());
        code.push("    /// decoded value and the offset just past it.".to_string());
        code.push(
            "    pub fn decode_body(buf: &[u8], offset: usize, block_length: usize) -> Result<(Self, usize), DecodeError> {"
                .to_string(),
        );
        code.push(format!("        let {}decoded = Self {{", mutable));
        code.extend(indent(&block.decode_within("block_length"), 3));
        for (_, member, _) in &groups {
            code.push(format!("            {}: Vec::new(),", member));
        }
        for (data, member) in &var_data {
            let empty = if data.is_text() { "String::new()" } else { "Vec::new()" };
            code.push(format!("            {}: {},", member, empty));
        }
        code.push("        };".to_string());
        code.push(format!("        let {}pos = offset + block_length;", mutable));
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            let group_path = format!("{}.{}", path, group.name);
            code.push(String::new());
            code.push(format!(
                "        let group_block_length = {} as usize;",
                slot_read(&dim.block_length, "pos", &group_path)
            ));
            code.push(format!("        let count = {} as usize;", slot_read(&dim.num_in_group, "pos", &group_path)));
            code.push(format!("        pos += {};", dim.encoded_length));
            code.push(format!(
                "        check_group(buf, pos, count, group_block_length.saturating_add({}), {})?;",
                group.body.trailer_length(),
                quote(&group_path)
            ));
            code.push(format!("        decoded.{}.reserve(count);", member));
            code.push("        for _ in 0..count {".to_string());
            code.push(format!("            let (item, next) = {}::decode_body(buf, pos, group_block_length)?;", ty));
            code.push(format!("            decoded.{}.push(item);", member));
            code.push("            pos = next;".to_string());
            code.push("        }".to_string());
        }
        for (data, member) in &var_data {
            let data_path = quote(&format!("{}.{}", path, data.name));
            let length = &data.length;
            code.push(String::new());
            code.push(format!(
                "        let len = {} as usize;",
                read_expr(length.primitive_type, length.byte_order, "pos", &format!("{}.{}", path, data.name))
            ));
            code.push(format!("        pos += {};", length.width()));
            if data.is_text() {
                code.push(format!(
                    "        decoded.{} = text(slice(buf, pos, len, {})?, {})?;",
                    member, data_path, data_path
                ));
            } else {
                code.push(format!("        decoded.{} = slice(buf, pos, len, {})?.to_vec();", member, data_path));
            }
            code.push("        pos += len;".to_string());
        }
        code.push("        Ok((decoded, pos))".to_string());
        code.push("    }".to_string());
        code.push("}".to_string());

        for (group, _, ty) in &groups {
            code.push(String::new());
            let group_path = format!("{}.{}", path, group.name);
            self.render_body(schema, ty, &group_path, &group.body, None, code)?;
        }
        Ok(())
    }

    /// `encode` and `decode` for a whole message, header included.
    fn render_message_entry(&self, schema: &SchemaLayout, message: &MessageLayout, code: &mut Vec<String>) {
        let header = &schema.header;
        let header_name = header.composite.type_name;
        let header_length = header.encoded_length();

        code.push("    /// Encodes the message header followed by the body.".to_string());
        code.push("    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {".to_string());
        code.push(format!("        let mut out = vec![0u8; {}];", header_length));
        code.push("        let buf = &mut out[..];".to_string());
        code.push(format!(
            "        {}",
            slot_write(&header.block_length, "", &format!("(Self::BLOCK_LENGTH as {})", rust_type(header.block_length.primitive_type)))
        ));
        code.push(format!("        {}", slot_write(&header.template_id, "", "Self::TEMPLATE_ID")));
        code.push(format!("        {}", slot_write(&header.schema_id, "", "Self::SCHEMA_ID")));
        code.push(format!("        {}", slot_write(&header.version, "", "Self::SCHEMA_VERSION")));
        code.push("        self.encode_body(&mut out)?;".to_string());
        code.push("        Ok(out)".to_string());
        code.push("    }".to_string());
        code.push(String::new());

        code.push("    /// Decodes a message header and body. The body is read with the block length".to_string());
        code.push("    /// from the header, not `BLOCK_LENGTH`.".to_string());
        code.push("    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {".to_string());
        code.push(format!(
            "        let template_id = {};",
            slot_read(&header.template_id, "", &format!("{}.templateId", header_name))
        ));
        code.push("        if template_id != Self::TEMPLATE_ID {".to_string());
        code.push("            return Err(DecodeError::TemplateMismatch {".to_string());
        code.push(format!("                message: {},", quote(message.name)));
        code.push("                expected: Self::TEMPLATE_ID as u64,".to_string());
        code.push("                found: template_id as u64,".to_string());
        code.push("            });".to_string());
        code.push("        }".to_string());
        code.push(format!(
            "        let block_length = {} as usize;",
            slot_read(&header.block_length, "", &format!("{}.blockLength", header_name))
        ));
        code.push(format!(
            "        Self::decode_body(buf, {}, block_length).map(|(message, _)| message)",
            header_length
        ));
        code.push("    }".to_string());
        code.push(String::new());
    }
}

impl CodeGenerator for RustGenerator {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn render_composite(&self, _schema: &SchemaLayout, composite: &CompositeLayout) -> Result<GeneratedUnit, SbeError> {
        let name = self.namer().type_name(composite.type_name)?;
        let members: Vec<&FieldLayout> = composite.members.iter().collect();
        let block = self.render_fields(composite.type_name, &members, "offset")?;

        let mut code = Vec::new();
        if let Some(description) = composite.description {
            code.push(format!("/// {}", description));
        }
        code.push("#[derive(Debug, Clone, Copy, PartialEq)]".to_string());
        code.push(format!("pub struct {} {{", name));
        code.extend(indent(&block.members, 1));
        code.push("}".to_string());
        code.push(String::new());
        code.push(format!("impl {} {{", name));
        code.push(format!("    pub const ENCODED_LENGTH: usize = {};", composite.encoded_length));
        code.extend(indent(&block.consts, 1));
        code.push(String::new());
        code.push("    /// Writes into `buf[offset..offset + ENCODED_LENGTH]`.".to_string());
        code.push("    pub fn encode(&self, buf: &mut [u8], offset: usize) {".to_string());
        code.extend(indent(&block.encode, 2));
        code.push("    }".to_string());
        code.push(String::new());
        code.push("    pub fn decode(buf: &[u8], offset: usize) -> Result<Self, DecodeError> {".to_string());
        code.push("        Ok(Self {".to_string());
        code.extend(indent(&block.decode(), 3));
        code.push("        })".to_string());
        code.push("    }".to_string());
        code.push(String::new());
        code.push("    /// Every member at its null value.".to_string());
        code.push("    pub fn null() -> Self {".to_string());
        code.push("        Self {".to_string());
        code.extend(indent(&block.nulls(), 3));
        code.push("        }".to_string());
        code.push("    }".to_string());
        code.push("}".to_string());
        code.push(String::new());

        self.unit(composite.type_name, code)
    }

    fn render_enum(&self, _schema: &SchemaLayout, layout: &EnumLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;
        let ty = rust_type(layout.encoding);
        let mut variants = Vec::new();
        for value in &layout.values {
            variants.push((namer.variant(value.name)?, literal(value.value, layout.encoding)));
        }
        let null = namer.variant(EnumLayout::NULL_NAME)?;

        let mut code = Vec::new();
        if let Some(description) = layout.description {
            code.push(format!("/// {}", description));
        }
        code.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]".to_string());
        code.push(format!("pub enum {} {{", name));
        for (variant, _) in &variants {
            code.push(format!("    {},", variant));
        }
        code.push("    /// The null value, or a value this schema version doesn't know.".to_string());
        code.push("    #[default]".to_string());
        code.push(format!("    {},", null));
        code.push("}".to_string());
        code.push(String::new());
        code.push(format!("impl {} {{", name));
        code.push(format!("    pub const ENCODED_LENGTH: usize = {};", layout.width()));
        code.push(format!("    pub const NULL_VALUE: {} = {};", ty, literal(&layout.null_value, layout.encoding)));
        code.push(String::new());
        code.push(format!("    pub fn from_raw(raw: {}) -> Self {{", ty));
        code.push("        match raw {".to_string());
        for (variant, value) in &variants {
            code.push(format!("            {} => Self::{},", value, variant));
        }
        code.push(format!("            _ => Self::{},", null));
        code.push("        }".to_string());
        code.push("    }".to_string());
        code.push(String::new());
        code.push(format!("    pub fn to_raw(self) -> {} {{", ty));
        code.push("        match self {".to_string());
        for (variant, value) in &variants {
            code.push(format!("            Self::{} => {},", variant, value));
        }
        code.push(format!("            Self::{} => Self::NULL_VALUE,", null));
        code.push("        }".to_string());
        code.push("    }".to_string());
        code.push("}".to_string());
        code.push(String::new());

        self.unit(layout.type_name, code)
    }

    fn render_set(&self, _schema: &SchemaLayout, layout: &SetLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;

        let mut code = Vec::new();
        if let Some(description) = layout.description {
            code.push(format!("/// {}", description));
        }
        code.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]".to_string());
        code.push(format!("pub struct {}(pub {});", name, rust_type(layout.encoding)));
        code.push(String::new());
        code.push(format!("impl {} {{", name));
        code.push(format!("    pub const ENCODED_LENGTH: usize = {};", layout.width()));
        for choice in &layout.choices {
            let getter = namer.member(choice.name)?;
            let setter = namer.member(&format!("set_{}", choice.name))?;
            code.push(String::new());
            code.push(format!("    pub fn {}(self) -> bool {{", getter));
            code.push(format!("        self.0 & (1 << {}) != 0", choice.bit));
            code.push("    }".to_string());
            code.push(String::new());
            code.push(format!("    pub fn {}(&mut self, value: bool) -> &mut Self {{", setter));
            code.push("        if value {".to_string());
            code.push(format!("            self.0 |= 1 << {};", choice.bit));
            code.push("        } else {".to_string());
            code.push(format!("            self.0 &= !(1 << {});", choice.bit));
            code.push("        }".to_string());
            code.push("        self".to_string());
            code.push("    }".to_string());
        }
        code.push("}".to_string());
        code.push(String::new());

        self.unit(layout.type_name, code)
    }

    fn render_message(&self, schema: &SchemaLayout, message: &MessageLayout) -> Result<GeneratedUnit, SbeError> {
        let name = self.namer().type_name(message.name)?;
        let mut code = Vec::new();
        self.render_body(schema, &name, message.name, &message.body, Some(message), &mut code)?;
        code.push(String::new());
        self.unit(message.name, code)
    }

    fn render_index(&self, schema: &SchemaLayout, units: &[GeneratedUnit]) -> Result<Option<GeneratedUnit>, SbeError> {
        let mut code = vec![
            format!(
                "//! Generated SBE codecs for schema {} version {}{}. Do not edit.",
                schema.id,
                schema.version,
                schema.package_name.map(|p| format!(" ({})", p)).unwrap_or_default()
            ),
            String::new(),
        ];
        for unit in units {
            code.push(format!("pub mod {};", unit.stem()));
        }
        code.push(String::new());
        for unit in units {
            code.push(format!("pub use {}::*;", unit.stem()));
        }
        code.push(String::new());
        code.extend(SUPPORT.lines().map(str::to_string));
        Ok(Some(GeneratedUnit::new("mod.rs", code.join("\n"))))
    }
}

/// Folds the units of one Rust run into a single source file, one inline
/// module per unit, for a build script to write under `OUT_DIR` and the crate
/// to `include!`.
pub fn single_file(units: &[GeneratedUnit]) -> String {
    let mut code = vec![FILE_HEADER.to_string(), String::new()];
    for unit in units.iter().filter(|u| u.file_name != "mod.rs") {
        code.push(format!("pub mod {} {{", unit.stem()));
        code.extend(unit.contents.lines().map(str::to_string));
        code.push("}".to_string());
        code.push(String::new());
    }
    if let Some(index) = units.iter().find(|u| u.file_name == "mod.rs") {
        code.extend(
            index
                .contents
                .lines()
                .filter(|line| !line.starts_with("//!") && !line.starts_with("pub mod "))
                .map(str::to_string),
        );
    }
    code.join("\n")
}

/// Error types and bounds-checked helpers shared by every generated unit.
const SUPPORT: &str = r#"use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read of `needed` bytes at `offset` ran past the end of the buffer.
    OutOfBounds { path: &'static str, offset: usize, needed: usize, len: usize },
    /// A group header declares more elements than the buffer can hold.
    GroupOverrun { path: &'static str, offset: usize, count: usize, element_length: usize },
    /// The message header names a different template.
    TemplateMismatch { message: &'static str, expected: u64, found: u64 },
    /// Var-data declared as text is not valid UTF-8.
    InvalidText { path: &'static str },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::OutOfBounds { path, offset, needed, len } => write!(
                f,
                "{} needs {} bytes at offset {} but the buffer holds {}",
                path, needed, offset, len
            ),
            DecodeError::GroupOverrun { path, offset, count, element_length } => write!(
                f,
                "group {} at offset {} declares {} elements of at least {} bytes, more than the buffer holds",
                path, offset, count, element_length
            ),
            DecodeError::TemplateMismatch { message, expected, found } => write!(
                f,
                "{} has template id {} but the header says {}",
                message, expected, found
            ),
            DecodeError::InvalidText { path } => write!(f, "{} is not valid UTF-8", path),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A group count or var-data length does not fit its header field.
    TooLong { path: &'static str, len: usize, max: u64 },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::TooLong { path, len, max } => {
                write!(f, "{} has {} entries but its header holds at most {}", path, len, max)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

pub(crate) fn checked_len<T: TryFrom<usize>>(len: usize, max: u64, path: &'static str) -> Result<T, EncodeError> {
    T::try_from(len).map_err(|_| EncodeError::TooLong { path, len, max })
}

pub(crate) fn slice<'b>(buf: &'b [u8], offset: usize, len: usize, path: &'static str) -> Result<&'b [u8], DecodeError> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(&buf[offset..end]),
        _ => Err(DecodeError::OutOfBounds { path, offset, needed: len, len: buf.len() }),
    }
}

pub(crate) fn read<const N: usize>(buf: &[u8], offset: usize, path: &'static str) -> Result<[u8; N], DecodeError> {
    let mut out = [0u8; N];
    out.copy_from_slice(slice(buf, offset, N, path)?);
    Ok(out)
}

/// `element_length` is the block plus the group and var-data headers each
/// element carries. Counts are bounded at one byte per element minimum.
pub(crate) fn check_group(
    buf: &[u8],
    offset: usize,
    count: usize,
    element_length: usize,
    path: &'static str,
) -> Result<(), DecodeError> {
    let element_length = element_length.max(1);
    match count.checked_mul(element_length) {
        Some(total) if total <= buf.len().saturating_sub(offset) => Ok(()),
        _ => Err(DecodeError::GroupOverrun { path, offset, count, element_length }),
    }
}

pub(crate) fn text(bytes: &[u8], path: &'static str) -> Result<String, DecodeError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidText { path })
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use brine_sbe_schema::*;

    fn car() -> Ir {
        IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66)]))
            .add_message(
                MessageDef::new("Car", 1)
                    .field(FieldDef::primitive("serialNumber", 1, PrimitiveType::Uint64))
                    .field(FieldDef::new("code", 2, TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66)])))
                    .group(GroupDef::new("fuelFigures", 3).field(FieldDef::primitive("speed", 4, PrimitiveType::Uint16)))
                    .var_data(VarDataDef::text("make", 5)),
            )
            .build()
    }

    #[test]
    fn literals() {
        assert_eq!(literal(&PrimitiveValue::Float(f64::NAN), PrimitiveType::Float), "f32::NAN");
        assert_eq!(literal(&PrimitiveValue::Float(1.0), PrimitiveType::Double), "1.0");
        assert_eq!(literal(&PrimitiveValue::UInt(5), PrimitiveType::Int8), "5");
        assert_eq!(literal(&PrimitiveValue::Int(i64::MIN), PrimitiveType::Int64), "-9223372036854775808");
        assert_eq!(literal(&PrimitiveValue::from("A"), PrimitiveType::Char), "65");
        assert_eq!(byte_slice_literal(&PrimitiveValue::from("CME")), "&[67, 77, 69]");
    }

    #[test]
    fn offsets_render_compactly() {
        assert_eq!(At::new("offset", 0).range(4), "offset..offset + 4");
        assert_eq!(At::new("offset", 8).range(4), "offset + 8..offset + 12");
        assert_eq!(At::new("", 2).range(2), "2..4");
    }

    #[test]
    fn message_unit() {
        let ir = car();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let generator = RustGenerator::default();
        let unit = generator.render_message(&schema, &schema.messages[0]).unwrap();
        assert_eq!(unit.file_name, "car.rs");

        let code = &unit.contents;
        assert!(code.contains("pub struct Car {"));
        assert!(code.contains("pub serial_number: u64,"));
        assert!(code.contains("pub code: Model,"));
        assert!(code.contains("pub fuel_figures: Vec<CarFuelFigures>,"));
        assert!(code.contains("pub make: String,"));
        assert!(code.contains("pub const BLOCK_LENGTH: usize = 9;"));
        assert!(code.contains("pub const TEMPLATE_ID: u16 = 1;"));
        assert!(code.contains("buf[offset..offset + 8].copy_from_slice(&self.serial_number.to_le_bytes());"));
        assert!(code.contains("code: if block_length >= 9 {"));
        assert!(code.contains("Model::from_raw(u8::from_le_bytes(read(buf, offset + 8, \"Car.code\")?))\n"));
        assert!(code.contains("Model::default()\n"));
        assert!(code.contains("check_group(buf, pos, count, group_block_length.saturating_add(0), \"Car.fuelFigures\")?;"));
        assert!(code.contains("let count = checked_len::<u16>(self.fuel_figures.len(), u16::MAX as u64, \"Car.fuelFigures\")?;"));
        assert!(code.contains("let len = checked_len::<u32>(self.make.len(), u32::MAX as u64, \"Car.make\")?;"));
        assert!(code.contains("pub struct CarFuelFigures {"));
        assert!(code.contains("let len = u32::from_le_bytes(read(buf, pos, \"Car.make\")?) as usize;"));
    }

    #[test]
    fn enum_and_index_units() {
        let ir = car();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let generator = RustGenerator::default();
        let TypeLayout::Enum(ref model) = schema.types[0] else {
            panic!("expected an enum");
        };
        let unit = generator.render_enum(&schema, model).unwrap();
        assert_eq!(unit.file_name, "model.rs");
        assert!(unit.contents.contains("65 => Self::A,"));
        assert!(unit.contents.contains("    #[default]\n    NullVal,"));
        assert!(unit.contents.contains("pub const NULL_VALUE: u8 = 0;"));

        let index = generator.render_index(&schema, &[unit]).unwrap().unwrap();
        assert_eq!(index.file_name, "mod.rs");
        assert!(index.contents.contains("pub mod model;"));
        assert!(index.contents.contains("pub use model::*;"));
        assert!(index.contents.contains("pub enum DecodeError {"));
        assert!(index.contents.contains("pub enum EncodeError {"));
    }

    #[test]
    fn single_file_inlines_every_unit() {
        let ir = car();
        let units = crate::render(&ir, &crate::GeneratorConfig::new(Language::Rust)).unwrap();
        let file = single_file(&units);

        assert!(file.contains("pub mod car {\n// Generated SBE"));
        assert!(file.contains("pub mod model {"));
        assert!(file.contains("pub use car::*;"));
        assert!(file.contains("pub(crate) fn check_group("));
        assert!(!file.contains("//!"));
        assert!(!file.contains("pub mod car;"));
    }
}
