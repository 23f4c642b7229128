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

const FILE_HEADER: &str = "// Generated SBE (Simple Binary Encoding) codec. Do not edit.";

/// Renders an interface plus a `Codec` class with static `encode`/`decode`
/// over `DataView` for every schema element. 64-bit integers are `bigint`.
#[derive(Debug, Clone, Default)]
pub struct TypeScriptGenerator {
    policy: KeywordPolicy,
}

fn accessor(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Char | PrimitiveType::Uint8 => "Uint8",
        PrimitiveType::Int8 => "Int8",
        PrimitiveType::Int16 => "Int16",
        PrimitiveType::Int32 => "Int32",
        PrimitiveType::Int64 => "BigInt64",
        PrimitiveType::Uint16 => "Uint16",
        PrimitiveType::Uint32 => "Uint32",
        PrimitiveType::Uint64 => "BigUint64",
        PrimitiveType::Float => "Float32",
        PrimitiveType::Double => "Float64",
    }
}

fn is_big(primitive: PrimitiveType) -> bool {
    primitive.size() == 8 && primitive.kind() != PrimitiveKind::Float
}

fn ts_type(primitive: PrimitiveType) -> &'static str {
    if is_big(primitive) {
        "bigint"
    } else {
        "number"
    }
}

fn little(order: ByteOrder) -> &'static str {
    match order {
        ByteOrder::LittleEndian => "true",
        ByteOrder::BigEndian => "false",
    }
}

/// `view.getX(at[, littleEndian])` in the type's natural TypeScript type.
fn get(primitive: PrimitiveType, order: ByteOrder, at: &str) -> String {
    if primitive.needs_byte_order() {
        format!("view.get{}({}, {})", accessor(primitive), at, little(order))
    } else {
        format!("view.get{}({})", accessor(primitive), at)
    }
}

fn set(primitive: PrimitiveType, order: ByteOrder, at: &str, value: &str) -> String {
    if primitive.needs_byte_order() {
        format!("view.set{}({}, {}, {});", accessor(primitive), at, value, little(order))
    } else {
        format!("view.set{}({}, {});", accessor(primitive), at, value)
    }
}

/// Reads a length or count as a `number` whatever its width.
fn get_number(slot: &HeaderSlot, at: &str) -> String {
    let read = get(slot.primitive_type, slot.byte_order, at);
    if is_big(slot.primitive_type) {
        format!("Number({})", read)
    } else {
        read
    }
}

fn set_number(slot: &HeaderSlot, at: &str, value: &str) -> String {
    if is_big(slot.primitive_type) {
        set(slot.primitive_type, slot.byte_order, at, &format!("BigInt({})", value))
    } else {
        set(slot.primitive_type, slot.byte_order, at, value)
    }
}

/// The largest count or length a header slot can carry, as a `number`.
fn max_count(slot: &HeaderSlot) -> String {
    const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;
    let primitive = slot.primitive_type;
    let max = match primitive.kind() {
        PrimitiveKind::Signed => primitive.max_signed().max(0) as u64,
        _ => primitive.max_unsigned(),
    };
    if max > MAX_SAFE_INTEGER {
        "Number.MAX_SAFE_INTEGER".to_string()
    } else {
        max.to_string()
    }
}

fn literal(value: &PrimitiveValue, primitive: PrimitiveType) -> String {
    let text = match primitive.kind() {
        PrimitiveKind::Float => match value.as_f64() {
            Some(v) if v.is_nan() => "NaN".to_string(),
            Some(v) if v.is_infinite() && v > 0.0 => "Infinity".to_string(),
            Some(v) if v.is_infinite() => "-Infinity".to_string(),
            Some(v) => format!("{:?}", v),
            None => "0".to_string(),
        },
        PrimitiveKind::Signed => value.as_i64().unwrap_or(0).to_string(),
        PrimitiveKind::Unsigned | PrimitiveKind::Char => match value.as_bytes() {
            Some(bytes) => bytes.first().copied().unwrap_or(0).to_string(),
            None => value.as_u64().unwrap_or(0).to_string(),
        },
    };
    if is_big(primitive) {
        format!("{}n", text)
    } else {
        text
    }
}

#[derive(Default)]
struct Block {
    members: Vec<String>,
    consts: Vec<String>,
    encode: Vec<String>,
    decode: Vec<String>,
}

fn indent(lines: &[String], depth: usize) -> impl Iterator<Item = String> + '_ {
    let pad = "  ".repeat(depth);
    lines.iter().map(move |line| if line.is_empty() { String::new() } else { format!("{}{}", pad, line) })
}

impl TypeScriptGenerator {
    pub fn new(policy: KeywordPolicy) -> Self {
        TypeScriptGenerator { policy }
    }

    fn namer(&self) -> Namer<'_> {
        Namer::new(Language::TypeScript, &self.policy)
    }

    fn unit(&self, name: &str, types: &BTreeMap<&str, TypeRef>, body: Vec<String>) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let mut code = vec![FILE_HEADER.to_string(), String::new()];
        code.push("import * as sbe from './runtime';".to_string());
        for (type_name, kind) in types {
            let ty = namer.type_name(type_name)?;
            let module = namer.module(type_name)?;
            match kind {
                TypeRef::Enum => code.push(format!("import {{ {} }} from './{}';", ty, module)),
                TypeRef::Composite | TypeRef::Set => {
                    code.push(format!("import {{ {}, {}Codec }} from './{}';", ty, ty, module))
                }
            }
        }
        code.push(String::new());
        code.extend(body);
        Ok(GeneratedUnit::new(format!("{}.ts", namer.module(name)?), code.join("\n")))
    }

    fn render_fields(&self, fields: &[&FieldLayout], base: &str) -> Result<Block, SbeError> {
        let namer = self.namer();
        let mut block = Block::default();

        for field in fields {
            let name = namer.member(field.name)?;
            let at = offset_expr(base, field.offset);

            match field.kind {
                FieldKind::Primitive(ref prim) => self.render_primitive(&mut block, field.name, &name, &at, prim)?,
                FieldKind::Composite(ref composite) => {
                    let ty = namer.type_name(composite.type_name)?;
                    block.members.push(format!("{}: {};", name, ty));
                    block.encode.push(format!("{}Codec.encode(view, {}, value.{});", ty, at, name));
                    block.decode.push(format!("{}: {}Codec.decode(view, {}),", name, ty, at));
                }
                FieldKind::Enum(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    let read = get(layout.encoding, layout.byte_order, &at);
                    block.members.push(format!("{}: {};", name, ty));
                    if is_big(layout.encoding) {
                        let value = format!("BigInt(value.{})", name);
                        block.encode.push(set(layout.encoding, layout.byte_order, &at, &value));
                        block.decode.push(format!("{}: Number({}) as {},", name, read, ty));
                    } else {
                        let value = format!("value.{}", name);
                        block.encode.push(set(layout.encoding, layout.byte_order, &at, &value));
                        block.decode.push(format!("{}: {} as {},", name, read, ty));
                    }
                }
                FieldKind::Set(ref layout) => {
                    let ty = namer.type_name(layout.type_name)?;
                    block.members.push(format!("{}: {};", name, ty));
                    block.encode.push(format!("{}Codec.encode(view, {}, value.{});", ty, at, name));
                    block.decode.push(format!("{}: {}Codec.decode(view, {}),", name, ty, at));
                }
            }
        }

        Ok(block)
    }

    fn render_primitive(
        &self,
        block: &mut Block,
        raw_name: &str,
        name: &str,
        at: &str,
        prim: &PrimitiveLayout,
    ) -> Result<(), SbeError> {
        let constant = self.namer().constant(raw_name)?;
        let ty = ts_type(prim.primitive_type);
        let order = prim.byte_order;

        if prim.is_constant() {
            let value = prim.const_value.cloned().unwrap_or_else(|| PrimitiveValue::UInt(0));
            let text = match value.as_bytes() {
                Some(bytes) if prim.is_array() || bytes.len() > 1 => quote(&String::from_utf8_lossy(bytes)),
                _ => literal(&value, prim.primitive_type),
            };
            block.consts.push(format!("static readonly {} = {};", constant, text));
            return Ok(());
        }

        if prim.is_optional() {
            block.consts.push(format!(
                "static readonly {}_NULL_VALUE = {};",
                constant,
                literal(&prim.null_value, prim.primitive_type)
            ));
        }

        if !prim.is_array() {
            block.members.push(format!("{}: {};", name, ty));
            block.encode.push(set(prim.primitive_type, order, at, &format!("value.{}", name)));
            block.decode.push(format!("{}: {},", name, get(prim.primitive_type, order, at)));
            return Ok(());
        }

        let len = prim.array_length;
        if prim.primitive_type == PrimitiveType::Char {
            block.members.push(format!("{}: string;", name));
            block.encode.push(format!(
                "sbe.writeChars(view, {}, {}, value.{}, {});",
                at,
                len,
                name,
                quote_single(raw_name)
            ));
            block.decode.push(format!("{}: sbe.readChars(view, {}, {}),", name, at, len));
            return Ok(());
        }

        let size = prim.primitive_type.size();
        let element = format!("{} + i * {}", at, size);
        block.members.push(format!("{}: {}[];", name, ty));
        block.encode.push(format!(
            "value.{}.slice(0, {}).forEach((item, i) => {});",
            name,
            len,
            set(prim.primitive_type, order, &element, "item").trim_end_matches(';')
        ));
        block.decode.push(format!(
            "{}: Array.from({{ length: {} }}, (_, i) => {}),",
            name,
            len,
            get(prim.primitive_type, order, &element)
        ));
        Ok(())
    }

    fn render_body(
        &self,
        schema: &SchemaLayout,
        type_name: &str,
        path: &str,
        body: &BodyLayout,
        message: Option<&MessageLayout>,
        code: &mut Vec<String>,
    ) -> Result<(), SbeError> {
        let namer = self.namer();
        let codec = format!("{}Codec", type_name);
        let fields: Vec<&FieldLayout> = body.fields().collect();
        let block = self.render_fields(&fields, "offset")?;

        let mut groups = Vec::new();
        for group in body.groups() {
            let ty = format!("{}{}", type_name, namer.type_name(group.name)?);
            groups.push((group, namer.member(group.name)?, ty));
        }
        let mut var_data = Vec::new();
        for data in body.var_data() {
            var_data.push((data, namer.member(data.name)?));
        }

        if let Some(description) = message.and_then(|m| m.description) {
            code.push(format!("/** {} */", description));
        }
        code.push(format!("export interface {} {{", type_name));
        code.extend(indent(&block.members, 1));
        for (_, member, ty) in &groups {
            code.push(format!("  {}: {}[];", member, ty));
        }
        for (data, member) in &var_data {
            let ty = if data.is_text() { "string" } else { "Uint8Array" };
            code.push(format!("  {}: {};", member, ty));
        }
        code.push("}".to_string());
        code.push(String::new());

        code.push(format!("export class {} {{", codec));
        code.push(format!("  static readonly BLOCK_LENGTH = {};", body.block_length()));
        if let Some(message) = message {
            code.push(format!("  static readonly TEMPLATE_ID = {};", message.id));
            code.push(format!("  static readonly SCHEMA_ID = {};", schema.id));
            code.push(format!("  static readonly SCHEMA_VERSION = {};", schema.version));
        }
        code.extend(indent(&block.consts, 1));
        code.push(String::new());

        if let Some(message) = message {
            self.render_message_entry(schema, message, type_name, code);
        }

        code.push(format!("  static encodeBody(w: sbe.Writer, value: {}): void {{", type_name));
        code.push(format!("    const offset = w.reserve({}.BLOCK_LENGTH);", codec));
        if !block.encode.is_empty() {
            code.push("    const view = w.view();".to_string());
            code.extend(indent(&block.encode, 2));
        }
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            code.push("    {".to_string());
            code.push(format!(
                "      sbe.checkLength(value.{}.length, {}, {});",
                member,
                max_count(&dim.num_in_group),
                quote_single(&format!("{}.{}", path, group.name))
            ));
            code.push(format!("      const dim = w.reserve({});", dim.encoded_length));
            code.push("      const view = w.view();".to_string());
            code.push(format!(
                "      {}",
                set_number(&dim.block_length, &offset_expr("dim", dim.block_length.offset), &format!("{}Codec.BLOCK_LENGTH", ty))
            ));
            code.push(format!(
                "      {}",
                set_number(&dim.num_in_group, &offset_expr("dim", dim.num_in_group.offset), &format!("value.{}.length", member))
            ));
            code.push("    }".to_string());
            code.push(format!("    for (const item of value.{}) {{", member));
            code.push(format!("      {}Codec.encodeBody(w, item);", ty));
            code.push("    }".to_string());
        }
        for (data, member) in &var_data {
            let bytes = if data.is_text() {
                format!("new TextEncoder().encode(value.{})", member)
            } else {
                format!("value.{}", member)
            };
            code.push("    {".to_string());
            code.push(format!("      const bytes = {};", bytes));
            code.push(format!(
                "      sbe.checkLength(bytes.length, {}, {});",
                max_count(&data.length),
                quote_single(&format!("{}.{}", path, data.name))
            ));
            code.push(format!("      const at = w.reserve({});", data.length.width()));
            code.push("      const view = w.view();".to_string());
            code.push(format!("      {}", set_number(&data.length, "at", "bytes.length")));
            code.push("      w.append(bytes);".to_string());
            code.push("    }".to_string());
        }
        code.push("  }".to_string());
        code.push(String::new());

        code.push("  /** Returns the decoded value and the offset just past it. */".to_string());
        code.push(format!(
            "  static decodeBody(view: DataView, offset: number, blockLength: number): [{}, number] {{",
            type_name
        ));
        code.push(format!(
            "    sbe.checkBounds(view, offset, Math.min(blockLength, {}.BLOCK_LENGTH), {});",
            codec,
            quote_single(path)
        ));
        code.push(format!("    const value: {} = {{", type_name));
        code.extend(indent(&block.decode, 3));
        for (_, member, _) in &groups {
            code.push(format!("      {}: [],", member));
        }
        for (data, member) in &var_data {
            let empty = if data.is_text() { "''" } else { "new Uint8Array(0)" };
            code.push(format!("      {}: {},", member, empty));
        }
        code.push("    };".to_string());
        code.push("    let pos = offset + blockLength;".to_string());
        for (group, member, ty) in &groups {
            let dim = &group.dimension;
            let group_path = quote_single(&format!("{}.{}", path, group.name));
            code.push("    {".to_string());
            code.push(format!("      sbe.checkBounds(view, pos, {}, {});", dim.encoded_length, group_path));
            code.push(format!(
                "      const groupBlockLength = {};",
                get_number(&dim.block_length, &offset_expr("pos", dim.block_length.offset))
            ));
            code.push(format!(
                "      const count = {};",
                get_number(&dim.num_in_group, &offset_expr("pos", dim.num_in_group.offset))
            ));
            code.push(format!("      pos += {};", dim.encoded_length));
            code.push(format!(
                "      sbe.checkGroup(view, pos, count, groupBlockLength + {}, {});",
                group.body.trailer_length(),
                group_path
            ));
            code.push("      for (let i = 0; i < count; i++) {".to_string());
            code.push(format!("        const [item, next] = {}Codec.decodeBody(view, pos, groupBlockLength);", ty));
            code.push(format!("        value.{}.push(item);", member));
            code.push("        pos = next;".to_string());
            code.push("      }".to_string());
            code.push("    }".to_string());
        }
        for (data, member) in &var_data {
            let data_path = quote_single(&format!("{}.{}", path, data.name));
            code.push("    {".to_string());
            code.push(format!("      sbe.checkBounds(view, pos, {}, {});", data.length.width(), data_path));
            code.push(format!("      const length = {};", get_number(&data.length, "pos")));
            code.push(format!("      pos += {};", data.length.width()));
            if data.is_text() {
                code.push(format!(
                    "      value.{} = sbe.readText(view, pos, length, {}, {});",
                    member,
                    quote_single(data.character_encoding.unwrap_or("UTF-8")),
                    data_path
                ));
            } else {
                code.push(format!("      value.{} = sbe.readBytes(view, pos, length, {});", member, data_path));
            }
            code.push("      pos += length;".to_string());
            code.push("    }".to_string());
        }
        code.push("    return [value, pos];".to_string());
        code.push("  }".to_string());
        code.push("}".to_string());

        for (group, _, ty) in &groups {
            code.push(String::new());
            self.render_body(schema, ty, &format!("{}.{}", path, group.name), &group.body, None, code)?;
        }
        Ok(())
    }

    fn render_message_entry(&self, schema: &SchemaLayout, message: &MessageLayout, type_name: &str, code: &mut Vec<String>) {
        let header = &schema.header;
        let codec = format!("{}Codec", type_name);
        let header_length = header.encoded_length();
        let slot_at = |slot: &HeaderSlot| slot.offset.to_string();

        code.push("  /** Encodes the message header followed by the body. */".to_string());
        code.push(format!("  static encode(value: {}): Uint8Array {{", type_name));
        code.push("    const w = new sbe.Writer();".to_string());
        code.push(format!("    w.reserve({});", header_length));
        code.push("    const view = w.view();".to_string());
        for (slot, value) in [
            (&header.block_length, "BLOCK_LENGTH"),
            (&header.template_id, "TEMPLATE_ID"),
            (&header.schema_id, "SCHEMA_ID"),
            (&header.version, "SCHEMA_VERSION"),
        ] {
            code.push(format!("    {}", set_number(slot, &slot_at(slot), &format!("{}.{}", codec, value))));
        }
        code.push(format!("    {}.encodeBody(w, value);", codec));
        code.push("    return w.finish();".to_string());
        code.push("  }".to_string());
        code.push(String::new());

        code.push(format!("  static decode(bytes: Uint8Array): {} {{", type_name));
        code.push("    const view = new DataView(bytes.buffer, bytes.byteOffset, bytes.byteLength);".to_string());
        code.push(format!(
            "    sbe.checkBounds(view, 0, {}, {});",
            header_length,
            quote_single(header.composite.type_name)
        ));
        code.push(format!(
            "    const templateId = {};",
            get_number(&header.template_id, &slot_at(&header.template_id))
        ));
        code.push(format!("    if (templateId !== {}.TEMPLATE_ID) {{", codec));
        code.push(format!(
            "      throw new sbe.DecodeError(`{} has template id ${{{}.TEMPLATE_ID}} but the header says ${{templateId}}`);",
            message.name, codec
        ));
        code.push("    }".to_string());
        code.push(format!(
            "    const blockLength = {};",
            get_number(&header.block_length, &slot_at(&header.block_length))
        ));
        code.push(format!("    return {}.decodeBody(view, {}, blockLength)[0];", codec, header_length));
        code.push("  }".to_string());
        code.push(String::new());
    }
}

/// A single-quoted TypeScript string literal.
fn quote_single(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl CodeGenerator for TypeScriptGenerator {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn render_composite(&self, _schema: &SchemaLayout, composite: &CompositeLayout) -> Result<GeneratedUnit, SbeError> {
        let name = self.namer().type_name(composite.type_name)?;
        let members: Vec<&FieldLayout> = composite.members.iter().collect();
        let block = self.render_fields(&members, "offset")?;
        let mut types = BTreeMap::new();
        field_types(&composite.members, &mut types);

        let mut code = Vec::new();
        if let Some(description) = composite.description {
            code.push(format!("/** {} */", description));
        }
        code.push(format!("export interface {} {{", name));
        code.extend(indent(&block.members, 1));
        code.push("}".to_string());
        code.push(String::new());
        code.push(format!("export class {}Codec {{", name));
        code.push(format!("  static readonly ENCODED_LENGTH = {};", composite.encoded_length));
        code.extend(indent(&block.consts, 1));
        code.push(String::new());
        code.push(format!("  static decode(view: DataView, offset: number): {} {{", name));
        code.push(format!(
            "    sbe.checkBounds(view, offset, {}Codec.ENCODED_LENGTH, {});",
            name,
            quote_single(composite.type_name)
        ));
        code.push("    return {".to_string());
        code.extend(indent(&block.decode, 3));
        code.push("    };".to_string());
        code.push("  }".to_string());
        code.push(String::new());
        code.push(format!("  static encode(view: DataView, offset: number, value: {}): void {{", name));
        code.extend(indent(&block.encode, 2));
        code.push("  }".to_string());
        code.push("}".to_string());
        code.push(String::new());

        self.unit(composite.type_name, &types, code)
    }

    fn render_enum(&self, _schema: &SchemaLayout, layout: &EnumLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;
        let numeric = |value: &PrimitiveValue| {
            let text = literal(value, layout.encoding);
            text.trim_end_matches('n').to_string()
        };

        let mut code = Vec::new();
        if let Some(description) = layout.description {
            code.push(format!("/** {} */", description));
        }
        code.push(format!("export enum {} {{", name));
        for value in &layout.values {
            code.push(format!("  {} = {},", namer.variant(value.name)?, numeric(value.value)));
        }
        code.push(format!(
            "  {} = {},",
            namer.variant(EnumLayout::NULL_NAME)?,
            numeric(&layout.null_value)
        ));
        code.push("}".to_string());
        code.push(String::new());
        code.push(format!(
            "export const {}_ENCODED_LENGTH = {};",
            namer.constant(layout.type_name)?,
            layout.width()
        ));
        code.push(String::new());

        self.unit(layout.type_name, &BTreeMap::new(), code)
    }

    fn render_set(&self, _schema: &SchemaLayout, layout: &SetLayout) -> Result<GeneratedUnit, SbeError> {
        let namer = self.namer();
        let name = namer.type_name(layout.type_name)?;
        let big = is_big(layout.encoding);
        let bit = |n: u32| if big { format!("(1n << {}n)", n) } else { format!("(1 << {})", n) };
        let zero = if big { "0n" } else { "0" };

        let mut choices = Vec::new();
        for choice in &layout.choices {
            choices.push((namer.member(choice.name)?, choice.bit));
        }

        let mut code = Vec::new();
        if let Some(description) = layout.description {
            code.push(format!("/** {} */", description));
        }
        code.push(format!("export interface {} {{", name));
        for (member, _) in &choices {
            code.push(format!("  {}: boolean;", member));
        }
        code.push("}".to_string());
        code.push(String::new());
        code.push(format!("export class {}Codec {{", name));
        code.push(format!("  static readonly ENCODED_LENGTH = {};", layout.width()));
        code.push(String::new());
        code.push(format!("  static decode(view: DataView, offset: number): {} {{", name));
        code.push(format!("    const bits = {};", get(layout.encoding, layout.byte_order, "offset")));
        code.push("    return {".to_string());
        for (member, n) in &choices {
            code.push(format!("      {}: (bits & {}) !== {},", member, bit(*n), zero));
        }
        code.push("    };".to_string());
        code.push("  }".to_string());
        code.push(String::new());
        code.push(format!("  static encode(view: DataView, offset: number, value: {}): void {{", name));
        code.push(format!("    let bits = {};", zero));
        for (member, n) in &choices {
            code.push(format!("    if (value.{}) {{", member));
            code.push(format!("      bits |= {};", bit(*n)));
            code.push("    }".to_string());
        }
        code.push(format!("    {}", set(layout.encoding, layout.byte_order, "offset", "bits")));
        code.push("  }".to_string());
        code.push("}".to_string());
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
        Ok(Some(GeneratedUnit::new("runtime.ts", format!("{}\n\n{}", FILE_HEADER, RUNTIME))))
    }

    fn render_index(&self, _schema: &SchemaLayout, units: &[GeneratedUnit]) -> Result<Option<GeneratedUnit>, SbeError> {
        let mut code = vec![FILE_HEADER.to_string(), String::new()];
        for unit in units {
            code.push(format!("export * from './{}';", unit.stem()));
        }
        code.push(String::new());
        Ok(Some(GeneratedUnit::new("index.ts", code.join("\n"))))
    }
}

const RUNTIME: &str = r#"export class DecodeError extends Error {
  constructor(message: string) {
    super(message);
    this.name = 'DecodeError';
  }
}

export function checkBounds(view: DataView, offset: number, needed: number, path: string): void {
  if (offset + needed > view.byteLength) {
    throw new DecodeError(`${path} needs ${needed} bytes at offset ${offset} but the buffer holds ${view.byteLength}`);
  }
}

export class EncodeError extends Error {
  constructor(message: string) {
    super(message);
    this.name = 'EncodeError';
  }
}

/** `elementLength` counts the block and the group and var-data headers of one element. */
export function checkGroup(view: DataView, offset: number, count: number, elementLength: number, path: string): void {
  const least = Math.max(elementLength, 1);
  if (count * least > view.byteLength - offset) {
    throw new DecodeError(
      `group ${path} at offset ${offset} declares ${count} elements of at least ${least} bytes, more than the buffer holds`,
    );
  }
}

export function checkLength(length: number, max: number, path: string): void {
  if (length > max) {
    throw new EncodeError(`${path} has ${length} entries but its header holds at most ${max}`);
  }
}

/** Fixed-length char arrays: NUL padded, one byte per character. */
export function readChars(view: DataView, offset: number, length: number): string {
  let text = '';
  for (let i = 0; i < length; i++) {
    const code = view.getUint8(offset + i);
    if (code === 0) {
      break;
    }
    text += String.fromCharCode(code);
  }
  return text;
}

export function writeChars(view: DataView, offset: number, length: number, value: string, path: string): void {
  if (value.length > length) {
    throw new EncodeError(`${path} holds at most ${length} characters`);
  }
  for (let i = 0; i < length; i++) {
    view.setUint8(offset + i, i < value.length ? value.charCodeAt(i) & 0xff : 0);
  }
}

export function readBytes(view: DataView, offset: number, length: number, path: string): Uint8Array {
  checkBounds(view, offset, length, path);
  const start = view.byteOffset + offset;
  return new Uint8Array(view.buffer.slice(start, start + length));
}

export function readText(view: DataView, offset: number, length: number, encoding: string, path: string): string {
  const bytes = readBytes(view, offset, length, path);
  try {
    return new TextDecoder(encoding.toLowerCase(), { fatal: true }).decode(bytes);
  } catch (err) {
    throw new DecodeError(`${path} is not valid ${encoding}`);
  }
}

/** A growable byte buffer for encoders. Views taken before a `reserve` may be stale. */
export class Writer {
  private bytes = new Uint8Array(256);
  private used = 0;

  get length(): number {
    return this.used;
  }

  /** Appends `n` zero bytes and returns their offset. */
  reserve(n: number): number {
    const at = this.used;
    if (at + n > this.bytes.length) {
      let size = this.bytes.length * 2;
      while (size < at + n) {
        size *= 2;
      }
      const grown = new Uint8Array(size);
      grown.set(this.bytes.subarray(0, at));
      this.bytes = grown;
    }
    this.used += n;
    return at;
  }

  append(bytes: Uint8Array): void {
    const at = this.reserve(bytes.length);
    this.bytes.set(bytes, at);
  }

  view(): DataView {
    return new DataView(this.bytes.buffer, 0, this.used);
  }

  finish(): Uint8Array {
    return this.bytes.slice(0, this.used);
  }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use brine_sbe_schema::*;

    #[test]
    fn message_unit() {
        let ir = IrBuilder::new(1, 0, ByteOrder::BigEndian)
            .add_message(
                MessageDef::new("Trade", 7)
                    .field(FieldDef::primitive("tradeId", 1, PrimitiveType::Uint64))
                    .field(FieldDef::primitive("qty", 2, PrimitiveType::Int32))
                    .group(GroupDef::new("legs", 3).field(FieldDef::primitive("px", 4, PrimitiveType::Double)))
                    .var_data(VarDataDef::text("note", 5)),
            )
            .build();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let unit = TypeScriptGenerator::default().render_message(&schema, &schema.messages[0]).unwrap();
        assert_eq!(unit.file_name, "Trade.ts");

        let code = &unit.contents;
        assert!(code.contains("import * as sbe from './runtime';"));
        assert!(code.contains("export interface Trade {"));
        assert!(code.contains("  tradeId: bigint;"));
        assert!(code.contains("  legs: TradeLegs[];"));
        assert!(code.contains("  note: string;"));
        assert!(code.contains("static readonly TEMPLATE_ID = 7;"));
        assert!(code.contains("tradeId: view.getBigUint64(offset, false),"));
        assert!(code.contains("view.setInt32(offset + 8, value.qty, false);"));
        assert!(code.contains("sbe.checkGroup(view, pos, count, groupBlockLength + 0, 'Trade.legs');"));
        assert!(code.contains("sbe.checkLength(value.legs.length, 65535, 'Trade.legs');"));
        assert!(code.contains("sbe.checkLength(bytes.length, 4294967295, 'Trade.note');"));
        assert!(code.contains("export class TradeLegsCodec {"));
    }

    #[test]
    fn set_and_enum_units() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::set("Flags", PrimitiveType::Uint64, &[("hot", 0), ("cold", 63)]))
            .add_type(TypeDef::enumeration("Side", PrimitiveType::Uint8, &[("BUY", 1), ("SELL", 2)]))
            .build();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let generator = TypeScriptGenerator::default();

        let TypeLayout::Set(ref flags) = schema.types[0] else {
            panic!("expected a set");
        };
        let set = generator.render_set(&schema, flags).unwrap();
        assert!(set.contents.contains("cold: (bits & (1n << 63n)) !== 0n,"));
        assert!(set.contents.contains("const bits = view.getBigUint64(offset, true);"));

        let TypeLayout::Enum(ref side) = schema.types[1] else {
            panic!("expected an enum");
        };
        let side = generator.render_enum(&schema, side).unwrap();
        assert!(side.contents.contains("  BUY = 1,"));
        assert!(side.contents.contains("  NULL_VAL = 255,"));
    }
}
