//! Byte layout derived from IR token streams.
//!
//! Layouts borrow names and literals from the token stream they were built
//! from, so a layout (and any [`Value`](crate::Value) decoded with it) cannot
//! outlive the [`Ir`].

use serde::Serialize;
use std::collections::HashMap;

use crate::error::IrError;
use crate::ir::Ir;
use crate::primitive::{ByteOrder, PrimitiveType, PrimitiveValue};
use crate::token::{Presence, Signal, Token};
use crate::walker::{members, span_at, split_body, Span};

/// A primitive (or fixed array of primitives) as it sits on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveLayout<'a> {
    pub primitive_type: PrimitiveType,
    pub byte_order: ByteOrder,
    pub array_length: usize,
    pub presence: Presence,
    pub const_value: Option<&'a PrimitiveValue>,
    pub null_value: PrimitiveValue,
    pub character_encoding: Option<&'a str>,
}

impl<'a> PrimitiveLayout<'a> {
    fn from_token(token: &'a Token, index: usize) -> Result<PrimitiveLayout<'a>, IrError> {
        let primitive_type = token.primitive_type().ok_or_else(|| {
            IrError::malformed(index, format!("encoding \"{}\" has no primitive type", token.name))
        })?;

        let const_value = token.encoding.const_value.as_ref();
        if token.is_constant_encoding() && const_value.is_none() {
            return Err(IrError::malformed(
                index,
                format!("constant \"{}\" has no value", token.name),
            ));
        }

        Ok(PrimitiveLayout {
            primitive_type,
            byte_order: token.encoding.byte_order,
            array_length: token.array_length.max(1),
            presence: token.encoding.presence,
            const_value,
            null_value: token
                .encoding
                .null_value
                .clone()
                .unwrap_or_else(|| primitive_type.null_value()),
            character_encoding: token.encoding.character_encoding.as_deref(),
        })
    }

    pub fn is_constant(&self) -> bool {
        self.presence == Presence::Constant
    }

    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }

    pub fn is_array(&self) -> bool {
        self.array_length > 1
    }

    /// Char arrays with a declared character encoding are handled as text.
    pub fn is_text(&self) -> bool {
        self.primitive_type == PrimitiveType::Char
            && (self.is_array() || self.character_encoding.is_some())
    }

    /// Bytes occupied in the block. Constants occupy none.
    pub fn width(&self) -> usize {
        if self.is_constant() {
            0
        } else {
            self.primitive_type.size() * self.array_length
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue<'a> {
    pub name: &'a str,
    pub value: &'a PrimitiveValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumLayout<'a> {
    pub type_name: &'a str,
    pub encoding: PrimitiveType,
    pub byte_order: ByteOrder,
    pub values: Vec<EnumValue<'a>>,
    pub null_value: PrimitiveValue,
    pub description: Option<&'a str>,
}

impl<'a> EnumLayout<'a> {
    pub const NULL_NAME: &'static str = "NULL_VAL";

    pub fn width(&self) -> usize {
        self.encoding.size()
    }

    pub fn by_value(&self, raw: &PrimitiveValue) -> Option<&EnumValue<'a>> {
        self.values.iter().find(|v| v.value.matches(raw))
    }

    pub fn by_name(&self, name: &str) -> Option<&EnumValue<'a>> {
        self.values.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice<'a> {
    pub name: &'a str,
    pub bit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetLayout<'a> {
    pub type_name: &'a str,
    pub encoding: PrimitiveType,
    pub byte_order: ByteOrder,
    pub choices: Vec<Choice<'a>>,
    pub description: Option<&'a str>,
}

impl<'a> SetLayout<'a> {
    pub fn width(&self) -> usize {
        self.encoding.size()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeLayout<'a> {
    pub type_name: &'a str,
    pub encoded_length: usize,
    pub members: Vec<FieldLayout<'a>>,
    pub description: Option<&'a str>,
}

impl<'a> CompositeLayout<'a> {
    pub fn member(&self, name: &str) -> Option<&FieldLayout<'a>> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind<'a> {
    Primitive(PrimitiveLayout<'a>),
    Composite(CompositeLayout<'a>),
    Enum(EnumLayout<'a>),
    Set(SetLayout<'a>),
}

impl<'a> FieldKind<'a> {
    pub fn width(&self) -> usize {
        match self {
            FieldKind::Primitive(p) => p.width(),
            FieldKind::Composite(c) => c.encoded_length,
            FieldKind::Enum(e) => e.width(),
            FieldKind::Set(s) => s.width(),
        }
    }

    /// Name of the referenced composite, enum or set type.
    pub fn type_name(&self) -> Option<&'a str> {
        match self {
            FieldKind::Primitive(_) => None,
            FieldKind::Composite(c) => Some(c.type_name),
            FieldKind::Enum(e) => Some(e.type_name),
            FieldKind::Set(s) => Some(s.type_name),
        }
    }
}

/// A field of a block (message, group element or composite).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldLayout<'a> {
    pub name: &'a str,
    pub id: i32,
    pub since_version: i32,
    /// Offset from the start of the enclosing block.
    pub offset: usize,
    pub width: usize,
    pub description: Option<&'a str>,
    pub kind: FieldKind<'a>,
}

impl<'a> FieldLayout<'a> {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, FieldKind::Primitive(ref p) if p.is_constant())
    }

    pub fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// An unsigned integer at a fixed offset inside a header composite:
/// the message header members, a group's dimensions, a var-data length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderSlot {
    pub primitive_type: PrimitiveType,
    pub byte_order: ByteOrder,
    pub offset: usize,
}

impl HeaderSlot {
    fn from_member(composite: &CompositeLayout, member: &str) -> Result<HeaderSlot, IrError> {
        let missing = || IrError::MissingMember {
            container: composite.type_name.to_owned(),
            member: member.to_owned(),
        };
        let field = composite.member(member).ok_or_else(missing)?;
        match field.kind {
            FieldKind::Primitive(ref p) if !p.is_constant() => Ok(HeaderSlot {
                primitive_type: p.primitive_type,
                byte_order: p.byte_order,
                offset: field.offset,
            }),
            _ => Err(missing()),
        }
    }

    pub fn width(&self) -> usize {
        self.primitive_type.size()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderLayout<'a> {
    pub composite: CompositeLayout<'a>,
    pub block_length: HeaderSlot,
    pub template_id: HeaderSlot,
    pub schema_id: HeaderSlot,
    pub version: HeaderSlot,
}

impl<'a> HeaderLayout<'a> {
    pub fn new(tokens: &'a [Token]) -> Result<HeaderLayout<'a>, IrError> {
        let composite = composite_layout(tokens)?;
        Ok(HeaderLayout {
            block_length: HeaderSlot::from_member(&composite, "blockLength")?,
            template_id: HeaderSlot::from_member(&composite, "templateId")?,
            schema_id: HeaderSlot::from_member(&composite, "schemaId")?,
            version: HeaderSlot::from_member(&composite, "version")?,
            composite,
        })
    }

    pub fn encoded_length(&self) -> usize {
        self.composite.encoded_length
    }
}

/// The repeating-group dimension header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionLayout<'a> {
    pub type_name: &'a str,
    pub block_length: HeaderSlot,
    pub num_in_group: HeaderSlot,
    pub encoded_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupLayout<'a> {
    pub name: &'a str,
    pub id: i32,
    pub since_version: i32,
    pub dimension: DimensionLayout<'a>,
    pub body: BodyLayout<'a>,
    pub description: Option<&'a str>,
}

impl<'a> GroupLayout<'a> {
    pub fn block_length(&self) -> usize {
        self.body.block_length()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDataLayout<'a> {
    pub name: &'a str,
    pub id: i32,
    pub since_version: i32,
    pub type_name: &'a str,
    pub length: HeaderSlot,
    pub character_encoding: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> VarDataLayout<'a> {
    pub fn is_text(&self) -> bool {
        self.character_encoding.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum BodyElement<'a> {
    Field(FieldLayout<'a>),
    Group(GroupLayout<'a>),
    VarData(VarDataLayout<'a>),
}

impl<'a> BodyElement<'a> {
    fn rank(&self) -> u8 {
        match self {
            BodyElement::Field(_) => 0,
            BodyElement::Group(_) => 1,
            BodyElement::VarData(_) => 2,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            BodyElement::Field(f) => f.name,
            BodyElement::Group(g) => g.name,
            BodyElement::VarData(v) => v.name,
        }
    }
}

/// A message or group body: fields, then groups, then var-data. The ordering
/// is checked on construction and cannot be broken afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyLayout<'a> {
    block_length: usize,
    elements: Vec<BodyElement<'a>>,
}

impl<'a> BodyLayout<'a> {
    pub fn new(
        owner: &str,
        block_length: usize,
        elements: Vec<BodyElement<'a>>,
    ) -> Result<BodyLayout<'a>, IrError> {
        if let Some(pair) = elements.windows(2).find(|pair| pair[0].rank() > pair[1].rank()) {
            return Err(IrError::malformed(
                0,
                format!(
                    "\"{}\" in \"{}\" is out of order after \"{}\"",
                    pair[1].name(),
                    owner,
                    pair[0].name()
                ),
            ));
        }

        let required = elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Field(f) => Some(f.end()),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        if required > block_length {
            return Err(IrError::BlockLengthTooSmall {
                name: owner.to_owned(),
                declared: block_length,
                required,
            });
        }

        Ok(BodyLayout { block_length, elements })
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    pub fn elements(&self) -> &[BodyElement<'a>] {
        &self.elements
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldLayout<'a>> + '_ {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupLayout<'a>> + '_ {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::Group(g) => Some(g),
            _ => None,
        })
    }

    pub fn var_data(&self) -> impl Iterator<Item = &VarDataLayout<'a>> + '_ {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::VarData(v) => Some(v),
            _ => None,
        })
    }

    /// Bytes that follow the block in every encoding: one dimension header per
    /// group and one length prefix per var-data, even when all are empty.
    pub fn trailer_length(&self) -> usize {
        let dimensions: usize = self.groups().map(|g| g.dimension.encoded_length).sum();
        let prefixes: usize = self.var_data().map(|v| v.length.offset + v.length.width()).sum();
        dimensions + prefixes
    }

    /// True when nothing follows the fixed block.
    pub fn is_fixed(&self) -> bool {
        self.groups().next().is_none() && self.var_data().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageLayout<'a> {
    pub name: &'a str,
    pub id: i32,
    pub since_version: i32,
    pub semantic_type: Option<&'a str>,
    pub description: Option<&'a str>,
    pub body: BodyLayout<'a>,
}

impl<'a> MessageLayout<'a> {
    pub fn block_length(&self) -> usize {
        self.body.block_length()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeLayout<'a> {
    Composite(CompositeLayout<'a>),
    Enum(EnumLayout<'a>),
    Set(SetLayout<'a>),
}

impl<'a> TypeLayout<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            TypeLayout::Composite(c) => c.type_name,
            TypeLayout::Enum(e) => e.type_name,
            TypeLayout::Set(s) => s.type_name,
        }
    }

    pub fn encoded_length(&self) -> usize {
        match self {
            TypeLayout::Composite(c) => c.encoded_length,
            TypeLayout::Enum(e) => e.width(),
            TypeLayout::Set(s) => s.width(),
        }
    }
}

/// Every layout of an [`Ir`], types first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaLayout<'a> {
    pub package_name: Option<&'a str>,
    pub id: i32,
    pub version: i32,
    pub byte_order: ByteOrder,
    pub header: HeaderLayout<'a>,
    pub types: Vec<TypeLayout<'a>>,
    pub messages: Vec<MessageLayout<'a>>,
}

impl<'a> SchemaLayout<'a> {
    /// Lays out the header, every type and every message, and checks that each
    /// composite, enum or set a message refers to is defined in `ir.types`.
    pub fn resolve(ir: &'a Ir) -> Result<SchemaLayout<'a>, IrError> {
        let header = HeaderLayout::new(&ir.header_structure)?;

        let mut types = Vec::with_capacity(ir.types.len());
        for tokens in &ir.types {
            if let Some(layout) = type_layout(tokens)? {
                types.push(layout);
            }
        }

        let known: HashMap<&str, &TypeLayout> = types.iter().map(|t| (t.name(), t)).collect();

        let mut messages = Vec::with_capacity(ir.messages.len());
        for tokens in &ir.messages {
            let message = message_layout(tokens)?;
            check_references(&message.body, message.name, &known)?;
            messages.push(message);
        }

        Ok(SchemaLayout {
            package_name: ir.package_name.as_deref(),
            id: ir.id,
            version: ir.version,
            byte_order: ir.byte_order,
            header,
            types,
            messages,
        })
    }

    pub fn message(&self, name: &str) -> Option<&MessageLayout<'a>> {
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn type_layout(&self, name: &str) -> Option<&TypeLayout<'a>> {
        self.types.iter().find(|t| t.name() == name)
    }
}

fn check_references(
    body: &BodyLayout,
    owner: &str,
    known: &HashMap<&str, &TypeLayout>,
) -> Result<(), IrError> {
    for field in body.fields() {
        if let Some(type_name) = field.kind.type_name() {
            if !known.contains_key(type_name) {
                return Err(IrError::UnresolvedType {
                    type_name: type_name.to_owned(),
                    referenced_by: format!("{}.{}", owner, field.name),
                });
            }
        }
    }
    for group in body.groups() {
        check_references(&group.body, &format!("{}.{}", owner, group.name), known)?;
    }
    Ok(())
}

fn expect_whole(tokens: &[Token], signal: Signal) -> Result<Span, IrError> {
    let first = tokens
        .first()
        .ok_or_else(|| IrError::malformed(0, "empty token stream"))?;
    if first.signal != signal {
        return Err(IrError::malformed(
            0,
            format!("expected {:?}, found {:?} \"{}\"", signal, first.signal, first.name),
        ));
    }
    let span = span_at(tokens, 0)?;
    if span.end != tokens.len() {
        return Err(IrError::malformed(span.end, "trailing tokens after the closing marker"));
    }
    Ok(span)
}

/// Layout of a message token stream (`BEGIN_MESSAGE` .. `END_MESSAGE`).
pub fn message_layout(tokens: &[Token]) -> Result<MessageLayout<'_>, IrError> {
    let span = expect_whole(tokens, Signal::BeginMessage)?;
    let message = &tokens[0];
    Ok(MessageLayout {
        name: &message.name,
        id: message.id,
        since_version: message.version,
        semantic_type: message.referenced_name.as_deref(),
        description: message.description.as_deref(),
        body: body_layout(tokens, span.inner(), message.encoded_length, &message.name)?,
    })
}

/// Layout of a standalone composite token stream, such as the message header.
pub fn composite_layout(tokens: &[Token]) -> Result<CompositeLayout<'_>, IrError> {
    let span = expect_whole(tokens, Signal::BeginComposite)?;
    composite_at(tokens, span)
}

/// Layout of one entry of `Ir::types`. Standalone encodings carry no layout of
/// their own and yield `None`.
pub fn type_layout(tokens: &[Token]) -> Result<Option<TypeLayout<'_>>, IrError> {
    let first = tokens
        .first()
        .ok_or_else(|| IrError::malformed(0, "empty type token stream"))?;
    let layout = match first.signal {
        Signal::BeginComposite => TypeLayout::Composite(composite_layout(tokens)?),
        Signal::BeginEnum => TypeLayout::Enum(enum_at(tokens, expect_whole(tokens, Signal::BeginEnum)?)?),
        Signal::BeginSet => TypeLayout::Set(set_at(tokens, expect_whole(tokens, Signal::BeginSet)?)?),
        Signal::Encoding => return Ok(None),
        other => {
            return Err(IrError::malformed(
                0,
                format!("{:?} \"{}\" does not start a type", other, first.name),
            ))
        }
    };
    Ok(Some(layout))
}

fn body_layout<'a>(
    tokens: &'a [Token],
    body: Span,
    declared_block_length: usize,
    owner: &str,
) -> Result<BodyLayout<'a>, IrError> {
    let spans = split_body(tokens, body)?;
    let mut elements = Vec::with_capacity(spans.fields.len() + spans.groups.len() + spans.var_data.len());

    let mut cursor = 0;
    for span in spans.fields {
        let field = field_at(tokens, span, cursor)?;
        cursor = field.end();
        elements.push(BodyElement::Field(field));
    }

    for span in spans.groups {
        elements.push(BodyElement::Group(group_at(tokens, span)?));
    }

    for span in spans.var_data {
        elements.push(BodyElement::VarData(var_data_at(tokens, span)?));
    }

    BodyLayout::new(owner, declared_block_length, elements)
}

fn field_at(tokens: &[Token], span: Span, cursor: usize) -> Result<FieldLayout<'_>, IrError> {
    let field = &tokens[span.start];
    let type_span = span_at(&tokens[..span.end], span.start + 1)?;
    if type_span.end != span.end - 1 {
        return Err(IrError::malformed(
            type_span.end,
            format!("field \"{}\" must hold exactly one type", field.name),
        ));
    }

    let kind = kind_at(tokens, type_span)?;
    Ok(FieldLayout {
        name: &field.name,
        id: field.id,
        since_version: field.version,
        offset: cursor.max(field.offset),
        width: kind.width(),
        description: field.description.as_deref(),
        kind,
    })
}

fn kind_at(tokens: &[Token], span: Span) -> Result<FieldKind<'_>, IrError> {
    let token = &tokens[span.start];
    match token.signal {
        Signal::Encoding => Ok(FieldKind::Primitive(PrimitiveLayout::from_token(token, span.start)?)),
        Signal::BeginComposite => Ok(FieldKind::Composite(composite_at(tokens, span)?)),
        Signal::BeginEnum => Ok(FieldKind::Enum(enum_at(tokens, span)?)),
        Signal::BeginSet => Ok(FieldKind::Set(set_at(tokens, span)?)),
        other => Err(IrError::malformed(
            span.start,
            format!("{:?} \"{}\" is not a field type", other, token.name),
        )),
    }
}

fn composite_at(tokens: &[Token], span: Span) -> Result<CompositeLayout<'_>, IrError> {
    let composite = &tokens[span.start];
    let mut cursor = 0;
    let mut layouts = Vec::new();

    for member in members(tokens, span.inner())? {
        let token = &tokens[member.start];
        let kind = kind_at(tokens, member)?;
        let offset = cursor.max(token.offset);
        let width = kind.width();
        cursor = offset + width;
        layouts.push(FieldLayout {
            name: &token.name,
            id: token.id,
            since_version: token.version,
            offset,
            width,
            description: token.description.as_deref(),
            kind,
        });
    }

    Ok(CompositeLayout {
        type_name: composite.applicable_type_name(),
        encoded_length: cursor.max(composite.encoded_length),
        members: layouts,
        description: composite.description.as_deref(),
    })
}

fn enum_at(tokens: &[Token], span: Span) -> Result<EnumLayout<'_>, IrError> {
    let begin = &tokens[span.start];
    let encoding = begin.primitive_type().ok_or_else(|| {
        IrError::malformed(span.start, format!("enum \"{}\" has no encoding type", begin.name))
    })?;

    let mut values = Vec::new();
    for i in span.inner().start..span.inner().end {
        let token = &tokens[i];
        if token.signal != Signal::ValidValue {
            return Err(IrError::malformed(i, format!("{:?} inside enum \"{}\"", token.signal, begin.name)));
        }
        let value = token.encoding.const_value.as_ref().ok_or_else(|| {
            IrError::malformed(i, format!("valid value \"{}\" has no value", token.name))
        })?;
        values.push(EnumValue { name: &token.name, value });
    }

    Ok(EnumLayout {
        type_name: begin.applicable_type_name(),
        encoding,
        byte_order: begin.encoding.byte_order,
        values,
        null_value: begin.encoding.applicable_null_value().unwrap_or_else(|| encoding.null_value()),
        description: begin.description.as_deref(),
    })
}

fn set_at(tokens: &[Token], span: Span) -> Result<SetLayout<'_>, IrError> {
    let begin = &tokens[span.start];
    let encoding = begin.primitive_type().ok_or_else(|| {
        IrError::malformed(span.start, format!("set \"{}\" has no encoding type", begin.name))
    })?;
    let bits = (encoding.size() * 8) as u64;

    let mut choices = Vec::new();
    for i in span.inner().start..span.inner().end {
        let token = &tokens[i];
        if token.signal != Signal::Choice {
            return Err(IrError::malformed(i, format!("{:?} inside set \"{}\"", token.signal, begin.name)));
        }
        let bit = token
            .encoding
            .const_value
            .as_ref()
            .and_then(PrimitiveValue::as_u64)
            .filter(|bit| *bit < bits)
            .ok_or_else(|| {
                IrError::malformed(i, format!("choice \"{}\" needs a bit index below {}", token.name, bits))
            })?;
        choices.push(Choice { name: &token.name, bit: bit as u32 });
    }

    Ok(SetLayout {
        type_name: begin.applicable_type_name(),
        encoding,
        byte_order: begin.encoding.byte_order,
        choices,
        description: begin.description.as_deref(),
    })
}

fn group_at(tokens: &[Token], span: Span) -> Result<GroupLayout<'_>, IrError> {
    let group = &tokens[span.start];
    let bounded = &tokens[..span.end];

    let dimension_span = span_at(bounded, span.start + 1)?;
    if tokens[dimension_span.start].signal != Signal::BeginComposite {
        return Err(IrError::malformed(
            dimension_span.start,
            format!("group \"{}\" has no dimension composite", group.name),
        ));
    }
    let composite = composite_at(tokens, dimension_span)?;
    let dimension = DimensionLayout {
        type_name: composite.type_name,
        block_length: HeaderSlot::from_member(&composite, "blockLength")?,
        num_in_group: HeaderSlot::from_member(&composite, "numInGroup")?,
        encoded_length: composite.encoded_length,
    };

    let body = Span::new(dimension_span.end, span.end - 1);
    Ok(GroupLayout {
        name: &group.name,
        id: group.id,
        since_version: group.version,
        dimension,
        body: body_layout(tokens, body, group.encoded_length, &group.name)?,
        description: group.description.as_deref(),
    })
}

fn var_data_at(tokens: &[Token], span: Span) -> Result<VarDataLayout<'_>, IrError> {
    let var_data = &tokens[span.start];
    let bounded = &tokens[..span.end];

    let composite_span = span_at(bounded, span.start + 1)?;
    let composite = &tokens[composite_span.start];
    if composite.signal != Signal::BeginComposite {
        return Err(IrError::malformed(
            composite_span.start,
            format!("var-data \"{}\" has no encoding composite", var_data.name),
        ));
    }

    let inner = composite_span.inner();
    let find = |name: &str| {
        tokens[inner.start..inner.end]
            .iter()
            .position(|t| t.signal == Signal::Encoding && t.name == name)
            .map(|p| (inner.start + p, &tokens[inner.start + p]))
            .ok_or_else(|| IrError::MissingMember {
                container: composite.name.clone(),
                member: name.to_owned(),
            })
    };

    let (length_index, length_token) = find("length")?;
    let (_, data_token) = find("varData")?;
    let length = PrimitiveLayout::from_token(length_token, length_index)?;

    Ok(VarDataLayout {
        name: &var_data.name,
        id: var_data.id,
        since_version: var_data.version,
        type_name: composite.applicable_type_name(),
        length: HeaderSlot {
            primitive_type: length.primitive_type,
            byte_order: length.byte_order,
            offset: length_token.offset,
        },
        character_encoding: data_token
            .encoding
            .character_encoding
            .as_deref()
            .or(var_data.encoding.character_encoding.as_deref()),
        description: var_data.description.as_deref(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FieldDef, GroupDef, IrBuilder, MessageDef, TypeDef, VarDataDef};

    fn sample() -> Ir {
        IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66)]))
            .add_message(
                MessageDef::new("Order", 7)
                    .block_length(12)
                    .field(FieldDef::primitive("quantity", 1, PrimitiveType::Uint32))
                    .field(FieldDef::new(
                        "venue",
                        2,
                        TypeDef::primitive("venue", PrimitiveType::Char).constant("XLON"),
                    ))
                    .field(FieldDef::new(
                        "model",
                        3,
                        TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66)]),
                    ))
                    .group(
                        GroupDef::new("legs", 4)
                            .field(FieldDef::primitive("price", 5, PrimitiveType::Int64))
                            .var_data(VarDataDef::text("note", 6)),
                    )
                    .var_data(VarDataDef::text("text", 8)),
            )
            .build()
    }

    #[test]
    fn offsets_and_widths() {
        let ir = sample();
        let schema = SchemaLayout::resolve(&ir).unwrap();
        let order = schema.message("Order").unwrap();

        let fields: Vec<_> = order.body.fields().map(|f| (f.name, f.offset, f.width)).collect();
        assert_eq!(fields, vec![("quantity", 0, 4), ("venue", 4, 0), ("model", 4, 1)]);
        assert_eq!(order.block_length(), 12);
        assert!(order.body.fields().nth(1).unwrap().is_constant());

        let legs = order.body.groups().next().unwrap();
        assert_eq!(legs.block_length(), 8);
        assert_eq!(legs.dimension.encoded_length, 4);
        assert_eq!(legs.dimension.num_in_group.offset, 2);
        assert_eq!(legs.body.var_data().next().unwrap().name, "note");

        let text = order.body.var_data().next().unwrap();
        assert_eq!(text.length.primitive_type, PrimitiveType::Uint32);
        assert_eq!(text.character_encoding, Some("UTF-8"));

        assert_eq!(schema.header.encoded_length(), 8);
        assert_eq!(schema.header.template_id.offset, 2);
    }

    #[test]
    fn body_order_enforced() {
        let ir = sample();
        let order = message_layout(&ir.messages[0]).unwrap();
        let mut elements: Vec<BodyElement> = order.body.elements().to_vec();
        elements.swap(0, 3);
        assert!(matches!(
            BodyLayout::new("Order", 12, elements),
            Err(IrError::Malformed { .. })
        ));
    }

    #[test]
    fn block_length_too_small() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_message(
                MessageDef::new("Tiny", 1)
                    .block_length(2)
                    .field(FieldDef::primitive("big", 1, PrimitiveType::Uint64)),
            )
            .build();
        assert_eq!(
            message_layout(&ir.messages[0]),
            Err(IrError::BlockLengthTooSmall { name: "Tiny".to_owned(), declared: 2, required: 8 })
        );
    }

    #[test]
    fn unresolved_type() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_message(MessageDef::new("M", 1).field(FieldDef::new(
                "side",
                1,
                TypeDef::enumeration("Side", PrimitiveType::Uint8, &[("BUY", 1)]),
            )))
            .build();
        match SchemaLayout::resolve(&ir) {
            Err(IrError::UnresolvedType { type_name, referenced_by }) => {
                assert_eq!(type_name, "Side");
                assert_eq!(referenced_by, "M.side");
            }
            other => panic!("expected unresolved type, got {:?}", other),
        }
    }

    #[test]
    fn composite_declared_length_wins_when_larger() {
        let mut ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::composite(
                "Pair",
                vec![
                    TypeDef::primitive("a", PrimitiveType::Uint8),
                    TypeDef::primitive("b", PrimitiveType::Uint16),
                ],
            ))
            .build();
        let pair = composite_layout(&ir.types[0]).unwrap();
        assert_eq!(pair.encoded_length, 3);
        assert_eq!(pair.member("b").unwrap().offset, 1);

        ir.types[0][0].encoded_length = 8;
        assert_eq!(composite_layout(&ir.types[0]).unwrap().encoded_length, 8);
    }

    #[test]
    fn set_bits_must_fit() {
        let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
            .add_type(TypeDef::set("Flags", PrimitiveType::Uint8, &[("a", 0), ("b", 8)]))
            .build();
        assert!(matches!(type_layout(&ir.types[0]), Err(IrError::Malformed { .. })));
    }

    #[test]
    fn header_missing_member() {
        let mut ir = sample();
        ir.header_structure = IrBuilder::composite_tokens(
            &TypeDef::composite(
                "messageHeader",
                vec![TypeDef::primitive("blockLength", PrimitiveType::Uint16)],
            ),
            ByteOrder::LittleEndian,
        );
        assert_eq!(
            HeaderLayout::new(&ir.header_structure),
            Err(IrError::MissingMember {
                container: "messageHeader".to_owned(),
                member: "templateId".to_owned(),
            })
        );
    }
}
