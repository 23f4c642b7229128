//! Programmatic construction of [`Ir`] token streams.
//!
//! The builder does the bookkeeping an SBE front end would: component token
//! counts, running offsets, encoded lengths and block lengths. It is used by
//! tests, the demo app and anyone holding a schema in code rather than as an
//! IR file.

use crate::ir::Ir;
use crate::primitive::{ByteOrder, PrimitiveKind, PrimitiveType, PrimitiveValue};
use crate::token::{Encoding, Presence, Signal, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Primitive {
        name: String,
        primitive: PrimitiveType,
        array_length: usize,
        presence: Presence,
        const_value: Option<PrimitiveValue>,
        null_value: Option<PrimitiveValue>,
        character_encoding: Option<String>,
    },
    Composite {
        name: String,
        members: Vec<TypeDef>,
    },
    Enum {
        name: String,
        encoding: PrimitiveType,
        values: Vec<(String, PrimitiveValue)>,
    },
    Set {
        name: String,
        encoding: PrimitiveType,
        choices: Vec<(String, u32)>,
    },
}

impl TypeDef {
    pub fn primitive(name: &str, primitive: PrimitiveType) -> TypeDef {
        TypeDef::Primitive {
            name: name.to_owned(),
            primitive,
            array_length: 1,
            presence: Presence::Required,
            const_value: None,
            null_value: None,
            character_encoding: None,
        }
    }

    pub fn composite(name: &str, members: Vec<TypeDef>) -> TypeDef {
        TypeDef::Composite { name: name.to_owned(), members }
    }

    pub fn enumeration(name: &str, encoding: PrimitiveType, values: &[(&str, i64)]) -> TypeDef {
        let literal = |v: i64| match encoding.kind() {
            PrimitiveKind::Signed => PrimitiveValue::Int(v),
            _ => PrimitiveValue::UInt(v as u64),
        };
        TypeDef::Enum {
            name: name.to_owned(),
            encoding,
            values: values.iter().map(|(n, v)| ((*n).to_owned(), literal(*v))).collect(),
        }
    }

    pub fn set(name: &str, encoding: PrimitiveType, choices: &[(&str, u32)]) -> TypeDef {
        TypeDef::Set {
            name: name.to_owned(),
            encoding,
            choices: choices.iter().map(|(n, bit)| ((*n).to_owned(), *bit)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDef::Primitive { name, .. }
            | TypeDef::Composite { name, .. }
            | TypeDef::Enum { name, .. }
            | TypeDef::Set { name, .. } => name,
        }
    }

    /// Turns a primitive into a fixed array of `len` elements.
    pub fn array(mut self, len: usize) -> TypeDef {
        if let TypeDef::Primitive { ref mut array_length, .. } = self {
            *array_length = len;
        }
        self
    }

    pub fn constant(mut self, value: impl Into<PrimitiveValue>) -> TypeDef {
        if let TypeDef::Primitive { ref mut presence, ref mut const_value, .. } = self {
            *presence = Presence::Constant;
            *const_value = Some(value.into());
        }
        self
    }

    pub fn optional(mut self) -> TypeDef {
        if let TypeDef::Primitive { ref mut presence, .. } = self {
            *presence = Presence::Optional;
        }
        self
    }

    pub fn null_value(mut self, value: PrimitiveValue) -> TypeDef {
        if let TypeDef::Primitive { ref mut null_value, .. } = self {
            *null_value = Some(value);
        }
        self
    }

    pub fn character_encoding(mut self, encoding: &str) -> TypeDef {
        if let TypeDef::Primitive { ref mut character_encoding, .. } = self {
            *character_encoding = Some(encoding.to_owned());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub id: i32,
    pub since_version: i32,
    pub ty: TypeDef,
}

impl FieldDef {
    pub fn new(name: &str, id: i32, ty: TypeDef) -> FieldDef {
        FieldDef { name: name.to_owned(), id, since_version: 0, ty }
    }

    /// A field of a plain primitive type.
    pub fn primitive(name: &str, id: i32, primitive: PrimitiveType) -> FieldDef {
        FieldDef::new(name, id, TypeDef::primitive(primitive.name(), primitive))
    }

    pub fn since(mut self, version: i32) -> FieldDef {
        self.since_version = version;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDataDef {
    pub name: String,
    pub id: i32,
    pub length_type: PrimitiveType,
    pub character_encoding: Option<String>,
}

impl VarDataDef {
    /// Opaque bytes with a `uint32` length prefix.
    pub fn bytes(name: &str, id: i32) -> VarDataDef {
        VarDataDef {
            name: name.to_owned(),
            id,
            length_type: PrimitiveType::Uint32,
            character_encoding: None,
        }
    }

    /// UTF-8 text with a `uint32` length prefix.
    pub fn text(name: &str, id: i32) -> VarDataDef {
        VarDataDef::bytes(name, id).character_encoding("UTF-8")
    }

    pub fn length_type(mut self, primitive: PrimitiveType) -> VarDataDef {
        self.length_type = primitive;
        self
    }

    pub fn character_encoding(mut self, encoding: &str) -> VarDataDef {
        self.character_encoding = Some(encoding.to_owned());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    pub name: String,
    pub id: i32,
    pub block_length: Option<usize>,
    pub dimension: TypeDef,
    pub fields: Vec<FieldDef>,
    pub groups: Vec<GroupDef>,
    pub var_data: Vec<VarDataDef>,
}

impl GroupDef {
    /// A group with the usual `groupSizeEncoding` (two `uint16`s).
    pub fn new(name: &str, id: i32) -> GroupDef {
        GroupDef {
            name: name.to_owned(),
            id,
            block_length: None,
            dimension: TypeDef::composite(
                "groupSizeEncoding",
                vec![
                    TypeDef::primitive("blockLength", PrimitiveType::Uint16),
                    TypeDef::primitive("numInGroup", PrimitiveType::Uint16),
                ],
            ),
            fields: Vec::new(),
            groups: Vec::new(),
            var_data: Vec::new(),
        }
    }

    pub fn block_length(mut self, block_length: usize) -> GroupDef {
        self.block_length = Some(block_length);
        self
    }

    pub fn dimension(mut self, dimension: TypeDef) -> GroupDef {
        self.dimension = dimension;
        self
    }

    pub fn field(mut self, field: FieldDef) -> GroupDef {
        self.fields.push(field);
        self
    }

    pub fn group(mut self, group: GroupDef) -> GroupDef {
        self.groups.push(group);
        self
    }

    pub fn var_data(mut self, var_data: VarDataDef) -> GroupDef {
        self.var_data.push(var_data);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub name: String,
    pub id: i32,
    pub block_length: Option<usize>,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    pub groups: Vec<GroupDef>,
    pub var_data: Vec<VarDataDef>,
}

impl MessageDef {
    pub fn new(name: &str, id: i32) -> MessageDef {
        MessageDef {
            name: name.to_owned(),
            id,
            block_length: None,
            description: None,
            fields: Vec::new(),
            groups: Vec::new(),
            var_data: Vec::new(),
        }
    }

    pub fn block_length(mut self, block_length: usize) -> MessageDef {
        self.block_length = Some(block_length);
        self
    }

    pub fn description(mut self, description: &str) -> MessageDef {
        self.description = Some(description.to_owned());
        self
    }

    pub fn field(mut self, field: FieldDef) -> MessageDef {
        self.fields.push(field);
        self
    }

    pub fn group(mut self, group: GroupDef) -> MessageDef {
        self.groups.push(group);
        self
    }

    pub fn var_data(mut self, var_data: VarDataDef) -> MessageDef {
        self.var_data.push(var_data);
        self
    }
}

/// Builds an [`Ir`] one type and message at a time.
///
/// ```
/// use brine_sbe_schema::*;
///
/// let ir = IrBuilder::new(7, 1, ByteOrder::LittleEndian)
///     .package("demo")
///     .add_message(MessageDef::new("Heartbeat", 1).field(FieldDef::primitive("seq", 1, PrimitiveType::Uint64)))
///     .build();
///
/// assert_eq!(ir.messages[0][0].encoded_length, 8);
/// assert_eq!(ir.messages[0][0].component_token_count, 5);
/// ```
#[derive(Debug, Clone)]
pub struct IrBuilder {
    package_name: Option<String>,
    id: i32,
    version: i32,
    byte_order: ByteOrder,
    header: TypeDef,
    types: Vec<TypeDef>,
    messages: Vec<MessageDef>,
}

impl IrBuilder {
    pub fn new(id: i32, version: i32, byte_order: ByteOrder) -> IrBuilder {
        IrBuilder {
            package_name: None,
            id,
            version,
            byte_order,
            header: IrBuilder::standard_header(),
            types: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// The usual `messageHeader`: four `uint16` members.
    pub fn standard_header() -> TypeDef {
        TypeDef::composite(
            "messageHeader",
            vec![
                TypeDef::primitive("blockLength", PrimitiveType::Uint16),
                TypeDef::primitive("templateId", PrimitiveType::Uint16),
                TypeDef::primitive("schemaId", PrimitiveType::Uint16),
                TypeDef::primitive("version", PrimitiveType::Uint16),
            ],
        )
    }

    pub fn package(mut self, name: &str) -> IrBuilder {
        self.package_name = Some(name.to_owned());
        self
    }

    pub fn header(mut self, header: TypeDef) -> IrBuilder {
        self.header = header;
        self
    }

    pub fn add_type(mut self, ty: TypeDef) -> IrBuilder {
        self.types.push(ty);
        self
    }

    pub fn add_message(mut self, message: MessageDef) -> IrBuilder {
        self.messages.push(message);
        self
    }

    /// Token stream of a standalone type, as stored in `Ir::types`.
    pub fn composite_tokens(ty: &TypeDef, byte_order: ByteOrder) -> Vec<Token> {
        let mut emitter = Emitter::new(byte_order);
        emitter.emit_type(ty, 0);
        emitter.tokens
    }

    pub fn build(self) -> Ir {
        let types = self
            .types
            .iter()
            .map(|ty| IrBuilder::composite_tokens(ty, self.byte_order))
            .collect();

        let messages = self
            .messages
            .iter()
            .map(|message| {
                let mut emitter = Emitter::new(self.byte_order);
                emitter.emit_message(message);
                emitter.tokens
            })
            .collect();

        Ir {
            package_name: self.package_name,
            id: self.id,
            version: self.version,
            byte_order: self.byte_order,
            header_structure: IrBuilder::composite_tokens(&self.header, self.byte_order),
            messages,
            types,
        }
    }
}

struct Emitter {
    byte_order: ByteOrder,
    tokens: Vec<Token>,
}

impl Emitter {
    fn new(byte_order: ByteOrder) -> Emitter {
        Emitter { byte_order, tokens: Vec::new() }
    }

    fn push(&mut self, signal: Signal, name: &str) -> usize {
        self.tokens.push(Token::new(signal, name));
        self.tokens.len() - 1
    }

    /// Appends the end marker for the container opened at `begin` and fixes
    /// up both component token counts.
    fn close(&mut self, begin: usize, signal: Signal) {
        let count = self.tokens.len() - begin + 1;
        self.tokens[begin].component_token_count = count;
        let mut end = self.tokens[begin].clone();
        end.signal = signal;
        self.tokens.push(end);
    }

    fn encoding(&self, primitive: PrimitiveType) -> Encoding {
        Encoding::new(primitive, self.byte_order)
    }

    fn emit_type(&mut self, ty: &TypeDef, offset: usize) -> usize {
        match ty {
            TypeDef::Primitive {
                name,
                primitive,
                array_length,
                presence,
                const_value,
                null_value,
                character_encoding,
            } => {
                let width = if *presence == Presence::Constant {
                    0
                } else {
                    primitive.size() * array_length
                };
                let index = self.push(Signal::Encoding, name);
                let encoding = Encoding {
                    presence: *presence,
                    const_value: const_value.clone(),
                    null_value: null_value.clone(),
                    character_encoding: character_encoding.clone(),
                    ..self.encoding(*primitive)
                };
                let token = &mut self.tokens[index];
                token.offset = offset;
                token.encoded_length = width;
                token.array_length = *array_length;
                token.encoding = encoding;
                width
            }
            TypeDef::Composite { name, members } => {
                let begin = self.push(Signal::BeginComposite, name);
                self.tokens[begin].offset = offset;
                self.tokens[begin].referenced_name = Some(name.clone());
                let mut cursor = 0;
                for member in members {
                    cursor += self.emit_type(member, cursor);
                }
                self.tokens[begin].encoded_length = cursor;
                self.close(begin, Signal::EndComposite);
                cursor
            }
            TypeDef::Enum { name, encoding, values } => {
                let begin = self.push(Signal::BeginEnum, name);
                let enum_encoding = self.encoding(*encoding);
                let token = &mut self.tokens[begin];
                token.offset = offset;
                token.encoded_length = encoding.size();
                token.referenced_name = Some(name.clone());
                token.encoding = enum_encoding;
                for (value_name, value) in values {
                    let index = self.push(Signal::ValidValue, value_name);
                    let value_encoding = Encoding {
                        const_value: Some(value.clone()),
                        ..self.encoding(*encoding)
                    };
                    self.tokens[index].encoded_length = encoding.size();
                    self.tokens[index].encoding = value_encoding;
                }
                self.close(begin, Signal::EndEnum);
                encoding.size()
            }
            TypeDef::Set { name, encoding, choices } => {
                let begin = self.push(Signal::BeginSet, name);
                let set_encoding = self.encoding(*encoding);
                let token = &mut self.tokens[begin];
                token.offset = offset;
                token.encoded_length = encoding.size();
                token.referenced_name = Some(name.clone());
                token.encoding = set_encoding;
                for (choice, bit) in choices {
                    let index = self.push(Signal::Choice, choice);
                    let choice_encoding = Encoding {
                        const_value: Some(PrimitiveValue::UInt(*bit as u64)),
                        ..self.encoding(*encoding)
                    };
                    self.tokens[index].encoded_length = encoding.size();
                    self.tokens[index].encoding = choice_encoding;
                }
                self.close(begin, Signal::EndSet);
                encoding.size()
            }
        }
    }

    fn emit_field(&mut self, field: &FieldDef, offset: usize) -> usize {
        let begin = self.push(Signal::BeginField, &field.name);
        self.tokens[begin].id = field.id;
        self.tokens[begin].version = field.since_version;
        self.tokens[begin].offset = offset;
        let width = self.emit_type(&field.ty, offset);
        self.tokens[begin].encoded_length = width;
        self.close(begin, Signal::EndField);
        width
    }

    fn emit_body(
        &mut self,
        block_length: Option<usize>,
        fields: &[FieldDef],
        groups: &[GroupDef],
        var_data: &[VarDataDef],
    ) -> usize {
        let mut cursor = 0;
        for field in fields {
            cursor += self.emit_field(field, cursor);
        }
        for group in groups {
            self.emit_group(group);
        }
        for data in var_data {
            self.emit_var_data(data);
        }
        block_length.unwrap_or(cursor)
    }

    fn emit_group(&mut self, group: &GroupDef) {
        let begin = self.push(Signal::BeginGroup, &group.name);
        self.tokens[begin].id = group.id;
        self.emit_type(&group.dimension, 0);
        let block_length = self.emit_body(group.block_length, &group.fields, &group.groups, &group.var_data);
        self.tokens[begin].encoded_length = block_length;
        self.close(begin, Signal::EndGroup);
    }

    fn emit_var_data(&mut self, data: &VarDataDef) {
        let begin = self.push(Signal::BeginVarData, &data.name);
        self.tokens[begin].id = data.id;

        let composite = self.push(Signal::BeginComposite, "varDataEncoding");
        self.tokens[composite].referenced_name = Some("varDataEncoding".to_owned());
        self.tokens[composite].encoded_length = data.length_type.size();

        let length = self.push(Signal::Encoding, "length");
        self.tokens[length].encoded_length = data.length_type.size();
        self.tokens[length].encoding = self.encoding(data.length_type);

        let payload = self.push(Signal::Encoding, "varData");
        let payload_encoding = Encoding {
            character_encoding: data.character_encoding.clone(),
            ..self.encoding(PrimitiveType::Uint8)
        };
        self.tokens[payload].offset = data.length_type.size();
        self.tokens[payload].encoding = payload_encoding;

        self.close(composite, Signal::EndComposite);
        self.close(begin, Signal::EndVarData);
    }

    fn emit_message(&mut self, message: &MessageDef) {
        let begin = self.push(Signal::BeginMessage, &message.name);
        self.tokens[begin].id = message.id;
        self.tokens[begin].description = message.description.clone();
        let block_length = self.emit_body(message.block_length, &message.fields, &message.groups, &message.var_data);
        self.tokens[begin].encoded_length = block_length;
        self.close(begin, Signal::EndMessage);
    }
}
