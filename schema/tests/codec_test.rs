use brine_sbe_schema::*;

fn fills_group() -> GroupDef {
    GroupDef::new("fills", 10).field(FieldDef::primitive("px", 11, PrimitiveType::Int64))
}

fn order_v1() -> Ir {
    IrBuilder::new(9, 1, ByteOrder::LittleEndian)
        .add_message(
            MessageDef::new("Order", 1)
                .field(FieldDef::primitive("qty", 1, PrimitiveType::Uint32))
                .group(fills_group())
                .var_data(VarDataDef::text("note", 20)),
        )
        .build()
}

fn order_v2() -> Ir {
    IrBuilder::new(9, 2, ByteOrder::LittleEndian)
        .add_message(
            MessageDef::new("Order", 1)
                .field(FieldDef::primitive("qty", 1, PrimitiveType::Uint32))
                .field(FieldDef::primitive("side", 2, PrimitiveType::Uint8).since(2))
                .group(fills_group())
                .var_data(VarDataDef::text("note", 20)),
        )
        .build()
}

fn fill(px: i64) -> Value<'static> {
    Value::object("fills", [("px", Value::Int(px))])
}

#[test]
fn newer_sender_is_skipped_by_block_length() {
    let v2 = order_v2();
    let v2_codec = MessageCodec::new(&v2, "Order").unwrap();
    let sent = Value::object(
        "Order",
        [
            ("qty", Value::UInt(5)),
            ("side", Value::UInt(1)),
            ("fills", Value::Array(vec![fill(100), fill(-100)])),
            ("note", Value::String("hi".to_owned())),
        ],
    );
    let bytes = v2_codec.encode(&sent).unwrap();

    let v1 = order_v1();
    let v1_codec = MessageCodec::new(&v1, "Order").unwrap();
    let received = v1_codec.decode(&bytes).unwrap();

    let mut expected = sent.clone();
    expected.remove("side");
    assert_eq!(received, expected);
}

#[test]
fn older_sender_leaves_new_fields_out() {
    let v1 = order_v1();
    let sent = Value::object(
        "Order",
        [
            ("qty", Value::UInt(5)),
            ("fills", Value::Array(vec![fill(1)])),
            ("note", Value::String(String::new())),
        ],
    );
    let bytes = MessageCodec::new(&v1, "Order").unwrap().encode(&sent).unwrap();

    let v2 = order_v2();
    let received = MessageCodec::new(&v2, "Order").unwrap().decode(&bytes).unwrap();
    assert_eq!(received.get("side"), None);
    assert_eq!(received["fills"][0]["px"], Value::Int(1));
}

#[test]
fn group_counts_and_var_data_lengths() {
    let ir = order_v1();
    let codec = MessageCodec::new(&ir, "Order").unwrap();

    for count in [0usize, 1, 5] {
        for note in ["", "x", "a longer note with ünïcode"] {
            let fills: Vec<_> = (0..count as i64).map(fill).collect();
            let value = Value::object(
                "Order",
                [
                    ("qty", Value::UInt(count as u64)),
                    ("fills", Value::Array(fills)),
                    ("note", Value::String(note.to_owned())),
                ],
            );
            let body = codec.encode_body(&value).unwrap();
            assert_eq!(body.len(), 4 + 4 + count * 8 + 4 + note.len());
            let decoded = codec.decode_body(&body, 4).unwrap();
            assert_eq!(decoded["fills"].len(), count);
            assert_eq!(decoded, value);
        }
    }
}

#[test]
fn empty_group_is_header_only() {
    let ir = order_v1();
    let codec = MessageCodec::new(&ir, "Order").unwrap();
    let value = Value::object(
        "Order",
        [
            ("qty", Value::UInt(0)),
            ("fills", Value::Array(vec![])),
            ("note", Value::String(String::new())),
        ],
    );
    let body = codec.encode_body(&value).unwrap();
    assert_eq!(body, vec![0, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0]);
}

fn nested_ir(order: ByteOrder) -> Ir {
    IrBuilder::new(1, 0, order)
        .add_message(
            MessageDef::new("Book", 2)
                .field(FieldDef::primitive("id", 1, PrimitiveType::Uint16))
                .group(
                    GroupDef::new("levels", 2)
                        .field(FieldDef::primitive("px", 3, PrimitiveType::Double))
                        .group(
                            GroupDef::new("orders", 4)
                                .field(FieldDef::primitive("qty", 5, PrimitiveType::Uint32))
                                .group(
                                    GroupDef::new("tags", 6)
                                        .field(FieldDef::primitive("tag", 7, PrimitiveType::Char))
                                        .var_data(VarDataDef::bytes("blob", 8).length_type(PrimitiveType::Uint16)),
                                )
                                .var_data(VarDataDef::text("owner", 9)),
                        ),
                ),
        )
        .build()
}

fn nested_value() -> Value<'static> {
    let tag = |c: u8, blob: Vec<u8>| Value::object("tags", [("tag", Value::UInt(c as u64)), ("blob", Value::Bytes(blob))]);
    let order = |qty: u64, tags: Vec<Value<'static>>, owner: &str| {
        Value::object(
            "orders",
            [
                ("qty", Value::UInt(qty)),
                ("tags", Value::Array(tags)),
                ("owner", Value::String(owner.to_owned())),
            ],
        )
    };
    Value::object(
        "Book",
        [
            ("id", Value::UInt(77)),
            (
                "levels",
                Value::Array(vec![
                    Value::object(
                        "levels",
                        [
                            ("px", Value::Float(101.25)),
                            (
                                "orders",
                                Value::Array(vec![
                                    order(3, vec![tag(b'a', vec![1, 2, 3]), tag(b'b', vec![])], "desk-1"),
                                    order(4, vec![], ""),
                                ]),
                            ),
                        ],
                    ),
                    Value::object("levels", [("px", Value::Float(-0.5)), ("orders", Value::Array(vec![]))]),
                ]),
            ),
        ],
    )
}

#[test]
fn three_levels_with_var_data_in_innermost_group() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let ir = nested_ir(order);
        let codec = MessageCodec::new(&ir, "Book").unwrap();
        let bytes = codec.encode(&nested_value()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), nested_value());
    }
}

#[test]
fn byte_order_changes_the_bytes() {
    let little = nested_ir(ByteOrder::LittleEndian);
    let big = nested_ir(ByteOrder::BigEndian);
    let little_bytes = MessageCodec::new(&little, "Book").unwrap().encode_body(&nested_value()).unwrap();
    let big_bytes = MessageCodec::new(&big, "Book").unwrap().encode_body(&nested_value()).unwrap();

    assert_eq!(little_bytes.len(), big_bytes.len());
    assert_ne!(little_bytes, big_bytes);
    assert_eq!(&little_bytes[..2], &[77, 0]);
    assert_eq!(&big_bytes[..2], &[0, 77]);
}

#[test]
fn constants_are_not_on_the_wire() {
    let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
        .add_message(
            MessageDef::new("Quote", 3)
                .field(FieldDef::new(
                    "venue",
                    1,
                    TypeDef::primitive("char", PrimitiveType::Char).array(4).constant("XLON"),
                ))
                .field(FieldDef::new(
                    "lot",
                    2,
                    TypeDef::primitive("uint16", PrimitiveType::Uint16).constant(PrimitiveValue::UInt(100)),
                ))
                .field(FieldDef::primitive("px", 3, PrimitiveType::Int32)),
        )
        .build();
    let codec = MessageCodec::new(&ir, "Quote").unwrap();
    assert_eq!(codec.layout().block_length(), 4);

    let body = codec
        .encode_body(&Value::object("Quote", [("px", Value::Int(-2)), ("lot", Value::UInt(1))]))
        .unwrap();
    assert_eq!(body, vec![0xfe, 0xff, 0xff, 0xff]);

    let decoded = codec.decode_body(&body, 4).unwrap();
    assert_eq!(decoded["venue"], Value::String("XLON".to_owned()));
    assert_eq!(decoded["lot"], Value::UInt(100));
    assert_eq!(decoded["px"], Value::Int(-2));
}

#[test]
fn composite_fields_round_trip() {
    let engine = TypeDef::composite(
        "Engine",
        vec![
            TypeDef::primitive("capacity", PrimitiveType::Uint16),
            TypeDef::primitive("numCylinders", PrimitiveType::Uint8),
            TypeDef::primitive("maxRpm", PrimitiveType::Uint16).constant(PrimitiveValue::UInt(9000)),
            TypeDef::primitive("manufacturerCode", PrimitiveType::Char).array(3),
        ],
    );
    let ir = IrBuilder::new(1, 0, ByteOrder::BigEndian)
        .add_type(engine.clone())
        .add_message(MessageDef::new("Car", 1).field(FieldDef::new("engine", 1, engine)))
        .build();
    SchemaLayout::resolve(&ir).unwrap();

    let codec = MessageCodec::new(&ir, "Car").unwrap();
    let value = Value::object(
        "Car",
        [(
            "engine",
            Value::object(
                "Engine",
                [
                    ("capacity", Value::UInt(2000)),
                    ("numCylinders", Value::UInt(4)),
                    ("manufacturerCode", Value::String("123".to_owned())),
                ],
            ),
        )],
    );
    let body = codec.encode_body(&value).unwrap();
    assert_eq!(body, vec![0x07, 0xd0, 4, b'1', b'2', b'3']);

    let mut expected = value.clone();
    if let Value::Object(_, ref mut fields) = expected {
        if let Some(engine) = fields.get_mut("engine") {
            engine.set("maxRpm", Value::UInt(9000));
        }
    }
    assert_eq!(codec.decode_body(&body, 6).unwrap(), expected);
}

#[test]
fn ir_json_round_trip() {
    let ir = nested_ir(ByteOrder::BigEndian);
    let json = serde_json::to_string(&ir).unwrap();
    let loaded: Ir = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, ir);
    loaded.verify().unwrap();
}

#[test]
fn malformed_streams_are_rejected() {
    let mut ir = order_v1();
    // Drop the END_GROUP marker so the group's span runs into the var-data.
    let end_group = ir.messages[0]
        .iter()
        .position(|t| t.signal == Signal::EndGroup)
        .unwrap();
    ir.messages[0].remove(end_group);
    assert!(ir.verify().is_err());
    assert!(matches!(
        MessageCodec::new(&ir, "Order"),
        Err(CodecError::Ir(IrError::Malformed { .. }))
    ));
}

fn attachments_ir() -> Ir {
    let dimension = TypeDef::composite(
        "wideGroupSize",
        vec![
            TypeDef::primitive("blockLength", PrimitiveType::Uint16),
            TypeDef::primitive("numInGroup", PrimitiveType::Uint32),
        ],
    );
    IrBuilder::new(1, 0, ByteOrder::LittleEndian)
        .add_message(
            MessageDef::new("Mail", 4).group(
                GroupDef::new("attachments", 1)
                    .dimension(dimension)
                    .var_data(VarDataDef::bytes("blob", 2)),
            ),
        )
        .build()
}

#[test]
fn empty_block_groups_are_bounded_by_their_trailer() {
    let ir = attachments_ir();
    let codec = MessageCodec::new(&ir, "Mail").unwrap();

    // blockLength 0, numInGroup 0xf0ffffff.
    match codec.decode_body(&[0, 0, 0xff, 0xff, 0xff, 0xf0], 0) {
        Err(CodecError::GroupOverrun { count, block_length, element_length, remaining, .. }) => {
            assert_eq!(count, 0xf0ff_ffff);
            assert_eq!(block_length, 0);
            assert_eq!(element_length, 4);
            assert_eq!(remaining, 0);
        }
        other => panic!("expected overrun, got {:?}", other),
    }

    // Two elements need two length prefixes; one is not enough.
    let short = [0, 0, 2, 0, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        codec.decode_body(&short, 0),
        Err(CodecError::GroupOverrun { count: 2, .. })
    ));

    let value = Value::object(
        "Mail",
        [(
            "attachments",
            Value::Array(vec![
                Value::object("attachments", [("blob", Value::Bytes(vec![1, 2]))]),
                Value::object("attachments", [("blob", Value::Bytes(vec![]))]),
            ]),
        )],
    );
    let body = codec.encode_body(&value).unwrap();
    assert_eq!(body, vec![0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 1, 2, 0, 0, 0, 0]);
    assert_eq!(codec.decode_body(&body, 0).unwrap(), value);
}

#[test]
fn empty_groups_without_trailer_still_need_a_byte_per_element() {
    let ir = IrBuilder::new(1, 0, ByteOrder::LittleEndian)
        .add_message(MessageDef::new("Ping", 1).group(GroupDef::new("ticks", 1)))
        .build();
    let codec = MessageCodec::new(&ir, "Ping").unwrap();

    assert!(matches!(
        codec.decode_body(&[0, 0, 0xff, 0xff], 0),
        Err(CodecError::GroupOverrun { element_length: 1, remaining: 0, .. })
    ));
}
