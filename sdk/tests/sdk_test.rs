use brine_sbe::schema::*;
use brine_sbe::{decode_to_json, encode_from_json, generate_to_dir, layout_to_json, load_ir, GeneratorConfig, Language, SbeError};
use serde_json::json;

fn car() -> Ir {
    let model = TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66), ("C", 67)]);
    let extras = TypeDef::set("OptionalExtras", PrimitiveType::Uint8, &[("sunRoof", 0), ("sportsPack", 1)]);
    let engine = TypeDef::composite(
        "Engine",
        vec![
            TypeDef::primitive("capacity", PrimitiveType::Uint16),
            TypeDef::primitive("numCylinders", PrimitiveType::Uint8),
        ],
    );

    IrBuilder::new(1, 0, ByteOrder::LittleEndian)
        .package("baseline")
        .add_type(model.clone())
        .add_type(extras.clone())
        .add_type(engine.clone())
        .add_message(
            MessageDef::new("Car", 1)
                .field(FieldDef::primitive("serialNumber", 1, PrimitiveType::Uint64))
                .field(FieldDef::new("extras", 2, extras))
                .field(FieldDef::new("code", 3, model))
                .field(FieldDef::new("engine", 4, engine))
                .field(FieldDef::new("rating", 5, TypeDef::primitive("rating", PrimitiveType::Int8).optional()))
                .group(
                    GroupDef::new("fuelFigures", 6)
                        .field(FieldDef::primitive("speed", 7, PrimitiveType::Uint16))
                        .field(FieldDef::primitive("mpg", 8, PrimitiveType::Float)),
                )
                .var_data(VarDataDef::text("manufacturer", 9))
                .var_data(VarDataDef::bytes("activationCode", 10)),
        )
        .build()
}

fn car_json() -> serde_json::Value {
    json!({
        "serialNumber": 1234,
        "extras": ["sportsPack"],
        "code": "B",
        "engine": {"capacity": 2000, "numCylinders": 4},
        "fuelFigures": [
            {"speed": 30, "mpg": 35.5},
            {"speed": 70, "mpg": null},
        ],
        "manufacturer": "Honda",
        "activationCode": [1, 2, 3],
    })
}

#[test]
fn load_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car.json");
    std::fs::write(&path, serde_json::to_string_pretty(&car()).unwrap()).unwrap();

    let ir = load_ir(&path).unwrap();
    assert_eq!(ir, car());

    let bytes = encode_from_json(&ir, "Car", &car_json()).unwrap();
    let decoded = decode_to_json(&ir, &bytes).unwrap();
    assert_eq!(decoded["message"], "Car");
    assert_eq!(decoded["header"]["templateId"], 1);

    // The optional rating was never set, so it decodes as absent.
    assert_eq!(decoded["body"], car_json());
}

#[test]
fn load_rejects_malformed_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");

    let mut ir = car();
    ir.messages[0].pop();
    std::fs::write(&path, serde_json::to_string(&ir).unwrap()).unwrap();
    assert!(matches!(load_ir(&path), Err(SbeError::Ir(IrError::Malformed { .. }))));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_ir(&path), Err(SbeError::Json(_))));

    assert!(matches!(load_ir(dir.path().join("missing.json")), Err(SbeError::Io(_))));
}

#[test]
fn truncated_buffers_fail_to_decode() {
    let ir = car();
    let bytes = encode_from_json(&ir, "Car", &car_json()).unwrap();
    let err = decode_to_json(&ir, &bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, SbeError::Codec(CodecError::OutOfBounds { .. })));
}

#[test]
fn layout_lists_offsets() {
    let layout = layout_to_json(&car()).unwrap();
    let fields = &layout["messages"][0]["body"]["elements"];
    assert!(fields.is_array());
    assert_eq!(layout["id"], 1);
}

#[test]
fn generated_files_land_in_package_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let written = generate_to_dir(&car(), &GeneratorConfig::new(Language::Python), dir.path()).unwrap();
    let base = dir.path().join("baseline");
    assert!(written.contains(&base.join("car.py")));
    assert!(written.contains(&base.join("__init__.py")));
    assert!(base.join("runtime.py").exists());
}
