use brine_sbe::schema::*;

/// The car schema shared by the build script, which generates Rust from it,
/// and the binary, which drives the dynamic codec with it.
pub fn car_schema() -> Ir {
    let model = TypeDef::enumeration("Model", PrimitiveType::Char, &[("A", 65), ("B", 66), ("C", 67)]);
    let extras = TypeDef::set(
        "OptionalExtras",
        PrimitiveType::Uint8,
        &[("sunRoof", 0), ("sportsPack", 1), ("cruiseControl", 2)],
    );

    IrBuilder::new(1, 0, ByteOrder::LittleEndian)
        .package("baseline")
        .add_type(model.clone())
        .add_type(extras.clone())
        .add_message(
            MessageDef::new("Car", 1)
                .field(FieldDef::primitive("serialNumber", 1, PrimitiveType::Uint64))
                .field(FieldDef::primitive("modelYear", 2, PrimitiveType::Uint16))
                .field(FieldDef::new("extras", 3, extras))
                .field(FieldDef::new("code", 4, model))
                .group(
                    GroupDef::new("fuelFigures", 5)
                        .field(FieldDef::primitive("speed", 6, PrimitiveType::Uint16))
                        .field(FieldDef::primitive("mpg", 7, PrimitiveType::Float)),
                )
                .var_data(VarDataDef::text("manufacturer", 8)),
        )
        .build()
}
