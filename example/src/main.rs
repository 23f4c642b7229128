// example/src/main.rs

use brine_sbe::schema::*;
use brine_sbe::decode_to_json;
use brine_sbe_compiler::{generate, GeneratorConfig, Language, MemoryOutput};

mod car;

/// Codecs generated from `car::car_schema()` by the build script.
#[allow(dead_code)]
mod baseline {
    include!(concat!(env!("OUT_DIR"), "/baseline.rs"));
}

use car::car_schema;

fn car_value() -> Value<'static> {
    let fuel = |speed: u64, mpg: f64| {
        Value::object("fuelFigures", [("speed", Value::UInt(speed)), ("mpg", Value::Float(mpg))])
    };
    Value::object(
        "Car",
        [
            ("serialNumber", Value::UInt(1234)),
            ("modelYear", Value::UInt(2013)),
            ("extras", Value::Set("OptionalExtras", vec!["sunRoof", "cruiseControl"])),
            ("code", Value::Enum("Model", "A")),
            ("fuelFigures", Value::Array(vec![fuel(30, 35.5), fuel(55, 49.0), fuel(75, 40.25)])),
            ("manufacturer", Value::String("Honda".to_owned())),
        ],
    )
}

/// The same car as `car_value`, through the generated structs.
fn generated_car() -> baseline::Car {
    let fuel = |speed: u16, mpg: f32| baseline::CarFuelFigures { speed, mpg };
    let mut extras = baseline::OptionalExtras::default();
    extras.set_sun_roof(true).set_cruise_control(true);
    baseline::Car {
        serial_number: 1234,
        model_year: 2013,
        extras,
        code: baseline::Model::A,
        fuel_figures: vec![fuel(30, 35.5), fuel(55, 49.0), fuel(75, 40.25)],
        manufacturer: "Honda".to_owned(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ir = car_schema();
    let codec = MessageCodec::new(&ir, "Car")?;

    let bytes = codec.encode(&car_value())?;
    println!("Encoded {} bytes: {:?}", bytes.len(), bytes);

    let decoded = codec.decode(&bytes)?;
    println!("serialNumber = {}", decoded["serialNumber"].as_uint());
    println!("extras       = {:?}", decoded["extras"].as_set());
    for figure in decoded["fuelFigures"].as_array() {
        println!("  speed {} mpg {:.1}", figure["speed"].as_uint(), figure["mpg"].as_float());
    }
    println!("{}", serde_json::to_string_pretty(&decode_to_json(&ir, &bytes)?)?);

    // The generated codec writes the same bytes.
    let generated = generated_car().encode()?;
    println!("generated codec agrees: {}", generated == bytes);
    println!("{:?}", baseline::Car::decode(&generated)?);

    // And the generated source itself.
    let mut output = MemoryOutput::new();
    generate(&ir, &GeneratorConfig::new(Language::Rust), &mut output)?;
    for (file_name, contents) in &output.files {
        println!("// ---- {} ({} lines)", file_name, contents.lines().count());
    }
    if let Some(car) = output.get("car.rs") {
        println!("{}", car);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline::{Car, CarFuelFigures, DecodeError, EncodeError, Model, OptionalExtras};

    #[test]
    fn generated_and_dynamic_codecs_agree() {
        let ir = car_schema();
        let codec = MessageCodec::new(&ir, "Car").unwrap();

        let dynamic = codec.encode(&car_value()).unwrap();
        let generated = generated_car().encode().unwrap();
        assert_eq!(generated, dynamic);

        assert_eq!(Car::decode(&dynamic).unwrap(), generated_car());
        assert_eq!(codec.decode(&generated).unwrap(), car_value());
    }

    #[test]
    fn empty_groups_and_var_data() {
        let ir = car_schema();
        let codec = MessageCodec::new(&ir, "Car").unwrap();
        let car = Car {
            fuel_figures: vec![],
            manufacturer: String::new(),
            ..generated_car()
        };

        let bytes = car.encode().unwrap();
        assert_eq!(bytes.len(), 8 + 12 + 4 + 4);
        assert_eq!(Car::decode(&bytes).unwrap(), car);
        assert_eq!(codec.decode(&bytes).unwrap()["fuelFigures"].len(), 0);
    }

    #[test]
    fn oversized_groups_fail_to_encode() {
        let car = Car {
            fuel_figures: vec![CarFuelFigures { speed: 1, mpg: 1.0 }; 65536],
            ..generated_car()
        };
        assert_eq!(
            car.encode(),
            Err(EncodeError::TooLong { path: "Car.fuelFigures", len: 65536, max: 65535 })
        );

        let mut fits = car;
        fits.fuel_figures.pop();
        let bytes = fits.encode().unwrap();
        assert_eq!(Car::decode(&bytes).unwrap().fuel_figures.len(), 65535);
    }

    #[test]
    fn crafted_group_counts_are_rejected() {
        let ir = car_schema();
        let codec = MessageCodec::new(&ir, "Car").unwrap();
        let car = Car {
            fuel_figures: vec![],
            ..generated_car()
        };
        let mut bytes = car.encode().unwrap();

        // fuelFigures header: blockLength 0, numInGroup 0xffff.
        bytes[20..24].copy_from_slice(&[0, 0, 0xff, 0xff]);
        assert_eq!(
            Car::decode(&bytes),
            Err(DecodeError::GroupOverrun { path: "Car.fuelFigures", offset: 24, count: 0xffff, element_length: 1 })
        );
        assert!(matches!(codec.decode(&bytes), Err(CodecError::GroupOverrun { count: 0xffff, .. })));
    }

    #[test]
    fn shorter_blocks_decode_as_null() {
        let ir = car_schema();
        let codec = MessageCodec::new(&ir, "Car").unwrap();

        // An older sender whose block holds only serialNumber.
        let mut body = 1234u64.to_le_bytes().to_vec();
        body.extend_from_slice(&[6, 0, 0, 0]);
        body.extend_from_slice(&[0, 0, 0, 0]);

        let (car, end) = Car::decode_body(&body, 0, 8).unwrap();
        assert_eq!(end, body.len());
        assert_eq!(car.serial_number, 1234);
        assert_eq!(car.model_year, u16::MAX);
        assert_eq!(car.extras, OptionalExtras::default());
        assert_eq!(car.code, Model::NullVal);
        assert!(car.fuel_figures.is_empty());

        let decoded = codec.decode_body(&body, 8).unwrap();
        assert_eq!(decoded["serialNumber"], Value::UInt(1234));
        assert_eq!(decoded.get("modelYear"), None);
        assert_eq!(decoded.get("code"), None);
    }
}
