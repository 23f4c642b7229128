use std::{env, error::Error, fs, path::PathBuf};

use brine_sbe_compiler::{gen_rust, render, GeneratorConfig, Language};

#[path = "src/car.rs"]
mod car;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=src/car.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let units = render(&car::car_schema(), &GeneratorConfig::new(Language::Rust))?;
    fs::write(out_dir.join("baseline.rs"), gen_rust::single_file(&units))?;
    Ok(())
}
