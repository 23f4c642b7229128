//! brine-sbe-compiler
//!
//! This crate implements:
//!  1) Backend renderers that turn SBE layouts into Rust, TypeScript and Python codecs,
//!  2) Identifier casing and per-language keyword policies,
//!  3) A generation driver that renders every unit before any output is written,
//!  4) Output managers for directories and in-memory collection,
//!  5) Error types (`SbeError`).

pub mod error;
pub mod gen_python;
pub mod gen_rust;
pub mod gen_typescript;
pub mod generator;
pub mod keywords;
pub mod naming;
pub mod output;
pub mod traits;

pub use error::SbeError;
pub use gen_python::PythonGenerator;
pub use gen_rust::RustGenerator;
pub use gen_typescript::TypeScriptGenerator;
pub use generator::{generate, render, render_schema, GeneratorConfig};
pub use keywords::{KeywordPolicy, Namer};
pub use output::{DirectoryOutput, MemoryOutput, OutputManager};
pub use traits::{CodeGenerator, GeneratedUnit, Language};
