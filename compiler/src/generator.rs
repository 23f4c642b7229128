use std::collections::{BTreeMap, HashSet};

use brine_sbe_schema::{BodyLayout, CompositeLayout, FieldKind, FieldLayout, Ir, SchemaLayout, TypeLayout};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::SbeError,
    gen_python::PythonGenerator,
    gen_rust::RustGenerator,
    gen_typescript::TypeScriptGenerator,
    keywords::KeywordPolicy,
    output::OutputManager,
    traits::{CodeGenerator, GeneratedUnit, Language},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub language: Language,
    #[serde(default)]
    pub keyword_policy: KeywordPolicy,
    /// Replaces the IR's package name when laying out output directories.
    #[serde(default)]
    pub package_override: Option<String>,
}

impl GeneratorConfig {
    pub fn new(language: Language) -> Self {
        GeneratorConfig {
            language,
            keyword_policy: KeywordPolicy::default(),
            package_override: None,
        }
    }

    pub fn with_keyword_policy(mut self, policy: KeywordPolicy) -> Self {
        self.keyword_policy = policy;
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package_override = Some(package.into());
        self
    }

    /// The package the generated units belong to.
    pub fn package<'a>(&'a self, ir: &'a Ir) -> Option<&'a str> {
        self.package_override.as_deref().or(ir.package_name.as_deref())
    }

    pub fn backend(&self) -> Box<dyn CodeGenerator> {
        let policy = self.keyword_policy.clone();
        match self.language {
            Language::Rust => Box::new(RustGenerator::new(policy)),
            Language::TypeScript => Box::new(TypeScriptGenerator::new(policy)),
            Language::Python => Box::new(PythonGenerator::new(policy)),
        }
    }
}

/// Renders every unit for `ir` without writing anything: support code, the
/// message header, types, then messages, then the index. Any naming error
/// aborts the whole run.
pub fn render(ir: &Ir, config: &GeneratorConfig) -> Result<Vec<GeneratedUnit>, SbeError> {
    let schema = SchemaLayout::resolve(ir)?;
    let backend = config.backend();
    render_schema(&schema, backend.as_ref())
}

pub fn render_schema(schema: &SchemaLayout, backend: &dyn CodeGenerator) -> Result<Vec<GeneratedUnit>, SbeError> {
    let mut units = Vec::new();

    if let Some(support) = backend.render_support(schema)? {
        units.push(support);
    }

    let header = &schema.header.composite;
    if schema.type_layout(header.type_name).is_none() {
        units.push(backend.render_composite(schema, header)?);
    }

    let inline = inline_types(schema);
    for ty in schema.types.iter().chain(&inline) {
        let unit = match ty {
            TypeLayout::Composite(composite) => backend.render_composite(schema, composite)?,
            TypeLayout::Enum(layout) => backend.render_enum(schema, layout)?,
            TypeLayout::Set(layout) => backend.render_set(schema, layout)?,
        };
        debug!(language = %backend.language(), name = ty.name(), file = %unit.file_name, "rendered type");
        units.push(unit);
    }

    for message in &schema.messages {
        let unit = backend.render_message(schema, message)?;
        debug!(language = %backend.language(), name = message.name, file = %unit.file_name, "rendered message");
        units.push(unit);
    }

    if let Some(index) = backend.render_index(schema, &units)? {
        units.push(index);
    }

    let mut seen = HashSet::new();
    for unit in &units {
        if !seen.insert(unit.file_name.as_str()) {
            return Err(SbeError::DuplicateUnit(unit.file_name.clone()));
        }
    }

    Ok(units)
}

/// Composites, enums and sets that only appear inside another composite
/// and have no entry of their own in `Ir::types`.
fn inline_types<'a>(schema: &SchemaLayout<'a>) -> Vec<TypeLayout<'a>> {
    let mut known: HashSet<&'a str> = schema.types.iter().map(|t| t.name()).collect();
    known.insert(schema.header.composite.type_name);

    let mut pending: Vec<&CompositeLayout<'a>> = vec![&schema.header.composite];
    pending.extend(schema.types.iter().filter_map(|t| match t {
        TypeLayout::Composite(composite) => Some(composite),
        _ => None,
    }));

    let mut found = Vec::new();
    while let Some(composite) = pending.pop() {
        for member in &composite.members {
            let layout = match member.kind {
                FieldKind::Composite(ref nested) => {
                    pending.push(nested);
                    TypeLayout::Composite(nested.clone())
                }
                FieldKind::Enum(ref layout) => TypeLayout::Enum(layout.clone()),
                FieldKind::Set(ref layout) => TypeLayout::Set(layout.clone()),
                FieldKind::Primitive(_) => continue,
            };
            if known.insert(layout.name()) {
                found.push(layout);
            }
        }
    }
    found
}

/// Renders `ir` and hands each unit to `output`. Returns the number of
/// units written.
pub fn generate(ir: &Ir, config: &GeneratorConfig, output: &mut dyn OutputManager) -> Result<usize, SbeError> {
    let units = render(ir, config)?;
    for unit in &units {
        output.write_unit(unit)?;
    }
    info!(
        language = %config.language,
        schema_id = ir.id,
        version = ir.version,
        units = units.len(),
        "generated codecs"
    );
    Ok(units.len())
}

/// What a field refers to when it isn't a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Composite,
    Enum,
    Set,
}

/// The named types a run of fields uses, keyed by schema type name.
pub fn field_types<'a, 'f>(
    fields: impl IntoIterator<Item = &'f FieldLayout<'a>>,
    out: &mut BTreeMap<&'a str, TypeRef>,
) where
    'a: 'f,
{
    for field in fields {
        let (name, kind) = match field.kind {
            FieldKind::Composite(ref layout) => (layout.type_name, TypeRef::Composite),
            FieldKind::Enum(ref layout) => (layout.type_name, TypeRef::Enum),
            FieldKind::Set(ref layout) => (layout.type_name, TypeRef::Set),
            FieldKind::Primitive(_) => continue,
        };
        out.insert(name, kind);
    }
}

/// Like [field_types] for a message or group body and all of its groups.
pub fn body_types<'a>(body: &BodyLayout<'a>, out: &mut BTreeMap<&'a str, TypeRef>) {
    field_types(body.fields(), out);
    for group in body.groups() {
        body_types(&group.body, out);
    }
}

/// `base + offset`, or just `base` at offset zero.
pub fn offset_expr(base: &str, offset: usize) -> String {
    match offset {
        0 => base.to_string(),
        offset => format!("{} + {}", base, offset),
    }
}
