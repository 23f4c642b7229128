use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::SbeError,
    naming::{quote, to_camel_case, to_pascal_case, to_snake_case, to_upper_snake_case},
    traits::Language,
};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub const RUST_KEYWORDS: [&str; 51] = [
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

pub const TYPESCRIPT_KEYWORDS: [&str; 53] = [
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "as", "implements", "interface",
    "let", "package", "private", "protected", "public", "static", "yield", "any", "boolean",
    "number", "string", "symbol", "type", "await",
];

/// Python keywords plus the names the generated classes define themselves.
pub const PYTHON_KEYWORDS: [&str; 41] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "self", "cls", "encode", "decode", "encode_body",
    "decode_body",
];

pub fn keywords(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &RUST_KEYWORDS,
        Language::TypeScript => &TYPESCRIPT_KEYWORDS,
        Language::Python => &PYTHON_KEYWORDS,
    }
}

/// What to do when a schema name is a reserved word in the target language.
/// Without an append token a collision is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPolicy {
    pub append_token: Option<String>,
}

impl KeywordPolicy {
    pub fn append(token: impl Into<String>) -> Self {
        KeywordPolicy {
            append_token: Some(token.into()),
        }
    }

    pub fn apply(&self, language: Language, name: &str) -> Result<String, SbeError> {
        if !keywords(language).contains(&name) {
            return Ok(name.to_owned());
        }
        match self.append_token {
            Some(ref token) if IDENTIFIER.is_match(&format!("x{}", token)) => Ok(format!("{}{}", name, token)),
            Some(ref token) => Err(SbeError::InvalidIdentifier(quote(token))),
            None => Err(SbeError::KeywordCollision {
                name: name.to_owned(),
                language,
            }),
        }
    }
}

/// Turns schema names into identifiers for one target language: casing
/// first, then the keyword policy.
#[derive(Debug, Clone, Copy)]
pub struct Namer<'p> {
    language: Language,
    policy: &'p KeywordPolicy,
}

impl<'p> Namer<'p> {
    pub fn new(language: Language, policy: &'p KeywordPolicy) -> Self {
        Namer { language, policy }
    }

    pub fn type_name(&self, raw: &str) -> Result<String, SbeError> {
        self.policy.apply(self.language, &to_pascal_case(checked(raw)?))
    }

    pub fn member(&self, raw: &str) -> Result<String, SbeError> {
        let cased = match self.language {
            Language::Rust | Language::Python => to_snake_case(checked(raw)?),
            Language::TypeScript => to_camel_case(checked(raw)?),
        };
        self.policy.apply(self.language, &cased)
    }

    pub fn constant(&self, raw: &str) -> Result<String, SbeError> {
        self.policy.apply(self.language, &to_upper_snake_case(checked(raw)?))
    }

    /// Enum variants: PascalCase in Rust, the schema's own spelling elsewhere.
    pub fn variant(&self, raw: &str) -> Result<String, SbeError> {
        match self.language {
            Language::Rust => self.type_name(raw),
            Language::TypeScript | Language::Python => self.policy.apply(self.language, checked(raw)?),
        }
    }

    /// A file or module name.
    pub fn module(&self, raw: &str) -> Result<String, SbeError> {
        match self.language {
            Language::TypeScript => self.type_name(raw),
            Language::Rust | Language::Python => self.member(raw),
        }
    }
}

fn checked(raw: &str) -> Result<&str, SbeError> {
    if IDENTIFIER.is_match(raw) {
        Ok(raw)
    } else {
        Err(SbeError::InvalidIdentifier(quote(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_fail_without_a_token() {
        let policy = KeywordPolicy::default();
        assert!(matches!(
            policy.apply(Language::Rust, "type"),
            Err(SbeError::KeywordCollision { ref name, language: Language::Rust }) if name == "type"
        ));
        assert_eq!(policy.apply(Language::Rust, "kind").unwrap(), "kind");
        assert_eq!(policy.apply(Language::Python, "type").unwrap(), "type");
    }

    #[test]
    fn append_token_resolves_collisions() {
        let policy = KeywordPolicy::append("_");
        assert_eq!(policy.apply(Language::Rust, "type").unwrap(), "type_");
        assert_eq!(policy.apply(Language::TypeScript, "class").unwrap(), "class_");
        assert_eq!(policy.apply(Language::Python, "from").unwrap(), "from_");

        let bad = KeywordPolicy::append("-");
        assert!(matches!(bad.apply(Language::Rust, "fn"), Err(SbeError::InvalidIdentifier(_))));
    }

    #[test]
    fn namer_cases_per_language() {
        let policy = KeywordPolicy::default();
        let rust = Namer::new(Language::Rust, &policy);
        let ts = Namer::new(Language::TypeScript, &policy);
        let py = Namer::new(Language::Python, &policy);

        assert_eq!(rust.member("serialNumber").unwrap(), "serial_number");
        assert_eq!(ts.member("serialNumber").unwrap(), "serialNumber");
        assert_eq!(py.member("serialNumber").unwrap(), "serial_number");
        assert_eq!(rust.type_name("fuelFigures").unwrap(), "FuelFigures");
        assert_eq!(rust.constant("maxRpm").unwrap(), "MAX_RPM");
        assert_eq!(rust.variant("NULL_VAL").unwrap(), "NullVal");
        assert_eq!(ts.variant("NULL_VAL").unwrap(), "NULL_VAL");
        assert_eq!(ts.module("messageHeader").unwrap(), "MessageHeader");
        assert_eq!(py.module("messageHeader").unwrap(), "message_header");

        assert!(matches!(rust.member("bad name"), Err(SbeError::InvalidIdentifier(_))));
        assert!(rust.member("Self").is_err());
        assert!(matches!(rust.type_name("self"), Err(SbeError::KeywordCollision { .. })));
    }
}
