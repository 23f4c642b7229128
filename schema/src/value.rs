use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use crate::primitive::PrimitiveValue;

/// This type holds dynamic SBE data.
///
/// Values can represent any message, group element, composite or field and are
/// converted to and from bytes with a [MessageCodec](struct.MessageCodec.html).
/// Enum, set and field names are string slices borrowed from the IR, so a
/// Value can outlive the buffer it was decoded from but can't outlive the IR.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Char arrays and var-data that declare a character encoding.
    String(String),
    /// Var-data without a character encoding.
    Bytes(Vec<u8>),
    /// Fixed-length arrays and group elements.
    Array(Vec<Value<'a>>),
    Enum(&'a str, &'a str),
    Set(&'a str, Vec<&'a str>),
    Object(&'a str, HashMap<&'a str, Value<'a>>),
}

impl<'a> Value<'a> {
    /// Signed and unsigned integers as `i64`; `0` when out of range or not an
    /// integer.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Int(value) => value,
            Value::UInt(value) => i64::try_from(value).unwrap_or(0),
            _ => 0,
        }
    }

    /// Lengths, counts and unsigned fields as `u64`.
    pub fn as_uint(&self) -> u64 {
        match *self {
            Value::UInt(value) => value,
            Value::Int(value) => u64::try_from(value).unwrap_or(0),
            _ => 0,
        }
    }

    /// `0.0` unless this is a [Float](#variant.Float). Float fields decode
    /// their NaN null as NaN.
    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(value) => value,
            _ => 0.0,
        }
    }

    /// Text of a char array or text var-data, or the name of an enum value.
    /// Empty for anything else.
    pub fn as_string(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            Value::Enum(_, value) => value,
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref value) => value.as_slice(),
            Value::String(ref value) => value.as_bytes(),
            _ => &[],
        }
    }

    /// Elements of a fixed-length array or of a decoded group.
    pub fn as_array(&self) -> &[Value<'a>] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// `(enum type, value name)`; the name is `NULL_VAL` for the null value.
    pub fn as_enum(&self) -> (&str, &str) {
        match *self {
            Value::Enum(name, value) => (name, value),
            _ => ("", ""),
        }
    }

    /// The choices present in a [Set](#variant.Set).
    pub fn as_set(&self) -> &[&'a str] {
        match *self {
            Value::Set(_, ref choices) => choices.as_slice(),
            _ => &[],
        }
    }

    /// Element count of an [Array](#variant.Array), `0` otherwise.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a group element or array item. No-op unless this is an
    /// [Array](#variant.Array).
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// Field of a message, group element or composite. Absent optional fields
    /// and fields beyond an older sender's block are `None`.
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match *self {
            Value::Object(_, ref fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.insert(name, value);
        }
    }

    /// Drops a field, so an optional one encodes as its null value.
    pub fn remove(&mut self, name: &'a str) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.remove(name);
        }
    }

    /// Builds an [Object](#variant.Object) from `(name, value)` pairs.
    pub fn object(name: &'a str, fields: impl IntoIterator<Item = (&'a str, Value<'a>)>) -> Value<'a> {
        Value::Object(name, fields.into_iter().collect())
    }

    /// The scalar held by this value as an IR literal, if it is numeric.
    pub fn to_primitive(&self) -> Option<PrimitiveValue> {
        match *self {
            Value::Int(value) => Some(PrimitiveValue::Int(value)),
            Value::UInt(value) => Some(PrimitiveValue::UInt(value)),
            Value::Float(value) => Some(PrimitiveValue::Float(value)),
            _ => None,
        }
    }

    pub fn from_primitive(value: &PrimitiveValue) -> Value<'a> {
        match value {
            PrimitiveValue::Int(v) => Value::Int(*v),
            PrimitiveValue::UInt(v) => Value::UInt(*v),
            PrimitiveValue::Float(v) => Value::Float(*v),
            PrimitiveValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// Panics unless this is an [Array](#variant.Array) with an element at
    /// `index`.
    fn index(&self, index: usize) -> &Value<'a> {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!(),
        }
    }
}

impl<'a> Index<&str> for Value<'a> {
    type Output = Value<'a>;

    /// Field access on an [Object](#variant.Object). Panics if the field is
    /// missing.
    fn index(&self, name: &str) -> &Value<'a> {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no field \"{}\"", name),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Int(value) => value.fmt(f),
            Value::UInt(value) => value.fmt(f),
            Value::Float(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Bytes(ref value) => write!(f, "b{:?}", value),
            Value::Array(ref values) => values.fmt(f),
            Value::Enum(name, ref value) => write!(f, "{}::{}", name, value),
            Value::Set(name, ref choices) => write!(f, "{}{{{}}}", name, choices.join("|")),

            Value::Object(name, ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{} {{", name)?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_basic() {
        let value = Value::Array(vec![
            Value::Int(-1),
            Value::UInt(1),
            Value::Float(0.5),
            Value::String("abc".to_owned()),
            Value::Bytes(vec![1, 2]),
            Value::Enum("Side", "BUY"),
            Value::Set("Flags", vec!["sunRoof", "cruiseControl"]),
            Value::object(
                "Obj",
                [
                    ("key1", Value::String("value1".to_owned())),
                    ("key2", Value::UInt(2)),
                ],
            ),
        ]);

        assert_eq!(value.len(), 8);
        assert_eq!(value[0].as_int(), -1);
        assert_eq!(value[1].as_uint(), 1);
        assert_eq!(value[1].as_int(), 1);
        assert_eq!(value[0].as_uint(), 0);
        assert_eq!(value[2].as_float(), 0.5);
        assert_eq!(value[3].as_string(), "abc");
        assert_eq!(value[4].as_bytes(), &[1, 2]);
        assert_eq!(value[5].as_enum(), ("Side", "BUY"));
        assert_eq!(value[6].as_set(), &["sunRoof", "cruiseControl"]);
        assert_eq!(value.get("key1"), None);
        assert_eq!(value[7]["key2"], Value::UInt(2));

        assert_eq!(
            format!("{:?}", value),
            "[-1, 1, 0.5, \"abc\", b[1, 2], Side::BUY, Flags{sunRoof|cruiseControl}, Obj {key1: \"value1\", key2: 2}]"
        );
    }

    #[test]
    fn value_push() {
        let mut value = Value::Array(vec![]);
        assert!(value.is_empty());

        value.push(Value::Int(123));
        value.push(Value::Int(456));
        assert_eq!(value.len(), 2);
        assert_eq!(value[1], Value::Int(456));
    }

    #[test]
    fn value_set_and_remove() {
        let mut value = Value::object("Msg", []);
        value.set("a", Value::UInt(1));
        value.set("b", Value::UInt(2));
        value.set("a", Value::UInt(3));
        assert_eq!(format!("{:?}", value), "Msg {a: 3, b: 2}");

        value.remove("a");
        assert_eq!(value.get("a"), None);
        assert_eq!(format!("{:?}", value), "Msg {b: 2}");
    }

    #[test]
    fn primitive_conversions() {
        assert_eq!(Value::Int(-5).to_primitive(), Some(PrimitiveValue::Int(-5)));
        assert_eq!(Value::String("x".to_owned()).to_primitive(), None);
        assert_eq!(Value::from_primitive(&PrimitiveValue::from("CME")), Value::String("CME".to_owned()));
    }
}
