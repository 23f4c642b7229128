//! Conversion between dynamic [`Value`]s and `serde_json` values.
//!
//! Decoded values carry their own shape, so [to_json] needs no layout. Going
//! the other way the layout decides what each JSON value means: a string is an
//! enum name for an enum field, text for a char array, raw bytes for binary
//! var-data.

use std::collections::HashMap;

use brine_sbe_schema::{
    BodyLayout, CodecError, CompositeLayout, EnumLayout, FieldKind, FieldLayout, MessageLayout, PrimitiveKind,
    PrimitiveLayout, PrimitiveType, SetLayout, Value,
};
use serde_json::{Map, Number, Value as Json};

/// Plain JSON for a decoded value. Enums become their names, sets arrays of
/// choice names, binary var-data arrays of bytes and NaN becomes `null`.
pub fn to_json(value: &Value) -> Json {
    match *value {
        Value::Int(v) => Json::from(v),
        Value::UInt(v) => Json::from(v),
        Value::Float(v) => Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null),
        Value::String(ref text) => Json::String(text.clone()),
        Value::Bytes(ref bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::Array(ref items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Enum(_, name) => Json::String(name.to_owned()),
        Value::Set(_, ref choices) => Json::Array(choices.iter().map(|c| Json::String((*c).to_owned())).collect()),
        Value::Object(_, ref fields) => {
            let mut map = Map::new();
            for (name, field) in fields {
                map.insert((*name).to_owned(), to_json(field));
            }
            Json::Object(map)
        }
    }
}

/// Builds the value of a whole message body from JSON.
pub fn message_from_json<'a>(message: &MessageLayout<'a>, json: &Json) -> Result<Value<'a>, CodecError> {
    body_from_json(&message.body, message.name, json, message.name)
}

fn mismatch(path: &str, expected: &str) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_owned(),
        expected: expected.to_owned(),
    }
}

fn child(path: &str, name: &str) -> String {
    format!("{}.{}", path, name)
}

fn object<'j>(json: &'j Json, path: &str) -> Result<&'j Map<String, Json>, CodecError> {
    json.as_object().ok_or_else(|| mismatch(path, "an object"))
}

fn body_from_json<'a>(body: &BodyLayout<'a>, name: &'a str, json: &Json, path: &str) -> Result<Value<'a>, CodecError> {
    let map = object(json, path)?;
    let mut value = fields_from_json(body.fields(), name, map, path)?;

    // A missing group encodes as an empty one.
    for group in body.groups() {
        let group_path = child(path, group.name);
        let mut elements = Vec::new();
        match map.get(group.name) {
            None | Some(Json::Null) => {}
            Some(Json::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let element_path = format!("{}[{}]", group_path, i);
                    elements.push(body_from_json(&group.body, group.name, item, &element_path)?);
                }
            }
            Some(_) => return Err(mismatch(&group_path, "an array of group elements")),
        }
        value.set(group.name, Value::Array(elements));
    }

    for data in body.var_data() {
        let data_path = child(path, data.name);
        let payload = match map.get(data.name) {
            None | Some(Json::Null) if data.is_text() => Value::String(String::new()),
            None | Some(Json::Null) => Value::Bytes(Vec::new()),
            Some(Json::String(text)) if data.is_text() => Value::String(text.clone()),
            Some(Json::String(text)) => Value::Bytes(text.as_bytes().to_vec()),
            Some(Json::Array(items)) => Value::Bytes(bytes(items, &data_path)?),
            Some(_) => return Err(mismatch(&data_path, "a string or an array of bytes")),
        };
        value.set(data.name, payload);
    }

    Ok(value)
}

/// Missing and `null` fields are left out so the codec can write the null
/// value of optional fields and report required ones.
fn fields_from_json<'a, 'f>(
    fields: impl Iterator<Item = &'f FieldLayout<'a>>,
    name: &'a str,
    map: &Map<String, Json>,
    path: &str,
) -> Result<Value<'a>, CodecError>
where
    'a: 'f,
{
    let mut value = Value::Object(name, HashMap::new());
    for field in fields {
        if field.is_constant() {
            continue;
        }
        let field_path = child(path, field.name);
        let json = match map.get(field.name) {
            Some(json) => json,
            None => continue,
        };
        if let Some(converted) = field_from_json(field, json, &field_path)? {
            value.set(field.name, converted);
        }
    }
    Ok(value)
}

fn field_from_json<'a>(field: &FieldLayout<'a>, json: &Json, path: &str) -> Result<Option<Value<'a>>, CodecError> {
    match field.kind {
        FieldKind::Primitive(ref p) => primitive_from_json(p, json, path),
        FieldKind::Composite(ref composite) if !json.is_null() => composite_from_json(composite, json, path).map(Some),
        FieldKind::Enum(ref layout) if !json.is_null() => enum_from_json(layout, json, path).map(Some),
        FieldKind::Set(ref layout) if !json.is_null() => set_from_json(layout, json, path).map(Some),
        _ => Ok(None),
    }
}

fn composite_from_json<'a>(composite: &CompositeLayout<'a>, json: &Json, path: &str) -> Result<Value<'a>, CodecError> {
    fields_from_json(composite.members.iter(), composite.type_name, object(json, path)?, path)
}

fn primitive_from_json<'a>(p: &PrimitiveLayout, json: &Json, path: &str) -> Result<Option<Value<'a>>, CodecError> {
    if p.is_text() {
        return match json {
            Json::Null => Ok(None),
            Json::String(text) => Ok(Some(Value::String(text.clone()))),
            Json::Array(items) => Ok(Some(Value::Bytes(bytes(items, path)?))),
            _ => Err(mismatch(path, "a string")),
        };
    }

    if p.is_array() {
        let items = match json {
            Json::Null => return Ok(None),
            Json::Array(items) => items,
            _ => return Err(mismatch(path, "an array")),
        };
        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            values.push(scalar(p.primitive_type, item, &format!("{}[{}]", path, i))?);
        }
        return Ok(Some(Value::Array(values)));
    }

    match json {
        // NaN is the null of float fields and is written out as `null`.
        Json::Null if p.primitive_type.kind() == PrimitiveKind::Float => Ok(Some(Value::Float(f64::NAN))),
        Json::Null => Ok(None),
        json => scalar(p.primitive_type, json, path).map(Some),
    }
}

fn scalar<'a>(primitive: PrimitiveType, json: &Json, path: &str) -> Result<Value<'a>, CodecError> {
    let expected = || mismatch(path, &format!("a {} number", primitive.name()));
    match primitive.kind() {
        PrimitiveKind::Float => match json {
            Json::Null => Ok(Value::Float(f64::NAN)),
            json => json.as_f64().map(Value::Float).ok_or_else(expected),
        },
        PrimitiveKind::Signed => json.as_i64().map(Value::Int).ok_or_else(expected),
        PrimitiveKind::Unsigned => json.as_u64().map(Value::UInt).ok_or_else(expected),
        PrimitiveKind::Char => match json {
            Json::String(text) if text.len() == 1 => Ok(Value::UInt(u64::from(text.as_bytes()[0]))),
            json => json.as_u64().map(Value::UInt).ok_or_else(expected),
        },
    }
}

fn bytes(items: &[Json], path: &str) -> Result<Vec<u8>, CodecError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| mismatch(&format!("{}[{}]", path, i), "a byte"))
        })
        .collect()
}

fn enum_from_json<'a>(layout: &EnumLayout<'a>, json: &Json, path: &str) -> Result<Value<'a>, CodecError> {
    let name = json
        .as_str()
        .ok_or_else(|| mismatch(path, &format!("a {} name", layout.type_name)))?;
    if name == EnumLayout::NULL_NAME {
        return Ok(Value::Enum(layout.type_name, EnumLayout::NULL_NAME));
    }
    layout
        .by_name(name)
        .map(|v| Value::Enum(layout.type_name, v.name))
        .ok_or_else(|| CodecError::UnknownEnumValue {
            path: path.to_owned(),
            enum_name: layout.type_name.to_owned(),
            raw: name.to_owned(),
        })
}

fn set_from_json<'a>(layout: &SetLayout<'a>, json: &Json, path: &str) -> Result<Value<'a>, CodecError> {
    let items = json
        .as_array()
        .ok_or_else(|| mismatch(path, &format!("an array of {} choices", layout.type_name)))?;

    let mut choices = Vec::with_capacity(items.len());
    for item in items {
        let name = item.as_str().ok_or_else(|| mismatch(path, "a choice name"))?;
        let choice = layout
            .choices
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CodecError::UnknownChoice {
                path: path.to_owned(),
                set_name: layout.type_name.to_owned(),
                choice: name.to_owned(),
            })?;
        choices.push(choice.name);
    }
    Ok(Value::Set(layout.type_name, choices))
}
