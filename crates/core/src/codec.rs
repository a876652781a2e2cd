//! Entity codec: entity ⇄ field map
//!
//! Encoding walks the entity's attribute table and produces one string per
//! persistent, non-null attribute:
//!
//! | Kind | Stored form |
//! |------|-------------|
//! | Bool / Int / Float / String | textual form |
//! | Enum | ordinal |
//! | Time | `<ticks>|UTC` or `<ticks>|LOC` |
//! | Json | compact JSON |
//!
//! Decoding starts from `E::default()` and applies every field present in
//! the map. Missing (or empty) fields leave the default in place; malformed
//! fields fail with [`Error::TypeConversion`].

use std::collections::BTreeMap;

use crate::entity::{Attribute, EncodingKind, Entity};
use crate::error::{Error, Result};
use crate::time::StoredTime;
use crate::value::FieldValue;

/// Field map stored under a primary key
pub type FieldMap = BTreeMap<String, String>;

/// Encode an entity into its field map
pub fn encode<E: Entity>(entity: &E) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    for attribute in E::attributes().iter().filter(|a| a.is_persistent()) {
        let value = attribute.read(entity)?;
        if let Some(encoded) = encode_value(attribute.name(), &value)? {
            fields.insert(attribute.name().to_string(), encoded);
        }
    }
    Ok(fields)
}

/// Encode a single value; `None` for null
pub fn encode_value(attribute: &str, value: &FieldValue) -> Result<Option<String>> {
    let encoded = match value {
        FieldValue::Null => return Ok(None),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) if f.is_finite() => f.to_string(),
        FieldValue::Float(f) => return Err(Error::conversion(attribute, "finite float", f.to_string())),
        FieldValue::String(s) => s.clone(),
        FieldValue::Enum { ordinal, .. } => ordinal.to_string(),
        FieldValue::Time(t) => t.encode(),
        FieldValue::Json(v) => serde_json::to_string(v)?,
    };
    Ok(Some(encoded))
}

/// Decode an entity from its field map
pub fn decode<E: Entity>(fields: &FieldMap) -> Result<E> {
    let mut entity = E::default();
    for attribute in E::attributes().iter().filter(|a| a.is_persistent()) {
        let raw = match fields.get(attribute.name()) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };
        let value = decode_value(attribute, raw)?;
        attribute.write(&mut entity, value)?;
    }
    Ok(entity)
}

/// Decode a single stored field according to the attribute's kind
pub fn decode_value<E>(attribute: &Attribute<E>, raw: &str) -> Result<FieldValue> {
    let name = attribute.name();
    let kind = attribute.kind();
    let malformed = || Error::conversion(name, kind.name(), raw);
    let value = match kind {
        EncodingKind::Bool => {
            if raw.eq_ignore_ascii_case("true") {
                FieldValue::Bool(true)
            } else if raw.eq_ignore_ascii_case("false") {
                FieldValue::Bool(false)
            } else {
                return Err(malformed());
            }
        }
        EncodingKind::Int => FieldValue::Int(raw.parse().map_err(|_| malformed())?),
        EncodingKind::Float => FieldValue::Float(raw.parse().map_err(|_| malformed())?),
        EncodingKind::String => FieldValue::String(raw.to_string()),
        EncodingKind::Enum => FieldValue::Enum {
            ordinal: raw.parse().map_err(|_| malformed())?,
            label: String::new(),
        },
        EncodingKind::Time => FieldValue::Time(StoredTime::parse(name, raw)?),
        EncodingKind::Json => FieldValue::Json(
            serde_json::from_str(raw).map_err(|e| Error::conversion(name, "json", e.to_string()))?,
        ),
    };
    Ok(value)
}
