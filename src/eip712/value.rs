//! Typed value trees.
//!
//! [`TypedValue`] is a closed tree of primitives, structs and arrays. Values
//! coming from JSON are decoded against a [`TypeSchema`] once, at the
//! boundary, so that shape errors surface before anything is hashed.

use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, I256, U256};
use serde_json::Value as Json;

use super::schema::{FieldType, TypeSchema};
use crate::error::{Error, Result};

/// Leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    String(String),
    /// Dynamic `bytes`.
    Bytes(Bytes),
    Bool(bool),
    Address(Address),
    Uint(U256),
    Int(I256),
    /// `bytesN`; the length must equal N.
    FixedBytes(Bytes),
}

impl Primitive {
    fn kind(&self) -> &'static str {
        match self {
            Primitive::String(_) => "string",
            Primitive::Bytes(_) => "bytes",
            Primitive::Bool(_) => "bool",
            Primitive::Address(_) => "address",
            Primitive::Uint(_) => "unsigned integer",
            Primitive::Int(_) => "signed integer",
            Primitive::FixedBytes(_) => "fixed bytes",
        }
    }
}

/// A struct instance: type name plus named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: BTreeMap<String, TypedValue>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, replacing any previous value under the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Closed value tree hashed by [`super::hash_struct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Primitive(Primitive),
    Struct(StructValue),
    Array(Vec<TypedValue>),
}

impl TypedValue {
    /// Short description of the value's kind, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            TypedValue::Primitive(p) => p.kind().to_owned(),
            TypedValue::Struct(s) => format!("struct `{}`", s.type_name),
            TypedValue::Array(items) => format!("array of {} items", items.len()),
        }
    }

    /// Decodes a JSON message as an instance of struct `primary`.
    pub fn from_json(schema: &TypeSchema, primary: &str, json: &Json) -> Result<Self> {
        decode(schema, &FieldType::Struct(primary.to_owned()), primary, json)
    }
}

impl From<Primitive> for TypedValue {
    fn from(value: Primitive) -> Self {
        TypedValue::Primitive(value)
    }
}

impl From<StructValue> for TypedValue {
    fn from(value: StructValue) -> Self {
        TypedValue::Struct(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_owned()).into()
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Primitive::String(value).into()
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Primitive::Bool(value).into()
    }
}

impl From<Address> for TypedValue {
    fn from(value: Address) -> Self {
        Primitive::Address(value).into()
    }
}

impl From<u64> for TypedValue {
    fn from(value: u64) -> Self {
        Primitive::Uint(U256::from(value)).into()
    }
}

impl From<U256> for TypedValue {
    fn from(value: U256) -> Self {
        Primitive::Uint(value).into()
    }
}

impl From<I256> for TypedValue {
    fn from(value: I256) -> Self {
        Primitive::Int(value).into()
    }
}

impl From<Bytes> for TypedValue {
    fn from(value: Bytes) -> Self {
        Primitive::Bytes(value).into()
    }
}

impl<T: Into<TypedValue>> From<Vec<T>> for TypedValue {
    fn from(items: Vec<T>) -> Self {
        TypedValue::Array(items.into_iter().map(Into::into).collect())
    }
}

fn json_kind(json: &Json) -> String {
    match json {
        Json::Null => "null".into(),
        Json::Bool(_) => "JSON boolean".into(),
        Json::Number(n) => format!("JSON number {n}"),
        Json::String(s) => format!("JSON string {s:?}"),
        Json::Array(_) => "JSON array".into(),
        Json::Object(_) => "JSON object".into(),
    }
}

fn decode(schema: &TypeSchema, ty: &FieldType, declared: &str, json: &Json) -> Result<TypedValue> {
    let mismatch = || Error::type_mismatch(declared, json_kind(json));

    let value = match ty {
        FieldType::String => match json {
            Json::String(s) => Primitive::String(s.clone()),
            _ => return Err(mismatch()),
        },
        FieldType::Bool => match json {
            Json::Bool(b) => Primitive::Bool(*b),
            _ => return Err(mismatch()),
        },
        FieldType::Address => match json {
            Json::String(s) => Primitive::Address(s.parse().map_err(|_| mismatch())?),
            _ => return Err(mismatch()),
        },
        FieldType::Bytes => Primitive::Bytes(decode_hex(json).ok_or_else(mismatch)?),
        FieldType::FixedBytes(size) => {
            let bytes = decode_hex(json).ok_or_else(mismatch)?;
            if bytes.len() != *size as usize {
                return Err(mismatch());
            }
            Primitive::FixedBytes(bytes)
        }
        FieldType::Uint(_) => {
            let value = match json {
                Json::Number(n) => n.as_u64().map(U256::from),
                Json::String(s) => s.trim().parse::<U256>().ok(),
                _ => None,
            };
            Primitive::Uint(value.ok_or_else(mismatch)?)
        }
        FieldType::Int(_) => {
            let value = match json {
                Json::Number(n) => I256::from_dec_str(&n.to_string()).ok(),
                Json::String(s) => parse_int(s.trim()),
                _ => None,
            };
            Primitive::Int(value.ok_or_else(mismatch)?)
        }
        FieldType::Struct(name) => {
            let Json::Object(map) = json else {
                return Err(mismatch());
            };
            let declared = schema.fields(name)?;

            if let Some(extra) = map
                .keys()
                .find(|key| !declared.iter().any(|field| &field.name == *key))
            {
                return Err(Error::field_mismatch(
                    name,
                    format!("undeclared field `{extra}`"),
                ));
            }

            let mut value = StructValue::new(name.clone());
            for field in declared {
                let raw = map.get(&field.name).ok_or_else(|| {
                    Error::field_mismatch(name, format!("missing field `{}`", field.name))
                })?;
                let decoded = decode(schema, &field.ty, &field.type_name, raw)?;
                value.fields.insert(field.name.clone(), decoded);
            }
            return Ok(TypedValue::Struct(value));
        }
        FieldType::Array(element, len) => {
            let Json::Array(items) = json else {
                return Err(mismatch());
            };
            if len.is_some_and(|len| len != items.len()) {
                return Err(Error::type_mismatch(
                    declared,
                    format!("array of {} items", items.len()),
                ));
            }
            let element_name = declared
                .rsplit_once('[')
                .map(|(element, _)| element)
                .unwrap_or(declared);
            let items = items
                .iter()
                .map(|item| decode(schema, element, element_name, item))
                .collect::<Result<Vec<_>>>()?;
            return Ok(TypedValue::Array(items));
        }
    };

    Ok(TypedValue::Primitive(value))
}

fn decode_hex(json: &Json) -> Option<Bytes> {
    let Json::String(s) = json else {
        return None;
    };
    let s = s.trim();
    const_hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .ok()
        .map(Bytes::from)
}

fn parse_int(s: &str) -> Option<I256> {
    if let Some(hex) = s.strip_prefix("0x") {
        // Hex literals are read as raw two's complement words.
        let raw = U256::from_str_radix(hex, 16).ok()?;
        return Some(I256::from_raw(raw));
    }
    I256::from_dec_str(s).ok()
}
