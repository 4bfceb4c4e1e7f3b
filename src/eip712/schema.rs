//! Type schemas and canonical type encoding.
//!
//! A [`TypeSchema`] maps struct names to their ordered fields. Type encoding
//! follows EIP-712: the primary type's signature first, then every struct it
//! references (directly, nested, or as an array element) sorted by name.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt,
};

use alloy::primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parsed field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bytes,
    Bool,
    Address,
    /// Unsigned integer of the given bit width.
    Uint(u16),
    /// Signed integer of the given bit width.
    Int(u16),
    /// `bytes1` to `bytes32`.
    FixedBytes(u8),
    /// Reference to another struct in the schema.
    Struct(String),
    /// Dynamic (`None`) or fixed-length array.
    Array(Box<FieldType>, Option<usize>),
}

impl FieldType {
    /// Parses a field type string such as `uint64`, `Person[]` or `bytes32[2]`.
    pub fn parse(ty: &str) -> Result<Self> {
        let ty = ty.trim();
        if let Some(inner) = ty.strip_suffix(']') {
            let open = inner
                .rfind('[')
                .ok_or_else(|| Error::Schema(format!("unbalanced brackets in `{ty}`")))?;
            let element = Self::parse(&inner[..open])?;
            let len = match &inner[open + 1..] {
                "" => None,
                digits => Some(
                    digits
                        .parse::<usize>()
                        .map_err(|_| Error::Schema(format!("bad array length in `{ty}`")))?,
                ),
            };
            return Ok(FieldType::Array(Box::new(element), len));
        }

        match ty {
            "" => Err(Error::Schema("empty field type".into())),
            "string" => Ok(FieldType::String),
            "bytes" => Ok(FieldType::Bytes),
            "bool" => Ok(FieldType::Bool),
            "address" => Ok(FieldType::Address),
            "uint" => Ok(FieldType::Uint(256)),
            "int" => Ok(FieldType::Int(256)),
            _ => {
                if let Some(bits) = ty.strip_prefix("uint").and_then(int_width) {
                    Ok(FieldType::Uint(bits))
                } else if let Some(bits) = ty.strip_prefix("int").and_then(int_width) {
                    Ok(FieldType::Int(bits))
                } else if let Some(size) = ty.strip_prefix("bytes").and_then(bytes_width) {
                    Ok(FieldType::FixedBytes(size))
                } else if ty.contains(['[', ']', ' ', ',', '(', ')']) {
                    Err(Error::Schema(format!("invalid field type `{ty}`")))
                } else {
                    Ok(FieldType::Struct(ty.to_owned()))
                }
            }
        }
    }

    /// Name of the struct this type bottoms out in, looking through arrays.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            FieldType::Struct(name) => Some(name),
            FieldType::Array(inner, _) => inner.struct_name(),
            _ => None,
        }
    }
}

fn int_width(digits: &str) -> Option<u16> {
    let bits: u16 = digits.parse().ok()?;
    (bits % 8 == 0 && (8..=256).contains(&bits) && !digits.starts_with('0')).then_some(bits)
}

fn bytes_width(digits: &str) -> Option<u8> {
    let size: u8 = digits.parse().ok()?;
    ((1..=32).contains(&size) && !digits.starts_with('0')).then_some(size)
}

/// A single declared struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// The declared type string, kept verbatim for type encoding.
    pub type_name: String,
    pub ty: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Result<Self> {
        let type_name = type_name.into();
        let ty = FieldType::parse(&type_name)?;
        Ok(Self {
            name: name.into(),
            type_name,
            ty,
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)
    }
}

/// Wire form of a field, as found in typed-data JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Mapping of struct name to its ordered fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<RawField>>",
    into = "BTreeMap<String, Vec<RawField>>"
)]
pub struct TypeSchema {
    types: BTreeMap<String, Vec<Field>>,
}

impl TypeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a struct type. Field order is significant.
    pub fn insert<'a>(
        &mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<()> {
        let name = name.into();
        let fields = fields
            .into_iter()
            .map(|(field, ty)| Field::new(field, ty))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(dup) = fields.iter().find(|field| !seen.insert(field.name.as_str())) {
            return Err(Error::Schema(format!(
                "duplicate field `{}` in `{name}`",
                dup.name
            )));
        }

        self.types.insert(name, fields);
        Ok(())
    }

    /// Builder form of [`TypeSchema::insert`].
    pub fn with_type<'a>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        self.insert(name, fields)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the declared fields of `name`.
    pub fn fields(&self, name: &str) -> Result<&[Field]> {
        self.types
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Schema(format!("undefined type `{name}`")))
    }

    /// Checks that every type reachable from `primary` is defined and that
    /// no struct contains itself through non-array fields.
    ///
    /// Types first reached through an array are checked too: an array breaks
    /// the recursion only for the edge it sits on.
    pub fn validate(&self, primary: &str) -> Result<()> {
        let reachable = self.dependencies(primary)?;
        let mut stack = Vec::new();
        let mut done = HashSet::new();
        for name in std::iter::once(primary).chain(reachable) {
            self.check_cycles(name, &mut stack, &mut done)?;
        }
        Ok(())
    }

    fn check_cycles<'a>(
        &'a self,
        name: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if let Some(pos) = stack.iter().position(|seen| *seen == name) {
            let mut path = stack[pos..].to_vec();
            path.push(name);
            return Err(Error::Schema(format!(
                "recursive struct reference: {}",
                path.join(" -> ")
            )));
        }
        if done.contains(name) {
            return Ok(());
        }

        stack.push(name);
        for field in self.fields(name)? {
            if let FieldType::Struct(child) = &field.ty {
                self.check_cycles(child, stack, done)?;
            }
        }
        stack.pop();
        done.insert(name);
        Ok(())
    }

    /// Collects every struct type referenced from `primary`, excluding itself.
    fn dependencies(&self, primary: &str) -> Result<BTreeSet<&str>> {
        let mut found = BTreeSet::new();
        let mut pending = vec![primary];
        while let Some(name) = pending.pop() {
            for field in self.fields(name)? {
                let Some(child) = field.ty.struct_name() else {
                    continue;
                };
                let (child, _) = self
                    .types
                    .get_key_value(child)
                    .ok_or_else(|| Error::Schema(format!("undefined type `{child}` in `{name}`")))?;
                if found.insert(child.as_str()) {
                    pending.push(child);
                }
            }
        }
        found.remove(primary);
        Ok(found)
    }

    fn signature(&self, name: &str, out: &mut String) -> Result<()> {
        out.push_str(name);
        out.push('(');
        for (i, field) in self.fields(name)?.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&field.to_string());
        }
        out.push(')');
        Ok(())
    }

    /// Canonical type encoding of `primary`.
    pub fn encode_type(&self, primary: &str) -> Result<String> {
        let mut out = String::new();
        self.signature(primary, &mut out)?;
        for dep in self.dependencies(primary)? {
            self.signature(dep, &mut out)?;
        }
        Ok(out)
    }

    /// keccak256 of [`TypeSchema::encode_type`].
    pub fn type_hash(&self, primary: &str) -> Result<B256> {
        Ok(keccak256(self.encode_type(primary)?))
    }
}

impl TryFrom<BTreeMap<String, Vec<RawField>>> for TypeSchema {
    type Error = Error;

    fn try_from(raw: BTreeMap<String, Vec<RawField>>) -> Result<Self> {
        let mut schema = TypeSchema::new();
        for (name, fields) in &raw {
            schema.insert(
                name.clone(),
                fields.iter().map(|f| (f.name.as_str(), f.ty.as_str())),
            )?;
        }
        Ok(schema)
    }
}

impl From<TypeSchema> for BTreeMap<String, Vec<RawField>> {
    fn from(schema: TypeSchema) -> Self {
        schema
            .types
            .into_iter()
            .map(|(name, fields)| {
                let fields = fields
                    .into_iter()
                    .map(|f| RawField {
                        name: f.name,
                        ty: f.type_name,
                    })
                    .collect();
                (name, fields)
            })
            .collect()
    }
}
