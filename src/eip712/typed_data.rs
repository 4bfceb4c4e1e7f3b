//! JSON typed-data documents (`eth_signTypedData_v4` shape).

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use super::{
    Domain, TypeSchema, TypedValue,
    domain::EIP712_DOMAIN_FIELDS,
    hasher::{hash_struct, signing_hash},
};
use crate::error::{Error, Result};

const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// A typed-data document: `{types, primaryType, domain, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: TypeSchema,
    pub primary_type: String,
    pub domain: Domain,
    pub message: serde_json::Value,
}

impl TypedData {
    /// Parses a JSON document and checks it against its own schema.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: TypedData = serde_json::from_str(json)
            .map_err(|err| Error::Schema(format!("invalid typed data document: {err}")))?;
        doc.check_domain_type()?;
        Ok(doc)
    }

    /// An `EIP712Domain` declaration, if present, must be the four-field form.
    fn check_domain_type(&self) -> Result<()> {
        if !self.types.contains(DOMAIN_TYPE_NAME) {
            return Ok(());
        }
        let declared = self.types.fields(DOMAIN_TYPE_NAME)?;
        let canonical = declared.len() == EIP712_DOMAIN_FIELDS.len()
            && declared
                .iter()
                .zip(EIP712_DOMAIN_FIELDS)
                .all(|(field, (name, ty))| field.name == name && field.type_name == ty);
        if canonical {
            Ok(())
        } else {
            Err(Error::Schema(format!(
                "{DOMAIN_TYPE_NAME} must declare name, version, chainId and verifyingContract"
            )))
        }
    }

    /// Decodes `message` into a value tree for `primary_type`.
    pub fn message_value(&self) -> Result<TypedValue> {
        if self.primary_type == DOMAIN_TYPE_NAME {
            return Err(Error::Schema(format!(
                "primary type cannot be {DOMAIN_TYPE_NAME}"
            )));
        }
        self.types.validate(&self.primary_type)?;
        TypedValue::from_json(&self.types, &self.primary_type, &self.message)
    }

    /// Struct hash of the message.
    pub fn struct_hash(&self) -> Result<B256> {
        let value = self.message_value()?;
        hash_struct(&self.types, &self.primary_type, &value)
    }

    /// The digest to sign.
    pub fn signing_hash(&self) -> Result<B256> {
        let value = self.message_value()?;
        signing_hash(&self.domain, &self.types, &self.primary_type, &value)
    }
}
