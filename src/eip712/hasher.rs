//! Struct hashing (`hashStruct` / `encodeData`).

use alloy::primitives::{B256, U256, keccak256};

use super::{
    Domain,
    schema::{FieldType, TypeSchema},
    value::{Primitive, TypedValue},
};
use crate::error::{Error, Result};

/// Computes `hashStruct(value)` for struct type `primary`.
///
/// The value must carry exactly the fields declared for `primary`; each is
/// encoded in declaration order as a 32-byte word.
pub fn hash_struct(schema: &TypeSchema, primary: &str, value: &TypedValue) -> Result<B256> {
    let TypedValue::Struct(value) = value else {
        return Err(Error::type_mismatch(primary, value.kind()));
    };
    if value.type_name != primary {
        return Err(Error::type_mismatch(
            primary,
            format!("struct `{}`", value.type_name),
        ));
    }

    let declared = schema.fields(primary)?;
    if let Some(extra) = value
        .fields
        .keys()
        .find(|key| !declared.iter().any(|field| &field.name == *key))
    {
        return Err(Error::field_mismatch(
            primary,
            format!("undeclared field `{extra}`"),
        ));
    }

    let mut buf = Vec::with_capacity(32 * (declared.len() + 1));
    buf.extend_from_slice(schema.type_hash(primary)?.as_slice());
    for field in declared {
        let item = value.fields.get(&field.name).ok_or_else(|| {
            Error::field_mismatch(primary, format!("missing field `{}`", field.name))
        })?;
        let word = encode_field(schema, &field.ty, &field.type_name, item)?;
        buf.extend_from_slice(word.as_slice());
    }

    Ok(keccak256(&buf))
}

/// Encodes one field value as a 32-byte word.
fn encode_field(
    schema: &TypeSchema,
    ty: &FieldType,
    declared: &str,
    value: &TypedValue,
) -> Result<B256> {
    let mismatch = || Error::type_mismatch(declared, value.kind());

    match (ty, value) {
        (FieldType::Struct(name), TypedValue::Struct(_)) => hash_struct(schema, name, value),
        (FieldType::Array(element, len), TypedValue::Array(items)) => {
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
            let mut buf = Vec::with_capacity(32 * items.len());
            for item in items {
                buf.extend_from_slice(encode_field(schema, element, element_name, item)?.as_slice());
            }
            Ok(keccak256(&buf))
        }
        (_, TypedValue::Primitive(primitive)) => match (ty, primitive) {
            (FieldType::String, Primitive::String(s)) => Ok(keccak256(s.as_bytes())),
            (FieldType::Bytes, Primitive::Bytes(b)) => Ok(keccak256(b)),
            (FieldType::Bool, Primitive::Bool(b)) => Ok(U256::from(*b as u8).into()),
            (FieldType::Address, Primitive::Address(a)) => Ok(a.into_word()),
            (FieldType::Uint(bits), Primitive::Uint(v)) => {
                if v.bit_len() > *bits as usize {
                    return Err(Error::type_mismatch(declared, format!("{v} out of range")));
                }
                Ok(B256::from(*v))
            }
            (FieldType::Int(bits), Primitive::Int(v)) => {
                // Range of a signed N-bit integer is [-2^(N-1), 2^(N-1) - 1].
                let bound = U256::from(1u8) << (*bits as usize - 1);
                let abs = v.unsigned_abs();
                let fits = if v.is_negative() { abs <= bound } else { abs < bound };
                if !fits {
                    return Err(Error::type_mismatch(declared, format!("{v} out of range")));
                }
                Ok(B256::from(v.into_raw()))
            }
            (FieldType::FixedBytes(size), Primitive::FixedBytes(b)) => {
                if b.len() != *size as usize {
                    return Err(Error::type_mismatch(
                        declared,
                        format!("{} bytes", b.len()),
                    ));
                }
                Ok(B256::right_padding_from(b))
            }
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

/// Final digest: `keccak256(0x1901 ‖ domainSeparator ‖ structHash)`.
pub fn signing_hash(
    domain: &Domain,
    schema: &TypeSchema,
    primary: &str,
    value: &TypedValue,
) -> Result<B256> {
    schema.validate(primary)?;
    let struct_hash = hash_struct(schema, primary, value)?;
    Ok(digest(domain.separator(), struct_hash))
}

/// Combines a domain separator and struct hash into the signing digest.
pub fn digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = [0u8; 66];
    buf[..2].copy_from_slice(&[0x19, 0x01]);
    buf[2..34].copy_from_slice(domain_separator.as_slice());
    buf[34..].copy_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use alloy::{
        dyn_abi::TypedData as AlloyTypedData,
        primitives::{Address, I256, address},
    };
    use hex_literal::hex;
    use serde_json::json;

    use super::*;
    use crate::eip712::StructValue;

    fn ether_mail_schema() -> TypeSchema {
        TypeSchema::new()
            .with_type(
                "Mail",
                [("from", "Person"), ("to", "Person"), ("contents", "string")],
            )
            .unwrap()
            .with_type("Person", [("name", "string"), ("wallet", "address")])
            .unwrap()
    }

    fn ether_mail_value() -> TypedValue {
        StructValue::new("Mail")
            .with(
                "from",
                StructValue::new("Person")
                    .with("name", "Cow")
                    .with("wallet", address!("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826")),
            )
            .with(
                "to",
                StructValue::new("Person")
                    .with("name", "Bob")
                    .with("wallet", address!("0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB")),
            )
            .with("contents", "Hello, Bob!")
            .into()
    }

    fn ether_mail_domain() -> Domain {
        Domain::new(
            "Ether Mail",
            "1",
            1,
            address!("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"),
        )
    }

    #[test]
    fn test_ether_mail_vectors() {
        let schema = ether_mail_schema();
        let value = ether_mail_value();

        assert_eq!(
            hash_struct(&schema, "Mail", &value).unwrap(),
            B256::from(hex!(
                "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
            ))
        );
        assert_eq!(
            signing_hash(&ether_mail_domain(), &schema, "Mail", &value).unwrap(),
            B256::from(hex!(
                "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
            ))
        );
    }

    #[test]
    fn test_deterministic() {
        let schema = ether_mail_schema();
        let a = signing_hash(&ether_mail_domain(), &schema, "Mail", &ether_mail_value()).unwrap();
        let b = signing_hash(&ether_mail_domain(), &schema, "Mail", &ether_mail_value()).unwrap();
        assert_eq!(a, b);
    }

    /// `Mail{from: address, to: address, contents: string}` under the `MyDapp`
    /// domain: a fixed digest, also checked against alloy.
    #[test]
    fn test_flat_mail_digest() {
        let schema = TypeSchema::new()
            .with_type(
                "Mail",
                [("from", "address"), ("to", "address"), ("contents", "string")],
            )
            .unwrap();
        let from = address!("0x0000000000000000000000000000000000000001");
        let to = address!("0x0000000000000000000000000000000000000002");
        let value: TypedValue = StructValue::new("Mail")
            .with("from", from)
            .with("to", to)
            .with("contents", "Hello")
            .into();
        let domain = Domain::new("MyDapp", "1", 1, Address::ZERO);

        let ours = signing_hash(&domain, &schema, "Mail", &value).unwrap();
        assert_eq!(
            ours,
            B256::from(hex!(
                "43ee3aaccc73f666f1dce5e30619bbfb495414577ba5d69e95a538eabb278bdc"
            ))
        );

        let reference: AlloyTypedData = serde_json::from_value(json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Mail": [
                    {"name": "from", "type": "address"},
                    {"name": "to", "type": "address"},
                    {"name": "contents", "type": "string"}
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "MyDapp",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0x0000000000000000000000000000000000000000"
            },
            "message": {
                "from": "0x0000000000000000000000000000000000000001",
                "to": "0x0000000000000000000000000000000000000002",
                "contents": "Hello"
            }
        }))
        .unwrap();
        assert_eq!(ours, reference.eip712_signing_hash().unwrap());
    }

    #[test]
    fn test_arrays_and_wide_types_match_alloy() {
        let schema = TypeSchema::new()
            .with_type(
                "Batch",
                [
                    ("items", "Item[]"),
                    ("tags", "string[2]"),
                    ("salt", "bytes32"),
                    ("delta", "int64"),
                    ("blob", "bytes"),
                ],
            )
            .unwrap()
            .with_type("Item", [("id", "uint256"), ("ok", "bool")])
            .unwrap();
        let message = json!({
            "items": [{"id": "12345678901234567890", "ok": true}, {"id": 7, "ok": false}],
            "tags": ["a", "b"],
            "salt": "0x0101010101010101010101010101010101010101010101010101010101010101",
            "delta": -42,
            "blob": "0xdeadbeef"
        });
        let value = TypedValue::from_json(&schema, "Batch", &message).unwrap();
        let domain = Domain::new("Batches", "2", 42161, address!("0x1111111111111111111111111111111111111111"));
        let ours = signing_hash(&domain, &schema, "Batch", &value).unwrap();

        let reference: AlloyTypedData = serde_json::from_value(json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Batch": [
                    {"name": "items", "type": "Item[]"},
                    {"name": "tags", "type": "string[2]"},
                    {"name": "salt", "type": "bytes32"},
                    {"name": "delta", "type": "int64"},
                    {"name": "blob", "type": "bytes"}
                ],
                "Item": [
                    {"name": "id", "type": "uint256"},
                    {"name": "ok", "type": "bool"}
                ]
            },
            "primaryType": "Batch",
            "domain": {
                "name": "Batches",
                "version": "2",
                "chainId": 42161,
                "verifyingContract": "0x1111111111111111111111111111111111111111"
            },
            "message": message
        }))
        .unwrap();
        assert_eq!(ours, reference.eip712_signing_hash().unwrap());
    }

    #[test]
    fn test_field_presence_is_strict() {
        let schema = ether_mail_schema();
        let person = |extra: Option<(&str, &str)>| {
            let mut p = StructValue::new("Person").with("name", "Cow");
            if let Some((k, v)) = extra {
                p = p.with(k, v);
            }
            TypedValue::from(p)
        };

        // missing `wallet`
        assert!(matches!(
            hash_struct(&schema, "Person", &person(None)),
            Err(Error::FieldMismatch { .. })
        ));

        // `wallet` present but an undeclared `nickname` too
        let mut with_extra = StructValue::new("Person")
            .with("name", "Cow")
            .with("wallet", Address::ZERO);
        with_extra = with_extra.with("nickname", "moo");
        assert!(matches!(
            hash_struct(&schema, "Person", &with_extra.into()),
            Err(Error::FieldMismatch { .. })
        ));
        assert!(matches!(
            hash_struct(&schema, "Person", &person(Some(("nickname", "moo")))),
            Err(Error::FieldMismatch { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let schema = TypeSchema::new()
            .with_type("Nonce", [("nonce", "uint64")])
            .unwrap();
        let wrong: TypedValue = StructValue::new("Nonce").with("nonce", "1000").into();
        assert!(matches!(
            hash_struct(&schema, "Nonce", &wrong),
            Err(Error::TypeMismatch { ref expected, .. }) if expected == "uint64"
        ));

        let too_wide: TypedValue = StructValue::new("Nonce").with("nonce", U256::MAX).into();
        assert!(matches!(
            hash_struct(&schema, "Nonce", &too_wide),
            Err(Error::TypeMismatch { .. })
        ));

        let signed = TypeSchema::new().with_type("S", [("v", "int8")]).unwrap();
        let min: TypedValue = StructValue::new("S")
            .with("v", I256::from_dec_str("-128").unwrap())
            .into();
        hash_struct(&signed, "S", &min).unwrap();
        let below: TypedValue = StructValue::new("S")
            .with("v", I256::from_dec_str("-129").unwrap())
            .into();
        assert!(matches!(
            hash_struct(&signed, "S", &below),
            Err(Error::TypeMismatch { .. })
        ));
        let above: TypedValue = StructValue::new("S")
            .with("v", I256::from_dec_str("128").unwrap())
            .into();
        assert!(matches!(
            hash_struct(&signed, "S", &above),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_cyclic_schema_rejected_before_hashing() {
        let schema = TypeSchema::new()
            .with_type("A", [("b", "B")])
            .unwrap()
            .with_type("B", [("a", "A")])
            .unwrap();
        let value: TypedValue = StructValue::new("A").into();
        assert!(matches!(
            signing_hash(&ether_mail_domain(), &schema, "A", &value),
            Err(Error::Schema(_))
        ));
    }
}
