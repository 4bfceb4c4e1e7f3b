//! EIP-712 structured data hashing.
//!
//! The pipeline is split in three steps:
//!
//! 1. [`Domain::separator`] binds a signature to an application, version,
//!    chain and contract.
//! 2. [`TypeSchema::encode_type`] / [`TypeSchema::type_hash`] produce the
//!    canonical type encoding, with referenced structs appended in name order.
//! 3. [`hash_struct`] walks a [`TypedValue`] against the schema and
//!    [`signing_hash`] combines everything into the 32-byte digest.
//!
//! # Example
//!
//! ```
//! use hyperlinker::{
//!     Address,
//!     eip712::{Domain, StructValue, TypeSchema, signing_hash},
//! };
//!
//! # fn main() -> hyperlinker::Result<()> {
//! let schema = TypeSchema::new().with_type(
//!     "Mail",
//!     [("from", "address"), ("to", "address"), ("contents", "string")],
//! )?;
//! let mail = StructValue::new("Mail")
//!     .with("from", Address::ZERO)
//!     .with("to", Address::ZERO)
//!     .with("contents", "Hello");
//! let domain = Domain::new("MyDapp", "1", 1, Address::ZERO);
//!
//! let digest = signing_hash(&domain, &schema, "Mail", &mail.into())?;
//! # let _ = digest;
//! # Ok(())
//! # }
//! ```

mod domain;
mod hasher;
mod schema;
mod typed_data;
mod value;

pub use domain::{Domain, EIP712_DOMAIN_TYPE, parse_chain_id};
pub use hasher::{digest, hash_struct, signing_hash};
pub use schema::{Field, FieldType, RawField, TypeSchema};
pub use typed_data::TypedData;
pub use value::{Primitive, StructValue, TypedValue};
