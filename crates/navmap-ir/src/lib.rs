//! navmap join IR and runtime value types.
//!
//! This crate defines the backend-neutral intermediate representation the
//! navmap join compiler emits, plus the runtime value, row, and join-context
//! types backends exchange with it.
//!
//! # Modules
//!
//! - [`value`] - Runtime values, scalar type tags, and key component types
//! - [`expr`] - The join expression AST (source, grouped join, flatten)
//! - [`row`] - Materialized rows and flat join contexts
//! - [`error`] - IR validation error types
//!
//! # Serialization
//!
//! Flat types (`Value`, `Row`, `FieldRef`, the type tags) derive
//! `rkyv::Archive`, `rkyv::Serialize`, and `rkyv::Deserialize` for zero-copy
//! exchange. The recursive AST nodes (`JoinExpr`, `KeyPart`) are serde-only;
//! recursive rkyv types are avoided throughout.
//!
//! ```ignore
//! use navmap_ir::{Row, Value};
//!
//! let row = Row::new().with_field("id", 7i64);
//! let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&row).unwrap();
//! ```

pub mod error;
pub mod expr;
pub mod row;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use expr::{FieldRef, JoinExpr, KeyPart, KeySelector};
pub use row::{JoinContext, Row};
pub use value::{KeyType, ScalarType, Value};

/// IR version for compatibility checks.
///
/// Embedded in serialized model bundles so a reader can detect an
/// incompatible expression or value layout. Incremented on breaking changes.
pub const IR_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ir_version() {
        assert_eq!(IR_VERSION, 1);
    }

    #[test]
    fn test_expr_json_roundtrip() {
        let expr = JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(JoinExpr::source("Customer")),
                inner: Box::new(JoinExpr::source("Order")),
                outer_key: KeySelector::scalar(0, "id", KeyType::new(ScalarType::Int64)),
                inner_key: KeySelector::scalar(
                    0,
                    "customer_id",
                    KeyType::nullable(ScalarType::Int64),
                ),
            }),
            elide_outer_stage: false,
        };

        let json = serde_json::to_string(&expr).unwrap();
        let back: JoinExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }

    #[test]
    fn test_field_ref_roundtrip() {
        let field = FieldRef::new(2, "order.id");
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&field).unwrap();
        let archived =
            rkyv::access::<expr::ArchivedFieldRef, rkyv::rancor::Error>(&bytes).unwrap();
        let deserialized: FieldRef =
            rkyv::deserialize::<FieldRef, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(field, deserialized);
    }
}
