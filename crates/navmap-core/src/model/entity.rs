//! Entity and field definitions.

use navmap_ir::{KeyType, ScalarType};
use rkyv::{Archive, Deserialize, Serialize};

/// The shape of a field: a scalar column, or a structural reference to
/// another entity type.
///
/// Collection-shaped fields carry no row data; they exist so navigation
/// synthesis can see the schema the way the application declares it.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum FieldType {
    /// Required scalar column.
    Scalar(ScalarType),
    /// Nullable scalar column.
    OptionalScalar(ScalarType),
    /// Single reference to another entity type.
    Reference {
        /// Referenced entity name.
        entity: String,
    },
    /// Collection of another entity type.
    Collection {
        /// Element entity name.
        entity: String,
    },
}

impl FieldType {
    /// Create a required scalar type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a nullable scalar type.
    pub fn optional(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// Create a reference type.
    pub fn reference(entity: impl Into<String>) -> Self {
        FieldType::Reference {
            entity: entity.into(),
        }
    }

    /// Create a collection type.
    pub fn collection(entity: impl Into<String>) -> Self {
        FieldType::Collection {
            entity: entity.into(),
        }
    }

    /// Check if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::OptionalScalar(_))
    }

    /// Check if this is a collection shape.
    pub fn is_collection(&self) -> bool {
        matches!(self, FieldType::Collection { .. })
    }

    /// Check if this is a single-reference shape.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference { .. })
    }

    /// The scalar kind, if this is a scalar shape.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => Some(*s),
            _ => None,
        }
    }

    /// The entity a reference or collection shape points at.
    pub fn referenced_entity(&self) -> Option<&str> {
        match self {
            FieldType::Reference { entity } | FieldType::Collection { entity } => Some(entity),
            _ => None,
        }
    }

    /// The join-key component type, if this is a scalar shape.
    pub fn key_type(&self) -> Option<KeyType> {
        match self {
            FieldType::Scalar(s) => Some(KeyType::new(*s)),
            FieldType::OptionalScalar(s) => Some(KeyType::nullable(*s)),
            _ => None,
        }
    }
}

/// Default value for a field.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Current timestamp (evaluated at insert time).
    CurrentTimestamp,
    /// Store-generated sequence value, assigned when the row is flushed.
    Sequence,
}

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field shape.
    pub field_type: FieldType,
    /// Whether the field is backed by the mapped schema. Unmapped fields
    /// are declaration-only; collection synthesis keys off this flag.
    pub mapped: bool,
    /// Default value if not provided.
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    /// Create a new mapped field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mapped: true,
            default: None,
        }
    }

    /// Create a required scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldType::Scalar(scalar))
    }

    /// Create a nullable scalar field.
    pub fn optional_scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldType::OptionalScalar(scalar))
    }

    /// Create a single-reference field.
    pub fn reference(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::new(name, FieldType::reference(entity))
    }

    /// Create a collection field.
    pub fn collection(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::new(name, FieldType::collection(entity))
    }

    /// Mark the field as not backed by the mapped schema.
    pub fn unmapped(mut self) -> Self {
        self.mapped = false;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the field as a store-generated sequence column.
    pub fn generated(mut self) -> Self {
        self.default = Some(DefaultValue::Sequence);
        self
    }

    /// Check if the store assigns this field's value on insert.
    pub fn is_generated(&self) -> bool {
        matches!(self.default, Some(DefaultValue::Sequence))
    }

    /// The join-key component type, if this field is scalar-shaped.
    pub fn key_type(&self) -> Option<KeyType> {
        self.field_type.key_type()
    }
}

/// An entity type definition.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within the model).
    pub name: String,
    /// Ordered declared key, composite allowed.
    pub key: Vec<String>,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition with a single-column key.
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: vec![key_field.into()],
            fields: Vec::new(),
        }
    }

    /// Replace the key with an ordered composite.
    pub fn with_composite_key(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.key = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check whether a field is part of the declared key.
    pub fn is_key_field(&self, name: &str) -> bool {
        self.key.iter().any(|k| k == name)
    }

    /// Collection-shaped fields, in declaration order.
    pub fn collection_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.field_type.is_collection())
    }

    /// Single-reference fields, in declaration order.
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.field_type.is_reference())
    }

    /// Store-generated fields, in declaration order.
    pub fn generated_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_generated())
    }
}
