//! Navigation edge definitions.

use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a navigation edge within a built model.
///
/// Assigned once when the model is frozen. Join paths, join descriptions,
/// and compiler caches are keyed by these ids, never by edge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl EdgeId {
    pub(crate) fn new(index: u32) -> Self {
        EdgeId(index)
    }

    /// Position of the edge in the model's edge table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multiplicity of a navigation edge's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Multiplicity {
    /// Single target entity.
    One,
    /// Collection of target entities.
    Many,
}

/// Referential action when a principal row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum DeleteAction {
    /// No action. Synthesized many-to-many edges always use this.
    None,
    /// Delete dependent rows.
    Cascade,
    /// Reject the delete while dependents exist.
    Restrict,
    /// Null out dependent foreign keys.
    SetNull,
}

/// One property pairing of a referential constraint: the foreign-key column
/// on the dependent type and the key column it references on the principal.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct PropertyPair {
    /// Foreign-key column on the dependent entity.
    pub dependent: String,
    /// Referenced key column on the principal entity.
    pub principal: String,
}

impl PropertyPair {
    /// Create a constraint pair.
    pub fn new(dependent: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            dependent: dependent.into(),
            principal: principal.into(),
        }
    }
}

/// A directed navigation edge between entity types.
///
/// The referential constraint is declared on the edge that owns it: the
/// dependent side of a paired navigation, or the edge itself when it has no
/// partner. Partner-less edges point principal to dependent by convention.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct NavigationDef {
    /// Navigation name, unique among the source entity's edges.
    pub name: String,
    /// Source entity type.
    pub source: String,
    /// Target entity type.
    pub target: String,
    /// Target multiplicity.
    pub multiplicity: Multiplicity,
    /// Whether the source is the principal end of the relationship.
    pub principal: bool,
    /// Name of the back edge on the target type, if declared.
    pub partner: Option<String>,
    /// Ordered referential constraint pairs, on the owning edge only.
    pub constraint: Vec<PropertyPair>,
    /// True only for synthesized many-to-many edges, whose targets are
    /// reached through a hidden join entity.
    pub contains_target: bool,
    /// Referential delete action.
    pub on_delete: DeleteAction,
}

impl NavigationDef {
    /// Create a single-target navigation. The source is assumed to be the
    /// dependent end (it holds the foreign key); override with
    /// [`NavigationDef::as_principal`] when it is not.
    pub fn one(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            multiplicity: Multiplicity::One,
            principal: false,
            partner: None,
            constraint: Vec::new(),
            contains_target: false,
            on_delete: DeleteAction::Restrict,
        }
    }

    /// Create a collection navigation. The source is assumed to be the
    /// principal end; override with [`NavigationDef::as_dependent`] when it
    /// is not.
    pub fn many(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            multiplicity: Multiplicity::Many,
            principal: true,
            partner: None,
            constraint: Vec::new(),
            contains_target: false,
            on_delete: DeleteAction::Restrict,
        }
    }

    /// Name the back edge on the target type.
    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partner = Some(partner.into());
        self
    }

    /// Declare the referential constraint as ordered
    /// `(dependent, principal)` column pairs.
    pub fn with_constraint(
        mut self,
        pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.constraint = pairs
            .into_iter()
            .map(|(dependent, principal)| PropertyPair::new(dependent, principal))
            .collect();
        self
    }

    /// Set the delete action.
    pub fn with_on_delete(mut self, action: DeleteAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Mark the source as the principal end.
    pub fn as_principal(mut self) -> Self {
        self.principal = true;
        self
    }

    /// Mark the source as the dependent end.
    pub fn as_dependent(mut self) -> Self {
        self.principal = false;
        self
    }

    /// Check if this edge targets its own source type.
    pub fn is_self_reference(&self) -> bool {
        self.source == self.target
    }

    /// Check if this edge targets a collection.
    pub fn is_collection(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }

    /// Foreign-key column names from the owned constraint, in order.
    pub fn dependent_properties(&self) -> impl Iterator<Item = &str> {
        self.constraint.iter().map(|pair| pair.dependent.as_str())
    }

    /// Referenced key column names from the owned constraint, in order.
    pub fn principal_properties(&self) -> impl Iterator<Item = &str> {
        self.constraint.iter().map(|pair| pair.principal.as_str())
    }
}

/// The hidden route behind a synthesized many-to-many edge: the join entity
/// and the two physical edges that traverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDescription {
    /// The hidden join entity type.
    pub join_entity: String,
    /// Edge from the synthesized edge's source to the join entity.
    pub join_edge: EdgeId,
    /// Edge from the join entity to the synthesized edge's target.
    pub target_edge: EdgeId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_builders() {
        let to_customer = NavigationDef::one("customer", "Order", "Customer")
            .with_partner("orders")
            .with_constraint([("customer_id", "id")]);

        assert_eq!(to_customer.multiplicity, Multiplicity::One);
        assert!(!to_customer.principal);
        assert_eq!(to_customer.partner.as_deref(), Some("orders"));
        assert_eq!(
            to_customer.dependent_properties().collect::<Vec<_>>(),
            vec!["customer_id"]
        );
        assert_eq!(
            to_customer.principal_properties().collect::<Vec<_>>(),
            vec!["id"]
        );

        let orders = NavigationDef::many("orders", "Customer", "Order").with_partner("customer");
        assert!(orders.principal);
        assert!(orders.is_collection());
        assert!(orders.constraint.is_empty());
    }

    #[test]
    fn test_self_reference() {
        let alt = NavigationDef::one("alt_customer", "Customer", "Customer")
            .with_constraint([("alt_customer_id", "id")]);
        assert!(alt.is_self_reference());
    }

    #[test]
    fn test_composite_constraint_order() {
        let nav = NavigationDef::one("customer", "Order", "Customer")
            .with_constraint([("customer_country", "country"), ("customer_id", "id")]);
        assert_eq!(
            nav.dependent_properties().collect::<Vec<_>>(),
            vec!["customer_country", "customer_id"]
        );
        assert_eq!(
            nav.principal_properties().collect::<Vec<_>>(),
            vec!["country", "id"]
        );
    }
}
