//! Many-to-many navigation inference.
//!
//! An application schema often models a many-to-many relationship as two
//! one-to-many edges through a join entity, plus an unmapped collection
//! field naming the far side directly. Inference detects that shape and
//! synthesizes a virtual direct edge so queries can traverse it in one hop.
//!
//! Unmapped collection fields are matched independently: an entity that
//! declares several of them gains one synthesized edge per field, each
//! routed through its own join entity.
//!
//! Every ambiguity is absorbed as "no relationship". A join-entity shape
//! that almost matches never fails the build and never registers a partial
//! edge.

use super::entity::{EntityDef, FieldDef};
use super::navigation::{DeleteAction, EdgeId, Multiplicity, NavigationDef};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A synthesized edge plus the hidden route it compiles through.
pub(crate) struct InferredEdge {
    pub navigation: NavigationDef,
    pub join_entity: String,
    pub join_edge: EdgeId,
    pub target_edge: EdgeId,
}

/// Scan every entity for unmapped collection fields reachable through a
/// join entity, in declaration order of the edges that anchor ids.
pub(crate) fn infer_many_to_many(
    entities: &HashMap<String, EntityDef>,
    edges: &[NavigationDef],
) -> Vec<InferredEdge> {
    let mut inferred = Vec::new();
    let mut owners: Vec<&EntityDef> = entities.values().collect();
    owners.sort_by(|a, b| a.name.cmp(&b.name));

    for owner in owners {
        for unmapped in owner.collection_fields().filter(|field| !field.mapped) {
            let Some(target_name) = unmapped.field_type.referenced_entity() else {
                continue;
            };

            // A mapped sibling collection whose element type exposes a
            // unique reference back to the target is the join candidate.
            let mut route = None;
            for mapped in owner.collection_fields().filter(|field| field.mapped) {
                let Some(join_name) = mapped.field_type.referenced_entity() else {
                    continue;
                };
                let Some(join_entity) = entities.get(join_name) else {
                    continue;
                };
                if let Some(partner_field) = partner_field(join_entity, target_name) {
                    route = Some((join_name, partner_field));
                    break;
                }
            }
            let Some((join_name, partner_field)) = route else {
                continue;
            };

            // Both physical hops must exist as registered edges matching
            // the field names; otherwise the shape is not navigable.
            let Some((join_edge, join_nav)) = first_collection_edge(owner, join_name, edges)
            else {
                continue;
            };
            if join_nav.target != join_name {
                continue;
            }
            let Some((target_edge, target_nav)) =
                find_edge(edges, join_name, &partner_field.name)
            else {
                continue;
            };
            if target_nav.target != target_name {
                continue;
            }

            debug!(
                owner = %owner.name,
                navigation = %unmapped.name,
                join_entity = %join_name,
                target = %target_name,
                "synthesized many-to-many navigation"
            );
            inferred.push(InferredEdge {
                navigation: NavigationDef {
                    name: unmapped.name.clone(),
                    source: owner.name.clone(),
                    target: target_name.to_string(),
                    multiplicity: Multiplicity::Many,
                    principal: false,
                    partner: None,
                    constraint: Vec::new(),
                    contains_target: true,
                    on_delete: DeleteAction::None,
                },
                join_entity: join_name.to_string(),
                join_edge,
                target_edge,
            });
        }
    }
    inferred
}

/// The unique reference field on the join candidate pointing at the target.
///
/// The candidate qualifies only when it has exactly one reference to the
/// target, at most one other single reference (the near side), and no
/// collection fields at all. Any other shape is ambiguous.
fn partner_field<'a>(join_entity: &'a EntityDef, target: &str) -> Option<&'a FieldDef> {
    let mut partner: Option<&FieldDef> = None;
    let mut other_side = false;
    for field in &join_entity.fields {
        if field.field_type.scalar_type().is_some() {
            continue;
        }
        if field.field_type.is_collection() {
            debug!(
                join_entity = %join_entity.name,
                field = %field.name,
                "join candidate rejected: collection field"
            );
            return None;
        }
        if field.field_type.referenced_entity() == Some(target) {
            if partner.is_some() {
                warn!(
                    join_entity = %join_entity.name,
                    target = %target,
                    "join candidate rejected: multiple references to target"
                );
                return None;
            }
            partner = Some(field);
        } else {
            if other_side {
                debug!(
                    join_entity = %join_entity.name,
                    "join candidate rejected: multiple near-side references"
                );
                return None;
            }
            other_side = true;
        }
    }
    partner
}

/// Locate a declared edge by source entity and name, with its positional id.
fn find_edge<'a>(
    edges: &'a [NavigationDef],
    source: &str,
    name: &str,
) -> Option<(EdgeId, &'a NavigationDef)> {
    edges
        .iter()
        .position(|edge| edge.source == source && edge.name == name)
        .map(|index| (EdgeId::new(index as u32), &edges[index]))
}

/// The first collection field of `owner` whose element is `join_name` and
/// that has a registered edge of the same name.
fn first_collection_edge<'a>(
    owner: &EntityDef,
    join_name: &str,
    edges: &'a [NavigationDef],
) -> Option<(EdgeId, &'a NavigationDef)> {
    owner
        .collection_fields()
        .filter(|field| field.field_type.referenced_entity() == Some(join_name))
        .find_map(|field| find_edge(edges, &owner.name, &field.name))
}

#[cfg(test)]
mod tests {
    use crate::model::{
        DeleteAction, EntityDef, FieldDef, ModelBuilder, Multiplicity, NavigationDef,
    };
    use navmap_ir::ScalarType;

    fn customer() -> EntityDef {
        EntityDef::new("Customer", "id")
            .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
            .with_field(FieldDef::scalar("name", ScalarType::String))
            .with_field(FieldDef::collection(
                "customer_shipping_addresses",
                "CustomerShippingAddress",
            ))
            .with_field(FieldDef::collection("shipping_addresses", "ShippingAddress").unmapped())
    }

    fn shipping_address() -> EntityDef {
        EntityDef::new("ShippingAddress", "id")
            .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
            .with_field(FieldDef::scalar("address", ScalarType::String))
            .with_field(FieldDef::collection(
                "customer_shipping_addresses",
                "CustomerShippingAddress",
            ))
    }

    fn join_entity() -> EntityDef {
        EntityDef::new("CustomerShippingAddress", "customer_id")
            .with_composite_key(["customer_id", "shipping_address_id"])
            .with_field(FieldDef::scalar("customer_id", ScalarType::Int64))
            .with_field(FieldDef::scalar("shipping_address_id", ScalarType::Int64))
            .with_field(FieldDef::reference("customer", "Customer"))
            .with_field(FieldDef::reference("shipping_address", "ShippingAddress"))
    }

    fn join_navigations(builder: ModelBuilder) -> ModelBuilder {
        builder
            .navigation(
                NavigationDef::one("customer", "CustomerShippingAddress", "Customer")
                    .with_partner("customer_shipping_addresses")
                    .with_constraint([("customer_id", "id")]),
            )
            .navigation(
                NavigationDef::many(
                    "customer_shipping_addresses",
                    "Customer",
                    "CustomerShippingAddress",
                )
                .with_partner("customer"),
            )
            .navigation(
                NavigationDef::one("shipping_address", "CustomerShippingAddress", "ShippingAddress")
                    .with_partner("customer_shipping_addresses")
                    .with_constraint([("shipping_address_id", "id")]),
            )
            .navigation(
                NavigationDef::many(
                    "customer_shipping_addresses",
                    "ShippingAddress",
                    "CustomerShippingAddress",
                )
                .with_partner("shipping_address"),
            )
    }

    #[test]
    fn test_synthesizes_direct_edge() {
        let builder = ModelBuilder::new()
            .entity(customer())
            .entity(shipping_address())
            .entity(join_entity());
        let model = join_navigations(builder).build().unwrap();

        let (id, edge) = model.edge_by_name("Customer", "shipping_addresses").unwrap();
        assert!(edge.contains_target);
        assert_eq!(edge.multiplicity, Multiplicity::Many);
        assert_eq!(edge.target, "ShippingAddress");
        assert_eq!(edge.on_delete, DeleteAction::None);
        assert!(edge.partner.is_none());
        assert!(edge.constraint.is_empty());

        let description = model.join_description(id).unwrap();
        assert_eq!(description.join_entity, "CustomerShippingAddress");
        let join_nav = model.edge(description.join_edge).unwrap();
        assert_eq!(join_nav.name, "customer_shipping_addresses");
        assert_eq!(join_nav.source, "Customer");
        let target_nav = model.edge(description.target_edge).unwrap();
        assert_eq!(target_nav.name, "shipping_address");
        assert_eq!(target_nav.target, "ShippingAddress");
    }

    #[test]
    fn test_each_unmapped_collection_synthesizes_independently() {
        let customer = customer()
            .with_field(FieldDef::collection(
                "customer_billing_addresses",
                "CustomerBillingAddress",
            ))
            .with_field(FieldDef::collection("billing_addresses", "BillingAddress").unmapped());
        let billing_address = EntityDef::new("BillingAddress", "id")
            .with_field(FieldDef::scalar("id", ScalarType::Int64).generated());
        let billing_join = EntityDef::new("CustomerBillingAddress", "customer_id")
            .with_composite_key(["customer_id", "billing_address_id"])
            .with_field(FieldDef::scalar("customer_id", ScalarType::Int64))
            .with_field(FieldDef::scalar("billing_address_id", ScalarType::Int64))
            .with_field(FieldDef::reference("customer", "Customer"))
            .with_field(FieldDef::reference("billing_address", "BillingAddress"));

        let builder = ModelBuilder::new()
            .entity(customer)
            .entity(shipping_address())
            .entity(join_entity())
            .entity(billing_address)
            .entity(billing_join);
        let model = join_navigations(builder)
            .navigation(
                NavigationDef::one("customer", "CustomerBillingAddress", "Customer")
                    .with_partner("customer_billing_addresses")
                    .with_constraint([("customer_id", "id")]),
            )
            .navigation(
                NavigationDef::many(
                    "customer_billing_addresses",
                    "Customer",
                    "CustomerBillingAddress",
                )
                .with_partner("customer"),
            )
            .navigation(
                NavigationDef::one("billing_address", "CustomerBillingAddress", "BillingAddress")
                    .with_constraint([("billing_address_id", "id")]),
            )
            .build()
            .unwrap();

        let (shipping_id, shipping) =
            model.edge_by_name("Customer", "shipping_addresses").unwrap();
        let (billing_id, billing) = model.edge_by_name("Customer", "billing_addresses").unwrap();
        assert!(shipping.contains_target);
        assert!(billing.contains_target);
        assert_eq!(
            model.join_description(shipping_id).unwrap().join_entity,
            "CustomerShippingAddress"
        );
        assert_eq!(
            model.join_description(billing_id).unwrap().join_entity,
            "CustomerBillingAddress"
        );
    }

    #[test]
    fn test_collection_on_join_entity_blocks_inference() {
        let polluted = join_entity().with_field(FieldDef::collection("notes", "Note"));
        let note = EntityDef::new("Note", "id")
            .with_field(FieldDef::scalar("id", ScalarType::Int64));
        let builder = ModelBuilder::new()
            .entity(customer())
            .entity(shipping_address())
            .entity(polluted)
            .entity(note);
        let model = join_navigations(builder).build().unwrap();
        assert!(model.edge_by_name("Customer", "shipping_addresses").is_none());
    }

    #[test]
    fn test_duplicate_target_reference_blocks_inference() {
        let ambiguous =
            join_entity().with_field(FieldDef::reference("backup_address", "ShippingAddress"));
        let builder = ModelBuilder::new()
            .entity(customer())
            .entity(shipping_address())
            .entity(ambiguous);
        let model = join_navigations(builder).build().unwrap();
        assert!(model.edge_by_name("Customer", "shipping_addresses").is_none());
    }

    #[test]
    fn test_missing_physical_edge_blocks_inference() {
        // No navigations at all: the field shapes match but nothing is
        // navigable, so no edge may be synthesized.
        let model = ModelBuilder::new()
            .entity(customer())
            .entity(shipping_address())
            .entity(join_entity())
            .build()
            .unwrap();
        assert!(model.edge_by_name("Customer", "shipping_addresses").is_none());
    }

    #[test]
    fn test_mapped_collection_is_not_a_target() {
        // The mapped collection keeps its physical edge; only the unmapped
        // field gains a synthesized one.
        let builder = ModelBuilder::new()
            .entity(customer())
            .entity(shipping_address())
            .entity(join_entity());
        let model = join_navigations(builder).build().unwrap();

        let (_, mapped) = model
            .edge_by_name("Customer", "customer_shipping_addresses")
            .unwrap();
        assert!(!mapped.contains_target);
        assert_eq!(mapped.target, "CustomerShippingAddress");
    }
}
