//! Save execution over a planned batch.

use super::planner::{SavePlan, SavePlanner};
use super::table::{ChangeSet, IdentitySlot};
use crate::error::Error;
use crate::model::Model;
use tracing::{debug, info, instrument};

/// Flushes a change set in dependency order.
pub struct SaveExecutor<'a> {
    model: &'a Model,
}

impl<'a> SaveExecutor<'a> {
    /// Create an executor over a frozen model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Flush every staged mutation in the change set.
    ///
    /// Inserts and updates walk the plan in reverse, principals first, so
    /// generated identities can be pushed into dependent foreign keys before
    /// those rows flush. Deletes walk the plan forward, dependents first.
    /// Returns the total affected-row count.
    #[instrument(skip(self, changes))]
    pub fn save(&self, changes: &mut ChangeSet) -> Result<usize, Error> {
        let plan = SavePlanner::new(self.model).plan(&changes.entities())?;
        for (entity, field) in &plan.self_refs {
            changes.table_mut(entity)?.set_self_ref(field);
        }

        let mut count = 0;
        for index in (0..plan.types.len()).rev() {
            let entity = plan.types[index].clone();
            count += changes.table_mut(&entity)?.save_inserted()?;
            self.propagate_identities(changes, &plan, index)?;
            count += changes.table_mut(&entity)?.save_updated()?;
        }
        for entity in &plan.types {
            count += changes.table_mut(entity)?.save_deleted()?;
        }

        info!(types = plan.types.len(), count, "save batch flushed");
        Ok(count)
    }

    /// Push identities generated by the type at `last_index` into the
    /// foreign keys of dependents planned at or before that position.
    fn propagate_identities(
        &self,
        changes: &mut ChangeSet,
        plan: &SavePlan,
        last_index: usize,
    ) -> Result<(), Error> {
        let principal = &plan.types[last_index];
        let slots = changes.table(principal)?.identities();
        if slots.is_empty() {
            return Ok(());
        }

        for (edge_id, edge) in self.model.edges_from(principal) {
            if edge.contains_target {
                debug!(
                    source = %edge.source,
                    navigation = %edge.name,
                    "synthesized navigation carries no foreign key, skipping propagation"
                );
                continue;
            }
            if !edge.principal {
                continue;
            }
            let columns: Vec<String> = match &edge.partner {
                Some(_) => {
                    let (_, partner) = self.model.partner_of(edge_id).ok_or_else(|| {
                        Error::EdgeNotRegistered(format!("{}.{}", edge.target, edge.name))
                    })?;
                    partner.dependent_properties().map(str::to_string).collect()
                }
                None => edge.dependent_properties().map(str::to_string).collect(),
            };
            self.apply_identities(changes, plan, last_index, &edge.target, &columns, &slots)?;
        }

        // One-directional dependent edges hang off the dependent type; the
        // principal sees them as incoming.
        let incoming: Vec<(String, Vec<String>)> = self
            .model
            .edges_to(principal)
            .filter(|(_, edge)| {
                edge.partner.is_none() && !edge.principal && !edge.contains_target
            })
            .map(|(_, edge)| {
                (
                    edge.source.clone(),
                    edge.dependent_properties().map(str::to_string).collect(),
                )
            })
            .collect();
        for (dependent, columns) in incoming {
            self.apply_identities(changes, plan, last_index, &dependent, &columns, &slots)?;
        }

        Ok(())
    }

    fn apply_identities(
        &self,
        changes: &mut ChangeSet,
        plan: &SavePlan,
        last_index: usize,
        dependent: &str,
        columns: &[String],
        slots: &[IdentitySlot],
    ) -> Result<(), Error> {
        let Some(position) = plan.position(dependent) else {
            return Ok(());
        };
        if position > last_index {
            return Ok(());
        }
        let Some(first) = columns.first() else {
            return Ok(());
        };
        if columns.len() > 1 {
            debug!(
                dependent,
                skipped = columns.len() - 1,
                "multi-column constraint propagates only its first column"
            );
        }
        changes.table_mut(dependent)?.update_identities(first, slots);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDef, FieldDef, ModelBuilder, NavigationDef};
    use crate::save::table::MemoryTable;
    use navmap_ir::{Row, ScalarType, Value};

    fn order_model() -> Model {
        ModelBuilder::new()
            .entity(
                EntityDef::new("Customer", "id")
                    .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
                    .with_field(FieldDef::scalar("name", ScalarType::String)),
            )
            .entity(
                EntityDef::new("Order", "id")
                    .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
                    .with_field(FieldDef::optional_scalar("customer_id", ScalarType::Int64))
                    .with_field(FieldDef::scalar("status", ScalarType::String)),
            )
            .navigation(
                NavigationDef::one("customer", "Order", "Customer")
                    .with_partner("orders")
                    .with_constraint([("customer_id", "id")]),
            )
            .navigation(
                NavigationDef::many("orders", "Customer", "Order").with_partner("customer"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_identities_propagate_before_dependents_flush() {
        let model = order_model();
        let customers = MemoryTable::new(model.entity("Customer").unwrap());
        let orders = MemoryTable::new(model.entity("Order").unwrap());

        customers.insert(Row::new().with_field("id", -1i64).with_field("name", "alpha"));
        orders.insert(
            Row::new()
                .with_field("customer_id", -1i64)
                .with_field("status", "open"),
        );
        orders.insert(
            Row::new()
                .with_field("customer_id", Value::Null)
                .with_field("status", "draft"),
        );

        let mut changes = ChangeSet::new();
        changes.add_table(Box::new(customers.clone()));
        changes.add_table(Box::new(orders.clone()));

        let count = SaveExecutor::new(&model).save(&mut changes).unwrap();
        assert_eq!(count, 3);

        let customer_id = customers.rows()[0].get("id").cloned().unwrap();
        assert_eq!(customer_id, Value::Int64(1));
        let rows = orders.rows();
        assert_eq!(rows[0].get("customer_id"), Some(&customer_id));
        assert_eq!(rows[1].get("customer_id"), Some(&Value::Null));
    }

    #[test]
    fn test_self_reference_rows_link_up() {
        let model = ModelBuilder::new()
            .entity(
                EntityDef::new("Employee", "id")
                    .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
                    .with_field(FieldDef::scalar("name", ScalarType::String))
                    .with_field(FieldDef::optional_scalar("manager_id", ScalarType::Int64)),
            )
            .navigation(
                NavigationDef::one("manager", "Employee", "Employee")
                    .with_partner("reports")
                    .with_constraint([("manager_id", "id")]),
            )
            .navigation(
                NavigationDef::many("reports", "Employee", "Employee").with_partner("manager"),
            )
            .build()
            .unwrap();

        let employees = MemoryTable::new(model.entity("Employee").unwrap());
        // The report is staged before its manager.
        employees.insert(
            Row::new()
                .with_field("id", -2i64)
                .with_field("name", "report")
                .with_field("manager_id", -1i64),
        );
        employees.insert(
            Row::new()
                .with_field("id", -1i64)
                .with_field("name", "manager")
                .with_field("manager_id", Value::Null),
        );

        let mut changes = ChangeSet::new();
        changes.add_table(Box::new(employees.clone()));
        let count = SaveExecutor::new(&model).save(&mut changes).unwrap();
        assert_eq!(count, 2);

        let rows = employees.rows();
        assert_eq!(rows[0].get("name"), Some(&Value::String("manager".into())));
        assert_eq!(rows[0].get("id"), Some(&Value::Int64(1)));
        assert_eq!(rows[1].get("name"), Some(&Value::String("report".into())));
        assert_eq!(rows[1].get("manager_id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_deletes_run_dependents_first() {
        let model = order_model();
        let customers = MemoryTable::new(model.entity("Customer").unwrap());
        let orders = MemoryTable::new(model.entity("Order").unwrap());

        customers.insert(Row::new().with_field("name", "alpha"));
        orders.insert(
            Row::new()
                .with_field("customer_id", 1i64)
                .with_field("status", "open"),
        );

        let mut changes = ChangeSet::new();
        changes.add_table(Box::new(customers.clone()));
        changes.add_table(Box::new(orders.clone()));
        SaveExecutor::new(&model).save(&mut changes).unwrap();

        customers.delete(Row::new().with_field("id", 1i64));
        orders.delete(Row::new().with_field("id", 1i64));
        let count = SaveExecutor::new(&model).save(&mut changes).unwrap();
        assert_eq!(count, 2);
        assert!(customers.is_empty());
        assert!(orders.is_empty());
    }

    #[test]
    fn test_plan_covers_only_touched_types() {
        let model = order_model();
        let orders = MemoryTable::new(model.entity("Order").unwrap());
        orders.insert(Row::new().with_field("status", "open"));

        let mut changes = ChangeSet::new();
        changes.add_table(Box::new(orders));

        let count = SaveExecutor::new(&model).save(&mut changes).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_one_directional_dependent_edge_propagates() {
        let model = ModelBuilder::new()
            .entity(
                EntityDef::new("ShippingAddress", "id")
                    .with_field(FieldDef::scalar("id", ScalarType::Int64).generated())
                    .with_field(FieldDef::scalar("address", ScalarType::String)),
            )
            .entity(
                EntityDef::new("CustomerShippingAddress", "id")
                    .with_field(FieldDef::scalar("id", ScalarType::Int64))
                    .with_field(FieldDef::scalar("shipping_address_id", ScalarType::Int64)),
            )
            .navigation(
                NavigationDef::one(
                    "shipping_address",
                    "CustomerShippingAddress",
                    "ShippingAddress",
                )
                .with_constraint([("shipping_address_id", "id")]),
            )
            .build()
            .unwrap();

        let addresses = MemoryTable::new(model.entity("ShippingAddress").unwrap());
        let links = MemoryTable::new(model.entity("CustomerShippingAddress").unwrap());

        addresses.insert(
            Row::new()
                .with_field("id", -7i64)
                .with_field("address", "moscow"),
        );
        links.insert(
            Row::new()
                .with_field("id", 1i64)
                .with_field("shipping_address_id", -7i64),
        );

        let mut changes = ChangeSet::new();
        changes.add_table(Box::new(addresses.clone()));
        changes.add_table(Box::new(links.clone()));
        SaveExecutor::new(&model).save(&mut changes).unwrap();

        assert_eq!(addresses.rows()[0].get("id"), Some(&Value::Int64(1)));
        assert_eq!(
            links.rows()[0].get("shipping_address_id"),
            Some(&Value::Int64(1))
        );
    }
}
