//! In-memory evaluation of join expressions.

use super::source::RowSource;
use crate::error::Error;
use navmap_ir::{JoinContext, JoinExpr, KeyPart, KeySelector, Row, Value};
use std::collections::HashMap;

/// Lowers a join expression into flat join contexts.
///
/// Each grouped join builds a hash table over the inner side's encoded keys
/// and probes it once per outer context, in outer order. A null key
/// component never matches anything, on either side, matching relational
/// join semantics.
pub struct JoinEvaluator<'a> {
    source: &'a dyn RowSource,
}

impl<'a> JoinEvaluator<'a> {
    /// Create an evaluator over a row source.
    pub fn new(source: &'a dyn RowSource) -> Self {
        Self { source }
    }

    /// Evaluate an expression to its flat contexts.
    pub fn evaluate(&self, expr: &JoinExpr) -> Result<Vec<JoinContext>, Error> {
        match expr {
            JoinExpr::Source { entity } => Ok(self
                .source
                .rows(entity)?
                .into_iter()
                .map(JoinContext::from_root)
                .collect()),
            JoinExpr::GroupJoin { .. } => Err(Error::Ir(navmap_ir::Error::InvalidExpr(
                "grouped join evaluated outside a flatten".into(),
            ))),
            JoinExpr::Flatten {
                input,
                elide_outer_stage,
            } => {
                let JoinExpr::GroupJoin {
                    outer,
                    inner,
                    outer_key,
                    inner_key,
                } = input.as_ref()
                else {
                    return Err(Error::Ir(navmap_ir::Error::InvalidExpr(
                        "flatten input must be a grouped join".into(),
                    )));
                };
                let groups = self.group_join(outer, inner, outer_key, inner_key)?;
                Ok(flatten_groups(groups, *elide_outer_stage))
            }
        }
    }

    /// Hash join: build over the inner rows, probe with each outer context.
    fn group_join(
        &self,
        outer: &JoinExpr,
        inner: &JoinExpr,
        outer_key: &KeySelector,
        inner_key: &KeySelector,
    ) -> Result<Vec<(JoinContext, Vec<Row>)>, Error> {
        if inner_key.stage != 0 {
            return Err(Error::Ir(navmap_ir::Error::InvalidExpr(
                "inner key must select the root stage".into(),
            )));
        }
        let outer_contexts = self.evaluate(outer)?;
        let inner_rows = self.inner_rows(inner)?;

        let mut groups: HashMap<Vec<u8>, Vec<Row>> = HashMap::new();
        for row in inner_rows {
            if let Some(key) = encode_row_key(&inner_key.part, &row) {
                groups.entry(key).or_default().push(row);
            }
        }

        let mut result = Vec::with_capacity(outer_contexts.len());
        for context in outer_contexts {
            let group = stage_key(outer_key, &context)
                .and_then(|key| groups.get(&key).cloned())
                .unwrap_or_default();
            result.push((context, group));
        }
        Ok(result)
    }

    /// The inner side contributes its root-stage rows.
    fn inner_rows(&self, inner: &JoinExpr) -> Result<Vec<Row>, Error> {
        match inner {
            JoinExpr::Source { entity } => self.source.rows(entity),
            other => Ok(self
                .evaluate(other)?
                .into_iter()
                .filter_map(|mut context| context.remove_stage(0))
                .collect()),
        }
    }
}

/// Expand grouped results into flat contexts. An empty group yields one
/// context with an absent inner stage.
fn flatten_groups(
    groups: Vec<(JoinContext, Vec<Row>)>,
    elide_outer_stage: bool,
) -> Vec<JoinContext> {
    let mut contexts = Vec::new();
    for (outer, group) in groups {
        if group.is_empty() {
            contexts.push(append_stage(outer, None, elide_outer_stage));
        } else {
            for row in group {
                contexts.push(append_stage(outer.clone(), Some(row), elide_outer_stage));
            }
        }
    }
    contexts
}

fn append_stage(
    mut context: JoinContext,
    row: Option<Row>,
    elide_outer_stage: bool,
) -> JoinContext {
    context.push_stage(row);
    if elide_outer_stage && context.len() >= 2 {
        context.remove_stage(context.len() - 2);
    }
    context
}

fn stage_key(selector: &KeySelector, context: &JoinContext) -> Option<Vec<u8>> {
    let row = context.stage(selector.stage)?;
    encode_row_key(&selector.part, row)
}

/// Encode a row's key component values to comparable bytes. `None` when any
/// component is null or missing, so a null key joins nothing.
fn encode_row_key(part: &KeyPart, row: &Row) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    if push_key_bytes(part, row, &mut buffer) {
        Some(buffer)
    } else {
        None
    }
}

fn push_key_bytes(part: &KeyPart, row: &Row, buffer: &mut Vec<u8>) -> bool {
    match part {
        KeyPart::Field { field, .. } => match row.get(field) {
            None | Some(Value::Null) => false,
            Some(value) => {
                encode_value(value, buffer);
                true
            }
        },
        KeyPart::Composite { parts } => {
            parts.iter().all(|part| push_key_bytes(part, row, buffer))
        }
    }
}

/// Tag byte plus payload per component; variable-length payloads carry a
/// length prefix so composite encodings stay unambiguous.
fn encode_value(value: &Value, buffer: &mut Vec<u8>) {
    match value {
        Value::Null => buffer.push(0),
        Value::Bool(v) => {
            buffer.push(1);
            buffer.push(u8::from(*v));
        }
        Value::Int32(v) => {
            buffer.push(2);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        Value::Int64(v) => {
            buffer.push(3);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        Value::Float32(v) => {
            buffer.push(4);
            buffer.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Value::Float64(v) => {
            buffer.push(5);
            buffer.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Value::String(v) => {
            buffer.push(6);
            buffer.extend_from_slice(&(v.len() as u32).to_le_bytes());
            buffer.extend_from_slice(v.as_bytes());
        }
        Value::Bytes(v) => {
            buffer.push(7);
            buffer.extend_from_slice(&(v.len() as u32).to_le_bytes());
            buffer.extend_from_slice(v);
        }
        Value::Timestamp(v) => {
            buffer.push(8);
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        Value::Uuid(v) => {
            buffer.push(9);
            buffer.extend_from_slice(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::source::MemoryRowSource;
    use navmap_ir::{FieldRef, KeyType, ScalarType};

    fn int_key() -> KeyType {
        KeyType::nullable(ScalarType::Int64)
    }

    fn order_source() -> MemoryRowSource {
        MemoryRowSource::new()
            .with_rows(
                "Customer",
                vec![
                    Row::new().with_field("id", 1i64).with_field("name", "alpha"),
                    Row::new().with_field("id", 2i64).with_field("name", "beta"),
                    Row::new().with_field("id", 3i64).with_field("name", "gamma"),
                ],
            )
            .with_rows(
                "Order",
                vec![
                    Row::new().with_field("id", 10i64).with_field("customer_id", 1i64),
                    Row::new().with_field("id", 11i64).with_field("customer_id", 1i64),
                    Row::new().with_field("id", 12i64).with_field("customer_id", 2i64),
                    Row::new()
                        .with_field("id", 13i64)
                        .with_field("customer_id", Value::Null),
                ],
            )
    }

    fn customer_orders_expr() -> JoinExpr {
        JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(JoinExpr::source("Customer")),
                inner: Box::new(JoinExpr::source("Order")),
                outer_key: KeySelector::scalar(0, "id", int_key()),
                inner_key: KeySelector::scalar(0, "customer_id", int_key()),
            }),
            elide_outer_stage: false,
        }
    }

    #[test]
    fn test_source_scan() {
        let source = order_source();
        let contexts = JoinEvaluator::new(&source)
            .evaluate(&JoinExpr::source("Customer"))
            .unwrap();
        assert_eq!(contexts.len(), 3);
        assert_eq!(contexts[0].len(), 1);
    }

    #[test]
    fn test_outer_join_keeps_unmatched_outers() {
        let source = order_source();
        let contexts = JoinEvaluator::new(&source)
            .evaluate(&customer_orders_expr())
            .unwrap();

        // Two orders for customer 1, one for customer 2, none for customer 3.
        assert_eq!(contexts.len(), 4);

        let unmatched: Vec<&JoinContext> = contexts
            .iter()
            .filter(|context| context.stage(1).is_none())
            .collect();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(
            unmatched[0].value(&FieldRef::new(0, "name")),
            Value::String("gamma".into())
        );
        // Absent stages read as null.
        assert_eq!(unmatched[0].value(&FieldRef::new(1, "id")), Value::Null);
    }

    #[test]
    fn test_null_keys_never_match() {
        let source = MemoryRowSource::new()
            .with_rows(
                "Customer",
                vec![Row::new().with_field("id", Value::Null)],
            )
            .with_rows(
                "Order",
                vec![Row::new().with_field("customer_id", Value::Null)],
            );
        let contexts = JoinEvaluator::new(&source)
            .evaluate(&customer_orders_expr())
            .unwrap();

        // Null outer key, null inner key: no pairing in either direction.
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].stage(1).is_none());
    }

    #[test]
    fn test_composite_key_join() {
        let source = MemoryRowSource::new()
            .with_rows(
                "Customer",
                vec![
                    Row::new()
                        .with_field("country", "ru")
                        .with_field("id", 1i64),
                    Row::new()
                        .with_field("country", "en")
                        .with_field("id", 1i64),
                ],
            )
            .with_rows(
                "Order",
                vec![Row::new()
                    .with_field("customer_country", "ru")
                    .with_field("customer_id", 1i64)],
            );

        let expr = JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(JoinExpr::source("Customer")),
                inner: Box::new(JoinExpr::source("Order")),
                outer_key: KeySelector::composite(
                    0,
                    vec![
                        KeyPart::field("country", KeyType::new(ScalarType::String)),
                        KeyPart::field("id", int_key()),
                    ],
                ),
                inner_key: KeySelector::composite(
                    0,
                    vec![
                        KeyPart::field("customer_country", KeyType::new(ScalarType::String)),
                        KeyPart::field("customer_id", int_key()),
                    ],
                ),
            }),
            elide_outer_stage: false,
        };

        let contexts = JoinEvaluator::new(&source).evaluate(&expr).unwrap();
        assert_eq!(contexts.len(), 2);
        let matched: Vec<_> = contexts
            .iter()
            .filter(|context| context.stage(1).is_some())
            .collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(
            matched[0].value(&FieldRef::new(0, "country")),
            Value::String("ru".into())
        );
    }

    #[test]
    fn test_elide_outer_stage() {
        let source = MemoryRowSource::new()
            .with_rows("Customer", vec![Row::new().with_field("id", 1i64)])
            .with_rows(
                "CustomerShippingAddress",
                vec![Row::new()
                    .with_field("customer_id", 1i64)
                    .with_field("shipping_address_id", 7i64)],
            )
            .with_rows(
                "ShippingAddress",
                vec![Row::new()
                    .with_field("id", 7i64)
                    .with_field("address", "moscow")],
            );

        let first_hop = JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(JoinExpr::source("Customer")),
                inner: Box::new(JoinExpr::source("CustomerShippingAddress")),
                outer_key: KeySelector::scalar(0, "id", int_key()),
                inner_key: KeySelector::scalar(0, "customer_id", int_key()),
            }),
            elide_outer_stage: false,
        };
        let second_hop = JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(first_hop),
                inner: Box::new(JoinExpr::source("ShippingAddress")),
                outer_key: KeySelector::scalar(1, "shipping_address_id", int_key()),
                inner_key: KeySelector::scalar(0, "id", int_key()),
            }),
            elide_outer_stage: true,
        };

        let contexts = JoinEvaluator::new(&source).evaluate(&second_hop).unwrap();
        assert_eq!(contexts.len(), 1);
        // The join-entity stage is gone; the target follows the root.
        assert_eq!(contexts[0].len(), 2);
        assert_eq!(
            contexts[0].value(&FieldRef::new(1, "address")),
            Value::String("moscow".into())
        );
    }

    #[test]
    fn test_group_join_outside_flatten_fails() {
        let source = order_source();
        let bare = JoinExpr::GroupJoin {
            outer: Box::new(JoinExpr::source("Customer")),
            inner: Box::new(JoinExpr::source("Order")),
            outer_key: KeySelector::scalar(0, "id", int_key()),
            inner_key: KeySelector::scalar(0, "customer_id", int_key()),
        };
        let err = JoinEvaluator::new(&source).evaluate(&bare).unwrap_err();
        assert!(matches!(err, Error::Ir(navmap_ir::Error::InvalidExpr(_))));
    }
}
