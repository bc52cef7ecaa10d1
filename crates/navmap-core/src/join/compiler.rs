//! Join path compiler.

use super::key;
use super::limits::CompilerLimits;
use super::path::describe_path;
use crate::error::Error;
use crate::model::{EdgeId, Model};
use navmap_ir::{FieldRef, JoinExpr};
use tracing::debug;

/// Compiles navigation hops into grouped-join expressions. One instance
/// serves one query translation.
///
/// Every completed hop is recorded as a join path, a list of edge ids
/// compared element-wise. Stage 0 of the produced contexts is the query
/// root; stage `i + 1` holds the target of the `i`-th recorded path. Later
/// hops and field resolutions locate their stage through that record, which
/// dies with the compiler. Nothing is shared across queries.
///
/// A synthesized many-to-many edge compiles as two chained hops through its
/// join description; the hidden join-entity stage is elided from the final
/// context and the recorded path ends with the synthesized edge itself, so
/// downstream resolution treats it like any direct edge.
pub struct JoinPathCompiler<'a> {
    model: &'a Model,
    limits: CompilerLimits,
    join_paths: Vec<Vec<EdgeId>>,
    root: String,
}

impl<'a> JoinPathCompiler<'a> {
    /// Create a compiler for one query rooted at `root`.
    pub fn new(model: &'a Model, root: impl Into<String>) -> Self {
        Self {
            model,
            limits: CompilerLimits::default(),
            join_paths: Vec::new(),
            root: root.into(),
        }
    }

    /// Replace the default compiler limits.
    pub fn with_limits(mut self, limits: CompilerLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The root scan of this compiler's query.
    pub fn root_source(&self) -> JoinExpr {
        JoinExpr::source(self.root.clone())
    }

    /// Join `edge` onto `outer`. The outer key is read from the stage that
    /// `join_path` identifies (empty = the query root); `inner` is the scan
    /// of the edge's target. Records the completed path.
    pub fn build(
        &mut self,
        outer: JoinExpr,
        inner: JoinExpr,
        join_path: &[EdgeId],
        edge: EdgeId,
    ) -> Result<JoinExpr, Error> {
        self.limits.check_path_depth(join_path.len() + 1)?;
        let model = self.model;
        let nav = model.edge(edge)?;

        let result = if nav.contains_target {
            let description = model.join_description(edge).ok_or_else(|| {
                Error::InvalidModel(format!(
                    "synthesized navigation {}.{} has no join description",
                    nav.source, nav.name
                ))
            })?;
            let join_scan = JoinExpr::source(description.join_entity.clone());
            let first = self.build_hop(outer, join_scan, join_path, description.join_edge, false)?;

            let mut through = join_path.to_vec();
            through.push(description.join_edge);
            self.join_paths.push(through.clone());
            let second = self.build_hop(first, inner, &through, description.target_edge, true)?;
            self.join_paths.pop();
            second
        } else {
            self.build_hop(outer, inner, join_path, edge, false)?
        };

        let mut recorded = join_path.to_vec();
        recorded.push(edge);
        debug!(
            path = %describe_path(model, &recorded),
            stage = self.join_paths.len() + 1,
            "join path recorded"
        );
        self.join_paths.push(recorded);
        Ok(result)
    }

    /// Compile a whole navigation chain from the root, one hop per edge.
    ///
    /// Each call starts over: paths recorded by earlier calls are dropped so
    /// the stage indexes embedded in the result always match the expression
    /// it returns. Incremental multi-branch joins go through `build`, which
    /// keeps the accumulated record.
    pub fn compile_chain(&mut self, chain: &[EdgeId]) -> Result<JoinExpr, Error> {
        self.join_paths.clear();
        let mut expr = self.root_source();
        for (index, edge) in chain.iter().enumerate() {
            let inner = JoinExpr::source(self.model.edge(*edge)?.target.clone());
            expr = self.build(expr, inner, &chain[..index], *edge)?;
        }
        Ok(expr)
    }

    /// Resolve a field access through a joined path to a context position.
    ///
    /// The path must have been recorded by a completed hop and the field
    /// must be a scalar column of the stage's entity; anything else is a
    /// hard resolution failure.
    pub fn resolve_field(&self, join_path: &[EdgeId], field: &str) -> Result<FieldRef, Error> {
        let stage = self.locate_stage(join_path)?;
        let entity_name = self.stage_entity(stage)?;
        let entity = self.model.entity(entity_name)?;
        match entity.get_field(field) {
            Some(def) if def.field_type.scalar_type().is_some() => {
                Ok(FieldRef::new(stage, field))
            }
            _ => Err(Error::PropertyNotFound {
                entity: entity_name.to_string(),
                property: field.to_string(),
            }),
        }
    }

    fn build_hop(
        &self,
        outer: JoinExpr,
        inner: JoinExpr,
        join_path: &[EdgeId],
        edge: EdgeId,
        elide_outer_stage: bool,
    ) -> Result<JoinExpr, Error> {
        let outer_stage = self.locate_stage(join_path)?;
        let outer_entity = self.stage_entity(outer_stage)?.to_string();
        let inner_entity = inner.root_entity().to_string();
        let (outer_key, inner_key) = key::derive_key_selectors(
            self.model,
            edge,
            outer_stage,
            &outer_entity,
            &inner_entity,
            &self.limits,
        )?;
        Ok(JoinExpr::Flatten {
            input: Box::new(JoinExpr::GroupJoin {
                outer: Box::new(outer),
                inner: Box::new(inner),
                outer_key,
                inner_key,
            }),
            elide_outer_stage,
        })
    }

    /// Stage index for a recorded path: 0 for the root, position + 1 for a
    /// recorded hop, a hard failure otherwise.
    fn locate_stage(&self, join_path: &[EdgeId]) -> Result<usize, Error> {
        if join_path.is_empty() {
            return Ok(0);
        }
        self.join_paths
            .iter()
            .position(|recorded| recorded.as_slice() == join_path)
            .map(|index| index + 1)
            .ok_or_else(|| Error::PathNotJoined {
                entity: self.root.clone(),
                path: describe_path(self.model, join_path),
            })
    }

    fn stage_entity(&self, stage: usize) -> Result<&str, Error> {
        if stage == 0 {
            return Ok(&self.root);
        }
        let path = self.join_paths.get(stage - 1).ok_or(Error::Ir(
            navmap_ir::Error::StageOutOfRange {
                index: stage,
                len: self.join_paths.len() + 1,
            },
        ))?;
        let last = path.last().ok_or_else(|| {
            Error::InvalidModel("recorded join path has no edges".to_string())
        })?;
        Ok(&self.model.edge(*last)?.target)
    }
}
