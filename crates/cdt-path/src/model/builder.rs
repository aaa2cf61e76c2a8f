//! Builder API for ergonomic context chain construction.
//!
//! # Example
//!
//! ```rust
//! use cdt_path::{ContextBuilder, Exp, LoopVarPart, SelectFlags};
//! use cdt_path::cdt::select_by_path;
//!
//! let ctx = ContextBuilder::new()
//!     .map_key("book")
//!     .all_children_with_filter(&Exp::le(
//!         Exp::float_loop_var(LoopVarPart::Value),
//!         Exp::val(10.0),
//!     ))
//!     .build();
//!
//! let op = select_by_path("res1", SelectFlags::VALUE, &ctx).unwrap();
//! assert_eq!(op.bin_name, "res1");
//! ```

use crate::model::{Ctx, Exp, ListOrder, MapOrder, Value};

/// Builder for a context chain, outermost segment first.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    segments: Vec<Ctx>,
}

impl ContextBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // List segments
    // =========================================================================

    /// Descends into a list element by index.
    pub fn list_index(mut self, index: i64) -> Self {
        self.segments.push(Ctx::list_index(index));
        self
    }

    /// Descends into a list element by index, creating the list if missing.
    pub fn list_index_create(mut self, index: i64, order: ListOrder, pad: bool) -> Self {
        self.segments.push(Ctx::list_index_create(index, order, pad));
        self
    }

    /// Descends into a list element by rank.
    pub fn list_rank(mut self, rank: i64) -> Self {
        self.segments.push(Ctx::list_rank(rank));
        self
    }

    /// Descends into a list element by value.
    pub fn list_value(mut self, value: impl Into<Value>) -> Self {
        self.segments.push(Ctx::list_value(value));
        self
    }

    // =========================================================================
    // Map segments
    // =========================================================================

    /// Descends into a map entry by index.
    pub fn map_index(mut self, index: i64) -> Self {
        self.segments.push(Ctx::map_index(index));
        self
    }

    /// Descends into a map entry by rank.
    pub fn map_rank(mut self, rank: i64) -> Self {
        self.segments.push(Ctx::map_rank(rank));
        self
    }

    /// Descends into a map entry by key.
    pub fn map_key(mut self, key: impl Into<Value>) -> Self {
        self.segments.push(Ctx::map_key(key));
        self
    }

    /// Descends into a map entry by key, creating the map if missing.
    pub fn map_key_create(mut self, key: impl Into<Value>, order: MapOrder) -> Self {
        self.segments.push(Ctx::map_key_create(key, order));
        self
    }

    /// Descends into a map entry by value.
    pub fn map_value(mut self, value: impl Into<Value>) -> Self {
        self.segments.push(Ctx::map_value(value));
        self
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visits every child.
    pub fn all_children(mut self) -> Self {
        self.segments.push(Ctx::all_children());
        self
    }

    /// Visits the children matching `filter`.
    pub fn all_children_with_filter(mut self, filter: &Exp) -> Self {
        self.segments.push(Ctx::all_children_with_filter(filter));
        self
    }

    /// Appends an already-built segment.
    pub fn segment(mut self, ctx: Ctx) -> Self {
        self.segments.push(ctx);
        self
    }

    /// Returns the number of segments added so far.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if no segment was added.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Builds the chain.
    pub fn build(self) -> Vec<Ctx> {
        self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CtxKind, LoopVarPart};

    #[test]
    fn test_builder_preserves_order() {
        let ctx = ContextBuilder::new()
            .map_key("root")
            .all_children()
            .list_index(-1)
            .all_children_with_filter(&Exp::gt(
                Exp::map_loop_var(LoopVarPart::Value),
                Exp::val(0),
            ))
            .map_value("test")
            .build();

        let kinds: Vec<_> = ctx.iter().map(|c| c.kind().unwrap()).collect();
        assert_eq!(
            kinds,
            [
                CtxKind::MapKey,
                CtxKind::AllChildren,
                CtxKind::ListIndex,
                CtxKind::AllChildren,
                CtxKind::MapValue,
            ]
        );
    }

    #[test]
    fn test_builder_matches_direct_construction() {
        let built = ContextBuilder::new()
            .list_index_create(2, ListOrder::Ordered, false)
            .map_key_create("k", MapOrder::KeyOrdered)
            .list_rank(0)
            .map_index(1)
            .map_rank(-1)
            .list_value("v")
            .segment(Ctx::map_key(7))
            .build();
        let direct = vec![
            Ctx::list_index_create(2, ListOrder::Ordered, false),
            Ctx::map_key_create("k", MapOrder::KeyOrdered),
            Ctx::list_rank(0),
            Ctx::map_index(1),
            Ctx::map_rank(-1),
            Ctx::list_value("v"),
            Ctx::map_key(7),
        ];
        assert_eq!(built, direct);
    }

    #[test]
    fn test_empty_builder() {
        let builder = ContextBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.len(), 0);
        assert!(builder.build().is_empty());
    }
}
