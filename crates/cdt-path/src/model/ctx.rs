//! Context segments: one step of a path into nested lists and maps.
//!
//! A context chain is a slice of segments applied outermost first. Each
//! segment carries a wire id and either a literal [`Value`] or a compiled
//! filter [`Expression`], never both.

use lazy_static::lazy_static;

use crate::model::{Exp, Expression, Value};

// Segment ids
pub const CTX_EXP: u32 = 0x04;
pub const CTX_LIST_INDEX: u32 = 0x10;
pub const CTX_LIST_RANK: u32 = 0x11;
pub const CTX_LIST_VALUE: u32 = 0x13;
pub const CTX_MAP_INDEX: u32 = 0x20;
pub const CTX_MAP_RANK: u32 = 0x21;
pub const CTX_MAP_KEY: u32 = 0x22;
pub const CTX_MAP_VALUE: u32 = 0x23;

/// Bits above the base id that request creation of a missing container.
const CTX_CREATE_MASK: u32 = 0xc0;

lazy_static! {
    /// Filter that matches every child.
    static ref MATCH_ALL: Expression = Exp::val(true).build();
}

/// Ordering applied to a list created by a context segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListOrder {
    #[default]
    Unordered,
    Ordered,
}

/// Ordering applied to a map created by a context segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapOrder {
    #[default]
    Unordered,
    KeyOrdered,
    KeyValueOrdered,
}

impl ListOrder {
    fn create_flag(self, pad: bool) -> u32 {
        match (self, pad) {
            (ListOrder::Ordered, _) => 0xc0,
            (ListOrder::Unordered, true) => 0x80,
            (ListOrder::Unordered, false) => 0x40,
        }
    }
}

impl MapOrder {
    fn create_flag(self) -> u32 {
        match self {
            MapOrder::Unordered => 0x40,
            MapOrder::KeyOrdered => 0x80,
            MapOrder::KeyValueOrdered => 0xc0,
        }
    }
}

/// Segment payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CtxPayload {
    Literal(Value),
    Filtered(Expression),
}

/// Segment kinds, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtxKind {
    ListIndex,
    ListRank,
    ListValue,
    MapIndex,
    MapRank,
    MapKey,
    MapValue,
    /// Wildcard or filtered traversal over all children.
    AllChildren,
}

/// One path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Ctx {
    id: u32,
    payload: CtxPayload,
}

impl Ctx {
    fn literal(id: u32, value: Value) -> Self {
        Self {
            id,
            payload: CtxPayload::Literal(value),
        }
    }

    /// Rebuilds a segment from its wire id and payload.
    ///
    /// Returns `None` if the id's base kind is unknown or does not agree with
    /// the payload shape.
    pub fn from_parts(id: u32, payload: CtxPayload) -> Option<Self> {
        let ctx = Self { id, payload };
        let kind = ctx.kind()?;
        let filtered = matches!(ctx.payload, CtxPayload::Filtered(_));
        (filtered == (kind == CtxKind::AllChildren)).then_some(ctx)
    }

    /// Lookup list by index offset. Negative indexes count from the end.
    pub fn list_index(index: i64) -> Self {
        Self::literal(CTX_LIST_INDEX, Value::Int(index))
    }

    /// Lookup list by index, creating the list (and padding) if missing.
    pub fn list_index_create(index: i64, order: ListOrder, pad: bool) -> Self {
        Self::literal(CTX_LIST_INDEX | order.create_flag(pad), Value::Int(index))
    }

    /// Lookup list by rank (0 = smallest value).
    pub fn list_rank(rank: i64) -> Self {
        Self::literal(CTX_LIST_RANK, Value::Int(rank))
    }

    /// Lookup list by value.
    pub fn list_value(value: impl Into<Value>) -> Self {
        Self::literal(CTX_LIST_VALUE, value.into())
    }

    /// Lookup map by index offset.
    pub fn map_index(index: i64) -> Self {
        Self::literal(CTX_MAP_INDEX, Value::Int(index))
    }

    /// Lookup map by rank.
    pub fn map_rank(rank: i64) -> Self {
        Self::literal(CTX_MAP_RANK, Value::Int(rank))
    }

    /// Lookup map by key.
    pub fn map_key(key: impl Into<Value>) -> Self {
        Self::literal(CTX_MAP_KEY, key.into())
    }

    /// Lookup map by key, creating the map if missing.
    pub fn map_key_create(key: impl Into<Value>, order: MapOrder) -> Self {
        Self::literal(CTX_MAP_KEY | order.create_flag(), key.into())
    }

    /// Lookup map by value.
    pub fn map_value(value: impl Into<Value>) -> Self {
        Self::literal(CTX_MAP_VALUE, value.into())
    }

    /// Select every child of the current list or map.
    pub fn all_children() -> Self {
        Self {
            id: CTX_EXP,
            payload: CtxPayload::Filtered(MATCH_ALL.clone()),
        }
    }

    /// Select the children for which `filter` evaluates true.
    ///
    /// The filter may use loop variables and any other expression node.
    pub fn all_children_with_filter(filter: &Exp) -> Self {
        Self {
            id: CTX_EXP,
            payload: CtxPayload::Filtered(filter.build()),
        }
    }

    /// Returns the wire id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the payload.
    pub fn payload(&self) -> &CtxPayload {
        &self.payload
    }

    /// Returns the segment kind, ignoring creation flags.
    pub fn kind(&self) -> Option<CtxKind> {
        match self.id & !CTX_CREATE_MASK {
            CTX_EXP => Some(CtxKind::AllChildren),
            CTX_LIST_INDEX => Some(CtxKind::ListIndex),
            CTX_LIST_RANK => Some(CtxKind::ListRank),
            CTX_LIST_VALUE => Some(CtxKind::ListValue),
            CTX_MAP_INDEX => Some(CtxKind::MapIndex),
            CTX_MAP_RANK => Some(CtxKind::MapRank),
            CTX_MAP_KEY => Some(CtxKind::MapKey),
            CTX_MAP_VALUE => Some(CtxKind::MapValue),
            _ => None,
        }
    }
}
