//! Expression trees evaluated by the server.
//!
//! An [`Exp`] is a closed set of node kinds. Compiling a tree (see
//! [`crate::codec::exp`]) is a pure function of the tree, so a built
//! [`Expression`] can be reused and shared freely.

use crate::codec::primitives::Unpacker;
use crate::error::DecodeError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{Ctx, Value};

/// Value kinds known to the expression evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExpType {
    Nil = 0,
    Bool = 1,
    Int = 2,
    String = 3,
    List = 4,
    Map = 5,
    Blob = 6,
    Float = 7,
    Geo = 8,
    Hll = 9,
}

/// Which part of the element bound during traversal a loop variable reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoopVarPart {
    /// The map key of the current element (list index for lists).
    MapKey = 0,
    /// The map value or list item of the current element.
    Value = 1,
    /// The position of the current element.
    Index = 2,
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Variadic logical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

/// What a map read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MapReturnType {
    None = 0,
    Index = 1,
    ReverseIndex = 2,
    Rank = 3,
    ReverseRank = 4,
    Count = 5,
    Key = 6,
    Value = 7,
    KeyValue = 8,
    Exists = 13,
}

/// POSIX regex flags, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegexFlags(u32);

impl RegexFlags {
    pub const NONE: RegexFlags = RegexFlags(0);
    /// Use POSIX extended regular expression syntax.
    pub const EXTENDED: RegexFlags = RegexFlags(1);
    /// Ignore case.
    pub const ICASE: RegexFlags = RegexFlags(2);
    /// Do not report position of matches.
    pub const NOSUB: RegexFlags = RegexFlags(4);
    /// Match-any-character operators don't match a newline.
    pub const NEWLINE: RegexFlags = RegexFlags(8);

    /// Returns the raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for RegexFlags {
    type Output = RegexFlags;

    fn bitor(self, rhs: RegexFlags) -> RegexFlags {
        RegexFlags(self.0 | rhs.0)
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    /// Literal operand.
    Val(Value),
    /// The element bound while traversing a wildcard or filtered segment.
    ///
    /// `kind` is advisory; the server decides what it means at runtime.
    LoopVar { part: LoopVarPart, kind: ExpType },
    /// Named bin of the record, read as `kind`.
    Bin { name: String, kind: ExpType },
    Arith {
        op: ArithOp,
        lhs: Box<Exp>,
        rhs: Box<Exp>,
    },
    Cmp {
        op: CmpOp,
        lhs: Box<Exp>,
        rhs: Box<Exp>,
    },
    /// N-ary and/or, operands kept in the given order.
    Bool { op: BoolOp, operands: Vec<Exp> },
    Not(Box<Exp>),
    Regex {
        pattern: String,
        flags: RegexFlags,
        subject: Box<Exp>,
    },
    Geo { subject: Box<Exp>, region: Box<Exp> },
    /// Map lookup by key on `map`, optionally below a nested context.
    MapGetByKey {
        return_type: MapReturnType,
        value_type: ExpType,
        key: Box<Exp>,
        map: Box<Exp>,
        ctx: Vec<Ctx>,
    },
    /// Element count of `list`, optionally below a nested context.
    ListSize { list: Box<Exp>, ctx: Vec<Ctx> },
    /// Module call: a packed CDT payload applied to `bin`.
    Call {
        return_type: ExpType,
        module: u32,
        payload: Vec<u8>,
        bin: Box<Exp>,
    },
    /// As the result of a modify expression, removes the selected element.
    Remove,
}

impl Exp {
    /// Literal value.
    pub fn val(value: impl Into<Value>) -> Exp {
        Exp::Val(value.into())
    }

    /// GeoJSON literal.
    pub fn geo(json: impl Into<String>) -> Exp {
        Exp::Val(Value::geo(json))
    }

    /// Nil literal.
    pub fn nil() -> Exp {
        Exp::Val(Value::Nil)
    }

    /// Loop variable of the given kind.
    pub fn loop_var(kind: ExpType, part: LoopVarPart) -> Exp {
        Exp::LoopVar { part, kind }
    }

    /// Integer loop variable.
    pub fn int_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Int, part)
    }

    /// Float loop variable.
    pub fn float_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Float, part)
    }

    /// String loop variable.
    pub fn string_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::String, part)
    }

    /// Blob loop variable.
    pub fn blob_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Blob, part)
    }

    /// Boolean loop variable.
    pub fn bool_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Bool, part)
    }

    /// Map loop variable.
    pub fn map_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Map, part)
    }

    /// List loop variable.
    pub fn list_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::List, part)
    }

    /// Nil loop variable.
    pub fn nil_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Nil, part)
    }

    /// GeoJSON loop variable.
    pub fn geo_json_loop_var(part: LoopVarPart) -> Exp {
        Exp::loop_var(ExpType::Geo, part)
    }

    /// Bin read as the given kind.
    pub fn bin(name: impl Into<String>, kind: ExpType) -> Exp {
        Exp::Bin { name: name.into(), kind }
    }

    /// Integer bin.
    pub fn int_bin(name: impl Into<String>) -> Exp {
        Exp::bin(name, ExpType::Int)
    }

    /// List bin.
    pub fn list_bin(name: impl Into<String>) -> Exp {
        Exp::bin(name, ExpType::List)
    }

    /// Map bin.
    pub fn map_bin(name: impl Into<String>) -> Exp {
        Exp::bin(name, ExpType::Map)
    }

    fn arith(op: ArithOp, lhs: Exp, rhs: Exp) -> Exp {
        Exp::Arith { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// `lhs + rhs`.
    pub fn add(lhs: Exp, rhs: Exp) -> Exp {
        Exp::arith(ArithOp::Add, lhs, rhs)
    }

    /// `lhs - rhs`.
    pub fn sub(lhs: Exp, rhs: Exp) -> Exp {
        Exp::arith(ArithOp::Sub, lhs, rhs)
    }

    /// `lhs * rhs`.
    pub fn mul(lhs: Exp, rhs: Exp) -> Exp {
        Exp::arith(ArithOp::Mul, lhs, rhs)
    }

    /// `lhs / rhs`.
    pub fn div(lhs: Exp, rhs: Exp) -> Exp {
        Exp::arith(ArithOp::Div, lhs, rhs)
    }

    fn cmp(op: CmpOp, lhs: Exp, rhs: Exp) -> Exp {
        Exp::Cmp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// `lhs == rhs`.
    pub fn eq(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Eq, lhs, rhs)
    }

    /// `lhs != rhs`.
    pub fn ne(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Ne, lhs, rhs)
    }

    /// `lhs > rhs`.
    pub fn gt(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Gt, lhs, rhs)
    }

    /// `lhs >= rhs`.
    pub fn ge(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Ge, lhs, rhs)
    }

    /// `lhs < rhs`.
    pub fn lt(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Lt, lhs, rhs)
    }

    /// `lhs <= rhs`.
    pub fn le(lhs: Exp, rhs: Exp) -> Exp {
        Exp::cmp(CmpOp::Le, lhs, rhs)
    }

    /// Logical and of two or more operands.
    pub fn and(operands: impl IntoIterator<Item = Exp>) -> Exp {
        Exp::bool_op(BoolOp::And, operands)
    }

    /// Logical or of two or more operands.
    pub fn or(operands: impl IntoIterator<Item = Exp>) -> Exp {
        Exp::bool_op(BoolOp::Or, operands)
    }

    fn bool_op(op: BoolOp, operands: impl IntoIterator<Item = Exp>) -> Exp {
        let operands: Vec<Exp> = operands.into_iter().collect();
        debug_assert!(operands.len() >= 2, "{:?} needs at least two operands", op);
        Exp::Bool { op, operands }
    }

    /// Logical negation.
    pub fn not(exp: Exp) -> Exp {
        Exp::Not(Box::new(exp))
    }

    /// True if `subject` matches the POSIX regex `pattern`.
    pub fn regex_compare(pattern: impl Into<String>, flags: RegexFlags, subject: Exp) -> Exp {
        Exp::Regex {
            pattern: pattern.into(),
            flags,
            subject: Box::new(subject),
        }
    }

    /// True if the geo `subject` lies within (or contains) `region`.
    pub fn geo_compare(subject: Exp, region: Exp) -> Exp {
        Exp::Geo {
            subject: Box::new(subject),
            region: Box::new(region),
        }
    }

    /// Map lookup by key.
    pub fn map_get_by_key(
        return_type: MapReturnType,
        value_type: ExpType,
        key: Exp,
        map: Exp,
        ctx: &[Ctx],
    ) -> Exp {
        Exp::MapGetByKey {
            return_type,
            value_type,
            key: Box::new(key),
            map: Box::new(map),
            ctx: ctx.to_vec(),
        }
    }

    /// List element count.
    pub fn list_size(list: Exp, ctx: &[Ctx]) -> Exp {
        Exp::ListSize {
            list: Box::new(list),
            ctx: ctx.to_vec(),
        }
    }

    /// Marks the selected element for removal in a modify expression.
    pub fn remove_result() -> Exp {
        Exp::Remove
    }
}

/// A compiled expression: the packed bytes of one expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    bytes: Vec<u8>,
}

impl Expression {
    /// Wraps bytes that already hold exactly one packed expression.
    pub(crate) fn from_packed(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Restores a compiled expression from stored bytes.
    ///
    /// The bytes must hold exactly one packed object, nested at most
    /// `MAX_NESTING_DEPTH` deep.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let mut unpacker = Unpacker::new(&bytes);
        unpacker.read_raw_object(MAX_NESTING_DEPTH, "expression")?;
        if !unpacker.is_empty() {
            return Err(DecodeError::TrailingBytes {
                count: unpacker.remaining_len(),
            });
        }
        Ok(Self::from_packed(bytes))
    }

    /// Returns the packed bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the expression, returning its packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_accepts_built_expression() {
        let built = Exp::gt(Exp::int_loop_var(LoopVarPart::Value), Exp::val(10)).build();
        let restored = Expression::from_bytes(built.bytes().to_vec()).unwrap();
        assert_eq!(restored, built);
    }

    #[test]
    fn test_from_bytes_requires_one_object() {
        assert!(matches!(
            Expression::from_bytes(vec![]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            Expression::from_bytes(vec![0x01, 0x02]),
            Err(DecodeError::TrailingBytes { count: 1 })
        ));
        // array header promising two elements, holding one
        assert!(matches!(
            Expression::from_bytes(vec![0x92, 0x01]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            Expression::from_bytes(vec![0xc1]),
            Err(DecodeError::InvalidMarker { marker: 0xc1, .. })
        ));
    }
}
