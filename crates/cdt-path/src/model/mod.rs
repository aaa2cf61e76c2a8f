//! Data model types for path operations.
//!
//! This module contains the types callers assemble:
//! - Values (literal operands)
//! - Expressions (filter and transform trees)
//! - Context segments (path steps)
//! - Flags and operations
//! - Builders (ergonomic construction)

pub mod builder;
pub mod ctx;
pub mod exp;
pub mod flags;
pub mod operation;
pub mod value;

pub use builder::ContextBuilder;
pub use ctx::{Ctx, CtxKind, CtxPayload, ListOrder, MapOrder};
pub use exp::{
    ArithOp, BoolOp, CmpOp, Exp, ExpType, Expression, LoopVarPart, MapReturnType, RegexFlags,
};
pub use flags::{ExpReadFlags, ExpWriteFlags, ModifyFlags, SelectFlags};
pub use operation::{Operation, OperationType};
pub use value::{ParticleType, Value, ValueMap};
