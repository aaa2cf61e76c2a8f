//! Path expressions over nested lists and maps.
//!
//! This crate builds the client side of path-based CDT operations: select
//! or modify every element reached by a context chain, optionally filtered
//! by a predicate, in a single server round trip.
//!
//! # Quick Start
//!
//! ```rust
//! use cdt_path::{Ctx, Exp, LoopVarPart, ModifyFlags, SelectFlags};
//! use cdt_path::cdt::{modify_by_path, select_by_path};
//!
//! // Books priced at or below 10.0
//! let cheap = [
//!     Ctx::map_key("book"),
//!     Ctx::all_children_with_filter(&Exp::le(
//!         Exp::map_get_by_key(
//!             cdt_path::MapReturnType::Value,
//!             cdt_path::ExpType::Float,
//!             Exp::val("price"),
//!             Exp::map_loop_var(LoopVarPart::Value),
//!             &[],
//!         ),
//!         Exp::val(10.0),
//!     )),
//! ];
//! let read = select_by_path("store", SelectFlags::VALUE, &cheap).unwrap();
//! assert!(!read.op_type.is_write());
//!
//! // Double every price in a list of floats
//! let doubled = Exp::mul(Exp::float_loop_var(LoopVarPart::Value), Exp::val(2.0)).build();
//! let write = modify_by_path("prices", ModifyFlags::DEFAULT, &doubled, &[Ctx::all_children()])
//!     .unwrap();
//! assert!(write.op_type.is_write());
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, expression trees, context segments, flags, operations
//! - [`codec`]: Packing of values, expressions and chains; Base64 persistence
//! - [`cdt`]: Standalone and embeddable select/modify builders
//! - [`error`]: Error types
//! - [`limits`]: Limits applied when decoding persisted chains
//!
//! # Determinism
//!
//! Encoding is a pure function of its inputs. Map literals are sorted before
//! packing, so equal inputs always produce identical bytes and an operation
//! can be resent on retry.

pub mod cdt;
pub mod codec;
pub mod error;
pub mod limits;
pub mod model;

pub use codec::{DecodeOptions, ctx_from_base64, ctx_from_base64_with_options, ctx_to_base64};
pub use error::{DecodeError, EncodeError, ErrorCode};
pub use model::{
    ArithOp, BoolOp, CmpOp, ContextBuilder, Ctx, CtxKind, CtxPayload, Exp, ExpReadFlags, ExpType,
    ExpWriteFlags, Expression, ListOrder, LoopVarPart, MapOrder, MapReturnType, ModifyFlags,
    Operation, OperationType, ParticleType, RegexFlags, SelectFlags, Value, ValueMap,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
