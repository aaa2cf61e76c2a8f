//! Path operation builders.
//!
//! [`select_by_path`] and [`modify_by_path`] produce standalone operations.
//! The [`exp`] module offers the same payloads as sub-expressions that can
//! be embedded in a larger expression or run with [`exp::exp_read`] and
//! [`exp::exp_write`].

pub mod exp;
pub mod operation;

pub use operation::{modify_by_path, select_by_path};

/// Opcode shared by select and modify payloads.
pub const SELECT: i64 = 0xfe;
