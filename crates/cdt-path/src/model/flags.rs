//! Flag sets for path operations.
//!
//! The apply bit (0x04) is owned by the builders: select payloads always
//! clear it and modify payloads always set it, so it is not offered here.

use std::ops::BitOr;

/// Apply bit forced by the builders.
pub(crate) const APPLY: u32 = 0x04;

/// Controls what a select returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SelectFlags(u32);

impl SelectFlags {
    /// Return the matching data tree structure.
    pub const MATCHING_TREE: SelectFlags = SelectFlags(0);
    /// Return the values of the nodes finally selected.
    pub const VALUE: SelectFlags = SelectFlags(1);
    /// Synonym for `VALUE` when a list is expected.
    pub const LIST_VALUE: SelectFlags = SelectFlags::VALUE;
    /// Synonym for `VALUE` when map values are expected.
    pub const MAP_VALUE: SelectFlags = SelectFlags::VALUE;
    /// Return only the keys of the selected map entries.
    pub const MAP_KEY: SelectFlags = SelectFlags(2);
    /// Return (key, value) pairs of the selected map entries.
    pub const MAP_KEY_VALUE: SelectFlags = SelectFlags(1 | 2);
    /// Skip elements that hit a type or filter error instead of failing.
    pub const NO_FAIL: SelectFlags = SelectFlags(0x10);

    /// Wraps raw bits as received from a caller or a stored definition.
    ///
    /// Unknown bits are kept; the builders mask the apply bit.
    pub fn from_bits(bits: u32) -> Self {
        SelectFlags(bits)
    }

    /// Returns the raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub fn contains(self, other: SelectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits as packed into a select payload.
    pub(crate) fn wire_bits(self) -> u32 {
        self.0 & !APPLY
    }
}

impl BitOr for SelectFlags {
    type Output = SelectFlags;

    fn bitor(self, rhs: SelectFlags) -> SelectFlags {
        SelectFlags(self.0 | rhs.0)
    }
}

/// Controls how a modify treats the selected elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifyFlags(u32);

impl ModifyFlags {
    /// Fail the operation if the path hits an invalid type.
    pub const DEFAULT: ModifyFlags = ModifyFlags(0);
    /// Skip elements that hit a type or filter error instead of failing.
    pub const NO_FAIL: ModifyFlags = ModifyFlags(0x10);

    /// Wraps raw bits as received from a caller or a stored definition.
    pub fn from_bits(bits: u32) -> Self {
        ModifyFlags(bits)
    }

    /// Returns the raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub fn contains(self, other: ModifyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits as packed into a modify payload.
    pub(crate) fn wire_bits(self) -> u32 {
        self.0 | APPLY
    }
}

impl BitOr for ModifyFlags {
    type Output = ModifyFlags;

    fn bitor(self, rhs: ModifyFlags) -> ModifyFlags {
        ModifyFlags(self.0 | rhs.0)
    }
}

/// Flags for expression read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExpReadFlags(u32);

impl ExpReadFlags {
    /// Default read behavior.
    pub const DEFAULT: ExpReadFlags = ExpReadFlags(0);
    /// Ignore failures caused by the expression resolving to unknown.
    pub const EVAL_NO_FAIL: ExpReadFlags = ExpReadFlags(1 << 4);

    /// Returns the raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ExpReadFlags {
    type Output = ExpReadFlags;

    fn bitor(self, rhs: ExpReadFlags) -> ExpReadFlags {
        ExpReadFlags(self.0 | rhs.0)
    }
}

/// Flags for expression write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExpWriteFlags(u32);

impl ExpWriteFlags {
    /// Default write behavior.
    pub const DEFAULT: ExpWriteFlags = ExpWriteFlags(0);
    /// Fail if the bin already exists.
    pub const CREATE_ONLY: ExpWriteFlags = ExpWriteFlags(1);
    /// Fail if the bin does not exist.
    pub const UPDATE_ONLY: ExpWriteFlags = ExpWriteFlags(1 << 1);
    /// Delete the bin if the expression evaluates to nil.
    pub const ALLOW_DELETE: ExpWriteFlags = ExpWriteFlags(1 << 2);
    /// Do not fail when the write is denied by the flags above.
    pub const POLICY_NO_FAIL: ExpWriteFlags = ExpWriteFlags(1 << 3);
    /// Ignore failures caused by the expression resolving to unknown.
    pub const EVAL_NO_FAIL: ExpWriteFlags = ExpWriteFlags(1 << 4);

    /// Returns the raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ExpWriteFlags {
    type Output = ExpWriteFlags;

    fn bitor(self, rhs: ExpWriteFlags) -> ExpWriteFlags {
        ExpWriteFlags(self.0 | rhs.0)
    }
}
