//! Safety limits for decoding persisted contexts.
//!
//! Persisted context strings may come from storage the client does not
//! control, so the decoder bounds recursion and allocation. The encoder
//! applies `MAX_CONTEXT_SEGMENTS` too, so anything it produces decodes with
//! the default options.

/// Maximum nesting depth of lists/maps inside one packed object.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum number of segments in one context chain.
pub const MAX_CONTEXT_SEGMENTS: usize = 256;

/// Maximum element count of a single decoded list or map.
pub const MAX_COLLECTION_LEN: usize = 1 << 20;

/// Maximum byte length of a decoded string or blob.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;
