//! Context chain codec.
//!
//! A chain packs as a flat array `[id1, p1, id2, p2, ...]`. Literal payloads
//! are packed values; filter payloads are compiled expression bytes written
//! verbatim. The persisted text form is that array in standard Base64.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use crate::codec::primitives::{Packer, Unpacker};
use crate::codec::value::{check_value_limits, decode_value, encode_value};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_CONTEXT_SEGMENTS, MAX_NESTING_DEPTH};
use crate::model::ctx::CTX_EXP;
use crate::model::{Ctx, CtxPayload, Expression};

/// Opcode that frames a nested context ahead of a container command.
pub const CONTEXT_EVAL: i64 = 0xff;

/// Options for decoding persisted chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum container nesting inside a segment payload.
    pub max_depth: usize,
    /// Maximum number of segments in a chain.
    pub max_segments: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            max_segments: MAX_CONTEXT_SEGMENTS,
        }
    }
}

impl DecodeOptions {
    /// Creates options with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter limits for chains from untrusted storage.
    pub fn strict() -> Self {
        Self {
            max_depth: 16,
            max_segments: 32,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

fn check_chain(ctx: &[Ctx], operation: &'static str) -> Result<(), EncodeError> {
    if ctx.is_empty() {
        return Err(EncodeError::EmptyContext { operation });
    }
    if ctx.len() > MAX_CONTEXT_SEGMENTS {
        return Err(EncodeError::LengthExceedsLimit {
            field: "context",
            len: ctx.len(),
            max: MAX_CONTEXT_SEGMENTS,
        });
    }
    // Anything encoded here must decode with the default options.
    ctx.iter().try_for_each(|segment| match segment.payload() {
        CtxPayload::Literal(value) => check_value_limits(value, 0),
        CtxPayload::Filtered(exp) => check_filter_limits(exp),
    })
}

fn check_filter_limits(exp: &Expression) -> Result<(), EncodeError> {
    let mut unpacker = Unpacker::new(exp.bytes());
    match unpacker.read_raw_object(MAX_NESTING_DEPTH, "context filter") {
        Ok(_) if unpacker.is_empty() => Ok(()),
        Err(DecodeError::DepthExceeded { max }) => Err(EncodeError::DepthExceeded { max }),
        _ => Err(EncodeError::MalformedExpression),
    }
}

/// Packs `ctx`, merging `terminal_flag` into the id of the last segment only.
pub fn encode_ctx(packer: &mut Packer, ctx: &[Ctx], terminal_flag: u32) -> Result<(), EncodeError> {
    check_chain(ctx, "encode_ctx")?;
    write_segments(packer, ctx, terminal_flag);
    Ok(())
}

/// Writes `[CONTEXT_EVAL, chain, [command, ...]]` and leaves `arg_count`
/// command arguments for the caller to write.
pub fn encode_context_eval(
    packer: &mut Packer,
    ctx: &[Ctx],
    command: i64,
    arg_count: usize,
    terminal_flag: u32,
) -> Result<(), EncodeError> {
    check_chain(ctx, "encode_context_eval")?;
    write_context_eval(packer, ctx, command, arg_count, terminal_flag);
    Ok(())
}

pub(crate) fn write_context_eval(
    packer: &mut Packer,
    ctx: &[Ctx],
    command: i64,
    arg_count: usize,
    terminal_flag: u32,
) {
    packer.write_array_header(3);
    packer.write_number(CONTEXT_EVAL);
    write_segments(packer, ctx, terminal_flag);
    packer.write_array_header(arg_count + 1);
    packer.write_number(command);
}

fn write_segments(packer: &mut Packer, ctx: &[Ctx], terminal_flag: u32) {
    packer.write_array_header(ctx.len() * 2);
    let last = ctx.len().saturating_sub(1);
    for (i, segment) in ctx.iter().enumerate() {
        let id = if i == last {
            segment.id() | terminal_flag
        } else {
            segment.id()
        };
        packer.write_number(id as i64);
        match segment.payload() {
            CtxPayload::Literal(value) => encode_value(packer, value),
            CtxPayload::Filtered(exp) => packer.write_packed(exp.bytes()),
        }
    }
}

/// Serializes a chain to Base64 for persistence.
pub fn ctx_to_base64(ctx: &[Ctx]) -> Result<String, EncodeError> {
    check_chain(ctx, "ctx_to_base64")?;
    let mut packer = Packer::new();
    write_segments(&mut packer, ctx, 0);
    Ok(BASE64.encode(packer.into_bytes()))
}

// =============================================================================
// DECODING
// =============================================================================

/// Restores a chain written by [`ctx_to_base64`], using default limits.
pub fn ctx_from_base64(text: &str) -> Result<Vec<Ctx>, DecodeError> {
    ctx_from_base64_with_options(text, DecodeOptions::default())
}

/// Restores a chain written by [`ctx_to_base64`].
///
/// Integer payloads come back as 64-bit integers. Filter payloads keep their
/// exact compiled bytes.
pub fn ctx_from_base64_with_options(
    text: &str,
    options: DecodeOptions,
) -> Result<Vec<Ctx>, DecodeError> {
    let bytes = BASE64
        .decode(text.trim())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
    let ctx = decode_ctx(&bytes, options)?;
    debug!(segments = ctx.len(), "decoded persisted context");
    Ok(ctx)
}

/// Decodes a packed chain (the bytes inside the Base64 text).
pub fn decode_ctx(bytes: &[u8], options: DecodeOptions) -> Result<Vec<Ctx>, DecodeError> {
    let mut unpacker = Unpacker::new(bytes);
    let len = match unpacker.read_array_header("context") {
        Ok(len) => len,
        Err(DecodeError::InvalidMarker { .. }) => return Err(DecodeError::NotAContextList),
        Err(e) => return Err(e),
    };
    if len == 0 {
        return Err(DecodeError::EmptyContext);
    }
    if len % 2 != 0 {
        return Err(DecodeError::OddContextLength { len });
    }
    let segments = len / 2;
    if segments > options.max_segments {
        return Err(DecodeError::LengthExceedsLimit {
            field: "context",
            len: segments,
            max: options.max_segments,
        });
    }

    let mut ctx = Vec::with_capacity(segments);
    for _ in 0..segments {
        let raw_id = match unpacker.read_number("context id") {
            Ok(id) => id,
            Err(DecodeError::InvalidMarker { marker, .. }) => {
                return Err(DecodeError::InvalidMarker { marker, context: "context id" });
            }
            Err(e) => return Err(e),
        };
        let id = u32::try_from(raw_id).map_err(|_| DecodeError::InvalidContextId { id: raw_id })?;
        let payload = if id == CTX_EXP {
            let raw = unpacker.read_raw_object(options.max_depth, "context filter")?;
            CtxPayload::Filtered(Expression::from_packed(raw.to_vec()))
        } else {
            CtxPayload::Literal(decode_value(&mut unpacker, options.max_depth)?)
        };
        let segment =
            Ctx::from_parts(id, payload).ok_or(DecodeError::InvalidContextId { id: raw_id })?;
        ctx.push(segment);
    }

    if !unpacker.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: unpacker.remaining_len(),
        });
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Exp, ListOrder, LoopVarPart, MapOrder, Value};

    fn pack(ctx: &[Ctx], flag: u32) -> Vec<u8> {
        let mut packer = Packer::new();
        encode_ctx(&mut packer, ctx, flag).unwrap();
        packer.into_bytes()
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut packer = Packer::new();
        assert!(matches!(
            encode_ctx(&mut packer, &[], 0),
            Err(EncodeError::EmptyContext { .. })
        ));
        assert!(ctx_to_base64(&[]).is_err());
    }

    #[test]
    fn test_oversized_chain_rejected() {
        let ctx = vec![Ctx::list_index(0); MAX_CONTEXT_SEGMENTS + 1];
        assert!(matches!(
            ctx_to_base64(&ctx),
            Err(EncodeError::LengthExceedsLimit { .. })
        ));
    }

    fn nested_list(levels: usize) -> Value {
        (0..levels).fold(Value::Int(1), |inner, _| Value::List(vec![inner]))
    }

    fn nested_not(levels: usize) -> Exp {
        (0..levels).fold(Exp::val(true), |inner, _| Exp::not(inner))
    }

    #[test]
    fn test_deepest_encodable_chain_decodes() {
        let ctx = vec![
            Ctx::list_value(nested_list(MAX_NESTING_DEPTH)),
            Ctx::all_children_with_filter(&nested_not(MAX_NESTING_DEPTH)),
        ];
        let text = ctx_to_base64(&ctx).unwrap();
        assert_eq!(ctx_from_base64(&text).unwrap(), ctx);
    }

    #[test]
    fn test_too_deep_chain_rejected_on_encode() {
        let deep_value = [Ctx::list_value(nested_list(MAX_NESTING_DEPTH + 1))];
        assert_eq!(
            ctx_to_base64(&deep_value),
            Err(EncodeError::DepthExceeded { max: MAX_NESTING_DEPTH })
        );
        let deep_filter = [Ctx::all_children_with_filter(&nested_not(MAX_NESTING_DEPTH + 1))];
        assert_eq!(
            ctx_to_base64(&deep_filter),
            Err(EncodeError::DepthExceeded { max: MAX_NESTING_DEPTH })
        );
        let mut packer = Packer::new();
        assert!(encode_ctx(&mut packer, &deep_value, 0).is_err());
    }

    #[test]
    fn test_nan_payload_roundtrips() {
        let ctx = vec![Ctx::map_key(f64::NAN), Ctx::list_value(Value::list([f64::NAN]))];
        let text = ctx_to_base64(&ctx).unwrap();
        assert_eq!(ctx_from_base64(&text).unwrap(), ctx);
    }

    #[test]
    fn test_single_segment_layout() {
        assert_eq!(
            pack(&[Ctx::map_key("book")], 0),
            [0x92, 0x22, 0xa5, 0x03, b'b', b'o', b'o', b'k']
        );
        assert_eq!(pack(&[Ctx::list_index(-1)], 0), [0x92, 0x10, 0xff]);
    }

    #[test]
    fn test_terminal_flag_only_on_last_segment() {
        let one = pack(&[Ctx::list_index(1)], 0x40);
        assert_eq!(one, [0x92, 0x50, 0x01]);

        let three = pack(
            &[Ctx::map_key(1), Ctx::list_index(2), Ctx::map_index(3)],
            0x40,
        );
        assert_eq!(three, [0x96, 0x22, 0x01, 0x10, 0x02, 0x60, 0x03]);
    }

    #[test]
    fn test_filter_payload_written_raw() {
        let ctx = [Ctx::all_children_with_filter(&Exp::gt(
            Exp::int_loop_var(LoopVarPart::Value),
            Exp::val(10),
        ))];
        assert_eq!(
            pack(&ctx, 0),
            [0x92, 0x04, 0x93, 0x03, 0x93, 0x7a, 0x02, 0x01, 0x0a]
        );
        assert_eq!(pack(&[Ctx::all_children()], 0), [0x92, 0x04, 0xc3]);
    }

    #[test]
    fn test_context_eval_framing() {
        let mut packer = Packer::new();
        encode_context_eval(&mut packer, &[Ctx::list_index(0)], 16, 1, 0).unwrap();
        packer.write_number(5);
        assert_eq!(
            packer.into_bytes(),
            [0x93, 0xcc, 0xff, 0x92, 0x10, 0x00, 0x92, 0x10, 0x05]
        );
    }

    #[test]
    fn test_base64_roundtrip() {
        let ctx = vec![
            Ctx::map_key("book"),
            Ctx::all_children_with_filter(&Exp::le(
                Exp::float_loop_var(LoopVarPart::Value),
                Exp::val(10.0),
            )),
            Ctx::list_index_create(3, ListOrder::Ordered, false),
            Ctx::map_key_create(Value::Bytes(vec![1, 2]), MapOrder::KeyValueOrdered),
            Ctx::list_value(Value::list([1, 2])),
            Ctx::map_value(Value::map([("a", 1)])),
            Ctx::all_children(),
        ];
        let text = ctx_to_base64(&ctx).unwrap();
        assert_eq!(ctx_from_base64(&text).unwrap(), ctx);
        assert_eq!(ctx_to_base64(&ctx_from_base64(&text).unwrap()).unwrap(), text);
    }

    #[test]
    fn test_base64_known_text() {
        // [0x22, "a"]
        let text = ctx_to_base64(&[Ctx::map_key("a")]).unwrap();
        assert_eq!(text, "kiKiA2E=");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        let b64 = |bytes: &[u8]| BASE64.encode(bytes);
        assert!(matches!(
            ctx_from_base64("not base64!"),
            Err(DecodeError::InvalidBase64(_))
        ));
        assert!(matches!(ctx_from_base64(&b64(&[0x01])), Err(DecodeError::NotAContextList)));
        assert!(matches!(ctx_from_base64(&b64(&[0x90])), Err(DecodeError::EmptyContext)));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x93, 0x10, 0x01, 0x10])),
            Err(DecodeError::OddContextLength { len: 3 })
        ));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x92, 0xa2, 0x03, b'x', 0x01])),
            Err(DecodeError::InvalidMarker { context: "context id", .. })
        ));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x92, 0x7f, 0x01])),
            Err(DecodeError::InvalidContextId { id: 0x7f })
        ));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x92, 0xff, 0x01])),
            Err(DecodeError::InvalidContextId { id: -1 })
        ));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x92, 0x10, 0x01, 0x00])),
            Err(DecodeError::TrailingBytes { count: 1 })
        ));
        assert!(matches!(
            ctx_from_base64(&b64(&[0x92, 0x10])),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_strict_options_limit_segments() {
        let ctx = vec![Ctx::list_index(0); 40];
        let text = ctx_to_base64(&ctx).unwrap();
        assert_eq!(ctx_from_base64(&text).unwrap().len(), 40);
        assert!(matches!(
            ctx_from_base64_with_options(&text, DecodeOptions::strict()),
            Err(DecodeError::LengthExceedsLimit { field: "context", len: 40, max: 32 })
        ));
    }

    #[test]
    fn test_integers_widen_on_decode() {
        let text = BASE64.encode([0x92, 0x10, 0xd0, 0x05]);
        assert_eq!(ctx_from_base64(&text).unwrap(), vec![Ctx::list_index(5)]);
    }
}
