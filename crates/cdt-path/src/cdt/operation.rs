//! Standalone select/modify operations.

use tracing::debug;

use crate::cdt::SELECT;
use crate::codec::ctx::encode_ctx;
use crate::codec::primitives::Packer;
use crate::error::EncodeError;
use crate::model::{Ctx, Expression, ModifyFlags, Operation, OperationType, SelectFlags};

/// Reads the elements of `bin` that the path `ctx` selects.
///
/// Packs `[SELECT, ctx, flags]` with the apply bit cleared.
pub fn select_by_path(
    bin: &str,
    flags: SelectFlags,
    ctx: &[Ctx],
) -> Result<Operation, EncodeError> {
    let payload = pack_select(flags, ctx, "select_by_path")?;
    debug!(bin, segments = ctx.len(), payload_len = payload.len(), "select_by_path");
    Ok(Operation {
        bin_name: bin.to_string(),
        op_type: OperationType::CdtRead,
        payload,
    })
}

/// Replaces each element of `bin` selected by `ctx` with the result of
/// `transform`, evaluated with the element bound to the loop variables.
///
/// Packs `[SELECT, ctx, flags | APPLY, transform]`.
pub fn modify_by_path(
    bin: &str,
    flags: ModifyFlags,
    transform: &Expression,
    ctx: &[Ctx],
) -> Result<Operation, EncodeError> {
    let payload = pack_modify(flags, ctx, "modify_by_path", |packer| {
        packer.write_packed(transform.bytes())
    })?;
    debug!(bin, segments = ctx.len(), payload_len = payload.len(), "modify_by_path");
    Ok(Operation {
        bin_name: bin.to_string(),
        op_type: OperationType::CdtModify,
        payload,
    })
}

pub(crate) fn pack_select(
    flags: SelectFlags,
    ctx: &[Ctx],
    operation: &'static str,
) -> Result<Vec<u8>, EncodeError> {
    check_nonempty(ctx, operation)?;
    let mut packer = Packer::new();
    packer.write_array_header(3);
    packer.write_number(SELECT);
    encode_ctx(&mut packer, ctx, 0)?;
    packer.write_number(flags.wire_bits() as i64);
    Ok(packer.into_bytes())
}

pub(crate) fn pack_modify(
    flags: ModifyFlags,
    ctx: &[Ctx],
    operation: &'static str,
    write_transform: impl FnOnce(&mut Packer),
) -> Result<Vec<u8>, EncodeError> {
    check_nonempty(ctx, operation)?;
    let mut packer = Packer::new();
    packer.write_array_header(4);
    packer.write_number(SELECT);
    encode_ctx(&mut packer, ctx, 0)?;
    packer.write_number(flags.wire_bits() as i64);
    write_transform(&mut packer);
    Ok(packer.into_bytes())
}

fn check_nonempty(ctx: &[Ctx], operation: &'static str) -> Result<(), EncodeError> {
    if ctx.is_empty() {
        return Err(EncodeError::EmptyContext { operation });
    }
    Ok(())
}
