//! Embeddable select/modify sub-expressions and expression operations.

use tracing::debug;

use crate::cdt::operation::{pack_modify, pack_select};
use crate::codec::exp::{MODULE_CDT, compile};
use crate::codec::primitives::Packer;
use crate::error::EncodeError;
use crate::model::{
    Ctx, Exp, ExpReadFlags, ExpType, ExpWriteFlags, Expression, ModifyFlags, Operation,
    OperationType, SelectFlags,
};

/// Module bit marking a call that writes to its bin.
pub const MODULE_MODIFY: u32 = 0x40;

/// Path select on `bin` as a sub-expression returning `return_type`.
pub fn select_by_path(
    return_type: ExpType,
    flags: SelectFlags,
    bin: Exp,
    ctx: &[Ctx],
) -> Result<Exp, EncodeError> {
    let payload = pack_select(flags, ctx, "select_by_path")?;
    debug!(segments = ctx.len(), payload_len = payload.len(), "embedded select_by_path");
    Ok(Exp::Call {
        return_type,
        module: MODULE_CDT,
        payload,
        bin: Box::new(bin),
    })
}

/// Path modify on `bin` as a sub-expression returning `return_type`.
///
/// `transform` is compiled inline into the call payload.
pub fn modify_by_path(
    return_type: ExpType,
    flags: ModifyFlags,
    transform: &Exp,
    bin: Exp,
    ctx: &[Ctx],
) -> Result<Exp, EncodeError> {
    let payload = pack_modify(flags, ctx, "modify_by_path", |packer| {
        compile(transform, packer)
    })?;
    debug!(segments = ctx.len(), payload_len = payload.len(), "embedded modify_by_path");
    Ok(Exp::Call {
        return_type,
        module: MODULE_CDT | MODULE_MODIFY,
        payload,
        bin: Box::new(bin),
    })
}

/// Evaluates `expression` and returns the result under `name`.
pub fn exp_read(name: &str, expression: &Expression, flags: ExpReadFlags) -> Operation {
    Operation {
        bin_name: name.to_string(),
        op_type: OperationType::ExpRead,
        payload: pack_exp_op(expression, flags.bits()),
    }
}

/// Evaluates `expression` and stores the result in `bin`.
pub fn exp_write(bin: &str, expression: &Expression, flags: ExpWriteFlags) -> Operation {
    Operation {
        bin_name: bin.to_string(),
        op_type: OperationType::ExpModify,
        payload: pack_exp_op(expression, flags.bits()),
    }
}

fn pack_exp_op(expression: &Expression, flags: u32) -> Vec<u8> {
    let mut packer = Packer::with_capacity(expression.bytes().len() + 6);
    packer.write_array_header(2);
    packer.write_packed(expression.bytes());
    packer.write_number(flags as i64);
    packer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LoopVarPart;

    #[test]
    fn test_embedded_select_envelope() {
        let exp = select_by_path(
            ExpType::List,
            SelectFlags::VALUE,
            Exp::map_bin("m"),
            &[Ctx::map_key("a")],
        )
        .unwrap();
        assert_eq!(
            exp.build().bytes(),
            &[
                0x95, 0x7f, 0x04, 0x00, // call, list, module 0
                0x93, 0xcc, 0xfe, 0x92, 0x22, 0xa2, 0x03, b'a', 0x01, //
                0x93, 0x51, 0x05, 0xa1, b'm',
            ]
        );
    }

    #[test]
    fn test_embedded_modify_envelope() {
        let transform = Exp::add(Exp::int_loop_var(LoopVarPart::Value), Exp::val(1));
        let exp = modify_by_path(
            ExpType::Map,
            ModifyFlags::NO_FAIL,
            &transform,
            Exp::map_bin("m"),
            &[Ctx::all_children()],
        )
        .unwrap();
        match &exp {
            Exp::Call { module, payload, .. } => {
                assert_eq!(*module, 0x40);
                assert_eq!(
                    payload.as_slice(),
                    &[0x94, 0xcc, 0xfe, 0x92, 0x04, 0xc3, 0x14, 0x93, 0x14, 0x93, 0x7a, 0x02, 0x01, 0x01]
                );
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_embedded_rejects_empty_context() {
        assert!(select_by_path(ExpType::List, SelectFlags::VALUE, Exp::list_bin("l"), &[]).is_err());
        assert!(
            modify_by_path(
                ExpType::List,
                ModifyFlags::DEFAULT,
                &Exp::remove_result(),
                Exp::list_bin("l"),
                &[]
            )
            .is_err()
        );
    }

    #[test]
    fn test_exp_operations() {
        let expression = Exp::val(1).build();
        let read = exp_read("out", &expression, ExpReadFlags::EVAL_NO_FAIL);
        assert_eq!(read.op_type, OperationType::ExpRead);
        assert_eq!(read.payload, [0x92, 0x01, 0x10]);

        let write = exp_write("bin", &expression, ExpWriteFlags::UPDATE_ONLY | ExpWriteFlags::POLICY_NO_FAIL);
        assert_eq!(write.op_type, OperationType::ExpModify);
        assert_eq!(write.bin_name, "bin");
        assert_eq!(write.payload, [0x92, 0x01, 0x0a]);
    }
}
