//! Expression compiler.
//!
//! Lowers an [`Exp`] tree into a prefix program: each node is an array whose
//! first element is the opcode, followed by its operands compiled in order.
//! Literals other than lists are written inline.

use tracing::trace;

use crate::codec::ctx::write_context_eval;
use crate::codec::primitives::Packer;
use crate::codec::value::encode_value;
use crate::model::{ArithOp, BoolOp, CmpOp, Exp, ExpType, Expression, LoopVarPart, Value};

// Opcodes
const EQ: i64 = 1;
const NE: i64 = 2;
const GT: i64 = 3;
const GE: i64 = 4;
const LT: i64 = 5;
const LE: i64 = 6;
const REGEX: i64 = 7;
const GEO: i64 = 8;
const AND: i64 = 16;
const OR: i64 = 17;
const NOT: i64 = 18;
const ADD: i64 = 20;
const SUB: i64 = 21;
const MUL: i64 = 22;
const DIV: i64 = 23;
const BIN: i64 = 81;
const REMOVE_RESULT: i64 = 100;
const LOOP_VAR: i64 = 122;
const QUOTED: i64 = 126;
const CALL: i64 = 127;

// CDT module commands
const LIST_SIZE: i64 = 16;
const MAP_GET_BY_KEY: i64 = 97;

/// Module id for list/map calls.
pub(crate) const MODULE_CDT: u32 = 0;

impl Exp {
    /// Compiles this tree into an immutable [`Expression`].
    pub fn build(&self) -> Expression {
        let mut packer = Packer::new();
        compile(self, &mut packer);
        Expression::from_packed(packer.into_bytes())
    }
}

/// Writes `exp` to the packer as exactly one packed object.
pub fn compile(exp: &Exp, packer: &mut Packer) {
    match exp {
        Exp::Val(Value::List(items)) => {
            // Unquoted arrays would be read as calls.
            packer.write_array_header(2);
            packer.write_number(QUOTED);
            packer.write_array_header(items.len());
            for item in items {
                encode_value(packer, item);
            }
        }
        Exp::Val(value) => encode_value(packer, value),
        Exp::LoopVar { part, kind } => {
            let kind = match part {
                LoopVarPart::Index if *kind != ExpType::Int => {
                    trace!(requested = ?kind, "index loop variable packed as int");
                    ExpType::Int
                }
                _ => *kind,
            };
            packer.write_array_header(3);
            packer.write_number(LOOP_VAR);
            packer.write_number(kind as i64);
            packer.write_number(*part as i64);
        }
        Exp::Bin { name, kind } => {
            packer.write_array_header(3);
            packer.write_number(BIN);
            packer.write_number(*kind as i64);
            packer.write_string(name);
        }
        Exp::Arith { op, lhs, rhs } => {
            let opcode = match op {
                ArithOp::Add => ADD,
                ArithOp::Sub => SUB,
                ArithOp::Mul => MUL,
                ArithOp::Div => DIV,
            };
            compile_cmd(packer, opcode, &[&**lhs, &**rhs]);
        }
        Exp::Cmp { op, lhs, rhs } => {
            let opcode = match op {
                CmpOp::Eq => EQ,
                CmpOp::Ne => NE,
                CmpOp::Gt => GT,
                CmpOp::Ge => GE,
                CmpOp::Lt => LT,
                CmpOp::Le => LE,
            };
            compile_cmd(packer, opcode, &[&**lhs, &**rhs]);
        }
        Exp::Bool { op, operands } => {
            let opcode = match op {
                BoolOp::And => AND,
                BoolOp::Or => OR,
            };
            packer.write_array_header(operands.len() + 1);
            packer.write_number(opcode);
            for operand in operands {
                compile(operand, packer);
            }
        }
        Exp::Not(inner) => compile_cmd(packer, NOT, &[&**inner]),
        Exp::Regex { pattern, flags, subject } => {
            packer.write_array_header(4);
            packer.write_number(REGEX);
            packer.write_number(flags.bits() as i64);
            packer.write_string(pattern);
            compile(subject, packer);
        }
        Exp::Geo { subject, region } => compile_cmd(packer, GEO, &[&**subject, &**region]),
        Exp::MapGetByKey { return_type, value_type, key, map, ctx } => {
            let mut payload = Packer::new();
            if ctx.is_empty() {
                payload.write_array_header(3);
                payload.write_number(MAP_GET_BY_KEY);
            } else {
                write_context_eval(&mut payload, ctx, MAP_GET_BY_KEY, 2, 0);
            }
            payload.write_number(*return_type as i64);
            compile(key, &mut payload);
            write_call(packer, *value_type, MODULE_CDT, &payload.into_bytes(), map);
        }
        Exp::ListSize { list, ctx } => {
            let mut payload = Packer::new();
            if ctx.is_empty() {
                payload.write_array_header(1);
                payload.write_number(LIST_SIZE);
            } else {
                write_context_eval(&mut payload, ctx, LIST_SIZE, 0, 0);
            }
            write_call(packer, ExpType::Int, MODULE_CDT, &payload.into_bytes(), list);
        }
        Exp::Call { return_type, module, payload, bin } => {
            write_call(packer, *return_type, *module, payload, bin);
        }
        Exp::Remove => {
            packer.write_array_header(1);
            packer.write_number(REMOVE_RESULT);
        }
    }
}

fn compile_cmd(packer: &mut Packer, opcode: i64, operands: &[&Exp]) {
    packer.write_array_header(operands.len() + 1);
    packer.write_number(opcode);
    for operand in operands {
        compile(operand, packer);
    }
}

/// Module call envelope: `[CALL, return_type, module, payload, bin]`.
fn write_call(packer: &mut Packer, return_type: ExpType, module: u32, payload: &[u8], bin: &Exp) {
    packer.write_array_header(5);
    packer.write_number(CALL);
    packer.write_number(return_type as i64);
    packer.write_number(module as i64);
    packer.write_packed(payload);
    compile(bin, packer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ctx, MapReturnType, RegexFlags};

    #[test]
    fn test_literals() {
        assert_eq!(Exp::val(true).build().bytes(), &[0xc3]);
        assert_eq!(Exp::val(10).build().bytes(), &[0x0a]);
        assert_eq!(Exp::nil().build().bytes(), &[0xc0]);
        let mut expected = vec![0xcb];
        expected.extend_from_slice(&10.0f64.to_be_bytes());
        assert_eq!(Exp::val(10.0).build().bytes(), expected.as_slice());
    }

    #[test]
    fn test_list_literal_is_quoted() {
        assert_eq!(
            Exp::val(Value::list([1, 2])).build().bytes(),
            &[0x92, 0x7e, 0x92, 0x01, 0x02]
        );
    }

    #[test]
    fn test_loop_vars() {
        assert_eq!(
            Exp::int_loop_var(LoopVarPart::Value).build().bytes(),
            &[0x93, 0x7a, 0x02, 0x01]
        );
        assert_eq!(
            Exp::string_loop_var(LoopVarPart::MapKey).build().bytes(),
            &[0x93, 0x7a, 0x03, 0x00]
        );
        assert_eq!(
            Exp::geo_json_loop_var(LoopVarPart::Value).build().bytes(),
            &[0x93, 0x7a, 0x08, 0x01]
        );
    }

    #[test]
    fn test_index_loop_var_is_always_int() {
        let as_int = Exp::int_loop_var(LoopVarPart::Index).build();
        assert_eq!(as_int.bytes(), &[0x93, 0x7a, 0x02, 0x02]);
        assert_eq!(Exp::string_loop_var(LoopVarPart::Index).build(), as_int);
        assert_eq!(Exp::map_loop_var(LoopVarPart::Index).build(), as_int);
    }

    #[test]
    fn test_comparison_and_arith() {
        // value > 10
        assert_eq!(
            Exp::gt(Exp::int_loop_var(LoopVarPart::Value), Exp::val(10)).build().bytes(),
            &[0x93, 0x03, 0x93, 0x7a, 0x02, 0x01, 0x0a]
        );
        // value * 2
        assert_eq!(
            Exp::mul(Exp::int_loop_var(LoopVarPart::Value), Exp::val(2)).build().bytes(),
            &[0x93, 0x16, 0x93, 0x7a, 0x02, 0x01, 0x02]
        );
        assert_eq!(Exp::ne(Exp::val(1), Exp::val(2)).build().bytes(), &[0x93, 0x02, 0x01, 0x02]);
        assert_eq!(Exp::not(Exp::val(false)).build().bytes(), &[0x92, 0x12, 0xc2]);
    }

    #[test]
    fn test_bool_combinator_is_n_ary() {
        let exp = Exp::or([Exp::val(1), Exp::val(2), Exp::val(3)]);
        assert_eq!(exp.build().bytes(), &[0x94, 0x11, 0x01, 0x02, 0x03]);
        let exp = Exp::and([Exp::val(true), Exp::val(false)]);
        assert_eq!(exp.build().bytes(), &[0x93, 0x10, 0xc3, 0xc2]);
    }

    #[test]
    fn test_regex_layout() {
        let exp = Exp::regex_compare(
            "10000.*",
            RegexFlags::ICASE | RegexFlags::NEWLINE,
            Exp::string_loop_var(LoopVarPart::MapKey),
        );
        let mut expected = vec![0x94, 0x07, 0x0a, 0xa7];
        expected.extend_from_slice(b"10000.*");
        expected.extend_from_slice(&[0x93, 0x7a, 0x03, 0x00]);
        assert_eq!(exp.build().bytes(), expected.as_slice());
    }

    #[test]
    fn test_geo_layout() {
        let exp = Exp::geo_compare(Exp::geo_json_loop_var(LoopVarPart::Value), Exp::geo("{}"));
        assert_eq!(
            exp.build().bytes(),
            &[0x93, 0x08, 0x93, 0x7a, 0x08, 0x01, 0xa3, 0x17, b'{', b'}']
        );
    }

    #[test]
    fn test_remove_marker() {
        assert_eq!(Exp::remove_result().build().bytes(), &[0x91, 0x64]);
    }

    #[test]
    fn test_bin() {
        assert_eq!(
            Exp::map_bin("res1").build().bytes(),
            &[0x93, 0x51, 0x05, 0xa4, b'r', b'e', b's', b'1']
        );
    }

    #[test]
    fn test_map_get_by_key() {
        let exp = Exp::map_get_by_key(
            MapReturnType::Value,
            ExpType::Float,
            Exp::val("price"),
            Exp::map_loop_var(LoopVarPart::Value),
            &[],
        );
        let expected = [
            0x95, 0x7f, 0x07, 0x00, // call, float, module 0
            0x93, 0x61, 0x07, 0xa6, 0x03, b'p', b'r', b'i', b'c', b'e', // [97, VALUE, "price"]
            0x93, 0x7a, 0x05, 0x01, // map loop var value
        ];
        assert_eq!(exp.build().bytes(), &expected);
    }

    #[test]
    fn test_map_get_by_key_with_nested_context() {
        let exp = Exp::map_get_by_key(
            MapReturnType::Value,
            ExpType::Int,
            Exp::val("qty"),
            Exp::map_bin("m"),
            &[Ctx::map_key("inner")],
        );
        let expected = [
            0x95, 0x7f, 0x02, 0x00, //
            0x93, 0xcc, 0xff, // context eval
            0x92, 0x22, 0xa6, 0x03, b'i', b'n', b'n', b'e', b'r', //
            0x93, 0x61, 0x07, 0xa4, 0x03, b'q', b't', b'y', //
            0x93, 0x51, 0x05, 0xa1, b'm',
        ];
        assert_eq!(exp.build().bytes(), &expected);
    }

    #[test]
    fn test_list_size() {
        let exp = Exp::list_size(Exp::list_bin("l"), &[]);
        assert_eq!(
            exp.build().bytes(),
            &[0x95, 0x7f, 0x02, 0x00, 0x91, 0x10, 0x93, 0x51, 0x04, 0xa1, b'l']
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let exp = Exp::and([
            Exp::gt(Exp::int_loop_var(LoopVarPart::Value), Exp::val(5)),
            Exp::lt(Exp::int_loop_var(LoopVarPart::Value), Exp::val(50)),
        ]);
        assert_eq!(exp.build(), exp.clone().build());
    }
}
