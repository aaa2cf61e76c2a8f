//! Binary encoding for expressions, context chains and values.
//!
//! Output is the server's MessagePack dialect: strings carry a particle-type
//! byte and maps lead with an order marker.

pub mod ctx;
pub mod exp;
pub mod primitives;
pub mod value;

pub use ctx::{
    CONTEXT_EVAL, DecodeOptions, ctx_from_base64, ctx_from_base64_with_options, ctx_to_base64,
    decode_ctx, encode_context_eval, encode_ctx,
};
pub use exp::compile;
pub use primitives::{Packer, Unpacker};
pub use value::{decode_value, encode_value};
