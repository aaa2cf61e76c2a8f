//! Value packing/unpacking.
//!
//! Strings, blobs and GeoJSON carry a particle-type byte. Maps are packed as
//! key-ordered maps: an extra leading entry holds the order marker.

use rustc_hash::FxHashSet;

use crate::codec::primitives::{
    ARRAY16, ARRAY32, BIN16, BIN32, BIN8, EXT16, EXT32, EXT8, FALSE, FLOAT32, FLOAT64, MAP16,
    MAP32, NIL, Packer, STR16, STR32, STR8, TRUE, Unpacker,
};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_COLLECTION_LEN, MAX_NESTING_DEPTH, MAX_STRING_LEN};
use crate::model::{ParticleType, Value, ValueMap};

/// Map attribute flag for key-ordered maps.
const MAP_KEY_ORDERED: u8 = 0x01;

// =============================================================================
// ENCODING
// =============================================================================

/// Packs a value.
pub fn encode_value(packer: &mut Packer, value: &Value) {
    match value {
        Value::Nil => packer.write_nil(),
        Value::Bool(b) => packer.write_bool(*b),
        Value::Int(i) => packer.write_number(*i),
        Value::Float(f) => packer.write_double(*f),
        Value::String(s) => packer.write_particle_string(ParticleType::String as u8, s),
        Value::Bytes(b) => packer.write_particle_bytes(ParticleType::Blob as u8, b),
        Value::GeoJson(s) => packer.write_particle_string(ParticleType::GeoJson as u8, s),
        Value::List(items) => {
            packer.write_array_header(items.len());
            for item in items {
                encode_value(packer, item);
            }
        }
        Value::Map(map) => encode_map(packer, map),
    }
}

fn encode_map(packer: &mut Packer, map: &ValueMap) {
    packer.write_map_header(map.len() + 1);
    packer.write_ext_marker(MAP_KEY_ORDERED);
    packer.write_nil();
    for (k, v) in map {
        encode_value(packer, k);
        encode_value(packer, v);
    }
}

/// Checks `value`, found `depth` containers deep, against the decoder's
/// default limits.
pub(crate) fn check_value_limits(value: &Value, depth: usize) -> Result<(), EncodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(EncodeError::DepthExceeded { max: MAX_NESTING_DEPTH });
    }
    // Particle-typed bodies count their type byte.
    match value {
        Value::String(s) | Value::GeoJson(s) => {
            check_encode_len("string", s.len() + 1, MAX_STRING_LEN)
        }
        Value::Bytes(b) => check_encode_len("bytes", b.len() + 1, MAX_STRING_LEN),
        Value::List(items) => {
            check_encode_len("list", items.len(), MAX_COLLECTION_LEN)?;
            items.iter().try_for_each(|item| check_value_limits(item, depth + 1))
        }
        Value::Map(map) => {
            check_encode_len("map", map.len() + 1, MAX_COLLECTION_LEN)?;
            map.iter().try_for_each(|(k, v)| {
                check_value_limits(k, depth + 1)?;
                check_value_limits(v, depth + 1)
            })
        }
        Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(()),
    }
}

fn check_encode_len(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Unpacks one value, descending at most `max_depth` container levels.
pub fn decode_value(unpacker: &mut Unpacker<'_>, max_depth: usize) -> Result<Value, DecodeError> {
    decode_value_at(unpacker, 0, max_depth)
}

fn decode_value_at(
    unpacker: &mut Unpacker<'_>,
    depth: usize,
    max_depth: usize,
) -> Result<Value, DecodeError> {
    if depth > max_depth {
        return Err(DecodeError::DepthExceeded { max: max_depth });
    }
    let marker = unpacker.read_byte("value")?;
    if let Some(int) = unpacker.read_number_body(marker, "value") {
        return int.map(Value::Int);
    }
    match marker {
        NIL => Ok(Value::Nil),
        FALSE => Ok(Value::Bool(false)),
        TRUE => Ok(Value::Bool(true)),
        FLOAT32 => {
            let bits = unpacker.read_u32("float32")?;
            Ok(Value::Float(f32::from_bits(bits) as f64))
        }
        FLOAT64 => {
            let bits = unpacker.read_u64("float64")?;
            Ok(Value::Float(f64::from_bits(bits)))
        }
        0xa0..=0xbf => decode_particle(unpacker, (marker & 0x1f) as usize),
        STR8 => {
            let len = unpacker.read_byte("string length")? as usize;
            decode_particle(unpacker, len)
        }
        STR16 => {
            let len = unpacker.read_u16("string length")? as usize;
            decode_particle(unpacker, len)
        }
        STR32 => {
            let len = unpacker.read_u32("string length")? as usize;
            decode_particle(unpacker, len)
        }
        BIN8 | BIN16 | BIN32 => {
            let len = match marker {
                BIN8 => unpacker.read_byte("bytes length")? as usize,
                BIN16 => unpacker.read_u16("bytes length")? as usize,
                _ => unpacker.read_u32("bytes length")? as usize,
            };
            check_len("bytes", len, MAX_STRING_LEN)?;
            Ok(Value::Bytes(unpacker.read_bytes(len, "bytes")?.to_vec()))
        }
        0x90..=0x9f => decode_list(unpacker, (marker & 0x0f) as usize, depth, max_depth),
        ARRAY16 => {
            let len = unpacker.read_u16("list length")? as usize;
            decode_list(unpacker, len, depth, max_depth)
        }
        ARRAY32 => {
            let len = unpacker.read_u32("list length")? as usize;
            decode_list(unpacker, len, depth, max_depth)
        }
        0x80..=0x8f => decode_map(unpacker, (marker & 0x0f) as usize, depth, max_depth),
        MAP16 => {
            let len = unpacker.read_u16("map length")? as usize;
            decode_map(unpacker, len, depth, max_depth)
        }
        MAP32 => {
            let len = unpacker.read_u32("map length")? as usize;
            decode_map(unpacker, len, depth, max_depth)
        }
        _ => Err(DecodeError::InvalidMarker { marker, context: "value" }),
    }
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), DecodeError> {
    if len > max {
        return Err(DecodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

/// Decodes a string body whose first byte is the particle type.
fn decode_particle(unpacker: &mut Unpacker<'_>, len: usize) -> Result<Value, DecodeError> {
    check_len("string", len, MAX_STRING_LEN)?;
    if len == 0 {
        return Ok(Value::String(String::new()));
    }
    let particle_type = unpacker.read_byte("particle type")?;
    let body = unpacker.read_bytes(len - 1, "string")?;
    let text = |field| {
        std::str::from_utf8(body)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    };
    match ParticleType::from_u8(particle_type) {
        Some(ParticleType::String) => text("string").map(Value::String),
        Some(ParticleType::GeoJson) => text("geojson").map(Value::GeoJson),
        Some(ParticleType::Blob) => Ok(Value::Bytes(body.to_vec())),
        _ => Err(DecodeError::UnknownParticleType { particle_type }),
    }
}

fn decode_list(
    unpacker: &mut Unpacker<'_>,
    len: usize,
    depth: usize,
    max_depth: usize,
) -> Result<Value, DecodeError> {
    check_len("list", len, MAX_COLLECTION_LEN)?;
    // Every element takes at least one byte.
    check_len("list", len, unpacker.remaining_len())?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(decode_value_at(unpacker, depth + 1, max_depth)?);
    }
    Ok(Value::List(items))
}

fn is_ext_marker(marker: u8) -> bool {
    matches!(marker, EXT8 | EXT16 | EXT32 | 0xd4..=0xd8)
}

fn decode_map(
    unpacker: &mut Unpacker<'_>,
    len: usize,
    depth: usize,
    max_depth: usize,
) -> Result<Value, DecodeError> {
    check_len("map", len, MAX_COLLECTION_LEN)?;
    check_len("map", len, unpacker.remaining_len() / 2)?;
    let mut map = ValueMap::new();
    let mut seen: FxHashSet<Vec<u8>> = FxHashSet::default();
    for i in 0..len {
        // The order marker may only lead the map.
        if i == 0 && is_ext_marker(unpacker.peek_byte("map key")?) {
            unpacker.read_raw_object(0, "map order")?;
            unpacker.read_raw_object(max_depth, "map order")?;
            continue;
        }
        let key = decode_value_at(unpacker, depth + 1, max_depth)?;
        // Compare re-packed keys so alternate encodings of one key collide.
        let mut canonical = Packer::new();
        encode_value(&mut canonical, &key);
        if !seen.insert(canonical.into_bytes()) {
            return Err(DecodeError::DuplicateMapKey);
        }
        let value = decode_value_at(unpacker, depth + 1, max_depth)?;
        map.insert(key, value);
    }
    Ok(Value::Map(map))
}
