//! Prints the segments of a persisted (Base64) context chain.

use cdt_path::{CtxKind, CtxPayload, Value, ctx_from_base64};

fn format_value(v: &Value) -> String {
    match v {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => format!("{}", b),
        Value::Int(i) => format!("{}", i),
        Value::Float(f) => format!("{:.6}", f),
        Value::String(s) => {
            let preview: String = s.chars().take(40).collect();
            if s.chars().count() > 40 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::Bytes(b) => format!("BYTES[{}]", b.len()),
        Value::GeoJson(s) => format!("GEOJSON({})", s),
        Value::List(items) => {
            let parts: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(map) => {
            let parts: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", format_value(k), format_value(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

fn main() {
    let Some(text) = std::env::args().nth(1) else {
        eprintln!("usage: inspect_ctx <base64>");
        std::process::exit(2);
    };

    let ctx = match ctx_from_base64(&text) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {} (code {})", e, e.code().code());
            std::process::exit(1);
        }
    };

    println!("=== Context ({} segments) ===", ctx.len());
    for (i, segment) in ctx.iter().enumerate() {
        let kind = segment
            .kind()
            .map(|k| format!("{:?}", k))
            .unwrap_or_else(|| "?".to_string());
        let payload = match segment.payload() {
            CtxPayload::Literal(v) => format_value(v),
            CtxPayload::Filtered(exp) if exp.bytes() == [0xc3] => "*".to_string(),
            CtxPayload::Filtered(exp) => {
                let hex: Vec<_> = exp.bytes().iter().map(|b| format!("{:02x}", b)).collect();
                format!("filter[{}]", hex.join(" "))
            }
        };
        let create = match segment.kind() {
            Some(CtxKind::AllChildren) => "",
            _ if segment.id() & 0xc0 != 0 => " (create)",
            _ => "",
        };
        println!("  {:>3}  0x{:02x}  {:<12} {}{}", i, segment.id(), kind, payload, create);
    }
}
