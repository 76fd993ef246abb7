//! Deterministic JSON formatting for manifests
//!
//! Objects are expanded one key per line in their stored order. Arrays that
//! hold only scalars stay on one line when they fit in [`MAX_WIDTH`] columns,
//! which keeps `tags` and short `steps` lists readable in diffs.

use serde_json::Value;

/// Column limit for inlined arrays
pub const MAX_WIDTH: usize = 80;

const INDENT: &str = "  ";

/// Render a value as pretty-printed JSON text, without a trailing newline
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, 0);
    out
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize, column: usize) {
    match value {
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            if items.iter().all(is_scalar) {
                let inline = format!(
                    "[{}]",
                    items
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                // One extra column for a trailing comma
                if column + inline.len() < MAX_WIDTH {
                    out.push_str(&inline);
                    return;
                }
            }

            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                push_indent(out, depth + 1);
                write_value(out, item, depth + 1, (depth + 1) * INDENT.len());
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                push_indent(out, depth + 1);
                let key = Value::String(key.clone()).to_string();
                out.push_str(&key);
                out.push_str(": ");
                let column = (depth + 1) * INDENT.len() + key.len() + 2;
                write_value(out, item, depth + 1, column);
                if i + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
