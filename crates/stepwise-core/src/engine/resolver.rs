//! Variable resolution: `{{ path }}` substitution over JSON values.
//!
//! `resolve` walks an arbitrary JSON value and replaces every
//! `{{ path.to.value }}` token found in string leaves with the value looked
//! up from the execution context. Unknown references are left verbatim
//! (not an error), so the same config can be resolved again once later
//! steps have populated the context.

use serde_json::{Map, Value};

use super::context::ExecutionContext;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every `{{ path }}` reference in `value` against `ctx`.
///
/// Total function, never fails:
/// - non-string scalars pass through unchanged
/// - strings are scanned for non-overlapping tokens; each fully resolved
///   path substitutes the value's string form, anything else stays verbatim
/// - arrays resolve element-wise, objects value-wise (keys untouched),
///   both preserving order and shape
#[must_use]
pub fn resolve(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_string(s, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, ctx)).collect()),
        Value::Object(entries) => {
            let mut out = Map::new();
            for (key, v) in entries {
                out.insert(key.clone(), resolve(v, ctx));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Substitute `{{ path }}` tokens in a single string.
///
/// Scans left to right, so occurrences never overlap. An unresolved token is
/// emitted verbatim, delimiters included, and scanning continues after it.
fn resolve_string(input: &str, ctx: &ExecutionContext) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(close) = after_open.find("}}") else {
            // No closing delimiter: the remainder is literal text.
            break;
        };

        out.push_str(&rest[..start]);
        let path = after_open[..close].trim();
        match ctx.lookup(path) {
            Some(value) => out.push_str(&value_to_string(value)),
            None => out.push_str(&rest[start..start + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}

/// Convert a JSON value to its substitution string form.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // For objects/arrays, substitute compact JSON
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
