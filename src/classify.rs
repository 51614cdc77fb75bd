//! Pure payload classification: content vs control vs malformed.

use crate::error::MalformedReason;
use serde::Deserialize;
use serde_json::Value;

/// Minimal view over a decoded payload: only the fields classification needs.
/// Extra fields are ignored by serde.
#[derive(Debug, Deserialize)]
struct MinimalView {
    id: Option<Value>,
    delete: Option<Value>,
}

/// Outcome of classifying one raw payload. No side effects; the caller
/// decides persistence and logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// A record carrying an identifier; the raw payload is worth persisting.
    Content { id: String },
    /// Feed-protocol chatter (e.g. a deletion notice): counted, not persisted.
    Control,
    /// Unparsable or shapeless input, to be counted and quarantined.
    Malformed {
        reason: MalformedReason,
        detail: String,
    },
}

/// Classify one raw payload.
///
/// An explicit JSON `null` identifier counts as absent: a record that says
/// `{"id": null}` has nothing to shard on.
pub fn classify(payload: &str) -> Classified {
    let view: MinimalView = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            return Classified::Malformed {
                reason: MalformedReason::Parse,
                detail: truncate_detail(&e.to_string()),
            }
        }
    };

    if let Some(id) = view.id.filter(|v| !v.is_null()) {
        return Classified::Content { id: id_text(&id) };
    }
    if view.delete.filter(|v| !v.is_null()).is_some() {
        return Classified::Control;
    }
    Classified::Malformed {
        reason: MalformedReason::UnrecognizedShape,
        detail: "no identifier or control marker".to_string(),
    }
}

fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep reason keys short; parse errors embed arbitrary payload text.
fn truncate_detail(msg: &str) -> String {
    const MAX: usize = 120;
    if msg.len() <= MAX {
        return msg.to_string();
    }
    let mut cut = MAX;
    while !msg.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &msg[..cut])
}
