//! Response normalisation: turn the model's JSON reply into flashcards.
//!
//! Even in JSON mode a model occasionally wraps its answer in a Markdown
//! code fence, renames the top-level key, or emits an entry without an
//! answer. The rules below accept what can be used and reject the rest:
//!
//! 1. Strip one outer code fence (```` ```json ... ``` ````) and a BOM.
//! 2. Parse; the top level must be a JSON object.
//! 3. Take `flashcards`, or `cards` when `flashcards` is absent or null.
//!    The chosen value must be an array.
//! 4. Keep entries with non-blank string `question` and `answer`; drop the
//!    rest with a warning.
//! 5. `Exact(n)`: keep the first `n`; fewer than `n` adds a shortfall
//!    warning. `Auto`: keep everything.

use crate::config::CardCount;
use crate::error::Pdf2CardsError;
use crate::output::Flashcard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Parse `content` and apply the count policy.
///
/// Returns the kept cards and any non-fatal warnings.
pub fn normalize_response(
    content: &str,
    count: CardCount,
) -> Result<(Vec<Flashcard>, Vec<String>), Pdf2CardsError> {
    let body = strip_code_fence(content);
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| Pdf2CardsError::InvalidResponseShape {
            detail: format!("response is not valid JSON: {e}"),
        })?;

    let entries = card_array(&parsed)?;
    let mut warnings = Vec::new();

    let mut cards: Vec<Flashcard> = entries.iter().filter_map(to_flashcard).collect();
    let dropped = entries.len() - cards.len();
    if dropped > 0 {
        let msg = format!("Dropped {dropped} malformed flashcard entries from the model response");
        warn!("{}", msg);
        warnings.push(msg);
    }

    if let CardCount::Exact(n) = count {
        cards.truncate(n);
        if cards.len() < n {
            let msg = format!(
                "Requested {n} flashcards but only {} were generated. The content may not be sufficient for {n} cards.",
                cards.len()
            );
            warn!("{}", msg);
            warnings.push(msg);
        }
    }

    Ok((cards, warnings))
}

// ── Rule 1: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fence(input: &str) -> &str {
    let trimmed = input.trim().trim_start_matches('\u{feff}');
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

// ── Rules 2-3: Locate the card array ─────────────────────────────────────────

fn card_array(parsed: &Value) -> Result<&Vec<Value>, Pdf2CardsError> {
    let object = parsed
        .as_object()
        .ok_or_else(|| Pdf2CardsError::InvalidResponseShape {
            detail: format!("expected a JSON object, got {}", kind_of(parsed)),
        })?;

    let (key, value) = match object.get("flashcards").filter(|v| !v.is_null()) {
        Some(v) => ("flashcards", v),
        None => match object.get("cards") {
            Some(v) => ("cards", v),
            None => {
                return Err(Pdf2CardsError::InvalidResponseShape {
                    detail: "missing \"flashcards\" array".into(),
                })
            }
        },
    };

    value
        .as_array()
        .ok_or_else(|| Pdf2CardsError::InvalidResponseShape {
            detail: format!("\"{key}\" must be an array, got {}", kind_of(value)),
        })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Rule 4: Entry validation ─────────────────────────────────────────────────

fn to_flashcard(entry: &Value) -> Option<Flashcard> {
    let question = entry.get("question")?.as_str()?;
    let answer = entry.get("answer")?.as_str()?;
    if question.trim().is_empty() || answer.trim().is_empty() {
        return None;
    }
    Some(Flashcard::new(question, answer))
}
