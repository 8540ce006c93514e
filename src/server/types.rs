//! Request and response bodies for the HTTP API.
//!
//! Request fields arrive from a browser form and are loosely typed: `count`
//! may be a number, a numeric string or `"auto"`, and preference values may be
//! missing, empty or of the wrong type. Parsing is lenient: anything unusable
//! falls back to a default rather than failing the request.

use crate::config::{CardCount, CardType, FlashcardPreferences, TextLength};
use crate::language::TextDirection;
use crate::output::Flashcard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Requests ─────────────────────────────────────────────────────────────

/// `POST /process-pdf`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessPdfRequest {
    /// Base64-encoded PDF.
    pub file_data: Option<String>,
    /// Original file name, only logged.
    pub file_name: Option<Value>,
    pub count: Option<Value>,
    pub preferences: Option<Value>,
    pub flashcard_type: Option<Value>,
    pub language: Option<Value>,
}

impl ProcessPdfRequest {
    pub fn card_preferences(&self) -> FlashcardPreferences {
        merge_preferences(
            self.preferences.as_ref(),
            self.language.as_ref(),
            self.flashcard_type.as_ref(),
        )
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_ref().and_then(Value::as_str)
    }
}

/// `POST /generate-flashcards`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateFlashcardsRequest {
    /// Must be a non-empty string; anything else is rejected.
    pub text: Option<Value>,
    pub count: Option<Value>,
    pub preferences: Option<Value>,
    pub flashcard_type: Option<Value>,
    pub language: Option<Value>,
}

impl GenerateFlashcardsRequest {
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn card_preferences(&self) -> FlashcardPreferences {
        merge_preferences(
            self.preferences.as_ref(),
            self.language.as_ref(),
            self.flashcard_type.as_ref(),
        )
    }
}

static RE_LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());

/// Interpret the `count` field.
///
/// `"auto"` selects auto mode. A number, or a string starting with an
/// integer, selects that count when it is positive. Anything else, including
/// zero and negative values, selects `default_count`.
pub fn parse_count(value: Option<&Value>, default_count: usize) -> CardCount {
    let requested: Option<i64> = match value {
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("auto") => {
            return CardCount::Auto;
        }
        Some(Value::String(s)) => RE_LEADING_INT
            .captures(s)
            .and_then(|c| c[1].parse::<i64>().ok()),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        _ => None,
    };

    match requested {
        Some(n) if n > 0 => CardCount::Exact(usize::try_from(n).unwrap_or(usize::MAX)),
        _ => CardCount::Exact(default_count),
    }
}

/// Non-empty text form of a loosely typed value.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build preferences from the `preferences` object and the top-level
/// `language` / `flashcardType` fields. Top-level values win when present.
pub fn merge_preferences(
    preferences: Option<&Value>,
    language: Option<&Value>,
    flashcard_type: Option<&Value>,
) -> FlashcardPreferences {
    let object = preferences.and_then(Value::as_object);
    let field = |names: &[&str]| -> Option<String> {
        let object = object?;
        names
            .iter()
            .filter_map(|name| object.get(*name))
            .find_map(as_text)
    };

    let language = language
        .and_then(as_text)
        .or_else(|| field(&["language"]));
    let card_type = flashcard_type
        .and_then(as_text)
        .or_else(|| field(&["flashcardType", "type"]));

    FlashcardPreferences {
        front_length: field(&["frontTextLength", "frontLength"]).map(|s| TextLength::parse(&s)),
        back_length: field(&["backTextLength", "backLength"]).map(|s| TextLength::parse(&s)),
        language,
        card_type: card_type.map(|s| CardType::parse(&s)),
    }
}

// ── Responses ────────────────────────────────────────────────────────────

/// Facts about the processed PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    pub pages: usize,
    pub pages_processed: usize,
    pub skipped_pages: Vec<usize>,
    pub text_length: usize,
    pub text_direction: TextDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPdfResponse {
    pub success: bool,
    pub flashcards: Vec<Flashcard>,
    pub count: usize,
    pub pdf_info: PdfInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFlashcardsResponse {
    pub success: bool,
    pub flashcards: Vec<Flashcard>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthServices {
    pub openai: String,
    pub pdf_engine: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<HealthServices>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_auto() {
        assert_eq!(parse_count(Some(&json!("auto")), 10), CardCount::Auto);
        assert_eq!(parse_count(Some(&json!(" Auto ")), 10), CardCount::Auto);
    }

    #[test]
    fn count_numbers_and_numeric_strings() {
        assert_eq!(parse_count(Some(&json!(15)), 10), CardCount::Exact(15));
        assert_eq!(parse_count(Some(&json!("15")), 10), CardCount::Exact(15));
        assert_eq!(parse_count(Some(&json!("12 cards")), 10), CardCount::Exact(12));
        assert_eq!(parse_count(Some(&json!(7.9)), 10), CardCount::Exact(7));
    }

    #[test]
    fn count_falls_back_to_default() {
        for value in [
            json!(0),
            json!(-3),
            json!("0"),
            json!("-5"),
            json!("many"),
            json!(""),
            json!(null),
            json!(true),
            json!([5]),
            json!(0.4),
        ] {
            assert_eq!(
                parse_count(Some(&value), 10),
                CardCount::Exact(10),
                "value {value}"
            );
        }
        assert_eq!(parse_count(None, 10), CardCount::Exact(10));
    }

    #[test]
    fn preferences_from_object_with_aliases() {
        let prefs = merge_preferences(
            Some(&json!({ "frontTextLength": "Short", "backLength": "Long", "language": "German" })),
            None,
            None,
        );
        assert_eq!(prefs.front_length, Some(TextLength::Short));
        assert_eq!(prefs.back_length, Some(TextLength::Long));
        assert_eq!(prefs.language.as_deref(), Some("German"));
        assert_eq!(prefs.card_type, None);
    }

    #[test]
    fn top_level_fields_override_preferences() {
        let prefs = merge_preferences(
            Some(&json!({ "language": "German", "flashcardType": "Basic" })),
            Some(&json!("Arabic")),
            Some(&json!("Cloze")),
        );
        assert_eq!(prefs.language.as_deref(), Some("Arabic"));
        assert_eq!(prefs.card_type, Some(CardType::Cloze));
    }

    #[test]
    fn malformed_preferences_are_ignored_or_coerced() {
        let prefs = merge_preferences(
            Some(&json!({ "frontTextLength": 3, "backTextLength": "", "language": null })),
            Some(&json!(null)),
            None,
        );
        assert_eq!(prefs.front_length, Some(TextLength::Other("3".into())));
        assert_eq!(prefs.back_length, None);
        assert_eq!(prefs.language, None);

        let prefs = merge_preferences(Some(&json!("not an object")), None, None);
        assert_eq!(prefs, FlashcardPreferences::default());
    }

    #[test]
    fn text_must_be_a_string() {
        let req: GenerateFlashcardsRequest =
            serde_json::from_value(json!({ "text": 42 })).unwrap();
        assert_eq!(req.text(), None);

        let req: GenerateFlashcardsRequest =
            serde_json::from_value(json!({ "text": "cells" })).unwrap();
        assert_eq!(req.text(), Some("cells"));
    }

    #[test]
    fn response_uses_camel_case() {
        let resp = ProcessPdfResponse {
            success: true,
            flashcards: vec![Flashcard::new("q", "a")],
            count: 1,
            pdf_info: PdfInfo {
                pages: 3,
                pages_processed: 3,
                skipped_pages: vec![],
                text_length: 120,
                text_direction: TextDirection::Ltr,
            },
            warnings: vec![],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["pdfInfo"]["textLength"], 120);
        assert_eq!(json["pdfInfo"]["textDirection"], "ltr");
        assert!(json.get("warnings").is_none());
    }
}
