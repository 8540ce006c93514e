//! Prompt composition for flashcard generation.
//!
//! Every instruction sent to the completion model is assembled here so the
//! wording can be inspected in unit tests without a live model. Callers can
//! override the system prompt via [`crate::config::PipelineConfig::system_prompt`];
//! the user prompt is always built by [`compose_user_prompt`].
//!
//! Composition is a pure function of `(text, count, preferences)` and never
//! fails: unrecognised preference values fall through to default guidance.

use crate::config::{CardCount, CardType, FlashcardPreferences, TextLength};
use std::ops::RangeInclusive;

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that creates educational flashcards from text content. \
Generate clear, concise flashcards that help students learn and retain information. \
Each flashcard should have a question and a detailed answer. \
IMPORTANT: Always generate flashcards in the SAME LANGUAGE as the input text. \
If the text is in Arabic, generate Arabic flashcards. If it's in English, generate English flashcards. \
Preserve the original language of the content.";

/// Output-format contract appended to every user prompt.
pub const JSON_FORMAT_INSTRUCTION: &str = "Return ONLY a valid JSON object with a \"flashcards\" array containing objects with \"question\" and \"answer\" fields. \
Format: {\"flashcards\": [{\"question\": \"...\", \"answer\": \"...\"}]}";

/// Instruction used when the caller wants the input language mirrored.
pub const MIRROR_LANGUAGE_INSTRUCTION: &str =
    "Detect the language of the text and generate flashcards in the SAME LANGUAGE.";

/// Appended for cloze cards.
pub const CLOZE_INSTRUCTION: &str = " Use cloze deletion format where appropriate (e.g., 'The {{c1::mitochondria}} is the powerhouse of the cell').";

/// Which side of the card a length hint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSide {
    Front,
    Back,
}

/// Fixed guidance text for a length preference on one side of the card.
pub fn length_guidance(length: &TextLength, side: CardSide) -> &'static str {
    match (side, length) {
        (CardSide::Front, TextLength::Short) => {
            "very brief, just the topic name or 2-3 words (e.g., 'Ionic Bonding')"
        }
        (CardSide::Front, TextLength::Medium) => {
            "concise, one clear sentence describing what to explain (e.g., 'Describe the process of ionic bonding')"
        }
        (CardSide::Front, TextLength::Long) => {
            "detailed, multiple sentences with specific aspects to address (e.g., 'Describe the process of ionic bonding and how it relates to the formation of positive and negative ions. Explain the factors that contribute to the strength of ionic bonding.')"
        }
        (CardSide::Front, TextLength::Other(_)) => "concise, one clear sentence",
        (CardSide::Back, TextLength::Short) => {
            "very concise, key terms or brief phrase only (e.g., 'Electrostatic attraction, oppositely charged ions, electron transfer')"
        }
        (CardSide::Back, TextLength::Medium) => {
            "moderately detailed, 1-2 sentences with main explanation (e.g., 'Ionic bonding occurs when metals lose electrons to form positive ions, and non-metals gain them, forming negative ions, leading to attraction.')"
        }
        (CardSide::Back, TextLength::Long) => {
            "comprehensive, 3-4 sentences with detailed explanation including factors and effects (e.g., 'Ionic bonding involves metal atoms losing electrons to form positive ions and non-metal atoms gaining electrons to form negative ions. The strength of ionic bonding is influenced by the size and charge of the ions involved. Smaller and/or higher charged ions result in stronger ionic bonding, leading to higher melting points.')"
        }
        (CardSide::Back, TextLength::Other(_)) => "moderately detailed, 1-2 sentences",
    }
}

/// The "IMPORTANT LENGTH REQUIREMENTS" block, or an empty string when no
/// side has a length preference.
pub fn length_instructions(prefs: &FlashcardPreferences) -> String {
    let front = prefs
        .front_length
        .as_ref()
        .map(|l| format!("Questions should be {}.", length_guidance(l, CardSide::Front)))
        .unwrap_or_default();
    let back = prefs
        .back_length
        .as_ref()
        .map(|l| format!("Answers should be {}.", length_guidance(l, CardSide::Back)))
        .unwrap_or_default();

    if front.is_empty() && back.is_empty() {
        String::new()
    } else {
        format!("\n\nIMPORTANT LENGTH REQUIREMENTS:\n{front}\n{back}")
    }
}

/// Language instruction: forced language, or mirror the input.
pub fn language_instruction(prefs: &FlashcardPreferences) -> String {
    match prefs.explicit_language() {
        Some(language) => format!("Generate all flashcards in {language}."),
        None => MIRROR_LANGUAGE_INSTRUCTION.to_string(),
    }
}

fn type_instruction(prefs: &FlashcardPreferences) -> &'static str {
    match prefs.card_type {
        Some(CardType::Cloze) => CLOZE_INSTRUCTION,
        _ => "",
    }
}

/// Build the user prompt for one generation call.
pub fn compose_user_prompt(
    text: &str,
    count: CardCount,
    prefs: &FlashcardPreferences,
    auto_range: &RangeInclusive<usize>,
) -> String {
    let opening = match count {
        CardCount::Auto => format!(
            "Analyze the following text and generate an appropriate number of flashcards based on the content length and key concepts (minimum {}, maximum {}).",
            auto_range.start(),
            auto_range.end()
        ),
        CardCount::Exact(n) => format!("Generate {n} flashcards from the following text."),
    };

    format!(
        "{opening} {language}{kind}{lengths} {format}\n\nText:\n{text}",
        language = language_instruction(prefs),
        kind = type_instruction(prefs),
        lengths = length_instructions(prefs),
        format = JSON_FORMAT_INSTRUCTION,
    )
}
