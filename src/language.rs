//! Script detection for laying out generated cards.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static RE_ARABIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}]")
        .unwrap()
});

// Arabic blocks plus Hebrew.
static RE_RTL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}\x{0590}-\x{05FF}\x{FB1D}-\x{FB4F}]",
    )
    .unwrap()
});

/// Layout direction of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        })
    }
}

/// True if `text` contains any Arabic-script character.
pub fn is_arabic(text: &str) -> bool {
    RE_ARABIC.is_match(text)
}

/// True if `text` contains any Arabic or Hebrew character.
pub fn is_rtl(text: &str) -> bool {
    RE_RTL.is_match(text)
}

pub fn text_direction(text: &str) -> TextDirection {
    if is_rtl(text) {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}
