// Script-based language detection and Arabic orthography normalization.
//
// This is not real language identification. Text is classified by the
// scripts it contains: any code point in the Arabic blocks makes it Arabic,
// otherwise it is treated as English. Good enough to pick per-language
// thresholds, which is all the policy engine needs.

use serde::{Deserialize, Serialize};

/// Detected script classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageTag {
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl LanguageTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Arabic => "ar",
            LanguageTag::English => "en",
        }
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Arabic, Arabic Supplement, Arabic Extended-A and both presentation-form blocks.
fn is_arabic_char(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// Tashkeel marks plus the superscript alef.
fn is_arabic_diacritic(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

/// Canonical form for letter variants. `None` means the letter is dropped.
fn fold_arabic_letter(c: char) -> Option<char> {
    match c {
        // Alef with hamza above / below, alef with madda
        'أ' | 'إ' | 'آ' => Some('ا'),
        // Waw with hamza
        'ؤ' => Some('و'),
        // Ya with hamza, alef maqsura
        'ئ' | 'ى' => Some('ي'),
        // Standalone hamza
        'ء' => None,
        other => Some(other),
    }
}

/// Classify text as Arabic or English.
///
/// Empty or whitespace-only text is English. Any Arabic code point wins over
/// Latin letters, so mixed text is reported as Arabic here; use
/// [`primary_language`] to weigh the two scripts against each other.
pub fn detect_language(text: &str) -> LanguageTag {
    let text = text.trim();
    if text.is_empty() {
        return LanguageTag::English;
    }
    if text.chars().any(is_arabic_char) {
        return LanguageTag::Arabic;
    }
    // Latin letters or nothing recognisable: both end up English.
    LanguageTag::English
}

pub fn is_arabic(text: &str) -> bool {
    detect_language(text) == LanguageTag::Arabic
}

pub fn is_english(text: &str) -> bool {
    detect_language(text) == LanguageTag::English
}

/// True when the text contains both an Arabic code point and a Latin letter.
pub fn is_multilingual(text: &str) -> bool {
    text.chars().any(is_arabic_char) && text.chars().any(is_latin_letter)
}

/// The dominant script of mixed text, counted per code point.
///
/// Ties go to Arabic. Single-script text falls back to [`detect_language`].
pub fn primary_language(text: &str) -> LanguageTag {
    if !is_multilingual(text) {
        return detect_language(text);
    }

    let (arabic, latin) = text.chars().fold((0usize, 0usize), |(ar, en), c| {
        if is_arabic_char(c) {
            (ar + 1, en)
        } else if is_latin_letter(c) {
            (ar, en + 1)
        } else {
            (ar, en)
        }
    });

    if arabic >= latin {
        LanguageTag::Arabic
    } else {
        LanguageTag::English
    }
}

/// Fold letter variants to their canonical form and strip diacritics.
///
/// Non-Arabic characters pass through untouched, and the result is a fixed
/// point: normalizing it again returns the same string.
pub fn normalize_arabic_text(text: &str) -> String {
    text.chars()
        .filter_map(fold_arabic_letter)
        .filter(|c| !is_arabic_diacritic(*c))
        .collect()
}
