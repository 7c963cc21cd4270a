//! Dominant-language detection.
//!
//! The detected code only steers which language remote backends answer in.
//! Detection never fails: anything short or ambiguous reads as
//! [`LanguageCode::DEFAULT`].
//!
//! Non-Latin scripts map to a language directly. Latin-script text is
//! handed to a trigram model (`whatlang`) restricted to [`LATIN_LANGUAGES`].

use lazy_static::lazy_static;
use regex::Regex;
use whatlang::Lang;

use crate::types::LanguageCode;

/// Characters of a document inspected by default.
pub const DEFAULT_SAMPLE_CHARS: usize = 500;

/// Fewer alphabetic characters than this is "too short to tell".
const MIN_ALPHABETIC: usize = 3;

/// Latin-script samples with fewer letters stay on the default code.
const MIN_TRIGRAM_LETTERS: usize = 40;

/// Latin-script languages the trigram model may pick, with their ISO-639-1
/// codes.
pub const LATIN_LANGUAGES: &[(Lang, &str)] = &[
    (Lang::Eng, "en"),
    (Lang::Fra, "fr"),
    (Lang::Spa, "es"),
    (Lang::Deu, "de"),
    (Lang::Por, "pt"),
    (Lang::Ita, "it"),
    (Lang::Nld, "nl"),
    (Lang::Pol, "pl"),
    (Lang::Tur, "tr"),
    (Lang::Swe, "sv"),
];

lazy_static! {
    // Script classes restricted to letters so digits and punctuation
    // inside a script block do not skew the counts.
    static ref SCRIPTS: Vec<(&'static str, Regex)> = vec![
        ("hi", Regex::new(r"[\p{Devanagari}&&\p{Alphabetic}]").unwrap()),
        ("bn", Regex::new(r"[\p{Bengali}&&\p{Alphabetic}]").unwrap()),
        ("ta", Regex::new(r"[\p{Tamil}&&\p{Alphabetic}]").unwrap()),
        ("te", Regex::new(r"[\p{Telugu}&&\p{Alphabetic}]").unwrap()),
        ("gu", Regex::new(r"[\p{Gujarati}&&\p{Alphabetic}]").unwrap()),
        ("pa", Regex::new(r"[\p{Gurmukhi}&&\p{Alphabetic}]").unwrap()),
        ("kn", Regex::new(r"[\p{Kannada}&&\p{Alphabetic}]").unwrap()),
        ("ml", Regex::new(r"[\p{Malayalam}&&\p{Alphabetic}]").unwrap()),
        ("ar", Regex::new(r"[\p{Arabic}&&\p{Alphabetic}]").unwrap()),
        ("ko", Regex::new(r"[\p{Hangul}&&\p{Alphabetic}]").unwrap()),
        ("ru", Regex::new(r"[\p{Cyrillic}&&\p{Alphabetic}]").unwrap()),
        ("el", Regex::new(r"[\p{Greek}&&\p{Alphabetic}]").unwrap()),
    ];

    static ref LATIN: Regex = Regex::new(r"[\p{Latin}&&\p{Alphabetic}]").unwrap();

    static ref HAN: Regex = Regex::new(r"\p{Han}").unwrap();
    static ref KANA: Regex = Regex::new(r"[\p{Hiragana}\p{Katakana}]").unwrap();

    static ref TRIGRAMS: whatlang::Detector =
        whatlang::Detector::with_allowlist(LATIN_LANGUAGES.iter().map(|(lang, _)| *lang).collect());
}

/// Classifies the dominant language of a text sample.
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text`, returning the default code on failure.
    fn detect(&self, text: &str) -> LanguageCode;
}

/// Script-majority detector.
///
/// Counts letters per Unicode script in the first `sample_chars`
/// characters; a script holding more than half the letters decides. A
/// Latin majority is resolved by the trigram model, falling back to
/// [`LanguageCode::DEFAULT`] when the sample is short or the model is not
/// confident.
#[derive(Debug, Clone)]
pub struct ScriptLanguageDetector {
    sample_chars: usize,
}

impl ScriptLanguageDetector {
    pub fn new() -> Self {
        Self::with_sample(DEFAULT_SAMPLE_CHARS)
    }

    pub fn with_sample(sample_chars: usize) -> Self {
        Self { sample_chars }
    }

    fn classify(sample: &str) -> Option<&'static str> {
        let letters = sample.chars().filter(|c| c.is_alphabetic()).count();
        if letters < MIN_ALPHABETIC {
            return None;
        }

        let majority = |count: usize| count * 2 > letters;

        // Japanese mixes kana with Han; any meaningful kana share tips it.
        let kana = KANA.find_iter(sample).count();
        let han = HAN.find_iter(sample).count();
        if kana * 10 >= letters && majority(kana + han) {
            return Some("ja");
        }
        if majority(han) {
            return Some("zh");
        }

        if let Some((code, _)) = SCRIPTS
            .iter()
            .find(|(_, script)| majority(script.find_iter(sample).count()))
        {
            return Some(*code);
        }

        let latin = LATIN.find_iter(sample).count();
        majority(latin).then(|| Self::latin_language(sample, latin))
    }

    fn latin_language(sample: &str, latin_letters: usize) -> &'static str {
        if latin_letters < MIN_TRIGRAM_LETTERS {
            return LanguageCode::DEFAULT;
        }

        let Some(info) = TRIGRAMS.detect(sample) else {
            return LanguageCode::DEFAULT;
        };
        if !info.is_reliable() {
            tracing::debug!(
                guess = info.lang().code(),
                confidence = info.confidence(),
                "Trigram guess not reliable, using default"
            );
            return LanguageCode::DEFAULT;
        }

        LATIN_LANGUAGES
            .iter()
            .find(|(lang, _)| *lang == info.lang())
            .map(|(_, code)| *code)
            .unwrap_or(LanguageCode::DEFAULT)
    }
}

impl Default for ScriptLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for ScriptLanguageDetector {
    fn detect(&self, text: &str) -> LanguageCode {
        let sample: String = text.chars().take(self.sample_chars).collect();

        match Self::classify(&sample) {
            Some(code) => LanguageCode::new(code),
            None => {
                tracing::debug!(
                    sample_len = sample.len(),
                    "Language undetermined, using default"
                );
                LanguageCode::default()
            }
        }
    }
}

/// Detect with the default detector and sample size.
pub fn detect_language(text: &str) -> LanguageCode {
    ScriptLanguageDetector::new().detect(text)
}
