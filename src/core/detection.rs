//! Lightweight source-language detection and language-pair decision.
//!
//! Detection is a character-set heuristic; precise detection is left to the
//! translation backends, which report a detected language of their own.

use isolang::Language;

use crate::shared::settings::LanguageSettings;
use crate::shared::types::parse_lang;

/// Detect the dominant script of `text` and map it to a language.
pub fn detect_language(text: &str) -> Language {
    let has_chinese = text.chars().any(|c| {
        ('\u{4E00}'..='\u{9FFF}').contains(&c) || // CJK Unified Ideographs
        ('\u{3400}'..='\u{4DBF}').contains(&c)    // CJK Extension A
    });

    let has_japanese = text.chars().any(|c| {
        ('\u{3040}'..='\u{309F}').contains(&c) || // Hiragana
        ('\u{30A0}'..='\u{30FF}').contains(&c)    // Katakana
    });

    let has_korean = text.chars().any(|c| {
        ('\u{AC00}'..='\u{D7AF}').contains(&c)    // Hangul Syllables
    });

    let has_arabic = text.chars().any(|c| {
        ('\u{0600}'..='\u{06FF}').contains(&c) || // Arabic
        ('\u{0750}'..='\u{077F}').contains(&c)    // Arabic Supplement
    });

    let has_cyrillic = text.chars().any(|c| {
        ('\u{0400}'..='\u{04FF}').contains(&c)    // Cyrillic
    });

    if has_chinese && !has_japanese {
        Language::Zho
    } else if has_japanese {
        Language::Jpn
    } else if has_korean {
        Language::Kor
    } else if has_arabic {
        Language::Ara
    } else if has_cyrillic {
        Language::Rus
    } else {
        // Default to English for Latin script
        Language::Eng
    }
}

/// Decide the source/target pair for one translation.
///
/// Source comes from settings when pinned, otherwise from detection. When
/// the detected source already equals the configured target and the target
/// is not locked, the secondary language takes over so the backend is never
/// asked for a no-op translate-X-to-X.
pub fn decide_languages(text: &str, settings: &LanguageSettings) -> (Option<Language>, Language) {
    let pinned = if settings.source_lang.eq_ignore_ascii_case("auto") {
        None
    } else {
        parse_lang(&settings.source_lang)
    };
    let detected = pinned.unwrap_or_else(|| detect_language(text));

    let mut target = parse_lang(&settings.target_lang).unwrap_or(Language::Eng);
    if detected == target && !settings.target_locked {
        if let Some(secondary) = parse_lang(&settings.secondary_lang) {
            log::debug!(
                "[Detection] Source equals target ({}); swapping to secondary {}",
                settings.target_lang,
                settings.secondary_lang
            );
            target = secondary;
        }
    }

    (pinned.or(Some(detected)), target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(target: &str, secondary: &str, locked: bool) -> LanguageSettings {
        LanguageSettings {
            source_lang: "auto".to_string(),
            target_lang: target.to_string(),
            secondary_lang: secondary.to_string(),
            target_locked: locked,
        }
    }

    #[test]
    fn test_detect_chinese() {
        assert_eq!(detect_language("你好世界"), Language::Zho);
    }

    #[test]
    fn test_detect_japanese() {
        assert_eq!(detect_language("こんにちは"), Language::Jpn);
        // Kana wins over shared ideographs
        assert_eq!(detect_language("日本語のテスト"), Language::Jpn);
    }

    #[test]
    fn test_detect_korean() {
        assert_eq!(detect_language("안녕하세요"), Language::Kor);
    }

    #[test]
    fn test_detect_cyrillic() {
        assert_eq!(detect_language("Привет"), Language::Rus);
    }

    #[test]
    fn test_detect_latin_defaults_to_english() {
        assert_eq!(detect_language("Hello world"), Language::Eng);
    }

    #[test]
    fn test_target_swap_on_same_language() {
        let (source, target) = decide_languages("Hello world", &settings("en", "zh", false));
        assert_eq!(source, Some(Language::Eng));
        assert_eq!(target, Language::Zho);
    }

    #[test]
    fn test_target_lock_prevents_swap() {
        let (_, target) = decide_languages("Hello world", &settings("en", "zh", true));
        assert_eq!(target, Language::Eng);
    }

    #[test]
    fn test_no_swap_when_languages_differ() {
        let (source, target) = decide_languages("你好", &settings("en", "zh", false));
        assert_eq!(source, Some(Language::Zho));
        assert_eq!(target, Language::Eng);
    }

    #[test]
    fn test_pinned_source_overrides_detection() {
        let mut s = settings("zh", "en", false);
        s.source_lang = "fr".to_string();
        let (source, _) = decide_languages("Hello world", &s);
        assert_eq!(source, Some(Language::Fra));
    }
}
