use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::services::providers::TextGenerator;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Similarity at or above which a "translation" is considered the input
/// returned unchanged (a known model failure mode under translate
/// prompts)
const SAME_TEXT_RATIO: f64 = 0.95;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:translation|перевод|english|russian|текст)\s*:?\s*").expect("valid regex")
});
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").expect("valid regex"));
static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[«»"]"#).expect("valid regex"));
static LANG_CODE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z]{2})\b").expect("valid regex"));
static LANG_CODE_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z]{2})").expect("valid regex"));

/// Language detection and ru↔en translation on top of the generation
/// model, with strict output cleaning.
///
/// The model is prompted to return bare text (or a bare two-letter
/// code), but wrapping labels, quotes and explanations still appear;
/// everything here is post-cleaned aggressively and malformed output is
/// a detection failure, never an error.
pub struct Translator {
    llm: Arc<dyn TextGenerator>,
}

impl Translator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Strips template phrases, parenthesized asides and quoting from a
    /// model response.
    pub fn clean_response(text: &str) -> String {
        let text = text.trim();
        let text = LABEL_RE.replace(text, "");
        let text = PAREN_RE.replace_all(&text, "");
        let text = QUOTE_RE.replace_all(&text, "");
        text.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string()
    }

    /// Extracts the first two-letter alphabetic token from a language
    /// detection response.
    fn extract_language_code(text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        LANG_CODE_WORD_RE
            .captures(&lowered)
            .or_else(|| LANG_CODE_ANY_RE.captures(&lowered))
            .map(|caps| caps[1].to_string())
    }

    /// Detects the ISO 639-1 language code of a text.
    ///
    /// `None` means "no language determined": empty input, a malformed
    /// model response, or retry exhaustion. Never an error.
    pub async fn detect_language(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let prompt = format!(
            "Detect the language of the following text and return ONLY the ISO 639-1 code \
             (e.g., 'en', 'ru', 'fr', 'de'). Do NOT provide any additional explanations, \
             phrases like 'The language is', or parentheses. Just the two-letter code. \
             Text: \"{}\"",
            text
        );

        let mut delay = INITIAL_DELAY;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.llm.generate(&prompt, None, 0.1, Some(8)).await {
                Ok(raw) => {
                    return match Self::extract_language_code(&raw) {
                        Some(code) => Some(code),
                        None => {
                            tracing::warn!(
                                response = %raw,
                                "Model returned no usable language code"
                            );
                            None
                        }
                    };
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Language detection call failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        tracing::error!(text = %truncate(text, 100), "Language detection exhausted retries");
        None
    }

    /// Translates Russian text to English. Falls back to the input when
    /// every attempt fails.
    pub async fn translate_to_english(&self, text: &str) -> String {
        let prompt = format!(
            "You are a professional translator. Translate the following Russian text into \
             fluent English. Provide ONLY the translated text, without any additional \
             explanations, formatting, or conversational phrases.\nRussian: {}\nEnglish:",
            text
        );
        self.translate(text, &prompt).await
    }

    /// Translates English text to Russian. Falls back to the input when
    /// every attempt fails.
    pub async fn translate_to_russian(&self, text: &str) -> String {
        let prompt = format!(
            "You are a professional translator. Translate the following English text into \
             fluent Russian. Provide ONLY the translated text, without any additional \
             explanations, formatting, or conversational phrases.\nEnglish: {}\nRussian:",
            text
        );
        self.translate(text, &prompt).await
    }

    async fn translate(&self, original: &str, prompt: &str) -> String {
        let mut delay = INITIAL_DELAY;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.llm.generate(prompt, None, 0.7, None).await {
                Ok(raw) => {
                    let cleaned = Self::clean_response(&raw);
                    if !cleaned.is_empty() {
                        return cleaned;
                    }
                    tracing::warn!(attempt, "Translation cleaned to empty text");
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Translation call failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        tracing::error!(
            text = %truncate(original, 100),
            "Translation exhausted retries, using original text"
        );
        original.to_string()
    }

    /// True when the translated text genuinely differs from the
    /// original. Guards against the model echoing the input back under
    /// a translation prompt: an unchanged "translation" must not be
    /// trusted for catalog search.
    pub fn is_translation_different(&self, original: &str, translated: &str) -> bool {
        if original.is_empty() || translated.is_empty() {
            return false;
        }

        let cleaned_original = Self::clean_response(original).to_lowercase();
        let cleaned_translated = Self::clean_response(translated).to_lowercase();

        cleaned_original != cleaned_translated
            && strsim::normalized_levenshtein(&cleaned_original, &cleaned_translated)
                < SAME_TEXT_RATIO
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockTextGenerator;

    fn translator_with(mock: MockTextGenerator) -> Translator {
        Translator::new(Arc::new(mock))
    }

    #[test]
    fn test_clean_response_strips_labels_and_quotes() {
        assert_eq!(Translator::clean_response("Translation: \"Inception\""), "Inception");
        assert_eq!(Translator::clean_response("Перевод: «Начало»"), "Начало");
        assert_eq!(
            Translator::clean_response("The Matrix (a 1999 film)"),
            "The Matrix"
        );
        assert_eq!(Translator::clean_response("  Dune  "), "Dune");
    }

    #[test]
    fn test_extract_language_code() {
        assert_eq!(
            Translator::extract_language_code("ru"),
            Some("ru".to_string())
        );
        assert_eq!(
            Translator::extract_language_code("The language is 'en'."),
            Some("en".to_string())
        );
        assert_eq!(Translator::extract_language_code("язык: русский"), None);
    }

    #[test]
    fn test_is_translation_different() {
        let mock = MockTextGenerator::new();
        let translator = translator_with(mock);

        assert!(translator.is_translation_different("Начало", "Inception"));
        assert!(!translator.is_translation_different("Inception", "Inception"));
        // Quoting alone is not a real translation
        assert!(!translator.is_translation_different("Начало", "«Начало»"));
        assert!(!translator.is_translation_different("", "Inception"));
    }

    #[tokio::test]
    async fn test_detect_language_happy_path() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _, _, _| Ok("ru".to_string()));

        let translator = translator_with(mock);
        assert_eq!(translator.detect_language("фантастика про космос").await, Some("ru".to_string()));
    }

    #[tokio::test]
    async fn test_detect_language_malformed_response_is_none() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _, _, _| Ok("Это русский язык!".to_string()));

        let translator = translator_with(mock);
        assert_eq!(translator.detect_language("привет").await, None);
    }

    #[tokio::test]
    async fn test_detect_language_empty_input_skips_model() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);

        let translator = translator_with(mock);
        assert_eq!(translator.detect_language("  ").await, None);
    }

    #[tokio::test]
    async fn test_translate_cleans_model_output() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _, _, _| Ok("English: \"Inception\"".to_string()));

        let translator = translator_with(mock);
        assert_eq!(translator.translate_to_english("Начало").await, "Inception");
    }
}
