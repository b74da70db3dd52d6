use std::sync::LazyLock;

use regex::Regex;

const MIN_QUERY_CHARS: usize = 3;

static INVALID_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"^/\w+$").expect("valid regex"),
            "Ваш запрос выглядит как команда бота. Пожалуйста, введите обычный текст.",
        ),
        (
            Regex::new(r"^\d+$").expect("valid regex"),
            "Ваш запрос состоит только из цифр. Пожалуйста, опишите, что вы ищете.",
        ),
        (
            Regex::new(r"^[^\w\s]+$").expect("valid regex"),
            "Ваш запрос состоит только из специальных символов. Пожалуйста, введите осмысленный текст.",
        ),
    ]
});

/// Screens free-text queries before they reach the pipeline: too-short
/// texts, bot commands, digit-only and punctuation-only input are
/// rejected with a human-readable reason.
pub fn check_query(query: &str) -> Result<(), String> {
    let cleaned = query.trim();

    if cleaned.is_empty() {
        return Err("Ваш запрос пуст. Пожалуйста, введите что-нибудь.".to_string());
    }

    if cleaned.chars().count() < MIN_QUERY_CHARS {
        return Err(format!(
            "Ваш запрос слишком короткий. Он должен содержать минимум {} символа(ов).",
            MIN_QUERY_CHARS
        ));
    }

    for (pattern, reason) in INVALID_PATTERNS.iter() {
        if pattern.is_match(cleaned) {
            return Err((*reason).to_string());
        }
    }

    Ok(())
}
