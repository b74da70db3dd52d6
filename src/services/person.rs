use std::sync::LazyLock;

use regex::Regex;

/// High-frequency names mapped from oblique Russian cases straight to
/// their nominative form. Checked before the suffix heuristic.
const KNOWN_NAMES: &[(&str, &str)] = &[
    ("томом хэнксом", "Том Хэнкс"),
    ("тома хэнкса", "Том Хэнкс"),
    ("стивена спилберга", "Стивен Спилберг"),
    ("стивеном спилбергом", "Стивен Спилберг"),
    ("роберта дауни", "Роберт Дауни"),
    ("робертом дауни", "Роберт Дауни"),
    ("кристофера нолана", "Кристофер Нолан"),
    ("кристофером ноланом", "Кристофер Нолан"),
    ("леонардо дикаприо", "Леонардо ДиКаприо"),
    ("леонардом дикаприо", "Леонардо ДиКаприо"),
    ("брэда питта", "Брэд Питт"),
    ("брэдом питтом", "Брэд Питт"),
    ("джонни деппа", "Джонни Депп"),
    ("джонни деппом", "Джонни Депп"),
    ("уилла смита", "Уилл Смит"),
    ("уиллом смитом", "Уилл Смит"),
    ("квентина тарантино", "Квентин Тарантино"),
    ("квентином тарантино", "Квентин Тарантино"),
    ("мартина скорсезе", "Мартин Скорсезе"),
    ("мартином скорсезе", "Мартин Скорсезе"),
    ("скарлетт йоханссон", "Скарлетт Йоханссон"),
    ("анджелины джоли", "Анджелина Джоли"),
    ("анджелиной джоли", "Анджелина Джоли"),
];

/// A capitalized first-name/last-name pair
const NAME: &str = r"([А-ЯЁ][а-яё]+\s+[А-ЯЁ][а-яё]+)";

static ACTOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"\bс\s+{}", NAME),
        format!(r"актер[а-яё]*\s+{}", NAME),
        format!(r"участие[мн]\s+{}", NAME),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static DIRECTOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"\bот\s+(?:режисс[её]ра\s+)?{}", NAME),
        format!(r"режисс[её]р[а-яё]*\s+{}", NAME),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// People a query demands in specific roles. Normalized to nominative
/// case, lowercased.
#[derive(Debug, Default, PartialEq)]
pub struct PersonConstraints {
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

impl PersonConstraints {
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.directors.is_empty()
    }
}

/// Scans a query for person mentions in object-case grammatical roles
/// ("с Томом Хэнксом", "от режиссера Нолана", "актера Смита").
pub fn find_person_constraints(query: &str) -> PersonConstraints {
    let mut constraints = PersonConstraints::default();

    for pattern in ACTOR_PATTERNS.iter() {
        for captures in pattern.captures_iter(query) {
            let name = normalize_person_name(captures[1].trim()).to_lowercase();
            if !constraints.actors.contains(&name) {
                constraints.actors.push(name);
            }
        }
    }

    for pattern in DIRECTOR_PATTERNS.iter() {
        for captures in pattern.captures_iter(query) {
            let name = normalize_person_name(captures[1].trim()).to_lowercase();
            if !constraints.directors.contains(&name) {
                constraints.directors.push(name);
            }
        }
    }

    constraints
}

/// Normalizes a Russian person name from an oblique case to nominative.
///
/// Dictionary lookup first; otherwise a suffix-stripping heuristic that
/// refuses to shorten very short words. Known-imprecise for irregular
/// declensions; a replacement morphological analyzer only needs to
/// swap this function.
pub fn normalize_person_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    if let Some((_, canonical)) = KNOWN_NAMES.iter().find(|(oblique, _)| *oblique == lowered) {
        return canonical.to_string();
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() == 2 {
        let first = strip_case_suffix(words[0], 3);
        let last = strip_case_suffix(words[1], 4);
        return format!("{} {}", title_case(&first), title_case(&last));
    }

    title_case(name.trim())
}

/// Strips a typical instrumental/genitive ending from one word.
/// `min_chars` guards against truncating short names into stems.
fn strip_case_suffix(word: &str, min_chars: usize) -> String {
    let lowered = word.to_lowercase();
    let chars: Vec<char> = word.chars().collect();

    for suffix in ["ом", "ем", "ым", "им"] {
        if lowered.ends_with(suffix) && chars.len() > min_chars {
            return chars[..chars.len() - 2].iter().collect();
        }
    }

    if chars.len() > min_chars {
        if let Some(last) = lowered.chars().last() {
            if "аяуюыие".contains(last) {
                return chars[..chars.len() - 1].iter().collect();
            }
        }
    }

    word.to_string()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two names plausibly refer to the same person: their first
/// words overlap and their last words overlap (substring in either
/// direction).
pub fn names_match(a: &str, b: &str) -> bool {
    let parts_a: Vec<&str> = a.split_whitespace().collect();
    let parts_b: Vec<&str> = b.split_whitespace().collect();

    if parts_a.len() < 2 || parts_b.len() < 2 {
        return false;
    }

    let overlap = |x: &str, y: &str| x.contains(y) || y.contains(x);

    overlap(parts_a[0], parts_b[0])
        && overlap(
            parts_a[parts_a.len() - 1],
            parts_b[parts_b.len() - 1],
        )
}

/// Whether a requested person (lowercased, nominative) appears in a
/// cast/crew name list.
pub fn person_in_list(requested: &str, names: &[String]) -> bool {
    names.iter().any(|name| {
        let name = name.to_lowercase();
        name.contains(requested) || requested.contains(name.as_str()) || names_match(requested, &name)
    })
}
