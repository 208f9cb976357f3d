use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const RU_MONTHS: [&str; 12] = [
    "январь",
    "февраль",
    "март",
    "апрель",
    "май",
    "июнь",
    "июль",
    "август",
    "сентябрь",
    "октябрь",
    "ноябрь",
    "декабрь",
];

/// Lowercase long Russian month name (nominative), as produced by
/// `ru-RU` long month formatting.
///
/// Example: 10 → "октябрь"
pub fn ru_month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| RU_MONTHS.get(idx as usize))
        .copied()
}

/// Primary collation key: compatibility-decomposed, diacritics dropped,
/// lowercased.
///
/// Example: "Ёлка" → "елка", "Ｄeploys" → "deploys"
pub fn collation_key(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Locale-aware name ordering: primary key first, raw string on ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}
