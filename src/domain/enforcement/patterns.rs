//! Fixed patterns backing the built-in format and item checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// A bullet (`-`, `*`, `•`) or numbered (`1.`, `2)`) line.
pub static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*•]|\d+[.)])[ \t]+").expect("list item pattern is valid")
});

/// A currency amount such as `$500`, `€ 20` or `1200 USD`.
pub static CURRENCY_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[$€£]\s?\d+|\d+\s*(?:USD|EUR|GBP)\b").expect("currency pattern is valid")
});

/// A phase label or duration unit.
pub static PHASE_OR_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:phase|week|month|day)").expect("phase pattern is valid")
});

/// Number of bullet or numbered lines in `content`.
pub fn count_list_items(content: &str) -> usize {
    LIST_ITEM.find_iter(content).count()
}
