use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static whitespace pattern");
}

/// Canonical form of a store name: trimmed, internal whitespace collapsed to a
/// single space, then title-cased.
///
/// Title-casing upper-cases a letter that follows a non-letter (or starts the
/// string) and lower-cases every other letter, so `" north  store "` becomes
/// `"North Store"` and `"o'brien"` becomes `"O'Brien"`. Applying it twice gives
/// the same result as applying it once.
pub fn normalize_store_name(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    title_case(&collapsed)
}

/// Like [`normalize_store_name`], but `None` for a missing or blank name.
pub fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_store_name).filter(|s| !s.is_empty())
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;

    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                // Multi-char uppercase expansions (e.g. 'ß' -> "SS") keep only
                // the leading char upper-cased.
                let mut upper = ch.to_uppercase();
                if let Some(first) = upper.next() {
                    out.push(first);
                }
                for rest in upper {
                    out.extend(rest.to_lowercase());
                }
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }

    out
}

/// Scoring form: lower-cased, non-alphanumerics replaced by spaces, whitespace
/// collapsed and trimmed.
pub fn scoring_form(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    WHITESPACE.replace_all(replaced.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_store_name() {
        assert_eq!(normalize_store_name(" north store "), "North Store");
        assert_eq!(normalize_store_name("NORTH   STORE"), "North Store");
        assert_eq!(normalize_store_name("o'brien\tplaza"), "O'Brien Plaza");
        assert_eq!(normalize_store_name("7-eleven"), "7-Eleven");
        assert_eq!(normalize_store_name(""), "");
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(Some("west")), Some("West".to_string()));
    }

    #[test]
    fn test_scoring_form() {
        assert_eq!(scoring_form("Shaver Shop - Bondi (NSW)"), "shaver shop bondi nsw");
        assert_eq!(scoring_form("  "), "");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ a-zA-Z0-9'&.\\-\t]{0,40}") {
            let once = normalize_store_name(&raw);
            prop_assert_eq!(normalize_store_name(&once), once);
        }

        #[test]
        fn normalization_ignores_case_and_outer_spacing(raw in "[a-zA-Z ]{0,30}") {
            let padded = format!("  {}  ", raw.to_uppercase());
            prop_assert_eq!(normalize_store_name(&padded), normalize_store_name(&raw));
        }
    }
}
