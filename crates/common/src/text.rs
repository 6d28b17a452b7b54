//! Small list and string helpers used for chain assembly and filter matching.

use std::collections::HashSet;
use std::hash::Hash;

/// Removes duplicates, keeping the first occurrence of every item in order.
pub fn distinct<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// True if every element of `subset` is present in `superset`.
/// An empty `subset` is contained in anything.
pub fn is_subset<T: PartialEq>(subset: &[T], superset: &[T]) -> bool {
    subset.iter().all(|item| superset.contains(item))
}

/// Lower-cases and strips every character that is not a letter or digit.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn sanitize_all<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| sanitize(v.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let out = distinct(vec!["M2", "M1", "M2", "M3", "M1"]);
        assert_eq!(out, vec!["M2", "M1", "M3"]);
    }

    #[test]
    fn test_is_subset() {
        let sup = vec!["binance", "bitnami"];
        assert!(is_subset(&["binance"], &sup));
        assert!(is_subset(&["bitnami", "binance"], &sup));
        assert!(!is_subset(&["binance", "kraken"], &sup));
    }

    #[test]
    fn test_empty_subset_is_vacuously_contained() {
        let empty: [&str; 0] = [];
        assert!(is_subset(&empty, &["x"]));
        assert!(is_subset(&empty, &empty));
    }

    #[test]
    fn test_sanitize_strips_case_and_punctuation() {
        assert_eq!(sanitize("Tinkoff_Bank"), "tinkoffbank");
        assert_eq!(sanitize(" Sber-Bank^ "), "sberbank");
        assert_eq!(sanitize("Райффайзен"), "райффайзен");
        assert_eq!(sanitize_all(&["A.B", "c d"]), vec!["ab", "cd"]);
    }
}
