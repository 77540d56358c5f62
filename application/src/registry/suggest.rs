//! "Did you mean" suggestions for unknown tool names.
//!
//! Two strategies, in order: a suffix match for callers that left out the
//! service prefix, then the closest name by edit distance within a bound
//! that scales with the name's length.

use toolgate_domain::tool::naming::SERVICE_SEPARATOR;

const MAX_DISTANCE: usize = 3;

/// Suggest the registered name closest to `requested`.
pub fn suggest<'a, I>(requested: &str, names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();

    let suffix = format!("{}{}", SERVICE_SEPARATOR, requested);
    let mut by_suffix: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| n.ends_with(&suffix))
        .collect();
    by_suffix.sort_unstable();
    if let Some(name) = by_suffix.first() {
        return Some((*name).to_string());
    }

    let bound = MAX_DISTANCE.min(requested.chars().count() / 2).max(1);
    names
        .into_iter()
        .filter_map(|n| {
            let (_, bare) = n.split_once(SERVICE_SEPARATOR).unwrap_or(("", n));
            let d = levenshtein(requested, n).min(levenshtein(requested, bare));
            (d <= bound).then_some((d, n))
        })
        .min()
        .map(|(_, n)| n.to_string())
}

/// Edit distance with a single rolling row.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["git.status", "git.push", "fs.read_file", "weather.forecast"];

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_suffix_match_for_missing_service() {
        assert_eq!(suggest("status", NAMES.iter().copied()).as_deref(), Some("git.status"));
    }

    #[test]
    fn test_typo_in_namespaced_name() {
        assert_eq!(
            suggest("git.stauts", NAMES.iter().copied()).as_deref(),
            Some("git.status")
        );
    }

    #[test]
    fn test_typo_in_bare_name() {
        assert_eq!(
            suggest("forecst", NAMES.iter().copied()).as_deref(),
            Some("weather.forecast")
        );
    }

    #[test]
    fn test_nothing_close() {
        assert_eq!(suggest("deploy", NAMES.iter().copied()), None);
        assert_eq!(suggest("x", Vec::<&str>::new()), None);
    }
}
