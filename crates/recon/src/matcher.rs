use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{CountryCatalog, CountryRecord};

/// What the reconciler knows about one athlete-source country.
#[derive(Debug, Clone, Copy)]
pub struct CountryQuery<'a> {
    /// Free-text country name (first nationality of a team entry).
    pub name: &'a str,
    /// Athlete code after the static remap.
    pub gdp_code: &'a str,
    /// Athlete code as written in the source.
    pub athlete_code: &'a str,
}

/// How a canonical record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    GdpCode,
    AthleteCode,
    ExactName,
    FuzzyName,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GdpCode => write!(f, "gdp_code"),
            Self::AthleteCode => write!(f, "athlete_code"),
            Self::ExactName => write!(f, "exact_name"),
            Self::FuzzyName => write!(f, "fuzzy_name"),
        }
    }
}

/// Resolution order after the cache lookup. First match wins.
pub const STRATEGY_CHAIN: [Strategy; 4] = [
    Strategy::GdpCode,
    Strategy::AthleteCode,
    Strategy::ExactName,
    Strategy::FuzzyName,
];

#[derive(Debug, Clone, PartialEq)]
pub struct CountryMatch {
    pub record: Arc<CountryRecord>,
    pub via: Strategy,
    /// 1.0 for every exact strategy.
    pub score: f64,
}

impl Strategy {
    pub fn is_fuzzy(self) -> bool {
        self == Self::FuzzyName
    }

    /// Run this strategy alone. Pure: no logging, no caching.
    pub fn attempt(
        self,
        catalog: &CountryCatalog,
        query: &CountryQuery<'_>,
        threshold: f64,
    ) -> Option<CountryMatch> {
        let exact = |record: Option<&Arc<CountryRecord>>| {
            record.map(|r| CountryMatch {
                record: Arc::clone(r),
                via: self,
                score: 1.0,
            })
        };

        match self {
            Self::GdpCode => exact(catalog.by_code(query.gdp_code)),
            Self::AthleteCode => exact(catalog.by_code(query.athlete_code)),
            Self::ExactName => exact(catalog.by_exact_name(query.name)),
            Self::FuzzyName => {
                best_fuzzy(catalog, query.name, threshold).map(|(record, score)| CountryMatch {
                    record: Arc::clone(record),
                    via: self,
                    score,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fuzzy scoring
// ---------------------------------------------------------------------------

/// Best-scoring catalog entry at or above `threshold`. Every name of a record,
/// aliases included, is scored; ties keep the earlier catalog entry.
pub fn best_fuzzy<'c>(
    catalog: &'c CountryCatalog,
    name: &str,
    threshold: f64,
) -> Option<(&'c Arc<CountryRecord>, f64)> {
    let query = normalize_name(name);
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(&Arc<CountryRecord>, f64)> = None;
    for record in catalog.iter() {
        let score = record
            .all_names()
            .map(|candidate| score_name(&query, &normalize_name(candidate)))
            .fold(0.0, f64::max);
        if score >= threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((record, score));
        }
    }
    best
}

/// Lower-case, punctuation to spaces, whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    let spaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two normalised names in [0, 1].
pub fn score_name(query: &str, candidate: &str) -> f64 {
    substring_score(query, candidate).max(levenshtein_ratio(query, candidate))
}

fn substring_score(needle: &str, haystack: &str) -> f64 {
    if needle.is_empty() || haystack.is_empty() {
        return 0.0;
    }
    if haystack == needle {
        return 1.0;
    }
    if haystack.starts_with(needle) {
        return 0.9;
    }
    if haystack.split(' ').any(|word| word.starts_with(needle)) {
        return 0.8;
    }
    if haystack.contains(needle) {
        return 0.7;
    }
    0.0
}

fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    // Two-row DP
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const CATALOG: &str = "\
alpha_3,name,official_name,common_name,continent,aliases
DEU,Germany,Federal Republic of Germany,,Europe,
ESP,Spain,Kingdom of Spain,,Europe,
MMR,Myanmar,Republic of Myanmar,,Asia,Burma
KOR,\"Korea, Republic of\",,South Korea,Asia,Korea
PRK,\"Korea, Democratic People's Republic of\",,North Korea,Asia,
";

    fn catalog() -> CountryCatalog {
        CountryCatalog::from_csv("countries.csv", CATALOG).unwrap()
    }

    fn query<'a>(name: &'a str, gdp_code: &'a str, athlete_code: &'a str) -> CountryQuery<'a> {
        CountryQuery {
            name,
            gdp_code,
            athlete_code,
        }
    }

    #[test]
    fn gdp_code_strategy() {
        let m = Strategy::GdpCode
            .attempt(&catalog(), &query("Whatever", "DEU", "GER"), 0.8)
            .unwrap();
        assert_eq!(m.record.alpha_3, "DEU");
        assert_eq!(m.via, Strategy::GdpCode);
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn athlete_code_strategy() {
        let m = Strategy::AthleteCode
            .attempt(&catalog(), &query("", "XXX", "esp"), 0.8)
            .unwrap();
        assert_eq!(m.record.alpha_3, "ESP");
        assert!(Strategy::GdpCode
            .attempt(&catalog(), &query("", "XXX", "esp"), 0.8)
            .is_none());
    }

    #[test]
    fn exact_name_strategy_ignores_aliases() {
        let c = catalog();
        let m = Strategy::ExactName
            .attempt(&c, &query(" south korea ", "XXX", "XXX"), 0.8)
            .unwrap();
        assert_eq!(m.record.alpha_3, "KOR");
        assert!(Strategy::ExactName
            .attempt(&c, &query("Burma", "BIR", "BIR"), 0.8)
            .is_none());
    }

    #[test]
    fn fuzzy_strategy_finds_alias() {
        let m = Strategy::FuzzyName
            .attempt(&catalog(), &query("Burma", "BIR", "BIR"), 0.8)
            .unwrap();
        assert_eq!(m.record.name, "Myanmar");
        assert!(m.via.is_fuzzy());
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn fuzzy_tolerates_typos() {
        let c = catalog();
        let (record, score) = best_fuzzy(&c, "Germeny", 0.8).unwrap();
        assert_eq!(record.alpha_3, "DEU");
        assert!(score >= 0.8 && score < 1.0, "{score}");
    }

    #[test]
    fn fuzzy_below_threshold_is_none() {
        assert!(best_fuzzy(&catalog(), "Atlantis", 0.8).is_none());
        assert!(best_fuzzy(&catalog(), "   ", 0.1).is_none());
    }

    #[test]
    fn fuzzy_prefers_higher_score_over_order() {
        // Both Korea names start with "korea"; only KOR has the bare alias
        let c = catalog();
        let (record, score) = best_fuzzy(&c, "Korea", 0.8).unwrap();
        assert_eq!(record.alpha_3, "KOR");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn fuzzy_tie_keeps_earlier_entry() {
        let tied = CountryCatalog::from_csv(
            "countries.csv",
            "alpha_3,name\nAAA,Northland East\nBBB,Northland West\n",
        )
        .unwrap();
        let (record, score) = best_fuzzy(&tied, "Northland", 0.8).unwrap();
        assert_eq!(record.alpha_3, "AAA");
        assert_eq!(score, 0.9);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_name("  Korea,   Republic of "), "korea republic of");
        assert_eq!(normalize_name("Côte d'Ivoire"), "côte d ivoire");
        assert_eq!(normalize_name("Guinea-Bissau"), "guinea bissau");
        assert_eq!(normalize_name("..."), "");
    }

    #[test]
    fn substring_tiers() {
        assert_eq!(substring_score("spain", "spain"), 1.0);
        assert_eq!(substring_score("united", "united kingdom"), 0.9);
        assert_eq!(substring_score("kingdom", "united kingdom"), 0.8);
        assert_eq!(substring_score("ngdo", "united kingdom"), 0.7);
        assert_eq!(substring_score("peru", "chile"), 0.0);
    }

    #[test]
    fn levenshtein_distances() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::FuzzyName.to_string(), "fuzzy_name");
        assert_eq!(
            serde_json::to_string(&Strategy::AthleteCode).unwrap(),
            "\"athlete_code\""
        );
        assert_eq!(STRATEGY_CHAIN.len(), 4);
        assert!(STRATEGY_CHAIN[3].is_fuzzy());
    }

    proptest! {
        #[test]
        fn normalized_names_are_stable(name in "[A-Za-z0-9 ,.()'-]{0,40}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
            prop_assert!(!once.contains("  "));
        }

        #[test]
        fn scores_are_bounded(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
            let score = score_name(&normalize_name(&a), &normalize_name(&b));
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn identical_names_score_one(name in "[a-z]{1,12}( [a-z]{1,12}){0,3}") {
            prop_assert_eq!(score_name(&name, &name), 1.0);
        }
    }
}
