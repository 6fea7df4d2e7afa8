use std::collections::{BTreeMap, HashMap, HashSet};

/// Athlete-source codes that the GDP table files under a different ISO-3 code.
pub const CODE_REMAP: &[(&str, &str)] = &[
    ("BAH", "BHS"),
    ("BER", "BMU"),
    ("BRU", "BRN"),
    ("CAM", "KHM"),
    ("CGO", "COG"),
    ("DEN", "DNK"),
    ("GAM", "GMB"),
    ("GBS", "GNB"),
    ("GER", "DEU"),
    ("GRE", "GRC"),
    ("INA", "IDN"),
    ("IRI", "IRN"),
    ("ISV", "VIR"),
    ("LIB", "LBN"),
    ("MON", "MCO"),
    ("MYA", "MMR"),
    ("NED", "NLD"),
    ("PHI", "PHL"),
    ("POR", "PRT"),
    ("RSA", "ZAF"),
    ("SKN", "KNA"),
    ("SUI", "CHE"),
    ("UAR", "ARE"),
    ("URU", "URY"),
    ("VIN", "VCT"),
    ("ZIM", "ZWE"),
];

/// Dissolved states, former federations and teams that have no GDP series
/// and no ISO-3166 entry. Failing to resolve these is expected.
pub const DEFUNCT_CODES: &[&str] = &[
    "URS", "FRG", "GDR", "MAL", "YUG", "TCH", "IOA", "SCG", "ROT", "COK", "TPE", "RHO", "WIF",
    "PLE", "EUN", "AHO", "YMD", "YAR",
];

/// Trim and upper-case a country code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// The remap table and defunct list in effect for one run.
#[derive(Debug, Clone)]
pub struct CodeTables {
    remap: HashMap<String, String>,
    defunct: HashSet<String>,
}

impl Default for CodeTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CodeTables {
    pub fn builtin() -> Self {
        Self {
            remap: CODE_REMAP
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            defunct: DEFUNCT_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Built-in tables extended with configured entries. Configured remaps
    /// override built-in ones with the same key.
    pub fn with_overrides(remap: &BTreeMap<String, String>, defunct: &[String]) -> Self {
        let mut tables = Self::builtin();
        for (from, to) in remap {
            tables.remap.insert(normalize_code(from), normalize_code(to));
        }
        tables.defunct.extend(defunct.iter().map(|c| normalize_code(c)));
        tables
    }

    /// GDP-source equivalent of an athlete-source code.
    pub fn remap(&self, code: &str) -> String {
        let code = normalize_code(code);
        match self.remap.get(&code) {
            Some(mapped) => mapped.clone(),
            None => code,
        }
    }

    pub fn is_defunct(&self, code: &str) -> bool {
        self.defunct.contains(&normalize_code(code))
    }
}
