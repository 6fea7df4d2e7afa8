use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::codes::normalize_code;
use crate::error::ReconError;
use crate::source::{line_of, reader};

/// ISO-3166 catalog shipped with the crate.
const BUNDLED_CATALOG: &str = include_str!("../data/countries.csv");

/// One canonical ISO-3166 country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryRecord {
    pub alpha_3: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl CountryRecord {
    /// Names eligible for an exact match: name, official and common name.
    pub fn exact_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.official_name.as_deref())
            .chain(self.common_name.as_deref())
    }

    /// Every name the fuzzy matcher may score, aliases included.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.exact_names().chain(self.aliases.iter().map(String::as_str))
    }
}

/// Registry of canonical country records, in catalog order.
#[derive(Debug, Default)]
pub struct CountryCatalog {
    records: Vec<Arc<CountryRecord>>,
    by_code: HashMap<String, usize>,
}

impl CountryCatalog {
    pub fn bundled() -> Result<Self, ReconError> {
        Self::from_csv("bundled catalog", BUNDLED_CATALOG)
    }

    /// Parse a catalog CSV. Required columns: `alpha_3`, `name`. Optional:
    /// `official_name`, `common_name`, `continent`, `aliases` (`;`-separated).
    pub fn from_csv(source: &str, text: &str) -> Result<Self, ReconError> {
        let mut rdr = reader(text);
        let mut records = rdr.records().enumerate();

        let header: Vec<String> = match records.next() {
            Some((_, Ok(h))) => h.iter().map(|c| c.trim().to_ascii_lowercase()).collect(),
            Some((_, Err(e))) => return Err(ReconError::Catalog(format!("{source}: {e}"))),
            None => return Err(ReconError::Catalog(format!("{source}: empty catalog"))),
        };

        let idx = |name: &str| header.iter().position(|h| h == name);
        let required = |name: &str| {
            idx(name).ok_or_else(|| {
                ReconError::Catalog(format!("{source}: missing column '{name}'"))
            })
        };

        let code_idx = required("alpha_3")?;
        let name_idx = required("name")?;
        let official_idx = idx("official_name");
        let common_idx = idx("common_name");
        let continent_idx = idx("continent");
        let aliases_idx = idx("aliases");

        let mut parsed = Vec::new();
        for (i, record) in records {
            let record = record.map_err(|e| ReconError::Catalog(format!("{source}: {e}")))?;
            let field = |col: Option<usize>| {
                col.and_then(|c| record.get(c))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let alpha_3 = normalize_code(record.get(code_idx).unwrap_or(""));
            let name = field(Some(name_idx));
            let (alpha_3, name) = match (alpha_3.is_empty(), name) {
                (false, Some(name)) => (alpha_3, name),
                _ => {
                    return Err(ReconError::Catalog(format!(
                        "{source}, row {}: alpha_3 and name are required",
                        line_of(&record, i)
                    )))
                }
            };

            let aliases = field(aliases_idx)
                .map(|a| {
                    a.split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            parsed.push(CountryRecord {
                alpha_3,
                name,
                official_name: field(official_idx),
                common_name: field(common_idx),
                continent: field(continent_idx),
                aliases,
            });
        }

        Self::from_records(parsed)
    }

    pub fn from_records(records: Vec<CountryRecord>) -> Result<Self, ReconError> {
        let mut catalog = CountryCatalog::default();
        for record in records {
            let code = normalize_code(&record.alpha_3);
            if catalog.by_code.contains_key(&code) {
                return Err(ReconError::Catalog(format!("duplicate alpha_3 code '{code}'")));
            }
            catalog.by_code.insert(code, catalog.records.len());
            catalog.records.push(Arc::new(record));
        }
        Ok(catalog)
    }

    pub fn by_code(&self, code: &str) -> Option<&Arc<CountryRecord>> {
        self.by_code
            .get(&normalize_code(code))
            .map(|&i| &self.records[i])
    }

    /// Case-insensitive match against name, official name or common name.
    pub fn by_exact_name(&self, name: &str) -> Option<&Arc<CountryRecord>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| r.exact_names().any(|n| n.to_lowercase() == wanted))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CountryRecord>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn continent_index(&self) -> ContinentIndex {
        ContinentIndex::from_catalog(self)
    }
}

// ---------------------------------------------------------------------------
// Continents
// ---------------------------------------------------------------------------

/// ISO-3 code -> continent name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ContinentIndex {
    by_code: BTreeMap<String, String>,
}

impl ContinentIndex {
    pub fn from_catalog(catalog: &CountryCatalog) -> Self {
        let by_code = catalog
            .iter()
            .filter_map(|r| {
                r.continent
                    .as_ref()
                    .map(|c| (normalize_code(&r.alpha_3), c.clone()))
            })
            .collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.by_code.get(&normalize_code(code)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
