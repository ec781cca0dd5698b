//! Versioned table of data paths a template field may be mapped to
//!
//! A path is accepted when it is
//! - a top-level record scalar,
//! - `<computed>.<name>` for a derived value,
//! - `<role>.<subfield>` for any role prefix, all roles sharing one sub-field set,
//! - `<group>.<field>` for a nested record group,
//! - anything under a wildcard prefix (array items, free-form code lists).
//!
//! For the prefixed forms the first matching prefix decides: `garant.x`
//! is judged against the role sub-fields and nothing else.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::error::DictionaryError;

/// Separator between the parts of a composite path (`a + b`)
pub const COMPOSITE_SEPARATOR: &str = " + ";

const BUILTIN_VERSION: &str = "enriched-v1";

const TOP_LEVEL: &[&str] = &[
    "id",
    "cislo_objednavky",
    "dt_objednavky",
    "predmet",
    "max_cena_s_dph",
    "poznamka",
    "strediska_kod",
    "druh_objednavky_kod",
    "stav_workflow_kod",
    "dt_predpokladany_termin_dodani",
    "misto_dodani",
    "zaruka",
    "polozky_count",
    "prilohy_count",
    "dt_vytvoreni",
    "dt_aktualizace",
    "dt_schvaleni",
    "dt_schvaleni_zamitnutim",
    "dt_uzavreni",
    "dt_zruseni",
    "dt_archivace",
    "dt_odeslani",
    "dt_akceptace",
    "dt_zverejneni",
    "schvaleni_komentar",
    "financovani",
    "stav_objednavky",
    "dodavatel_zpusob_potvrzeni",
    "registr_iddt",
    // supplier is flattened onto the record
    "dodavatel_id",
    "dodavatel_nazev",
    "dodavatel_adresa",
    "dodavatel_ico",
    "dodavatel_dic",
    "dodavatel_zastoupeny",
    "dodavatel_kontakt_jmeno",
    "dodavatel_kontakt_email",
    "dodavatel_kontakt_telefon",
];

const ROLE_PREFIXES: &[&str] = &[
    "garant_uzivatel",
    "garant",
    "prikazce_uzivatel",
    "prikazce",
    "schvalovatel",
    "uzivatel",
    "objednatel",
    "odesilatel",
    "fakturant",
    "dodavatel_potvrdil",
    "potvrdil_vecnou_spravnost",
    "dokoncil",
];

const ROLE_FIELDS: &[&str] = &[
    "id",
    "cele_jmeno",
    "jmeno",
    "prijmeni",
    "titul_pred",
    "titul_za",
    "email",
    "telefon",
    "username",
    "lokalita.id",
    "lokalita.nazev",
    "lokalita.kod",
];

const COMPUTED_NAMESPACE: &str = "vypocitane";

const COMPUTED_FIXED: &[&str] = &[
    "celkova_cena_bez_dph",
    "celkova_cena_s_dph",
    "vypoctene_dph",
    "celkova_cena_bez_dph_kc",
    "celkova_cena_s_dph_kc",
    "vypoctene_dph_kc",
    "pocet_polozek",
    "pocet_priloh",
    "datum_generovani",
    "cas_generovani",
    "datum_cas_generovani",
    "vybrany_uzivatel_cele_jmeno",
    "vybrany_uzivatel_role",
    "vybrany_uzivatel_lokalita",
];

/// Roles with pre-formatted name and contact values in the computed namespace
const COMPUTED_PERSON_ROLES: &[&str] = &[
    "garant",
    "prikazce",
    "schvalovatel",
    "objednatel",
    "odesilatel",
    "fakturant",
];

const COMPUTED_PERSON_SUFFIXES: &[&str] = &[
    "jmeno_prijmeni",
    "prijmeni_jmeno",
    "cele_jmeno_s_tituly",
    "cele_jmeno",
    "jmeno",
    "prijmeni",
    "email",
    "telefon",
];

const FINANCING_FIELDS: &[&str] = &["typ", "nazev", "nazev_stavu", "kod", "kod_stavu"];

const WILDCARD_PREFIXES: &[&str] = &["strediska_kod", "polozky", "prilohy", "faktury"];

const PRICES_MOVED: &str = "Prices now live in the vypocitane object";
const VAT_MOVED: &str = "VAT now lives in the vypocitane object";
const DATE_MOVED: &str = "The generation date now lives in the vypocitane object";
const ORDERER_RENAMED: &str = "The enriched record uses uzivatel instead of objednatel";

const DEPRECATED: &[(&str, &str, &str)] = &[
    ("celkova_cena_bez_dph", "vypocitane.celkova_cena_bez_dph", PRICES_MOVED),
    ("celkova_cena_s_dph", "vypocitane.celkova_cena_s_dph", PRICES_MOVED),
    ("vypoctene_dph", "vypocitane.vypoctene_dph", VAT_MOVED),
    ("objednatel.plne_jmeno", "uzivatel.cele_jmeno", ORDERER_RENAMED),
    ("objednatel.cele_jmeno", "uzivatel.cele_jmeno", ORDERER_RENAMED),
    ("objednatel.jmeno", "uzivatel.jmeno", ORDERER_RENAMED),
    ("objednatel.prijmeni", "uzivatel.prijmeni", ORDERER_RENAMED),
    ("objednatel.email", "uzivatel.email", ORDERER_RENAMED),
    ("objednatel.telefon", "uzivatel.telefon", ORDERER_RENAMED),
    ("objednatel.lokalita.nazev", "uzivatel.lokalita.nazev", ORDERER_RENAMED),
    ("objednatel.lokalita.kod", "uzivatel.lokalita.kod", ORDERER_RENAMED),
    ("aktualni_datum", "vypocitane.datum_generovani", DATE_MOVED),
];

static BUILTIN: LazyLock<DataDictionary> = LazyLock::new(DataDictionary::build_builtin);

/// Replacement for a path that the record no longer exposes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deprecation {
    pub replacement: String,
    pub reason: String,
}

/// Nested record group addressed as `<prefix>.<field>`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceGroup {
    pub prefix: String,
    pub fields: Vec<String>,
}

/// How the dictionary judges a single (non-composite) path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStatus<'a> {
    Valid,
    Deprecated(&'a Deprecation),
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDictionary {
    pub version: String,
    #[serde(default)]
    pub top_level: Vec<String>,
    #[serde(default)]
    pub computed_namespace: Option<String>,
    #[serde(default)]
    pub computed: Vec<String>,
    #[serde(default)]
    pub role_prefixes: Vec<String>,
    #[serde(default)]
    pub role_fields: Vec<String>,
    #[serde(default)]
    pub groups: Vec<NamespaceGroup>,
    #[serde(default)]
    pub wildcard_prefixes: Vec<String>,
    #[serde(default)]
    pub deprecated: BTreeMap<String, Deprecation>,
}

impl DataDictionary {
    /// Dictionary matching the current enriched order record
    pub fn builtin() -> &'static DataDictionary {
        &BUILTIN
    }

    fn build_builtin() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut computed = owned(COMPUTED_FIXED);
        for role in COMPUTED_PERSON_ROLES {
            for suffix in COMPUTED_PERSON_SUFFIXES {
                computed.push(format!("{role}_{suffix}"));
            }
        }

        let deprecated = DEPRECATED
            .iter()
            .map(|(path, replacement, reason)| {
                (
                    path.to_string(),
                    Deprecation {
                        replacement: replacement.to_string(),
                        reason: reason.to_string(),
                    },
                )
            })
            .collect();

        Self {
            version: BUILTIN_VERSION.to_string(),
            top_level: owned(TOP_LEVEL),
            computed_namespace: Some(COMPUTED_NAMESPACE.to_string()),
            computed,
            role_prefixes: owned(ROLE_PREFIXES),
            role_fields: owned(ROLE_FIELDS),
            groups: vec![NamespaceGroup {
                prefix: "financovani".to_string(),
                fields: owned(FINANCING_FIELDS),
            }],
            wildcard_prefixes: owned(WILDCARD_PREFIXES),
            deprecated,
        }
    }

    /// Load a dictionary from YAML and check its deprecation table
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DictionaryError> {
        let dictionary: DataDictionary = serde_yaml::from_str(yaml)?;
        dictionary.check()?;
        tracing::debug!(
            version = %dictionary.version,
            deprecated = dictionary.deprecated.len(),
            "loaded data dictionary"
        );
        Ok(dictionary)
    }

    /// A replacement must never be deprecated itself, otherwise auto-fix
    /// would need more than one pass
    fn check(&self) -> Result<(), DictionaryError> {
        if self.version.trim().is_empty() {
            return Err(DictionaryError::MissingVersion);
        }
        for (path, deprecation) in &self.deprecated {
            if deprecation.replacement.trim().is_empty() {
                return Err(DictionaryError::EmptyReplacement { path: path.clone() });
            }
            let chained = split_composite(&deprecation.replacement)
                .any(|part| self.deprecated.contains_key(part));
            if chained {
                return Err(DictionaryError::ChainedDeprecation {
                    path: path.clone(),
                    replacement: deprecation.replacement.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn deprecation(&self, path: &str) -> Option<&Deprecation> {
        self.deprecated.get(path)
    }

    /// Judge a single path. Deprecation wins over validity.
    pub fn classify(&self, path: &str) -> PathStatus<'_> {
        if let Some(deprecation) = self.deprecation(path) {
            return PathStatus::Deprecated(deprecation);
        }
        if self.is_valid_path(path) {
            PathStatus::Valid
        } else {
            PathStatus::Unknown
        }
    }

    /// True if the path addresses something the record exposes
    pub fn is_valid_path(&self, path: &str) -> bool {
        if self.top_level.iter().any(|p| p == path) {
            return true;
        }

        if let Some(rest) = self
            .computed_namespace
            .as_deref()
            .and_then(|ns| strip_namespace(path, ns))
        {
            return self.computed.iter().any(|c| c == rest);
        }

        if let Some(rest) = self
            .role_prefixes
            .iter()
            .find_map(|prefix| strip_namespace(path, prefix))
        {
            return self.role_fields.iter().any(|f| f == rest);
        }

        if let Some((group, rest)) = self
            .groups
            .iter()
            .find_map(|g| strip_namespace(path, &g.prefix).map(|rest| (g, rest)))
        {
            return group.fields.iter().any(|f| f == rest);
        }

        self.wildcard_prefixes
            .iter()
            .any(|prefix| is_wildcard_item(path, prefix))
    }

    /// Every statically known path, sorted, for mapping autocompletion.
    /// Wildcard prefixes and deprecated paths are not listed.
    pub fn available_paths(&self) -> Vec<String> {
        let mut paths: BTreeSet<String> = self.top_level.iter().cloned().collect();

        if let Some(ns) = &self.computed_namespace {
            paths.extend(self.computed.iter().map(|c| format!("{ns}.{c}")));
        }
        for prefix in &self.role_prefixes {
            paths.extend(self.role_fields.iter().map(|f| format!("{prefix}.{f}")));
        }
        for group in &self.groups {
            paths.extend(group.fields.iter().map(|f| format!("{}.{f}", group.prefix)));
        }

        paths.into_iter().collect()
    }

    /// Rewrite deprecated parts of a (possibly composite) path.
    /// `None` when nothing in the path is deprecated.
    pub fn migrate(&self, path: &str) -> Option<String> {
        if let Some(deprecation) = self.deprecation(path) {
            return Some(deprecation.replacement.clone());
        }
        if !path.contains(COMPOSITE_SEPARATOR) {
            return None;
        }

        let mut changed = false;
        let parts: Vec<&str> = split_composite(path)
            .map(|part| match self.deprecation(part) {
                Some(deprecation) => {
                    changed = true;
                    deprecation.replacement.as_str()
                }
                None => part,
            })
            .collect();

        changed.then(|| parts.join(COMPOSITE_SEPARATOR))
    }
}

impl Default for DataDictionary {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Parts of a composite path, trimmed; a plain path yields itself
pub fn split_composite(path: &str) -> impl Iterator<Item = &str> {
    path.split(COMPOSITE_SEPARATOR).map(str::trim)
}

fn strip_namespace<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)?.strip_prefix('.')
}

/// `polozky.nazev` or `polozky[0].nazev`
fn is_wildcard_item(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_accepts_each_path_family() {
        let dict = DataDictionary::builtin();
        for path in [
            "cislo_objednavky",
            "dodavatel_ico",
            "vypocitane.celkova_cena_s_dph_kc",
            "vypocitane.garant_cele_jmeno_s_tituly",
            "garant_uzivatel.lokalita.nazev",
            "uzivatel.email",
            "financovani.kod_stavu",
            "strediska_kod.0",
            "polozky.popis",
            "prilohy[1].nazev",
        ] {
            assert!(dict.is_valid_path(path), "{path} should be valid");
        }
    }

    #[test]
    fn test_first_matching_prefix_decides() {
        let dict = DataDictionary::builtin();
        // computed namespace does not fall back to the role table
        assert!(!dict.is_valid_path("vypocitane.email"));
        assert!(!dict.is_valid_path("garant.nazev"));
        assert!(!dict.is_valid_path("financovani.jmeno"));
        // bare wildcard prefixes are not item paths
        assert!(!dict.is_valid_path("polozky"));
        assert!(!dict.is_valid_path("polozkyx.nazev"));
    }

    #[test]
    fn test_deprecation_wins_over_validity() {
        let dict = DataDictionary::builtin();
        // objednatel.email has the shape of a valid role path
        match dict.classify("objednatel.email") {
            PathStatus::Deprecated(d) => assert_eq!(d.replacement, "uzivatel.email"),
            other => panic!("expected deprecation, got {other:?}"),
        }
        assert_eq!(dict.classify("objednatel.id"), PathStatus::Valid);
        assert_eq!(dict.classify("neexistujici_pole"), PathStatus::Unknown);
    }

    #[test]
    fn test_builtin_replacements_are_valid_and_final() {
        let dict = DataDictionary::builtin();
        dict.check().unwrap();
        for deprecation in dict.deprecated.values() {
            assert!(
                dict.is_valid_path(&deprecation.replacement),
                "{} is not a valid path",
                deprecation.replacement
            );
        }
    }

    #[test]
    fn test_available_paths_sorted_and_valid() {
        let dict = DataDictionary::builtin();
        let paths = dict.available_paths();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert!(paths.contains(&"schvalovatel.titul_pred".to_string()));
        assert!(paths.contains(&"vypocitane.fakturant_telefon".to_string()));
        assert!(paths.iter().all(|p| dict.is_valid_path(p)));
    }

    #[test]
    fn test_migrate_composite_paths() {
        let dict = DataDictionary::builtin();
        assert_eq!(
            dict.migrate("objednatel.jmeno + objednatel.prijmeni"),
            Some("uzivatel.jmeno + uzivatel.prijmeni".to_string())
        );
        assert_eq!(
            dict.migrate("aktualni_datum"),
            Some("vypocitane.datum_generovani".to_string())
        );
        assert_eq!(dict.migrate("uzivatel.jmeno + uzivatel.prijmeni"), None);
        assert_eq!(dict.migrate("predmet"), None);
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
version: test-2
topLevel: [predmet]
computedNamespace: calc
computed: [total]
groups:
  - prefix: supplier
    fields: [name]
deprecated:
  old_total:
    replacement: calc.total
    reason: moved
"#;
        let dict = DataDictionary::from_yaml_str(yaml).unwrap();
        assert_eq!(dict.version, "test-2");
        assert!(dict.is_valid_path("calc.total"));
        assert!(dict.is_valid_path("supplier.name"));
        assert!(!dict.is_valid_path("uzivatel.email"));
        assert!(matches!(dict.classify("old_total"), PathStatus::Deprecated(_)));
    }

    #[test]
    fn test_from_yaml_rejects_chained_deprecations() {
        let yaml = r#"
version: broken
deprecated:
  a: { replacement: b, reason: first }
  b: { replacement: c, reason: second }
"#;
        let err = DataDictionary::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, DictionaryError::ChainedDeprecation { ref path, .. } if path == "a"));
    }
}
