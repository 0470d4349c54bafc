//! Survey naming conventions mapped onto filter file stems.
//!
//! Photometric catalogs name their bands after the survey (`SDSS_u`,
//! `WISE_3.4`, `SPIRE_250`) while filter files are named after the curve
//! (`u_prime`, `wise1`, `psw_s`). Each [`AliasRule`] handles one survey. Rules
//! are tried in order and the first whose predicate accepts the name decides
//! the outcome, so a later rule never sees a name an earlier one claimed.

use log::debug;

/// One survey convention: a predicate on the lowercased name and the rewrite
/// to apply when it matches. A rewrite returning `None` marks the name as
/// unresolvable.
#[derive(Clone, Copy)]
pub struct AliasRule {
    pub survey: &'static str,
    pub matches: fn(&str) -> bool,
    pub rewrite: fn(&str) -> Option<String>,
}

impl std::fmt::Debug for AliasRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasRule")
            .field("survey", &self.survey)
            .finish()
    }
}

/// Built-in rules, in priority order.
pub const SURVEY_RULES: &[AliasRule] = &[
    AliasRule {
        survey: "sdss",
        matches: |n| n.starts_with("sdss_"),
        rewrite: |n| Some(format!("{}_prime", &n["sdss_".len()..])),
    },
    AliasRule {
        survey: "herschel-hipe",
        matches: |n| n.ends_with("_hipe"),
        rewrite: |n| Some(format!("{}_s", &n[..n.len() - "_hipe".len()])),
    },
    AliasRule {
        survey: "galex",
        matches: |n| n.starts_with("galex"),
        rewrite: |n| Some(last_chars(n, 3).to_string()),
    },
    AliasRule {
        survey: "2mass",
        matches: |n| n.starts_with("2mass_"),
        rewrite: |n| Some(format!("{}_2mass", &n["2mass_".len()..])),
    },
    AliasRule {
        survey: "wise",
        matches: |n| n.starts_with("wise_"),
        rewrite: |n| {
            let band = match &n["wise_".len()..] {
                b @ ("1" | "2" | "3" | "4") => b,
                "3.4" => "1",
                "4.6" => "2",
                "12" => "3",
                "22" => "4",
                _ => return None,
            };
            Some(format!("wise{band}"))
        },
    },
    AliasRule {
        survey: "pacs",
        matches: |n| n.starts_with("pacs_"),
        rewrite: |n| {
            let colour = match &n["pacs_".len()..] {
                "70" => "blue",
                "100" => "green",
                "160" => "red",
                _ => return Some(n.to_string()),
            };
            Some(format!("pacs_{colour}"))
        },
    },
    AliasRule {
        survey: "spire",
        matches: |n| n.starts_with("spire_"),
        rewrite: |n| {
            let stem = match &n["spire_".len()..] {
                "250" => "psw_s",
                "350" => "pmw_s",
                "500" => "plw_s",
                _ => return Some(n.to_string()),
            };
            Some(stem.to_string())
        },
    },
];

fn last_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// AliasTable
// ---------------------------------------------------------------------------

/// Ordered alias rules plus exact user aliases.
#[derive(Debug, Clone)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            rules: SURVEY_RULES.to_vec(),
        }
    }
}

impl AliasTable {
    pub fn new(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    /// Lowercased candidate file stem for `name`, or `None` when a rule
    /// recognised the survey but not the band.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let lower = name.to_lowercase();
        match self.rules.iter().find(|r| (r.matches)(&lower)) {
            Some(rule) => {
                let stem = (rule.rewrite)(&lower);
                debug!("alias rule '{}' rewrote '{name}' to {stem:?}", rule.survey);
                stem
            }
            None => Some(lower),
        }
    }
}
