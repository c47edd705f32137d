use crate::models::SurgeonRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a surgeon's specialties cover the requested procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialtyMatch {
    /// The procedure itself is listed
    Exact,
    /// Only a broader category containing the procedure is listed
    Category(String),
}

/// Optional mapping from broad practice categories to the procedures they cover,
/// e.g. "facial surgery" -> ["rhinoplasty", "facelift"].
///
/// Empty by default, in which case only exact specialty listings are eligible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialtyTaxonomy {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl SpecialtyTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: &HashMap<String, Vec<String>>) -> Self {
        let mut taxonomy = Self::new();
        for (category, procedures) in map {
            for procedure in procedures {
                taxonomy.insert(category, procedure);
            }
        }
        taxonomy
    }

    pub fn insert(&mut self, category: &str, procedure: &str) {
        let category = normalize_term(category);
        let procedure = normalize_term(procedure);
        if category.is_empty() || procedure.is_empty() {
            return;
        }
        self.categories.entry(category).or_default().insert(procedure);
    }

    pub fn with_category(mut self, category: &str, procedures: &[&str]) -> Self {
        for procedure in procedures {
            self.insert(category, procedure);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories covering a normalized procedure name, in alphabetical order
    pub fn categories_for<'a>(&'a self, procedure: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.categories
            .iter()
            .filter(move |(_, procedures)| procedures.contains(procedure))
            .map(|(category, _)| category.as_str())
    }
}

/// Lowercase and collapse whitespace so "  Breast  Augmentation" == "breast augmentation"
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check how a surgeon's specialties cover a normalized procedure name
#[inline]
pub fn specialty_match(
    surgeon: &SurgeonRecord,
    procedure: &str,
    taxonomy: &SpecialtyTaxonomy,
) -> Option<SpecialtyMatch> {
    if surgeon
        .specialties
        .iter()
        .any(|s| normalize_term(s) == procedure)
    {
        return Some(SpecialtyMatch::Exact);
    }

    if taxonomy.is_empty() {
        return None;
    }

    let listed: BTreeSet<String> = surgeon.specialties.iter().map(|s| normalize_term(s)).collect();
    taxonomy
        .categories_for(procedure)
        .find(|category| listed.contains(*category))
        .map(|category| SpecialtyMatch::Category(category.to_string()))
}

/// Hard filter: active surgeons whose specialties cover the procedure.
///
/// Location is not checked here; it only affects scoring.
#[inline]
pub fn check_eligibility(
    surgeon: &SurgeonRecord,
    procedure: &str,
    taxonomy: &SpecialtyTaxonomy,
) -> Option<SpecialtyMatch> {
    if !surgeon.is_active() {
        return None;
    }
    specialty_match(surgeon, procedure, taxonomy)
}
