// Facet index: id -> name lookups and the option lists behind filter controls.
//
// Nothing here fails. Dangling ids resolve to `MISSING_NAME` and malformed
// candidates are dropped from option lists.
use crate::types::{Filterable, Placement, RefKey, ReferenceData, ReferenceEntry};
use crate::util::{fold_case, non_empty};
use std::collections::{HashMap, HashSet};

/// Display text for an id that is absent from its reference collection.
pub const MISSING_NAME: &str = "N/A";

#[derive(Debug, Clone, Default)]
pub struct Lookup {
    names: HashMap<String, String>,
}

impl Lookup {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id.trim()).map(String::as_str)
    }

    /// Name for `id`, or `MISSING_NAME` when the id is missing or unknown.
    pub fn resolve(&self, id: Option<&str>) -> &str {
        id.and_then(|id| self.get(id)).unwrap_or(MISSING_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Build an id -> name map. The first entry wins when an id repeats, and
/// entries without a usable name are left out so they resolve to `MISSING_NAME`.
pub fn build_lookup(collection: &[ReferenceEntry]) -> Lookup {
    let mut names = HashMap::with_capacity(collection.len());
    for entry in collection {
        let Some(name) = non_empty(Some(entry.name.as_str())) else {
            continue;
        };
        names
            .entry(entry.id.trim().to_string())
            .or_insert_with(|| name.to_string());
    }
    Lookup { names }
}

/// Distinct string values extracted from `records`.
///
/// Blank candidates are skipped, duplicates are detected case-insensitively
/// (the first spelling seen is kept), and the result is sorted
/// lexicographically ignoring case.
pub fn derive_options<'a, R, F, I, S>(records: &'a [R], mut extractor: F) -> Vec<String>
where
    F: FnMut(&'a R) -> I,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for record in records {
        for candidate in extractor(record) {
            let Some(value) = non_empty(Some(candidate.as_ref())) else {
                continue;
            };
            if seen.insert(fold_case(value)) {
                out.push(value.to_string());
            }
        }
    }
    out.sort_by_cached_key(|s| fold_case(s));
    out
}

/// Distinct numeric values extracted from `records`, highest first.
/// Non-finite values are excluded.
pub fn derive_numeric_options<'a, R, F, I>(records: &'a [R], mut extractor: F) -> Vec<f64>
where
    F: FnMut(&'a R) -> I,
    I: IntoIterator<Item = f64>,
{
    let mut out: Vec<f64> = records
        .iter()
        .flat_map(|r| extractor(r))
        .filter(|v| v.is_finite())
        .collect();
    out.sort_by(|a, b| b.total_cmp(a));
    out.dedup();
    out
}

/// Entries of `collection` whose parent is `parent_id`; the whole collection
/// when no parent is selected.
pub fn derive_dependent_options<'a>(
    collection: &'a [ReferenceEntry],
    parent_id: Option<&str>,
) -> Vec<&'a ReferenceEntry> {
    match non_empty(parent_id) {
        None => collection.iter().collect(),
        Some(parent) => collection
            .iter()
            .filter(|e| e.parent_id.as_deref().map(str::trim) == Some(parent))
            .collect(),
    }
}

/// Lookups and reference collections for one dashboard load.
#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    pub colleges: Lookup,
    pub departments: Lookup,
    pub programs: Lookup,
    /// Job id -> company name.
    pub jobs: Lookup,
    reference: ReferenceData,
}

impl FacetIndex {
    pub fn new(reference: &ReferenceData) -> Self {
        FacetIndex {
            colleges: build_lookup(&reference.colleges),
            departments: build_lookup(&reference.departments),
            programs: build_lookup(&reference.programs),
            jobs: build_lookup(&reference.jobs),
            reference: reference.clone(),
        }
    }

    pub fn college_name(&self, id: Option<&str>) -> &str {
        self.colleges.resolve(id)
    }

    pub fn department_name(&self, id: Option<&str>) -> &str {
        self.departments.resolve(id)
    }

    pub fn program_name(&self, id: Option<&str>) -> &str {
        self.programs.resolve(id)
    }

    /// Company behind a placement: its own company name, else the company of
    /// the job it references. Unknown jobs give `None`, not `MISSING_NAME`.
    pub fn company_of<'a>(&'a self, placement: &'a Placement) -> Option<&'a str> {
        non_empty(placement.company.as_deref()).or_else(|| {
            placement
                .job_id
                .as_deref()
                .and_then(|id| self.jobs.get(id))
        })
    }

    pub fn colleges(&self) -> &[ReferenceEntry] {
        &self.reference.colleges
    }

    pub fn department_options(&self, college_id: Option<&str>) -> Vec<&ReferenceEntry> {
        derive_dependent_options(&self.reference.departments, college_id)
    }

    pub fn program_options(&self, department_id: Option<&str>) -> Vec<&ReferenceEntry> {
        derive_dependent_options(&self.reference.programs, department_id)
    }

    pub fn company_options<R: Filterable>(&self, records: &[R]) -> Vec<String> {
        derive_options(records, |r| r.company_names(self))
    }

    pub fn year_options<R: Filterable>(&self, records: &[R]) -> Vec<String> {
        derive_options(records, |r| r.ref_id(RefKey::Year))
    }

    pub fn ctc_options<R: Filterable>(&self, records: &[R]) -> Vec<f64> {
        derive_numeric_options(records, |r| r.ctc_values())
    }
}
