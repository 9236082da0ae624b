// Facet selection state and the predicate built from it.
//
// A selection is an immutable snapshot: `set_facet` returns a new one with the
// cascade reset already applied, so a child facet never outlives a change of
// its parent.
use crate::facets::FacetIndex;
use crate::types::{Filterable, RefKey, SearchField};
use crate::util::{fold_case, non_empty, parse_f64_safe};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Year,
    College,
    Department,
    Program,
    Company,
    Ctc,
    Status,
    Search,
    SearchField,
}

impl Facet {
    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Year => "year",
            Facet::College => "college",
            Facet::Department => "department",
            Facet::Program => "program",
            Facet::Company => "company",
            Facet::Ctc => "ctc",
            Facet::Status => "status",
            Facet::Search => "search",
            Facet::SearchField => "searchField",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent facet -> facets that must be cleared whenever the parent is set.
static CASCADE: Lazy<HashMap<Facet, &'static [Facet]>> = Lazy::new(|| {
    HashMap::from([
        (Facet::College, &[Facet::Department, Facet::Program][..]),
        (Facet::Department, &[Facet::Program][..]),
    ])
});

pub fn cascade_targets(facet: Facet) -> &'static [Facet] {
    CASCADE.get(&facet).copied().unwrap_or(&[])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStatus {
    Placed,
    Unplaced,
}

impl PlacementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementStatus::Placed => "placed",
            PlacementStatus::Unplaced => "unplaced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Placed,
    Unplaced,
}

impl StatusFilter {
    /// `all`, `placed` or `unplaced`, ignoring case. Anything else means `all`.
    pub fn parse_lenient(s: &str) -> Self {
        match fold_case(s).as_str() {
            "placed" => StatusFilter::Placed,
            "unplaced" => StatusFilter::Unplaced,
            _ => StatusFilter::All,
        }
    }
}

/// Current value of every facet. `None` is the no-filter sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSelection {
    pub year: Option<String>,
    pub college: Option<String>,
    pub department: Option<String>,
    pub program: Option<String>,
    pub company: Option<String>,
    /// Kept as entered; coerced to a number when matching.
    pub ctc: Option<String>,
    pub status: StatusFilter,
    pub search: Option<String>,
    pub search_field: SearchField,
}

impl Default for FacetSelection {
    fn default() -> Self {
        FacetSelection {
            year: None,
            college: None,
            department: None,
            program: None,
            company: None,
            ctc: None,
            status: StatusFilter::All,
            search: None,
            search_field: SearchField::Name,
        }
    }
}

impl FacetSelection {
    /// Chainable form of [`set_facet`].
    pub fn with(self, facet: Facet, value: &str) -> Self {
        set_facet(&self, facet, value)
    }

    pub fn value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Year => self.year.clone(),
            Facet::College => self.college.clone(),
            Facet::Department => self.department.clone(),
            Facet::Program => self.program.clone(),
            Facet::Company => self.company.clone(),
            Facet::Ctc => self.ctc.clone(),
            Facet::Status => match self.status {
                StatusFilter::All => None,
                StatusFilter::Placed => Some("placed".to_string()),
                StatusFilter::Unplaced => Some("unplaced".to_string()),
            },
            Facet::Search => self.search.clone(),
            Facet::SearchField => None,
        }
    }

    /// Facets currently narrowing the result.
    pub fn active_facets(&self) -> Vec<Facet> {
        [
            Facet::Year,
            Facet::College,
            Facet::Department,
            Facet::Program,
            Facet::Company,
            Facet::Ctc,
            Facet::Status,
            Facet::Search,
        ]
        .into_iter()
        .filter(|f| self.value(*f).is_some())
        .collect()
    }

    fn assign(&mut self, facet: Facet, value: &str) {
        let value = non_empty(Some(value)).map(str::to_string);
        match facet {
            Facet::Year => self.year = value,
            Facet::College => self.college = value,
            Facet::Department => self.department = value,
            Facet::Program => self.program = value,
            Facet::Company => self.company = value,
            Facet::Ctc => self.ctc = value,
            Facet::Status => {
                self.status = value
                    .as_deref()
                    .map(StatusFilter::parse_lenient)
                    .unwrap_or_default()
            }
            Facet::Search => self.search = value,
            Facet::SearchField => {
                self.search_field = value
                    .as_deref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(SearchField::Name)
            }
        }
    }
}

/// Pure update of one facet. Setting a parent facet clears its descendants in
/// the same step. An empty (or blank) value clears the facet.
pub fn set_facet(selection: &FacetSelection, facet: Facet, value: &str) -> FacetSelection {
    let mut next = selection.clone();
    next.assign(facet, value);
    for child in cascade_targets(facet) {
        next.assign(*child, "");
    }
    next
}

/// `Placed` when at least one placement sub-record is a placement event.
pub fn classify_placement_status<R: Filterable>(record: &R) -> PlacementStatus {
    if record.placements().iter().any(|p| p.is_placement_event()) {
        PlacementStatus::Placed
    } else {
        PlacementStatus::Unplaced
    }
}

fn matches_ref<R: Filterable>(record: &R, key: RefKey, selected: &Option<String>) -> bool {
    match selected {
        None => true,
        Some(want) => record.ref_id(key).map(str::trim) == Some(want.trim()),
    }
}

fn matches_company<R: Filterable>(record: &R, selected: &Option<String>, index: &FacetIndex) -> bool {
    match selected {
        None => true,
        Some(want) => {
            let want = fold_case(want);
            record
                .company_names(index)
                .iter()
                .any(|name| fold_case(name) == want)
        }
    }
}

fn matches_ctc<R: Filterable>(record: &R, selected: &Option<String>) -> bool {
    match selected {
        None => true,
        Some(raw) => match parse_f64_safe(Some(raw.as_str())) {
            Some(want) => record.ctc_values().iter().any(|v| *v == want),
            None => false,
        },
    }
}

fn matches_status<R: Filterable>(record: &R, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Placed => classify_placement_status(record) == PlacementStatus::Placed,
        StatusFilter::Unplaced => classify_placement_status(record) == PlacementStatus::Unplaced,
    }
}

fn matches_search<R: Filterable>(
    record: &R,
    term: &Option<String>,
    field: SearchField,
    index: &FacetIndex,
) -> bool {
    let Some(term) = non_empty(term.as_deref()) else {
        return true;
    };
    let term = term.to_lowercase();
    record
        .search_text(field, index)
        .map(|text| text.to_lowercase().contains(&term))
        .unwrap_or(false)
}

/// Conjunction of every active facet.
pub fn matches<R: Filterable>(record: &R, selection: &FacetSelection, index: &FacetIndex) -> bool {
    matches_ref(record, RefKey::Year, &selection.year)
        && matches_ref(record, RefKey::College, &selection.college)
        && matches_ref(record, RefKey::Department, &selection.department)
        && matches_ref(record, RefKey::Program, &selection.program)
        && matches_company(record, &selection.company, index)
        && matches_ctc(record, &selection.ctc)
        && matches_status(record, selection.status)
        && matches_search(record, &selection.search, selection.search_field, index)
}

/// Records satisfying `selection`, in their original order.
pub fn filter<'a, R: Filterable>(
    records: &'a [R],
    selection: &FacetSelection,
    index: &FacetIndex,
) -> Vec<&'a R> {
    let out: Vec<&R> = records
        .iter()
        .filter(|r| matches(*r, selection, index))
        .collect();
    debug!(
        "filter matched {} of {} records (active facets: {:?})",
        out.len(),
        records.len(),
        selection.active_facets()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobPosting, Placement, PlacementKind, StudentRecord};

    fn student(id: &str, name: &str, college: &str, dept: &str, placements: Vec<Placement>) -> StudentRecord {
        StudentRecord {
            id: id.to_string(),
            name: Some(name.to_string()),
            registered_number: Some(format!("REG-{}", id)),
            graduation_year: Some("2024".to_string()),
            college_id: Some(college.to_string()),
            department_id: Some(dept.to_string()),
            program_id: Some(format!("{}-prog", dept)),
            placements,
            ..Default::default()
        }
    }

    fn fixture() -> Vec<StudentRecord> {
        vec![
            student("1", "Asha Rao", "c1", "d1", vec![Placement::off_campus("TechCorp", Some(6.0))]),
            student("2", "Ben Ortiz", "c1", "d2", vec![Placement::on_campus("Acme", "Applied", Some(8.0))]),
            student("3", "Chen Li", "c2", "d3", vec![Placement::on_campus("Acme", "Selected", Some(8.0))]),
            student("4", "Dina Shah", "c2", "d3", vec![]),
        ]
    }

    fn ids<R: Filterable>(records: &[R]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_college_cascade_clears_children() {
        let sel = FacetSelection::default()
            .with(Facet::College, "c1")
            .with(Facet::Department, "d1")
            .with(Facet::Program, "p1")
            .with(Facet::Company, "Acme");
        let next = set_facet(&sel, Facet::College, "c2");
        assert_eq!(next.college.as_deref(), Some("c2"));
        assert_eq!(next.department, None);
        assert_eq!(next.program, None);
        assert_eq!(next.company.as_deref(), Some("Acme"));
        // The input snapshot is untouched.
        assert_eq!(sel.department.as_deref(), Some("d1"));
    }

    #[test]
    fn test_department_cascade_clears_program_only() {
        let sel = FacetSelection::default()
            .with(Facet::College, "c1")
            .with(Facet::Department, "d1")
            .with(Facet::Program, "p1");
        let next = set_facet(&sel, Facet::Department, "d2");
        assert_eq!(next.college.as_deref(), Some("c1"));
        assert_eq!(next.department.as_deref(), Some("d2"));
        assert_eq!(next.program, None);
    }

    #[test]
    fn test_independent_facets_do_not_cascade() {
        let sel = FacetSelection::default()
            .with(Facet::College, "c1")
            .with(Facet::Department, "d1")
            .with(Facet::Program, "p1");
        for facet in [Facet::Year, Facet::Company, Facet::Ctc, Facet::Status, Facet::Search, Facet::Program] {
            assert!(cascade_targets(facet).is_empty());
            let next = set_facet(&sel, facet, "x");
            assert_eq!(next.college.as_deref(), Some("c1"));
            assert_eq!(next.department.as_deref(), Some("d1"));
        }
    }

    #[test]
    fn test_blank_value_clears_facet() {
        let sel = FacetSelection::default().with(Facet::Year, "2024");
        assert_eq!(sel.active_facets(), vec![Facet::Year]);
        let cleared = sel.with(Facet::Year, "  ");
        assert_eq!(cleared, FacetSelection::default());
        assert!(cleared.active_facets().is_empty());
    }

    #[test]
    fn test_status_and_search_field_parsing() {
        let sel = FacetSelection::default().with(Facet::Status, "PLACED");
        assert_eq!(sel.status, StatusFilter::Placed);
        let sel = sel.with(Facet::Status, "bogus");
        assert_eq!(sel.status, StatusFilter::All);
        let sel = sel.with(Facet::SearchField, "registeredNumber");
        assert_eq!(sel.search_field, SearchField::RegisteredNumber);
        let sel = sel.with(Facet::SearchField, "nickname");
        assert_eq!(sel.search_field, SearchField::Name);
    }

    #[test]
    fn test_classify_placement_status() {
        let records = fixture();
        let statuses: Vec<PlacementStatus> = records.iter().map(classify_placement_status).collect();
        assert_eq!(
            statuses,
            vec![
                PlacementStatus::Placed,
                PlacementStatus::Unplaced,
                PlacementStatus::Placed,
                PlacementStatus::Unplaced,
            ]
        );
    }

    #[test]
    fn test_filter_by_reference_ids() {
        let records = fixture();
        let index = FacetIndex::default();
        let sel = FacetSelection::default().with(Facet::College, "c2");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["3", "4"]);
        let sel = sel.with(Facet::Department, "d9");
        assert!(filter(&records, &sel, &index).is_empty());
    }

    #[test]
    fn test_filter_by_company_ctc_and_status() {
        let records = fixture();
        let index = FacetIndex::default();

        let sel = FacetSelection::default().with(Facet::Company, "acme");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["2", "3"]);

        let sel = sel.with(Facet::Status, "placed");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["3"]);

        let sel = FacetSelection::default().with(Facet::Ctc, "8");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["2", "3"]);

        let sel = FacetSelection::default().with(Facet::Ctc, "eight");
        assert!(filter(&records, &sel, &index).is_empty());

        let sel = FacetSelection::default().with(Facet::Status, "unplaced");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["2", "4"]);
    }

    #[test]
    fn test_search_uses_selected_field_only() {
        let records = fixture();
        let index = FacetIndex::default();
        let sel = FacetSelection::default().with(Facet::Search, "li");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["3"]);

        let sel = sel
            .with(Facet::SearchField, "registeredNumber")
            .with(Facet::Search, "reg-4");
        assert_eq!(ids(&filter(&records, &sel, &index)), vec!["4"]);

        // Students carry no job title, so a title search matches nothing.
        let sel = sel.with(Facet::SearchField, "title").with(Facet::Search, "a");
        assert!(filter(&records, &sel, &index).is_empty());
    }

    #[test]
    fn test_company_via_job_reference() {
        use crate::types::{ReferenceData, ReferenceEntry};
        let index = FacetIndex::new(&ReferenceData {
            jobs: vec![ReferenceEntry::new("j7", "Globex", None)],
            ..Default::default()
        });
        let record = student(
            "9",
            "Eva",
            "c1",
            "d1",
            vec![Placement {
                kind: PlacementKind::OnCampus,
                company: None,
                job_id: Some("j7".into()),
                ctc: None,
                status: Some("Selected".into()),
            }],
        );
        let sel = FacetSelection::default().with(Facet::Company, "GLOBEX");
        assert!(matches(&record, &sel, &index));
    }

    #[test]
    fn test_company_search_resolves_job_reference() {
        use crate::types::{PlacementEntry, ReferenceData, ReferenceEntry};
        let index = FacetIndex::new(&ReferenceData {
            jobs: vec![ReferenceEntry::new("j7", "Globex", None)],
            ..Default::default()
        });
        let entries = vec![PlacementEntry {
            id: "e1".into(),
            student_name: Some("Eva".into()),
            registered_number: None,
            graduation_year: None,
            college_id: None,
            department_id: None,
            program_id: None,
            placement: Placement {
                kind: PlacementKind::OnCampus,
                company: None,
                job_id: Some("j7".into()),
                ctc: None,
                status: Some("Selected".into()),
            },
        }];
        let by_facet = FacetSelection::default().with(Facet::Company, "globex");
        let by_search = FacetSelection::default()
            .with(Facet::SearchField, "company")
            .with(Facet::Search, "glob");
        assert_eq!(ids(&filter(&entries, &by_facet, &index)), vec!["e1"]);
        assert_eq!(ids(&filter(&entries, &by_search, &index)), vec!["e1"]);

        let unknown = by_search.with(Facet::Search, "initech");
        assert!(filter(&entries, &unknown, &index).is_empty());
    }

    #[test]
    fn test_jobs_match_on_own_company() {
        let jobs = vec![
            JobPosting {
                id: "j1".into(),
                title: Some("Backend Engineer".into()),
                company: Some("TechCorp".into()),
                ctc: Some(12.0),
                ..Default::default()
            },
            JobPosting {
                id: "j2".into(),
                title: Some("Analyst".into()),
                company: Some("Acme".into()),
                ctc: Some(6.0),
                ..Default::default()
            },
        ];
        let index = FacetIndex::default();
        let sel = FacetSelection::default().with(Facet::Company, "techcorp");
        assert_eq!(ids(&filter(&jobs, &sel, &index)), vec!["j1"]);
        let sel = FacetSelection::default()
            .with(Facet::SearchField, "title")
            .with(Facet::Search, "ANALYST");
        assert_eq!(ids(&filter(&jobs, &sel, &index)), vec!["j2"]);
    }
}
