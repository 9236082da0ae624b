use crate::facets::FacetIndex;
use crate::util::{display_number, non_empty};
use chrono::NaiveDate;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Raw API payloads
// ---------------------------------------------------------------------------

/// A JSON scalar that may arrive either as a number or as a string. Any
/// other shape (bool, array, object) is kept as `Other` and reads as missing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl Loose {
    pub fn to_text(&self) -> String {
        match self {
            Loose::Number(n) => display_number(*n),
            Loose::Text(s) => s.trim().to_string(),
            Loose::Other(_) => String::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Number(n) if n.is_finite() => Some(*n),
            Loose::Number(_) | Loose::Other(_) => None,
            Loose::Text(s) => crate::util::parse_f64_safe(Some(s.as_str())),
        }
    }
}

/// A JSON collection read entry by entry. `null` or a non-array value reads
/// as empty, and entries that do not fit `T` are counted in `malformed`
/// instead of failing the whole payload.
#[derive(Debug, Clone)]
pub struct Entries<T> {
    pub items: Vec<T>,
    pub malformed: usize,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Entries {
            items: Vec::new(),
            malformed: 0,
        }
    }
}

impl<T> Entries<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let serde_json::Value::Array(values) = serde_json::Value::deserialize(deserializer)? else {
            return Ok(Entries::default());
        };
        let mut entries = Entries {
            items: Vec::with_capacity(values.len()),
            malformed: 0,
        };
        for value in values {
            match T::deserialize(value) {
                Ok(item) => entries.items.push(item),
                Err(_) => entries.malformed += 1,
            }
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReference {
    #[serde(default, alias = "_id")]
    pub id: Option<Loose>,
    #[serde(default)]
    pub name: Option<Loose>,
    #[serde(default)]
    pub college_id: Option<Loose>,
    #[serde(default)]
    pub department_id: Option<Loose>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlacement {
    #[serde(default)]
    pub company_name: Option<Loose>,
    #[serde(default)]
    pub job_id: Option<Loose>,
    #[serde(default)]
    pub ctc: Option<Loose>,
    #[serde(default)]
    pub status: Option<Loose>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStudent {
    #[serde(default, alias = "_id")]
    pub id: Option<Loose>,
    #[serde(default)]
    pub name: Option<Loose>,
    #[serde(default)]
    pub registered_number: Option<Loose>,
    #[serde(default)]
    pub email: Option<Loose>,
    #[serde(default)]
    pub phone: Option<Loose>,
    #[serde(default)]
    pub gender: Option<Loose>,
    #[serde(default, alias = "dob")]
    pub date_of_birth: Option<Loose>,
    #[serde(default, alias = "batch")]
    pub graduation_year: Option<Loose>,
    #[serde(default)]
    pub college_id: Option<Loose>,
    #[serde(default)]
    pub department_id: Option<Loose>,
    #[serde(default)]
    pub program_id: Option<Loose>,
    #[serde(default)]
    pub off_campus_placements: Entries<RawPlacement>,
    #[serde(default)]
    pub on_campus_placements: Entries<RawPlacement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJob {
    #[serde(default, alias = "_id")]
    pub id: Option<Loose>,
    #[serde(default, alias = "jobTitle")]
    pub title: Option<Loose>,
    #[serde(default)]
    pub company_name: Option<Loose>,
    #[serde(default)]
    pub ctc: Option<Loose>,
    #[serde(default)]
    pub location: Option<Loose>,
    #[serde(default, alias = "lastDate")]
    pub deadline: Option<Loose>,
    #[serde(default, alias = "batch")]
    pub graduation_year: Option<Loose>,
    #[serde(default)]
    pub college_id: Option<Loose>,
    #[serde(default)]
    pub department_id: Option<Loose>,
    #[serde(default)]
    pub program_id: Option<Loose>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlacementEntry {
    #[serde(default, alias = "_id")]
    pub id: Option<Loose>,
    #[serde(default)]
    pub student_name: Option<Loose>,
    #[serde(default)]
    pub registered_number: Option<Loose>,
    #[serde(default, alias = "batch")]
    pub graduation_year: Option<Loose>,
    #[serde(default)]
    pub college_id: Option<Loose>,
    #[serde(default)]
    pub department_id: Option<Loose>,
    #[serde(default)]
    pub program_id: Option<Loose>,
    /// `"offCampus"` or `"onCampus"`; anything else is treated as off-campus.
    #[serde(default, rename = "type")]
    pub kind: Option<Loose>,
    #[serde(flatten)]
    pub placement: RawPlacement,
}

/// The whole payload handed over by the data source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDataset {
    #[serde(default)]
    pub colleges: Entries<RawReference>,
    #[serde(default)]
    pub departments: Entries<RawReference>,
    #[serde(default)]
    pub programs: Entries<RawReference>,
    #[serde(default)]
    pub jobs: Entries<RawJob>,
    #[serde(default)]
    pub students: Entries<RawStudent>,
    #[serde(default)]
    pub placements: Entries<RawPlacementEntry>,
}

// ---------------------------------------------------------------------------
// Reference collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

impl ReferenceEntry {
    pub fn new(id: &str, name: &str, parent_id: Option<&str>) -> Self {
        ReferenceEntry {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        }
    }
}

/// Static per-load reference collections. `jobs` maps a job id to the
/// company offering it and is what on-campus placements resolve through.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub colleges: Vec<ReferenceEntry>,
    pub departments: Vec<ReferenceEntry>,
    pub programs: Vec<ReferenceEntry>,
    pub jobs: Vec<ReferenceEntry>,
}

// ---------------------------------------------------------------------------
// Narrow record shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKey {
    Year,
    College,
    Department,
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Name,
    RegisteredNumber,
    Email,
    Title,
    Company,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(SearchField::Name),
            "registeredNumber" => Ok(SearchField::RegisteredNumber),
            "email" => Ok(SearchField::Email),
            "title" => Ok(SearchField::Title),
            "company" => Ok(SearchField::Company),
            other => Err(format!("unknown search field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    OffCampus,
    OnCampus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub kind: PlacementKind,
    pub company: Option<String>,
    pub job_id: Option<String>,
    pub ctc: Option<f64>,
    pub status: Option<String>,
}

impl Placement {
    pub fn off_campus(company: &str, ctc: Option<f64>) -> Self {
        Placement {
            kind: PlacementKind::OffCampus,
            company: Some(company.to_string()),
            job_id: None,
            ctc,
            status: None,
        }
    }

    pub fn on_campus(company: &str, status: &str, ctc: Option<f64>) -> Self {
        Placement {
            kind: PlacementKind::OnCampus,
            company: Some(company.to_string()),
            job_id: None,
            ctc,
            status: Some(status.to_string()),
        }
    }

    /// Off-campus entries count once a company is recorded; on-campus entries
    /// only when the status is exactly `"Selected"`.
    pub fn is_placement_event(&self) -> bool {
        match self.kind {
            PlacementKind::OffCampus => non_empty(self.company.as_deref()).is_some(),
            PlacementKind::OnCampus => self.status.as_deref() == Some("Selected"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    pub name: Option<String>,
    pub registered_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub graduation_year: Option<String>,
    pub college_id: Option<String>,
    pub department_id: Option<String>,
    pub program_id: Option<String>,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPosting {
    pub id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub ctc: Option<f64>,
    pub location: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub graduation_year: Option<String>,
    pub college_id: Option<String>,
    pub department_id: Option<String>,
    pub program_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementEntry {
    pub id: String,
    pub student_name: Option<String>,
    pub registered_number: Option<String>,
    pub graduation_year: Option<String>,
    pub college_id: Option<String>,
    pub department_id: Option<String>,
    pub program_id: Option<String>,
    pub placement: Placement,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// What the filter engine needs to know about a record.
pub trait Filterable {
    fn id(&self) -> &str;

    fn ref_id(&self, key: RefKey) -> Option<&str>;

    /// Text searched for `field`. Company names resolve through `index`.
    fn search_text<'a>(&'a self, field: SearchField, index: &'a FacetIndex) -> Option<&'a str>;

    fn placements(&self) -> &[Placement] {
        &[]
    }

    /// Company names attached to this record, resolving job ids through the index.
    fn company_names<'a>(&'a self, index: &'a FacetIndex) -> Vec<&'a str> {
        self.placements()
            .iter()
            .filter_map(|p| index.company_of(p))
            .collect()
    }

    fn ctc_values(&self) -> Vec<f64> {
        self.placements().iter().filter_map(|p| p.ctc).collect()
    }
}

impl<T: Filterable + ?Sized> Filterable for &T {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn ref_id(&self, key: RefKey) -> Option<&str> {
        (**self).ref_id(key)
    }
    fn search_text<'a>(&'a self, field: SearchField, index: &'a FacetIndex) -> Option<&'a str> {
        (**self).search_text(field, index)
    }
    fn placements(&self) -> &[Placement] {
        (**self).placements()
    }
    fn company_names<'a>(&'a self, index: &'a FacetIndex) -> Vec<&'a str> {
        (**self).company_names(index)
    }
    fn ctc_values(&self) -> Vec<f64> {
        (**self).ctc_values()
    }
}

/// Direct field access for spreadsheet export. Computed and index-resolved
/// columns are handled by the exporter itself.
pub trait Exportable: Filterable {
    fn attribute(&self, column: Column) -> Option<Cell>;

    fn date_of_birth(&self) -> Option<NaiveDate> {
        None
    }
}

impl<T: Exportable + ?Sized> Exportable for &T {
    fn attribute(&self, column: Column) -> Option<Cell> {
        (**self).attribute(column)
    }
    fn date_of_birth(&self) -> Option<NaiveDate> {
        (**self).date_of_birth()
    }
}

fn text(value: &Option<String>) -> Option<Cell> {
    non_empty(value.as_deref()).map(|s| Cell::Text(s.to_string()))
}

fn date_cell(value: Option<NaiveDate>) -> Option<Cell> {
    value.map(|d| Cell::Text(d.format("%Y-%m-%d").to_string()))
}

impl Filterable for StudentRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn ref_id(&self, key: RefKey) -> Option<&str> {
        match key {
            RefKey::Year => self.graduation_year.as_deref(),
            RefKey::College => self.college_id.as_deref(),
            RefKey::Department => self.department_id.as_deref(),
            RefKey::Program => self.program_id.as_deref(),
        }
    }

    fn search_text<'a>(&'a self, field: SearchField, _index: &'a FacetIndex) -> Option<&'a str> {
        match field {
            SearchField::Name => self.name.as_deref(),
            SearchField::RegisteredNumber => self.registered_number.as_deref(),
            SearchField::Email => self.email.as_deref(),
            SearchField::Title | SearchField::Company => None,
        }
    }

    fn placements(&self) -> &[Placement] {
        &self.placements
    }
}

impl Exportable for StudentRecord {
    fn attribute(&self, column: Column) -> Option<Cell> {
        match column {
            Column::Name => text(&self.name),
            Column::RegisteredNumber => text(&self.registered_number),
            Column::Email => text(&self.email),
            Column::Phone => text(&self.phone),
            Column::Gender => text(&self.gender),
            Column::DateOfBirth => date_cell(self.date_of_birth),
            Column::GraduationYear => text(&self.graduation_year),
            _ => None,
        }
    }

    fn date_of_birth(&self) -> Option<NaiveDate> {
        self.date_of_birth
    }
}

impl Filterable for JobPosting {
    fn id(&self) -> &str {
        &self.id
    }

    fn ref_id(&self, key: RefKey) -> Option<&str> {
        match key {
            RefKey::Year => self.graduation_year.as_deref(),
            RefKey::College => self.college_id.as_deref(),
            RefKey::Department => self.department_id.as_deref(),
            RefKey::Program => self.program_id.as_deref(),
        }
    }

    fn search_text<'a>(&'a self, field: SearchField, _index: &'a FacetIndex) -> Option<&'a str> {
        match field {
            SearchField::Title => self.title.as_deref(),
            SearchField::Company => self.company.as_deref(),
            _ => None,
        }
    }

    // A posting is matched on the company offering it, not on placements.
    fn company_names<'a>(&'a self, _index: &'a FacetIndex) -> Vec<&'a str> {
        non_empty(self.company.as_deref()).into_iter().collect()
    }

    fn ctc_values(&self) -> Vec<f64> {
        self.ctc.into_iter().collect()
    }
}

impl Exportable for JobPosting {
    fn attribute(&self, column: Column) -> Option<Cell> {
        match column {
            Column::Title => text(&self.title),
            Column::Location => text(&self.location),
            Column::Deadline => date_cell(self.deadline),
            Column::GraduationYear => text(&self.graduation_year),
            _ => None,
        }
    }
}

impl Filterable for PlacementEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn ref_id(&self, key: RefKey) -> Option<&str> {
        match key {
            RefKey::Year => self.graduation_year.as_deref(),
            RefKey::College => self.college_id.as_deref(),
            RefKey::Department => self.department_id.as_deref(),
            RefKey::Program => self.program_id.as_deref(),
        }
    }

    fn search_text<'a>(&'a self, field: SearchField, index: &'a FacetIndex) -> Option<&'a str> {
        match field {
            SearchField::Name => self.student_name.as_deref(),
            SearchField::RegisteredNumber => self.registered_number.as_deref(),
            SearchField::Company => index.company_of(&self.placement),
            SearchField::Email | SearchField::Title => None,
        }
    }

    fn placements(&self) -> &[Placement] {
        std::slice::from_ref(&self.placement)
    }
}

impl Exportable for PlacementEntry {
    fn attribute(&self, column: Column) -> Option<Cell> {
        match column {
            Column::Name => text(&self.student_name),
            Column::RegisteredNumber => text(&self.registered_number),
            Column::GraduationYear => text(&self.graduation_year),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Export vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    RegisteredNumber,
    Email,
    Phone,
    Gender,
    DateOfBirth,
    Age,
    GraduationYear,
    College,
    Department,
    Program,
    PlacementStatus,
    Companies,
    Ctc,
    HighestCtc,
    PlacementEvents,
    Title,
    Location,
    Deadline,
}

impl Column {
    pub const ALL: [Column; 19] = [
        Column::Name,
        Column::RegisteredNumber,
        Column::Email,
        Column::Phone,
        Column::Gender,
        Column::DateOfBirth,
        Column::Age,
        Column::GraduationYear,
        Column::College,
        Column::Department,
        Column::Program,
        Column::PlacementStatus,
        Column::Companies,
        Column::Ctc,
        Column::HighestCtc,
        Column::PlacementEvents,
        Column::Title,
        Column::Location,
        Column::Deadline,
    ];

    /// Header text written to the spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::RegisteredNumber => "Registered Number",
            Column::Email => "Email",
            Column::Phone => "Phone",
            Column::Gender => "Gender",
            Column::DateOfBirth => "Date of Birth",
            Column::Age => "Age",
            Column::GraduationYear => "Graduation Year",
            Column::College => "College",
            Column::Department => "Department",
            Column::Program => "Program",
            Column::PlacementStatus => "Placement Status",
            Column::Companies => "Companies",
            Column::Ctc => "CTC",
            Column::HighestCtc => "Highest CTC",
            Column::PlacementEvents => "Placement Events",
            Column::Title => "Job Title",
            Column::Location => "Location",
            Column::Deadline => "Deadline",
        }
    }

    /// Name accepted on the command line and in column pickers.
    pub fn key(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::RegisteredNumber => "registeredNumber",
            Column::Email => "email",
            Column::Phone => "phone",
            Column::Gender => "gender",
            Column::DateOfBirth => "dateOfBirth",
            Column::Age => "age",
            Column::GraduationYear => "graduationYear",
            Column::College => "college",
            Column::Department => "department",
            Column::Program => "program",
            Column::PlacementStatus => "placementStatus",
            Column::Companies => "companies",
            Column::Ctc => "ctc",
            Column::HighestCtc => "highestCtc",
            Column::PlacementEvents => "placementEvents",
            Column::Title => "title",
            Column::Location => "location",
            Column::Deadline => "deadline",
        }
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown column '{}'", s))
    }
}

/// One spreadsheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }
}

impl Serialize for Cell {
    // Integral numbers are written as integers so row numbers read `1`, not `1.0`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Cell::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => f.write_str(&display_number(*n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_scalars() {
        let n: Loose = serde_json::from_str("2024").unwrap();
        let s: Loose = serde_json::from_str("\" 2024 \"").unwrap();
        assert_eq!(n.to_text(), "2024");
        assert_eq!(s.to_text(), "2024");
        assert_eq!(Loose::Text("6".into()).as_f64(), Some(6.0));
        assert_eq!(Loose::Text("six".into()).as_f64(), None);

        let other: Loose = serde_json::from_str("true").unwrap();
        assert_eq!(other.to_text(), "");
        assert_eq!(other.as_f64(), None);
    }

    #[test]
    fn test_entries_tolerate_null_and_bad_items() {
        let null: Entries<RawPlacement> = serde_json::from_str("null").unwrap();
        assert!(null.items.is_empty());
        assert_eq!(null.malformed, 0);

        let mixed: Entries<RawPlacement> =
            serde_json::from_str(r#"[{"companyName": "Acme"}, 5, {"ctc": 6}]"#).unwrap();
        assert_eq!(mixed.items.len(), 2);
        assert_eq!(mixed.malformed, 1);
    }

    #[test]
    fn test_placement_event_rule() {
        assert!(Placement::off_campus("Acme", None).is_placement_event());
        assert!(!Placement::off_campus("  ", None).is_placement_event());
        assert!(Placement::on_campus("Acme", "Selected", None).is_placement_event());
        assert!(!Placement::on_campus("Acme", "Applied", None).is_placement_event());
        assert!(!Placement::on_campus("Acme", "In Progress", None).is_placement_event());
        assert!(!Placement::on_campus("Acme", "selected", None).is_placement_event());
    }

    #[test]
    fn test_column_parsing() {
        assert_eq!("registeredNumber".parse::<Column>(), Ok(Column::RegisteredNumber));
        assert_eq!(" AGE ".parse::<Column>(), Ok(Column::Age));
        assert!("salary".parse::<Column>().is_err());
        for column in Column::ALL {
            assert_eq!(column.key().parse::<Column>(), Ok(column));
        }
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(6.0).to_string(), "6");
        assert_eq!(Cell::empty().to_string(), "");
        assert_eq!(serde_json::to_string(&Cell::Number(4.5)).unwrap(), "4.5");
        assert_eq!(serde_json::to_string(&Cell::Number(3.0)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Cell::Text("x".into())).unwrap(), "\"x\"");
    }
}
