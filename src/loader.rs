// Data source boundary: reads the JSON payload and adapts each raw source
// type into the narrow record shape the engine works on.
use crate::error::ReportError;
use crate::types::{
    Entries, JobPosting, Loose, Placement, PlacementEntry, PlacementKind, RawDataset, RawJob,
    RawPlacement, RawPlacementEntry, RawReference, RawStudent, RefKey, ReferenceData,
    ReferenceEntry, StudentRecord,
};
use crate::util::{non_empty, parse_date_safe};
use log::{info, warn};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub colleges: usize,
    pub departments: usize,
    pub programs: usize,
    pub jobs: usize,
    pub students: usize,
    pub placements: usize,
    /// Entries dropped because they were malformed or carried no usable id.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub reference: ReferenceData,
    pub jobs: Vec<JobPosting>,
    pub students: Vec<StudentRecord>,
    pub placements: Vec<PlacementEntry>,
}

pub fn load_dataset(path: &Path) -> Result<(Dataset, LoadReport), ReportError> {
    let text = std::fs::read_to_string(path)?;
    let (data, report) = parse_dataset(&text)?;
    info!(
        "loaded {}: {} students, {} placement entries, {} jobs, {} skipped",
        path.display(),
        report.students,
        report.placements,
        report.jobs,
        report.skipped
    );
    Ok((data, report))
}

pub fn parse_dataset(json: &str) -> Result<(Dataset, LoadReport), ReportError> {
    let raw: RawDataset = serde_json::from_str(json)?;
    Ok(from_raw(raw))
}

/// Adapt every collection of the payload. Malformed entries and entries
/// without an id are skipped and counted.
pub fn from_raw(raw: RawDataset) -> (Dataset, LoadReport) {
    let mut skipped = 0usize;
    count_malformed(&mut skipped, "college", &raw.colleges);
    count_malformed(&mut skipped, "department", &raw.departments);
    count_malformed(&mut skipped, "program", &raw.programs);
    count_malformed(&mut skipped, "job", &raw.jobs);
    count_malformed(&mut skipped, "student", &raw.students);
    count_malformed(&mut skipped, "placement", &raw.placements);

    let colleges: Vec<ReferenceEntry> = raw
        .colleges
        .iter()
        .filter_map(|r| keep(&mut skipped, "college", adapt_reference(r, None)))
        .collect();
    let departments: Vec<ReferenceEntry> = raw
        .departments
        .iter()
        .filter_map(|r| {
            keep(&mut skipped, "department", adapt_reference(r, Some(RefKey::College)))
        })
        .collect();
    let programs: Vec<ReferenceEntry> = raw
        .programs
        .iter()
        .filter_map(|r| {
            keep(&mut skipped, "program", adapt_reference(r, Some(RefKey::Department)))
        })
        .collect();
    let jobs: Vec<JobPosting> = raw
        .jobs
        .iter()
        .filter_map(|r| keep(&mut skipped, "job", adapt_job(r)))
        .collect();
    let students: Vec<StudentRecord> = raw
        .students
        .iter()
        .filter_map(|r| keep(&mut skipped, "student", adapt_student(r)))
        .collect();
    let placements: Vec<PlacementEntry> = raw
        .placements
        .iter()
        .filter_map(|r| keep(&mut skipped, "placement", adapt_placement_entry(r)))
        .collect();

    let job_companies = jobs
        .iter()
        .filter_map(|j| {
            non_empty(j.company.as_deref()).map(|company| ReferenceEntry::new(&j.id, company, None))
        })
        .collect();

    let report = LoadReport {
        colleges: colleges.len(),
        departments: departments.len(),
        programs: programs.len(),
        jobs: jobs.len(),
        students: students.len(),
        placements: placements.len(),
        skipped,
    };
    let data = Dataset {
        reference: ReferenceData {
            colleges,
            departments,
            programs,
            jobs: job_companies,
        },
        jobs,
        students,
        placements,
    };
    (data, report)
}

fn keep<T>(skipped: &mut usize, kind: &str, adapted: Option<T>) -> Option<T> {
    if adapted.is_none() {
        warn!("skipping {} entry without an id", kind);
        *skipped += 1;
    }
    adapted
}

fn count_malformed<T>(skipped: &mut usize, kind: &str, entries: &Entries<T>) {
    if entries.malformed > 0 {
        warn!("skipping {} malformed {} entries", entries.malformed, kind);
        *skipped += entries.malformed;
    }
}

fn text(value: &Option<Loose>) -> Option<String> {
    value
        .as_ref()
        .map(Loose::to_text)
        .filter(|s| !s.is_empty())
}

// Status is compared exactly, so text is kept untrimmed.
fn verbatim(value: &Option<Loose>) -> Option<String> {
    match value {
        Some(Loose::Text(s)) => Some(s.clone()),
        other => text(other),
    }
}

/// Adapt a college, department or program. `parent` names the id field that
/// links the entry to its parent level: `College` for departments,
/// `Department` for programs, `None` for colleges.
pub fn adapt_reference(raw: &RawReference, parent: Option<RefKey>) -> Option<ReferenceEntry> {
    let parent_id = match parent {
        Some(RefKey::College) => text(&raw.college_id),
        Some(RefKey::Department) => text(&raw.department_id),
        Some(RefKey::Year) | Some(RefKey::Program) | None => None,
    };
    Some(ReferenceEntry {
        id: text(&raw.id)?,
        name: text(&raw.name).unwrap_or_default(),
        parent_id,
    })
}

pub fn adapt_placement(raw: &RawPlacement, kind: PlacementKind) -> Placement {
    Placement {
        kind,
        company: text(&raw.company_name),
        job_id: text(&raw.job_id),
        ctc: raw.ctc.as_ref().and_then(Loose::as_f64),
        status: verbatim(&raw.status),
    }
}

pub fn adapt_student(raw: &RawStudent) -> Option<StudentRecord> {
    let malformed = raw.off_campus_placements.malformed + raw.on_campus_placements.malformed;
    if malformed > 0 {
        warn!("dropping {} malformed placements of a student entry", malformed);
    }
    let placements = raw
        .off_campus_placements
        .iter()
        .map(|p| adapt_placement(p, PlacementKind::OffCampus))
        .chain(
            raw.on_campus_placements
                .iter()
                .map(|p| adapt_placement(p, PlacementKind::OnCampus)),
        )
        .collect();
    Some(StudentRecord {
        id: text(&raw.id)?,
        name: text(&raw.name),
        registered_number: text(&raw.registered_number),
        email: text(&raw.email),
        phone: text(&raw.phone),
        gender: text(&raw.gender),
        date_of_birth: parse_date_safe(text(&raw.date_of_birth).as_deref()),
        graduation_year: text(&raw.graduation_year),
        college_id: text(&raw.college_id),
        department_id: text(&raw.department_id),
        program_id: text(&raw.program_id),
        placements,
    })
}

pub fn adapt_job(raw: &RawJob) -> Option<JobPosting> {
    Some(JobPosting {
        id: text(&raw.id)?,
        title: text(&raw.title),
        company: text(&raw.company_name),
        ctc: raw.ctc.as_ref().and_then(Loose::as_f64),
        location: text(&raw.location),
        deadline: parse_date_safe(text(&raw.deadline).as_deref()),
        graduation_year: text(&raw.graduation_year),
        college_id: text(&raw.college_id),
        department_id: text(&raw.department_id),
        program_id: text(&raw.program_id),
    })
}

pub fn adapt_placement_entry(raw: &RawPlacementEntry) -> Option<PlacementEntry> {
    let kind = match text(&raw.kind).as_deref() {
        Some("onCampus") => PlacementKind::OnCampus,
        _ => PlacementKind::OffCampus,
    };
    Some(PlacementEntry {
        id: text(&raw.id)?,
        student_name: text(&raw.student_name),
        registered_number: text(&raw.registered_number),
        graduation_year: text(&raw.graduation_year),
        college_id: text(&raw.college_id),
        department_id: text(&raw.department_id),
        program_id: text(&raw.program_id),
        placement: adapt_placement(&raw.placement, kind),
    })
}
