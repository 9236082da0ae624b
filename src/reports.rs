use crate::facets::FacetIndex;
use crate::filter::{classify_placement_status, PlacementStatus};
use crate::types::{Cell, Column, Exportable, Filterable, RefKey};
use crate::util::{age_on, display_number, fold_case, format_number};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use tabled::Tabled;

/// Key of the 1-based row number present in every export row.
pub const ROW_NUMBER_KEY: &str = "S.No";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_records: usize,
    pub matched_placed_count: usize,
    pub unplaced_count: usize,
    /// Qualifying placement sub-records. One record may contribute several.
    pub total_placement_events: usize,
}

pub fn placement_events<R: Filterable>(record: &R) -> usize {
    record
        .placements()
        .iter()
        .filter(|p| p.is_placement_event())
        .count()
}

pub fn summarize<R: Filterable>(records: &[R]) -> Summary {
    let mut summary = Summary::default();
    for r in records {
        summary.total_records += 1;
        match classify_placement_status(r) {
            PlacementStatus::Placed => summary.matched_placed_count += 1,
            PlacementStatus::Unplaced => summary.unplaced_count += 1,
        }
        summary.total_placement_events += placement_events(r);
    }
    summary
}

/// One flat export row. Keys keep the order the columns were selected in,
/// after the leading row number.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    cells: Vec<(&'static str, Cell)>,
}

impl ExportRow {
    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(k, _)| *k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ExportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Header row matching the keys produced by [`to_export_rows`].
pub fn export_headers(columns: &[Column]) -> Vec<&'static str> {
    std::iter::once(ROW_NUMBER_KEY)
        .chain(columns.iter().map(|c| c.label()))
        .collect()
}

fn joined(values: impl IntoIterator<Item = String>) -> Option<Cell> {
    let parts: Vec<String> = values.into_iter().collect();
    if parts.is_empty() {
        None
    } else {
        Some(Cell::Text(parts.join(", ")))
    }
}

fn export_cell<R: Exportable>(record: &R, column: Column, index: &FacetIndex, today: NaiveDate) -> Cell {
    let value = match column {
        Column::Age => record
            .date_of_birth()
            .and_then(|dob| age_on(dob, today))
            .map(|age| Cell::Number(age as f64)),
        Column::College => Some(Cell::Text(
            index.college_name(record.ref_id(RefKey::College)).to_string(),
        )),
        Column::Department => Some(Cell::Text(
            index.department_name(record.ref_id(RefKey::Department)).to_string(),
        )),
        Column::Program => Some(Cell::Text(
            index.program_name(record.ref_id(RefKey::Program)).to_string(),
        )),
        Column::PlacementStatus => Some(Cell::Text(
            match classify_placement_status(record) {
                PlacementStatus::Placed => "Placed",
                PlacementStatus::Unplaced => "Unplaced",
            }
            .to_string(),
        )),
        Column::Companies => joined(record.company_names(index).into_iter().map(str::to_string)),
        Column::Ctc => joined(record.ctc_values().into_iter().map(display_number)),
        Column::HighestCtc => record
            .ctc_values()
            .into_iter()
            .max_by(|a, b| a.total_cmp(b))
            .map(Cell::Number),
        Column::PlacementEvents => Some(Cell::Number(placement_events(record) as f64)),
        other => record.attribute(other),
    };
    value.unwrap_or_else(Cell::empty)
}

/// Flatten `records` for a spreadsheet. Every row has the row number plus
/// exactly `columns`, in that order; values that cannot be produced are empty
/// strings. With no columns each row holds only the row number.
pub fn to_export_rows<R: Exportable>(
    records: &[R],
    index: &FacetIndex,
    columns: &[Column],
    today: NaiveDate,
) -> Vec<ExportRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut cells = Vec::with_capacity(columns.len() + 1);
            cells.push((ROW_NUMBER_KEY, Cell::Number((i + 1) as f64)));
            for column in columns {
                cells.push((column.label(), export_cell(record, *column, index, today)));
            }
            ExportRow { cells }
        })
        .collect()
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CompanyRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "PlacedRecords")]
    #[tabled(rename = "PlacedRecords")]
    pub placed_records: usize,
    #[serde(rename = "PlacementEvents")]
    #[tabled(rename = "PlacementEvents")]
    pub placement_events: usize,
    #[serde(rename = "HighestCtc")]
    #[tabled(rename = "HighestCtc")]
    pub highest_ctc: String,
}

/// Placement events grouped by company (case-insensitive), busiest first.
pub fn company_breakdown<R: Filterable>(records: &[R], index: &FacetIndex) -> Vec<CompanyRow> {
    struct Acc {
        company: String,
        records: HashSet<usize>,
        events: usize,
        highest_ctc: Option<f64>,
    }

    let mut map: HashMap<String, Acc> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        for p in r.placements().iter().filter(|p| p.is_placement_event()) {
            let Some(company) = index.company_of(p) else {
                continue;
            };
            let e = map.entry(fold_case(company)).or_insert_with(|| Acc {
                company: company.to_string(),
                records: HashSet::new(),
                events: 0,
                highest_ctc: None,
            });
            e.events += 1;
            e.records.insert(i);
            if let Some(ctc) = p.ctc {
                e.highest_ctc = Some(e.highest_ctc.map_or(ctc, |h| h.max(ctc)));
            }
        }
    }

    let mut accs: Vec<Acc> = map.into_values().collect();
    accs.sort_by(|a, b| {
        b.events
            .cmp(&a.events)
            .then_with(|| fold_case(&a.company).cmp(&fold_case(&b.company)))
    });
    accs.into_iter()
        .map(|acc| CompanyRow {
            company: acc.company,
            placed_records: acc.records.len(),
            placement_events: acc.events,
            highest_ctc: acc
                .highest_ctc
                .map(|c| format_number(c, 2))
                .unwrap_or_default(),
        })
        .collect()
}
