use crate::error::ReportError;
use crate::reports::{export_headers, ExportRow};
use crate::types::{Cell, Column};
use log::info;
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    /// Format implied by the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Write export rows in `format`. Refuses an export with no selected columns.
pub fn write_export(
    path: &Path,
    format: ExportFormat,
    rows: &[ExportRow],
    columns: &[Column],
) -> Result<(), ReportError> {
    if columns.is_empty() {
        return Err(ReportError::EmptyExportSelection);
    }
    match format {
        ExportFormat::Csv => write_csv(path, rows, columns)?,
        ExportFormat::Json => write_json(path, &rows)?,
        ExportFormat::Xlsx => write_xlsx(path, rows, columns)?,
    }
    info!("exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[ExportRow], columns: &[Column]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(export_headers(columns))?;
    for r in rows {
        wtr.write_record(r.values().map(|c| c.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn write_xlsx(path: &Path, rows: &[ExportRow], columns: &[Column]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Report")?;

    for (col, header) in export_headers(columns).iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }
    for (i, r) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in r.values().enumerate() {
            match cell {
                Cell::Number(n) => worksheet.write_number(row, col as u16, *n)?,
                Cell::Text(s) if s.is_empty() => continue,
                Cell::Text(s) => worksheet.write_string(row, col as u16, s)?,
            };
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Render at most `max_rows` export rows as a Markdown table.
pub fn render_rows(rows: &[ExportRow], columns: &[Column], max_rows: usize) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(export_headers(columns).into_iter().map(String::from));
    for r in rows.iter().take(max_rows) {
        builder.push_record(r.values().map(|c| c.to_string()));
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn preview_rows(rows: &[ExportRow], columns: &[Column], max_rows: usize) {
    match render_rows(rows, columns, max_rows) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::FacetIndex;
    use crate::reports::{summarize, to_export_rows};
    use crate::types::{Placement, StudentRecord};
    use chrono::NaiveDate;

    fn rows(columns: &[Column]) -> Vec<ExportRow> {
        let records = vec![
            StudentRecord {
                id: "s1".into(),
                name: Some("Asha, Rao".into()),
                graduation_year: Some("2024".into()),
                ..Default::default()
            },
            StudentRecord {
                id: "s2".into(),
                name: Some("Ben".into()),
                ..Default::default()
            },
        ];
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        to_export_rows(&records, &FacetIndex::default(), columns, today)
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out.xlsx")).unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            ExportFormat::from_path(Path::new("out.pdf")),
            Err(ReportError::UnsupportedFormat(_))
        ));
        assert!(ExportFormat::from_path(Path::new("out")).is_err());
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        let columns = [Column::Name, Column::GraduationYear];
        write_export(&path, ExportFormat::Csv, &rows(&columns), &columns).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "S.No,Name,Graduation Year\n1,\"Asha, Rao\",2024\n2,Ben,\n"
        );
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.json");
        let columns = [Column::Name];
        write_export(&path, ExportFormat::Json, &rows(&columns), &columns).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"S.No": 1, "Name": "Asha, Rao"}, {"S.No": 2, "Name": "Ben"}])
        );
    }

    #[test]
    fn test_write_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let records = vec![
            StudentRecord {
                id: "s1".into(),
                placements: vec![
                    Placement::off_campus("Acme", Some(6.0)),
                    Placement::on_campus("Initech", "Selected", Some(9.0)),
                ],
                ..Default::default()
            },
            StudentRecord {
                id: "s2".into(),
                ..Default::default()
            },
        ];
        write_json(&path, &summarize(&records)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "totalRecords": 2,
                "matchedPlacedCount": 1,
                "unplacedCount": 1,
                "totalPlacementEvents": 2
            })
        );
    }

    #[test]
    fn test_write_xlsx_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.xlsx");
        let columns = [Column::Name, Column::GraduationYear];
        write_export(&path, ExportFormat::Xlsx, &rows(&columns), &columns).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_empty_selection_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.csv");
        let result = write_export(&path, ExportFormat::Csv, &rows(&[]), &[]);
        assert!(matches!(result, Err(ReportError::EmptyExportSelection)));
        assert!(!path.exists());
    }

    #[test]
    fn test_render_rows() {
        let columns = [Column::Name];
        let table = render_rows(&rows(&columns), &columns, 1).unwrap();
        assert!(table.contains("| S.No | Name"));
        assert!(table.contains("Asha, Rao"));
        assert!(!table.contains("Ben"));
        assert!(render_rows(&[], &columns, 5).is_none());
    }
}
