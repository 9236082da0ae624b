// Command-line host for the report engine.
//
// Each subcommand loads the dataset once, applies the facet flags through
// `set_facet` (parents before children, so the cascade never discards a
// child given on the same command line) and prints or exports the result.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use placement_report::facets::FacetIndex;
use placement_report::filter::{filter, set_facet, Facet, FacetSelection};
use placement_report::loader::{load_dataset, Dataset};
use placement_report::output::{self, ExportFormat};
use placement_report::reports::{company_breakdown, summarize, to_export_rows, Summary};
use placement_report::types::{Column, Exportable, Filterable, ReferenceEntry};
use placement_report::util::{display_number, format_int};

#[derive(Parser)]
#[command(name = "placement-report")]
#[command(about = "Faceted placement reports over university records", long_about = None)]
struct Cli {
    /// JSON dataset exported from the university backend
    #[arg(long, global = true, env = "PLACEMENT_REPORT_DATA", default_value = "dataset.json")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FacetArgs {
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    college: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    program: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    ctc: Option<String>,
    /// all, placed or unplaced
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    search: Option<String>,
    /// name, registeredNumber, email, title or company
    #[arg(long)]
    search_field: Option<String>,
}

impl FacetArgs {
    fn selection(&self) -> FacetSelection {
        let flags = [
            (Facet::College, &self.college),
            (Facet::Department, &self.department),
            (Facet::Program, &self.program),
            (Facet::Year, &self.year),
            (Facet::Company, &self.company),
            (Facet::Ctc, &self.ctc),
            (Facet::Status, &self.status),
            (Facet::SearchField, &self.search_field),
            (Facet::Search, &self.search),
        ];
        flags
            .into_iter()
            .fold(FacetSelection::default(), |sel, (facet, value)| match value {
                Some(v) => set_facet(&sel, facet, v),
                None => sel,
            })
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    Students,
    Placements,
    Jobs,
}

#[derive(Subcommand)]
enum Commands {
    /// Print placed/unplaced counts for the filtered records
    Summary {
        #[command(flatten)]
        facets: FacetArgs,
        #[arg(long, value_enum, default_value_t = Source::Students)]
        source: Source,
        /// Also write the counts as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// List the options available to each filter control
    Options {
        #[command(flatten)]
        facets: FacetArgs,
    },
    /// Export the filtered records to CSV, JSON or XLSX
    Export {
        #[command(flatten)]
        facets: FacetArgs,
        #[arg(long, value_enum, default_value_t = Source::Students)]
        source: Source,
        /// Comma-separated column names, e.g. name,registeredNumber,college
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        #[arg(long)]
        out: PathBuf,
        /// csv, json or xlsx; inferred from the file extension when omitted
        #[arg(long)]
        format: Option<String>,
        /// Date used to compute ages (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Placement events per company for the filtered records
    Companies {
        #[command(flatten)]
        facets: FacetArgs,
        #[arg(long, value_enum, default_value_t = Source::Students)]
        source: Source,
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },
    /// Preview the filtered job postings
    Jobs {
        #[command(flatten)]
        facets: FacetArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn print_summary<R: Filterable>(
    records: &[R],
    selection: &FacetSelection,
    index: &FacetIndex,
) -> Summary {
    let filtered = filter(records, selection, index);
    let summary = summarize(&filtered);
    println!("Records matched:      {}", format_int(summary.total_records));
    println!("Placed:               {}", format_int(summary.matched_placed_count));
    println!("Unplaced:             {}", format_int(summary.unplaced_count));
    println!("Placement events:     {}\n", format_int(summary.total_placement_events));
    summary
}

fn print_companies<R: Filterable>(
    records: &[R],
    selection: &FacetSelection,
    index: &FacetIndex,
    limit: usize,
) {
    let filtered = filter(records, selection, index);
    let rows = company_breakdown(&filtered, index);
    println!("Placements by company ({} companies)\n", format_int(rows.len()));
    output::preview_table_rows(&rows, limit);
}

fn run_export<R: Exportable>(
    records: &[R],
    selection: &FacetSelection,
    index: &FacetIndex,
    columns: &[Column],
    out: &Path,
    format: ExportFormat,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let filtered = filter(records, selection, index);
    let rows = to_export_rows(&filtered, index, columns, today);
    output::write_export(out, format, &rows, columns)
        .with_context(|| format!("failed to export to {}", out.display()))?;
    output::preview_rows(&rows, columns, 5);
    println!(
        "(Exported {} rows to {})\n",
        format_int(rows.len()),
        out.display()
    );
    Ok(())
}

fn option_names(entries: &[&ReferenceEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} ({})", e.name, e.id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_options(data: &Dataset, selection: &FacetSelection, index: &FacetIndex) {
    println!("Colleges:     {}", option_names(&index.colleges().iter().collect::<Vec<_>>()));
    println!(
        "Departments:  {}",
        option_names(&index.department_options(selection.college.as_deref()))
    );
    println!(
        "Programs:     {}",
        option_names(&index.program_options(selection.department.as_deref()))
    );
    println!("Years:        {}", index.year_options(&data.students).join(", "));
    println!("Companies:    {}", index.company_options(&data.students).join(", "));
    println!(
        "CTC:          {}\n",
        index
            .ctc_options(&data.students)
            .into_iter()
            .map(display_number)
            .collect::<Vec<_>>()
            .join(", ")
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let (data, _) = load_dataset(&cli.data)
        .with_context(|| format!("failed to load dataset {}", cli.data.display()))?;
    let index = FacetIndex::new(&data.reference);

    match cli.command {
        Commands::Summary {
            facets,
            source,
            json,
        } => {
            let selection = facets.selection();
            info!("active facets: {:?}", selection.active_facets());
            let summary = match source {
                Source::Students => print_summary(&data.students, &selection, &index),
                Source::Placements => print_summary(&data.placements, &selection, &index),
                Source::Jobs => print_summary(&data.jobs, &selection, &index),
            };
            if let Some(path) = json {
                output::write_json(&path, &summary)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("(Summary written to {})\n", path.display());
            }
        }
        Commands::Options { facets } => {
            print_options(&data, &facets.selection(), &index);
        }
        Commands::Export {
            facets,
            source,
            columns,
            out,
            format,
            today,
        } => {
            let columns = columns
                .iter()
                .map(|c| c.parse::<Column>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?;
            if columns.is_empty() {
                bail!("select at least one column to export (--columns)");
            }
            let format = match format {
                Some(f) => f.parse::<ExportFormat>()?,
                None => ExportFormat::from_path(&out)?,
            };
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let selection = facets.selection();
            match source {
                Source::Students => {
                    run_export(&data.students, &selection, &index, &columns, &out, format, today)?
                }
                Source::Placements => {
                    run_export(&data.placements, &selection, &index, &columns, &out, format, today)?
                }
                Source::Jobs => {
                    run_export(&data.jobs, &selection, &index, &columns, &out, format, today)?
                }
            }
        }
        Commands::Companies {
            facets,
            source,
            limit,
        } => {
            let selection = facets.selection();
            match source {
                Source::Students => print_companies(&data.students, &selection, &index, limit),
                Source::Placements => print_companies(&data.placements, &selection, &index, limit),
                Source::Jobs => print_companies(&data.jobs, &selection, &index, limit),
            }
        }
        Commands::Jobs { facets, limit } => {
            let selection = facets.selection();
            let columns = [
                Column::Title,
                Column::Companies,
                Column::Ctc,
                Column::Location,
                Column::Deadline,
                Column::Department,
            ];
            let filtered = filter(&data.jobs, &selection, &index);
            let today = Local::now().date_naive();
            let rows = to_export_rows(&filtered, &index, &columns, today);
            println!("Job postings ({} matched)\n", format_int(rows.len()));
            output::preview_rows(&rows, &columns, limit);
        }
    }

    Ok(())
}
