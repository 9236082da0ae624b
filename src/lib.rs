//! Faceted filtering and tabular reporting over student, job and placement
//! records.
//!
//! Raw payloads are adapted by [`loader`] into narrow record shapes, a
//! [`facets::FacetIndex`] resolves ids and derives filter options,
//! [`filter`] turns a [`filter::FacetSelection`] into a predicate, and
//! [`reports`] summarises or flattens the filtered set for [`output`].
pub mod error;
pub mod facets;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::ReportError;
pub use facets::{build_lookup, derive_dependent_options, derive_options, FacetIndex, Lookup, MISSING_NAME};
pub use filter::{
    classify_placement_status, filter, matches, set_facet, Facet, FacetSelection, PlacementStatus,
    StatusFilter,
};
pub use reports::{company_breakdown, summarize, to_export_rows, ExportRow, Summary, ROW_NUMBER_KEY};
pub use types::{
    Cell, Column, Exportable, Filterable, JobPosting, Placement, PlacementEntry, PlacementKind,
    RefKey, ReferenceData, ReferenceEntry, SearchField, StudentRecord,
};
