//! Report builder engine.
//!
//! Everything here is synchronous and free of I/O. A report is described by an
//! [`api_types::report::ReportConfiguration`]; the builder modules expose pure
//! transitions over it (collected in [`reducer`]), [`validation`] decides
//! whether it may run, and [`ReportSession`] tracks the remote calls made on
//! its behalf.

pub use catalog::{CatalogStatus, FetchError, FieldCatalog, fallback_fields, resolve_fields};
pub use error::{EngineError, ReportFailure};
pub use filters::FilterPatch;
pub use operators::{ValueShape, default_operator, operators_for_type, value_shape};
pub use reducer::{ReportAction, reduce};
pub use selection::preview_columns;
pub use session::{
    Completion, DiscardReason, ExecuteTicket, ExportTicket, MetadataTicket, Notice, NoticeLevel,
    Preview, ReportSession, RequestId, RequestKind, RequestState, TemplateListTicket,
    TemplateSaveTicket, TemplateTicket,
};
pub use sorting::{SortPatch, sort_targets};
pub use validation::{IssueTarget, ValidationIssue, can_execute, ensure_executable, validate};

pub mod aggregations;
pub mod catalog;
mod error;
pub mod filters;
pub mod operators;
pub mod reducer;
pub mod selection;
pub mod session;
pub mod sorting;
mod util;
pub mod validation;

type ResultEngine<T> = Result<T, EngineError>;
