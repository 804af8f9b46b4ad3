//! Field catalog per data source.
//!
//! The live catalog comes from the metadata service. When that call fails the
//! builder keeps working on the built-in catalog from [`fallback`] and the
//! catalog is flagged [`CatalogStatus::Degraded`].

use api_types::{DataSourceType, metadata::FieldMetadata, report::ReportConfiguration};
use thiserror::Error;

use crate::{EngineError, ResultEngine};

pub mod fallback;

pub use fallback::fallback_fields;

/// Failure reported by the metadata transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// No response applied yet for this data source.
    Loading,
    Live,
    /// Built-in fields in use; carries the reason the live catalog was not.
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    data_source: DataSourceType,
    fields: Vec<FieldMetadata>,
    status: CatalogStatus,
}

impl FieldCatalog {
    pub fn loading(data_source: DataSourceType) -> Self {
        Self {
            data_source,
            fields: Vec::new(),
            status: CatalogStatus::Loading,
        }
    }

    pub fn live(data_source: DataSourceType, mut fields: Vec<FieldMetadata>) -> Self {
        fields.retain(|field| field.data_source == data_source);
        fields.sort_by_key(|field| field.default_order);
        Self {
            data_source,
            fields,
            status: CatalogStatus::Live,
        }
    }

    pub fn fallback(data_source: DataSourceType, reason: impl Into<String>) -> Self {
        Self {
            data_source,
            fields: fallback_fields(data_source),
            status: CatalogStatus::Degraded(reason.into()),
        }
    }

    pub fn data_source(&self) -> DataSourceType {
        self.data_source
    }

    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    pub fn status(&self) -> &CatalogStatus {
        &self.status
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, CatalogStatus::Degraded(_))
    }

    pub fn field(&self, field_name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.field_name == field_name)
    }

    /// Like [`field`](Self::field) but unknown names are an error.
    pub fn require(&self, field_name: &str) -> ResultEngine<&FieldMetadata> {
        self.field(field_name)
            .ok_or_else(|| EngineError::UnknownField(field_name.to_string()))
    }

    pub fn filterable(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|field| field.filterable)
    }

    pub fn aggregatable(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|field| field.aggregatable)
    }

    /// Fields flagged `default_visible`, by `default_order`.
    pub fn default_fields(&self) -> Vec<&FieldMetadata> {
        let mut fields: Vec<_> = self
            .fields
            .iter()
            .filter(|field| field.default_visible)
            .collect();
        fields.sort_by_key(|field| field.default_order);
        fields
    }

    pub(crate) fn ensure_source(&self, config: &ReportConfiguration) -> ResultEngine<()> {
        if self.data_source != config.kind() {
            return Err(EngineError::DataSourceMismatch(format!(
                "catalog is for {}, report is for {}",
                self.data_source,
                config.kind()
            )));
        }
        Ok(())
    }
}

/// Choose between the live catalog and the built-in one.
///
/// A transport failure or an empty live catalog both resolve to the fallback
/// catalog with a degraded status; this never fails.
pub fn resolve_fields(
    result: Result<Vec<FieldMetadata>, FetchError>,
    data_source: DataSourceType,
) -> FieldCatalog {
    match result {
        Ok(fields) => {
            let catalog = FieldCatalog::live(data_source, fields);
            if catalog.fields.is_empty() {
                tracing::warn!("metadata service returned no fields for {data_source}");
                return FieldCatalog::fallback(
                    data_source,
                    format!("no fields returned for {data_source}"),
                );
            }
            catalog
        }
        Err(err) => {
            tracing::warn!("metadata fetch for {data_source} failed, using fallback: {err}");
            FieldCatalog::fallback(data_source, err.0)
        }
    }
}
