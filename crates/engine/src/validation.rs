//! Client-side checks run before a report is sent anywhere.

use std::collections::HashSet;

use api_types::report::ReportConfiguration;
use uuid::Uuid;

use crate::{
    EngineError, FieldCatalog, ResultEngine,
    operators::{check_operand, is_operator_allowed},
};

/// Which part of the report an issue belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueTarget {
    DataSource,
    Fields,
    Field(String),
    Filter(Uuid),
    Sort(usize),
    Aggregation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub target: IssueTarget,
    pub message: String,
}

impl ValidationIssue {
    fn new(target: IssueTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            IssueTarget::DataSource | IssueTarget::Fields => write!(f, "{}", self.message),
            IssueTarget::Field(name) => write!(f, "field {name}: {}", self.message),
            IssueTarget::Filter(id) => write!(f, "filter {id}: {}", self.message),
            IssueTarget::Sort(index) => write!(f, "sort {index}: {}", self.message),
            IssueTarget::Aggregation(alias) => write!(f, "aggregation {alias}: {}", self.message),
        }
    }
}

/// A report can run when at least one selected field is visible.
pub fn can_execute(config: &ReportConfiguration) -> bool {
    config.fields.iter().any(|field| field.visible)
}

/// Every problem that would stop `config` from running, in report order.
pub fn validate(config: &ReportConfiguration, catalog: &FieldCatalog) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if catalog.data_source() != config.kind() {
        issues.push(ValidationIssue::new(
            IssueTarget::DataSource,
            format!("fields for {} are not loaded", config.kind()),
        ));
        return issues;
    }

    if !can_execute(config) {
        issues.push(ValidationIssue::new(
            IssueTarget::Fields,
            "select at least one visible field",
        ));
    }
    for field in &config.fields {
        if catalog.field(&field.source_field).is_none() {
            issues.push(ValidationIssue::new(
                IssueTarget::Field(field.source_field.clone()),
                format!("unknown field for {}", config.kind()),
            ));
        }
    }

    for (index, filter) in config.filters.iter().enumerate() {
        let target = || IssueTarget::Filter(filter.id);
        match (index, filter.logical_operator) {
            (0, Some(_)) => issues.push(ValidationIssue::new(
                target(),
                "the first filter cannot have a logical operator",
            )),
            (1.., None) => issues.push(ValidationIssue::new(
                target(),
                "missing AND/OR before this filter",
            )),
            _ => {}
        }

        let Some(meta) = catalog.field(&filter.field) else {
            issues.push(ValidationIssue::new(
                target(),
                format!("unknown field {}", filter.field),
            ));
            continue;
        };
        if !meta.filterable {
            issues.push(ValidationIssue::new(
                target(),
                format!("{} cannot be filtered", filter.field),
            ));
            continue;
        }
        if !is_operator_allowed(meta.data_type, filter.operator) {
            issues.push(ValidationIssue::new(
                target(),
                format!(
                    "{} is not available for {} fields",
                    filter.operator,
                    meta.data_type.as_str()
                ),
            ));
            continue;
        }
        if let Err(message) = check_operand(meta, filter.operator, filter.value.as_ref()) {
            issues.push(ValidationIssue::new(
                target(),
                format!("{}: {message}", filter.field),
            ));
        }
    }

    let mut sorted = HashSet::new();
    for (index, key) in config.order_by.iter().enumerate() {
        let visible = config
            .fields
            .iter()
            .any(|field| field.visible && field.source_field == key.field);
        if !visible {
            issues.push(ValidationIssue::new(
                IssueTarget::Sort(index),
                format!("{} is not a visible selected field", key.field),
            ));
        } else if !catalog.field(&key.field).is_some_and(|meta| meta.sortable) {
            issues.push(ValidationIssue::new(
                IssueTarget::Sort(index),
                format!("{} cannot be sorted", key.field),
            ));
        }
        if !sorted.insert(key.field.as_str()) {
            issues.push(ValidationIssue::new(
                IssueTarget::Sort(index),
                format!("{} is already sorted on", key.field),
            ));
        }
    }

    let mut aliases = HashSet::new();
    for agg in &config.aggregations {
        let target = || IssueTarget::Aggregation(agg.alias.clone());
        if !catalog.field(&agg.field).is_some_and(|meta| meta.aggregatable) {
            issues.push(ValidationIssue::new(
                target(),
                format!("{} cannot be aggregated", agg.field),
            ));
        }
        if agg.alias.trim().is_empty() || !aliases.insert(agg.alias.as_str()) {
            issues.push(ValidationIssue::new(target(), "alias must be unique and non-empty"));
        }
    }

    issues
}

/// [`validate`] as a `Result`.
pub fn ensure_executable(config: &ReportConfiguration, catalog: &FieldCatalog) -> ResultEngine<()> {
    let issues = validate(config, catalog);
    if issues.is_empty() {
        return Ok(());
    }
    Err(EngineError::Validation(issues))
}
