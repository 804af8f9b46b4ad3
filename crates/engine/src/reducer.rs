//! Builder transitions as one pure function.
//!
//! [`reduce`] never mutates its input: it returns the next configuration or an
//! error, in which case the caller keeps the configuration it had.

use api_types::{
    DataSourceType,
    metadata::FieldMetadata,
    report::{AggregateFunction, ExportOptions, LogicalOperator, ReportConfiguration},
};
use uuid::Uuid;

use crate::{
    FieldCatalog, ResultEngine, aggregations,
    filters::{self, FilterPatch},
    selection::{self, repack},
    sorting::{self, SortPatch, prune_sorts},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ReportAction {
    SetDataSource(DataSourceType),
    AddField(FieldMetadata),
    ApplyDefaultFields,
    RemoveField(Uuid),
    ToggleVisibility(Uuid),
    ReorderFields { from: usize, to: usize },
    RenameField { id: Uuid, display_name: String },
    AddFilter,
    RemoveFilter(Uuid),
    UpdateFilter { id: Uuid, patch: FilterPatch },
    AddSort,
    RemoveSort(usize),
    UpdateSort { index: usize, patch: SortPatch },
    MoveSort { from: usize, to: usize },
    AddAggregation {
        field: String,
        function: AggregateFunction,
        alias: Option<String>,
    },
    RemoveAggregation(String),
    SetExportOptions(ExportOptions),
    /// Swap in a whole configuration, e.g. from a template.
    Replace(ReportConfiguration),
}

pub fn reduce(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
    action: ReportAction,
) -> ResultEngine<ReportConfiguration> {
    match action {
        ReportAction::SetDataSource(kind) => Ok(set_data_source(config, kind)),
        ReportAction::AddField(meta) => selection::add_field(config, &meta),
        ReportAction::ApplyDefaultFields => selection::apply_default_fields(config, catalog),
        ReportAction::RemoveField(id) => selection::remove_field(config, id),
        ReportAction::ToggleVisibility(id) => selection::toggle_visibility(config, id),
        ReportAction::ReorderFields { from, to } => selection::reorder(config, from, to),
        ReportAction::RenameField { id, display_name } => {
            selection::rename_field(config, id, &display_name)
        }
        ReportAction::AddFilter => filters::add_filter(config, catalog),
        ReportAction::RemoveFilter(id) => filters::remove_filter(config, id),
        ReportAction::UpdateFilter { id, patch } => {
            filters::update_filter(config, catalog, id, patch)
        }
        ReportAction::AddSort => sorting::add_sort(config, catalog),
        ReportAction::RemoveSort(index) => sorting::remove_sort(config, index),
        ReportAction::UpdateSort { index, patch } => {
            sorting::update_sort(config, catalog, index, patch)
        }
        ReportAction::MoveSort { from, to } => sorting::move_sort(config, from, to),
        ReportAction::AddAggregation {
            field,
            function,
            alias,
        } => aggregations::add_aggregation(config, catalog, &field, function, alias.as_deref()),
        ReportAction::RemoveAggregation(alias) => aggregations::remove_aggregation(config, &alias),
        ReportAction::SetExportOptions(options) => Ok(set_export_options(config, options)),
        ReportAction::Replace(replacement) => Ok(normalize(replacement)),
    }
}

/// Switch schema. Nothing selected, filtered, sorted or aggregated survives;
/// export options do.
pub fn set_data_source(config: &ReportConfiguration, kind: DataSourceType) -> ReportConfiguration {
    if config.kind() == kind {
        return config.clone();
    }
    ReportConfiguration {
        export_options: config.export_options.clone(),
        ..ReportConfiguration::new(kind)
    }
}

pub fn set_export_options(
    config: &ReportConfiguration,
    mut options: ExportOptions,
) -> ReportConfiguration {
    let mut seen = Vec::with_capacity(options.formats.len());
    options.formats.retain(|format| {
        if seen.contains(format) {
            return false;
        }
        seen.push(*format);
        true
    });
    ReportConfiguration {
        export_options: options,
        ..config.clone()
    }
}

/// Restore the structural invariants on a configuration that did not come
/// from these transitions: contiguous field orders, a well-formed filter
/// chain and sort keys only on visible fields.
pub fn normalize(mut config: ReportConfiguration) -> ReportConfiguration {
    repack(&mut config.fields);
    for (index, filter) in config.filters.iter_mut().enumerate() {
        if index == 0 {
            filter.logical_operator = None;
        } else if filter.logical_operator.is_none() {
            filter.logical_operator = Some(LogicalOperator::And);
        }
    }
    prune_sorts(&mut config);
    config
}

#[cfg(test)]
mod tests {
    use api_types::report::{ExportFormat, FilterOperator, FilterValue, SortDirection};

    use super::*;

    fn scenario() -> (ReportConfiguration, FieldCatalog) {
        let catalog = FieldCatalog::fallback(DataSourceType::Transactions, "offline");
        let mut config = ReportConfiguration::new(DataSourceType::Transactions);
        let actions = [
            ReportAction::AddField(catalog.require("amount").unwrap().clone()),
            ReportAction::AddField(catalog.require("category").unwrap().clone()),
            ReportAction::AddFilter,
            ReportAction::AddSort,
            ReportAction::AddAggregation {
                field: "amount".to_string(),
                function: AggregateFunction::Sum,
                alias: None,
            },
        ];
        for action in actions {
            config = reduce(&config, &catalog, action).unwrap();
        }
        (config, catalog)
    }

    #[test]
    fn switching_data_source_clears_schema_state() {
        let (config, catalog) = scenario();
        assert!(!config.fields.is_empty());

        let next = reduce(&config, &catalog, ReportAction::SetDataSource(DataSourceType::Debts))
            .unwrap();
        assert_eq!(next.kind(), DataSourceType::Debts);
        assert!(next.fields.is_empty());
        assert!(next.filters.is_empty());
        assert!(next.order_by.is_empty());
        assert!(next.aggregations.is_empty());
        assert_eq!(next.export_options, config.export_options);
    }

    #[test]
    fn same_data_source_is_a_no_op() {
        let (config, catalog) = scenario();
        let next = reduce(
            &config,
            &catalog,
            ReportAction::SetDataSource(DataSourceType::Transactions),
        )
        .unwrap();
        assert_eq!(next, config);
    }

    #[test]
    fn failed_transition_leaves_input_untouched() {
        let (config, catalog) = scenario();
        let before = config.clone();
        let result = reduce(&config, &catalog, ReportAction::ReorderFields { from: 0, to: 9 });
        assert!(result.is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn export_formats_are_deduplicated() {
        let (config, catalog) = scenario();
        let next = reduce(
            &config,
            &catalog,
            ReportAction::SetExportOptions(ExportOptions {
                formats: vec![ExportFormat::Csv, ExportFormat::Pdf, ExportFormat::Csv],
                include_charts: true,
                include_raw_data: false,
            }),
        )
        .unwrap();
        assert_eq!(next.export_options.formats, vec![ExportFormat::Csv, ExportFormat::Pdf]);
        assert!(next.export_options.include_charts);
    }

    #[test]
    fn replace_normalizes_foreign_configurations() {
        let (mut config, catalog) = scenario();
        config.fields.reverse();
        config.fields[0].order = 7;
        config.fields[1].order = 3;
        config.filters[0].logical_operator = Some(LogicalOperator::Or);
        config.filters.push(api_types::report::ReportFilter {
            id: Uuid::new_v4(),
            field: "amount".to_string(),
            operator: FilterOperator::GreaterThan,
            value: Some(FilterValue::one(100.0)),
            logical_operator: None,
        });
        config.order_by.push(api_types::report::ReportOrderBy {
            field: "description".to_string(),
            direction: SortDirection::Desc,
        });

        let next = reduce(&config, &catalog, ReportAction::Replace(config.clone())).unwrap();
        let orders: Vec<_> = next.fields.iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(next.fields[0].source_field, "amount");
        assert_eq!(next.filters[0].logical_operator, None);
        assert_eq!(next.filters[1].logical_operator, Some(LogicalOperator::And));
        assert_eq!(next.order_by.len(), 1);
    }
}
