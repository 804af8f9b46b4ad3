//! Filter predicate chain.
//!
//! Filters form a flat left-to-right chain. The first filter never carries a
//! logical operator and every later one does; each transition below keeps that
//! shape. Operands are not type-checked while they are being edited, that
//! happens in [`crate::validation`] before a report runs.

use api_types::report::{
    FilterOperator, FilterValue, LogicalOperator, ReportConfiguration, ReportFilter,
};
use uuid::Uuid;

use crate::{
    EngineError, FieldCatalog, ResultEngine,
    operators::{ValueShape, default_operator, is_operator_allowed, value_shape},
};

/// Partial update for one filter. `None` leaves the attribute as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub field: Option<String>,
    pub operator: Option<FilterOperator>,
    /// `Some(None)` clears the operand.
    pub value: Option<Option<FilterValue>>,
    pub logical_operator: Option<LogicalOperator>,
}

impl FilterPatch {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn operator(operator: FilterOperator) -> Self {
        Self {
            operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn value(value: FilterValue) -> Self {
        Self {
            value: Some(Some(value)),
            ..Self::default()
        }
    }

    pub fn logical_operator(logical_operator: LogicalOperator) -> Self {
        Self {
            logical_operator: Some(logical_operator),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: FilterValue) -> Self {
        self.value = Some(Some(value));
        self
    }

    pub fn clear_value(mut self) -> Self {
        self.value = Some(None);
        self
    }
}

/// Append a filter on the first filterable field of the catalog.
///
/// The new filter uses the first legal operator for that field, has no
/// operand, and is joined with `AND` unless it is the first one.
pub fn add_filter(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    let meta = catalog.filterable().next().ok_or_else(|| {
        EngineError::InvalidFilter(format!("{} has no filterable fields", config.kind()))
    })?;

    let mut next = config.clone();
    let logical_operator = (!next.filters.is_empty()).then_some(LogicalOperator::And);
    next.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        field: meta.field_name.clone(),
        operator: default_operator(meta.data_type),
        value: None,
        logical_operator,
    });
    Ok(next)
}

/// Remove a filter. When the head of the chain goes, the new head loses its
/// logical operator.
pub fn remove_filter(config: &ReportConfiguration, id: Uuid) -> ResultEngine<ReportConfiguration> {
    let index = filter_index(config, id)?;
    let mut next = config.clone();
    next.filters.remove(index);
    if let Some(head) = next.filters.first_mut() {
        head.logical_operator = None;
    }
    Ok(next)
}

/// Apply `patch` to one filter.
///
/// Pointing the filter at another field resets the operator to the first
/// legal one for the new type and clears the operand; any operator or value
/// in the same patch is ignored. Switching to `isNull`/`isNotNull` clears the
/// operand.
pub fn update_filter(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
    id: Uuid,
    patch: FilterPatch,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    let index = filter_index(config, id)?;
    let mut next = config.clone();
    let filter = &mut next.filters[index];

    let field_changed = match patch.field {
        Some(field) if field != filter.field => {
            let meta = catalog.require(&field)?;
            if !meta.filterable {
                return Err(EngineError::InvalidFilter(format!(
                    "{field} cannot be filtered"
                )));
            }
            filter.operator = default_operator(meta.data_type);
            filter.value = None;
            filter.field = field;
            true
        }
        _ => false,
    };

    if !field_changed {
        if let Some(operator) = patch.operator {
            let meta = catalog.require(&filter.field)?;
            if !is_operator_allowed(meta.data_type, operator) {
                return Err(EngineError::InvalidOperator(format!(
                    "{operator} is not available for {} fields",
                    meta.data_type.as_str()
                )));
            }
            filter.operator = operator;
            if value_shape(operator) == ValueShape::None {
                filter.value = None;
            }
        }

        if let Some(value) = patch.value {
            if value.is_some() && value_shape(filter.operator) == ValueShape::None {
                return Err(EngineError::InvalidValue(format!(
                    "{} takes no value",
                    filter.operator
                )));
            }
            filter.value = value;
        }
    }

    if let Some(logical_operator) = patch.logical_operator {
        if index == 0 {
            return Err(EngineError::InvalidFilter(
                "the first filter cannot have a logical operator".to_string(),
            ));
        }
        filter.logical_operator = Some(logical_operator);
    }

    Ok(next)
}

fn filter_index(config: &ReportConfiguration, id: Uuid) -> ResultEngine<usize> {
    config
        .filters
        .iter()
        .position(|filter| filter.id == id)
        .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use api_types::DataSourceType;

    use super::*;

    fn setup() -> (ReportConfiguration, FieldCatalog) {
        (
            ReportConfiguration::new(DataSourceType::Transactions),
            FieldCatalog::fallback(DataSourceType::Transactions, "offline"),
        )
    }

    fn with_filters(count: usize) -> (ReportConfiguration, FieldCatalog) {
        let (mut config, catalog) = setup();
        for _ in 0..count {
            config = add_filter(&config, &catalog).unwrap();
        }
        (config, catalog)
    }

    #[test]
    fn first_filter_has_no_connective_and_later_ones_default_to_and() {
        let (config, _) = with_filters(3);
        assert_eq!(config.filters[0].logical_operator, None);
        assert_eq!(config.filters[1].logical_operator, Some(LogicalOperator::And));
        assert_eq!(config.filters[2].logical_operator, Some(LogicalOperator::And));
        assert_eq!(config.filters[0].field, "date");
        assert_eq!(config.filters[0].operator, FilterOperator::Equals);
    }

    #[test]
    fn removing_the_head_promotes_the_next_filter() {
        let (config, catalog) = with_filters(3);
        let second = config.filters[1].id;
        let config = update_filter(
            &config,
            &catalog,
            second,
            FilterPatch::logical_operator(LogicalOperator::Or),
        )
        .unwrap();

        let head = config.filters[0].id;
        let config = remove_filter(&config, head).unwrap();
        assert_eq!(config.filters.len(), 2);
        assert_eq!(config.filters[0].id, second);
        assert_eq!(config.filters[0].logical_operator, None);
        assert_eq!(config.filters[1].logical_operator, Some(LogicalOperator::And));
    }

    #[test]
    fn removing_a_middle_filter_keeps_the_head() {
        let (config, _) = with_filters(3);
        let middle = config.filters[1].id;
        let config = remove_filter(&config, middle).unwrap();
        assert_eq!(config.filters[0].logical_operator, None);
        assert_eq!(config.filters[1].logical_operator, Some(LogicalOperator::And));
    }

    #[test]
    fn changing_field_resets_operator_and_value() {
        let (config, catalog) = with_filters(1);
        let id = config.filters[0].id;
        let config = update_filter(&config, &catalog, id, FilterPatch::field("amount")).unwrap();
        let config = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::operator(FilterOperator::Between)
                .with_value(FilterValue::pair(10.0, 20.0)),
        )
        .unwrap();

        let patch = FilterPatch {
            operator: Some(FilterOperator::Contains),
            value: Some(Some(FilterValue::one("rent"))),
            ..FilterPatch::field("category")
        };
        let config = update_filter(&config, &catalog, id, patch).unwrap();
        let filter = &config.filters[0];
        assert_eq!(filter.field, "category");
        assert_eq!(filter.operator, FilterOperator::Equals);
        assert_eq!(filter.value, None);
    }

    #[test]
    fn null_checks_clear_the_operand() {
        let (config, catalog) = with_filters(1);
        let id = config.filters[0].id;
        let config = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::value(FilterValue::one("2025-01-01")),
        )
        .unwrap();
        let config = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::operator(FilterOperator::IsNull),
        )
        .unwrap();
        assert_eq!(config.filters[0].value, None);

        let err = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::value(FilterValue::one("2025-01-01")),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidValue(_)));
    }

    #[test]
    fn illegal_operators_are_rejected_without_changes() {
        let (config, catalog) = with_filters(1);
        let id = config.filters[0].id;
        let err = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::operator(FilterOperator::Contains),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperator(_)));
        assert_eq!(config.filters[0].operator, FilterOperator::Equals);
    }

    #[test]
    fn head_cannot_take_a_logical_operator() {
        let (config, catalog) = with_filters(1);
        let id = config.filters[0].id;
        let err = update_filter(
            &config,
            &catalog,
            id,
            FilterPatch::logical_operator(LogicalOperator::Or),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidFilter(_)));
    }

    #[test]
    fn unknown_filter_and_field() {
        let (config, catalog) = with_filters(1);
        assert!(matches!(
            remove_filter(&config, Uuid::new_v4()),
            Err(EngineError::KeyNotFound(_))
        ));
        let id = config.filters[0].id;
        assert!(matches!(
            update_filter(&config, &catalog, id, FilterPatch::field("salary")),
            Err(EngineError::UnknownField(_))
        ));
    }
}
