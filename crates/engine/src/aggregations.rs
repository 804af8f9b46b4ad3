//! Summary computations over aggregatable fields.

use api_types::report::{AggregateFunction, ReportAggregation, ReportConfiguration};

use crate::{EngineError, FieldCatalog, ResultEngine};

/// Add `function(field)` under `alias`, or `<function>_<field>` when no alias
/// is given. Aliases are unique within a report.
pub fn add_aggregation(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
    field: &str,
    function: AggregateFunction,
    alias: Option<&str>,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    let meta = catalog.require(field)?;
    if !meta.aggregatable {
        return Err(EngineError::InvalidAggregation(format!(
            "{field} cannot be aggregated"
        )));
    }

    let alias = match alias.map(str::trim) {
        Some("") => {
            return Err(EngineError::InvalidAggregation(
                "alias must not be empty".to_string(),
            ));
        }
        Some(alias) => alias.to_string(),
        None => format!("{}_{field}", function.as_str()),
    };
    if config.aggregations.iter().any(|agg| agg.alias == alias) {
        return Err(EngineError::ExistingKey(alias));
    }

    let mut next = config.clone();
    next.aggregations.push(ReportAggregation {
        field: field.to_string(),
        function,
        alias,
    });
    Ok(next)
}

pub fn remove_aggregation(
    config: &ReportConfiguration,
    alias: &str,
) -> ResultEngine<ReportConfiguration> {
    let index = config
        .aggregations
        .iter()
        .position(|agg| agg.alias == alias)
        .ok_or_else(|| EngineError::KeyNotFound(alias.to_string()))?;
    let mut next = config.clone();
    next.aggregations.remove(index);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use api_types::DataSourceType;

    use super::*;

    fn setup() -> (ReportConfiguration, FieldCatalog) {
        (
            ReportConfiguration::new(DataSourceType::Debts),
            FieldCatalog::fallback(DataSourceType::Debts, "offline"),
        )
    }

    #[test]
    fn default_alias_and_uniqueness() {
        let (config, catalog) = setup();
        let config =
            add_aggregation(&config, &catalog, "amount", AggregateFunction::Sum, None).unwrap();
        assert_eq!(config.aggregations[0].alias, "sum_amount");

        let err = add_aggregation(&config, &catalog, "amount", AggregateFunction::Sum, None)
            .unwrap_err();
        assert_eq!(err, EngineError::ExistingKey("sum_amount".to_string()));

        let config = add_aggregation(
            &config,
            &catalog,
            "remaining_amount",
            AggregateFunction::Max,
            Some(" largest_open "),
        )
        .unwrap();
        assert_eq!(config.aggregations[1].alias, "largest_open");

        let config = remove_aggregation(&config, "sum_amount").unwrap();
        assert_eq!(config.aggregations.len(), 1);
    }

    #[test]
    fn only_aggregatable_fields() {
        let (config, catalog) = setup();
        assert!(matches!(
            add_aggregation(&config, &catalog, "debtor_name", AggregateFunction::Count, None),
            Err(EngineError::InvalidAggregation(_))
        ));
        assert!(matches!(
            add_aggregation(&config, &catalog, "amount", AggregateFunction::Avg, Some(" ")),
            Err(EngineError::InvalidAggregation(_))
        ));
        assert!(matches!(
            remove_aggregation(&config, "missing"),
            Err(EngineError::KeyNotFound(_))
        ));
    }
}
