//! Multi-key sort over the visible selection.
//!
//! `order_by[0]` is the primary key, `order_by[1]` breaks its ties, and so on.
//! A field appears at most once.

use api_types::report::{ReportConfiguration, ReportField, ReportOrderBy, SortDirection};

use crate::{EngineError, FieldCatalog, ResultEngine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortPatch {
    pub field: Option<String>,
    pub direction: Option<SortDirection>,
}

/// Fields a sort key may point at: selected, visible and sortable, in
/// display order.
pub fn sort_targets<'a>(
    config: &'a ReportConfiguration,
    catalog: &FieldCatalog,
) -> Vec<&'a ReportField> {
    let mut targets: Vec<_> = config
        .fields
        .iter()
        .filter(|field| field.visible)
        .filter(|field| {
            catalog
                .field(&field.source_field)
                .is_some_and(|meta| meta.sortable)
        })
        .collect();
    targets.sort_by_key(|field| field.order);
    targets
}

/// Append an ascending key on the first target not already sorted on.
pub fn add_sort(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    let target = sort_targets(config, catalog)
        .into_iter()
        .find(|field| !is_sorted_on(config, &field.source_field))
        .ok_or_else(|| EngineError::InvalidSort("no field available for sorting".to_string()))?;

    let mut next = config.clone();
    next.order_by.push(ReportOrderBy {
        field: target.source_field.clone(),
        direction: SortDirection::Asc,
    });
    Ok(next)
}

pub fn remove_sort(config: &ReportConfiguration, index: usize) -> ResultEngine<ReportConfiguration> {
    check_index(config, index)?;
    let mut next = config.clone();
    next.order_by.remove(index);
    Ok(next)
}

pub fn update_sort(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
    index: usize,
    patch: SortPatch,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    check_index(config, index)?;
    let mut next = config.clone();

    if let Some(field) = patch.field
        && field != next.order_by[index].field
    {
        if !sort_targets(config, catalog)
            .iter()
            .any(|target| target.source_field == field)
        {
            return Err(EngineError::InvalidSort(format!(
                "{field} is not a visible sortable field"
            )));
        }
        if is_sorted_on(config, &field) {
            return Err(EngineError::ExistingKey(field));
        }
        next.order_by[index].field = field;
    }
    if let Some(direction) = patch.direction {
        next.order_by[index].direction = direction;
    }
    Ok(next)
}

/// Change the priority of a sort key.
pub fn move_sort(
    config: &ReportConfiguration,
    from: usize,
    to: usize,
) -> ResultEngine<ReportConfiguration> {
    check_index(config, from)?;
    check_index(config, to)?;
    let mut next = config.clone();
    let key = next.order_by.remove(from);
    next.order_by.insert(to, key);
    Ok(next)
}

/// Drop sort keys whose field is no longer selected and visible.
pub(crate) fn prune_sorts(config: &mut ReportConfiguration) {
    let fields = &config.fields;
    config.order_by.retain(|key| {
        fields
            .iter()
            .any(|field| field.visible && field.source_field == key.field)
    });
}

fn is_sorted_on(config: &ReportConfiguration, field: &str) -> bool {
    config.order_by.iter().any(|key| key.field == field)
}

fn check_index(config: &ReportConfiguration, index: usize) -> ResultEngine<()> {
    if index >= config.order_by.len() {
        return Err(EngineError::InvalidIndex(format!(
            "sort key {index} does not exist, {} defined",
            config.order_by.len()
        )));
    }
    Ok(())
}
