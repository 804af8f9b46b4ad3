//! Selected fields, their visibility and display order.
//!
//! `fields` is always kept sorted by `order` and `order` always equals the
//! position, so orders stay `0..n-1` after every transition.

use api_types::{
    metadata::FieldMetadata,
    report::{ReportConfiguration, ReportField},
};
use uuid::Uuid;

use crate::{EngineError, FieldCatalog, ResultEngine, sorting::prune_sorts};

pub fn add_field(
    config: &ReportConfiguration,
    meta: &FieldMetadata,
) -> ResultEngine<ReportConfiguration> {
    if meta.data_source != config.kind() {
        return Err(EngineError::DataSourceMismatch(format!(
            "{} belongs to {}, report is for {}",
            meta.field_name,
            meta.data_source,
            config.kind()
        )));
    }
    if config
        .fields
        .iter()
        .any(|field| field.source_field == meta.field_name)
    {
        return Err(EngineError::ExistingKey(meta.field_name.clone()));
    }

    let mut next = config.clone();
    next.fields.push(report_field(meta, next.fields.len()));
    Ok(next)
}

/// Replace the selection with the catalog's default fields.
pub fn apply_default_fields(
    config: &ReportConfiguration,
    catalog: &FieldCatalog,
) -> ResultEngine<ReportConfiguration> {
    catalog.ensure_source(config)?;
    let mut next = config.clone();
    next.fields = catalog
        .default_fields()
        .into_iter()
        .enumerate()
        .map(|(order, meta)| report_field(meta, order))
        .collect();
    prune_sorts(&mut next);
    Ok(next)
}

pub fn remove_field(config: &ReportConfiguration, id: Uuid) -> ResultEngine<ReportConfiguration> {
    let index = field_index(config, id)?;
    let mut next = config.clone();
    next.fields.remove(index);
    repack(&mut next.fields);
    prune_sorts(&mut next);
    Ok(next)
}

/// Show or hide a field. Hidden fields stay selected.
pub fn toggle_visibility(
    config: &ReportConfiguration,
    id: Uuid,
) -> ResultEngine<ReportConfiguration> {
    let index = field_index(config, id)?;
    let mut next = config.clone();
    let field = &mut next.fields[index];
    field.visible = !field.visible;
    prune_sorts(&mut next);
    Ok(next)
}

/// Move the field at `from` to `to` and renumber every field.
pub fn reorder(
    config: &ReportConfiguration,
    from: usize,
    to: usize,
) -> ResultEngine<ReportConfiguration> {
    let len = config.fields.len();
    if from >= len || to >= len {
        return Err(EngineError::InvalidIndex(format!(
            "cannot move field {from} to {to}, {len} selected"
        )));
    }

    let mut next = config.clone();
    let field = next.fields.remove(from);
    next.fields.insert(to, field);
    renumber(&mut next.fields);
    Ok(next)
}

pub fn rename_field(
    config: &ReportConfiguration,
    id: Uuid,
    display_name: &str,
) -> ResultEngine<ReportConfiguration> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(EngineError::InvalidName(
            "display name must not be empty".to_string(),
        ));
    }
    let index = field_index(config, id)?;
    let mut next = config.clone();
    next.fields[index].display_name = display_name.to_string();
    Ok(next)
}

/// Visible fields in display order; the columns of preview and export.
pub fn preview_columns(config: &ReportConfiguration) -> Vec<&ReportField> {
    let mut columns: Vec<_> = config.fields.iter().filter(|f| f.visible).collect();
    columns.sort_by_key(|field| field.order);
    columns
}

/// Sort by current order, then renumber from zero.
pub(crate) fn repack(fields: &mut [ReportField]) {
    fields.sort_by_key(|field| field.order);
    renumber(fields);
}

fn renumber(fields: &mut [ReportField]) {
    for (order, field) in fields.iter_mut().enumerate() {
        field.order = order;
    }
}

fn report_field(meta: &FieldMetadata, order: usize) -> ReportField {
    ReportField {
        id: Uuid::new_v4(),
        source_field: meta.field_name.clone(),
        display_name: meta.display_name.clone(),
        data_type: meta.data_type,
        visible: true,
        order,
        format: meta.format.clone(),
    }
}

fn field_index(config: &ReportConfiguration, id: Uuid) -> ResultEngine<usize> {
    config
        .fields
        .iter()
        .position(|field| field.id == id)
        .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))
}
