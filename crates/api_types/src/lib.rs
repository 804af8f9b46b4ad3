use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical category of reportable records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    Transactions,
    Debts,
    Inventory,
    Salaries,
    Branches,
}

impl DataSourceType {
    pub const ALL: [Self; 5] = [
        Self::Transactions,
        Self::Debts,
        Self::Inventory,
        Self::Salaries,
        Self::Branches,
    ];

    /// Returns the canonical name used on the wire and in endpoint paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Debts => "debts",
            Self::Inventory => "inventory",
            Self::Salaries => "salaries",
            Self::Branches => "branches",
        }
    }
}

impl std::fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod metadata {
    use super::*;

    /// Value type of a reportable column.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DataType {
        String,
        Number,
        Date,
        Boolean,
        Enum,
    }

    impl DataType {
        pub const ALL: [Self; 5] = [
            Self::String,
            Self::Number,
            Self::Date,
            Self::Boolean,
            Self::Enum,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::String => "string",
                Self::Number => "number",
                Self::Date => "date",
                Self::Boolean => "boolean",
                Self::Enum => "enum",
            }
        }
    }

    /// Static description of one reportable column of a data source.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FieldMetadata {
        pub id: String,
        pub data_source: DataSourceType,
        pub field_name: String,
        pub display_name: String,
        pub data_type: DataType,
        pub filterable: bool,
        pub sortable: bool,
        pub aggregatable: bool,
        pub groupable: bool,
        pub default_visible: bool,
        pub default_order: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub format: Option<String>,
        /// Allowed values, only meaningful for `DataType::Enum`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub enum_values: Option<Vec<String>>,
    }
}

pub mod report {
    use std::collections::BTreeMap;

    use super::{metadata::DataType, *};

    /// One result row, keyed by source field name.
    pub type Row = serde_json::Map<String, serde_json::Value>;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum FilterOperator {
        Equals,
        NotEquals,
        Contains,
        StartsWith,
        EndsWith,
        In,
        NotIn,
        GreaterThan,
        GreaterThanOrEqual,
        LessThan,
        LessThanOrEqual,
        Between,
        IsNull,
        IsNotNull,
    }

    impl FilterOperator {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Equals => "equals",
                Self::NotEquals => "notEquals",
                Self::Contains => "contains",
                Self::StartsWith => "startsWith",
                Self::EndsWith => "endsWith",
                Self::In => "in",
                Self::NotIn => "notIn",
                Self::GreaterThan => "greaterThan",
                Self::GreaterThanOrEqual => "greaterThanOrEqual",
                Self::LessThan => "lessThan",
                Self::LessThanOrEqual => "lessThanOrEqual",
                Self::Between => "between",
                Self::IsNull => "isNull",
                Self::IsNotNull => "isNotNull",
            }
        }
    }

    impl std::fmt::Display for FilterOperator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Connective joining a filter to the chain on its left.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum LogicalOperator {
        And,
        Or,
    }

    /// A single filter operand as typed by the user.
    ///
    /// The variant only reflects how the value was entered; whether it fits
    /// the field is decided from the field's `DataType`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum ScalarValue {
        Null,
        Bool(bool),
        Number(f64),
        Text(String),
    }

    impl From<&str> for ScalarValue {
        fn from(value: &str) -> Self {
            Self::Text(value.to_string())
        }
    }

    impl From<String> for ScalarValue {
        fn from(value: String) -> Self {
            Self::Text(value)
        }
    }

    impl From<f64> for ScalarValue {
        fn from(value: f64) -> Self {
            Self::Number(value)
        }
    }

    impl From<i64> for ScalarValue {
        fn from(value: i64) -> Self {
            Self::Number(value as f64)
        }
    }

    impl From<bool> for ScalarValue {
        fn from(value: bool) -> Self {
            Self::Bool(value)
        }
    }

    /// Filter operand: a scalar, or an array for `between`, `in` and `notIn`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum FilterValue {
        Many(Vec<ScalarValue>),
        One(ScalarValue),
    }

    impl FilterValue {
        pub fn one(value: impl Into<ScalarValue>) -> Self {
            Self::One(value.into())
        }

        pub fn pair(low: impl Into<ScalarValue>, high: impl Into<ScalarValue>) -> Self {
            Self::Many(vec![low.into(), high.into()])
        }

        pub fn list<T: Into<ScalarValue>>(values: impl IntoIterator<Item = T>) -> Self {
            Self::Many(values.into_iter().map(Into::into).collect())
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportFilter {
        pub id: Uuid,
        pub field: String,
        pub operator: FilterOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub value: Option<FilterValue>,
        /// Absent on the first filter, present on every following one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub logical_operator: Option<LogicalOperator>,
    }

    /// A selected projection of one field.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportField {
        pub id: Uuid,
        pub source_field: String,
        pub display_name: String,
        pub data_type: DataType,
        /// Hidden fields stay selected but are left out of preview and export.
        pub visible: bool,
        pub order: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub format: Option<String>,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SortDirection {
        #[default]
        Asc,
        Desc,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportOrderBy {
        pub field: String,
        pub direction: SortDirection,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AggregateFunction {
        Sum,
        Count,
        Avg,
        Min,
        Max,
    }

    impl AggregateFunction {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Sum => "sum",
                Self::Count => "count",
                Self::Avg => "avg",
                Self::Min => "min",
                Self::Max => "max",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportAggregation {
        pub field: String,
        pub function: AggregateFunction,
        pub alias: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ExportFormat {
        Excel,
        Csv,
        Pdf,
    }

    impl ExportFormat {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Excel => "excel",
                Self::Csv => "csv",
                Self::Pdf => "pdf",
            }
        }

        pub fn extension(self) -> &'static str {
            match self {
                Self::Excel => "xlsx",
                Self::Csv => "csv",
                Self::Pdf => "pdf",
            }
        }

        pub fn content_type(self) -> &'static str {
            match self {
                Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                Self::Csv => "text/csv",
                Self::Pdf => "application/pdf",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExportOptions {
        pub formats: Vec<ExportFormat>,
        pub include_charts: bool,
        pub include_raw_data: bool,
    }

    impl Default for ExportOptions {
        fn default() -> Self {
            Self {
                formats: vec![ExportFormat::Excel],
                include_charts: false,
                include_raw_data: true,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DataSource {
        #[serde(rename = "type")]
        pub kind: DataSourceType,
    }

    /// Everything the backend needs to run one report.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportConfiguration {
        pub data_source: DataSource,
        pub fields: Vec<ReportField>,
        pub filters: Vec<ReportFilter>,
        pub order_by: Vec<ReportOrderBy>,
        #[serde(default)]
        pub aggregations: Vec<ReportAggregation>,
        #[serde(default)]
        pub export_options: ExportOptions,
    }

    impl ReportConfiguration {
        /// Empty configuration for `kind` with default export options.
        pub fn new(kind: DataSourceType) -> Self {
            Self {
                data_source: DataSource { kind },
                fields: Vec::new(),
                filters: Vec::new(),
                order_by: Vec::new(),
                aggregations: Vec::new(),
                export_options: ExportOptions::default(),
            }
        }

        pub fn kind(&self) -> DataSourceType {
            self.data_source.kind
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryResult {
        pub data: Vec<Row>,
        pub total_count: u64,
        /// Backend execution time in milliseconds, possibly fractional.
        #[serde(default)]
        pub execution_time: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub aggregations: Option<BTreeMap<String, serde_json::Value>>,
    }

    /// Request body for rendering an export artifact.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExportRequest {
        pub config: ReportConfiguration,
        pub format: ExportFormat,
    }
}

pub mod template {
    use super::{report::ReportConfiguration, *};

    /// A named configuration persisted by the backend.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportTemplate {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        pub report_type: DataSourceType,
        pub config: ReportConfiguration,
        #[serde(default)]
        pub is_default: bool,
    }

    /// Request body for saving a template.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplateNew {
        pub name: String,
        pub description: Option<String>,
        pub report_type: DataSourceType,
        pub config: ReportConfiguration,
        pub is_default: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::{report::*, *};

    #[test]
    fn configuration_uses_camel_case_wire_names() {
        let mut config = ReportConfiguration::new(DataSourceType::Transactions);
        config.order_by.push(ReportOrderBy {
            field: "amount".to_string(),
            direction: SortDirection::Desc,
        });
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["dataSource"]["type"], "transactions");
        assert_eq!(json["orderBy"][0]["direction"], "desc");
        assert_eq!(json["exportOptions"]["includeRawData"], true);
        assert_eq!(json["exportOptions"]["formats"][0], "excel");
    }

    #[test]
    fn filter_value_keeps_array_order_and_omits_missing_fields() {
        let filter = ReportFilter {
            id: Uuid::nil(),
            field: "date".to_string(),
            operator: FilterOperator::Between,
            value: Some(FilterValue::pair("2025-01-01", "2025-01-31")),
            logical_operator: None,
        };
        let json = serde_json::to_value(&filter).unwrap();

        assert_eq!(json["operator"], "between");
        assert_eq!(json["value"][0], "2025-01-01");
        assert_eq!(json["value"][1], "2025-01-31");
        assert!(json.get("logicalOperator").is_none());
    }

    #[test]
    fn filter_value_parses_scalars_and_arrays() {
        let one: FilterValue = serde_json::from_str("100").unwrap();
        assert_eq!(one, FilterValue::One(ScalarValue::Number(100.0)));

        let many: FilterValue = serde_json::from_str(r#"["a", null, true]"#).unwrap();
        assert_eq!(
            many,
            FilterValue::Many(vec![
                ScalarValue::Text("a".to_string()),
                ScalarValue::Null,
                ScalarValue::Bool(true),
            ])
        );
    }

    #[test]
    fn query_result_accepts_fractional_execution_time() {
        let result: QueryResult = serde_json::from_str(
            r#"{"data": [{"amount": 150}], "totalCount": 1, "executionTime": 12.75}"#,
        )
        .unwrap();
        assert_eq!(result.execution_time, 12.75);
        assert_eq!(result.aggregations, None);

        let whole: QueryResult =
            serde_json::from_str(r#"{"data": [], "totalCount": 0, "executionTime": 8}"#).unwrap();
        assert_eq!(whole.execution_time, 8.0);
    }

    #[test]
    fn logical_operator_is_upper_case() {
        let json = serde_json::to_string(&LogicalOperator::And).unwrap();
        assert_eq!(json, "\"AND\"");
        let op: FilterOperator = serde_json::from_str("\"greaterThanOrEqual\"").unwrap();
        assert_eq!(op, FilterOperator::GreaterThanOrEqual);
    }
}
