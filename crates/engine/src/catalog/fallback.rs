//! Built-in field catalogs, used when the metadata service is unreachable.
//!
//! These mirror the columns the backend exposes for each data source so a
//! configuration built offline still executes once the service is back.

use api_types::{
    DataSourceType,
    metadata::{DataType, FieldMetadata},
};

const CURRENCY_FORMAT: &str = "currency";
const DATE_FORMAT: &str = "yyyy-MM-dd";

pub fn fallback_fields(data_source: DataSourceType) -> Vec<FieldMetadata> {
    let fields = match data_source {
        DataSourceType::Transactions => vec![
            field("date", "Date", DataType::Date).format(DATE_FORMAT),
            field("type", "Type", DataType::Enum).values(&["income", "expense"]),
            field("category", "Category", DataType::String),
            field("amount", "Amount", DataType::Number).format(CURRENCY_FORMAT),
            field("description", "Description", DataType::String),
            field("branch_name", "Branch", DataType::String).hidden(),
            field("created_by", "Created by", DataType::String).hidden(),
        ],
        DataSourceType::Debts => vec![
            field("debtor_name", "Debtor", DataType::String),
            field("amount", "Amount", DataType::Number).format(CURRENCY_FORMAT),
            field("paid_amount", "Paid", DataType::Number).format(CURRENCY_FORMAT),
            field("remaining_amount", "Remaining", DataType::Number).format(CURRENCY_FORMAT),
            field("due_date", "Due date", DataType::Date).format(DATE_FORMAT),
            field("status", "Status", DataType::Enum).values(&[
                "pending", "partial", "paid", "overdue",
            ]),
            field("is_overdue", "Overdue", DataType::Boolean).hidden(),
            field("notes", "Notes", DataType::String).hidden(),
        ],
        DataSourceType::Inventory => vec![
            field("item_name", "Item", DataType::String),
            field("sku", "SKU", DataType::String),
            field("category", "Category", DataType::String),
            field("quantity", "Quantity", DataType::Number),
            field("unit_price", "Unit price", DataType::Number).format(CURRENCY_FORMAT),
            field("total_value", "Total value", DataType::Number).format(CURRENCY_FORMAT),
            field("low_stock", "Low stock", DataType::Boolean).hidden(),
            field("last_updated", "Last updated", DataType::Date)
                .format(DATE_FORMAT)
                .hidden(),
        ],
        DataSourceType::Salaries => vec![
            field("employee_name", "Employee", DataType::String),
            field("position", "Position", DataType::String),
            field("base_salary", "Base salary", DataType::Number).format(CURRENCY_FORMAT),
            field("bonus", "Bonus", DataType::Number).format(CURRENCY_FORMAT),
            field("deductions", "Deductions", DataType::Number).format(CURRENCY_FORMAT),
            field("net_salary", "Net salary", DataType::Number).format(CURRENCY_FORMAT),
            field("pay_date", "Pay date", DataType::Date).format(DATE_FORMAT),
            field("status", "Status", DataType::Enum)
                .values(&["pending", "paid"])
                .hidden(),
        ],
        DataSourceType::Branches => vec![
            field("name", "Branch", DataType::String),
            field("city", "City", DataType::String),
            field("manager", "Manager", DataType::String),
            field("employee_count", "Employees", DataType::Number),
            field("is_active", "Active", DataType::Boolean),
            field("opened_at", "Opened", DataType::Date)
                .format(DATE_FORMAT)
                .hidden(),
        ],
    };

    fields
        .into_iter()
        .enumerate()
        .map(|(order, draft)| draft.build(data_source, order))
        .collect()
}

struct Draft {
    name: &'static str,
    display: &'static str,
    data_type: DataType,
    default_visible: bool,
    format: Option<&'static str>,
    values: Option<&'static [&'static str]>,
}

fn field(name: &'static str, display: &'static str, data_type: DataType) -> Draft {
    Draft {
        name,
        display,
        data_type,
        default_visible: true,
        format: None,
        values: None,
    }
}

impl Draft {
    fn hidden(mut self) -> Self {
        self.default_visible = false;
        self
    }

    fn format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    fn values(mut self, values: &'static [&'static str]) -> Self {
        self.values = Some(values);
        self
    }

    fn build(self, data_source: DataSourceType, order: usize) -> FieldMetadata {
        FieldMetadata {
            id: format!("{data_source}.{}", self.name),
            data_source,
            field_name: self.name.to_string(),
            display_name: self.display.to_string(),
            data_type: self.data_type,
            filterable: true,
            sortable: true,
            aggregatable: self.data_type == DataType::Number,
            groupable: self.data_type != DataType::Number,
            default_visible: self.default_visible,
            default_order: order,
            format: self.format.map(str::to_string),
            enum_values: self
                .values
                .map(|values| values.iter().map(|v| v.to_string()).collect()),
        }
    }
}
