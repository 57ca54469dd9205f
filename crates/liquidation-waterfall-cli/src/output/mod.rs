pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten exit-range points into one object per exit value with a column per
/// investor, so they render as a regular grid.
pub fn flatten_exit_points(points: &[Value]) -> Vec<Value> {
    points
        .iter()
        .map(|point| {
            let mut row = Map::new();
            if let Value::Object(map) = point {
                for key in ["exit_amount", "total_distributed", "undistributed"] {
                    if let Some(v) = map.get(key) {
                        row.insert(key.to_string(), v.clone());
                    }
                }
                if let Some(Value::Array(totals)) = map.get("investor_totals") {
                    for total in totals {
                        let name = total.get("investor_name").and_then(Value::as_str);
                        let amount = total.get("total_amount");
                        if let (Some(name), Some(amount)) = (name, amount) {
                            row.insert(name.to_string(), amount.clone());
                        }
                    }
                }
            }
            Value::Object(row)
        })
        .collect()
}
