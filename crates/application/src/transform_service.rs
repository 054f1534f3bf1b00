use pullbridge_core::AppResult;
use pullbridge_domain::FilterExpression;
use serde_json::Value;
use tracing::debug;

/// Applies a filter expression to a whole batch of raw records.
///
/// The batch is presented to the filter as one JSON array and every output the
/// filter produces becomes one transformed record.
pub fn transform_records(records: Vec<Value>, filter_expression: &str) -> AppResult<Vec<Value>> {
    let filter = FilterExpression::parse(filter_expression)?;
    let input_count = records.len();
    let transformed = filter.apply(&Value::Array(records))?;

    debug!(
        filter = filter.as_str(),
        input_count,
        output_count = transformed.len(),
        "transformed records"
    );

    Ok(transformed)
}
