//! NDJSON bodies for the bulk API.

use serde_json::Value;

use crate::error::{ElasticError, ElasticResult};

/// Render documents into an NDJSON bulk body of `index` operations.
///
/// Every document targets the URL's index and type, so the action lines
/// carry no routing fields.
pub fn build_ndjson(docs: &[Value]) -> String {
    let mut body = String::new();
    for doc in docs {
        body.push_str("{\"index\":{}}\n");
        body.push_str(&doc.to_string());
        body.push('\n');
    }
    body
}

/// Inspect a bulk response; aggregate per-item failures into `BulkFail`.
pub fn check_bulk_response(response: &Value) -> ElasticResult<()> {
    if response["errors"] != Value::Bool(true) {
        return Ok(());
    }

    let empty = Vec::new();
    let items = response["items"].as_array().unwrap_or(&empty);
    let mut failed = 0usize;
    let mut first_error = String::new();
    for item in items {
        // each item is {"index": {..}} (or the matching operation name)
        let Some(op) = item.as_object().and_then(|m| m.values().next()) else {
            continue;
        };
        if let Some(err) = op.get("error") {
            failed += 1;
            if first_error.is_empty() {
                first_error = err.to_string();
            }
        }
    }

    Err(ElasticError::BulkFail {
        failed,
        first_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ndjson_pairs_action_and_source() {
        let docs = vec![json!({"a": 1}), json!({"b": 2})];
        let body = build_ndjson(&docs);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "{\"index\":{}}");
        assert_eq!(lines[1], "{\"a\":1}");
        assert_eq!(lines[2], "{\"index\":{}}");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn clean_response_passes() {
        let resp = json!({"took": 3, "errors": false, "items": []});
        assert!(check_bulk_response(&resp).is_ok());
    }

    #[test]
    fn partial_failure_aggregates() {
        let resp = json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}},
                {"index": {"status": 400, "error": {"type": "illegal_argument_exception"}}},
            ]
        });
        match check_bulk_response(&resp) {
            Err(ElasticError::BulkFail {
                failed,
                first_error,
            }) => {
                assert_eq!(failed, 2);
                assert!(first_error.contains("mapper_parsing_exception"));
            }
            other => panic!("expected BulkFail, got {other:?}"),
        }
    }
}
