use driverqueue_service::ValidationIssue;

/// Shape validation issues as `{ "validation": { field: { code, message } } }`.
///
/// When a field carries several issues the first one wins.
pub fn to_payload(issues: &[ValidationIssue]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for issue in issues {
        if map.contains_key(&issue.field) {
            continue;
        }
        map.insert(
            issue.field.clone(),
            serde_json::json!({ "code": issue.code, "message": issue.message }),
        );
    }
    serde_json::json!({ "validation": serde_json::Value::Object(map) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_keyed_by_field() {
        let issues = vec![
            ValidationIssue::new("plate", "required", "plate is required"),
            ValidationIssue::new("name", "length", "name must be 3 to 100 characters"),
            ValidationIssue::new("plate", "too_long", "ignored"),
        ];
        let payload = to_payload(&issues);
        assert_eq!(payload["validation"]["plate"]["code"], "required");
        assert_eq!(payload["validation"]["name"]["code"], "length");
        assert_eq!(payload["validation"].as_object().unwrap().len(), 2);
    }
}
