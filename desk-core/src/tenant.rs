//! Tenant (company) records.
//!
//! Backend endpoints disagree on where a company keeps its primary key: some
//! send `id`, some send `_id`, some send numbers. Everything that enters the
//! session goes through [`normalize_tenant`], which guarantees both keys are
//! present, stringly typed and equal.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{DeskError, DeskResult};

/// Tenant primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A company a user can operate within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    #[serde(rename = "_id")]
    pub object_id: TenantId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<String>,
    /// Fields the session layer does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    business_type: Option<String>,
    #[serde(default)]
    worker_count: Option<u64>,
    #[serde(default)]
    subscription_plan: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Tenant {
    /// Minimal constructor, mostly for tests and fixtures.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = TenantId::new(id);
        Self {
            object_id: id.clone(),
            id,
            name: name.into(),
            business_type: None,
            worker_count: None,
            subscription_plan: None,
            extra: Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A record key as a string: non-blank strings (trimmed) and numbers.
pub(crate) fn key_as_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a raw tenant record.
///
/// `_id` wins when both keys are present and disagree; it is the backend's
/// storage key. Records with neither key are rejected.
pub fn normalize_tenant(raw: &Value) -> DeskResult<Tenant> {
    let Value::Object(map) = raw else {
        return Err(DeskError::bad_request("Tenant record must be an object").into_anyhow());
    };

    let id = map
        .get("_id")
        .and_then(key_as_id)
        .or_else(|| map.get("id").and_then(key_as_id))
        .ok_or_else(|| DeskError::bad_request("Tenant record has no id").into_anyhow())?;

    let mut rest = map.clone();
    rest.remove("id");
    rest.remove("_id");

    // A malformed optional field should not cost us the whole record.
    let fields: TenantFields = match serde_json::from_value(Value::Object(rest.clone())) {
        Ok(f) => f,
        Err(err) => {
            tracing::debug!(tenant = %id, error = %err, "tenant fields did not parse; keeping them as extra");
            TenantFields {
                name: rest.remove("name").and_then(|v| v.as_str().map(str::to_string)),
                business_type: None,
                worker_count: None,
                subscription_plan: None,
                extra: rest,
            }
        }
    };

    let id = TenantId(id);
    Ok(Tenant {
        object_id: id.clone(),
        id,
        name: fields.name.unwrap_or_default(),
        business_type: fields.business_type,
        worker_count: fields.worker_count,
        subscription_plan: fields.subscription_plan,
        extra: fields.extra,
    })
}

/// Parse a directory response: `{ "companies": [...] }` or a bare list.
///
/// Entries without an id are skipped.
pub fn parse_directory(raw: &Value) -> DeskResult<Vec<Tenant>> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("companies") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(DeskError::bad_request("`companies` must be a list").into_anyhow());
            }
        },
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(DeskError::bad_request("Unexpected companies payload").into_anyhow());
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| match normalize_tenant(item) {
            Ok(t) => Some(t),
            Err(err) => {
                tracing::warn!(error = %err, "skipping company without an id");
                None
            }
        })
        .collect())
}

/// Stable key of a directory result. Two results with the same tenant ids in
/// the same order share a fingerprint.
pub fn directory_fingerprint(tenants: &[Tenant]) -> String {
    tenants
        .iter()
        .map(|t| t.id.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_only_record_gets_object_id() {
        let t = normalize_tenant(&json!({"id": "c1", "name": "Acme"})).unwrap();
        assert_eq!(t.id, TenantId::new("c1"));
        assert_eq!(t.object_id, t.id);
        assert_eq!(t.name, "Acme");
    }

    #[test]
    fn object_id_only_record_gets_id() {
        let t = normalize_tenant(&json!({"_id": "64f0", "name": "Mill", "workerCount": 12})).unwrap();
        assert_eq!(t.id.as_str(), "64f0");
        assert_eq!(t.object_id.as_str(), "64f0");
        assert_eq!(t.worker_count, Some(12));

        let v = t.to_value();
        assert_eq!(v["id"], "64f0");
        assert_eq!(v["_id"], "64f0");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            json!({"id": "a", "name": "A", "businessType": "factory"}),
            json!({"_id": "b", "name": "B", "subscriptionPlan": "pro", "city": "Lahore"}),
            json!({"id": 7, "name": "Numeric"}),
        ] {
            let once = normalize_tenant(&raw).unwrap();
            let twice = normalize_tenant(&once.to_value()).unwrap();
            assert_eq!(once, twice);
            assert_eq!(twice.id, twice.object_id);
        }
    }

    #[test]
    fn unknown_fields_survive() {
        let t = normalize_tenant(&json!({"id": "a", "city": "Lahore"})).unwrap();
        assert_eq!(t.extra.get("city"), Some(&json!("Lahore")));
        assert_eq!(t.to_value()["city"], "Lahore");
    }

    #[test]
    fn bad_optional_field_does_not_drop_record() {
        let t = normalize_tenant(&json!({"id": "a", "name": "A", "workerCount": "many"})).unwrap();
        assert_eq!(t.name, "A");
        assert_eq!(t.worker_count, None);
        assert_eq!(t.extra.get("workerCount"), Some(&json!("many")));
    }

    #[test]
    fn record_without_id_is_rejected() {
        assert!(normalize_tenant(&json!({"name": "nameless"})).is_err());
        assert!(normalize_tenant(&json!("c1")).is_err());
    }

    #[test]
    fn directory_accepts_both_shapes() {
        let wrapped = parse_directory(&json!({"companies": [{"_id": "x"}, {"id": "y"}]})).unwrap();
        let bare = parse_directory(&json!([{"_id": "x"}, {"id": "y"}])).unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(directory_fingerprint(&wrapped), "x|y");
    }

    #[test]
    fn directory_skips_entries_without_id() {
        let list = parse_directory(&json!([{"name": "ghost"}, {"id": "real"}])).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id.as_str(), "real");
    }
}
