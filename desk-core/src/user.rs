//! Authenticated identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tenant::key_as_id;

/// User role. Unknown roles are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Worker,
    Sales,
    Other(String),
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Worker => "worker",
            Role::Sales => "sales",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "owner" => Role::Owner,
            "manager" => Role::Manager,
            "worker" => Role::Worker,
            "sales" => Role::Sales,
            _ => Role::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user.
///
/// The backend keys users under `id`, `_id` or both, as strings or numbers.
/// `_id` wins when both are present; the other key is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for User {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = map
            .get("_id")
            .and_then(key_as_id)
            .or_else(|| map.get("id").and_then(key_as_id))
            .ok_or("user record has no id")?;
        map.remove("_id");
        map.remove("id");

        let role = match map.remove("role") {
            Some(Value::String(role)) => Role::from(role),
            Some(other) => return Err(format!("user role must be a string, got {other}")),
            None => return Err("user record has no role".to_string()),
        };

        Ok(Self {
            id,
            name: take_string(&mut map, "name"),
            email: take_string(&mut map, "email"),
            role,
            extra: map,
        })
    }
}

/// Take a string field out of the map. Anything else stays in place and
/// yields an empty string.
fn take_string(map: &mut Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(_)) => match map.remove(key) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        },
        _ => String::new(),
    }
}

impl User {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<Role>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.into(),
            extra: Map::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
