// Auth endpoints.

use std::fmt;

use async_trait::async_trait;
use desk_core::errors::{DeskError, DeskResult};
use desk_core::{Role, User};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::gateway::ApiClient;

pub const LOGIN_PATH: &str = "auth/login";
pub const REGISTER_PATH: &str = "auth/register";

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Local checks before anything goes over the wire.
    pub fn check(&self) -> DeskResult<()> {
        self.validate()
            .map_err(|e| validation_failure(&e).into_anyhow())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity plus optional company bootstrap fields.
#[derive(Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Registration {
    pub fn check(&self) -> DeskResult<()> {
        self.validate()
            .map_err(|e| validation_failure(&e).into_anyhow())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("company_name", &self.company_name)
            .field("business_type", &self.business_type)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterResponse {
    /// Company created alongside the account, in whatever shape the backend sent.
    #[serde(default, alias = "tenant")]
    pub company: Option<Value>,
}

/// Turn validator output into an `Unprocessable` error with an `errors` list.
///
/// Fields are visited in name order so the joined message is stable.
pub fn validation_failure(errors: &ValidationErrors) -> DeskError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| field.to_string());

    let messages: Vec<Value> = fields
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"));
                Value::String(msg)
            })
        })
        .collect();

    let mut payload = Map::new();
    payload.insert("errors".to_string(), Value::Array(messages));
    let payload = Value::Object(payload);

    DeskError::unprocessable(desk_core::error_message(&payload)).with_data(payload)
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> DeskResult<LoginResponse>;

    async fn register(&self, registration: &Registration) -> DeskResult<RegisterResponse>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> DeskResult<LoginResponse> {
        let body = serde_json::to_value(credentials)?;
        let data = self.post(LOGIN_PATH, &body).await?;
        serde_json::from_value(data).map_err(|e| {
            DeskError::bad_gateway("Unexpected login response")
                .with_source(e.into())
                .into_anyhow()
        })
    }

    async fn register(&self, registration: &Registration) -> DeskResult<RegisterResponse> {
        let body = serde_json::to_value(registration)?;
        let data = self.post(REGISTER_PATH, &body).await?;
        match data {
            Value::Object(_) => serde_json::from_value(data).map_err(|e| {
                DeskError::bad_gateway("Unexpected registration response")
                    .with_source(e.into())
                    .into_anyhow()
            }),
            _ => Ok(RegisterResponse::default()),
        }
    }
}
