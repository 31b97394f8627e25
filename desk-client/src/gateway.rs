//! API gateway client.
//!
//! Single entry point for every backend call:
//! - attaches `Authorization: Bearer <token>` when the store holds a token
//! - tags each request with an `x-request-id`
//! - unwraps `{ success, data }` envelopes so callers see the payload
//! - turns every failure into a [`DeskError`]
//!
//! A `401` on a request that carried a token is a forced logout: the stored
//! session is wiped, listeners are told, and the navigator is sent to
//! `/login` with a full reload. The caller still gets its error back, but it
//! cannot undo the logout.

use std::sync::{Arc, RwLock};

use desk_core::errors::{error_message, DeskError, DeskResult, ErrorKind};
use desk_core::navigation::{Navigator, LOGIN_ROUTE};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::options::ClientOptions;
use crate::store::{SessionStore, TOKEN_KEY};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Called after a forced logout has cleared the store.
pub type ForcedLogoutListener = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    forced_logout_listeners: RwLock<Vec<ForcedLogoutListener>>,
}

impl ApiClient {
    pub fn new(
        options: &ClientOptions,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> DeskResult<Self> {
        options
            .validate()
            .map_err(|e| DeskError::bad_request(e).into_anyhow())?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| DeskError::general_error("Could not build HTTP client").with_source(e.into()).into_anyhow())?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            store,
            navigator,
            forced_logout_listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a callback that runs on every forced logout.
    pub fn on_forced_logout(&self, listener: ForcedLogoutListener) {
        self.forced_logout_listeners.write().unwrap().push(listener);
    }

    pub async fn get(&self, path: &str) -> DeskResult<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> DeskResult<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> DeskResult<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> DeskResult<Value> {
        self.request(Method::DELETE, path, None).await
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> DeskResult<Value> {
        let token = self.current_token();
        let request_id = Uuid::new_v4().to_string();
        let url = self.url(path);

        debug!(%method, %url, request_id = %request_id, authenticated = token.is_some(), "api request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = token.as_deref() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.map_err(transport_error)?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(transport_error)?;
        let payload = parse_body(&bytes);

        if status == StatusCode::UNAUTHORIZED {
            if token.is_some() {
                self.forced_logout();
            }
            return Err(DeskError::from_response(status.as_u16(), payload).into_anyhow());
        }

        if !status.is_success() {
            debug!(%method, %url, status = status.as_u16(), "api request failed");
            return Err(DeskError::from_response(status.as_u16(), payload).into_anyhow());
        }

        unwrap_envelope(payload)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn current_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "could not read token from session store");
                None
            }
        }
    }

    fn forced_logout(&self) {
        warn!("authenticated request was rejected with 401; forcing logout");

        if let Err(err) = self.store.clear_session() {
            error!(error = %err, "failed to clear session store during forced logout");
        }

        let listeners = self.forced_logout_listeners.read().unwrap().clone();
        for listener in &listeners {
            listener();
        }

        self.navigator.hard_redirect(LOGIN_ROUTE);
    }
}

fn transport_error(err: reqwest::Error) -> anyhow::Error {
    let desk = if err.is_timeout() {
        DeskError::timeout("The server took too long to respond")
    } else {
        DeskError::unavailable("Network error. Please check your connection")
    };
    desk.with_source(err.into()).into_anyhow()
}

/// JSON when possible, otherwise the body text, otherwise null.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(bytes).trim().to_string();
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        }
    })
}

/// Strip a `{ success, data }` envelope.
///
/// `success: false` is an error even on a 2xx. Bodies without a boolean
/// `success` field pass through untouched.
pub fn unwrap_envelope(payload: Value) -> DeskResult<Value> {
    match payload {
        Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                let payload = Value::Object(map);
                let message = error_message(&payload);
                return Err(DeskError::new(ErrorKind::BadRequest, message)
                    .with_data(payload)
                    .into_anyhow());
            }
            match map.remove("data") {
                Some(data) => Ok(data),
                None => Ok(Value::Object(map)),
            }
        }
        other => Ok(other),
    }
}
