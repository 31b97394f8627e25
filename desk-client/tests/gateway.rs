//! Integration tests for the API gateway client.
//!
//! Runs the client against a wiremock server and checks header handling,
//! envelope unwrapping, error normalization and the forced-logout path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use desk_client::{
    ApiClient, AuthApi, ClientOptions, Credentials, MemoryStore, Registration, SessionStore,
    TenantDirectory, CURRENT_COMPANY_KEY, TOKEN_KEY, USER_KEY,
};
use desk_core::{DeskError, ErrorKind, MemoryNavigator, NavigationKind, Navigator};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

struct Harness {
    client: ApiClient,
    store: Arc<MemoryStore>,
    navigator: Arc<MemoryNavigator>,
}

fn harness(server_uri: &str, store: MemoryStore) -> Harness {
    let store = Arc::new(store);
    let navigator = Arc::new(MemoryNavigator::new("/dashboard/sales"));
    let options = ClientOptions {
        base_url: format!("{server_uri}/api"),
        ..ClientOptions::default()
    };
    let client = ApiClient::new(&options, store.clone(), navigator.clone()).unwrap();
    Harness {
        client,
        store,
        navigator,
    }
}

fn signed_in_store() -> MemoryStore {
    MemoryStore::with_entries([
        (TOKEN_KEY, "tok-123"),
        (USER_KEY, r#"{"id":"u1","name":"Sana","email":"sana@example.com","role":"owner"}"#),
        (CURRENT_COMPANY_KEY, r#"{"id":"c1","_id":"c1","name":"Acme"}"#),
    ])
}

#[tokio::test]
async fn bearer_token_and_request_id_are_attached() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companies"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [{"_id": "c1", "name": "Acme"}, {"id": "c2", "name": "Mill"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), signed_in_store());
    let tenants = h.client.list_tenants().await.unwrap();

    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0].id, tenants[0].object_id);
    assert_eq!(tenants[1].object_id.as_str(), "c2");
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization_header() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companies"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_json(json!([]))
            }
        })
        .mount(&server)
        .await;

    let h = harness(&server.uri(), MemoryStore::new());
    assert!(h.client.list_tenants().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_envelope_is_unwrapped() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "sana@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "token": "fresh",
                "user": {"_id": "u1", "name": "Sana", "email": "sana@example.com", "role": "owner"}
            }
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), MemoryStore::new());
    let res = h
        .client
        .login(&Credentials::new("sana@example.com", "pw"))
        .await
        .unwrap();

    assert_eq!(res.token, "fresh");
    assert_eq!(res.user.id, "u1");
}

#[tokio::test]
async fn login_accepts_users_keyed_under_both_ids() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "token": "fresh",
                "user": {"id": 17, "_id": "u17", "name": "Ravi", "email": "ravi@example.com", "role": "Worker"}
            }
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), MemoryStore::new());
    let res = h
        .client
        .login(&Credentials::new("ravi@example.com", "pw"))
        .await
        .unwrap();

    assert_eq!(res.user.id, "u17");
    assert_eq!(res.user.role, desk_core::Role::Worker);
}

#[tokio::test]
async fn unauthorized_authenticated_request_forces_logout() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companies"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), signed_in_store());
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    h.client.on_forced_logout(Arc::new(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    }));

    let err = h.client.list_tenants().await.unwrap_err();
    let desk = DeskError::from_anyhow(&err).unwrap();

    assert_eq!(desk.kind, ErrorKind::NotAuthenticated);
    assert_eq!(desk.user_message(), "jwt expired");
    assert!(h.store.snapshot().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.navigator.current_path(), "/login");
    assert_eq!(h.navigator.visits().last().unwrap().kind, NavigationKind::Hard);
}

#[tokio::test]
async fn unauthorized_without_token_is_a_plain_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), MemoryStore::with_entries([("theme", "dark")]));
    let err = h
        .client
        .login(&Credentials::new("who@example.com", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(DeskError::from_anyhow(&err).unwrap().user_message(), "Invalid credentials");
    assert!(h.navigator.visits().is_empty());
    assert_eq!(h.store.get("theme").unwrap().as_deref(), Some("dark"));
}

#[tokio::test]
async fn validation_errors_are_normalized() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Email taken"}]
        })))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), MemoryStore::new());
    let reg = Registration {
        name: "Ali".into(),
        email: "ali@example.com".into(),
        password: "pw".into(),
        ..Registration::default()
    };
    let err = h.client.register(&reg).await.unwrap_err();
    let desk = DeskError::from_anyhow(&err).unwrap();

    assert_eq!(desk.kind, ErrorKind::BadRequest);
    assert_eq!(desk.to_envelope(), json!({"success": false, "message": "Email taken"}));
}

#[tokio::test]
async fn server_errors_with_text_bodies_keep_the_text() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/companies"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), signed_in_store());
    let err = h.client.list_tenants().await.unwrap_err();
    let desk = DeskError::from_anyhow(&err).unwrap();

    assert_eq!(desk.kind, ErrorKind::Unavailable);
    assert_eq!(desk.user_message(), "maintenance window");
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let h = harness(&uri, signed_in_store());
    let err = h.client.list_tenants().await.unwrap_err();
    let desk = DeskError::from_anyhow(&err).unwrap();

    assert!(matches!(desk.kind, ErrorKind::Unavailable | ErrorKind::Timeout));
    assert!(h.navigator.visits().is_empty());
}
