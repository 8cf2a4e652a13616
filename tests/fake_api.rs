//! Exercises the real transport against a local stand-in for the SaaSus
//! API: header contract, refresh-cookie round trip, and the attribute
//! fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

use saasus_console::{
    ApiClient, ConsoleConfig, CredentialStore, MemoryStore, Session, SessionGuard, SignUpForm,
    TenantId,
};

const REFRESH_COOKIE: &str = "SaaSusRefreshToken=refresh-1";

fn expect_header(headers: &HeaderMap, name: &str, value: &str) -> Result<(), StatusCode> {
    if headers.get(name).and_then(|v| v.to_str().ok()) == Some(value) {
        Ok(())
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}

fn expect_common(headers: &HeaderMap) -> Result<(), StatusCode> {
    expect_header(headers, "x-requested-with", "XMLHttpRequest")?;
    if headers.get("x-saasus-referer").is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

async fn credentials(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, StatusCode> {
    expect_common(&headers)?;
    if params.get("code").map(String::as_str) != Some("auth-code-1") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok((
        [(
            header::SET_COOKIE,
            "SaaSusRefreshToken=refresh-1; Path=/; HttpOnly",
        )],
        Json(json!({ "id_token": "id-1", "access_token": "access-1" })),
    ))
}

async fn refresh(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    let cookies = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !cookies.contains(REFRESH_COOKIE) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "id_token": "id-2", "access_token": "access-2" })))
}

async fn userinfo(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "email": "admin@example.com",
        "tenants": [{
            "id": "t-1",
            "name": "Acme",
            "envs": [{"roles": [{"role_name": "admin", "display_name": "Admin"}]}]
        }]
    })))
}

async fn user_attributes(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    Ok(Json(json!({
        "user_attributes": {
            "department": {
                "attribute_name": "department",
                "display_name": "Department",
                "attribute_type": "text",
                "required": true
            }
        }
    })))
}

async fn tenant_attributes(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    Ok(Json(json!({
        "tenant_attributes": {
            "company_size": {
                "attribute_name": "company_size",
                "display_name": "Company size",
                "attribute_type": "number",
                "required": false
            }
        }
    })))
}

async fn mfa_status(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    Ok(Json(json!({ "enabled": false })))
}

async fn mfa_setup(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    expect_header(&headers, "x-access-token", "access-1")?;
    Ok(Json(json!({ "qrCodeUrl": "otpauth://totp/sample" })))
}

async fn mfa_verify(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    expect_common(&headers)?;
    expect_header(&headers, "x-access-token", "access-1")?;
    if body.get("verification_code").and_then(Value::as_str) != Some("123456") {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(StatusCode::OK)
}

async fn invitations(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    expect_common(&headers)?;
    if params.get("tenant_id").map(String::as_str) != Some("t-1") {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!([{
        "id": "inv-1",
        "email": "new@acme.example",
        "invitation_url": "https://auth.example.com/invitation/inv-1",
        "status": "pending",
        "expired_at": 1893456000,
        "envs": [{"roles": [{"role_name": "admin", "display_name": "Admin"}]}]
    }])))
}

async fn user_invitation(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    expect_common(&headers)?;
    expect_header(&headers, "x-access-token", "access-1")?;
    let email_ok = body.get("email").and_then(Value::as_str).is_some();
    let tenant_ok = body.get("tenantId").and_then(Value::as_str) == Some("t-1");
    if !email_ok || !tenant_ok {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(StatusCode::OK)
}

async fn self_sign_up(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    expect_common(&headers)?;
    if body.get("tenantName").and_then(Value::as_str) != Some("Acme") {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !body.get("userAttributeValues").is_some_and(Value::is_object)
        || !body.get("tenantAttributeValues").is_some_and(Value::is_object)
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(StatusCode::OK)
}

async fn spawn_fake_api() -> ConsoleConfig {
    let app = Router::new()
        .route("/credentials", get(credentials))
        .route("/refresh", get(refresh))
        .route("/userinfo", get(userinfo))
        .route("/user_attributes", get(user_attributes))
        .route("/tenant_attributes_list", get(tenant_attributes))
        .route("/mfa_status", get(mfa_status))
        .route("/mfa_setup", get(mfa_setup))
        .route("/mfa_verify", post(mfa_verify))
        .route("/invitations", get(invitations))
        .route("/user_invitation", post(user_invitation))
        .route("/self_sign_up", post(self_sign_up));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ConsoleConfig::new(
        format!("http://{addr}").parse().unwrap(),
        "https://auth.example.com/login".parse().unwrap(),
    )
    .with_post_refresh_delay(Duration::ZERO)
}

fn expired_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
    let exp = time::OffsetDateTime::now_utc().unix_timestamp() - 60;
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string().as_bytes());
    format!("{header}.{payload}.sig")
}

#[tokio::test]
async fn exchange_sets_cookie_then_refresh_uses_it() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let creds = client.exchange_code("auth-code-1").await.unwrap();
    assert_eq!(creds.id_token, "id-1");
    assert_eq!(creds.access_token.as_deref(), Some("access-1"));

    // The refresh cookie was captured by the jar and goes out implicitly.
    let refreshed = client.refresh().await.unwrap();
    assert_eq!(refreshed.id_token, "id-2");
    assert_eq!(refreshed.access_token, "access-2");
}

#[tokio::test]
async fn refresh_without_cookie_is_rejected() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let err = client.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        saasus_console::Error::Api { operation: "refresh", status: Some(401), .. }
    ));
}

#[tokio::test]
async fn bad_code_surfaces_as_api_error() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let err = client.exchange_code("wrong").await.unwrap_err();
    assert!(matches!(
        err,
        saasus_console::Error::Api { operation: "credentials", status: Some(401), .. }
    ));
}

#[tokio::test]
async fn userinfo_carries_bearer_and_parses_snapshot() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let info = client.userinfo("id-1").await.unwrap();
    assert_eq!(info.email, "admin@example.com");
    assert_eq!(info.tenants.len(), 1);
    assert_eq!(
        info.tenants[0].primary_role(),
        Some(saasus_console::Role::Admin)
    );
}

#[tokio::test]
async fn attribute_fan_out_joins_both_schemas() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let (users, tenants) = client.signup_attributes("id-1").await.unwrap();
    assert!(users.user_attributes.contains_key("department"));
    assert!(tenants.tenant_attributes.contains_key("company_size"));
}

#[tokio::test]
async fn mfa_surface_requires_access_token() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let status = client.mfa_status("id-1").await.unwrap();
    assert!(!status.enabled);

    let setup = client.mfa_setup("id-1", "access-1").await.unwrap();
    assert_eq!(setup.qr_code_url, "otpauth://totp/sample");

    client.mfa_verify("id-1", "access-1", "123456").await.unwrap();

    let err = client.mfa_setup("id-1", "wrong-access").await.unwrap_err();
    assert!(matches!(err, saasus_console::Error::Api { .. }));
}

#[tokio::test]
async fn invitation_list_passes_tenant_query() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let invitations = client
        .invitations("id-1", &TenantId::from("t-1"))
        .await
        .unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].email, "new@acme.example");
    assert_eq!(invitations[0].status, "pending");
    assert_eq!(invitations[0].expired_at, Some(1893456000));

    let err = client
        .invitations("id-1", &TenantId::from("t-other"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        saasus_console::Error::Api { operation: "invitations", status: Some(404), .. }
    ));
}

#[tokio::test]
async fn invite_user_requires_access_token() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();
    let tenant = TenantId::from("t-1");

    client
        .invite_user("id-1", "access-1", "new@acme.example", &tenant)
        .await
        .unwrap();

    let err = client
        .invite_user("id-1", "wrong-access", "new@acme.example", &tenant)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        saasus_console::Error::Api { operation: "user_invitation", .. }
    ));
}

#[tokio::test]
async fn self_sign_up_submits_collected_attributes() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();

    let mut form = SignUpForm::default();
    form.tenant_name = "Acme".into();
    form.user_attribute_values
        .insert("department".into(), json!("sales"));
    form.tenant_attribute_values
        .insert("company_size".into(), json!(25));
    client.self_sign_up("id-1", &form).await.unwrap();

    let mut empty_name = SignUpForm::default();
    empty_name.user_attribute_values
        .insert("department".into(), json!("sales"));
    let err = client.self_sign_up("id-1", &empty_name).await.unwrap_err();
    assert!(matches!(
        err,
        saasus_console::Error::Api { operation: "self_sign_up", status: Some(400), .. }
    ));
}

#[tokio::test]
async fn full_lifecycle_exchange_expire_refresh() {
    let config = spawn_fake_api().await;
    let client = ApiClient::new(&config).unwrap();
    let store = Arc::new(MemoryStore::new());

    // Login callback: exchange the code, persist the session.
    let creds = client.exchange_code("auth-code-1").await.unwrap();
    store.save(Session {
        id_token: creds.id_token,
        access_token: creds.access_token,
    });

    // Next page mount finds an expired token; the guard refreshes through
    // the cookie jar and overwrites both stored tokens.
    let guard = SessionGuard::new(client.clone(), store.clone(), &config);
    guard.ensure_fresh_token(&expired_token()).await.unwrap();

    let session = store.read().unwrap();
    assert_eq!(session.id_token, "id-2");
    assert_eq!(session.access_token.as_deref(), Some("access-2"));
}
