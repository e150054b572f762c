mod common;

use std::sync::Arc;

use authsync::providers::{GoTrueProvider, GoTrueProviderConfig};
use axum::http::{Method, StatusCode};
use mockito::Server;
use tower::ServiceExt;

use common::{body_json, build_app, build_app_with, request, FakeProvider};

const USER_BODY: &str = r#"{
    "id": "8c1d",
    "email": "ada@example.com",
    "app_metadata": { "provider": "github" },
    "user_metadata": { "full_name": "Ada Lovelace" }
}"#;

fn gotrue_for(url: String) -> Arc<GoTrueProvider> {
    Arc::new(
        GoTrueProvider::new(&GoTrueProviderConfig {
            name: "supabase".to_string(),
            url,
            api_key: "anon".to_string(),
            timeout_in_ms: 1000,
        })
        .expect("provider should build"),
    )
}

#[tokio::test]
async fn callback_tokens_sign_the_user_in() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/user")
        .match_header("apikey", "anon")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_body(USER_BODY)
        .create_async()
        .await;

    let (app, coordinator) = build_app_with(gotrue_for(server.url())).await;
    assert!(coordinator.state().session().is_none());

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/callback?access_token=access-1&refresh_token=refresh-1&expires_in=3600",
        ))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["view"]["state"], "authenticated");
    assert_eq!(body["view"]["display_name"], "ada@example.com");
    m.assert_async().await;

    let response = app
        .oneshot(request(Method::GET, "/session"))
        .await
        .expect("request should succeed");
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], "8c1d");
    assert_eq!(body["error"], serde_json::Value::Null);

    let session = coordinator.state().session().cloned().expect("session should be held");
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert!(session.expires_at.is_some());
}

#[tokio::test]
async fn callback_with_rejected_token_stays_signed_out() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/user")
        .with_status(401)
        .with_body(r#"{"msg": "invalid JWT"}"#)
        .create_async()
        .await;

    let (app, coordinator) = build_app_with(gotrue_for(server.url())).await;

    let response = app
        .oneshot(request(Method::GET, "/callback?access_token=forged"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid JWT");
    m.assert_async().await;
    assert!(coordinator.state().session().is_none());
}

#[tokio::test]
async fn callback_without_access_token_is_a_bad_request() {
    let server = Server::new_async().await;
    let (app, _) = build_app_with(gotrue_for(server.url())).await;

    let response = app
        .oneshot(request(Method::GET, "/callback?refresh_token=r"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_without_redirect_support_refuses_callback() {
    let (app, coordinator) = build_app(Arc::new(FakeProvider::new())).await;

    let response = app
        .oneshot(request(Method::GET, "/callback?access_token=t"))
        .await
        .expect("request should succeed");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(coordinator.state().session().is_none());
}
