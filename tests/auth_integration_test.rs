use httpmock::prelude::*;
use roster_migrate::app::commands;
use roster_migrate::domain::model::Role;
use roster_migrate::{AuthClient, MigrateError, TomlConfig};
use serde_json::json;

fn config_for(server: &MockServer) -> TomlConfig {
    TomlConfig::from_toml_str(&format!(
        r#"
[store]
url = "{}/"
api_key = "anon-key"

[auth]
email = "director@school.edu"
password = "secret"
"#,
        server.base_url()
    ))
    .unwrap()
}

async fn mock_token<'a>(server: &'a MockServer, email: &str) -> httpmock::Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", "anon-key")
                .json_body(json!({"email": email, "password": "secret"}));
            then.status(200).json_body(json!({
                "access_token": "user-jwt",
                "token_type": "bearer",
                "user": {"id": "8f14e45f", "email": email}
            }));
        })
        .await
}

#[tokio::test]
async fn test_admin_login_uses_user_token_for_lookup() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server, "director@school.edu").await;
    let admins = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/admins")
                .query_param("email", "ilike.director@school.edu")
                .header("authorization", "Bearer user-jwt");
            then.status(200).json_body(json!([{"name": "Marta"}]));
        })
        .await;

    let config = config_for(&server);
    let (email, password) = config.credentials().unwrap();
    let session = AuthClient::new(&config)
        .unwrap()
        .login(&config, email, password)
        .await
        .unwrap();

    token.assert_async().await;
    admins.assert_async().await;
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.display_name, "Marta");
    assert_eq!(session.user_id, "8f14e45f");
    assert!(commands::ensure_admin(Some(&session)).is_ok());
}

#[tokio::test]
async fn test_professor_cannot_migrate() {
    let server = MockServer::start_async().await;
    mock_token(&server, "director@school.edu").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/admins");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/professors")
                .query_param("select", "name");
            then.status(200).json_body(json!([{"name": "Luis"}]));
        })
        .await;

    let config = config_for(&server);
    let session = AuthClient::new(&config)
        .unwrap()
        .login(&config, "director@school.edu", "secret")
        .await
        .unwrap();

    assert_eq!(session.role, Role::Professor);
    assert!(matches!(
        commands::ensure_admin(Some(&session)),
        Err(MigrateError::AuthError { .. })
    ));
}

#[tokio::test]
async fn test_rejected_credentials() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        })
        .await;

    let config = config_for(&server);
    let err = AuthClient::new(&config)
        .unwrap()
        .sign_in("director@school.edu", "wrong")
        .await
        .unwrap_err();

    match err {
        MigrateError::AuthError { message } => assert_eq!(message, "Invalid login credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_user_has_no_role() {
    let server = MockServer::start_async().await;
    mock_token(&server, "director@school.edu").await;
    for table in ["admins", "professors", "students"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/rest/v1/{}", table));
                then.status(200).json_body(json!([]));
            })
            .await;
    }

    let config = config_for(&server);
    let err = AuthClient::new(&config)
        .unwrap()
        .login(&config, "director@school.edu", "secret")
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::AuthError { .. }));
}

#[tokio::test]
async fn test_denied_admin_lookup_falls_through_to_professors() {
    let server = MockServer::start_async().await;
    mock_token(&server, "director@school.edu").await;
    let admins = server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/admins");
            then.status(401)
                .json_body(json!({"message": "permission denied for table admins"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/professors");
            then.status(200).json_body(json!([{"name": "Luis"}]));
        })
        .await;

    let config = config_for(&server);
    let session = AuthClient::new(&config)
        .unwrap()
        .login(&config, "director@school.edu", "secret")
        .await
        .unwrap();

    admins.assert_async().await;
    assert_eq!(session.role, Role::Professor);
    assert_eq!(session.display_name, "Luis");
}

#[tokio::test]
async fn test_sign_in_honours_configured_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(200)
                .delay(std::time::Duration::from_secs(3))
                .json_body(json!({"access_token": "late", "user": {"id": "x"}}));
        })
        .await;

    let config = TomlConfig::from_toml_str(&format!(
        r#"
[store]
url = "{}"
api_key = "anon-key"
timeout_seconds = 1
"#,
        server.base_url()
    ))
    .unwrap();

    let err = AuthClient::new(&config)
        .unwrap()
        .sign_in("director@school.edu", "secret")
        .await
        .unwrap_err();

    match err {
        MigrateError::ApiError(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
}
