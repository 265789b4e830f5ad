mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Unknown email and wrong password must be indistinguishable: same status,
/// same body.
#[tokio::test]
async fn login_failures_share_one_error_shape() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let unknown = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": "ghost@example.com", "password": "password123"}))
        .send()
        .await?;
    if unknown.status() == StatusCode::SERVICE_UNAVAILABLE {
        // No database behind this run; nothing to compare
        return Ok(());
    }
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: Value = unknown.json().await?;
    assert_eq!(unknown_body["message"], "Invalid email or password");

    // A real account presented with the wrong password
    let email = format!("login-shape-{}@example.com", uuid::Uuid::new_v4());
    client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({"email": email, "password": "password123", "name": "Test"}))
        .send()
        .await?;

    let wrong = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": email, "password": "not-the-password"}))
        .send()
        .await?;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = wrong.json().await?;
    assert_eq!(unknown_body, wrong_body);
    Ok(())
}
