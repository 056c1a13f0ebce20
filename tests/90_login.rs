mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Unknown tenant, unknown user, and wrong password must all produce the
/// same response, so the login endpoint cannot be used to probe for which
/// schools or accounts exist.
#[tokio::test]
async fn login_rejects_unknown_tenant_with_one_message() -> Result<()> {
    if !common::database_url_configured() {
        eprintln!("skipping: DATABASE_URL is not configured");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let payload = json!({
        "tenant": "no-such-school",
        "email": "head@school.test",
        "password": "definitely-wrong"
    });

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&payload)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid tenant, email, or password"));
    Ok(())
}

#[tokio::test]
async fn login_without_body_is_a_client_error() -> Result<()> {
    if !common::database_url_configured() {
        eprintln!("skipping: DATABASE_URL is not configured");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .send()
        .await?;

    assert!(
        res.status().is_client_error(),
        "expected a 4xx for a missing body, got {}",
        res.status()
    );
    Ok(())
}

#[tokio::test]
async fn protected_api_rejects_anonymous_requests() -> Result<()> {
    if !common::database_url_configured() {
        eprintln!("skipping: DATABASE_URL is not configured");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/students", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], json!("UNAUTHORIZED"));
    Ok(())
}
