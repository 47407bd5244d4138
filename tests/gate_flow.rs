//! End-to-end gate behavior over real sockets.

use std::time::Duration;
use serde_json::{json, Value};

use rag_gateway::auth::{Claims, TokenIssuer};
use rag_gateway::util::unix_now;

mod common;

fn workspace_body() -> Value {
    json!({ "name": "Endocrinology", "language": "en", "cultural_context": "gulf" })
}

#[tokio::test]
async fn test_authentication_failures() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = common::base_config();
    config.audit.file_path = Some(audit_path.display().to_string());
    let gateway = common::start_gateway(config).await;
    let client = common::client();
    let url = gateway.url("/workspaces");

    // No header.
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    // Wrong scheme.
    let res = client
        .get(&url)
        .header("authorization", "Basic Zm9vOmJhcg==")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // Signed with another secret.
    let forged = TokenIssuer::new("some-other-secret-also-32-bytes-long!", 600)
        .issue("dr_forged", None, None)
        .unwrap()
        .access_token;
    let res = client.get(&url).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Invalid authentication credentials");

    // Expired.
    let expired = TokenIssuer::new(common::SECRET, 600)
        .sign(&Claims {
            sub: "dr_expired".into(),
            email: None,
            role: None,
            exp: unix_now() - 30,
            iat: None,
        })
        .unwrap();
    let res = client.get(&url).bearer_auth(expired).send().await.unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Token has expired");

    let records = common::read_audit_file(&audit_path);
    let reasons: Vec<_> = records
        .iter()
        .map(|r| r.details()["reason"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(reasons, ["malformed", "malformed", "invalid_signature", "expired"]);
    assert!(records
        .iter()
        .all(|r| r.identity() == "anonymous" && r.action() == "auth.verify" && !r.success()));
}

#[tokio::test]
async fn test_quota_per_identity_over_the_wire() {
    let mut config = common::base_config();
    config.rate_limit.quota = 3;
    let gateway = common::start_gateway(config).await;
    let client = common::client();
    let token = common::mint_token("dr_busy");

    let mut remaining = Vec::new();
    for _ in 0..3 {
        let res = client
            .get(gateway.url("/workspaces"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        remaining.push(res.headers()["x-ratelimit-remaining"].to_str().unwrap().to_string());
    }
    assert_eq!(remaining, ["2", "1", "0"]);

    let res = client
        .post(gateway.url("/workspaces"))
        .bearer_auth(&token)
        .json(&workspace_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.headers()["retry-after"], "60");

    // Quota is per identity, not per route or per connection.
    let res = client
        .post(gateway.url("/workspaces"))
        .bearer_auth(common::mint_token("dr_idle"))
        .json(&workspace_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    // Public routes are never charged.
    for _ in 0..5 {
        let res = client.get(gateway.url("/health")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
}

#[tokio::test]
async fn test_policy_update_applies_without_restart() {
    let mut config = common::base_config();
    config.rate_limit.quota = 1;
    let gateway = common::start_gateway(config.clone()).await;
    let client = common::client();
    let token = common::mint_token("dr_reload");

    let send = || client.get(gateway.url("/workspaces")).bearer_auth(&token).send();
    assert_eq!(send().await.unwrap().status(), 200);
    assert_eq!(send().await.unwrap().status(), 429);

    config.rate_limit.quota = 5;
    gateway.config_updates.send(config).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Rejections were never recorded, so one call is in the window.
    let res = send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-ratelimit-remaining"], "3");
}

#[tokio::test]
async fn test_request_id_and_audit_correlation() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = common::base_config();
    config.audit.file_path = Some(audit_path.display().to_string());
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/workspaces"))
        .bearer_auth(common::mint_token("dr_trace"))
        .header("x-request-id", "req-1234")
        .header("user-agent", "gateway-tests/1.0")
        .json(&workspace_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-request-id"], "req-1234");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], "dr_trace");
    assert_eq!(body["cultural_context"], "gulf");

    let records = common::read_audit_file(&audit_path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_id(), "req-1234");
    assert_eq!(records[0].user_agent(), "gateway-tests/1.0");
    assert_eq!(records[0].action(), "workspace.create");
    assert_eq!(records[0].resource(), body["workspace_id"].as_str().unwrap());
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin_only() {
    let gateway = common::start_gateway(common::base_config()).await;
    let client = common::client();

    let preflight = |origin: &'static str| {
        client
            .request(reqwest::Method::OPTIONS, gateway.url("/chat/query"))
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "authorization,content-type")
            .send()
    };

    let res = preflight("http://localhost:3000").await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");

    let res = preflight("https://evil.example").await.unwrap();
    assert!(res.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_demo_token_round_trip() {
    let mut config = common::base_config();
    config.auth.demo_tokens_enabled = true;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/auth/demo-token?email=demo@clinic.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let token: Value = res.json().await.unwrap();
    assert_eq!(token["token_type"], "bearer");
    assert_eq!(token["expires_in"], 3600);

    let res = client
        .get(gateway.url("/workspaces"))
        .bearer_auth(token["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], "user_demo");
}

#[tokio::test]
async fn test_upload_multipart_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = common::base_config();
    config.audit.file_path = Some(audit_path.display().to_string());
    let gateway = common::start_gateway(config).await;

    let file = reqwest::multipart::Part::bytes(b"{\"glucose\": 5.4}".to_vec())
        .file_name("labs.json")
        .mime_str("application/json")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("workspace_id", "ws_labs")
        .text(
            "metadata",
            json!({ "filename": "labs.json", "document_type": "json", "compliance_level": "phi" })
                .to_string(),
        )
        .part("file", file);

    let res = common::client()
        .post(gateway.url("/documents/upload"))
        .bearer_auth(common::mint_token("dr_upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["workspace_id"], "ws_labs");
    assert!(body["document_id"].as_str().unwrap().starts_with("doc_"));

    let records = common::read_audit_file(&audit_path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action(), "document.upload");
    assert_eq!(records[0].details()["size"], 16);
}
