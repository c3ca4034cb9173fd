/// Integration tests for the Tallybook API
///
/// Offline tests run against a router whose pool never connects: they cover
/// guards, headers and webhook checks that answer before any query.
/// `test_register_and_record_flow` needs `DATABASE_URL` and is skipped
/// without it.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::{
    access_token, empty_request, json_request, TestContext, META_APP_SECRET, SHOPIFY_SECRET,
    TEST_JWT_SECRET,
};
use serde_json::json;
use tallybook_shared::{
    auth::jwt::validate_access_token,
    webhooks::signature::{sign_base64, sign_hex},
};
use uuid::Uuid;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(empty_request("GET", "/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = ctx
        .send(empty_request("GET", "/api/sales", Some("not-a-jwt")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_token_claims_without_database() {
    let ctx = TestContext::offline();
    let user = Uuid::new_v4();
    let company = Uuid::new_v4();

    let (status, body) = ctx
        .send(empty_request(
            "GET",
            "/api/auth/me",
            Some(&access_token(user, Some(company))),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sub"], user.to_string());
    assert_eq!(body["email"], "user@example.com");
    assert_eq!(body["companyId"], company.to_string());
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, headers, body) = ctx.send_raw(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");

    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["statusCode"], 400);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_unknown_route_gets_error_body() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(empty_request("GET", "/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

#[tokio::test]
async fn test_invalid_transaction_fields_are_bad_request() {
    let ctx = TestContext::offline();
    let token = access_token(Uuid::new_v4(), Some(Uuid::new_v4()));

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/transactions",
            Some(&token),
            json!({ "type": "transfer", "amount": 10, "description": "x" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["message"], "type deve ser income ou expense");
    assert_eq!(body["details"][0]["field"], "type");

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/transactions",
            Some(&token),
            json!({ "type": "income", "amount": 10, "description": "   " }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "description");
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_security_and_rate_limit_headers() {
    let ctx = TestContext::offline();

    let (_, headers, _) = ctx.send_raw(empty_request("GET", "/health", None)).await;

    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none());
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "600");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "599");
}

#[tokio::test]
async fn test_cross_tenant_company_is_forbidden() {
    let ctx = TestContext::offline();
    let token = access_token(Uuid::new_v4(), Some(Uuid::new_v4()));
    let other = Uuid::new_v4();

    let (status, body) = ctx
        .send(empty_request(
            "GET",
            &format!("/api/sales?companyId={}", other),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/api/financial",
            Some(&token),
            json!({ "companyId": other, "type": "income", "amount": 10, "description": "x" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(empty_request(
            "GET",
            &format!("/api/financial/{}", other),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let ctx = TestContext::offline();
    let token = access_token(Uuid::new_v4(), None);

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": token }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(json_request("POST", "/api/auth/refresh", None, json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_meta_subscription_handshake() {
    let ctx = TestContext::offline();

    let (status, _, body) = ctx
        .send_raw(empty_request(
            "GET",
            "/api/webhooks/meta?hub.mode=subscribe&hub.verify_token=meta-verify&hub.challenge=1158201444",
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"1158201444");

    let (status, body) = ctx
        .send(empty_request(
            "GET",
            "/api/webhooks/meta?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Verificação do webhook Meta falhou");
}

#[tokio::test]
async fn test_webhook_signature_mismatch_is_rejected() {
    let ctx = TestContext::offline();
    let payload = br#"{"object":"ad_account","entry":[]}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/meta")
        .header("content-type", "application/json")
        .header("x-hub-signature-256", format!("sha256={}", sign_hex("wrong-secret", payload)))
        .body(Body::from(&payload[..]))
        .unwrap();
    let (status, body) = ctx.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Assinatura Meta inválida");

    let order = br#"{"id":1,"total_price":"10.00"}"#;
    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/shopify")
        .header("content-type", "application/json")
        .header("x-shopify-topic", "orders/create")
        .header("x-shopify-hmac-sha256", sign_base64("wrong-secret", order))
        .body(Body::from(&order[..]))
        .unwrap();
    let (status, body) = ctx.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Assinatura Shopify inválida");
}

#[tokio::test]
async fn test_signed_meta_event_without_mapping_is_skipped() {
    let ctx = TestContext::offline();
    let payload = br#"{"object":"ad_account","entry":[{"id":"act_1","changes":[{"field":"spend","value":{"spend":"12.5"}}]}]}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/meta")
        .header("content-type", "application/json")
        .header("x-hub-signature-256", format!("sha256={}", sign_hex(META_APP_SECRET, payload)))
        .body(Body::from(&payload[..]))
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert!(body["skipped"].is_string());
}

#[tokio::test]
async fn test_signed_shopify_event_with_other_topic_is_ignored() {
    let ctx = TestContext::offline();
    let payload = br#"{"id":1}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/shopify")
        .header("content-type", "application/json")
        .header("x-shopify-topic", "products/update")
        .header("x-shopify-hmac-sha256", sign_base64(SHOPIFY_SECRET, payload))
        .body(Body::from(&payload[..]))
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert!(body.get("synced").is_none());
}

#[tokio::test]
async fn test_register_and_record_flow() {
    let Some(ctx) = TestContext::connect().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let suffix = Uuid::new_v4().simple().to_string();
    let (status, session) = ctx
        .send(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": format!("flow-{}@example.com", suffix),
                "password": "secret123",
                "companyName": "Loja Teste",
                "companySlug": format!("loja-{}", &suffix[..12]),
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", session);

    let token = session["accessToken"].as_str().unwrap().to_string();
    let refresh = session["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(session["access_token"], session["accessToken"]);

    let claims = validate_access_token(&token, TEST_JWT_SECRET).unwrap();
    let company_id = claims.company_id.expect("token carries the new company");
    assert_eq!(session["user"]["companyId"], company_id.to_string());
    assert_eq!(session["user"]["id"], claims.sub.to_string());

    let (status, duplicate) = ctx
        .send(json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": format!("flow-{}@example.com", suffix),
                "password": "secret123",
                "companyName": "Outra Loja",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(duplicate["statusCode"], 409);

    let (status, sale) = ctx
        .send(json_request(
            "POST",
            "/api/sales",
            Some(&token),
            json!({
                "amount": 150.5,
                "productName": "Produto A",
                "occurredAt": chrono::Utc::now().to_rfc3339(),
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sale);
    assert_eq!(sale["channel"], "manual");

    let (status, totals) = ctx
        .send(empty_request("GET", "/api/sales/aggregates", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["today"], 150.5);
    assert_eq!(totals["yesterday"], 0.0);

    let (status, created) = ctx
        .send(json_request(
            "POST",
            "/api/financial",
            Some(&token),
            json!({ "type": "EXPENSE", "amount": 50.25, "description": "Aluguel" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["totalExpense"], 50.25);
    assert_eq!(created["balance"], -50.25);
    assert_eq!(created["transactionsCount"], 1);

    let (status, metrics) = ctx
        .send(empty_request("GET", "/api/dashboard/metrics", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["revenue"], 150.5);
    assert_eq!(metrics["expenses"], 50.25);
    assert_eq!(metrics["profit"], 100.25);
    assert_eq!(metrics["companyCount"], 1);

    let (status, invalid) = ctx
        .send(json_request(
            "POST",
            "/api/sales",
            Some(&token),
            json!({ "amount": 0, "occurredAt": "2025-01-01" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(invalid["details"].is_array());

    let (status, rotated) = ctx
        .send(json_request(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": refresh }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refreshToken"], refresh.as_str());
    let rotated_refresh = rotated["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": refresh }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logout without a refresh token revokes every session of the user
    let (status, body) = ctx
        .send(empty_request("POST", "/api/auth/logout", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = ctx
        .send(json_request(
            "POST",
            "/api/auth/refresh",
            None,
            json!({ "refreshToken": rotated_refresh }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(empty_request("DELETE", "/api/profile", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
}
