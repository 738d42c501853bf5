use std::sync::Arc;

use bankcore_api::app;
use bankcore_core::{Clock, FixedClock};
use bankcore_infra::config::BankCoreConfig;
use bankcore_infra::kv::InMemoryKeyValueStore;
use chrono::{FixedOffset, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

const TODAY: &str = "2025-03-10";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores; the clock is pinned to
        // 2025-03-10 12:00 in Seoul so business dates are deterministic.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap();
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now, offset));
        let services = app::services::wire(
            &BankCoreConfig::default(),
            Arc::new(InMemoryKeyValueStore::new()),
            clock,
        )
        .expect("failed to wire services");
        let app = app::build_app(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// POST with an `Idempotency-Key`, returning the raw body text.
    async fn post_idempotent(&self, path: &str, key: &str, body: Value) -> (StatusCode, String) {
        let res = self
            .client
            .post(self.url(path))
            .header("Idempotency-Key", key)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.text().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn open_account(&self, customer_id: i64, maturity_date: Option<&str>) -> i64 {
        let (status, body) = self
            .post(
                "/api/accounts",
                json!({
                    "customer_id": customer_id,
                    "product_code": "SAV001",
                    "maturity_date": maturity_date,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn deposit(&self, id: i64, amount: &str) -> (StatusCode, Value) {
        self.post(&format!("/api/accounts/{id}/deposit"), json!({ "amount": amount }))
            .await
    }

    async fn withdraw(&self, id: i64, amount: &str) -> (StatusCode, Value) {
        self.post(&format!("/api/accounts/{id}/withdraw"), json!({ "amount": amount }))
            .await
    }

    async fn register_rates(&self, preferential: Option<(&str, &str)>) {
        let (status, _) = self
            .post("/api/rates/base", json!({"business_date": TODAY, "rate": "0.0300"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = self
            .post(
                "/api/rates/spread",
                json!({"product_code": "SAV001", "business_date": TODAY, "rate": "0.0010"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        if let Some((code, rate)) = preferential {
            let (status, _) = self
                .post(
                    "/api/rates/preferential",
                    json!({
                        "product_code": "SAV001",
                        "condition_code": code,
                        "business_date": TODAY,
                        "rate": rate,
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    async fn settlement_transactions(&self, id: i64) -> Vec<Value> {
        let (status, body) = self.get(&format!("/api/accounts/{id}/transactions")).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .filter(|t| t["transaction_type"] == "INTEREST_SETTLEMENT")
            .cloned()
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn account_lifecycle_from_open_to_close() {
    let server = TestServer::spawn().await;
    let id = server.open_account(1, None).await;

    let (status, account) = server.get(&format!("/api/accounts/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["status"], "ACTIVE");
    assert_eq!(account["balance"], "0.00");
    assert_eq!(account["product_name"], "Basic Savings");
    assert!(account["account_number"].as_str().unwrap().starts_with("110-"));

    let (status, body) = server.deposit(id, "1000000000.00").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "1000000000.00");

    let (_, body) = server.withdraw(id, "495000000.00").await;
    assert_eq!(body["balance"], "505000000.00");

    let (status, body) = server.post(&format!("/api/accounts/{id}/close"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = server.withdraw(id, "505000000.00").await;
    assert_eq!(body["balance"], "0.00");

    let (status, body) = server.post(&format!("/api/accounts/{id}/close"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CLOSED");
    assert!(!body["closed_at"].is_null());

    assert_eq!(server.deposit(id, "1.00").await.0, StatusCode::CONFLICT);
    assert_eq!(server.withdraw(id, "1.00").await.0, StatusCode::CONFLICT);

    let (status, body) = server.post(&format!("/api/accounts/{id}/close"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn repeated_idempotency_key_replays_the_first_response() {
    let server = TestServer::spawn().await;
    let id = server.open_account(1, None).await;
    let path = format!("/api/accounts/{id}/deposit");

    let (first_status, first) = server
        .post_idempotent(&path, "deposit-1", json!({"amount": "100.00"}))
        .await;
    let (second_status, second) = server
        .post_idempotent(&path, "deposit-1", json!({"amount": "100.00"}))
        .await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let (_, account) = server.get(&format!("/api/accounts/{id}")).await;
    assert_eq!(account["balance"], "100.00");

    // Same client key on another endpoint is a different request.
    let (status, body) = server
        .post_idempotent(
            &format!("/api/accounts/{id}/withdraw"),
            "deposit-1",
            json!({"amount": "30.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["balance"], "70.00");
}

#[tokio::test]
async fn failed_request_frees_its_idempotency_key() {
    let server = TestServer::spawn().await;
    let id = server.open_account(1, None).await;
    let path = format!("/api/accounts/{id}/withdraw");

    let (status, _) = server
        .post_idempotent(&path, "withdraw-1", json!({"amount": "50.00"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    server.deposit(id, "100.00").await;

    let (status, body) = server
        .post_idempotent(&path, "withdraw-1", json!({"amount": "50.00"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["balance"], "50.00");
}

#[tokio::test]
async fn daily_accrual_applies_composed_rate_once() {
    let server = TestServer::spawn().await;
    server.register_rates(Some(("VIP", "0.0020"))).await;

    let (status, composed) = server
        .get(&format!(
            "/api/rates/composed?product_code=SAV001&business_date={TODAY}&condition_codes=VIP"
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(composed["applied_rate"], "0.0330");

    let id = server.open_account(1, None).await;
    server.deposit(id, "1000000.00").await;

    let path = format!("/api/accounts/{id}/interests/daily-accrual");
    let request = json!({"business_date": TODAY, "condition_codes": ["VIP"]});

    let (status, first) = server.post(&path, request.clone()).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["applied_rate"], "0.0330");
    assert_eq!(first["interest_amount"], "90.41");
    assert_eq!(first["already_processed"], false);

    let (status, second) = server.post(&path, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["interest_amount"], "90.41");
    assert_eq!(second["already_processed"], true);
}

#[tokio::test]
async fn daily_accrual_rejects_bad_input() {
    let server = TestServer::spawn().await;
    server.register_rates(None).await;
    let id = server.open_account(1, None).await;
    let path = format!("/api/accounts/{id}/interests/daily-accrual");

    let (status, body) = server.post(&path, json!({"business_date": "2025-03-11"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = server
        .post(&path, json!({"business_date": TODAY, "condition_codes": ["vip"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/api/accounts/999/interests/daily-accrual", json!({"business_date": TODAY}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn early_close_settles_interest_exactly_once() {
    let server = TestServer::spawn().await;
    server.register_rates(None).await;
    let id = server.open_account(1, Some("2025-04-09")).await;

    server.deposit(id, "1000000.00").await;
    let (_, accrual) = server
        .post(
            &format!("/api/accounts/{id}/interests/daily-accrual"),
            json!({"business_date": TODAY}),
        )
        .await;
    assert_eq!(accrual["interest_amount"], "84.93");
    server.withdraw(id, "1000000.00").await;

    let path = format!("/api/accounts/{id}/close");
    let (status, first) = server.post_idempotent(&path, "close-1", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    let (status, retried) = server.post_idempotent(&path, "close-1", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, retried);

    let settlements = server.settlement_transactions(id).await;
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0]["amount"], "84.93");
    assert_eq!(settlements[0]["balance_after"], "0.00");
}

#[tokio::test]
async fn closing_after_maturity_records_no_settlement() {
    let server = TestServer::spawn().await;
    let id = server.open_account(1, Some("2025-03-01")).await;

    server.deposit(id, "1000000.00").await;
    server.withdraw(id, "1000000.00").await;

    let (status, body) = server.post(&format!("/api/accounts/{id}/close"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(server.settlement_transactions(id).await.is_empty());
}

#[tokio::test]
async fn transfer_moves_funds_and_rejects_bad_requests() {
    let server = TestServer::spawn().await;
    let from = server.open_account(1, None).await;
    let to = server.open_account(2, None).await;
    server.deposit(from, "1000.00").await;

    let (status, receipt) = server
        .post(
            "/api/transfers",
            json!({"from_account_id": from, "to_account_id": to, "amount": "300.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{receipt}");
    assert_eq!(receipt["from_balance"], "700.00");
    assert_eq!(receipt["to_balance"], "300.00");

    let (status, _) = server
        .post(
            "/api/transfers",
            json!({"from_account_id": from, "to_account_id": from, "amount": "1.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/api/transfers",
            json!({"from_account_id": from, "to_account_id": to, "amount": "5000.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .post(
            "/api/transfers",
            json!({"from_account_id": from, "to_account_id": 9999, "amount": "1.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("destination"));

    let (_, source) = server.get(&format!("/api/accounts/{from}")).await;
    let (_, destination) = server.get(&format!("/api/accounts/{to}")).await;
    assert_eq!(source["balance"], "700.00");
    assert_eq!(destination["balance"], "300.00");
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_the_ledger() {
    let server = TestServer::spawn().await;
    let id = server.open_account(1, None).await;

    assert_eq!(server.deposit(id, "-5.00").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(server.deposit(id, "1.001").await.0, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/accounts", json!({"customer_id": 1, "product_code": "NOPE"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = server.get("/api/accounts/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = server
        .post("/api/rates/base", json!({"business_date": TODAY, "rate": "10.0000"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
