//! wiremock stand-in for the provider's OTP and report APIs.
//!
//! ```no_run
//! # async fn demo() {
//! use barq_testing::provider::MockProvider;
//!
//! let provider = MockProvider::start().await;
//! provider.send_code_ok().await;
//! provider.verify_code_ok("provider-token").await;
//! // point the service at provider.otp_base() / provider.report_base()
//! # }
//! ```

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixture::{ok_envelope, rejected_envelope, verify_data};

const OTP_PREFIX: &str = "/api/otp";
const REPORT_PREFIX: &str = "/api/ebills";
const SEND_CODE: &str = "/api/otp/sendCode";
const VERIFY_CODE: &str = "/api/otp/verifyCode";
const REPORT: &str = "/api/ebills/PlannedBlackoutsReport";

pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn otp_base(&self) -> String {
        format!("{}{OTP_PREFIX}", self.server.uri())
    }

    pub fn report_base(&self) -> String {
        format!("{}{REPORT_PREFIX}", self.server.uri())
    }

    async fn mount(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    // ── OTP ──────────────────────────────────────────────────────────────────

    pub async fn send_code_ok(&self) {
        self.mount(
            SEND_CODE,
            ResponseTemplate::new(200).set_body_json(ok_envelope(Value::Null)),
        )
        .await;
    }

    pub async fn send_code_rejected(&self, message: &str) {
        self.mount(
            SEND_CODE,
            ResponseTemplate::new(200).set_body_json(rejected_envelope(400, message)),
        )
        .await;
    }

    pub async fn send_code_http_error(&self, status: u16) {
        self.mount(SEND_CODE, ResponseTemplate::new(status)).await;
    }

    pub async fn verify_code_ok(&self, token: &str) {
        self.mount(
            VERIFY_CODE,
            ResponseTemplate::new(200).set_body_json(ok_envelope(verify_data(token))),
        )
        .await;
    }

    /// Accept only `code`; any other code gets an in-body rejection.
    pub async fn verify_code_accepting(&self, code: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path(VERIFY_CODE))
            .and(body_partial_json(json!({ "code": code })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope(verify_data(token))))
            .with_priority(1)
            .mount(&self.server)
            .await;
        self.verify_code_rejected("کد وارد شده صحیح نمی باشد").await;
    }

    pub async fn verify_code_rejected(&self, message: &str) {
        self.mount(
            VERIFY_CODE,
            ResponseTemplate::new(200).set_body_json(rejected_envelope(400, message)),
        )
        .await;
    }

    // ── Report ───────────────────────────────────────────────────────────────

    /// Serve `rows` for `bill_id` when called with `Bearer <token>`.
    pub async fn report(&self, token: &str, bill_id: &str, rows: Vec<Value>) {
        self.report_raw(token, bill_id, ResponseTemplate::new(200).set_body_json(ok_envelope(Value::Array(rows))))
            .await;
    }

    pub async fn report_rejected(&self, token: &str, bill_id: &str, message: &str) {
        self.report_raw(
            token,
            bill_id,
            ResponseTemplate::new(200).set_body_json(rejected_envelope(400, message)),
        )
        .await;
    }

    pub async fn report_http_error(&self, token: &str, bill_id: &str, status: u16) {
        self.report_raw(token, bill_id, ResponseTemplate::new(status)).await;
    }

    pub async fn report_raw(&self, token: &str, bill_id: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(REPORT))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .and(body_partial_json(json!({ "bill_id": bill_id })))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every report request received so far.
    pub async fn report_requests(&self) -> Vec<Value> {
        self.requests_to(REPORT).await
    }

    /// JSON bodies of every verifyCode request received so far.
    pub async fn verify_requests(&self) -> Vec<Value> {
        self.requests_to(VERIFY_CODE).await
    }

    async fn requests_to(&self, route: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
