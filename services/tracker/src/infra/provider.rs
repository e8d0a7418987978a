//! HTTP client for the provider's OTP and planned-outage report APIs.
//!
//! Both APIs wrap payloads in `{status, message, data, error}`; a body
//! `status` other than 200 is a rejection even when HTTP says 200.

use std::time::Duration;

use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::{ReportWindow, parse_to_gregorian};
use crate::domain::repository::{FetchError, OtpPort, ReportPort};
use crate::domain::types::ReportedBlackout;
use crate::error::TrackerError;

const PROVIDER_SITE: &str = "https://bargheman.com";
const ACCEPT_JSON: &str = "application/json, text/plain, */*";
/// Client identifier the OTP API expects on verification.
const REQUEST_SOURCE: u8 = 5;

#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    otp_base: String,
    report_base: String,
}

impl HttpProvider {
    pub fn new(otp_base: &str, report_base: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            otp_base: otp_base.trim_end_matches('/').to_owned(),
            report_base: report_base.trim_end_matches('/').to_owned(),
        })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn is_ok(&self) -> bool {
        self.status == 200
    }

    fn rejection(&self, fallback: &str) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_owned();
        }
        match &self.error {
            Some(Value::String(e)) if !e.is_empty() => e.clone(),
            Some(Value::Null) | None => fallback.to_owned(),
            Some(other) => other.to_string(),
        }
    }
}

async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<Envelope<T>, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::Unavailable(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Unavailable(format!("HTTP {status}")));
    }
    response
        .json::<Envelope<T>>()
        .await
        .map_err(|e| FetchError::Malformed(e.to_string()))
}

// ── OTP API ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SendCodeRequest<'a> {
    mobile: &'a str,
}

#[derive(Serialize)]
struct VerifyCodeRequest<'a> {
    mobile: &'a str,
    code: &'a str,
    request_source: u8,
    device_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyCodeData {
    #[serde(rename = "Token")]
    token: String,
}

impl OtpPort for HttpProvider {
    async fn send(&self, mobile: &str) -> Result<(), TrackerError> {
        let request = self
            .client
            .post(format!("{}/sendCode", self.otp_base))
            .header(ACCEPT, ACCEPT_JSON)
            .json(&SendCodeRequest { mobile });
        let envelope: Envelope<Value> = send_json(request).await?;
        if !envelope.is_ok() {
            return Err(TrackerError::ExternalApiRejected(
                envelope.rejection("failed to send OTP"),
            ));
        }
        Ok(())
    }

    async fn verify(&self, mobile: &str, code: &str) -> Result<String, TrackerError> {
        let request = self
            .client
            .post(format!("{}/verifyCode", self.otp_base))
            .header(ACCEPT, ACCEPT_JSON)
            .json(&VerifyCodeRequest {
                mobile,
                code,
                request_source: REQUEST_SOURCE,
                device_token: "",
            });
        // Rejections carry no usable `data`, so decode it only after the status check.
        let envelope: Envelope<Value> = send_json(request).await?;
        if !envelope.is_ok() {
            return Err(TrackerError::ExternalApiRejected(
                envelope.rejection("failed to verify OTP"),
            ));
        }
        let data: VerifyCodeData = serde_json::from_value(envelope.data.unwrap_or(Value::Null))
            .map_err(|e| FetchError::Malformed(format!("verify data: {e}")))?;
        Ok(data.token)
    }
}

// ── Report API ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ReportRequest<'a> {
    bill_id: &'a str,
    from_date: String,
    to_date: String,
}

#[derive(Deserialize)]
struct ReportRow {
    /// Jalali `YYYY/MM/DD`.
    outage_date: String,
    outage_time: String,
    outage_stop_time: String,
    #[serde(default)]
    reason_outage: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<ReportRow> for ReportedBlackout {
    type Error = FetchError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let outage_date = parse_to_gregorian(&row.outage_date)
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(ReportedBlackout {
            outage_date,
            start_time: row.outage_time,
            end_time: row.outage_stop_time,
            reason: non_blank(row.reason_outage),
            address: non_blank(row.address),
        })
    }
}

impl ReportPort for HttpProvider {
    async fn fetch(
        &self,
        token: &str,
        bill_id: &str,
        window: &ReportWindow,
    ) -> Result<Vec<ReportedBlackout>, FetchError> {
        let request = self
            .client
            .post(format!("{}/PlannedBlackoutsReport", self.report_base))
            .bearer_auth(token)
            .header(REFERER, format!("{PROVIDER_SITE}/"))
            .header(ORIGIN, PROVIDER_SITE)
            .json(&ReportRequest {
                bill_id,
                from_date: window.from.to_string(),
                to_date: window.to.to_string(),
            });
        let envelope: Envelope<Value> = send_json(request).await?;
        if !envelope.is_ok() {
            return Err(FetchError::Rejected(envelope.rejection("report request rejected")));
        }
        let Some(Value::Array(items)) = envelope.data else {
            return Err(FetchError::Malformed("`data` is not an array".to_owned()));
        };
        items
            .into_iter()
            .map(|item| {
                let row: ReportRow = serde_json::from_value(item)
                    .map_err(|e| FetchError::Malformed(format!("report row: {e}")))?;
                ReportedBlackout::try_from(row)
            })
            .collect()
    }
}
