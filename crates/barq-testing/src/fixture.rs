//! Provider payload builders.
//!
//! Shapes mirror what the OTP and report APIs return: every body is wrapped in
//! `{TimeStamp, status, SessionKey, message, data, error}`.

use serde_json::{Value, json};

const TIMESTAMP: &str = "2025-07-10T11:09:00.000";

/// Successful envelope around `data`.
pub fn ok_envelope(data: Value) -> Value {
    json!({
        "TimeStamp": TIMESTAMP,
        "status": 200,
        "SessionKey": null,
        "message": "عملیات با موفقیت انجام شد",
        "data": data,
        "error": null,
    })
}

/// Envelope reporting an in-body failure. HTTP status is still 200.
pub fn rejected_envelope(status: i64, message: &str) -> Value {
    json!({
        "TimeStamp": TIMESTAMP,
        "status": status,
        "SessionKey": null,
        "message": message,
        "data": null,
        "error": message,
    })
}

/// `data` of a successful `verifyCode` call.
pub fn verify_data(token: &str) -> Value {
    json!({ "Token": token, "Type": "Bearer" })
}

/// One planned-outage row as the report API returns it.
///
/// `outage_date` is Jalali (`1404/04/19`); times are `HH:MM:SS`.
pub fn blackout_row(outage_date: &str, start: &str, stop: &str) -> Value {
    json!({
        "reg_date": outage_date,
        "registrar": "سیستم",
        "reason_outage": "اصلاح و بهینه سازی شبکه",
        "outage_date": outage_date,
        "outage_time": start,
        "outage_start_time": start,
        "outage_stop_time": stop,
        "is_planned": true,
        "address": "خیابان آزادی",
        "outage_address": "خیابان آزادی",
        "city": 1,
        "outage_number": 1234,
        "tracking_code": 987654,
    })
}
