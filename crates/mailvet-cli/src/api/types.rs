//! API request and response types
//!
//! Mirrors the JSON documents exchanged with the verification service.
//! Counters the service omits default to zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mailvet_common::{BatchStatus, Category, CategoryTotals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST verify/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub emails: Vec<String>,
}

/// Body of `POST verify/email`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleVerifyRequest {
    pub email: String,
}

/// Snapshot returned by `GET verify/status/{jobId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub total_emails: u64,
    #[serde(default)]
    pub verified_emails: u64,
    #[serde(default)]
    pub results: CategoryTotals,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl StatusSnapshot {
    pub fn batch_status(&self) -> BatchStatus {
        BatchStatus::from_remote(&self.status)
    }

    /// Snapshot time, if the service sent one we can read
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the timestamp shapes the service emits: RFC 3339, naive ISO
/// date-times (assumed UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Response of `GET results/batches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchListResponse {
    #[serde(default)]
    pub batch_ids: Vec<String>,
    #[serde(default)]
    pub count: u64,
}

/// One verified address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailResult {
    pub email: String,
    pub category: Category,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `GET results/batch/{batchId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetails {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub total_emails: u64,
    #[serde(default)]
    pub verified_emails: u64,
    #[serde(default)]
    pub results: CategoryTotals,
    #[serde(default)]
    pub email_results: BTreeMap<String, EmailResult>,
}

impl BatchDetails {
    /// Per-email records ordered by address
    pub fn emails(&self) -> Vec<&EmailResult> {
        self.email_results.values().collect()
    }
}

/// Lifetime counts from `GET statistics/category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    #[serde(default)]
    pub valid: u64,
    #[serde(default)]
    pub invalid: u64,
    #[serde(default)]
    pub risky: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub categories: CategoryCounts,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl CategoryStats {
    /// Share of valid addresses, one decimal place
    pub fn verification_rate(&self) -> f64 {
        mailvet_common::types::rate(self.categories.valid, self.categories.total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_status_snapshot_defaults_missing_counters() {
        let snap: StatusSnapshot =
            serde_json::from_str(r#"{"job_id":"J1","status":"running"}"#).unwrap();
        assert_eq!(snap.total_emails, 0);
        assert_eq!(snap.results, CategoryTotals::default());
        assert_ne!(snap.batch_status(), BatchStatus::Completed);
        assert_eq!(snap.batch_status(), BatchStatus::Running);
    }

    #[test]
    fn test_status_snapshot_full() {
        let snap: StatusSnapshot = serde_json::from_str(
            r#"{"job_id":"J1","status":"completed","total_emails":4,"verified_emails":4,
                "results":{"valid":2,"invalid":1,"risky":0,"custom":1},
                "timestamp":"2026-03-04T10:11:12"}"#,
        )
        .unwrap();
        assert_eq!(snap.batch_status(), BatchStatus::Completed);
        assert_eq!(snap.results.risky_bucket(), 1);
        let at = snap.observed_at().unwrap();
        assert_eq!((at.month(), at.day(), at.hour()), (3, 4, 10));
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        assert!(parse_timestamp("2026-03-04T10:11:12Z").is_some());
        assert!(parse_timestamp("2026-03-04T10:11:12.123456").is_some());
        assert!(parse_timestamp("2026-03-04 10:11:12").is_some());
        assert_eq!(parse_timestamp("2026-03-04").unwrap().year(), 2026);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_batch_details_emails_are_ordered() {
        let details: BatchDetails = serde_json::from_str(
            r#"{"job_id":"J1","status":"completed","total_emails":2,"verified_emails":2,
                "results":{"valid":1,"invalid":1,"risky":0},
                "email_results":{
                    "z@y.com":{"email":"z@y.com","category":"invalid","provider":"y"},
                    "a@y.com":{"email":"a@y.com","category":"valid","provider":"y"}}}"#,
        )
        .unwrap();
        let emails: Vec<_> = details.emails().iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["a@y.com", "z@y.com"]);
    }

    #[test]
    fn test_category_stats_rate() {
        let stats: CategoryStats = serde_json::from_str(
            r#"{"categories":{"valid":2,"invalid":1,"risky":0,"total":3},"timestamp":"t"}"#,
        )
        .unwrap();
        assert_eq!(stats.verification_rate(), 66.7);
    }

    #[test]
    fn test_batch_request_serialization() {
        let json = serde_json::to_string(&BatchRequest {
            emails: vec!["a@b.com".to_string()],
        })
        .unwrap();
        assert_eq!(json, r#"{"emails":["a@b.com"]}"#);
    }
}
