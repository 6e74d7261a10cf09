//! Typed verification events
//!
//! The producer does not tag its records. A batch record carries `job_id`
//! and a `status`; a per-address result carries `email`. [`classify`]
//! maps every line onto exactly one [`VerificationEvent`] or rejects it
//! as [`Malformed`]. Shapes it does not recognise are never half-bound.

use mailvet_common::{Category, CategoryTotals};
use serde::Deserialize;
use thiserror::Error;

/// One decoded event of a batch stream
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationEvent {
    /// The producer assigned the batch identifier
    Started { batch_id: String },

    /// Outcome for one address
    Result(ResultRecord),

    /// Final authoritative totals
    Completed {
        batch_id: String,
        totals: Option<FinalTotals>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub email: String,
    pub category: Category,
    pub provider: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalTotals {
    pub results: CategoryTotals,
    pub total_emails: Option<u64>,
}

/// Why a line was dropped
#[derive(Debug, Error)]
pub enum Malformed {
    #[error("invalid JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch record with unsupported status '{0}'")]
    UnknownStatus(String),

    #[error("result record with unknown category '{0}'")]
    UnknownCategory(String),

    #[error("result record without a category")]
    MissingCategory,

    #[error("record has neither job_id nor email")]
    Unrecognised,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    results: Option<CategoryTotals>,
    #[serde(default)]
    total_emails: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Classify one decoded line
pub fn classify(line: &str) -> Result<VerificationEvent, Malformed> {
    let record: WireRecord = serde_json::from_str(line)?;

    if let Some(batch_id) = non_empty(record.job_id) {
        let status = record.status.unwrap_or_default();
        return match status.as_str() {
            "started" => Ok(VerificationEvent::Started { batch_id }),
            "completed" => Ok(VerificationEvent::Completed {
                batch_id,
                totals: record.results.map(|results| FinalTotals {
                    results,
                    total_emails: record.total_emails,
                }),
            }),
            _ => Err(Malformed::UnknownStatus(status)),
        };
    }

    if let Some(email) = non_empty(record.email) {
        let raw = record.category.ok_or(Malformed::MissingCategory)?;
        let category = raw
            .parse::<Category>()
            .map_err(|_| Malformed::UnknownCategory(raw))?;

        return Ok(VerificationEvent::Result(ResultRecord {
            email,
            category,
            provider: record.provider,
            timestamp: record.timestamp,
        }));
    }

    Err(Malformed::Unrecognised)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_started() {
        assert_eq!(
            classify(r#"{"job_id":"J1","status":"started"}"#).unwrap(),
            VerificationEvent::Started {
                batch_id: "J1".to_string()
            }
        );
    }

    #[test]
    fn test_completed_with_totals() {
        let event = classify(
            r#"{"job_id":"J1","status":"completed","results":{"valid":1,"invalid":1,"risky":0},"total_emails":2}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            VerificationEvent::Completed {
                batch_id: "J1".to_string(),
                totals: Some(FinalTotals {
                    results: CategoryTotals::new(1, 1, 0),
                    total_emails: Some(2),
                }),
            }
        );
    }

    #[test]
    fn test_completed_without_totals() {
        let event = classify(r#"{"job_id":"J1","status":"completed"}"#).unwrap();
        assert!(matches!(event, VerificationEvent::Completed { totals: None, .. }));
    }

    #[test]
    fn test_result_record() {
        let event = classify(
            r#"{"email":"x@y.com","category":"custom","provider":"y.com","timestamp":"2026-10-19T10:00:00"}"#,
        )
        .unwrap();
        match event {
            VerificationEvent::Result(record) => {
                assert_eq!(record.email, "x@y.com");
                assert_eq!(record.category, Category::Custom);
                assert_eq!(record.provider.as_deref(), Some("y.com"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_job_id_takes_precedence_over_email() {
        let event = classify(r#"{"job_id":"J1","status":"started","email":"x@y.com"}"#).unwrap();
        assert!(matches!(event, VerificationEvent::Started { .. }));
    }

    #[test]
    fn test_malformed_shapes() {
        assert!(matches!(classify("not json"), Err(Malformed::Json(_))));
        assert!(matches!(classify("[1,2]"), Err(Malformed::Json(_))));
        assert!(matches!(classify("{}"), Err(Malformed::Unrecognised)));
        assert!(matches!(
            classify(r#"{"job_id":"J1","status":"running"}"#),
            Err(Malformed::UnknownStatus(s)) if s == "running"
        ));
        assert!(matches!(
            classify(r#"{"job_id":"J1"}"#),
            Err(Malformed::UnknownStatus(_))
        ));
        assert!(matches!(
            classify(r#"{"email":"x@y.com"}"#),
            Err(Malformed::MissingCategory)
        ));
        assert!(matches!(
            classify(r#"{"email":"x@y.com","category":"maybe"}"#),
            Err(Malformed::UnknownCategory(c)) if c == "maybe"
        ));
        assert!(matches!(
            classify(r#"{"email":"","category":"valid"}"#),
            Err(Malformed::Unrecognised)
        ));
    }

    #[test]
    fn test_wrongly_typed_field_fails_closed() {
        assert!(matches!(
            classify(r#"{"job_id":"J1","status":"completed","results":{"valid":"one"}}"#),
            Err(Malformed::Json(_))
        ));
    }
}
