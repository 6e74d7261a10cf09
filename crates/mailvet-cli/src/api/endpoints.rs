//! API endpoint URL builders
//!
//! Every route lives under `{base_url}/api`. Batch identifiers are
//! percent-encoded before they are placed in a path.

use mailvet_common::ExportCategory;

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Single address verification
pub fn verify_email_url(base_url: &str) -> String {
    format!("{}/api/verify/email", base_url)
}

/// Streaming batch submission
pub fn verify_batch_url(base_url: &str) -> String {
    format!("{}/api/verify/batch", base_url)
}

/// Point-in-time batch status
pub fn status_url(base_url: &str, job_id: &str) -> String {
    format!("{}/api/verify/status/{}", base_url, segment(job_id))
}

/// All known batch identifiers
pub fn batches_url(base_url: &str) -> String {
    format!("{}/api/results/batches", base_url)
}

/// Full per-email results of one batch
pub fn batch_results_url(base_url: &str, batch_id: &str) -> String {
    format!("{}/api/results/batch/{}", base_url, segment(batch_id))
}

/// Downloadable export of one batch
pub fn export_url(base_url: &str, batch_id: &str, category: ExportCategory) -> String {
    format!(
        "{}/api/results/export/{}/{}",
        base_url,
        segment(batch_id),
        category.as_str()
    )
}

/// Lifetime statistics by category
pub fn category_stats_url(base_url: &str) -> String {
    format!("{}/api/statistics/category", base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:5000";

    #[test]
    fn test_verify_urls() {
        assert_eq!(verify_email_url(BASE), "http://localhost:5000/api/verify/email");
        assert_eq!(verify_batch_url(BASE), "http://localhost:5000/api/verify/batch");
    }

    #[test]
    fn test_status_url_encodes_job_id() {
        assert_eq!(
            status_url(BASE, "job-42"),
            "http://localhost:5000/api/verify/status/job-42"
        );
        assert_eq!(
            status_url(BASE, "a/b c"),
            "http://localhost:5000/api/verify/status/a%2Fb%20c"
        );
    }

    #[test]
    fn test_results_urls() {
        assert_eq!(batches_url(BASE), "http://localhost:5000/api/results/batches");
        assert_eq!(
            batch_results_url(BASE, "J1"),
            "http://localhost:5000/api/results/batch/J1"
        );
    }

    #[test]
    fn test_export_url_defaults_to_all() {
        assert_eq!(
            export_url(BASE, "J1", ExportCategory::default()),
            "http://localhost:5000/api/results/export/J1/all"
        );
        assert_eq!(
            export_url(BASE, "J1", ExportCategory::Risky),
            "http://localhost:5000/api/results/export/J1/risky"
        );
    }

    #[test]
    fn test_category_stats_url() {
        assert_eq!(
            category_stats_url(BASE),
            "http://localhost:5000/api/statistics/category"
        );
    }
}
