//! Domain types shared by every mailvet component
//!
//! The remote verification service labels each address with a
//! [`Category`]; the engine only ever aggregates those labels into three
//! buckets (valid, invalid, risky).

use crate::error::VerifierError;
use serde::{Deserialize, Serialize};

/// Verification outcome label for one email, as assigned upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Valid,
    Invalid,
    Risky,
    Custom,
}

impl Category {
    /// The aggregate bucket this label is counted in.
    ///
    /// `Custom` results are counted as risky so that
    /// `processed == valid + invalid + risky` always holds.
    pub fn bucket(self) -> Category {
        match self {
            Category::Custom => Category::Risky,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Valid => "valid",
            Category::Invalid => "invalid",
            Category::Risky => "risky",
            Category::Custom => "custom",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Category::Valid),
            "invalid" => Ok(Category::Invalid),
            "risky" => Ok(Category::Risky),
            "custom" => Ok(Category::Custom),
            other => Err(VerifierError::InvalidCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export filter accepted by the results export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportCategory {
    #[default]
    All,
    Valid,
    Invalid,
    Risky,
}

impl ExportCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportCategory::All => "all",
            ExportCategory::Valid => "valid",
            ExportCategory::Invalid => "invalid",
            ExportCategory::Risky => "risky",
        }
    }
}

impl std::str::FromStr for ExportCategory {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ExportCategory::All),
            "valid" => Ok(ExportCategory::Valid),
            "invalid" => Ok(ExportCategory::Invalid),
            "risky" => Ok(ExportCategory::Risky),
            other => Err(VerifierError::InvalidCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category counts as reported by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    #[serde(default)]
    pub valid: u64,
    #[serde(default)]
    pub invalid: u64,
    #[serde(default)]
    pub risky: u64,
    #[serde(default)]
    pub custom: u64,
}

impl CategoryTotals {
    pub fn new(valid: u64, invalid: u64, risky: u64) -> Self {
        Self {
            valid,
            invalid,
            risky,
            custom: 0,
        }
    }

    /// Risky count with custom results folded in
    pub fn risky_bucket(&self) -> u64 {
        self.risky.saturating_add(self.custom)
    }

    /// Sum of all buckets
    pub fn processed(&self) -> u64 {
        self.valid
            .saturating_add(self.invalid)
            .saturating_add(self.risky_bucket())
    }
}

/// Lifecycle status of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Map a status string reported by the service.
    ///
    /// Anything that is not explicitly pending, completed or failed is
    /// treated as still running.
    pub fn from_remote(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "pending" | "queued" => BatchStatus::Pending,
            "completed" => BatchStatus::Completed,
            "failed" | "error" => BatchStatus::Failed,
            _ => BatchStatus::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            BatchStatus::Pending => 0,
            BatchStatus::Running => 1,
            BatchStatus::Completed | BatchStatus::Failed => 2,
        }
    }

    /// Status only ever moves forward; terminal states are final.
    pub fn can_advance_to(self, next: BatchStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Share of `part` in `total` as a percentage rounded to one decimal.
///
/// Returns `0.0` when `total` is zero.
pub fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = part as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Whole-number progress percentage clamped to `[0, 100]`.
///
/// Returns `0` when `total` is zero.
pub fn progress_percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
