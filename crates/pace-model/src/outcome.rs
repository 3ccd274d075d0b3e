use serde::{Deserialize, Serialize};

use crate::report::CrawlReport;

const UNKNOWN_ERROR: &str = "Unknown error";
const MIB: f64 = 1024.0 * 1024.0;

/// Normalised result of one task execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub target: String,
    pub pages_crawled: u64,
    pub files_uploaded: u64,
    pub files_skipped: u64,
    pub bytes_uploaded: u64,
    pub bucket: String,
    pub prefixes: Vec<String>,
    pub error: Option<String>,
    pub local_files_removed: Option<bool>,
}

impl RunOutcome {
    /// Builds an outcome from a collaborator report.
    ///
    /// The report's bucket wins over the configured one when present; a failed
    /// report without an error message is given a generic one so the summary
    /// never prints an empty error.
    pub fn from_report(target: &str, bucket: &str, report: CrawlReport) -> Self {
        let error = if report.success {
            None
        } else {
            Some(
                report
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            )
        };

        Self {
            success: report.success,
            target: target.to_string(),
            pages_crawled: report.pages_crawled,
            files_uploaded: report.files_uploaded,
            files_skipped: report.files_skipped,
            bytes_uploaded: report.bytes_uploaded,
            bucket: report.bucket.unwrap_or_else(|| bucket.to_string()),
            prefixes: report.s3_prefixes,
            error,
            local_files_removed: report.local_files_removed,
        }
    }

    /// Uploaded volume in MiB.
    #[inline]
    pub fn megabytes_uploaded(&self) -> f64 {
        self.bytes_uploaded as f64 / MIB
    }

    /// Human-readable summary, one entry per printed line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Crawl and upload summary:".to_string(),
            format!("Crawled {} pages from {}", self.pages_crawled, self.target),
        ];

        if self.success {
            lines.push(format!(
                "Uploaded {} files ({:.2} MB)",
                self.files_uploaded,
                self.megabytes_uploaded()
            ));
            lines.push(format!("Skipped {} existing files", self.files_skipped));
            lines.push(format!(
                "Files stored in bucket: {} with prefixes:",
                self.bucket
            ));
            lines.extend(self.prefixes.iter().map(|p| format!("  - {p}")));
            if self.local_files_removed == Some(true) {
                lines.push("Local files have been removed.".to_string());
            }
        } else {
            lines.push(format!(
                "Error: {}",
                self.error.as_deref().unwrap_or(UNKNOWN_ERROR)
            ));
        }
        lines
    }
}
