use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Input of one collaborator call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub target: String,
    pub max_pages: u32,
    pub max_depth: u32,
    pub remove_local_files: bool,
    pub bucket: String,
    pub skip_existing: bool,
    pub force_fresh_crawl: bool,
}

impl From<&RunConfig> for CrawlRequest {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            target: cfg.target.clone(),
            max_pages: cfg.max_pages,
            max_depth: cfg.max_depth,
            remove_local_files: cfg.remove_local_files,
            bucket: cfg.bucket.clone(),
            skip_existing: cfg.skip_existing,
            force_fresh_crawl: cfg.force_fresh_crawl,
        }
    }
}

/// Record returned by the crawl-and-upload collaborator.
///
/// Field names follow the collaborator's output keys. Decoding is lenient:
/// a failed crawl usually carries only `success`, `pages_crawled` and `error`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub success: bool,
    #[serde(default)]
    pub pages_crawled: u64,
    #[serde(default)]
    pub files_uploaded: u64,
    #[serde(default)]
    pub bytes_uploaded: u64,
    #[serde(default)]
    pub files_skipped: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub s3_prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_files_removed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
