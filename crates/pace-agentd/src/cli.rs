use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use pace_exec::utils::limits::RlimitConfig;
use pace_model::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, RunConfig, TaskCommand};
use pace_observe::{LoggerConfig, LoggerFormat};

/// Runs a crawl-and-upload task once or on a fixed interval, each run in its
/// own worker process.
#[derive(Debug, Parser)]
#[command(name = "pace-agentd", version)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executes a single run from an encoded payload. Spawned by the
    /// supervisor; not meant to be called by hand.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// JSON-encoded run configuration and collaborator command.
    #[arg(long, value_name = "JSON")]
    pub payload: String,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Log filter directive, e.g. `info` or `pace_core=debug,warn`.
    #[arg(long, global = true, env = "PACE_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format: text, json or journald.
    #[arg(long, global = true, env = "PACE_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,
}

impl LogArgs {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::new(self.log_format, &self.log_level)
    }

    /// Flags that give a worker the same logging setup.
    pub fn forward(&self) -> [String; 4] {
        [
            "--log-level".to_string(),
            self.log_level.clone(),
            "--log-format".to_string(),
            self.log_format.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Website to crawl.
    #[arg(short = 't', long, env = "PACE_TARGET", required = true)]
    pub target: Option<String>,

    /// Maximum number of pages per run.
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    /// Maximum link depth per run.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: u32,

    /// Keep crawled files on disk after upload.
    #[arg(long)]
    pub keep_local_files: bool,

    /// Destination bucket.
    #[arg(long, env = "PACE_BUCKET", required = true)]
    pub bucket: Option<String>,

    /// Run once and exit instead of repeating.
    #[arg(long)]
    pub once: bool,

    /// Seconds to wait between runs.
    #[arg(long, default_value_t = 3600)]
    pub wait_secs: u64,

    /// Upload files even if they already exist at the destination.
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Reuse previously crawled data instead of starting fresh.
    #[arg(long)]
    pub no_force_fresh: bool,

    /// Program that performs the crawl and upload.
    #[arg(long, env = "PACE_TASK_COMMAND", required = true)]
    pub task_command: Option<String>,

    /// Extra argument for the task program, placed before the request flags.
    #[arg(long = "task-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub task_args: Vec<String>,

    /// Abort a run that takes longer than this.
    #[arg(long)]
    pub run_timeout_secs: Option<u64>,

    /// Time a worker gets between terminate and kill.
    #[arg(long, default_value_t = 1000)]
    pub grace_ms: u64,

    /// RLIMIT_NOFILE for workers.
    #[arg(long)]
    pub max_open_files: Option<u64>,

    /// RLIMIT_FSIZE for workers, in bytes.
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Disable core dumps for workers.
    #[arg(long)]
    pub no_core_dumps: bool,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        let mut cfg = RunConfig::new(
            self.target.clone().unwrap_or_default(),
            self.bucket.clone().unwrap_or_default(),
        )
        .with_bounds(self.max_pages, self.max_depth)
        .with_remove_local_files(!self.keep_local_files);
        cfg.skip_existing = !self.no_skip_existing;
        cfg.force_fresh_crawl = !self.no_force_fresh;
        if !self.once {
            cfg = cfg.with_repeat(Duration::from_secs(self.wait_secs));
        }
        cfg
    }

    pub fn task_command(&self) -> TaskCommand {
        TaskCommand::new(self.task_command.clone().unwrap_or_default())
            .with_args(self.task_args.iter().cloned())
    }

    pub fn limits(&self) -> RlimitConfig {
        RlimitConfig {
            max_open_files: self.max_open_files,
            max_file_size_bytes: self.max_file_size,
            disable_core_dumps: self.no_core_dumps,
        }
    }
}
