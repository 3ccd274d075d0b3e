//! End-to-end runs of the real binary against an `sh` collaborator.

use std::process::{Command as StdCommand, Output, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;

const TARGET: &str = "https://example.com";

fn pace(collaborator: &str) -> Command {
    let mut cmd = Command::cargo_bin("pace-agentd").expect("binary");
    cmd.env_remove("PACE_TARGET")
        .env_remove("PACE_BUCKET")
        .env_remove("PACE_TASK_COMMAND")
        .args(["--target", TARGET, "--bucket", "test-bucket"])
        .args(["--task-command", "sh", "--task-arg", "-c", "--task-arg", collaborator])
        .args(["--task-arg", "crawl"]);
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

const SUCCESS_REPORT: &str = r#"echo 'crawling...'; echo '{"success":true,"pages_crawled":10,"files_uploaded":8,"files_skipped":2,"bytes_uploaded":2097152,"s3_prefixes":["example.com/"]}'"#;
const FAILURE_REPORT: &str = r#"echo '{"success":false,"error":"network timeout"}'"#;

#[test]
fn once_success_prints_summary_and_exits_zero() {
    let out = pace(SUCCESS_REPORT).arg("--once").output().expect("run");

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let text = stdout(&out);
    assert!(text.contains("crawling..."));
    assert!(text.contains("Crawl and upload summary:"));
    assert!(text.contains(&format!("Crawled 10 pages from {TARGET}")));
    assert!(text.contains("Uploaded 8 files (2.00 MB)"));
    assert!(text.contains("Skipped 2 existing files"));
    assert!(text.contains("Files stored in bucket: test-bucket with prefixes:"));
    assert!(text.contains("  - example.com/"));
    assert!(!text.contains("Error:"));
}

#[test]
fn once_failure_reports_error_and_exits_non_zero() {
    let out = pace(FAILURE_REPORT).arg("--once").output().expect("run");

    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("Error: network timeout"));
    assert!(!text.contains("Uploaded"));
}

#[test]
fn collaborator_without_report_fails_the_run() {
    let out = pace("exit 3").arg("--once").output().expect("run");

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("Error: non-zero exit code: 3"));
}

#[test]
fn collaborator_receives_request_flags() {
    let script = r#"echo "args: $*"; echo '{"success":true}'"#;
    let out = pace(script)
        .args(["--once", "--max-pages", "7", "--max-depth", "2", "--keep-local-files"])
        .output()
        .expect("run");

    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains(&format!(
        "args: --url {TARGET} --max-pages 7 --max-depth 2 --bucket test-bucket --keep-local-files"
    )));
}

#[test]
fn invalid_config_exits_with_code_two() {
    let out = pace(SUCCESS_REPORT)
        .args(["--once", "--max-pages", "0"])
        .output()
        .expect("run");
    assert_eq!(out.status.code(), Some(2));
    assert!(!stdout(&out).contains("Crawled"));

    let out = pace(SUCCESS_REPORT).args(["--wait-secs", "0"]).output().expect("run");
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_required_flag_is_a_usage_error() {
    Command::cargo_bin("pace-agentd")
        .expect("binary")
        .env_remove("PACE_TARGET")
        .env_remove("PACE_BUCKET")
        .env_remove("PACE_TASK_COMMAND")
        .args(["--bucket", "b", "--task-command", "true", "--once"])
        .assert()
        .code(2);
}

#[test]
fn target_can_come_from_the_environment() {
    let out = Command::cargo_bin("pace-agentd")
        .expect("binary")
        .env("PACE_TARGET", TARGET)
        .env("PACE_BUCKET", "env-bucket")
        .env("PACE_TASK_COMMAND", "sh")
        .args(["--task-arg", "-c", "--task-arg", FAILURE_REPORT, "--task-arg", "crawl", "--once"])
        .output()
        .expect("run");

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains(&format!("Crawled 0 pages from {TARGET}")));
}

#[test]
fn malformed_worker_payload_exits_with_code_two() {
    Command::cargo_bin("pace-agentd")
        .expect("binary")
        .args(["worker", "--payload", "not json"])
        .assert()
        .code(2);

    let payload = serde_json::json!({
        "run": { "target": TARGET, "max_pages": 10, "max_depth": 1, "remove_local_files": true,
                 "bucket": "b", "repeat": false, "wait_interval_secs": 60 },
        "task": { "program": "", "args": [] }
    });
    Command::cargo_bin("pace-agentd")
        .expect("binary")
        .args(["worker", "--payload", &payload.to_string()])
        .assert()
        .code(2);
}

#[cfg(unix)]
mod signals {
    use super::*;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::io::Read;

    fn spawn(collaborator: &str, extra: &[&str]) -> std::process::Child {
        StdCommand::new(env!("CARGO_BIN_EXE_pace-agentd"))
            .env_remove("PACE_TARGET")
            .env_remove("PACE_BUCKET")
            .env_remove("PACE_TASK_COMMAND")
            .args(["--target", TARGET, "--bucket", "test-bucket"])
            .args(["--task-command", "sh", "--task-arg", "-c", "--task-arg", collaborator])
            .args(["--task-arg", "crawl"])
            .args(extra)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn supervisor")
    }

    fn wait_with_deadline(child: &mut std::process::Child, limit: Duration) -> std::process::ExitStatus {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait().expect("try_wait") {
                return status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                panic!("supervisor did not exit within {limit:?}");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn read_stdout(child: &mut std::process::Child) -> String {
        let mut text = String::new();
        child
            .stdout
            .take()
            .expect("stdout piped")
            .read_to_string(&mut text)
            .expect("read stdout");
        text
    }

    /// An exited process nobody reaped yet still answers `kill(pid, 0)`.
    fn is_gone(pid: i32) -> bool {
        if kill(Pid::from_raw(pid), None::<Signal>).is_err() {
            return true;
        }
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[test]
    fn stop_during_wait_ends_promptly_after_one_run() {
        let mut child = spawn(SUCCESS_REPORT, &["--wait-secs", "5"]);
        std::thread::sleep(Duration::from_secs(2));

        let signalled = Instant::now();
        kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).expect("signal");
        let status = wait_with_deadline(&mut child, Duration::from_secs(5));

        assert!(signalled.elapsed() < Duration::from_secs(2));
        assert!(status.success());
        let text = read_stdout(&mut child);
        assert_eq!(text.matches("Crawl and upload summary:").count(), 1);
    }

    #[test]
    fn stop_during_run_terminates_the_whole_worker_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_file = dir.path().join("collaborator.pid");
        let script = format!("echo $$ > {}; sleep 30", pid_file.display());
        let mut child = spawn(&script, &["--once", "--grace-ms", "500"]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !pid_file.exists() {
            assert!(Instant::now() < deadline, "collaborator never started");
            std::thread::sleep(Duration::from_millis(20));
        }
        std::thread::sleep(Duration::from_millis(100));
        let collaborator: i32 = std::fs::read_to_string(&pid_file)
            .expect("pid file")
            .trim()
            .parse()
            .expect("pid");

        kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("signal");
        let status = wait_with_deadline(&mut child, Duration::from_secs(5));
        assert!(status.success(), "interrupted shutdown exits zero");

        let deadline = Instant::now() + Duration::from_secs(3);
        while !is_gone(collaborator) {
            assert!(Instant::now() < deadline, "collaborator survived shutdown");
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!read_stdout(&mut child).contains("Crawl and upload summary:"));
    }

    #[test]
    fn repeated_failures_keep_the_loop_alive() {
        let mut child = spawn(FAILURE_REPORT, &["--wait-secs", "1"]);
        std::thread::sleep(Duration::from_millis(2500));

        kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).expect("signal");
        let status = wait_with_deadline(&mut child, Duration::from_secs(5));

        assert!(status.success());
        let text = read_stdout(&mut child);
        assert!(text.matches("Error: network timeout").count() >= 2);
    }
}
