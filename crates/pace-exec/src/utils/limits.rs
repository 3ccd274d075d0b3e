//! POSIX rlimits for isolated worker processes.
//!
//! A worker that leaks descriptors or writes runaway files should hit a wall
//! inside its own process, not exhaust the host. On Unix the limits are set in
//! a `pre_exec` hook, after `fork()` and before `execve()`, so the worker never
//! runs unrestricted. Elsewhere a non-empty config is logged and ignored.
use tokio::process::Command;
use tracing::warn;

/// Declarative rlimits for a worker. `None` keeps the inherited limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,
    /// `RLIMIT_FSIZE`, in bytes. Exceeding it delivers `SIGXFSZ`.
    pub max_file_size_bytes: Option<u64>,
    /// `RLIMIT_CORE = 0` when set.
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_open_files.is_none()
            && !self.disable_core_dumps
            && self.max_file_size_bytes.is_none()
    }
}

/// Attaches `config` to `cmd`; a no-op for an empty config.
pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, *config);
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "pace.exec.limits",
            ?config,
            "rlimits requested on a non-Unix OS; ignoring"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub fn attach_rlimits(cmd: &mut Command, config: RlimitConfig) {
        // SAFETY: the hook only calls `setrlimit`, which is async-signal-safe,
        // and allocates nothing between fork and exec.
        unsafe {
            cmd.pre_exec(move || {
                if let Some(nofile) = config.max_open_files {
                    apply_rlimit(libc::RLIMIT_NOFILE, nofile)?;
                }
                if let Some(fsize) = config.max_file_size_bytes {
                    apply_rlimit(libc::RLIMIT_FSIZE, fsize)?;
                }
                if config.disable_core_dumps {
                    apply_rlimit(libc::RLIMIT_CORE, 0)?;
                }
                Ok(())
            });
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    type Resource = libc::__rlimit_resource_t;
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    type Resource = libc::c_int;

    fn apply_rlimit(resource: Resource, value: u64) -> io::Result<()> {
        let rlim = libc::rlimit {
            rlim_cur: value as libc::rlim_t,
            rlim_max: value as libc::rlim_t,
        };

        let rc = unsafe { libc::setrlimit(resource, &rlim) };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_empty() {
        let config = RlimitConfig::default();
        assert!(config.is_empty());
        attach_rlimits(&mut Command::new("true"), &config);
    }

    #[test]
    fn any_limit_makes_config_non_empty() {
        assert!(
            !RlimitConfig {
                disable_core_dumps: true,
                ..Default::default()
            }
            .is_empty()
        );
        assert!(
            !RlimitConfig {
                max_open_files: Some(64),
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn limits_are_visible_inside_the_child() {
        let config = RlimitConfig {
            max_open_files: Some(64),
            max_file_size_bytes: None,
            disable_core_dumps: true,
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("ulimit -n; ulimit -c");
        attach_rlimits(&mut cmd, &config);

        let out = cmd.output().await.unwrap();
        assert!(out.status.success());
        let text = String::from_utf8_lossy(&out.stdout);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["64", "0"]);
    }
}
