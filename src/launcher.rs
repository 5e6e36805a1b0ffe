//! Resource-limited process launcher.
//!
//! This is the lowest layer of the judge: it spawns a child process with hard
//! POSIX rlimit ceilings (CPU time, address space, file size) installed
//! between fork and exec, plus a wall-clock alarm as a redundant timeout for
//! children that sleep instead of burning CPU. The child's standard streams
//! can be redirected to files.
//!
//! The launcher is deliberately not a security sandbox: untrusted code runs
//! with the judge's own privileges apart from the resource ceilings. The
//! [`Launcher`] trait is the seam where a stronger backend (namespaces,
//! cgroups, seccomp) can be substituted without touching the pipeline above.

use std::fs::File;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::sys::resource::{setrlimit, Resource};
use nix::unistd::alarm;
use thiserror::Error;

/// Hard resource ceilings installed on a child before it executes.
///
/// A configuration value, fixed per invocation: the compile budget differs
/// from the per-test-case run budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudget {
    /// CPU-time ceiling in seconds (`RLIMIT_CPU`), also the alarm interval.
    pub cpu_seconds: u64,
    /// Address-space ceiling in bytes (`RLIMIT_AS`).
    pub memory_bytes: u64,
    /// Largest file the child may create, in bytes (`RLIMIT_FSIZE`).
    pub file_size_bytes: u64,
}

impl ResourceBudget {
    pub fn cpu_millis(&self) -> u64 {
        self.cpu_seconds * 1000
    }
}

/// Program, arguments and working directory for a launch.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

/// Stdio redirection targets for a launched child.
///
/// A stream without a target is bound to `/dev/null`, never inherited: the
/// judge's own stdio must not leak into (or be polluted by) submitted code.
#[derive(Debug, Clone, Default)]
pub struct StreamSpec {
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

impl StreamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdin(mut self, path: impl AsRef<Path>) -> Self {
        self.stdin = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_stdout(mut self, path: impl AsRef<Path>) -> Self {
        self.stdout = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_stderr(mut self, path: impl AsRef<Path>) -> Self {
        self.stderr = Some(path.as_ref().to_path_buf());
        self
    }
}

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Normal exit with the given status code.
    Exited(i32),
    /// Killed by the given signal (resource-ceiling kills arrive here as
    /// SIGXCPU, SIGALRM or SIGXFSZ).
    Signaled(i32),
}

/// Everything the parent learns from `wait4(2)` about a finished child.
#[derive(Debug, Clone, Copy)]
pub struct ExitOutcome {
    pub status: ProcessStatus,
    /// User + system CPU time in milliseconds.
    pub cpu_time_ms: u64,
    /// Peak resident set size in kilobytes.
    pub max_rss_kb: u64,
}

/// Failure of the launcher itself, as opposed to failure of the launched
/// program. Always an infrastructure problem for the caller, never a
/// statement about the submission.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {path:?} for redirection: {source}")]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Capability to run a program to completion under a resource budget.
pub trait Launcher: Send + Sync {
    /// Launch `cmd` with `streams` redirected and `budget` enforced,
    /// blocking until the child terminates.
    fn launch(
        &self,
        cmd: &CommandSpec,
        streams: &StreamSpec,
        budget: ResourceBudget,
    ) -> Result<ExitOutcome, LaunchError>;
}

/// The default [`Launcher`]: plain fork/exec with rlimit ceilings.
#[derive(Debug, Default)]
pub struct RlimitLauncher;

impl Launcher for RlimitLauncher {
    fn launch(
        &self,
        cmd: &CommandSpec,
        streams: &StreamSpec,
        budget: ResourceBudget,
    ) -> Result<ExitOutcome, LaunchError> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }

        command.stdin(match &streams.stdin {
            Some(path) => open_for_reading(path)?,
            None => Stdio::null(),
        });
        command.stdout(match &streams.stdout {
            Some(path) => create_for_writing(path)?,
            None => Stdio::null(),
        });
        command.stderr(match &streams.stderr {
            Some(path) => create_for_writing(path)?,
            None => Stdio::null(),
        });

        // Safety: the hook only makes async-signal-safe syscalls (setrlimit,
        // alarm) and allocates nothing.
        unsafe {
            command.pre_exec(move || install_child_limits(budget));
        }

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

        wait_with_usage(child.id())
    }
}

/// Runs in the child between fork and exec.
fn install_child_limits(budget: ResourceBudget) -> io::Result<()> {
    set_limit(Resource::RLIMIT_CPU, budget.cpu_seconds)?;
    set_limit(Resource::RLIMIT_AS, budget.memory_bytes)?;
    set_limit(Resource::RLIMIT_FSIZE, budget.file_size_bytes)?;

    // Wall-clock backstop, same interval as the CPU ceiling. The alarm
    // survives exec, so a sleeping child is torn down by SIGALRM once the
    // budget elapses even though it never trips RLIMIT_CPU.
    let _ = alarm::cancel();
    let _ = alarm::set(budget.cpu_seconds as libc::c_uint);
    Ok(())
}

fn set_limit(resource: Resource, limit: u64) -> io::Result<()> {
    setrlimit(resource, limit, limit).map_err(|e| io::Error::from_raw_os_error(e as i32))
}

fn open_for_reading(path: &Path) -> Result<Stdio, LaunchError> {
    let file = File::open(path).map_err(|source| LaunchError::Redirect {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Stdio::from(file))
}

fn create_for_writing(path: &Path) -> Result<Stdio, LaunchError> {
    let file = File::create(path).map_err(|source| LaunchError::Redirect {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Stdio::from(file))
}

/// Reap the child with `wait4(2)` so we get rusage along with the status.
fn wait_with_usage(pid: u32) -> Result<ExitOutcome, LaunchError> {
    let mut status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    // Safety: wait4 only writes through the two out-pointers we hand it.
    let rc = unsafe { libc::wait4(pid as libc::pid_t, &mut status, 0, &mut usage) };
    if rc < 0 {
        return Err(LaunchError::Wait {
            pid,
            source: io::Error::last_os_error(),
        });
    }

    let process = if libc::WIFEXITED(status) {
        ProcessStatus::Exited(libc::WEXITSTATUS(status))
    } else {
        ProcessStatus::Signaled(libc::WTERMSIG(status))
    };

    let cpu_time_ms = timeval_ms(usage.ru_utime) + timeval_ms(usage.ru_stime);

    Ok(ExitOutcome {
        status: process,
        cpu_time_ms,
        // ru_maxrss is reported in kilobytes on Linux
        max_rss_kb: usage.ru_maxrss as u64,
    })
}

fn timeval_ms(tv: libc::timeval) -> u64 {
    (tv.tv_sec * 1000 + tv.tv_usec / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder() {
        let cmd = CommandSpec::new("g++")
            .with_args(["-o", "main", "main.cpp"])
            .with_work_dir("/tmp/judge");
        assert_eq!(cmd.program, "g++");
        assert_eq!(cmd.args, vec!["-o", "main", "main.cpp"]);
        assert_eq!(cmd.work_dir.as_deref(), Some(Path::new("/tmp/judge")));
    }

    #[test]
    fn test_stream_spec_defaults_to_null_streams() {
        let streams = StreamSpec::new();
        assert!(streams.stdin.is_none());
        assert!(streams.stdout.is_none());
        assert!(streams.stderr.is_none());
    }

    #[test]
    fn test_budget_cpu_millis() {
        let budget = ResourceBudget {
            cpu_seconds: 6,
            memory_bytes: 128 << 20,
            file_size_bytes: 10 << 20,
        };
        assert_eq!(budget.cpu_millis(), 6000);
    }
}
