//! Launcher integration tests against real child processes.

use std::time::{Duration, Instant};

use arbiter_judge::launcher::{
    CommandSpec, LaunchError, Launcher, ProcessStatus, ResourceBudget, RlimitLauncher, StreamSpec,
};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("/bin/sh").with_args(["-c", script])
}

fn budget() -> ResourceBudget {
    ResourceBudget {
        cpu_seconds: 2,
        memory_bytes: 256 << 20,
        file_size_bytes: 1 << 20,
    }
}

#[test]
fn reports_exit_codes() {
    let outcome = RlimitLauncher
        .launch(&sh("exit 7"), &StreamSpec::new(), budget())
        .unwrap();
    assert_eq!(outcome.status, ProcessStatus::Exited(7));
}

#[test]
fn redirects_stdout_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("user.out");

    let outcome = RlimitLauncher
        .launch(
            &sh("echo hello"),
            &StreamSpec::new().with_stdout(&out),
            budget(),
        )
        .unwrap();

    assert_eq!(outcome.status, ProcessStatus::Exited(0));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
}

#[test]
fn feeds_stdin_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.in");
    let out = dir.path().join("user.out");
    std::fs::write(&input, "ping\n").unwrap();

    let outcome = RlimitLauncher
        .launch(
            &sh("cat"),
            &StreamSpec::new().with_stdin(&input).with_stdout(&out),
            budget(),
        )
        .unwrap();

    assert_eq!(outcome.status, ProcessStatus::Exited(0));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "ping\n");
}

#[test]
fn spawn_failure_is_a_distinct_error() {
    let cmd = CommandSpec::new("/no/such/binary");
    let err = RlimitLauncher
        .launch(&cmd, &StreamSpec::new(), budget())
        .unwrap_err();
    assert!(matches!(err, LaunchError::Spawn { .. }));
}

#[test]
fn busy_loop_is_killed_by_the_cpu_ceiling() {
    let tight = ResourceBudget {
        cpu_seconds: 1,
        ..budget()
    };

    let started = Instant::now();
    let outcome = RlimitLauncher
        .launch(&sh("while :; do :; done"), &StreamSpec::new(), tight)
        .unwrap();
    let elapsed = started.elapsed();

    // SIGXCPU from the rlimit, or SIGALRM if the wall-clock backstop wins
    // the race; SIGKILL if the kernel escalated past the soft limit.
    match outcome.status {
        ProcessStatus::Signaled(sig) => assert!(
            sig == libc::SIGXCPU || sig == libc::SIGALRM || sig == libc::SIGKILL,
            "unexpected signal {}",
            sig
        ),
        other => panic!("busy loop was not killed: {:?}", other),
    }
    assert!(
        elapsed < Duration::from_secs(5),
        "kill took {:?}, expected budget + small overhead",
        elapsed
    );
}

#[test]
fn sleeping_child_is_killed_by_the_alarm_backstop() {
    let tight = ResourceBudget {
        cpu_seconds: 1,
        ..budget()
    };

    let started = Instant::now();
    let outcome = RlimitLauncher
        .launch(&sh("sleep 30"), &StreamSpec::new(), tight)
        .unwrap();
    let elapsed = started.elapsed();

    // A sleeping process never trips RLIMIT_CPU; only the alarm fires.
    assert_eq!(outcome.status, ProcessStatus::Signaled(libc::SIGALRM));
    assert!(
        elapsed < Duration::from_secs(10),
        "alarm kill took {:?}",
        elapsed
    );
}

#[test]
fn runaway_output_is_killed_by_the_file_size_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("user.out");
    let tiny = ResourceBudget {
        file_size_bytes: 8 * 1024,
        ..budget()
    };

    let outcome = RlimitLauncher
        .launch(
            &sh("while :; do echo aaaaaaaaaaaaaaaa; done"),
            &StreamSpec::new().with_stdout(&out),
            tiny,
        )
        .unwrap();

    assert_eq!(outcome.status, ProcessStatus::Signaled(libc::SIGXFSZ));
    let written = std::fs::metadata(&out).unwrap().len();
    assert!(written <= 8 * 1024, "wrote {} bytes past the ceiling", written);
}

#[test]
fn measures_cpu_time_and_memory() {
    let outcome = RlimitLauncher
        .launch(&sh("true"), &StreamSpec::new(), budget())
        .unwrap();
    assert_eq!(outcome.status, ProcessStatus::Exited(0));
    // A trivial child still reports a plausible footprint.
    assert!(outcome.cpu_time_ms < 2_000);
    assert!(outcome.max_rss_kb > 0);
}
