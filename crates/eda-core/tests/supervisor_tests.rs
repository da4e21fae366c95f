#![cfg(target_os = "linux")]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use eda_core::{CancellationToken, NodeError, ProcessSupervisor, RunDir, SupervisorConfig, ToolInvocation};

fn supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(SupervisorConfig { grace_period: Duration::from_millis(300),
                                              echo_output: false,
                                              ..Default::default() })
}

/// Un proceso terminado puede quedar como zombie si nadie lo cosecha
/// (p.ej. en contenedores sin init); lo contamos como muerto.
fn is_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            let state = stat.rsplit(')').next().and_then(|rest| rest.split_whitespace().next());
            !matches!(state, Some("Z") | Some("X"))
        }
        Err(_) => false,
    }
}

fn wait_dead(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn read_pid(dir: &Path) -> u32 {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(text) = fs::read_to_string(dir.join("helper.pid")) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        assert!(Instant::now() < deadline, "helper.pid never appeared");
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn run_dir() -> (tempfile::TempDir, RunDir) {
    let tmp = tempfile::tempdir().unwrap();
    let rd = RunDir::new(tmp.path().join("run"));
    rd.prepare().unwrap();
    (tmp, rd)
}

#[test]
fn cancel_kills_the_whole_process_tree() {
    let (_tmp, rd) = run_dir();
    let inv = ToolInvocation::new("sh").arg("tool.sh")
                                       .script("tool.sh", "sleep 60 &\necho $! > helper.pid\nsleep 60\n");
    let cancel = CancellationToken::new();
    let result = std::thread::scope(|s| {
        let c = cancel.clone();
        let dir = rd.path().to_path_buf();
        let watcher = s.spawn(move || {
                           let pid = read_pid(&dir);
                           c.cancel();
                           pid
                       });
        let res = supervisor().run(&rd, &inv, None, &cancel, |_| {});
        (res, watcher.join().unwrap())
    });
    let (res, helper) = result;
    assert_eq!(res.unwrap_err(), NodeError::Cancelled);
    assert!(wait_dead(helper), "helper {helper} survived cancellation");
}

#[test]
fn helpers_outliving_the_leader_are_swept() {
    let (_tmp, rd) = run_dir();
    let inv = ToolInvocation::new("sh").arg("tool.sh")
                                       .script("tool.sh", "sleep 60 &\necho $! > helper.pid\nexit 0\n");
    let out = supervisor().run(&rd, &inv, None, &CancellationToken::new(), |_| {}).unwrap();
    assert!(out.success());
    let helper = read_pid(rd.path());
    assert!(wait_dead(helper), "helper {helper} survived the leader");
}

#[test]
fn timeout_terminates_descendants_and_reports_it() {
    let (_tmp, rd) = run_dir();
    let inv = ToolInvocation::new("sh").arg("tool.sh")
                                       .script("tool.sh", "trap '' TERM\nsleep 60 &\necho $! > helper.pid\nwait\n");
    let started = Instant::now();
    let res = supervisor().run(&rd, &inv, Some(Duration::from_secs(1)), &CancellationToken::new(), |_| {});
    assert_eq!(res.unwrap_err(), NodeError::Timeout { seconds: 1 });
    // SIGTERM se ignora: hace falta el SIGKILL tras la gracia
    assert!(started.elapsed() >= Duration::from_secs(1));
    let helper = read_pid(rd.path());
    assert!(wait_dead(helper));
}

#[test]
fn on_spawn_receives_the_leader_pid() {
    let (_tmp, rd) = run_dir();
    let inv = ToolInvocation::new("sh").arg("-c").arg("echo $$ > leader.pid");
    let mut seen = None;
    let out = supervisor().run(&rd, &inv, None, &CancellationToken::new(), |pid| seen = Some(pid)).unwrap();
    let written: u32 = fs::read_to_string(rd.path().join("leader.pid")).unwrap().trim().parse().unwrap();
    assert_eq!(seen, Some(out.pid));
    assert_eq!(written, out.pid);
}
