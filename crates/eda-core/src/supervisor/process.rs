//! Lanzamiento y supervisión de un proceso de herramienta.
//!
//! - stdout/stderr se copian línea a línea al log del run dir y, si
//!   `echo_output`, al target `edaflow::tool` de `log`.
//! - Timeout o cancelación: SIGTERM al grupo, espera `grace_period`,
//!   SIGKILL al grupo.
//! - Siempre se barre el grupo al final (SIGKILL), también tras una salida
//!   normal del líder.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::TOOL_LOG_TARGET;
use crate::errors::NodeError;
use crate::supervisor::{CancellationToken, RunDir};

/// Script de control escrito en el run dir antes de lanzar la herramienta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlScript {
    pub file_name: String,
    pub contents: String,
}

/// Qué lanzar: ejecutable, argumentos, entorno extra y script opcional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub executable: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub script: Option<ControlScript>,
}

impl ToolInvocation {
    pub fn new(executable: impl Into<String>) -> Self {
        Self { executable: executable.into(),
               args: Vec::new(),
               env: BTreeMap::new(),
               script: None }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn script(mut self, file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.script = Some(ControlScript { file_name: file_name.into(),
                                           contents: contents.into() });
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_str()).chain(self.args.iter().map(String::as_str))
                                                 .collect::<Vec<_>>()
                                                 .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub grace_period: Duration,
    pub poll_interval: Duration,
    pub echo_output: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { grace_period: Duration::from_secs(5),
               poll_interval: Duration::from_millis(50),
               echo_output: true }
    }
}

/// Salida normal del proceso líder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub pid: u32,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor {
    config: SupervisorConfig,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Escribe el script (si hay), lanza la herramienta en `run_dir` y espera
    /// su fin, el timeout o la cancelación. `on_spawn` recibe el pid justo
    /// después del lanzamiento.
    pub fn run(&self,
               run_dir: &RunDir,
               invocation: &ToolInvocation,
               timeout: Option<Duration>,
               cancel: &CancellationToken,
               on_spawn: impl FnOnce(u32))
               -> Result<ProcessOutcome, NodeError> {
        if let Some(script) = &invocation.script {
            fs::write(run_dir.path().join(&script.file_name), &script.contents).map_err(NodeError::io)?;
        }
        let log = Arc::new(Mutex::new(File::create(run_dir.log_path()).map_err(NodeError::io)?));

        let mut cmd = Command::new(&invocation.executable);
        cmd.args(&invocation.args)
           .envs(&invocation.env)
           .current_dir(run_dir.path())
           .stdin(Stdio::null())
           .stdout(Stdio::piped())
           .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd.spawn().map_err(|e| NodeError::Spawn { executable: invocation.executable.clone(),
                                                                   reason: e.to_string() })?;
        let pid = child.id();
        log::debug!("launched `{}` pid={pid} in {}", invocation.command_line(), run_dir.path().display());
        on_spawn(pid);

        let label = invocation.executable.rsplit('/').next().unwrap_or_default().to_string();
        let pumps = [pump(child.stdout.take(), log.clone(), label.clone(), false, self.config.echo_output),
                     pump(child.stderr.take(), log.clone(), label, true, self.config.echo_output)];

        let started = Instant::now();
        let result = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status.code()),
                Ok(None) => {}
                Err(e) => {
                    self.terminate(pid, &mut child);
                    break Err(NodeError::io(e));
                }
            }
            if cancel.is_cancelled() {
                log::warn!("cancelling pid={pid}");
                self.terminate(pid, &mut child);
                break Err(NodeError::Cancelled);
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    log::warn!("pid={pid} exceeded timeout of {:?}", limit);
                    self.terminate(pid, &mut child);
                    break Err(NodeError::Timeout { seconds: whole_seconds(limit) });
                }
            }
            thread::sleep(self.config.poll_interval);
        };

        // barrido: helpers del grupo que sobreviven al líder
        group::kill(pid);
        for handle in pumps.into_iter().flatten() {
            if handle.join().is_err() {
                log::warn!("output reader for pid={pid} panicked");
            }
        }
        if let Ok(mut f) = log.lock() {
            let _ = f.flush();
        }

        result.map(|exit_code| ProcessOutcome { pid,
                                                exit_code,
                                                elapsed: started.elapsed() })
    }

    /// SIGTERM al grupo, espera de gracia, SIGKILL al grupo; siempre cosecha
    /// al líder.
    fn terminate(&self, pid: u32, child: &mut Child) {
        group::terminate(pid);
        let deadline = Instant::now() + self.config.grace_period;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            thread::sleep(self.config.poll_interval.min(Duration::from_millis(20)));
        }
        group::kill(pid);
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn pump<R: Read + Send + 'static>(stream: Option<R>,
                                  log: Arc<Mutex<File>>,
                                  label: String,
                                  is_stderr: bool,
                                  echo: bool)
                                  -> Option<JoinHandle<()>> {
    let stream = stream?;
    Some(thread::spawn(move || {
        let reader = BufReader::new(stream);
        for chunk in reader.split(b'\n') {
            let Ok(bytes) = chunk else { break };
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches('\r');
            if let Ok(mut f) = log.lock() {
                let _ = writeln!(f, "{line}");
            }
            if echo {
                if is_stderr {
                    log::info!(target: TOOL_LOG_TARGET, "[{label}!] {line}");
                } else {
                    log::info!(target: TOOL_LOG_TARGET, "[{label}] {line}");
                }
            }
        }
    }))
}

#[cfg(unix)]
mod group {
    // El pgid coincide con el pid del líder (lanzado con process_group(0)).
    fn signal(pid: u32, sig: libc::c_int) {
        let Ok(pgid) = libc::pid_t::try_from(pid) else { return };
        // SAFETY: killpg sólo envía una señal; ESRCH (grupo ya vacío) se ignora.
        unsafe {
            libc::killpg(pgid, sig);
        }
    }

    pub(super) fn terminate(pid: u32) {
        signal(pid, libc::SIGTERM);
    }

    pub(super) fn kill(pid: u32) {
        signal(pid, libc::SIGKILL);
    }
}

/// Segundos enteros de un límite, redondeando hacia arriba.
fn whole_seconds(limit: Duration) -> u64 {
    limit.as_secs() + u64::from(limit.subsec_nanos() > 0)
}

#[cfg(not(unix))]
mod group {
    pub(super) fn terminate(_pid: u32) {}
    pub(super) fn kill(_pid: u32) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run_sh(script: &str, timeout: Option<Duration>) -> (tempfile::TempDir, RunDir, Result<ProcessOutcome, NodeError>) {
        let tmp = tempfile::tempdir().unwrap();
        let rd = RunDir::new(tmp.path().join("run"));
        rd.prepare().unwrap();
        let sup = ProcessSupervisor::new(SupervisorConfig { grace_period: Duration::from_millis(200),
                                                            echo_output: false,
                                                            ..Default::default() });
        let inv = ToolInvocation::new("sh").arg("tool.sh").script("tool.sh", script);
        let res = sup.run(&rd, &inv, timeout, &CancellationToken::new(), |_| {});
        (tmp, rd, res)
    }

    #[test]
    fn output_goes_to_log_and_exit_code_is_kept() {
        let (_tmp, rd, res) = run_sh("echo hello\necho oops 1>&2\nexit 3\n", None);
        let out = res.unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        let log = fs::read_to_string(rd.log_path()).unwrap();
        assert!(log.contains("hello") && log.contains("oops"));
        assert!(rd.path().join("tool.sh").is_file());
    }

    #[test]
    fn timeout_kills_the_tool() {
        let started = Instant::now();
        let (_tmp, _rd, res) = run_sh("sleep 30\n", Some(Duration::from_millis(300)));
        // los límites fraccionarios se reportan redondeados hacia arriba
        assert_eq!(res.unwrap_err(), NodeError::Timeout { seconds: 1 });
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_millis(1)), 1);
        assert_eq!(whole_seconds(Duration::from_secs(2)), 2);
        assert_eq!(whole_seconds(Duration::from_millis(2500)), 3);
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let rd = RunDir::new(tmp.path());
        let inv = ToolInvocation::new("/definitely/not/a/tool");
        let err = ProcessSupervisor::default().run(&rd, &inv, None, &CancellationToken::new(), |_| {})
                                              .unwrap_err();
        assert!(matches!(err, NodeError::Spawn { .. }));
    }
}
