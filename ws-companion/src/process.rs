//! Pseudo-terminal process management.
//!
//! Each spawned process runs under a PTY, so stderr is merged into stdout
//! and interactive programs behave as in a real terminal. Output is fanned
//! out through one broadcast channel per process; every gateway connection
//! subscribes to the same channel instead of spawning its own read loop.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::broadcast;
use uuid::Uuid;
use ws_core::{Result, WsError};

const OUTPUT_BUFFER: usize = 1024;
const READ_CHUNK: usize = 8192;

/// Environment prefixes never inherited by spawned processes.
const SCRUBBED_PREFIXES: &[&str] = &["KUBERNETES_", "WS_COMPANION_"];

enum OutputState {
    /// No client has asked for output yet; the PTY reader is still parked.
    NotStarted(Option<Box<dyn Read + Send>>),
    Running(broadcast::Sender<Bytes>),
    Finished,
}

struct ProcessHandle {
    child: Mutex<Box<dyn Child + Send + Sync>>,
    writer: Mutex<Box<dyn Write + Send>>,
    /// Kept alive for the lifetime of the process; dropping the master
    /// closes the PTY under the child.
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    output: Mutex<OutputState>,
}

/// Spawns and tracks PTY-backed processes keyed by an opaque id.
pub struct ProcessManager {
    workdir: PathBuf,
    registry: RwLock<HashMap<Uuid, Arc<ProcessHandle>>>,
}

impl ProcessManager {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Starts `cmd` in the workspace root and returns its id.
    ///
    /// The child inherits the companion environment minus cluster-internal
    /// variables, with `TERM=xterm` and the caller's overrides applied on
    /// top.
    pub async fn spawn(
        &self,
        cmd: Vec<String>,
        env: HashMap<String, String>,
    ) -> Result<Uuid> {
        let program = cmd
            .first()
            .cloned()
            .ok_or_else(|| WsError::Process("empty command".to_string()))?;
        let args = cmd[1..].to_vec();
        let workdir = self.workdir.clone();
        let environment = build_environment(env);

        let handle = tokio::task::spawn_blocking(move || {
            spawn_pty(&program, &args, &workdir, &environment)
        })
        .await
        .map_err(|e| WsError::Process(format!("spawn task failed: {e}")))??;

        let mut registry = self.registry.write().expect("registry poisoned");
        loop {
            let id = Uuid::new_v4();
            if let std::collections::hash_map::Entry::Vacant(slot) = registry.entry(id) {
                slot.insert(Arc::new(handle));
                return Ok(id);
            }
        }
    }

    pub fn list(&self) -> Vec<Uuid> {
        self.registry
            .read()
            .expect("registry poisoned")
            .keys()
            .copied()
            .collect()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.registry
            .read()
            .expect("registry poisoned")
            .contains_key(&id)
    }

    fn get(&self, id: Uuid) -> Result<Arc<ProcessHandle>> {
        self.registry
            .read()
            .expect("registry poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| WsError::not_found(format!("process {id}")))
    }

    /// Subscribes to the process output. The PTY read loop starts on the
    /// first subscription and is shared by all later ones; once the process
    /// output ends, new subscriptions observe an immediately closed stream.
    pub fn stdout(&self, id: Uuid) -> Result<broadcast::Receiver<Bytes>> {
        let handle = self.get(id)?;
        let mut state = handle.output.lock().expect("output state poisoned");
        match &mut *state {
            OutputState::Running(tx) => Ok(tx.subscribe()),
            OutputState::Finished => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                Ok(rx)
            }
            OutputState::NotStarted(reader) => {
                let mut reader = reader
                    .take()
                    .ok_or_else(|| WsError::Process("pty reader missing".to_string()))?;
                let (tx, rx) = broadcast::channel(OUTPUT_BUFFER);
                *state = OutputState::Running(tx.clone());
                drop(state);

                let handle = Arc::clone(&handle);
                std::thread::spawn(move || {
                    let mut buf = [0u8; READ_CHUNK];
                    loop {
                        match reader.read(&mut buf) {
                            // A PTY read error after child exit is the
                            // normal end-of-stream signal.
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                let _ = tx.send(Bytes::copy_from_slice(&buf[..n]));
                            }
                        }
                    }
                    *handle.output.lock().expect("output state poisoned") =
                        OutputState::Finished;
                });
                Ok(rx)
            }
        }
    }

    /// Writes bytes to the process stdin.
    pub async fn write_stdin(&self, id: Uuid, data: Vec<u8>) -> Result<()> {
        let handle = self.get(id)?;
        tokio::task::spawn_blocking(move || {
            let mut writer = handle.writer.lock().expect("writer poisoned");
            writer
                .write_all(&data)
                .and_then(|_| writer.flush())
                .map_err(|e| WsError::Process(format!("stdin write failed: {e}")))
        })
        .await
        .map_err(|e| WsError::Process(format!("stdin task failed: {e}")))?
    }

    /// Force-kills the process, awaits its exit and evicts the handle. The
    /// registry entry is removed first so a concurrent purge runs at most
    /// once.
    pub async fn purge(&self, id: Uuid) -> Result<()> {
        let handle = self
            .registry
            .write()
            .expect("registry poisoned")
            .remove(&id)
            .ok_or_else(|| WsError::not_found(format!("process {id}")))?;

        tokio::task::spawn_blocking(move || {
            {
                let mut child = handle.child.lock().expect("child poisoned");
                if let Err(e) = child.kill() {
                    tracing::debug!(%id, error = %e, "kill failed, process likely exited");
                }
                if let Err(e) = child.wait() {
                    tracing::warn!(%id, error = %e, "wait after kill failed");
                }
            }
            handle.master.lock().expect("master poisoned").take();
        })
        .await
        .map_err(|e| WsError::Process(format!("purge task failed: {e}")))?;
        Ok(())
    }

    /// Purges every live process. Used on companion shutdown.
    pub async fn purge_all(&self) {
        for id in self.list() {
            if let Err(e) = self.purge(id).await {
                tracing::warn!(%id, error = %e, "purge on shutdown failed");
            }
        }
    }
}

fn build_environment(overrides: HashMap<String, String>) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| !SCRUBBED_PREFIXES.iter().any(|p| key.starts_with(p)))
        .collect();
    env.push(("TERM".to_string(), "xterm".to_string()));
    for (key, value) in overrides {
        env.retain(|(k, _)| *k != key);
        env.push((key, value));
    }
    env
}

fn spawn_pty(
    program: &str,
    args: &[String],
    workdir: &PathBuf,
    environment: &[(String, String)],
) -> Result<ProcessHandle> {
    let pty = native_pty_system();
    let pair = pty
        .openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| WsError::Process(format!("openpty failed: {e}")))?;

    let mut command = CommandBuilder::new(program);
    command.cwd(workdir);
    command.env_clear();
    for (key, value) in environment {
        command.env(key, value);
    }
    for arg in args {
        command.arg(arg);
    }

    let child = pair
        .slave
        .spawn_command(command)
        .map_err(|e| WsError::Process(format!("spawn failed: {e}")))?;
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| WsError::Process(format!("pty reader failed: {e}")))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| WsError::Process(format!("pty writer failed: {e}")))?;

    Ok(ProcessHandle {
        child: Mutex::new(child),
        writer: Mutex::new(writer),
        master: Mutex::new(Some(pair.master)),
        output: Mutex::new(OutputState::NotStarted(Some(reader))),
    })
}
