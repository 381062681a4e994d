//! Shared fixtures for monitor integration tests: an in-memory
//! [`WipeStore`], a recording [`InstanceRestarter`] and a temp instance
//! directory.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mapchange_core::config_patch::ConfigPatcher;
use mapchange_core::instance::CONFIG_FILE_NAME;
use mapchange_core::restart::{InstanceRestarter, RestartError, RestartOutput};
use mapchange_db::models::wipe::QueuedWipe;
use mapchange_monitor::pipeline::Pipeline;
use mapchange_monitor::poller::MapChangeMonitor;
use mapchange_monitor::store::WipeStore;
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    /// server_id -> (level_url, is_queued)
    wipes: BTreeMap<String, (String, bool)>,
    /// server_id -> server_folder
    mappings: HashMap<String, String>,
    list_calls: usize,
    fail_list: bool,
    fail_ack: bool,
}

/// Holds `list_queued` open until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    gate: Option<Arc<Gate>>,
}

impl MemoryStore {
    pub fn gated() -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        let store = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (store, gate)
    }

    pub fn queue(&self, server_id: &str, level_url: &str) {
        self.state
            .lock()
            .unwrap()
            .wipes
            .insert(server_id.to_string(), (level_url.to_string(), true));
    }

    pub fn map(&self, server_id: &str, folder: &str) {
        self.state
            .lock()
            .unwrap()
            .mappings
            .insert(server_id.to_string(), folder.to_string());
    }

    pub fn is_queued(&self, server_id: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .wipes
            .get(server_id)
            .map(|(_, queued)| *queued)
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub fn fail_acknowledge(&self, fail: bool) {
        self.state.lock().unwrap().fail_ack = fail;
    }
}

impl WipeStore for MemoryStore {
    async fn list_queued(&self) -> Result<Vec<QueuedWipe>, sqlx::Error> {
        self.state.lock().unwrap().list_calls += 1;

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(sqlx::Error::Protocol("connection reset".into()));
        }
        Ok(state
            .wipes
            .iter()
            .filter(|(_, (_, queued))| *queued)
            .map(|(id, (url, _))| QueuedWipe {
                server_id: id.clone(),
                level_url: url.clone(),
            })
            .collect())
    }

    async fn resolve_folder(&self, server_id: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(self.state.lock().unwrap().mappings.get(server_id).cloned())
    }

    async fn set_queued(&self, server_id: &str, is_queued: bool) -> Result<u64, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_ack {
            return Err(sqlx::Error::Protocol("connection reset".into()));
        }
        match state.wipes.get_mut(server_id) {
            Some((_, queued)) => {
                *queued = is_queued;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Recording restarter
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingRestarter {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Duration,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl RecordingRestarter {
    /// Restarter whose every call takes `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn fail_for(&self, folder: &str, fail: bool) {
        let mut failing = self.failing.lock().unwrap();
        if fail {
            failing.insert(folder.to_string());
        } else {
            failing.remove(folder);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of restarts observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl InstanceRestarter for RecordingRestarter {
    async fn restart(&self, folder: &str) -> Result<RestartOutput, RestartError> {
        self.calls.lock().unwrap().push(folder.to_string());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(folder) {
            return Err(RestartError::Failed {
                exit_code: Some(1),
                stderr: format!("instance {folder} is not running"),
            });
        }

        Ok(RestartOutput {
            stdout: format!("Restarted {folder}"),
            stderr: String::new(),
            duration_ms: self.delay.as_millis() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Instance directory
// ---------------------------------------------------------------------------

pub const OLD_URL: &str = "http://old";
pub const NEW_URL: &str = "http://new";

/// Typical config body with the level URL surrounded by unrelated keys.
pub fn kvp_body(level_url: &str) -> String {
    format!(
        "Rust.Hostname=EU Main | Weekly\r\n\
         Rust.Description=Monthly wipe; BP wipe = first Thursday\n\
         Rust.LevelUrl={level_url}\n\
         Rust.WorldSize=4000\n\
         \n\
         Rust.Seed=1337\n"
    )
}

pub struct Instances {
    dir: tempfile::TempDir,
}

impl Instances {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<dir>/<folder>/RustModule.kvp` holding `body`.
    pub fn add(&self, folder: &str, body: &str) {
        let folder = self.dir.path().join(folder);
        std::fs::create_dir_all(&folder).expect("create instance folder");
        std::fs::write(folder.join(CONFIG_FILE_NAME), body).expect("write config");
    }

    pub fn read(&self, folder: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(folder).join(CONFIG_FILE_NAME))
            .expect("read config")
    }

    pub fn patcher(&self) -> ConfigPatcher {
        ConfigPatcher::new(self.dir.path())
    }
}

/// Monitor with no settle delay.
pub fn monitor(
    store: MemoryStore,
    restarter: RecordingRestarter,
    instances: &Instances,
    poll_interval: Duration,
) -> MapChangeMonitor<MemoryStore, RecordingRestarter> {
    settling_monitor(store, restarter, instances, poll_interval, Duration::ZERO)
}

/// Monitor that pauses `settle_delay` between patch and restart.
pub fn settling_monitor(
    store: MemoryStore,
    restarter: RecordingRestarter,
    instances: &Instances,
    poll_interval: Duration,
    settle_delay: Duration,
) -> MapChangeMonitor<MemoryStore, RecordingRestarter> {
    let pipeline = Pipeline::new(store, instances.patcher(), restarter, settle_delay);
    MapChangeMonitor::new(pipeline, poll_interval)
}
