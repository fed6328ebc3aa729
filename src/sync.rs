use crate::model::CollectionDocument;
use crate::now_iso;
use log::{info, warn};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::env;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(750);
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SYNC_URL_ENV: &str = "CARDVAULT_SYNC_URL";
const DEFAULT_SYNC_BASE_URL: &str = "https://sync.cardvault.app";

/// The per-user remote document store. One document per user id, whole-state
/// writes, last write wins.
pub trait DocumentStore: Send + Sync {
  fn fetch(&self, uid: &str) -> Result<Option<CollectionDocument>, String>;
  fn write(&self, uid: &str, document: &CollectionDocument) -> Result<(), String>;
}

pub struct HttpDocumentStore {
  client: Client,
  base_url: String,
}

impl HttpDocumentStore {
  pub fn from_env() -> Result<Self, String> {
    let base_url = env::var(SYNC_URL_ENV).unwrap_or_else(|_| DEFAULT_SYNC_BASE_URL.to_string());
    HttpDocumentStore::new(base_url)
  }

  pub fn new(base_url: String) -> Result<Self, String> {
    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| e.to_string())?;
    Ok(HttpDocumentStore {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  fn document_url(&self, uid: &str) -> String {
    format!("{}/users/{}/collection", self.base_url, uid)
  }
}

impl DocumentStore for HttpDocumentStore {
  fn fetch(&self, uid: &str) -> Result<Option<CollectionDocument>, String> {
    let response = self
      .client
      .get(self.document_url(uid))
      .send()
      .map_err(|e| e.to_string())?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(format!(
        "Collection read failed with status {}",
        response.status()
      ));
    }
    let document = response
      .json::<CollectionDocument>()
      .map_err(|e| e.to_string())?;
    Ok(Some(document))
  }

  fn write(&self, uid: &str, document: &CollectionDocument) -> Result<(), String> {
    let response = self
      .client
      .put(self.document_url(uid))
      .json(document)
      .send()
      .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
      return Err(format!(
        "Collection write failed with status {}",
        response.status()
      ));
    }
    Ok(())
  }
}

/// Canonical revision of the syncable state. `updatedAt` is deliberately
/// left out: a snapshot only counts as changed when cards, orders or
/// tombstones changed.
pub fn state_revision(document: &CollectionDocument) -> Result<String, String> {
  let mut hasher = Sha256::new();
  for part in [
    serde_json::to_string(&document.cards).map_err(|e| e.to_string())?,
    serde_json::to_string(&document.custom_order).map_err(|e| e.to_string())?,
    serde_json::to_string(&document.hidden_cards).map_err(|e| e.to_string())?,
    serde_json::to_string(&document.collection_order).map_err(|e| e.to_string())?,
  ] {
    hasher.update(part.as_bytes());
    hasher.update(b"\n");
  }
  Ok(format!("{:x}", hasher.finalize()))
}

/// A fetched snapshot is only applied when it is neither the state this
/// writer last pushed (its own echo) nor the state already held locally.
pub fn should_apply_remote(
  remote_revision: &str,
  local_revision: &str,
  last_written_revision: Option<&str>,
) -> bool {
  remote_revision != local_revision && Some(remote_revision) != last_written_revision
}

#[derive(Clone, Debug, Default)]
pub struct SyncStatus {
  pub syncing: bool,
  pub transient_error: bool,
  pub persistent_error: bool,
  pub last_error: Option<String>,
  pub last_synced_at: Option<String>,
  pub last_written_revision: Option<String>,
}

enum SyncMessage {
  Write {
    uid: String,
    document: CollectionDocument,
  },
  Reset,
}

/// Handle to the single writer thread. Mutations hand over full snapshots;
/// the worker debounces, coalesces to the newest snapshot, and retries a
/// failed write exactly once before going quiet until the next change.
#[derive(Clone)]
pub struct SyncHandle {
  sender: Sender<SyncMessage>,
  status: Arc<Mutex<SyncStatus>>,
}

impl SyncHandle {
  pub fn start(store: Arc<dyn DocumentStore>) -> Self {
    let (sender, receiver) = mpsc::channel();
    let status = Arc::new(Mutex::new(SyncStatus::default()));
    let worker_status = status.clone();
    thread::spawn(move || run_worker(store, receiver, worker_status));
    SyncHandle { sender, status }
  }

  pub fn schedule_write(&self, uid: &str, document: CollectionDocument) {
    let _ = self.sender.send(SyncMessage::Write {
      uid: uid.to_string(),
      document,
    });
  }

  /// Drops any pending snapshot and clears the status; used on sign-out.
  pub fn reset(&self) {
    let _ = self.sender.send(SyncMessage::Reset);
  }

  pub fn status(&self) -> SyncStatus {
    self
      .status
      .lock()
      .map(|status| status.clone())
      .unwrap_or_default()
  }

  /// Bookkeeping for writes performed outside the worker, like the
  /// immediate write-through after seeding a fresh user.
  pub fn record_direct_write(&self, revision: String) {
    if let Ok(mut status) = self.status.lock() {
      status.transient_error = false;
      status.persistent_error = false;
      status.last_error = None;
      status.last_synced_at = Some(now_iso());
      status.last_written_revision = Some(revision);
    }
  }

  pub fn record_write_failure(&self, error: String) {
    if let Ok(mut status) = self.status.lock() {
      status.transient_error = true;
      status.last_error = Some(error);
    }
  }
}

fn last_written_revision(status: &Arc<Mutex<SyncStatus>>) -> Option<String> {
  status
    .lock()
    .ok()
    .and_then(|status| status.last_written_revision.clone())
}

fn set_syncing(status: &Arc<Mutex<SyncStatus>>, syncing: bool) {
  if let Ok(mut status) = status.lock() {
    status.syncing = syncing;
  }
}

fn reset_status(status: &Arc<Mutex<SyncStatus>>) {
  if let Ok(mut status) = status.lock() {
    *status = SyncStatus::default();
  }
}

fn record_success(status: &Arc<Mutex<SyncStatus>>, revision: String) {
  if let Ok(mut status) = status.lock() {
    status.transient_error = false;
    status.persistent_error = false;
    status.last_error = None;
    status.last_synced_at = Some(now_iso());
    status.last_written_revision = Some(revision);
  }
}

fn record_transient(status: &Arc<Mutex<SyncStatus>>, error: String) {
  if let Ok(mut status) = status.lock() {
    status.transient_error = true;
    status.last_error = Some(error);
  }
}

fn record_persistent(status: &Arc<Mutex<SyncStatus>>, error: String) {
  if let Ok(mut status) = status.lock() {
    status.transient_error = false;
    status.persistent_error = true;
    status.last_error = Some(error);
  }
}

fn run_worker(
  store: Arc<dyn DocumentStore>,
  receiver: Receiver<SyncMessage>,
  status: Arc<Mutex<SyncStatus>>,
) {
  'outer: loop {
    let message = match receiver.recv() {
      Ok(message) => message,
      Err(_) => break,
    };
    let (mut uid, mut document) = match message {
      SyncMessage::Write { uid, document } => (uid, document),
      SyncMessage::Reset => {
        reset_status(&status);
        continue;
      }
    };

    // quiet-window debounce; newer snapshots replace the pending one, so
    // rapid mutations collapse into a single write of the final state
    let mut disconnected = false;
    loop {
      match receiver.recv_timeout(DEBOUNCE_WINDOW) {
        Ok(SyncMessage::Write {
          uid: next_uid,
          document: next_document,
        }) => {
          uid = next_uid;
          document = next_document;
        }
        Ok(SyncMessage::Reset) => {
          reset_status(&status);
          continue 'outer;
        }
        Err(RecvTimeoutError::Timeout) => break,
        Err(RecvTimeoutError::Disconnected) => {
          disconnected = true;
          break;
        }
      }
    }

    let mut revision = match state_revision(&document) {
      Ok(revision) => revision,
      Err(error) => {
        warn!("skipping sync, snapshot failed to serialize: {}", error);
        continue;
      }
    };
    if last_written_revision(&status).as_deref() == Some(revision.as_str()) {
      if disconnected {
        break;
      }
      continue;
    }

    set_syncing(&status, true);
    match store.write(&uid, &document) {
      Ok(()) => {
        info!("collection synced for {}", uid);
        record_success(&status, revision);
      }
      Err(error) => {
        warn!("collection write failed, retrying once: {}", error);
        record_transient(&status, error);

        if disconnected {
          thread::sleep(RETRY_DELAY);
        } else {
          // the retry delay doubles as a window to coalesce newer snapshots
          loop {
            match receiver.recv_timeout(RETRY_DELAY) {
              Ok(SyncMessage::Write {
                uid: next_uid,
                document: next_document,
              }) => {
                uid = next_uid;
                document = next_document;
              }
              Ok(SyncMessage::Reset) => {
                reset_status(&status);
                continue 'outer;
              }
              Err(RecvTimeoutError::Timeout) => break,
              Err(RecvTimeoutError::Disconnected) => {
                disconnected = true;
                break;
              }
            }
          }
          if let Ok(next_revision) = state_revision(&document) {
            revision = next_revision;
          }
        }

        match store.write(&uid, &document) {
          Ok(()) => {
            info!("collection synced for {} after retry", uid);
            record_success(&status, revision);
          }
          Err(error) => {
            warn!(
              "collection write failed again, waiting for the next change: {}",
              error
            );
            record_persistent(&status, error);
          }
        }
      }
    }
    set_syncing(&status, false);

    if disconnected {
      break;
    }
  }
}
