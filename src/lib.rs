use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tauri::{Manager, State};

mod db;
mod defaults;
mod model;
mod store;
mod sync;
mod views;

use model::{AddCardInput, CardDto, CollectionDocument, EditCardInput};
use store::CollectionStore;
use sync::{DocumentStore, HttpDocumentStore, SyncHandle};
use views::{CollectionViewDto, PortfolioDto, ViewQuery};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub(crate) fn now_iso() -> String {
  Utc::now().to_rfc3339()
}

struct Session {
  uid: String,
  display_name: Option<String>,
  photo_url: Option<String>,
  store: CollectionStore,
}

struct AppState {
  db_path: PathBuf,
  remote: Arc<dyn DocumentStore>,
  sync: SyncHandle,
  session: Mutex<Option<Session>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInInput {
  uid: String,
  #[serde(default)]
  display_name: Option<String>,
  #[serde(default)]
  photo_url: Option<String>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct UserDto {
  uid: String,
  display_name: Option<String>,
  photo_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInDto {
  user: UserDto,
  cards: Vec<CardDto>,
  seeded: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LastSessionDto {
  user: UserDto,
  cached_cards: usize,
  cached_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncStatusDto {
  syncing: bool,
  transient_error: bool,
  persistent_error: bool,
  last_error: Option<String>,
  last_synced_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkAddCardsInput {
  set_name: String,
  cards: Vec<AddCardInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameCollectionInput {
  old_name: String,
  new_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateCollectionInput {
  source_name: String,
  new_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderCardsInput {
  set_name: String,
  ordered_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachImageInput {
  id: String,
  path: String,
}

fn card_dtos(store: &CollectionStore) -> Vec<CardDto> {
  store.live_cards().map(CardDto::from).collect()
}

/// Mirrors the mutated state to the local cache and hands the snapshot to
/// the sync writer. A cache failure is logged but never fails the mutation;
/// the remote write cycle is the persistence that counts.
fn commit(state: &AppState, session: &Session) {
  let document = session.store.to_document(now_iso());
  match sync::state_revision(&document) {
    Ok(revision) => {
      let cached = db::open_database(&state.db_path)
        .and_then(|connection| db::cache_document(&connection, &session.uid, &document, &revision));
      if let Err(error) = cached {
        warn!("failed to cache collection locally: {}", error);
      }
    }
    Err(error) => warn!("failed to compute collection revision: {}", error),
  }
  state.sync.schedule_write(&session.uid, document);
}

/// Remote document present and non-empty means hydrate; anything else means
/// first login, seeded from the bundled checklist.
fn initial_store(fetched: Option<CollectionDocument>) -> Result<(CollectionStore, bool), String> {
  match fetched {
    Some(document) if !document.is_empty() => Ok((CollectionStore::from_document(document), false)),
    _ => Ok((CollectionStore::seed(defaults::default_cards()?), true)),
  }
}

fn clean_optional(value: Option<String>) -> Option<String> {
  value
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
}

fn image_mime(path: &Path) -> Result<&'static str, String> {
  let extension = path
    .extension()
    .and_then(|extension| extension.to_str())
    .unwrap_or_default()
    .to_lowercase();
  match extension.as_str() {
    "png" => Ok("image/png"),
    "jpg" | "jpeg" => Ok("image/jpeg"),
    "gif" => Ok("image/gif"),
    "webp" => Ok("image/webp"),
    other => Err(format!("Unsupported image type: {}", other)),
  }
}

#[tauri::command]
fn sign_in(state: State<'_, AppState>, input: SignInInput) -> Result<SignInDto, String> {
  let uid = input.uid.trim().to_string();
  if uid.is_empty() {
    return Err("User id is required.".to_string());
  }

  let fetched = state.remote.fetch(&uid)?;
  let (store, seeded) = initial_store(fetched)?;

  if seeded {
    // first login for this user: write the seeded checklist through so the
    // document exists before the first mutation
    let document = store.to_document(now_iso());
    match state.remote.write(&uid, &document) {
      Ok(()) => {
        if let Ok(revision) = sync::state_revision(&document) {
          state.sync.record_direct_write(revision);
        }
      }
      Err(error) => {
        warn!("initial collection write failed: {}", error);
        state.sync.record_write_failure(error);
      }
    }
  }

  let display_name = clean_optional(input.display_name);
  let photo_url = clean_optional(input.photo_url);

  let document = store.to_document(now_iso());
  match db::open_database(&state.db_path) {
    Ok(connection) => {
      if let Err(error) =
        db::save_session(&connection, &uid, display_name.as_deref(), photo_url.as_deref())
      {
        warn!("failed to persist session: {}", error);
      }
      match sync::state_revision(&document) {
        Ok(revision) => {
          if let Err(error) = db::cache_document(&connection, &uid, &document, &revision) {
            warn!("failed to cache collection locally: {}", error);
          }
        }
        Err(error) => warn!("failed to compute collection revision: {}", error),
      }
    }
    Err(error) => warn!("failed to open local cache: {}", error),
  }

  let cards = card_dtos(&store);
  let user = UserDto {
    uid: uid.clone(),
    display_name: display_name.clone(),
    photo_url: photo_url.clone(),
  };
  *state.session.lock().map_err(|e| e.to_string())? = Some(Session {
    uid,
    display_name,
    photo_url,
    store,
  });

  Ok(SignInDto { user, cards, seeded })
}

#[tauri::command]
fn sign_out(state: State<'_, AppState>) -> Result<(), String> {
  *state.session.lock().map_err(|e| e.to_string())? = None;
  state.sync.reset();
  match db::open_database(&state.db_path) {
    Ok(connection) => {
      if let Err(error) = db::clear_session(&connection) {
        warn!("failed to clear persisted session: {}", error);
      }
    }
    Err(error) => warn!("failed to open local cache: {}", error),
  }
  Ok(())
}

#[tauri::command]
fn current_user(state: State<'_, AppState>) -> Result<Option<UserDto>, String> {
  let guard = state.session.lock().map_err(|e| e.to_string())?;
  Ok(guard.as_ref().map(|session| UserDto {
    uid: session.uid.clone(),
    display_name: session.display_name.clone(),
    photo_url: session.photo_url.clone(),
  }))
}

/// The most recent signed-in identity plus a summary of its cached
/// snapshot, so the login screen can offer a quick re-login before the auth
/// popup completes.
#[tauri::command]
fn last_session(state: State<'_, AppState>) -> Result<Option<LastSessionDto>, String> {
  let connection = db::open_database(&state.db_path)?;
  let Some(row) = db::load_session(&connection)? else {
    return Ok(None);
  };

  let cached = db::load_cached_document(&connection, &row.uid)?;
  let (cached_cards, cached_at) = match &cached {
    Some((document, _)) => (
      document.cards.len(),
      Some(document.updated_at.clone()).filter(|stamp| !stamp.is_empty()),
    ),
    None => (0, None),
  };

  Ok(Some(LastSessionDto {
    user: UserDto {
      uid: row.uid,
      display_name: row.display_name,
      photo_url: row.photo_url,
    },
    cached_cards,
    cached_at,
  }))
}

#[tauri::command]
fn get_cards(state: State<'_, AppState>) -> Result<Vec<CardDto>, String> {
  let guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_ref().ok_or_else(|| "Not signed in.".to_string())?;
  Ok(card_dtos(&session.store))
}

/// Tombstoned default cards, listed for the restore/recovery screen.
#[tauri::command]
fn get_hidden_cards(state: State<'_, AppState>) -> Result<Vec<CardDto>, String> {
  let guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_ref().ok_or_else(|| "Not signed in.".to_string())?;
  Ok(session.store.hidden_cards().map(CardDto::from).collect())
}

#[tauri::command]
fn get_collection_view(
  state: State<'_, AppState>,
  query: Option<ViewQuery>,
) -> Result<CollectionViewDto, String> {
  let guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_ref().ok_or_else(|| "Not signed in.".to_string())?;
  Ok(views::collection_view(&session.store, &query.unwrap_or_default()))
}

#[tauri::command]
fn get_portfolio(state: State<'_, AppState>) -> Result<PortfolioDto, String> {
  let guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_ref().ok_or_else(|| "Not signed in.".to_string())?;
  Ok(views::portfolio(&session.store))
}

#[tauri::command]
fn toggle_collected(state: State<'_, AppState>, id: String) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.toggle_collected(&id)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn add_card(state: State<'_, AppState>, input: AddCardInput) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.add_card(input)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn bulk_add_cards(
  state: State<'_, AppState>,
  input: BulkAddCardsInput,
) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.bulk_add_cards(&input.set_name, input.cards)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn edit_card(state: State<'_, AppState>, input: EditCardInput) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.edit_card(input)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn duplicate_card(state: State<'_, AppState>, id: String) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.duplicate_card(&id)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn delete_card(state: State<'_, AppState>, id: String) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.delete_card(&id)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn rename_collection(
  state: State<'_, AppState>,
  input: RenameCollectionInput,
) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session
    .store
    .rename_collection(&input.old_name, &input.new_name)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn delete_collection(state: State<'_, AppState>, set_name: String) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.delete_collection(&set_name)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn duplicate_collection(
  state: State<'_, AppState>,
  input: DuplicateCollectionInput,
) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session
    .store
    .duplicate_collection(&input.source_name, &input.new_name)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn reorder_cards_in_set(
  state: State<'_, AppState>,
  input: ReorderCardsInput,
) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session
    .store
    .reorder_cards_in_set(&input.set_name, input.ordered_ids)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn reorder_collections(
  state: State<'_, AppState>,
  ordered_set_names: Vec<String>,
) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.reorder_collections(ordered_set_names);
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn restore_hidden(state: State<'_, AppState>, ids: Vec<String>) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.restore_hidden(&ids);
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn attach_card_image(
  state: State<'_, AppState>,
  input: AttachImageInput,
) -> Result<Vec<CardDto>, String> {
  let path = PathBuf::from(&input.path);
  let mime = image_mime(&path)?;
  let bytes = fs::read(&path).map_err(|e| e.to_string())?;
  if bytes.len() > MAX_IMAGE_BYTES {
    return Err("Image is too large to attach.".to_string());
  }
  let data_uri = format!("data:{};base64,{}", mime, B64.encode(&bytes));

  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.set_card_image(&input.id, Some(data_uri))?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn remove_card_image(state: State<'_, AppState>, id: String) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;
  session.store.set_card_image(&id, None)?;
  commit(&state, session);
  Ok(card_dtos(&session.store))
}

/// Re-reads the remote document and applies it unless it is this client's
/// own last write or already matches local state.
#[tauri::command]
fn refresh_collection(state: State<'_, AppState>) -> Result<Vec<CardDto>, String> {
  let mut guard = state.session.lock().map_err(|e| e.to_string())?;
  let session = guard.as_mut().ok_or_else(|| "Not signed in.".to_string())?;

  let Some(remote_document) = state.remote.fetch(&session.uid)? else {
    return Ok(card_dtos(&session.store));
  };

  let remote_revision = sync::state_revision(&remote_document)?;
  let local_revision = sync::state_revision(&session.store.to_document(String::new()))?;
  let status = state.sync.status();

  if sync::should_apply_remote(
    &remote_revision,
    &local_revision,
    status.last_written_revision.as_deref(),
  ) {
    session.store = CollectionStore::from_document(remote_document);
    match db::open_database(&state.db_path) {
      Ok(connection) => {
        let document = session.store.to_document(now_iso());
        if let Err(error) =
          db::cache_document(&connection, &session.uid, &document, &remote_revision)
        {
          warn!("failed to cache refreshed collection: {}", error);
        }
      }
      Err(error) => warn!("failed to open local cache: {}", error),
    }
  }

  Ok(card_dtos(&session.store))
}

#[tauri::command]
fn sync_status(state: State<'_, AppState>) -> Result<SyncStatusDto, String> {
  let status = state.sync.status();
  Ok(SyncStatusDto {
    syncing: status.syncing,
    transient_error: status.transient_error,
    persistent_error: status.persistent_error,
    last_error: status.last_error,
    last_synced_at: status.last_synced_at,
  })
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  tauri::Builder::default()
    .setup(|app| {
      let app_data_dir = app.path().app_data_dir()?;
      let db_path = app_data_dir.join("cardvault.db");
      db::init_database(&db_path)
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?;

      let remote: Arc<dyn DocumentStore> = Arc::new(
        HttpDocumentStore::from_env()
          .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?,
      );
      let sync = SyncHandle::start(remote.clone());
      app.manage(AppState {
        db_path,
        remote,
        sync,
        session: Mutex::new(None),
      });

      if cfg!(debug_assertions) {
        app.handle().plugin(
          tauri_plugin_log::Builder::default()
            .level(log::LevelFilter::Info)
            .build(),
        )?;
      }
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      sign_in,
      sign_out,
      current_user,
      last_session,
      get_cards,
      get_hidden_cards,
      get_collection_view,
      get_portfolio,
      toggle_collected,
      add_card,
      bulk_add_cards,
      edit_card,
      duplicate_card,
      delete_card,
      rename_collection,
      delete_collection,
      duplicate_collection,
      reorder_cards_in_set,
      reorder_collections,
      restore_hidden,
      attach_card_image,
      remove_card_image,
      refresh_collection,
      sync_status
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initial_store_seeds_when_remote_is_absent_or_empty() {
    let (store, seeded) = initial_store(None).unwrap();
    assert!(seeded);
    assert!(store.live_cards().count() > 0);
    assert!(store.live_cards().all(|card| !card.collected));

    let (_, seeded) = initial_store(Some(CollectionDocument::default())).unwrap();
    assert!(seeded, "an empty document still seeds");
  }

  #[test]
  fn initial_store_hydrates_existing_document() {
    let (seeded_store, _) = initial_store(None).unwrap();
    let document = seeded_store.to_document(now_iso());
    let expected = document.cards.len();

    let (store, seeded) = initial_store(Some(document)).unwrap();
    assert!(!seeded);
    assert_eq!(store.live_cards().count(), expected);
  }

  #[test]
  fn image_mime_accepts_known_extensions_only() {
    assert_eq!(image_mime(Path::new("/tmp/card.PNG")).unwrap(), "image/png");
    assert_eq!(image_mime(Path::new("/tmp/card.jpeg")).unwrap(), "image/jpeg");
    assert_eq!(image_mime(Path::new("/tmp/card.webp")).unwrap(), "image/webp");
    assert!(image_mime(Path::new("/tmp/card.pdf")).is_err());
    assert!(image_mime(Path::new("/tmp/card")).is_err());
  }
}
