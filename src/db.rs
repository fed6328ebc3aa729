use crate::model::CollectionDocument;
use crate::now_iso;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::PathBuf;

const MIGRATION_SQL_0001: &str = include_str!("../migrations/0001_initial.sql");

pub fn init_database(db_path: &PathBuf) -> Result<(), String> {
  if let Some(parent) = db_path.parent() {
    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
  }

  let connection = Connection::open(db_path).map_err(|e| e.to_string())?;
  connection
    .execute_batch("PRAGMA foreign_keys = ON;")
    .map_err(|e| e.to_string())?;
  connection
    .execute_batch(MIGRATION_SQL_0001)
    .map_err(|e| e.to_string())?;
  Ok(())
}

pub fn open_database(db_path: &PathBuf) -> Result<Connection, String> {
  let connection = Connection::open(db_path).map_err(|e| e.to_string())?;
  connection
    .execute_batch("PRAGMA foreign_keys = ON;")
    .map_err(|e| e.to_string())?;
  Ok(connection)
}

#[derive(Clone, Debug)]
pub struct SessionRow {
  pub uid: String,
  pub display_name: Option<String>,
  pub photo_url: Option<String>,
  pub signed_in_at: String,
}

pub fn save_session(
  connection: &Connection,
  uid: &str,
  display_name: Option<&str>,
  photo_url: Option<&str>,
) -> Result<(), String> {
  connection
    .execute(
      "INSERT INTO sessions (id, uid, display_name, photo_url, signed_in_at)
       VALUES (1, ?1, ?2, ?3, ?4)
       ON CONFLICT(id) DO UPDATE SET
         uid = excluded.uid,
         display_name = excluded.display_name,
         photo_url = excluded.photo_url,
         signed_in_at = excluded.signed_in_at",
      params![uid, display_name, photo_url, now_iso()],
    )
    .map_err(|e| e.to_string())?;
  Ok(())
}

pub fn load_session(connection: &Connection) -> Result<Option<SessionRow>, String> {
  connection
    .query_row(
      "SELECT uid, display_name, photo_url, signed_in_at FROM sessions WHERE id = 1",
      [],
      |row| {
        Ok(SessionRow {
          uid: row.get(0)?,
          display_name: row.get(1)?,
          photo_url: row.get(2)?,
          signed_in_at: row.get(3)?,
        })
      },
    )
    .optional()
    .map_err(|e| e.to_string())
}

pub fn clear_session(connection: &Connection) -> Result<(), String> {
  connection
    .execute("DELETE FROM sessions WHERE id = 1", [])
    .map_err(|e| e.to_string())?;
  Ok(())
}

/// Write-through mirror of the remote document, one row per user.
pub fn cache_document(
  connection: &Connection,
  uid: &str,
  document: &CollectionDocument,
  revision: &str,
) -> Result<(), String> {
  let body = serde_json::to_string(document).map_err(|e| e.to_string())?;
  connection
    .execute(
      "INSERT INTO documents (uid, body, revision, updated_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT(uid) DO UPDATE SET
         body = excluded.body,
         revision = excluded.revision,
         updated_at = excluded.updated_at",
      params![uid, body, revision, now_iso()],
    )
    .map_err(|e| e.to_string())?;
  Ok(())
}

pub fn load_cached_document(
  connection: &Connection,
  uid: &str,
) -> Result<Option<(CollectionDocument, String)>, String> {
  let row: Option<(String, String)> = connection
    .query_row(
      "SELECT body, revision FROM documents WHERE uid = ?1",
      params![uid],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(|e| e.to_string())?;

  match row {
    Some((body, revision)) => {
      let document = serde_json::from_str(&body).map_err(|e| e.to_string())?;
      Ok(Some((document, revision)))
    }
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    connection.execute_batch(MIGRATION_SQL_0001).unwrap();
    connection
  }

  #[test]
  fn session_round_trip_and_clear() {
    let connection = test_connection();
    assert!(load_session(&connection).unwrap().is_none());

    save_session(&connection, "user-1", Some("Sam"), None).unwrap();
    let session = load_session(&connection).unwrap().unwrap();
    assert_eq!(session.uid, "user-1");
    assert_eq!(session.display_name.as_deref(), Some("Sam"));

    save_session(&connection, "user-2", None, Some("https://example/p.png")).unwrap();
    let session = load_session(&connection).unwrap().unwrap();
    assert_eq!(session.uid, "user-2", "single session row is replaced");

    clear_session(&connection).unwrap();
    assert!(load_session(&connection).unwrap().is_none());
  }

  #[test]
  fn document_cache_upserts_per_user() {
    let connection = test_connection();
    assert!(load_cached_document(&connection, "user-1").unwrap().is_none());

    let mut document = CollectionDocument::default();
    document.collection_order.push("Base".to_string());
    cache_document(&connection, "user-1", &document, "rev-1").unwrap();

    let (loaded, revision) = load_cached_document(&connection, "user-1").unwrap().unwrap();
    assert_eq!(loaded, document);
    assert_eq!(revision, "rev-1");

    document.collection_order.push("Chrome".to_string());
    cache_document(&connection, "user-1", &document, "rev-2").unwrap();
    let (loaded, revision) = load_cached_document(&connection, "user-1").unwrap().unwrap();
    assert_eq!(loaded.collection_order.len(), 2);
    assert_eq!(revision, "rev-2");

    assert!(load_cached_document(&connection, "user-9").unwrap().is_none());
  }
}
