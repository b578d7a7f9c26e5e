//! Best-effort identity extraction and the persistent device identifier.
//!
//! Page-derived fields are nullable and degrade to `None`; the device id is
//! a read-through-or-create sled value, stable across sessions.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::VigilResult;
use crate::page::PageSnapshot;

const USER_NAME_SELECTOR: &str = "[data-self-name]";
const USER_ID_SELECTOR: &str = "[data-user-id]";
const PARTICIPANT_ID_SELECTOR: &str = "[data-participant-id]";

/// Sled key under which the device identifier is persisted.
const DEVICE_ID_KEY: &str = "device_id";
const DEFAULT_VAULT_PATH: &str = "./data/vigil_vault";

/// Identity fields attached to every uploaded frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identity {
    pub meeting_id: Option<String>,
    pub user_id: Option<String>,
    pub participant_id: Option<String>,
    pub user_name: Option<String>,
    pub device_id: String,
}

impl Identity {
    /// Resolve page-derived fields plus the persisted device id.
    pub fn resolve(snapshot: &PageSnapshot, vault: &DeviceVault) -> VigilResult<Self> {
        let document = Html::parse_document(&snapshot.html);
        Ok(Self {
            meeting_id: meeting_id_from_path(snapshot.path()),
            user_id: attr_value(&document, USER_ID_SELECTOR, "data-user-id"),
            participant_id: attr_value(&document, PARTICIPANT_ID_SELECTOR, "data-participant-id"),
            user_name: text_value(&document, USER_NAME_SELECTOR),
            device_id: vault.device_id()?,
        })
    }
}

/// Meeting code: first non-empty path segment, query/fragment stripped.
fn meeting_id_from_path(path: &str) -> Option<String> {
    let end = path.find(|c| c == '?' || c == '#').unwrap_or(path.len());
    path[..end]
        .split('/')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn attr_value(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn text_value(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = document.select(&sel).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Sled-backed store for the locally generated device identifier.
pub struct DeviceVault {
    db: sled::Db,
}

impl DeviceVault {
    /// Opens the vault at `VIGIL_STORAGE_PATH` or the default path.
    pub fn open_default() -> VigilResult<Self> {
        let path =
            std::env::var("VIGIL_STORAGE_PATH").unwrap_or_else(|_| DEFAULT_VAULT_PATH.to_string());
        Self::open_path(path)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> VigilResult<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Read-through-or-create. Concurrent first reads may each mint an id;
    /// the last write wins and all later reads agree.
    pub fn device_id(&self) -> VigilResult<String> {
        if let Some(v) = self.db.get(DEVICE_ID_KEY)? {
            if let Ok(existing) = String::from_utf8(v.to_vec()) {
                if !existing.trim().is_empty() {
                    return Ok(existing);
                }
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.db.insert(DEVICE_ID_KEY, id.as_bytes())?;
        self.db.flush()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEETING_HTML: &str = r#"<html><body>
        <div data-self-name="Ada Lovelace"></div>
        <div data-user-id="ada@example.com"></div>
        <div data-participant-id="p42" data-is-muted="false"></div>
    </body></html>"#;

    fn snapshot(url: &str, html: &str) -> PageSnapshot {
        PageSnapshot {
            tab: 1,
            url: url.to_string(),
            html: html.to_string(),
            videos: Vec::new(),
        }
    }

    #[test]
    fn extracts_all_page_fields() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DeviceVault::open_path(dir.path()).unwrap();
        let snap = snapshot("https://meet.example.com/abc-defg-hij?authuser=0", MEETING_HTML);

        let id = Identity::resolve(&snap, &vault).unwrap();
        assert_eq!(id.meeting_id.as_deref(), Some("abc-defg-hij"));
        assert_eq!(id.user_id.as_deref(), Some("ada@example.com"));
        assert_eq!(id.participant_id.as_deref(), Some("p42"));
        assert_eq!(id.user_name.as_deref(), Some("Ada Lovelace"));
        assert!(!id.device_id.is_empty());
    }

    #[test]
    fn missing_fields_degrade_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let vault = DeviceVault::open_path(dir.path()).unwrap();
        let snap = snapshot("https://meet.example.com", "<html><body></body></html>");

        let id = Identity::resolve(&snap, &vault).unwrap();
        assert!(id.meeting_id.is_none());
        assert!(id.user_id.is_none());
        assert!(id.participant_id.is_none());
        assert!(id.user_name.is_none());
        assert!(!id.device_id.is_empty());
    }

    #[test]
    fn device_id_is_stable_across_reads_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let vault = DeviceVault::open_path(dir.path()).unwrap();
            let a = vault.device_id().unwrap();
            let b = vault.device_id().unwrap();
            assert_eq!(a, b);
            a
        };
        let vault = DeviceVault::open_path(dir.path()).unwrap();
        assert_eq!(vault.device_id().unwrap(), first);
    }
}
