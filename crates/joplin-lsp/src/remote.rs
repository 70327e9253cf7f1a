//! Typed HTTP client for the Joplin Data API.

use std::sync::Arc;

use async_trait::async_trait;
use joplin_core::{ApiConfig, Folder, Note, NoteDraft, NoteUpdate, Page, RemoteClient, RemoteError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const PING_REPLY: &str = "JoplinClipperServer";
const FOLDER_FIELDS: &str = "id,parent_id,title";
const NOTE_FIELDS: &str = "id,parent_id,title,is_todo,body";
const SUMMARY_FIELDS: &str = "id,parent_id,title,is_todo";
/// Upper bound on pages drained from one listing
const MAX_PAGES: u32 = 1000;

/// Builds the remote client of a session
pub trait Connector: Send + Sync {
    fn connect(&self, api: &ApiConfig, token: &str) -> Arc<dyn RemoteClient>;
}

pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, api: &ApiConfig, token: &str) -> Arc<dyn RemoteClient> {
        Arc::new(JoplinClient::new(&api.base_url, token))
    }
}

pub struct JoplinClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

// ── Data API wire types ─────────────────────────────

/// Listings come paginated, older servers send a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

/// Folder as sent by `/folders`, sub-folders may be nested under `children`
#[derive(Debug, Deserialize)]
struct WireFolder {
    id: String,
    #[serde(default)]
    parent_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    children: Vec<WireFolder>,
}

impl WireFolder {
    fn flatten_into(self, out: &mut Vec<Folder>) {
        out.push(Folder {
            id: self.id,
            parent_id: self.parent_id,
            title: self.title,
        });
        for child in self.children {
            child.flatten_into(out);
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateNoteBody<'a> {
    title: &'a str,
    parent_id: &'a str,
    is_todo: u8,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateNoteBody<'a> {
    title: &'a str,
    body: &'a str,
}

// ── Client impl ─────────────────────────────────────

impl JoplinClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let resp = self
            .client
            .get(self.url(path))
            .query(&[("token", self.token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::Http(format!("GET {} failed: {}", path, e)))?;

        decode(path, resp).await
    }

    /// Drain every page of a listing
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let listing: Listing<T> = self
                .get_json(
                    path,
                    &[("fields", fields.to_string()), ("page", page.to_string())],
                )
                .await?;

            match listing {
                Listing::Paged(Page { items: batch, has_more }) => {
                    items.extend(batch);
                    match next_page(path, page, has_more, MAX_PAGES)? {
                        Some(next) => page = next,
                        None => break,
                    }
                }
                Listing::Plain(all) => {
                    items.extend(all);
                    break;
                }
            }
        }

        log::debug!("{}: {} items over {} pages", path, items.len(), page);
        Ok(items)
    }
}

/// Page to request after `page`, `None` once the listing is complete
fn next_page(path: &str, page: u32, has_more: bool, max_pages: u32) -> Result<Option<u32>, RemoteError> {
    if !has_more {
        return Ok(None);
    }
    if page >= max_pages {
        return Err(RemoteError::Decode(format!(
            "{}: still has_more after {} pages",
            path, max_pages
        )));
    }
    Ok(Some(page + 1))
}

async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T, RemoteError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(RemoteError::Unauthorized);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(format!("{}: {}", path, e)))
}

#[async_trait]
impl RemoteClient for JoplinClient {
    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError> {
        let wire: Vec<WireFolder> = self.get_all("/folders", FOLDER_FIELDS).await?;
        let mut folders = Vec::new();
        for folder in wire {
            folder.flatten_into(&mut folders);
        }
        Ok(folders)
    }

    async fn list_notes_by_folder(&self, folder_id: &str) -> Result<Vec<Note>, RemoteError> {
        self.get_all(&format!("/folders/{}/notes", folder_id), NOTE_FIELDS)
            .await
    }

    async fn list_notes(&self) -> Result<Vec<Note>, RemoteError> {
        self.get_all("/notes", SUMMARY_FIELDS).await
    }

    async fn get_note(&self, note_id: &str) -> Result<Note, RemoteError> {
        self.get_json(
            &format!("/notes/{}", note_id),
            &[("fields", NOTE_FIELDS.to_string())],
        )
        .await
    }

    async fn create_note(&self, draft: NoteDraft) -> Result<Note, RemoteError> {
        let body = CreateNoteBody {
            title: &draft.title,
            parent_id: &draft.parent_id,
            is_todo: u8::from(draft.is_todo),
            body: &draft.body,
        };

        let resp = self
            .client
            .post(self.url("/notes"))
            .query(&[("token", self.token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Http(format!("POST /notes failed: {}", e)))?;

        let mut note: Note = decode("/notes", resp).await?;
        if note.body.is_empty() {
            note.body = draft.body;
        }
        Ok(note)
    }

    async fn update_note(&self, update: NoteUpdate) -> Result<Note, RemoteError> {
        let path = format!("/notes/{}", update.id);
        let body = UpdateNoteBody {
            title: &update.title,
            body: &update.body,
        };

        let resp = self
            .client
            .put(self.url(&path))
            .query(&[("token", self.token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Http(format!("PUT {} failed: {}", path, e)))?;

        let mut note: Note = decode(&path, resp).await?;
        if note.body.is_empty() {
            note.body = update.body;
        }
        Ok(note)
    }

    /// Service reachable and token accepted
    async fn ping(&self) -> Result<bool, RemoteError> {
        let resp = self
            .client
            .get(self.url("/ping"))
            .send()
            .await
            .map_err(|e| RemoteError::Http(format!("Ping failed: {}", e)))?;
        let reply = resp.text().await.unwrap_or_default();
        if reply.trim() != PING_REPLY {
            return Ok(false);
        }

        let probe: Result<Listing<serde_json::Value>, RemoteError> = self
            .get_json("/folders", &[("fields", "id".to_string()), ("limit", "1".to_string())])
            .await;
        match probe {
            Ok(_) => Ok(true),
            Err(RemoteError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_folders_are_flattened() {
        let wire: Vec<WireFolder> = serde_json::from_str(
            r#"[{"id":"A","parent_id":"","title":"Work","children":[
                   {"id":"S","parent_id":"A","title":"Projects"}]},
                {"id":"B","title":"Home"}]"#,
        )
        .unwrap();

        let mut folders = Vec::new();
        for folder in wire {
            folder.flatten_into(&mut folders);
        }
        let ids: Vec<(&str, &str)> = folders
            .iter()
            .map(|f| (f.id.as_str(), f.parent_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("A", ""), ("S", "A"), ("B", "")]);
    }

    #[test]
    fn test_listing_accepts_pages_and_arrays() {
        let paged: Listing<Note> = serde_json::from_str(
            r#"{"items":[{"id":"n1","parent_id":"A","title":"t","is_todo":1}],"has_more":true}"#,
        )
        .unwrap();
        match paged {
            Listing::Paged(page) => {
                assert!(page.has_more);
                assert!(page.items[0].is_todo);
            }
            Listing::Plain(_) => panic!("Expected a page"),
        }

        let plain: Listing<Note> = serde_json::from_str(r#"[{"id":"n1"}]"#).unwrap();
        assert!(matches!(plain, Listing::Plain(items) if items.len() == 1));
    }

    #[test]
    fn test_pagination_stops_at_page_cap() {
        assert_eq!(next_page("/notes", 1, true, 3).unwrap(), Some(2));
        assert_eq!(next_page("/notes", 2, false, 3).unwrap(), None);
        assert_eq!(next_page("/notes", 3, false, 3).unwrap(), None);

        // A server that never stops answering has_more
        let err = next_page("/notes", 3, true, 3).unwrap_err();
        assert!(matches!(err, RemoteError::Decode(msg) if msg.contains("3 pages")));
        assert!(next_page("/folders", MAX_PAGES, true, MAX_PAGES).is_err());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = JoplinClient::new("http://localhost:41184/", "secret");
        assert_eq!(client.url("/ping"), "http://localhost:41184/ping");
    }
}
