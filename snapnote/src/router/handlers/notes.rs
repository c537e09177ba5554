//! Note actions: save, list, get, delete, update, search, domains, export

use crate::error::{Result, SnapNoteError};
use crate::notes::{NoteDraft, NoteId};
use crate::router::{parse_payload, HandlerRegistry, MessageHandler, Response, RouterContext};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Register note actions
pub fn register_note_handlers(registry: &mut HandlerRegistry) {
    registry.register(SaveNoteHandler);
    registry.register(GetNotesHandler);
    registry.register(GetNoteHandler);
    registry.register(DeleteNoteHandler);
    registry.register(UpdateNoteHandler);
    registry.register(SearchNotesHandler);
    registry.register(GetDomainsHandler);
    registry.register(ExportNotesHandler);
}

#[derive(Debug, Deserialize)]
struct SaveNoteRequest {
    #[serde(default, alias = "noteData")]
    data: Option<NoteDraft>,
}

#[derive(Debug, Default, Deserialize)]
struct UrlFilter {
    #[serde(default)]
    url: Option<String>,
}

impl UrlFilter {
    /// Blank URLs mean "no filter"
    fn as_filter(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteIdRequest {
    #[serde(default)]
    note_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateNoteRequest {
    #[serde(default)]
    note_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchNotesRequest {
    #[serde(default)]
    query: String,
    #[serde(flatten)]
    filter: UrlFilter,
}

#[derive(Debug, Deserialize)]
struct ExportNotesRequest {
    #[serde(default)]
    format: Option<String>,
}

fn required_id(raw: Option<String>) -> Result<NoteId> {
    NoteId::from_string(raw.unwrap_or_default())
}

/// `saveNote{data}` -> `{note}`
pub struct SaveNoteHandler;

#[async_trait]
impl MessageHandler for SaveNoteHandler {
    fn action(&self) -> &'static str {
        "saveNote"
    }

    fn description(&self) -> &'static str {
        "Validate and store a new note"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: SaveNoteRequest = parse_payload(payload)?;
        let draft = request
            .data
            .ok_or_else(|| SnapNoteError::InvalidRequest("Note data is required".to_string()))?;
        let note = context.store.create(draft).await?;
        Response::ok_with("note", &note)
    }
}

/// `getNotes{url?}` -> `{notes}`
pub struct GetNotesHandler;

#[async_trait]
impl MessageHandler for GetNotesHandler {
    fn action(&self) -> &'static str {
        "getNotes"
    }

    fn description(&self) -> &'static str {
        "List notes, optionally only those on the domain of a URL"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let filter: UrlFilter = parse_payload(payload)?;
        let notes = context.store.list(filter.as_filter()).await?;
        Response::ok_with("notes", &notes)
    }
}

/// `getNote{noteId}` -> `{note}`
pub struct GetNoteHandler;

#[async_trait]
impl MessageHandler for GetNoteHandler {
    fn action(&self) -> &'static str {
        "getNote"
    }

    fn description(&self) -> &'static str {
        "Fetch a single note"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: NoteIdRequest = parse_payload(payload)?;
        let note = context.store.get(&required_id(request.note_id)?).await?;
        Response::ok_with("note", &note)
    }
}

/// `deleteNote{noteId}` -> `{note}`
pub struct DeleteNoteHandler;

#[async_trait]
impl MessageHandler for DeleteNoteHandler {
    fn action(&self) -> &'static str {
        "deleteNote"
    }

    fn description(&self) -> &'static str {
        "Delete a note and return it"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: NoteIdRequest = parse_payload(payload)?;
        let note = context.store.delete(&required_id(request.note_id)?).await?;
        Response::ok_with("note", &note)
    }
}

/// `updateNote{noteId, content}` -> `{note}`
pub struct UpdateNoteHandler;

#[async_trait]
impl MessageHandler for UpdateNoteHandler {
    fn action(&self) -> &'static str {
        "updateNote"
    }

    fn description(&self) -> &'static str {
        "Replace the content of a note"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: UpdateNoteRequest = parse_payload(payload)?;
        let id = required_id(request.note_id)?;
        let note = context
            .store
            .update(&id, request.content.as_deref().unwrap_or_default())
            .await?;
        Response::ok_with("note", &note)
    }
}

/// `searchNotes{query, url?}` -> `{notes}`
pub struct SearchNotesHandler;

#[async_trait]
impl MessageHandler for SearchNotesHandler {
    fn action(&self) -> &'static str {
        "searchNotes"
    }

    fn description(&self) -> &'static str {
        "Case-insensitive search over note text and metadata"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: SearchNotesRequest = parse_payload(payload)?;
        let notes = context
            .store
            .search(&request.query, request.filter.as_filter())
            .await?;
        Response::ok_with("notes", &notes)
    }
}

/// `getDomains{}` -> `{domains}`
pub struct GetDomainsHandler;

#[async_trait]
impl MessageHandler for GetDomainsHandler {
    fn action(&self) -> &'static str {
        "getDomains"
    }

    fn description(&self) -> &'static str {
        "Distinct domains with note counts"
    }

    async fn execute(
        &self,
        _payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let domains = context.store.domains().await?;
        Response::ok_with("domains", &domains)
    }
}

/// `exportNotes{format?}` -> `{data, filename}`
pub struct ExportNotesHandler;

#[async_trait]
impl MessageHandler for ExportNotesHandler {
    fn action(&self) -> &'static str {
        "exportNotes"
    }

    fn description(&self) -> &'static str {
        "Snapshot every note as a JSON document"
    }

    async fn execute(
        &self,
        payload: Map<String, Value>,
        context: &RouterContext,
        _sender: &str,
    ) -> Result<Response> {
        let request: ExportNotesRequest = parse_payload(payload)?;
        let export = context.store.export(request.format.as_deref()).await?;
        Response::ok_with("data", &export)?.with("filename", &export.suggested_filename())
    }
}
