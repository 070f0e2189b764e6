//! A runnable sample application: one "notes" workspace (id/title/body/tags/done/
//! created_at) mirrored to both SQLite and markdown, with five actions (`list`, `get`,
//! `create`, `update`, `delete`).
//!
//! The core crate is a library with no concrete workspace of its own — the CLI and
//! server binaries need *something* to drive, so this module plays the role the
//! teacher's binary gets from `eidetica::Instance::open` against a real user database:
//! a minimal, concrete host application wired the way §2's "application composes one
//! or more workspaces" describes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use epicenter_core::action::{define_mutation, define_query, ActionContext, ActionError, ActionSet};
use epicenter_core::config::EpicenterConfig;
use epicenter_core::date::DateTimeTz;
use epicenter_core::epicenter::Epicenter;
use epicenter_core::field::{self, Value};
use epicenter_core::provider::PersistenceProvider;
use epicenter_core::schema::{TableSchema, WorkspaceSchema};
use epicenter_core::table::RowStatus;
use epicenter_core::workspace::Workspace;

use epicenter_markdown::{MarkdownMaterializer, TableMarkdownConfig};
use epicenter_server::BroadcastSyncProvider;
use epicenter_sqlite::SqliteMaterializer;

#[derive(serde::Serialize)]
struct Note {
    id: String,
    title: String,
    body: String,
    tags: Vec<String>,
    done: bool,
    created_at: String,
}

fn row_to_note(row: &HashMap<String, Value>) -> Note {
    Note {
        id: row.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        title: row.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        body: row.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        tags: row.get("tags").and_then(Value::as_tags).map(|t| t.to_vec()).unwrap_or_default(),
        done: row.get("done").and_then(Value::as_bool).unwrap_or(false),
        created_at: match row.get("created_at") {
            Some(Value::Date(d)) => d.to_canonical_string(),
            _ => String::new(),
        },
    }
}

#[derive(serde::Deserialize, Default)]
struct ListNotesInput {
    done: Option<bool>,
}

async fn list_notes(input: ListNotesInput, ctx: ActionContext) -> Result<Vec<Note>, ActionError> {
    let rows = ctx.table("notes").filter(|row| match input.done {
        Some(want) => row.get("done").and_then(Value::as_bool) == Some(want),
        None => true,
    });
    Ok(rows.iter().map(row_to_note).collect())
}

#[derive(serde::Deserialize)]
struct GetNoteInput {
    id: String,
}

async fn get_note(input: GetNoteInput, ctx: ActionContext) -> Result<Note, ActionError> {
    match ctx.table("notes").get(&input.id) {
        RowStatus::Valid(row) => Ok(row_to_note(&row)),
        RowStatus::Invalid { reason } => Err(ActionError::validation_failed(reason)),
        RowStatus::Absent => Err(ActionError::row_not_found("notes", &input.id)),
    }
}

#[derive(serde::Deserialize)]
struct CreateNoteInput {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_note(input: CreateNoteInput, ctx: ActionContext) -> Result<Note, ActionError> {
    let mut row = HashMap::new();
    row.insert("id".to_string(), Value::Id(epicenter_core::id::generate()));
    row.insert("title".to_string(), Value::Text(input.title));
    row.insert("body".to_string(), Value::RichText(input.body));
    row.insert("tags".to_string(), Value::Tags(input.tags));
    row.insert("done".to_string(), Value::Boolean(false));
    row.insert("created_at".to_string(), Value::Date(DateTimeTz::new(Utc::now(), "UTC")));
    ctx.table("notes").insert(row.clone()).await?;
    Ok(row_to_note(&row))
}

#[derive(serde::Deserialize)]
struct UpdateNoteInput {
    id: String,
    title: Option<String>,
    body: Option<String>,
    tags: Option<Vec<String>>,
    done: Option<bool>,
}

async fn update_note(input: UpdateNoteInput, ctx: ActionContext) -> Result<Note, ActionError> {
    let mut patch = HashMap::new();
    if let Some(title) = input.title {
        patch.insert("title".to_string(), Value::Text(title));
    }
    if let Some(body) = input.body {
        patch.insert("body".to_string(), Value::RichText(body));
    }
    if let Some(tags) = input.tags {
        patch.insert("tags".to_string(), Value::Tags(tags));
    }
    if let Some(done) = input.done {
        patch.insert("done".to_string(), Value::Boolean(done));
    }
    let table = ctx.table("notes");
    table.update(&input.id, patch).await?;
    match table.get(&input.id) {
        RowStatus::Valid(row) => Ok(row_to_note(&row)),
        RowStatus::Invalid { reason } => Err(ActionError::validation_failed(reason)),
        RowStatus::Absent => Err(ActionError::row_not_found("notes", &input.id)),
    }
}

#[derive(serde::Deserialize)]
struct DeleteNoteInput {
    id: String,
}

#[derive(serde::Serialize)]
struct DeleteNoteOutput {
    id: String,
}

async fn delete_note(input: DeleteNoteInput, ctx: ActionContext) -> Result<DeleteNoteOutput, ActionError> {
    ctx.table("notes").delete(&input.id).await?;
    Ok(DeleteNoteOutput { id: input.id })
}

fn notes_actions() -> ActionSet {
    let mut actions: ActionSet = HashMap::new();
    actions.insert("list".to_string(), define_query("List notes, optionally filtered by 'done'", list_notes));
    actions.insert("get".to_string(), define_query("Read one note by id", get_note));
    actions.insert("create".to_string(), define_mutation("Create a note", create_note));
    actions.insert("update".to_string(), define_mutation("Update a note's fields", update_note));
    actions.insert("delete".to_string(), define_mutation("Delete a note by id", delete_note));
    actions
}

fn notes_schema() -> Result<WorkspaceSchema, Box<dyn std::error::Error>> {
    let table = TableSchema::builder("notes")
        .field("id", field::id())
        .field("title", field::text())
        .field("body", field::rich_text().default_value(Value::RichText(String::new())))
        .field("tags", field::tags().default_value(Value::Tags(Vec::new())))
        .field("done", field::boolean().default_value(Value::Boolean(false)))
        .field(
            "created_at",
            field::date().default_with(|| Value::Date(DateTimeTz::new(Utc::now(), "UTC"))),
        )
        .body_field("body")
        .build()?;
    Ok(WorkspaceSchema::builder().table(table)?.build())
}

/// The sample Epicenter, plus the [`BroadcastSyncProvider`] registered on each of its
/// workspaces, keyed by workspace id. `serve` hands this map to [`epicenter_server::AppState`]
/// so each workspace's `/sync/<id>` endpoint actually has someone to broadcast commits to
/// (§4.10, §4.12); a CLI-only invocation never touches it.
pub struct Demo {
    pub epicenter: Epicenter,
    pub sync_providers: HashMap<String, Arc<BroadcastSyncProvider>>,
}

/// Build the sample Epicenter: one "notes" workspace, mirrored to `notes.sqlite` and a
/// `notes/*.md` tree, persisted across restarts via [`PersistenceProvider`] and synced
/// live to any connected `/sync/notes` peer via [`BroadcastSyncProvider`].
pub fn build(config: EpicenterConfig) -> Result<Demo, Box<dyn std::error::Error>> {
    let schema = notes_schema()?;

    let sync = Arc::new(BroadcastSyncProvider::new());

    let workspace = Workspace::builder("notes", config.root(), schema)
        .materializer(SqliteMaterializer::factory("notes.sqlite", ["notes"]))
        .materializer(MarkdownMaterializer::factory([TableMarkdownConfig::new("notes")]))
        .provider(Arc::new(PersistenceProvider::new()))
        .provider(Arc::clone(&sync) as Arc<dyn epicenter_core::provider::Provider>)
        .build();

    let epicenter = Epicenter::builder(config)
        .workspace("notes", workspace, Vec::<String>::new(), notes_actions())
        .build()?;

    let mut sync_providers = HashMap::new();
    sync_providers.insert("notes".to_string(), sync);

    Ok(Demo { epicenter, sync_providers })
}
