//! LSP protocol handler implementations
//!
//! This module contains the `tower_lsp::LanguageServer` implementation:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_save, did_close)
//! - Completion and goto-definition over the engine
//! - The create-view workspace command

use std::path::PathBuf;

use serde_json::Value;
use tower_lsp::jsonrpc::{self, Error as JsonRpcError, Result as LspResult};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    CompletionTextEdit, DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, ExecuteCommandOptions, ExecuteCommandParams,
    GotoDefinitionParams, GotoDefinitionResponse, InitializeParams, InitializeResult, InitializedParams,
    MessageType, OneOf, Position, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::LanguageServer;
use tracing::{debug, info, warn};

use crate::completion::ContextType;
use crate::error::{NavigatorError, Result};
use crate::symbols::Category;

use super::CREATE_VIEW_COMMAND;
use super::state::{NavigatorBackend, OpenDocument};
use super::utils::{apply_change, line_at, line_range, target_location, utf16_to_byte};

impl NavigatorBackend {
    /// The line under `position` and the cursor as a byte offset within it
    fn cursor_line(&self, uri: &Url, position: Position) -> Option<(String, usize)> {
        let document = self.documents.get(uri)?;
        let line = line_at(&document.text, position.line)?.to_string();
        let cursor = utf16_to_byte(&line, position.character);
        Some((line, cursor))
    }

    fn workspace_root(&self, params: &InitializeParams) -> Option<PathBuf> {
        if let Some(root) = &self.options.root {
            return Some(root.clone());
        }
        #[allow(deprecated)]
        let root_uri = params.root_uri.clone();
        root_uri
            .or_else(|| params.workspace_folders.as_ref()?.first().map(|folder| folder.uri.clone()))
            .and_then(|uri| uri.to_file_path().ok())
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for NavigatorBackend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize from {:?}", params.client_info.as_ref().map(|c| &c.name));

        match self.workspace_root(&params) {
            Some(start) => {
                if let Some(root) = self.open_project(start).await {
                    info!("Opened Laravel project at {:?}", root);
                    self.start_file_watcher(&root);
                }
            }
            None => warn!("Client sent no workspace root; completions disabled"),
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
                definition_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        ["'", "\"", ":", ">"].iter().map(|c| c.to_string()).collect(),
                    ),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![CREATE_VIEW_COMMAND.to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("Client initialized");
        self.spawn_route_warm_up();
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        self.stop_file_watcher();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        debug!("Opened {} (version {})", document.uri, document.version);
        self.documents
            .insert(document.uri, OpenDocument { version: document.version, text: document.text });
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(mut document) = self.documents.get_mut(&uri) else {
            warn!("Change for unopened document {}", uri);
            return;
        };
        if params.text_document.version <= document.version {
            debug!("Ignoring stale change for {} (version {})", uri, params.text_document.version);
            return;
        }
        for change in params.content_changes {
            apply_change(&mut document.text, change);
        }
        document.version = params.text_document.version;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Ok(path) = params.text_document.uri.to_file_path() else {
            return;
        };
        self.with_engine(move |navigator| navigator.file_changed(&path)).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!("Closed {}", params.text_document.uri);
        self.documents.remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let paths: Vec<PathBuf> =
            params.changes.into_iter().filter_map(|change| change.uri.to_file_path().ok()).collect();
        self.with_engine(move |navigator| {
            for path in &paths {
                navigator.file_changed(path);
            }
        })
        .await;
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let Some((line, cursor)) = self.cursor_line(&uri, position) else {
            return Ok(None);
        };

        let mode = self.options.ranking;
        let Some(completions) = self.with_engine(move |navigator| navigator.complete(&line, cursor, mode)).await.flatten()
        else {
            return Ok(None);
        };

        let context = &completions.context;
        if let Some(category) = context.category() {
            self.report_failure(category).await;
        }

        // Recompute the range on the current text; the edit replaces the partial
        let Some((line, _)) = self.cursor_line(&uri, position) else {
            return Ok(None);
        };
        let range = line_range(
            &line,
            position.line,
            context.match_start,
            context.match_start + context.partial_text.len(),
        );
        let (kind, detail) = match &context.context_type {
            ContextType::Helper { category } => (CompletionItemKind::VALUE, category.to_string()),
            ContextType::StaticMethod { class } => (CompletionItemKind::METHOD, class.clone()),
            ContextType::FluentChain { .. } => (CompletionItemKind::METHOD, Category::Relationship.to_string()),
        };

        let items = completions
            .items
            .into_iter()
            .enumerate()
            .map(|(rank, name)| CompletionItem {
                label: name.clone(),
                kind: Some(kind),
                detail: Some(detail.clone()),
                sort_text: Some(format!("{:05}", rank)),
                filter_text: Some(name.clone()),
                text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text: name })),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        debug!("Returning {} completion items", items.len());
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> LspResult<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some((line, cursor)) = self.cursor_line(&uri, position) else {
            return Ok(None);
        };

        let target = self.with_engine(move |navigator| navigator.goto(&line, cursor)).await.flatten();
        Ok(target.as_ref().and_then(target_location).map(GotoDefinitionResponse::Scalar))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> LspResult<Option<Value>> {
        if params.command != CREATE_VIEW_COMMAND {
            return Err(JsonRpcError::method_not_found());
        }

        let mut arguments = params.arguments.into_iter();
        let Some(name) = arguments.next().and_then(|v| v.as_str().map(str::to_string)) else {
            return Err(JsonRpcError::invalid_params("expected a view name as the first argument"));
        };
        let chosen = arguments.next().and_then(|v| v.as_str().map(PathBuf::from));

        let created = self
            .with_engine(move |navigator| -> Result<PathBuf> {
                let path = match chosen {
                    Some(path) => path,
                    None => navigator
                        .view_candidates(&name)
                        .into_iter()
                        .next()
                        .ok_or_else(|| NavigatorError::NotACandidate { path: PathBuf::from(&name) })?,
                };
                navigator.create_view_file(&name, &path)
            })
            .await;

        match created {
            Some(Ok(path)) => {
                info!("Created view file {:?}", path);
                Ok(Url::from_file_path(&path).ok().map(|uri| Value::String(uri.to_string())))
            }
            Some(Err(e)) => {
                self.client.show_message(MessageType::ERROR, format!("Could not create view: {}", e)).await;
                Err(JsonRpcError::invalid_params(e.to_string()))
            }
            None => Err(JsonRpcError::internal_error()),
        }
    }
}
