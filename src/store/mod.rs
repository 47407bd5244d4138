//! Document and workspace storage collaborator.
//!
//! The gateway never touches storage directly; it goes through
//! [`DocumentStore`]. [`PlaceholderStore`] mints identifiers and reports
//! empty listings until a real backend is wired in.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkspaceHandle {
    pub workspace_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkspaceSummary {
    pub workspace_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentHandle {
    pub document_id: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
}

/// A validated upload on its way to storage.
#[derive(Debug, Clone, Copy)]
pub struct NewDocument<'a> {
    pub workspace_id: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub contents: &'a [u8],
    pub metadata: &'a Value,
}

pub trait DocumentStore: Send + Sync {
    fn create_workspace<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<WorkspaceHandle, StoreError>>;

    fn list_workspaces<'a>(
        &'a self,
        owner: &'a str,
    ) -> BoxFuture<'a, Result<Vec<WorkspaceSummary>, StoreError>>;

    fn store_document<'a>(
        &'a self,
        owner: &'a str,
        document: NewDocument<'a>,
    ) -> BoxFuture<'a, Result<DocumentHandle, StoreError>>;

    fn list_documents<'a>(
        &'a self,
        owner: &'a str,
        workspace_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DocumentSummary>, StoreError>>;

    fn delete_document<'a>(
        &'a self,
        owner: &'a str,
        document_id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Whether a persistent backend is attached (reported by `/health`).
    fn is_persistent(&self) -> bool {
        false
    }
}

/// Accepts every write and remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderStore;

impl DocumentStore for PlaceholderStore {
    fn create_workspace<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<WorkspaceHandle, StoreError>> {
        Box::pin(async move {
            let handle = WorkspaceHandle {
                workspace_id: format!("ws_{}", Uuid::new_v4().simple()),
                created_at: Utc::now(),
            };
            tracing::debug!(owner, name, workspace_id = %handle.workspace_id, "Placeholder workspace created");
            Ok(handle)
        })
    }

    fn list_workspaces<'a>(
        &'a self,
        _owner: &'a str,
    ) -> BoxFuture<'a, Result<Vec<WorkspaceSummary>, StoreError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn store_document<'a>(
        &'a self,
        owner: &'a str,
        document: NewDocument<'a>,
    ) -> BoxFuture<'a, Result<DocumentHandle, StoreError>> {
        Box::pin(async move {
            // Extraction, chunking and indexing belong to the storage backend.
            let handle = DocumentHandle {
                document_id: format!("doc_{}", Uuid::new_v4().simple()),
                uploaded_at: Utc::now(),
            };
            tracing::debug!(
                owner,
                workspace_id = document.workspace_id,
                filename = document.filename,
                size = document.contents.len(),
                document_id = %handle.document_id,
                "Placeholder document stored"
            );
            Ok(handle)
        })
    }

    fn list_documents<'a>(
        &'a self,
        _owner: &'a str,
        _workspace_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<DocumentSummary>, StoreError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn delete_document<'a>(
        &'a self,
        _owner: &'a str,
        _document_id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_placeholder_ids() {
        let store = PlaceholderStore;
        let ws = store.create_workspace("u1", "Cardiology").await.unwrap();
        assert!(ws.workspace_id.starts_with("ws_"));
        let other = store.create_workspace("u1", "Cardiology").await.unwrap();
        assert_ne!(ws.workspace_id, other.workspace_id);

        let metadata = json!({});
        let doc = store
            .store_document(
                "u1",
                NewDocument {
                    workspace_id: &ws.workspace_id,
                    filename: "a.txt",
                    content_type: "text/plain",
                    contents: b"hello",
                    metadata: &metadata,
                },
            )
            .await
            .unwrap();
        assert!(doc.document_id.starts_with("doc_"));

        assert!(store.list_workspaces("u1").await.unwrap().is_empty());
        assert!(store.list_documents("u1", &ws.workspace_id).await.unwrap().is_empty());
        assert!(store.delete_document("u1", &doc.document_id).await.is_ok());
        assert!(!store.is_persistent());
    }
}
