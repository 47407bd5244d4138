//! Route handlers.
//!
//! Protected handlers receive a [`GateContext`]. Sensitive actions return
//! [`Audited`] on success and pass failures through [`audit_on_error`]; the
//! gate turns either into the action's single audit record.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, rejection::PathRejection,
        rejection::QueryRejection, Multipart, Path, Query, State,
    },
    body::Bytes,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::IssuedToken;
use crate::gate::{Audited, GateContext};
use crate::http::error::{ApiError, ValidationError};
use crate::http::server::AppState;
use crate::http::types::{
    validate_document_id, validate_workspace_id, ChatQuery, ChatResponse, DocumentMetadata,
    DocumentsQuery, HealthResponse, ServiceStatus, UploadResponse, WorkspaceCreate,
    WorkspaceResponse,
};
use crate::store::NewDocument;

pub const WORKSPACE_CREATE: &str = "workspace.create";
pub const DOCUMENT_UPLOAD: &str = "document.upload";
pub const DOCUMENT_DELETE: &str = "document.delete";
pub const CHAT_QUERY: &str = "chat.query";

/// Fixed until retrieval scoring feeds a real value.
pub const ANSWER_CONFIDENCE: f32 = 0.85;

const DEMO_SUBJECT: &str = "user_demo";
const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_ROLE: &str = "healthcare_professional";

/// Describe a failed sensitive action before handing the error back.
fn audit_on_error<T>(ctx: &GateContext, resource: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
    result.map_err(|e| {
        tracing::warn!(
            action = ctx.action().unwrap_or("none"),
            resource,
            user_id = %ctx.user_id(),
            error = %e,
            "Sensitive action failed"
        );
        ctx.note_failure(resource, json!({ "error": e.to_string() }));
        e
    })
}

/// Unwrap a JSON body and run its schema validation.
fn validated<T>(
    payload: Result<Json<T>, JsonRejection>,
    validate: impl FnOnce(T) -> Result<T, ValidationError>,
) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(validate(value)?)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        services: ServiceStatus {
            generation: state.generation.is_configured(),
            database: state.store.is_persistent(),
            cache: false,
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct DemoTokenParams {
    pub email: Option<String>,
}

/// Mint a short-lived token for local testing. 404 unless enabled.
pub async fn demo_token(
    State(state): State<AppState>,
    params: Result<Query<DemoTokenParams>, QueryRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    if !state.demo_tokens_enabled {
        return Err(ApiError::NotFound);
    }
    let Query(params) = params?;
    let email = params.email.as_deref().unwrap_or(DEMO_EMAIL);

    let token = state.issuer.issue(DEMO_SUBJECT, Some(email), Some(DEMO_ROLE))?;
    tracing::info!(subject = DEMO_SUBJECT, "Demo token issued");
    Ok(Json(token))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    ctx: GateContext,
    payload: Result<Json<WorkspaceCreate>, JsonRejection>,
) -> Result<Audited<(StatusCode, Json<WorkspaceResponse>)>, ApiError> {
    let workspace = audit_on_error(&ctx, ctx.path(), validated(payload, WorkspaceCreate::validate))?;

    let created = state
        .store
        .create_workspace(ctx.user_id(), &workspace.name)
        .await
        .map_err(ApiError::from);
    let handle = audit_on_error(&ctx, &workspace.name, created)?;

    tracing::info!(workspace_id = %handle.workspace_id, user_id = %ctx.user_id(), "Workspace created");

    let details = json!({ "name": workspace.name });
    let response = WorkspaceResponse {
        workspace_id: handle.workspace_id.clone(),
        name: workspace.name,
        description: workspace.description,
        language: workspace.language,
        cultural_context: workspace.cultural_context,
        created_at: handle.created_at.to_rfc3339(),
        user_id: ctx.user_id().to_string(),
    };
    Ok(Audited::new(
        WORKSPACE_CREATE,
        handle.workspace_id,
        details,
        (StatusCode::CREATED, Json(response)),
    ))
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    ctx: GateContext,
) -> Result<Json<Value>, ApiError> {
    let workspaces = state.store.list_workspaces(ctx.user_id()).await?;
    Ok(Json(json!({
        "total": workspaces.len(),
        "workspaces": workspaces,
        "user_id": ctx.user_id(),
    })))
}

/// Multipart fields of an upload, after schema validation.
struct UploadForm {
    file_name: String,
    content_type: String,
    contents: Bytes,
    workspace_id: String,
    metadata: DocumentMetadata,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut workspace_id = None;
    let mut metadata = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                file = Some((file_name, content_type, field.bytes().await?));
            }
            Some("workspace_id") => workspace_id = Some(field.text().await?),
            Some("metadata") => metadata = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, content_type, contents) =
        file.ok_or_else(|| ValidationError::new("file", "field required"))?;
    let workspace_id =
        workspace_id.ok_or_else(|| ValidationError::new("workspace_id", "field required"))?;
    validate_workspace_id(&workspace_id)?;

    let metadata = metadata.ok_or_else(|| ValidationError::new("metadata", "field required"))?;
    let metadata: DocumentMetadata = serde_json::from_str(&metadata)
        .map_err(|e| ValidationError::new("metadata", e.to_string()))?;

    Ok(UploadForm {
        file_name,
        content_type,
        contents,
        workspace_id,
        metadata: metadata.validate()?,
    })
}

pub async fn upload_document(
    State(state): State<AppState>,
    ctx: GateContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Audited<(StatusCode, Json<UploadResponse>)>, ApiError> {
    let form = match multipart {
        Ok(multipart) => read_upload_form(multipart).await,
        Err(rejection) => Err(rejection.into()),
    };
    let form = audit_on_error(&ctx, ctx.path(), form)?;
    let workspace_id = form.workspace_id.clone();
    let result = store_upload(&state, &ctx, form).await;
    audit_on_error(&ctx, &workspace_id, result)
}

async fn store_upload(
    state: &AppState,
    ctx: &GateContext,
    form: UploadForm,
) -> Result<Audited<(StatusCode, Json<UploadResponse>)>, ApiError> {
    let uploads = &state.uploads;
    if !uploads
        .allowed_content_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&form.content_type))
    {
        return Err(ApiError::UnsupportedMediaType(form.content_type));
    }
    if form.contents.len() > uploads.max_file_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit: uploads.max_file_bytes,
        });
    }

    let metadata = form.metadata.to_value();
    let handle = state
        .store
        .store_document(
            ctx.user_id(),
            NewDocument {
                workspace_id: &form.workspace_id,
                filename: &form.metadata.filename,
                content_type: &form.content_type,
                contents: &form.contents,
                metadata: &metadata,
            },
        )
        .await?;

    tracing::info!(
        document_id = %handle.document_id,
        workspace_id = %form.workspace_id,
        size = form.contents.len(),
        "Document uploaded"
    );

    let details = json!({
        "document_id": handle.document_id,
        "filename": form.metadata.filename,
        "file_name": form.file_name,
        "content_type": form.content_type,
        "size": form.contents.len(),
    });
    let response = UploadResponse {
        document_id: handle.document_id,
        filename: form.metadata.filename,
        workspace_id: form.workspace_id.clone(),
        status: "received",
        uploaded_at: handle.uploaded_at.to_rfc3339(),
    };
    Ok(Audited::new(
        DOCUMENT_UPLOAD,
        form.workspace_id,
        details,
        (StatusCode::CREATED, Json(response)),
    ))
}

pub async fn list_documents(
    State(state): State<AppState>,
    ctx: GateContext,
    params: Result<Query<DocumentsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    validate_workspace_id(&params.workspace_id)?;

    let documents = state
        .store
        .list_documents(ctx.user_id(), &params.workspace_id)
        .await?;
    Ok(Json(json!({
        "total": documents.len(),
        "documents": documents,
        "workspace_id": params.workspace_id,
    })))
}

pub async fn delete_document(
    State(state): State<AppState>,
    ctx: GateContext,
    document_id: Result<Path<String>, PathRejection>,
) -> Result<Audited<Json<Value>>, ApiError> {
    let document_id = audit_on_error(&ctx, ctx.path(), parse_document_id(document_id))?;

    let deleted = state
        .store
        .delete_document(ctx.user_id(), &document_id)
        .await
        .map_err(ApiError::from);
    audit_on_error(&ctx, &document_id, deleted)?;

    tracing::info!(document_id = %document_id, user_id = %ctx.user_id(), "Document deleted");
    Ok(Audited::new(
        DOCUMENT_DELETE,
        document_id.clone(),
        Value::Null,
        Json(json!({ "status": "deleted", "document_id": document_id })),
    ))
}

fn parse_document_id(document_id: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    let Path(document_id) = document_id?;
    validate_document_id(&document_id)?;
    Ok(document_id)
}

/// Prompt sent to the generation provider.
pub fn build_prompt(query: &ChatQuery) -> String {
    format!(
        "You are a helpful assistant for a healthcare platform.\n\
         Cultural context: {context}\n\
         Language: {language}\n\
         \n\
         User query: {query}\n\
         \n\
         Provide a helpful, accurate response in {language} language.",
        context = query.cultural_context.as_str(),
        language = query.language.as_str(),
        query = query.query,
    )
}

pub async fn chat_query(
    State(state): State<AppState>,
    ctx: GateContext,
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> Result<Audited<Json<ChatResponse>>, ApiError> {
    let query = audit_on_error(&ctx, ctx.path(), validated(payload, ChatQuery::validate))?;

    let prompt = build_prompt(&query);
    let generated = state
        .generation
        .generate(&prompt)
        .await
        .map_err(ApiError::from);
    let answer = audit_on_error(&ctx, &query.workspace_id, generated)?;

    let details = json!({
        "language": query.language.as_str(),
        "cultural_context": query.cultural_context.as_str(),
        "use_rag": query.use_rag,
    });
    let response = ChatResponse {
        answer,
        citations: Vec::new(),
        confidence: ANSWER_CONFIDENCE,
        language: query.language,
        model_used: state.generation.model().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    Ok(Audited::new(CHAT_QUERY, query.workspace_id, details, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::{CulturalContext, LanguageCode};

    #[test]
    fn test_prompt_carries_context_and_language() {
        let query = ChatQuery {
            query: "What is HbA1c?".to_string(),
            workspace_id: "ws_1".to_string(),
            language: LanguageCode::En,
            cultural_context: CulturalContext::Gulf,
            use_rag: true,
            include_citations: true,
        };
        let prompt = build_prompt(&query);
        assert!(prompt.contains("Cultural context: gulf\n"));
        assert!(prompt.contains("User query: What is HbA1c?\n"));
        assert!(prompt.ends_with("response in en language."));
    }
}
