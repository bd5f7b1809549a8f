use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::{AppError, Result};
use crate::models::{ArticleDraft, ArticleUpdate, Identity};

const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(app: App) -> Router {
    let upload_limit = app.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/articles", get(list_articles).post(create_article))
        .route(
            "/api/articles/{id}",
            get(get_article).patch(update_article).delete(delete_article),
        )
        .route("/api/articles/{id}/views", post(record_view))
        .route("/api/summary", get(run_summary_sweep))
        .route(
            "/api/uploads",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn current_caller(app: &App, headers: &HeaderMap) -> Result<Option<Identity>> {
    app.identity.current_caller(bearer_token(headers)).await
}

async fn list_articles(State(app): State<App>) -> Result<impl IntoResponse> {
    let articles = app.articles.list_all().await?;
    Ok(Json(articles))
}

async fn create_article(
    State(app): State<App>,
    headers: HeaderMap,
    Json(draft): Json<ArticleDraft>,
) -> Result<impl IntoResponse> {
    let caller = current_caller(&app, &headers).await?;
    let id = app.articles.create(caller.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_article(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let article = app.articles.get_by_id(id).await?.ok_or(AppError::NotFound)?;

    // Identity lookups only decide whether to offer editing here.
    let can_edit = match current_caller(&app, &headers).await {
        Ok(Some(caller)) => app.articles.can_edit(&caller.id, id).await,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("Could not resolve caller for article {}: {}", id, e);
            false
        }
    };

    Ok(Json(json!({ "article": article, "can_edit": can_edit })))
}

async fn update_article(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(update): Json<ArticleUpdate>,
) -> Result<impl IntoResponse> {
    let caller = current_caller(&app, &headers).await?;
    app.articles.update(caller.as_ref(), id, update).await?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_article(
    State(app): State<App>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let caller = current_caller(&app, &headers).await?;
    app.articles.delete(caller.as_ref(), id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn record_view(State(app): State<App>, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let pageviews = app.pageviews.record_view(id).await?;
    Ok(Json(json!({ "pageviews": pageviews })))
}

async fn run_summary_sweep(
    State(app): State<App>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    if !app.config.development {
        let expected = app.config.cron_secret.as_deref();
        match (expected, bearer_token(&headers)) {
            (Some(secret), Some(token)) if secret == token => {}
            _ => return Err(AppError::Unauthorized),
        }
    }

    let updated = app.articles.summarize_missing().await?;
    Ok(Json(json!({ "ok": true, "updated": updated })))
}

async fn upload_file(
    State(app): State<App>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let caller = current_caller(&app, &headers).await?;
    if caller.is_none() {
        return Err(AppError::Unauthorized);
    }

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let uploaded = app
            .uploads
            .upload(caller.as_ref(), &filename, content_type.as_deref(), data)
            .await?;
        return Ok(Json(uploaded));
    }

    Err(AppError::InvalidUpload("No file provided".to_string()))
}
