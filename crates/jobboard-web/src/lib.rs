//! Axum + Askama web UI for the job board: listing, filter partial and the
//! ingestion trigger.

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use jobboard_core::JobPosting;
use jobboard_storage::{JobStore, PgJobStore};
use jobboard_sync::{format_display_date, maybe_build_scheduler, IngestConfig, IngestService};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

pub const CRATE_NAME: &str = "jobboard-web";

const THEME_COOKIE: &str = "theme";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub ingest: Arc<IngestService>,
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(ingest: Arc<IngestService>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            store: ingest.store().clone(),
            ingest,
            workspace_root: workspace_root.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
            Theme::System => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }

    /// Theme from the request's `theme` cookie; unknown or missing means system.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == THEME_COOKIE)
            .map(|(_, value)| value.trim());
        match value {
            Some("light") => Theme::Light,
            Some("dark") => Theme::Dark,
            _ => Theme::System,
        }
    }
}

/// One listing row as rendered in the table.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub company: String,
    pub title: String,
    pub url: String,
    pub date_posted: String,
}

impl From<&JobPosting> for JobRow {
    fn from(job: &JobPosting) -> Self {
        Self {
            id: job.id.to_string(),
            company: job.company.clone(),
            title: job.title.clone(),
            url: job.url.clone(),
            date_posted: format_display_date(job.pub_date),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct JobsQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct PullJobsResponse {
    message: &'static str,
    run_id: String,
    persisted: usize,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    theme: &'static str,
    theme_label: &'static str,
    filter: String,
    jobs: Vec<JobRow>,
    total_jobs: usize,
}

#[derive(Template)]
#[template(path = "jobs_table_partial.html")]
struct JobsTablePartialTemplate {
    filter: String,
    jobs: Vec<JobRow>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/jobs/table", get(jobs_table_handler))
        .route("/api/jobs", get(jobs_json_handler))
        .route("/api/pull-jobs", get(pull_jobs_handler).post(pull_jobs_handler))
        .route("/theme", post(theme_toggle_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = IngestConfig::from_env();
    let store = PgJobStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;
    let ingest = Arc::new(IngestService::from_config(&config, Arc::new(store)).await?);

    let scheduler = maybe_build_scheduler(&config, ingest.clone()).await?;
    if let Some(sched) = &scheduler {
        sched.start().await?;
        info!(cron = %config.pull_cron, "pull scheduler started");
    }

    let state = AppState::new(ingest, config.workspace_root.clone());
    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "serving job board");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Case-insensitive substring match over title and description. The filter
/// is used as typed, surrounding whitespace included; an empty filter keeps
/// everything.
pub fn filter_postings(postings: Vec<JobPosting>, filter: &str) -> Vec<JobPosting> {
    let needle = filter.to_lowercase();
    if needle.is_empty() {
        return postings;
    }
    postings
        .into_iter()
        .filter(|job| {
            job.title.to_lowercase().contains(&needle)
                || job.description.to_lowercase().contains(&needle)
        })
        .collect()
}

async fn load_filtered(
    store: &dyn JobStore,
    filter: &str,
) -> anyhow::Result<(Vec<JobPosting>, usize)> {
    let all = store.list_all().await?;
    let total = all.len();
    Ok((filter_postings(all, filter), total))
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<JobsQuery>,
) -> Response {
    let filter = query.q.unwrap_or_default();
    let theme = Theme::from_headers(&headers);
    match load_filtered(state.store.as_ref(), &filter).await {
        Ok((jobs, total_jobs)) => render_html(IndexTemplate {
            theme: theme.as_str(),
            theme_label: theme.label(),
            filter,
            jobs: jobs.iter().map(JobRow::from).collect(),
            total_jobs,
        }),
        Err(err) => server_error(err),
    }
}

async fn jobs_table_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Response {
    let filter = query.q.unwrap_or_default();
    match load_filtered(state.store.as_ref(), &filter).await {
        Ok((jobs, _total)) => {
            let mut resp = render_html(JobsTablePartialTemplate {
                filter,
                jobs: jobs.iter().map(JobRow::from).collect(),
            });
            resp.headers_mut().insert(
                header::HeaderName::from_static("hx-trigger"),
                header::HeaderValue::from_static("jobsTableLoaded"),
            );
            resp
        }
        Err(err) => server_error(err),
    }
}

async fn jobs_json_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Response {
    let filter = query.q.unwrap_or_default();
    match load_filtered(state.store.as_ref(), &filter).await {
        Ok((jobs, _total)) => Json(jobs).into_response(),
        Err(err) => server_error(err),
    }
}

async fn pull_jobs_handler(State(state): State<Arc<AppState>>) -> Response {
    let summary = state.ingest.run_once().await;
    let run_id = summary.run_id.to_string();
    let persisted = summary.persisted();
    if summary.is_success() {
        Json(PullJobsResponse {
            message: "Jobs pulled successfully",
            run_id,
            persisted,
        })
        .into_response()
    } else {
        error!(run_id = %run_id, failed = ?summary.failed_sources(), "error pulling jobs");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PullJobsResponse {
                message: "Error pulling jobs",
                run_id,
                persisted,
            }),
        )
            .into_response()
    }
}

async fn theme_toggle_handler(headers: HeaderMap) -> Response {
    let next = Theme::from_headers(&headers).next();
    let cookie = format!(
        "{THEME_COOKIE}={}; Path=/; Max-Age=31536000; SameSite=Lax",
        next.as_str()
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
