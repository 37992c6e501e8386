#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::NaiveDate;
use handlebars::Handlebars;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use crate::aggregate::format_amount;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::graph::{GraphOptions, sales_by_item_svg};
use crate::loader::Workbook;
use crate::table::Table;
use crate::view::{
    self, DashboardCriteria, INVENTORY_EXPORT, InventoryView, Panel, SALES_EXPORT,
    SALES_XLSX_EXPORT, SalesView,
};

const SESSION_COOKIE: &str = "session";
const UPLOAD_FIELD: &str = "workbook";
const NO_WORKBOOK: &str = "Please upload a workbook to get started.";

/// One visitor's uploaded workbook
#[derive(Clone)]
pub struct Session {
    pub workbook: Arc<Workbook>,
    pub file_name: String,
    pub expires_at: SystemTime,
}

pub struct AppState {
    config: DashboardConfig,
    sessions: RwLock<HashMap<String, Session>>,
    templates: Handlebars<'static>,
}

impl AppState {
    fn session(&self, jar: &CookieJar) -> Option<Session> {
        let id = jar.get(SESSION_COOKIE)?.value().to_string();
        let sessions = self.sessions.read().ok()?;
        sessions
            .get(&id)
            .filter(|session| session.expires_at > SystemTime::now())
            .cloned()
    }

    /// Store a workbook under a freshly minted session id
    ///
    /// The visitor's previous session, if any, is dropped. Ids presented by
    /// the client are never adopted.
    fn store(&self, jar: &CookieJar, workbook: Workbook, file_name: String) -> String {
        let id = Uuid::new_v4().to_string();
        let expires_at = SystemTime::now() + Duration::from_secs(self.config.session_ttl_secs);

        match self.sessions.write() {
            Ok(mut sessions) => {
                if let Some(old) = jar.get(SESSION_COOKIE) {
                    sessions.remove(old.value());
                }
                let now = SystemTime::now();
                let before = sessions.len();
                sessions.retain(|_, s| s.expires_at > now);
                if sessions.len() < before {
                    info!("expired {} sessions", before - sessions.len());
                }
                sessions.insert(
                    id.clone(),
                    Session {
                        workbook: Arc::new(workbook),
                        file_name,
                        expires_at,
                    },
                );
                info!("new session {}", id);
            }
            Err(_) => warn!("session store is poisoned; upload not kept"),
        }
        id
    }
}

/// Query parameters shared by the page, the JSON API and the downloads
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    serial: String,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    status: Vec<String>,
    start: Option<String>,
    end: Option<String>,
}

impl ViewQuery {
    fn criteria(&self) -> DashboardCriteria {
        DashboardCriteria {
            serial: self.serial.trim().to_string(),
            origin: self.origin.trim().to_string(),
            size: self.size.trim().to_string(),
            statuses: self.selected_statuses().map(String::from).collect(),
            start: parse_day(self.start.as_deref()),
            end: parse_day(self.end.as_deref()),
        }
    }

    /// Re-encode the criteria so download links export what is on screen
    fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in [("serial", &self.serial), ("origin", &self.origin), ("size", &self.size)] {
            if !value.trim().is_empty() {
                pairs.push(format!("{}={}", key, urlencoding::encode(value.trim())));
            }
        }
        for status in self.selected_statuses() {
            pairs.push(format!("status={}", urlencoding::encode(status)));
        }
        for (key, value) in [("start", &self.start), ("end", &self.end)] {
            if let Some(day) = parse_day(value.as_deref()) {
                pairs.push(format!("{}={}", key, day.format("%Y-%m-%d")));
            }
        }
        pairs.join("&")
    }
}

impl ViewQuery {
    /// Status checkboxes with blank values dropped
    fn selected_statuses(&self) -> impl Iterator<Item = &str> {
        self.status.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

fn parse_day(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), "%Y-%m-%d").ok()
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// Build the router with its shared state
pub fn router(config: DashboardConfig) -> Result<Router> {
    let mut templates = Handlebars::new();
    templates
        .register_template_string("dashboard", include_str!("./static/dashboard.hbs"))
        .map_err(|e| DashboardError::Config(format!("dashboard template: {}", e)))?;

    let max_upload = config.max_upload_bytes;
    let state = Arc::new(AppState {
        config,
        sessions: RwLock::new(HashMap::new()),
        templates,
    });

    Ok(Router::new()
        .route("/", get(serve_dashboard))
        .route("/upload", post(upload_workbook))
        .route("/api/view", get(get_view))
        .route("/download/filtered_inventory.csv", get(download_inventory_csv))
        .route("/download/sales_report.csv", get(download_sales_csv))
        .route("/download/sales_report.xlsx", get(download_sales_xlsx))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(middleware::map_response_with_state(state.clone(), payload_too_large))
        .with_state(state))
}

/// Replace the body limit's bare 413 with the dashboard page
async fn payload_too_large(State(state): State<Arc<AppState>>, response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    let limit = state.config.max_upload_bytes;
    warn!("rejected upload over the {} byte limit", limit);
    let message = format!(
        "The file is too large. Uploads are limited to {}.",
        describe_bytes(limit)
    );
    render_page(
        &state,
        None,
        &ViewQuery::default(),
        Some(&message),
        StatusCode::PAYLOAD_TOO_LARGE,
    )
}

fn describe_bytes(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

pub async fn run(config: DashboardConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr.clone();
    let app = router(config)?;

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    let session = state.session(&jar);
    render_page(&state, session.as_ref(), &query, None, StatusCode::OK)
}

async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some(UPLOAD_FIELD) {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("workbook").to_string();
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => upload = Some((file_name, bytes)),
                    Ok(_) => {}
                    Err(e) => return upload_error(&state, &format!("Upload failed: {}", e)),
                }
            }
            Ok(None) => break,
            Err(e) => return upload_error(&state, &format!("Upload failed: {}", e)),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return upload_error(&state, NO_WORKBOOK);
    };

    match Workbook::from_bytes(&bytes) {
        Ok(workbook) => {
            info!(
                "loaded \"{}\" ({} bytes, sheets: {:?})",
                file_name,
                bytes.len(),
                workbook.sheet_names()
            );
            let id = state.store(&jar, workbook, file_name);
            let cookie = Cookie::build((SESSION_COOKIE, id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!("rejected upload \"{}\": {}", file_name, e);
            upload_error(&state, &e.to_string())
        }
    }
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    match state.session(&jar) {
        Some(session) => {
            Json(view::render(&session.workbook, &query.criteria(), &state.config)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(NO_WORKBOOK.to_string()),
            }),
        )
            .into_response(),
    }
}

async fn download_inventory_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    export(&state, &jar, &query, INVENTORY_EXPORT, "text/csv; charset=utf-8", view::inventory_csv)
}

async fn download_sales_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    export(&state, &jar, &query, SALES_EXPORT, "text/csv; charset=utf-8", view::sales_csv)
}

async fn download_sales_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    export(
        &state,
        &jar,
        &query,
        SALES_XLSX_EXPORT,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        view::sales_xlsx,
    )
}

fn export(
    state: &AppState,
    jar: &CookieJar,
    query: &ViewQuery,
    file_name: &str,
    content_type: &str,
    build: fn(&Workbook, &DashboardCriteria, &DashboardConfig) -> Result<Vec<u8>>,
) -> Response {
    let Some(session) = state.session(jar) else {
        return (StatusCode::NOT_FOUND, NO_WORKBOOK).into_response();
    };

    match build(&session.workbook, &query.criteria(), &state.config) {
        Ok(bytes) => {
            info!("exporting {} ({} bytes)", file_name, bytes.len());
            (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file_name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            warn!("export of {} failed: {}", file_name, e);
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

fn upload_error(state: &AppState, message: &str) -> Response {
    render_page(state, None, &ViewQuery::default(), Some(message), StatusCode::BAD_REQUEST)
}

fn render_page(
    state: &AppState,
    session: Option<&Session>,
    query: &ViewQuery,
    error: Option<&str>,
    status: StatusCode,
) -> Response {
    let context = match session {
        Some(session) => {
            let view = view::render(&session.workbook, &query.criteria(), &state.config);
            PageContext::new(state, session, query, view)
        }
        None => PageContext::empty(query),
    };
    let context = PageContext {
        error: error.map(str::to_string),
        ..context
    };

    match state.templates.render("dashboard", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            warn!("{}", DashboardError::from(e));
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not render the dashboard").into_response()
        }
    }
}

#[derive(Serialize)]
struct PageContext {
    has_workbook: bool,
    file_name: Option<String>,
    error: Option<String>,
    serial: String,
    origin: String,
    size: String,
    query_string: String,
    inventory: Option<PanelContext>,
    sales: Option<PanelContext>,
}

/// A panel flattened into strings for the template
#[derive(Serialize, Default)]
struct PanelContext {
    ready: bool,
    message: Option<String>,
    sheet: String,
    notices: Vec<String>,
    status_options: Vec<StatusOption>,
    detected_columns: Vec<String>,
    date_column: Option<String>,
    min_date: Option<String>,
    max_date: Option<String>,
    start: Option<String>,
    end: Option<String>,
    total_display: Option<String>,
    by_item: Vec<ItemRow>,
    chart_svg: Option<String>,
    shown_rows: usize,
    total_rows: usize,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct StatusOption {
    value: String,
    selected: bool,
}

#[derive(Serialize)]
struct ItemRow {
    item: String,
    amount: String,
}

impl PageContext {
    fn empty(query: &ViewQuery) -> Self {
        PageContext {
            has_workbook: false,
            file_name: None,
            error: None,
            serial: query.serial.clone(),
            origin: query.origin.clone(),
            size: query.size.clone(),
            query_string: query.to_query_string(),
            inventory: None,
            sales: None,
        }
    }

    fn new(state: &AppState, session: &Session, query: &ViewQuery, view: view::DashboardView) -> Self {
        PageContext {
            has_workbook: true,
            file_name: Some(session.file_name.clone()),
            inventory: Some(inventory_context(view.inventory)),
            sales: Some(sales_context(state, view.sales)),
            ..PageContext::empty(query)
        }
    }
}

fn table_context(context: &mut PanelContext, table: &Table) {
    context.shown_rows = table.len();
    context.columns = table.columns.clone();
    context.rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
}

fn inventory_context(panel: Panel<InventoryView>) -> PanelContext {
    match panel {
        Panel::Ready(view) => {
            let mut context = PanelContext {
                ready: true,
                sheet: view.sheet,
                notices: view.notices,
                total_rows: view.total_rows,
                status_options: view
                    .status_options
                    .into_iter()
                    .map(|value| StatusOption {
                        selected: view.selected_statuses.contains(&value),
                        value,
                    })
                    .collect(),
                ..Default::default()
            };
            table_context(&mut context, &view.table);
            context
        }
        Panel::Unavailable { message } => PanelContext {
            message: Some(message),
            ..Default::default()
        },
    }
}

fn sales_context(state: &AppState, panel: Panel<SalesView>) -> PanelContext {
    match panel {
        Panel::Ready(view) => {
            let options = GraphOptions {
                width: state.config.chart_width,
                height: state.config.chart_height,
                ..Default::default()
            };
            let mut notices = view.notices;
            let chart_svg = match sales_by_item_svg(&view.by_item, &options) {
                Ok(svg) => svg,
                Err(e) => {
                    warn!("{}", e);
                    notices.push("The sales chart could not be drawn.".to_string());
                    None
                }
            };
            let day = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string());

            let mut context = PanelContext {
                ready: true,
                sheet: view.sheet,
                notices,
                detected_columns: view.columns,
                date_column: view.date_column,
                min_date: day(view.min_date),
                max_date: day(view.max_date),
                start: day(view.start),
                end: day(view.end),
                total_display: view.total_display,
                by_item: view
                    .by_item
                    .iter()
                    .map(|t| ItemRow {
                        item: if t.item.is_empty() { "(blank)".to_string() } else { t.item.clone() },
                        amount: format_amount(t.amount),
                    })
                    .collect(),
                chart_svg,
                total_rows: view.total_rows,
                ..Default::default()
            };
            table_context(&mut context, &view.table);
            context
        }
        Panel::Unavailable { message } => PanelContext {
            message: Some(message),
            ..Default::default()
        },
    }
}
