// Tier List History - Web Server
// Read-only JSON API over the dashboard, loaded once at startup

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use tierlist_history::model::parse_calendar_date;
use tierlist_history::{
    collection_stats, filter_demon_levels, revision_view, unique_artists, AppConfig, CollectionStats, Dashboard,
    DemonListType, SheetClient,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn not_found(message: String) -> Response {
    error_response(StatusCode::NOT_FOUND, message)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

/// Main-list row with its score
#[derive(Serialize)]
struct RankingRow {
    rank: u32,
    title: String,
    artist: String,
    tier: Option<String>,
    score: Option<f64>,
    image_url: String,
}

/// Snapshot list item (songs omitted)
#[derive(Serialize)]
struct SnapshotSummary {
    index: usize,
    date: String,
    revision_label: Option<String>,
    songs: usize,
    changes: usize,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SinceQuery {
    since: Option<String>,
}

/// Main-list stats plus every artist seen anywhere in the history
#[derive(Serialize)]
struct StatsPayload {
    #[serde(flatten)]
    main: CollectionStats,
    all_time_artists: Vec<String>,
}

#[derive(Deserialize)]
struct DemonQuery {
    filter: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// GET /api/rankings - Current main list with scores
async fn get_rankings(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = &state.dashboard;
    let rows: Vec<RankingRow> = dashboard
        .main_songs()
        .into_iter()
        .map(|s| RankingRow {
            rank: s.rank,
            title: s.title.clone(),
            artist: s.artist.clone(),
            tier: s.tier.map(|t| t.label().to_string()),
            score: dashboard.scores.get(&s.key()).copied(),
            image_url: dashboard.catalog.thumbnail(&s.title).to_string(),
        })
        .collect();

    ApiResponse::ok(rows)
}

/// GET /api/snapshots - Timeline summary
async fn get_snapshots(State(state): State<AppState>) -> impl IntoResponse {
    let summaries: Vec<SnapshotSummary> = state
        .dashboard
        .snapshots
        .iter()
        .enumerate()
        .map(|(index, s)| SnapshotSummary {
            index,
            date: s.date.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            revision_label: s.revision_label.clone(),
            songs: s.count(),
            changes: s.changelog_entries.len(),
        })
        .collect();

    ApiResponse::ok(summaries)
}

/// GET /api/snapshots/:index - One past ranking seen from today
async fn get_snapshot(State(state): State<AppState>, Path(index): Path<usize>) -> impl IntoResponse {
    match state.dashboard.snapshots.get(index) {
        Some(snapshot) => ApiResponse::ok(revision_view(snapshot, &state.dashboard.catalog)),
        None => not_found(format!("No snapshot {}", index)),
    }
}

/// GET /api/changelog?limit=N - Changelog-produced snapshots, newest first
async fn get_changelog(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> impl IntoResponse {
    let feed = state.dashboard.changelog_feed();
    let limit = query.limit.unwrap_or(feed.len());
    ApiResponse::ok(feed.into_iter().take(limit).collect::<Vec<_>>())
}

/// GET /api/histories - Every song's history
async fn get_histories(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(&state.dashboard.histories)
}

/// GET /api/histories/:title?since=YYYY-MM-DD - One song's detail (URL-encoded title)
async fn get_history(
    State(state): State<AppState>,
    Path(title): Path<String>,
    Query(query): Query<SinceQuery>,
) -> impl IntoResponse {
    let decoded = urlencoding::decode(&title)
        .unwrap_or_else(|_| title.clone().into())
        .into_owned();

    let since = match query.since.as_deref() {
        None => None,
        Some(raw) => match parse_calendar_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)) {
            Some(date) => Some(date),
            None => return error_response(StatusCode::BAD_REQUEST, format!("Unreadable date \"{}\"", raw)),
        },
    };

    match state.dashboard.history_view(&decoded, since) {
        Some(view) => ApiResponse::ok(view),
        None => not_found(format!("No history for \"{}\"", decoded)),
    }
}

/// GET /api/scores - Normalized title → tier score
async fn get_scores(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(&state.dashboard.scores)
}

/// GET /api/stats - Main list statistics
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = &state.dashboard;
    ApiResponse::ok(StatsPayload {
        main: collection_stats(&dashboard.main_songs()),
        all_time_artists: unique_artists(&dashboard.catalog.songs, &dashboard.histories),
    })
}

/// GET /api/demons/:list?filter=Verified - main, extended or all
async fn get_demons(
    State(state): State<AppState>,
    Path(list): Path<String>,
    Query(query): Query<DemonQuery>,
) -> impl IntoResponse {
    let Some(list_type) = DemonListType::parse(&list) else {
        return not_found(format!("Unknown demon list \"{}\"", list));
    };
    let filter = query.filter.as_deref().unwrap_or("Verified");
    ApiResponse::ok(filter_demon_levels(&state.dashboard.demons, filter, list_type))
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/rankings", get(get_rankings))
        .route("/snapshots", get(get_snapshots))
        .route("/snapshots/:index", get(get_snapshot))
        .route("/changelog", get(get_changelog))
        .route("/histories", get(get_histories))
        .route("/histories/:title", get(get_history))
        .route("/scores", get(get_scores))
        .route("/stats", get(get_stats))
        .route("/demons/:list", get(get_demons))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[derive(Parser)]
#[command(name = "tierlist-server", version, about = "JSON API over the tier list history")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "TIERLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Local song sheet export (use with --history instead of the remote sheet)
    #[arg(long, requires = "history")]
    songs: Option<PathBuf>,

    /// Local history sheet export
    #[arg(long, requires = "songs")]
    history: Option<PathBuf>,

    /// Local demon list export
    #[arg(long)]
    demons: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌐 Tier List History - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let dashboard = match (&args.songs, &args.history) {
        (Some(songs), Some(history)) => Dashboard::from_files(songs, history, args.demons.as_deref())?,
        _ => SheetClient::new(config.sheets.clone()).load_dashboard().await?,
    };
    println!(
        "✓ Loaded {} songs, {} snapshots, {} histories",
        dashboard.catalog.songs.len(),
        dashboard.snapshots.len(),
        dashboard.histories.len()
    );

    let state = AppState { dashboard: Arc::new(dashboard) };

    let addr = args.bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/rankings", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state))
        .await
        .context("Server stopped with an error")
}

// ============================================================================
// TESTS
// ============================================================================
