//! `axum` routes over a [`QueryFacade`].
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /status` | [`StatusReport`](chaincache_core::StatusReport) |
//! | `GET /accounts?address1..address5&delegate=1` | five account records |
//! | `GET /history/:direction?blockheight=N&address1..address5` | five transaction lists |
//! | `GET /transactions/latest` | both cached windows, highest block first |
//! | `GET /transactions/last-nonempty` | last snapshot that had transactions |
//! | `GET <price path>` | cached price document, when prices are enabled |

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chaincache_core::types::{AccountRecord, Direction, MergedTransactions, Transaction, TransactionSnapshot};
use chaincache_core::{QueryFacade, StatusReport};

/// Where the routes are mounted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Prefix for every route, e.g. `/api/v1`. Empty mounts at the root.
    #[serde(default)]
    pub base_path: String,
}

/// Query string shared by the account and history routes.
#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub address4: Option<String>,
    pub address5: Option<String>,
    pub delegate: Option<String>,
    pub blockheight: Option<String>,
}

impl SlotQuery {
    pub fn slots(&self) -> Vec<Option<String>> {
        vec![
            self.address1.clone(),
            self.address2.clone(),
            self.address3.clone(),
            self.address4.clone(),
            self.address5.clone(),
        ]
    }

    /// Only `delegate=1` turns delegate lookups on.
    pub fn include_delegates(&self) -> bool {
        self.delegate.as_deref() == Some("1")
    }

    pub fn since_height(&self) -> Option<u64> {
        self.blockheight.as_deref()?.trim().parse().ok()
    }
}

/// Leading slash added, trailing slash removed. `""` and `"/"` become `""`.
fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Build the router. The price route is mounted only when the facade has a
/// price watcher.
pub fn router(facade: QueryFacade, config: &RouteConfig) -> Router {
    let mut routes = Router::new()
        .route("/status", get(status))
        .route("/accounts", get(accounts))
        .route("/history/:direction", get(history))
        .route("/transactions/latest", get(latest))
        .route("/transactions/last-nonempty", get(last_non_empty));

    if let Some(path) = facade.price_path().map(normalize).filter(|p| !p.is_empty()) {
        routes = routes.route(&path, get(prices));
    }

    let routes = routes.with_state(facade);
    match normalize(&config.base_path).as_str() {
        "" => routes,
        base => Router::new().nest(base, routes),
    }
}

async fn status(State(facade): State<QueryFacade>) -> Json<StatusReport> {
    Json(facade.status())
}

async fn accounts(
    State(facade): State<QueryFacade>,
    Query(query): Query<SlotQuery>,
) -> Json<Vec<AccountRecord>> {
    Json(facade.accounts(&query.slots(), query.include_delegates()).await)
}

async fn history(
    State(facade): State<QueryFacade>,
    Path(direction): Path<Direction>,
    Query(query): Query<SlotQuery>,
) -> Json<Vec<Vec<Transaction>>> {
    let Some(since) = query.since_height() else {
        tracing::debug!(blockheight = ?query.blockheight, "history request without a usable block height");
        return Json(Vec::new());
    };
    Json(facade.history(direction, since, &query.slots()).await)
}

async fn latest(State(facade): State<QueryFacade>) -> Json<MergedTransactions> {
    Json(facade.latest_merged())
}

async fn last_non_empty(State(facade): State<QueryFacade>) -> Json<TransactionSnapshot> {
    Json(facade.last_non_empty())
}

async fn prices(State(facade): State<QueryFacade>) -> Json<Value> {
    Json(facade.prices())
}
