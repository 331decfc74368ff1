//! HTTP query surface for recorded traffic.
//!
//! - `GET /requests?model=<name>`: history and configuration of the
//!   completion runner for `<name>` ([`records_handler`]).
//! - `GET /requests/runners`: overview of every tracked runner
//!   ([`runners_handler`]).
//!
//! The gateway either nests [`router`] into its own `axum::Router` or runs
//! it standalone with [`serve`] or [`bind_and_serve`].

pub mod config;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::Result;
use crate::recorder::Recorder;
use crate::types::{BackendConfiguration, ModelData, RequestResponsePair, RunnerSummary};

/// Query parameters of [`records_handler`].
///
/// A repeated `model` parameter resolves to its first value.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct RecordsQuery {
    pub model: Option<String>,
}

impl From<Vec<(String, String)>> for RecordsQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let model = pairs
            .into_iter()
            .find_map(|(key, value)| (key == "model").then_some(value));
        Self { model }
    }
}

#[derive(Serialize)]
struct RecordsBody<'a> {
    model: &'a str,
    records: &'a VecDeque<RequestResponsePair>,
    count: usize,
    config: &'a BackendConfiguration,
}

/// Routes serving `recorder`.
pub fn router(recorder: Arc<Recorder>) -> Router {
    Router::new()
        .route("/requests", get(records_handler))
        .route("/requests/runners", get(runners_handler))
        .with_state(recorder)
}

/// Bind `addr` and serve [`router`] until the listener fails.
pub async fn bind_and_serve(addr: SocketAddr, recorder: Arc<Recorder>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, recorder).await
}

/// Serve [`router`] on an already bound listener.
pub async fn serve(listener: TcpListener, recorder: Arc<Recorder>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "serving recorded requests");
    axum::serve(listener, router(recorder)).await?;
    Ok(())
}

/// Recorded history for one model.
///
/// 400 without a `model`, 404 for an unknown model, otherwise
/// `{model, records, count, config}` as JSON.
pub async fn records_handler(
    State(recorder): State<Arc<Recorder>>,
    Query(params): Query<RecordsQuery>,
) -> Response {
    let model = match params.model.as_deref() {
        Some(model) if !model.is_empty() => model,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "A 'model' query parameter is required",
            )
                .into_response();
        }
    };

    let Some(data) = recorder.query(model) else {
        return (
            StatusCode::NOT_FOUND,
            format!("No records found for model '{model}'"),
        )
            .into_response();
    };

    match encode_records(model, &data) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode records for model '{model}': {e}"),
        )
            .into_response(),
    }
}

fn encode_records(model: &str, data: &ModelData) -> Result<Vec<u8>> {
    let body = RecordsBody {
        model,
        records: &data.records,
        count: data.records.len(),
        config: &data.config,
    };
    Ok(serde_json::to_vec(&body)?)
}

/// Every tracked runner with its record counts.
pub async fn runners_handler(State(recorder): State<Arc<Recorder>>) -> Json<Vec<RunnerSummary>> {
    Json(recorder.runners())
}
