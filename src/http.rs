//! HTTP front-end (axum).
//!
//! Routes: `GET /health` → `200 OK`; `GET /` and `GET /index.html` → a
//! static page; `GET /chat?<urlencoded inquiry>` → `text/plain`, streamed as
//! the pipeline produces text; anything else → `404`. `/reset` and
//! `/review` travel as the inquiry string itself, exactly like any other
//! in-band command.

use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::context::Delegates;
use crate::error::Result;
use crate::history::History;
use crate::logger;
use crate::pipeline::Pipeline;

const INDEX_HTML: &str = "<!DOCTYPE html>\n<html><head><title>Gamal</title></head>\n<body>\n<h1>Gamal</h1>\n<p>Ask via <code>GET /chat?&lt;your question&gt;</code>.</p>\n</body></html>\n";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    history: Arc<Mutex<History>>,
}

pub async fn run(pipeline: Pipeline, port: u16) -> Result<()> {
    let state = AppState { pipeline: Arc::new(pipeline), history: Arc::new(Mutex::new(History::new())) };

    let app = Router::new()
        .route("/health", get(health))
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/chat", get(chat))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    logger::log(format!("http: listening on {addr}"));

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| crate::error::GamalError::Config(e.to_string()))?;
    axum::serve(listener, app).await.map_err(|e| crate::error::GamalError::Config(e.to_string()))?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let inquiry = decode_query(raw);

    match inquiry.trim() {
        "/reset" => {
            state.history.lock().unwrap().reset();
            return plain_text("History cleared.");
        }
        "/review" => {
            let review = state.history.lock().unwrap().review();
            return plain_text(&review);
        }
        _ => {}
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let delegates = Arc::new(Delegates::new().with_stream(move |delta: &str| {
        let _ = tx.send(delta.to_string());
    }));

    let entries = state.history.lock().unwrap().entries().to_vec();
    let pipeline = state.pipeline.clone();
    let history = state.history.clone();

    tokio::spawn(async move {
        match pipeline.run(inquiry, entries, delegates).await {
            Ok(entry) => history.lock().unwrap().push(entry),
            Err(err) => logger::log(format!("http: pipeline failed: {err}")),
        }
    });

    let body_stream = UnboundedReceiverStream::new(rx).map(|s| Ok::<Bytes, std::convert::Infallible>(Bytes::from(s)));

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from_stream(body_stream))
        .unwrap()
        .into_response()
}

fn plain_text(body: &str) -> Response {
    (StatusCode::OK, body.to_string()).into_response()
}

fn decode_query(raw: Option<String>) -> String {
    raw.as_deref().map(|q| urlencoding::decode(q).map(|c| c.into_owned()).unwrap_or_default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_query_handles_absent_query_string() {
        assert_eq!(decode_query(None), "");
    }

    #[test]
    fn decode_query_url_decodes_spaces_and_punctuation() {
        assert_eq!(decode_query(Some("who%20is%20the%20CEO%3F".to_string())), "who is the CEO?");
    }
}
