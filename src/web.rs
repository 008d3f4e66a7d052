//! HTTP surface: per-country analysis and the upstream status check.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::environment::AppConfig;
use crate::error::{AnalysisError, ErrorReport};
use crate::pipeline::SentimentPipeline;
use crate::status::check_status;

pub struct AppState {
    pub pipeline: SentimentPipeline,
    pub config: AppConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(flatten)]
    report: Option<ErrorReport>,
}

fn error_response(status: StatusCode, error: String, report: Option<ErrorReport>) -> Response {
    (status, Json(ErrorBody { error, report })).into_response()
}

/// Upstream failures are a bad gateway; everything else is ours.
fn error_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::AllStrategiesExhausted { .. }
        | AnalysisError::NoArticlesFound(_)
        | AnalysisError::Classification { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::Cancelled | AnalysisError::MissingConfig(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze-government", post(analyze_government))
        .route("/api/check-status", get(status_check))
        .with_state(state)
}

pub async fn app_api_loop(state: Arc<AppState>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down server");
        })
        .await
        .context("Server error")?;

    Ok(())
}

/// Structured body for a request the extractor refused.
fn rejection_response(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    let report = ErrorReport {
        step: "request",
        kind: "InvalidRequest",
        message: message.clone(),
        causes: Vec::new(),
    };
    error_response(rejection.status(), message, Some(report))
}

async fn analyze_government(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected analyze request: {}", rejection.body_text());
            return rejection_response(rejection);
        }
    };

    let country = match request.country.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_uppercase(),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Country code is required".to_string(),
                None,
            )
        }
    };

    info!("Handling analyze request for {}", country);
    match state.pipeline.analyze_country(&country).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            error!(country = %country, step = err.step(), "Analysis failed: {}", err);
            error_response(error_status(&err), err.to_string(), Some(err.report()))
        }
    }
}

async fn status_check(State(state): State<Arc<AppState>>) -> Response {
    match check_status(&state.config).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StrategyError, StrategyFailure};
    use serde_json::Value;

    fn state() -> Arc<AppState> {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        Arc::new(AppState {
            pipeline: SentimentPipeline::from_config(&config).unwrap(),
            config,
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_country_is_bad_request() {
        let response = analyze_government(
            State(state()),
            Ok(Json(AnalyzeRequest { country: None })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Country code is required");
        assert!(body.get("step").is_none());
    }

    #[tokio::test]
    async fn test_blank_country_is_bad_request() {
        let response = analyze_government(
            State(state()),
            Ok(Json(AnalyzeRequest {
                country: Some("  ".to_string()),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_key_names_config_step() {
        let response = analyze_government(
            State(state()),
            Ok(Json(AnalyzeRequest {
                country: Some("id".to_string()),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["step"], "config");
        assert_eq!(body["kind"], "MissingConfig");
    }

    #[test]
    fn test_upstream_failures_are_bad_gateway() {
        let exhausted = AnalysisError::AllStrategiesExhausted {
            topic: "\"laos government\"".to_string(),
            failures: vec![StrategyFailure {
                strategy: "browser".to_string(),
                error: StrategyError::Empty,
            }],
        };
        assert_eq!(error_status(&exhausted), StatusCode::BAD_GATEWAY);
        assert_eq!(
            error_status(&AnalysisError::NoArticlesFound("\"x\"".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&AnalysisError::MissingConfig("GNEWS_API_KEY")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn spawn_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state())).await.unwrap();
        });
        format!("http://{}/api/analyze-government", addr)
    }

    #[tokio::test]
    async fn test_malformed_body_gets_structured_error() {
        let url = spawn_server().await;
        let client = reqwest::Client::new();

        let response = client
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["step"], "request");
        assert_eq!(body["kind"], "InvalidRequest");
        assert!(!body["error"].as_str().unwrap().is_empty());

        let response = client.post(&url).body("country=ID").send().await.unwrap();
        assert_eq!(response.status().as_u16(), 415);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["step"], "request");
    }

    #[tokio::test]
    async fn test_status_without_keys() {
        let response = status_check(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["news"]["status"], "no-key");
        assert_eq!(body["classifier"]["status"], "no-key");
    }
}
