use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use lead_scoring::workflows::leads::{
    lead_router, rule_router, AutomationNotifier, LeadRepository, LeadService, RuleAdminService,
    RuleRepository,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_lead_routes<L, R, N>(
    leads: Arc<LeadService<L, R, N>>,
    rules: Arc<RuleAdminService<R>>,
) -> axum::Router
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    lead_router(leads)
        .merge(rule_router(rules))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = json!({
        "status": if ready { "ready" } else { "initializing" },
        "storage": state.storage.label(),
        "scoring_enabled": state.scoring_enabled,
    });

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryLeadRepository, InMemoryRuleRepository, StorageKind};
    use lead_scoring::workflows::leads::{
        AutomationAction, NotifierError, ScoringEngine, ScoringOrchestrator,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    struct SilentNotifier;

    #[async_trait::async_trait]
    impl AutomationNotifier for SilentNotifier {
        async fn notify(&self, _action: &AutomationAction) -> Result<(), NotifierError> {
            Ok(())
        }
    }

    fn app(ready: bool) -> axum::Router {
        let leads = Arc::new(InMemoryLeadRepository::default());
        let rules = Arc::new(InMemoryRuleRepository::default());
        let orchestrator = ScoringOrchestrator::new(
            leads.clone(),
            rules.clone(),
            Arc::new(ScoringEngine::default()),
        );
        let service = Arc::new(LeadService::new(leads, orchestrator, Arc::new(SilentNotifier)));
        let admin = Arc::new(RuleAdminService::new(rules));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            storage: StorageKind::Memory,
            scoring_enabled: true,
        };
        with_lead_routes(service, admin).layer(Extension(state))
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                axum::http::Request::get(uri)
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    #[tokio::test]
    async fn readiness_reports_storage_and_scoring_mode() {
        let (status, payload) = get(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["storage"], json!("memory"));
        assert_eq!(payload["scoring_enabled"], json!(true));

        let (status, payload) = get(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], json!("initializing"));
    }

    #[tokio::test]
    async fn lead_and_rule_routes_are_mounted() {
        let (status, payload) = get(app(true), "/api/lead-scoring/rules").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!([]));

        let (status, _) = get(app(true), "/api/leads/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
