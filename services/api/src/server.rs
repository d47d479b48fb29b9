use crate::automation::HttpAutomationNotifier;
use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryLeadRepository, InMemoryRuleRepository, StorageKind};
use crate::postgres::{self, PgLeadRepository, PgRuleRepository};
use crate::routes::with_lead_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_scoring::config::{AppConfig, ScoringConfig};
use lead_scoring::error::AppError;
use lead_scoring::telemetry;
use lead_scoring::workflows::leads::{
    AutomationNotifier, DestinationCatalogues, LeadRepository, LeadService, RepositoryError,
    RuleAdminService, RuleCsvImporter, RuleRepository, ScoringEngine, ScoringOrchestrator,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(ScoringEngine::new(
        load_catalogues(&config.scoring)?,
        config.scoring.thresholds,
    ));
    let notifier = Arc::new(HttpAutomationNotifier::new(&config.automation));

    match config.database.clone() {
        Some(database) => {
            let pool = postgres::create_pool(&database)
                .await
                .map_err(|error| RepositoryError::Unavailable(error.to_string()))?;
            postgres::migrate(&pool)
                .await
                .map_err(|error| RepositoryError::Unavailable(error.to_string()))?;
            if config.scoring.seed_rules_path.is_some() {
                warn!("LEAD_SCORING_RULES_CSV is ignored when DATABASE_URL is set");
            }

            let leads = Arc::new(PgLeadRepository::new(pool.clone()));
            let rules = Arc::new(PgRuleRepository::new(pool));
            serve(config, leads, rules, notifier, engine, StorageKind::Postgres).await
        }
        None => {
            let leads = Arc::new(InMemoryLeadRepository::default());
            let rules = Arc::new(InMemoryRuleRepository::default());
            seed_rules(&config.scoring, rules.as_ref()).await?;
            serve(config, leads, rules, notifier, engine, StorageKind::Memory).await
        }
    }
}

pub(crate) fn load_catalogues(config: &ScoringConfig) -> Result<DestinationCatalogues, AppError> {
    match &config.catalogue_path {
        Some(path) => {
            let catalogues = DestinationCatalogues::from_path(path)?;
            info!(path = %path.display(), "destination catalogue loaded");
            Ok(catalogues)
        }
        None => Ok(DestinationCatalogues::default()),
    }
}

async fn seed_rules<R: RuleRepository>(config: &ScoringConfig, rules: &R) -> Result<(), AppError> {
    let Some(path) = &config.seed_rules_path else {
        return Ok(());
    };

    let drafts = RuleCsvImporter::from_path(path)?;
    let count = drafts.len();
    for draft in drafts {
        rules.insert_rule(draft).await?;
    }
    info!(path = %path.display(), rules = count, "scoring rules seeded");
    Ok(())
}

async fn serve<L, R, N>(
    config: AppConfig,
    leads: Arc<L>,
    rules: Arc<R>,
    notifier: Arc<N>,
    engine: Arc<ScoringEngine>,
    storage: StorageKind,
) -> Result<(), AppError>
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    let lead_service = if config.scoring.enabled {
        let orchestrator = ScoringOrchestrator::new(leads.clone(), rules.clone(), engine)
            .with_timeout(config.scoring.timeout);
        LeadService::new(leads, orchestrator, notifier)
    } else {
        warn!("lead scoring disabled; leads are stored without a score");
        LeadService::without_scoring(leads, notifier)
    };
    let rule_service = RuleAdminService::new(rules);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        storage,
        scoring_enabled: lead_service.scoring_enabled(),
    };

    let app = with_lead_routes(Arc::new(lead_service), Arc::new(rule_service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        storage = storage.label(),
        "lead scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
