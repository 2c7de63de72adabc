//! labtrack server binary.
//!
//! Reads `LABTRACK__*` configuration, picks in-memory or PostgreSQL storage
//! and the configured push provider, and serves the REST and WebSocket API.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use secrecy::ExposeSecret;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use labtrack::adapters::auth::JwtSessionValidator;
use labtrack::adapters::http::{api_router, AuthState, NotificationAppState, SampleAppState};
use labtrack::adapters::jobs::TokenJanitor;
use labtrack::adapters::memory::{
    InMemoryAuditLogger, InMemoryDeviceTokenRepository, InMemoryNotificationRepository,
    InMemoryResultReader, InMemorySampleRepository,
};
use labtrack::adapters::postgres::{
    run_migrations, PostgresAuditLogger, PostgresDeviceTokenRepository,
    PostgresNotificationRepository, PostgresResultReader, PostgresSampleRepository,
};
use labtrack::adapters::push::{FcmConfig, FcmPushProvider, SandboxPushProvider};
use labtrack::adapters::websocket::{RealtimeHub, WebSocketState};
use labtrack::application::{
    DeviceTokenRegistry, DispatchConfig, GetSampleHandler, InboxConfig, NotificationDispatcher,
    NotificationInbox, SampleStateMachine, SideEffectRunner,
};
use labtrack::config::{AppConfig, DatabaseConfig, Environment, PushConfig, PushProviderKind};
use labtrack::ports::{
    AuditLogger, DeviceTokenRepository, NotificationRepository, ProviderError, PushProvider,
    ResultReader, SampleRepository,
};

type BoxError = Box<dyn Error + Send + Sync>;

/// How long queued side effects get to finish after the server stops.
const SIDE_EFFECT_GRACE: Duration = Duration::from_secs(10);

/// Storage adapters behind their ports.
struct Stores {
    samples: Arc<dyn SampleRepository>,
    results: Arc<dyn ResultReader>,
    tokens: Arc<dyn DeviceTokenRepository>,
    notifications: Arc<dyn NotificationRepository>,
    audit: Arc<dyn AuditLogger>,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            samples: Arc::new(InMemorySampleRepository::new()),
            results: Arc::new(InMemoryResultReader::new()),
            tokens: Arc::new(InMemoryDeviceTokenRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            audit: Arc::new(InMemoryAuditLogger::new()),
        }
    }

    async fn postgres(config: &DatabaseConfig) -> Result<Self, BoxError> {
        let pool = config.pool_options().connect(&config.url).await?;
        if config.run_migrations {
            run_migrations(&pool).await?;
            tracing::info!("database migrations applied");
        }
        Ok(Self {
            samples: Arc::new(PostgresSampleRepository::new(pool.clone())),
            results: Arc::new(PostgresResultReader::new(pool.clone())),
            tokens: Arc::new(PostgresDeviceTokenRepository::new(pool.clone())),
            notifications: Arc::new(PostgresNotificationRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditLogger::new(pool)),
        })
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.server.environment == Environment::Development {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    }
}

fn push_provider(config: &PushConfig) -> Result<Arc<dyn PushProvider>, ProviderError> {
    match config.provider {
        PushProviderKind::Sandbox => Ok(Arc::new(SandboxPushProvider::new())),
        PushProviderKind::Fcm => {
            let (Some(project_id), Some(client_email), Some(private_key)) = (
                config.fcm_project_id.as_deref(),
                config.fcm_client_email.as_deref(),
                config.fcm_private_key.as_ref(),
            ) else {
                return Err(ProviderError::Configuration(
                    "FCM credentials are incomplete".to_string(),
                ));
            };

            let mut fcm = FcmConfig::new(project_id, client_email, private_key.expose_secret().as_str())
                .with_timeout(config.request_timeout())
                .with_requests_per_second(config.requests_per_second);
            if let Some(uri) = &config.fcm_token_uri {
                fcm = fcm.with_token_uri(uri);
            }
            if let Some(endpoint) = &config.fcm_endpoint {
                fcm = fcm.with_base_url(endpoint);
            }
            Ok(Arc::new(FcmPushProvider::new(fcm)?))
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() && !config.is_production() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let stores = match &config.database {
        Some(database) => Stores::postgres(database).await?,
        None => {
            tracing::warn!("no database configured; state is kept in memory");
            Stores::in_memory()
        }
    };

    let push = push_provider(&config.push)?;
    if config.push.provider == PushProviderKind::Sandbox && config.is_production() {
        tracing::warn!("sandbox push provider selected in production; no pushes will leave the process");
    }
    tracing::info!(provider = push.name(), "push provider ready");

    let side_effects = SideEffectRunner::start(config.side_effects.runner_config());
    let hub = Arc::new(RealtimeHub::new(
        stores.notifications.clone(),
        config.dispatch.snapshot_size,
        config.dispatch.connection_buffer,
    ));
    let registry = Arc::new(DeviceTokenRegistry::new(stores.tokens.clone()));
    let inbox = Arc::new(NotificationInbox::new(
        stores.notifications.clone(),
        InboxConfig::default(),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        stores.notifications.clone(),
        registry.clone(),
        push.clone(),
        hub.clone(),
        DispatchConfig {
            max_batch_size: config.push.max_batch_size,
        },
    ));
    let state_machine = Arc::new(
        SampleStateMachine::new(
            stores.samples.clone(),
            stores.results.clone(),
            stores.audit.clone(),
            dispatcher,
            side_effects.clone(),
        )
        .with_max_commit_attempts(config.transitions.max_commit_attempts),
    );

    let sessions: AuthState = Arc::new(JwtSessionValidator::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
    ));

    let app = api_router(
        SampleAppState {
            state_machine,
            samples: Arc::new(GetSampleHandler::new(stores.samples.clone())),
        },
        NotificationAppState {
            registry: registry.clone(),
            inbox: inbox.clone(),
        },
        WebSocketState {
            hub,
            inbox,
            sessions: sessions.clone(),
        },
        sessions,
    )
    .layer(CompressionLayer::new())
    .layer(TimeoutLayer::new(config.server.request_timeout()))
    .layer(cors_layer(&config))
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(TraceLayer::new_for_http())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let (janitor_tx, janitor_rx) = watch::channel(false);
    let janitor = TokenJanitor::new(registry, config.tokens.janitor_config());
    let janitor_task = tokio::spawn(async move { janitor.run(janitor_rx).await });

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "labtrack listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = janitor_tx.send(true);
    if let Err(error) = janitor_task.await {
        tracing::warn!(%error, "token janitor task failed");
    }
    side_effects.shutdown(SIDE_EFFECT_GRACE).await;
    push.shutdown().await;
    tracing::info!("labtrack stopped");

    Ok(())
}
