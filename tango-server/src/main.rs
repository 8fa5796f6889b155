//! Tango coordinator process entry point.
//!
//! Shape follows `entity_gateway::main`: init logging, load YAML config,
//! bootstrap collaborators, spawn the background sweep, then serve.

use std::sync::Arc;

use tonic::codec::CompressionEncoding;
use tonic::transport::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tango_core::config::TangoConfig;
use tango_core::device::DeviceRegistry;
use tango_core::registry::JobRegistry;
use tango_server::accounting::AccountingLog;
use tango_server::auth::AuthInterceptor;
use tango_server::objectstore::{GcsObjectStore, LocalObjectStore};
use tango_server::proto::v1::tango_service_server::TangoServiceServer;
use tango_server::secrets::GcpSecretStore;
use tango_server::service::TangoServer;

const DEFAULT_CONFIG_PATH: &str = "config/tango.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("TANGO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = TangoConfig::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("warning: failed to load {config_path}: {e}; using defaults");
        TangoConfig::default()
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tango_server={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(path = %config_path, "loaded configuration");

    let oauth_token = std::env::var("GOOGLE_OAUTH_TOKEN").unwrap_or_default();

    // JWT signing secret: pull from Secret Manager when configured, else a
    // plaintext env-var fallback for local development (SPEC_FULL.md "Auth
    // filter" / supplemented plaintext dev fallback).
    let jwt_secret = if !config.gcp.jwt_secret_name.is_empty() {
        let store = GcpSecretStore::new(oauth_token.clone());
        tango_core::ports::SecretStore::access_secret(&store, &config.gcp.jwt_secret_name).await?
    } else {
        std::env::var("TANGO_JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret".to_string())
            .into_bytes()
    };
    AuthInterceptor::init_secret(jwt_secret);

    let object_store: Arc<dyn tango_core::ports::ObjectStore> =
        if !config.gcp.records_bucket.is_empty() {
            Arc::new(GcsObjectStore::new(oauth_token.clone()))
        } else {
            Arc::new(LocalObjectStore::new("./records"))
        };

    let registry = Arc::new(JobRegistry::new());
    let devices = Arc::new(DeviceRegistry::new());
    let accounting = Arc::new(AccountingLog::new("transaction_cache.csv"));

    let reaper_registry = registry.clone();
    let reaper_interval = config.reaper_interval();
    tokio::spawn(async move {
        tango_core::reaper::run(reaper_registry, reaper_interval).await;
    });

    let tango_service = TangoServer::new(
        registry,
        devices,
        object_store,
        accounting,
        config.gcp.records_bucket.clone(),
        config.assignment_lease(),
    );

    let service = TangoServiceServer::with_interceptor(tango_service, AuthInterceptor::new())
        .accept_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Zstd);

    let addr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(%addr, "starting gRPC server");

    let mut builder = Server::builder();

    // TLS when both a cert and key are configured; plaintext dev fallback
    // otherwise, mirroring the original's sync.Once-guarded secret fetch
    // being optional in local runs (examples/original_source/src/gcp.go).
    if config.gcp.server_crt.is_some() && config.gcp.server_key.is_some() {
        let store = GcpSecretStore::new(oauth_token);
        let crt = tango_core::ports::SecretStore::access_secret(
            &store,
            config.gcp.server_crt.as_deref().unwrap(),
        )
        .await?;
        let key = tango_core::ports::SecretStore::access_secret(
            &store,
            config.gcp.server_key.as_deref().unwrap(),
        )
        .await?;
        let identity = tonic::transport::Identity::from_pem(crt, key);
        builder = builder.tls_config(tonic::transport::ServerTlsConfig::new().identity(identity))?;
    } else {
        tracing::warn!("no TLS certificate configured — serving plaintext");
    }

    let mut router = builder.add_service(service);

    #[cfg(feature = "reflection")]
    {
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(tango_server::proto::FILE_DESCRIPTOR_SET)
            .build_v1()?;
        router = router.add_service(reflection_service);
    }

    router.serve(addr).await?;

    Ok(())
}
