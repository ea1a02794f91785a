//! Resource Defaulter - webhook server entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use resource_defaulter::normalize::Strategy;
use resource_defaulter::resources::Defaults;
use resource_defaulter::webhook::{self, WebhookState};

/// Mutating admission webhook that injects default container resources
#[derive(Parser, Debug)]
#[command(name = "resource-defaulter", version, about, long_about = None)]
struct Cli {
    /// Socket address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8443")]
    bind: SocketAddr,

    /// Path to the TLS certificate PEM file (requires --tls-key)
    ///
    /// When neither TLS flag is given the server speaks plain HTTP, which
    /// is only suitable behind a TLS-terminating proxy or in local testing.
    #[arg(long, env = "TLS_CERT_FILE")]
    tls_cert: Option<PathBuf>,

    /// Path to the TLS private key PEM file (requires --tls-cert)
    #[arg(long, env = "TLS_KEY_FILE")]
    tls_key: Option<PathBuf>,

    /// Default memory limit for containers that declare none
    #[arg(long, env = "DEFAULT_LIMIT_MEMORY", default_value = "1G")]
    limit_memory: String,

    /// Default CPU limit for containers that declare none
    #[arg(long, env = "DEFAULT_LIMIT_CPU", default_value = "0.5")]
    limit_cpu: String,

    /// Default memory request for containers that declare none
    #[arg(long, env = "DEFAULT_REQUEST_MEMORY", default_value = "1G")]
    request_memory: String,

    /// Default CPU request for containers that declare none
    #[arg(long, env = "DEFAULT_REQUEST_CPU", default_value = "0.1")]
    request_cpu: String,

    /// How declared values and defaults are merged
    /// (per-field, kind-complement or if-empty)
    #[arg(long, env = "PATCH_STRATEGY", default_value = "per-field")]
    strategy: Strategy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install the process-wide TLS crypto provider before anything else
    // can race it.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: failed to install rustls crypto provider: {e:?}");
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Unparseable defaults are fatal: the process must not start and then
    // emit patches it cannot validate.
    let defaults = Defaults::parse(
        &cli.limit_memory,
        &cli.limit_cpu,
        &cli.request_memory,
        &cli.request_cpu,
    )
    .context("invalid default resource quantities")?;

    info!(
        strategy = %cli.strategy,
        limit_memory = %cli.limit_memory,
        limit_cpu = %cli.limit_cpu,
        request_memory = %cli.request_memory,
        request_cpu = %cli.request_cpu,
        "Loaded resource defaults"
    );

    let state = Arc::new(WebhookState::new(defaults, cli.strategy));
    let app = webhook::router(state);

    match (&cli.tls_cert, &cli.tls_key) {
        (Some(cert_path), Some(key_path)) => {
            let cert_pem = tokio::fs::read(cert_path)
                .await
                .with_context(|| format!("failed to read TLS certificate {cert_path:?}"))?;
            let key_pem = tokio::fs::read(key_path)
                .await
                .with_context(|| format!("failed to read TLS key {key_path:?}"))?;
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem(cert_pem, key_pem)
                .await
                .context("invalid TLS certificate or key")?;

            info!(addr = %cli.bind, "Webhook listening (TLS)");
            axum_server::bind_rustls(cli.bind, tls_config)
                .serve(app.into_make_service())
                .await
                .context("webhook server failed")?;
        }
        (None, None) => {
            let listener = tokio::net::TcpListener::bind(cli.bind)
                .await
                .with_context(|| format!("failed to bind {}", cli.bind))?;

            info!(addr = %cli.bind, "Webhook listening (plain HTTP)");
            axum::serve(listener, app)
                .await
                .context("webhook server failed")?;
        }
        _ => anyhow::bail!("--tls-cert and --tls-key must be supplied together"),
    }

    Ok(())
}
