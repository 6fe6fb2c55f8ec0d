use anyhow::{Context, Result};
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use estate_gateway::notify::{LogMailer, Mailer, SmtpMailer, Templates};
use estate_gateway::rate_limit::spawn_cleanup;
use estate_gateway::worker::{notification_channel, notification_worker};
use estate_gateway::{AppState, Args, bootstrap_admin, build_router};

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // parse cli arguments
    let args = Args::parse();

    let mailer: Arc<dyn Mailer> = match &args.smtp_host {
        Some(host) => Arc::new(
            SmtpMailer::new(
                host,
                args.smtp_port,
                args.smtp_username.as_deref(),
                args.smtp_password.as_deref(),
                args.from_email.clone(),
            )
            .context("failed to configure SMTP")?,
        ),
        None => {
            warn!("SMTP_HOST not set, e-mails will only be logged");
            Arc::new(LogMailer::new())
        }
    };

    // spawn the notification worker
    let (notifier, mail_rx) = notification_channel(args.mail_queue.max(1));
    tokio::spawn(notification_worker(mail_rx, mailer));

    // creating shared state
    let state = Arc::new(AppState::new(
        args.rate_limit_profiles(),
        args.cache_ttl(),
        args.session_ttl(),
        Templates::new(args.site_name.clone(), args.site_url.clone()),
        notifier,
    ));

    if let (Some(email), Some(password)) = (&args.admin_email, &args.admin_password) {
        bootstrap_admin(&state, email, password)?;
    }

    spawn_cleanup(state.rate_limiter.clone(), args.cleanup_interval());

    let session_state = state.clone();
    let session_every = args.cleanup_interval();
    tokio::spawn(async move {
        let mut ticker = interval(session_every);
        loop {
            ticker.tick().await;
            let removed = session_state.store.purge_expired_sessions(chrono::Utc::now());
            if removed > 0 {
                debug!(removed, "expired sessions removed");
            }
        }
    });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let profiles = args.rate_limit_profiles();
    info!(port = args.port, "estate gateway listening");
    info!(cache_ttl = args.cache_ttl, "listing cache configured");
    info!(?profiles, "rate limit profiles");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "estate_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
