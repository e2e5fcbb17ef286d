use actix_web::{
    middleware::{NormalizePath, TrailingSlash},
    web::{Data, JsonConfig},
    App, HttpServer,
};
use config::Config;
use tracing::level_filters::LevelFilter;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod api;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod forwarder;
pub mod policy;
pub mod queue;
pub mod service;
pub mod slack;
pub mod utils;
pub mod verify;

/// Returns a builder for the main application.
#[bon::builder(finish_fn = start)]
pub async fn run(config: Option<Config>) -> eyre::Result<()> {
    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("SLACKQ_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("SLACKQ_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    let config = match config {
        Some(config) => config,
        None => Config::load()?,
    };

    let (host, port) = {
        let (host, port) = config.bind_addr();
        (host.to_owned(), port)
    };

    let service = service::Service::connect_with(config).await?;

    let data = Data::new(service);

    tracing::info!(%host, port, "listening");

    HttpServer::new(move || {
        let json_cfg = JsonConfig::default().content_type_required(false);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .configure(api::configure)
            .app_data(data.clone())
            .app_data(json_cfg)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
