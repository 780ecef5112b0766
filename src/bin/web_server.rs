use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use clap::Parser;
use langprogress::{
    api::{ApiDoc, AppState, router},
    config::Config,
    notify,
    outline::CourseOutline,
    service::ProgressService,
    store::SqliteProgressStore,
    utils::init_log,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Parser)]
#[command(author, version, about = "Language course progress server")]
struct Args {
    /// TOML config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short = 'H', long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Overrides `database_url`
    #[arg(short, long)]
    database: Option<String>,
    /// Overrides `outline_path`
    #[arg(short, long)]
    outline: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_url = database;
    }
    if let Some(outline) = args.outline {
        config.outline_path = outline;
    }
    let _guard = init_log(config.log_dir.clone())?;

    let outline = Arc::new(CourseOutline::load(&config.outline_path)?);
    info!(
        "loaded outline {} with {} chapters, {} lessons",
        config.outline_path.display(),
        outline.chapters().len(),
        outline.total_lessons()
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let database = SqlitePoolOptions::new().connect_with(options).await?;
    let store = SqliteProgressStore::new(database);
    store.migrate().await?;

    let notifier = notify::from_config(&config.notifier, Config::relay_token())?;
    let service = ProgressService::new(outline, Arc::new(store), notifier);
    let state = AppState::new(service, Config::jwt_secret()?.as_bytes());

    let app = router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("listening on http://{}", listener.local_addr()?);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        config.host, config.port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
