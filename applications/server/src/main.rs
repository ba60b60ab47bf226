/// Juicebox Server - shared music library and playback service
use anyhow::Context;
use clap::{Parser, Subcommand};
use juicebox_importer::{IngestOutcome, SongIngester};
use juicebox_playback::{MpdConnector, PlaybackController};
use juicebox_server::{config::ServerConfig, create_router, state::AppState};
use juicebox_storage::LocalLibrary;
use sqlx::SqlitePool;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "juicebox-server")]
#[command(about = "Juicebox shared music library and playback server", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./config.toml when present)
    #[arg(short, long, global = true, env = "JUICEBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create a new user
    AddUser {
        /// Username
        username: String,
    },
    /// List all users
    ListUsers,
    /// Import audio files from a file or directory
    Import {
        /// File or directory to import
        path: PathBuf,
        /// Username recorded as the songs' owner
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "juicebox_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ServerConfig::load_from(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::AddUser { username } => add_user(&config, &username).await?,
        Commands::ListUsers => list_users(&config).await?,
        Commands::Import { path, user } => import(&config, &path, &user).await?,
    }

    Ok(())
}

async fn open_database(config: &ServerConfig) -> anyhow::Result<SqlitePool> {
    if let Some(dir) = sqlite_parent_dir(&config.storage.database_url) {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let pool = juicebox_storage::create_pool(&config.storage.database_url).await?;
    juicebox_storage::run_migrations(&pool).await?;
    Ok(pool)
}

/// Directory holding a file-backed `sqlite://` database, if any
fn sqlite_parent_dir(database_url: &str) -> Option<PathBuf> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Juicebox Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    let pool = open_database(&config).await?;
    tracing::info!("Database connected");

    tokio::fs::create_dir_all(&config.storage.library_dir).await?;
    tokio::fs::create_dir_all(&config.storage.scratch_dir).await?;

    let library = Arc::new(LocalLibrary::new(pool.clone()));

    let ingester = Arc::new(SongIngester::new(pool, config.ingest_config())?);
    tracing::info!(
        library_dir = %config.storage.library_dir.display(),
        normalize = config.ingest.normalize,
        cover_art = config.ingest.cover_art,
        "Ingestion pipeline ready"
    );

    let address = config.device_address()?;
    let connector = Arc::new(MpdConnector::new(
        address.clone(),
        config.playback_config().timeout,
    ));
    let controller = Arc::new(PlaybackController::new(
        connector,
        library.clone(),
        config.media_root(),
        config.playback_config(),
    ));

    // The device may come up later; operations reconnect lazily
    match controller.initialize().await {
        Ok(()) => tracing::info!(device = %address, "Playback device initialized"),
        Err(e) => tracing::warn!(device = %address, "Playback device not ready: {}", e),
    }

    let app = create_router(AppState::new(library, controller, ingester));

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn add_user(config: &ServerConfig, username: &str) -> anyhow::Result<()> {
    let pool = open_database(config).await?;

    let user = juicebox_storage::users::create(&pool, username).await?;
    println!("Created user {} - {}", user.id, user.username);

    Ok(())
}

async fn list_users(config: &ServerConfig) -> anyhow::Result<()> {
    let pool = open_database(config).await?;

    let users = juicebox_storage::users::get_all(&pool).await?;

    println!("Users:");
    for user in users {
        println!("  {} - {}", user.id, user.username);
    }

    Ok(())
}

async fn import(config: &ServerConfig, path: &Path, username: &str) -> anyhow::Result<()> {
    let pool = open_database(config).await?;

    let user = juicebox_storage::users::get_by_username(&pool, username)
        .await?
        .with_context(|| format!("unknown user: {}", username))?;

    let ingester = SongIngester::new(pool, config.ingest_config())?;

    let files = if path.is_dir() {
        collect_files(path).await?
    } else {
        vec![path.to_path_buf()]
    };

    let (mut created, mut duplicates, mut failed) = (0usize, 0usize, 0usize);
    for file in files {
        match ingester.ingest_path(&file, &user).await {
            Ok(IngestOutcome::Created(song)) => {
                created += 1;
                println!("+ {} - {}", song.artist, song.title);
            }
            Ok(IngestOutcome::Duplicate { .. }) => {
                duplicates += 1;
                println!("= {}", file.display());
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %file.display(), "Skipped: {}", e);
            }
        }
    }

    println!(
        "Imported {} songs ({} duplicates, {} skipped)",
        created, duplicates, failed
    );

    Ok(())
}

/// Every regular file below `dir`, in a stable order
async fn collect_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("reading {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}
