use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::assistant::{AnthropicAssistant, ContentAssistant};
use folio::auth::{generate_salt, hash_password};
use folio::database::MySqlStore;
use folio::image::{CloudinaryStore, LocalDiskStore, MediaStore};
use folio::{router, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Personal blog and portfolio backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print an ADMIN_PASSWORD_HASH value for the given password
    HashPassword {
        password: String,
        #[arg(long)]
        salt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    if let Some(Command::HashPassword { password, salt }) = cli.command {
        let salt = salt.unwrap_or_else(generate_salt);
        println!("{}", hash_password(&password, &salt));
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    serve(Config::from_env()?).await
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("starting with {:?}", &config);

    let store = MySqlStore::connect(&config.database_url).context("connecting to MySQL")?;
    store.migrate().await.context("creating schema")?;

    let media: Arc<dyn MediaStore> = match config.cloudinary.clone() {
        Some(cloudinary) => Arc::new(CloudinaryStore::new(cloudinary)?),
        None => {
            tracing::info!("Cloudinary not configured, storing uploads in {:?}", config.uploads.dir);
            Arc::new(LocalDiskStore::new(&config.uploads))
        }
    };

    let assistant: Option<Arc<dyn ContentAssistant>> = match &config.assistant {
        Some(assistant) => Some(Arc::new(AnthropicAssistant::new(assistant)?)),
        None => {
            tracing::info!("ANTHROPIC_API_KEY not set, AI endpoints will answer 503");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(store),
        media,
        assistant,
    };

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
