mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};

use quay_core::{Embedder, ImageHost, RequestContext, Storage};
use quay_embed::BgeEmbedder;
use quay_tos::TosClient;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "quay",
    version,
    about = "Remote embeddings and TOS object storage from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed texts with the remote BGE service and print the vectors as JSON
    Embed {
        /// Texts to embed
        #[arg(required = true)]
        texts: Vec<String>,

        /// Also print (empty) sparse vectors
        #[arg(long)]
        hybrid: bool,
    },

    /// Upload a file
    Put {
        #[arg(short, long)]
        key: String,

        /// File to upload
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Download an object (stdout unless --out is given)
    Get {
        #[arg(short, long)]
        key: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete an object
    Delete {
        #[arg(short, long)]
        key: String,
    },

    /// Print a presigned download URL
    Url {
        #[arg(short, long)]
        key: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Print upload credentials for the image host
    UploadAuth {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Show the config file in use
    Config,
}

/// Values a web request would carry; used for proxy rewriting.
#[derive(Args)]
struct RequestArgs {
    /// Request host, e.g. `localhost:8888`
    #[arg(long)]
    host: Option<String>,

    /// Request scheme, `http` or `https`
    #[arg(long)]
    scheme: Option<String>,
}

impl RequestArgs {
    fn context(self) -> RequestContext {
        RequestContext {
            host: self.host,
            scheme: self.scheme,
        }
    }
}

fn cmd_embed(config: &Config, texts: Vec<String>, hybrid: bool) -> Result<()> {
    let embedding = config
        .embedding
        .clone()
        .context("missing [embedding] section in config")?;
    debug!(
        base_url = %embedding.base_url,
        model = %embedding.model,
        "embedding {} texts",
        texts.len()
    );
    let embedder = BgeEmbedder::new(embedding)?;

    let output = if hybrid {
        if !embedder.support_status().supports_sparse() {
            warn!("embedder is dense-only; sparse vectors will be empty");
        }
        let (dense, sparse) = embedder.embed_strings_hybrid(&texts)?;
        serde_json::json!({ "dense": dense, "sparse": sparse })
    } else {
        serde_json::json!({ "dense": embedder.embed_strings(&texts)? })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_storage(config: &Config, command: Commands) -> Result<()> {
    let storage = config
        .storage
        .as_ref()
        .context("missing [storage] section in config")?;
    debug!(
        bucket = %storage.bucket,
        endpoint = %storage.endpoint,
        "connecting to object storage"
    );
    let tos = TosClient::connect(storage)
        .await
        .context("failed to connect to object storage")?;

    match command {
        Commands::Put { key, file } => {
            let content =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let size = content.len();
            tos.put_object(&key, content).await?;
            println!("Stored {key} ({size} bytes) in {}", tos.bucket());
        }
        Commands::Get { key, out } => {
            let content = tos.get_object(&key).await?;
            match out {
                Some(path) => std::fs::write(&path, &content)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(&content)?,
            }
        }
        Commands::Delete { key } => {
            tos.delete_object(&key).await?;
            println!("Deleted {key}");
        }
        Commands::Url { key, request } => {
            let resource = tos.resource_url(&request.context(), &key).await?;
            println!("{}", resource.url);
        }
        Commands::UploadAuth { request } => {
            let ctx = request.context();
            let token = tos.upload_auth(&ctx).await?;
            let output = serde_json::json!({
                "upload_host": tos.upload_host(&ctx),
                "server_id": tos.server_id(),
                "token": token,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Embed { .. } | Commands::Config => bail!("not a storage command"),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            println!("{}", config::show_config_path());
            Ok(())
        }
        Commands::Embed { texts, hybrid } => {
            let config = config::load_config()?;
            cmd_embed(&config, texts, hybrid)
        }
        command => {
            let config = config::load_config()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(run_storage(&config, command))
        }
    }
}
