use anyhow::Result;
use bucket_upload_core::{PredefinedAcl, DEFAULT_CONCURRENCY};
use clap::{ArgAction, Parser};
use color_eyre::config::HookBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod handlers;

/// bucket-upload - upload files to an object storage bucket
///
/// Every option can also be supplied through the `INPUT_<NAME>` environment
/// variables set by the GitHub Actions runner.
#[derive(Parser, Debug)]
#[command(name = "bucket-upload")]
#[command(version)]
#[command(about = "Upload local files and directories to an object storage bucket", long_about = None)]
pub struct Cli {
    /// File or directory to upload; several paths may be given, one per line
    #[arg(long, env = "INPUT_PATH")]
    pub path: String,

    /// Target as bucket[/prefix]
    #[arg(long, env = "INPUT_DESTINATION")]
    pub destination: String,

    /// Glob selecting files under a directory path
    #[arg(long, env = "INPUT_GLOB", default_value = "")]
    pub glob: String,

    /// Compress objects with gzip
    #[arg(long, env = "INPUT_GZIP", default_value_t = true, action = ArgAction::Set)]
    pub gzip: bool,

    /// Use resumable (multipart) uploads for large files
    #[arg(long, env = "INPUT_RESUMABLE", default_value_t = true, action = ArgAction::Set)]
    pub resumable: bool,

    /// Put the directory name in front of every object key
    #[arg(long, env = "INPUT_PARENT", default_value_t = true, action = ArgAction::Set)]
    pub parent: bool,

    /// Maximum number of simultaneous uploads
    #[arg(long, env = "INPUT_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Predefined ACL applied to every object
    #[arg(long = "predefined-acl", env = "INPUT_PREDEFINEDACL")]
    pub predefined_acl: Option<PredefinedAcl>,

    /// Object headers, one `key: value` per line
    #[arg(long, env = "INPUT_HEADERS")]
    pub headers: Option<String>,

    /// Skip files matched by the .gcloudignore file
    #[arg(long, env = "INPUT_PROCESS_GCLOUDIGNORE", default_value_t = true, action = ArgAction::Set)]
    pub process_gcloudignore: bool,

    /// Ignore file to use instead of <workspace>/.gcloudignore
    #[arg(long, env = "INPUT_GCLOUDIGNORE_PATH")]
    pub gcloudignore_path: Option<PathBuf>,

    /// Directory relative paths are resolved against
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Storage configuration file (default: ~/.config/bucket-upload/config.toml)
    #[arg(long, env = "INPUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage endpoint URL, overrides the configuration file
    #[arg(long, env = "INPUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Storage region, overrides the configuration file
    #[arg(long, env = "INPUT_REGION")]
    pub region: Option<String>,

    /// Print the planned uploads without contacting the store
    #[arg(long)]
    pub dry_run: bool,

    /// Print uploaded object names as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Logs go to stderr so stdout only carries results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    handlers::handle_upload(cli).await
}
