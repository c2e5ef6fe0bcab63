use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::types::{PostStatus, PostType};

/// Command-line arguments for the product-sync binary.
#[derive(Debug, Parser)]
#[command(
    name = "product-sync",
    version,
    about = "Product Advertising API lookups, caching and import"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PRODUCT_SYNC_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Look up products and print the upstream response.
    Fetch(FetchArgs),
    /// Look up products and store them as records.
    Import(ImportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PaapiOverrides {
    /// Override the marketplace locale (com, co.uk, de, ...).
    #[arg(long = "paapi-region", value_name = "LOCALE")]
    pub paapi_region: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "paapi-timeout-seconds", value_name = "SECONDS")]
    pub paapi_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the directory imported images are written to.
    #[arg(long = "media-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub media_directory: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub paapi: PaapiOverrides,

    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the number of cached responses kept in memory.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Enable or disable the response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub paapi: PaapiOverrides,

    /// Comma-separated product identifiers.
    #[arg(value_name = "IDS")]
    pub ids: String,

    /// Bypass the cache for this lookup.
    #[arg(long = "test-connection", action = clap::ArgAction::SetTrue)]
    pub test_connection: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub paapi: PaapiOverrides,

    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Comma-separated product identifiers (at most 10).
    #[arg(value_name = "IDS")]
    pub ids: String,

    /// Status given to created records (publish|draft|private).
    #[arg(long = "post-status", value_name = "STATUS", default_value = "publish")]
    pub post_status: PostStatus,

    /// Kind of record to create (post|page).
    #[arg(long = "post-type", value_name = "TYPE", default_value = "post")]
    pub post_type: PostType,
}
