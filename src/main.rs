//! vmquery: run a single datasource query the way alerting rules do.
//!
//! ```text
//! config file (optional) + command-line overrides
//!     → validation
//!     → datasource::init (transport, auth, lookback/step policy)
//!     → build_with_params (type, evaluation interval)
//!     → query / query-range
//!     → JSON on stdout
//! ```

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{ArgAction, Args, Parser, Subcommand};

use vmquery::config::{parse_config, validate_config, Config, ConfigError, DatasourceConfig};
use vmquery::datasource::{self, DatasourceType, QuerierBuilder, QuerierParams};
use vmquery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vmquery")]
#[command(about = "Query a VictoriaMetrics datasource with alerting-rule semantics", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    datasource: DatasourceArgs,

    /// Log level used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `[datasource]` section.
#[derive(Args)]
struct DatasourceArgs {
    /// VictoriaMetrics or vmselect url, e.g. http://127.0.0.1:8428
    #[arg(long = "datasource.url")]
    url: Option<String>,

    /// Add a type prefix to the url based on the query type
    #[arg(
        long = "datasource.appendTypePrefix",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    append_type_prefix: Option<bool>,

    /// Basic auth username
    #[arg(long = "datasource.basicAuth.username")]
    basic_auth_username: Option<String>,

    /// Basic auth password
    #[arg(long = "datasource.basicAuth.password")]
    basic_auth_password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(
        long = "datasource.tlsInsecureSkipVerify",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    tls_insecure_skip_verify: Option<bool>,

    /// Client-side TLS certificate file
    #[arg(long = "datasource.tlsCertFile")]
    tls_cert_file: Option<String>,

    /// Client-side TLS key file
    #[arg(long = "datasource.tlsKeyFile")]
    tls_key_file: Option<String>,

    /// CA file used to verify the server; default roots otherwise
    #[arg(long = "datasource.tlsCAFile")]
    tls_ca_file: Option<String>,

    /// Server name to verify; the host from the url otherwise
    #[arg(long = "datasource.tlsServerName")]
    tls_server_name: Option<String>,

    /// Backdate the `time` param of every query by this many seconds
    #[arg(long = "datasource.lookback", value_name = "SECS")]
    lookback: Option<u64>,

    /// `step` param for every query; the evaluation interval otherwise
    #[arg(long = "datasource.queryStep", value_name = "SECS")]
    query_step: Option<u64>,

    /// Idle keep-alive connections per host (groups_total * group.concurrency)
    #[arg(long = "datasource.maxIdleConnections")]
    max_idle_connections: Option<usize>,
}

impl DatasourceArgs {
    fn apply(self, config: &mut DatasourceConfig) {
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(append) = self.append_type_prefix {
            config.append_type_prefix = append;
        }
        if let Some(username) = self.basic_auth_username {
            config.basic_auth_username = username;
        }
        if let Some(password) = self.basic_auth_password {
            config.basic_auth_password = password;
        }
        if let Some(skip) = self.tls_insecure_skip_verify {
            config.tls_insecure_skip_verify = skip;
        }
        if self.tls_cert_file.is_some() {
            config.tls_cert_file = self.tls_cert_file;
        }
        if self.tls_key_file.is_some() {
            config.tls_key_file = self.tls_key_file;
        }
        if self.tls_ca_file.is_some() {
            config.tls_ca_file = self.tls_ca_file;
        }
        if self.tls_server_name.is_some() {
            config.tls_server_name = self.tls_server_name;
        }
        if let Some(lookback) = self.lookback {
            config.lookback_secs = lookback;
        }
        if self.query_step.is_some() {
            config.query_step_secs = self.query_step;
        }
        if let Some(max_idle) = self.max_idle_connections {
            config.max_idle_connections = max_idle;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run an instant query
    Query {
        expr: String,

        /// Datasource type: prometheus or graphite
        #[arg(long = "type", default_value = "prometheus")]
        datasource_type: DatasourceType,

        /// Rule evaluation interval, used as `step` when no query step is set
        #[arg(long, value_name = "SECS")]
        eval_interval: Option<u64>,
    },
    /// Run a Prometheus range query
    QueryRange {
        expr: String,

        /// Range start, unix seconds
        #[arg(long)]
        start: u64,

        /// Range end, unix seconds
        #[arg(long)]
        end: u64,

        /// Rule evaluation interval, used as `step` when no query step is set
        #[arg(long, value_name = "SECS")]
        eval_interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    cli.datasource.apply(&mut config.datasource);
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("vmquery v{} starting", env!("CARGO_PKG_VERSION"));

    validate_config(&config).map_err(ConfigError::Validation)?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let storage = match datasource::init(&config.datasource) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "Cannot initialize datasource");
            return Err(e.into());
        }
    };

    let result = match cli.command {
        Commands::Query {
            expr,
            datasource_type,
            eval_interval,
        } => {
            let querier = storage.build_with_params(QuerierParams {
                datasource_type,
                evaluation_interval: eval_interval.map(Duration::from_secs),
            });
            querier.query(&expr, SystemTime::now()).await?
        }
        Commands::QueryRange {
            expr,
            start,
            end,
            eval_interval,
        } => {
            let querier = storage.build_with_params(QuerierParams {
                datasource_type: DatasourceType::Prometheus,
                evaluation_interval: eval_interval.map(Duration::from_secs),
            });
            querier
                .query_range(
                    &expr,
                    UNIX_EPOCH + Duration::from_secs(start),
                    UNIX_EPOCH + Duration::from_secs(end),
                )
                .await?
        }
    };

    tracing::debug!(series = result.len(), "Query complete");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
