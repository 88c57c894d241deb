mod alerts;
mod client;
mod config;
mod display_helpers;
mod metrics;
mod model;
mod query;
mod rules;
mod runtime;
mod targets;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use client::HttpClient;
use config::{Config, ConfigError, ServerOverrides};
use display_helpers::styled_error;
use log::debug;
use std::time::Duration;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nGit Revision: ",
    env!("PROMCLI_GIT_REVISION"),
    "\nBuild Time:   ",
    env!("PROMCLI_BUILD_TIME"),
);

#[derive(Parser)]
#[command(
    name = "promcli",
    version,
    long_version = LONG_VERSION,
    about = "Query a Prometheus server from the command line",
    long_about = "Inspect targets, alerts, rules, metric metadata and runtime info of a running Prometheus server, or run PromQL queries against it."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    server: ServerArgs,

    /// Diagnostic logging on stderr (-D, -DD, -DDD)
    #[arg(short = 'D', long = "debug", action = clap::ArgAction::Count, global = true)]
    debug: u8,
}

#[derive(Args)]
struct ServerArgs {
    /// URL of the Prometheus server
    #[arg(long, env = "PROMCLI_URL", global = true, conflicts_with = "address")]
    url: Option<String>,

    /// Host or IP address of the Prometheus server (port 9090)
    #[arg(long, env = "PROMCLI_ADDRESS", global = true)]
    address: Option<String>,

    /// Request timeout in seconds [default: 30]
    #[arg(long, env = "PROMCLI_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, env = "PROMCLI_INSECURE", global = true)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show scrape targets
    Targets {
        /// Only targets of this job
        #[arg(long)]
        job: Option<String>,

        /// Only active targets
        #[arg(long)]
        active: bool,

        /// Only active targets that are down (implies --active)
        #[arg(long)]
        down: bool,

        /// Only print the number of matching active targets
        #[arg(long)]
        count: bool,

        /// Also print discovered labels
        #[arg(long)]
        verbose: bool,
    },

    /// Show active alerts grouped by name
    Alerts {
        /// Only alerts with this severity label
        #[arg(long, conflicts_with = "critical")]
        severity: Option<String>,

        /// Only critical alerts (same as --severity critical)
        #[arg(long)]
        critical: bool,

        /// Only print the number of alerts reported by the server
        #[arg(long)]
        count: bool,
    },

    /// Show metric metadata per job
    Metrics {
        /// Only metrics of this job
        #[arg(long)]
        job: Option<String>,

        /// Only print the number of metrics
        #[arg(long)]
        count: bool,

        /// Print job,metric,help,type rows
        #[arg(long)]
        csv: bool,

        /// Include metric units
        #[arg(long)]
        verbose: bool,
    },

    /// Run a PromQL query
    Query {
        /// PromQL expression
        #[arg(short, long)]
        query: String,

        /// Run a range query covering this much time back from now (e.g. 1h)
        #[arg(long, value_parser = humantime::parse_duration)]
        len: Option<Duration>,

        /// Range query resolution
        #[arg(long, default_value = "1m", value_parser = query::parse_step)]
        step: Duration,

        /// Print how long the query took
        #[arg(long)]
        timed: bool,

        /// Leave sample timestamps out of the output
        #[arg(long)]
        skip_timestamp: bool,
    },

    /// Show server runtime information
    Runtime,

    /// List rule groups, or show one rule in detail
    Rules {
        /// Show details of the rule with this name
        #[arg(long, conflicts_with = "group")]
        rule: Option<String>,

        /// Only list rules of this group
        #[arg(long)]
        group: Option<String>,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        if is_broken_pipe(&err) {
            debug!("stdout closed early");
            return;
        }
        eprintln!("{} {:#}", styled_error("error:"), err);
        std::process::exit(1);
    }
}

/// The reader of our stdout went away (`promcli targets | head -1`).
fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
    })
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    if let Some(path) = config.source() {
        debug!("loaded config from {}", path.display());
    }

    let overrides = ServerOverrides {
        url: cli.server.url,
        address: cli.server.address,
        timeout: cli.server.timeout,
        insecure: cli.server.insecure,
    };
    let server = match config.resolve(&overrides) {
        Ok(server) => server,
        Err(err @ ConfigError::MissingServer) => {
            Cli::command()
                .error(ErrorKind::MissingRequiredArgument, err)
                .exit();
        }
        Err(err) => return Err(err.into()),
    };
    debug!("using {} (timeout {:?})", server.endpoint, server.timeout);

    let api = HttpClient::new(&server)?;

    match cli.command {
        Commands::Targets {
            job,
            active,
            down,
            count,
            verbose,
        } => {
            let args = targets::TargetArgs::new(job, active, down, count, verbose);
            targets::run(&api, &args).await
        }
        Commands::Alerts {
            severity,
            critical,
            count,
        } => {
            let args = alerts::AlertArgs {
                severity: if critical {
                    Some("critical".to_string())
                } else {
                    severity
                },
                count_only: count,
            };
            alerts::run(&api, &args).await
        }
        Commands::Metrics {
            job,
            count,
            csv,
            verbose,
        } => {
            let args = metrics::MetricArgs {
                job,
                count_only: count,
                csv,
                verbose,
            };
            metrics::run(&api, &args).await
        }
        Commands::Query {
            query,
            len,
            step,
            timed,
            skip_timestamp,
        } => {
            let range = match len {
                Some(len) => Some(query::range_ending_at(chrono::Utc::now(), len, step)?),
                None => None,
            };
            let args = query::QueryArgs {
                query,
                range,
                timed,
                skip_timestamp,
            };
            query::run(&api, &args).await
        }
        Commands::Runtime => runtime::run(&api).await,
        Commands::Rules { rule, group } => {
            let args = rules::RuleArgs {
                rule_name: rule,
                rule_group: group,
            };
            rules::run(&api, &args).await
        }
    }
}
