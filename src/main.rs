use anyhow::Result;
use clap::{Parser, ValueEnum};
use ostack::config::{self, CloudConfig, Config};
use ostack::openstack::http::api_error_hint;
use ostack::openstack::{identity, OpenStackClient};
use ostack::output::{self, OutputFormat};
use ostack::resource::{self, DeleteTargets, ListRequest, Matcher, Registry};
use ostack::OstackError;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Query and bulk-manage OpenStack resources
#[derive(Parser, Debug)]
#[command(name = "ostack", version, about, long_about = None)]
struct Args {
    /// Resource kind: server, image, port, network, baremetal-node, volume, project
    kind: String,

    /// Action to perform
    #[arg(value_enum)]
    action: Action,

    /// Delete targets: comma-separated IDs, or '-' to read a JSON array from stdin
    target: Option<String>,

    /// Show only rows where FIELD contains VALUE, ignoring case (repeatable)
    #[arg(short, long = "match", value_name = "FIELD=VALUE")]
    matchers: Vec<Matcher>,

    /// Sort output by this column
    #[arg(short, long)]
    sort: Option<String>,

    /// Columns to show, comma-separated
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Delete without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Print what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Cloud from clouds.yaml (defaults to OS_CLOUD)
    #[arg(long)]
    cloud: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    List,
    Delete,
    /// List the columns available for a kind
    Fields,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("ostack started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ostack").join("ostack.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".ostack").join("ostack.log");
    }
    PathBuf::from("ostack.log")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {err:#}");
            if let Some(hint) = api_error_hint(&err) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    let registry = Registry::global();
    let descriptor = registry.lookup(&args.kind)?;

    match args.action {
        Action::List => {
            let (client, cloud) = connect(args.cloud.as_deref())?;
            let context = identity::complete_context(&client, cloud.context()).await;

            let request = ListRequest::new(args.columns.clone(), args.matchers.clone());
            let mut resolved =
                resource::resolve(&args.kind, &request, registry, &client, &context).await?;

            if let Some(field) = &args.sort {
                output::sort_rows(&mut resolved, field)?;
            }

            println!("{}", output::render(&resolved, args.format)?);
            Ok(ExitCode::SUCCESS)
        }
        Action::Fields => {
            let (client, cloud) = connect(args.cloud.as_deref())?;
            let context = identity::complete_context(&client, cloud.context()).await;

            let collection = resource::fetch(descriptor, &client, &context).await?;
            for field in resource::valid_fields(descriptor, &collection) {
                println!("{field}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Action::Delete => delete(args, registry).await,
    }
}

async fn delete(args: &Args, registry: &Registry) -> Result<ExitCode> {
    let target = args.target.as_deref().ok_or_else(|| {
        OstackError::InvalidTarget("delete needs comma-separated IDs or '-' as target".to_string())
    })?;
    let from_stdin = target == "-";
    let targets = DeleteTargets::parse(target, io::stdin().lock())?;

    for item in targets.iter() {
        println!("{item}");
    }

    if args.dry_run {
        eprintln!("Dry run: {} {} resource(s) would be deleted", targets.len(), args.kind);
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes {
        if from_stdin {
            return Err(anyhow::anyhow!(
                "Targets were read from stdin, so confirmation cannot be asked; pass --yes"
            ));
        }
        let prompt = format!("Delete {} {} resource(s)? [y/N] ", targets.len(), args.kind);
        if !confirm(&prompt, io::stdin().lock())? {
            eprintln!("Aborted");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let (client, _) = connect(args.cloud.as_deref())?;
    let report = resource::delete(&args.kind, &targets, registry, &client).await?;

    for deleted in &report.deleted {
        println!("Deleted {deleted}");
    }
    for failure in &report.failures {
        eprintln!("Failed to delete {}: {}", failure.target, failure.error);
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{} of {} deletions failed",
            report.failures.len(),
            targets.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

/// Load clouds.yaml, pick a cloud and apply environment overrides
fn connect(cloud_name: Option<&str>) -> Result<(OpenStackClient, CloudConfig)> {
    let config = Config::load()?;
    let requested = cloud_name
        .map(str::to_string)
        .or_else(|| config::env_var("OS_CLOUD"));
    let cloud = config
        .select_cloud(requested.as_deref())?
        .with_env_overrides(config::env_var);

    tracing::info!(
        "Using cloud {:?} with {} endpoint(s)",
        requested.as_deref().or(config.default_cloud.as_deref()),
        cloud.endpoints.len()
    );

    let client = OpenStackClient::new(&cloud)?;
    Ok((client, cloud))
}

fn confirm(prompt: &str, mut input: impl BufRead) -> io::Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_list_flags() {
        let args = Args::try_parse_from([
            "ostack", "server", "list", "-m", "status=active", "-m", "name=web", "-c", "name,id",
            "-s", "name", "-f", "json",
        ])
        .unwrap();

        assert_eq!(args.kind, "server");
        assert_eq!(args.action, Action::List);
        assert_eq!(
            args.matchers,
            vec![Matcher::new("status", "active"), Matcher::new("name", "web")]
        );
        assert_eq!(args.columns, vec!["name", "id"]);
        assert_eq!(args.sort.as_deref(), Some("name"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_args_parse_delete_target() {
        let args = Args::try_parse_from(["ostack", "volume", "delete", "a,b", "--yes"]).unwrap();
        assert_eq!(args.action, Action::Delete);
        assert_eq!(args.target.as_deref(), Some("a,b"));
        assert!(args.yes);
    }

    #[test]
    fn test_args_reject_bad_matcher() {
        assert!(Args::try_parse_from(["ostack", "server", "list", "-m", "status"]).is_err());
    }

    #[test]
    fn test_confirm() {
        assert!(confirm("", "y\n".as_bytes()).unwrap());
        assert!(confirm("", "YES\n".as_bytes()).unwrap());
        assert!(!confirm("", "\n".as_bytes()).unwrap());
        assert!(!confirm("", "nope\n".as_bytes()).unwrap());
    }
}
