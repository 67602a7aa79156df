use clap::Parser;
use notify_rs::config::Config;
use notify_rs::delivery::{AuditSink, DeliveryOrchestrator, LogAuditSink, SqliteAuditSink};
use notify_rs::mapping::MappingOptions;
use notify_rs::pipeline::{MemoryStore, SubmissionProcessor};
use notify_rs::submission::SubmissionPayload;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Process one form submission through the notification pipeline
#[derive(Parser, Debug)]
#[command(name = "notify-rs", version)]
struct Args {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// JSON file with an array of form schemas
    #[arg(long)]
    forms: String,

    /// JSON file with an array of {rule, template} entries
    #[arg(long)]
    rules: String,

    /// JSON file with the submission payload (field id -> value)
    #[arg(long)]
    submission: String,

    /// Form the submission belongs to
    #[arg(long)]
    form_id: String,

    /// Submission id used in audit records
    #[arg(long, default_value = "cli-submission")]
    submission_id: String,

    /// SQLite database for audit records (logs only when omitted)
    #[arg(long)]
    audit_db: Option<String>,

    /// Extra template variable as key=value (repeatable), e.g.
    /// --var bookingLink=https://example.com/b/123
    #[arg(long = "var", value_parser = parse_key_value)]
    vars: Vec<(String, String)>,

    /// Emit one debug line per mapping decision
    #[arg(long)]
    trace_mapping: bool,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration before logging so the level is honored
    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };

    let level = match config.logging.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting notify-rs");
    config.validate()?;

    let mut store = MemoryStore::new();
    store.load_forms(&std::fs::read_to_string(&args.forms)?)?;
    store.load_rules(&std::fs::read_to_string(&args.rules)?)?;
    let store = Arc::new(store);

    let payload: SubmissionPayload =
        serde_json::from_str(&std::fs::read_to_string(&args.submission)?)?;

    let audit: Arc<dyn AuditSink> = match &args.audit_db {
        Some(url) => Arc::new(SqliteAuditSink::new(url).await?),
        None => Arc::new(LogAuditSink),
    };

    let orchestrator = Arc::new(DeliveryOrchestrator::from_config(
        &config.delivery,
        audit.clone(),
    )?);

    let processor = SubmissionProcessor::new(store.clone(), store, orchestrator, audit)
        .with_mapping_options(MappingOptions {
            trace: args.trace_mapping,
        })
        .with_template_vars(args.vars);

    let summary = processor
        .process(&args.form_id, &args.submission_id, &payload)
        .await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
