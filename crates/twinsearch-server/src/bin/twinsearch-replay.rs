//! Replays twin change records through the updater.
//!
//! Reads newline-delimited JSON records, indexes them into the in-memory
//! store and prints one JSON outcome per record.
//!
//! # Usage
//!
//! ```bash
//! twinsearch-replay --input changes.ndjson
//! cat changes.ndjson | TWINSEARCH_UPDATER__MAX_BATCH_SIZE=50 twinsearch-replay
//! ```
//!
//! Record format:
//!
//! ```json
//! {"kind":"modified","thing":{"thingId":"org.acme:sensor-1","_revision":1},"policy":{...},"policyRevision":1}
//! {"kind":"deleted","thingId":"org.acme:sensor-1","revision":2}
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};

use twinsearch_domain::{EnforcedThingMapper, MappingError, MappingResult, PolicyEnforcer, WriteModel};
use twinsearch_server::observability::{describe_updater_metrics, init_logging, LoggingConfig};
use twinsearch_server::{ItemOutcome, Outcome, SearchUpdater, ThingEvent, TwinsearchConfig};
use twinsearch_storage::MemoryDocumentStore;

/// Replay twin change records into a search index
#[derive(Parser, Debug)]
#[command(name = "twinsearch-replay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Newline-delimited records; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record {
    Modified {
        thing: Value,
        #[serde(default)]
        policy: Option<Value>,
        #[serde(default, rename = "policyRevision")]
        policy_revision: Option<u64>,
    },
    Deleted {
        #[serde(rename = "thingId")]
        thing_id: String,
        revision: u64,
        #[serde(default, rename = "policyId")]
        policy_id: Option<String>,
        #[serde(default, rename = "policyRevision")]
        policy_revision: Option<u64>,
    },
}

impl Record {
    fn into_event(self) -> MappingResult<ThingEvent> {
        match self {
            Record::Modified {
                thing,
                policy: Some(policy),
                policy_revision,
            } => {
                let enforcer = PolicyEnforcer::from_json(&policy)?;
                Ok(ThingEvent::modified(
                    thing,
                    Arc::new(enforcer),
                    policy_revision.unwrap_or(0),
                ))
            }
            Record::Modified { thing, .. } => Ok(ThingEvent::ModifiedWithAcl { thing }),
            Record::Deleted {
                thing_id,
                revision,
                policy_id,
                policy_revision,
            } => Ok(ThingEvent::Deleted {
                thing_id,
                revision,
                policy_id,
                policy_revision: policy_revision.unwrap_or(0),
            }),
        }
    }
}

fn parse_line(line: &str, mapper: &EnforcedThingMapper) -> MappingResult<WriteModel> {
    let record: Record = serde_json::from_str(line).map_err(|e| MappingError::InvalidJson {
        message: e.to_string(),
    })?;
    record.into_event()?.into_write_model(mapper)
}

/// Non-empty lines of `reader`. A read error ends the stream and sets `failed`.
fn lines<R>(reader: R, failed: Arc<AtomicBool>) -> impl Stream<Item = String> + Send + 'static
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(reader.lines(), move |mut lines| {
        let failed = Arc::clone(&failed);
        async move {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => return Some((line, lines)),
                    Ok(None) => return None,
                    Err(e) => {
                        error!(error = %e, "failed to read input");
                        failed.store(true, Ordering::SeqCst);
                        return None;
                    }
                }
            }
        }
    })
}

fn render(outcome: &ItemOutcome) -> Value {
    let mut line = json!({
        "sequence": outcome.sequence,
        "thingId": outcome.thing_id,
        "outcome": outcome.outcome.label(),
        "attempts": outcome.attempts,
    });
    if let Outcome::Failed(reason) = &outcome.outcome {
        line["error"] = Value::String(reason.to_string());
    }
    line
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        TwinsearchConfig::load(&config_path)?
    } else {
        TwinsearchConfig::from_env()?
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    describe_updater_metrics();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting twinsearch replay");

    let store = Arc::new(
        MemoryDocumentStore::new().with_max_document_bytes(config.storage.max_document_bytes),
    );
    let mapper = EnforcedThingMapper::new(config.updater.to_mapper_config());
    let updater = SearchUpdater::with_mapper(
        Arc::clone(&store),
        config.updater.to_updater_config(),
        mapper.clone(),
    )?;

    let shutdown = updater.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, draining pending records");
            shutdown.shutdown();
        }
    });

    let read_failed = Arc::new(AtomicBool::new(false));
    let input = match args.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            lines(BufReader::new(file), Arc::clone(&read_failed)).boxed()
        }
        None => lines(BufReader::new(tokio::io::stdin()), Arc::clone(&read_failed)).boxed(),
    };

    let items = input.map(move |line| parse_line(&line, &mapper));
    let mut outcomes = updater.run(items);

    let mut total = 0usize;
    let mut failed = 0usize;
    while let Some(outcome) = outcomes.next().await {
        total += 1;
        if !outcome.outcome.is_success() {
            failed += 1;
        }
        println!("{}", render(&outcome));
    }

    info!(total, failed, documents = store.len(), "Replay finished");

    if read_failed.load(Ordering::SeqCst) {
        anyhow::bail!("input could not be read completely");
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {total} records failed");
    }
    Ok(())
}
