//! Area replay tool
//!
//! Feeds a scripted sequence of canvas events through the annotation engine,
//! saves into an in-memory backend and prints the resulting area set.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use area_core::{
    EditorConfig, EditorMode, InMemoryAreaRepository, InteractionLayer, InteractionOutcome,
    LogSink, NoticeSink, PersistenceBridge, Polygon, PolygonStore, SaveError, SharedPolygonStore,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::script::{Script, Step};

mod script;

const USAGE: &str = "usage: area-replay <script.json> [--config <editor.json>] [--fail-saves]";

struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
    fail_saves: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut script = None;
    let mut config = None;
    let mut fail_saves = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--fail-saves" => fail_saves = true,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            path if script.is_none() => script = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }

    Ok(Args {
        script: script.context(USAGE)?,
        config,
        fail_saves,
    })
}

#[derive(Serialize)]
struct Summary<'a> {
    mode: EditorMode,
    polygons: &'a [Polygon],
    draft: Option<&'a Polygon>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let script = Script::load(&args.script)?;

    let repository = InMemoryAreaRepository::new();
    if args.fail_saves {
        repository.fail_with(Some(SaveError::Network("backend unavailable".to_string())));
    }

    let store = SharedPolygonStore::new(PolygonStore::with_config(&config));
    let mut layer = InteractionLayer::new(config);
    let bridge = PersistenceBridge::new(repository, LogSink);

    replay(&script, &store, &mut layer, &bridge).await;

    let guard = store.read();
    let summary = Summary {
        mode: guard.mode(),
        polygons: guard.polygons(),
        draft: guard.draft(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn replay(
    script: &Script,
    store: &SharedPolygonStore,
    layer: &mut InteractionLayer,
    bridge: &PersistenceBridge<InMemoryAreaRepository, LogSink>,
) {
    let mut stage = script.stage;

    for (step_no, step) in script.steps.iter().enumerate() {
        match step {
            Step::Input { event } => match layer.handle_shared(store, event, &stage) {
                InteractionOutcome::Applied(command) => {
                    tracing::debug!(step_no, ?command, "applied");
                }
                InteractionOutcome::Notice(notice) => LogSink.notify(notice),
                InteractionOutcome::Ignored => tracing::debug!(step_no, ?event, "ignored"),
            },
            Step::Stage(next) => stage = *next,
            Step::Metadata { index, metadata } => {
                if let Err(err) = store.write().set_metadata(*index, metadata.clone()) {
                    tracing::warn!(step_no, error = %err, "metadata not applied");
                }
            }
            Step::Save { index } => {
                if !store.read().can_save() {
                    tracing::warn!(step_no, "save control disabled: commit the drawing or edit first");
                    continue;
                }
                // Failures were already reported through the notice sink.
                if let Ok(record) = bridge.submit(store, *index).await {
                    tracing::info!(step_no, id = %record.id, "saved");
                }
            }
            Step::SaveAll => {
                if !store.read().can_save() {
                    tracing::warn!(step_no, "save control disabled: commit the drawing or edit first");
                    continue;
                }
                let report = bridge.submit_pending(store).await;
                tracing::info!(
                    step_no,
                    saved = report.saved.len(),
                    failed = report.failed.is_some(),
                    "save all finished"
                );
            }
        }
    }
}
