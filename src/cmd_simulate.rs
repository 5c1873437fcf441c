//! `simulate` subcommand: drive the orchestrator against a snapshot with
//! in-memory collaborators.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use tourguide_core::memory::{
    MemoryStore, RecordingRenderer, RecordingTelemetry, StaticFlags, StaticTourSource,
};
use tourguide_core::{Collaborators, ManagerConfig, TourManager};
use tourguide_protocols::Properties;

use crate::cli::{OutputFormat, PageArgs};
use crate::page::{LoadedPage, describe};

pub(crate) struct SimulateOptions {
    pub store: Option<PathBuf>,
    pub flags: Vec<(String, bool)>,
    pub ticks: usize,
    pub complete: bool,
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct Outcome {
    events: Vec<Event>,
    renders: Vec<Render>,
    state: &'static str,
    active_tour: Option<String>,
    store: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct Event {
    name: String,
    properties: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct Render {
    tour_id: String,
    step_index: usize,
    target: Option<String>,
    reason: String,
}

fn load_store(path: Option<&PathBuf>) -> Result<MemoryStore> {
    let mut store = MemoryStore::new();
    if let Some(path) = path {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading store {}", path.display()))?;
        let values: BTreeMap<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("store {} must be a JSON object", path.display()))?;
        for (key, value) in values {
            store = store.with(key, value);
        }
    }
    Ok(store)
}

pub(crate) async fn run(args: &PageArgs, options: SimulateOptions, config: ManagerConfig) -> Result<()> {
    let page = LoadedPage::load(args)?;
    let store = Arc::new(load_store(options.store.as_ref())?);
    let flags = options
        .flags
        .iter()
        .fold(StaticFlags::new(), |flags, (key, enabled)| flags.with(key.clone(), *enabled));
    let telemetry = Arc::new(RecordingTelemetry::new());
    let renderer = Arc::new(RecordingRenderer::new());

    let manager = TourManager::new(
        Collaborators {
            dom: page.dom.clone(),
            source: Arc::new(StaticTourSource::new(page.tours.clone())),
            store: store.clone(),
            flags: Arc::new(flags),
            telemetry: telemetry.clone(),
            renderer: renderer.clone(),
        },
        config,
    )?;

    for tick in 0..options.ticks {
        manager.tick().await;
        info!("Tick {} done, state {}", tick + 1, manager.state().name());
    }

    if options.complete {
        let limit = manager.active_tour().map_or(0, |t| t.total_steps());
        for _ in 0..limit {
            let Some(actions) = renderer.actions() else { break };
            if manager.state().is_idle() {
                break;
            }
            actions.next();
        }
    }

    let state = manager.state();
    let outcome = Outcome {
        events: telemetry
            .events()
            .into_iter()
            .map(|(name, properties)| Event {
                name,
                properties: sorted(properties),
            })
            .collect(),
        renders: renderer
            .renders()
            .into_iter()
            .map(|r| Render {
                tour_id: r.tour.id.clone(),
                step_index: r.step_index,
                target: r.target.map(|node| describe(&page.dom, node)),
                reason: r.render_reason.to_string(),
            })
            .collect(),
        state: state.name(),
        active_tour: state.tour_id().map(str::to_string),
        store: store.entries().into_iter().collect(),
    };
    manager.stop();

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Table => print_table(&outcome),
    }
    Ok(())
}

fn sorted(properties: Properties) -> BTreeMap<String, Value> {
    properties.into_iter().collect()
}

fn print_table(outcome: &Outcome) {
    println!("Events:");
    for event in &outcome.events {
        let tour = event.properties.get("tour_id").and_then(Value::as_str).unwrap_or("-");
        let step = event
            .properties
            .get("step_index")
            .map_or_else(|| "-".to_string(), Value::to_string);
        let detail = ["render_reason", "dismiss_reason", "error"]
            .iter()
            .find_map(|key| event.properties.get(*key).and_then(Value::as_str))
            .unwrap_or("");
        println!("  {:<40} {:<16} {:<5} {}", event.name, tour, step, detail);
    }

    println!("Renders:");
    for render in &outcome.renders {
        println!(
            "  {:<16} step {:<3} {:<8} {}",
            render.tour_id,
            render.step_index,
            render.reason,
            render.target.as_deref().unwrap_or("(no target)")
        );
    }

    match &outcome.active_tour {
        Some(tour) => println!("State: {} ({})", outcome.state, tour),
        None => println!("State: {}", outcome.state),
    }

    if !outcome.store.is_empty() {
        println!("Store:");
        for (key, value) in &outcome.store {
            println!("  {} = {}", key, value);
        }
    }
}
