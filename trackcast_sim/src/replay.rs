//! JSON replay of recorded server pushes.
//!
//! A replay file is an array of `{ "event": "...", "payload": { ... } }`
//! objects, in delivery order. Each entry is sent through a `ChannelPush` and
//! handled by a freshly mounted controller, exactly as a live page would.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;
use trackcast_core::{DisplayMode, InitPayload, PushEvent, ViewConfig, WeatherUpdatePayload};
use trackcast_env::{ChannelPush, PushEnvelope};

use crate::error::SimError;
use crate::generator::RouteGenerator;
use crate::runner::{Harness, ScenarioMetrics};

/// One recorded push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub handled: usize,
    pub rejected: usize,
    pub phase: String,
    pub mode: DisplayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_title: Option<String>,
    pub metrics: ScenarioMetrics,
}

/// Parses a replay document.
pub fn parse_replay(json: &str) -> Result<Vec<ReplayEntry>, SimError> {
    Ok(serde_json::from_str(json)?)
}

/// Loads and replays the file at `path`.
pub fn replay_file(path: impl AsRef<Path>, config: ViewConfig) -> Result<ReplaySummary, SimError> {
    let path = path.as_ref();
    let entries = parse_replay(&fs::read_to_string(path)?)?;
    info!("Replaying {} events from {}", entries.len(), path.display());
    replay(&entries, config)
}

/// Builds a replay document from a seeded synthetic ride: one `init` push
/// followed by one weather push.
pub fn generate_replay(
    generator: &mut RouteGenerator,
    points: usize,
    weather_every: usize,
    mode: Option<DisplayMode>,
) -> Result<Vec<ReplayEntry>, SimError> {
    let route = generator.route(points);
    let weather = generator.weather(&route, weather_every);
    let center = route
        .get(route.len() / 2)
        .map(|p| p.position())
        .ok_or_else(|| SimError::assertion("generated route is empty"))?;

    let events = [
        PushEvent::Init(InitPayload { center, zoom: 13, points: route }),
        PushEvent::WeatherUpdate(WeatherUpdatePayload { points: weather, mode }),
    ];
    events
        .iter()
        .map(|event| -> Result<ReplayEntry, SimError> {
            let envelope = event.encode()?;
            Ok(ReplayEntry {
                event: envelope.event,
                payload: serde_json::from_slice(&envelope.payload)?,
            })
        })
        .collect()
}

/// Replays `entries` against recording surfaces.
pub fn replay(entries: &[ReplayEntry], config: ViewConfig) -> Result<ReplaySummary, SimError> {
    let mut harness = Harness::mounted(config)?;
    let (tx, rx) = ChannelPush::pair();
    for entry in entries {
        tx.send(PushEnvelope::new(entry.event.as_str(), serde_json::to_vec(&entry.payload)?))?;
    }
    drop(tx);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let stats = runtime.block_on(harness.controller.run(&rx));
    harness.handled = stats.handled;

    Ok(ReplaySummary {
        events: entries.len(),
        handled: stats.handled,
        rejected: stats.rejected,
        phase: harness.controller.phase().to_string(),
        mode: harness.controller.mode(),
        chart_title: harness.chart.latest().map(|(_, options)| options.title),
        metrics: harness.metrics(),
    })
}
