//! Scenario runner - drives a `ViewController` against recording surfaces.

use crate::error::{ensure, SimError};
use crate::generator::RouteGenerator;
use crate::scenarios::ScenarioId;

use serde::Serialize;
use tracing::{debug, info};
use trackcast_core::model::eligible_weather_points;
use trackcast_core::{
    BusEvent, DisplayMode, EventBus, InitPayload, PushEvent, RouteUpdatePayload, TrackPoint, ViewConfig,
    ViewController, ViewError, WeatherTrackPoint, WeatherUpdatePayload,
};
use trackcast_env::{ChannelPush, LatLng, LayerId, MarkerIcon, RecordingChart, RecordingMap};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Push events accepted by the controller
    pub events_handled: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Surface state at the end of the run
    pub metrics: ScenarioMetrics,
}

/// Surface state collected at the end of a scenario.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    pub live_layers: usize,
    pub weather_markers: usize,
    pub chart_categories: usize,
    pub charts_destroyed: usize,
    pub popups_open: usize,
}

/// Controller wired to recording surfaces, with handles kept for inspection.
pub struct Harness {
    pub controller: ViewController<RecordingMap, RecordingChart>,
    pub map: RecordingMap,
    pub chart: RecordingChart,
    pub handled: usize,
}

impl Harness {
    /// Creates and mounts a controller.
    pub fn mounted(config: ViewConfig) -> Result<Self, SimError> {
        let map = RecordingMap::new();
        let chart = RecordingChart::new();
        let mut controller = ViewController::new(map.clone(), chart.clone(), EventBus::new(), config);
        controller.mount()?;
        Ok(Self {
            controller,
            map,
            chart,
            handled: 0,
        })
    }

    /// Encodes `event` to the wire format and pushes it through the controller.
    pub fn push(&mut self, event: PushEvent) -> Result<(), SimError> {
        let envelope = event.encode()?;
        self.controller.handle_envelope(&envelope)?;
        self.handled += 1;
        Ok(())
    }

    pub fn metrics(&self) -> ScenarioMetrics {
        ScenarioMetrics {
            live_layers: self.map.live_layer_count(),
            weather_markers: self.map.weather_markers().len(),
            chart_categories: self.chart.latest().map_or(0, |(_, options)| options.categories.len()),
            charts_destroyed: self.chart.destroyed_count(),
            popups_open: self.map.open_popups().len(),
        }
    }

    /// Original point index shown by a weather marker.
    pub fn weather_label(&self, id: LayerId) -> Option<usize> {
        self.map
            .weather_markers()
            .into_iter()
            .find(|(layer, _, _)| *layer == id)
            .and_then(|(_, _, icon)| match icon {
                MarkerIcon::Weather { label } => Some(label),
                _ => None,
            })
    }
}

/// Runs end-to-end scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Points per generated route
    points: usize,

    /// Every n-th generated point carries weather
    weather_every: usize,

    config: ViewConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            points: 120,
            weather_every: 6,
            config: ViewConfig::default(),
        }
    }

    /// Sets the generated route length.
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points.max(2);
        self
    }

    pub fn with_weather_every(mut self, every: usize) -> Self {
        self.weather_every = every.max(1);
        self
    }

    pub fn with_config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let outcome = Harness::mounted(self.config.clone()).and_then(|mut harness| {
            let checked = match scenario {
                ScenarioId::InitialRoute => self.run_initial_route(&mut harness),
                ScenarioId::WeatherAlignment => self.run_weather_alignment(&mut harness),
                ScenarioId::ChartActivation => self.run_chart_activation(&mut harness),
                ScenarioId::WeatherCleared => self.run_weather_cleared(&mut harness),
                ScenarioId::StaleActivation => self.run_stale_activation(&mut harness),
                ScenarioId::RapidUpdates => self.run_rapid_updates(&mut harness),
                ScenarioId::EmptyRoute => self.run_empty_route(&mut harness),
                ScenarioId::ModeSwitch => self.run_mode_switch(&mut harness),
                ScenarioId::DirtyWeather => self.run_dirty_weather(&mut harness),
                ScenarioId::Teardown => self.run_teardown(&mut harness),
            };
            Ok((checked, harness))
        });

        match outcome {
            Ok((checked, harness)) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: checked.is_ok(),
                events_handled: harness.handled,
                failure_reason: checked.err().map(|e| e.to_string()),
                metrics: harness.metrics(),
            },
            Err(e) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                events_handled: 0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
            },
        }
    }

    /// TC-A
    fn run_initial_route(&self, h: &mut Harness) -> Result<(), SimError> {
        let points = scripted_track(&[(52.0, 7.0), (52.1, 7.1), (52.2, 7.2)]);
        h.push(PushEvent::Init(InitPayload {
            center: LatLng::new(52.1, 7.1),
            zoom: 10,
            points: points.clone(),
        }))?;

        ensure(h.map.polylines().len() == 1, || format!("{} polylines", h.map.polylines().len()))?;
        ensure(h.map.endpoint_markers().len() == 2, || "expected two endpoint markers".into())?;
        let bounds = h
            .map
            .fitted_bounds()
            .ok_or_else(|| SimError::assertion("view was not fitted"))?;
        ensure(points.iter().all(|p| bounds.contains(p.position())), || {
            format!("bounds {:?} miss a route point", bounds)
        })?;
        ensure(h.map.view().map(|(_, zoom)| zoom) == Some(10), || "zoom not applied".into())
    }

    /// TC-B
    fn run_weather_alignment(&self, h: &mut Harness) -> Result<(), SimError> {
        self.init_generated(h)?;
        h.push(self.scripted_weather(&[1, 3], 5))?;

        let markers = h.controller.weather_markers();
        let labels: Vec<Option<usize>> = markers.iter().map(|id| h.weather_label(*id)).collect();
        ensure(labels == vec![Some(1), Some(3)], || format!("marker labels {:?}", labels))?;
        let categories = h.metrics().chart_categories;
        ensure(categories == 2, || format!("{} chart categories", categories))
    }

    /// TC-C
    fn run_chart_activation(&self, h: &mut Harness) -> Result<(), SimError> {
        self.run_weather_alignment(h)?;
        let chart = h
            .controller
            .chart()
            .ok_or_else(|| SimError::assertion("no chart drawn"))?;
        h.chart.click(chart.id, 1)?;

        let open = h.map.open_popups();
        ensure(open.len() == 1, || format!("{} popups open", open.len()))?;
        let label = h.weather_label(open[0]);
        ensure(label == Some(3), || format!("opened marker of point {:?}", label))
    }

    /// TC-D
    fn run_weather_cleared(&self, h: &mut Harness) -> Result<(), SimError> {
        self.run_weather_alignment(h)?;
        let previous = h.controller.weather_markers();
        h.push(self.scripted_weather(&[], 5))?;

        ensure(h.map.weather_markers().is_empty(), || "weather markers left".into())?;
        ensure(previous.iter().all(|id| h.map.layer(*id).is_none()), || {
            "prior markers still on the map".into()
        })?;
        let categories = h.metrics().chart_categories;
        ensure(categories == 0, || format!("{} chart categories", categories))
    }

    fn run_stale_activation(&self, h: &mut Harness) -> Result<(), SimError> {
        let route = self.init_generated(h)?;
        let mut gen = RouteGenerator::new(self.seed.wrapping_add(1));
        let long = gen.weather(&route, self.weather_every);
        let long_count = eligible_weather_points(&long).len();
        h.push(PushEvent::WeatherUpdate(WeatherUpdatePayload { points: long, mode: None }))?;

        let short = gen.weather(&route[..route.len() / 3], self.weather_every);
        let short_count = eligible_weather_points(&short).len();
        h.push(PushEvent::WeatherUpdate(WeatherUpdatePayload { points: short, mode: None }))?;

        let before = (h.map.live_layer_count(), h.map.removed_count(), h.map.open_popups());
        let report = h
            .controller
            .bus()
            .emit(BusEvent::ChartPointActivated { index: long_count.saturating_sub(1) });
        let after = (h.map.live_layer_count(), h.map.removed_count(), h.map.open_popups());

        ensure(report.failed == 0, || "stale activation surfaced an error".into())?;
        ensure(long_count <= short_count || before == after, || {
            format!("map mutated by stale index {} of {}", long_count - 1, short_count)
        })
    }

    fn run_rapid_updates(&self, h: &mut Harness) -> Result<(), SimError> {
        let mut gen = RouteGenerator::new(self.seed);
        let route = gen.route(self.points);
        let (tx, rx) = ChannelPush::pair();

        let mut events = vec![PushEvent::Init(InitPayload {
            center: route[0].position(),
            zoom: 12,
            points: route.clone(),
        })];
        for round in 0..4 {
            events.push(PushEvent::WeatherUpdate(WeatherUpdatePayload {
                points: gen.weather(&route, self.weather_every + round),
                mode: None,
            }));
        }
        events.push(PushEvent::RouteUpdate(RouteUpdatePayload {
            points: gen.route(self.points / 2),
        }));
        let last_weather = gen.weather(&route, 2);
        let expected_markers = eligible_weather_points(&last_weather).len();
        events.push(PushEvent::WeatherUpdate(WeatherUpdatePayload {
            points: last_weather,
            mode: Some(DisplayMode::Wind),
        }));

        let sent = events.len();
        for event in &events {
            tx.send(event.encode()?)?;
        }
        drop(tx);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let stats = runtime.block_on(h.controller.run(&rx));
        h.handled += stats.handled;

        ensure(stats.handled == sent && stats.rejected == 0, || format!("{:?} of {} sent", stats, sent))?;
        ensure(h.map.polylines().len() == 1, || "more than one route polyline".into())?;
        let markers = h.map.weather_markers().len();
        ensure(markers == expected_markers, || {
            format!("{} markers, expected {}", markers, expected_markers)
        })?;
        // 5 weather updates: every redraw after the first destroys its predecessor
        let destroyed = h.chart.destroyed_count();
        ensure(destroyed == 4, || format!("{} charts destroyed", destroyed))?;
        ensure(h.controller.mode() == DisplayMode::Wind, || "mode from payload ignored".into())
    }

    fn run_empty_route(&self, h: &mut Harness) -> Result<(), SimError> {
        self.init_generated(h)?;
        let before = h.controller.route();
        match h.push(PushEvent::RouteUpdate(RouteUpdatePayload { points: Vec::new() })) {
            Err(SimError::View(ViewError::EmptyRoute)) => {}
            other => return Err(SimError::assertion(format!("expected EmptyRoute, got {:?}", other))),
        }
        ensure(h.controller.route() == before, || "route changed".into())?;
        ensure(h.map.polylines().len() == 1, || "route polyline missing".into())
    }

    fn run_mode_switch(&self, h: &mut Harness) -> Result<(), SimError> {
        let route = self.init_generated(h)?;
        let weather = RouteGenerator::new(self.seed).weather(&route, self.weather_every);
        h.push(PushEvent::WeatherUpdate(WeatherUpdatePayload { points: weather, mode: None }))?;
        let markers = h.controller.weather_markers();

        for mode in DisplayMode::ALL {
            h.controller.on_mode_changed(mode)?;
            let (_, options) = h
                .chart
                .latest()
                .ok_or_else(|| SimError::assertion("no chart after mode change"))?;
            ensure(options.title.starts_with(mode.label()), || format!("title {:?}", options.title))?;
            let expected = if mode == DisplayMode::Temperature { 1 } else { 2 };
            ensure(options.series.len() == expected, || {
                format!("{} has {} series", mode, options.series.len())
            })?;
            ensure(h.controller.weather_markers() == markers, || "markers touched by mode change".into())?;
        }
        ensure(h.chart.live_chart_count() == 1, || "old charts not destroyed".into())
    }

    fn run_dirty_weather(&self, h: &mut Harness) -> Result<(), SimError> {
        let route = self.init_generated(h)?;
        let mut gen = RouteGenerator::new(self.seed)
            .with_gap_probability(0.3)
            .with_wind_faults(0.5);
        let weather = gen.weather(&route, self.weather_every);
        let eligible = eligible_weather_points(&weather).len();
        h.push(PushEvent::WeatherUpdate(WeatherUpdatePayload { points: weather, mode: None }))?;

        let markers = h.controller.weather_markers();
        ensure(markers.len() == eligible, || format!("{} of {} markers", markers.len(), eligible))?;
        ensure(markers.iter().all(|id| h.map.popup_html(*id).is_some()), || "marker without popup".into())
    }

    fn run_teardown(&self, h: &mut Harness) -> Result<(), SimError> {
        self.run_weather_alignment(h)?;
        h.controller.unmount()?;

        let metrics = h.metrics();
        ensure(metrics.live_layers == 0, || format!("{} layers left", metrics.live_layers))?;
        ensure(h.chart.live_chart_count() == 0, || "chart left".into())?;
        match h.push(PushEvent::RouteUpdate(RouteUpdatePayload {
            points: scripted_track(&[(1.0, 1.0)]),
        })) {
            Err(SimError::View(ViewError::InvalidTransition { .. })) => Ok(()),
            other => Err(SimError::assertion(format!("push after unmount: {:?}", other))),
        }
    }

    /// Pushes an init with a generated route and returns the route.
    fn init_generated(&self, h: &mut Harness) -> Result<Vec<TrackPoint>, SimError> {
        let route = RouteGenerator::new(self.seed).route(self.points);
        h.push(PushEvent::Init(InitPayload {
            center: route[0].position(),
            zoom: 12,
            points: route.clone(),
        }))?;
        Ok(route)
    }

    /// A weather update over `total` points where exactly `eligible` carry weather.
    fn scripted_weather(&self, eligible: &[usize], total: usize) -> PushEvent {
        let mut gen = RouteGenerator::new(self.seed);
        let route = gen.route(total);
        let mut points: Vec<WeatherTrackPoint> = gen.weather(&route, 1);
        for p in points.iter_mut().filter(|p| !eligible.contains(&p.index)) {
            p.is_weather_point = false;
            p.weather = None;
        }
        PushEvent::WeatherUpdate(WeatherUpdatePayload { points, mode: None })
    }
}

fn scripted_track(coords: &[(f64, f64)]) -> Vec<TrackPoint> {
    coords
        .iter()
        .enumerate()
        .map(|(index, &(lat, lon))| TrackPoint {
            index,
            lat,
            lon,
            ele: 0.0,
            time: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42).with_points(60);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{} failed: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_scenarios_pass_across_seeds() {
        for seed in [1, 7, 1234, 987_654_321] {
            let runner = ScenarioRunner::new(seed).with_points(40).with_weather_every(3);
            for scenario in [ScenarioId::StaleActivation, ScenarioId::RapidUpdates, ScenarioId::DirtyWeather] {
                let result = runner.run(scenario);
                assert!(result.passed, "{} seed {} failed: {:?}", scenario, seed, result.failure_reason);
            }
        }
    }

    #[test]
    fn test_strict_policy_still_passes_core_scenarios() {
        let config = ViewConfig {
            auto_open_first_popup: true,
            ..Default::default()
        };
        let runner = ScenarioRunner::new(5).with_config(config);
        assert!(runner.run(ScenarioId::WeatherAlignment).passed);
        let result = runner.run(ScenarioId::WeatherAlignment);
        assert_eq!(result.metrics.popups_open, 1);
    }
}
