//! View Controller - page-level state machine driving the renderers.
//!
//! ```text
//! Unmounted ──mount──► Mounted(no route) ──init──► Mounted(route) ──weather──► Mounted(route+weather)
//!                             │                         │                             │
//!                             └──────────────unmount────┴─────────────────────────────┴──► Closed
//! ```
//!
//! The map surface and its registry live behind one mutex, and so do the
//! chart surface and its last inputs. Bus handlers registered in `mount` lock
//! the same state the push handlers do, so every family still goes
//! clear → render → set without interleaving.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use trackcast_env::{LayerId, MapSurface, ChartSurface, PushChannel, PushEnvelope};

use crate::bus::{BusEvent, EventBus, EventName, Subscription};
use crate::chart::{render_chart, ChartHandle};
use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::geometry::{bounds_of, to_polyline};
use crate::model::{eligible_weather_points, DisplayMode, TrackPoint, WeatherTrackPoint};
use crate::payload::{InitPayload, PushEvent, RouteUpdatePayload, WeatherUpdatePayload};
use crate::registry::{OverlayRegistry, RouteOverlay};
use crate::route::render_route;
use crate::weather::render_weather_markers;

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Constructed, not yet attached
    Unmounted,
    /// Mounted, no route drawn yet
    NoRoute,
    /// Route drawn
    Route,
    /// Route and weather drawn
    RouteWeather,
    /// Torn down; terminal
    Closed,
}

impl ViewPhase {
    pub fn is_mounted(&self) -> bool {
        matches!(self, ViewPhase::NoRoute | ViewPhase::Route | ViewPhase::RouteWeather)
    }

    pub fn has_route(&self) -> bool {
        matches!(self, ViewPhase::Route | ViewPhase::RouteWeather)
    }
}

impl std::fmt::Display for ViewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewPhase::Unmounted => write!(f, "Unmounted"),
            ViewPhase::NoRoute => write!(f, "Mounted(no route)"),
            ViewPhase::Route => write!(f, "Mounted(route)"),
            ViewPhase::RouteWeather => write!(f, "Mounted(route+weather)"),
            ViewPhase::Closed => write!(f, "Unmounted(closed)"),
        }
    }
}

/// Map surface plus the registry of handles drawn on it.
pub struct MapView<M> {
    pub map: M,
    pub registry: OverlayRegistry,
}

impl<M: MapSurface> MapView<M> {
    /// Opens the popup of the `index`-th weather marker.
    ///
    /// Returns `Ok(false)` when the index is stale (no such marker).
    pub fn activate(&mut self, index: usize) -> Result<bool, ViewError> {
        match self.registry.open_weather_popup(&mut self.map, index) {
            Ok(()) => Ok(true),
            Err(ViewError::StaleIndexReference { index, len }) => {
                debug!("ignoring stale activation {} ({} markers)", index, len);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn teardown(&mut self) -> usize {
        self.registry.clear_route(&mut self.map) + self.registry.clear_weather_markers(&mut self.map)
    }
}

/// Chart surface plus what it was last drawn from.
struct ChartView<C> {
    surface: C,
    current: Option<ChartHandle>,

    /// Last weather points received; `None` until the first weather update
    points: Option<Vec<WeatherTrackPoint>>,
    mode: DisplayMode,
}

impl<C: ChartSurface> ChartView<C> {
    /// Destroys the current chart and draws a new one from the stored inputs.
    fn redraw(&mut self, bus: &EventBus, config: &ViewConfig) -> Result<ChartHandle, ViewError> {
        self.destroy();
        let points = self.points.as_deref().unwrap_or_default();
        let handle = render_chart(&mut self.surface, points, self.mode, bus, config)?;
        self.current = Some(handle);
        Ok(handle)
    }

    /// Switches mode; redraws only if weather has been received.
    fn select(&mut self, mode: DisplayMode, bus: &EventBus, config: &ViewConfig) -> Result<Option<ChartHandle>, ViewError> {
        self.mode = mode;
        if self.points.is_none() {
            debug!("mode set to {} before any weather update", mode);
            return Ok(None);
        }
        self.redraw(bus, config).map(Some)
    }

    fn destroy(&mut self) {
        if let Some(old) = self.current.take() {
            if let Err(e) = self.surface.destroy_chart(old.id) {
                warn!("destroying {}: {}", old.id, e);
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters reported by `ViewController::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub handled: usize,
    pub rejected: usize,
}

/// Page-level controller owning the map and chart state.
pub struct ViewController<M: MapSurface, C: ChartSurface> {
    config: Arc<ViewConfig>,
    bus: EventBus,
    map: Arc<Mutex<MapView<M>>>,
    chart: Arc<Mutex<ChartView<C>>>,
    phase: ViewPhase,
    subscriptions: Vec<Subscription>,
}

impl<M: MapSurface, C: ChartSurface> ViewController<M, C> {
    pub fn new(map: M, chart: C, bus: EventBus, config: ViewConfig) -> Self {
        let mode = config.initial_mode;
        Self {
            config: Arc::new(config),
            bus,
            map: Arc::new(Mutex::new(MapView {
                map,
                registry: OverlayRegistry::new(),
            })),
            chart: Arc::new(Mutex::new(ChartView {
                surface: chart,
                current: None,
                points: None,
                mode,
            })),
            phase: ViewPhase::Unmounted,
            subscriptions: Vec::new(),
        }
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Mode the chart is (or will be) drawn in.
    pub fn mode(&self) -> DisplayMode {
        lock(&self.chart).mode
    }

    /// Currently displayed chart, if any.
    pub fn chart(&self) -> Option<ChartHandle> {
        lock(&self.chart).current
    }

    pub fn route(&self) -> Option<RouteOverlay> {
        lock(&self.map).registry.route().cloned()
    }

    pub fn weather_markers(&self) -> Vec<LayerId> {
        lock(&self.map).registry.weather_markers().to_vec()
    }

    /// Attaches to the bus. Valid once, from `Unmounted`.
    pub fn mount(&mut self) -> Result<(), ViewError> {
        if self.phase != ViewPhase::Unmounted {
            return Err(self.reject("mount"));
        }

        let map = Arc::clone(&self.map);
        self.subscriptions.push(self.bus.on(EventName::ChartPointActivated, move |event| {
            match event {
                BusEvent::ChartPointActivated { index } => lock(&map).activate(*index).map(|_| ()),
                _ => Ok(()),
            }
        }));

        let chart = Arc::clone(&self.chart);
        let bus = self.bus.clone();
        let config = Arc::clone(&self.config);
        self.subscriptions.push(self.bus.on(EventName::ChartModeSelected, move |event| {
            match event {
                BusEvent::ChartModeSelected { mode } => lock(&chart).select(*mode, &bus, &config).map(|_| ()),
                _ => Ok(()),
            }
        }));

        self.phase = ViewPhase::NoRoute;
        info!("view mounted");
        Ok(())
    }

    /// Routes a decoded push event to its handler.
    pub fn dispatch(&mut self, event: PushEvent) -> Result<(), ViewError> {
        debug!("handling {} in {}", event.name(), self.phase);
        match event {
            PushEvent::Init(p) => self.handle_init(p),
            PushEvent::RouteUpdate(p) => self.handle_route_update(p),
            PushEvent::WeatherUpdate(p) => self.handle_weather_update(p),
        }
    }

    /// Decodes and dispatches one wire envelope.
    pub fn handle_envelope(&mut self, envelope: &PushEnvelope) -> Result<(), ViewError> {
        let event = PushEvent::decode(envelope)?;
        self.dispatch(event)
    }

    /// Sets the initial view and draws the first route.
    pub fn handle_init(&mut self, payload: InitPayload) -> Result<(), ViewError> {
        if !self.phase.is_mounted() {
            return Err(self.reject("init"));
        }
        if payload.points.is_empty() {
            warn!("empty init payload; keeping previous view and route");
            return Err(ViewError::EmptyRoute);
        }
        lock(&self.map).map.set_view(payload.center, payload.zoom);
        self.replace_route(&payload.points)?;
        if self.phase == ViewPhase::NoRoute {
            self.phase = ViewPhase::Route;
        }
        Ok(())
    }

    /// Replaces the drawn route.
    pub fn handle_route_update(&mut self, payload: RouteUpdatePayload) -> Result<(), ViewError> {
        if !self.phase.has_route() {
            return Err(self.reject("routeUpdate"));
        }
        self.replace_route(&payload.points)
    }

    /// Replaces the weather markers and redraws the chart.
    ///
    /// Markers and chart are independent families: a failure in one is
    /// logged and returned after the other has been drawn.
    pub fn handle_weather_update(&mut self, payload: WeatherUpdatePayload) -> Result<(), ViewError> {
        if !self.phase.has_route() {
            return Err(self.reject("weatherUpdate"));
        }
        if self.config.require_weather_points && eligible_weather_points(&payload.points).is_empty() {
            warn!("weather update without eligible points; keeping previous markers");
            return Err(ViewError::NoWeatherData);
        }

        let markers = self.replace_weather_markers(&payload.points);

        let chart = {
            let mut chart = lock(&self.chart);
            if let Some(mode) = payload.mode {
                chart.mode = mode;
            }
            chart.points = Some(payload.points);
            chart.redraw(&self.bus, &self.config)
        };
        if let Err(e) = &chart {
            warn!("chart render failed: {}", e);
        }

        self.phase = ViewPhase::RouteWeather;
        markers.and(chart.map(|_| ()))
    }

    /// Redraws the chart in `mode` with the last weather points; markers are untouched.
    pub fn on_mode_changed(&mut self, mode: DisplayMode) -> Result<Option<ChartHandle>, ViewError> {
        if !self.phase.is_mounted() {
            return Err(self.reject("modeChanged"));
        }
        lock(&self.chart).select(mode, &self.bus, &self.config)
    }

    /// Opens the popup of the `index`-th weather marker, if it exists.
    pub fn on_chart_point_activated(&mut self, index: usize) -> Result<bool, ViewError> {
        if !self.phase.is_mounted() {
            return Err(self.reject("chartPointActivated"));
        }
        lock(&self.map).activate(index)
    }

    /// Clears both overlay families, destroys the chart and drops every
    /// subscription. Terminal.
    pub fn unmount(&mut self) -> Result<(), ViewError> {
        if !self.phase.is_mounted() {
            return Err(self.reject("unmount"));
        }
        self.subscriptions.clear();
        let removed = lock(&self.map).teardown();
        {
            let mut chart = lock(&self.chart);
            chart.destroy();
            chart.points = None;
        }
        self.phase = ViewPhase::Closed;
        info!("view unmounted ({} layers removed)", removed);
        Ok(())
    }

    /// Handles pushes in delivery order until the channel closes or the view
    /// is unmounted.
    pub async fn run<P: PushChannel + ?Sized>(&mut self, channel: &P) -> RunStats {
        let mut stats = RunStats::default();
        while let Some(envelope) = channel.recv().await {
            match self.handle_envelope(&envelope) {
                Ok(()) => stats.handled += 1,
                Err(e) => {
                    warn!("push #{} ({}) rejected: {}", envelope.sequence, envelope.event, e);
                    stats.rejected += 1;
                }
            }
            if self.phase == ViewPhase::Closed {
                break;
            }
        }
        debug!("push loop finished: {:?}", stats);
        stats
    }

    fn replace_route(&mut self, points: &[TrackPoint]) -> Result<(), ViewError> {
        if points.is_empty() {
            warn!("empty route payload; keeping previous route");
            return Err(ViewError::EmptyRoute);
        }
        let mut view = lock(&self.map);
        let MapView { map, registry } = &mut *view;
        registry.clear_route(map);
        let overlay = render_route(map, points, &self.config)?;
        registry.set_route(overlay)?;
        if let Some(bounds) = bounds_of(&to_polyline(points)) {
            map.fit_bounds(bounds);
        }
        Ok(())
    }

    fn replace_weather_markers(&mut self, points: &[WeatherTrackPoint]) -> Result<(), ViewError> {
        let mut view = lock(&self.map);
        let MapView { map, registry } = &mut *view;
        registry.clear_weather_markers(map);
        let markers = match render_weather_markers(map, points, &self.config) {
            Ok(markers) => markers,
            Err(e) => {
                warn!("weather markers render failed: {}", e);
                return Err(e);
            }
        };
        let first = markers.first().copied();
        registry.set_weather_markers(markers)?;

        if self.config.auto_open_first_popup {
            if let Some(first) = first {
                if let Err(e) = map.open_popup(first) {
                    warn!("opening first popup: {}", e);
                }
            }
        }
        Ok(())
    }

    fn reject(&self, event: &str) -> ViewError {
        let err = ViewError::transition(event, self.phase);
        warn!("{}", err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::select_mode;
    use crate::model::{Weather, WeatherSample, WeatherSource};
    use chrono::{Duration, TimeZone, Utc};
    use trackcast_env::{ChannelPush, LatLng, MarkerIcon, RecordingChart, RecordingMap};

    type Controller = ViewController<RecordingMap, RecordingChart>;

    fn setup(config: ViewConfig) -> (Controller, RecordingMap, RecordingChart) {
        let map = RecordingMap::new();
        let chart = RecordingChart::new();
        let mut controller = ViewController::new(map.clone(), chart.clone(), EventBus::new(), config);
        controller.mount().unwrap();
        (controller, map, chart)
    }

    fn track(coords: &[(f64, f64)]) -> Vec<TrackPoint> {
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

    fn init_payload() -> InitPayload {
        InitPayload {
            center: LatLng::new(52.1, 7.1),
            zoom: 10,
            points: track(&[(52.0, 7.0), (52.1, 7.1), (52.2, 7.2)]),
        }
    }

    fn weather(eligible: &[usize], total: usize) -> WeatherUpdatePayload {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let points = (0..total)
            .map(|i| {
                let flag = eligible.contains(&i);
                WeatherTrackPoint {
                    index: i,
                    point: LatLng::new(52.0 + i as f64 * 0.05, 7.0),
                    ele: None,
                    date: start + Duration::minutes(10 * i as i64),
                    is_weather_point: flag,
                    weather: flag.then(|| Weather {
                        sample: WeatherSample {
                            temperature: Some(15.0),
                            ..Default::default()
                        },
                        source: WeatherSource::default(),
                    }),
                }
            })
            .collect();
        WeatherUpdatePayload { points, mode: None }
    }

    fn weather_label(map: &RecordingMap, id: LayerId) -> Option<usize> {
        map.weather_markers()
            .into_iter()
            .find(|(layer, _, _)| *layer == id)
            .and_then(|(_, _, icon)| match icon {
                MarkerIcon::Weather { label } => Some(label),
                _ => None,
            })
    }

    #[test]
    fn test_init_draws_route_and_fits_bounds() {
        let (mut controller, map, _) = setup(ViewConfig::default());
        let payload = init_payload();
        let points = payload.points.clone();
        controller.handle_init(payload).unwrap();

        assert_eq!(controller.phase(), ViewPhase::Route);
        assert_eq!(map.polylines().len(), 1);
        assert_eq!(map.endpoint_markers().len(), 2);
        assert_eq!(map.view(), Some((LatLng::new(52.1, 7.1), 10)));
        let bounds = map.fitted_bounds().unwrap();
        assert!(points.iter().all(|p| bounds.contains(p.position())));
    }

    #[test]
    fn test_weather_update_aligns_markers_and_chart() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();

        assert_eq!(controller.phase(), ViewPhase::RouteWeather);
        let markers = controller.weather_markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(weather_label(&map, markers[0]), Some(1));
        assert_eq!(weather_label(&map, markers[1]), Some(3));
        let (_, options) = chart.latest().unwrap();
        assert_eq!(options.categories.len(), 2);
    }

    #[test]
    fn test_chart_click_opens_matching_popup() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();

        let handle = controller.chart().unwrap();
        chart.click(handle.id, 1).unwrap();

        let open = map.open_popups();
        assert_eq!(open.len(), 1);
        assert_eq!(weather_label(&map, open[0]), Some(3));
    }

    #[test]
    fn test_empty_weather_update_clears_previous_markers() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();
        let previous = controller.weather_markers();

        controller.handle_weather_update(weather(&[], 5)).unwrap();
        assert!(controller.weather_markers().is_empty());
        assert!(map.weather_markers().is_empty());
        assert!(previous.iter().all(|id| map.layer(*id).is_none()));
        let (_, options) = chart.latest().unwrap();
        assert!(options.categories.is_empty());
        assert_eq!(chart.live_chart_count(), 1);
    }

    #[test]
    fn test_stale_activation_is_a_no_op() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[0, 1, 2, 3], 5)).unwrap();
        let stale_chart = controller.chart().unwrap();

        controller.handle_weather_update(weather(&[4], 5)).unwrap();
        let live_before = map.live_layer_count();

        // click on the destroyed chart fails at the surface; a stale index on the bus is ignored
        assert!(chart.click(stale_chart.id, 3).is_err());
        let report = controller.bus().emit(BusEvent::ChartPointActivated { index: 3 });
        assert_eq!(report.failed, 0);
        assert!(!controller.on_chart_point_activated(1).unwrap());
        assert!(map.open_popups().is_empty());
        assert_eq!(map.live_layer_count(), live_before);
    }

    #[test]
    fn test_empty_route_keeps_previous_route() {
        let (mut controller, map, _) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        let before = controller.route();

        let err = controller
            .handle_route_update(RouteUpdatePayload { points: Vec::new() })
            .unwrap_err();
        assert!(matches!(err, ViewError::EmptyRoute));
        assert_eq!(controller.route(), before);
        assert_eq!(map.polylines().len(), 1);
    }

    #[test]
    fn test_empty_init_keeps_previous_view_and_route() {
        let (mut controller, map, _) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        let before = controller.route();
        let fitted = map.fitted_bounds();

        let err = controller
            .handle_init(InitPayload {
                center: LatLng::new(0.0, 0.0),
                zoom: 2,
                points: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, ViewError::EmptyRoute));
        assert_eq!(map.view(), Some((LatLng::new(52.1, 7.1), 10)));
        assert_eq!(map.fitted_bounds(), fitted);
        assert_eq!(controller.route(), before);
        assert_eq!(controller.phase(), ViewPhase::Route);
    }

    #[test]
    fn test_repeated_init_keeps_weather() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();
        let markers = controller.weather_markers();
        let chart_before = controller.chart().unwrap();
        let old_route = controller.route();

        controller
            .handle_init(InitPayload {
                center: LatLng::new(48.05, 11.05),
                zoom: 12,
                points: track(&[(48.0, 11.0), (48.1, 11.1)]),
            })
            .unwrap();

        assert_eq!(controller.phase(), ViewPhase::RouteWeather);
        assert_ne!(controller.route(), old_route);
        assert_eq!(map.polylines().len(), 1);
        assert_eq!(map.polylines()[0][0], LatLng::new(48.0, 11.0));
        assert_eq!(map.endpoint_markers().len(), 2);
        assert_eq!(map.view(), Some((LatLng::new(48.05, 11.05), 12)));

        assert_eq!(controller.weather_markers(), markers);
        assert!(markers.iter().all(|id| map.layer(*id).is_some()));
        assert_eq!(controller.chart(), Some(chart_before));
        assert_eq!(chart.destroyed_count(), 0);
    }

    #[test]
    fn test_route_update_replaces_route() {
        let (mut controller, map, _) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        let removed_before = map.removed_count();

        controller
            .handle_route_update(RouteUpdatePayload {
                points: track(&[(48.0, 11.0), (48.1, 11.1)]),
            })
            .unwrap();
        assert_eq!(map.polylines().len(), 1);
        assert_eq!(map.polylines()[0][0], LatLng::new(48.0, 11.0));
        assert!(map.removed_count() > removed_before);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let map = RecordingMap::new();
        let mut controller = ViewController::new(map.clone(), RecordingChart::new(), EventBus::new(), ViewConfig::default());
        assert!(matches!(
            controller.handle_init(init_payload()),
            Err(ViewError::InvalidTransition { .. })
        ));

        controller.mount().unwrap();
        assert!(matches!(controller.mount(), Err(ViewError::InvalidTransition { .. })));
        assert!(matches!(
            controller.handle_weather_update(weather(&[0], 1)),
            Err(ViewError::InvalidTransition { .. })
        ));
        assert!(matches!(
            controller.handle_route_update(RouteUpdatePayload {
                points: track(&[(1.0, 1.0)])
            }),
            Err(ViewError::InvalidTransition { .. })
        ));
        assert_eq!(controller.phase(), ViewPhase::NoRoute);
        assert_eq!(map.live_layer_count(), 0);
    }

    #[test]
    fn test_mode_change_redraws_chart_only() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();
        let markers = controller.weather_markers();

        let handle = controller.on_mode_changed(DisplayMode::Wind).unwrap().unwrap();
        assert_eq!(handle.mode, DisplayMode::Wind);
        assert_eq!(chart.live_chart_count(), 1);
        assert_eq!(chart.destroyed_count(), 1);
        assert_eq!(controller.weather_markers(), markers);
        assert_eq!(map.weather_markers().len(), 2);

        select_mode(controller.bus(), DisplayMode::Precipitation);
        assert_eq!(controller.mode(), DisplayMode::Precipitation);
        let (_, options) = chart.latest().unwrap();
        assert_eq!(options.series.len(), 2);
        assert!(options.title.starts_with("Precipitation"));
    }

    #[test]
    fn test_mode_before_weather_is_remembered() {
        let (mut controller, _, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        assert!(controller.on_mode_changed(DisplayMode::Wind).unwrap().is_none());
        assert_eq!(chart.live_chart_count(), 0);

        controller.handle_weather_update(weather(&[0], 2)).unwrap();
        assert_eq!(controller.chart().unwrap().mode, DisplayMode::Wind);
    }

    #[test]
    fn test_strict_policy_keeps_previous_weather() {
        let config = ViewConfig {
            require_weather_points: true,
            ..Default::default()
        };
        let (mut controller, map, chart) = setup(config);
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[2], 3)).unwrap();

        let err = controller.handle_weather_update(weather(&[], 3)).unwrap_err();
        assert!(matches!(err, ViewError::NoWeatherData));
        assert_eq!(map.weather_markers().len(), 1);
        assert_eq!(chart.latest().unwrap().1.categories.len(), 1);
    }

    #[test]
    fn test_auto_open_first_popup() {
        let config = ViewConfig {
            auto_open_first_popup: true,
            ..Default::default()
        };
        let (mut controller, map, _) = setup(config);
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[2, 4], 5)).unwrap();

        let open = map.open_popups();
        assert_eq!(open, vec![controller.weather_markers()[0]]);
    }

    #[test]
    fn test_marker_failure_does_not_block_chart() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        map.fail_creates_after(1);

        let err = controller.handle_weather_update(weather(&[0, 1, 2], 3)).unwrap_err();
        assert!(matches!(err, ViewError::Surface(_)));
        assert!(controller.weather_markers().is_empty());
        assert_eq!(chart.latest().unwrap().1.categories.len(), 3);
        assert_eq!(controller.phase(), ViewPhase::RouteWeather);
    }

    #[test]
    fn test_unmount_tears_everything_down() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        controller.handle_init(init_payload()).unwrap();
        controller.handle_weather_update(weather(&[1, 3], 5)).unwrap();

        controller.unmount().unwrap();
        assert_eq!(controller.phase(), ViewPhase::Closed);
        assert_eq!(map.live_layer_count(), 0);
        assert_eq!(chart.live_chart_count(), 0);
        assert_eq!(controller.bus().handler_count(EventName::ChartPointActivated), 0);
        assert!(matches!(
            controller.handle_init(init_payload()),
            Err(ViewError::InvalidTransition { .. })
        ));
        assert!(controller.unmount().is_err());
    }

    #[tokio::test]
    async fn test_run_dispatches_in_order() {
        let (mut controller, map, chart) = setup(ViewConfig::default());
        let (tx, rx) = ChannelPush::pair();

        tx.send(PushEvent::Init(init_payload()).encode().unwrap()).unwrap();
        tx.send(PushEvent::WeatherUpdate(weather(&[1, 3], 5)).encode().unwrap()).unwrap();
        tx.send_json("map:explode", b"{}".to_vec()).unwrap();
        tx.send(PushEvent::WeatherUpdate(weather(&[4], 5)).encode().unwrap()).unwrap();
        drop(tx);

        let stats = controller.run(&rx).await;
        assert_eq!(stats, RunStats { handled: 3, rejected: 1 });
        assert_eq!(map.weather_markers().len(), 1);
        assert_eq!(chart.latest().unwrap().1.categories.len(), 1);
    }
}
