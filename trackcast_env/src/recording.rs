//! Headless surfaces that record what would be drawn.
//!
//! Both recorders are cheap to clone; clones share state, so a test or the
//! simulation harness can keep one handle for inspection while the view engine
//! owns another.

use crate::chart::{ChartOptions, ChartSurface};
use crate::error::EnvError;
use crate::map::MapSurface;
use crate::types::{Bounds, ChartId, LatLng, LayerId, MarkerIcon, PolylineStyle, PopupOptions};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A layer as it currently exists on the recorded map.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedLayer {
    Polyline {
        points: Vec<LatLng>,
        style: PolylineStyle,
    },
    Marker {
        at: LatLng,
        icon: MarkerIcon,
        popup: Option<(String, PopupOptions)>,
    },
}

#[derive(Debug, Default)]
struct MapState {
    layers: HashMap<LayerId, RecordedLayer>,
    creation_order: Vec<LayerId>,
    next_seq: u64,
    open_popups: Vec<LayerId>,
    view: Option<(LatLng, u8)>,
    fitted: Option<Bounds>,
    removed: usize,
    fail_creates_after: Option<usize>,
}

/// In-memory `MapSurface`.
#[derive(Debug, Clone, Default)]
pub struct RecordingMap {
    state: Arc<Mutex<MapState>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every layer creation after the next `n` successful ones fail.
    pub fn fail_creates_after(&self, n: usize) {
        self.state().fail_creates_after = Some(n);
    }

    /// Clears an injected creation fault.
    pub fn heal(&self) {
        self.state().fail_creates_after = None;
    }

    /// Number of layers currently on the map.
    pub fn live_layer_count(&self) -> usize {
        self.state().layers.len()
    }

    /// Number of layers removed over the surface's lifetime.
    pub fn removed_count(&self) -> usize {
        self.state().removed
    }

    /// Live polylines, oldest first.
    pub fn polylines(&self) -> Vec<Vec<LatLng>> {
        let state = self.state();
        state
            .creation_order
            .iter()
            .filter_map(|id| match state.layers.get(id) {
                Some(RecordedLayer::Polyline { points, .. }) => Some(points.clone()),
                _ => None,
            })
            .collect()
    }

    /// Live markers whose icon matches `pred`, oldest first.
    pub fn markers_where(&self, pred: impl Fn(&MarkerIcon) -> bool) -> Vec<(LayerId, LatLng, MarkerIcon)> {
        let state = self.state();
        state
            .creation_order
            .iter()
            .filter_map(|id| match state.layers.get(id) {
                Some(RecordedLayer::Marker { at, icon, .. }) if pred(icon) => Some((*id, *at, icon.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn endpoint_markers(&self) -> Vec<(LayerId, LatLng, MarkerIcon)> {
        self.markers_where(|icon| matches!(icon, MarkerIcon::Endpoint { .. }))
    }

    pub fn direction_markers(&self) -> Vec<(LayerId, LatLng, MarkerIcon)> {
        self.markers_where(|icon| matches!(icon, MarkerIcon::Direction { .. }))
    }

    pub fn weather_markers(&self) -> Vec<(LayerId, LatLng, MarkerIcon)> {
        self.markers_where(|icon| matches!(icon, MarkerIcon::Weather { .. }))
    }

    /// Returns the live layer behind a handle.
    pub fn layer(&self, id: LayerId) -> Option<RecordedLayer> {
        self.state().layers.get(&id).cloned()
    }

    /// Popup body bound to a marker, if any.
    pub fn popup_html(&self, id: LayerId) -> Option<String> {
        match self.state().layers.get(&id) {
            Some(RecordedLayer::Marker { popup: Some((html, _)), .. }) => Some(html.clone()),
            _ => None,
        }
    }

    /// Markers whose popups are currently open, in opening order.
    pub fn open_popups(&self) -> Vec<LayerId> {
        self.state().open_popups.clone()
    }

    /// Last center/zoom passed to `set_view`.
    pub fn view(&self) -> Option<(LatLng, u8)> {
        self.state().view
    }

    /// Last bounds passed to `fit_bounds`.
    pub fn fitted_bounds(&self) -> Option<Bounds> {
        self.state().fitted
    }

    fn insert(&self, layer: RecordedLayer) -> Result<LayerId, EnvError> {
        let mut state = self.state();
        if let Some(remaining) = state.fail_creates_after {
            if remaining == 0 {
                return Err(EnvError::layer_creation("injected surface fault"));
            }
            state.fail_creates_after = Some(remaining - 1);
        }
        let id = LayerId::from_seq(state.next_seq);
        state.next_seq += 1;
        state.layers.insert(id, layer);
        state.creation_order.push(id);
        Ok(id)
    }
}

impl MapSurface for RecordingMap {
    fn create_polyline(&mut self, points: &[LatLng], style: &PolylineStyle) -> Result<LayerId, EnvError> {
        self.insert(RecordedLayer::Polyline {
            points: points.to_vec(),
            style: style.clone(),
        })
    }

    fn create_marker(&mut self, at: LatLng, icon: &MarkerIcon) -> Result<LayerId, EnvError> {
        self.insert(RecordedLayer::Marker {
            at,
            icon: icon.clone(),
            popup: None,
        })
    }

    fn bind_popup(&mut self, layer: LayerId, html: &str, options: PopupOptions) -> Result<(), EnvError> {
        match self.state().layers.get_mut(&layer) {
            Some(RecordedLayer::Marker { popup, .. }) => {
                *popup = Some((html.to_string(), options));
                Ok(())
            }
            _ => Err(EnvError::unknown_layer(layer)),
        }
    }

    fn open_popup(&mut self, layer: LayerId) -> Result<(), EnvError> {
        let mut state = self.state();
        let auto_close = match state.layers.get(&layer) {
            Some(RecordedLayer::Marker { popup: Some((_, options)), .. }) => options.auto_close,
            _ => return Err(EnvError::unknown_layer(layer)),
        };
        if auto_close {
            state.open_popups.clear();
        }
        state.open_popups.retain(|open| *open != layer);
        state.open_popups.push(layer);
        Ok(())
    }

    fn remove_layer(&mut self, layer: LayerId) -> Result<(), EnvError> {
        let mut state = self.state();
        if state.layers.remove(&layer).is_none() {
            return Err(EnvError::unknown_layer(layer));
        }
        state.creation_order.retain(|id| *id != layer);
        state.open_popups.retain(|id| *id != layer);
        state.removed += 1;
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.state().fitted = Some(bounds);
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.state().view = Some((center, zoom));
    }
}

#[derive(Debug, Default)]
struct ChartState {
    charts: BTreeMap<ChartId, (String, ChartOptions)>,
    next_id: u64,
    destroyed: usize,
}

/// In-memory `ChartSurface`. `click` simulates a user activating a point.
#[derive(Debug, Clone, Default)]
pub struct RecordingChart {
    state: Arc<Mutex<ChartState>>,
}

impl RecordingChart {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of charts currently alive.
    pub fn live_chart_count(&self) -> usize {
        self.state().charts.len()
    }

    /// Number of charts destroyed over the surface's lifetime.
    pub fn destroyed_count(&self) -> usize {
        self.state().destroyed
    }

    /// The most recently created chart that is still alive.
    pub fn latest(&self) -> Option<(ChartId, ChartOptions)> {
        self.state()
            .charts
            .iter()
            .next_back()
            .map(|(id, (_, options))| (*id, options.clone()))
    }

    /// Container the chart was drawn into.
    pub fn container_of(&self, chart: ChartId) -> Option<String> {
        self.state().charts.get(&chart).map(|(container, _)| container.clone())
    }

    /// Simulates the user activating the point at category `index`.
    ///
    /// The callback runs without the surface lock held.
    pub fn click(&self, chart: ChartId, index: usize) -> Result<(), EnvError> {
        let callback = {
            let state = self.state();
            let (_, options) = state
                .charts
                .get(&chart)
                .ok_or_else(|| EnvError::chart(format!("no live {}", chart)))?;
            options.on_point_click.clone()
        };
        if let Some(callback) = callback {
            callback(index);
        }
        Ok(())
    }
}

impl ChartSurface for RecordingChart {
    fn create_chart(&mut self, container: &str, options: ChartOptions) -> Result<ChartId, EnvError> {
        let mut state = self.state();
        let id = ChartId(state.next_id);
        state.next_id += 1;
        state.charts.insert(id, (container.to_string(), options));
        Ok(id)
    }

    fn destroy_chart(&mut self, chart: ChartId) -> Result<(), EnvError> {
        let mut state = self.state();
        if state.charts.remove(&chart).is_none() {
            return Err(EnvError::chart(format!("no live {}", chart)));
        }
        state.destroyed += 1;
        Ok(())
    }
}
