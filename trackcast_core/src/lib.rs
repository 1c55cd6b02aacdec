//! trackcast Core - GPS track overlays with weather, kept in sync with a chart
//!
//! This library keeps three overlay families consistent across server pushes:
//! 1. **Route**: polyline, start/end markers and sampled direction arrows
//! 2. **Weather markers**: one popup marker per weather-eligible point
//! 3. **Chart**: a time series over the same eligible points, index-aligned
//!    with the markers so that activating chart point `i` opens marker `i`
//!
//! Every family is replaced by clear → render → set through the
//! `OverlayRegistry`; the `ViewController` sequences this per push event.

pub mod bus;
pub mod chart;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod model;
pub mod payload;
pub mod registry;
pub mod route;
pub mod weather;

// Re-export key types for convenience
pub use bus::{BusEvent, EmitReport, EventBus, EventName, Subscription};
pub use chart::{render_chart, select_mode, ChartHandle};
pub use config::ViewConfig;
pub use controller::{MapView, RunStats, ViewController, ViewPhase};
pub use error::{OverlayFamily, PayloadError, ViewError};
pub use model::{DisplayMode, TrackPoint, Weather, WeatherSample, WeatherSource, WeatherTrackPoint};
pub use payload::{InitPayload, PushEvent, RouteUpdatePayload, WeatherUpdatePayload};
pub use registry::{OverlayRegistry, RouteOverlay};
pub use route::render_route;
pub use weather::render_weather_markers;
