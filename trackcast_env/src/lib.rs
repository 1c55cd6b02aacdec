//! trackcast Environment Abstraction Layer
//!
//! This crate provides the capability surfaces the view engine draws through,
//! so the same engine runs against a real page widget or a headless recorder.
//!
//! # Surfaces
//!
//! - **Map**: polylines, markers, popups, viewport (`MapSurface`)
//! - **Chart**: time-series charts with a point-click callback (`ChartSurface`)
//! - **Push**: ordered, at-most-once server payload delivery (`PushChannel`)
//!
//! # Example
//!
//! ```ignore
//! use trackcast_env::{MapSurface, RecordingMap, LatLng, MarkerIcon};
//!
//! let mut map = RecordingMap::new();
//! let marker = map.create_marker(LatLng::new(52.0, 7.0), &MarkerIcon::Weather { label: 1 })?;
//! map.remove_layer(marker)?;
//! ```

mod chart;
mod error;
mod map;
mod push;
mod recording;
mod types;

pub use chart::{AxisSpec, ChartOptions, ChartSurface, PointClickCallback, ResponsiveRule, SeriesKind, SeriesSpec};
pub use error::EnvError;
pub use map::MapSurface;
pub use push::{ChannelPush, PushChannel, PushSender};
pub use recording::{RecordedLayer, RecordingChart, RecordingMap};
pub use types::{Bounds, ChartId, LatLng, LayerId, MarkerIcon, PolylineStyle, PopupOptions, PushEnvelope};
