//! Common types shared by the capability surfaces.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Opaque handle to a layer (polyline or marker) living on a map surface.
///
/// Handles are only meaningful to the surface that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub Uuid);

impl LayerId {
    /// Creates a new random LayerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic LayerId from a sequence number.
    ///
    /// Used by headless surfaces so recorded runs are reproducible.
    pub fn from_seq(seq: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seq.to_le_bytes());
        bytes[8..16].copy_from_slice(&seq.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Opaque handle to a chart instance on a chart surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChartId(pub u64);

impl std::fmt::Display for ChartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chart#{}", self.0)
    }
}

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    /// Returns true if the point lies inside (or on the edge of) the bounds.
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lon >= self.south_west.lon
            && point.lon <= self.north_east.lon
    }
}

/// Stroke style for polylines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineStyle {
    pub color: String,
    pub weight: f32,
    pub opacity: f32,
}

impl Default for PolylineStyle {
    fn default() -> Self {
        Self {
            color: "#1f2937".to_string(),
            weight: 5.0,
            opacity: 1.0,
        }
    }
}

/// What a marker looks like. The surface maps these onto its own icon primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkerIcon {
    /// Filled circle used for the start and end of a route
    Endpoint { color: String, radius: f32 },

    /// Arrow rotated clockwise from north
    Direction { rotation_deg: f64, label: usize },

    /// Small clickable dot carrying a weather popup
    Weather { label: usize },
}

/// Popup behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupOptions {
    /// Close other popups when this one opens
    pub auto_close: bool,

    /// Close the popup when the map itself is clicked
    pub close_on_click: bool,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            auto_close: true,
            close_on_click: false,
        }
    }
}

/// Envelope for a server push as it arrives on the wire.
///
/// The payload is opaque JSON bytes; the view engine decodes and validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// Logical event name, e.g. `map:init`
    pub event: String,

    /// Raw JSON payload
    pub payload: Vec<u8>,

    /// Delivery sequence number assigned by the channel
    pub sequence: u64,
}

impl PushEnvelope {
    /// Creates a new envelope from an event name and payload bytes.
    pub fn new(event: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            event: event.into(),
            payload,
            sequence: 0,
        }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
