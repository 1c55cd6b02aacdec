//! Chart capability surface and chart option types.

use crate::error::EnvError;
use crate::types::ChartId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback invoked with the category index of an activated chart point.
pub type PointClickCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    Spline,
    Column,
    Line,
}

/// One value axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub title: String,
    pub min: Option<f64>,
    pub max: Option<f64>,

    /// Draw the axis on the opposite (right) side
    pub opposite: bool,
}

impl AxisSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            min: None,
            max: None,
            opposite: false,
        }
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn on_opposite_side(mut self) -> Self {
        self.opposite = true;
        self
    }
}

/// One data series. `None` entries are gaps and must not be interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub name: String,
    pub kind: SeriesKind,
    pub color: String,

    /// Index into `ChartOptions::y_axes`
    pub y_axis: usize,

    pub data: Vec<Option<f64>>,
}

/// Layout overrides applied when the container is narrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsiveRule {
    pub max_width_px: u32,
    pub label_font_px: u32,
    pub label_rotation_deg: i32,
    pub hide_x_axis_title: bool,
    pub vertical_legend: bool,
}

impl Default for ResponsiveRule {
    fn default() -> Self {
        Self {
            max_width_px: 500,
            label_font_px: 10,
            label_rotation_deg: -45,
            hide_x_axis_title: true,
            vertical_legend: true,
        }
    }
}

/// Everything a chart surface needs to draw one chart.
#[derive(Clone)]
pub struct ChartOptions {
    pub title: String,
    pub categories: Vec<String>,
    pub y_axes: Vec<AxisSpec>,
    pub series: Vec<SeriesSpec>,
    pub responsive: Vec<ResponsiveRule>,

    /// Invoked when the user activates a point
    pub on_point_click: Option<PointClickCallback>,
}

impl std::fmt::Debug for ChartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartOptions")
            .field("title", &self.title)
            .field("categories", &self.categories)
            .field("y_axes", &self.y_axes)
            .field("series", &self.series)
            .field("responsive", &self.responsive)
            .field("on_point_click", &self.on_point_click.is_some())
            .finish()
    }
}

/// Chart drawing primitives.
pub trait ChartSurface: Send + 'static {
    /// Draws a chart into `container` and returns its handle.
    fn create_chart(&mut self, container: &str, options: ChartOptions) -> Result<ChartId, EnvError>;

    /// Destroys a chart previously created by this surface.
    fn destroy_chart(&mut self, chart: ChartId) -> Result<(), EnvError>;
}
