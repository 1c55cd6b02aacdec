//! Seeded route and weather generator.
//!
//! Everything is derived from one 64-bit seed so a failing scenario can be
//! reproduced exactly:
//! - Route: a heading random walk starting at `start`
//! - Weather: every `every`-th point is eligible; fields drop out with
//!   `gap_probability`, wind directions go out of range with
//!   `wind_fault_probability`

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use trackcast_core::{TrackPoint, Weather, WeatherSample, WeatherSource, WeatherTrackPoint};
use trackcast_env::LatLng;

const ICONS: [&str; 5] = ["clear-day", "partly-cloudy-day", "cloudy", "rain", "wind"];

/// 2024-06-01T08:00:00Z
const DEFAULT_DEPARTURE: i64 = 1_717_228_800;

/// Deterministic source of routes and weather.
pub struct RouteGenerator {
    seed: u64,
    rng: ChaCha8Rng,

    /// First point of every route
    start: LatLng,

    /// Distance between consecutive points (degrees)
    step_deg: f64,

    /// Heading change per step, standard deviation (radians)
    turn_std: f64,

    departure: DateTime<Utc>,
    seconds_per_point: i64,
    gap_probability: f64,
    wind_fault_probability: f64,
}

impl RouteGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            start: LatLng::new(52.0, 7.0),
            step_deg: 0.002,
            turn_std: 0.3,
            departure: Utc.timestamp_opt(DEFAULT_DEPARTURE, 0).single().unwrap_or_default(),
            seconds_per_point: 120,
            gap_probability: 0.0,
            wind_fault_probability: 0.0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn with_start(mut self, start: LatLng) -> Self {
        self.start = start;
        self
    }

    /// Probability that any single weather field is missing.
    pub fn with_gap_probability(mut self, p: f64) -> Self {
        self.gap_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability that a wind direction is reported outside [0, 360].
    pub fn with_wind_faults(mut self, p: f64) -> Self {
        self.wind_fault_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn departure(&self) -> DateTime<Utc> {
        self.departure
    }

    /// Generates a route of `n` points.
    pub fn route(&mut self, n: usize) -> Vec<TrackPoint> {
        let mut heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let mut here = self.start;
        let mut ele = 50.0;
        let mut points = Vec::with_capacity(n);

        for index in 0..n {
            points.push(TrackPoint {
                index,
                lat: here.lat,
                lon: here.lon,
                ele,
                time: Some(self.departure + Duration::seconds(self.seconds_per_point * index as i64)),
            });

            heading += self.turn_std * self.normal();
            let lat = (here.lat + self.step_deg * heading.cos()).clamp(-89.0, 89.0);
            let lon = here.lon + self.step_deg * heading.sin() / lat.to_radians().cos();
            here = LatLng::new(lat, (lon + 180.0).rem_euclid(360.0) - 180.0);
            ele = (ele + 2.0 * self.normal()).max(0.0);
        }
        points
    }

    /// Generates weather along `route`, marking every `every`-th point eligible.
    pub fn weather(&mut self, route: &[TrackPoint], every: usize) -> Vec<WeatherTrackPoint> {
        let every = every.max(1);
        route
            .iter()
            .map(|p| {
                let eligible = p.index % every == 0;
                WeatherTrackPoint {
                    index: p.index,
                    point: p.position(),
                    ele: Some(p.ele),
                    date: p.time.unwrap_or(self.departure),
                    is_weather_point: eligible,
                    weather: if eligible {
                        Some(Weather {
                            sample: self.sample(),
                            source: WeatherSource {
                                id: Some(10_000 + p.index as u64),
                                station_name: Some(format!("Station {}", p.index / every)),
                                observation_type: Some("forecast".to_string()),
                                distance: Some(self.rng.gen_range(0.5..15.0)),
                            },
                        })
                    } else {
                        None
                    },
                }
            })
            .collect()
    }

    fn sample(&mut self) -> WeatherSample {
        let temperature = round1(15.0 + 5.0 * self.normal());
        let precipitation = round1(self.rng.gen_range(0.0..3.0));
        let probability = self.rng.gen_range(0..=100) as f64;
        let wind_speed = round1(self.rng.gen_range(0.0..12.0));
        let wind_direction = if self.rng.gen_bool(self.wind_fault_probability) {
            self.rng.gen_range(361.0..720.0)
        } else {
            self.rng.gen_range(0.0..360.0_f64).round()
        };
        let cloud_cover = self.rng.gen_range(0..=100) as f64;
        let icon = ICONS[self.rng.gen_range(0..ICONS.len())].to_string();

        WeatherSample {
            temperature: self.maybe(temperature),
            precipitation: self.maybe(precipitation),
            precipitation_probability: self.maybe(probability),
            wind_speed: self.maybe(wind_speed),
            wind_direction: self.maybe(wind_direction),
            cloud_cover: self.maybe(cloud_cover),
            icon: self.maybe(icon),
        }
    }

    fn maybe<T>(&mut self, value: T) -> Option<T> {
        if self.rng.gen_bool(self.gap_probability) {
            None
        } else {
            Some(value)
        }
    }

    fn normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
