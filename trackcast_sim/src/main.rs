//! trackcast Scenario Harness CLI
//!
//! Run end-to-end view scenarios or replay recorded server pushes.

use clap::Parser;
use trackcast_core::{DisplayMode, ViewConfig};
use trackcast_sim::scenarios::ScenarioId;
use trackcast_sim::{generate_replay, replay_file, RouteGenerator, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// trackcast scenario and replay CLI
#[derive(Parser, Debug)]
#[command(name = "trackcast-sim")]
#[command(about = "Run end-to-end scenarios for the trackcast view engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (initial_route, weather_alignment, chart_activation, weather_cleared,
    /// stale_activation, rapid_updates, empty_route, mode_switch, dirty_weather, teardown, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of random seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Points per generated route
    #[arg(short, long, default_value = "120")]
    points: usize,

    /// Every n-th generated point carries weather
    #[arg(long, default_value = "6")]
    weather_every: usize,

    /// Replay a JSON file of recorded pushes instead of running scenarios
    #[arg(long)]
    replay: Option<String>,

    /// Print a seeded synthetic ride as a replay document and exit
    #[arg(long)]
    generate: bool,

    /// Chart mode used until a payload or the picker selects another (temperature, precipitation, wind)
    #[arg(short, long)]
    mode: Option<DisplayMode>,

    /// Treat weather updates without eligible points as errors
    #[arg(long)]
    require_weather: bool,

    /// Open the first weather popup after each weather update
    #[arg(long)]
    auto_open_popup: bool,

    /// Display offset from UTC in minutes for chart and popup times
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset_minutes: i32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

impl Args {
    fn view_config(&self) -> ViewConfig {
        ViewConfig {
            require_weather_points: self.require_weather,
            auto_open_first_popup: self.auto_open_popup,
            display_offset_minutes: self.offset_minutes,
            initial_mode: self.mode.unwrap_or_default(),
            ..Default::default()
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json && !args.generate {
        info!("trackcast scenario harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if let Some(path) = &args.replay {
        run_replay(&args, path);
        return;
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.generate {
        let mut generator = RouteGenerator::new(base_seed);
        match generate_replay(&mut generator, args.points, args.weather_every, args.mode) {
            Ok(entries) => print_json(&entries),
            Err(e) => {
                error!("Generation failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };

    if args.require_weather {
        info!("--require-weather only applies to replays");
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        // scripted scenarios push empty weather on purpose
        let config = ViewConfig {
            require_weather_points: false,
            ..args.view_config()
        };
        let runner = ScenarioRunner::new(seed)
            .with_points(args.points)
            .with_weather_every(args.weather_every)
            .with_config(config);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.events_handled,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        print_json(&summary);
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn run_replay(args: &Args, path: &str) {
    match replay_file(path, args.view_config()) {
        Ok(summary) => {
            if args.json {
                print_json(&summary);
            } else {
                info!(
                    "Replayed {} events: {} handled, {} rejected",
                    summary.events, summary.handled, summary.rejected
                );
                info!("Final state: {} ({} mode)", summary.phase, summary.mode);
                info!(
                    "Map: {} layers, {} weather markers | Chart: {} categories{}",
                    summary.metrics.live_layers,
                    summary.metrics.weather_markers,
                    summary.metrics.chart_categories,
                    summary
                        .chart_title
                        .as_deref()
                        .map(|t| format!(" \"{}\"", t))
                        .unwrap_or_default()
                );
            }
            if summary.rejected > 0 {
                std::process::exit(2);
            }
        }
        Err(e) => {
            error!("Replay of {} failed: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to encode summary: {}", e),
    }
}
