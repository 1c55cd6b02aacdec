//! End-to-end scenarios for the view engine.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TC-A: init with a three-point route draws one polyline and two endpoints
    InitialRoute,

    /// TC-B: weather markers and chart categories follow the same filter
    WeatherAlignment,

    /// TC-C: chart activation opens the popup of the matching marker
    ChartActivation,

    /// TC-D: a weather update without eligible points clears the markers
    WeatherCleared,

    /// Activations left over from a longer dataset are ignored
    StaleActivation,

    /// Back-to-back updates through the push channel, none coalesced
    RapidUpdates,

    /// An empty route payload leaves the previous route on screen
    EmptyRoute,

    /// Mode switches redraw the chart without touching markers
    ModeSwitch,

    /// Gappy weather and out-of-range wind directions render without failing
    DirtyWeather,

    /// Unmount removes everything and rejects later pushes
    Teardown,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::InitialRoute,
            ScenarioId::WeatherAlignment,
            ScenarioId::ChartActivation,
            ScenarioId::WeatherCleared,
            ScenarioId::StaleActivation,
            ScenarioId::RapidUpdates,
            ScenarioId::EmptyRoute,
            ScenarioId::ModeSwitch,
            ScenarioId::DirtyWeather,
            ScenarioId::Teardown,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::InitialRoute => "initial_route",
            ScenarioId::WeatherAlignment => "weather_alignment",
            ScenarioId::ChartActivation => "chart_activation",
            ScenarioId::WeatherCleared => "weather_cleared",
            ScenarioId::StaleActivation => "stale_activation",
            ScenarioId::RapidUpdates => "rapid_updates",
            ScenarioId::EmptyRoute => "empty_route",
            ScenarioId::ModeSwitch => "mode_switch",
            ScenarioId::DirtyWeather => "dirty_weather",
            ScenarioId::Teardown => "teardown",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::InitialRoute => "3-point init at zoom 10: one polyline, two endpoints, fitted bounds",
            ScenarioId::WeatherAlignment => "5 points, [1] and [3] eligible: 2 markers, 2 categories, same order",
            ScenarioId::ChartActivation => "chart point 1 opens the marker of original point 3",
            ScenarioId::WeatherCleared => "empty weather update removes both prior markers",
            ScenarioId::StaleActivation => "out-of-range activation performs no map mutation",
            ScenarioId::RapidUpdates => "generated updates over the push channel, each fully redrawn",
            ScenarioId::EmptyRoute => "empty route update is rejected, previous route kept",
            ScenarioId::ModeSwitch => "every display mode redraws the chart, markers untouched",
            ScenarioId::DirtyWeather => "missing fields and bad wind directions render as N/A",
            ScenarioId::Teardown => "unmount clears map and chart, later pushes are rejected",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial_route" | "a" | "tc-a" => Ok(ScenarioId::InitialRoute),
            "weather_alignment" | "b" | "tc-b" => Ok(ScenarioId::WeatherAlignment),
            "chart_activation" | "c" | "tc-c" => Ok(ScenarioId::ChartActivation),
            "weather_cleared" | "d" | "tc-d" => Ok(ScenarioId::WeatherCleared),
            "stale_activation" | "stale" => Ok(ScenarioId::StaleActivation),
            "rapid_updates" | "rapid" => Ok(ScenarioId::RapidUpdates),
            "empty_route" => Ok(ScenarioId::EmptyRoute),
            "mode_switch" => Ok(ScenarioId::ModeSwitch),
            "dirty_weather" => Ok(ScenarioId::DirtyWeather),
            "teardown" => Ok(ScenarioId::Teardown),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
        }
        assert_eq!("TC-C".parse::<ScenarioId>(), Ok(ScenarioId::ChartActivation));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
