use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which example session the binary plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    All,
    Counter,
    Form,
    Stopwatch,
    Corvids,
}

impl Scenario {
    /// The concrete sessions to run, in order.
    pub fn expand(self) -> Vec<Scenario> {
        match self {
            Scenario::All => vec![
                Scenario::Counter,
                Scenario::Form,
                Scenario::Stopwatch,
                Scenario::Corvids,
            ],
            one => vec![one],
        }
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "all" => Scenario::All,
            "counter" => Scenario::Counter,
            "form" => Scenario::Form,
            "stopwatch" => Scenario::Stopwatch,
            "corvids" => Scenario::Corvids,
            other => bail!("unknown scenario {other:?} (expected all, counter, form, stopwatch or corvids)"),
        })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::All => "all",
            Scenario::Counter => "counter",
            Scenario::Form => "form",
            Scenario::Stopwatch => "stopwatch",
            Scenario::Corvids => "corvids",
        };
        f.write_str(name)
    }
}

/// Demo configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub scenario: Scenario,
    /// How long the form's email check takes.
    pub validation_delay: Duration,
    /// Quiet period before the corvid search runs.
    pub debounce: Duration,
    /// Stopwatch resolution.
    pub tick: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::All,
            validation_delay: Duration::from_millis(1000),
            debounce: Duration::from_millis(500),
            tick: Duration::from_millis(10),
        }
    }
}

impl DemoConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            scenario: match std::env::var("TRIBUTARY_SCENARIO") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.scenario,
            },
            validation_delay: millis("TRIBUTARY_VALIDATION_DELAY_MS", defaults.validation_delay)?,
            debounce: millis("TRIBUTARY_DEBOUNCE_MS", defaults.debounce)?,
            tick: millis("TRIBUTARY_TICK_MS", defaults.tick)?,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  TRIBUTARY_SCENARIO: {}", self.scenario);
        tracing::info!("  TRIBUTARY_VALIDATION_DELAY_MS: {}", self.validation_delay.as_millis());
        tracing::info!("  TRIBUTARY_DEBOUNCE_MS: {}", self.debounce.as_millis());
        tracing::info!("  TRIBUTARY_TICK_MS: {}", self.tick.as_millis());
    }
}

fn millis(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of milliseconds, got {raw:?}"))?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(default),
    }
}
