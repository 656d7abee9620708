use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geo::Coordinate;

/// Step distance used when scanning only for sparse points of interest.
pub const POI_STEP_DISTANCE_KM: f64 = 0.900;
/// Step distance used for dense coverage.
pub const DENSE_STEP_DISTANCE_KM: f64 = 0.070;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_parse<T: FromStr>(profile: &str, key: &str, default: T) -> Result<T, ConfigError> {
    match profiled_env_opt(profile, key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
    }
}

fn profiled_parse_opt<T: FromStr>(profile: &str, key: &str) -> Result<Option<T>, ConfigError> {
    match profiled_env_opt(profile, key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v,
            }),
    }
}

// ── Scheduler kind ────────────────────────────────────────────

/// Which scheduler variant fills the queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Full spiral coverage around the center.
    #[default]
    HexSearch,
    /// Spiral coverage pruned to cells near known points of interest.
    Filtered,
    /// Known points ordered by their hourly appearance time.
    TimeWindowed,
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hexsearch" | "hex" => Ok(Self::HexSearch),
            "filtered" | "filteredhexsearch" | "poionly" => Ok(Self::Filtered),
            "timewindowed" | "timed" => Ok(Self::TimeWindowed),
            other => Err(ConfigError::UnknownScheduler(other.to_string())),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HexSearch => "hexsearch",
            Self::Filtered => "filtered",
            Self::TimeWindowed => "timewindowed",
        };
        f.write_str(name)
    }
}

// ── Scheduler config ──────────────────────────────────────────

/// The slice of configuration one scheduler instance sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Use the wide step tuned for sparse points of interest.
    pub only_points_of_interest: bool,
    /// Number of spiral rings, counting the center as ring 1.
    pub step_limit: u32,
}

impl SchedulerConfig {
    /// Validate and build. `step_limit` is taken signed so that negative
    /// values from config sources are reported rather than wrapped.
    pub fn new(only_points_of_interest: bool, step_limit: i64) -> Result<Self, ConfigError> {
        if step_limit < 1 || step_limit > i64::from(u32::MAX) {
            return Err(ConfigError::InvalidStepLimit(step_limit));
        }
        Ok(Self {
            only_points_of_interest,
            step_limit: step_limit as u32,
        })
    }

    pub fn step_distance_km(&self) -> f64 {
        if self.only_points_of_interest {
            POI_STEP_DISTANCE_KM
        } else {
            DENSE_STEP_DISTANCE_KM
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            only_points_of_interest: false,
            step_limit: 1,
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler_kind: SchedulerKind,
    pub scheduler: SchedulerConfig,
    /// Queue bound; `None` means unbounded.
    pub queue_capacity: Option<usize>,
    pub workers: usize,
    /// Initial scan center, if configured.
    pub center: Option<Coordinate>,
}

impl ScanConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `HEXSWEEP_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("HEXSWEEP_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();

        let scheduler_kind = match profiled_env_opt(p, "SCHEDULER") {
            Some(v) => v.parse()?,
            None => SchedulerKind::default(),
        };
        let scheduler = SchedulerConfig::new(
            profiled_parse(p, "ONLY_POI", false)?,
            profiled_parse(p, "STEP_LIMIT", 5i64)?,
        )?;

        let queue_capacity: Option<usize> = profiled_parse_opt(p, "QUEUE_CAPACITY")?;
        if queue_capacity == Some(0) {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        let lat: Option<f64> = profiled_parse_opt(p, "CENTER_LAT")?;
        let lng: Option<f64> = profiled_parse_opt(p, "CENTER_LNG")?;
        let center = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        };

        Ok(Self {
            profile: p.to_string(),
            scheduler_kind,
            scheduler,
            queue_capacity,
            workers: profiled_parse(p, "WORKERS", 1usize)?.max(1),
            center,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   kind={}, step_limit={}, only_poi={}",
            self.scheduler_kind,
            self.scheduler.step_limit,
            self.scheduler.only_points_of_interest
        );
        tracing::info!(
            "  queue:       capacity={}, workers={}",
            self.queue_capacity
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unbounded".to_string()),
            self.workers
        );
        match &self.center {
            Some(c) => tracing::info!("  center:      {}", c),
            None => tracing::info!("  center:      (unset)"),
        }
    }

    /// Return a JSON view of the config for status endpoints and logs.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": {
                "kind": self.scheduler_kind,
                "step_limit": self.scheduler.step_limit,
                "only_points_of_interest": self.scheduler.only_points_of_interest,
                "step_distance_km": self.scheduler.step_distance_km(),
            },
            "queue": { "capacity": self.queue_capacity, "workers": self.workers },
            "center": self.center,
        })
    }
}
