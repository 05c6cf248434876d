use crate::core::{FairnessObjective, GeometricStep, SearchConfig, VenueDefaults};
use crate::models::RankingWeights;
use crate::services::OracleConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub places: PlacesSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub objective: ObjectiveSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_cache_precision")]
    pub cache_precision: u32,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            cache_precision: default_cache_precision(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: u32,
    #[serde(default = "default_venue_limit")]
    pub default_limit: usize,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            default_radius_meters: default_radius_meters(),
            default_limit: default_venue_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    #[serde(default = "default_epsilon_minutes")]
    pub epsilon_minutes: f64,
    #[serde(default = "default_initial_step_fraction")]
    pub initial_step_fraction: f64,
    #[serde(default = "default_step_decay")]
    pub step_decay: f64,
    #[serde(default = "default_min_step_km")]
    pub min_step_km: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            time_budget_ms: default_time_budget_ms(),
            epsilon_minutes: default_epsilon_minutes(),
            initial_step_fraction: default_initial_step_fraction(),
            step_decay: default_step_decay(),
            min_step_km: default_min_step_km(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveSettings {
    #[serde(default = "default_unreachable_penalty")]
    pub unreachable_penalty_minutes: f64,
    #[serde(default = "default_tie_break_weight")]
    pub tie_break_weight: f64,
}

impl Default for ObjectiveSettings {
    fn default() -> Self {
        Self {
            unreachable_penalty_minutes: default_unreachable_penalty(),
            tie_break_weight: default_tie_break_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_popularity_weight")]
    pub popularity: f64,
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            rating: default_rating_weight(),
            popularity: default_popularity_weight(),
            distance: default_distance_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `compact`, `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_base_url() -> String { crate::services::google_maps::DEFAULT_BASE_URL.to_string() }
fn default_timeout_secs() -> u64 { 5 }
fn default_max_concurrency() -> usize { 8 }
fn default_cache_precision() -> u32 { 4 }
fn default_radius_meters() -> u32 { 1500 }
fn default_venue_limit() -> usize { 10 }
fn default_max_iterations() -> u32 { 20 }
fn default_time_budget_ms() -> u64 { 7000 }
fn default_epsilon_minutes() -> f64 { 0.01 }
fn default_initial_step_fraction() -> f64 { 0.5 }
fn default_step_decay() -> f64 { 0.5 }
fn default_min_step_km() -> f64 { 0.05 }
fn default_unreachable_penalty() -> f64 { 720.0 }
fn default_tie_break_weight() -> f64 { 0.001 }
fn default_rating_weight() -> f64 { 0.5 }
fn default_popularity_weight() -> f64 { 0.2 }
fn default_distance_weight() -> f64 { 0.3 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MIDPOINT_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MIDPOINT__SEARCH__TIME_BUDGET_MS -> search.time_budget_ms
            .add_source(
                Environment::with_prefix("MIDPOINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MIDPOINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Parse settings from an in-memory TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            max_concurrency: self.routing.max_concurrency.max(1),
            cache_precision: self.routing.cache_precision,
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_iterations: self.search.max_iterations,
            time_budget: Duration::from_millis(self.search.time_budget_ms),
            epsilon: self.search.epsilon_minutes,
            oracle: self.oracle_config(),
        }
    }

    pub fn step_policy(&self) -> GeometricStep {
        GeometricStep {
            initial_fraction: self.search.initial_step_fraction,
            decay: self.search.step_decay,
            min_step_km: self.search.min_step_km,
        }
    }

    pub fn objective(&self) -> FairnessObjective {
        FairnessObjective::new(
            self.objective.unreachable_penalty_minutes,
            self.objective.tie_break_weight,
        )
    }

    pub fn ranking_weights(&self) -> RankingWeights {
        RankingWeights {
            rating: self.ranking.rating,
            popularity: self.ranking.popularity,
            distance: self.ranking.distance,
        }
    }

    pub fn venue_defaults(&self) -> VenueDefaults {
        VenueDefaults {
            radius_meters: self.places.default_radius_meters,
            limit: self.places.default_limit,
        }
    }
}

/// Fill provider keys from GOOGLE_MAPS_API_KEY when the prefixed
/// variables did not set them
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let shared_key = match env::var("GOOGLE_MAPS_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => return Ok(settings),
    };

    let has_routing_key = settings.get_string("routing.api_key").is_ok();
    let has_places_key = settings.get_string("places.api_key").is_ok();

    let mut builder = Config::builder().add_source(settings);
    if !has_routing_key {
        builder = builder.set_override("routing.api_key", shared_key.clone())?;
    }
    if !has_places_key {
        builder = builder.set_override("places.api_key", shared_key)?;
    }

    builder.build()
}
