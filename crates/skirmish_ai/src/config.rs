//! Engine tuning knobs and per-map profile.
//!
//! Every knob has a default; a RON file only needs to name the ones it
//! changes:
//!
//! ```ron
//! (
//!     aggression_level: 0.8,
//!     strength_metric: AverageDamage,
//!     guard_stations: true,
//! )
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_core::math::{fixed_decimal, Fixed};
use thiserror::Error;

use crate::aggression::StrengthMetric;

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A knob is outside its allowed range.
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Tunable parameters of the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 0 = cautious, 1 = aggressive.
    #[serde(with = "fixed_decimal")]
    pub aggression_level: Fixed,
    /// Sensitivity multiplier on the commit threshold, must be positive.
    #[serde(with = "fixed_decimal")]
    pub nash_factor: Fixed,
    /// Scale constant `K` of the commit threshold.
    pub strength_scale: i32,
    /// Value each combat unit contributes to its side's strength.
    pub strength_metric: StrengthMetric,
    /// Maximum concurrently assigned harvesters per base.
    pub harvesters_per_base: usize,
    /// Enemies this close are always chased.
    pub chase_distance: i32,
    /// Allies this close count as a formation.
    pub formation_distance: i32,
    /// An enemy this close pulls a worker off harvesting or construction.
    pub melee_alert_distance: i32,
    /// Maximum barracks, counting ones under construction.
    pub barracks_cap: usize,
    /// Barracks site attempts per tick.
    pub build_attempts: usize,
    /// Sites scoring at or below this are rejected (tenths).
    pub site_score_floor: i32,
    /// Barracks switch from heavy to ranged units above this many heavies.
    pub heavy_threshold: usize,
    /// Bases keep training workers while this much is banked.
    pub worker_surplus_bank: i32,
    /// Remove ledger-predicted kills from every later unit's targeting.
    pub exclude_effectively_dead: bool,
    /// Send units with no allies around to their base's defense ring.
    pub guard_stations: bool,
    /// Wall-clock budget per tick in milliseconds.
    pub budget_ms: u64,
    /// Remaining budget below which units fall back to no-op.
    pub reserve_ms: u64,
    /// Seed for the deadlock nudge.
    pub nudge_seed: u64,
    /// Node expansion cap for the step finder.
    pub max_path_expansions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aggression_level: Fixed::from_num(0.5),
            nash_factor: Fixed::ONE,
            strength_scale: 10,
            strength_metric: StrengthMetric::Cost,
            harvesters_per_base: 2,
            chase_distance: 5,
            formation_distance: 3,
            melee_alert_distance: 2,
            barracks_cap: 2,
            build_attempts: 2,
            site_score_floor: -150,
            heavy_threshold: 3,
            worker_surplus_bank: 15,
            exclude_effectively_dead: true,
            guard_stations: false,
            budget_ms: 100,
            reserve_ms: 15,
            nudge_seed: 0x5eed,
            max_path_expansions: 4096,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every knob is inside its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggression_level < Fixed::ZERO || self.aggression_level > Fixed::ONE {
            return Err(ConfigError::InvalidValue {
                field: "aggression_level",
                reason: format!("{} is outside [0, 1]", self.aggression_level),
            });
        }
        if self.nash_factor <= Fixed::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "nash_factor",
                reason: format!("{} must be positive", self.nash_factor),
            });
        }
        if self.harvesters_per_base == 0 {
            return Err(ConfigError::InvalidValue {
                field: "harvesters_per_base",
                reason: "quota must be at least 1".into(),
            });
        }
        if self.strength_scale < 0 {
            return Err(ConfigError::InvalidValue {
                field: "strength_scale",
                reason: format!("{} must not be negative", self.strength_scale),
            });
        }
        if self.reserve_ms > self.budget_ms {
            return Err(ConfigError::InvalidValue {
                field: "reserve_ms",
                reason: format!(
                    "reserve {} ms exceeds budget {} ms",
                    self.reserve_ms, self.budget_ms
                ),
            });
        }
        Ok(())
    }

    /// Per-tick wall-clock budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Budget reserve for the fallback path.
    #[must_use]
    pub const fn reserve(&self) -> Duration {
        Duration::from_millis(self.reserve_ms)
    }
}

/// Parameters that depend only on the map size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapProfile {
    /// Chebyshev distance of the defense ring around each base.
    pub defense_distance: i32,
    /// Expected match length in ticks.
    pub cycle_budget: u64,
}

impl MapProfile {
    /// Look up the profile for a map width.
    #[must_use]
    pub const fn for_width(width: u32) -> Self {
        let (defense_distance, cycle_budget) = match width {
            0..=8 => (2, 3000),
            9..=16 => (3, 4000),
            17..=24 => (4, 5000),
            25..=32 => (5, 6000),
            33..=64 => (7, 8000),
            _ => (7, 12000),
        };
        Self {
            defense_distance,
            cycle_budget,
        }
    }

    /// Whether the match has run past half its expected length.
    #[must_use]
    pub const fn is_late(&self, tick: u64) -> bool {
        tick > self.cycle_budget / 2
    }
}
