//! Aggression estimation.
//!
//! Compares the combat strength of both sides and produces the single
//! offense-commit gate the engagement arbiter consults:
//!
//! `commit = (mine - theirs) > nash_factor * (1 - aggression_level) * K`
//!
//! The gate is recomputed from scratch every tick and carries no memory.

use serde::{Deserialize, Serialize};
use skirmish_core::prelude::*;

use crate::classify::SideRoster;
use crate::config::EngineConfig;

/// Value a combat unit adds to its side's strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StrengthMetric {
    /// Acquisition cost.
    #[default]
    Cost,
    /// `(min_damage + max_damage) / 2`.
    AverageDamage,
}

impl StrengthMetric {
    /// Value of one unit of `kind`.
    #[must_use]
    pub fn value(self, table: &UnitTypeTable, kind: UnitKind) -> i32 {
        let stats = table.get(kind);
        match self {
            Self::Cost => stats.cost,
            Self::AverageDamage => stats.average_damage(),
        }
    }
}

/// Sum of the metric over every combat unit of a side, idle and busy.
#[must_use]
pub fn side_strength(roster: &SideRoster<'_>, table: &UnitTypeTable, metric: StrengthMetric) -> i32 {
    roster.combat().map(|u| metric.value(table, u.kind)).sum()
}

/// The commit decision and the numbers behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggressionGate {
    /// Our strength.
    pub my_strength: i32,
    /// Their strength.
    pub enemy_strength: i32,
    /// Advantage needed to commit.
    pub threshold: Fixed,
    /// Whether combat units commit to offense this tick.
    pub commit: bool,
    /// Out of resources everywhere: every unit fights.
    pub all_in: bool,
}

impl AggressionGate {
    /// Evaluate the gate from two strengths.
    #[must_use]
    pub fn evaluate(my_strength: i32, enemy_strength: i32, config: &EngineConfig) -> Self {
        let threshold = config.nash_factor
            * (Fixed::ONE - config.aggression_level)
            * Fixed::from_num(config.strength_scale);
        let advantage = Fixed::from_num(my_strength) - Fixed::from_num(enemy_strength);
        Self {
            my_strength,
            enemy_strength,
            threshold,
            commit: advantage > threshold,
            all_in: false,
        }
    }

    /// Force the gate open because nothing is left to harvest or spend.
    #[must_use]
    pub fn into_all_in(self) -> Self {
        Self {
            commit: true,
            all_in: true,
            ..self
        }
    }

    /// A closed gate.
    #[must_use]
    pub const fn closed() -> Self {
        Self {
            my_strength: 0,
            enemy_strength: 0,
            threshold: Fixed::ZERO,
            commit: false,
            all_in: false,
        }
    }
}

/// Compute this tick's gate.
///
/// The gate is forced open when `banked` is zero and no resource field
/// remains on the map.
#[must_use]
pub fn estimate(
    own: &SideRoster<'_>,
    enemy: &SideRoster<'_>,
    table: &UnitTypeTable,
    config: &EngineConfig,
    banked: i32,
    resource_fields_left: bool,
) -> AggressionGate {
    let mine = side_strength(own, table, config.strength_metric);
    let theirs = side_strength(enemy, table, config.strength_metric);
    let gate = AggressionGate::evaluate(mine, theirs, config);
    if banked <= 0 && !resource_fields_left {
        gate.into_all_in()
    } else {
        gate
    }
}
