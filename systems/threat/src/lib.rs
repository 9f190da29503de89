#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Threat estimation along a resolved path.
//!
//! For every cell a mobile unit walks through, the estimator collects the
//! opposing structures whose attack range covers the cell and the allied
//! supports whose shield range covers it. Coverage lists are memoised per
//! cell in the [`TurnCache`], so evaluating many candidate edges that share
//! cells only scans each cell once per layout.

use std::collections::HashSet;

use breach_core::{Cell, Contribution, Path, Side, SpatialMap, ThreatProfile, TurnCache, Unit};
use serde::{Deserialize, Serialize};

/// How damage from a single attacker is credited along a path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackerCredit {
    /// Every covered cell adds the attacker's damage, as the engine fires each frame.
    #[default]
    PerCell,
    /// Each distinct attacker adds its damage once.
    PerAttacker,
}

/// Policy knobs for the estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatPolicy {
    /// Attacker crediting rule.
    pub attacker_credit: AttackerCredit,
}

/// Accumulates damage and shielding along paths.
#[derive(Debug, Default)]
pub struct ThreatEstimator {
    policy: ThreatPolicy,
    seen_attackers: HashSet<Cell>,
    seen_shielders: HashSet<Cell>,
}

impl ThreatEstimator {
    /// Creates an estimator following the provided policy.
    #[must_use]
    pub fn new(policy: ThreatPolicy) -> Self {
        Self {
            policy,
            seen_attackers: HashSet::new(),
            seen_shielders: HashSet::new(),
        }
    }

    /// Estimates what a unit owned by `side` meets while walking `path`.
    ///
    /// Shields are credited once per support per traversal. Attacker damage
    /// follows [`ThreatPolicy::attacker_credit`].
    pub fn estimate(
        &mut self,
        map: &SpatialMap<'_>,
        path: &Path,
        side: Side,
        cache: &mut TurnCache,
    ) -> ThreatProfile {
        let _ = cache.sync(map);
        let reach = Reach::of(map);
        self.seen_attackers.clear();
        self.seen_shielders.clear();
        let mut profile = ThreatProfile::default();

        for cell in path.cells() {
            let attackers = cache.attackers_or_insert_with(*cell, side, || {
                scan_attackers(map, *cell, side, reach.attack)
            });
            for attacker in attackers {
                let first_contact = self.seen_attackers.insert(attacker.source);
                match self.policy.attacker_credit {
                    AttackerCredit::PerCell => profile.expected_damage += attacker.amount,
                    AttackerCredit::PerAttacker if first_contact => {
                        profile.expected_damage += attacker.amount;
                    }
                    AttackerCredit::PerAttacker => {}
                }
            }

            let shielders = cache.shielders_or_insert_with(*cell, side, || {
                scan_shielders(map, *cell, side, reach.shield)
            });
            for shielder in shielders {
                if self.seen_shielders.insert(shielder.source) {
                    profile.shielding += shielder.amount;
                }
            }
        }

        profile.attackers = self.seen_attackers.len();
        profile.shielders = self.seen_shielders.len();
        log::debug!(
            "threat from {:?}: damage {:.1}, shield {:.1}, {} attackers, {} shielders",
            path.origin(),
            profile.expected_damage,
            profile.shielding,
            profile.attackers,
            profile.shielders
        );
        profile
    }
}

/// Longest attack and shield ranges among the structures on the map.
#[derive(Clone, Copy, Debug, Default)]
struct Reach {
    attack: f32,
    shield: f32,
}

impl Reach {
    fn of(map: &SpatialMap<'_>) -> Self {
        map.stationary_units()
            .fold(Self::default(), |reach, (_, unit)| {
                let stats = unit.stats();
                Self {
                    attack: if stats.attacks_mobile() {
                        reach.attack.max(stats.attack_range)
                    } else {
                        reach.attack
                    },
                    shield: if stats.grants_shield() {
                        reach.shield.max(stats.shield_range)
                    } else {
                        reach.shield
                    },
                }
            })
    }
}

/// Opposing structures able to hit a unit owned by `side` standing on `cell`.
///
/// Only cells within `reach` of `cell` are inspected.
fn scan_attackers(map: &SpatialMap<'_>, cell: Cell, side: Side, reach: f32) -> Vec<Contribution> {
    structures_near(map, cell, reach)
        .filter(|(_, unit)| unit.owner() != side && unit.stats().attacks_mobile())
        .filter(|(source, unit)| source.within_range(cell, unit.stats().attack_range))
        .map(|(source, unit)| Contribution {
            source,
            amount: unit.stats().damage_mobile,
        })
        .collect()
}

/// Allied supports able to shield a unit owned by `side` standing on `cell`.
///
/// Only cells within `reach` of `cell` are inspected.
fn scan_shielders(map: &SpatialMap<'_>, cell: Cell, side: Side, reach: f32) -> Vec<Contribution> {
    structures_near(map, cell, reach)
        .filter(|(_, unit)| unit.owner() == side && unit.stats().grants_shield())
        .filter(|(source, unit)| source.within_range(cell, unit.stats().shield_range))
        .map(|(source, unit)| Contribution {
            source,
            amount: unit.stats().shield_at(source),
        })
        .collect()
}

fn structures_near<'a>(
    map: &SpatialMap<'a>,
    cell: Cell,
    reach: f32,
) -> impl Iterator<Item = (Cell, &'a Unit)> + 'a {
    let map = *map;
    map.cells_within_range(cell, reach)
        .into_iter()
        .filter_map(move |source| map.stationary_at(source).map(|unit| (source, unit)))
}
