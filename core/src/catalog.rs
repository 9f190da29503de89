use serde::{Deserialize, Serialize};

use crate::{Cell, UnitKind};

/// Price of a unit in both currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Structure currency required.
    pub structure: f32,
    /// Mobile currency required.
    pub mobile: f32,
}

impl Cost {
    /// Creates a new cost.
    #[must_use]
    pub const fn new(structure: f32, mobile: f32) -> Self {
        Self { structure, mobile }
    }

    /// Cost of `count` copies.
    #[must_use]
    pub fn times(self, count: u32) -> Self {
        let factor = count as f32;
        Self::new(self.structure * factor, self.mobile * factor)
    }
}

/// Combat and support attributes of a unit at one upgrade level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health.
    pub health: f32,
    /// Attack radius in cells.
    pub attack_range: f32,
    /// Damage dealt per frame to mobile units.
    pub damage_mobile: f32,
    /// Damage dealt per frame to stationary units.
    pub damage_stationary: f32,
    /// Shield radius in cells.
    pub shield_range: f32,
    /// Flat shield granted to each mobile unit passing in range.
    pub shield_per_unit: f32,
    /// Extra shield granted per row of the support's position.
    pub shield_bonus_per_y: f32,
}

impl UnitStats {
    /// Reports whether the unit damages mobile units.
    #[must_use]
    pub fn attacks_mobile(&self) -> bool {
        self.damage_mobile > 0.0
    }

    /// Reports whether the unit grants shields.
    #[must_use]
    pub fn grants_shield(&self) -> bool {
        self.shield_range > 0.0 && (self.shield_per_unit > 0.0 || self.shield_bonus_per_y > 0.0)
    }

    /// Shield granted by a support standing on `origin`.
    #[must_use]
    pub fn shield_at(&self, origin: Cell) -> f32 {
        self.shield_per_unit + self.shield_bonus_per_y * origin.y() as f32
    }
}

/// Everything the catalog knows about one unit kind.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitProfile {
    /// Wire shorthand, for example `"FF"`.
    pub shorthand: String,
    /// Price of one unit.
    pub cost: Cost,
    /// Stats before upgrading.
    pub base: UnitStats,
    /// Stats after upgrading; equal to `base` for kinds without upgrades.
    pub upgraded: UnitStats,
    /// Price of the upgrade, absent when the kind cannot be upgraded.
    pub upgrade_cost: Option<Cost>,
}

/// Immutable unit configuration decoded once at game start.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCatalog {
    profiles: [UnitProfile; 6],
    remove_shorthand: String,
    upgrade_shorthand: String,
}

impl UnitCatalog {
    /// Builds a catalog from profiles ordered as [`UnitKind::ALL`].
    #[must_use]
    pub fn new(
        profiles: [UnitProfile; 6],
        remove_shorthand: impl Into<String>,
        upgrade_shorthand: impl Into<String>,
    ) -> Self {
        Self {
            profiles,
            remove_shorthand: remove_shorthand.into(),
            upgrade_shorthand: upgrade_shorthand.into(),
        }
    }

    /// Replaces the profile of one kind.
    #[must_use]
    pub fn with_profile(mut self, kind: UnitKind, profile: UnitProfile) -> Self {
        self.profiles[kind.index()] = profile;
        self
    }

    /// Full profile of a kind.
    #[must_use]
    pub fn profile(&self, kind: UnitKind) -> &UnitProfile {
        &self.profiles[kind.index()]
    }

    /// Stats of a kind at the requested level.
    #[must_use]
    pub fn stats(&self, kind: UnitKind, upgraded: bool) -> UnitStats {
        let profile = self.profile(kind);
        if upgraded {
            profile.upgraded
        } else {
            profile.base
        }
    }

    /// Price of one unit of a kind.
    #[must_use]
    pub fn cost(&self, kind: UnitKind) -> Cost {
        self.profile(kind).cost
    }

    /// Price of upgrading a kind, if it can be upgraded.
    #[must_use]
    pub fn upgrade_cost(&self, kind: UnitKind) -> Option<Cost> {
        self.profile(kind).upgrade_cost
    }

    /// Wire shorthand of a kind.
    #[must_use]
    pub fn shorthand(&self, kind: UnitKind) -> &str {
        &self.profile(kind).shorthand
    }

    /// Shorthand the engine expects for removal requests.
    #[must_use]
    pub fn remove_shorthand(&self) -> &str {
        &self.remove_shorthand
    }

    /// Shorthand the engine expects for upgrade requests.
    #[must_use]
    pub fn upgrade_shorthand(&self) -> &str {
        &self.upgrade_shorthand
    }

    /// Resolves a wire shorthand back into a kind.
    #[must_use]
    pub fn kind_for_shorthand(&self, shorthand: &str) -> Option<UnitKind> {
        UnitKind::ALL
            .into_iter()
            .find(|kind| self.shorthand(*kind) == shorthand)
    }
}

impl Default for UnitCatalog {
    fn default() -> Self {
        let wall = UnitStats {
            health: 60.0,
            ..UnitStats::default()
        };
        let support = UnitStats {
            health: 30.0,
            shield_range: 3.5,
            shield_per_unit: 3.0,
            ..UnitStats::default()
        };
        let turret = UnitStats {
            health: 75.0,
            attack_range: 2.5,
            damage_mobile: 6.0,
            ..UnitStats::default()
        };

        Self::new(
            [
                UnitProfile {
                    shorthand: "FF".to_owned(),
                    cost: Cost::new(1.0, 0.0),
                    base: wall,
                    upgraded: UnitStats {
                        health: 120.0,
                        ..wall
                    },
                    upgrade_cost: Some(Cost::new(1.0, 0.0)),
                },
                UnitProfile {
                    shorthand: "EF".to_owned(),
                    cost: Cost::new(4.0, 0.0),
                    base: support,
                    upgraded: UnitStats {
                        shield_range: 7.0,
                        shield_per_unit: 4.0,
                        shield_bonus_per_y: 0.3,
                        ..support
                    },
                    upgrade_cost: Some(Cost::new(4.0, 0.0)),
                },
                UnitProfile {
                    shorthand: "DF".to_owned(),
                    cost: Cost::new(2.0, 0.0),
                    base: turret,
                    upgraded: UnitStats {
                        attack_range: 3.5,
                        damage_mobile: 14.0,
                        ..turret
                    },
                    upgrade_cost: Some(Cost::new(4.0, 0.0)),
                },
                mobile_profile("PI", 1.0, 15.0, 3.5, 2.0, 2.0),
                mobile_profile("EI", 3.0, 5.0, 4.5, 8.0, 8.0),
                mobile_profile("SI", 1.0, 40.0, 4.5, 20.0, 0.0),
            ],
            "RM",
            "UP",
        )
    }
}

fn mobile_profile(
    shorthand: &str,
    cost: f32,
    health: f32,
    attack_range: f32,
    damage_mobile: f32,
    damage_stationary: f32,
) -> UnitProfile {
    let stats = UnitStats {
        health,
        attack_range,
        damage_mobile,
        damage_stationary,
        ..UnitStats::default()
    };
    UnitProfile {
        shorthand: shorthand.to_owned(),
        cost: Cost::new(0.0, cost),
        base: stats,
        upgraded: stats,
        upgrade_cost: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shorthands_resolve() {
        let catalog = UnitCatalog::default();
        for kind in UnitKind::ALL {
            let shorthand = catalog.shorthand(kind).to_owned();
            assert_eq!(catalog.kind_for_shorthand(&shorthand), Some(kind));
        }
        assert_eq!(catalog.kind_for_shorthand("RM"), None);
    }

    #[test]
    fn upgraded_support_shield_grows_with_row() {
        let catalog = UnitCatalog::default();
        let stats = catalog.stats(UnitKind::Support, true);
        let shield = stats.shield_at(Cell::new(13, 10));
        assert!((shield - 7.0).abs() < 1e-4, "expected 4 + 0.3 * 10, got {shield}");
    }

    #[test]
    fn mobile_kinds_have_no_upgrade() {
        let catalog = UnitCatalog::default();
        assert_eq!(catalog.upgrade_cost(UnitKind::Scout), None);
        assert!(catalog.upgrade_cost(UnitKind::Turret).is_some());
    }
}
