use breach_core::{Cost, UnitCatalog, UnitKind, UnitProfile, UnitStats};
use serde::Deserialize;

use crate::ProtocolError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    unit_information: Vec<RawUnitInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUnitInfo {
    shorthand: Option<String>,
    start_health: Option<f32>,
    cost1: Option<f32>,
    cost2: Option<f32>,
    attack_range: Option<f32>,
    attack_damage_walker: Option<f32>,
    attack_damage_tower: Option<f32>,
    shield_range: Option<f32>,
    shield_per_unit: Option<f32>,
    shield_bonus_per_y: Option<f32>,
    upgrade: Option<Box<RawUnitInfo>>,
}

impl RawUnitInfo {
    fn stats_over(&self, fallback: UnitStats) -> UnitStats {
        UnitStats {
            health: self.start_health.unwrap_or(fallback.health),
            attack_range: self.attack_range.unwrap_or(fallback.attack_range),
            damage_mobile: self.attack_damage_walker.unwrap_or(fallback.damage_mobile),
            damage_stationary: self.attack_damage_tower.unwrap_or(fallback.damage_stationary),
            shield_range: self.shield_range.unwrap_or(fallback.shield_range),
            shield_per_unit: self.shield_per_unit.unwrap_or(fallback.shield_per_unit),
            shield_bonus_per_y: self.shield_bonus_per_y.unwrap_or(fallback.shield_bonus_per_y),
        }
    }

    fn cost_over(&self, fallback: Cost) -> Cost {
        Cost::new(
            self.cost1.unwrap_or(fallback.structure),
            self.cost2.unwrap_or(fallback.mobile),
        )
    }

    fn profile_over(&self, fallback: &UnitProfile) -> UnitProfile {
        let base = self.stats_over(fallback.base);
        let (upgraded, upgrade_cost) = match &self.upgrade {
            Some(upgrade) => (
                upgrade.stats_over(base),
                Some(upgrade.cost_over(fallback.upgrade_cost.unwrap_or_default())),
            ),
            None => (fallback.upgraded, fallback.upgrade_cost),
        };
        UnitProfile {
            shorthand: self
                .shorthand
                .clone()
                .unwrap_or_else(|| fallback.shorthand.clone()),
            cost: self.cost_over(fallback.cost),
            base,
            upgraded,
            upgrade_cost,
        }
    }
}

/// Decodes the game configuration line into a unit catalog.
///
/// Entries follow the engine order: the six unit kinds, then the removal
/// and upgrade pseudo units. Missing entries and fields keep the built-in
/// values. Upgrade blocks override the unit's base stats.
pub fn decode_config(line: &str) -> Result<UnitCatalog, ProtocolError> {
    let raw: RawConfig = serde_json::from_str(line)?;
    let defaults = UnitCatalog::default();
    let profiles = UnitKind::ALL.map(|kind| match raw.unit_information.get(kind.index()) {
        Some(info) => info.profile_over(defaults.profile(kind)),
        None => defaults.profile(kind).clone(),
    });

    let pseudo = |index: usize, fallback: &str| {
        raw.unit_information
            .get(index)
            .and_then(|info| info.shorthand.clone())
            .unwrap_or_else(|| fallback.to_owned())
    };
    let remove = pseudo(6, defaults.remove_shorthand());
    let upgrade = pseudo(7, defaults.upgrade_shorthand());
    if raw.unit_information.len() < 8 {
        log::warn!(
            "config lists {} unit entries, built-in values fill the rest",
            raw.unit_information.len()
        );
    }

    Ok(UnitCatalog::new(profiles, remove, upgrade))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_block_overrides_base_stats() {
        let catalog = decode_config(
            r#"{"unitInformation": [
                {"shorthand": "FF", "startHealth": 50, "cost1": 1, "upgrade": {"startHealth": 100, "cost1": 2}},
                {},
                {"shorthand": "DF", "attackRange": 2.5, "attackDamageWalker": 5,
                 "upgrade": {"attackRange": 3.5}}
            ]}"#,
        )
        .expect("config decodes");

        let wall = catalog.profile(UnitKind::Wall);
        assert_eq!(wall.base.health, 50.0);
        assert_eq!(wall.upgraded.health, 100.0);
        assert_eq!(wall.upgrade_cost, Some(Cost::new(2.0, 0.0)));

        let turret = catalog.profile(UnitKind::Turret);
        assert_eq!(turret.base.damage_mobile, 5.0);
        assert_eq!(turret.upgraded.damage_mobile, 5.0, "unchanged fields carry over");
        assert_eq!(turret.upgraded.attack_range, 3.5);

        assert_eq!(catalog.profile(UnitKind::Support), UnitCatalog::default().profile(UnitKind::Support));
        assert_eq!(catalog.remove_shorthand(), "RM");
    }
}
