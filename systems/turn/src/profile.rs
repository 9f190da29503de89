use breach_core::{in_arena_bounds, Cell, UnitKind, HALF_ARENA};
use breach_system_lanes::LanePolicy;
use breach_system_placement::{RepairPolicy, Stage, StageAction};
use breach_system_threat::ThreatPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names accepted by [`StrategyProfile::builtin`].
pub const BUILTIN_PROFILES: [&str; 3] = ["starter", "viral", "wall"];

/// Errors raised while loading a strategy profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No built-in profile carries the requested name.
    #[error("unknown built-in strategy '{0}', expected one of starter, viral, wall")]
    UnknownBuiltin(String),
    /// The TOML document could not be decoded.
    #[error("could not parse strategy profile: {0}")]
    Parse(#[from] toml::de::Error),
    /// The profile could not be encoded as TOML.
    #[error("could not encode strategy profile: {0}")]
    Encode(#[from] toml::ser::Error),
    /// A stage targets a cell the friendly player cannot build on.
    #[error("stage '{stage}' targets {cell:?} outside the friendly half")]
    TargetOutOfTerritory {
        /// Stage name.
        stage: String,
        /// Offending target.
        cell: Cell,
    },
    /// A stage builds a mobile unit.
    #[error("stage '{stage}' builds mobile unit {kind:?}")]
    MobileStage {
        /// Stage name.
        stage: String,
        /// Offending unit kind.
        kind: UnitKind,
    },
    /// The regular attack is made of structures.
    #[error("attack unit {0:?} is not a mobile unit")]
    StationaryAttackUnit(UnitKind),
    /// Attacks must happen at least every so many turns.
    #[error("attack interval must be at least one turn")]
    ZeroInterval,
    /// The adaptive stage index does not name a stage.
    #[error("adaptive defense refers to missing stage {0}")]
    MissingAdaptiveStage(usize),
}

/// One rule of an attack schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackTier {
    /// The tier applies only before this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_turn: Option<u32>,
    /// The tier applies only with at least this much mobile currency.
    #[serde(default)]
    pub min_budget: f32,
    /// Units committed when the tier applies.
    pub units: u32,
}

impl AttackTier {
    fn applies(&self, turn: u32, currency: f32) -> bool {
        self.before_turn.map_or(true, |limit| turn < limit) && currency >= self.min_budget
    }
}

/// How many units the schedule lets an attack commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allowance {
    /// Commit everything affordable.
    Unlimited,
    /// Commit at most this many units.
    Units(u32),
    /// Attack not this turn.
    Hold,
}

/// Ordered tiers deciding how much of the budget an attack commits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackSchedule {
    /// Tiers in priority order; the first applicable tier wins.
    #[serde(default)]
    pub tiers: Vec<AttackTier>,
}

impl AttackSchedule {
    /// Resolves the allowance for a turn. No tiers means no limit.
    #[must_use]
    pub fn allowance(&self, turn: u32, currency: f32) -> Allowance {
        if self.tiers.is_empty() {
            return Allowance::Unlimited;
        }
        self.tiers
            .iter()
            .find(|tier| tier.applies(turn, currency))
            .map_or(Allowance::Hold, |tier| Allowance::Units(tier.units))
    }
}

/// Interceptors scattered over free deploy cells during the opening turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorStall {
    /// Stalling replaces attacks before this turn.
    pub before_turn: u32,
}

/// Switch to demolishers behind a structure line when the enemy front fills up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemolisherSwitch {
    /// Enemy structures on the front rows above which the switch fires.
    pub threshold: usize,
    /// Enemy rows that count as the front.
    pub front_rows: Vec<i32>,
    /// Cells filled with the cheapest structure, in order.
    pub line: Vec<Cell>,
    /// Deploy cell of the demolishers.
    pub origin: Cell,
}

/// Change the attack unit after the enemy shrugs off repeated attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedSwitch {
    /// Consecutive attacks that left enemy health untouched before switching.
    pub after: u32,
    /// Mobile unit sent while the switch holds.
    pub unit: UnitKind,
}

/// Turrets placed at the median column of cells that needed repair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveDefense {
    /// Index of the stage that receives adaptive targets.
    pub stage: usize,
    /// Row the adaptive turrets are placed on.
    pub row: i32,
}

/// Everything a strategy decides ahead of the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// Label used in logs.
    pub name: String,
    /// Mobile unit used for regular attacks.
    #[serde(default = "default_attack_unit")]
    pub attack_unit: UnitKind,
    /// Regular attacks happen on turns where `turn % interval == interval - 1`.
    #[serde(default = "default_attack_interval")]
    pub attack_interval: u32,
    /// Place a turret above every cell the enemy scored on.
    #[serde(default)]
    pub reactive_defense: bool,
    /// Send every affordable scout once health drops below this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_in_below_health: Option<f32>,
    /// Deploy cells considered for attacks; all friendly edge cells when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Cell>>,
    /// Repair thresholds.
    #[serde(default)]
    pub repair: RepairPolicy,
    /// Lane selection parameters.
    #[serde(default)]
    pub lanes: LanePolicy,
    /// Threat crediting rules.
    #[serde(default)]
    pub threat: ThreatPolicy,
    /// Regular attack schedule; no regular attacks when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<AttackSchedule>,
    /// Opening interceptor stall.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stall: Option<InterceptorStall>,
    /// Attack unit used once regular attacks keep getting blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_switch: Option<BlockedSwitch>,
    /// Demolisher line attack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demolisher_switch: Option<DemolisherSwitch>,
    /// Turrets that follow repeated damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_defense: Option<AdaptiveDefense>,
    /// Placement plan, built in order.
    #[serde(default)]
    pub stages: Vec<Stage>,
}

fn default_attack_unit() -> UnitKind {
    UnitKind::Scout
}

fn default_attack_interval() -> u32 {
    1
}

fn cells(raw: &[[i32; 2]]) -> Vec<Cell> {
    raw.iter().copied().map(Cell::from).collect()
}

impl StrategyProfile {
    /// Returns a built-in profile by name.
    pub fn builtin(name: &str) -> Result<Self, ProfileError> {
        match name {
            "starter" => Ok(Self::starter()),
            "viral" => Ok(Self::viral()),
            "wall" => Ok(Self::wall()),
            other => Err(ProfileError::UnknownBuiltin(other.to_owned())),
        }
    }

    /// Parses and validates a TOML profile.
    pub fn from_toml_str(contents: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(contents)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Encodes the profile as TOML.
    pub fn to_toml_string(&self) -> Result<String, ProfileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the profile against the arena rules.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !self.attack_unit.is_mobile() {
            return Err(ProfileError::StationaryAttackUnit(self.attack_unit));
        }
        if let Some(switch) = self.blocked_switch {
            if !switch.unit.is_mobile() {
                return Err(ProfileError::StationaryAttackUnit(switch.unit));
            }
        }
        if self.attack_interval == 0 {
            return Err(ProfileError::ZeroInterval);
        }
        for stage in &self.stages {
            if !stage.kind.is_stationary() {
                return Err(ProfileError::MobileStage {
                    stage: stage.name.clone(),
                    kind: stage.kind,
                });
            }
            if let Some(cell) = stage
                .targets
                .iter()
                .find(|cell| !in_arena_bounds(**cell) || cell.y() >= HALF_ARENA)
            {
                return Err(ProfileError::TargetOutOfTerritory {
                    stage: stage.name.clone(),
                    cell: *cell,
                });
            }
        }
        if let Some(adaptive) = self.adaptive_defense {
            if adaptive.stage >= self.stages.len() {
                return Err(ProfileError::MissingAdaptiveStage(adaptive.stage));
            }
        }
        Ok(())
    }

    /// Reports whether regular attacks are due this turn.
    #[must_use]
    pub fn attacks_on(&self, turn: u32) -> bool {
        let interval = self.attack_interval.max(1);
        turn % interval == interval - 1
    }

    /// Spread turrets, reactive turrets, an interceptor stall, then scouts
    /// every other turn or demolishers once the enemy front is crowded.
    #[must_use]
    pub fn starter() -> Self {
        let line = (6..=27).rev().map(|x| Cell::new(x, 11)).collect();
        Self {
            name: "starter".to_owned(),
            attack_unit: UnitKind::Scout,
            attack_interval: 2,
            reactive_defense: true,
            all_in_below_health: None,
            candidates: Some(cells(&[[13, 0], [14, 0]])),
            repair: RepairPolicy::default(),
            lanes: LanePolicy {
                max_lanes: 1,
                min_commit_budget: 0.0,
                ..LanePolicy::default()
            },
            threat: ThreatPolicy::default(),
            schedule: Some(AttackSchedule::default()),
            stall: Some(InterceptorStall { before_turn: 5 }),
            blocked_switch: None,
            demolisher_switch: Some(DemolisherSwitch {
                threshold: 10,
                front_rows: vec![14, 15],
                line,
                origin: Cell::new(24, 10),
            }),
            adaptive_defense: None,
            stages: vec![
                Stage::new(
                    "turrets",
                    UnitKind::Turret,
                    StageAction::Deploy,
                    cells(&[[0, 13], [27, 13], [8, 11], [19, 11], [13, 11], [14, 11]]),
                ),
                Stage::new("walls", UnitKind::Wall, StageAction::Deploy, cells(&[[8, 12], [19, 12]])),
                Stage::new("wall upgrades", UnitKind::Wall, StageAction::Upgrade, cells(&[[8, 12], [19, 12]])),
                Stage::new(
                    "supports",
                    UnitKind::Support,
                    StageAction::Deploy,
                    cells(&[[13, 2], [14, 2], [13, 3], [14, 3]]),
                ),
            ],
        }
    }

    /// Staged turret and support build with tiered scout pressure.
    #[must_use]
    pub fn viral() -> Self {
        let supports = cells(&[[21, 7], [20, 7], [19, 7], [18, 6], [17, 6], [16, 5], [16, 4]]);
        let spine = cells(&[
            [14, 0],
            [13, 0],
            [14, 3],
            [13, 3],
            [12, 4],
            [11, 5],
            [10, 6],
            [9, 6],
            [16, 2],
            [15, 1],
            [14, 1],
            [13, 1],
            [12, 1],
            [11, 2],
            [10, 3],
            [9, 4],
        ]);
        Self {
            name: "viral".to_owned(),
            attack_unit: UnitKind::Scout,
            attack_interval: 1,
            reactive_defense: false,
            all_in_below_health: None,
            candidates: None,
            repair: RepairPolicy::default(),
            lanes: LanePolicy {
                max_lanes: 1,
                min_commit_budget: 0.0,
                ..LanePolicy::default()
            },
            threat: ThreatPolicy::default(),
            schedule: Some(AttackSchedule {
                tiers: vec![
                    AttackTier {
                        before_turn: Some(5),
                        min_budget: 0.0,
                        units: 1,
                    },
                    AttackTier {
                        before_turn: Some(15),
                        min_budget: 5.0,
                        units: 5,
                    },
                    AttackTier {
                        before_turn: Some(25),
                        min_budget: 10.0,
                        units: 10,
                    },
                    AttackTier {
                        before_turn: None,
                        min_budget: 13.0,
                        units: 13,
                    },
                ],
            }),
            stall: None,
            blocked_switch: Some(BlockedSwitch {
                after: 2,
                unit: UnitKind::Demolisher,
            }),
            demolisher_switch: None,
            adaptive_defense: None,
            stages: vec![
                Stage::new(
                    "turrets",
                    UnitKind::Turret,
                    StageAction::DeployUpgraded,
                    cells(&[[13, 9], [22, 12], [5, 12], [2, 13], [25, 13]]),
                ),
                Stage::new("supports", UnitKind::Support, StageAction::Deploy, supports.clone()),
                Stage::new(
                    "inner turrets",
                    UnitKind::Turret,
                    StageAction::DeployUpgraded,
                    cells(&[[18, 9], [9, 9]]),
                ),
                Stage::new("support upgrades", UnitKind::Support, StageAction::Upgrade, supports),
                Stage::new(
                    "flank turrets",
                    UnitKind::Turret,
                    StageAction::DeployUpgraded,
                    cells(&[[11, 7], [3, 11], [24, 11]]),
                ),
                Stage::new("support spine", UnitKind::Support, StageAction::Deploy, spine.clone()),
                Stage::new("support spine upgrades", UnitKind::Support, StageAction::Upgrade, spine),
            ],
        }
    }

    /// Upgraded core turrets behind a full repaired wall, adaptive turrets
    /// where the wall keeps breaking, and a last-ditch scout rush.
    #[must_use]
    pub fn wall() -> Self {
        let turrets = |name: &str, raw: &[[i32; 2]]| {
            Stage::new(name, UnitKind::Turret, StageAction::DeployUpgraded, cells(raw))
        };
        let wall = |name: &str, raw: &[[i32; 2]]| {
            Stage::new(name, UnitKind::Wall, StageAction::DeployUpgraded, cells(raw)).with_repair()
        };
        Self {
            name: "wall".to_owned(),
            attack_unit: UnitKind::Scout,
            attack_interval: 1,
            reactive_defense: false,
            all_in_below_health: Some(10.0),
            candidates: Some(cells(&[[13, 0]])),
            repair: RepairPolicy::default(),
            lanes: LanePolicy::default(),
            threat: ThreatPolicy::default(),
            schedule: None,
            stall: None,
            blocked_switch: None,
            demolisher_switch: None,
            adaptive_defense: Some(AdaptiveDefense { stage: 9, row: 11 }),
            stages: vec![
                turrets("outer core turrets", &[[3, 12], [24, 12]]),
                turrets("middle core turrets", &[[8, 12], [19, 12]]),
                turrets("inner core turrets", &[[12, 12], [15, 12]]),
                wall("wall corners", &[[0, 13], [27, 13], [1, 13], [26, 13], [2, 13], [25, 13]]),
                wall("wall flanks", &[[3, 13], [24, 13], [4, 13], [23, 13], [5, 13], [22, 13]]),
                wall("wall shoulders", &[[6, 13], [21, 13], [7, 13], [20, 13], [8, 13], [19, 13]]),
                wall("wall centre", &[[9, 13], [18, 13], [10, 13], [17, 13], [11, 13], [16, 13]]),
                wall("wall gate", &[[12, 13], [15, 13]]),
                wall("wall plug", &[[13, 12], [14, 12]]),
                turrets("adaptive turrets", &[]),
                turrets("edge turrets", &[[1, 12], [26, 12]]).with_repair(),
                turrets("outer edge turrets", &[[2, 12], [25, 12]]).with_repair(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_validate() {
        for name in BUILTIN_PROFILES {
            let profile = StrategyProfile::builtin(name).expect("built-in exists");
            assert_eq!(profile.name, name);
            profile.validate().expect("built-in profiles are valid");
        }
        assert!(matches!(
            StrategyProfile::builtin("turtle"),
            Err(ProfileError::UnknownBuiltin(name)) if name == "turtle"
        ));
    }

    #[test]
    fn viral_tiers_follow_turn_and_budget() {
        let schedule = StrategyProfile::viral().schedule.expect("viral attacks");
        assert_eq!(schedule.allowance(2, 0.0), Allowance::Units(1));
        assert_eq!(schedule.allowance(7, 6.0), Allowance::Units(5));
        assert_eq!(schedule.allowance(7, 4.0), Allowance::Hold);
        assert_eq!(schedule.allowance(20, 12.0), Allowance::Units(10));
        assert_eq!(schedule.allowance(30, 12.0), Allowance::Hold);
        assert_eq!(schedule.allowance(30, 13.0), Allowance::Units(13));
        assert_eq!(AttackSchedule::default().allowance(0, 0.0), Allowance::Unlimited);
    }

    #[test]
    fn attack_interval_picks_the_last_turn_of_each_cycle() {
        let starter = StrategyProfile::starter();
        assert!(!starter.attacks_on(4));
        assert!(starter.attacks_on(5));
        assert!(StrategyProfile::viral().attacks_on(0));
    }

    #[test]
    fn blocked_switch_must_send_a_mobile_unit() {
        let mut viral = StrategyProfile::viral();
        assert_eq!(viral.blocked_switch.map(|switch| switch.unit), Some(UnitKind::Demolisher));
        viral.blocked_switch = Some(BlockedSwitch {
            after: 2,
            unit: UnitKind::Wall,
        });
        assert!(matches!(
            viral.validate(),
            Err(ProfileError::StationaryAttackUnit(UnitKind::Wall))
        ));
    }

    #[test]
    fn wall_adaptive_stage_starts_empty() {
        let wall = StrategyProfile::wall();
        let adaptive = wall.adaptive_defense.expect("wall adapts");
        assert_eq!(wall.stages[adaptive.stage].name, "adaptive turrets");
        assert!(wall.stages[adaptive.stage].targets.is_empty());
    }

    #[test]
    fn toml_profile_fills_defaults() {
        let profile = StrategyProfile::from_toml_str(
            r#"
name = "corner"
candidates = [[0, 13], [27, 13]]

[schedule]
tiers = [{ min_budget = 8.0, units = 8 }]

[[stages]]
name = "corner turrets"
kind = "turret"
action = "deploy_upgraded"
targets = [[3, 12], [24, 12]]
repair = true
"#,
        )
        .expect("profile parses");

        assert_eq!(profile.attack_unit, UnitKind::Scout);
        assert_eq!(profile.attack_interval, 1);
        assert_eq!(profile.lanes, LanePolicy::default());
        assert_eq!(profile.stages.len(), 1);
        assert!(profile.stages[0].repair);
        assert_eq!(profile.stages[0].action, StageAction::DeployUpgraded);
        assert_eq!(
            profile.schedule.expect("schedule present").allowance(3, 9.0),
            Allowance::Units(8)
        );
    }

    #[test]
    fn toml_profile_rejects_enemy_half_targets() {
        let error = StrategyProfile::from_toml_str(
            r#"
name = "reckless"

[[stages]]
name = "forward"
kind = "wall"
action = "deploy"
targets = [[13, 14]]
"#,
        )
        .expect_err("enemy half is off limits");
        assert!(matches!(error, ProfileError::TargetOutOfTerritory { .. }));
    }

    #[test]
    fn builtins_survive_a_toml_dump() {
        let wall = StrategyProfile::wall();
        let dumped = wall.to_toml_string().expect("profile encodes");
        let reloaded = StrategyProfile::from_toml_str(&dumped).expect("dump parses");
        assert_eq!(reloaded, wall);
    }
}
