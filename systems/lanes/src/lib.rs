#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Edge evaluation and attack lane selection.
//!
//! Every candidate deploy cell is scored by resolving the path a unit would
//! take from it and estimating the threat along that path. The ranking is a
//! stable sort on net benefit, so candidates that score equally keep their
//! enumeration order. Lanes are then chosen from the ranking: the best
//! candidate first, followed by secondary lanes that genuinely diverge from
//! it when the budget exceeds what one lane should carry.

use breach_core::{
    Cell, Cost, Path, Resources, Side, SpatialMap, ThreatProfile, TurnCache, UnitCatalog, UnitKind,
};
use breach_system_pathing::PathResolver;
use breach_system_threat::ThreatEstimator;
use serde::{Deserialize, Serialize};

/// Tunable lane selection parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanePolicy {
    /// Most units committed to a single lane before secondary lanes are considered.
    pub lane_capacity: u32,
    /// Upper bound on the number of lanes, primary included.
    pub max_lanes: usize,
    /// Secondary lanes must share less than this fraction of their path with the primary.
    pub max_convergence: f32,
    /// Secondary lanes must at some step be at least this far from the primary.
    pub min_separation: f32,
    /// Secondary lanes must score at least this net benefit.
    pub min_secondary_benefit: f32,
    /// Mobile currency at or above which the plan attacks even without a positive lane.
    pub min_commit_budget: f32,
}

impl Default for LanePolicy {
    fn default() -> Self {
        Self {
            lane_capacity: 10,
            max_lanes: 2,
            max_convergence: 0.5,
            min_separation: 4.0,
            min_secondary_benefit: 0.0,
            min_commit_budget: 10.0,
        }
    }
}

/// Mobile unit kind and currency available for this turn's attack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackBudget {
    /// Unit kind the attack is made of.
    pub kind: UnitKind,
    /// Health of a single unit.
    pub unit_health: f32,
    /// Mobile currency cost of a single unit.
    pub unit_cost: f32,
    /// Mobile currency available.
    pub currency: f32,
}

impl AttackBudget {
    /// Resolves the budget for `kind` from the catalog and the available currency.
    #[must_use]
    pub fn from_catalog(catalog: &UnitCatalog, kind: UnitKind, resources: Resources) -> Self {
        Self {
            kind,
            unit_health: catalog.stats(kind, false).health,
            unit_cost: catalog.cost(kind).mobile,
            currency: resources.mobile,
        }
    }

    /// Limits the budget to at most `units` units.
    #[must_use]
    pub fn capped(mut self, units: u32) -> Self {
        self.currency = self.currency.min(self.unit_cost * units as f32);
        self
    }

    /// Number of units the currency affords.
    #[must_use]
    pub fn affordable(&self) -> u32 {
        Resources::new(0.0, self.currency).affordable_count(Cost::new(0.0, self.unit_cost))
    }

    /// `attack_potential * (unit_health + shielding) - expected_damage`.
    #[must_use]
    pub fn net_benefit(&self, threat: &ThreatProfile) -> f32 {
        self.affordable() as f32 * (self.unit_health + threat.shielding) - threat.expected_damage
    }
}

/// Scored candidate deploy cell.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeScore {
    /// Deploy cell.
    pub origin: Cell,
    /// Path a unit deployed there takes.
    pub path: Path,
    /// Threat met along the path.
    pub threat: ThreatProfile,
    /// Net benefit of committing the budget here.
    pub net_benefit: f32,
}

/// Reason a candidate was left out of the ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exclusion {
    /// A structure stands on the candidate cell.
    OriginBlocked,
    /// No exit is reachable from the candidate cell.
    NoPath,
}

/// Candidates ranked by net benefit, best first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedEdges {
    scores: Vec<EdgeScore>,
    excluded: Vec<(Cell, Exclusion)>,
}

impl RankedEdges {
    /// Ranks scores by net benefit, keeping the given order among equals.
    #[must_use]
    pub fn from_scores(mut scores: Vec<EdgeScore>, excluded: Vec<(Cell, Exclusion)>) -> Self {
        scores.sort_by(|left, right| right.net_benefit.total_cmp(&left.net_benefit));
        Self { scores, excluded }
    }

    /// Highest scoring candidate.
    #[must_use]
    pub fn best(&self) -> Option<&EdgeScore> {
        self.scores.first()
    }

    /// Scored candidates, best first.
    #[must_use]
    pub fn scores(&self) -> &[EdgeScore] {
        &self.scores
    }

    /// Candidates that were left out and why.
    #[must_use]
    pub fn excluded(&self) -> &[(Cell, Exclusion)] {
        &self.excluded
    }
}

/// Units sent down one lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneAllocation {
    /// Deploy cell.
    pub origin: Cell,
    /// Units deployed there.
    pub count: u32,
}

/// Outcome of lane selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackPlan {
    /// Deploy units along the listed lanes, primary first.
    Attack {
        /// Unit kind to deploy.
        kind: UnitKind,
        /// Lanes and unit counts.
        allocations: Vec<LaneAllocation>,
    },
    /// Keep the currency for a later turn.
    Hold,
}

impl AttackPlan {
    /// Total units the plan deploys.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        match self {
            Self::Attack { allocations, .. } => allocations.iter().map(|lane| lane.count).sum(),
            Self::Hold => 0,
        }
    }
}

/// Scores candidate deploy cells and selects attack lanes.
#[derive(Debug, Default)]
pub struct EdgeEvaluator {
    policy: LanePolicy,
    resolver: PathResolver,
    estimator: ThreatEstimator,
}

impl EdgeEvaluator {
    /// Creates an evaluator from its policy and collaborators.
    #[must_use]
    pub fn new(policy: LanePolicy, resolver: PathResolver, estimator: ThreatEstimator) -> Self {
        Self {
            policy,
            resolver,
            estimator,
        }
    }

    /// Lane policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &LanePolicy {
        &self.policy
    }

    /// Scores every candidate and ranks them.
    ///
    /// Candidates with a blocked origin or no path are recorded as excluded.
    pub fn evaluate(
        &mut self,
        map: &SpatialMap<'_>,
        candidates: &[Cell],
        budget: &AttackBudget,
        cache: &mut TurnCache,
    ) -> RankedEdges {
        let mut scores = Vec::with_capacity(candidates.len());
        let mut excluded = Vec::new();

        for origin in candidates {
            if map.is_blocked_for_spawn(*origin) {
                excluded.push((*origin, Exclusion::OriginBlocked));
                continue;
            }
            let Some(path) = self.resolver.resolve(map, *origin, cache) else {
                excluded.push((*origin, Exclusion::NoPath));
                continue;
            };

            let threat = self.estimator.estimate(map, &path, Side::Friendly, cache);
            let net_benefit = budget.net_benefit(&threat);
            log::debug!("edge {origin:?} scores {net_benefit:.1} over {} cells", path.len());
            scores.push(EdgeScore {
                origin: *origin,
                path,
                threat,
                net_benefit,
            });
        }

        RankedEdges::from_scores(scores, excluded)
    }

    /// Chooses lanes for the budget, or holds when nothing is worth attacking.
    #[must_use]
    pub fn decide(&self, ranked: &RankedEdges, budget: &AttackBudget) -> AttackPlan {
        let total = budget.affordable();
        let Some(primary) = ranked.best() else {
            return AttackPlan::Hold;
        };
        if total == 0 {
            return AttackPlan::Hold;
        }
        if primary.net_benefit <= 0.0 && budget.currency < self.policy.min_commit_budget {
            log::debug!(
                "holding: best lane {:?} scores {:.1} with {:.1} currency",
                primary.origin,
                primary.net_benefit,
                budget.currency
            );
            return AttackPlan::Hold;
        }

        let capacity = self.policy.lane_capacity.max(1);
        let mut allocations = vec![LaneAllocation {
            origin: primary.origin,
            count: total.min(capacity),
        }];
        let mut remaining = total - allocations[0].count;

        for candidate in ranked.scores().iter().skip(1) {
            if remaining == 0 || allocations.len() >= self.policy.max_lanes {
                break;
            }
            if !self.diverges(primary, candidate) {
                continue;
            }
            let count = remaining.min(capacity);
            allocations.push(LaneAllocation {
                origin: candidate.origin,
                count,
            });
            remaining -= count;
        }
        allocations[0].count += remaining;

        AttackPlan::Attack {
            kind: budget.kind,
            allocations,
        }
    }

    fn diverges(&self, primary: &EdgeScore, candidate: &EdgeScore) -> bool {
        candidate.net_benefit >= self.policy.min_secondary_benefit
            && convergence(&primary.path, &candidate.path) < self.policy.max_convergence
            && max_step_separation(&primary.path, &candidate.path) >= self.policy.min_separation
    }
}

/// Share of `candidate` that runs after its first cell shared with `primary`.
///
/// Zero when the paths never meet, one when they start on the same cell.
#[must_use]
pub fn convergence(primary: &Path, candidate: &Path) -> f32 {
    let shared = candidate
        .cells()
        .iter()
        .position(|cell| primary.contains(*cell));
    match shared {
        Some(index) => 1.0 - index as f32 / candidate.len() as f32,
        None => 0.0,
    }
}

/// Largest Euclidean distance between the two walks at the same step.
#[must_use]
pub fn max_step_separation(primary: &Path, candidate: &Path) -> f32 {
    primary
        .cells()
        .iter()
        .zip(candidate.cells())
        .map(|(left, right)| left.distance(*right))
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breach_core::Edge;

    fn score(x: i32, y: i32, net_benefit: f32) -> EdgeScore {
        let origin = Cell::new(x, y);
        EdgeScore {
            origin,
            path: Path::new(Edge::target_for(origin), vec![origin]).expect("path"),
            threat: ThreatProfile::default(),
            net_benefit,
        }
    }

    fn scouts(currency: f32) -> AttackBudget {
        AttackBudget::from_catalog(&UnitCatalog::default(), UnitKind::Scout, Resources::new(0.0, currency))
    }

    #[test]
    fn ranking_is_stable_for_equal_scores() {
        let ranked = RankedEdges::from_scores(
            vec![score(0, 13, 5.0), score(1, 12, 9.0), score(2, 11, 5.0)],
            Vec::new(),
        );
        let order: Vec<Cell> = ranked.scores().iter().map(|entry| entry.origin).collect();
        assert_eq!(order, vec![Cell::new(1, 12), Cell::new(0, 13), Cell::new(2, 11)]);
    }

    #[test]
    fn holds_when_nothing_pays_off_and_budget_is_small() {
        let evaluator = EdgeEvaluator::default();
        let ranked = RankedEdges::from_scores(vec![score(0, 13, -3.0)], Vec::new());
        assert_eq!(evaluator.decide(&ranked, &scouts(4.0)), AttackPlan::Hold);
    }

    #[test]
    fn commits_anyway_once_budget_reaches_threshold() {
        let evaluator = EdgeEvaluator::default();
        let ranked = RankedEdges::from_scores(vec![score(0, 13, -3.0)], Vec::new());
        assert_eq!(
            evaluator.decide(&ranked, &scouts(10.0)),
            AttackPlan::Attack {
                kind: UnitKind::Scout,
                allocations: vec![LaneAllocation {
                    origin: Cell::new(0, 13),
                    count: 10,
                }],
            }
        );
    }

    #[test]
    fn empty_ranking_holds() {
        let evaluator = EdgeEvaluator::default();
        assert_eq!(evaluator.decide(&RankedEdges::default(), &scouts(30.0)), AttackPlan::Hold);
    }

    #[test]
    fn capped_budget_limits_units() {
        let budget = scouts(12.4).capped(5);
        assert_eq!(budget.affordable(), 5);
        assert_eq!(scouts(12.4).affordable(), 12);
    }

    #[test]
    fn path_similarity_measures() {
        let primary = Path::new(
            Edge::TopRight,
            vec![Cell::new(3, 10), Cell::new(3, 11), Cell::new(4, 11), Cell::new(4, 12)],
        )
        .expect("path");
        let merging = Path::new(
            Edge::TopRight,
            vec![Cell::new(5, 8), Cell::new(5, 9), Cell::new(4, 10), Cell::new(4, 11)],
        )
        .expect("path");
        assert!((convergence(&primary, &merging) - 0.25).abs() < 1e-6);
        assert!((max_step_separation(&primary, &merging) - 8.0_f32.sqrt()).abs() < 1e-6);
        assert!((convergence(&primary, &primary) - 1.0).abs() < 1e-6);
    }
}
