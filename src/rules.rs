//! Ordinal classification ladders.
//!
//! Each ladder is an ordered table of `(predicate, label)` rules evaluated
//! top to bottom; the first rule that applies wins and the fallback label is
//! used when none does. Thresholds are strict (`>`), so a value sitting on a
//! boundary falls into the lower tier.

use serde::Serialize;
use std::fmt;

/// One row of a ladder.
pub struct Rule<I, L> {
    pub label: L,
    pub applies: fn(&I) -> bool,
}

/// Ordered rule table with a fallback label.
pub struct Ladder<I: 'static, L: 'static> {
    rules: &'static [Rule<I, L>],
    otherwise: L,
}

impl<I: 'static, L: Copy + 'static> Ladder<I, L> {
    pub const fn new(rules: &'static [Rule<I, L>], otherwise: L) -> Self {
        Self { rules, otherwise }
    }

    pub fn classify(&self, input: &I) -> L {
        self.rules
            .iter()
            .find(|rule| (rule.applies)(input))
            .map(|rule| rule.label)
            .unwrap_or(self.otherwise)
    }
}

// ---------------------------------------------------------------------------
// Coverage status
// ---------------------------------------------------------------------------

/// How well a region's demand is covered by branches.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoverageStatus {
    #[serde(rename = "No Coverage")]
    NoCoverage,
    #[serde(rename = "Severely Underserved")]
    SeverelyUnderserved,
    #[serde(rename = "Underserved")]
    Underserved,
    #[serde(rename = "Adequate Coverage")]
    AdequateCoverage,
}

#[derive(Debug, Clone, Copy)]
pub struct CoverageInput {
    pub branch_count: usize,
    pub transactions_per_branch: Option<f64>,
}

fn has_no_branches(i: &CoverageInput) -> bool {
    i.branch_count == 0
}

fn over_100k_per_branch(i: &CoverageInput) -> bool {
    matches!(i.transactions_per_branch, Some(v) if v > 100_000.0)
}

fn over_50k_per_branch(i: &CoverageInput) -> bool {
    matches!(i.transactions_per_branch, Some(v) if v > 50_000.0)
}

const COVERAGE_RULES: &[Rule<CoverageInput, CoverageStatus>] = &[
    Rule { label: CoverageStatus::NoCoverage, applies: has_no_branches },
    Rule { label: CoverageStatus::SeverelyUnderserved, applies: over_100k_per_branch },
    Rule { label: CoverageStatus::Underserved, applies: over_50k_per_branch },
];

pub const COVERAGE_LADDER: Ladder<CoverageInput, CoverageStatus> =
    Ladder::new(COVERAGE_RULES, CoverageStatus::AdequateCoverage);

impl CoverageStatus {
    pub fn classify(input: CoverageInput) -> Self {
        COVERAGE_LADDER.classify(&input)
    }

    /// 1 is the most severe.
    pub fn rank(self) -> u8 {
        match self {
            CoverageStatus::NoCoverage => 1,
            CoverageStatus::SeverelyUnderserved => 2,
            CoverageStatus::Underserved => 3,
            CoverageStatus::AdequateCoverage => 4,
        }
    }

    pub fn needs_attention(self) -> bool {
        !matches!(self, CoverageStatus::AdequateCoverage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageStatus::NoCoverage => "No Coverage",
            CoverageStatus::SeverelyUnderserved => "Severely Underserved",
            CoverageStatus::Underserved => "Underserved",
            CoverageStatus::AdequateCoverage => "Adequate Coverage",
        }
    }
}

// ---------------------------------------------------------------------------
// Capacity status
// ---------------------------------------------------------------------------

/// Branch utilisation tier from transactions per staff member.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapacityStatus {
    Overloaded,
    #[serde(rename = "High Utilization")]
    HighUtilization,
    Normal,
    Underutilized,
}

fn over_800(tps: &f64) -> bool {
    *tps > 800.0
}

fn over_600(tps: &f64) -> bool {
    *tps > 600.0
}

fn over_400(tps: &f64) -> bool {
    *tps > 400.0
}

const CAPACITY_RULES: &[Rule<f64, CapacityStatus>] = &[
    Rule { label: CapacityStatus::Overloaded, applies: over_800 },
    Rule { label: CapacityStatus::HighUtilization, applies: over_600 },
    Rule { label: CapacityStatus::Normal, applies: over_400 },
];

pub const CAPACITY_LADDER: Ladder<f64, CapacityStatus> =
    Ladder::new(CAPACITY_RULES, CapacityStatus::Underutilized);

impl CapacityStatus {
    pub fn classify(transactions_per_staff: f64) -> Self {
        CAPACITY_LADDER.classify(&transactions_per_staff)
    }

    /// 4 is the heaviest load.
    pub fn severity(self) -> u8 {
        match self {
            CapacityStatus::Overloaded => 4,
            CapacityStatus::HighUtilization => 3,
            CapacityStatus::Normal => 2,
            CapacityStatus::Underutilized => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CapacityStatus::Overloaded => "Overloaded",
            CapacityStatus::HighUtilization => "High Utilization",
            CapacityStatus::Normal => "Normal",
            CapacityStatus::Underutilized => "Underutilized",
        }
    }
}

// ---------------------------------------------------------------------------
// Expansion priority
// ---------------------------------------------------------------------------

/// Recommendation for opening new branches in a region.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpansionPriority {
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "Low Priority")]
    Low,
}

#[derive(Debug, Clone, Copy)]
pub struct ExpansionInput {
    pub demand_score: f64,
    pub branch_count: usize,
}

fn strong_demand_few_branches(i: &ExpansionInput) -> bool {
    i.demand_score > 3.0 && i.branch_count < 3
}

fn moderate_demand_some_branches(i: &ExpansionInput) -> bool {
    i.demand_score > 2.0 && i.branch_count < 5
}

const EXPANSION_RULES: &[Rule<ExpansionInput, ExpansionPriority>] = &[
    Rule { label: ExpansionPriority::High, applies: strong_demand_few_branches },
    Rule { label: ExpansionPriority::Medium, applies: moderate_demand_some_branches },
];

pub const EXPANSION_LADDER: Ladder<ExpansionInput, ExpansionPriority> =
    Ladder::new(EXPANSION_RULES, ExpansionPriority::Low);

impl ExpansionPriority {
    pub fn classify(input: ExpansionInput) -> Self {
        EXPANSION_LADDER.classify(&input)
    }

    pub fn from_demand_score(demand_score: f64) -> Self {
        RECOMMENDATION_LADDER.classify(&demand_score)
    }

    pub fn is_target(self) -> bool {
        !matches!(self, ExpansionPriority::Low)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExpansionPriority::High => "High Priority",
            ExpansionPriority::Medium => "Medium Priority",
            ExpansionPriority::Low => "Low Priority",
        }
    }
}

// Recommendation priority looks at demand score alone.
fn score_over_2_5(score: &f64) -> bool {
    *score > 2.5
}

fn score_over_2(score: &f64) -> bool {
    *score > 2.0
}

const RECOMMENDATION_RULES: &[Rule<f64, ExpansionPriority>] = &[
    Rule { label: ExpansionPriority::High, applies: score_over_2_5 },
    Rule { label: ExpansionPriority::Medium, applies: score_over_2 },
];

pub const RECOMMENDATION_LADDER: Ladder<f64, ExpansionPriority> =
    Ladder::new(RECOMMENDATION_RULES, ExpansionPriority::Low);

// ---------------------------------------------------------------------------
// Supply balance
// ---------------------------------------------------------------------------

/// Regional demand against the capacity of the branches assigned to the region.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SupplyBalance {
    #[serde(rename = "No Coverage")]
    NoCoverage,
    Underserved,
    Oversupplied,
    Balanced,
}

#[derive(Debug, Clone, Copy)]
pub struct SupplyInput {
    pub branch_count: usize,
    /// Demand divided by branch capacity; `None` when capacity is zero.
    pub demand_to_capacity: Option<f64>,
}

fn supply_without_branches(i: &SupplyInput) -> bool {
    i.branch_count == 0
}

// Branches with no capacity at all cannot cover any demand.
fn demand_over_double(i: &SupplyInput) -> bool {
    i.demand_to_capacity.map_or(true, |ratio| ratio > 2.0)
}

fn demand_under_half(i: &SupplyInput) -> bool {
    i.demand_to_capacity.is_some_and(|ratio| ratio < 0.5)
}

const SUPPLY_RULES: &[Rule<SupplyInput, SupplyBalance>] = &[
    Rule { label: SupplyBalance::NoCoverage, applies: supply_without_branches },
    Rule { label: SupplyBalance::Underserved, applies: demand_over_double },
    Rule { label: SupplyBalance::Oversupplied, applies: demand_under_half },
];

pub const SUPPLY_LADDER: Ladder<SupplyInput, SupplyBalance> = Ladder::new(SUPPLY_RULES, SupplyBalance::Balanced);

impl SupplyBalance {
    pub fn classify(input: SupplyInput) -> Self {
        SUPPLY_LADDER.classify(&input)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupplyBalance::NoCoverage => "No Coverage",
            SupplyBalance::Underserved => "Underserved",
            SupplyBalance::Oversupplied => "Oversupplied",
            SupplyBalance::Balanced => "Balanced",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        })*
    };
}

display_as_str!(CoverageStatus, CapacityStatus, ExpansionPriority, SupplyBalance);

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(branch_count: usize, per_branch: Option<f64>) -> CoverageStatus {
        CoverageStatus::classify(CoverageInput {
            branch_count,
            transactions_per_branch: per_branch,
        })
    }

    #[test]
    fn test_zero_branches_is_no_coverage_regardless_of_demand() {
        assert_eq!(coverage(0, None), CoverageStatus::NoCoverage);
        // Even a stray ratio cannot outrank the zero-branch rule.
        assert_eq!(coverage(0, Some(999_999.0)), CoverageStatus::NoCoverage);
    }

    #[test]
    fn test_coverage_boundaries_are_strict() {
        assert_eq!(coverage(1, Some(100_001.0)), CoverageStatus::SeverelyUnderserved);
        assert_eq!(coverage(1, Some(100_000.0)), CoverageStatus::Underserved);
        assert_eq!(coverage(1, Some(50_000.0)), CoverageStatus::AdequateCoverage);
        assert_eq!(coverage(4, Some(12.0)), CoverageStatus::AdequateCoverage);
    }

    #[test]
    fn test_capacity_ladder() {
        assert_eq!(CapacityStatus::classify(801.0), CapacityStatus::Overloaded);
        assert_eq!(CapacityStatus::classify(800.0), CapacityStatus::HighUtilization);
        assert_eq!(CapacityStatus::classify(600.0), CapacityStatus::Normal);
        assert_eq!(CapacityStatus::classify(400.0), CapacityStatus::Underutilized);
        assert_eq!(CapacityStatus::classify(0.0), CapacityStatus::Underutilized);
    }

    #[test]
    fn test_expansion_first_match_wins() {
        let high = ExpansionPriority::classify(ExpansionInput { demand_score: 4.0, branch_count: 2 });
        let medium = ExpansionPriority::classify(ExpansionInput { demand_score: 4.0, branch_count: 3 });
        let low = ExpansionPriority::classify(ExpansionInput { demand_score: 4.0, branch_count: 5 });
        assert_eq!(high, ExpansionPriority::High);
        assert_eq!(medium, ExpansionPriority::Medium);
        assert_eq!(low, ExpansionPriority::Low);
        assert_eq!(
            ExpansionPriority::classify(ExpansionInput { demand_score: 2.0, branch_count: 0 }),
            ExpansionPriority::Low
        );
    }

    #[test]
    fn test_recommendation_priority_from_score() {
        assert_eq!(ExpansionPriority::from_demand_score(2.51), ExpansionPriority::High);
        assert_eq!(ExpansionPriority::from_demand_score(2.5), ExpansionPriority::Medium);
        assert_eq!(ExpansionPriority::from_demand_score(2.0), ExpansionPriority::Low);
    }

    fn supply(branch_count: usize, ratio: Option<f64>) -> SupplyBalance {
        SupplyBalance::classify(SupplyInput {
            branch_count,
            demand_to_capacity: ratio,
        })
    }

    #[test]
    fn test_supply_balance_ladder() {
        assert_eq!(supply(0, None), SupplyBalance::NoCoverage);
        assert_eq!(supply(0, Some(0.1)), SupplyBalance::NoCoverage);
        assert_eq!(supply(2, None), SupplyBalance::Underserved);
        assert_eq!(supply(2, Some(2.01)), SupplyBalance::Underserved);
        assert_eq!(supply(2, Some(2.0)), SupplyBalance::Balanced);
        assert_eq!(supply(2, Some(0.5)), SupplyBalance::Balanced);
        assert_eq!(supply(2, Some(0.49)), SupplyBalance::Oversupplied);
    }

    #[test]
    fn test_labels_serialize_as_report_text() {
        assert_eq!(
            serde_json::to_string(&CoverageStatus::SeverelyUnderserved).unwrap(),
            "\"Severely Underserved\""
        );
        assert_eq!(CapacityStatus::HighUtilization.to_string(), "High Utilization");
        assert_eq!(ExpansionPriority::Medium.to_string(), "Medium Priority");
        assert_eq!(serde_json::to_string(&SupplyBalance::NoCoverage).unwrap(), "\"No Coverage\"");
    }
}
