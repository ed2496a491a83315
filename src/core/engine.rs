use super::types::{CoinData, Milestone, TrajectoryRow, TrajectorySummary};

/// Derives one milestone from its predecessor.
///
/// A predecessor market cap of zero (or below) gives a multiplier of `0`
/// instead of `NaN`/`inf`, so a degenerate base never poisons the rest of the
/// trajectory. `holdings` is the pre-sale position at this milestone.
pub fn project_milestone(previous: &Milestone, market_cap: f64, profit_percent: f64) -> Milestone {
    let multiplier = if previous.market_cap > 0.0 {
        market_cap / previous.market_cap
    } else {
        0.0
    };
    let holdings = previous.holdings * multiplier;
    let profit = holdings * (profit_percent / 100.0);

    Milestone {
        market_cap,
        multiplier,
        holdings,
        profit_percent,
        profit,
    }
}

/// The "Hold" milestone anchoring a trajectory.
pub fn base_milestone(base: CoinData) -> Milestone {
    Milestone {
        market_cap: base.market_cap,
        multiplier: 1.0,
        holdings: base.holdings,
        profit_percent: 0.0,
        profit: 0.0,
    }
}

/// Rebuilds a full trajectory from the base position and a raw milestone list.
///
/// Element 0 of `milestones` is the base slot and is replaced by `base`; the
/// remaining elements may arrive in any order with stale derived fields. They
/// are sorted ascending by market cap (stable, so equal caps keep their input
/// order) and every derived field is overwritten in one left-to-right pass.
/// Targets below the base market cap are dropped, so the result is always
/// ascending from the base.
pub fn build_trajectory(base: CoinData, milestones: &[Milestone]) -> Vec<Milestone> {
    let mut targets: Vec<Milestone> = milestones
        .iter()
        .skip(1)
        .filter(|m| m.market_cap >= base.market_cap)
        .copied()
        .collect();
    targets.sort_by(|a, b| a.market_cap.total_cmp(&b.market_cap));

    let mut trajectory = Vec::with_capacity(targets.len() + 1);
    let mut previous = base_milestone(base);
    trajectory.push(previous);

    for target in targets {
        let built = project_milestone(&previous, target.market_cap, target.profit_percent);
        trajectory.push(built);
        previous = built;
    }

    trajectory
}

pub fn trajectory_rows(trajectory: &[Milestone]) -> Vec<TrajectoryRow> {
    let mut cumulative_profit = 0.0;
    trajectory
        .iter()
        .enumerate()
        .map(|(index, milestone)| {
            cumulative_profit += milestone.profit;
            TrajectoryRow {
                index,
                market_cap: milestone.market_cap,
                multiplier: milestone.multiplier,
                holdings: milestone.holdings,
                profit_percent: milestone.profit_percent,
                profit: milestone.profit,
                new_holdings: milestone.holdings_after_sale(),
                cumulative_profit,
            }
        })
        .collect()
}

pub fn summarize(trajectory: &[Milestone]) -> TrajectorySummary {
    TrajectorySummary {
        total_profit: trajectory.iter().map(|m| m.profit).sum(),
        final_holdings: trajectory
            .last()
            .map(Milestone::holdings_after_sale)
            .unwrap_or(0.0),
        milestone_count: trajectory.len(),
    }
}

/// Computes the milestone that inserting `(market_cap, profit_percent)` would
/// produce, without touching the trajectory. Its predecessor is the last
/// milestone with a market cap at or below the target, matching where the
/// stable sort would place it.
pub fn preview_against(
    trajectory: &[Milestone],
    market_cap: f64,
    profit_percent: f64,
) -> Option<Milestone> {
    let previous = trajectory
        .iter()
        .rev()
        .find(|m| m.market_cap <= market_cap)
        .or_else(|| trajectory.first())?;
    Some(project_milestone(previous, market_cap, profit_percent))
}
