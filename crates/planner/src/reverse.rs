use budgetlens_core::{Expense, Goal, Money, MonthKey};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::monthly_totals;
use crate::config::{ConfigError, PlannerConfig};
use crate::stats::mean;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCeiling {
    pub category: String,
    pub current_average: Money,
    /// Most that can be spent per month in this category while saving on schedule.
    pub max_spend: Money,
    pub cut: Money,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseBudgetPlan {
    pub goal_id: Uuid,
    pub months_remaining: u32,
    pub required_monthly_savings: Money,
    pub total_current_spend: Money,
    pub total_cut: Money,
    /// Part of the monthly savings that cutting every category to zero still misses.
    pub shortfall: Money,
    /// Largest current spend first.
    pub items: Vec<CategoryCeiling>,
}

impl ReverseBudgetPlan {
    pub fn is_feasible(&self) -> bool {
        self.shortfall.is_zero()
    }

    pub fn ceiling(&self, category: &str) -> Option<&CategoryCeiling> {
        self.items.iter().find(|item| item.category == category)
    }
}

/// Whole calendar months from `now`'s month to the deadline's month, at least 1.
pub fn months_remaining(now: DateTime<Utc>, deadline: NaiveDate) -> u32 {
    let months = MonthKey::of(&now).months_until(MonthKey::of(&deadline));
    months.clamp(1, i64::from(u32::MAX)) as u32
}

/// Turns a savings goal into per-category spending ceilings.
#[derive(Debug, Clone, Default)]
pub struct GoalPlanner {
    config: PlannerConfig,
}

impl GoalPlanner {
    /// Fails when the configuration does not pass [`PlannerConfig::validate`].
    pub fn new(config: PlannerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn reverse_budget(
        &self,
        goal: &Goal,
        expenses: &[Expense],
        now: DateTime<Utc>,
    ) -> ReverseBudgetPlan {
        let months = months_remaining(now, goal.deadline);
        let required = Money::from_decimal(goal.remaining().to_decimal() / Decimal::from(months));

        let mut averages: Vec<(String, Money)> =
            monthly_totals(expenses, now, self.config.window_months)
                .into_iter()
                .map(|(category, monthly)| {
                    let totals: Vec<Money> = monthly.iter().map(|m| m.total).collect();
                    (category, Money::from_decimal(mean(&totals)))
                })
                .collect();
        averages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total_spend: Money = averages.iter().map(|(_, avg)| *avg).sum();
        let cuts = allocate_cuts(&averages, required, total_spend);

        let items: Vec<CategoryCeiling> = averages
            .into_iter()
            .zip(cuts)
            .map(|((category, average), cut)| CategoryCeiling {
                reason: reason_for(cut, average),
                max_spend: average - cut,
                category,
                current_average: average,
                cut,
            })
            .collect();

        let total_cut: Money = items.iter().map(|item| item.cut).sum();
        let shortfall = (required - total_cut).max(Money::zero());

        if shortfall.is_positive() {
            tracing::warn!(
                goal = %goal.id,
                %required,
                %total_spend,
                %shortfall,
                "current spending cannot cover the monthly savings target"
            );
        } else {
            tracing::debug!(goal = %goal.id, months, %required, "built reverse budget");
        }

        ReverseBudgetPlan {
            goal_id: goal.id,
            months_remaining: months,
            required_monthly_savings: required,
            total_current_spend: total_spend,
            total_cut,
            shortfall,
            items,
        }
    }
}

/// [`GoalPlanner::reverse_budget`] with the default configuration.
pub fn reverse_budget(goal: &Goal, expenses: &[Expense], now: DateTime<Utc>) -> ReverseBudgetPlan {
    GoalPlanner::default().reverse_budget(goal, expenses, now)
}

// `averages` is sorted largest first; the head absorbs the rounding remainder.
fn allocate_cuts(averages: &[(String, Money)], required: Money, total: Money) -> Vec<Money> {
    if !required.is_positive() || !total.is_positive() {
        return vec![Money::zero(); averages.len()];
    }
    if total <= required {
        return averages.iter().map(|(_, avg)| *avg).collect();
    }

    let mut cuts: Vec<Money> = averages
        .iter()
        .map(|(_, avg)| {
            let share = required.to_decimal() * avg.to_decimal() / total.to_decimal();
            Money::from_decimal(share).min(*avg)
        })
        .collect();

    if let Some((_, largest)) = averages.first() {
        let others: Money = cuts[1..].iter().sum();
        cuts[0] = (required - others).max(Money::zero()).min(*largest);
    }
    cuts
}

fn reason_for(cut: Money, average: Money) -> String {
    if cut.is_zero() {
        return "No cut needed".to_string();
    }
    if cut >= average {
        return "Pause all spending in this category until the goal is reached".to_string();
    }
    let percent = (cut.to_decimal() / average.to_decimal() * Decimal::ONE_HUNDRED).round();
    format!("Cut {cut} per month ({percent}% of current spend)")
}
