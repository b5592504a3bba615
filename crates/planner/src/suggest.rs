use budgetlens_core::{Expense, Money};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::aggregate::{monthly_totals, MonthlyTotal};
use crate::config::{ConfigError, PlannerConfig, VarianceThresholds};
use crate::stats::{coefficient_of_variation, detect_overspending, mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsistencyLevel {
    Stable,
    LowVariance,
    ModerateVariance,
    HighVariance,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyLevel::Stable => write!(f, "stable"),
            ConsistencyLevel::LowVariance => write!(f, "low-variance"),
            ConsistencyLevel::ModerateVariance => write!(f, "moderate-variance"),
            ConsistencyLevel::HighVariance => write!(f, "high-variance"),
        }
    }
}

impl ConsistencyLevel {
    pub fn from_cv(cv: f64, thresholds: &VarianceThresholds) -> Self {
        if cv > thresholds.high {
            ConsistencyLevel::HighVariance
        } else if cv > thresholds.moderate {
            ConsistencyLevel::ModerateVariance
        } else if cv > thresholds.low {
            ConsistencyLevel::LowVariance
        } else {
            ConsistencyLevel::Stable
        }
    }
}

/// Which rule picked the buffer. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferRule {
    Overspending,
    HighVariance,
    ModerateVariance,
    Stable,
}

impl BufferRule {
    pub fn feedback(self) -> &'static str {
        match self {
            BufferRule::Overspending => {
                "Detected increasing spending trend. Consider reducing expenses in this category."
            }
            BufferRule::HighVariance => {
                "Spending is inconsistent. Added higher buffer for flexibility."
            }
            BufferRule::ModerateVariance => {
                "Moderate spending variation. Added buffer for monthly fluctuations."
            }
            BufferRule::Stable => "Spending is consistent. Minimal buffer added.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSuggestion {
    pub category: String,
    /// Mean monthly spend, rounded to whole units.
    pub average: Money,
    /// Recommended limit: the mean plus the buffer, rounded to whole units.
    pub buffered_suggestion: Money,
    pub buffer: Decimal,
    pub rule: BufferRule,
    pub feedback: String,
    pub consistency_level: ConsistencyLevel,
    pub coefficient_of_variation: f64,
    pub has_overspending: bool,
    pub monthly_data: Vec<MonthlyTotal>,
    pub months_analyzed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_categories: usize,
    pub stable_categories: usize,
    pub variable_categories: usize,
    pub overspending_categories: usize,
    pub total_suggested_budget: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub suggestions: BTreeMap<String, BudgetSuggestion>,
    pub summary: AnalysisSummary,
}

/// Derives monthly limits from spending history. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct SuggestionEngine {
    config: PlannerConfig,
}

impl SuggestionEngine {
    /// Fails when the configuration does not pass [`PlannerConfig::validate`].
    pub fn new(config: PlannerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn compute(
        &self,
        expenses: &[Expense],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, BudgetSuggestion> {
        monthly_totals(expenses, now, self.config.window_months)
            .into_iter()
            .filter_map(|(category, monthly)| {
                self.suggest(&category, monthly)
                    .map(|suggestion| (category, suggestion))
            })
            .collect()
    }

    /// Builds the suggestion for one category's chronological monthly totals.
    pub fn suggest(&self, category: &str, monthly: Vec<MonthlyTotal>) -> Option<BudgetSuggestion> {
        if monthly.is_empty() {
            return None;
        }

        let totals: Vec<Money> = monthly.iter().map(|m| m.total).collect();
        let average = mean(&totals);
        let cv = coefficient_of_variation(&totals);
        let has_overspending =
            detect_overspending(&totals, self.config.trend_months, self.config.spike_factor);

        let thresholds = &self.config.variance;
        let rule = if has_overspending {
            BufferRule::Overspending
        } else if cv > thresholds.high {
            BufferRule::HighVariance
        } else if cv > thresholds.moderate {
            BufferRule::ModerateVariance
        } else {
            BufferRule::Stable
        };

        let buffers = &self.config.buffers;
        let buffer = match rule {
            BufferRule::Overspending => buffers.overspending,
            BufferRule::HighVariance => buffers.high_variance,
            BufferRule::ModerateVariance => buffers.moderate_variance,
            BufferRule::Stable => buffers.stable,
        };

        let buffered = Money::from_decimal_units(average * (Decimal::ONE + buffer));
        let consistency_level = ConsistencyLevel::from_cv(cv, thresholds);

        tracing::debug!(
            category,
            %consistency_level,
            cv,
            has_overspending,
            suggestion = %buffered,
            "computed budget suggestion"
        );

        Some(BudgetSuggestion {
            category: category.to_string(),
            average: Money::from_decimal_units(average),
            buffered_suggestion: buffered,
            buffer,
            rule,
            feedback: rule.feedback().to_string(),
            consistency_level,
            coefficient_of_variation: cv,
            has_overspending,
            months_analyzed: monthly.len(),
            monthly_data: monthly,
        })
    }

    /// Suggestions plus how many categories are stable, variable or trending up.
    pub fn analyze(&self, expenses: &[Expense], now: DateTime<Utc>) -> DetailedAnalysis {
        let suggestions = self.compute(expenses, now);
        let mut summary = AnalysisSummary {
            total_categories: suggestions.len(),
            ..Default::default()
        };

        for suggestion in suggestions.values() {
            summary.total_suggested_budget += suggestion.buffered_suggestion;
            if suggestion.has_overspending {
                summary.overspending_categories += 1;
            } else if matches!(
                suggestion.consistency_level,
                ConsistencyLevel::Stable | ConsistencyLevel::LowVariance
            ) {
                summary.stable_categories += 1;
            } else {
                summary.variable_categories += 1;
            }
        }

        DetailedAnalysis {
            suggestions,
            summary,
        }
    }

    /// Category → recommended limit, ready for `BudgetBook::set_suggestions`.
    pub fn simple_suggestions(
        &self,
        expenses: &[Expense],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, Money> {
        self.compute(expenses, now)
            .into_iter()
            .map(|(category, s)| (category, s.buffered_suggestion))
            .collect()
    }
}

/// [`SuggestionEngine::compute`] with the default configuration.
pub fn compute(expenses: &[Expense], now: DateTime<Utc>) -> BTreeMap<String, BudgetSuggestion> {
    SuggestionEngine::default().compute(expenses, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetlens_core::MonthKey;
    use chrono::{Datelike, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
    }

    /// One expense per listed month total, oldest first, ending in the current month.
    fn history(category: &str, totals: &[i64]) -> Vec<Expense> {
        let current = MonthKey::of(&now());
        totals
            .iter()
            .enumerate()
            .map(|(i, &units)| {
                let month = current.shift(i as i32 - (totals.len() as i32 - 1));
                Expense {
                    id: Uuid::new_v4(),
                    amount: Money::from_major(units),
                    category: category.to_string(),
                    date: Utc
                        .with_ymd_and_hms(month.year, month.month, 5, 10, 0, 0)
                        .unwrap(),
                    note: String::new(),
                    description: String::new(),
                }
            })
            .collect()
    }

    #[test]
    fn flat_spending_is_stable_yet_overspending() {
        let suggestions = compute(&history("Bills & Utilities", &[1000; 6]), now());
        let s = &suggestions["Bills & Utilities"];
        assert_eq!(s.average, Money::from_major(1000));
        assert_eq!(s.coefficient_of_variation, 0.0);
        assert_eq!(s.consistency_level, ConsistencyLevel::Stable);
        assert!(s.has_overspending);
        assert_eq!(s.rule, BufferRule::Overspending);
        assert_eq!(s.buffered_suggestion, Money::from_major(1200));
        assert_eq!(s.months_analyzed, 6);
    }

    #[test]
    fn stable_declining_spend_gets_minimal_buffer() {
        let s = &compute(&history("Food", &[1000, 1040, 1020, 1010, 990, 980]), now())["Food"];
        assert!(!s.has_overspending);
        assert_eq!(s.consistency_level, ConsistencyLevel::Stable);
        assert_eq!(s.rule, BufferRule::Stable);
        // mean 1006.67 * 1.05 = 1057
        assert_eq!(s.average, Money::from_major(1007));
        assert_eq!(s.buffered_suggestion, Money::from_major(1057));
        assert_eq!(s.feedback, "Spending is consistent. Minimal buffer added.");
    }

    #[test]
    fn moderate_variance_gets_ten_percent() {
        // mean 1000, cv ~ 0.33; tail falls, no month above 1500
        let s = &compute(&history("Shopping", &[1400, 600, 1400, 1000, 1000, 600]), now())["Shopping"];
        assert!(!s.has_overspending);
        assert_eq!(s.consistency_level, ConsistencyLevel::ModerateVariance);
        assert_eq!(s.rule, BufferRule::ModerateVariance);
        assert_eq!(s.buffered_suggestion, Money::from_major(1100));
    }

    #[test]
    fn high_variance_gets_fifteen_percent() {
        // mean 1000, cv ~ 0.56, max 1450 stays under the 1500 spike line
        let s = &compute(&history("Travel", &[1450, 200, 1450, 1450, 1250, 200]), now())["Travel"];
        assert!(!s.has_overspending);
        assert_eq!(s.consistency_level, ConsistencyLevel::HighVariance);
        assert_eq!(s.buffered_suggestion, Money::from_major(1150));
    }

    #[test]
    fn buffered_suggestion_never_below_average() {
        let mut expenses = history("A", &[10, 900, 35, 410]);
        expenses.extend(history("B", &[1, 1]));
        expenses.extend(history("C", &[0, 0, 0]));
        for s in compute(&expenses, now()).values() {
            assert!(s.buffered_suggestion >= s.average, "{}", s.category);
        }
    }

    #[test]
    fn monthly_data_conserves_window_total() {
        let mut expenses = history("Food", &[100, 200, 300, 400, 500, 600, 700]);
        expenses.extend(history("Food", &[5, 5]));
        let s = &compute(&expenses, now())["Food"];
        let summed: Money = s.monthly_data.iter().map(|m| m.total).sum();
        let expected: Money = expenses
            .iter()
            .filter(|e| e.date.year() == 2024)
            .map(|e| e.amount)
            .sum();
        assert_eq!(summed, expected);
        assert_eq!(s.months_analyzed, 6);
    }

    #[test]
    fn compute_is_idempotent() {
        let expenses = history("Food", &[120, 80, 300]);
        assert_eq!(compute(&expenses, now()), compute(&expenses, now()));
    }

    #[test]
    fn categories_outside_window_are_omitted() {
        let mut expenses = history("Food", &[100]);
        let old = Expense {
            category: "Old".to_string(),
            date: Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            ..expenses[0].clone()
        };
        expenses.push(old);
        let suggestions = compute(&expenses, now());
        assert!(suggestions.contains_key("Food"));
        assert!(!suggestions.contains_key("Old"));
    }

    #[test]
    fn analyze_summarises_categories() {
        let mut expenses = history("Bills", &[1000; 6]);
        expenses.extend(history("Food", &[1000, 1040, 1020, 1010, 990, 980]));
        expenses.extend(history("Travel", &[1450, 200, 1450, 1450, 1250, 200]));
        let analysis = SuggestionEngine::default().analyze(&expenses, now());
        let summary = &analysis.summary;
        assert_eq!(summary.total_categories, 3);
        assert_eq!(summary.overspending_categories, 1);
        assert_eq!(summary.stable_categories, 1);
        assert_eq!(summary.variable_categories, 1);
        assert_eq!(summary.total_suggested_budget, Money::from_major(1200 + 1057 + 1150));
    }

    fn month_totals(cents: &[i64]) -> Vec<MonthlyTotal> {
        let last = MonthKey::of(&now());
        cents
            .iter()
            .enumerate()
            .map(|(i, &c)| MonthlyTotal {
                month: last.shift(i as i32 - (cents.len() as i32 - 1)),
                total: Money::from_cents(c),
            })
            .collect()
    }

    #[test]
    fn buffered_suggestion_rounds_exact_value_once() {
        // 1191.90 * 1.05 = 1251.495
        let s = SuggestionEngine::default()
            .suggest("Food", month_totals(&[119_190]))
            .unwrap();
        assert_eq!(s.rule, BufferRule::Stable);
        assert_eq!(s.buffered_suggestion, Money::from_major(1251));
    }

    #[test]
    fn average_rounds_exact_mean_once() {
        // mean 1000.495
        let s = SuggestionEngine::default()
            .suggest("Food", month_totals(&[100_000, 100_099]))
            .unwrap();
        assert_eq!(s.average, Money::from_major(1000));
    }

    #[test]
    fn new_rejects_zero_trend_months() {
        let config = PlannerConfig {
            trend_months: 0,
            ..Default::default()
        };
        assert!(matches!(SuggestionEngine::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn simple_suggestions_map_limits() {
        let limits = SuggestionEngine::default().simple_suggestions(&history("Bills", &[1000; 3]), now());
        assert_eq!(limits["Bills"], Money::from_major(1200));
    }

    #[test]
    fn custom_window_limits_history() {
        let config = PlannerConfig {
            window_months: 2,
            ..Default::default()
        };
        let engine = SuggestionEngine::new(config).unwrap();
        let s = &engine.compute(&history("Food", &[900, 100, 100]), now())["Food"];
        assert_eq!(s.months_analyzed, 2);
        assert_eq!(s.average, Money::from_major(100));
    }

    #[test]
    fn serializes_consistency_level_kebab_case() {
        let s = &compute(&history("Food", &[1000, 1040, 1020, 1010, 990, 980]), now())["Food"];
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["consistencyLevel"], "stable");
        assert_eq!(
            serde_json::to_value(ConsistencyLevel::ModerateVariance).unwrap(),
            "moderate-variance"
        );
    }
}
