pub mod aggregate;
pub mod config;
pub mod reverse;
pub mod stats;
pub mod suggest;

pub use aggregate::{monthly_totals, CategoryMonthlyAggregate, MonthlyTotal};
pub use config::{BufferTiers, ConfigError, PlannerConfig, VarianceThresholds};
pub use reverse::{months_remaining, reverse_budget, CategoryCeiling, GoalPlanner, ReverseBudgetPlan};
pub use suggest::{
    compute, AnalysisSummary, BudgetSuggestion, BufferRule, ConsistencyLevel, DetailedAnalysis,
    SuggestionEngine,
};
