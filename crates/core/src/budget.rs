use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::error::LedgerError;
use super::expense::Expense;
use super::money::Money;

/// A monthly limit for one category and what has been spent against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub limit: Money,
    pub spent: Money,
    pub last_updated: DateTime<Utc>,
}

/// The `budgets` collection: limits keyed by category plus the last accepted suggestions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetBook {
    pub budgets: BTreeMap<String, Budget>,
    #[serde(default)]
    pub suggestions: BTreeMap<String, Money>,
}

impl BudgetBook {
    pub fn get(&self, category: &str) -> Option<&Budget> {
        self.budgets.get(category)
    }

    /// Sets or replaces the limit, keeping whatever was already spent.
    pub fn set_budget(&mut self, category: &str, limit: Money, now: DateTime<Utc>) -> &Budget {
        let spent = self.budgets.get(category).map(|b| b.spent).unwrap_or_default();
        self.budgets.insert(
            category.to_string(),
            Budget {
                limit,
                spent,
                last_updated: now,
            },
        );
        &self.budgets[category]
    }

    pub fn update_spent(&mut self, category: &str, amount: Money) -> Result<&Budget, LedgerError> {
        let budget = self
            .budgets
            .get_mut(category)
            .ok_or_else(|| LedgerError::BudgetNotFound(category.to_string()))?;
        budget.spent += amount;
        Ok(&*budget)
    }

    /// Counts an expense against its category. Categories without a budget are ignored.
    pub fn track_expense(&mut self, expense: &Expense) -> bool {
        self.update_spent(&expense.category, expense.amount).is_ok()
    }

    /// Returns how many of the expenses landed on a budgeted category.
    pub fn track_expenses(&mut self, expenses: &[Expense]) -> usize {
        expenses.iter().filter(|e| self.track_expense(e)).count()
    }

    pub fn delete_budget(&mut self, category: &str) -> Option<Budget> {
        self.budgets.remove(category)
    }

    pub fn set_suggestions(&mut self, suggestions: BTreeMap<String, Money>) {
        self.suggestions = suggestions;
    }

    pub fn apply_all_suggestions(&mut self, now: DateTime<Utc>) {
        let suggestions = std::mem::take(&mut self.suggestions);
        for (category, limit) in &suggestions {
            self.set_budget(category, *limit, now);
        }
        tracing::info!(count = suggestions.len(), "applied budget suggestions");
        self.suggestions = suggestions;
    }

    /// Zeroes every category's spent amount at the start of a new month.
    pub fn reset_monthly_spending(&mut self, now: DateTime<Utc>) {
        for budget in self.budgets.values_mut() {
            budget.spent = Money::zero();
            budget.last_updated = now;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Good,
    Caution,
    Warning,
    Exceeded,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::Good => write!(f, "good"),
            BudgetStatus::Caution => write!(f, "caution"),
            BudgetStatus::Warning => write!(f, "warning"),
            BudgetStatus::Exceeded => write!(f, "exceeded"),
        }
    }
}

impl BudgetStatus {
    pub fn message(self) -> &'static str {
        match self {
            BudgetStatus::Good => "Within budget",
            BudgetStatus::Caution => "Moderate spending",
            BudgetStatus::Warning => "Close to budget limit",
            BudgetStatus::Exceeded => "Budget exceeded!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetHealth {
    pub status: BudgetStatus,
    pub message: String,
    pub percentage: f64,
}

/// Classifies spend against a limit: 100% exceeded, 80% warning, 60% caution.
///
/// A non-positive limit is treated as fully used as soon as anything is spent.
pub fn budget_status(spent: Money, limit: Money) -> BudgetHealth {
    let percentage = if limit.is_positive() {
        spent.to_f64() / limit.to_f64() * 100.0
    } else if spent.is_positive() {
        100.0
    } else {
        0.0
    };

    let status = if percentage >= 100.0 {
        BudgetStatus::Exceeded
    } else if percentage >= 80.0 {
        BudgetStatus::Warning
    } else if percentage >= 60.0 {
        BudgetStatus::Caution
    } else {
        BudgetStatus::Good
    };

    BudgetHealth {
        status,
        message: status.message().to_string(),
        percentage,
    }
}
