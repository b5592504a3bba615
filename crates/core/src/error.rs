use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),
    #[error("Goal not found: {0}")]
    GoalNotFound(Uuid),
    #[error("No budget set for category: {0}")]
    BudgetNotFound(String),
}
