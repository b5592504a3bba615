pub mod budget;
pub mod error;
pub mod expense;
pub mod goal;
pub mod money;
pub mod period;

pub use budget::{budget_status, Budget, BudgetBook, BudgetHealth, BudgetStatus};
pub use error::LedgerError;
pub use expense::{Expense, ExpenseBook, ExpenseUpdate, NewExpense};
pub use goal::{Goal, GoalBook, GoalStatus, GoalUpdate, NewGoal};
pub use money::Money;
pub use period::{MonthKey, MonthWindow};
