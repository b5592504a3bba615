use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use super::money::Money;

/// A categorized spending entry in the durable ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub amount: Money,
    pub category: String,
    #[serde(with = "iso_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub description: String,
}

/// An expense that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub amount: Money,
    pub category: String,
    #[serde(with = "iso_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub description: String,
}

impl NewExpense {
    pub fn into_expense(self) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: self.amount,
            category: self.category,
            date: self.date,
            note: self.note,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseUpdate {
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub description: Option<String>,
}

/// The `expenses` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseBook {
    pub expenses: Vec<Expense>,
}

impl ExpenseBook {
    pub fn new(expenses: Vec<Expense>) -> Self {
        Self { expenses }
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn add_expense(&mut self, expense: NewExpense) -> &Expense {
        let expense = expense.into_expense();
        tracing::debug!(id = %expense.id, category = %expense.category, "adding expense");
        self.expenses.push(expense);
        &self.expenses[self.expenses.len() - 1]
    }

    /// Appends a batch in order and returns the ids assigned to it.
    pub fn add_expenses<I>(&mut self, batch: I) -> Vec<Uuid>
    where
        I: IntoIterator<Item = NewExpense>,
    {
        let start = self.expenses.len();
        self.expenses
            .extend(batch.into_iter().map(NewExpense::into_expense));
        tracing::debug!(count = self.expenses.len() - start, "added expense batch");
        self.expenses[start..].iter().map(|e| e.id).collect()
    }

    pub fn delete_expense(&mut self, id: Uuid) -> Result<Expense, LedgerError> {
        let pos = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or(LedgerError::ExpenseNotFound(id))?;
        Ok(self.expenses.remove(pos))
    }

    pub fn update_expense(
        &mut self,
        id: Uuid,
        update: ExpenseUpdate,
    ) -> Result<&Expense, LedgerError> {
        let expense = self
            .expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(LedgerError::ExpenseNotFound(id))?;

        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(date) = update.date {
            expense.date = date;
        }
        if let Some(note) = update.note {
            expense.note = note;
        }
        if let Some(description) = update.description {
            expense.description = description;
        }
        Ok(&*expense)
    }
}

/// Serializes as RFC 3339; also accepts bare `YYYY-MM-DD` dates (read as UTC midnight).
pub mod iso_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 date: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}
