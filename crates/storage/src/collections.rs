use budgetlens_core::{BudgetBook, Expense, ExpenseBook, Goal, GoalBook};
use budgetlens_import::GroupingSession;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::db::{self, DbPool};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Malformed collection '{collection}': {source}")]
    Malformed {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize collection '{collection}': {source}")]
    Serialize {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Expenses,
    Budgets,
    TransactionGroups,
    Goals,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Expenses,
        Collection::Budgets,
        Collection::TransactionGroups,
        Collection::Goals,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Expenses => "expenses",
            Collection::Budgets => "budgets",
            Collection::TransactionGroups => "transaction-groups",
            Collection::Goals => "goals",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named JSON collections in a SQLite file. Every read and write covers a whole collection.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    pool: DbPool,
}

impl CollectionStore {
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            pool: db::create_db(path).await?,
        })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn load_expenses(&self) -> Result<ExpenseBook, StorageError> {
        let expenses: Vec<Expense> = self.load_records(Collection::Expenses).await?;
        Ok(ExpenseBook::new(expenses))
    }

    pub async fn save_expenses(&self, book: &ExpenseBook) -> Result<(), StorageError> {
        self.save(Collection::Expenses, book.expenses()).await
    }

    pub async fn load_budgets(&self) -> Result<BudgetBook, StorageError> {
        Ok(self.load(Collection::Budgets).await?.unwrap_or_default())
    }

    pub async fn save_budgets(&self, book: &BudgetBook) -> Result<(), StorageError> {
        self.save(Collection::Budgets, book).await
    }

    pub async fn load_grouping_session(&self) -> Result<GroupingSession, StorageError> {
        Ok(self
            .load(Collection::TransactionGroups)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_grouping_session(&self, session: &GroupingSession) -> Result<(), StorageError> {
        self.save(Collection::TransactionGroups, session).await
    }

    pub async fn load_goals(&self) -> Result<GoalBook, StorageError> {
        let goals: Vec<Goal> = self.load_records(Collection::Goals).await?;
        Ok(GoalBook::new(goals))
    }

    pub async fn save_goals(&self, book: &GoalBook) -> Result<(), StorageError> {
        self.save(Collection::Goals, book.goals()).await
    }

    pub async fn clear(&self, collection: Collection) -> Result<bool, StorageError> {
        Ok(db::delete_collection(&self.pool, collection.name()).await?)
    }

    async fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Option<T>, StorageError> {
        let Some(body) = db::read_collection(&self.pool, collection.name()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| StorageError::Malformed { collection, source })
    }

    // Array collections tolerate individual bad records; the rest of the file still loads.
    async fn load_records<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StorageError> {
        let Some(raw) = self.load::<Vec<serde_json::Value>>(collection).await? else {
            return Ok(Vec::new());
        };

        let total = raw.len();
        let records: Vec<T> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(%collection, index, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect();

        tracing::info!(%collection, loaded = records.len(), total, "loaded collection");
        Ok(records)
    }

    async fn save<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) -> Result<(), StorageError> {
        let body = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize { collection, source })?;
        db::write_collection(&self.pool, collection.name(), &body).await?;
        tracing::info!(%collection, bytes = body.len(), "saved collection");
        Ok(())
    }
}
