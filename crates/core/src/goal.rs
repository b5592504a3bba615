use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::LedgerError;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Active => write!(f, "active"),
            GoalStatus::Completed => write!(f, "completed"),
            GoalStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub goal_name: String,
    pub target_amount: Money,
    pub deadline: NaiveDate,
    pub saved_so_far: Money,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn remaining(&self) -> Money {
        (self.target_amount - self.saved_so_far).max(Money::zero())
    }

    /// Percent of the target saved, capped at 100. A zero target counts as reached.
    pub fn progress_percent(&self) -> f64 {
        if !self.target_amount.is_positive() {
            return 100.0;
        }
        (self.saved_so_far.to_f64() / self.target_amount.to_f64() * 100.0).min(100.0)
    }

    // Completion is sticky: only an active goal can complete and nothing reverts it.
    fn refresh_status(&mut self) {
        if self.status == GoalStatus::Active && self.saved_so_far >= self.target_amount {
            tracing::info!(goal = %self.id, "goal reached its target");
            self.status = GoalStatus::Completed;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub goal_name: String,
    pub target_amount: Money,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub saved_so_far: Option<Money>,
}

/// Field-wise replacement; `saved_so_far` here is an external correction and may go down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalUpdate {
    pub goal_name: Option<String>,
    pub target_amount: Option<Money>,
    pub deadline: Option<NaiveDate>,
    pub saved_so_far: Option<Money>,
}

/// The `goals` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalBook {
    pub goals: Vec<Goal>,
}

impl GoalBook {
    pub fn new(goals: Vec<Goal>) -> Self {
        Self { goals }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn get(&self, id: Uuid) -> Result<&Goal, LedgerError> {
        self.goals
            .iter()
            .find(|g| g.id == id)
            .ok_or(LedgerError::GoalNotFound(id))
    }

    pub fn add_goal(&mut self, goal: NewGoal, now: DateTime<Utc>) -> &Goal {
        let mut goal = Goal {
            id: Uuid::new_v4(),
            goal_name: goal.goal_name,
            target_amount: goal.target_amount,
            deadline: goal.deadline,
            saved_so_far: goal.saved_so_far.unwrap_or_default(),
            status: GoalStatus::Active,
            created_at: now,
        };
        goal.refresh_status();
        self.goals.push(goal);
        &self.goals[self.goals.len() - 1]
    }

    pub fn update_goal(&mut self, id: Uuid, update: GoalUpdate) -> Result<&Goal, LedgerError> {
        let goal = self.get_mut(id)?;
        if let Some(name) = update.goal_name {
            goal.goal_name = name;
        }
        if let Some(target) = update.target_amount {
            goal.target_amount = target;
        }
        if let Some(deadline) = update.deadline {
            goal.deadline = deadline;
        }
        if let Some(saved) = update.saved_so_far {
            goal.saved_so_far = saved;
        }
        goal.refresh_status();
        Ok(&*goal)
    }

    pub fn delete_goal(&mut self, id: Uuid) -> Result<Goal, LedgerError> {
        let pos = self
            .goals
            .iter()
            .position(|g| g.id == id)
            .ok_or(LedgerError::GoalNotFound(id))?;
        Ok(self.goals.remove(pos))
    }

    /// Adds a contribution. Negative amounts are ignored so `saved_so_far` never decreases.
    pub fn add_savings(&mut self, id: Uuid, amount: Money) -> Result<&Goal, LedgerError> {
        let goal = self.get_mut(id)?;
        if amount < Money::zero() {
            tracing::warn!(goal = %id, %amount, "ignoring negative savings contribution");
        } else {
            goal.saved_so_far += amount;
        }
        goal.refresh_status();
        Ok(&*goal)
    }

    pub fn archive_goal(&mut self, id: Uuid) -> Result<&Goal, LedgerError> {
        let goal = self.get_mut(id)?;
        goal.status = GoalStatus::Archived;
        Ok(&*goal)
    }

    pub fn progress(&self, id: Uuid) -> Result<f64, LedgerError> {
        self.get(id).map(Goal::progress_percent)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Goal, LedgerError> {
        self.goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(LedgerError::GoalNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn book_with_goal(target: i64, saved: i64) -> (GoalBook, Uuid) {
        let mut book = GoalBook::default();
        let id = book
            .add_goal(
                NewGoal {
                    goal_name: "Laptop".to_string(),
                    target_amount: Money::from_major(target),
                    deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                    saved_so_far: Some(Money::from_major(saved)),
                },
                now(),
            )
            .id;
        (book, id)
    }

    #[test]
    fn add_goal_starts_active() {
        let (book, id) = book_with_goal(50_000, 10_000);
        let goal = book.get(id).unwrap();
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.created_at, now());
        assert_eq!(goal.remaining(), Money::from_major(40_000));
    }

    #[test]
    fn add_savings_accumulates_and_completes() {
        let (mut book, id) = book_with_goal(1_000, 0);
        book.add_savings(id, Money::from_major(400)).unwrap();
        assert_eq!(book.get(id).unwrap().status, GoalStatus::Active);
        let goal = book.add_savings(id, Money::from_major(600)).unwrap();
        assert_eq!(goal.saved_so_far, Money::from_major(1_000));
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn add_savings_never_decreases() {
        let (mut book, id) = book_with_goal(1_000, 300);
        let goal = book.add_savings(id, Money::from_major(-100)).unwrap();
        assert_eq!(goal.saved_so_far, Money::from_major(300));
    }

    #[test]
    fn completion_survives_external_correction() {
        let (mut book, id) = book_with_goal(1_000, 0);
        book.add_savings(id, Money::from_major(1_200)).unwrap();
        let goal = book
            .update_goal(
                id,
                GoalUpdate {
                    saved_so_far: Some(Money::from_major(200)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(goal.saved_so_far, Money::from_major(200));
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn archived_goal_does_not_complete() {
        let (mut book, id) = book_with_goal(1_000, 0);
        book.archive_goal(id).unwrap();
        let goal = book.add_savings(id, Money::from_major(5_000)).unwrap();
        assert_eq!(goal.status, GoalStatus::Archived);
    }

    #[test]
    fn progress_is_capped() {
        let (mut book, id) = book_with_goal(1_000, 250);
        assert_eq!(book.progress(id).unwrap(), 25.0);
        book.add_savings(id, Money::from_major(2_000)).unwrap();
        assert_eq!(book.progress(id).unwrap(), 100.0);
    }

    #[test]
    fn unknown_goal_errors() {
        let mut book = GoalBook::default();
        let id = Uuid::new_v4();
        assert_eq!(book.progress(id), Err(LedgerError::GoalNotFound(id)));
        assert!(book.add_savings(id, Money::from_major(1)).is_err());
        assert!(book.delete_goal(id).is_err());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let (book, _) = book_with_goal(100, 0);
        let json = serde_json::to_value(&book.goals()[0]).unwrap();
        assert!(json.get("goalName").is_some());
        assert!(json.get("savedSoFar").is_some());
        assert_eq!(json["status"], "active");
    }
}
