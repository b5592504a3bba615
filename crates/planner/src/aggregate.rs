use budgetlens_core::{Expense, Money, MonthKey, MonthWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: MonthKey,
    pub total: Money,
}

/// Category → chronological monthly totals. Months without spending are absent.
pub type CategoryMonthlyAggregate = BTreeMap<String, Vec<MonthlyTotal>>;

/// Buckets expenses by category and calendar month over the trailing window
/// ending at `now`. Expenses dated after `now` or with a blank category are skipped.
pub fn monthly_totals(
    expenses: &[Expense],
    now: DateTime<Utc>,
    window_months: u32,
) -> CategoryMonthlyAggregate {
    let window = MonthWindow::trailing(&now, window_months);
    let mut buckets: BTreeMap<&str, BTreeMap<MonthKey, Money>> = BTreeMap::new();

    for expense in expenses {
        let category = expense.category.trim();
        if category.is_empty() {
            tracing::warn!(id = %expense.id, "skipping expense without category");
            continue;
        }
        if expense.date > now {
            continue;
        }
        let month = MonthKey::of(&expense.date);
        if !window.contains(month) {
            continue;
        }
        *buckets
            .entry(category)
            .or_default()
            .entry(month)
            .or_insert_with(Money::zero) += expense.amount;
    }

    tracing::debug!(%window, categories = buckets.len(), "aggregated monthly totals");

    buckets
        .into_iter()
        .map(|(category, months)| {
            let totals = months
                .into_iter()
                .map(|(month, total)| MonthlyTotal { month, total })
                .collect();
            (category.to_string(), totals)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn expense(category: &str, units: i64, (y, m, d): (i32, u32, u32)) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            amount: Money::from_major(units),
            category: category.to_string(),
            date: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            note: String::new(),
            description: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn buckets_by_category_and_month_in_order() {
        let expenses = vec![
            expense("Food", 300, (2024, 6, 2)),
            expense("Food", 100, (2024, 3, 10)),
            expense("Food", 50, (2024, 3, 25)),
            expense("Travel", 900, (2024, 5, 1)),
        ];
        let agg = monthly_totals(&expenses, now(), 6);
        assert_eq!(agg.len(), 2);
        let food = &agg["Food"];
        assert_eq!(food.len(), 2);
        assert_eq!(food[0].month, MonthKey::new(2024, 3).unwrap());
        assert_eq!(food[0].total, Money::from_major(150));
        assert_eq!(food[1].total, Money::from_major(300));
    }

    #[test]
    fn window_is_six_months_including_current() {
        let expenses = vec![
            expense("Food", 10, (2024, 1, 1)),  // first month of window
            expense("Food", 20, (2023, 12, 31)), // just outside
            expense("Food", 40, (2024, 6, 21)), // after now
        ];
        let agg = monthly_totals(&expenses, now(), 6);
        assert_eq!(agg["Food"].len(), 1);
        assert_eq!(agg["Food"][0].total, Money::from_major(10));
    }

    #[test]
    fn blank_categories_are_skipped() {
        let expenses = vec![expense("  ", 10, (2024, 6, 1))];
        assert!(monthly_totals(&expenses, now(), 6).is_empty());
    }

    #[test]
    fn conserves_in_window_total() {
        let expenses = vec![
            expense("Shopping", 120, (2024, 2, 3)),
            expense("Shopping", 80, (2024, 2, 28)),
            expense("Shopping", 455, (2024, 4, 9)),
            expense("Shopping", 1_000, (2023, 8, 9)),
        ];
        let agg = monthly_totals(&expenses, now(), 6);
        let summed: Money = agg["Shopping"].iter().map(|m| m.total).sum();
        assert_eq!(summed, Money::from_major(655));
    }
}
