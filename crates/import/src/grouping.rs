use budgetlens_core::{Money, NewExpense};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::normalize::{normalize_description, parse_transaction_date};

/// A debit notice as produced by the message extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub amount: Money,
    #[serde(default)]
    pub account_last4: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl RawTransaction {
    pub fn account_suffix(&self) -> Option<&str> {
        self.account_last4
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Builds a ledger entry with a normalized date and description.
    pub fn to_expense(&self, category: &str, now: DateTime<Utc>) -> NewExpense {
        let description = normalize_description(&self.description);
        NewExpense {
            amount: self.amount,
            category: category.to_string(),
            date: parse_transaction_date(self.date.as_deref(), now),
            note: description.clone(),
            description,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Account,
    Amount,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::Account => write!(f, "account"),
            GroupType::Amount => write!(f, "amount"),
        }
    }
}

/// Two or more transactions sharing an account suffix or an exact amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionGroup {
    pub id: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub key: String,
    pub transactions: Vec<RawTransaction>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TransactionGroup {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn total(&self) -> Money {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn to_expenses(&self, category: &str, now: DateTime<Utc>) -> Vec<NewExpense> {
        self.transactions
            .iter()
            .map(|t| t.to_expense(category, now))
            .collect()
    }
}

/// Remembered category choices, keyed by the attribute a group was formed on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMappings {
    #[serde(default)]
    pub account_categories: BTreeMap<String, String>,
    #[serde(default)]
    pub amount_categories: BTreeMap<String, String>,
}

impl CategoryMappings {
    pub fn insert(&mut self, group_type: GroupType, key: &str, category: &str) {
        let table = match group_type {
            GroupType::Account => &mut self.account_categories,
            GroupType::Amount => &mut self.amount_categories,
        };
        table.insert(key.to_string(), category.to_string());
    }

    pub fn get(&self, group_type: GroupType, key: &str) -> Option<&str> {
        let table = match group_type {
            GroupType::Account => &self.account_categories,
            GroupType::Amount => &self.amount_categories,
        };
        table.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.account_categories.len() + self.amount_categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clusters a batch into account-suffix and exact-amount groups.
///
/// Transactions are visited in input order. For each one not already placed,
/// unplaced partners sharing its account suffix form an `account` group; only
/// when there are none are unplaced partners with an equal amount tried. Both
/// the anchor and its partners are marked placed, so a transaction belongs to at
/// most one group. Transactions without partners are left out entirely.
pub fn group_transactions(
    transactions: &[RawTransaction],
    mappings: &CategoryMappings,
) -> Vec<TransactionGroup> {
    let mut placed = vec![false; transactions.len()];
    let mut groups = Vec::new();

    for (index, anchor) in transactions.iter().enumerate() {
        if placed[index] {
            continue;
        }

        let by_account = anchor.account_suffix().and_then(|suffix| {
            let partners = find_partners(transactions, &placed, index, |t| {
                t.account_suffix() == Some(suffix)
            });
            (!partners.is_empty()).then(|| (GroupType::Account, suffix.to_string(), partners))
        });

        let matched = by_account.or_else(|| {
            let partners = find_partners(transactions, &placed, index, |t| t.amount == anchor.amount);
            (!partners.is_empty()).then(|| (GroupType::Amount, anchor.amount.canonical_key(), partners))
        });

        let Some((group_type, key, partners)) = matched else {
            tracing::debug!(index, "transaction has no grouping partner");
            continue;
        };

        placed[index] = true;
        let mut members = Vec::with_capacity(partners.len() + 1);
        members.push(anchor.clone());
        for &i in &partners {
            placed[i] = true;
            members.push(transactions[i].clone());
        }

        let category = mappings.get(group_type, &key).map(str::to_string);
        tracing::debug!(%group_type, key = %key, members = members.len(), prefilled = category.is_some(), "formed transaction group");

        groups.push(TransactionGroup {
            id: format!("group-{index}"),
            group_type,
            key,
            transactions: members,
            category,
        });
    }

    groups
}

fn find_partners<F>(
    transactions: &[RawTransaction],
    placed: &[bool],
    anchor: usize,
    matches: F,
) -> Vec<usize>
where
    F: Fn(&RawTransaction) -> bool,
{
    transactions
        .iter()
        .enumerate()
        .filter(|&(i, t)| i != anchor && !placed[i] && matches(t))
        .map(|(i, _)| i)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupingError {
    #[error("Transaction group not found: {0}")]
    GroupNotFound(String),
    #[error("Group {group_id} has no transaction at index {index}")]
    TransactionIndexOutOfRange { group_id: String, index: usize },
}

/// What `remove_transaction_from_group` hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub transaction: RawTransaction,
    /// The last remaining member when the group fell below two and was dissolved.
    pub orphaned: Option<RawTransaction>,
}

/// The `transaction-groups` collection: persistent mappings plus the current batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSession {
    #[serde(flatten)]
    pub mappings: CategoryMappings,
    #[serde(default)]
    pub groups: Vec<TransactionGroup>,
    #[serde(default)]
    pub parsed_transactions: Vec<RawTransaction>,
}

impl GroupingSession {
    pub fn with_mappings(mappings: CategoryMappings) -> Self {
        Self {
            mappings,
            ..Default::default()
        }
    }

    pub fn groups(&self) -> &[TransactionGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Result<&TransactionGroup, GroupingError> {
        self.groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or_else(|| GroupingError::GroupNotFound(group_id.to_string()))
    }

    /// Replaces the current batch and its groups.
    pub fn group_transactions(&mut self, transactions: Vec<RawTransaction>) -> &[TransactionGroup] {
        self.groups = group_transactions(&transactions, &self.mappings);
        tracing::info!(
            transactions = transactions.len(),
            groups = self.groups.len(),
            "grouped transaction batch"
        );
        self.parsed_transactions = transactions;
        &self.groups
    }

    pub fn add_category_mapping(&mut self, group_type: GroupType, key: &str, category: &str) {
        self.mappings.insert(group_type, key, category);
    }

    /// Sets the group's category and remembers it for future batches.
    pub fn update_group_category(
        &mut self,
        group_id: &str,
        category: &str,
    ) -> Result<&TransactionGroup, GroupingError> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| GroupingError::GroupNotFound(group_id.to_string()))?;
        group.category = Some(category.to_string());
        self.mappings.insert(group.group_type, &group.key, category);
        Ok(&*group)
    }

    pub fn remove_group(&mut self, group_id: &str) -> Result<TransactionGroup, GroupingError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| GroupingError::GroupNotFound(group_id.to_string()))?;
        Ok(self.groups.remove(pos))
    }

    /// Pulls one transaction out for individual handling.
    ///
    /// A group left with a single member is dissolved and that member is
    /// returned as `orphaned`.
    pub fn remove_transaction_from_group(
        &mut self,
        group_id: &str,
        index: usize,
    ) -> Result<Extraction, GroupingError> {
        let pos = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| GroupingError::GroupNotFound(group_id.to_string()))?;

        let group = &mut self.groups[pos];
        if index >= group.transactions.len() {
            return Err(GroupingError::TransactionIndexOutOfRange {
                group_id: group_id.to_string(),
                index,
            });
        }
        let transaction = group.transactions.remove(index);

        let orphaned = if group.transactions.len() < 2 {
            let dissolved = self.groups.remove(pos);
            tracing::debug!(group = group_id, "group dissolved after extraction");
            dissolved.transactions.into_iter().next()
        } else {
            None
        };

        Ok(Extraction {
            transaction,
            orphaned,
        })
    }

    /// Categorizes a whole group: remembers the mapping, drops the group and
    /// returns the expenses to add to the ledger.
    pub fn tag_group(
        &mut self,
        group_id: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewExpense>, GroupingError> {
        self.update_group_category(group_id, category)?;
        let group = self.remove_group(group_id)?;
        Ok(group.to_expenses(category, now))
    }

    /// Drops the current batch and its groups. Mappings are kept.
    pub fn clear_groups(&mut self) {
        self.groups.clear();
        self.parsed_transactions.clear();
    }
}
