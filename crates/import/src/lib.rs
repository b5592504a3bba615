pub mod grouping;
pub mod normalize;

pub use grouping::{
    group_transactions, CategoryMappings, Extraction, GroupType, GroupingError, GroupingSession,
    RawTransaction, TransactionGroup,
};
pub use normalize::{normalize_description, parse_transaction_date};
