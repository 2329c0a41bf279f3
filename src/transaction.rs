use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Cents;

/// Reserved labels meaning "no category assigned".
const SENTINEL_CATEGORIES: [&str; 4] = ["", "all", "uncategorized", "uncategorised"];

/// The label a transaction carries while it awaits categorisation.
pub(crate) const UNCATEGORISED: &str = "";

/// True if the label is one of the reserved "no category" values.
pub(crate) fn is_sentinel_category(label: &str) -> bool {
    let label = label.trim();
    SENTINEL_CATEGORIES.iter().any(|s| label.eq_ignore_ascii_case(s))
}

/// A transaction as seen by callers: listing, rendering and tests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transaction {
    pub(crate) id: u32,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) amount: Cents,
    pub(crate) category: String,
}

#[cfg(test)]
mod tests {
    use super::is_sentinel_category;

    #[test]
    fn test_sentinel_categories() {
        assert!(is_sentinel_category(""));
        assert!(is_sentinel_category("  "));
        assert!(is_sentinel_category("All"));
        assert!(is_sentinel_category("UNCATEGORIZED"));
        assert!(is_sentinel_category("uncategorised"));
        assert!(!is_sentinel_category("Groceries"));
    }
}
