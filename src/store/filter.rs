use std::collections::HashSet;

use chrono::NaiveDate;

use crate::transaction::is_sentinel_category;

/// Which slice of the store a read operates on: an inclusive date range
/// (either end unbounded) and an optional category set.
///
/// The 'all' label clears the category restriction; the other sentinel
/// labels select records still awaiting a category.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransactionFilter {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    categories: Option<HashSet<String>>,
}

impl TransactionFilter {
    pub(crate) fn new() -> TransactionFilter {
        TransactionFilter::default()
    }

    pub(crate) fn from_date(mut self, date: NaiveDate) -> TransactionFilter {
        self.from = Some(date);
        self
    }

    pub(crate) fn to_date(mut self, date: NaiveDate) -> TransactionFilter {
        self.to = Some(date);
        self
    }

    /// Restrict to the given category labels. Sentinels other than 'all'
    /// are folded into a single "unassigned" entry.
    pub(crate) fn categories<I>(mut self, labels: I) -> TransactionFilter
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = HashSet::new();
        let mut select_all = false;
        for label in labels {
            let label = label.trim().to_string();
            if label.eq_ignore_ascii_case("all") {
                select_all = true;
            } else if is_sentinel_category(&label) {
                set.insert(String::new());
            } else {
                set.insert(label);
            }
        }

        self.categories = if select_all || set.is_empty() { None } else { Some(set) };
        self
    }

    pub(crate) fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.from, self.to)
    }

    pub(crate) fn matches_category(&self, category: &str) -> bool {
        match &self.categories {
            None => true,
            Some(set) => {
                if is_sentinel_category(category) {
                    set.contains("")
                } else {
                    set.contains(category.trim())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionFilter;

    #[test]
    fn test_default_matches_everything() {
        let filter = TransactionFilter::new();
        assert!(filter.matches_category("Groceries"));
        assert!(filter.matches_category(""));
    }

    #[test]
    fn test_all_sentinel_clears_restriction() {
        let filter = TransactionFilter::new().categories(vec!["ALL".to_string(), "Dining".to_string()]);
        assert!(filter.matches_category("Groceries"));
    }

    #[test]
    fn test_sentinels_select_unassigned_records() {
        let filter = TransactionFilter::new().categories(vec!["uncategorized".to_string()]);
        assert!(filter.matches_category(""));
        assert!(filter.matches_category("Uncategorised"));
        assert!(!filter.matches_category("Groceries"));
    }

    #[test]
    fn test_exact_label_match() {
        let filter = TransactionFilter::new().categories(vec!["Dining".to_string()]);
        assert!(filter.matches_category("Dining"));
        assert!(!filter.matches_category("dining"));
        assert!(!filter.matches_category(""));
    }
}
