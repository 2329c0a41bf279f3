use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::money::Cents;
use crate::transaction::{is_sentinel_category, Transaction};

/// Bucket name used when unlabelled records are included in the breakdown.
pub(crate) const UNLABELLED_BUCKET: &str = "uncategorised";

/// Totals over a filtered slice: income (sum of positive amounts), expense
/// (raw negative sum) and their exact sum. Display code negates the
/// expense figure; `net` stays a plain signed sum.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct AggregateResult {
    pub(crate) total_income: Cents,
    pub(crate) total_expense: Cents,
    pub(crate) net: Cents,
    pub(crate) by_category: BTreeMap<String, Cents>,
}

/// One (date, amount) sequence per flow direction, ascending by date.
/// Expense amounts are absolute values, the convention the dashboard
/// charts use.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TimeSeries {
    pub(crate) income: Vec<(NaiveDate, Cents)>,
    pub(crate) expense: Vec<(NaiveDate, Cents)>,
}

/// Summarise a snapshot. Pure: the result is a function of the records
/// alone, and an empty snapshot yields zero totals, never an error.
pub(crate) fn summarise(records: &[Transaction], include_unlabelled: bool) -> AggregateResult {
    let mut total_income = Cents::ZERO;
    let mut total_expense = Cents::ZERO;
    let mut by_category: BTreeMap<String, Cents> = BTreeMap::new();

    for record in records {
        if record.amount.is_income() {
            total_income += record.amount;
        } else if record.amount.is_expense() {
            total_expense += record.amount;
        }

        if is_sentinel_category(&record.category) {
            if include_unlabelled {
                *by_category.entry(UNLABELLED_BUCKET.to_string()).or_insert(Cents::ZERO) += record.amount;
            }
        } else {
            *by_category.entry(record.category.clone()).or_insert(Cents::ZERO) += record.amount;
        }
    }

    AggregateResult {
        total_income,
        total_expense,
        net: total_income + total_expense,
        by_category,
    }
}

/// Income and expense summed per exact date, ascending. No resampling.
pub(crate) fn time_series(records: &[Transaction]) -> TimeSeries {
    let mut income: BTreeMap<NaiveDate, Cents> = BTreeMap::new();
    let mut expense: BTreeMap<NaiveDate, Cents> = BTreeMap::new();

    for record in records {
        if record.amount.is_income() {
            *income.entry(record.date).or_insert(Cents::ZERO) += record.amount;
        } else if record.amount.is_expense() {
            *expense.entry(record.date).or_insert(Cents::ZERO) += record.amount;
        }
    }

    TimeSeries {
        income: income.into_iter().collect(),
        expense: expense.into_iter().map(|(date, sum)| (date, sum.abs())).collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{summarise, time_series, UNLABELLED_BUCKET};
    use crate::money::Cents;
    use crate::transaction::Transaction;

    fn record(id: u32, day: u32, amount: i64, category: &str) -> Transaction {
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            description: format!("merchant {}", id),
            amount: Cents(amount),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_empty_snapshot_yields_zeroes() {
        let result = summarise(&[], false);
        assert_eq!(result.total_income, Cents::ZERO);
        assert_eq!(result.total_expense, Cents::ZERO);
        assert_eq!(result.net, Cents::ZERO);
        assert!(result.by_category.is_empty());

        let series = time_series(&[]);
        assert!(series.income.is_empty());
        assert!(series.expense.is_empty());
    }

    #[test]
    fn test_income_plus_expense_is_net_exactly() {
        let records = vec![
            record(1, 2, 250000, "Salary"),
            record(2, 2, -3250, "Groceries"),
            record(3, 3, -1999, "Groceries"),
            record(4, 4, 33, ""),
        ];
        let result = summarise(&records, false);

        assert_eq!(result.total_income, Cents(250033));
        assert_eq!(result.total_expense, Cents(-5249));
        assert_eq!(result.net, result.total_income + result.total_expense);
        assert_eq!(result.net, Cents(244784));
    }

    #[test]
    fn test_by_category_excludes_sentinels_by_default() {
        let records = vec![
            record(1, 2, -3250, "Groceries"),
            record(2, 3, -1999, "Groceries"),
            record(3, 4, -500, ""),
            record(4, 5, -700, "Uncategorized"),
        ];

        let result = summarise(&records, false);
        assert_eq!(result.by_category.len(), 1);
        assert_eq!(result.by_category["Groceries"], Cents(-5249));

        let with_unlabelled = summarise(&records, true);
        assert_eq!(with_unlabelled.by_category[UNLABELLED_BUCKET], Cents(-1200));
    }

    #[test]
    fn test_time_series_grouped_sorted_and_absolute() {
        let records = vec![
            record(1, 5, -1000, "Groceries"),
            record(2, 2, -3250, "Groceries"),
            record(3, 2, -1999, "Dining"),
            record(4, 3, 250000, "Salary"),
        ];
        let series = time_series(&records);

        assert_eq!(series.income, vec![(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), Cents(250000))]);
        assert_eq!(
            series.expense,
            vec![
                (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), Cents(5249)),
                (NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), Cents(1000)),
            ]
        );
    }
}
