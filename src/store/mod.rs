pub(crate) mod filter;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::money::Cents;
use crate::store::filter::TransactionFilter;
use crate::transaction::{is_sentinel_category, Transaction};

/// findash binary version, written into the store file header.
const FINDASH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed-size store file header: 2 bytes of metadata length, bincode
/// metadata, zero padding up to HEADER_LEN, then the store body.
const HEADER_LEN: usize = 1024;

/// Internal representation of a transaction record in the store.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct TransactionRecord {
    pub(crate) id: u32,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) amount: Cents,
    pub(crate) category: String,
}

impl TransactionRecord {
    pub(crate) fn is_categorised(&self) -> bool {
        !is_sentinel_category(&self.category)
    }
}

/// Identity of a transaction across uploads: two records with the same
/// date, description and amount are the same transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    date: NaiveDate,
    description: String,
    amount: Cents,
}

/// What happened when one candidate row was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    Inserted,
    /// The existing record awaited a category and the new row supplied one.
    Updated,
    /// Identity already present; the existing record is untouched.
    Duplicate,
}

/// Metadata of the store file. Contains the version of findash that wrote
/// it, so a future version can upgrade files written by an older binary.
#[derive(Serialize, Deserialize, Debug)]
struct Metadata {
    version: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TransactionStore {
    transaction_id_seed: u32,
    transactions: HashMap<u32, TransactionRecord>,

    /// Key is transaction date, value is the ids on that date.
    date_index: BTreeMap<NaiveDate, Vec<u32>>,

    /// Identity index used to reconcile re-uploaded batches.
    dedup_index: HashMap<DedupKey, u32>,

    /// md5 digests of statement files already imported, keyed by file id.
    imported_files: HashMap<String, String>,

    #[serde(skip_serializing, skip_deserializing)]
    file_path: Option<PathBuf>,
}

impl TransactionStore {
    pub(crate) fn new(file_path: Option<PathBuf>) -> TransactionStore {
        TransactionStore {
            transaction_id_seed: 1,
            transactions: HashMap::new(),
            date_index: BTreeMap::new(),
            dedup_index: HashMap::new(),
            imported_files: HashMap::new(),
            file_path,
        }
    }

    pub(crate) fn load(path: &Path) -> anyhow::Result<TransactionStore> {
        if !path.exists() {
            return Ok(TransactionStore::new(Some(path.to_path_buf())));
        }

        let mut file = fs::File::open(path)?;
        let metadata_len = file.read_u16::<LittleEndian>()?;
        let mut buffer = vec![0; metadata_len as usize];
        file.read_exact(&mut buffer)?;
        let metadata: Metadata = bincode::deserialize(&buffer)?;
        info!("Store file version {}", metadata.version);

        file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
        let mut buffer: Vec<u8> = vec![];
        file.read_to_end(&mut buffer)?;

        let mut store: TransactionStore = bincode::deserialize(&buffer)?;
        store.file_path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Save store content to disk. A store opened without a file path is
    /// in-memory only and saving is a no-op.
    pub(crate) fn save(&self) -> anyhow::Result<()> {
        let path = match &self.file_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let metadata = Metadata { version: FINDASH_VERSION.to_string() };
        let metadata_encoded: Vec<u8> = bincode::serialize(&metadata)?;
        anyhow::ensure!(metadata_encoded.len() <= HEADER_LEN - 2, "store metadata too large");

        let encoded: Vec<u8> = bincode::serialize(&self)?;

        let mut file = fs::File::create(path)?;
        file.write_u16::<LittleEndian>(metadata_encoded.len() as u16)?;
        file.write_all(&metadata_encoded)?;
        file.write_all(&vec![0; HEADER_LEN - 2 - metadata_encoded.len()])?;
        file.write_all(&encoded)?;
        file.flush()?;
        Ok(())
    }

    /// Merge one resolved row into the store.
    ///
    /// A record whose identity is already present never loses a curated
    /// category: the incoming category only lands when the existing record
    /// still carries the empty sentinel. Re-categorisation replaces the
    /// record value under the same id.
    pub(crate) fn merge(&mut self, date: NaiveDate, description: &str, amount: Cents, category: &str) -> MergeOutcome {
        let key = DedupKey { date, description: description.to_string(), amount };

        if let Some(&existing_id) = self.dedup_index.get(&key) {
            let existing = self.transactions.get(&existing_id).unwrap();
            if existing.is_categorised() {
                if !is_sentinel_category(category) && existing.category != category {
                    info!(
                        "Transaction {} already categorised as '{}'; keeping it over '{}'",
                        existing_id, existing.category, category
                    );
                }
                return MergeOutcome::Duplicate;
            }
            if is_sentinel_category(category) {
                return MergeOutcome::Duplicate;
            }

            let mut updated = existing.clone();
            updated.category = category.to_string();
            self.transactions.insert(existing_id, updated);
            return MergeOutcome::Updated;
        }

        let id = self.transaction_id_seed;
        self.transaction_id_seed += 1;

        let record = TransactionRecord {
            id,
            date,
            description: description.to_string(),
            amount,
            category: category.to_string(),
        };

        self.date_index.entry(date).or_insert_with(Vec::new).push(id);
        self.dedup_index.insert(key, id);
        self.transactions.insert(id, record);
        MergeOutcome::Inserted
    }

    /// Records matching the filter, date ascending then id ascending.
    pub(crate) fn select(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let ids = self.ids_in_date_range(filter.date_range());
        let mut matched: Vec<&TransactionRecord> = ids
            .iter()
            .map(|id| self.transactions.get(id).unwrap())
            .filter(|t| filter.matches_category(&t.category))
            .collect();

        matched.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        matched.iter().map(|t| to_transaction(t)).collect()
    }

    fn ids_in_date_range(&self, (from, to): (Option<NaiveDate>, Option<NaiveDate>)) -> Vec<u32> {
        let lower = match from {
            Some(date) => Bound::Included(date),
            None => Bound::Unbounded,
        };
        let upper = match to {
            Some(date) => Bound::Included(date),
            None => Bound::Unbounded,
        };

        let mut ids = vec![];
        for (_, day_ids) in self.date_index.range((lower, upper)) {
            ids.extend_from_slice(day_ids);
        }
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.transactions.len()
    }

    pub(crate) fn file_exists(&self, file_id: &str) -> bool {
        self.imported_files.contains_key(file_id)
    }

    pub(crate) fn record_file_md5(&mut self, file_id: &str, digest: md5::Digest) {
        self.imported_files.insert(file_id.to_string(), format!("{:x}", digest));
    }
}

fn to_transaction(record: &TransactionRecord) -> Transaction {
    Transaction {
        id: record.id,
        date: record.date,
        description: record.description.clone(),
        amount: record.amount,
        category: record.category.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;

    use super::{MergeOutcome, TransactionStore};
    use crate::money::Cents;
    use crate::store::filter::TransactionFilter;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn store_with_rows() -> TransactionStore {
        let mut store = TransactionStore::new(None);
        store.merge(date(2), "WOOLWORTHS METRO", Cents(-3250), "Groceries");
        store.merge(date(3), "ACME PAYROLL", Cents(250000), "");
        store.merge(date(5), "SHELL COLES EXPRESS", Cents(-5000), "Transport");
        store
    }

    #[test]
    fn test_merge_assigns_sequential_ids() {
        let store = store_with_rows();
        let all = store.select(&TransactionFilter::new());
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<u32>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_never_overwrites_curated_category() {
        let mut store = store_with_rows();
        let outcome = store.merge(date(2), "WOOLWORTHS METRO", Cents(-3250), "Dining");
        assert_eq!(outcome, MergeOutcome::Duplicate);

        let all = store.select(&TransactionFilter::new());
        assert_eq!(all[0].category, "Groceries");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_fills_in_missing_category() {
        let mut store = store_with_rows();
        let outcome = store.merge(date(3), "ACME PAYROLL", Cents(250000), "Salary");
        assert_eq!(outcome, MergeOutcome::Updated);

        let all = store.select(&TransactionFilter::new());
        assert_eq!(all[1].id, 2);
        assert_eq!(all[1].category, "Salary");
    }

    #[test]
    fn test_duplicate_without_category_is_noop() {
        let mut store = store_with_rows();
        let outcome = store.merge(date(3), "ACME PAYROLL", Cents(250000), "");
        assert_eq!(outcome, MergeOutcome::Duplicate);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_amount_is_part_of_identity() {
        let mut store = store_with_rows();
        let outcome = store.merge(date(2), "WOOLWORTHS METRO", Cents(-3251), "Groceries");
        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_select_date_range_inclusive() {
        let store = store_with_rows();
        let filter = TransactionFilter::new().from_date(date(3)).to_date(date(5));
        let selected = store.select(&filter);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].description, "ACME PAYROLL");
    }

    #[test]
    fn test_select_by_category_and_sentinel() {
        let store = store_with_rows();

        let groceries = store.select(&TransactionFilter::new().categories(vec!["Groceries".to_string()]));
        assert_eq!(groceries.len(), 1);

        let unlabelled = store.select(&TransactionFilter::new().categories(vec!["uncategorised".to_string()]));
        assert_eq!(unlabelled.len(), 1);
        assert_eq!(unlabelled[0].description, "ACME PAYROLL");

        let all = store.select(&TransactionFilter::new().categories(vec!["all".to_string()]));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("findash-{}-store.db", std::process::id()));
        let mut store = TransactionStore::load(&path).unwrap();
        store.merge(date(2), "WOOLWORTHS METRO", Cents(-3250), "Groceries");
        store.record_file_md5("amex/2024-01.csv", md5::compute(b"content"));
        store.save().unwrap();

        let loaded = TransactionStore::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded.file_exists("amex/2024-01.csv"));
        let all = loaded.select(&TransactionFilter::new());
        assert_eq!(all[0].description, "WOOLWORTHS METRO");
        assert_eq!(all[0].amount, Cents(-3250));
    }
}
