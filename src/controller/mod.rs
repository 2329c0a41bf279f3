pub(crate) mod import;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use log::info;

use crate::aggregate::{self, AggregateResult, TimeSeries};
use crate::categoriser::{self, ClassifierModel, ModelHandle, TrainingExample};
use crate::ingest::{self, IngestReport};
use crate::store::filter::TransactionFilter;
use crate::store::TransactionStore;
use crate::transaction::Transaction;

const STORE_FILE: &str = "findash.db";
const MODEL_FILE: &str = "model.bin";

/// Owns the durable state and serialises writers: ingestion and training
/// both run under the store lock, while readers work from an owned
/// snapshot taken at call start.
pub(crate) struct Controller {
    store: Mutex<TransactionStore>,
    models: ModelHandle,
    model_path: Option<PathBuf>,
}

impl Controller {
    /// Open (or create) the durable state under the given data directory.
    pub(crate) fn open(data_dir: &Path) -> anyhow::Result<Controller> {
        fs::create_dir_all(data_dir).with_context(|| format!("creating data dir {}", data_dir.display()))?;
        let store_path = data_dir.join(STORE_FILE);
        let model_path = data_dir.join(MODEL_FILE);

        let store = TransactionStore::load(&store_path)?;
        let models = ModelHandle::empty();
        if let Some(model) = categoriser::load_model(&model_path)? {
            models.swap(Arc::new(model));
        }

        Ok(Controller { store: Mutex::new(store), models, model_path: Some(model_path) })
    }

    /// A controller with no durable files behind it.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Controller {
        Controller {
            store: Mutex::new(TransactionStore::new(None)),
            models: ModelHandle::empty(),
            model_path: None,
        }
    }

    /// Ingest one uploaded file. Row-level issues are reported within the
    /// result; only an unreadable file fails, and then nothing is merged.
    pub(crate) fn ingest(&self, bytes: &[u8], filename: &str) -> anyhow::Result<IngestReport> {
        let mut store = self.lock_store();
        let report = ingest::run(bytes, filename, &self.models, &mut store)?;
        store.save().context("saving store after ingest")?;
        Ok(report)
    }

    pub(crate) fn list_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.lock_store().select(filter)
    }

    /// Train a new classifier model and publish it atomically: the artifact
    /// is written first, then the in-process handle is swapped. The
    /// previous model stays active if anything fails.
    pub(crate) fn train_categoriser(&self, examples: &[TrainingExample]) -> anyhow::Result<Arc<ClassifierModel>> {
        let model = categoriser::train(examples)?;
        if let Some(path) = &self.model_path {
            categoriser::save_model(&model, path)?;
        }

        let model = Arc::new(model);
        self.models.swap(model.clone());
        info!("Trained categoriser on {} examples", examples.len());
        Ok(model)
    }

    pub(crate) fn active_model(&self) -> Option<Arc<ClassifierModel>> {
        self.models.current()
    }

    pub(crate) fn aggregate(&self, filter: &TransactionFilter, include_unlabelled: bool) -> AggregateResult {
        let snapshot = self.list_transactions(filter);
        aggregate::summarise(&snapshot, include_unlabelled)
    }

    pub(crate) fn time_series(&self, filter: &TransactionFilter) -> TimeSeries {
        let snapshot = self.list_transactions(filter);
        aggregate::time_series(&snapshot)
    }

    /// Files from the scan that have not been imported before.
    pub(crate) fn unseen_files(&self, files: &BTreeSet<String>) -> BTreeSet<String> {
        let store = self.lock_store();
        files.iter().filter(|f| !store.file_exists(f)).cloned().collect()
    }

    pub(crate) fn record_imported_file(&self, file_id: &str, digest: md5::Digest) -> anyhow::Result<()> {
        let mut store = self.lock_store();
        store.record_file_md5(file_id, digest);
        store.save()
    }

    fn lock_store(&self) -> MutexGuard<'_, TransactionStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}
