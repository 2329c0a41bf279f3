mod model;

pub(crate) use model::{load_model, save_model};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::tokeniser::tokenise;

/// A labelled description used for training only; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrainingExample {
    pub(crate) description: String,
    pub(crate) category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CategoriserError {
    /// Training needs a non-empty corpus with at least two distinct labels.
    InsufficientTrainingData(String),
    /// No trained model is available to predict with.
    ModelNotFound,
}

impl fmt::Display for CategoriserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CategoriserError::InsufficientTrainingData(s) => write!(f, "insufficient training data: {}", s),
            CategoriserError::ModelNotFound => write!(f, "no trained model available"),
        }
    }
}

impl std::error::Error for CategoriserError {}

/// Laplace smoothing constant for term counts unseen under a label.
const SMOOTHING_ALPHA: f64 = 1.0;

/// Learned vocabulary and document-frequency weighting. Term ids follow
/// lexicographic vocabulary order, so identical corpora always produce
/// identical tables.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Vectoriser {
    term_ids: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl Vectoriser {
    /// Learn the vocabulary and smoothed idf weights from the corpus.
    fn fit(documents: &[Vec<String>]) -> Vectoriser {
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in documents {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let term_ids: BTreeMap<String, usize> = document_frequency
            .keys()
            .enumerate()
            .map(|(id, term)| (term.to_string(), id))
            .collect();

        let corpus_size = documents.len() as f64;
        let mut idf = vec![0.0; term_ids.len()];
        for (term, id) in &term_ids {
            let df = document_frequency[term.as_str()] as f64;
            idf[*id] = ((1.0 + corpus_size) / (1.0 + df)).ln() + 1.0;
        }

        Vectoriser { term_ids, idf }
    }

    /// Map tokens onto an L2-normalised tf-idf vector over the learned
    /// vocabulary, sparse form. Terms outside the vocabulary contribute
    /// nothing.
    fn transform(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let mut term_counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokens {
            if let Some(&id) = self.term_ids.get(token) {
                *term_counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: Vec<(usize, f64)> = term_counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();

        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in weights.iter_mut() {
                *w /= norm;
            }
        }

        weights
    }

    fn vocabulary_size(&self) -> usize {
        self.term_ids.len()
    }
}

/// An immutable trained artifact: the fitted vectoriser plus multinomial
/// Naive Bayes class statistics. Labels are held in lexicographic order;
/// prediction ties resolve to the smallest label by construction.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub(crate) struct ClassifierModel {
    vectoriser: Vectoriser,
    labels: Vec<String>,
    log_prior: Vec<f64>,
    /// Per label, per term id: log emission probability.
    log_likelihood: Vec<Vec<f64>>,
}

/// Train a tf-idf + multinomial Naive Bayes model from labelled examples.
/// Pure and deterministic: identical input produces a byte-identical model.
pub(crate) fn train(examples: &[TrainingExample]) -> Result<ClassifierModel, CategoriserError> {
    if examples.is_empty() {
        return Err(CategoriserError::InsufficientTrainingData("no examples".to_string()));
    }

    let documents: Vec<Vec<String>> = examples.iter().map(|e| tokenise(&e.description)).collect();
    let vectoriser = Vectoriser::fit(&documents);

    let mut by_label: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, example) in examples.iter().enumerate() {
        by_label.entry(example.category.as_str()).or_default().push(i);
    }
    if by_label.len() < 2 {
        return Err(CategoriserError::InsufficientTrainingData(format!(
            "need at least 2 distinct categories, got {}",
            by_label.len()
        )));
    }

    let vocabulary_size = vectoriser.vocabulary_size();
    let corpus_size = examples.len() as f64;
    let mut labels = Vec::with_capacity(by_label.len());
    let mut log_prior = Vec::with_capacity(by_label.len());
    let mut log_likelihood = Vec::with_capacity(by_label.len());

    for (label, document_indexes) in &by_label {
        // Total tf-idf mass per term across the label's documents.
        let mut term_mass = vec![0.0; vocabulary_size];
        for &doc in document_indexes {
            for (id, weight) in vectoriser.transform(&documents[doc]) {
                term_mass[id] += weight;
            }
        }

        let label_mass: f64 = term_mass.iter().sum();
        let denominator = label_mass + SMOOTHING_ALPHA * vocabulary_size as f64;

        labels.push(label.to_string());
        log_prior.push((document_indexes.len() as f64 / corpus_size).ln());
        log_likelihood.push(
            term_mass
                .iter()
                .map(|mass| ((mass + SMOOTHING_ALPHA) / denominator).ln())
                .collect(),
        );
    }

    Ok(ClassifierModel { vectoriser, labels, log_prior, log_likelihood })
}

impl ClassifierModel {
    /// Best-scoring category for a description. Never fails: an empty or
    /// fully-unseen description scores on the class priors alone, and ties
    /// go to the lexicographically smallest label.
    pub(crate) fn predict(&self, description: &str) -> &str {
        let weights = self.vectoriser.transform(&tokenise(description));

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for class in 0..self.labels.len() {
            let mut score = self.log_prior[class];
            for (id, weight) in &weights {
                score += weight * self.log_likelihood[class][*id];
            }
            if score > best_score {
                best = class;
                best_score = score;
            }
        }

        &self.labels[best]
    }

    pub(crate) fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Atomic view of the currently active model. A retrain swaps the whole
/// artifact; readers that resolved the model before the swap keep
/// predicting against the version they started with.
pub(crate) struct ModelHandle {
    active: RwLock<Option<Arc<ClassifierModel>>>,
}

impl ModelHandle {
    pub(crate) fn empty() -> ModelHandle {
        ModelHandle { active: RwLock::new(None) }
    }

    pub(crate) fn current(&self) -> Option<Arc<ClassifierModel>> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn swap(&self, model: Arc<ClassifierModel>) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = Some(model);
    }

    pub(crate) fn predict(&self, description: &str) -> Result<String, CategoriserError> {
        let model = self.current().ok_or(CategoriserError::ModelNotFound)?;
        Ok(model.predict(description).to_string())
    }

    /// Predict for every description, order-preserving. The active model is
    /// resolved once: either the whole batch runs against the same version
    /// or the call fails before any prediction.
    pub(crate) fn predict_batch(&self, descriptions: &[&str]) -> Result<Vec<String>, CategoriserError> {
        let model = self.current().ok_or(CategoriserError::ModelNotFound)?;
        Ok(descriptions.iter().map(|d| model.predict(d).to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{train, CategoriserError, ModelHandle, TrainingExample};

    fn example(description: &str, category: &str) -> TrainingExample {
        TrainingExample { description: description.to_string(), category: category.to_string() }
    }

    fn two_label_corpus() -> Vec<TrainingExample> {
        vec![example("Starbucks Coffee", "Dining"), example("Shell Gas", "Transport")]
    }

    #[test]
    fn test_seen_description_maps_to_its_category() {
        let model = train(&two_label_corpus()).unwrap();
        assert_eq!(model.predict("Starbucks Coffee"), "Dining");
        assert_eq!(model.predict("Shell Gas"), "Transport");
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = train(&two_label_corpus()).unwrap();
        let b = train(&two_label_corpus()).unwrap();
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }

    #[test]
    fn test_empty_description_returns_majority_prior() {
        let examples = vec![
            example("Starbucks Coffee", "Dining"),
            example("Grill'd Burgers", "Dining"),
            example("Shell Gas", "Transport"),
        ];
        let model = train(&examples).unwrap();
        assert_eq!(model.predict(""), "Dining");
    }

    #[test]
    fn test_prior_tie_breaks_to_smallest_label() {
        let model = train(&two_label_corpus()).unwrap();
        // Both priors are 1/2 and no term matches: lexicographic order decides.
        assert_eq!(model.predict(""), "Dining");
        assert_eq!(model.predict("0000 9999"), "Dining");
    }

    #[test]
    fn test_unseen_terms_are_ignored() {
        let model = train(&two_label_corpus()).unwrap();
        assert_eq!(model.predict("Starbucks Coffee Unseen Merchant Xyz"), "Dining");
    }

    #[test]
    fn test_rejects_empty_training_set() {
        match train(&[]) {
            Err(CategoriserError::InsufficientTrainingData(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rejects_single_label_training_set() {
        let examples = vec![example("Starbucks Coffee", "Dining"), example("Grill'd Burgers", "Dining")];
        match train(&examples) {
            Err(CategoriserError::InsufficientTrainingData(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_handle_without_model_fails_whole_batch() {
        let handle = ModelHandle::empty();
        assert_eq!(handle.predict("coffee"), Err(CategoriserError::ModelNotFound));
        assert_eq!(handle.predict_batch(&["coffee", "gas"]), Err(CategoriserError::ModelNotFound));
    }

    #[test]
    fn test_handle_batch_is_order_preserving() {
        let handle = ModelHandle::empty();
        handle.swap(Arc::new(train(&two_label_corpus()).unwrap()));

        let predictions = handle.predict_batch(&["Shell Gas", "Starbucks Coffee"]).unwrap();
        assert_eq!(predictions, vec!["Transport".to_string(), "Dining".to_string()]);
    }

    #[test]
    fn test_swap_replaces_active_model() {
        let handle = ModelHandle::empty();
        handle.swap(Arc::new(train(&two_label_corpus()).unwrap()));

        let retrained = vec![
            example("Starbucks Coffee", "Coffee Shops"),
            example("Shell Gas", "Fuel"),
        ];
        handle.swap(Arc::new(train(&retrained).unwrap()));
        assert_eq!(handle.predict("Starbucks Coffee").unwrap(), "Coffee Shops");
    }
}
