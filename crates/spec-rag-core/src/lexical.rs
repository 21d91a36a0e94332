//! TF-IDF vectorizer used by the lexical deployment.
//!
//! The vocabulary is built from the corpus by [`Embedder::fit`]: lowercase
//! word tokens of two or more characters, English stop words removed,
//! unigrams and bigrams. Terms present in more than `max_df` of the
//! documents are pruned, then the `max_features` most frequent terms are
//! kept. Vectors are smoothed `tf * idf` weights, L2-normalized, so cosine
//! similarity between them reduces to a dot product.
//!
//! Fitting is deterministic: the same corpus always yields the same
//! vocabulary and the same vectors.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::RagError;

pub const TFIDF_MODEL_NAME: &str = "tfidf";

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "do", "done", "down", "due",
    "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "last",
    "latter", "least", "less", "ltd", "many", "may", "me", "meanwhile", "might", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now",
    "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other",
    "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps",
    "please", "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she",
    "should", "since", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "than", "that", "the", "their", "them",
    "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
    "thereupon", "these", "they", "this", "those", "though", "through", "throughout", "thru",
    "thus", "to", "together", "too", "toward", "towards", "under", "until", "up", "upon", "us",
    "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Vectorizer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfOptions {
    /// Upper bound on vocabulary size.
    pub max_features: usize,
    /// Terms present in more than this fraction of documents are dropped.
    pub max_df: f64,
    /// Include two-word terms alongside single words.
    pub bigrams: bool,
}

impl Default for TfidfOptions {
    fn default() -> Self {
        Self {
            max_features: 5000,
            max_df: 0.95,
            bigrams: true,
        }
    }
}

/// Corpus-fitted TF-IDF embedder.
pub struct TfidfEmbedder {
    options: TfidfOptions,
    stop_words: HashSet<&'static str>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    fitted: bool,
}

impl TfidfEmbedder {
    pub fn new(options: TfidfOptions) -> Self {
        Self {
            options,
            stop_words: STOP_WORDS.iter().copied().collect(),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let words: Vec<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| w.chars().count() >= 2)
            .map(|w| w.to_lowercase())
            .filter(|w| !self.stop_words.contains(w.as_str()))
            .collect();

        let mut terms = words.clone();
        if self.options.bigrams {
            terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
        }
        terms
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.idf.len()];
        for term in self.terms(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                vector[idx] += 1.0;
            }
        }
        for (weight, idf) in vector.iter_mut().zip(&self.idf) {
            *weight *= idf;
        }
        let norm = vector.iter().map(|w| w * w).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for weight in &mut vector {
                *weight /= norm;
            }
        }
        vector
    }
}

impl Default for TfidfEmbedder {
    fn default() -> Self {
        Self::new(TfidfOptions::default())
    }
}

#[async_trait]
impl Embedder for TfidfEmbedder {
    fn model_name(&self) -> &str {
        TFIDF_MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.idf.len()
    }

    fn requires_fit(&self) -> bool {
        true
    }

    fn fit(&mut self, corpus: &[String]) -> Result<()> {
        let n_docs = corpus.len();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_freq: BTreeMap<String, usize> = BTreeMap::new();

        for text in corpus {
            let terms = self.terms(text);
            let mut seen = HashSet::new();
            for term in terms {
                *total_freq.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let df_limit = self.options.max_df * n_docs as f64;
        let mut candidates: Vec<(&String, usize)> = total_freq
            .iter()
            .filter(|(term, _)| doc_freq.get(*term).map_or(0, |&df| df) as f64 <= df_limit)
            .map(|(term, &count)| (term, count))
            .collect();
        if candidates.is_empty() {
            // Tiny corpora can lose every term to the document-frequency cut.
            candidates = total_freq.iter().map(|(term, &count)| (term, count)).collect();
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        candidates.truncate(self.options.max_features);
        let mut kept: Vec<&String> = candidates.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n = n_docs as f32;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(*term).copied().unwrap_or(0) as f32;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.fitted = true;

        tracing::debug!(
            documents = n_docs,
            features = self.idf.len(),
            "fitted tf-idf vocabulary"
        );
        Ok(())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.fitted {
            return Err(RagError::NotFitted {
                model: TFIDF_MODEL_NAME.to_string(),
            }
            .into());
        }
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
