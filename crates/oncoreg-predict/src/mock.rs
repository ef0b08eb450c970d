//! Scripted in-process model for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::capability::{
    BatchRequest, ModelError, PredictionRequest, RegulatoryModel, VariantOutcome,
};

fn key(chromosome: &str, position: u64) -> String {
    format!("{chromosome}:{position}")
}

/// Mock model with scripted outcomes, keyed by "chromosome:position".
///
/// Variants without a scripted outcome fall back to the uniform signal set
/// when one is configured, otherwise they come back `Unscored`. Calls are
/// counted and batch sizes logged so tests can assert dispatch behaviour.
pub struct MockRegulatoryModel {
    outcomes: HashMap<String, VariantOutcome>,
    uniform_signals: Option<HashMap<String, f64>>,
    delays: HashMap<String, Duration>,
    scripted_errors: Mutex<VecDeque<ModelError>>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    max_batch: usize,
}

impl MockRegulatoryModel {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            uniform_signals: None,
            delays: HashMap::new(),
            scripted_errors: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            max_batch: 512,
        }
    }

    /// Script disruption signals for one variant.
    pub fn with_signals(mut self, chromosome: &str, position: u64, signals: &[(&str, f64)]) -> Self {
        let signals = signals
            .iter()
            .map(|(channel, value)| (channel.to_string(), *value))
            .collect();
        self.outcomes
            .insert(key(chromosome, position), VariantOutcome::Scored { signals });
        self
    }

    /// Script an `Unscored` outcome for one variant.
    pub fn with_unscorable(mut self, chromosome: &str, position: u64, reason: &str) -> Self {
        self.outcomes.insert(
            key(chromosome, position),
            VariantOutcome::Unscored { reason: reason.to_string() },
        );
        self
    }

    /// Fallback signal returned for every variant without a scripted outcome.
    pub fn with_uniform_signal(mut self, channel: &str, value: f64) -> Self {
        self.uniform_signals
            .get_or_insert_with(HashMap::new)
            .insert(channel.to_string(), value);
        self
    }

    /// Delay any batch containing this variant before it answers.
    pub fn with_delay_for(mut self, chromosome: &str, position: u64, delay: Duration) -> Self {
        self.delays.insert(key(chromosome, position), delay);
        self
    }

    /// Queue a failure; each scripted failure consumes one call.
    pub fn with_scripted_failure(self, error: ModelError) -> Self {
        self.scripted_errors.lock().unwrap().push_back(error);
        self
    }

    pub fn with_max_batch_size(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sizes of every batch received, in call-arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn outcome_for(&self, item: &PredictionRequest) -> VariantOutcome {
        if let Some(outcome) = self.outcomes.get(&key(&item.chromosome, item.position)) {
            return outcome.clone();
        }
        match &self.uniform_signals {
            Some(signals) => VariantOutcome::Scored { signals: signals.clone() },
            None => VariantOutcome::Unscored { reason: "no scripted outcome".to_string() },
        }
    }
}

impl Default for MockRegulatoryModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegulatoryModel for MockRegulatoryModel {
    async fn predict_batch(&self, batch: BatchRequest) -> Result<Vec<VariantOutcome>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(batch.items.len());

        let delay = batch
            .items
            .iter()
            .find_map(|item| self.delays.get(&key(&item.chromosome, item.position)))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.scripted_errors.lock().unwrap().pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(batch.items.iter().map(|item| self.outcome_for(item)).collect())
    }

    fn model_id(&self) -> &str { "mock-regulatory" }
    fn max_batch_size(&self) -> usize { self.max_batch }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
