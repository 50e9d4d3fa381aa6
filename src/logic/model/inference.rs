//! Inference Engine - ONNX Runtime Integration
//!
//! Load và chạy ONNX classifiers exported from the offline training step.
//! Models take an `f32` matrix (one row per input) and return either an
//! `i64` class-index tensor or an `f32` probability matrix.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::scorer::{
    check_output, AlwaysValid, ScorerError, TamperingScorer, TextScorer, TAMPERING_LABELS,
    TEXT_LABELS,
};
use crate::logic::request::ThreatLabel;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Width of the hashed character-trigram vector fed to the text model
pub const TEXT_FEATURE_DIM: usize = 256;

// ============================================================================
// SESSION
// ============================================================================

/// Loaded ONNX session plus latency bookkeeping
struct OnnxSession {
    session: Mutex<Session>,
    model_path: String,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl OnnxSession {
    fn load(model_path: &Path) -> Result<Self, ScorerError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ScorerError::Unavailable(format!(
                "Model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| ScorerError::Unavailable(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ScorerError::Unavailable(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ScorerError::Unavailable(format!("Failed to load model: {}", e)))?;

        log::info!("ONNX model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.display().to_string(),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    /// Run the model and return one class index per input row
    fn classify(&self, input: Array2<f32>) -> Result<Vec<usize>, ScorerError> {
        let start_time = std::time::Instant::now();
        let rows = input.nrows();

        let mut session = self.session.lock();

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| ScorerError::Inference("No output defined".to_string()))?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| ScorerError::Inference(format!("Tensor error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ScorerError::Inference(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| ScorerError::Inference("No output".to_string()))?;

        let classes = match output.try_extract_tensor::<i64>() {
            Ok((_, labels)) => labels
                .iter()
                .map(|&i| {
                    usize::try_from(i)
                        .map_err(|_| ScorerError::Inference(format!("Negative class index {}", i)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Err(_) => {
                let (_, probs) = output
                    .try_extract_tensor::<f32>()
                    .map_err(|e| ScorerError::Inference(format!("Extract error: {}", e)))?;
                argmax_rows(probs, rows)?
            }
        };

        self.latency_sum_us
            .fetch_add(start_time.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(classes)
    }

    fn avg_latency_ms(&self) -> f32 {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        if count > 0 {
            (sum as f32 / count as f32) / 1000.0
        } else {
            0.0
        }
    }
}

/// Row-wise argmax over a flat `rows x classes` probability matrix
fn argmax_rows(probs: &[f32], rows: usize) -> Result<Vec<usize>, ScorerError> {
    if rows == 0 {
        return Ok(Vec::new());
    }
    if probs.is_empty() || probs.len() % rows != 0 {
        return Err(ScorerError::Inference(format!(
            "Probability tensor of {} values does not split into {} rows",
            probs.len(),
            rows
        )));
    }

    let classes = probs.len() / rows;
    Ok(probs
        .chunks(classes)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                .0
        })
        .collect())
}

fn to_labels(classes: Vec<usize>, vocabulary: &[ThreatLabel]) -> Result<Vec<ThreatLabel>, ScorerError> {
    classes
        .into_iter()
        .map(|c| {
            vocabulary
                .get(c)
                .copied()
                .ok_or_else(|| ScorerError::Inference(format!("Class index {} out of range", c)))
        })
        .collect()
}

// ============================================================================
// FEATURIZATION
// ============================================================================

/// Hashed character trigram frequencies (FNV-1a), L1-normalized
pub fn hash_trigrams(text: &str) -> [f32; TEXT_FEATURE_DIM] {
    let mut features = [0.0f32; TEXT_FEATURE_DIM];
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 3 {
        if !chars.is_empty() {
            features[fnv1a(&chars) % TEXT_FEATURE_DIM] = 1.0;
        }
        return features;
    }

    let windows = chars.windows(3);
    let total = windows.len() as f32;
    for gram in windows {
        features[fnv1a(gram) % TEXT_FEATURE_DIM] += 1.0;
    }
    for v in features.iter_mut() {
        *v /= total;
    }
    features
}

fn fnv1a(chars: &[char]) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for c in chars {
        hash ^= *c as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as usize
}

// ============================================================================
// SCORERS
// ============================================================================

/// ONNX text classifier over hashed trigrams
pub struct OnnxTextScorer {
    inner: OnnxSession,
}

impl OnnxTextScorer {
    pub fn load(model_path: &Path) -> Result<Self, ScorerError> {
        Ok(Self {
            inner: OnnxSession::load(model_path)?,
        })
    }
}

impl TextScorer for OnnxTextScorer {
    fn name(&self) -> &str {
        &self.inner.model_path
    }

    fn avg_latency_ms(&self) -> Option<f32> {
        Some(self.inner.avg_latency_ms())
    }

    fn predict(&self, snippets: &[String]) -> Result<Vec<ThreatLabel>, ScorerError> {
        let mut data = Vec::with_capacity(snippets.len() * TEXT_FEATURE_DIM);
        for snippet in snippets {
            data.extend_from_slice(&hash_trigrams(snippet));
        }
        let input = Array2::from_shape_vec((snippets.len(), TEXT_FEATURE_DIM), data)
            .map_err(|e| ScorerError::Inference(format!("Array error: {}", e)))?;

        let labels = to_labels(self.inner.classify(input)?, &TEXT_LABELS)?;
        check_output(labels, snippets.len(), &TEXT_LABELS)
    }
}

/// ONNX parameter-tampering classifier over value lengths
pub struct OnnxTamperingScorer {
    inner: OnnxSession,
}

impl OnnxTamperingScorer {
    pub fn load(model_path: &Path) -> Result<Self, ScorerError> {
        Ok(Self {
            inner: OnnxSession::load(model_path)?,
        })
    }
}

impl TamperingScorer for OnnxTamperingScorer {
    fn name(&self) -> &str {
        &self.inner.model_path
    }

    fn avg_latency_ms(&self) -> Option<f32> {
        Some(self.inner.avg_latency_ms())
    }

    fn predict(&self, features: &[[f32; 1]]) -> Result<Vec<ThreatLabel>, ScorerError> {
        let data: Vec<f32> = features.iter().map(|f| f[0]).collect();
        let input = Array2::from_shape_vec((features.len(), 1), data)
            .map_err(|e| ScorerError::Inference(format!("Array error: {}", e)))?;

        let labels = to_labels(self.inner.classify(input)?, &TAMPERING_LABELS)?;
        check_output(labels, features.len(), &TAMPERING_LABELS)
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load the text model, or fall back to `AlwaysValid`
pub fn load_text_scorer(model_path: &Path) -> Arc<dyn TextScorer> {
    match OnnxTextScorer::load(model_path) {
        Ok(scorer) => Arc::new(scorer),
        Err(e) => {
            log::warn!("Text model unavailable ({}) - all text scores will be valid", e);
            Arc::new(AlwaysValid)
        }
    }
}

/// Load the tampering model, or fall back to `AlwaysValid`
pub fn load_tampering_scorer(model_path: &Path) -> Arc<dyn TamperingScorer> {
    match OnnxTamperingScorer::load(model_path) {
        Ok(scorer) => Arc::new(scorer),
        Err(e) => {
            log::warn!("Tampering model unavailable ({}) - all length scores will be valid", e);
            Arc::new(AlwaysValid)
        }
    }
}
