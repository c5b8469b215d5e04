//! Extractor module - turns raw post text into normalized records
//!
//! One extraction attempt is: build the prompt, call the inference service,
//! strip reasoning blocks, locate the JSON object, normalize it. Any failure
//! along that chain spends one attempt from the retry budget; once the
//! budget is gone the post is dropped.

mod inference;
mod normalize;
mod prompt;
mod record;
mod response;

pub use inference::{InferenceError, InferenceService, OllamaClient};
pub use normalize::{normalize, NormalizeError, PLACEHOLDERS};
pub use prompt::build_prompt;
pub use record::{
    Contact, ExtractedRecord, GenderRestriction, Layout, Listing, Rent, UNKNOWN_FLAG,
    UNRECOGNIZED_SIZE,
};
pub use response::{locate_json_object, strip_reasoning, ResponseError};

use crate::config::ExtractorConfig;
use crate::fingerprint::fingerprint;
use crate::retry::{Backoff, RetryPolicy, Verdict};
use std::sync::Arc;
use thiserror::Error;

/// Why a single extraction attempt failed
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Normalization(#[from] NormalizeError),
}

/// Structured extraction over an inference service
pub struct Extractor {
    service: Arc<dyn InferenceService>,
    policy: RetryPolicy,
    size_ceiling: f64,
}

impl Extractor {
    pub fn new(service: Arc<dyn InferenceService>, retry_attempts: u32, size_ceiling: f64) -> Self {
        Self {
            service,
            policy: RetryPolicy::new(retry_attempts, Backoff::None),
            size_ceiling,
        }
    }

    /// Creates an extractor using the `[extractor]` retry and size settings
    pub fn from_config(service: Arc<dyn InferenceService>, config: &ExtractorConfig) -> Self {
        Self::new(service, config.retry_attempts, config.size_ceiling)
    }

    /// Extracts a record from one post
    ///
    /// # Arguments
    ///
    /// * `raw_text` - The post text as read from the feed
    ///
    /// # Returns
    ///
    /// * `Some(ExtractedRecord)` - Keyed by the fingerprint of `raw_text`
    /// * `None` - Every attempt failed; each failure has been logged
    pub async fn extract(&self, raw_text: &str) -> Option<ExtractedRecord> {
        let prompt = build_prompt(raw_text);
        let prompt = prompt.as_str();
        let max_attempts = self.policy.max_attempts();

        let outcome = self
            .policy
            .run(
                |attempt| async move {
                    let result = self.attempt(prompt).await;
                    if let Err(e) = &result {
                        tracing::warn!(
                            "Extraction attempt {}/{} failed: {}",
                            attempt,
                            max_attempts,
                            e
                        );
                    }
                    result
                },
                |_| Verdict::Retry,
            )
            .await;

        match outcome.result {
            Ok(listing) => Some(ExtractedRecord::new(
                fingerprint(raw_text),
                listing,
                raw_text,
            )),
            Err(_) => {
                tracing::error!(
                    "Giving up on post after {} attempt(s): {}",
                    outcome.attempts,
                    preview(raw_text)
                );
                None
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<Listing, ExtractionError> {
        let response = self.service.infer(prompt).await?;
        let value = locate_json_object(&strip_reasoning(&response))?;
        Ok(normalize(value, self.size_ceiling)?)
    }
}

/// First characters of a post, for log lines
fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 40;
    let text = text.trim();
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned responses, repeating the last one
    struct CannedService {
        responses: Mutex<VecDeque<Result<String, InferenceError>>>,
        calls: AtomicUsize,
    }

    impl CannedService {
        fn new(responses: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceService for CannedService {
        async fn infer(&self, _prompt: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                match responses.front().unwrap() {
                    Ok(text) => Ok(text.clone()),
                    Err(e) => Err(InferenceError::Network(e.to_string())),
                }
            }
        }
    }

    const GOOD: &str = r#"<think>rent is 6000</think>
Sure! {"address": "台南市東區", "rent": {"min": 6000, "max": 6000}, "sizes": [150, 8],
"contacts": [{"name": "unknown", "phones": ["0912-345-678"]}]}"#;

    #[tokio::test]
    async fn test_extracts_and_normalizes() {
        let service = CannedService::new(vec![Ok(GOOD.to_string())]);
        let extractor = Extractor::new(service.clone(), 1, 100.0);

        let record = extractor.extract("  套房出租 6000  ").await.unwrap();

        assert_eq!(record.id, fingerprint("套房出租 6000"));
        assert_eq!(record.raw_text, "  套房出租 6000  ");
        assert_eq!(record.listing.address, "台南市東區");
        assert_eq!(record.listing.sizes, vec![-1.0, 8.0]);
        assert_eq!(record.listing.contacts[0].name, "");
        assert_eq!(record.listing.contacts[0].phones, vec!["0912345678"]);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let service = CannedService::new(vec![Ok("I cannot help with that.".to_string())]);
        let extractor = Extractor::new(service.clone(), 2, 100.0);

        assert!(extractor.extract("post").await.is_none());
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let service = CannedService::new(vec![Err(InferenceError::Network("refused".into()))]);
        let extractor = Extractor::from_config(service.clone(), &ExtractorConfig::default());

        assert!(extractor.extract("post").await.is_none());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_on_retry() {
        let service = CannedService::new(vec![
            Err(InferenceError::Api {
                status: 500,
                message: "model loading".into(),
            }),
            Ok("{\"sizes\": \"eight\"}".to_string()),
            Ok(GOOD.to_string()),
        ]);
        let extractor = Extractor::new(service.clone(), 3, 100.0);

        let record = extractor.extract("post").await;

        assert!(record.is_some());
        assert_eq!(service.calls(), 3);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "租".repeat(50);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 43);
        assert!(short.ends_with("..."));
        assert_eq!(preview(" short "), "short");
    }
}
