//! Request pipeline: retrieve places for a query and phrase a recommendation.
//!
//! Each call runs the stages in [`RequestStage`] order under a single deadline.
//! External calls (encoder, generator) are dropped when the deadline passes,
//! which cancels the underlying HTTP request.

mod stage;

pub use stage::{RequestStage, StageTracker};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::{EncodingError, GenerationError, SearchError};
use crate::llm::Generator;
use crate::rag::{PlaceRecord, PromptBuilder, RetrieveError, Retriever};

pub const NO_MATCH_ANSWER: &str = "No matching places found.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub answer: String,
    pub places: Vec<PlaceRecord>,
}

impl Recommendation {
    pub fn no_match() -> Self {
        Self {
            answer: NO_MATCH_ANSWER.to_string(),
            places: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("query encoding failed: {0}")]
    Encoding(#[source] EncodingError),

    #[error("search failed during {stage}: {source}")]
    Search {
        stage: RequestStage,
        #[source]
        source: SearchError,
    },

    #[error("generation failed: {0}")]
    Generation(#[source] GenerationError),

    #[error("request exceeded {timeout:?} during {stage}")]
    Timeout {
        stage: RequestStage,
        timeout: Duration,
    },
}

impl RecommendError {
    /// Stage the request was in when it failed.
    pub fn stage(&self) -> RequestStage {
        match self {
            RecommendError::Encoding(_) => RequestStage::Encoding,
            RecommendError::Search { stage, .. } => *stage,
            RecommendError::Generation(_) => RequestStage::Generating,
            RecommendError::Timeout { stage, .. } => *stage,
        }
    }
}

pub struct Recommender {
    retriever: Retriever,
    prompt: PromptBuilder,
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl Recommender {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self {
            retriever,
            prompt: PromptBuilder::new(),
            generator,
            timeout,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn recommend(&self, query: &str) -> Result<Recommendation, RecommendError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("recommend", %request_id);
        self.run(query).instrument(span).await
    }

    async fn run(&self, query: &str) -> Result<Recommendation, RecommendError> {
        let deadline = Instant::now() + self.timeout;
        let mut tracker = StageTracker::new();

        let retrieval = timeout_at(
            deadline,
            self.retriever
                .retrieve_observed(query, |step| tracker.advance(step.into())),
        )
        .await;
        let ranked = match retrieval {
            Ok(Ok(ranked)) => ranked,
            Ok(Err(RetrieveError::Encoding(err))) => {
                return Err(self.fail(&mut tracker, RecommendError::Encoding(err)))
            }
            Ok(Err(RetrieveError::Search(source))) => {
                let err = RecommendError::Search {
                    stage: tracker.current(),
                    source,
                };
                return Err(self.fail(&mut tracker, err));
            }
            Err(_) => return Err(self.timed_out(&mut tracker)),
        };

        if ranked.is_empty() {
            tracker.advance(RequestStage::Done);
            tracing::info!("No places retrieved, returning no-match response");
            return Ok(Recommendation::no_match());
        }
        for place in &ranked {
            tracing::debug!(
                "match #{} {:?} distance={:.4}",
                place.position,
                place.record.name,
                place.distance
            );
        }

        tracker.advance(RequestStage::PromptBuilding);
        let places: Vec<PlaceRecord> = ranked.into_iter().map(|r| r.record).collect();
        let prompt = self.prompt.build(query, &places);

        tracker.advance(RequestStage::Generating);
        let answer = match timeout_at(deadline, self.generator.generate(&prompt)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => return Err(self.fail(&mut tracker, RecommendError::Generation(err))),
            Err(_) => return Err(self.timed_out(&mut tracker)),
        };

        tracker.advance(RequestStage::Done);
        tracing::info!("Recommended from {} places", places.len());
        Ok(Recommendation { answer, places })
    }

    fn timed_out(&self, tracker: &mut StageTracker) -> RecommendError {
        let err = RecommendError::Timeout {
            stage: tracker.current(),
            timeout: self.timeout,
        };
        self.fail(tracker, err)
    }

    fn fail(&self, tracker: &mut StageTracker, err: RecommendError) -> RecommendError {
        tracing::warn!("Request failed during {}: {}", tracker.current(), err);
        tracker.advance(RequestStage::Failed);
        err
    }
}
