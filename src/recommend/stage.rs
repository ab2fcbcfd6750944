use std::fmt;

use serde::Serialize;

use crate::rag::RetrievalStep;

/// Lifecycle of a single recommend request.
///
/// `Idle -> Encoding -> Searching -> Mapping -> PromptBuilding -> Generating -> Done`,
/// with any working stage allowed to jump to `Failed`. An empty store goes
/// straight from `Idle` to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    Idle,
    Encoding,
    Searching,
    Mapping,
    PromptBuilding,
    Generating,
    Done,
    Failed,
}

impl RequestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStage::Idle => "idle",
            RequestStage::Encoding => "encoding",
            RequestStage::Searching => "searching",
            RequestStage::Mapping => "mapping",
            RequestStage::PromptBuilding => "prompt_building",
            RequestStage::Generating => "generating",
            RequestStage::Done => "done",
            RequestStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStage::Done | RequestStage::Failed)
    }

    pub fn can_transition_to(&self, next: RequestStage) -> bool {
        use RequestStage::*;
        match (self, next) {
            (Idle, Encoding) | (Idle, Done) => true,
            (Encoding, Searching) => true,
            (Searching, Mapping) => true,
            (Mapping, PromptBuilding) | (Mapping, Done) => true,
            (PromptBuilding, Generating) => true,
            (Generating, Done) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl From<RetrievalStep> for RequestStage {
    fn from(step: RetrievalStep) -> Self {
        match step {
            RetrievalStep::Encoding => RequestStage::Encoding,
            RetrievalStep::Searching => RequestStage::Searching,
            RetrievalStep::Mapping => RequestStage::Mapping,
        }
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current stage of one request and logs each transition.
#[derive(Debug)]
pub struct StageTracker {
    current: RequestStage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: RequestStage::Idle,
        }
    }

    pub fn current(&self) -> RequestStage {
        self.current
    }

    pub fn advance(&mut self, next: RequestStage) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid stage transition {} -> {}",
            self.current,
            next
        );
        tracing::debug!("stage {} -> {}", self.current, next);
        self.current = next;
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
