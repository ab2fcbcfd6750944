//! Deterministic prompt rendering for the recommendation call.

use std::fmt::Write;

use super::store::PlaceRecord;

const INSTRUCTION: &str = "Give a warm, friendly recommendation of 1–2 spots in a conversational tone. Use real user reviews to support your suggestion.";

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Renders `query` and `results` (best match first) into a single prompt.
    pub fn build(&self, query: &str, results: &[PlaceRecord]) -> String {
        let mut context = String::new();
        for place in results {
            // writing into a String cannot fail
            let _ = writeln!(
                context,
                "- {} ({}⭐): {}",
                place.name,
                place.rating_or_placeholder(),
                place.summary_or_empty()
            );
            let _ = writeln!(context, "  Review: {}", place.first_review_or_placeholder());
        }

        format!(
            "\nUser is looking for: \"{}\"\n\nHere are the top matching places:\n{}\n\n{}\n",
            query, context, INSTRUCTION
        )
    }
}
