//! Context composition and prompt rendering.
//!
//! Retrieved passages are split into two tiers: the single best passage
//! (primary) and everything else (secondary). The rendered prompt makes
//! that hierarchy explicit with delimited sections and a priority rule;
//! the generation model is steered only through this text.
//!
//! ```text
//! <preamble + priority rule>
//!
//! ### PRIMARY CONTEXT (Most Important):
//! <primary>
//!
//! ### ADDITIONAL CONTEXT:
//! <secondary>
//!
//! ### Question:
//! <question>
//!
//! ### Answer:
//! ```

use std::collections::HashSet;

use crate::models::{Citation, QueryResult};

/// Separator between secondary passages.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Link text used when a cited document has a blank title.
pub const FALLBACK_LINK_TEXT: &str = "Source Link";

/// Default assistant role named in the prompt preamble.
pub const DEFAULT_ROLE: &str = "a precise and literal teaching assistant for the online degree";

/// System message sent with every generation call.
pub const SYSTEM_PROMPT: &str = "You are a helpful teaching assistant. You must follow the provided context hierarchy and prioritize the PRIMARY CONTEXT. If the PRIMARY CONTEXT conflicts with the ADDITIONAL CONTEXT, the PRIMARY CONTEXT wins.";

/// Tiered context for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    /// Body of the highest-ranked passage.
    pub primary: Option<String>,
    /// Remaining bodies in rank order, joined by a blank line.
    pub secondary: String,
    /// Source links, deduplicated by url in first-seen order.
    pub citations: Vec<Citation>,
}

impl ContextBundle {
    /// True when nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_empty() && self.citations.is_empty()
    }
}

/// Split a ranked result into primary and secondary tiers.
pub fn compose(result: &QueryResult) -> ContextBundle {
    let Some((first, rest)) = result.hits().split_first() else {
        return ContextBundle::default();
    };

    let secondary = rest
        .iter()
        .map(|h| h.body.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut citations = Vec::new();
    for hit in result.iter() {
        let url = hit.metadata.url.as_str();
        if url.is_empty() || !seen.insert(url) {
            continue;
        }
        let title = if hit.metadata.title.trim().is_empty() {
            FALLBACK_LINK_TEXT.to_string()
        } else {
            hit.metadata.title.clone()
        };
        citations.push(Citation {
            url: url.to_string(),
            title,
        });
    }

    ContextBundle {
        primary: Some(first.body.clone()),
        secondary,
        citations,
    }
}

/// Render the user prompt for the generation step.
///
/// `role` completes the sentence "You are ...".
pub fn render_prompt(bundle: &ContextBundle, question: &str, role: &str) -> String {
    let primary = bundle.primary.as_deref().unwrap_or_default();
    format!(
        "You are {role}.\n\
         Your task is to answer the student's question based on the context provided below.\n\
         You MUST prioritize the information in the \"PRIMARY CONTEXT\". If it contains a direct instruction, \
         your answer must be based on that instruction. If the \"PRIMARY CONTEXT\" and the \"ADDITIONAL CONTEXT\" \
         disagree, the \"PRIMARY CONTEXT\" overrides. Use the \"ADDITIONAL CONTEXT\" only for supplementary \
         information if needed.\n\
         \n\
         ### PRIMARY CONTEXT (Most Important):\n\
         {primary}\n\
         \n\
         ### ADDITIONAL CONTEXT:\n\
         {secondary}\n\
         \n\
         ### Question:\n\
         {question}\n\
         \n\
         ### Answer:\n",
        role = role,
        primary = primary,
        secondary = bundle.secondary,
        question = question,
    )
}
