//! The `ask` command: answer one question from the terminal.

use anyhow::Result;

use course_ta_core::orchestrator::AnswerOutcome;

use crate::services::Services;

/// Run the orchestrator once and print the answer and its sources.
///
/// With `show_context`, the tiered context handed to the generation model
/// is printed first.
pub async fn run_ask(services: &Services, question: &str, show_context: bool) -> Result<()> {
    services.check_index().await?;
    let outcome = services.orchestrator().answer_detailed(question).await;
    print!("{}", render(&outcome, show_context));
    Ok(())
}

fn render(outcome: &AnswerOutcome, show_context: bool) -> String {
    let mut out = String::new();

    if show_context {
        if let Some(context) = &outcome.context {
            out.push_str("--- primary context ---\n");
            out.push_str(context.primary.as_deref().unwrap_or_default());
            out.push_str("\n--- additional context ---\n");
            out.push_str(&context.secondary);
            out.push_str("\n-----------------------\n\n");
        }
    }

    out.push_str(&outcome.answer.text);
    out.push('\n');

    if !outcome.answer.citations.is_empty() {
        out.push_str("\nSources:\n");
        for (i, c) in outcome.answer.citations.iter().enumerate() {
            out.push_str(&format!("  [{}] {} <{}>\n", i + 1, c.title, c.url));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_ta_core::context::ContextBundle;
    use course_ta_core::models::{Answer, Citation};
    use course_ta_core::orchestrator::Outcome;

    fn answered() -> AnswerOutcome {
        let citations = vec![Citation {
            url: "https://x/w1".to_string(),
            title: "Week 1".to_string(),
        }];
        AnswerOutcome {
            answer: Answer {
                text: "Use the proxy.".to_string(),
                citations: citations.clone(),
            },
            outcome: Outcome::Answered,
            context: Some(ContextBundle {
                primary: Some("PRIMARY".to_string()),
                secondary: "SECONDARY".to_string(),
                citations,
            }),
        }
    }

    #[test]
    fn prints_answer_and_sources() {
        let text = render(&answered(), false);
        assert!(text.starts_with("Use the proxy.\n"));
        assert!(text.contains("[1] Week 1 <https://x/w1>"));
        assert!(!text.contains("PRIMARY"));
    }

    #[test]
    fn context_shown_on_request() {
        let text = render(&answered(), true);
        let primary = text.find("PRIMARY").unwrap();
        let answer = text.find("Use the proxy.").unwrap();
        assert!(primary < answer);
    }
}
