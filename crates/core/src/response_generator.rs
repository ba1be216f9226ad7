//! Terminal diagnosis summary: an LLM-written Markdown write-up structured
//! into observed phenomena / reasoning chain / remediation / cited tickets,
//! with citations post-filtered to the hypothesis's actual supporting
//! tickets.

use std::collections::HashSet;

use dbdiag_ai::{ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage};
use dbdiag_shared::{AppError, retry::with_backoff};
use sea_orm::DatabaseConnection;

use crate::knowledge_store;
use crate::llm::Llm;
use crate::session::{Hypothesis, SessionState};

const SYSTEM_PROMPT: &str = "\
You are summarizing a completed database-incident diagnosis for an operator. \
Write Markdown structured into exactly these sections, in this order: \
## Observed phenomena, ## Reasoning chain, ## Remediation, ## Cited tickets. \
Only cite ticket ids from the list you are given; never invent one.";

/// Build the terminal Markdown summary for `hypothesis`, then post-filter
/// any cited ticket id not in `hypothesis.supporting_ticket_ids` — a
/// belt-and-braces check against the `llm_chat` system prompt's own
/// citation instruction.
pub async fn generate<L: Llm>(
  llm: &L,
  max_retries: u32,
  session: &SessionState,
  hypothesis: &Hypothesis,
  db: &DatabaseConnection,
) -> Result<String, AppError> {
  let confirmed_lines: Vec<String> = session
    .confirmed_phenomena
    .iter()
    .filter(|c| hypothesis.supporting_phenomenon_ids.contains(&c.phenomenon_id))
    .map(|c| format!("- {}: {}", c.phenomenon_id, c.result_summary))
    .collect();

  let solution = knowledge_store::root_cause_by_id(&hypothesis.root_cause_id, db)
    .await?
    .map_or_else(|| "(no solution text recorded for this root cause)".to_owned(), |rc| rc.solution);

  let prompt = format!(
    "Root cause: {} (confidence {:.2})\n\nConfirmed phenomena:\n{}\n\nSolution:\n{}\n\nSupporting ticket ids: {}",
    hypothesis.root_cause_description,
    hypothesis.confidence,
    if confirmed_lines.is_empty() { "(none recorded)".to_owned() } else { confirmed_lines.join("\n") },
    solution,
    hypothesis.supporting_ticket_ids.join(", "),
  );

  let raw = with_backoff(max_retries, || async {
    llm
      .generate_text(vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(SYSTEM_PROMPT)),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(prompt.clone())),
      ])
      .await
  })
  .await?;

  Ok(post_filter_citations(&raw, &hypothesis.supporting_ticket_ids))
}

/// Strip out any `T-...`-shaped citation not present in `allowed`. A
/// conservative regex-free scan: split on whitespace/punctuation, keep lines
/// untouched otherwise — this only trims the `## Cited tickets` bullet list,
/// never rewrites prose.
pub(crate) fn post_filter_citations(markdown: &str, allowed: &[String]) -> String {
  let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
  let mut out = String::with_capacity(markdown.len());
  let mut in_citations = false;

  for line in markdown.lines() {
    let trimmed = line.trim_start();
    if trimmed.starts_with("##") {
      in_citations = trimmed.to_lowercase().contains("cited ticket");
      out.push_str(line);
      out.push('\n');
      continue;
    }

    if in_citations && trimmed.starts_with('-') {
      let mentions_disallowed_ticket = trimmed
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|tok| tok.starts_with('T') && tok.contains('-'))
        .any(|tok| !allowed.contains(tok));
      if mentions_disallowed_ticket {
        continue;
      }
    }

    out.push_str(line);
    out.push('\n');
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn post_filter_drops_tickets_outside_allowlist() {
    let md = "## Cited tickets\n- T-0001\n- T-0099\n";
    let filtered = post_filter_citations(md, &["T-0001".to_owned()]);
    assert!(filtered.contains("T-0001"));
    assert!(!filtered.contains("T-0099"));
  }

  #[test]
  fn post_filter_leaves_other_sections_untouched() {
    let md = "## Reasoning chain\nT-0099 was similar.\n## Cited tickets\n- T-0099\n";
    let filtered = post_filter_citations(md, &[]);
    assert!(filtered.contains("T-0099 was similar"));
    assert!(!filtered.contains("- T-0099"));
  }
}
