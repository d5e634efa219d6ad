//! Step contracts backed by the reasoning service.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::Diagram;

use super::chat::ChatClient;
use super::parse::{parse_diagram, parse_ruling, parse_verdict};
use super::specialist::Specialist;
use super::{Analyst, Architect, DraftRequest, Researcher, Reviewer, Ruling, StepError, Verdict};

/// How many trailing log lines are shared with the analyst and researcher.
const CONTEXT_LINES: usize = 10;

pub struct LlmAgents {
    client: ChatClient,
    analyst: Specialist,
    researcher: Specialist,
    architect: Specialist,
    judges: Specialist,
}

impl LlmAgents {
    pub fn new(client: ChatClient) -> Self {
        Self::with_prompt_overrides(client, &HashMap::new())
    }

    pub fn with_prompt_overrides(client: ChatClient, overrides: &HashMap<String, String>) -> Self {
        Self {
            client,
            analyst: Specialist::analyst().with_overrides(overrides),
            researcher: Specialist::researcher().with_overrides(overrides),
            architect: Specialist::architect().with_overrides(overrides),
            judges: Specialist::judges().with_overrides(overrides),
        }
    }

    async fn ask(&self, specialist: &Specialist, user_prompt: &str) -> Result<String, StepError> {
        let response = self.client.complete(&specialist.system_prompt, user_prompt).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                "[{}] model {} used {:?} in / {:?} out tokens",
                specialist.name,
                response.model,
                usage.input_tokens,
                usage.output_tokens
            );
        }
        Ok(response.content)
    }
}

#[async_trait]
impl Analyst for LlmAgents {
    async fn analyze(&self, request: &str, log: &[String]) -> Result<Verdict, StepError> {
        let prompt = with_context(format!("User Input: {}", request), log);
        let reply = self.ask(&self.analyst, &prompt).await?;
        parse_verdict(&reply)
    }
}

#[async_trait]
impl Researcher for LlmAgents {
    async fn research(&self, topic: &str, log: &[String]) -> Result<String, StepError> {
        let prompt = with_context(format!("Research Topic: {}", topic), log);
        let reply = self.ask(&self.researcher, &prompt).await?;
        let report = reply.trim();
        if report.is_empty() {
            return Err(StepError::Schema("researcher returned an empty report".to_string()));
        }
        Ok(report.to_string())
    }
}

#[async_trait]
impl Architect for LlmAgents {
    async fn draft(&self, request: DraftRequest) -> Result<Diagram, StepError> {
        let prompt = architect_prompt(&request)?;
        let reply = self.ask(&self.architect, &prompt).await?;
        parse_diagram(&reply)
    }
}

#[async_trait]
impl Reviewer for LlmAgents {
    async fn review(&self, diagram_json: &str, requirements: &str) -> Result<Ruling, StepError> {
        let prompt = format!(
            "Requirements: {}\n\nFlowchart JSON: {}",
            requirements, diagram_json
        );
        let reply = self.ask(&self.judges, &prompt).await?;
        parse_ruling(&reply)
    }
}

fn with_context(mut prompt: String, log: &[String]) -> String {
    if log.is_empty() {
        return prompt;
    }
    let start = log.len().saturating_sub(CONTEXT_LINES);
    prompt.push_str("\n\nSession so far:\n");
    for line in &log[start..] {
        prompt.push_str("- ");
        prompt.push_str(line);
        prompt.push('\n');
    }
    prompt
}

fn architect_prompt(request: &DraftRequest) -> Result<String, StepError> {
    let mut prompt = format!(
        "Requirements: {}\n\nResearch: {}",
        request.requirements, request.report
    );
    if let Some(baseline) = &request.baseline {
        let current = serde_json::to_string_pretty(baseline.as_ref())
            .map_err(|e| StepError::Schema(format!("baseline is not serializable: {}", e)))?;
        prompt.push_str("\n\nExisting Flowchart to Modify:\n");
        prompt.push_str(&current);
    }
    Ok(prompt)
}
