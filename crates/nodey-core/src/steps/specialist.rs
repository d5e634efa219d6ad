//! Built-in role definitions for the four reasoning steps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::StepKind;

/// A role the reasoning service is asked to play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialist {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
}

impl Specialist {
    /// Get the requirements analyst.
    pub fn analyst() -> Self {
        Self {
            id: "analyst".to_string(),
            name: "Analyst".to_string(),
            system_prompt: ANALYST_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Get the researcher.
    pub fn researcher() -> Self {
        Self {
            id: "researcher".to_string(),
            name: "Researcher".to_string(),
            system_prompt: RESEARCHER_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Get the flow architect.
    pub fn architect() -> Self {
        Self {
            id: "architect".to_string(),
            name: "Architect".to_string(),
            system_prompt: ARCHITECT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Get the review panel.
    pub fn judges() -> Self {
        Self {
            id: "judges".to_string(),
            name: "Judges".to_string(),
            system_prompt: JUDGES_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Get the specialist serving a step, if the step is a reasoning step.
    pub fn for_step(kind: StepKind) -> Option<Self> {
        match kind {
            StepKind::Analyze => Some(Self::analyst()),
            StepKind::Research => Some(Self::researcher()),
            StepKind::Draft => Some(Self::architect()),
            StepKind::Review => Some(Self::judges()),
            StepKind::Emit => None,
        }
    }

    /// Get specialist by ID.
    pub fn by_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "analyst" => Some(Self::analyst()),
            "researcher" => Some(Self::researcher()),
            "architect" => Some(Self::architect()),
            "judges" | "judge" | "reviewer" => Some(Self::judges()),
            _ => None,
        }
    }

    /// Replace the system prompt when `overrides` has an entry for this id.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        if let Some(prompt) = overrides.get(&self.id) {
            if !prompt.trim().is_empty() {
                self.system_prompt = prompt.clone();
            }
        }
        self
    }
}

// ─── System Prompts ───────────────────────────────────────────────────────

const ANALYST_SYSTEM_PROMPT: &str = r#"You are an expert Requirements Analyst for a Flowchart Builder.
Your job is to analyze the user's request and determine if it's sufficient to build a flowchart.

Return a JSON object with:
- "status": "valid" (ready to build), "needs_info" (ambiguous/incomplete), or "invalid" (nonsense/unrelated).
- "reason": A short explanation of your decision.
- "questions": A list of 1-3 specific questions if status is "needs_info". Empty otherwise.
- "summary": A professional summary of the requirements so far.

Example:
Input: "Order flow"
Response: {"status": "needs_info", "reason": "Too vague", "questions": ["What triggers the order?", "Are there approval steps?"], "summary": "User wants an order process."}

Return strictly JSON."#;

const RESEARCHER_SYSTEM_PROMPT: &str = r#"You are an expert Researcher.
The user needs detailed information about a topic to build a flowchart.
Provide a comprehensive summary of the steps, edge cases, and best practices for the requested process.
Format it as a clear research report."#;

const ARCHITECT_SYSTEM_PROMPT: &str = r#"You are a Flow Architect. Generate or modify a JSON flowchart based on the requirements.

## Rules
1. Coordinates: start at (100, 300). Vertical or horizontal flow. Avoid overlapping.
2. Nodes: unique IDs. Types: "start", "trigger", "action", "decision", "end".
   - "start": the entry point of the flow.
   - "trigger": the event that initiates a process.
   - "decision": a branching point (requires one "yes" and one "no" connection).
   - "action": a process step.
   - "end": the final step.
3. Content:
   - title: short display name (e.g. "User Clicks").
   - notes: technical details (e.g. "API call to /v1/auth").
4. Connections: valid "from" and "to" IDs; "type" is "out", "yes" or "no".
   "yes"/"no" may only leave a decision node.

If an Existing Flowchart is provided, MODIFY it to meet the new requirements.
Do not start over unless asked. Preserve existing IDs.

## Output Structure
{
  "overview": {"title": "Example Flow", "summary": "A simple flow"},
  "nodes": [
     {"id": "1", "type": "start", "x": 100, "y": 300, "title": "Start", "notes": "Entry point"},
     {"id": "2", "type": "action", "x": 400, "y": 300, "title": "Process", "notes": "..."}
  ],
  "connections": [
     {"from": "1", "to": "2", "type": "out"}
  ]
}

You MUST generate at least 2 nodes. Return strictly JSON."#;

const JUDGES_SYSTEM_PROMPT: &str = r#"You are a panel of 3 Senior Software Architects acting as Judges.
Review the provided Flowchart JSON against the Requirements.
Vote on whether it is valid, complete, and technically sound.

If UNANIMOUS APPROVAL: return {"approved": true, "critique": "", "dissent": ""}.
If ANY DISAGREEMENT or MAJOR ISSUES: return "approved": false with a constructive "critique"
and a "dissent" explaining the objection.

Check that nodes do not overlap (compare coordinates), that the logic flows correctly,
and that the flow has a 'start' and an 'end' node.

Return strictly JSON."#;
