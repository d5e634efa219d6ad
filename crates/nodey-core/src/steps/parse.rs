//! Boundary validation of reasoning-service replies.
//!
//! Replies are free text that should contain one JSON object. Each parser
//! extracts it, deserializes into the closed schema and checks the
//! invariants the orchestrator relies on.

use crate::models::Diagram;

use super::{Ruling, StepError, Verdict, VerdictStatus};

pub const MAX_QUESTIONS: usize = 3;

/// Strip Markdown code fences and surrounding prose, keeping the outermost
/// `{ ... }` span.
pub fn clean_json(content: &str) -> &str {
    let trimmed = content.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

pub fn parse_verdict(content: &str) -> Result<Verdict, StepError> {
    let mut verdict: Verdict = serde_json::from_str(clean_json(content))
        .map_err(|e| StepError::Schema(format!("analyst reply is not a verdict: {}", e)))?;

    verdict.questions = verdict
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    match verdict.status {
        VerdictStatus::NeedsInfo if verdict.questions.is_empty() => {
            return Err(StepError::Schema(
                "analyst asked for more information without any question".to_string(),
            ));
        }
        VerdictStatus::NeedsInfo if verdict.questions.len() > MAX_QUESTIONS => {
            return Err(StepError::Schema(format!(
                "analyst asked {} questions, at most {} allowed",
                verdict.questions.len(),
                MAX_QUESTIONS
            )));
        }
        VerdictStatus::NeedsInfo => {}
        VerdictStatus::Valid | VerdictStatus::Invalid => verdict.questions.clear(),
    }

    Ok(verdict)
}

pub fn parse_diagram(content: &str) -> Result<Diagram, StepError> {
    let diagram: Diagram = serde_json::from_str(clean_json(content))
        .map_err(|e| StepError::Schema(format!("architect reply is not a flowchart: {}", e)))?;
    diagram.validate().map_err(StepError::Structure)?;
    Ok(diagram)
}

pub fn parse_ruling(content: &str) -> Result<Ruling, StepError> {
    let mut ruling: Ruling = serde_json::from_str(clean_json(content))
        .map_err(|e| StepError::Schema(format!("judges reply is not a ruling: {}", e)))?;
    ruling.critique = ruling.critique.trim().to_string();
    ruling.dissent = ruling.dissent.trim().to_string();
    Ok(ruling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_strips_fences() {
        let reply = "Here you go:\n```json\n{\"approved\": true}\n```\n";
        assert_eq!(clean_json(reply), "{\"approved\": true}");
        assert_eq!(clean_json("no json here"), "no json here");
    }

    #[test]
    fn test_parse_verdict_needs_info() {
        let verdict = parse_verdict(
            r#"{"status": "needs_info", "reason": "Too vague", "questions": ["What triggers the order?", " "], "summary": "Order"}"#,
        )
        .unwrap();
        assert_eq!(verdict.status, VerdictStatus::NeedsInfo);
        assert_eq!(verdict.questions, vec!["What triggers the order?".to_string()]);
    }

    #[test]
    fn test_parse_verdict_rejects_bad_question_counts() {
        let none = parse_verdict(r#"{"status": "needs_info", "reason": "?", "questions": []}"#);
        assert!(matches!(none, Err(StepError::Schema(_))));

        let many = parse_verdict(
            r#"{"status": "needs_info", "questions": ["a", "b", "c", "d"]}"#,
        );
        assert!(matches!(many, Err(StepError::Schema(msg)) if msg.contains("4 questions")));
    }

    #[test]
    fn test_parse_verdict_valid_drops_questions() {
        let verdict = parse_verdict(r#"{"status": "valid", "questions": ["stray"], "summary": "ok"}"#).unwrap();
        assert!(verdict.questions.is_empty());
    }

    #[test]
    fn test_parse_diagram_structure_violation() {
        let one_node = r#"{"overview": {"title": "t", "summary": ""}, "nodes": [{"id": "1", "type": "start", "x": 0, "y": 0, "title": "S", "notes": ""}], "connections": []}"#;
        assert!(matches!(parse_diagram(one_node), Err(StepError::Structure(_))));

        let garbage = "I cannot help with that.";
        assert!(matches!(parse_diagram(garbage), Err(StepError::Schema(_))));
    }

    #[test]
    fn test_parse_ruling_trims() {
        let ruling = parse_ruling(r#"{"approved": false, "critique": "  missing end node \n", "dissent": " judge 2 "}"#).unwrap();
        assert!(!ruling.approved);
        assert_eq!(ruling.critique, "missing end node");
        assert_eq!(ruling.dissent, "judge 2");
    }
}
