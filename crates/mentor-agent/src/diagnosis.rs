//! Diagnosis stage.
//!
//! The model is asked for a JSON object but is not trusted to produce one.
//! Anything that does not parse becomes [`DiagnosisOutcome::Fallback`]
//! carrying the raw text, so the pipeline never stops here.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::client::{ChatMessage, CompletionService};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::prompts::SYSTEM_PROMPT_DIAGNOSE;

/// One problem found in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue category, e.g. "edge-case" or "logic-gap".
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub confidence: String,

    #[serde(default)]
    pub evidence: String,
}

/// Structured summary of what went wrong in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub mistake_summary: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<Issue>,
}

impl Diagnosis {
    /// Issue categories in order, duplicates removed.
    pub fn issue_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for issue in &self.issues {
            let kind = issue.kind.trim();
            if !kind.is_empty() && !types.iter().any(|t| t == kind) {
                types.push(kind.to_string());
            }
        }
        types
    }

    /// Issues rendered on one line for the learner memory document.
    pub fn issues_line(&self) -> String {
        if self.issues.is_empty() {
            return "none".to_string();
        }
        self.issues
            .iter()
            .map(|i| format!("{} ({}): {}", i.kind, i.confidence, i.evidence))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Result of the diagnosis stage.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosisOutcome {
    /// The model returned the requested JSON.
    Parsed(Diagnosis),
    /// The model returned something else; kept verbatim.
    Fallback { raw_text: String },
}

impl DiagnosisOutcome {
    /// The diagnosis to continue with.
    ///
    /// A fallback becomes a diagnosis whose summary is the raw text and
    /// which has no issues.
    pub fn diagnosis(&self) -> Diagnosis {
        match self {
            Self::Parsed(d) => d.clone(),
            Self::Fallback { raw_text } => Diagnosis {
                mistake_summary: raw_text.clone(),
                issues: Vec::new(),
            },
        }
    }

    pub fn mistake_summary(&self) -> &str {
        match self {
            Self::Parsed(d) => &d.mistake_summary,
            Self::Fallback { raw_text } => raw_text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^\s*```(?:json)?\s*\n(.*?)\n?\s*```\s*$").ok())
        .as_ref()
}

/// Parse a completion into a diagnosis, falling back to the raw text.
///
/// A single surrounding Markdown code fence is tolerated.
pub fn parse_diagnosis(raw: &str) -> DiagnosisOutcome {
    let body = fence_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    match serde_json::from_str::<Diagnosis>(body.trim()) {
        Ok(diagnosis) => DiagnosisOutcome::Parsed(diagnosis),
        Err(e) => {
            warn!(error = %e, "Could not parse diagnosis as JSON, using raw text");
            DiagnosisOutcome::Fallback {
                raw_text: raw.to_string(),
            }
        }
    }
}

/// Run the diagnosis stage on a formatted submission.
///
/// Completion failures propagate; malformed output does not.
pub async fn diagnose(
    service: &dyn CompletionService,
    model: &ModelConfig,
    submission: &str,
) -> Result<DiagnosisOutcome> {
    let messages = vec![
        ChatMessage::system(SYSTEM_PROMPT_DIAGNOSE),
        ChatMessage::user(submission),
    ];
    let raw = service.complete(model, messages).await?;
    let outcome = parse_diagnosis(&raw);
    debug!(
        fallback = outcome.is_fallback(),
        summary = %outcome.mistake_summary(),
        "Diagnosis complete"
    );
    Ok(outcome)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Issue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Issue>>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletions;

    const TWO_SUM_JSON: &str = r#"{
        "mistake_summary": "Nested loops give O(n^2) time complexity",
        "issues": [
            {"type": "time-complexity", "confidence": "high", "evidence": "two nested for loops"},
            {"type": "edge-case", "confidence": 0.4, "evidence": "duplicate values"}
        ]
    }"#;

    #[test]
    fn test_parse_valid_json() {
        let outcome = parse_diagnosis(TWO_SUM_JSON);
        assert!(!outcome.is_fallback());

        let diagnosis = outcome.diagnosis();
        assert_eq!(diagnosis.mistake_summary, "Nested loops give O(n^2) time complexity");
        assert_eq!(diagnosis.issues.len(), 2);
        assert_eq!(diagnosis.issues[0].kind, "time-complexity");
        assert_eq!(diagnosis.issues[1].confidence, "0.4");
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = format!("```json\n{}\n```", TWO_SUM_JSON);
        let outcome = parse_diagnosis(&raw);
        assert!(matches!(outcome, DiagnosisOutcome::Parsed(_)));
    }

    #[test]
    fn test_parse_missing_issues_defaults_empty() {
        let outcome = parse_diagnosis(r#"{"mistake_summary": "off by one"}"#);
        assert_eq!(
            outcome,
            DiagnosisOutcome::Parsed(Diagnosis {
                mistake_summary: "off by one".into(),
                issues: vec![],
            })
        );
    }

    #[test]
    fn test_parse_null_issues_keeps_summary() {
        let outcome = parse_diagnosis(r#"{"mistake_summary": "slow", "issues": null}"#);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.mistake_summary(), "slow");
        assert!(outcome.diagnosis().issues.is_empty());
    }

    #[test]
    fn test_non_json_falls_back_to_raw_text() {
        let raw = "Your loop never terminates when the array is empty.";
        let outcome = parse_diagnosis(raw);

        assert!(outcome.is_fallback());
        let diagnosis = outcome.diagnosis();
        assert_eq!(diagnosis.mistake_summary, raw);
        assert!(diagnosis.issues.is_empty());
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        let outcome = parse_diagnosis(r#"{"summary": "no mistake_summary field"}"#);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.mistake_summary(), r#"{"summary": "no mistake_summary field"}"#);
    }

    #[test]
    fn test_issue_types_deduplicated() {
        let diagnosis = Diagnosis {
            mistake_summary: "s".into(),
            issues: vec![
                Issue { kind: "edge-case".into(), confidence: "high".into(), evidence: "a".into() },
                Issue { kind: "edge-case".into(), confidence: "low".into(), evidence: "b".into() },
                Issue { kind: "logic-gap".into(), confidence: "low".into(), evidence: "c".into() },
            ],
        };
        assert_eq!(diagnosis.issue_types(), vec!["edge-case", "logic-gap"]);
        assert!(diagnosis.issues_line().starts_with("edge-case (high): a; "));
    }

    #[tokio::test]
    async fn test_diagnose_sends_system_prompt() {
        let service = ScriptedCompletions::new(vec![TWO_SUM_JSON.to_string()]);
        let outcome = diagnose(&service, &ModelConfig::default(), "Problem: Two Sum")
            .await
            .unwrap();

        assert!(!outcome.is_fallback());
        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], ChatMessage::system(SYSTEM_PROMPT_DIAGNOSE));
        assert_eq!(calls[0][1], ChatMessage::user("Problem: Two Sum"));
    }

    #[tokio::test]
    async fn test_diagnose_propagates_service_failure() {
        let service = ScriptedCompletions::new(vec![]);
        let result = diagnose(&service, &ModelConfig::default(), "x").await;
        assert!(result.is_err());
    }
}
