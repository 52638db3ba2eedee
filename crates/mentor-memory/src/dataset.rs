//! Expert solution dataset.
//!
//! The dataset is a JSON array of problems with prose explanations at
//! several levels of refinement. Each problem becomes one document in the
//! expert corpus.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MemoryError, Result};
use crate::record::META_PROBLEM_TITLE;
use crate::semantic::Document;

/// One curated problem with expert explanations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertSolution {
    pub problem_title: String,
    pub difficulty: String,
    pub topic: String,
    pub problem_statement: String,
    pub brute_force_explanation: String,
    pub better_approach: String,
    pub optimized_explanation: String,
    pub key_idea: String,
}

impl ExpertSolution {
    /// Composite text that gets embedded and shown to the feedback stage.
    pub fn document_text(&self) -> String {
        format!(
            "Problem: {}\nDifficulty: {}\nTopic: {}\n\n\
             Problem Statement:\n{}\n\n\
             Brute Force Approach:\n{}\n\n\
             Better Approach:\n{}\n\n\
             Optimized Explanation:\n{}\n\n\
             Key Idea:\n{}\n",
            self.problem_title,
            self.difficulty,
            self.topic,
            self.problem_statement,
            self.brute_force_explanation,
            self.better_approach,
            self.optimized_explanation,
            self.key_idea,
        )
    }

    /// Build the corpus document for the problem at `position` in the dataset.
    pub fn to_document(&self, position: usize) -> Document {
        Document::new(format!("expert_{}", position), self.document_text())
            .with_metadata(META_PROBLEM_TITLE, self.problem_title.clone().into())
            .with_metadata("difficulty", self.difficulty.clone().into())
            .with_metadata("topic", self.topic.clone().into())
    }
}

/// Load the dataset from `path`.
///
/// # Errors
/// [`MemoryError::DatasetNotFound`] if the file does not exist, or a
/// serialization error if it is not a JSON array of problems.
pub fn load_dataset(path: &Path) -> Result<Vec<ExpertSolution>> {
    if !path.exists() {
        return Err(MemoryError::DatasetNotFound(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path)?;
    let problems: Vec<ExpertSolution> = serde_json::from_str(&data)?;
    info!(count = problems.len(), path = %path.display(), "Loaded expert dataset");
    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn two_sum() -> ExpertSolution {
        ExpertSolution {
            problem_title: "Two Sum".into(),
            difficulty: "Easy".into(),
            topic: "Arrays".into(),
            problem_statement: "Find two indices whose values add to target.".into(),
            brute_force_explanation: "Check every pair, O(n^2).".into(),
            better_approach: "Sort and use two pointers.".into(),
            optimized_explanation: "Store seen values in a hash map.".into(),
            key_idea: "Look up the complement.".into(),
        }
    }

    #[test]
    fn test_document_text_sections() {
        let text = two_sum().document_text();
        assert!(text.starts_with("Problem: Two Sum\nDifficulty: Easy\nTopic: Arrays"));
        assert!(text.contains("Optimized Explanation:\nStore seen values in a hash map."));
        assert!(text.contains("Key Idea:\nLook up the complement."));
    }

    #[test]
    fn test_to_document_metadata() {
        let doc = two_sum().to_document(4);
        assert_eq!(doc.id, "expert_4");
        assert_eq!(
            doc.metadata.get(META_PROBLEM_TITLE),
            Some(&serde_json::json!("Two Sum"))
        );
        assert_eq!(doc.metadata.get("topic"), Some(&serde_json::json!("Arrays")));
    }

    #[test]
    fn test_load_missing_dataset() {
        let dir = tempdir().unwrap();
        let result = load_dataset(&dir.path().join("problems.json"));
        assert!(matches!(result, Err(MemoryError::DatasetNotFound(_))));
    }

    #[test]
    fn test_load_dataset_tolerates_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("problems.json");
        std::fs::write(&path, r#"[{"problem_title": "Two Sum", "topic": "Arrays"}]"#).unwrap();

        let problems = load_dataset(&path).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].topic, "Arrays");
        assert!(problems[0].key_idea.is_empty());
    }
}
