//! CLI command handlers.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use mentor_agent::ChatClient;
use mentor_orchestrator::{
    load_expert_corpus, CommitAction, OrchestratorError, Stores, Submission,
};
use mentor_persistence::MistakeMemory;

use crate::cli::{Commands, MemoryCommands};

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a command.
pub fn execute(command: Commands, model: Option<String>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    match command {
        Commands::Review {
            title,
            language,
            code,
            file,
        } => {
            let code = read_code(code, file)?;
            rt.block_on(handle_review(Submission::new(title, language, code), model))
        }
        Commands::LoadExperts { dataset } => rt.block_on(handle_load_experts(dataset)),
        Commands::Memories { command } => handle_memories(command),
        Commands::Recover => rt.block_on(handle_recover()),
        Commands::Paths => handle_paths(),
    }
}

fn read_code(code: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(code) = code {
        return Ok(code);
    }
    if let Some(path) = file {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut code = String::new();
    std::io::stdin().read_to_string(&mut code)?;
    Ok(code)
}

async fn handle_review(submission: Submission, model: Option<String>) -> Result<()> {
    // Rejected before any store or service is touched
    if let Err(OrchestratorError::InvalidSubmission(message)) = submission.validate() {
        return Err(message.into());
    }

    let client = ChatClient::from_env().map_err(review_error)?;
    let model = client.config().model_config(model.as_deref());
    let stores = Stores::open().await.map_err(review_error)?;
    stores.recover().await.map_err(review_error)?;
    let pipeline = stores.into_pipeline(Arc::new(client), model);

    let report = pipeline.review(&submission).await.map_err(review_error)?;

    println!("{}", report.feedback);
    tracing::info!(
        memory_id = %report.memory_id,
        vector_id = %report.vector_id,
        fallback = report.diagnosis.is_fallback(),
        degraded = report.retrieval_degraded,
        "Review committed"
    );
    match report.action {
        CommitAction::Created => eprintln!("\n(New mistake recorded for '{}')", submission.problem_title.trim()),
        CommitAction::Updated { fix_attempts } => eprintln!(
            "\n(Attempt {} on '{}' recorded)",
            fix_attempts,
            submission.problem_title.trim()
        ),
    }
    Ok(())
}

fn review_error<E: std::fmt::Display>(e: E) -> Box<dyn std::error::Error> {
    format!("Error processing your code: {}", e).into()
}

async fn handle_load_experts(dataset: Option<PathBuf>) -> Result<()> {
    let dataset = dataset.unwrap_or_else(mentor_core::config::dataset_file);
    let stores = Stores::open().await?;
    let count = load_expert_corpus(&stores.index, &dataset).await?;
    println!("Loaded {} expert solutions from {}", count, dataset.display());
    Ok(())
}

fn handle_memories(command: MemoryCommands) -> Result<()> {
    let log = mentor_persistence::MemoryLog::new(mentor_core::config::memory_log_file());

    match command {
        MemoryCommands::List { limit, json } => {
            let memories = log.load();
            let shown: Vec<&MistakeMemory> = memories.iter().rev().take(limit).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if shown.is_empty() {
                println!("No memories recorded yet.");
            } else {
                println!("Memories ({} of {}):\n", shown.len(), memories.len());
                for memory in shown {
                    print_summary(memory);
                }
            }
        }

        MemoryCommands::Show { id } => match log.get(&id) {
            Some(memory) => println!("{}", serde_json::to_string_pretty(&memory)?),
            None => return Err(format!("No memory with id {}", id).into()),
        },

        MemoryCommands::Search { title, patterns } => {
            let results = log.search_similar(&title, &patterns);
            if results.is_empty() {
                println!("No matching memories.");
            } else {
                println!("Found {} memories:\n", results.len());
                for memory in &results {
                    print_summary(memory);
                }
            }
        }
    }
    Ok(())
}

fn print_summary(memory: &MistakeMemory) {
    let patterns: Vec<&str> = memory.error_patterns.iter().map(String::as_str).collect();
    println!(
        "[{}] {} (attempts: {}) {}\n    {}\n    {}",
        memory.timestamp.format("%Y-%m-%d %H:%M"),
        memory.problem_title,
        memory.fix_attempts,
        memory.memory_id,
        patterns.join(", "),
        truncate(memory.notes.lines().last().unwrap_or(""), 70)
    );
}

async fn handle_recover() -> Result<()> {
    let stores = Stores::open().await?;
    match stores.recover().await? {
        0 => println!("Nothing to recover."),
        n => println!("Recovered {} unfinished commit(s).", n),
    }
    Ok(())
}

fn handle_paths() -> Result<()> {
    use mentor_core::config;

    println!("State dir:   {}", config::state_dir().display());
    println!("Memory log:  {}", config::memory_log_file().display());
    println!("Vector dir:  {}", config::vector_dir().display());
    println!("Dataset:     {}", config::dataset_file().display());
    println!("Journal:     {}", config::journal_file().display());
    println!("Env file:    {}", config::env_file().display());
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let prefix: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
    }

    #[test]
    fn test_read_code_prefers_inline() {
        let code = read_code(Some("pass".into()), Some(PathBuf::from("/nonexistent"))).unwrap();
        assert_eq!(code, "pass");
    }

    #[test]
    fn test_review_error_message() {
        let e = review_error("timeout");
        assert_eq!(e.to_string(), "Error processing your code: timeout");
    }
}
