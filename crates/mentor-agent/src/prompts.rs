//! Fixed system prompts and user message templates.

/// System prompt for the diagnosis call.
pub const SYSTEM_PROMPT_DIAGNOSE: &str = r#"You are a precise DSA problem analyzer.
Given a user's code and problem statement, extract the conceptual mistakes,
edge cases missed, and reasoning flaws. Return a short structured JSON summary like:

{
  "mistake_summary": "<one-line summary>",
  "issues": [
    {"type": "edge-case", "confidence": "high", "evidence": "..."},
    {"type": "logic-gap", "confidence": "medium", "evidence": "..."}
  ]
}"#;

/// System prompt for the feedback call.
///
/// Withholding the full solution is enforced here and only here; the
/// feedback text is never post-filtered.
pub const SYSTEM_PROMPT_FEEDBACK: &str = "You are a senior DSA mentor.
Use the given user's mistakes and retrieved past mistakes to guide them.
Do not give the full solution directly. Nudge them toward the right logic.
If a past mistake pattern repeats, point it out and explain how to fix their thinking.";

/// Build the diagnosis user message for a submission.
pub fn format_submission(problem_title: &str, language: &str, code: &str) -> String {
    format!(
        "Problem: {}\nLanguage: {}\nMy reasoning: Please analyze my approach\nOutcome: Needs analysis\nCode:\n{}",
        problem_title, language, code
    )
}

/// Build the feedback user message around an assembled context block.
pub fn format_feedback_request(context: &str) -> String {
    format!(
        "The user made the following mistake:\n{}\n\n\
         Using this information, give the user clear, structured feedback on:\n\
         1. What they missed or misunderstood.\n\
         2. How they can improve.\n\
         3. Step-by-step reasoning toward an optimal approach.",
        context
    )
}
