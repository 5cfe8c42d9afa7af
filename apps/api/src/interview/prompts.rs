// Prompt assembly for model-backed interview turns.
// The controller picks a directive; this module wraps it with the persona,
// the scraped context and the policies before it goes to the model.

use crate::interview::context::SessionContext;
use crate::interview::prompt_config::{InterviewerPrompt, Stage};
use crate::interview::session::{ConversationEntry, EntryRole};
use crate::llm_client::prompts::{
    NO_SOLUTION_INSTRUCTION, ONE_QUESTION_INSTRUCTION, SPOKEN_REPLY_INSTRUCTION,
};
use crate::llm_client::ChatMessage;

/// Code beyond this many characters is cut before it reaches the model.
const MAX_CODE_CHARS: usize = 4000;

/// Builds the system message: persona + safety, scraped context, stage guidance.
pub fn build_system_message(
    prompt: &InterviewerPrompt,
    context: &SessionContext,
    stage: &Stage,
    directive: &str,
) -> String {
    let mut system = prompt.system_prompt();

    if let Some(problem) = &context.problem {
        system.push_str(&format!("\n\nProblem Context: {}", problem.title));
        if let Some(difficulty) = &problem.difficulty {
            system.push_str(&format!(" ({difficulty})"));
        }
        if !problem.description.trim().is_empty() {
            system.push_str(&format!("\n{}", problem.description.trim()));
        }
    }

    if let Some(code) = context.code.as_ref().filter(|c| !c.text.trim().is_empty()) {
        let language = if code.language.is_empty() {
            "unknown language"
        } else {
            code.language.as_str()
        };
        system.push_str(&format!(
            "\n\nCode Context ({language}):\n{}",
            truncate_chars(&code.text, MAX_CODE_CHARS)
        ));
    }

    system.push_str(&format!(
        "\n\nInterview stage: {} (goal: {})\nElapsed: {} of {} minutes.",
        stage.stage,
        stage.goal,
        context.elapsed_minutes(),
        context.session_cap_minutes()
    ));
    system.push_str(&format!(
        "\nFor this turn, steer the conversation toward the following, in your own words:\n{directive}"
    ));

    system.push_str("\n\n");
    system.push_str(NO_SOLUTION_INSTRUCTION);
    system.push(' ');
    system.push_str(SPOKEN_REPLY_INSTRUCTION);
    if prompt.policies.one_question_at_a_time {
        system.push(' ');
        system.push_str(ONE_QUESTION_INSTRUCTION);
    }

    system
}

/// Ordered message list: system, few-shot examples, history, then the new user turn.
pub fn build_model_messages(
    prompt: &InterviewerPrompt,
    context: &SessionContext,
    stage: &Stage,
    directive: &str,
    history: &[ConversationEntry],
    user_text: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(prompt.few_shot.len() + history.len() + 2);
    messages.push(ChatMessage::system(build_system_message(
        prompt, context, stage, directive,
    )));

    messages.extend(prompt.few_shot.iter().map(|example| ChatMessage {
        role: example.role,
        content: example.content.clone(),
    }));

    messages.extend(history.iter().map(|entry| match entry.role {
        EntryRole::User => ChatMessage::user(entry.content.clone()),
        EntryRole::Assistant => ChatMessage::assistant(entry.content.clone()),
    }));

    messages.push(ChatMessage::user(user_text));
    messages
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\n[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::context::{CodeContext, ProblemContext};
    use crate::llm_client::ChatRole;
    use chrono::Utc;

    fn context() -> SessionContext {
        SessionContext::new(
            Some(ProblemContext {
                title: "Two Sum".to_string(),
                description: "Return indices of two numbers adding to target.".to_string(),
                difficulty: Some("easy".to_string()),
                url: None,
            }),
            Some(CodeContext {
                language: "rust".to_string(),
                text: "fn two_sum() {}".to_string(),
                last_diff: None,
            }),
            1500,
        )
    }

    #[test]
    fn test_system_message_contains_context_and_directive() {
        let prompt = InterviewerPrompt::embedded_default().unwrap();
        let stage = prompt.stage("approach_probe").unwrap();
        let system = build_system_message(&prompt, &context(), stage, "Ask about complexity.");

        assert!(system.starts_with(&prompt.roles.system));
        assert!(system.contains("Problem Context: Two Sum (easy)"));
        assert!(system.contains("Code Context (rust):\nfn two_sum() {}"));
        assert!(system.contains("Interview stage: approach_probe"));
        assert!(system.contains("Ask about complexity."));
        assert!(system.contains(ONE_QUESTION_INSTRUCTION));
    }

    #[test]
    fn test_system_message_omits_missing_context() {
        let prompt = InterviewerPrompt::embedded_default().unwrap();
        let stage = prompt.stage("intro").unwrap();
        let system = build_system_message(&prompt, &SessionContext::default(), stage, "Hi");
        assert!(!system.contains("Problem Context"));
        assert!(!system.contains("Code Context"));
    }

    #[test]
    fn test_model_messages_order() {
        let prompt = InterviewerPrompt::embedded_default().unwrap();
        let stage = prompt.stage("intro").unwrap();
        let history = vec![ConversationEntry {
            role: EntryRole::Assistant,
            content: "Welcome!".to_string(),
            timestamp: Utc::now(),
        }];

        let messages = build_model_messages(&prompt, &context(), stage, "Ask", &history, "Hello");

        assert_eq!(messages[0].role, ChatRole::System);
        let n = messages.len();
        assert_eq!(n, 1 + prompt.few_shot.len() + 2);
        assert_eq!(messages[n - 2], ChatMessage::assistant("Welcome!"));
        assert_eq!(messages[n - 1], ChatMessage::user("Hello"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc\n[truncated]");
        assert_eq!(truncate_chars("ééé", 2), "éé\n[truncated]");
    }
}
