// Shared prompt fragments used when assembling model turns.
// Interview-specific prompt assembly lives in interview::prompts.

/// Appended when the `one_question_at_a_time` policy is on.
pub const ONE_QUESTION_INSTRUCTION: &str = "Ask exactly one question per reply \
    and wait for the candidate to answer before asking another.";

/// Replies are read aloud by speech synthesis, so formatting must stay plain.
pub const SPOKEN_REPLY_INSTRUCTION: &str = "Your reply will be spoken aloud. \
    Keep it to two or three short sentences. \
    Do NOT use markdown, bullet points, or code blocks.";

/// Keeps the interviewer from handing out solutions.
pub const NO_SOLUTION_INSTRUCTION: &str = "Never write the solution for the candidate. \
    Guide with questions and hints only.";
