// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// this file holds the pieces they have in common.

/// Appended to any system prompt whose output is fed to the sanitizer.
pub const JSON_ARRAY_ONLY: &str = "\
    Respond with a JSON array of objects only. \
    Do NOT include any text before or after the array. \
    Do NOT use markdown code fences. \
    If there is nothing to report, respond with [].";

/// Tone rules for anything shown to the person being screened.
pub const SUPPORTIVE_TONE: &str = "\
    Always be warm, supportive and unhurried, like a kind friend. \
    Never pressure the user. \
    Reply in the language the user writes in.";
