pub const MEDIA_CATEGORIES: &[&str] = &[
    "sexual_content",
    "nudity",
    "child_safety",
    "violence",
    "graphic_violence",
    "hate_symbols",
    "harassment",
    "self_harm",
    "drugs",
    "weapons",
    "minors",
    "sensitive_pii",
    "political_content",
    "medical",
    "spam_scam",
];

pub fn build_summary_prompt(title: &str, chats: &[String]) -> String {
    let transcript = chats
        .iter()
        .filter(|chat| !chat.is_empty())
        .map(|chat| format!("- {}", chat))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::with_capacity(transcript.len() + title.len() + 400);
    prompt.push_str(
        "You are a moderator aide. Given a post title and its chat transcript, \
         produce: (1) 2-4 bullet summary for quick review, (2) a single-sentence \
         main problem statement, and (3) 3-5 succinct core solutions. \
         Return only compact JSON with keys summary (array of strings), \
         main_problem (string), and solutions (array of strings). No markdown.\n",
    );
    prompt.push_str("Post title: ");
    prompt.push_str(title);
    prompt.push_str("\nChats:\n");
    prompt.push_str(&transcript);
    prompt
}

pub fn build_media_prompt() -> String {
    format!(
        "You are a content safety classifier. Analyze the provided image and return STRICT JSON only. \
         Schema: {{overall_risk: 'low'|'medium'|'high', categories: [{{name: string, likelihood: \
         'VERY_UNLIKELY'|'UNLIKELY'|'POSSIBLE'|'LIKELY'|'VERY_LIKELY'}}], notes: string[]}} \
         Categories to consider: {}. \
         Focus on likelihoods and concise notes for moderators.",
        MEDIA_CATEGORIES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_lists_non_empty_chats() {
        let chats = vec!["first".to_string(), String::new(), "second".to_string()];
        let prompt = build_summary_prompt("Broken login", &chats);
        assert!(prompt.contains("Post title: Broken login\n"));
        assert!(prompt.ends_with("Chats:\n- first\n- second"));
        assert!(prompt.contains("main_problem (string)"));
    }

    #[test]
    fn media_prompt_names_schema_and_categories() {
        let prompt = build_media_prompt();
        assert!(prompt.contains("{overall_risk: 'low'|'medium'|'high'"));
        assert!(prompt.contains("sexual_content, nudity"));
        assert!(prompt.contains("spam_scam."));
    }
}
