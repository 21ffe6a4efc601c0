use chatworlds_types::DEFAULT_THREAD_TITLE;

const MAX_TITLE_CHARS: usize = 50;
const TRUNCATED_CHARS: usize = 47;

/// Thread title for a conversation started by `content`.
///
/// Counts characters, not bytes: up to 50 the content is used as is, longer
/// content keeps its first 47 characters followed by `...`.
pub fn derive_title(content: &str) -> String {
    if content.is_empty() {
        return DEFAULT_THREAD_TITLE.to_string();
    }

    if content.chars().count() <= MAX_TITLE_CHARS {
        return content.to_string();
    }

    let mut title: String = content.chars().take(TRUNCATED_CHARS).collect();
    title.push_str("...");
    title
}
