const LABEL_MAX_CHARS: usize = 50;
const LABEL_KEEP_CHARS: usize = 47;

/// First line of the trimmed text, shortened to fit the history list.
pub fn derive_label(text: &str) -> String {
    let first_line = text.trim().lines().next().unwrap_or_default().trim_end();
    truncate_label(first_line)
}

pub fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(LABEL_KEEP_CHARS).collect();
    short.push_str("...");
    short
}
