//! Parsing of raw mention text into the pieces the router branches on.

const BARCODE_DIGITS: usize = 11;
const LOOKUP_SUFFIXES: [&str; 5] = ["", "조회", "조회해줘", "확인", "확인해줘"];
const DB_TRIGGER_SPACED: &str = "db 조회";
const DB_TRIGGER_COMPACT: &str = "db조회";

/// Removes every `<@...>` user tag and trims the rest.
pub fn extract_question(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<@") {
        let after_open = &rest[start + 2..];
        match after_open.find('>') {
            Some(end) if end > 0 => {
                output.push_str(&rest[..start]);
                rest = &after_open[end + 1..];
            }
            _ => {
                output.push_str(&rest[..start + 2]);
                rest = after_open;
            }
        }
    }
    output.push_str(rest);

    output.trim().to_string()
}

/// First run of exactly eleven ASCII digits with no digit on either side.
pub fn extract_barcode(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }
        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        if index - start == BARCODE_DIGITS {
            return Some(&text[start..index]);
        }
    }

    None
}

pub fn should_lookup_barcode(question: &str, barcode: &str) -> bool {
    let normalized = question.trim();
    if normalized == barcode {
        return true;
    }
    if let Some(suffix) = normalized.strip_prefix(barcode) {
        if LOOKUP_SUFFIXES.contains(&suffix.trim()) {
            return true;
        }
    }
    normalized.contains("바코드") || normalized.to_lowercase().contains("barcode")
}

/// SQL text following a `db 조회` / `db조회` trigger, if the question starts with one.
pub fn extract_db_query(question: &str) -> Option<String> {
    let normalized = question.trim();

    for trigger in [DB_TRIGGER_SPACED, DB_TRIGGER_COMPACT] {
        let width = trigger.chars().count();
        let head: String = normalized.chars().take(width).collect();
        if head.to_lowercase() == trigger {
            let rest: String = normalized.chars().skip(width).collect();
            return Some(rest.trim().to_string());
        }
    }

    None
}

pub fn format_reply_text(author_id: Option<&str>, text: &str) -> String {
    let clean = text.trim();
    match author_id {
        Some(author) if !clean.is_empty() && !author.is_empty() => format!("<@{author}> {clean}"),
        _ => clean.to_string(),
    }
}
