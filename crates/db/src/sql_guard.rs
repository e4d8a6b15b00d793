use thiserror::Error;

pub const DEFAULT_DB_QUERY: &str = "SELECT NOW() AS now_time, DATABASE() AS db_name";

const READONLY_PREFIXES: [&str; 6] = ["select", "show", "describe", "desc", "explain", "with"];
const WRITE_KEYWORDS: [&str; 10] = [
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "grant", "revoke",
    "replace",
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SqlGuardError {
    #[error("SQL 길이는 최대 {max_chars}자까지 허용해")]
    TooLong { max_chars: usize },
    #[error("한 번에 한 쿼리만 실행할 수 있어")]
    MultipleStatements,
    #[error("읽기 전용 쿼리(SELECT/SHOW/DESCRIBE/EXPLAIN/WITH)만 허용해")]
    NotReadOnly,
    #[error("쓰기/변경 쿼리는 허용하지 않아")]
    WriteKeyword,
}

/// Returns the statement to run, or the reason it was rejected.
pub fn validate_readonly_sql(raw: &str, max_chars: usize) -> Result<String, SqlGuardError> {
    let sql = raw.trim();
    if sql.is_empty() {
        return Ok(DEFAULT_DB_QUERY.to_string());
    }

    if sql.chars().count() > max_chars.max(1) {
        return Err(SqlGuardError::TooLong { max_chars });
    }

    let sql = match sql.strip_suffix(';') {
        Some(stripped) => stripped.trim(),
        None => sql,
    };
    if sql.contains(';') {
        return Err(SqlGuardError::MultipleStatements);
    }

    let lowered = sql.to_lowercase();
    if !READONLY_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return Err(SqlGuardError::NotReadOnly);
    }
    if contains_write_keyword(&lowered) {
        return Err(SqlGuardError::WriteKeyword);
    }

    Ok(sql.to_string())
}

fn contains_write_keyword(lowered: &str) -> bool {
    lowered
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .any(|word| WRITE_KEYWORDS.contains(&word))
}
