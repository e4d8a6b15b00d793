use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;

use crate::executor::QueryRows;

pub const EMPTY_RESULT_REPLY: &str = "DB 조회 결과가 없어";
const TRUNCATION_SUFFIX: &str = "...(truncated)";

/// Renders fetched rows as the Slack reply body.
pub fn format_query_report(result: &QueryRows, max_result_chars: usize) -> String {
    if result.rows.is_empty() {
        return EMPTY_RESULT_REPLY.to_string();
    }

    let rows: Vec<Value> = result.rows.iter().cloned().map(Value::Object).collect();
    let payload = to_spaced_json(&Value::Array(rows));
    let payload = truncate_chars(&payload, max_result_chars);

    let shown = result.rows.len();
    let summary = if result.total_rows > shown {
        format!("DB 조회 결과 {}건 중 {shown}건만 보여줄게", result.total_rows)
    } else {
        format!("DB 조회 결과 {shown}건")
    };

    format!("{summary}\n```json\n{payload}\n```")
}

/// Writes `", "` between items and `": "` after keys, like Python's `json.dumps` defaults.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn to_spaced_json(value: &Value) -> String {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buffer).unwrap_or_else(|_| value.to_string())
}

fn truncate_chars(payload: &str, max_chars: usize) -> String {
    match payload.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_SUFFIX}", &payload[..cut]),
        None => payload.to_string(),
    }
}
