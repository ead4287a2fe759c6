use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use simplenet_peer::Event;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    #[serde(flatten)]
    event: &'a Event,
    timestamp: String,
}

#[derive(Serialize)]
struct ValueOutput<'a> {
    data: &'a Value,
    timestamp: String,
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                event,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "CLIENT", "DETAIL"])
                .add_row(vec![
                    event.tag().to_string(),
                    event.client_id().to_string(),
                    event_detail(event),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{event}"),
        OutputFormat::Raw => {
            if let Event::Message { data, .. } = event {
                print_raw_line(data);
            }
        }
    }
}

pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ValueOutput {
                data: value,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "DATA"])
                .add_row(vec![value_kind(value).to_string(), value_text(value)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value_text(value))
            );
        }
        OutputFormat::Raw => print_raw_line(value),
    }
}

pub fn print_raw_line(value: &Value) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{}", value_text(value));
    let _ = out.flush();
}

/// Strings are shown without quotes; everything else as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn event_detail(event: &Event) -> String {
    match event {
        Event::NewConnection { host, port, .. } => format!("{host}:{port}"),
        Event::Disconnection { .. } => String::new(),
        Event::Message { data, .. } => value_text(data),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_output_carries_tag_and_timestamp() {
        let event = Event::Message {
            from_client_id: 4,
            data: json!({"k": "v"}),
        };
        let out = EventOutput {
            event: &event,
            timestamp: "1".to_string(),
        };
        let encoded = serde_json::to_value(&out).unwrap();

        assert_eq!(
            encoded,
            json!({"type": "msg", "from_client_id": 4, "data": {"k": "v"}, "timestamp": "1"})
        );
    }

    #[test]
    fn value_text_unquotes_strings_only() {
        assert_eq!(value_text(&json!("plain")), "plain");
        assert_eq!(value_text(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(value_kind(&json!(null)), "null");
    }

    #[test]
    fn event_detail_by_kind() {
        let connect = Event::NewConnection {
            client_id: 1,
            host: "::1".to_string(),
            port: 9,
        };
        assert_eq!(event_detail(&connect), "::1:9");
        assert_eq!(event_detail(&Event::Disconnection { client_id: 1 }), "");
    }
}
