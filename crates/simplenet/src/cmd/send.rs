use std::time::Duration;

use serde_json::Value;
use simplenet_peer::{Client, ClientConfig};

use crate::cmd::SendArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let mut config =
        ClientConfig::new(args.host.clone(), args.port).with_connect_timeout(wait_timeout);
    if args.wait {
        config = config.with_read_timeout(wait_timeout);
    }

    let mut client = Client::with_config(config);
    client
        .connect()
        .map_err(|err| peer_error("connect failed", err))?;
    client
        .send(&payload)
        .map_err(|err| peer_error("send failed", err))?;

    if args.wait {
        let reply = client
            .read()
            .map_err(|err| peer_error("receive failed", err))?;
        print_value(&reply, format);
    }

    client
        .close()
        .map_err(|err| peer_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Value> {
    if let Some(json) = &args.json {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
    }
    if let Some(data) = &args.data {
        return Ok(Value::String(data.clone()));
    }
    Err(CliError::new(USAGE, "one of --json or --data is required"))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(json: Option<&str>, data: Option<&str>) -> SendArgs {
        SendArgs {
            port: 2131,
            host: "127.0.0.1".to_string(),
            json: json.map(str::to_string),
            data: data.map(str::to_string),
            wait: false,
            wait_timeout: "5s".to_string(),
        }
    }

    #[test]
    fn payload_from_json_or_text() {
        assert_eq!(
            resolve_payload(&args(Some(r#"{"a":[1]}"#), None)).unwrap(),
            json!({"a": [1]})
        );
        assert_eq!(
            resolve_payload(&args(None, Some("{not json"))).unwrap(),
            json!("{not json")
        );
    }

    #[test]
    fn invalid_json_is_a_usage_error() {
        let err = resolve_payload(&args(Some("{nope"), None)).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration(" ").is_err());
    }
}
