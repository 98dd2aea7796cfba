//! Helper functions available inside templates.
//!
//! Helpers never fail a render on bad input: they log and fall back to an empty (or epoch) value.
//! Times are exchanged as RFC3339 strings.

use crate::core::codec;
use crate::core::data::Payload;
use crate::core::types::content_type;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use handlebars::{handlebars_helper, Handlebars};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write;

const EPOCH_MARKER: &str = "1970-01-01T00:00:00Z";

pub fn register(handlebars: &mut Handlebars<'_>) {
    handlebars.register_helper("match", Box::new(match_helper));
    handlebars.register_helper("capture", Box::new(capture_helper));
    handlebars.register_helper("now", Box::new(now_helper));
    handlebars.register_helper("rfc3339", Box::new(rfc3339_helper));
    handlebars.register_helper("strftime", Box::new(strftime_helper));
    handlebars.register_helper("strptime", Box::new(strptime_helper));
    handlebars.register_helper("in", Box::new(in_helper));
    handlebars.register_helper("toJSON", Box::new(to_json_helper));
    handlebars.register_helper("toYAML", Box::new(to_yaml_helper));
    handlebars.register_helper("toXML", Box::new(to_xml_helper));
    handlebars.register_helper("hex", Box::new(hex_helper));
    handlebars.register_helper("unhex", Box::new(unhex_helper));
    handlebars.register_helper("base64", Box::new(base64_helper));
    handlebars.register_helper("unbase64", Box::new(unbase64_helper));
}

handlebars_helper!(match_helper: |pattern: str, input: str| regex_match(pattern, input));
handlebars_helper!(capture_helper: |pattern: str, input: str| regex_capture(pattern, input));
handlebars_helper!(now_helper: |*_args| format_time(&Utc::now()));
handlebars_helper!(rfc3339_helper: |time: Json| normalize_time(time));
handlebars_helper!(strftime_helper: |format: str, time: str| strftime(format, time));
handlebars_helper!(strptime_helper: |format: str, input: str| strptime(format, input));
handlebars_helper!(in_helper: |value: Json, set: Json| contains(set, value));
handlebars_helper!(to_json_helper: |value: Json| to_json(value));
handlebars_helper!(to_yaml_helper: |value: Json| to_yaml(value));
handlebars_helper!(to_xml_helper: |value: Json| to_xml(value));
handlebars_helper!(hex_helper: |text: str| hex::encode(text));
handlebars_helper!(unhex_helper: |text: str| decode_text("unhex", hex::decode(text).map_err(|e| e.to_string())));
handlebars_helper!(base64_helper: |text: str| STANDARD.encode(text));
handlebars_helper!(unbase64_helper: |text: str| decode_text("unbase64", STANDARD.decode(text).map_err(|e| e.to_string())));

fn regex_match(pattern: &str, input: &str) -> bool {
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(input),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid regex in template");
            false
        }
    }
}

/// Group index ("0", "1", ...) and group name to matched text. Groups that did not take part in
/// the match map to an empty string.
fn regex_capture(pattern: &str, input: &str) -> Value {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid regex in template");
            return Value::Object(Map::new());
        }
    };
    let mut groups = Map::new();
    if let Some(captures) = regex.captures(input) {
        for (index, name) in regex.capture_names().enumerate() {
            let found = captures.get(index).map_or("", |found| found.as_str());
            groups.insert(index.to_string(), Value::String(found.to_string()));
            if let Some(name) = name {
                groups.insert(name.to_string(), Value::String(found.to_string()));
            }
        }
    }
    Value::Object(groups)
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Accepts an RFC3339 string or unix seconds.
fn normalize_time(time: &Value) -> String {
    let parsed = match time {
        Value::String(text) => parse_time(text),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    match parsed {
        Some(time) => format_time(&time),
        None => {
            tracing::warn!(value = %time, "rfc3339 helper received an invalid time");
            String::new()
        }
    }
}

fn strftime(format: &str, time: &str) -> String {
    let Some(time) = parse_time(time) else {
        tracing::warn!(time, "strftime helper received an invalid time");
        return String::new();
    };
    let mut out = String::new();
    if write!(out, "{}", time.format(format)).is_err() {
        tracing::warn!(format, "strftime helper received an invalid format");
        return String::new();
    }
    out
}

fn strptime(format: &str, input: &str) -> String {
    if let Ok(time) = DateTime::parse_from_str(input, format) {
        return format_time(&time.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
        return format_time(&naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(input, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return format_time(&naive.and_utc());
    }
    tracing::debug!(format, input, "strptime could not parse input");
    EPOCH_MARKER.to_string()
}

fn contains(set: &Value, value: &Value) -> bool {
    match set {
        Value::Array(items) => items.contains(value),
        Value::Object(map) => value.as_str().is_some_and(|key| map.contains_key(key)),
        Value::String(text) => value.as_str().is_some_and(|needle| text.contains(needle)),
        _ => false,
    }
}

fn to_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "toJSON failed");
        String::new()
    })
}

fn to_yaml(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "toYAML failed");
        String::new()
    })
}

fn to_xml(value: &Value) -> String {
    match codec::encode(content_type::XML, &Payload::Structured(value.clone())) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::warn!(error = %err, "toXML failed");
            String::new()
        }
    }
}

fn decode_text(helper: &str, decoded: Result<Vec<u8>, String>) -> String {
    match decoded.map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            tracing::warn!(helper, error = %err, "decoded bytes are not UTF-8");
            String::new()
        }
        Err(err) => {
            tracing::warn!(helper, error = %err, "decode failed");
            String::new()
        }
    }
}
