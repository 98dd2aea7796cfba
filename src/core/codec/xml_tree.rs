//! XML <-> tree mapping.
//!
//! Decoding produces `{root_name: element}` where an element is
//! - `null` when it has no attributes, children or text,
//! - a string when it only carries text,
//! - otherwise a mapping with `@name` keys for attributes, one key per child element
//!   (repeated children collapse into a sequence) and `#text` for any text content.
//!
//! Encoding applies the same rules in reverse. A mapping with exactly one element key becomes the
//! document root; anything else is wrapped in `<root>` (sequence items as `<item>`).

use super::CodecError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

const TEXT_KEY: &str = "#text";
const ATTR_PREFIX: char = '@';
const WRAPPER_ROOT: &str = "root";
const WRAPPER_ITEM: &str = "item";

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = format!(
                "{}{}",
                ATTR_PREFIX,
                String::from_utf8_lossy(attr.key.as_ref())
            );
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            fields.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    /// Text runs split by child elements are joined with a single space.
    fn push_text(&mut self, run: &str) {
        let run = run.trim();
        if run.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(run);
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn close(self) -> (String, Value) {
        let Element {
            name,
            mut fields,
            text,
        } = self;
        let value = if fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(fields)
        };
        (name, value)
    }
}

fn xml_error<E: std::fmt::Display>(err: E) -> CodecError {
    CodecError::Xml(err.to_string())
}

pub(super) fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let source = std::str::from_utf8(bytes).map_err(xml_error)?;
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CodecError::Xml("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let run = text.unescape().map_err(xml_error)?;
                match stack.last_mut() {
                    Some(current) => current.push_text(&run),
                    None if run.trim().is_empty() => {}
                    None => {
                        return Err(CodecError::Xml(
                            "text outside the root element".to_string(),
                        ))
                    }
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodecError::Xml(format!("unclosed element <{}>", open.name)));
    }
    let (name, value) =
        root.ok_or_else(|| CodecError::Xml("document has no root element".to_string()))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
    element: Element,
) -> Result<(), CodecError> {
    let (name, value) = element.close();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None if root.is_none() => *root = Some((name, value)),
        None => {
            return Err(CodecError::Xml(format!(
                "multiple root elements (second is <{}>)",
                name
            )))
        }
    }
    Ok(())
}

pub(super) fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new(Vec::new());
    match value {
        Value::Object(map) if map.len() == 1 && is_element_key(map.keys().next()) => {
            for (name, inner) in map {
                write_element(&mut writer, name, inner)?;
            }
        }
        Value::Array(items) => {
            let mut wrapper = Map::new();
            wrapper.insert(WRAPPER_ITEM.to_string(), Value::Array(items.clone()));
            write_element(&mut writer, WRAPPER_ROOT, &Value::Object(wrapper))?;
        }
        other => write_element(&mut writer, WRAPPER_ROOT, other)?,
    }
    Ok(writer.into_inner())
}

fn is_element_key(key: Option<&String>) -> bool {
    key.map(|key| !key.starts_with(ATTR_PREFIX) && key != TEXT_KEY)
        .unwrap_or(false)
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), CodecError> {
    if name.is_empty() {
        return Err(CodecError::Shape("xml element name must not be empty".to_string()));
    }
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Value::Null => {
            writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(xml_error)?;
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(name);
            for (key, attr) in map {
                if let Some(attr_name) = key.strip_prefix(ATTR_PREFIX) {
                    let text = scalar_text(attr);
                    start.push_attribute((attr_name, text.as_str()));
                }
            }
            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            for (key, child) in map {
                if key.starts_with(ATTR_PREFIX) {
                    continue;
                }
                if key == TEXT_KEY {
                    let text = scalar_text(child);
                    writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(xml_error)?;
                } else {
                    write_element(writer, key, child)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)?;
        }
        scalar => {
            let text = scalar_text(scalar);
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)?;
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
