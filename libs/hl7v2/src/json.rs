//! Template-facing JSON shape of a parsed message.
//!
//! Positions become string keys (`"0"`, `"1"`, ...) so templates can address
//! fields the HL7 way, e.g. `PID.3.1.Value`.

use crate::model::{Component, Field, Hl7Message, Segment};
use serde_json::{json, Map, Value};

impl Segment {
    /// `{"Value": <normalized text>, "0": <id field>, "1": ..., ...}`
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("Value".into(), Value::String(self.normalized_text.clone()));
        for (i, field) in self.fields.iter().enumerate() {
            out.insert(i.to_string(), field_json(field.as_ref()));
        }
        Value::Object(out)
    }
}

impl Field {
    /// `{"Value", "Repeats"?, "0": {}, "1": <component>, ...}`
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("Value".into(), Value::String(self.value.clone()));
        if !self.repeats.is_empty() {
            let repeats = self.repeats.iter().map(Field::to_json).collect();
            out.insert("Repeats".into(), Value::Array(repeats));
        }
        out.insert("0".into(), json!({}));
        for (i, component) in self.components.iter().enumerate() {
            out.insert((i + 1).to_string(), component_json(component.as_ref()));
        }
        Value::Object(out)
    }
}

impl Component {
    /// `{"Value", "1": <subcomponent>, ...}`; subcomponents that are absent
    /// or equal to the component value are left out.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("Value".into(), Value::String(self.value.clone()));
        for (i, sub) in self.subcomponents.iter().enumerate() {
            if let Some(sub) = sub {
                if *sub != self.value {
                    out.insert((i + 1).to_string(), Value::String(sub.clone()));
                }
            }
        }
        Value::Object(out)
    }
}

fn field_json(field: Option<&Field>) -> Value {
    field.map_or_else(|| json!({}), Field::to_json)
}

fn component_json(component: Option<&Component>) -> Value {
    component.map_or_else(|| json!({}), Component::to_json)
}

impl Hl7Message {
    /// Summary document used by the CLI: encoding characters, the segment id
    /// index and every projected segment.
    pub fn to_json(&self) -> Value {
        json!({
            "encodingCharacters": self.encoding_characters,
            "segmentIds": self.segment_ids,
            "segments": self.segments.iter().map(Segment::to_json).collect::<Vec<_>>(),
        })
    }
}
