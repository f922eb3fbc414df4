//! Segment lookups used by conversion templates.
//!
//! Id lists follow the template convention of `|`-delimited strings
//! (`"PID|PV1"`). Results are keyed by segment id and hold projected
//! segments (see [`Segment::to_json`]).

use crate::model::{Hl7Message, Segment};
use serde_json::{Map, Value};

fn split_ids(ids: &str) -> Vec<&str> {
    ids.split('|').collect()
}

impl Hl7Message {
    fn indexed(&self) -> impl Iterator<Item = (usize, &str, &Segment)> + '_ {
        self.segment_ids
            .iter()
            .zip(&self.segments)
            .enumerate()
            .map(|(i, (id, segment))| (i, id.as_str(), segment))
    }

    /// First segment for each listed id that occurs in the message.
    pub fn first_segments(&self, ids: &str) -> Map<String, Value> {
        let wanted = split_ids(ids);
        let mut out = Map::new();
        for (_, id, segment) in self.indexed() {
            if wanted.contains(&id) && !out.contains_key(id) {
                out.insert(id.to_string(), segment.to_json());
            }
        }
        out
    }

    /// Every segment for each listed id, in message order.
    pub fn segment_lists(&self, ids: &str) -> Map<String, Value> {
        let wanted = split_ids(ids);
        let mut out = Map::new();
        for (_, id, segment) in self.indexed() {
            if !wanted.contains(&id) {
                continue;
            }
            if let Value::Array(list) = out
                .entry(id.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                list.push(segment.to_json());
            }
        }
        out
    }

    /// True when every listed id occurs at least once.
    pub fn has_segments(&self, ids: &str) -> bool {
        split_ids(ids)
            .iter()
            .all(|wanted| self.segment_ids.iter().any(|id| id == wanted))
    }

    /// The run of `child_id` segments that belongs to the segment at
    /// `parent_index`: the first `child_id` after the parent and every
    /// directly following `child_id`. Ids compare case-insensitively.
    ///
    /// Returns `{child_id: [..]}`, or an empty map when there is no such run.
    pub fn related_segment_list(&self, parent_index: usize, child_id: &str) -> Map<String, Value> {
        let mut out = Map::new();
        let Some(start) = self
            .indexed()
            .skip(parent_index + 1)
            .find(|(_, id, _)| id.eq_ignore_ascii_case(child_id))
            .map(|(i, _, _)| i)
        else {
            return out;
        };

        let run = self
            .indexed()
            .skip(start)
            .take_while(|(_, id, _)| id.eq_ignore_ascii_case(child_id))
            .map(|(_, _, segment)| segment.to_json())
            .collect();
        out.insert(child_id.to_string(), Value::Array(run));
        out
    }

    /// The nearest `parent_id` segment at or before the `nth` (0-based)
    /// `child_id` segment. Ids compare case-insensitively.
    ///
    /// Returns `{parent_id: segment}`, or an empty map.
    pub fn parent_segment(&self, child_id: &str, nth: usize, parent_id: &str) -> Map<String, Value> {
        let mut out = Map::new();
        let Some(child_index) = self
            .indexed()
            .filter(|(_, id, _)| id.eq_ignore_ascii_case(child_id))
            .nth(nth)
            .map(|(i, _, _)| i)
        else {
            return out;
        };

        let parent = self.segment_ids[..=child_index]
            .iter()
            .rposition(|id| id.eq_ignore_ascii_case(parent_id));
        if let Some(i) = parent {
            out.insert(parent_id.to_string(), self.segments[i].to_json());
        }
        out
    }

    /// Splits the message into one single-segment message per separator
    /// segment. When `ids` is empty or none of them occur, the whole message
    /// is returned as the only element.
    pub fn split_by_segments(&self, ids: &str) -> Vec<Hl7Message> {
        let wanted = split_ids(ids);
        if ids.is_empty() || !self.segment_ids.iter().any(|id| wanted.contains(&id.as_str())) {
            return vec![self.clone()];
        }

        self.indexed()
            .filter(|(_, id, _)| wanted.contains(id))
            .map(|(_, id, segment)| Hl7Message {
                message: self.message.clone(),
                segments: vec![segment.clone()],
                segment_ids: vec![id.to_string()],
                encoding_characters: self.encoding_characters,
            })
            .collect()
    }
}
