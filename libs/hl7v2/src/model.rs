use crate::encoding::EncodingCharacters;

/// A parsed HL7v2 message.
///
/// `segment_ids` runs parallel to `segments`: `segment_ids[i]` is the id of
/// `segments[i]`, duplicates included.
#[derive(Debug, Clone, PartialEq)]
pub struct Hl7Message {
    pub message: String,
    pub segments: Vec<Segment>,
    pub segment_ids: Vec<String>,
    pub encoding_characters: EncodingCharacters,
}

/// One segment. `fields[0]` is the segment id, so `fields[n]` is HL7 field
/// `n` (e.g. `PID-3` is `fields[3]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub normalized_text: String,
    pub fields: Vec<Option<Field>>,
}

/// A present field. Absent fields are `None` in [`Segment::fields`].
///
/// `components` mirror the first repeat. `repeats` is filled only when the
/// raw field contains the repetition separator.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub value: String,
    pub repeats: Vec<Field>,
    pub components: Vec<Option<Component>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub value: String,
    pub subcomponents: Vec<Option<String>>,
}

impl Hl7Message {
    /// First segment with the given id.
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments_by_id(id).next()
    }

    /// All segments with the given id, in message order.
    pub fn segments_by_id<'a, 'b>(&'a self, id: &'b str) -> impl Iterator<Item = &'a Segment> + 'b
    where
        'a: 'b,
    {
        self.segment_ids
            .iter()
            .zip(&self.segments)
            .filter(move |(sid, _)| sid.as_str() == id)
            .map(|(_, segment)| segment)
    }

    /// The header segment (always the first one).
    pub fn header(&self) -> Option<&Segment> {
        self.segments.first()
    }
}

impl Segment {
    pub fn id(&self) -> &str {
        self.fields
            .first()
            .and_then(|f| f.as_ref())
            .map(|f| f.value.as_str())
            .unwrap_or_default()
    }

    /// HL7 field at 1-based `position`; position 0 is the segment id.
    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields.get(position).and_then(Option::as_ref)
    }
}

impl Field {
    /// Component at 1-based `position` of the first repeat. Position 0 is the
    /// addressing sentinel and is always `None`.
    pub fn component(&self, position: usize) -> Option<&Component> {
        position
            .checked_sub(1)
            .and_then(|i| self.components.get(i))
            .and_then(Option::as_ref)
    }

    /// Repeat at 0-based `index`. A field without repetition separators is
    /// its own single repeat.
    pub fn repeat(&self, index: usize) -> Option<&Field> {
        if self.repeats.is_empty() {
            return (index == 0).then_some(self);
        }
        self.repeats.get(index)
    }
}

impl Component {
    /// Subcomponent at 1-based `position`; position 0 is the sentinel.
    pub fn subcomponent(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.subcomponents.get(i))
            .and_then(|s| s.as_deref())
    }
}
