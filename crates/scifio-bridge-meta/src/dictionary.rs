use std::collections::HashMap;

use scifio_bridge_frame::FrameSentinel;
use tracing::debug;

use crate::error::{MetaError, Result};
use crate::escape::{escape, unescape};
use crate::value::MetadataValue;

/// Ordered key/value metadata decoded from one `info` frame.
///
/// Keys are unique and the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDictionary {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl MetadataDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a metadata frame.
    ///
    /// Lines alternate key, value. Empty lines where a key is expected are
    /// padding; a key followed by an empty line is dropped.
    pub fn parse(text: &str, sentinel: FrameSentinel) -> Self {
        let mut dict = Self::new();
        let mut lines = text.split(sentinel.line_terminator());
        while let Some(key) = lines.next() {
            if key.is_empty() {
                continue;
            }
            match lines.next() {
                Some(value) if !value.is_empty() => {
                    dict.insert(key, unescape(value));
                }
                _ => debug!(key, "metadata key without a value ignored"),
            }
        }
        dict
    }

    /// Insert a value unless the key is already present.
    ///
    /// Returns `false` (and keeps the existing value) for a duplicate key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.index.contains_key(&key) {
            debug!(
                key = %key,
                value = %value,
                "metadata ignored because the key is already defined"
            );
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a required value.
    pub fn get_typed<T: MetadataValue>(&self, key: &str) -> Result<T> {
        let raw = self
            .get(key)
            .ok_or_else(|| MetaError::MissingKey(key.to_string()))?;
        convert(key, raw)
    }

    /// Parse an optional value. Absent keys give `None`; malformed ones still fail.
    pub fn get_optional<T: MetadataValue>(&self, key: &str) -> Result<Option<T>> {
        self.get(key).map(|raw| convert(key, raw)).transpose()
    }

    /// Encode back into a frame, sentinel included.
    pub fn to_frame(&self, sentinel: FrameSentinel) -> String {
        let terminator = sentinel.line_terminator();
        if self.entries.is_empty() {
            return terminator.repeat(2);
        }
        let mut frame = String::new();
        for (key, value) in &self.entries {
            frame.push_str(key);
            frame.push_str(terminator);
            frame.push_str(&escape(value));
            frame.push_str(terminator);
        }
        frame.push_str(terminator);
        frame
    }
}

fn convert<T: MetadataValue>(key: &str, raw: &str) -> Result<T> {
    T::parse_value(raw).ok_or_else(|| MetaError::Conversion {
        key: key.to_string(),
        value: raw.to_string(),
        ty: T::TYPE_NAME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let dict = MetadataDictionary::parse("SizeX\n10\n\nSizeX\n20\n\n", FrameSentinel::Lf);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get_typed::<i64>("SizeX").unwrap(), 10);
    }

    #[test]
    fn preserves_insertion_order() {
        let dict = MetadataDictionary::parse("b\n2\na\n1\nc\n3\n\n", FrameSentinel::Lf);
        let keys: Vec<&str> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn values_are_unescaped() {
        let dict =
            MetadataDictionary::parse("Comment\nfirst\\nsecond\nPath\nC:\\\\data\n\n", FrameSentinel::Lf);
        assert_eq!(dict.get("Comment"), Some("first\nsecond"));
        assert_eq!(dict.get("Path"), Some("C:\\data"));
    }

    #[test]
    fn key_with_empty_value_is_dropped() {
        let dict = MetadataDictionary::parse("Empty\n\nSizeY\n4\n\n", FrameSentinel::Lf);
        assert!(!dict.contains_key("Empty"));
        assert_eq!(dict.get("SizeY"), Some("4"));
    }

    #[test]
    fn crlf_frames() {
        let dict = MetadataDictionary::parse("SizeX\r\n7\r\nSizeY\r\n8\r\n\r\n", FrameSentinel::CrLf);
        assert_eq!(dict.get("SizeX"), Some("7"));
        assert_eq!(dict.get("SizeY"), Some("8"));
    }

    #[test]
    fn typed_access_errors() {
        let dict = MetadataDictionary::parse("SizeX\nten\n\n", FrameSentinel::Lf);
        assert!(matches!(
            dict.get_typed::<i64>("SizeX"),
            Err(MetaError::Conversion { ty: "i64", .. })
        ));
        assert!(matches!(
            dict.get_typed::<i64>("SizeY"),
            Err(MetaError::MissingKey(key)) if key == "SizeY"
        ));
        assert_eq!(dict.get_optional::<bool>("UseLUT").unwrap(), None);
    }

    #[test]
    fn frame_round_trip() {
        let frame = "PixelType\n1\nComment\na\\\\b\\nc\nSizeX\n10\n\n";
        let dict = MetadataDictionary::parse(frame, FrameSentinel::Lf);
        assert_eq!(dict.to_frame(FrameSentinel::Lf), frame);
    }

    #[test]
    fn empty_dictionary_encodes_as_sentinel() {
        let dict = MetadataDictionary::new();
        assert_eq!(dict.to_frame(FrameSentinel::CrLf), "\r\n\r\n");
        assert!(dict.is_empty());
    }
}
