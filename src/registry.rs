//! Bounded label registry for ad-hoc typed messaging
//!
//! The host and device exchange free-form values outside the fixed
//! channel set by naming them with a short text label. The registry
//! assigns each (label, content type) pair a stable small-integer ID
//! for the lifetime of the session. ID 0 is reserved to mean
//! "no match / registry full", so external IDs are slot index + 1.

use crate::config::registry::{CONTENT_SIZE, LABEL_SIZE, SLOTS};

/// External ID meaning "no match" or "registry full".
pub const NO_ID: u8 = 0;

/// Content type of a labeled value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Number = 1,
    Text = 2,
}

impl ContentType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Number),
            2 => Some(Self::Text),
            _ => None,
        }
    }
}

/// Errors from typed content access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The ID does not name an occupied slot
    UnknownId,
    /// The slot holds the other content type
    TypeMismatch,
    /// Text content is not valid UTF-8
    InvalidText,
}

/// One registry slot. A slot is empty iff `label[0] == 0`.
#[derive(Clone, Copy)]
struct LabelEntry {
    label: [u8; LABEL_SIZE],
    content_type: ContentType,
    // One spare byte keeps text content NUL-terminated at full length.
    content: [u8; CONTENT_SIZE + 1],
}

impl LabelEntry {
    const EMPTY: Self = Self {
        label: [0; LABEL_SIZE],
        content_type: ContentType::Number,
        content: [0; CONTENT_SIZE + 1],
    };

    fn is_empty(&self) -> bool {
        self.label[0] == 0
    }
}

/// Fixed-size associative table of labeled values.
pub struct LabelRegistry {
    slots: [LabelEntry; SLOTS],
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self {
            slots: [LabelEntry::EMPTY; SLOTS],
        }
    }

    /// Find the ID registered for (label, type), if any.
    ///
    /// Labels compare over the full fixed width, NUL-padded, so a query
    /// label longer than [`LABEL_SIZE`] is truncated the same way
    /// registration truncated it.
    pub fn find(&self, label: &[u8], content_type: ContentType) -> Option<u8> {
        let padded = pad_label(label);
        self.slots
            .iter()
            .position(|slot| {
                !slot.is_empty() && slot.content_type == content_type && slot.label == padded
            })
            .map(|idx| (idx + 1) as u8)
    }

    /// Return the ID for (label, type), allocating a slot on first use.
    ///
    /// Idempotent: re-registering an existing pair returns the same ID.
    /// Returns [`NO_ID`] when every slot is occupied by another pair.
    pub fn register(&mut self, label: &[u8], content_type: ContentType) -> u8 {
        if label.is_empty() || label[0] == 0 {
            return NO_ID;
        }
        if let Some(id) = self.find(label, content_type) {
            return id;
        }
        match self.slots.iter().position(LabelEntry::is_empty) {
            Some(idx) => {
                self.slots[idx].label = pad_label(label);
                self.slots[idx].content_type = content_type;
                self.slots[idx].content = [0; CONTENT_SIZE + 1];
                (idx + 1) as u8
            }
            None => {
                log::debug!("label registry full");
                NO_ID
            }
        }
    }

    /// Overwrite the content of slot `id`. Returns false for an ID that
    /// does not name an occupied slot.
    pub fn ingest(&mut self, id: u8, content: &[u8]) -> bool {
        let Some(slot) = self.occupied_mut(id) else {
            return false;
        };
        slot.content = [0; CONTENT_SIZE + 1];
        let len = content.len().min(CONTENT_SIZE);
        slot.content[..len].copy_from_slice(&content[..len]);
        true
    }

    /// Content type stored in slot `id`.
    pub fn content_type(&self, id: u8) -> Option<ContentType> {
        self.occupied(id).map(|slot| slot.content_type)
    }

    /// Label stored in slot `id`, NUL-padded to fixed width.
    pub fn label(&self, id: u8) -> Option<&[u8; LABEL_SIZE]> {
        self.occupied(id).map(|slot| &slot.label)
    }

    /// Read slot `id` as a little-endian f32.
    pub fn read_as_number(&self, id: u8) -> Result<f32, RegistryError> {
        let slot = self.occupied(id).ok_or(RegistryError::UnknownId)?;
        if slot.content_type != ContentType::Number {
            return Err(RegistryError::TypeMismatch);
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&slot.content[..4]);
        Ok(f32::from_le_bytes(raw))
    }

    /// Read slot `id` as a NUL-terminated string.
    pub fn read_as_text(&self, id: u8) -> Result<&str, RegistryError> {
        let slot = self.occupied(id).ok_or(RegistryError::UnknownId)?;
        if slot.content_type != ContentType::Text {
            return Err(RegistryError::TypeMismatch);
        }
        let len = slot
            .content
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CONTENT_SIZE);
        core::str::from_utf8(&slot.content[..len]).map_err(|_| RegistryError::InvalidText)
    }

    fn occupied(&self, id: u8) -> Option<&LabelEntry> {
        if id == NO_ID || id as usize > SLOTS {
            return None;
        }
        let slot = &self.slots[id as usize - 1];
        (!slot.is_empty()).then_some(slot)
    }

    fn occupied_mut(&mut self, id: u8) -> Option<&mut LabelEntry> {
        if id == NO_ID || id as usize > SLOTS {
            return None;
        }
        let slot = &mut self.slots[id as usize - 1];
        (!slot.is_empty()).then_some(slot)
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn pad_label(label: &[u8]) -> [u8; LABEL_SIZE] {
    let mut padded = [0u8; LABEL_SIZE];
    let len = label.len().min(LABEL_SIZE);
    padded[..len].copy_from_slice(&label[..len]);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = LabelRegistry::new();
        assert_eq!(registry.register(b"temp", ContentType::Number), 1);
        assert_eq!(registry.register(b"name", ContentType::Text), 2);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"temp", ContentType::Number);
        assert_eq!(registry.register(b"temp", ContentType::Number), id);
        // No second slot was consumed.
        assert_eq!(registry.register(b"other", ContentType::Number), id + 1);
    }

    #[test]
    fn test_same_label_different_type_gets_own_slot() {
        let mut registry = LabelRegistry::new();
        let number_id = registry.register(b"value", ContentType::Number);
        let text_id = registry.register(b"value", ContentType::Text);
        assert_ne!(number_id, text_id);
    }

    #[test]
    fn test_exhaustion_returns_no_id() {
        let mut registry = LabelRegistry::new();
        for i in 0..SLOTS as u8 {
            let label = [b'a' + i];
            assert_ne!(registry.register(&label, ContentType::Number), NO_ID);
        }
        assert_eq!(registry.register(b"overflow", ContentType::Number), NO_ID);
        // Existing pairs still resolve after exhaustion.
        assert_eq!(registry.register(b"a", ContentType::Number), 1);
    }

    #[test]
    fn test_find_unknown_label() {
        let registry = LabelRegistry::new();
        assert_eq!(registry.find(b"none", ContentType::Number), None);
    }

    #[test]
    fn test_ingest_and_read_number() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"speed", ContentType::Number);
        assert!(registry.ingest(id, &12.5f32.to_le_bytes()));
        assert_eq!(registry.read_as_number(id), Ok(12.5));
    }

    #[test]
    fn test_ingest_and_read_text() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"greeting", ContentType::Text);
        assert!(registry.ingest(id, b"hello"));
        assert_eq!(registry.read_as_text(id), Ok("hello"));
    }

    #[test]
    fn test_ingest_truncates_to_content_size() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"long", ContentType::Text);
        assert!(registry.ingest(id, b"0123456789abcdef"));
        assert_eq!(registry.read_as_text(id), Ok("0123456789a"));
    }

    #[test]
    fn test_ingest_overwrites_previous_content() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"msg", ContentType::Text);
        registry.ingest(id, b"first message");
        registry.ingest(id, b"hi");
        assert_eq!(registry.read_as_text(id), Ok("hi"));
    }

    #[test]
    fn test_typed_read_checks_stored_type() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"temp", ContentType::Number);
        registry.ingest(id, &1.0f32.to_le_bytes());
        assert_eq!(registry.read_as_text(id), Err(RegistryError::TypeMismatch));
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let registry = LabelRegistry::new();
        assert_eq!(registry.read_as_number(NO_ID), Err(RegistryError::UnknownId));
        assert_eq!(registry.read_as_number(1), Err(RegistryError::UnknownId));
        assert_eq!(
            registry.read_as_number(SLOTS as u8 + 1),
            Err(RegistryError::UnknownId)
        );
    }

    #[test]
    fn test_label_comparison_is_fixed_width() {
        let mut registry = LabelRegistry::new();
        let id = registry.register(b"ab", ContentType::Number);
        // "ab" and "ab\0..." are the same label; "abc" is not.
        assert_eq!(registry.find(b"ab\0\0\0\0\0\0", ContentType::Number), Some(id));
        assert_eq!(registry.find(b"abc", ContentType::Number), None);
    }
}
