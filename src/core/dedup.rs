//! Single-slot dedup cache for capture fingerprints and recognized text.
//!
//! Each slot holds only the most recent value. A check compares the incoming
//! value against the slot and then unconditionally overwrites it, so a skip
//! never sticks: the next distinct input is still compared correctly.

use std::sync::Mutex;

/// Content hash of a raw capture payload. The payload is treated as an
/// opaque blob; image encoding is never interpreted here.
pub fn fingerprint(data: &str) -> String {
    format!("{:x}", md5::compute(data.as_bytes()))
}

pub struct DedupCache {
    image: Mutex<Option<String>>,
    text: Mutex<Option<String>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self {
            image: Mutex::new(None),
            text: Mutex::new(None),
        }
    }

    /// Returns true when `fp` matches the stored image fingerprint.
    /// The slot is overwritten either way.
    pub fn check_and_update_image(&self, fp: &str) -> bool {
        Self::check_slot(&self.image, fp)
    }

    /// Returns true when `text` matches the stored recognized text.
    /// The slot is overwritten either way.
    pub fn check_and_update_text(&self, text: &str) -> bool {
        Self::check_slot(&self.text, text)
    }

    /// Clear both slots. Used when starting a fresh capture session so an
    /// OCR result identical to a stale previous one is not skipped.
    pub fn reset(&self) {
        *Self::lock(&self.image) = None;
        *Self::lock(&self.text) = None;
        log::debug!("[Dedup] Slots reset");
    }

    fn check_slot(slot: &Mutex<Option<String>>, value: &str) -> bool {
        let mut guard = Self::lock(slot);
        let unchanged = guard.as_deref() == Some(value);
        *guard = Some(value.to_string());
        unchanged
    }

    fn lock(slot: &Mutex<Option<String>>) -> std::sync::MutexGuard<'_, Option<String>> {
        match slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_slot_idempotence() {
        let cache = DedupCache::new();
        let fp = fingerprint("same-bytes");

        assert!(!cache.check_and_update_image(&fp));
        assert!(cache.check_and_update_image(&fp));
    }

    #[test]
    fn test_skip_does_not_stick() {
        let cache = DedupCache::new();

        assert!(!cache.check_and_update_text("one"));
        assert!(cache.check_and_update_text("one"));
        assert!(!cache.check_and_update_text("two"));
        // The slot now holds "two", so "one" counts as fresh again
        assert!(!cache.check_and_update_text("one"));
    }

    #[test]
    fn test_reset_clears_both_slots() {
        let cache = DedupCache::new();
        cache.check_and_update_image("fp");
        cache.check_and_update_text("text");

        cache.reset();

        assert!(!cache.check_and_update_image("fp"));
        assert!(!cache.check_and_update_text("text"));
    }

    #[test]
    fn test_slots_are_independent() {
        let cache = DedupCache::new();
        assert!(!cache.check_and_update_image("shared-value"));
        assert!(!cache.check_and_update_text("shared-value"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }
}
