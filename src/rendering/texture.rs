//! Texture cache keyed by pixel-buffer identity.
//!
//! The renderer uploads a texture per resolved pixel buffer. Entries hold
//! only a weak back-reference to the buffer: once the owning promise drops
//! the buffer, the entry expires and the next sweep purges it. No explicit
//! eviction policy is needed beyond that.

use fxhash::FxHashMap;
use std::sync::{Arc, Weak};

use crate::tiles::pixelbuf::PixelBuf;

struct Entry<T> {
    buffer: Weak<PixelBuf>,
    texture: T,
}

pub struct TextureCache<T> {
    entries: FxHashMap<usize, Entry<T>>,
}

fn key_of(pixels: &Arc<PixelBuf>) -> usize {
    Arc::as_ptr(pixels) as usize
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, pixels: &Arc<PixelBuf>, texture: T) {
        self.entries.insert(
            key_of(pixels),
            Entry {
                buffer: Arc::downgrade(pixels),
                texture,
            },
        );
    }

    /// The cached texture for exactly this buffer. A dead entry whose
    /// address got reused by a new allocation never matches, because the
    /// weak reference no longer upgrades to the queried buffer.
    pub fn get(&self, pixels: &Arc<PixelBuf>) -> Option<&T> {
        let entry = self.entries.get(&key_of(pixels))?;
        let alive = entry.buffer.upgrade()?;
        if Arc::ptr_eq(&alive, pixels) {
            Some(&entry.texture)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purges entries whose pixel buffer is gone; run once per redraw.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.buffer.strong_count() > 0);
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("texture cache sweep removed {} entries", removed);
        }
        removed
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
