//! Value-typed tile addresses used as cache keys.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::core::coords::{MapPixelCoordInt, MapPixelDeltaInt};
use crate::layers::base::{drawable_id, get_region_checked, GeoDrawable};
use crate::tiles::pixelbuf::PixelBuf;

/// Addresses one fixed-size tile of one map. Ordered by map identity, then
/// x, then y, then size, so it works as a sorted-map key without hashing.
/// Holds a shared reference to its map, keeping the map alive while any
/// cache entry or in-flight load still refers to the tile.
#[derive(Clone)]
pub struct TileCode {
    map: Arc<dyn GeoDrawable>,
    topleft: MapPixelCoordInt,
    size: MapPixelDeltaInt,
}

impl TileCode {
    pub fn new(map: Arc<dyn GeoDrawable>, topleft: MapPixelCoordInt, size: MapPixelDeltaInt) -> Self {
        Self { map, topleft, size }
    }

    pub fn map(&self) -> &Arc<dyn GeoDrawable> {
        &self.map
    }

    pub fn topleft(&self) -> MapPixelCoordInt {
        self.topleft
    }

    pub fn size(&self) -> MapPixelDeltaInt {
        self.size
    }

    /// Identity of the underlying map, which doubles as the background
    /// worker group for loads of this tile.
    pub fn map_id(&self) -> usize {
        drawable_id(&self.map)
    }

    /// Fetches the tile's pixels, zero-filling any out-of-bounds portion.
    pub fn get_tile(&self) -> PixelBuf {
        get_region_checked(self.map.as_ref(), self.topleft, self.size)
    }

    fn sort_key(&self) -> (usize, i64, i64, i64, i64) {
        (
            self.map_id(),
            self.topleft.x,
            self.topleft.y,
            self.size.x,
            self.size.y,
        )
    }
}

impl PartialEq for TileCode {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for TileCode {}

impl PartialOrd for TileCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl std::fmt::Debug for TileCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCode")
            .field("map", &self.map.fname())
            .field("topleft", &self.topleft)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::base::testutil::FakeMap;
    use std::collections::BTreeMap;

    #[test]
    fn test_tile_code_ordering_and_equality() {
        let map_a: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(64, 64));
        let map_b: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(64, 64));
        let size = MapPixelDeltaInt::new(512, 512);

        let a1 = TileCode::new(map_a.clone(), MapPixelCoordInt::new(0, 0), size);
        let a2 = TileCode::new(map_a.clone(), MapPixelCoordInt::new(0, 0), size);
        let a3 = TileCode::new(map_a.clone(), MapPixelCoordInt::new(512, 0), size);
        let b1 = TileCode::new(map_b.clone(), MapPixelCoordInt::new(0, 0), size);

        assert_eq!(a1, a2);
        assert_ne!(a1, a3);
        assert_ne!(a1, b1);
        assert!(a1 < a3);

        let mut cache = BTreeMap::new();
        cache.insert(a1.clone(), 1);
        cache.insert(a3, 2);
        cache.insert(b1, 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&a2), Some(&1));
    }

    #[test]
    fn test_get_tile_clamps_to_map() {
        let map: Arc<dyn GeoDrawable> = Arc::new(FakeMap::new(64, 64));
        let code = TileCode::new(
            map,
            MapPixelCoordInt::new(0, 0),
            MapPixelDeltaInt::new(512, 512),
        );
        let buf = code.get_tile();
        assert_eq!(buf.width(), 512);
        assert_eq!(buf.height(), 512);
        assert_ne!(buf.get(0, 0), 0);
        assert_eq!(buf.get(100, 100), 0);
    }
}
