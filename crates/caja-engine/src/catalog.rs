//! # Catalog Cache
//!
//! Read-only snapshots of the customer and product listings, refreshed on
//! demand from the external collaborators.
//!
//! ## Cache Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cache Slot Lifecycle                                │
//! │                                                                         │
//! │   Unloaded ──begin_load()──► Loading ──resolve(Ok)──► Loaded            │
//! │                                 │                        │              │
//! │                            resolve(Err)             begin_load()        │
//! │                                 │                        │              │
//! │                                 ▼                        ▼              │
//! │                              Errored ──begin_load()─► Loading ...       │
//! │                                                                         │
//! │   A failed load records the error but KEEPS the previous snapshot,      │
//! │   so the UI can keep rendering while offering a retry.                  │
//! │                                                                         │
//! │   Overlapping loads are tolerated: whichever response resolves last     │
//! │   wins. There is no request cancellation or sequencing token here.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use caja_core::{Customer, Product};

// =============================================================================
// Cache State
// =============================================================================

/// Load state of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Never loaded; snapshot is empty.
    Unloaded,
    /// A load is in flight.
    Loading,
    /// Last load succeeded; snapshot is current as of that response.
    Loaded,
    /// Last load failed; snapshot (if any) is stale but kept.
    Errored,
}

// =============================================================================
// Cache Slot
// =============================================================================

/// One independently loadable snapshot.
#[derive(Debug, Clone)]
pub struct CacheSlot<T> {
    state: CacheState,
    snapshot: Vec<T>,
    error: Option<String>,
}

impl<T> CacheSlot<T> {
    /// Creates an empty, unloaded slot.
    pub fn new() -> Self {
        CacheSlot {
            state: CacheState::Unloaded,
            snapshot: Vec::new(),
            error: None,
        }
    }

    /// Marks a load as in flight and clears the previous error.
    pub fn begin_load(&mut self) {
        self.state = CacheState::Loading;
        self.error = None;
    }

    /// Applies a load outcome. Success replaces the snapshot; failure
    /// records the message and leaves the previous snapshot in place.
    pub fn resolve(&mut self, outcome: Result<Vec<T>, String>) {
        match outcome {
            Ok(items) => {
                self.snapshot = items;
                self.state = CacheState::Loaded;
                self.error = None;
            }
            Err(message) => {
                self.state = CacheState::Errored;
                self.error = Some(message);
            }
        }
    }

    /// Current load state.
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == CacheState::Loading
    }

    /// The current snapshot (possibly stale after a failed reload).
    pub fn items(&self) -> &[T] {
        &self.snapshot
    }

    /// The last load error, if the slot is errored.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Catalog Cache
// =============================================================================

/// The two read caches the sale session draws from.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    /// Customer directory snapshot.
    pub customers: CacheSlot<Customer>,
    /// Product catalog snapshot.
    pub products: CacheSlot<Product>,
}

impl CatalogCache {
    /// Creates an empty cache with both slots unloaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a customer up by id in the current snapshot.
    pub fn find_customer(&self, id: &str) -> Option<&Customer> {
        self.customers.items().iter().find(|c| c.id == id)
    }

    /// Looks a product up by id in the current snapshot.
    pub fn find_product(&self, id: &str) -> Option<&Product> {
        self.products.items().iter().find(|p| p.id == id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            stock,
            price1: 1000,
            price2: 900,
            price3: 850,
            price4: 800,
        }
    }

    #[test]
    fn test_slot_starts_unloaded() {
        let slot: CacheSlot<Product> = CacheSlot::new();
        assert_eq!(slot.state(), CacheState::Unloaded);
        assert!(slot.items().is_empty());
        assert!(slot.error().is_none());
    }

    #[test]
    fn test_successful_load_replaces_snapshot() {
        let mut slot = CacheSlot::new();
        slot.begin_load();
        assert!(slot.is_loading());

        slot.resolve(Ok(vec![product("a", 5)]));
        assert_eq!(slot.state(), CacheState::Loaded);
        assert_eq!(slot.items().len(), 1);
    }

    #[test]
    fn test_failed_load_keeps_previous_snapshot() {
        let mut slot = CacheSlot::new();
        slot.begin_load();
        slot.resolve(Ok(vec![product("a", 5), product("b", 3)]));

        slot.begin_load();
        slot.resolve(Err("catalog unreachable".to_string()));

        assert_eq!(slot.state(), CacheState::Errored);
        assert_eq!(slot.error(), Some("catalog unreachable"));
        // The stale snapshot stays usable.
        assert_eq!(slot.items().len(), 2);
    }

    #[test]
    fn test_begin_load_clears_previous_error() {
        let mut slot: CacheSlot<Product> = CacheSlot::new();
        slot.begin_load();
        slot.resolve(Err("boom".to_string()));

        slot.begin_load();
        assert!(slot.error().is_none());
        assert!(slot.is_loading());
    }

    #[test]
    fn test_overlapping_loads_last_resolve_wins() {
        let mut slot = CacheSlot::new();

        // Two loads issued back to back; the second response lands last.
        slot.begin_load();
        slot.begin_load();
        slot.resolve(Ok(vec![product("a", 5)]));
        slot.resolve(Ok(vec![product("b", 3), product("c", 1)]));

        assert_eq!(slot.items().len(), 2);
        assert_eq!(slot.items()[0].id, "b");
    }

    #[test]
    fn test_cache_lookups() {
        let mut cache = CatalogCache::new();
        cache.products.begin_load();
        cache.products.resolve(Ok(vec![product("a", 5)]));

        assert!(cache.find_product("a").is_some());
        assert!(cache.find_product("zzz").is_none());
        assert!(cache.find_customer("anyone").is_none());
    }
}
