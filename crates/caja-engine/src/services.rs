//! # External Collaborators
//!
//! Trait boundaries for the services the sale engine consumes, plus
//! in-memory implementations for tests and demos.
//!
//! ## Collaborator Contracts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Collaborator Boundaries                              │
//! │                                                                         │
//! │  CustomerDirectory   list_customers() → Vec<Customer>                   │
//! │                                                                         │
//! │  ProductCatalog      list_products()  → Vec<Product>                    │
//! │                      decrease_stock(id, qty) → updated Product          │
//! │                                                                         │
//! │  ConfirmPrompt       confirm(message) → yes/no                          │
//! │                      (injected so destructive actions are fakeable)     │
//! │                                                                         │
//! │  The engine never mutates stock directly. It requests mutation and      │
//! │  trusts the catalog's accept/reject outcome.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use caja_core::{Customer, Product};

// =============================================================================
// Service Error
// =============================================================================

/// Result type alias for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures surfaced by external collaborators.
///
/// Every variant carries enough context to build the user-facing message
/// the session stores in its error flags.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The remote call itself failed (network, timeout, 5xx).
    #[error("transport error: {0}")]
    Transport(String),

    /// The catalog no longer knows this product.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The catalog rejected a decrement because stock ran out since the
    /// snapshot was taken.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// The external customer directory.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Lists all customers available for selection.
    async fn list_customers(&self) -> ServiceResult<Vec<Customer>>;
}

/// The external product catalog, owner of the authoritative stock counts.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Lists the current product snapshot.
    async fn list_products(&self) -> ServiceResult<Vec<Product>>;

    /// Requests a stock decrement for one product. Returns the updated
    /// product on success; the catalog decides accept/reject.
    async fn decrease_stock(&self, product_id: &str, quantity: i64) -> ServiceResult<Product>;
}

/// Synchronous yes/no prompt for destructive actions (line removal, sale
/// cancellation). Injected as a capability so tests decide deterministically.
pub trait ConfirmPrompt: Send + Sync {
    /// Asks the user the given question; `true` means proceed.
    fn confirm(&self, message: &str) -> bool;
}

// =============================================================================
// In-Memory Implementations
// =============================================================================

/// In-memory collaborator fakes for tests and demos.
pub mod memory {
    use std::collections::HashSet;
    use std::sync::{Arc, RwLock};

    use super::*;

    // -------------------------------------------------------------------------
    // Customer directory
    // -------------------------------------------------------------------------

    #[derive(Debug, Default)]
    struct DirectoryState {
        customers: Vec<Customer>,
        fail_next: Option<String>,
    }

    /// In-memory customer directory.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryDirectory {
        state: Arc<RwLock<DirectoryState>>,
    }

    impl InMemoryDirectory {
        /// Creates a directory seeded with the given customers.
        pub fn new(customers: Vec<Customer>) -> Self {
            InMemoryDirectory {
                state: Arc::new(RwLock::new(DirectoryState {
                    customers,
                    fail_next: None,
                })),
            }
        }

        /// Makes the next `list_customers` call fail with the given message.
        pub fn fail_next_list(&self, message: &str) {
            self.state.write().unwrap().fail_next = Some(message.to_string());
        }
    }

    #[async_trait]
    impl CustomerDirectory for InMemoryDirectory {
        async fn list_customers(&self) -> ServiceResult<Vec<Customer>> {
            let mut state = self.state.write().unwrap();
            if let Some(msg) = state.fail_next.take() {
                return Err(ServiceError::Transport(msg));
            }
            Ok(state.customers.clone())
        }
    }

    // -------------------------------------------------------------------------
    // Product catalog
    // -------------------------------------------------------------------------

    #[derive(Debug, Default)]
    struct CatalogState {
        products: Vec<Product>,
        fail_next_list: Option<String>,
        /// Product ids whose decrements are rejected with a transport error.
        fail_decrement_for: HashSet<String>,
        /// Every decrement request received, in arrival order.
        decrement_calls: Vec<(String, i64)>,
    }

    /// In-memory product catalog with per-product failure injection.
    ///
    /// Decrements are applied to the held products, so a follow-up
    /// `list_products` observes the decremented stock, same as a real
    /// catalog service would.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryCatalog {
        state: Arc<RwLock<CatalogState>>,
    }

    impl InMemoryCatalog {
        /// Creates a catalog seeded with the given products.
        pub fn new(products: Vec<Product>) -> Self {
            InMemoryCatalog {
                state: Arc::new(RwLock::new(CatalogState {
                    products,
                    ..CatalogState::default()
                })),
            }
        }

        /// Makes the next `list_products` call fail with the given message.
        pub fn fail_next_list(&self, message: &str) {
            self.state.write().unwrap().fail_next_list = Some(message.to_string());
        }

        /// Makes every decrement for the given product id fail.
        pub fn fail_decrement_for(&self, product_id: &str) {
            self.state
                .write()
                .unwrap()
                .fail_decrement_for
                .insert(product_id.to_string());
        }

        /// Returns every decrement request received so far.
        pub fn decrement_calls(&self) -> Vec<(String, i64)> {
            self.state.read().unwrap().decrement_calls.clone()
        }

        /// Returns the current server-side stock for a product.
        pub fn stock_of(&self, product_id: &str) -> Option<i64> {
            self.state
                .read()
                .unwrap()
                .products
                .iter()
                .find(|p| p.id == product_id)
                .map(|p| p.stock)
        }
    }

    #[async_trait]
    impl ProductCatalog for InMemoryCatalog {
        async fn list_products(&self) -> ServiceResult<Vec<Product>> {
            let mut state = self.state.write().unwrap();
            if let Some(msg) = state.fail_next_list.take() {
                return Err(ServiceError::Transport(msg));
            }
            Ok(state.products.clone())
        }

        async fn decrease_stock(&self, product_id: &str, quantity: i64) -> ServiceResult<Product> {
            let mut state = self.state.write().unwrap();
            state
                .decrement_calls
                .push((product_id.to_string(), quantity));

            if state.fail_decrement_for.contains(product_id) {
                return Err(ServiceError::Transport(format!(
                    "stock update failed for {}",
                    product_id
                )));
            }

            let product = state
                .products
                .iter_mut()
                .find(|p| p.id == product_id)
                .ok_or_else(|| ServiceError::ProductNotFound(product_id.to_string()))?;

            if product.stock < quantity {
                return Err(ServiceError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available: product.stock,
                    requested: quantity,
                });
            }

            product.stock -= quantity;
            Ok(product.clone())
        }
    }

    // -------------------------------------------------------------------------
    // Confirmation prompt
    // -------------------------------------------------------------------------

    /// Prompt that always answers the same way and counts how often it was
    /// asked.
    #[derive(Debug, Default)]
    pub struct FixedPrompt {
        answer: bool,
        asked: RwLock<Vec<String>>,
    }

    impl FixedPrompt {
        /// Creates a prompt that always answers `answer`.
        pub fn answering(answer: bool) -> Self {
            FixedPrompt {
                answer,
                asked: RwLock::new(Vec::new()),
            }
        }

        /// Returns how many times the prompt was shown.
        pub fn times_asked(&self) -> usize {
            self.asked.read().unwrap().len()
        }
    }

    impl ConfirmPrompt for FixedPrompt {
        fn confirm(&self, message: &str) -> bool {
            self.asked.write().unwrap().push(message.to_string());
            self.answer
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::memory::*;
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

    #[tokio::test]
    async fn test_decrease_stock_applies_to_snapshot() {
        let catalog = InMemoryCatalog::new(vec![product("a", 5)]);

        let updated = catalog.decrease_stock("a", 3).await.unwrap();
        assert_eq!(updated.stock, 2);
        assert_eq!(catalog.stock_of("a"), Some(2));
        assert_eq!(catalog.decrement_calls(), vec![("a".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_decrease_stock_rejects_overdraw() {
        let catalog = InMemoryCatalog::new(vec![product("a", 2)]);

        let err = catalog.decrease_stock("a", 3).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        // Rejected decrements leave stock untouched.
        assert_eq!(catalog.stock_of("a"), Some(2));
    }

    #[tokio::test]
    async fn test_decrease_stock_unknown_product() {
        let catalog = InMemoryCatalog::new(vec![]);
        let err = catalog.decrease_stock("nope", 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_list_failure_fires_once() {
        let catalog = InMemoryCatalog::new(vec![product("a", 5)]);
        catalog.fail_next_list("catalog unreachable");

        assert!(catalog.list_products().await.is_err());
        assert_eq!(catalog.list_products().await.unwrap().len(), 1);
    }

    #[test]
    fn test_fixed_prompt_counts_questions() {
        let prompt = FixedPrompt::answering(false);
        assert!(!prompt.confirm("Remove line?"));
        assert!(!prompt.confirm("Cancel sale?"));
        assert_eq!(prompt.times_asked(), 2);
    }
}
