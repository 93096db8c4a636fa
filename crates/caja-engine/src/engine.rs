//! # Sale Engine
//!
//! The orchestrator that owns the live [`SaleSession`], the catalog cache
//! and the commit coordination against the external product catalog.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Commit Coordinator                               │
//! │                                                                         │
//! │  confirm_sale()                                                         │
//! │       │                                                                 │
//! │       ├── no customer?        → customer_error, back to Customer,       │
//! │       │                         NO network calls                        │
//! │       ├── zero quantity line? → quantity_error, back to Configure,      │
//! │       │                         NO network calls                        │
//! │       ▼                                                                 │
//! │  fan-out: decrease_stock(product, qty) per line, all dispatched         │
//! │           before any is awaited (join_all)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fan-in barrier: wait for ALL to settle (never act on the first)        │
//! │       │                                                                 │
//! │       ├── stale epoch?  → outcome discarded (session was reset)         │
//! │       ├── all ok        → refresh product snapshot, step = Done         │
//! │       └── any failed    → aggregate sale_error, stay on Summary,        │
//! │                           lines unchanged, NO rollback of the lines     │
//! │                           that did decrement (a retry re-decrements)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! The engine is a cloneable handle over `Arc<Mutex<EngineState>>`. The lock
//! is never held across an await: async completions re-acquire it and check
//! the session epoch first, so a response that arrives after `new_sale()`
//! reset the session is detected and dropped instead of corrupting the new
//! session's state.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use caja_core::{parse_quantity, Customer, PriceKey, Product, SaleLine, SaleSession, Step};

use crate::catalog::{CacheState, CatalogCache};
use crate::services::{ConfirmPrompt, CustomerDirectory, ProductCatalog};

// =============================================================================
// Engine Error
// =============================================================================

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures from engine operations that reference unknown entities.
///
/// Workflow violations (no customer, zero quantity, zero stock) are not
/// errors here: they set the session's user-facing flags instead, because
/// the user recovers from them by correcting input, not by handling a
/// `Result`.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The id is not in the current customer snapshot.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// The id is not in the current product snapshot.
    #[error("Product not found: {0}")]
    ProductNotFound(String),
}

// =============================================================================
// Session Snapshot
// =============================================================================

/// Read-only view of the full engine state, shaped for a UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub step: Step,
    pub selected_customer: Option<Customer>,
    pub lines: Vec<SaleLine>,
    /// Recomputed from the lines at snapshot time.
    pub total_cents: i64,

    pub customer_error: bool,
    pub quantity_error: bool,
    pub no_stock_error: Option<String>,
    pub sale_error: Option<String>,

    pub customers: Vec<Customer>,
    pub customers_state: CacheState,
    pub customers_error: Option<String>,

    pub products: Vec<Product>,
    pub products_state: CacheState,
    pub products_error: Option<String>,
}

// =============================================================================
// Sale Engine
// =============================================================================

/// Engine-internal state: the live session, the caches, and the epoch that
/// guards against late async completions from superseded sessions.
struct EngineState {
    session: SaleSession,
    catalog: CatalogCache,
    /// Incremented on every reset. Async outcomes captured under an older
    /// epoch are discarded on arrival.
    epoch: u64,
}

/// The sale construction engine: one live session per handle.
///
/// Construction starts a sale; [`new_sale`](Self::new_sale) /
/// [`cancel_sale`](Self::cancel_sale) discard it in full and start the next
/// one. There is never partial carry-over between sessions.
#[derive(Clone)]
pub struct SaleEngine {
    customers: Arc<dyn CustomerDirectory>,
    products: Arc<dyn ProductCatalog>,
    prompt: Arc<dyn ConfirmPrompt>,
    state: Arc<Mutex<EngineState>>,
}

impl SaleEngine {
    /// Creates an engine with a fresh session at the customer step.
    ///
    /// Call [`bootstrap`](Self::bootstrap) afterwards to populate the
    /// catalog caches.
    pub fn new(
        customers: Arc<dyn CustomerDirectory>,
        products: Arc<dyn ProductCatalog>,
        prompt: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        let session = SaleSession::new();
        info!(session_id = %session.id, "sale engine started");

        SaleEngine {
            customers,
            products,
            prompt,
            state: Arc::new(Mutex::new(EngineState {
                session,
                catalog: CatalogCache::new(),
                epoch: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state mutex poisoned")
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SaleSession) -> R,
    {
        f(&self.lock().session)
    }

    /// Executes a function with read access to the catalog cache.
    pub fn with_catalog<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CatalogCache) -> R,
    {
        f(&self.lock().catalog)
    }

    /// Current workflow step.
    pub fn step(&self) -> Step {
        self.lock().session.step
    }

    /// Session total in cents, recomputed from the lines.
    pub fn total_cents(&self) -> i64 {
        self.lock().session.total_cents()
    }

    /// Full state snapshot for a UI layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.lock();
        SessionSnapshot {
            step: st.session.step,
            selected_customer: st.session.selected_customer.clone(),
            lines: st.session.lines.clone(),
            total_cents: st.session.total_cents(),
            customer_error: st.session.customer_error,
            quantity_error: st.session.quantity_error,
            no_stock_error: st.session.no_stock_error.clone(),
            sale_error: st.session.sale_error.clone(),
            customers: st.catalog.customers.items().to_vec(),
            customers_state: st.catalog.customers.state(),
            customers_error: st.catalog.customers.error().map(str::to_string),
            products: st.catalog.products.items().to_vec(),
            products_state: st.catalog.products.state(),
            products_error: st.catalog.products.error().map(str::to_string),
        }
    }

    // =========================================================================
    // Catalog Loads
    // =========================================================================

    /// Refreshes the customer snapshot. Safe to call repeatedly; overlapping
    /// loads resolve last-wins. A failure keeps the previous snapshot.
    pub async fn load_customers(&self) {
        debug!("load_customers");
        self.lock().catalog.customers.begin_load();

        let outcome = self
            .customers
            .list_customers()
            .await
            .map_err(|e| e.to_string());
        if let Err(msg) = &outcome {
            warn!(error = %msg, "customer load failed");
        }

        self.lock().catalog.customers.resolve(outcome);
    }

    /// Refreshes the product snapshot. Same contract as
    /// [`load_customers`](Self::load_customers).
    pub async fn load_products(&self) {
        debug!("load_products");
        self.lock().catalog.products.begin_load();

        let outcome = self
            .products
            .list_products()
            .await
            .map_err(|e| e.to_string());
        if let Err(msg) = &outcome {
            warn!(error = %msg, "product load failed");
        }

        self.lock().catalog.products.resolve(outcome);
    }

    /// Loads both snapshots. Called once after construction, and again by
    /// every reset.
    pub async fn bootstrap(&self) {
        tokio::join!(self.load_customers(), self.load_products());
    }

    // =========================================================================
    // Step 1: Customer
    // =========================================================================

    /// Selects the customer by id from the current snapshot and advances to
    /// the select step.
    pub fn select_customer(&self, customer_id: &str) -> EngineResult<()> {
        debug!(customer_id, "select_customer");
        let mut st = self.lock();

        let customer = st
            .catalog
            .find_customer(customer_id)
            .cloned()
            .ok_or_else(|| EngineError::CustomerNotFound(customer_id.to_string()))?;

        st.session.select_customer(customer);
        Ok(())
    }

    // =========================================================================
    // Step 2: Select Products
    // =========================================================================

    /// Flips a product in or out of the selection. Zero-stock products set
    /// `no_stock_error` and leave the selection untouched.
    pub fn toggle_select(&self, product_id: &str) -> EngineResult<()> {
        debug!(product_id, "toggle_select");
        let mut st = self.lock();

        let product = st
            .catalog
            .find_product(product_id)
            .cloned()
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

        st.session.toggle_select(&product);
        Ok(())
    }

    /// Builds the sale lines from the current product snapshot and advances
    /// to the configure step. A no-op on an empty selection.
    pub fn go_to_configure(&self) -> bool {
        debug!("go_to_configure");
        let mut st = self.lock();
        let snapshot = st.catalog.products.items().to_vec();
        st.session.begin_configure(&snapshot)
    }

    // =========================================================================
    // Step 3: Configure Lines
    // =========================================================================

    /// Sets a line quantity, clamped to `[0, stock_available]`.
    pub fn set_quantity(&self, index: usize, quantity: i64) {
        self.lock().session.set_quantity(index, quantity);
    }

    /// Sets a line quantity from raw UI input; non-numeric or negative
    /// input normalizes to 0 before the clamp.
    pub fn set_quantity_input(&self, index: usize, raw: &str) {
        self.lock().session.set_quantity(index, parse_quantity(raw));
    }

    /// Steps a line quantity by a relative delta, same clamp.
    pub fn adjust_quantity(&self, index: usize, delta: i64) {
        self.lock().session.adjust_quantity(index, delta);
    }

    /// Reassigns a line's price tier.
    pub fn set_price_tier(&self, index: usize, key: PriceKey) {
        self.lock().session.set_price_tier(index, key);
    }

    /// Removes a line after interactive confirmation; declined is a no-op.
    /// Removing the last line sends the session back to the select step.
    pub fn remove_line(&self, index: usize) {
        let message = {
            let st = self.lock();
            match st.session.lines.get(index) {
                Some(line) => format!("Remove \"{}\" from this sale?", line.name),
                None => return,
            }
        };

        // Prompt outside the lock; it may block on the user.
        if !self.prompt.confirm(&message) {
            debug!(index, "line removal declined");
            return;
        }

        if let Some(line) = self.lock().session.remove_line(index) {
            info!(product_id = %line.product_id, "line removed");
        }
    }

    /// Advances to the summary step if every line has a quantity; otherwise
    /// sets `quantity_error` and stays.
    pub fn go_to_summary(&self) -> bool {
        debug!("go_to_summary");
        self.lock().session.advance_to_summary()
    }

    /// Backward move to the select step.
    pub fn go_back_to_select(&self) {
        self.lock().session.go_back_to_select();
    }

    /// Backward move to the configure step.
    pub fn go_back_to_configure(&self) {
        self.lock().session.go_back_to_configure();
    }

    // =========================================================================
    // Commit Coordinator
    // =========================================================================

    /// Commits the sale: one stock decrement per line, fan-out then fan-in.
    ///
    /// Preconditions re-route to the offending step with the matching flag
    /// and issue no network calls. On full success the session reaches
    /// `Done` and the product snapshot is refreshed. On any failure the
    /// session stays on `Summary` with an aggregate `sale_error` and the
    /// lines untouched; decrements that did land are NOT rolled back, so a
    /// retry decrements them again. All-or-nothing gating with non-atomic
    /// execution: there is no compensating transaction here.
    pub async fn confirm_sale(&self) {
        let (epoch, lines) = {
            let mut st = self.lock();

            if st.session.selected_customer.is_none() {
                warn!("commit blocked: no customer selected");
                st.session.customer_error = true;
                st.session.step = Step::Customer;
                return;
            }

            if st.session.lines.is_empty() || st.session.lines.iter().any(|l| l.quantity <= 0) {
                warn!("commit blocked: line without quantity");
                st.session.quantity_error = true;
                st.session.step = Step::Configure;
                return;
            }

            st.session.quantity_error = false;
            st.session.sale_error = None;
            (st.epoch, st.session.lines.clone())
        };

        debug!(lines = lines.len(), epoch, "dispatching stock decrements");

        // True fan-out: every request is created before any is awaited, and
        // join_all drives them concurrently until ALL have settled.
        let requests = lines
            .iter()
            .map(|line| self.products.decrease_stock(&line.product_id, line.quantity));
        let outcomes = join_all(requests).await;

        let failures: Vec<String> = outcomes
            .iter()
            .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
            .collect();

        {
            let mut st = self.lock();

            if st.epoch != epoch {
                warn!(
                    stale_epoch = epoch,
                    current_epoch = st.epoch,
                    "discarding commit outcome from a superseded session"
                );
                return;
            }

            if !failures.is_empty() {
                let message = if failures.len() == 1 {
                    failures[0].clone()
                } else {
                    format!(
                        "{} of {} stock updates failed: {}",
                        failures.len(),
                        lines.len(),
                        failures.join("; ")
                    )
                };
                warn!(failed = failures.len(), total = lines.len(), "commit failed");
                st.session.sale_error = Some(message);
                st.session.step = Step::Summary;
                return;
            }

            st.session.step = Step::Done;
            info!(
                session_id = %st.session.id,
                total_cents = st.session.total_cents(),
                lines = lines.len(),
                "sale committed"
            );
        }

        // Refresh so a follow-up sale sees the decremented stock.
        self.load_products().await;
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Discards the session in full, starts a fresh one at the customer
    /// step, and reloads both catalogs. Bumps the epoch so any still-running
    /// commit from the old session is discarded when it settles.
    pub async fn new_sale(&self) {
        {
            let mut st = self.lock();
            st.epoch += 1;
            st.session = SaleSession::new();
            info!(session_id = %st.session.id, epoch = st.epoch, "new sale started");
        }

        self.bootstrap().await;
    }

    /// Cancels the sale. From `Done` this resets without asking (there is
    /// nothing left to lose); from any other step it requires interactive
    /// confirmation first.
    pub async fn cancel_sale(&self) {
        let done = self.lock().session.step == Step::Done;

        if !done && !self.prompt.confirm("Cancel this sale?") {
            debug!("cancel declined");
            return;
        }

        self.new_sale().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::{FixedPrompt, InMemoryCatalog, InMemoryDirectory};

    fn product(id: &str, stock: i64, price1: i64) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            stock,
            price1,
            price2: price1,
            price3: price1,
            price4: price1,
        }
    }

    fn engine_with(
        customers: Vec<Customer>,
        products: Vec<Product>,
        accept_prompts: bool,
    ) -> (SaleEngine, Arc<InMemoryCatalog>) {
        let catalog = Arc::new(InMemoryCatalog::new(products));
        let engine = SaleEngine::new(
            Arc::new(InMemoryDirectory::new(customers)),
            catalog.clone(),
            Arc::new(FixedPrompt::answering(accept_prompts)),
        );
        (engine, catalog)
    }

    fn ana() -> Customer {
        Customer {
            id: "c-1".to_string(),
            name: "Ana".to_string(),
        }
    }

    #[tokio::test]
    async fn test_select_customer_unknown_id() {
        let (engine, _) = engine_with(vec![ana()], vec![], true);
        engine.bootstrap().await;

        let err = engine.select_customer("nope").unwrap_err();
        assert!(matches!(err, EngineError::CustomerNotFound(_)));
        assert_eq!(engine.step(), Step::Customer);

        engine.select_customer("c-1").unwrap();
        assert_eq!(engine.step(), Step::Select);
    }

    #[tokio::test]
    async fn test_commit_without_customer_issues_no_calls() {
        let (engine, catalog) = engine_with(vec![], vec![product("a", 5, 1000)], true);
        engine.bootstrap().await;

        engine.confirm_sale().await;

        let snap = engine.snapshot();
        assert_eq!(snap.step, Step::Customer);
        assert!(snap.customer_error);
        assert!(catalog.decrement_calls().is_empty());
    }

    #[tokio::test]
    async fn test_commit_with_zero_quantity_routes_to_configure() {
        let (engine, catalog) = engine_with(vec![ana()], vec![product("a", 5, 1000)], true);
        engine.bootstrap().await;

        engine.select_customer("c-1").unwrap();
        engine.toggle_select("a").unwrap();
        assert!(engine.go_to_configure());

        // Quantity never set; force a commit anyway.
        engine.confirm_sale().await;

        let snap = engine.snapshot();
        assert_eq!(snap.step, Step::Configure);
        assert!(snap.quantity_error);
        assert!(catalog.decrement_calls().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_camel_case() {
        let (engine, _) = engine_with(vec![ana()], vec![product("a", 5, 1000)], true);
        engine.bootstrap().await;

        let json = serde_json::to_value(engine.snapshot()).unwrap();
        assert_eq!(json["step"], "customer");
        assert_eq!(json["totalCents"], 0);
        assert_eq!(json["productsState"], "loaded");
        assert!(json["saleError"].is_null());
    }
}
