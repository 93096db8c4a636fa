//! # Sale Session
//!
//! The stateful core of the sale workflow: step progression, line building
//! and the derived running total.
//!
//! ## Step Progression
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sale Session State Machine                          │
//! │                                                                         │
//! │  Customer ──► Select ──► Configure ──► Summary ──► Done                 │
//! │     ▲           ▲  ▲        │  ▲          │                             │
//! │     │           │  └────────┘  └──────────┘                             │
//! │     │           │   (go back / last line removed)                       │
//! │     │           │                                                       │
//! │     └───────────┴── new sale resets everything from any step            │
//! │                                                                         │
//! │  Forward gates:                                                         │
//! │  • Customer → Select    requires a selected customer                    │
//! │  • Select → Configure   requires a non-empty selection                  │
//! │  • Configure → Summary  requires every quantity > 0                     │
//! │  • Summary → Done       only via a successful commit (engine layer)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: no I/O, no prompts, no clocks beyond the start
//! timestamp. The engine layer owns catalog loads, confirmation prompts and
//! the commit fan-out; it calls into this module for every state mutation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Customer, PriceKey, Product, SaleLine};

// =============================================================================
// Step
// =============================================================================

/// Workflow step of a sale session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Picking the customer the sale belongs to.
    Customer,
    /// Ticking products into the selection set.
    Select,
    /// Editing quantities and price tiers per line.
    Configure,
    /// Reviewing lines and totals before committing.
    Summary,
    /// Sale committed. Terminal; only a new sale leaves this step.
    Done,
}

impl Default for Step {
    fn default() -> Self {
        Step::Customer
    }
}

// =============================================================================
// Quantity Input Normalization
// =============================================================================

/// Normalizes raw quantity input from a UI field.
///
/// Non-numeric and negative input is treated as 0, never as an error: the
/// configure step clamps instead of rejecting. (The inventory edit screens
/// validate strictly; this path deliberately does not.)
pub fn parse_quantity(input: &str) -> i64 {
    input.trim().parse::<i64>().unwrap_or(0).max(0)
}

// =============================================================================
// Sale Session
// =============================================================================

/// The entire in-progress state of one sale, from customer selection to
/// completion or abandonment.
///
/// ## Invariants
/// - `selected_ids` and `lines` are in 1:1 correspondence from the configure
///   step onward; removing a line also removes its id.
/// - Every line satisfies `0 <= quantity <= stock_available`.
/// - The total is always recomputed from the lines, never stored.
/// - Exactly one session is active at a time; starting a new sale replaces
///   the session wholesale (the engine constructs a fresh one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSession {
    /// Session identity, mostly for log correlation.
    pub id: String,

    /// When this sale was started.
    pub started_at: DateTime<Utc>,

    /// Current workflow step.
    pub step: Step,

    /// The customer this sale is for. Set once in the customer step.
    pub selected_customer: Option<Customer>,

    /// Product ids ticked in the select step. Source of truth for which
    /// lines exist once the session advances to configure.
    pub selected_ids: HashSet<String>,

    /// Editable sale lines, created on the select → configure transition.
    pub lines: Vec<SaleLine>,

    /// Set when a forward move was attempted without a customer.
    pub customer_error: bool,

    /// Set when configure → summary was attempted with a zero quantity.
    /// Persists until the next attempt succeeds.
    pub quantity_error: bool,

    /// Set when a zero-stock product was toggled.
    pub no_stock_error: Option<String>,

    /// Aggregate message from a failed commit attempt.
    pub sale_error: Option<String>,
}

impl SaleSession {
    /// Starts a fresh sale at the customer step.
    pub fn new() -> Self {
        SaleSession {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            step: Step::default(),
            selected_customer: None,
            selected_ids: HashSet::new(),
            lines: Vec::new(),
            customer_error: false,
            quantity_error: false,
            no_stock_error: None,
            sale_error: None,
        }
    }

    // =========================================================================
    // Step 1: Customer
    // =========================================================================

    /// Selects the customer and advances to the select step.
    ///
    /// Clears `customer_error`: a successful selection invalidates it.
    pub fn select_customer(&mut self, customer: Customer) {
        self.selected_customer = Some(customer);
        self.customer_error = false;
        self.step = Step::Select;
    }

    // =========================================================================
    // Step 2: Select Products
    // =========================================================================

    /// Checks whether a product is currently ticked.
    pub fn is_selected(&self, product_id: &str) -> bool {
        self.selected_ids.contains(product_id)
    }

    /// Flips a product in or out of the selection set.
    ///
    /// Zero-stock products can never enter the selection: toggling one sets
    /// `no_stock_error` and leaves the set untouched. Any successful toggle
    /// clears the flag.
    pub fn toggle_select(&mut self, product: &Product) {
        if !product.in_stock() {
            self.no_stock_error = Some(format!("No stock available for \"{}\"", product.title));
            return;
        }

        self.no_stock_error = None;

        if !self.selected_ids.remove(&product.id) {
            self.selected_ids.insert(product.id.clone());
        }
    }

    /// Checks the select → configure gate without moving.
    pub fn can_configure(&self) -> bool {
        !self.selected_ids.is_empty()
    }

    /// Materializes sale lines from the catalog snapshot and advances to
    /// the configure step. Returns `false` (and stays) on an empty selection.
    ///
    /// Lines are built in catalog order, each starting at quantity 0 with
    /// price tier 1. Selected ids missing from the snapshot (product deleted
    /// between selection and this call) are silently dropped and pruned from
    /// the selection so lines and ids stay 1:1.
    pub fn begin_configure(&mut self, catalog: &[Product]) -> bool {
        if !self.can_configure() {
            return false;
        }

        self.lines = catalog
            .iter()
            .filter(|p| self.selected_ids.contains(&p.id))
            .map(SaleLine::from_product)
            .collect();

        let kept: HashSet<String> = self.lines.iter().map(|l| l.product_id.clone()).collect();
        self.selected_ids = kept;

        self.step = Step::Configure;
        true
    }

    // =========================================================================
    // Step 3: Configure Lines
    // =========================================================================

    /// Sets a line's quantity, clamped to `[0, stock_available]`.
    ///
    /// Negative input normalizes to 0. An out-of-range index is a no-op;
    /// the UI can only reference lines that exist.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) {
        if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity.clamp(0, line.stock_available);
        }
    }

    /// Steps a line's quantity by a relative delta, same clamp as
    /// [`set_quantity`](Self::set_quantity).
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) {
        if let Some(line) = self.lines.get_mut(index) {
            line.quantity = (line.quantity + delta).clamp(0, line.stock_available);
        }
    }

    /// Reassigns a line's price tier. Quantity is untouched.
    pub fn set_price_tier(&mut self, index: usize, key: PriceKey) {
        if let Some(line) = self.lines.get_mut(index) {
            line.selected_price_key = key;
        }
    }

    /// Deletes a line and its id from the selection, returning the removed
    /// line. If that was the last line, falls back to the select step.
    ///
    /// The interactive confirmation for this destructive action lives in the
    /// engine layer; by the time this runs the removal is already decided.
    pub fn remove_line(&mut self, index: usize) -> Option<SaleLine> {
        if index >= self.lines.len() {
            return None;
        }

        let line = self.lines.remove(index);
        self.selected_ids.remove(&line.product_id);

        if self.lines.is_empty() {
            self.step = Step::Select;
        }

        Some(line)
    }

    /// Checks the configure → summary gate without moving.
    pub fn can_summarize(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.quantity > 0)
    }

    /// Advances to the summary step if every line has a quantity.
    ///
    /// Blocked iff at least one line has `quantity == 0`; blocking sets
    /// `quantity_error`, which persists until an attempt succeeds.
    pub fn advance_to_summary(&mut self) -> bool {
        if self.lines.iter().any(|l| l.quantity <= 0) {
            self.quantity_error = true;
            return false;
        }

        self.quantity_error = false;
        self.step = Step::Summary;
        true
    }

    // =========================================================================
    // Backward Moves
    // =========================================================================

    /// Unrestricted backward move to the select step.
    pub fn go_back_to_select(&mut self) {
        self.step = Step::Select;
    }

    /// Unrestricted backward move to the configure step.
    pub fn go_back_to_configure(&mut self) {
        self.step = Step::Configure;
    }

    // =========================================================================
    // Derived Totals
    // =========================================================================

    /// Recomputes the session total in cents from the lines.
    ///
    /// Always a pure fold over `lines`; there is no stored total to drift.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.line_total_cents()).sum()
    }
}

impl Default for SaleSession {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            id: "c-1".to_string(),
            name: "Ana".to_string(),
        }
    }

    fn product(id: &str, stock: i64, price1: i64) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            stock,
            price1,
            price2: price1 - 100,
            price3: price1 - 200,
            price4: price1 - 300,
        }
    }

    /// Drives a session to the configure step with the given catalog,
    /// selecting every in-stock product.
    fn configured(catalog: &[Product]) -> SaleSession {
        let mut s = SaleSession::new();
        s.select_customer(customer());
        for p in catalog.iter().filter(|p| p.in_stock()) {
            s.toggle_select(p);
        }
        assert!(s.begin_configure(catalog));
        s
    }

    #[test]
    fn test_new_session_starts_at_customer() {
        let s = SaleSession::new();
        assert_eq!(s.step, Step::Customer);
        assert!(s.selected_customer.is_none());
        assert!(s.lines.is_empty());
        assert_eq!(s.total_cents(), 0);
    }

    #[test]
    fn test_select_customer_advances_and_clears_flag() {
        let mut s = SaleSession::new();
        s.customer_error = true;

        s.select_customer(customer());

        assert_eq!(s.step, Step::Select);
        assert!(!s.customer_error);
        assert_eq!(s.selected_customer.as_ref().unwrap().name, "Ana");
    }

    #[test]
    fn test_toggle_zero_stock_is_rejected_with_flag() {
        let mut s = SaleSession::new();
        let dead = product("b", 0, 2000);

        s.toggle_select(&dead);

        assert!(!s.is_selected("b"));
        assert!(s.no_stock_error.is_some());

        // A successful toggle on a stocked product clears the flag.
        let live = product("a", 5, 1000);
        s.toggle_select(&live);
        assert!(s.is_selected("a"));
        assert!(s.no_stock_error.is_none());
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut s = SaleSession::new();
        let p = product("a", 5, 1000);

        s.toggle_select(&p);
        assert!(s.is_selected("a"));

        s.toggle_select(&p);
        assert!(!s.is_selected("a"));
    }

    #[test]
    fn test_configure_requires_selection() {
        let mut s = SaleSession::new();
        s.select_customer(customer());

        assert!(!s.begin_configure(&[product("a", 5, 1000)]));
        assert_eq!(s.step, Step::Select);
    }

    #[test]
    fn test_configure_builds_lines_at_zero_quantity() {
        let catalog = [product("a", 5, 1000), product("b", 3, 2000)];
        let s = configured(&catalog);

        assert_eq!(s.step, Step::Configure);
        assert_eq!(s.lines.len(), 2);
        for line in &s.lines {
            assert_eq!(line.quantity, 0);
            assert_eq!(line.selected_price_key, PriceKey::Price1);
        }
    }

    #[test]
    fn test_configure_drops_ids_missing_from_catalog() {
        let mut s = SaleSession::new();
        s.select_customer(customer());
        s.toggle_select(&product("a", 5, 1000));
        s.toggle_select(&product("ghost", 5, 1000));

        // "ghost" was deleted from the catalog between selection and now.
        assert!(s.begin_configure(&[product("a", 5, 1000)]));

        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.lines[0].product_id, "a");
        // Selection pruned to match the lines 1:1.
        assert!(!s.is_selected("ghost"));
        assert!(s.is_selected("a"));
    }

    #[test]
    fn test_set_quantity_clamps_to_stock() {
        let mut s = configured(&[product("a", 5, 1000)]);

        s.set_quantity(0, 7);
        assert_eq!(s.lines[0].quantity, 5);

        s.set_quantity(0, -3);
        assert_eq!(s.lines[0].quantity, 0);

        s.set_quantity(0, 3);
        assert_eq!(s.lines[0].quantity, 3);

        // Out-of-range index is a no-op.
        s.set_quantity(9, 1);
        assert_eq!(s.lines[0].quantity, 3);
    }

    #[test]
    fn test_adjust_quantity_clamps_both_ends() {
        let mut s = configured(&[product("a", 5, 1000)]);

        s.adjust_quantity(0, -1);
        assert_eq!(s.lines[0].quantity, 0);

        s.adjust_quantity(0, 2);
        s.adjust_quantity(0, 100);
        assert_eq!(s.lines[0].quantity, 5);
    }

    #[test]
    fn test_parse_quantity_normalizes_garbage_to_zero() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity(" 12 "), 12);
        assert_eq!(parse_quantity("-4"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("2.5"), 0);
    }

    #[test]
    fn test_price_tier_change_keeps_quantity() {
        let mut s = configured(&[product("a", 5, 1000)]);
        s.set_quantity(0, 4);

        s.set_price_tier(0, PriceKey::Price3);

        assert_eq!(s.lines[0].selected_price_key, PriceKey::Price3);
        assert_eq!(s.lines[0].quantity, 4);
    }

    #[test]
    fn test_total_tracks_every_mutation() {
        let mut s = configured(&[product("a", 5, 1000), product("b", 10, 2000)]);

        assert_eq!(s.total_cents(), 0);

        s.set_quantity(0, 2); // 2 × 1000
        s.set_quantity(1, 3); // 3 × 2000
        assert_eq!(s.total_cents(), 8000);

        s.set_price_tier(1, PriceKey::Price2); // 3 × 1900
        assert_eq!(s.total_cents(), 7700);

        s.adjust_quantity(0, -1); // 1 × 1000
        assert_eq!(s.total_cents(), 6700);

        s.remove_line(0);
        assert_eq!(s.total_cents(), 5700);
    }

    #[test]
    fn test_summary_blocked_on_zero_quantity_then_recovers() {
        let mut s = configured(&[product("a", 5, 1000), product("b", 10, 2000)]);
        s.set_quantity(0, 2);

        assert!(!s.advance_to_summary());
        assert_eq!(s.step, Step::Configure);
        assert!(s.quantity_error);

        // The flag persists across edits until an attempt succeeds.
        s.set_quantity(1, 1);
        assert!(s.quantity_error);

        assert!(s.advance_to_summary());
        assert_eq!(s.step, Step::Summary);
        assert!(!s.quantity_error);
    }

    #[test]
    fn test_remove_line_keeps_ids_in_sync() {
        let mut s = configured(&[product("a", 5, 1000), product("b", 10, 2000)]);

        let removed = s.remove_line(0).unwrap();
        assert_eq!(removed.product_id, "a");
        assert!(!s.is_selected("a"));
        assert!(s.is_selected("b"));
        assert_eq!(s.step, Step::Configure);
    }

    #[test]
    fn test_removing_last_line_falls_back_to_select() {
        let mut s = configured(&[product("a", 5, 1000)]);

        s.remove_line(0);

        assert!(s.lines.is_empty());
        assert!(s.selected_ids.is_empty());
        assert_eq!(s.step, Step::Select);
    }

    #[test]
    fn test_remove_line_out_of_range_is_noop() {
        let mut s = configured(&[product("a", 5, 1000)]);
        assert!(s.remove_line(5).is_none());
        assert_eq!(s.lines.len(), 1);
    }

    #[test]
    fn test_backward_moves_are_unrestricted() {
        let mut s = configured(&[product("a", 5, 1000)]);
        s.set_quantity(0, 1);
        assert!(s.advance_to_summary());

        s.go_back_to_configure();
        assert_eq!(s.step, Step::Configure);

        s.go_back_to_select();
        assert_eq!(s.step, Step::Select);
    }
}
