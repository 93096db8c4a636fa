//! # Domain Types
//!
//! Core domain types for the sale construction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Customer     │   │     Product     │   │    SaleLine     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id             │   │  id             │   │  product_id     │        │
//! │  │  name           │   │  title          │   │  name (frozen)  │        │
//! │  │                 │   │  stock          │   │  quantity       │        │
//! │  │  (read-only     │   │  price1..price4 │   │  price tier     │        │
//! │  │   reference)    │   │  (read-only)    │   │  (mutable)      │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `SaleLine` freezes the product's name, stock, and all four price tiers at
//! line-creation time. Later catalog changes are invisible to the line; the
//! authoritative stock lives server-side and is only trusted at fetch time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Price Tier
// =============================================================================

/// One of the four selectable unit prices a product carries.
///
/// Every product carries four price tiers (retail, wholesale, etc. - the
/// business meaning is up to the tenant). A sale line sells at exactly one
/// tier, chosen per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceKey {
    Price1,
    Price2,
    Price3,
    Price4,
}

impl Default for PriceKey {
    fn default() -> Self {
        PriceKey::Price1
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceKey::Price1 => "price1",
            PriceKey::Price2 => "price2",
            PriceKey::Price3 => "price3",
            PriceKey::Price4 => "price4",
        };
        write!(f, "{}", s)
    }
}

/// Error returned when parsing an unknown price tier key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown price tier: {0} (expected price1..price4)")]
pub struct ParsePriceKeyError(pub String);

impl FromStr for PriceKey {
    type Err = ParsePriceKeyError;

    /// Parses the tier keys a UI sends back (`"price1"`..`"price4"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "price1" => Ok(PriceKey::Price1),
            "price2" => Ok(PriceKey::Price2),
            "price3" => Ok(PriceKey::Price3),
            "price4" => Ok(PriceKey::Price4),
            other => Err(ParsePriceKeyError(other.to_string())),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, owned by the external customer directory.
///
/// The sale engine selects customers by reference and never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier assigned by the directory.
    pub id: String,

    /// Display name shown while picking a customer.
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product, owned by the external product catalog.
///
/// Read-only snapshot inside a session. All monetary values are integer
/// cents; floating point never touches money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier assigned by the catalog.
    pub id: String,

    /// Display name.
    pub title: String,

    /// Available stock at fetch time. The authoritative count lives
    /// server-side; this value goes stale the moment another actor sells.
    pub stock: i64,

    /// Price tier 1 in cents (the default selling price).
    pub price1: i64,
    /// Price tier 2 in cents.
    pub price2: i64,
    /// Price tier 3 in cents.
    pub price3: i64,
    /// Price tier 4 in cents.
    pub price4: i64,
}

impl Product {
    /// Returns the unit price in cents for the given tier.
    #[inline]
    pub fn price_cents(&self, key: PriceKey) -> i64 {
        match key {
            PriceKey::Price1 => self.price1,
            PriceKey::Price2 => self.price2,
            PriceKey::Price3 => self.price3,
            PriceKey::Price4 => self.price4,
        }
    }

    /// Checks whether the product can be selected for sale at all.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product entry in a sale: chosen quantity plus chosen price tier.
///
/// ## Snapshot Pattern
/// Name, stock and prices are frozen copies taken when the line is created.
/// If the catalog changes afterwards, the line keeps displaying (and
/// clamping against) the values the cashier saw when selecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    /// Reference to the originating product; stable for the line's lifetime.
    pub product_id: String,

    /// Product name at line-creation time (frozen).
    pub name: String,

    /// Stock available at line-creation time (frozen); upper clamp bound
    /// for the quantity.
    pub stock_available: i64,

    /// Price tier 1 in cents at line-creation time (frozen).
    pub price1: i64,
    /// Price tier 2 in cents at line-creation time (frozen).
    pub price2: i64,
    /// Price tier 3 in cents at line-creation time (frozen).
    pub price3: i64,
    /// Price tier 4 in cents at line-creation time (frozen).
    pub price4: i64,

    /// Quantity to sell. Invariant: `0 <= quantity <= stock_available`.
    pub quantity: i64,

    /// The tier this line sells at. Defaults to tier 1.
    pub selected_price_key: PriceKey,
}

impl SaleLine {
    /// Creates a fresh line from a catalog product.
    ///
    /// Quantity starts at 0 (the cashier sets it in the configure step) and
    /// the price tier defaults to tier 1.
    pub fn from_product(product: &Product) -> Self {
        SaleLine {
            product_id: product.id.clone(),
            name: product.title.clone(),
            stock_available: product.stock,
            price1: product.price1,
            price2: product.price2,
            price3: product.price3,
            price4: product.price4,
            quantity: 0,
            selected_price_key: PriceKey::default(),
        }
    }

    /// Returns the unit price in cents at the currently selected tier.
    #[inline]
    pub fn unit_price_cents(&self) -> i64 {
        match self.selected_price_key {
            PriceKey::Price1 => self.price1,
            PriceKey::Price2 => self.price2,
            PriceKey::Price3 => self.price3,
            PriceKey::Price4 => self.price4,
        }
    }

    /// Calculates the line total (unit price × quantity).
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents() * self.quantity
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
