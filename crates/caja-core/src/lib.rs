//! # caja-core: Pure Business Logic for the Caja Sale Engine
//!
//! This crate is the heart of Caja. It contains the sale construction
//! workflow as pure functions and plain state with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caja Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Embedding UI / shell                         │   │
//! │  │    Customer picker ──► Product grid ──► Lines ──► Summary       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-engine                                  │   │
//! │  │    catalog cache, collaborator calls, commit fan-out            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐              ┌─────────────────────────────┐   │   │
//! │  │   │   types   │              │          session            │   │   │
//! │  │   │ Customer  │              │  Step gates, line building, │   │   │
//! │  │   │ Product   │              │  quantity clamps, totals    │   │   │
//! │  │   │ SaleLine  │              │                             │   │   │
//! │  │   └───────────┘              └─────────────────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO PROMPTS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure state machine**: every session operation is a plain method on
//!    [`SaleSession`]; same input, same output, no hidden singletons.
//! 2. **No I/O**: catalog fetches, stock decrements and confirmation prompts
//!    live in `caja-engine`.
//! 3. **Integer money**: all monetary values are cents (`i64`); floats never
//!    touch money.
//! 4. **Derived totals**: the session total is recomputed from the lines on
//!    every read, never stored, so it cannot drift.
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::{Customer, Product, SaleSession, Step};
//!
//! let catalog = vec![Product {
//!     id: "a".into(),
//!     title: "Yerba 500g".into(),
//!     stock: 5,
//!     price1: 1000,
//!     price2: 900,
//!     price3: 850,
//!     price4: 800,
//! }];
//!
//! let mut sale = SaleSession::new();
//! sale.select_customer(Customer { id: "c".into(), name: "Ana".into() });
//! sale.toggle_select(&catalog[0]);
//! sale.begin_configure(&catalog);
//! sale.set_quantity(0, 3);
//! assert!(sale.advance_to_summary());
//! assert_eq!(sale.step, Step::Summary);
//! assert_eq!(sale.total_cents(), 3000);
//! ```

pub mod session;
pub mod types;

// Re-exports so users can do `use caja_core::SaleSession` instead of
// `use caja_core::session::SaleSession`.
pub use session::{parse_quantity, SaleSession, Step};
pub use types::{Customer, ParsePriceKeyError, PriceKey, Product, SaleLine};
