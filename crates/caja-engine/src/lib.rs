//! # caja-engine: Async Orchestration for the Caja Sale Engine
//!
//! Everything `caja-core` is forbidden from doing lives here: catalog
//! fetches, stock decrements, confirmation prompts, and the coordination
//! that keeps one live [`SaleSession`](caja_core::SaleSession) consistent
//! while those operations are in flight.
//!
//! ## Modules
//!
//! - [`services`] - collaborator traits (customer directory, product
//!   catalog, confirmation prompt) plus in-memory fakes
//! - [`catalog`] - the customer/product read caches
//! - [`engine`] - the [`SaleEngine`] handle: step orchestration and the
//!   commit fan-out
//!
//! ## Concurrency Model
//!
//! One logical session per engine handle, single-threaded cooperative with
//! async I/O. The engine never holds its state lock across an await, and a
//! session epoch discards async outcomes that settle after a reset. There
//! is no request cancellation: an in-flight commit keeps running after
//! `new_sale()`, its outcome just lands in the void.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use caja_core::{Customer, Product, Step};
//! use caja_engine::{
//!     memory::{FixedPrompt, InMemoryCatalog, InMemoryDirectory},
//!     SaleEngine,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let directory = Arc::new(InMemoryDirectory::new(vec![Customer {
//!     id: "c-1".into(),
//!     name: "Ana".into(),
//! }]));
//! let catalog = Arc::new(InMemoryCatalog::new(vec![Product {
//!     id: "a".into(),
//!     title: "Yerba 500g".into(),
//!     stock: 5,
//!     price1: 1000,
//!     price2: 900,
//!     price3: 850,
//!     price4: 800,
//! }]));
//!
//! let engine = SaleEngine::new(directory, catalog, Arc::new(FixedPrompt::answering(true)));
//! engine.bootstrap().await;
//!
//! engine.select_customer("c-1").unwrap();
//! engine.toggle_select("a").unwrap();
//! engine.go_to_configure();
//! engine.set_quantity(0, 3);
//! engine.go_to_summary();
//! engine.confirm_sale().await;
//!
//! assert_eq!(engine.step(), Step::Done);
//! # }
//! ```

pub mod catalog;
pub mod engine;
pub mod services;

// Re-exports for convenience.
pub use catalog::{CacheSlot, CacheState, CatalogCache};
pub use engine::{EngineError, EngineResult, SaleEngine, SessionSnapshot};
pub use services::{
    memory, ConfirmPrompt, CustomerDirectory, ProductCatalog, ServiceError, ServiceResult,
};
