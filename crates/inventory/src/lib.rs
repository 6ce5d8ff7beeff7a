//! Inventory domain module.
//!
//! This crate contains the business rules for products and stock movements,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no ledger).
//! Stock levels are never stored: they are derived by replaying the version
//! history of a SKU's transaction key (see [`balance`]).

pub mod balance;
pub mod keys;
pub mod product;
pub mod transaction;

pub use balance::{DatedBalance, RunningBalance, RunningEntry};
pub use product::{NewProduct, Product, ProductView};
pub use transaction::{Transaction, TransactionType};
