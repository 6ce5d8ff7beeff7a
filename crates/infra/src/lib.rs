//! Infrastructure layer: ledger access, configuration, and the services that
//! record and reconstruct stock on top of it.

pub mod config;
pub mod ledger;
pub mod services;
