//! # State
//!
//! Runtime directory layout and anketa persistence.

pub mod anketa_store;
pub mod db;
pub mod io;

pub use anketa_store::{SqliteAnketaStore, StoredAnketa};
pub use db::GrantDb;
