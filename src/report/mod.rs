//! Report module - batch driver, terminal tables and JSON export

pub mod batch;
pub mod export;
pub mod summary;

pub use batch::*;
pub use export::*;
pub use summary::*;
