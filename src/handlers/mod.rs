// handlers/mod.rs - HTTP handlers
//
// Public:  /, /health
// Tables:  /:username/:project/:table (API key in the `key` query parameter)

pub mod system;
pub mod table;

pub use system::{health, root};
pub use table::dispatch;
