mod collect;
mod graph;
mod parse;

pub use collect::collect_vault;
pub use graph::{Document, LinkGraph, VaultGraph, join_vault_path};
