//! In-memory adapter.

mod fs;
mod node;
#[cfg(test)]
mod tests;

pub use fs::MemoryAdapter;
