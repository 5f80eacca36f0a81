pub mod walk;

pub use walk::{build_items, TextPolicy};
