//! Text views built from the service snapshots.

pub mod grid;
pub mod registry;

pub use grid::{CellClass, DataCell, GridCoords, GridView, ViewCell, HEADER_OFFSET};
pub use registry::RegistryView;

#[cfg(test)]
#[path = "../tests/render_tests.rs"]
mod tests;
