pub mod catalog;
pub mod config;
pub mod player;
pub mod render;
pub mod server;
pub mod source;
pub mod types;
pub mod view;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::catalog::{Catalog, Categories, Category, Navigation};
    pub use crate::config::SkateConfig;
    pub use crate::player::{PlayerBoard, PlayerCommand, PlayerKey, PlayerSlot};
    pub use crate::source::{load_catalog, CatalogSource, DirSource, HttpSource, LoadError};
    pub use crate::types::{TodoTrick, TrickType, Video};
    pub use crate::view::{DropdownList, Effect, ViewEvent, ViewState};
}
