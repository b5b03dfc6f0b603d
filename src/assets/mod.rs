//! Assets module - instrument descriptors used by portfolio positions.

mod assets_model;

pub use assets_model::{Asset, AssetType};
