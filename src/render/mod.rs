pub mod overlay;

pub use overlay::{OverlayAssets, OverlayPrimitive};
