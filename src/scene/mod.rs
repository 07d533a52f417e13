pub mod builder;
pub mod topology;
pub mod transform;

pub use builder::{build_frame, JointMarker, LimbSegment, OverlayParams, SceneFrame};
pub use topology::{classify, JointClass, CONNECTIONS};
pub use transform::to_scene;
