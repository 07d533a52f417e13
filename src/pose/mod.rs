pub mod detector;
pub mod keypoint;
pub mod preprocess;

pub use detector::PoseDetector;
pub use keypoint::{Keypoint, Pose, KEYPOINT_COUNT};
pub use preprocess::preprocess_for_blazepose;
