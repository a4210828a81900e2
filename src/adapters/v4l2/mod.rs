pub mod camera_repo;
pub mod capture;
pub mod source;

pub use camera_repo::V4l2CameraCatalog;
pub use source::V4l2FrameSource;
