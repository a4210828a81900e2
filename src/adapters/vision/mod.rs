pub mod contour;
pub mod overlay;

pub use contour::{ContourCanny, ContourOtsu};
