// # Capture Module
//
// Camera acquisition, lazily-loaded surface capture, and the backends that
// feed them.

pub mod camera;
#[cfg(feature = "screen-capture")]
pub mod scrap;
pub mod sources;
pub mod surface;
