pub mod image;
pub mod params;
pub mod request;

pub use image::*;
pub use params::*;
pub use request::*;
