pub mod item;
pub mod media;
pub mod stats;
pub mod status;

pub use item::*;
pub use media::*;
pub use stats::*;
pub use status::*;
