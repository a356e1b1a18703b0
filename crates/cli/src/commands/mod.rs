pub mod config;
pub mod patch;
pub mod status;
pub mod util;

pub use config::*;
pub use patch::*;
pub use status::*;
pub use util::*;
