mod error;
mod interface;
#[cfg(feature = "memory")]
mod memory;

pub use error::*;
pub use interface::*;
#[cfg(feature = "memory")]
pub use memory::*;
