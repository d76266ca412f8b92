pub mod common;
pub mod vision;

pub use common::*;
pub use vision::*;
