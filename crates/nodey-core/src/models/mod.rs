pub mod diagram;

pub use diagram::*;
