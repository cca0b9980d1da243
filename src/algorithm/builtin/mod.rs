//! Built-in algorithms, used by the demo binary and as worked examples.

pub mod flood;

pub use flood::{Flood, FloodStatus};
