pub mod chunk;
pub mod forest;
pub mod presentation;
pub mod root;
pub mod trace;
pub mod verdict;

pub use chunk::*;
pub use forest::*;
pub use presentation::*;
pub use root::*;
pub use trace::*;
pub use verdict::*;
