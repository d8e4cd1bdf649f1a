pub mod analyzer;
pub mod computed;
pub mod indicators;
pub mod signals;


pub use analyzer::*;
pub use computed::*;
pub use indicators::*;
pub use signals::*;
