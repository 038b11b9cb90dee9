mod assume;
mod int;

pub use assume::*;
pub use int::*;
