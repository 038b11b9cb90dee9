mod bitboard;
mod board;
mod color;
mod file;
mod r#move;
mod perspective;
mod piece;
mod rank;
mod role;
mod square;

pub use bitboard::*;
pub use board::*;
pub use color::*;
pub use file::*;
pub use perspective::*;
pub use piece::*;
pub use r#move::*;
pub use rank::*;
pub use role::*;
pub use square::*;
