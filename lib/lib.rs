/// Endgame bitbase generation, storage, and probing.
pub mod bitbase;
/// Chess domain types and the board the generator drives.
pub mod chess;
/// Assorted utilities.
pub mod util;
