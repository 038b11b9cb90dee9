mod bitvec;
mod cache;
mod codec;
mod dispenser;
mod embed;
mod file;
mod fs;
mod generator;
mod index;
mod registry;
mod roster;
mod signature;
mod state;
mod store;

pub use bitvec::*;
pub use cache::*;
pub use codec::*;
pub use dispenser::*;
pub use embed::*;
pub use file::{DEFAULT_CLUSTER_SIZE, FileError, FileInfo, MAGIC, VERSION, write_image};
pub use fs::*;
pub use generator::*;
pub use index::*;
pub use registry::*;
pub use roster::*;
pub use signature::*;
pub use state::*;
pub use store::*;
