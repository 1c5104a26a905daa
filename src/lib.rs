//! Remove the `LC_CODE_SIGNATURE` load command from a thin Mach-O image.
//!
//! The signature command is dropped from the load-command table, the rest of
//! the table is compacted over it, and the signature payload is zeroed. The
//! file keeps its length.

pub mod codec;
pub mod error;
pub mod image;
pub mod macho;
pub mod patcher;

pub use error::Error;
pub use macho::Magic;
pub use patcher::{unsign_bytes, unsign_file, unsign_path, Removal, Status};

pub type Result<T> = std::result::Result<T, Error>;
