//! Directory Collaborator Boundary
//!
//! The authorization engine never talks to a directory server itself. It goes
//! through [`DirectoryStore`], which resolves principals, computes group
//! membership and reads or writes access-control entries.
//! [`InMemoryDirectoryStore`] implements it over a JSON snapshot.

pub mod memory;
pub mod traits;

pub use memory::{DirectoryEntryRecord, DirectorySnapshot, InMemoryDirectoryStore};
pub use traits::DirectoryStore;
