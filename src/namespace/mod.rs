//! Bucket Namespace Table
//!
//! Maps logical bucket names to the archive bucket generation currently
//! receiving their mutations. Bucket deletion at the source is a
//! retire-and-rename here, never an erase.
//!
//! - `BucketRecord` - one generation of a logical name
//! - `IdAllocator` - the single authority for archive bucket identifiers
//! - `NamespaceTable` - arena of records with name and id indexes

mod allocator;
mod record;
mod table;

pub use allocator::{IdAllocator, RenameTarget, RETIRED_INFIX};
pub use record::{BucketHandle, BucketRecord, BucketState};
pub use table::{CreatePlan, NamespaceTable, RetirePlan};
