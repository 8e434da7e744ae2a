//! INSPECTA Core - Entity Types
//!
//! Data structures shared by every INSPECTA crate: missions and their
//! nested records, typed identifiers, creation inputs and patches, the
//! pending-queue entry, synchronization reports and the error taxonomy.
//! No I/O happens here.

pub mod config;
pub mod datetime;
mod entities;
mod enums;
mod error;
mod identity;
mod input;
mod patch;
pub mod record;
mod sync;

pub use config::{LifecyclePolicy, SyncConfig, MAX_LIFECYCLE_SPAN_DAYS};
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use input::*;
pub use patch::*;
pub use record::Record;
pub use sync::*;
