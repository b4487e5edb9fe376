//! Session façade and persistence orchestration for Skysave.
//!
//! [`SaveContext`] is the one object application code talks to: typed
//! declaration and access of synced values, currency handling, local disk
//! persistence, and cloud merge orchestration. It is constructed once per
//! session with an explicit open/close lifecycle and owns exactly one
//! [`SaveData`](skysave_data::SaveData) for its lifetime.
//!
//! Cloud providers stay behind the [`CloudStorage`] trait: an opaque blob
//! store that loads and saves one serialized string. The engine never
//! performs network I/O itself and never retries; transient failures are
//! the provider's concern, reported back as a plain success flag.
//!
//! All mutation goes through `&mut self`, so a context is single-owner by
//! construction. Embedding in a concurrent service means wrapping the
//! whole context in one mutex or actor per user session; the merge reads
//! both sides before writing and is not safe under interleaved partial
//! mutation.

mod cloud;
mod context;
mod error;
mod prefs;

pub use cloud::{CloudStorage, InMemoryCloud};
pub use context::{SaveConfig, SaveContext};
pub use error::{EngineError, EngineResult};
pub use prefs::FilePrefs;
