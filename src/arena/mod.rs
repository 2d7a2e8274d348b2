// Arena-based storage for registry entries
//
// A registry owns one EntryList: a slab of entries threaded into a
// doubly-linked sequence. EntryId is a lightweight newtype over the slab key.

pub mod entry_arena;

pub use entry_arena::{EntryId, EntryList};
