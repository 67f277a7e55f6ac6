//! Working directory status: ignore rules, per-path status entries and the
//! inspector comparing the working directory with a committed tree

pub mod ignore;
pub mod inspector;
pub mod status_entry;
