//! Chunked layout and playback synchronization for very large transcripts.
//!
//! The full text is split into bounded, whitespace-aligned chunks that are
//! measured independently, so layout cost follows what is on screen rather
//! than the size of the whole body. On top of that index sit:
//! - time to text lookups over the transcript segments (`segments`),
//! - visible band queries (`viewport`),
//! - offset/point mapping for highlight and click-to-seek (`hit`),
//! - the auto-scroll policy (`sync`),
//! all composed behind [`Engine`].

pub mod cancellation;
pub mod chunks;
pub mod config;
pub mod engine;
pub mod hit;
pub mod measure;
pub mod segments;
pub mod sync;
pub mod viewport;
mod worker;

pub use chunks::{Chunk, ChunkList, ChunkStore};
pub use config::{EngineConfig, LogLevel};
pub use engine::Engine;
pub use hit::{HitMapper, LineLocation};
pub use measure::{MonospaceLayout, MonospaceMeasurer, TextLayout, TextMeasurer};
pub use segments::{SegmentError, SegmentIndex, TextSegment};
pub use sync::{Effect, Geometry, Phase, ScrollPolicy, SyncController, SyncState};
pub use viewport::{VisibleChunk, VisibleChunks, visible_chunks};
