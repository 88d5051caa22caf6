// src/tui/mod.rs
//! Data contracts between the pipeline and a terminal UI, plus the
//! line-oriented live feed used by interactive `watch`. The message
//! types and channel shapes are the stable surface; a full-screen
//! renderer can replace the feed without touching the core.

pub mod feed;
pub mod messages;

pub use feed::UiChannels;
pub use messages::{
    BookmarkToggleMsg, DeleteHitsMsg, DiscardedDomainMsg, EnrichmentMsg, HitMsg, HitsLoadedMsg,
    PollStats, StatsMsg,
};
