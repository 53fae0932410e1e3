//! Owned resources: every mutating route authorizes against the record's
//! owner column, checking existence before ownership.

pub mod comments;
pub mod playlists;
mod storage;
pub mod tweets;
pub mod types;
pub mod videos;
