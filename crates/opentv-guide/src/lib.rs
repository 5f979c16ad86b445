//! Program-guide compiler for opentv.
//!
//! Turns channel records and schedule-relative program templates into
//! absolute programs, assembles the per-channel now/next view, and encodes
//! the M3U playlist and XMLTV documents. Every function here is pure: the
//! reference and evaluation instants are always passed in by the caller.

mod assemble;
mod materialize;
mod playlist;
mod text;
mod types;
mod xmltv;

pub use assemble::{assemble, split_current};
pub use materialize::materialize;
pub use playlist::{PLAYLIST_CONTENT_TYPE, encode_playlist};
pub use text::{Escaping, join_url};
pub use types::{Channel, ChannelGuideEntry, Program, ProgramTemplate, ProgramsByChannel};
pub use xmltv::{
    DEFAULT_GENERATOR_NAME, EPG_CONTENT_TYPE, XmltvEncoder, encode_epg, format_xmltv_timestamp,
};
