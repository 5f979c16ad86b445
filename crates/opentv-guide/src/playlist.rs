//! M3U playlist encoder.

use crate::text::join_url;
use crate::types::Channel;

/// Content type served for the playlist document.
pub const PLAYLIST_CONTENT_TYPE: &str = "audio/x-mpegurl";

/// Encodes `channels` as an extended M3U playlist.
///
/// The header references `epg_url`; each channel contributes an `#EXTINF`
/// line and its stream URL. Logo URLs are `base_url` joined with
/// `Channel::logo`. Values are inserted verbatim: embedded quotes are not
/// escaped. Lines are joined with `\n` and there is no trailing newline.
#[must_use]
pub fn encode_playlist(channels: &[Channel], base_url: &str, epg_url: &str) -> String {
    let mut lines = Vec::with_capacity(channels.len().saturating_mul(2).saturating_add(1));
    lines.push(format!("#EXTM3U x-tvg-url=\"{epg_url}\""));

    for channel in channels {
        let logo_url = join_url(base_url, &channel.logo);
        lines.push(format!(
            "#EXTINF:-1 tvg-id=\"{}\" tvg-name=\"{}\" tvg-logo=\"{}\" group-title=\"{}\",{}",
            channel.epg_id, channel.name, logo_url, channel.category, channel.name
        ));
        lines.push(channel.stream_url.clone());
    }

    lines.join("\n")
}
