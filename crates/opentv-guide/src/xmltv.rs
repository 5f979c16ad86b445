//! XMLTV document encoder.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::text::{Escaping, join_url};
use crate::types::{Channel, ProgramsByChannel};

/// Content type served for the EPG document.
pub const EPG_CONTENT_TYPE: &str = "application/xml";

/// Default `generator-info-name` attribute of the `<tv>` root.
pub const DEFAULT_GENERATOR_NAME: &str = "Open TV UI Demo Guide";

/// Formats an instant as an XMLTV timestamp (`YYYYMMDDHHMMSS +0000`).
///
/// The instant is rendered in UTC and the offset suffix is always `+0000`.
#[must_use]
pub fn format_xmltv_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M%S +0000").to_string()
}

/// Encodes the guide with the default generator name and verbatim values.
///
/// See [`XmltvEncoder::encode`].
#[must_use]
pub fn encode_epg(channels: &[Channel], programs: &ProgramsByChannel, base_url: &str) -> String {
    XmltvEncoder::new().encode(channels, programs, base_url)
}

/// XMLTV encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmltvEncoder {
    /// Value of the root `generator-info-name` attribute.
    generator_name: String,
    /// Escaping applied to text and attribute values.
    escaping: Escaping,
}

impl Default for XmltvEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl XmltvEncoder {
    /// Creates an encoder with the default generator name and verbatim values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generator_name: String::from(DEFAULT_GENERATOR_NAME),
            escaping: Escaping::Verbatim,
        }
    }

    /// Sets the root `generator-info-name`.
    #[must_use]
    pub fn generator_name(mut self, name: impl Into<String>) -> Self {
        self.generator_name = name.into();
        self
    }

    /// Sets the escaping mode (default: [`Escaping::Verbatim`]).
    #[must_use]
    pub const fn escaping(mut self, escaping: Escaping) -> Self {
        self.escaping = escaping;
        self
    }

    /// Encodes `channels` and `programs` as an XMLTV document.
    ///
    /// Emits one `<channel>` per channel (display name and icon URL built
    /// from `base_url` and `Channel::logo`), then one `<programme>` per
    /// program whose channel ID matches a known channel, in the order the
    /// programs were pushed into `programs` (channels may interleave).
    /// Programs for unknown channels are skipped.
    #[must_use]
    pub fn encode(
        &self,
        channels: &[Channel],
        programs: &ProgramsByChannel,
        base_url: &str,
    ) -> String {
        let esc = |value: &str| self.escaping.apply(value).into_owned();

        let mut lines = Vec::with_capacity(
            channels
                .len()
                .saturating_mul(4)
                .saturating_add(programs.program_count().saturating_mul(4))
                .saturating_add(3),
        );
        lines.push(String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        lines.push(format!(
            "<tv generator-info-name=\"{}\">",
            esc(&self.generator_name)
        ));

        for channel in channels {
            lines.push(format!("  <channel id=\"{}\">", esc(&channel.epg_id)));
            lines.push(format!(
                "    <display-name>{}</display-name>",
                esc(&channel.name)
            ));
            lines.push(format!(
                "    <icon src=\"{}\" />",
                esc(&join_url(base_url, &channel.logo))
            ));
            lines.push(String::from("  </channel>"));
        }

        let mut by_id: HashMap<&str, &Channel> = HashMap::with_capacity(channels.len());
        for channel in channels {
            by_id.entry(channel.id.as_str()).or_insert(channel);
        }

        let mut skipped: usize = 0;
        for program in programs.in_input_order() {
            let Some(channel) = by_id.get(program.channel_id.as_str()) else {
                skipped = skipped.saturating_add(1);
                continue;
            };

            lines.push(format!(
                "  <programme start=\"{}\" stop=\"{}\" channel=\"{}\">",
                format_xmltv_timestamp(program.start),
                format_xmltv_timestamp(program.end),
                esc(&channel.epg_id)
            ));
            lines.push(format!("    <title>{}</title>", esc(&program.title)));
            lines.push(format!("    <desc>{}</desc>", esc(&program.description)));
            lines.push(String::from("  </programme>"));
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Skipped programmes without a matching channel");
        }

        lines.push(String::from("</tv>"));
        lines.join("\n")
    }
}
