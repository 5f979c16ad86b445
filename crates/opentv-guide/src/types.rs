//! Guide data model.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A channel as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Internal channel ID (unique).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category / group title.
    pub category: String,
    /// Logo path relative to the asset base URL.
    pub logo: String,
    /// Stream URL, written verbatim into the playlist.
    pub stream_url: String,
    /// Identifier used in the XMLTV document.
    pub epg_id: String,
    /// Favorite flag (owned by the UI layer).
    #[serde(default)]
    pub favorite: bool,
    /// Last watched marker (owned by the UI layer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<String>,
}

/// A schedule-relative program definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramTemplate {
    /// Owning channel (`Channel::id`).
    pub channel_id: String,
    /// Program title.
    pub title: String,
    /// Program description.
    pub description: String,
    /// Start offset from the reference instant, in minutes (may be negative).
    #[serde(alias = "startOffset")]
    pub start_offset_minutes: i64,
    /// Duration in minutes.
    #[serde(alias = "duration")]
    pub duration_minutes: i64,
}

/// A program anchored to absolute instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    /// `"<channelId>-<index>"`, positional within one materialization.
    pub id: String,
    /// Owning channel (`Channel::id`).
    pub channel_id: String,
    /// Program title.
    pub title: String,
    /// Program description.
    pub description: String,
    /// Start instant.
    #[serde(
        serialize_with = "serialize_instant",
        deserialize_with = "deserialize_instant"
    )]
    pub start: DateTime<Utc>,
    /// End instant.
    #[serde(
        serialize_with = "serialize_instant",
        deserialize_with = "deserialize_instant"
    )]
    pub end: DateTime<Utc>,
}

impl Program {
    /// Returns `true` if `at` lies within `[start, end]` (both ends inclusive).
    #[must_use]
    pub fn is_airing(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// A channel together with its current and upcoming programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelGuideEntry {
    /// The channel record.
    #[serde(flatten)]
    pub channel: Channel,
    /// Program airing at the evaluation instant, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_program: Option<Program>,
    /// Programs after the current one, in chronological order.
    #[serde(default)]
    pub upcoming_programs: Vec<Program>,
}

/// Programs grouped by `channel_id`.
///
/// Groups are kept in order of first appearance and each group keeps the
/// relative order of its programs as they were pushed. The flat push order
/// is kept as well, see [`ProgramsByChannel::in_input_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramsByChannel {
    groups: Vec<(String, Vec<Program>)>,
    positions: HashMap<String, usize>,
    /// `(group, index in group)` per pushed program.
    order: Vec<(usize, usize)>,
}

impl ProgramsByChannel {
    /// Creates an empty grouping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a program to its channel's group.
    pub fn push(&mut self, program: Program) {
        if let Some(&pos) = self.positions.get(&program.channel_id)
            && let Some((_, programs)) = self.groups.get_mut(pos)
        {
            self.order.push((pos, programs.len()));
            programs.push(program);
            return;
        }
        let pos = self.groups.len();
        self.order.push((pos, 0));
        self.positions.insert(program.channel_id.clone(), pos);
        self.groups
            .push((program.channel_id.clone(), vec![program]));
    }

    /// Programs of one channel, or `None` if the channel has none.
    #[must_use]
    pub fn get(&self, channel_id: &str) -> Option<&[Program]> {
        let pos = *self.positions.get(channel_id)?;
        self.groups
            .get(pos)
            .map(|(_, programs)| programs.as_slice())
    }

    /// Iterates `(channel_id, programs)` groups in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Program])> {
        self.groups
            .iter()
            .map(|(id, programs)| (id.as_str(), programs.as_slice()))
    }

    /// Iterates every program in the order it was pushed, across channels.
    pub fn in_input_order(&self) -> impl Iterator<Item = &Program> {
        self.order.iter().filter_map(|&(pos, index)| {
            self.groups
                .get(pos)
                .and_then(|(_, programs)| programs.get(index))
        })
    }

    /// Number of distinct channel IDs.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of programs across all groups.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.groups.iter().map(|(_, programs)| programs.len()).sum()
    }

    /// Returns `true` if no program has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<Program> for ProgramsByChannel {
    fn from_iter<I: IntoIterator<Item = Program>>(iter: I) -> Self {
        let mut grouped = Self::new();
        for program in iter {
            grouped.push(program);
        }
        grouped
    }
}

/// Serializes an instant as RFC 3339 UTC with millisecond precision.
fn serialize_instant<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Deserializes an RFC 3339 instant with any offset into UTC.
fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| D::Error::custom(format!("invalid RFC 3339 instant {s:?}: {e}")))
}
