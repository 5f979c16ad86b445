//! Template materialization.

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{Program, ProgramTemplate};

/// Anchors program templates to `reference`.
///
/// Produces one [`Program`] per template, in input order, with
/// `start = reference + start_offset_minutes` and
/// `end = start + duration_minutes`. IDs are `"<channel_id>-<index>"` where
/// `index` is the template's position in `templates`, so they are only
/// stable for a given template ordering.
///
/// Numeric fields are not validated: a negative duration yields a program
/// that ends before it starts. Offsets beyond the representable range
/// saturate at the range bound.
#[must_use]
pub fn materialize(templates: &[ProgramTemplate], reference: DateTime<Utc>) -> Vec<Program> {
    let programs: Vec<Program> = templates
        .iter()
        .enumerate()
        .map(|(index, template)| {
            let start = shift_minutes(reference, template.start_offset_minutes);
            let end = shift_minutes(start, template.duration_minutes);
            Program {
                id: format!("{}-{index}", template.channel_id),
                channel_id: template.channel_id.clone(),
                title: template.title.clone(),
                description: template.description.clone(),
                start,
                end,
            }
        })
        .collect();

    tracing::debug!(
        count = programs.len(),
        reference = %reference,
        "Materialized program templates"
    );
    programs
}

/// Adds `minutes` to `instant`, saturating at the representable bounds.
fn shift_minutes(instant: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let bound = if minutes.is_negative() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    };
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(bound)
}
