//! Guide assembly: per-channel current/upcoming partition.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{Channel, ChannelGuideEntry, Program, ProgramsByChannel};

/// Builds the guide view at `at`.
///
/// Programs are grouped by channel and stable-sorted by start. Each channel
/// gets the first program whose window contains `at` as its current program
/// and, as upcoming programs, either everything starting strictly after the
/// current program's end or, when nothing is airing, its whole schedule.
///
/// The output has one entry per input channel, in input order. Channels
/// without programs get an empty entry; programs whose channel is unknown do
/// not appear anywhere.
#[must_use]
pub fn assemble(
    channels: &[Channel],
    programs: &[Program],
    at: DateTime<Utc>,
) -> Vec<ChannelGuideEntry> {
    let by_channel: ProgramsByChannel = programs.iter().cloned().collect();

    let known: HashSet<&str> = channels.iter().map(|c| c.id.as_str()).collect();
    let orphans = by_channel
        .iter()
        .filter(|(channel_id, _)| !known.contains(channel_id))
        .map(|(_, programs)| programs.len())
        .sum::<usize>();
    if orphans > 0 {
        tracing::debug!(orphans, "Ignoring programs without a matching channel");
    }

    channels
        .iter()
        .map(|channel| {
            let mut schedule = by_channel.get(&channel.id).unwrap_or_default().to_vec();
            schedule.sort_by_key(|p| p.start);
            let (current_program, upcoming_programs) = split_current(&schedule, at);
            ChannelGuideEntry {
                channel: channel.clone(),
                current_program,
                upcoming_programs,
            }
        })
        .collect()
}

/// Splits a chronologically sorted schedule into current and upcoming parts.
///
/// Overlapping programs that start before the current program ends but are
/// not themselves current are dropped from the upcoming list.
#[must_use]
pub fn split_current(schedule: &[Program], at: DateTime<Utc>) -> (Option<Program>, Vec<Program>) {
    let Some(current) = schedule.iter().find(|p| p.is_airing(at)) else {
        return (None, schedule.to_vec());
    };

    let upcoming = schedule
        .iter()
        .filter(|p| p.start > current.end)
        .cloned()
        .collect();
    (Some(current.clone()), upcoming)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::materialize::materialize;
    use crate::types::ProgramTemplate;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn channel(id: &str) -> Channel {
        Channel {
            id: String::from(id),
            name: format!("{id} name"),
            category: String::from("News"),
            logo: format!("img/{id}.png"),
            stream_url: format!("http://x/{id}"),
            epg_id: format!("epg.{id}"),
            favorite: false,
            last_watched: None,
        }
    }

    fn template(channel_id: &str, offset: i64, duration: i64) -> ProgramTemplate {
        ProgramTemplate {
            channel_id: String::from(channel_id),
            title: format!("{channel_id}@{offset}"),
            description: String::new(),
            start_offset_minutes: offset,
            duration_minutes: duration,
        }
    }

    fn titles(programs: &[Program]) -> Vec<&str> {
        programs.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_assemble_single_program_on_air() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(&[template("c1", -10, 30)], reference());

        // Act
        let guide = assemble(&channels, &programs, reference());

        // Assert
        assert_eq!(guide.len(), 1);
        let current = guide[0].current_program.as_ref().unwrap();
        assert_eq!(current.id, "c1-0");
        assert!(guide[0].upcoming_programs.is_empty());
    }

    #[test]
    fn test_assemble_nothing_airing_falls_back_to_full_schedule() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(
            &[template("c1", 60, 30), template("c1", 0, 30)],
            reference(),
        );

        // Act
        let guide = assemble(&channels, &programs, reference() + TimeDelta::minutes(90));

        // Assert
        assert!(guide[0].current_program.is_none());
        assert_eq!(
            titles(&guide[0].upcoming_programs),
            vec!["c1@0", "c1@60"]
        );
    }

    #[test]
    fn test_assemble_upcoming_strictly_after_current_end() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(
            &[
                template("c1", 30, 30),
                template("c1", 0, 30),
                template("c1", 60, 30),
            ],
            reference(),
        );

        // Act
        let guide = assemble(&channels, &programs, reference() + TimeDelta::minutes(10));

        // Assert: the program starting exactly at current.end is not upcoming
        assert_eq!(guide[0].current_program.as_ref().unwrap().title, "c1@0");
        assert_eq!(titles(&guide[0].upcoming_programs), vec!["c1@60"]);
    }

    #[test]
    fn test_assemble_boundary_instants_are_current() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(&[template("c1", 0, 30)], reference());

        // Act
        let at_start = assemble(&channels, &programs, reference());
        let at_end = assemble(&channels, &programs, reference() + TimeDelta::minutes(30));
        let after = assemble(
            &channels,
            &programs,
            reference() + TimeDelta::minutes(30) + TimeDelta::seconds(1),
        );

        // Assert
        assert!(at_start[0].current_program.is_some());
        assert!(at_end[0].current_program.is_some());
        assert!(after[0].current_program.is_none());
    }

    #[test]
    fn test_assemble_overlap_earliest_start_wins_and_overlaps_dropped() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(
            &[
                template("c1", -5, 60),
                template("c1", -20, 40),
                template("c1", 30, 10),
                template("c1", 90, 10),
            ],
            reference(),
        );

        // Act
        let guide = assemble(&channels, &programs, reference());

        // Assert
        assert_eq!(guide[0].current_program.as_ref().unwrap().title, "c1@-20");
        // Current ends at +20: c1@-5 overlaps it and is dropped.
        assert_eq!(titles(&guide[0].upcoming_programs), vec!["c1@30", "c1@90"]);
    }

    #[test]
    fn test_assemble_keeps_channel_order_and_empty_channels() {
        // Arrange
        let channels = vec![channel("c3"), channel("c1"), channel("c2")];
        let programs = materialize(&[template("c1", 0, 30)], reference());

        // Act
        let guide = assemble(&channels, &programs, reference());

        // Assert
        let ids: Vec<&str> = guide.iter().map(|e| e.channel.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1", "c2"]);
        assert!(guide[0].current_program.is_none());
        assert!(guide[0].upcoming_programs.is_empty());
        assert!(guide[1].current_program.is_some());
    }

    #[test]
    fn test_assemble_without_programs() {
        // Arrange
        let channels = vec![channel("c1"), channel("c2")];

        // Act
        let guide = assemble(&channels, &[], reference());

        // Assert
        assert_eq!(guide.len(), 2);
        assert!(guide.iter().all(|e| e.current_program.is_none()));
        assert!(guide.iter().all(|e| e.upcoming_programs.is_empty()));
    }

    #[test]
    fn test_assemble_ignores_orphan_programs() {
        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(
            &[template("ghost", 0, 30), template("c1", 60, 30)],
            reference(),
        );

        // Act
        let guide = assemble(&channels, &programs, reference());

        // Assert
        assert!(guide[0].current_program.is_none());
        assert_eq!(titles(&guide[0].upcoming_programs), vec!["c1@60"]);
    }

    #[test]
    fn test_assemble_logs_orphan_count() {
        use tracing::subscriber::with_default;
        use tracing_mock::{expect, subscriber};

        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(
            &[template("ghost", 0, 30), template("ghost", 30, 30)],
            reference(),
        );
        let (subscriber, handle) = subscriber::mock()
            .event(
                expect::event()
                    .at_level(tracing::Level::DEBUG)
                    .with_fields(expect::msg("Ignoring programs without a matching channel")),
            )
            .only()
            .run_with_handle();

        // Act
        with_default(subscriber, || {
            let _guide = assemble(&channels, &programs, reference());
        });

        // Assert
        handle.assert_finished();
    }

    #[test]
    fn test_assemble_logs_orphans_among_many_channels() {
        use tracing::subscriber::with_default;
        use tracing_mock::{expect, subscriber};

        // Arrange
        let channels: Vec<Channel> = (0..50).map(|i| channel(&format!("c{i}"))).collect();
        let programs = materialize(
            &[
                template("c7", 0, 30),
                template("ghost", 0, 30),
                template("c49", 0, 30),
                template("phantom", 30, 30),
            ],
            reference(),
        );
        let (subscriber, handle) = subscriber::mock()
            .event(
                expect::event()
                    .at_level(tracing::Level::DEBUG)
                    .with_fields(expect::msg("Ignoring programs without a matching channel")),
            )
            .only()
            .run_with_handle();

        // Act
        let guide = with_default(subscriber, || assemble(&channels, &programs, reference()));

        // Assert
        handle.assert_finished();
        assert_eq!(guide.len(), 50);
        assert_eq!(guide[7].current_program.as_ref().unwrap().title, "c7@0");
        assert_eq!(guide[49].current_program.as_ref().unwrap().title, "c49@0");
    }

    #[test]
    fn test_assemble_without_orphans_is_silent() {
        use tracing::subscriber::with_default;
        use tracing_mock::subscriber;

        // Arrange
        let channels = vec![channel("c1")];
        let programs = materialize(&[template("c1", 0, 30)], reference());
        let (subscriber, handle) = subscriber::mock().only().run_with_handle();

        // Act
        with_default(subscriber, || {
            let _guide = assemble(&channels, &programs, reference());
        });

        // Assert
        handle.assert_finished();
    }

    #[test]
    fn test_assemble_equal_starts_keep_input_order() {
        // Arrange
        let channels = vec![channel("c1")];
        let mut first = template("c1", 20, 10);
        first.title = String::from("first");
        let mut second = template("c1", 20, 10);
        second.title = String::from("second");
        let programs = materialize(&[first, template("c1", 5, 10), second], reference());

        // Act
        let guide = assemble(&channels, &programs, reference() - TimeDelta::minutes(60));

        // Assert
        assert_eq!(
            titles(&guide[0].upcoming_programs),
            vec!["c1@5", "first", "second"]
        );
    }

    #[test]
    fn test_assemble_invariants_hold_across_instants() {
        // Arrange
        let channels = vec![channel("c1"), channel("c2")];
        let programs = materialize(
            &[
                template("c1", -30, 30),
                template("c2", -45, 60),
                template("c1", 0, 30),
                template("c1", 30, 60),
                template("c2", 15, 15),
                template("c2", 40, 20),
            ],
            reference(),
        );

        for minutes in (-60..=120).step_by(5) {
            let at = reference() + TimeDelta::minutes(minutes);

            // Act
            let guide = assemble(&channels, &programs, at);

            // Assert
            assert_eq!(guide.len(), channels.len());
            for entry in &guide {
                assert!(
                    entry
                        .upcoming_programs
                        .windows(2)
                        .all(|w| w[0].start <= w[1].start)
                );
                if let Some(current) = &entry.current_program {
                    assert!(current.start <= at && at <= current.end);
                    assert!(entry.upcoming_programs.iter().all(|p| p.start > current.end));
                }
            }
        }
    }

    #[test]
    fn test_split_current_empty_schedule() {
        // Arrange & Act
        let (current, upcoming) = split_current(&[], reference());

        // Assert
        assert!(current.is_none());
        assert!(upcoming.is_empty());
    }
}
