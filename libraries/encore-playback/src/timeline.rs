//! Timeline events derived from the player state stream
//!
//! [`TimelineTracker`] is a pure state machine: feed it every observed
//! [`PlayerState`] in order and it reports what happened since the previous
//! one, in the vocabulary the scrobble manager understands.

use crate::state::PlayerState;
use crate::types::PlaybackPhase;
use encore_core::Track;

/// Something that happened on the playback timeline
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// A listening session begins for this track
    TrackStarted(Track),
    Paused,
    Resumed,
    /// Observed while playing
    Progress { position_ms: u64, duration_ms: u64 },
    /// The open session is over
    TrackEnded,
}

/// Turns successive player states into timeline events
#[derive(Debug, Default)]
pub struct TimelineTracker {
    track_id: Option<String>,
    phase: PlaybackPhase,
    session_open: bool,
}

impl TimelineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events implied by moving from the previously observed state to `state`
    pub fn observe(&mut self, state: &PlayerState) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        let previous_phase = std::mem::replace(&mut self.phase, state.phase);

        if state.current_track_id() != self.track_id.as_deref() {
            self.track_id = state.current_track_id().map(str::to_string);
            self.close(&mut events);

            if let Some(track) = &state.current_track {
                events.push(TimelineEvent::TrackStarted(track.clone()));
                self.session_open = true;
                // Loading or waiting for autoplay is not listening time
                if state.phase != PlaybackPhase::Playing {
                    events.push(TimelineEvent::Paused);
                }
            }
        } else if state.phase != previous_phase {
            match state.phase {
                PlaybackPhase::Playing if self.session_open => events.push(TimelineEvent::Resumed),
                PlaybackPhase::Playing => {
                    // Replaying a track whose session was closed
                    if let Some(track) = &state.current_track {
                        events.push(TimelineEvent::TrackStarted(track.clone()));
                        self.session_open = true;
                    }
                }
                PlaybackPhase::Paused | PlaybackPhase::Loading if self.session_open => {
                    events.push(TimelineEvent::Paused);
                }
                PlaybackPhase::Ended | PlaybackPhase::Error => self.close(&mut events),
                PlaybackPhase::Idle if previous_phase.is_active() => self.close(&mut events),
                _ => {}
            }
        }

        if state.phase == PlaybackPhase::Playing && self.session_open {
            events.push(TimelineEvent::Progress {
                position_ms: state.position_ms,
                duration_ms: state.duration_ms,
            });
        }

        events
    }

    fn close(&mut self, events: &mut Vec<TimelineEvent>) {
        if self.session_open {
            events.push(TimelineEvent::TrackEnded);
            self.session_open = false;
        }
    }
}
