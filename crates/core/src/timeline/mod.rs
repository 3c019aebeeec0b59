use serde::{Deserialize, Serialize};
use tracing::debug;

/// Host transport state delivered with each processing block.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayheadInfo {
    pub is_playing: bool,
    pub time_seconds: f64,
}

impl PlayheadInfo {
    pub fn playing(time_seconds: f64) -> Self {
        Self {
            is_playing: true,
            time_seconds,
        }
    }

    pub fn stopped(time_seconds: f64) -> Self {
        Self {
            is_playing: false,
            time_seconds,
        }
    }
}

/// Transport edge detected by [`PlaybackClock::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportChange {
    Started,
    Stopped,
    Unchanged,
}

/// Tracks host play state and the time elapsed since play started.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    is_playing: bool,
    needs_initialization: bool,
    init_time_on_play: f64,
    current_time: f64,
    last_tick_time: Option<f64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn init_time_on_play(&self) -> f64 {
        self.init_time_on_play
    }

    /// Seconds since the host started playing.
    pub fn elapsed(&self) -> f64 {
        (self.current_time - self.init_time_on_play).max(0.0)
    }

    /// Consumes the transport state of one block. Negative host times are
    /// treated as zero.
    pub fn update(&mut self, playhead: PlayheadInfo) -> TransportChange {
        let was_playing = self.is_playing;
        self.is_playing = playhead.is_playing;

        let change = match (was_playing, playhead.is_playing) {
            (false, true) => {
                self.needs_initialization = true;
                TransportChange::Started
            }
            (true, false) => TransportChange::Stopped,
            _ => TransportChange::Unchanged,
        };

        let time = if playhead.time_seconds.is_finite() {
            playhead.time_seconds.max(0.0)
        } else {
            self.current_time
        };
        if self.needs_initialization && playhead.is_playing {
            self.init_time_on_play = time;
            self.needs_initialization = false;
            debug!(time, "transport started");
        }
        self.current_time = time;
        change
    }

    /// Whether the host time moved since the previous call.
    pub fn take_time_changed(&mut self) -> bool {
        let changed = self.last_tick_time != Some(self.current_time);
        self.last_tick_time = Some(self.current_time);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_records_the_play_origin() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.update(PlayheadInfo::playing(12.0)), TransportChange::Started);
        assert_eq!(clock.update(PlayheadInfo::playing(13.5)), TransportChange::Unchanged);

        assert_eq!(clock.init_time_on_play(), 12.0);
        assert_eq!(clock.elapsed(), 1.5);
    }

    #[test]
    fn stop_is_reported_once() {
        let mut clock = PlaybackClock::new();
        clock.update(PlayheadInfo::playing(0.0));
        assert_eq!(clock.update(PlayheadInfo::stopped(1.0)), TransportChange::Stopped);
        assert_eq!(clock.update(PlayheadInfo::stopped(1.0)), TransportChange::Unchanged);
        assert!(!clock.is_playing());
    }

    #[test]
    fn restarting_moves_the_origin() {
        let mut clock = PlaybackClock::new();
        clock.update(PlayheadInfo::playing(2.0));
        clock.update(PlayheadInfo::stopped(4.0));
        clock.update(PlayheadInfo::playing(-1.0));

        assert_eq!(clock.init_time_on_play(), 0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn time_change_is_edge_triggered() {
        let mut clock = PlaybackClock::new();
        clock.update(PlayheadInfo::playing(1.0));
        assert!(clock.take_time_changed());
        assert!(!clock.take_time_changed());

        clock.update(PlayheadInfo::playing(1.02));
        assert!(clock.take_time_changed());
    }
}
