use log::debug;
use std::time::Duration;

/// A line of intro text that becomes visible at a fixed offset from engine start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEvent {
    pub offset: Duration,
    pub line: usize,
    fired: bool,
}

/// Fixed reveal schedule driven by elapsed time only.
///
/// Phase changes never cancel or hurry it: after a skip the remaining
/// lines still appear on schedule.
pub struct TextSequencer {
    events: Vec<TextEvent>,
}

impl TextSequencer {
    /// One event per offset; the offset's position is the line it reveals.
    pub fn new(offsets_ms: &[u64]) -> Self {
        let events = offsets_ms
            .iter()
            .enumerate()
            .map(|(line, &ms)| TextEvent { offset: Duration::from_millis(ms), line, fired: false })
            .collect();
        Self { events }
    }

    /// Lines whose offset has been reached by `elapsed`, each returned exactly once.
    /// Ordered by offset, then by line, whatever order they were configured in.
    pub fn due(&mut self, elapsed: Duration) -> Vec<usize> {
        let mut due: Vec<&mut TextEvent> = self
            .events
            .iter_mut()
            .filter(|e| !e.fired && e.offset <= elapsed)
            .collect();
        due.sort_by_key(|e| (e.offset, e.line));
        due.into_iter()
            .map(|e| {
                e.fired = true;
                debug!("Reveal text line {} at {} ms", e.line, elapsed.as_millis());
                e.line
            })
            .collect()
    }

    #[inline(always)]
    pub fn pending(&self) -> usize {
        self.events.iter().filter(|e| !e.fired).count()
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.pending() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn each_event_fires_once() {
        let mut seq = TextSequencer::new(&[500, 1200, 2000]);
        assert!(seq.due(ms(499)).is_empty());
        assert_eq!(seq.due(ms(500)), vec![0]);
        assert!(seq.due(ms(600)).is_empty());
        assert_eq!(seq.due(ms(5000)), vec![1, 2]);
        assert!(seq.due(ms(9000)).is_empty());
        assert!(seq.is_finished());
    }

    #[test]
    fn unordered_offsets_fire_in_time_order() {
        let mut seq = TextSequencer::new(&[2000, 500, 500]);
        assert_eq!(seq.pending(), 3);
        assert_eq!(seq.due(ms(2500)), vec![1, 2, 0]);
    }

    #[test]
    fn empty_schedule_is_finished_immediately() {
        let mut seq = TextSequencer::new(&[]);
        assert!(seq.is_finished());
        assert!(seq.due(ms(0)).is_empty());
    }
}
