use crate::config::IntroConfig;
use crate::intro::speed::SpeedController;
use log::info;
use serde::Serialize;
use std::time::Duration;

/// Lifecycle of the intro. Strictly linear; `Done` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Accelerating,
    Transitioning,
    Done,
}

/// What an evaluation changed. The driver reacts to these; at most one per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    BeginAcceleration,
    BeginTransition { skipped: bool },
    Finish,
}

impl Transition {
    #[inline(always)]
    pub fn target(self) -> Phase {
        match self {
            Transition::BeginAcceleration => Phase::Accelerating,
            Transition::BeginTransition { .. } => Phase::Transitioning,
            Transition::Finish => Phase::Done,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    pub phase: Phase,
    #[serde(rename = "at_ms")]
    #[serde(serialize_with = "as_millis")]
    pub at: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

pub struct PhaseMachine {
    phase: Phase,
    accelerate_at: Duration,
    transition_duration: Duration,
    transition_started: Option<Duration>,
    history: Vec<PhaseChange>,
}

impl PhaseMachine {
    pub fn new(config: &IntroConfig) -> Self {
        Self {
            phase: Phase::Waiting,
            accelerate_at: config.pre_acceleration_delay(),
            transition_duration: config.transition_duration(),
            transition_started: None,
            history: vec![PhaseChange { phase: Phase::Waiting, at: Duration::ZERO }],
        }
    }

    #[inline(always)] pub fn phase(&self) -> Phase { self.phase }
    #[inline(always)] pub fn history(&self) -> &[PhaseChange] { &self.history }

    /// Applies at most one transition for the state at `now`.
    ///
    /// `skip_requested` collapses waiting/accelerating straight into
    /// transitioning (forcing exit velocity first). In transitioning or done
    /// a skip is a pure no-op: no timer check, no transition.
    pub fn evaluate(
        &mut self,
        now: Duration,
        speed: &mut SpeedController,
        skip_requested: bool,
    ) -> Option<Transition> {
        if skip_requested {
            if !matches!(self.phase, Phase::Waiting | Phase::Accelerating) {
                return None;
            }
            speed.force_exit_velocity();
            return Some(self.enter(Transition::BeginTransition { skipped: true }, now));
        }
        if let Some(t) = self.evaluate_timers(now) {
            return Some(t);
        }
        if self.phase == Phase::Accelerating && speed.has_reached_exit_velocity() {
            return Some(self.enter(Transition::BeginTransition { skipped: false }, now));
        }
        None
    }

    /// Only the time-driven transitions: the pre-acceleration delay and the
    /// end of the visual transition. Safe to call from any timer callback.
    pub fn evaluate_timers(&mut self, now: Duration) -> Option<Transition> {
        let transition = match self.phase {
            Phase::Waiting if now >= self.accelerate_at => Transition::BeginAcceleration,
            Phase::Transitioning => {
                let started = self.transition_started.unwrap_or(now);
                if now.saturating_sub(started) < self.transition_duration {
                    return None;
                }
                Transition::Finish
            }
            _ => return None,
        };
        Some(self.enter(transition, now))
    }

    fn enter(&mut self, transition: Transition, now: Duration) -> Transition {
        let from = self.phase;
        self.phase = transition.target();
        if self.phase == Phase::Transitioning {
            self.transition_started = Some(now);
        }
        self.history.push(PhaseChange { phase: self.phase, at: now });
        info!("Intro phase {:?} -> {:?} at {} ms", from, self.phase, now.as_millis());
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn setup() -> (PhaseMachine, SpeedController) {
        let config = IntroConfig { exit_speed: 10.0, ..IntroConfig::default() };
        (PhaseMachine::new(&config), SpeedController::new(&config))
    }

    #[test]
    fn waits_for_the_pre_acceleration_delay() {
        let (mut m, mut s) = setup();
        assert_eq!(m.evaluate(ms(2799), &mut s, false), None);
        assert_eq!(m.phase(), Phase::Waiting);
        assert_eq!(m.evaluate(ms(2800), &mut s, false), Some(Transition::BeginAcceleration));
        assert_eq!(m.phase(), Phase::Accelerating);
    }

    #[test]
    fn exit_velocity_ends_acceleration() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(3000), &mut s, false);
        assert_eq!(m.evaluate(ms(3016), &mut s, false), None);
        while !s.has_reached_exit_velocity() {
            s.tick();
        }
        assert_eq!(
            m.evaluate(ms(4000), &mut s, false),
            Some(Transition::BeginTransition { skipped: false })
        );
    }

    #[test]
    fn transition_lasts_its_configured_duration() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(0), &mut s, true);
        assert_eq!(m.evaluate(ms(799), &mut s, false), None);
        assert_eq!(m.evaluate(ms(800), &mut s, false), Some(Transition::Finish));
        assert_eq!(m.phase(), Phase::Done);
        assert_eq!(m.evaluate(ms(5000), &mut s, false), None);
    }

    #[test]
    fn skip_while_waiting_forces_exit_velocity() {
        let (mut m, mut s) = setup();
        assert_eq!(
            m.evaluate(ms(0), &mut s, true),
            Some(Transition::BeginTransition { skipped: true })
        );
        assert_eq!(m.phase(), Phase::Transitioning);
        assert_eq!(s.speed(), 10.0);
    }

    #[test]
    fn skip_after_transition_started_is_a_no_op() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(0), &mut s, true);
        // even with the transition timer expired, a skip must not finish it
        assert_eq!(m.evaluate(ms(900), &mut s, true), None);
        assert_eq!(m.phase(), Phase::Transitioning);
        assert_eq!(m.evaluate(ms(900), &mut s, false), Some(Transition::Finish));
        assert_eq!(m.evaluate(ms(901), &mut s, true), None);
        assert_eq!(m.phase(), Phase::Done);
    }

    #[test]
    fn skip_while_accelerating_forces_exit_velocity() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(2800), &mut s, false);
        s.tick();
        assert!(s.speed() < 10.0);
        assert_eq!(
            m.evaluate(ms(2816), &mut s, true),
            Some(Transition::BeginTransition { skipped: true })
        );
        assert_eq!(s.speed(), 10.0);
    }

    #[test]
    fn timers_alone_never_end_acceleration() {
        let (mut m, mut s) = setup();
        assert_eq!(m.evaluate_timers(ms(2800)), Some(Transition::BeginAcceleration));
        s.force_exit_velocity();
        assert_eq!(m.evaluate_timers(ms(9000)), None);
        assert_eq!(m.phase(), Phase::Accelerating);
    }

    #[test]
    fn timers_finish_the_transition_once() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(100), &mut s, true);
        assert_eq!(m.evaluate_timers(ms(899)), None);
        assert_eq!(m.evaluate_timers(ms(900)), Some(Transition::Finish));
        assert_eq!(m.evaluate_timers(ms(2000)), None);
        assert_eq!(m.evaluate(ms(2000), &mut s, false), None);
    }

    #[test]
    fn history_is_monotonic_and_linear() {
        let (mut m, mut s) = setup();
        m.evaluate(ms(2800), &mut s, false);
        m.evaluate(ms(2900), &mut s, true);
        m.evaluate(ms(2950), &mut s, true);
        m.evaluate(ms(3700), &mut s, false);
        let phases: Vec<Phase> = m.history().iter().map(|c| c.phase).collect();
        assert_eq!(
            phases,
            vec![Phase::Waiting, Phase::Accelerating, Phase::Transitioning, Phase::Done]
        );
        assert!(m.history().windows(2).all(|w| w[0].phase < w[1].phase && w[0].at <= w[1].at));
    }
}
