use crate::config::IntroConfig;

/// Forward speed with a quadratic ramp: acceleration itself grows every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedController {
    speed: f32,
    acceleration: f32,
    growth: f32,
    exit_speed: f32,
    ticks: u32,
}

impl SpeedController {
    pub fn new(config: &IntroConfig) -> Self {
        Self {
            speed: config.initial_speed,
            acceleration: config.initial_acceleration,
            growth: config.acceleration_growth,
            exit_speed: config.exit_speed,
            ticks: 0,
        }
    }

    #[inline(always)] pub fn speed(&self) -> f32 { self.speed }

    /// Number of accelerating ticks applied so far.
    #[inline(always)] pub fn ticks(&self) -> u32 { self.ticks }

    /// One accelerating step. Only the driver calls this, and only while accelerating.
    pub fn tick(&mut self) {
        self.speed += self.acceleration;
        self.acceleration += self.growth;
        self.ticks += 1;
    }

    #[inline(always)]
    pub fn has_reached_exit_velocity(&self) -> bool {
        self.speed >= self.exit_speed
    }

    /// Skip path: jump straight to exit velocity. Never slows down.
    pub fn force_exit_velocity(&mut self) {
        self.speed = self.speed.max(self.exit_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> IntroConfig {
        IntroConfig {
            particle_count: 10,
            exit_speed: 10.0,
            initial_speed: 1.5,
            initial_acceleration: 0.03,
            acceleration_growth: 0.005,
            ..IntroConfig::default()
        }
    }

    fn ticks_to_exit(config: &IntroConfig) -> u32 {
        let mut s = SpeedController::new(config);
        while !s.has_reached_exit_velocity() {
            s.tick();
        }
        s.ticks()
    }

    #[test]
    fn ramp_is_quadratic_not_linear() {
        let mut s = SpeedController::new(&scenario_a());
        let mut deltas = Vec::new();
        let mut last = s.speed();
        for _ in 0..5 {
            s.tick();
            deltas.push(s.speed() - last);
            last = s.speed();
        }
        for pair in deltas.windows(2) {
            assert!(pair[1] > pair[0], "speed increments must grow: {:?}", deltas);
        }
    }

    #[test]
    fn speed_is_strictly_increasing_with_positive_acceleration() {
        let mut s = SpeedController::new(&scenario_a());
        for _ in 0..200 {
            let before = s.speed();
            s.tick();
            assert!(s.speed() > before);
        }
    }

    #[test]
    fn ticks_to_exit_are_deterministic() {
        let config = scenario_a();
        let first = ticks_to_exit(&config);
        assert_eq!(first, ticks_to_exit(&config));
        // 1.5 + 0.03n + 0.005 n(n-1)/2 >= 10  ->  n = 54
        assert_eq!(first, 54);
    }

    #[test]
    fn forcing_exit_velocity_never_slows_down() {
        let mut s = SpeedController::new(&scenario_a());
        s.force_exit_velocity();
        assert_eq!(s.speed(), 10.0);
        assert!(s.has_reached_exit_velocity());

        let mut fast = SpeedController::new(&IntroConfig { initial_speed: 20.0, ..scenario_a() });
        fast.force_exit_velocity();
        assert_eq!(fast.speed(), 20.0);
    }
}
