use std::time::Duration;

/// Frame-rate meter over the engine's own clock, so it reads the same in
/// headless runs as on a display.
pub struct FPSCounter {
    window: Duration,
    frames_in_window: u32,
}

impl FPSCounter {
    pub fn new() -> Self {
        FPSCounter { window: Duration::ZERO, frames_in_window: 0 }
    }

    /// Call once per rendered frame with that frame's `dt`.
    /// Returns `Some(fps)` once per simulated second.
    pub fn update(&mut self, dt: Duration) -> Option<u32> {
        self.frames_in_window += 1;
        self.window += dt;

        if self.window >= Duration::from_secs(1) {
            let fps = self.frames_in_window;
            self.frames_in_window = 0;
            self.window -= Duration::from_secs(1);
            // a huge dt (debugger pause) would otherwise report for several seconds
            if self.window >= Duration::from_secs(1) {
                self.window = Duration::ZERO;
            }
            Some(fps)
        } else {
            None
        }
    }
}
