use log::debug;

/// Raw pointer input from the host (mouse button or touch).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Pressed { x: f32, y: f32 },
    Released { x: f32, y: f32 },
    /// Touch stolen by the platform, pointer left the window, etc.
    Cancelled,
}

#[derive(Default, Debug)]
pub struct PointerState {
    pressed_at: Option<(f32, f32)>,
}

pub fn init_state() -> PointerState {
    PointerState::default()
}

/// Feeds one pointer event. Returns `true` when a press/release pair completes
/// a tap, which the intro treats as its skip gesture.
pub fn handle_pointer(event: PointerEvent, state: &mut PointerState) -> bool {
    match event {
        PointerEvent::Pressed { x, y } => {
            state.pressed_at = Some((x, y));
            false
        }
        PointerEvent::Released { x, y } => match state.pressed_at.take() {
            Some((px, py)) => {
                debug!("Tap ({:.0}, {:.0}) -> ({:.0}, {:.0})", px, py, x, y);
                true
            }
            None => false,
        },
        PointerEvent::Cancelled => {
            state.pressed_at = None;
            false
        }
    }
}
