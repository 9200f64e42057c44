// View (camera) control for the tracked application.
// Visual expectation: asking for an angle turns the in-game view by that much in
// one pointer move.
//
// The application turns its view by a fixed number of degrees per pointer
// pixel, scaled by its in-game sensitivity. `ViewController` keeps its own
// estimate of yaw and pitch. The estimate is open loop: nothing reads the real
// orientation back, so if the application does not apply a move exactly
// (acceleration, clamping at the pitch limits, the user touching the mouse) the
// tracked values drift until the next `ViewController::reset`. Yaw has no
// absolute reference and is never recentered.

use crate::config::ViewConfig;
use crate::error::Error;
use crate::input::InputSink;
use log::debug;
use std::thread;
use std::time::Duration;

/// Degrees to pointer pixels: `-round(angle * ratio / sensitivity)`.
/// Positive angles (left / up) map to negative pointer motion.
pub fn angle_to_pixel(angle_deg: f64, axis_ratio: f64, sensitivity: f64) -> i32 {
    -((angle_deg * axis_ratio / sensitivity).round() as i32)
}

/// Tracked orientation, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Positive is left.
    pub yaw: f64,
    /// Positive is up.
    pub pitch: f64,
    pub sensitivity: f64,
}

pub struct ViewController<S: InputSink> {
    sink: S,
    cfg: ViewConfig,
    state: ViewState,
}

impl<S: InputSink> ViewController<S> {
    pub fn new(sink: S, cfg: &ViewConfig) -> Self {
        Self {
            sink,
            cfg: cfg.clone(),
            state: ViewState { yaw: 0.0, pitch: 0.0, sensitivity: cfg.sensitivity },
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Match the application's sensitivity setting.
    pub fn set_sensitivity(&mut self, sensitivity: f64) -> Result<(), Error> {
        if !(sensitivity > 0.0) {
            return Err(Error::Config(format!("sensitivity must be positive, got {sensitivity}")));
        }
        self.state.sensitivity = sensitivity;
        Ok(())
    }

    /// Turn by `pitch` / `yaw` degrees in a single pointer move.
    /// Does not touch the tracked state.
    pub fn move_relative(&mut self, pitch: f64, yaw: f64) -> Result<(), Error> {
        let dx = angle_to_pixel(yaw, self.cfg.yaw_ratio, self.state.sensitivity);
        let dy = angle_to_pixel(pitch, self.cfg.pitch_ratio, self.state.sensitivity);
        debug!("view move pitch={pitch:.2} yaw={yaw:.2} -> pointer ({dx},{dy})");
        self.sink.move_relative(dx, dy)
    }

    pub fn set_pitch(&mut self, pitch: f64) -> Result<(), Error> {
        let err = pitch - self.state.pitch;
        self.move_relative(err, 0.0)?;
        self.state.pitch = pitch;
        Ok(())
    }

    pub fn set_yaw(&mut self, yaw: f64) -> Result<(), Error> {
        let err = yaw - self.state.yaw;
        self.move_relative(0.0, err)?;
        self.state.yaw = yaw;
        Ok(())
    }

    /// Slam the view into the upper pitch clamp, then come back down 90 degrees,
    /// which lands on level regardless of where pitch was. Tracked pitch becomes 0.
    pub fn reset(&mut self) -> Result<(), Error> {
        let pause = Duration::from_millis(self.cfg.reset_pause_ms);
        self.move_relative(180.0, 0.0)?;
        thread::sleep(pause);
        self.move_relative(-90.0, 0.0)?;
        thread::sleep(pause);
        self.state.pitch = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::RecordingInput;

    fn controller() -> ViewController<RecordingInput> {
        let cfg = ViewConfig { reset_pause_ms: 0, ..ViewConfig::default() };
        ViewController::new(RecordingInput::default(), &cfg)
    }

    #[test]
    fn zero_angle_is_zero_pixels() {
        for s in [0.01, 0.15, 1.0, 7.5] {
            assert_eq!(angle_to_pixel(0.0, 1.515, s), 0);
        }
    }

    #[test]
    fn doubling_sensitivity_halves_the_delta() {
        let a = angle_to_pixel(30.0, 1.5, 0.15);
        let b = angle_to_pixel(30.0, 1.5, 0.30);
        assert_eq!(a, -300);
        assert_eq!(b, -150);
    }

    #[test]
    fn delta_is_linear_in_angle_and_sign_flipped() {
        assert_eq!(angle_to_pixel(10.0, 1.5, 1.0), -15);
        assert_eq!(angle_to_pixel(20.0, 1.5, 1.0), -30);
        assert_eq!(angle_to_pixel(-20.0, 1.5, 1.0), 30);
    }

    #[test]
    fn delta_rounds_to_nearest() {
        // 1.515 * 1 / 0.15 = 10.1
        assert_eq!(angle_to_pixel(1.0, 1.515, 0.15), -10);
        // 0.7 * 1.5 / 1.0 = 1.05
        assert_eq!(angle_to_pixel(0.7, 1.5, 1.0), -1);
        assert_eq!(angle_to_pixel(1.0, 1.5, 1.0), -2);
    }

    #[test]
    fn move_relative_sends_both_axes_at_once() {
        let mut v = controller();
        v.move_relative(9.0, -3.0).unwrap();
        assert_eq!(v.sink().moves, vec![(30, -90)]);
        assert_eq!(v.state().pitch, 0.0);
    }

    #[test]
    fn set_pitch_moves_by_the_error_then_tracks_target() {
        let mut v = controller();
        v.set_pitch(15.0).unwrap();
        v.set_pitch(5.0).unwrap();
        assert_eq!(v.sink().moves, vec![(0, -150), (0, 100)]);
        assert_eq!(v.state().pitch, 5.0);
        assert_eq!(v.state().yaw, 0.0);
    }

    #[test]
    fn set_yaw_only_moves_horizontally() {
        let mut v = controller();
        v.set_yaw(-30.0).unwrap();
        assert_eq!(v.sink().moves, vec![(303, 0)]);
        assert_eq!(v.state().yaw, -30.0);
    }

    #[test]
    fn reset_always_lands_on_level_pitch() {
        for start in [-90.0, -12.5, 0.0, 44.0, 90.0] {
            let mut v = controller();
            v.set_pitch(start).unwrap();
            v.set_yaw(20.0).unwrap();
            v.reset().unwrap();
            assert_eq!(v.state().pitch, 0.0);
            assert_eq!(v.state().yaw, 20.0);
            let tail = &v.sink().moves[v.sink().moves.len() - 2..];
            assert_eq!(tail, &[(0, -1800), (0, 900)]);
        }
    }

    #[test]
    fn sensitivity_must_be_positive() {
        let mut v = controller();
        assert!(v.set_sensitivity(0.0).is_err());
        v.set_sensitivity(0.3).unwrap();
        v.move_relative(0.0, 20.0).unwrap();
        assert_eq!(v.sink().moves, vec![(-101, 0)]);
    }
}
