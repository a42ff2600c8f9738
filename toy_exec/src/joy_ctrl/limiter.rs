//! Outgoing command rate limiting and speed smoothing

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

use util::{maths::ang_dist_deg, time::secs_to_duration};

use super::DriveCmd;
use crate::params::LimiterParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Once the smoothed speed is this close to its target it takes the target value.
const SNAP_DISTANCE: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// First order exponential smoothing of the speed demand.
#[derive(Debug, Clone)]
pub struct SpeedSmoother {
    alpha: f64,
    value: f64,
}

/// Decides which drive commands are sent to the toy.
#[derive(Debug, Clone)]
pub struct CommandShaper {
    params: LimiterParams,

    smoother: SpeedSmoother,

    /// Last command sent, `None` until the first one
    last_sent: Option<DriveCmd>,

    /// Unsmoothed speed offered with the last command sent
    last_target: Option<u8>,

    last_send: Option<Instant>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpeedSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.max(0.0).min(1.0),
            value: 0.0,
        }
    }

    /// Move the smoothed value towards `target` and return it.
    pub fn update(&mut self, target: f64) -> f64 {
        let next = self.alpha * target + (1.0 - self.alpha) * self.value;

        self.value = if (next - target).abs() < SNAP_DISTANCE {
            target
        }
        else {
            next
        };

        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

impl CommandShaper {
    pub fn new(params: LimiterParams) -> Self {
        Self {
            smoother: SpeedSmoother::new(params.smooth_alpha),
            params,
            last_sent: None,
            last_target: None,
            last_send: None,
        }
    }

    /// Whether `cmd` differs enough from the last command sent, and enough time has passed since,
    /// to be worth sending.
    pub fn should_send(&self, cmd: &DriveCmd, now: Instant) -> bool {
        if !self.interval_elapsed(now) {
            return false;
        }

        match self.last_sent {
            None => true,
            Some(last) => {
                let dh = ang_dist_deg(cmd.heading_deg, last.heading_deg);
                let ds = (cmd.speed as i16 - last.speed as i16).abs();

                dh >= self.params.min_heading_delta_deg || ds >= self.params.min_speed_delta as i16
            }
        }
    }

    /// Offer a new command, returning the command to transmit if it is accepted.
    ///
    /// The speed is smoothed on every offer and the transmitted speed is the smoothed one. While
    /// the offered speed is held, the step which brings the smoothed speed onto it is sent even if
    /// smaller than the speed delta.
    pub fn offer(&mut self, cmd: DriveCmd, now: Instant) -> Option<DriveCmd> {
        let speed = self.smoother.update(cmd.speed as f64).round() as u8;
        let smoothed = DriveCmd {
            heading_deg: cmd.heading_deg,
            speed,
        };

        let settles = speed == cmd.speed
            && self.last_target == Some(cmd.speed)
            && self.last_sent.map_or(false, |last| last.speed != speed);

        if !self.should_send(&smoothed, now) && !(settles && self.interval_elapsed(now)) {
            return None;
        }

        self.last_sent = Some(smoothed);
        self.last_target = Some(cmd.speed);
        self.last_send = Some(now);

        Some(smoothed)
    }

    /// Record a stop, returning true if a zero speed command must be transmitted.
    ///
    /// Stops are not rate limited, but only one is sent after the toy was last told to move.
    pub fn stop(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(ref mut last) if last.speed != 0 => {
                last.speed = 0;
                self.last_target = None;
                self.last_send = Some(now);
                self.smoother.reset();
                true
            },
            _ => false
        }
    }

    /// Forget everything sent so far, the next command is always accepted.
    pub fn reset(&mut self) {
        self.last_sent = None;
        self.last_target = None;
        self.last_send = None;
        self.smoother.reset();
    }

    pub fn last_sent(&self) -> Option<DriveCmd> {
        self.last_sent
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        let interval = secs_to_duration(self.params.min_command_interval_s);

        match self.last_send {
            Some(t) => now.saturating_duration_since(t) >= interval,
            None => true
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn cmd(heading_deg: f64, speed: u8) -> DriveCmd {
        DriveCmd { heading_deg, speed }
    }

    /// Shaper without smoothing, so sent speeds equal offered ones.
    fn unsmoothed() -> CommandShaper {
        CommandShaper::new(LimiterParams {
            smooth_alpha: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_rate_limit() {
        let mut shaper = unsmoothed();
        let t0 = Instant::now();

        assert!(shaper.offer(cmd(0.0, 100), t0).is_some());

        // Same command inside the interval
        assert!(shaper.offer(cmd(0.0, 100), t0 + Duration::from_millis(10)).is_none());

        // Even a large change waits for the interval
        assert!(shaper.offer(cmd(180.0, 250), t0 + Duration::from_millis(20)).is_none());
        assert!(shaper.offer(cmd(180.0, 250), t0 + Duration::from_millis(40)).is_some());
    }

    #[test]
    fn test_suppression_boundaries() {
        let mut shaper = unsmoothed();
        let t0 = Instant::now();
        let step = Duration::from_millis(50);

        assert!(shaper.offer(cmd(10.0, 100), t0).is_some());

        // Below both thresholds
        assert!(shaper.offer(cmd(12.0, 104), t0 + step).is_none());

        // Exactly 3 degrees
        assert!(shaper.offer(cmd(13.0, 100), t0 + step * 2).is_some());

        // Exactly 5 units
        assert!(shaper.offer(cmd(13.0, 105), t0 + step * 3).is_some());
        assert!(shaper.offer(cmd(13.0, 100), t0 + step * 4).is_some());
    }

    #[test]
    fn test_heading_delta_wraps() {
        let mut shaper = unsmoothed();
        let t0 = Instant::now();
        let step = Duration::from_millis(50);

        assert!(shaper.offer(cmd(359.0, 100), t0).is_some());
        assert!(shaper.offer(cmd(1.0, 100), t0 + step).is_none());
        assert!(shaper.offer(cmd(2.0, 100), t0 + step * 2).is_some());
    }

    #[test]
    fn test_smoothing_converges() {
        let mut smoother = SpeedSmoother::new(0.45);

        let mut steps = 0;
        while smoother.value() != 200.0 {
            smoother.update(200.0);
            steps += 1;
            assert!(steps <= 12, "smoothing did not converge");
        }

        // And stays there
        assert_eq!(smoother.update(200.0), 200.0);
    }

    #[test]
    fn test_sent_speed_is_smoothed() {
        let mut shaper = CommandShaper::new(LimiterParams::default());
        let t0 = Instant::now();

        let first = shaper.offer(cmd(0.0, 200), t0).unwrap();
        assert_eq!(first.speed, 90);

        let second = shaper.offer(cmd(0.0, 200), t0 + Duration::from_millis(50)).unwrap();
        assert!(second.speed > first.speed && second.speed < 200);
    }

    #[test]
    fn test_held_speed_reaches_target() {
        let mut shaper = CommandShaper::new(LimiterParams::default());
        let t0 = Instant::now();
        let tick = Duration::from_millis(10);

        let sent: Vec<u8> = (0..100)
            .filter_map(|i| shaper.offer(cmd(0.0, 200), t0 + tick * i))
            .map(|c| c.speed)
            .collect();

        assert_eq!(sent[0], 90);
        assert!(sent.windows(2).all(|w| w[0] < w[1]), "sent {:?}", sent);
        assert_eq!(sent.last(), Some(&200));
        assert_eq!(shaper.last_sent().unwrap().speed, 200);
    }

    #[test]
    fn test_single_stop() {
        let mut shaper = unsmoothed();
        let t0 = Instant::now();

        // Nothing sent yet, nothing to stop
        assert!(!shaper.stop(t0));

        shaper.offer(cmd(0.0, 120), t0).unwrap();
        assert!(shaper.stop(t0));
        assert!(!shaper.stop(t0));
        assert_eq!(shaper.last_sent().unwrap().speed, 0);
    }
}
