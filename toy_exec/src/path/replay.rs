//! Segment traversal

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;
use log::{debug, info, warn};

use toy_if::{Advisory, Location, Toy, ToyError};
use util::time::sleep_s;

use super::{pct_to_speed, seconds_for_distance, Path, Segment};
use crate::{interrupt::RunFlag, params::ReplayParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Duration of the stop roll ending a probe drive.
///
/// Units: seconds
const PROBE_STOP_S: f64 = 0.1;

/// Fraction of a timed pulse ignored when splitting a timed drive, so rounding in the time
/// estimate does not add a near zero length roll.
const PULSE_COUNT_TOLERANCE: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drives a [`Path`] on a toy.
pub struct Replayer {
    params: ReplayParams,

    strategy: Strategy,

    /// Cruise drive speed
    speed: u8,

    /// Drive speed near the end of a segment
    approach_speed: u8,

    /// Distance covered per second at the cruise speed.
    ///
    /// Units: centimeters/second
    cmps: f64,

    run_flag: RunFlag,
}

/// Outcome of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReport {
    pub segment: Segment,

    pub end: SegmentEnd,

    /// Distance measured by the locator, `None` under the timed strategy.
    ///
    /// Units: centimeters
    pub travelled_cm: Option<f64>,

    /// Total duration of the drive commands issued for this segment.
    ///
    /// Units: seconds
    pub commanded_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LapReport {
    /// Lap number, from 1
    pub lap: u32,

    pub segments: Vec<SegmentReport>,

    /// Units: seconds
    pub lap_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the end of each segment is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Drive for the time the distance should take
    Timed,

    /// Drive short pulses until the locator shows the distance has been covered
    Locator,
}

/// Why a segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    /// The timed drive completed
    Timed,

    /// The locator showed the target distance was reached
    Reached,

    /// The segment took longer than its time ceiling
    Timeout,

    /// An acceleration spike was measured
    Collision,

    /// The locator stopped reporting, the rest of the segment was driven timed
    LocatorLost,
}

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("Drive command failed: {0}")]
    ToyError(#[from] ToyError),

    #[error("Replay interrupted")]
    Interrupted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SegmentEnd {
    /// True if the segment stopped before its distance was known to be covered.
    pub fn is_shortfall(&self) -> bool {
        matches!(self, SegmentEnd::Timeout | SegmentEnd::Collision)
    }
}

impl Replayer {
    /// Create a new replayer.
    ///
    /// `speed_pct` is limited to `[10, 100]` percent of the maximum speed, `cmps` is the distance
    /// covered per second at that speed.
    pub fn new(
        params: ReplayParams,
        strategy: Strategy,
        speed_pct: f64,
        cmps: f64,
        run_flag: RunFlag
    ) -> Self {
        Self {
            speed: pct_to_speed(speed_pct),
            approach_speed: pct_to_speed(params.approach_speed_pct),
            params,
            strategy,
            cmps,
            run_flag,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Drive the path `laps` times.
    pub fn run_laps<T: Toy>(
        &self,
        toy: &mut T,
        path: &Path,
        laps: u32
    ) -> Result<Vec<LapReport>, ReplayError> {
        info!(
            "Replaying {} segments ({:.0} cm) x {} laps, {:?} strategy, speed {}",
            path.len(),
            path.total_distance_cm(),
            laps,
            self.strategy,
            self.speed
        );

        // Collision notifications are not used and can stall the bridge
        toy.disable_collision_detection().advisory("disable_collision_detection");

        let mut reports = Vec::with_capacity(laps as usize);

        for lap in 1..=laps {
            if lap > 1 {
                if let Some(first) = path.segments().first() {
                    self.realign(toy, first.heading_deg)?;
                }
            }

            reports.push(self.run_lap(toy, path, lap)?);
        }

        Ok(reports)
    }

    /// Count down then drive every segment once.
    pub fn run_lap<T: Toy>(
        &self,
        toy: &mut T,
        path: &Path,
        lap: u32
    ) -> Result<LapReport, ReplayError> {
        self.countdown()?;

        let lap_start = Instant::now();
        let mut segments = Vec::with_capacity(path.len());

        for segment in path.segments() {
            self.check_running()?;

            let report = self.run_segment(toy, segment)?;

            debug!(
                "Segment {} cm @ {} deg: {:?} after {:.2} s",
                segment.distance_cm,
                segment.heading_deg,
                report.end,
                report.commanded_s
            );

            segments.push(report);
        }

        let lap_time_s = lap_start.elapsed().as_secs_f64();
        info!("Lap {} time: {:.3} s", lap, lap_time_s);

        Ok(LapReport {
            lap,
            segments,
            lap_time_s,
        })
    }

    /// Drive one segment with the configured strategy, then settle.
    pub fn run_segment<T: Toy>(
        &self,
        toy: &mut T,
        segment: &Segment
    ) -> Result<SegmentReport, ReplayError> {
        toy.set_heading(segment.heading_deg)?;

        let report = match self.strategy {
            Strategy::Timed => {
                let commanded_s = self.drive_timed(toy, segment.heading_deg, segment.distance_cm)?;
                SegmentReport {
                    segment: *segment,
                    end: SegmentEnd::Timed,
                    travelled_cm: None,
                    commanded_s,
                }
            },
            Strategy::Locator => self.drive_located(toy, segment)?
        };

        // Short stop marking the end of the segment before the next heading change
        toy.roll(segment.heading_deg, 0, self.params.settle_s)?;

        Ok(report)
    }

    fn drive_timed<T: Toy>(
        &self,
        toy: &mut T,
        heading_deg: u16,
        distance_cm: f64
    ) -> Result<f64, ReplayError> {
        let duration_s = seconds_for_distance(distance_cm, self.cmps);

        if self.params.timed_pulse_s <= 0.0 {
            self.check_running()?;
            toy.roll(heading_deg, self.speed, duration_s)?;
            return Ok(duration_s);
        }

        // Rolls of at most timed_pulse_s, the last one takes the remainder
        let num_pulses = (duration_s / self.params.timed_pulse_s - PULSE_COUNT_TOLERANCE)
            .ceil()
            .max(0.0) as usize;

        for i in 0..num_pulses {
            self.check_running()?;

            let pulse_s = if i + 1 == num_pulses {
                duration_s - i as f64 * self.params.timed_pulse_s
            }
            else {
                self.params.timed_pulse_s
            };

            toy.roll(heading_deg, self.speed, pulse_s)?;
        }

        Ok(duration_s)
    }

    fn drive_located<T: Toy>(
        &self,
        toy: &mut T,
        segment: &Segment
    ) -> Result<SegmentReport, ReplayError> {
        let ceiling_s = seconds_for_distance(segment.distance_cm, self.cmps)
            * self.params.ceiling_factor
            + self.params.ceiling_margin_s;

        if let Err(e) = toy.reset_locator() {
            warn!("Could not reset the locator ({}), driving the segment timed", e);
            let commanded_s = self.drive_timed(toy, segment.heading_deg, segment.distance_cm)?;
            return Ok(SegmentReport {
                segment: *segment,
                end: SegmentEnd::LocatorLost,
                travelled_cm: None,
                commanded_s,
            });
        }

        let mut commanded_s = 0.0;
        let mut travelled_cm = 0.0;

        // Estimated distance of the last pulse, not yet seen by the locator
        let mut unseen_cm = 0.0;

        let end = loop {
            self.check_running()?;

            let location = match toy.get_location() {
                Ok(Some(l)) => l,
                Ok(None) | Err(_) => {
                    let remaining_cm = (segment.distance_cm - travelled_cm - unseen_cm).max(0.0);
                    warn!(
                        "Locator lost after {:.1} cm, driving the remaining {:.1} cm timed",
                        travelled_cm,
                        remaining_cm
                    );
                    commanded_s += self.drive_timed(toy, segment.heading_deg, remaining_cm)?;
                    break SegmentEnd::LocatorLost;
                }
            };

            travelled_cm = location.distance_from_origin();
            let remaining_cm =
                segment.distance_cm - travelled_cm - self.params.braking_margin_cm;

            if remaining_cm <= 0.0 {
                break SegmentEnd::Reached;
            }

            if commanded_s >= ceiling_s {
                warn!(
                    "Segment ceiling of {:.1} s reached with {:.1} cm to go",
                    ceiling_s,
                    remaining_cm
                );
                break SegmentEnd::Timeout;
            }

            if let Ok(Some(accel)) = toy.get_acceleration() {
                if accel.magnitude() > self.params.collision_accel_g {
                    warn!("Collision detected ({:.2} g)", accel.magnitude());
                    break SegmentEnd::Collision;
                }
            }

            let speed = if remaining_cm < self.params.approach_distance_cm {
                self.approach_speed.min(self.speed)
            }
            else {
                self.speed
            };

            toy.roll(segment.heading_deg, speed, self.params.pulse_s)?;
            commanded_s += self.params.pulse_s;
            unseen_cm = self.cmps * self.params.pulse_s * speed as f64 / self.speed as f64;
        };

        Ok(SegmentReport {
            segment: *segment,
            end,
            travelled_cm: Some(travelled_cm),
            commanded_s,
        })
    }

    /// Turn back to the first heading between laps.
    fn realign<T: Toy>(&self, toy: &mut T, heading_deg: u16) -> Result<(), ReplayError> {
        toy.set_heading(heading_deg)?;
        toy.roll(heading_deg, 0, self.params.settle_s)?;
        Ok(())
    }

    fn countdown(&self) -> Result<(), ReplayError> {
        for k in (1..=3).rev() {
            self.check_running()?;
            info!("... {}", k);
            sleep_s(self.params.countdown_step_s);
        }
        info!("GO");
        Ok(())
    }

    fn check_running(&self) -> Result<(), ReplayError> {
        if self.run_flag.is_running() {
            Ok(())
        }
        else {
            Err(ReplayError::Interrupted)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check whether the toy's locator works.
///
/// Resets the locator and reads it back once.
pub fn probe_locator<T: Toy>(toy: &mut T) -> bool {
    match toy.reset_locator().and_then(|_| toy.get_location()) {
        Ok(Some(_)) => true,
        Ok(None) => {
            info!("Locator reports no data");
            false
        },
        Err(e) => {
            info!("Locator unavailable: {}", e);
            false
        }
    }
}

/// Pick the locator strategy when the locator works, unless timed replay is forced.
pub fn select_strategy<T: Toy>(toy: &mut T, force_timed: bool) -> Strategy {
    if force_timed {
        info!("Timed replay requested");
        Strategy::Timed
    }
    else if probe_locator(toy) {
        Strategy::Locator
    }
    else {
        warn!("Falling back to timed replay");
        Strategy::Timed
    }
}

/// Drive one straight pulse along heading 0 from a freshly reset locator and read back where the
/// toy ended up.
///
/// Used to check the locator against a tape measure.
pub fn probe_drive<T: Toy>(
    toy: &mut T,
    speed_pct: f64,
    duration_s: f64
) -> Result<Option<Location>, ToyError> {
    let speed = pct_to_speed(speed_pct);

    toy.reset_locator()?;
    toy.set_heading(0)?;

    info!("Rolling at speed {} for {:.2} s", speed, duration_s);
    toy.roll(0, speed, duration_s)?;
    toy.roll(0, 0, PROBE_STOP_S)?;

    toy.get_location()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};
    use toy_if::Acceleration;

    use crate::backend::{sim::test::fast_params, SimCall, SimParams, SimToy};

    fn test_params() -> ReplayParams {
        ReplayParams {
            countdown_step_s: 0.0,
            ..Default::default()
        }
    }

    fn replayer(strategy: Strategy) -> Replayer {
        Replayer::new(test_params(), strategy, 70.0, 41.7, RunFlag::new())
    }

    fn seg(heading_deg: u16, distance_cm: f64) -> Segment {
        Segment { heading_deg, distance_cm }
    }

    #[test]
    fn test_shortfall() {
        assert!(SegmentEnd::Timeout.is_shortfall());
        assert!(SegmentEnd::Collision.is_shortfall());
        assert!(!SegmentEnd::Reached.is_shortfall());
        assert!(!SegmentEnd::LocatorLost.is_shortfall());
    }

    #[test]
    fn test_timed_segment() {
        let mut toy = SimToy::new("SB-TEST", fast_params());

        let report = replayer(Strategy::Timed).run_segment(&mut toy, &seg(90, 417.0)).unwrap();

        assert_eq!(report.end, SegmentEnd::Timed);
        assert!((report.commanded_s - 10.0).abs() < 1e-9);

        let calls = toy.calls();
        assert_eq!(calls[0], SimCall::SetHeading(90));
        assert_eq!(
            calls.last(),
            Some(&SimCall::Roll { heading_deg: 90, speed: 0, duration_s: 0.05 })
        );

        // 10 s driven as 0.5 s rolls
        let rolls: Vec<f64> = calls
            .iter()
            .filter_map(|c| match c {
                SimCall::Roll { heading_deg: 90, speed: 179, duration_s } => Some(*duration_s),
                _ => None
            })
            .collect();
        assert_eq!(rolls.len(), 20);
        assert!(rolls.iter().all(|d| *d <= 0.5 + 1e-9));
        assert!((rolls.iter().sum::<f64>() - 10.0).abs() < 1e-9);
        assert!((toy.position().x - 417.0).abs() < 0.5, "at {}", toy.position().x);
    }

    #[test]
    fn test_timed_segment_last_roll_is_shorter() {
        let mut toy = SimToy::new("SB-TEST", fast_params());

        // 1.2 s estimate
        replayer(Strategy::Timed).run_segment(&mut toy, &seg(0, 50.04)).unwrap();

        let rolls: Vec<f64> = toy.calls()
            .iter()
            .filter_map(|c| match c {
                SimCall::Roll { speed: 179, duration_s, .. } => Some(*duration_s),
                _ => None
            })
            .collect();
        assert_eq!(rolls.len(), 3);
        assert!((rolls[2] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_interrupt_stops_timed_segment() {
        let mut toy = SimToy::new("SB-TEST", SimParams { realtime: true, ..fast_params() });
        let flag = RunFlag::new();
        let replayer = Replayer::new(test_params(), Strategy::Timed, 70.0, 41.7, flag.clone());

        let stopper = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                flag.stop();
            })
        };

        // 3 s estimate
        let start = Instant::now();
        let result = replayer.run_segment(&mut toy, &seg(0, 125.1));
        let elapsed_s = start.elapsed().as_secs_f64();
        stopper.join().unwrap();

        assert!(matches!(result, Err(ReplayError::Interrupted)));
        assert!(elapsed_s < 1.5, "took {} s", elapsed_s);
        assert!(toy.position().y < 125.1 / 2.0, "at {}", toy.position().y);
    }

    #[test]
    fn test_locator_segment_reaches_target() {
        let mut toy = SimToy::new("SB-TEST", fast_params());

        let report = replayer(Strategy::Locator).run_segment(&mut toy, &seg(0, 100.0)).unwrap();

        assert_eq!(report.end, SegmentEnd::Reached);
        let travelled = report.travelled_cm.unwrap();
        assert!(travelled >= 98.0 && travelled < 100.0, "travelled {}", travelled);

        // The last pulses are at approach speed
        let pulses: Vec<u8> = toy.calls()
            .into_iter()
            .filter_map(|c| match c {
                SimCall::Roll { speed, .. } if speed > 0 => Some(speed),
                _ => None
            })
            .collect();
        assert_eq!(pulses[0], 179);
        assert_eq!(*pulses.last().unwrap(), 64);
    }

    #[test]
    fn test_locator_segment_times_out() {
        let mut toy = SimToy::new("SB-TEST", SimParams {
            cmps_per_unit: 0.0,
            ..fast_params()
        });

        let report = replayer(Strategy::Locator).run_segment(&mut toy, &seg(0, 41.7)).unwrap();

        // Estimate 1 s, ceiling 1 * 2 + 1 s
        assert_eq!(report.end, SegmentEnd::Timeout);
        assert!(report.commanded_s >= 3.0 && report.commanded_s < 3.2);
    }

    #[test]
    fn test_locator_segment_collision() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        toy.push_acceleration(Acceleration { x: 0.0, y: 0.0, z: 1.0 });
        toy.push_acceleration(Acceleration { x: 0.0, y: 0.0, z: 1.0 });
        toy.push_acceleration(Acceleration { x: 3.0, y: 0.5, z: 1.0 });

        let report = replayer(Strategy::Locator).run_segment(&mut toy, &seg(0, 200.0)).unwrap();

        assert_eq!(report.end, SegmentEnd::Collision);
        assert!((report.commanded_s - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_locator_lost_mid_segment() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        toy.fail_location_after(4);

        let report = replayer(Strategy::Locator).run_segment(&mut toy, &seg(0, 100.0)).unwrap();

        assert_eq!(report.end, SegmentEnd::LocatorLost);

        // The whole distance is still covered
        assert!((toy.position().y - 100.0).abs() < 0.5, "at {}", toy.position().y);
    }

    #[test]
    fn test_strategy_selection() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        assert_eq!(select_strategy(&mut toy, false), Strategy::Locator);
        assert_eq!(select_strategy(&mut toy, true), Strategy::Timed);

        let mut blind = SimToy::new("SB-TEST", SimParams { has_locator: false, ..fast_params() });
        assert_eq!(select_strategy(&mut blind, false), Strategy::Timed);
    }

    #[test]
    fn test_laps_realign_between_laps() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        let path = Path::parse("50,50", "90,180").unwrap();

        let reports = replayer(Strategy::Timed).run_laps(&mut toy, &path, 2).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].lap, 2);
        assert!(reports.iter().all(|r| r.segments.len() == 2));

        let calls = toy.calls();
        assert_eq!(calls[0], SimCall::DisableCollisionDetection);

        // Lap 2 starts by turning back to the first heading
        let realign = calls.iter().position(|c| *c == SimCall::SetHeading(90)).unwrap();
        let second = calls[realign + 1..].iter().position(|c| *c == SimCall::SetHeading(90));
        assert!(second.is_some());
    }

    #[test]
    fn test_interrupted_before_driving() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        let flag = RunFlag::new();
        flag.stop();

        let replayer = Replayer::new(test_params(), Strategy::Timed, 70.0, 41.7, flag);
        let path = Path::parse("50", "0").unwrap();

        assert!(matches!(
            replayer.run_laps(&mut toy, &path, 1),
            Err(ReplayError::Interrupted)
        ));
        assert!(!toy.calls().iter().any(|c| matches!(c, SimCall::Roll { .. })));
    }

    #[test]
    fn test_probe_drive() {
        let mut toy = SimToy::new("SB-TEST", SimParams { cmps_per_unit: 0.25, ..fast_params() });

        let location = probe_drive(&mut toy, 60.0, 2.0).unwrap().unwrap();

        // 60 % is speed 153, 153 * 0.25 cm/s for 2 s
        assert!((location.y - 76.5).abs() < 1e-6, "y = {}", location.y);
        assert!(location.x.abs() < 1e-6);
        assert_eq!(toy.calls(), vec![
            SimCall::ResetLocator,
            SimCall::SetHeading(0),
            SimCall::Roll { heading_deg: 0, speed: 153, duration_s: 2.0 },
            SimCall::Roll { heading_deg: 0, speed: 0, duration_s: 0.1 },
        ]);
    }
}
