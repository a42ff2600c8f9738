//! # Path Replay
//!
//! A path is an ordered list of segments, each driven along a fixed heading for a fixed distance.
//! [`replay`] drives them either open loop, from a time estimate, or closed loop using the toy's
//! locator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod replay;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use toy_if::MAX_SPEED;
use util::maths::{clamp, lin_map};

pub use replay::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lowest drive speed accepted, as a percentage of the maximum speed.
pub const MIN_SPEED_PCT: f64 = 10.0;

/// Highest drive speed accepted, as a percentage of the maximum speed.
pub const MAX_SPEED_PCT: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Units: degrees, in `[0, 360)`
    pub heading_deg: u16,

    /// Units: centimeters
    pub distance_cm: f64,
}

/// An immutable sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<Segment>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PathError {
    #[error("Got {segments} segments but {headings} headings, the lists must be the same length")]
    LengthMismatch {
        segments: usize,
        headings: usize
    },

    #[error("\"{0}\" is not a valid number")]
    InvalidNumber(String),

    #[error("Segment {0} has a negative distance ({1} cm)")]
    NegativeDistance(usize, f64),

    #[error("The path has no segments")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Path {
    /// Build a path from comma separated distances (cm) and headings (degrees).
    ///
    /// Blank entries are skipped and headings are wrapped into `[0, 360)`.
    pub fn parse(segments_csv: &str, headings_csv: &str) -> Result<Self, PathError> {
        let distances: Vec<f64> = parse_list(segments_csv)?;
        let headings: Vec<i64> = parse_list(headings_csv)?;

        Self::from_lists(&distances, &headings)
    }

    /// Build a path from matching lists of distances (cm) and headings (degrees).
    pub fn from_lists(distances_cm: &[f64], headings_deg: &[i64]) -> Result<Self, PathError> {
        if distances_cm.len() != headings_deg.len() {
            return Err(PathError::LengthMismatch {
                segments: distances_cm.len(),
                headings: headings_deg.len()
            });
        }

        if distances_cm.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = distances_cm
            .iter()
            .zip(headings_deg)
            .enumerate()
            .map(|(i, (d, h))| {
                if *d < 0.0 || !d.is_finite() {
                    Err(PathError::NegativeDistance(i, *d))
                }
                else {
                    Ok(Segment {
                        heading_deg: h.rem_euclid(360) as u16,
                        distance_cm: *d,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total length of the path.
    ///
    /// Units: centimeters
    pub fn total_distance_cm(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_cm).sum()
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Time needed to cover `distance_cm` at `cmps` centimeters per second, or 0 if the rate is not
/// positive.
pub fn seconds_for_distance(distance_cm: f64, cmps: f64) -> f64 {
    if cmps > 0.0 {
        distance_cm / cmps
    }
    else {
        0.0
    }
}

/// Convert a speed percentage into a drive speed.
///
/// The percentage is first limited to `[MIN_SPEED_PCT, MAX_SPEED_PCT]`.
pub fn pct_to_speed(pct: f64) -> u8 {
    let pct = clamp(pct, MIN_SPEED_PCT, MAX_SPEED_PCT);
    lin_map((0.0, 100.0), (0.0, MAX_SPEED as f64), pct).round() as u8
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn parse_list<T: FromStr>(csv: &str) -> Result<Vec<T>, PathError> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| PathError::InvalidNumber(s.to_string())))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let path = Path::parse("200, 100,,50.5", "0,90,-90").unwrap();

        assert_eq!(path.segments(), &[
            Segment { heading_deg: 0, distance_cm: 200.0 },
            Segment { heading_deg: 90, distance_cm: 100.0 },
            Segment { heading_deg: 270, distance_cm: 50.5 },
        ]);
        assert_eq!(path.total_distance_cm(), 350.5);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert_eq!(
            Path::parse("200,100", "0,90,180"),
            Err(PathError::LengthMismatch { segments: 2, headings: 3 })
        );
    }

    #[test]
    fn test_invalid_paths() {
        assert_eq!(Path::parse("", ""), Err(PathError::Empty));
        assert_eq!(Path::parse("100,-5", "0,90"), Err(PathError::NegativeDistance(1, -5.0)));
        assert_eq!(Path::parse("100,abc", "0,90"), Err(PathError::InvalidNumber("abc".into())));
        assert_eq!(Path::parse("100", "12.5"), Err(PathError::InvalidNumber("12.5".into())));
    }

    #[test]
    fn test_seconds_for_distance() {
        assert_eq!(seconds_for_distance(500.0, 41.7), 500.0 / 41.7);
        assert_eq!(seconds_for_distance(500.0, 0.0), 0.0);
        assert_eq!(seconds_for_distance(500.0, -3.0), 0.0);
    }

    #[test]
    fn test_pct_to_speed() {
        assert_eq!(pct_to_speed(100.0), 255);
        assert_eq!(pct_to_speed(150.0), 255);
        assert_eq!(pct_to_speed(0.0), 26);
        assert_eq!(pct_to_speed(50.0), 128);
    }
}
