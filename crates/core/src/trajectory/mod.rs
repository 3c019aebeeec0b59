//! Trajectory generation and playback for the primary source.
//!
//! A [`TrajectoryManager`] owns a path and turns elapsed host time into a
//! point on it. Position trajectories move the primary in the x/y field;
//! elevation trajectories only drive its elevation. Both share the playback
//! logic and differ through [`TrajectoryShape`].

pub mod curves;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    geometry::{Point, Radians, MAX_ELEVATION},
    source::{OriginOfChange, Source, SourceChange, SpatMode},
    Result, SpatError,
};

/// Weight of the previous drawing point when smoothing free-hand input.
const DRAWING_SMOOTHING: f32 = 0.8;

/// Playback settings shared by both trajectory axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySettings {
    /// Duration of one cycle, in seconds.
    pub cycle_duration: f64,
    pub back_and_forth: bool,
    pub dampening_cycles: u32,
    /// Rotation added after each completed cycle, in degrees. Position
    /// trajectories only.
    pub deviation_per_cycle: f32,
}

impl Default for TrajectorySettings {
    fn default() -> Self {
        Self {
            cycle_duration: 5.0,
            back_and_forth: false,
            dampening_cycles: 0,
            deviation_per_cycle: 0.0,
        }
    }
}

/// Playback state derived from the activation flag and the trajectory type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryState {
    Idle,
    Realtime,
    Drawing,
    Playing,
}

/// What distinguishes a trajectory axis: its type selector, its generators
/// and how a path point is read from and written into a source.
pub trait TrajectoryShape: Copy + Eq + fmt::Debug + fmt::Display {
    /// Whether per-cycle deviation rotates the path.
    const ROTATES: bool;

    fn is_realtime(self) -> bool;

    fn is_drawing(self) -> bool;

    /// Builds the path for a parametric type. Realtime and drawing types
    /// return an empty path.
    fn generate(self, anchor: Point) -> Vec<Point>;

    /// Reads the source in path coordinates.
    fn read(source: &Source) -> Point;

    /// Writes a path point into the source.
    fn write(point: Point, source: &mut Source, origin: OriginOfChange) -> Option<SourceChange>;
}

/// Position trajectory types, numbered like the host selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionTrajectoryType {
    #[default]
    Realtime = 1,
    Drawing,
    CircleClockwise,
    CircleCounterClockwise,
    EllipseClockwise,
    EllipseCounterClockwise,
    SpiralClockwiseOutIn,
    SpiralCounterClockwiseOutIn,
    SpiralClockwiseInOut,
    SpiralCounterClockwiseInOut,
    SquareClockwise,
    SquareCounterClockwise,
    TriangleClockwise,
    TriangleCounterClockwise,
}

impl PositionTrajectoryType {
    pub const ALL: [Self; 14] = [
        Self::Realtime,
        Self::Drawing,
        Self::CircleClockwise,
        Self::CircleCounterClockwise,
        Self::EllipseClockwise,
        Self::EllipseCounterClockwise,
        Self::SpiralClockwiseOutIn,
        Self::SpiralCounterClockwiseOutIn,
        Self::SpiralClockwiseInOut,
        Self::SpiralCounterClockwiseInOut,
        Self::SquareClockwise,
        Self::SquareCounterClockwise,
        Self::TriangleClockwise,
        Self::TriangleCounterClockwise,
    ];

    pub fn from_selector(selector: i32) -> Result<Self> {
        usize::try_from(selector - 1)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(SpatError::UnknownTrajectoryType(selector))
    }

    pub fn selector(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for PositionTrajectoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Realtime => "Realtime",
            Self::Drawing => "Drawing",
            Self::CircleClockwise => "Circle Clockwise",
            Self::CircleCounterClockwise => "Circle Counter Clockwise",
            Self::EllipseClockwise => "Ellipse Clockwise",
            Self::EllipseCounterClockwise => "Ellipse Counter Clockwise",
            Self::SpiralClockwiseOutIn => "Spiral Clockwise Out In",
            Self::SpiralCounterClockwiseOutIn => "Spiral Counter Clockwise Out In",
            Self::SpiralClockwiseInOut => "Spiral Clockwise In Out",
            Self::SpiralCounterClockwiseInOut => "Spiral Counter Clockwise In Out",
            Self::SquareClockwise => "Square Clockwise",
            Self::SquareCounterClockwise => "Square Counter Clockwise",
            Self::TriangleClockwise => "Triangle Clockwise",
            Self::TriangleCounterClockwise => "Triangle Counter Clockwise",
        };
        f.write_str(name)
    }
}

impl TrajectoryShape for PositionTrajectoryType {
    const ROTATES: bool = true;

    fn is_realtime(self) -> bool {
        self == Self::Realtime
    }

    fn is_drawing(self) -> bool {
        self == Self::Drawing
    }

    fn generate(self, anchor: Point) -> Vec<Point> {
        match self {
            Self::Realtime | Self::Drawing => Vec::new(),
            Self::CircleClockwise => curves::circle(anchor, true),
            Self::CircleCounterClockwise => curves::circle(anchor, false),
            Self::EllipseClockwise => curves::ellipse(anchor, true),
            Self::EllipseCounterClockwise => curves::ellipse(anchor, false),
            Self::SpiralClockwiseOutIn => curves::spiral(anchor, true, true),
            Self::SpiralCounterClockwiseOutIn => curves::spiral(anchor, false, true),
            Self::SpiralClockwiseInOut => curves::spiral(anchor, true, false),
            Self::SpiralCounterClockwiseInOut => curves::spiral(anchor, false, false),
            Self::SquareClockwise => curves::square(anchor, true),
            Self::SquareCounterClockwise => curves::square(anchor, false),
            Self::TriangleClockwise => curves::triangle(anchor, true),
            Self::TriangleCounterClockwise => curves::triangle(anchor, false),
        }
    }

    fn read(source: &Source) -> Point {
        source.position()
    }

    fn write(point: Point, source: &mut Source, origin: OriginOfChange) -> Option<SourceChange> {
        source.set_position(point, origin)
    }
}

/// Elevation trajectory types, numbered like the host selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElevationTrajectoryType {
    #[default]
    Realtime = 1,
    Drawing,
    DownUp,
    UpDown,
    BackAndForthUp,
    BackAndForthDown,
}

impl ElevationTrajectoryType {
    pub const ALL: [Self; 6] = [
        Self::Realtime,
        Self::Drawing,
        Self::DownUp,
        Self::UpDown,
        Self::BackAndForthUp,
        Self::BackAndForthDown,
    ];

    pub fn from_selector(selector: i32) -> Result<Self> {
        usize::try_from(selector - 1)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(SpatError::UnknownTrajectoryType(selector))
    }

    pub fn selector(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ElevationTrajectoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Realtime => "Realtime",
            Self::Drawing => "Drawing",
            Self::DownUp => "Down Up",
            Self::UpDown => "Up Down",
            Self::BackAndForthUp => "Back and Forth Up",
            Self::BackAndForthDown => "Back and Forth Down",
        };
        f.write_str(name)
    }
}

impl TrajectoryShape for ElevationTrajectoryType {
    const ROTATES: bool = false;

    fn is_realtime(self) -> bool {
        self == Self::Realtime
    }

    fn is_drawing(self) -> bool {
        self == Self::Drawing
    }

    fn generate(self, _anchor: Point) -> Vec<Point> {
        match self {
            Self::Realtime | Self::Drawing => Vec::new(),
            Self::DownUp => curves::ramp(true),
            Self::UpDown => curves::ramp(false),
            Self::BackAndForthUp => curves::back_and_forth(true),
            Self::BackAndForthDown => curves::back_and_forth(false),
        }
    }

    fn read(source: &Source) -> Point {
        Point::new(0.0, source.elevation() / MAX_ELEVATION)
    }

    fn write(point: Point, source: &mut Source, origin: OriginOfChange) -> Option<SourceChange> {
        source.set_elevation(MAX_ELEVATION * point.y, origin)
    }
}

/// Generates a path for the primary source and plays it back against host
/// time.
#[derive(Debug, Clone)]
pub struct TrajectoryManager<T> {
    trajectory_type: T,
    settings: TrajectorySettings,
    spat_mode: SpatMode,
    points: Vec<Point>,
    anchor: Point,
    active: bool,
    phase: f64,
    current_point: Point,
    playback_position: Option<Point>,
    last_drawing_point: Point,
}

pub type PositionTrajectoryManager = TrajectoryManager<PositionTrajectoryType>;
pub type ElevationTrajectoryManager = TrajectoryManager<ElevationTrajectoryType>;

impl<T: TrajectoryShape + Default> Default for TrajectoryManager<T> {
    fn default() -> Self {
        Self::new(T::default(), TrajectorySettings::default())
    }
}

impl<T: TrajectoryShape> TrajectoryManager<T> {
    pub fn new(trajectory_type: T, settings: TrajectorySettings) -> Self {
        Self {
            trajectory_type,
            settings,
            spat_mode: SpatMode::Dome,
            points: Vec::new(),
            anchor: Point::ORIGIN,
            active: false,
            phase: 0.0,
            current_point: Point::ORIGIN,
            playback_position: None,
            last_drawing_point: Point::ORIGIN,
        }
    }

    pub fn trajectory_type(&self) -> T {
        self.trajectory_type
    }

    /// Selects a trajectory type and rebuilds the path around `anchor`.
    /// Playback restarts from the beginning.
    pub fn set_trajectory_type(&mut self, trajectory_type: T, anchor: Point) {
        debug!(%trajectory_type, "trajectory type selected");
        self.trajectory_type = trajectory_type;
        self.anchor = anchor;
        self.phase = 0.0;
        self.playback_position = None;
        if trajectory_type.is_drawing() {
            self.reset_drawing(anchor);
        } else {
            self.regenerate();
        }
    }

    pub fn settings(&self) -> &TrajectorySettings {
        &self.settings
    }

    /// Non-positive or non-finite durations are ignored.
    pub fn set_cycle_duration(&mut self, seconds: f64) {
        if !(seconds.is_finite() && seconds > 0.0) {
            warn!(seconds, "ignoring invalid trajectory cycle duration");
            return;
        }
        self.settings.cycle_duration = seconds;
    }

    pub fn set_back_and_forth(&mut self, back_and_forth: bool) {
        self.settings.back_and_forth = back_and_forth;
    }

    pub fn set_dampening_cycles(&mut self, cycles: u32) {
        self.settings.dampening_cycles = cycles;
        if !self.trajectory_type.is_drawing() {
            self.regenerate();
        }
    }

    pub fn set_deviation_per_cycle(&mut self, degrees: f32) {
        if !degrees.is_finite() {
            warn!(degrees, "ignoring non-finite trajectory deviation");
            return;
        }
        self.settings.deviation_per_cycle = degrees;
    }

    pub fn spat_mode(&self) -> SpatMode {
        self.spat_mode
    }

    pub fn set_spat_mode(&mut self, spat_mode: SpatMode) {
        self.spat_mode = spat_mode;
        if !self.trajectory_type.is_drawing() {
            self.regenerate();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> TrajectoryState {
        if !self.active {
            TrajectoryState::Idle
        } else if self.trajectory_type.is_realtime() {
            TrajectoryState::Realtime
        } else if self.trajectory_type.is_drawing() {
            TrajectoryState::Drawing
        } else {
            TrajectoryState::Playing
        }
    }

    /// Activating an active trajectory does nothing. Activation restarts the
    /// phase; deactivation forgets the playback position. Returns whether the
    /// state changed.
    pub fn set_activate_state(&mut self, active: bool) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        if active {
            self.phase = 0.0;
        } else {
            self.playback_position = None;
        }
        debug!(active, trajectory_type = %self.trajectory_type, "trajectory activation changed");
        true
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn current_point(&self) -> Point {
        self.current_point
    }

    /// Last position written by the host while the trajectory was idle.
    pub fn playback_position(&self) -> Option<Point> {
        self.playback_position
    }

    pub fn set_playback_position(&mut self, position: Point) {
        self.playback_position = Some(position);
    }

    /// The primary source moved on its own. An idle trajectory follows it
    /// with its anchor.
    pub fn source_moved(&mut self, source: &Source) {
        let point = T::read(source);
        if self.trajectory_type.is_realtime() {
            self.current_point = point;
        }
        if self.active || self.trajectory_type.is_drawing() {
            return;
        }
        self.anchor = point;
        self.regenerate();
    }

    /// Moves the source to the point reached after `elapsed` seconds of play.
    /// Idle, realtime and empty trajectories leave the source alone.
    pub fn set_trajectory_delta_time(&mut self, elapsed: f64, source: &mut Source) -> Option<SourceChange> {
        if self.trajectory_type.is_realtime() {
            self.current_point = T::read(source);
            return None;
        }
        let point = self.point_at(elapsed)?;
        self.current_point = point;
        if !self.active {
            return None;
        }
        T::write(point, source, OriginOfChange::Trajectory)
    }

    /// Clears the drawing and seeds it with `anchor`.
    pub fn reset_drawing(&mut self, anchor: Point) {
        self.points.clear();
        self.points.push(anchor);
        self.last_drawing_point = anchor;
        self.playback_position = None;
    }

    /// Appends a free-hand point, smoothed towards the previous one.
    pub fn add_drawing_point(&mut self, point: Point) {
        if !point.is_finite() {
            warn!(?point, "dropping non-finite drawing point");
            return;
        }
        let smoothed = point + (self.last_drawing_point - point) * DRAWING_SMOOTHING;
        self.last_drawing_point = smoothed;
        self.points.push(smoothed);
    }

    /// Ends a drawing. Elevation drawings spread their points evenly over
    /// the playback progress axis.
    pub fn finish_drawing(&mut self) {
        if T::ROTATES || self.points.len() < 2 {
            return;
        }
        let last = (self.points.len() - 1) as f32;
        for (index, point) in self.points.iter_mut().enumerate() {
            point.x = index as f32 / last;
        }
    }

    fn regenerate(&mut self) {
        let mut points = curves::dampen(
            self.trajectory_type.generate(self.anchor),
            self.settings.dampening_cycles,
        );
        if T::ROTATES {
            curves::clip(&mut points, self.spat_mode);
        }
        self.points = points;
    }

    fn point_at(&mut self, elapsed: f64) -> Option<Point> {
        let last = *self.points.last()?;
        let count = self.points.len();
        let elapsed = elapsed.max(0.0);
        let cycle = self.settings.cycle_duration;
        let dampening = self.settings.dampening_cycles;
        let span = cycle * f64::from(dampening.max(1));

        // A dampened path stops at the end of its last cycle and keeps the
        // deviation it had reached there.
        let collapsed = dampening > 0 && elapsed >= span;
        let completed_cycles = if collapsed {
            f64::from(dampening - 1)
        } else {
            (elapsed / cycle).floor()
        };

        let point = if collapsed {
            self.phase = 1.0;
            last
        } else {
            let turns = elapsed / span;
            let completed = turns.floor();
            let mut phase = turns - completed;
            if self.settings.back_and_forth && completed as u64 % 2 == 1 {
                phase = 1.0 - phase;
            }
            self.phase = phase;

            let position = phase * count as f64;
            let index = position.floor() as usize;
            if index + 1 >= count {
                last
            } else {
                let fraction = (position - index as f64) as f32;
                self.points[index].lerp(self.points[index + 1], fraction)
            }
        };

        let deviation = self.settings.deviation_per_cycle;
        if T::ROTATES && deviation != 0.0 {
            return Some(point.rotated(Radians::from_degrees(deviation) * completed_cycles as f32));
        }
        Some(point)
    }
}
