//! Per-source coordinate state.
//!
//! A [`Source`] keeps two views of the same point: polar (azimuth,
//! elevation, distance) and Cartesian (`x`, `y`). Every setter clips its input,
//! refreshes the other view and reports a [`SourceChange`] tagged with the
//! [`OriginOfChange`] supplied by the caller. The caller decides what to do
//! with the change; the source never calls back into other subsystems.

mod sources;

use std::{f32::consts::SQRT_2, fmt};

use serde::{Deserialize, Serialize};

use crate::geometry::{
    clip_cube_position, clip_dome_position, clip_elevation, Normalized, Point, Radians,
    MAX_ELEVATION,
};

pub use sources::{Sources, MAX_NUMBER_OF_SOURCES};

/// Furthest a cube-mode source can be from the centre (a corner of the field).
pub const CUBE_MAX_DISTANCE: f32 = SQRT_2;

/// How positions map to the speaker setup downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatMode {
    /// Elevation is encoded by the distance from the centre of the field.
    #[default]
    Dome,
    /// Elevation is an independent axis and the field radius is a distance.
    Cube,
}

/// Cause of a source mutation.
///
/// The tag decides whether a change is propagated to the link enforcer, the
/// trajectory managers and the host automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginOfChange {
    None,
    UserMove,
    UserAnchorMove,
    Link,
    Trajectory,
    Automation,
    PresetRecall,
    Osc,
}

impl OriginOfChange {
    /// Whether a change with this origin must be propagated further. Changes
    /// written by a link strategy are already the result of a propagation.
    pub fn propagates(self) -> bool {
        !matches!(self, Self::None | Self::Link)
    }
}

/// Which view of the source a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Position,
    Elevation,
}

/// Notification produced by a source setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChange {
    pub index: SourceIndex,
    pub change_type: ChangeType,
    pub origin: OriginOfChange,
}

/// Zero-based position of a source in the collection. Index 0 is the
/// primary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceIndex(usize);

impl SourceIndex {
    pub const PRIMARY: Self = Self(0);

    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn is_primary(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SourceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-visible source number, offset by the configured first source id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(i32);

impl SourceId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self(1)
    }
}

/// Display colour of a source, derived from its index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub hue: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub alpha: f32,
}

impl Colour {
    /// Spreads hues evenly over the active sources, starting from a fixed
    /// offset so that the primary source is never pure red.
    pub fn from_index(index: SourceIndex, number_of_sources: usize) -> Self {
        let count = number_of_sources.max(1) as f32;
        let hue = (index.get() as f32 / count + 0.577_251).rem_euclid(1.0);
        Self {
            hue,
            saturation: 1.0,
            brightness: 1.0,
            alpha: 0.85,
        }
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let h = self.hue * 6.0;
        let c = self.brightness * self.saturation;
        let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
        let m = self.brightness - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let channel = |value: f32| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        [channel(r), channel(g), channel(b)]
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            brightness: 0.0,
            alpha: 1.0,
        }
    }
}

/// A single spatialized source.
#[derive(Debug, Clone)]
pub struct Source {
    index: SourceIndex,
    id: SourceId,
    spat_mode: SpatMode,
    azimuth: Radians,
    elevation: Radians,
    distance: f32,
    position: Point,
    azimuth_span: Normalized,
    elevation_span: Normalized,
    colour: Colour,
    gui_update_pending: bool,
}

impl Source {
    pub fn new(index: SourceIndex) -> Self {
        Self {
            index,
            id: SourceId::new(index.get() as i32 + 1),
            spat_mode: SpatMode::Dome,
            azimuth: Radians::ZERO,
            elevation: Radians::ZERO,
            distance: 1.0,
            position: Point::ORIGIN,
            azimuth_span: Normalized::MIN,
            elevation_span: Normalized::MIN,
            colour: Colour::default(),
            gui_update_pending: false,
        }
    }

    pub fn index(&self) -> SourceIndex {
        self.index
    }

    pub fn is_primary(&self) -> bool {
        self.index.is_primary()
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn set_id(&mut self, id: SourceId) {
        self.id = id;
    }

    pub fn spat_mode(&self) -> SpatMode {
        self.spat_mode
    }

    pub fn set_spat_mode(&mut self, spat_mode: SpatMode) {
        self.spat_mode = spat_mode;
    }

    pub fn azimuth(&self) -> Radians {
        self.azimuth
    }

    pub fn elevation(&self) -> Radians {
        self.elevation
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn azimuth_span(&self) -> Normalized {
        self.azimuth_span
    }

    pub fn elevation_span(&self) -> Normalized {
        self.elevation_span
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    /// Azimuth mapped from `[-PI, PI)` onto `[0, 1)`.
    pub fn normalized_azimuth(&self) -> Normalized {
        Normalized::new((self.azimuth.balanced() + Radians::PI) / Radians::TWO_PI)
    }

    pub fn normalized_elevation(&self) -> Normalized {
        Normalized::new(self.elevation / MAX_ELEVATION)
    }

    pub fn set_azimuth(&mut self, azimuth: Radians, origin: OriginOfChange) -> Option<SourceChange> {
        if !azimuth.is_finite() {
            return self.reject("azimuth", origin);
        }
        self.azimuth = azimuth.balanced();
        self.compute_xy();
        self.notify(ChangeType::Position, origin)
    }

    pub fn set_normalized_azimuth(
        &mut self,
        azimuth: Normalized,
        origin: OriginOfChange,
    ) -> Option<SourceChange> {
        self.set_azimuth(Radians::TWO_PI * azimuth.get() - Radians::PI, origin)
    }

    /// Sets the elevation. In dome mode the elevation is the field radius, so
    /// the change is reported as a position change.
    pub fn set_elevation(&mut self, elevation: Radians, origin: OriginOfChange) -> Option<SourceChange> {
        if !elevation.is_finite() {
            return self.reject("elevation", origin);
        }
        self.elevation = clip_elevation(elevation);
        match self.spat_mode {
            SpatMode::Dome => {
                self.compute_xy();
                self.notify(ChangeType::Position, origin)
            }
            SpatMode::Cube => self.notify(ChangeType::Elevation, origin),
        }
    }

    pub fn set_normalized_elevation(
        &mut self,
        elevation: Normalized,
        origin: OriginOfChange,
    ) -> Option<SourceChange> {
        self.set_elevation(MAX_ELEVATION * elevation.get(), origin)
    }

    pub fn set_distance(&mut self, distance: f32, origin: OriginOfChange) -> Option<SourceChange> {
        if !distance.is_finite() {
            return self.reject("distance", origin);
        }
        let max_distance = match self.spat_mode {
            SpatMode::Dome => 1.0,
            SpatMode::Cube => CUBE_MAX_DISTANCE,
        };
        self.distance = distance.clamp(0.0, max_distance);
        self.compute_xy();
        self.clip_current_position();
        self.notify(ChangeType::Position, origin)
    }

    pub fn set_coordinates(
        &mut self,
        azimuth: Radians,
        elevation: Radians,
        distance: f32,
        origin: OriginOfChange,
    ) -> Option<SourceChange> {
        if !(azimuth.is_finite() && elevation.is_finite() && distance.is_finite()) {
            return self.reject("coordinates", origin);
        }
        self.azimuth = azimuth.balanced();
        self.elevation = clip_elevation(elevation);
        self.distance = distance.max(0.0);
        self.compute_xy();
        self.clip_current_position();
        self.notify(ChangeType::Position, origin)
    }

    pub fn set_x(&mut self, x: f32, origin: OriginOfChange) -> Option<SourceChange> {
        self.set_position(Point::new(x, self.position.y), origin)
    }

    pub fn set_y(&mut self, y: f32, origin: OriginOfChange) -> Option<SourceChange> {
        self.set_position(Point::new(self.position.x, y), origin)
    }

    /// Maps `[0, 1]` onto the field's `[-1, 1]` x axis.
    pub fn set_normalized_x(&mut self, x: Normalized, origin: OriginOfChange) -> Option<SourceChange> {
        self.set_x(x.get() * 2.0 - 1.0, origin)
    }

    pub fn set_normalized_y(&mut self, y: Normalized, origin: OriginOfChange) -> Option<SourceChange> {
        self.set_y(y.get() * 2.0 - 1.0, origin)
    }

    pub fn set_position(&mut self, position: Point, origin: OriginOfChange) -> Option<SourceChange> {
        if !position.is_finite() {
            return self.reject("position", origin);
        }
        self.position = self.clip_position(position);
        self.compute_azimuth_elevation();
        self.notify(ChangeType::Position, origin)
    }

    pub fn set_azimuth_span(&mut self, span: Normalized) {
        self.azimuth_span = span;
        self.gui_update_pending = true;
    }

    pub fn set_elevation_span(&mut self, span: Normalized) {
        self.elevation_span = span;
        self.gui_update_pending = true;
    }

    pub fn set_colour_from_index(&mut self, number_of_sources: usize) {
        self.colour = Colour::from_index(self.index, number_of_sources);
        self.gui_update_pending = true;
    }

    /// Refreshes the Cartesian view from azimuth, elevation and distance.
    pub fn compute_xy(&mut self) {
        let radius = match self.spat_mode {
            SpatMode::Dome => (MAX_ELEVATION - self.elevation) / MAX_ELEVATION,
            SpatMode::Cube => self.distance,
        };
        self.position = Point::from_angle(self.azimuth, radius);
    }

    /// Refreshes the polar view from the Cartesian position. The azimuth is
    /// kept as is when the source sits on the centre.
    pub fn compute_azimuth_elevation(&mut self) {
        if self.position != Point::ORIGIN {
            self.azimuth = self.position.angle();
        }
        let radius = self.position.distance_from_origin();
        match self.spat_mode {
            SpatMode::Dome => {
                self.elevation = clip_elevation(MAX_ELEVATION * (1.0 - radius));
            }
            SpatMode::Cube => {
                self.distance = radius;
            }
        }
    }

    /// Returns whether the GUI has not seen the latest state yet and clears
    /// the flag.
    pub fn take_gui_update(&mut self) -> bool {
        std::mem::take(&mut self.gui_update_pending)
    }

    pub(crate) fn set_index(&mut self, index: SourceIndex) {
        self.index = index;
    }

    fn clip_position(&self, position: Point) -> Point {
        match self.spat_mode {
            SpatMode::Dome => clip_dome_position(position),
            SpatMode::Cube => clip_cube_position(position),
        }
    }

    fn clip_current_position(&mut self) {
        let clipped = self.clip_position(self.position);
        if clipped != self.position {
            self.position = clipped;
            self.compute_azimuth_elevation();
        }
    }

    fn notify(&mut self, change_type: ChangeType, origin: OriginOfChange) -> Option<SourceChange> {
        self.gui_update_pending = true;
        if origin == OriginOfChange::None {
            return None;
        }
        Some(SourceChange {
            index: self.index,
            change_type,
            origin,
        })
    }

    fn reject(&self, field: &'static str, origin: OriginOfChange) -> Option<SourceChange> {
        tracing::warn!(index = %self.index, field, ?origin, "dropping non-finite source update");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= EPSILON
    }

    #[test]
    fn azimuth_wraps_and_updates_position() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        let change = source.set_azimuth(Radians::from_degrees(270.0), OriginOfChange::UserMove);

        assert!(close(source.azimuth().as_degrees(), -90.0));
        assert!(close(source.x(), -1.0));
        assert!(close(source.y(), 0.0));
        assert_eq!(
            change,
            Some(SourceChange {
                index: SourceIndex::PRIMARY,
                change_type: ChangeType::Position,
                origin: OriginOfChange::UserMove,
            })
        );
    }

    #[test]
    fn dome_elevation_is_the_field_radius() {
        let mut source = Source::new(SourceIndex::new(1));
        source.set_azimuth(Radians::HALF_PI, OriginOfChange::None);
        source.set_elevation(Radians::from_degrees(45.0), OriginOfChange::None);
        assert!(close(source.x(), 0.5));

        source.set_position(Point::new(0.0, -0.25), OriginOfChange::None);
        assert!(close(source.elevation().as_degrees(), 67.5));
        assert!(close(source.azimuth().as_degrees(), 0.0));
    }

    #[test]
    fn cube_distance_and_elevation_are_independent() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        source.set_spat_mode(SpatMode::Cube);
        source.set_coordinates(Radians::ZERO, Radians::from_degrees(30.0), 0.5, OriginOfChange::None);
        let change = source.set_elevation(Radians::from_degrees(60.0), OriginOfChange::Automation);

        assert!(close(source.y(), -0.5));
        assert!(close(source.distance(), 0.5));
        assert_eq!(change.map(|c| c.change_type), Some(ChangeType::Elevation));
    }

    #[test]
    fn cube_distance_is_clipped_to_the_square() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        source.set_spat_mode(SpatMode::Cube);
        source.set_azimuth(Radians::ZERO, OriginOfChange::None);
        source.set_distance(1.3, OriginOfChange::None);

        assert!(close(source.y(), -1.0));
        assert!(close(source.distance(), 1.0));
    }

    #[test]
    fn non_finite_input_is_dropped() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        source.set_position(Point::new(0.3, 0.4), OriginOfChange::None);
        let before = (source.azimuth(), source.elevation(), source.distance(), source.position());

        assert_eq!(source.set_azimuth(Radians::new(f32::NAN), OriginOfChange::Automation), None);
        assert_eq!(source.set_x(f32::INFINITY, OriginOfChange::Automation), None);
        assert_eq!(source.set_distance(f32::NAN, OriginOfChange::Automation), None);

        let after = (source.azimuth(), source.elevation(), source.distance(), source.position());
        assert_eq!(before, after);
    }

    #[test]
    fn origin_none_updates_state_without_notifying() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        assert_eq!(source.set_x(0.5, OriginOfChange::None), None);
        assert!(close(source.x(), 0.5));
        assert!(source.take_gui_update());
        assert!(!source.take_gui_update());
    }

    #[test]
    fn normalized_views_are_inverse() {
        let mut source = Source::new(SourceIndex::PRIMARY);
        source.set_normalized_azimuth(Normalized::new(0.75), OriginOfChange::None);
        assert!(close(source.azimuth().as_degrees(), 90.0));
        assert!(close(source.normalized_azimuth().get(), 0.75));

        source.set_normalized_x(Normalized::new(1.0), OriginOfChange::None);
        assert!(close(source.x(), 1.0));
    }

    #[test]
    fn link_origin_does_not_propagate() {
        assert!(!OriginOfChange::Link.propagates());
        assert!(!OriginOfChange::None.propagates());
        assert!(OriginOfChange::UserMove.propagates());
        assert!(OriginOfChange::Trajectory.propagates());
    }

    #[test]
    fn colours_are_spread_over_the_hue_circle() {
        let first = Colour::from_index(SourceIndex::new(0), 4);
        let second = Colour::from_index(SourceIndex::new(1), 4);
        assert!(close((second.hue - first.hue).rem_euclid(1.0), 0.25));
        assert_eq!(Colour { hue: 0.0, ..first }.to_rgb8(), [255, 0, 0]);
    }
}
