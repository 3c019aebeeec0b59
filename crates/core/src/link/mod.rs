//! Source linking: how secondary sources follow the primary source.
//!
//! Every link mode is a [`LinkStrategy`]. A strategy derives its parameters
//! from the primary's current state and the baseline [`SourcesSnapshots`],
//! then uses them to place each secondary from its own snapshot. The inverse
//! operation rebuilds the snapshot a secondary must have had to end up where
//! it currently is, which is what presets persist.

mod elevation;
mod enforcer;
mod position;

use std::{
    fmt,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Point, Radians},
    source::{Source, SourceIndex, Sources, MAX_NUMBER_OF_SOURCES},
    Result, SpatError,
};

pub use elevation::ElevationStrategy;
pub use enforcer::SourceLinkEnforcer;
pub use position::PositionStrategy;

/// Captured position and elevation of one source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub position: Point,
    pub z: Radians,
}

impl SourceSnapshot {
    pub fn new(position: Point, z: Radians) -> Self {
        Self { position, z }
    }

    pub fn of(source: &Source) -> Self {
        Self {
            position: source.position(),
            z: source.elevation(),
        }
    }
}

/// Snapshots of the primary source and of every secondary slot, aligned with
/// the indices of [`Sources`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourcesSnapshots {
    pub primary: SourceSnapshot,
    pub secondaries: [SourceSnapshot; MAX_NUMBER_OF_SOURCES - 1],
}

impl SourcesSnapshots {
    /// Captures every slot, including the inactive ones, so that growing the
    /// number of sources starts from a sensible baseline.
    pub fn capture(sources: &Sources) -> Self {
        let mut snapshots = Self::default();
        for index in 0..MAX_NUMBER_OF_SOURCES {
            let index = SourceIndex::new(index);
            snapshots[index] = SourceSnapshot::of(&sources[index]);
        }
        snapshots
    }
}

impl Index<SourceIndex> for SourcesSnapshots {
    type Output = SourceSnapshot;

    fn index(&self, index: SourceIndex) -> &SourceSnapshot {
        match index.get() {
            0 => &self.primary,
            other => &self.secondaries[other - 1],
        }
    }
}

impl IndexMut<SourceIndex> for SourcesSnapshots {
    fn index_mut(&mut self, index: SourceIndex) -> &mut SourceSnapshot {
        match index.get() {
            0 => &mut self.primary,
            other => &mut self.secondaries[other - 1],
        }
    }
}

/// Position link modes, numbered like the host automation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionSourceLink {
    #[default]
    Independent = 1,
    Circular,
    CircularFixedRadius,
    CircularFixedAngle,
    CircularFullyFixed,
    DeltaLock,
    SymmetricX,
    SymmetricY,
}

impl PositionSourceLink {
    pub const ALL: [Self; 8] = [
        Self::Independent,
        Self::Circular,
        Self::CircularFixedRadius,
        Self::CircularFixedAngle,
        Self::CircularFullyFixed,
        Self::DeltaLock,
        Self::SymmetricX,
        Self::SymmetricY,
    ];

    /// Parses a 1-based selector.
    pub fn from_selector(selector: i32) -> Result<Self> {
        usize::try_from(selector - 1)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(SpatError::UnknownPositionLink(selector))
    }

    pub fn selector(self) -> i32 {
        self as i32
    }

    /// Symmetric links only make sense with exactly two sources.
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::SymmetricX | Self::SymmetricY)
    }
}

impl fmt::Display for PositionSourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Independent => "Independent",
            Self::Circular => "Circular",
            Self::CircularFixedRadius => "Circular Fixed Radius",
            Self::CircularFixedAngle => "Circular Fixed Angle",
            Self::CircularFullyFixed => "Circular Fully Fixed",
            Self::DeltaLock => "Delta Lock",
            Self::SymmetricX => "Symmetric X",
            Self::SymmetricY => "Symmetric Y",
        };
        f.write_str(name)
    }
}

/// Elevation link modes, numbered like the host automation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElevationSourceLink {
    #[default]
    Independent = 1,
    FixedElevation,
    LinearMin,
    LinearMax,
    DeltaLock,
}

impl ElevationSourceLink {
    pub const ALL: [Self; 5] = [
        Self::Independent,
        Self::FixedElevation,
        Self::LinearMin,
        Self::LinearMax,
        Self::DeltaLock,
    ];

    pub fn from_selector(selector: i32) -> Result<Self> {
        usize::try_from(selector - 1)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(SpatError::UnknownElevationLink(selector))
    }

    pub fn selector(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ElevationSourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Independent => "Independent",
            Self::FixedElevation => "Fixed Elevation",
            Self::LinearMin => "Linear Min",
            Self::LinearMax => "Linear Max",
            Self::DeltaLock => "Delta Lock",
        };
        f.write_str(name)
    }
}

/// The three operations every link mode provides.
pub trait LinkStrategy {
    /// Mode selector this strategy implements.
    type Link: Copy + Eq + fmt::Debug;

    fn for_link(link: Self::Link) -> Self;

    fn link(&self) -> Self::Link;

    /// Derives the parameters from the primary's current state and the
    /// baseline snapshots.
    fn compute_parameters(&mut self, sources: &Sources, snapshots: &SourcesSnapshots);

    /// Places the secondary at `index` from its snapshot. Writes use
    /// [`OriginOfChange::Link`](crate::source::OriginOfChange::Link).
    fn enforce_source(&self, sources: &mut Sources, snapshots: &SourcesSnapshots, index: SourceIndex);

    /// Rebuilds the snapshot that would place the source at `index` where it
    /// currently is.
    fn initial_state_from_final_state(
        &self,
        sources: &Sources,
        snapshots: &SourcesSnapshots,
        index: SourceIndex,
    ) -> SourceSnapshot;
}

/// A strategy plus the flag recording whether its parameters were computed.
#[derive(Debug, Clone)]
pub struct GuardedStrategy<S> {
    strategy: S,
    initialized: bool,
}

impl<S: LinkStrategy> GuardedStrategy<S> {
    pub fn new(link: S::Link) -> Self {
        Self {
            strategy: S::for_link(link),
            initialized: false,
        }
    }

    pub fn link(&self) -> S::Link {
        self.strategy.link()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn compute_parameters(&mut self, sources: &Sources, snapshots: &SourcesSnapshots) {
        self.strategy.compute_parameters(sources, snapshots);
        self.initialized = true;
    }

    /// Places every active secondary source.
    pub fn enforce(&self, sources: &mut Sources, snapshots: &SourcesSnapshots) {
        for index in 1..sources.size() {
            self.enforce_source(sources, snapshots, SourceIndex::new(index));
        }
    }

    pub fn enforce_source(&self, sources: &mut Sources, snapshots: &SourcesSnapshots, index: SourceIndex) {
        debug_assert!(self.initialized, "link strategy enforced before its parameters were computed");
        debug_assert!(!index.is_primary(), "the primary source is never enforced");
        self.strategy.enforce_source(sources, snapshots, index);
    }

    pub fn initial_state_from_final_state(
        &self,
        sources: &Sources,
        snapshots: &SourcesSnapshots,
        index: SourceIndex,
    ) -> SourceSnapshot {
        debug_assert!(self.initialized, "link strategy inverted before its parameters were computed");
        self.strategy.initial_state_from_final_state(sources, snapshots, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_round_trip_through_the_enum() {
        for link in PositionSourceLink::ALL {
            assert_eq!(PositionSourceLink::from_selector(link.selector()).unwrap(), link);
        }
        for link in ElevationSourceLink::ALL {
            assert_eq!(ElevationSourceLink::from_selector(link.selector()).unwrap(), link);
        }
        assert_eq!(PositionSourceLink::DeltaLock.selector(), 6);
    }

    #[test]
    fn out_of_range_selectors_are_rejected() {
        assert!(matches!(
            PositionSourceLink::from_selector(0),
            Err(SpatError::UnknownPositionLink(0))
        ));
        assert!(matches!(
            PositionSourceLink::from_selector(9),
            Err(SpatError::UnknownPositionLink(9))
        ));
        assert!(matches!(
            ElevationSourceLink::from_selector(6),
            Err(SpatError::UnknownElevationLink(6))
        ));
    }

    #[test]
    fn snapshots_index_primary_and_secondaries() {
        let mut snapshots = SourcesSnapshots::default();
        snapshots[SourceIndex::new(3)] = SourceSnapshot::new(Point::new(0.1, 0.2), Radians::ZERO);
        snapshots[SourceIndex::PRIMARY].position = Point::new(0.5, 0.5);

        assert_eq!(snapshots.secondaries[2].position, Point::new(0.1, 0.2));
        assert_eq!(snapshots.primary.position, Point::new(0.5, 0.5));
    }
}
