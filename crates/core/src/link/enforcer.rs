use tracing::{debug, warn};

use super::{
    ElevationSourceLink, ElevationStrategy, GuardedStrategy, LinkStrategy, PositionSourceLink,
    PositionStrategy, SourceSnapshot, SourcesSnapshots,
};
use crate::source::{ChangeType, SourceIndex, Sources, SpatMode, MAX_NUMBER_OF_SOURCES};

/// One linked axis: a strategy and the baseline it is applied to.
#[derive(Debug, Clone)]
struct LinkAxis<S> {
    strategy: GuardedStrategy<S>,
    snapshots: SourcesSnapshots,
}

impl<S: LinkStrategy> LinkAxis<S> {
    fn new(link: S::Link, sources: &Sources) -> Self {
        Self {
            strategy: GuardedStrategy::new(link),
            snapshots: SourcesSnapshots::capture(sources),
        }
    }

    fn set_link(&mut self, link: S::Link, sources: &Sources) {
        self.strategy = GuardedStrategy::new(link);
        self.snapshots = SourcesSnapshots::capture(sources);
    }

    fn ensure_parameters(&mut self, sources: &Sources) {
        if !self.strategy.is_initialized() {
            self.strategy.compute_parameters(sources, &self.snapshots);
        }
    }

    fn enforce(&mut self, sources: &mut Sources) {
        self.strategy.compute_parameters(sources, &self.snapshots);
        self.strategy.enforce(sources, &self.snapshots);
    }

    fn source_moved(&mut self, sources: &mut Sources, index: SourceIndex) {
        if index.is_primary() {
            self.enforce(sources);
            return;
        }
        // A moved secondary gets a new baseline, then the link puts it back
        // where the relation allows.
        self.ensure_parameters(sources);
        self.snapshots[index] = self.strategy.initial_state_from_final_state(sources, &self.snapshots, index);
        self.strategy.enforce_source(sources, &self.snapshots, index);
    }

    fn rebase(&mut self, sources: &Sources) {
        self.snapshots = SourcesSnapshots::capture(sources);
        self.strategy.compute_parameters(sources, &self.snapshots);
    }

    fn initial_state(&mut self, sources: &Sources, index: SourceIndex) -> SourceSnapshot {
        if index.is_primary() {
            return self.snapshots.primary;
        }
        self.ensure_parameters(sources);
        self.strategy.initial_state_from_final_state(sources, &self.snapshots, index)
    }
}

/// Keeps the secondary sources in the relation selected by the position and
/// elevation links.
///
/// Each axis owns its baseline snapshots. The elevation axis only acts in
/// cube mode; in dome mode the elevation is part of the position.
#[derive(Debug, Clone)]
pub struct SourceLinkEnforcer {
    position: LinkAxis<PositionStrategy>,
    elevation: LinkAxis<ElevationStrategy>,
}

impl SourceLinkEnforcer {
    pub fn new(sources: &Sources) -> Self {
        Self {
            position: LinkAxis::new(PositionSourceLink::Independent, sources),
            elevation: LinkAxis::new(ElevationSourceLink::Independent, sources),
        }
    }

    pub fn position_link(&self) -> PositionSourceLink {
        self.position.strategy.link()
    }

    pub fn elevation_link(&self) -> ElevationSourceLink {
        self.elevation.strategy.link()
    }

    /// Switches the position link and takes the current layout as the new
    /// baseline. Symmetric links need exactly two sources; with any other
    /// count the link falls back to independent. Returns the link in effect.
    pub fn set_position_link(&mut self, link: PositionSourceLink, sources: &Sources) -> PositionSourceLink {
        let link = if link.is_symmetric() && sources.size() != 2 {
            warn!(%link, sources = sources.size(), "symmetric link needs exactly two sources, using independent");
            PositionSourceLink::Independent
        } else {
            link
        };
        debug!(%link, "position link selected");
        self.position.set_link(link, sources);
        link
    }

    pub fn set_elevation_link(&mut self, link: ElevationSourceLink, sources: &Sources) -> ElevationSourceLink {
        debug!(%link, "elevation link selected");
        self.elevation.set_link(link, sources);
        link
    }

    /// Recomputes the parameters of one axis and places every secondary.
    pub fn enforce(&mut self, change_type: ChangeType, sources: &mut Sources) {
        match change_type {
            ChangeType::Position => self.position.enforce(sources),
            ChangeType::Elevation if elevation_active(sources) => self.elevation.enforce(sources),
            ChangeType::Elevation => {}
        }
    }

    /// Enforces both axes.
    pub fn enforce_all(&mut self, sources: &mut Sources) {
        self.enforce(ChangeType::Position, sources);
        self.enforce(ChangeType::Elevation, sources);
    }

    /// Reacts to a propagating move of the source at `index`.
    ///
    /// Moving the primary drags the secondaries along. Moving a secondary
    /// rewrites its own baseline so the relation holds from its new place.
    pub fn source_moved(&mut self, change_type: ChangeType, sources: &mut Sources, index: SourceIndex) {
        match change_type {
            ChangeType::Position => self.position.source_moved(sources, index),
            ChangeType::Elevation if elevation_active(sources) => self.elevation.source_moved(sources, index),
            ChangeType::Elevation => {}
        }
    }

    /// The primary moved without dragging the secondaries: the current
    /// layout becomes the new baseline.
    pub fn anchor_moved(&mut self, sources: &Sources) {
        self.position.rebase(sources);
        self.elevation.rebase(sources);
    }

    /// Rebuilds the baselines for a new source count and applies the links,
    /// so fixed-angle modes spread the new sources immediately.
    pub fn number_of_sources_changed(&mut self, sources: &mut Sources) {
        self.position.rebase(sources);
        self.elevation.rebase(sources);
        self.enforce_all(sources);
    }

    /// Baselines currently in use. Positions come from the position axis and
    /// elevations from the elevation axis.
    pub fn snapshots(&self) -> SourcesSnapshots {
        let mut snapshots = self.position.snapshots.clone();
        for index in 0..MAX_NUMBER_OF_SOURCES {
            let index = SourceIndex::new(index);
            snapshots[index].z = self.elevation.snapshots[index].z;
        }
        snapshots
    }

    /// Replaces both baselines, for a preset recall. Parameters are derived
    /// again on the next primary move.
    pub fn load_snapshots(&mut self, snapshots: &SourcesSnapshots) {
        self.position.snapshots = snapshots.clone();
        self.elevation.snapshots = snapshots.clone();
        self.position.strategy = GuardedStrategy::new(self.position.strategy.link());
        self.elevation.strategy = GuardedStrategy::new(self.elevation.strategy.link());
    }

    /// Baseline that reproduces the current state of the source at `index`
    /// under the active links. For the primary this is its stored baseline.
    pub fn initial_state_from_final_state(&mut self, sources: &Sources, index: SourceIndex) -> SourceSnapshot {
        let position = self.position.initial_state(sources, index).position;
        let z = if elevation_active(sources) {
            self.elevation.initial_state(sources, index).z
        } else {
            sources[index].elevation()
        };
        SourceSnapshot { position, z }
    }
}

fn elevation_active(sources: &Sources) -> bool {
    sources.primary().spat_mode() == SpatMode::Cube
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{Point, Radians},
        source::OriginOfChange,
    };

    const EPSILON: f32 = 1e-4;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() <= EPSILON && (a.y - b.y).abs() <= EPSILON
    }

    fn four_sources() -> Sources {
        let mut sources = Sources::new();
        sources.set_size(4).unwrap();
        for index in 0..4 {
            let azimuth = Radians::from_degrees(90.0 * index as f32);
            let _ = sources[SourceIndex::new(index)].set_position(Point::from_angle(azimuth, 0.5), OriginOfChange::None);
        }
        sources
    }

    #[test]
    fn primary_move_drags_the_secondaries() {
        let mut sources = four_sources();
        let mut enforcer = SourceLinkEnforcer::new(&sources);
        enforcer.set_position_link(PositionSourceLink::Circular, &sources);
        let before: Vec<Point> = sources.iter().map(|source| source.position()).collect();

        let rotated = sources.primary().position().rotated(Radians::HALF_PI);
        let _ = sources.primary_mut().set_position(rotated, OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);

        for index in 1..4 {
            let expected = before[index].rotated(Radians::HALF_PI);
            assert!(close(sources[SourceIndex::new(index)].position(), expected));
        }
    }

    #[test]
    fn secondary_move_updates_its_baseline() {
        let mut sources = four_sources();
        let mut enforcer = SourceLinkEnforcer::new(&sources);
        enforcer.set_position_link(PositionSourceLink::DeltaLock, &sources);

        let _ = sources[SourceIndex::new(2)].set_position(Point::new(0.1, 0.1), OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::new(2));
        assert!(close(sources[SourceIndex::new(2)].position(), Point::new(0.1, 0.1)));

        let _ = sources.primary_mut().set_position(Point::new(0.2, -0.5), OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);
        assert!(close(sources[SourceIndex::new(2)].position(), Point::new(0.3, 0.1)));
    }

    #[test]
    fn symmetric_link_needs_two_sources() {
        let mut sources = Sources::new();
        sources.set_size(3).unwrap();
        let mut enforcer = SourceLinkEnforcer::new(&sources);

        let link = enforcer.set_position_link(PositionSourceLink::SymmetricX, &sources);

        assert_eq!(link, PositionSourceLink::Independent);
        assert_eq!(enforcer.position_link(), PositionSourceLink::Independent);
    }

    #[test]
    fn elevation_axis_is_idle_in_dome_mode() {
        let mut sources = four_sources();
        let mut enforcer = SourceLinkEnforcer::new(&sources);
        enforcer.set_elevation_link(ElevationSourceLink::FixedElevation, &sources);
        let before: Vec<Radians> = sources.iter().map(|source| source.elevation()).collect();

        enforcer.enforce(ChangeType::Elevation, &mut sources);

        let after: Vec<Radians> = sources.iter().map(|source| source.elevation()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn inverse_snapshots_replay_the_current_layout() {
        let mut sources = four_sources();
        let mut enforcer = SourceLinkEnforcer::new(&sources);
        enforcer.set_position_link(PositionSourceLink::CircularFixedRadius, &sources);
        let _ = sources.primary_mut().set_position(Point::from_angle(Radians::from_degrees(30.0), 0.8), OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);
        let layout: Vec<Point> = sources.iter().map(|source| source.position()).collect();
        let terminal = sources.primary().position();

        let mut saved = SourcesSnapshots::default();
        for index in 0..4 {
            let index = SourceIndex::new(index);
            saved[index] = enforcer.initial_state_from_final_state(&sources, index);
        }

        // Scramble, then replay.
        for index in 0..4 {
            let _ = sources[SourceIndex::new(index)].set_position(Point::new(-0.9, 0.0), OriginOfChange::None);
        }
        enforcer.load_snapshots(&saved);
        let _ = sources.primary_mut().set_position(terminal, OriginOfChange::PresetRecall);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);

        for (index, expected) in layout.iter().enumerate() {
            assert!(close(sources[SourceIndex::new(index)].position(), *expected));
        }
    }
}
