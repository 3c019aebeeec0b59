use super::{LinkStrategy, PositionSourceLink, SourceSnapshot, SourcesSnapshots};
use crate::{
    geometry::{Point, Radians},
    source::{OriginOfChange, SourceIndex, Sources, MAX_NUMBER_OF_SOURCES},
};

/// Below this radius a source is considered to sit on the centre.
const MIN_RADIUS: f32 = 1e-6;

/// Parameters shared by the two fixed-angle circular modes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixedAngleParameters {
    deviation_per_source: Radians,
    primary_final_angle: Radians,
    rotation: Radians,
    radius_ratio: f32,
    /// Slot of each source counted from the primary, in snapshot azimuth order.
    ordering: [usize; MAX_NUMBER_OF_SOURCES],
}

impl FixedAngleParameters {
    fn compute(sources: &Sources, snapshots: &SourcesSnapshots) -> Self {
        let count = sources.size();
        let initial = snapshots.primary.position;
        let current = sources.primary().position();

        let mut ranked: Vec<(usize, Radians)> = (0..count)
            .map(|index| {
                let snapshot = &snapshots[SourceIndex::new(index)];
                (index, snapshot.position.angle().positive())
            })
            .collect();
        ranked.sort_by(|(a_index, a_angle), (b_index, b_angle)| {
            a_angle.partial_cmp(b_angle).unwrap_or(std::cmp::Ordering::Equal).then(a_index.cmp(b_index))
        });

        let primary_rank = ranked.iter().position(|(index, _)| *index == 0).unwrap_or(0);
        let mut ordering = [0; MAX_NUMBER_OF_SOURCES];
        for (rank, (index, _)) in ranked.iter().enumerate() {
            ordering[*index] = (rank + count - primary_rank) % count;
        }

        Self {
            deviation_per_source: Radians::TWO_PI / count as f32,
            primary_final_angle: current.angle(),
            rotation: primary_rotation(initial, current),
            radius_ratio: radius_ratio(initial, current),
            ordering,
        }
    }

    fn angle_of(&self, index: SourceIndex) -> Radians {
        self.primary_final_angle + self.deviation_per_source * self.ordering[index.get()] as f32
    }
}

/// Implementation of every [`PositionSourceLink`] mode.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionStrategy {
    /// Secondaries sit on their own snapshot. Used to recall absolute
    /// positions.
    Independent,
    /// Secondaries rotate with the primary and scale with its radius.
    Circular { rotation: Radians, radius_ratio: f32 },
    /// Secondaries rotate with the primary and keep their own radius.
    CircularFixedRadius { rotation: Radians },
    /// Secondaries are evenly spread around the primary and scale with its
    /// radius.
    CircularFixedAngle(FixedAngleParameters),
    /// Secondaries are evenly spread around the primary and keep their own
    /// radius.
    CircularFullyFixed(FixedAngleParameters),
    /// Secondaries translate by the primary's displacement.
    DeltaLock { delta: Point },
    /// The secondary mirrors the primary across the x axis.
    SymmetricX { primary_final: Point },
    /// The secondary mirrors the primary across the y axis.
    SymmetricY { primary_final: Point },
}

impl LinkStrategy for PositionStrategy {
    type Link = PositionSourceLink;

    fn for_link(link: PositionSourceLink) -> Self {
        match link {
            PositionSourceLink::Independent => Self::Independent,
            PositionSourceLink::Circular => Self::Circular {
                rotation: Radians::ZERO,
                radius_ratio: 1.0,
            },
            PositionSourceLink::CircularFixedRadius => Self::CircularFixedRadius {
                rotation: Radians::ZERO,
            },
            PositionSourceLink::CircularFixedAngle => Self::CircularFixedAngle(FixedAngleParameters::default()),
            PositionSourceLink::CircularFullyFixed => Self::CircularFullyFixed(FixedAngleParameters::default()),
            PositionSourceLink::DeltaLock => Self::DeltaLock { delta: Point::ORIGIN },
            PositionSourceLink::SymmetricX => Self::SymmetricX {
                primary_final: Point::ORIGIN,
            },
            PositionSourceLink::SymmetricY => Self::SymmetricY {
                primary_final: Point::ORIGIN,
            },
        }
    }

    fn link(&self) -> PositionSourceLink {
        match self {
            Self::Independent => PositionSourceLink::Independent,
            Self::Circular { .. } => PositionSourceLink::Circular,
            Self::CircularFixedRadius { .. } => PositionSourceLink::CircularFixedRadius,
            Self::CircularFixedAngle(_) => PositionSourceLink::CircularFixedAngle,
            Self::CircularFullyFixed(_) => PositionSourceLink::CircularFullyFixed,
            Self::DeltaLock { .. } => PositionSourceLink::DeltaLock,
            Self::SymmetricX { .. } => PositionSourceLink::SymmetricX,
            Self::SymmetricY { .. } => PositionSourceLink::SymmetricY,
        }
    }

    fn compute_parameters(&mut self, sources: &Sources, snapshots: &SourcesSnapshots) {
        let initial = snapshots.primary.position;
        let current = sources.primary().position();
        match self {
            Self::Independent => {}
            Self::Circular { rotation, radius_ratio: ratio } => {
                *rotation = primary_rotation(initial, current);
                *ratio = radius_ratio(initial, current);
            }
            Self::CircularFixedRadius { rotation } => {
                *rotation = primary_rotation(initial, current);
            }
            Self::CircularFixedAngle(parameters) | Self::CircularFullyFixed(parameters) => {
                *parameters = FixedAngleParameters::compute(sources, snapshots);
            }
            Self::DeltaLock { delta } => {
                *delta = current - initial;
            }
            Self::SymmetricX { primary_final } | Self::SymmetricY { primary_final } => {
                *primary_final = current;
            }
        }
    }

    fn enforce_source(&self, sources: &mut Sources, snapshots: &SourcesSnapshots, index: SourceIndex) {
        let initial = snapshots[index].position;
        let position = match self {
            Self::Independent => initial,
            Self::Circular { rotation, radius_ratio } => initial.rotated(*rotation) * *radius_ratio,
            Self::CircularFixedRadius { rotation } => initial.rotated(*rotation),
            Self::CircularFixedAngle(parameters) => Point::from_angle(
                parameters.angle_of(index),
                initial.distance_from_origin() * parameters.radius_ratio,
            ),
            Self::CircularFullyFixed(parameters) => {
                Point::from_angle(parameters.angle_of(index), initial.distance_from_origin())
            }
            Self::DeltaLock { delta } => initial + *delta,
            Self::SymmetricX { primary_final } => Point::new(primary_final.x, -primary_final.y),
            Self::SymmetricY { primary_final } => Point::new(-primary_final.x, primary_final.y),
        };
        let _ = sources[index].set_position(position, OriginOfChange::Link);
    }

    fn initial_state_from_final_state(
        &self,
        sources: &Sources,
        snapshots: &SourcesSnapshots,
        index: SourceIndex,
    ) -> SourceSnapshot {
        let current = sources[index].position();
        let z = snapshots[index].z;
        let position = match self {
            Self::Independent => current,
            Self::Circular { rotation, radius_ratio } => unscale(current.rotated(-*rotation), *radius_ratio)
                .unwrap_or(snapshots[index].position),
            Self::CircularFixedRadius { rotation } => current.rotated(-*rotation),
            Self::CircularFixedAngle(parameters) => {
                unscale(current.rotated(-parameters.rotation), parameters.radius_ratio)
                    .unwrap_or(snapshots[index].position)
            }
            Self::CircularFullyFixed(parameters) => current.rotated(-parameters.rotation),
            Self::DeltaLock { delta } => current - *delta,
            Self::SymmetricX { .. } | Self::SymmetricY { .. } => snapshots[index].position,
        };
        SourceSnapshot { position, z }
    }
}

/// Angle the primary turned around the centre. A primary that starts or
/// ends on the centre has no direction, so nothing turns.
fn primary_rotation(initial: Point, current: Point) -> Radians {
    if initial.distance_from_origin() < MIN_RADIUS || current.distance_from_origin() < MIN_RADIUS {
        Radians::ZERO
    } else {
        current.angle() - initial.angle()
    }
}

/// Ratio between the primary's current and initial radius. A primary that
/// started on the centre gives no usable ratio, so radii are left alone.
fn radius_ratio(initial: Point, current: Point) -> f32 {
    let initial_radius = initial.distance_from_origin();
    if initial_radius < MIN_RADIUS {
        1.0
    } else {
        current.distance_from_origin() / initial_radius
    }
}

fn unscale(position: Point, ratio: f32) -> Option<Point> {
    (ratio.abs() >= MIN_RADIUS).then(|| position / ratio)
}
