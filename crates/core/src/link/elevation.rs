use super::{ElevationSourceLink, LinkStrategy, SourceSnapshot, SourcesSnapshots};
use crate::{
    geometry::{Radians, MAX_ELEVATION},
    source::{OriginOfChange, SourceIndex, Sources},
};

/// Elevation span covered by the linear modes.
fn linear_span() -> Radians {
    MAX_ELEVATION / 3.0 * 2.0
}

/// Implementation of every [`ElevationSourceLink`] mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ElevationStrategy {
    Independent,
    FixedElevation {
        elevation: Radians,
    },
    /// Secondaries step down from the primary's elevation.
    LinearMin {
        base: Radians,
        per_source: Radians,
    },
    /// Secondaries step up from the primary's elevation.
    LinearMax {
        base: Radians,
        per_source: Radians,
    },
    DeltaLock {
        delta: Radians,
    },
}

impl ElevationStrategy {
    fn linear_step(sources: &Sources, span: Radians) -> Radians {
        match sources.size() {
            0 | 1 => Radians::ZERO,
            count => span / (count - 1) as f32,
        }
    }
}

impl LinkStrategy for ElevationStrategy {
    type Link = ElevationSourceLink;

    fn for_link(link: ElevationSourceLink) -> Self {
        match link {
            ElevationSourceLink::Independent => Self::Independent,
            ElevationSourceLink::FixedElevation => Self::FixedElevation {
                elevation: Radians::ZERO,
            },
            ElevationSourceLink::LinearMin => Self::LinearMin {
                base: Radians::ZERO,
                per_source: Radians::ZERO,
            },
            ElevationSourceLink::LinearMax => Self::LinearMax {
                base: Radians::ZERO,
                per_source: Radians::ZERO,
            },
            ElevationSourceLink::DeltaLock => Self::DeltaLock { delta: Radians::ZERO },
        }
    }

    fn link(&self) -> ElevationSourceLink {
        match self {
            Self::Independent => ElevationSourceLink::Independent,
            Self::FixedElevation { .. } => ElevationSourceLink::FixedElevation,
            Self::LinearMin { .. } => ElevationSourceLink::LinearMin,
            Self::LinearMax { .. } => ElevationSourceLink::LinearMax,
            Self::DeltaLock { .. } => ElevationSourceLink::DeltaLock,
        }
    }

    fn compute_parameters(&mut self, sources: &Sources, snapshots: &SourcesSnapshots) {
        let current = sources.primary().elevation();
        match self {
            Self::Independent => {}
            Self::FixedElevation { elevation } => *elevation = current,
            Self::LinearMin { base, per_source } => {
                *base = current;
                *per_source = -Self::linear_step(sources, linear_span());
            }
            Self::LinearMax { base, per_source } => {
                *base = current;
                *per_source = Self::linear_step(sources, linear_span());
            }
            Self::DeltaLock { delta } => *delta = current - snapshots.primary.z,
        }
    }

    fn enforce_source(&self, sources: &mut Sources, snapshots: &SourcesSnapshots, index: SourceIndex) {
        let elevation = match self {
            Self::Independent => snapshots[index].z,
            Self::FixedElevation { elevation } => *elevation,
            Self::LinearMin { base, per_source } | Self::LinearMax { base, per_source } => {
                *base + *per_source * index.get() as f32
            }
            Self::DeltaLock { delta } => snapshots[index].z + *delta,
        };
        let _ = sources[index].set_elevation(elevation, OriginOfChange::Link);
    }

    fn initial_state_from_final_state(
        &self,
        sources: &Sources,
        snapshots: &SourcesSnapshots,
        index: SourceIndex,
    ) -> SourceSnapshot {
        let current = sources[index].elevation();
        let z = match self {
            Self::DeltaLock { delta } => current - *delta,
            _ => current,
        };
        SourceSnapshot {
            position: snapshots[index].position,
            z,
        }
    }
}
