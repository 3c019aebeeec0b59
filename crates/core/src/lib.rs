//! Core library of the multi-source spatialization controller.
//!
//! The crate keeps up to eight sound sources positioned over a 2D field plus
//! an elevation axis. A primary source is moved by the user, by host
//! automation, by the network or by a trajectory, and the secondary sources
//! follow it through a configurable link. Each module owns one subsystem and
//! [`SpatController`] wires them together.

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod link;
pub mod mapping;
pub mod presets;
pub mod source;
pub mod timeline;
pub mod trajectory;

pub use config::ControllerConfig;
pub use controller::{OscInput, SpatController};
pub use error::{Result, SpatError};
pub use geometry::{Normalized, Point, Radians, MAX_ELEVATION};
pub use link::{
    ElevationSourceLink, ElevationStrategy, LinkStrategy, PositionSourceLink, PositionStrategy, SourceLinkEnforcer,
    SourceSnapshot, SourcesSnapshots,
};
pub use mapping::{AutomationParameter, ChangeGestures, HostMessage, HostOutbox, ParameterUpdate};
pub use presets::{PresetBank, PresetRecord, PresetSource, PresetsManager, NUMBER_OF_PRESETS};
pub use source::{
    ChangeType, OriginOfChange, Source, SourceChange, SourceId, SourceIndex, Sources, SpatMode, MAX_NUMBER_OF_SOURCES,
};
pub use timeline::{PlaybackClock, PlayheadInfo, TransportChange};
pub use trajectory::{
    ElevationTrajectoryManager, ElevationTrajectoryType, PositionTrajectoryManager, PositionTrajectoryType,
    TrajectoryManager, TrajectorySettings, TrajectoryShape, TrajectoryState,
};
