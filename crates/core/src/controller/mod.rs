//! The control core of the plugin.
//!
//! [`SpatController`] owns every subsystem and routes each source change to
//! the link enforcer, the trajectory managers, the presets and the host
//! parameters according to its [`OriginOfChange`]. All methods run on one
//! logical control thread; the host wrapper is responsible for marshalling
//! parameter callbacks onto it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::ControllerConfig,
    geometry::{Normalized, Point, Radians, MAX_ELEVATION},
    link::{ElevationSourceLink, PositionSourceLink, SourceLinkEnforcer},
    mapping::{primary_parameters, AutomationParameter, ChangeGestures, HostMessage, HostOutbox},
    presets::{PresetBank, PresetsManager, NUMBER_OF_PRESETS},
    source::{
        ChangeType, OriginOfChange, Source, SourceChange, SourceId, SourceIndex, Sources, SpatMode,
        MAX_NUMBER_OF_SOURCES,
    },
    timeline::{PlaybackClock, PlayheadInfo, TransportChange},
    trajectory::{
        ElevationTrajectoryManager, ElevationTrajectoryType, PositionTrajectoryManager, PositionTrajectoryType,
        TrajectoryShape,
    },
    Result,
};

/// Values delivered by the network layer. Coordinates and spans are
/// normalized; link selectors are 1-based; preset 0 means none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "address", content = "value", rename_all = "kebab-case")]
pub enum OscInput {
    PrimaryX(f32),
    PrimaryY(f32),
    PrimaryZ(f32),
    PrimaryPosition { x: f32, y: f32 },
    AzimuthSpan(f32),
    ElevationSpan(f32),
    PositionLink(i32),
    ElevationLink(i32),
    Preset(i32),
}

/// Control core: sources, links, trajectories, presets and host parameters.
#[derive(Debug)]
pub struct SpatController {
    config: ControllerConfig,
    sources: Sources,
    enforcer: SourceLinkEnforcer,
    position_trajectory: PositionTrajectoryManager,
    elevation_trajectory: ElevationTrajectoryManager,
    presets: PresetsManager,
    gestures: ChangeGestures,
    outbox: HostOutbox,
    clock: PlaybackClock,
    position_link: PositionSourceLink,
    /// Selected elevation link. The enforcer only runs it in cube mode.
    elevation_link: ElevationSourceLink,
    position_gesture_open: bool,
    elevation_gesture_open: bool,
    selected_source: SourceIndex,
}

impl SpatController {
    pub fn new(config: ControllerConfig) -> Result<Self> {
        Self::with_presets(config, PresetBank::new())
    }

    pub fn with_presets(config: ControllerConfig, bank: PresetBank) -> Result<Self> {
        config.validate()?;

        let mut sources = Sources::new();
        sources.set_size(config.number_of_sources)?;
        sources.set_spat_mode(config.spat_mode);
        sources.set_first_source_id(SourceId::new(config.first_source_id));

        let mut position_trajectory =
            PositionTrajectoryManager::new(PositionTrajectoryType::Realtime, config.position_trajectory.clone());
        position_trajectory.set_spat_mode(config.spat_mode);
        let mut elevation_trajectory =
            ElevationTrajectoryManager::new(ElevationTrajectoryType::Realtime, config.elevation_trajectory.clone());
        elevation_trajectory.set_spat_mode(config.spat_mode);

        let enforcer = SourceLinkEnforcer::new(&sources);
        let mut controller = Self {
            config,
            sources,
            enforcer,
            position_trajectory,
            elevation_trajectory,
            presets: PresetsManager::with_bank(bank),
            gestures: ChangeGestures::new(),
            outbox: HostOutbox::new(),
            clock: PlaybackClock::new(),
            position_link: PositionSourceLink::Independent,
            elevation_link: ElevationSourceLink::Independent,
            position_gesture_open: false,
            elevation_gesture_open: false,
            selected_source: SourceIndex::PRIMARY,
        };
        controller.place_sources_initially();
        controller.outbox.clear();
        info!(
            sources = controller.sources.size(),
            spat_mode = ?controller.config.spat_mode,
            "controller ready"
        );
        Ok(controller)
    }

    /// Even sources start at -45 degrees, odd ones at 45, all at full
    /// elevation and unit distance.
    fn place_sources_initially(&mut self) {
        for index in 0..MAX_NUMBER_OF_SOURCES {
            let Some(source) = self.sources.get_mut(SourceIndex::new(index)) else {
                continue;
            };
            let azimuth = if index % 2 == 0 {
                Radians::from_degrees(-45.0)
            } else {
                Radians::from_degrees(45.0)
            };
            let _ = source.set_coordinates(azimuth, MAX_ELEVATION, 1.0, OriginOfChange::None);
        }
        self.enforcer.anchor_moved(&self.sources);
        self.trajectory_source_moved(ChangeType::Position);
        self.trajectory_source_moved(ChangeType::Elevation);
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn source(&self, index: SourceIndex) -> Option<&Source> {
        self.sources.iter().nth(index.get())
    }

    pub fn spat_mode(&self) -> SpatMode {
        self.config.spat_mode
    }

    pub fn enforcer(&self) -> &SourceLinkEnforcer {
        &self.enforcer
    }

    pub fn position_trajectory(&self) -> &PositionTrajectoryManager {
        &self.position_trajectory
    }

    pub fn position_trajectory_mut(&mut self) -> &mut PositionTrajectoryManager {
        &mut self.position_trajectory
    }

    pub fn elevation_trajectory(&self) -> &ElevationTrajectoryManager {
        &self.elevation_trajectory
    }

    pub fn elevation_trajectory_mut(&mut self) -> &mut ElevationTrajectoryManager {
        &mut self.elevation_trajectory
    }

    pub fn presets(&self) -> &PresetsManager {
        &self.presets
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn position_link(&self) -> PositionSourceLink {
        self.position_link
    }

    pub fn elevation_link(&self) -> ElevationSourceLink {
        self.elevation_link
    }

    pub fn selected_source(&self) -> SourceIndex {
        self.selected_source
    }

    /// Messages queued for the host since the last call.
    pub fn drain_host_messages(&mut self) -> Vec<HostMessage> {
        self.outbox.drain()
    }

    pub fn host_messages(&self) -> &[HostMessage] {
        self.outbox.messages()
    }

    // ---------------------------------------------------------------------
    // Source changes
    // ---------------------------------------------------------------------

    /// Applies `edit` to one active source and routes the resulting change.
    /// Returns whether the edit produced a change.
    pub fn update_source<F>(&mut self, index: SourceIndex, edit: F) -> bool
    where
        F: FnOnce(&mut Source) -> Option<SourceChange>,
    {
        if index.get() >= self.sources.size() {
            warn!(%index, sources = self.sources.size(), "no such source");
            return false;
        }
        let Some(source) = self.sources.get_mut(index) else {
            return false;
        };
        match edit(source) {
            Some(change) => {
                self.source_changed(change);
                true
            }
            None => false,
        }
    }

    pub fn set_source_position(&mut self, index: SourceIndex, position: Point, origin: OriginOfChange) -> bool {
        self.update_source(index, |source| source.set_position(position, origin))
    }

    pub fn set_source_elevation(&mut self, index: SourceIndex, elevation: Radians, origin: OriginOfChange) -> bool {
        self.update_source(index, |source| source.set_elevation(elevation, origin))
    }

    pub fn set_source_azimuth(&mut self, index: SourceIndex, azimuth: Radians, origin: OriginOfChange) -> bool {
        self.update_source(index, |source| source.set_azimuth(azimuth, origin))
    }

    pub fn set_source_distance(&mut self, index: SourceIndex, distance: f32, origin: OriginOfChange) -> bool {
        self.update_source(index, |source| source.set_distance(distance, origin))
    }

    fn source_changed(&mut self, change: SourceChange) {
        let SourceChange {
            index,
            change_type,
            origin,
        } = change;
        let is_primary = index.is_primary();

        match origin {
            OriginOfChange::None => {}
            OriginOfChange::UserMove => {
                self.enforcer.source_moved(change_type, &mut self.sources, index);
                self.selected_source = index;
                if is_primary {
                    self.trajectory_source_moved(change_type);
                    self.update_primary_parameters(change_type);
                } else {
                    self.presets.source_moved();
                }
            }
            OriginOfChange::UserAnchorMove => {
                self.enforcer.anchor_moved(&self.sources);
                self.selected_source = index;
                if is_primary {
                    self.trajectory_source_moved(change_type);
                    self.update_primary_parameters(change_type);
                }
                self.presets.source_moved();
            }
            OriginOfChange::PresetRecall => {
                self.enforcer.source_moved(change_type, &mut self.sources, index);
                self.trajectory_source_moved(change_type);
                self.update_primary_parameters(change_type);
            }
            OriginOfChange::Link => {
                if is_primary {
                    self.enforcer.source_moved(change_type, &mut self.sources, index);
                    self.trajectory_source_moved(change_type);
                    self.update_primary_parameters(change_type);
                }
            }
            OriginOfChange::Trajectory => {
                self.enforcer.source_moved(change_type, &mut self.sources, index);
                self.update_primary_parameters(change_type);
            }
            OriginOfChange::Osc => {
                self.enforcer.source_moved(change_type, &mut self.sources, index);
                if is_primary {
                    self.trajectory_source_moved(change_type);
                    self.update_primary_parameters(change_type);
                }
            }
            OriginOfChange::Automation => {
                self.enforcer.source_moved(change_type, &mut self.sources, index);
                if is_primary && !self.trajectory_is_active(change_type) {
                    self.trajectory_source_moved(change_type);
                    if change_type == ChangeType::Position {
                        let position = self.sources.primary().position();
                        self.position_trajectory.set_playback_position(position);
                    }
                }
            }
        }
    }

    fn trajectory_is_active(&self, change_type: ChangeType) -> bool {
        match change_type {
            ChangeType::Position => self.position_trajectory.is_active(),
            ChangeType::Elevation => self.elevation_trajectory.is_active(),
        }
    }

    fn trajectory_source_moved(&mut self, change_type: ChangeType) {
        let primary = self.sources.primary();
        match change_type {
            ChangeType::Position => self.position_trajectory.source_moved(primary),
            ChangeType::Elevation => self.elevation_trajectory.source_moved(primary),
        }
    }

    fn update_primary_parameters(&mut self, change_type: ChangeType) {
        for update in primary_parameters(self.sources.primary(), change_type) {
            self.gestures.set_value(update, &mut self.outbox);
        }
    }

    /// Opens the host gestures of a continuous user drag on the primary.
    pub fn begin_drag(&mut self, change_type: ChangeType) {
        for parameter in drag_parameters(change_type) {
            self.gestures.begin(*parameter, &mut self.outbox);
        }
    }

    pub fn end_drag(&mut self, change_type: ChangeType) {
        for parameter in drag_parameters(change_type) {
            self.gestures.end(*parameter, &mut self.outbox);
        }
    }

    // ---------------------------------------------------------------------
    // Host parameters and network input
    // ---------------------------------------------------------------------

    /// Consumes a host automation value. Non-finite values are dropped.
    /// Link selectors arrive as zero-based choice indices.
    pub fn parameter_changed(&mut self, parameter: AutomationParameter, value: f32) {
        if !value.is_finite() {
            warn!(%parameter, value, "dropping non-finite automation value");
            return;
        }
        let normalized = Normalized::new(value);
        let origin = OriginOfChange::Automation;
        match parameter {
            AutomationParameter::X => {
                self.update_source(SourceIndex::PRIMARY, |source| source.set_normalized_x(normalized, origin));
            }
            AutomationParameter::Y => {
                self.update_source(SourceIndex::PRIMARY, |source| {
                    source.set_normalized_y(normalized.inverted(), origin)
                });
            }
            AutomationParameter::Z => self.set_primary_z(normalized, origin),
            AutomationParameter::PositionSourceLink => {
                match PositionSourceLink::from_selector(value.round() as i32 + 1) {
                    Ok(link) => {
                        self.set_position_link(link);
                    }
                    Err(error) => warn!(%error, "ignoring position link automation"),
                }
            }
            AutomationParameter::ElevationSourceLink => {
                match ElevationSourceLink::from_selector(value.round() as i32 + 1) {
                    Ok(link) => self.set_elevation_link(link),
                    Err(error) => warn!(%error, "ignoring elevation link automation"),
                }
            }
            AutomationParameter::PositionPreset => {
                self.load_preset(value.round() as i32);
            }
            AutomationParameter::AzimuthSpan => {
                for source in self.sources.iter_mut() {
                    source.set_azimuth_span(normalized);
                }
            }
            AutomationParameter::ElevationSpan => {
                for source in self.sources.iter_mut() {
                    source.set_elevation_span(normalized);
                }
            }
        }
    }

    /// Consumes a network message, the same way as automation but tagged as
    /// coming from the network.
    pub fn handle_osc(&mut self, input: OscInput) {
        let origin = OriginOfChange::Osc;
        let finite = match input {
            OscInput::PrimaryX(value)
            | OscInput::PrimaryY(value)
            | OscInput::PrimaryZ(value)
            | OscInput::AzimuthSpan(value)
            | OscInput::ElevationSpan(value) => value.is_finite(),
            OscInput::PrimaryPosition { x, y } => x.is_finite() && y.is_finite(),
            OscInput::PositionLink(_) | OscInput::ElevationLink(_) | OscInput::Preset(_) => true,
        };
        if !finite {
            warn!(?input, "dropping non-finite network value");
            return;
        }

        match input {
            OscInput::PrimaryX(x) => {
                self.update_source(SourceIndex::PRIMARY, |source| source.set_normalized_x(Normalized::new(x), origin));
            }
            OscInput::PrimaryY(y) => {
                self.update_source(SourceIndex::PRIMARY, |source| {
                    source.set_normalized_y(Normalized::new(y).inverted(), origin)
                });
            }
            OscInput::PrimaryZ(z) => self.set_primary_z(Normalized::new(z), origin),
            OscInput::PrimaryPosition { x, y } => {
                let position = Point::new(
                    Normalized::new(x).get() * 2.0 - 1.0,
                    Normalized::new(y).inverted().get() * 2.0 - 1.0,
                );
                self.update_source(SourceIndex::PRIMARY, |source| source.set_position(position, origin));
            }
            OscInput::AzimuthSpan(span) => self.set_azimuth_span(SourceIndex::PRIMARY, Normalized::new(span)),
            OscInput::ElevationSpan(span) => self.set_elevation_span(SourceIndex::PRIMARY, Normalized::new(span)),
            OscInput::PositionLink(selector) => match PositionSourceLink::from_selector(selector) {
                Ok(link) => {
                    self.set_position_link(link);
                }
                Err(error) => warn!(%error, "ignoring network position link"),
            },
            OscInput::ElevationLink(selector) => match ElevationSourceLink::from_selector(selector) {
                Ok(link) => self.set_elevation_link(link),
                Err(error) => warn!(%error, "ignoring network elevation link"),
            },
            OscInput::Preset(slot) => {
                self.load_preset(slot);
            }
        }
    }

    /// Only cube mode has an independent elevation to drive.
    fn set_primary_z(&mut self, normalized: Normalized, origin: OriginOfChange) {
        if self.config.spat_mode != SpatMode::Cube {
            return;
        }
        self.update_source(SourceIndex::PRIMARY, |source| {
            source.set_normalized_elevation(normalized.inverted(), origin)
        });
    }

    // ---------------------------------------------------------------------
    // Links, spans and layout settings
    // ---------------------------------------------------------------------

    /// Selects a position link and applies it to the current layout. Returns
    /// the link in effect, which is independent when a symmetric link does
    /// not fit the number of sources.
    pub fn set_position_link(&mut self, link: PositionSourceLink) -> PositionSourceLink {
        if link == self.position_link {
            return link;
        }
        let effective = self.enforcer.set_position_link(link, &self.sources);
        self.position_link = effective;
        self.enforcer.enforce(ChangeType::Position, &mut self.sources);
        info!(link = %effective, "position link changed");
        effective
    }

    pub fn set_elevation_link(&mut self, link: ElevationSourceLink) {
        if link == self.elevation_link {
            return;
        }
        self.elevation_link = link;
        if self.config.spat_mode == SpatMode::Cube {
            self.enforcer.set_elevation_link(link, &self.sources);
            self.enforcer.enforce(ChangeType::Elevation, &mut self.sources);
        }
        info!(%link, "elevation link changed");
    }

    /// Dome mode couples elevation to the field radius, so the elevation
    /// link is suspended until cube mode comes back.
    pub fn set_spat_mode(&mut self, spat_mode: SpatMode) {
        if spat_mode == self.config.spat_mode {
            return;
        }
        self.config.spat_mode = spat_mode;
        self.sources.set_spat_mode(spat_mode);
        self.position_trajectory.set_spat_mode(spat_mode);
        self.elevation_trajectory.set_spat_mode(spat_mode);
        match spat_mode {
            SpatMode::Dome => {
                self.enforcer.set_elevation_link(ElevationSourceLink::Independent, &self.sources);
            }
            SpatMode::Cube => {
                self.enforcer.set_elevation_link(self.elevation_link, &self.sources);
            }
        }
        info!(?spat_mode, "spat mode changed");
    }

    pub fn set_number_of_sources(&mut self, number_of_sources: usize) -> Result<()> {
        if number_of_sources == self.sources.size() {
            return Ok(());
        }
        self.sources.set_size(number_of_sources)?;
        self.config.number_of_sources = number_of_sources;
        if self.position_link.is_symmetric() && number_of_sources != 2 {
            self.set_position_link(PositionSourceLink::Independent);
        }
        self.enforcer.number_of_sources_changed(&mut self.sources);
        self.presets.number_of_sources_changed();
        info!(sources = number_of_sources, "number of sources changed");
        Ok(())
    }

    /// Relabels the sources. Nothing else depends on the ids.
    pub fn set_first_source_id(&mut self, first_source_id: i32) {
        self.config.first_source_id = first_source_id;
        self.sources.set_first_source_id(SourceId::new(first_source_id));
    }

    pub fn set_span_link(&mut self, span_link: bool) {
        self.config.span_link = span_link;
    }

    /// User edit of a span. With span link on, every source follows.
    pub fn set_azimuth_span(&mut self, index: SourceIndex, span: Normalized) {
        if self.config.span_link {
            self.sources.iter_mut().for_each(|source| source.set_azimuth_span(span));
        } else if let Some(source) = self.sources.get_mut(index) {
            source.set_azimuth_span(span);
        }
    }

    pub fn set_elevation_span(&mut self, index: SourceIndex, span: Normalized) {
        if self.config.span_link {
            self.sources.iter_mut().for_each(|source| source.set_elevation_span(span));
        } else if let Some(source) = self.sources.get_mut(index) {
            source.set_elevation_span(span);
        }
    }

    // ---------------------------------------------------------------------
    // Presets
    // ---------------------------------------------------------------------

    pub fn save_preset(&mut self, slot: i32) -> Result<()> {
        self.presets.save(slot, &self.sources, &self.enforcer)
    }

    /// Recalls `slot` if it differs from the current preset.
    pub fn load_preset(&mut self, slot: i32) -> bool {
        let loaded = self.presets.load_if_preset_changed(slot, &mut self.sources, &mut self.enforcer);
        if loaded {
            self.preset_recalled();
        }
        loaded
    }

    pub fn force_load_preset(&mut self, slot: i32) -> bool {
        let loaded = self.presets.force_load(slot, &mut self.sources, &mut self.enforcer);
        if loaded {
            self.preset_recalled();
        }
        loaded
    }

    pub fn delete_preset(&mut self, slot: i32) -> bool {
        self.presets.delete_preset(slot)
    }

    pub fn current_preset(&self) -> i32 {
        self.presets.current_preset()
    }

    pub fn saved_presets(&self) -> [bool; NUMBER_OF_PRESETS] {
        self.presets.saved_presets()
    }

    fn preset_recalled(&mut self) {
        self.trajectory_source_moved(ChangeType::Position);
        self.update_primary_parameters(ChangeType::Position);
        if self.config.spat_mode == SpatMode::Cube {
            self.trajectory_source_moved(ChangeType::Elevation);
            self.update_primary_parameters(ChangeType::Elevation);
        }
    }

    // ---------------------------------------------------------------------
    // Trajectories and transport
    // ---------------------------------------------------------------------

    /// Selects a path, anchored on the primary's current state.
    pub fn set_position_trajectory_type(&mut self, trajectory_type: PositionTrajectoryType) {
        let anchor = PositionTrajectoryType::read(self.sources.primary());
        self.position_trajectory.set_trajectory_type(trajectory_type, anchor);
    }

    pub fn set_elevation_trajectory_type(&mut self, trajectory_type: ElevationTrajectoryType) {
        let anchor = ElevationTrajectoryType::read(self.sources.primary());
        self.elevation_trajectory.set_trajectory_type(trajectory_type, anchor);
    }

    pub fn set_position_activate_state(&mut self, active: bool) -> bool {
        self.position_trajectory.set_activate_state(active)
    }

    pub fn set_elevation_activate_state(&mut self, active: bool) -> bool {
        self.elevation_trajectory.set_activate_state(active)
    }

    /// Consumes the host transport of one audio block. Active trajectories
    /// hold their parameters' gestures open while the host plays, and are
    /// deactivated when it stops.
    pub fn process_block(&mut self, playhead: PlayheadInfo) {
        if self.clock.update(playhead) == TransportChange::Stopped {
            let position = self.position_trajectory.set_activate_state(false);
            let elevation = self.elevation_trajectory.set_activate_state(false);
            if position || elevation {
                debug!("transport stopped, trajectories deactivated");
            }
        }
        let playing = self.clock.is_playing();

        let position_active = self.position_trajectory.is_active() && playing;
        if position_active != self.position_gesture_open {
            self.position_gesture_open = position_active;
            self.toggle_gestures(&[AutomationParameter::X, AutomationParameter::Y], position_active);
        }
        let elevation_active =
            self.config.spat_mode == SpatMode::Cube && self.elevation_trajectory.is_active() && playing;
        if elevation_active != self.elevation_gesture_open {
            self.elevation_gesture_open = elevation_active;
            self.toggle_gestures(&[AutomationParameter::Z], elevation_active);
        }
    }

    fn toggle_gestures(&mut self, parameters: &[AutomationParameter], open: bool) {
        for parameter in parameters {
            if open {
                self.gestures.begin(*parameter, &mut self.outbox);
            } else {
                self.gestures.end(*parameter, &mut self.outbox);
            }
        }
    }

    /// Periodic control tick. Advances the active trajectories when the host
    /// time moved and returns the sources whose display is stale.
    pub fn timer_callback(&mut self) -> Vec<SourceIndex> {
        if self.clock.take_time_changed() {
            let elapsed = self.clock.elapsed();
            if self.position_trajectory.is_active() {
                let change = self
                    .position_trajectory
                    .set_trajectory_delta_time(elapsed, self.sources.primary_mut());
                if let Some(change) = change {
                    self.source_changed(change);
                }
            }
            if self.config.spat_mode == SpatMode::Cube && self.elevation_trajectory.is_active() {
                let change = self
                    .elevation_trajectory
                    .set_trajectory_delta_time(elapsed, self.sources.primary_mut());
                if let Some(change) = change {
                    self.source_changed(change);
                }
            }
        }
        self.sources.drain_gui_updates()
    }
}

fn drag_parameters(change_type: ChangeType) -> &'static [AutomationParameter] {
    match change_type {
        ChangeType::Position => &[AutomationParameter::X, AutomationParameter::Y],
        ChangeType::Elevation => &[AutomationParameter::Z],
    }
}
