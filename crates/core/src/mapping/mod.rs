//! Host-facing automation parameters.
//!
//! The controller never talks to a host directly. It queues [`HostMessage`]s
//! that a plugin wrapper forwards, and it brackets continuous edits with
//! change gestures counted by [`ChangeGestures`].

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{Normalized, MAX_ELEVATION},
    source::{ChangeType, Source, SpatMode},
};

/// Automatable parameters exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationParameter {
    X,
    Y,
    Z,
    PositionSourceLink,
    ElevationSourceLink,
    PositionPreset,
    AzimuthSpan,
    ElevationSpan,
}

impl AutomationParameter {
    pub const ALL: [Self; 8] = [
        Self::X,
        Self::Y,
        Self::Z,
        Self::PositionSourceLink,
        Self::ElevationSourceLink,
        Self::PositionPreset,
        Self::AzimuthSpan,
        Self::ElevationSpan,
    ];

    /// Stable identifier used by hosts to persist automation.
    pub fn id(self) -> &'static str {
        match self {
            Self::X => "recording-trajectory-x",
            Self::Y => "recording-trajectory-y",
            Self::Z => "recording-trajectory-z",
            Self::PositionSourceLink => "source-link",
            Self::ElevationSourceLink => "source-link-alt",
            Self::PositionPreset => "position-preset",
            Self::AzimuthSpan => "azimuth-span",
            Self::ElevationSpan => "elevation-span",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|parameter| parameter.id() == id)
    }
}

impl fmt::Display for AutomationParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Value written to a host parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub parameter: AutomationParameter,
    pub value: f32,
}

impl ParameterUpdate {
    pub fn new(parameter: AutomationParameter, value: f32) -> Self {
        Self { parameter, value }
    }
}

/// Message queued for the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HostMessage {
    BeginGesture { parameter: AutomationParameter },
    SetValue(ParameterUpdate),
    EndGesture { parameter: AutomationParameter },
}

/// Ordered queue of messages waiting for the host.
#[derive(Debug, Default, Clone)]
pub struct HostOutbox {
    messages: Vec<HostMessage>,
}

impl HostOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[HostMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: HostMessage) {
        self.messages.push(message);
    }

    pub fn drain(&mut self) -> Vec<HostMessage> {
        std::mem::take(&mut self.messages)
    }
}

/// Reference-counted change gestures. Only the outermost begin and end of a
/// parameter reach the host.
#[derive(Debug, Default, Clone)]
pub struct ChangeGestures {
    open: HashMap<AutomationParameter, u32>,
}

impl ChangeGestures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, parameter: AutomationParameter) -> bool {
        self.open.get(&parameter).is_some_and(|count| *count > 0)
    }

    pub fn begin(&mut self, parameter: AutomationParameter, outbox: &mut HostOutbox) {
        let count = self.open.entry(parameter).or_insert(0);
        if *count == 0 {
            outbox.push(HostMessage::BeginGesture { parameter });
        }
        *count += 1;
    }

    /// Ending a gesture that was never begun is ignored.
    pub fn end(&mut self, parameter: AutomationParameter, outbox: &mut HostOutbox) {
        let Some(count) = self.open.get_mut(&parameter) else {
            return;
        };
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            outbox.push(HostMessage::EndGesture { parameter });
        }
    }

    /// Writes a value, bracketed by its own gesture unless one is open.
    pub fn set_value(&mut self, update: ParameterUpdate, outbox: &mut HostOutbox) {
        if self.is_open(update.parameter) {
            outbox.push(HostMessage::SetValue(update));
        } else {
            self.begin(update.parameter, outbox);
            outbox.push(HostMessage::SetValue(update));
            self.end(update.parameter, outbox);
        }
    }
}

/// Host values of the primary source for one kind of change. Elevation
/// changes only exist in cube mode, where z is an independent axis.
pub fn primary_parameters(source: &Source, change_type: ChangeType) -> Vec<ParameterUpdate> {
    match change_type {
        ChangeType::Position => {
            let position = source.position();
            let x = Normalized::new((position.x + 1.0) / 2.0);
            let y = Normalized::new((position.y + 1.0) / 2.0).inverted();
            vec![
                ParameterUpdate::new(AutomationParameter::X, x.get()),
                ParameterUpdate::new(AutomationParameter::Y, y.get()),
            ]
        }
        ChangeType::Elevation if source.spat_mode() == SpatMode::Cube => {
            let z = Normalized::new(source.elevation() / MAX_ELEVATION).inverted();
            vec![ParameterUpdate::new(AutomationParameter::Z, z.get())]
        }
        ChangeType::Elevation => Vec::new(),
    }
}
