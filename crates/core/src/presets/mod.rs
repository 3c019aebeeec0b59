//! Preset slots.
//!
//! A preset stores, for every active source, the baseline that reproduces
//! its current state under the active links, plus the primary's terminal
//! state. Saving inverts the layout through a copy of the links re-anchored
//! on the live layout, so the stored baselines are the saved absolute
//! positions whatever link is active at recall. The live links are left as
//! they are. Recalling loads the baselines into the enforcer and
//! moves the primary onto the terminal, so the links rebuild the layout.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    geometry::{Point, Radians, MAX_ELEVATION},
    link::SourceLinkEnforcer,
    source::{ChangeType, OriginOfChange, Source, SourceIndex, Sources, SpatMode, MAX_NUMBER_OF_SOURCES},
    Result, SpatError,
};

pub const NUMBER_OF_PRESETS: usize = 50;

/// Stored state of one source. `z` is the normalized elevation and is only
/// present for presets saved in cube mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetSource {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl PresetSource {
    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRecord {
    pub id: i32,
    pub sources: Vec<PresetSource>,
    pub terminal: PresetSource,
}

/// Every saved preset, kept sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetBank {
    presets: Vec<PresetRecord>,
}

impl PresetBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presets(&self) -> &[PresetRecord] {
        &self.presets
    }

    pub fn get(&self, slot: i32) -> Option<&PresetRecord> {
        self.presets.iter().find(|record| record.id == slot)
    }

    /// Inserts or replaces the record with the same id.
    pub fn insert(&mut self, record: PresetRecord) {
        self.presets.retain(|existing| existing.id != record.id);
        self.presets.push(record);
        self.presets.sort_by_key(|record| record.id);
    }

    pub fn remove(&mut self, slot: i32) -> bool {
        let before = self.presets.len();
        self.presets.retain(|record| record.id != slot);
        self.presets.len() != before
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut bank: Self = serde_json::from_str(json)?;
        if let Some(record) = bank.presets.iter().find(|record| !slot_in_range(record.id)) {
            return Err(SpatError::InvalidPresetSlot(record.id));
        }
        bank.presets.sort_by_key(|record| record.id);
        Ok(bank)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn slot_in_range(slot: i32) -> bool {
    usize::try_from(slot).is_ok_and(|slot| (1..=NUMBER_OF_PRESETS).contains(&slot))
}

/// Saves and recalls presets, and tracks which one is current.
#[derive(Debug, Clone, Default)]
pub struct PresetsManager {
    bank: PresetBank,
    current_preset: i32,
}

impl PresetsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bank(bank: PresetBank) -> Self {
        Self {
            bank,
            current_preset: 0,
        }
    }

    pub fn bank(&self) -> &PresetBank {
        &self.bank
    }

    /// Slot of the preset the layout comes from, or 0.
    pub fn current_preset(&self) -> i32 {
        self.current_preset
    }

    /// Occupancy of slots 1 to 50.
    pub fn saved_presets(&self) -> [bool; NUMBER_OF_PRESETS] {
        let mut saved = [false; NUMBER_OF_PRESETS];
        for record in self.bank.presets() {
            if let Some(flag) = usize::try_from(record.id - 1).ok().and_then(|index| saved.get_mut(index)) {
                *flag = true;
            }
        }
        saved
    }

    /// Stores the current layout in `slot`, replacing what was there.
    pub fn save(&mut self, slot: i32, sources: &Sources, enforcer: &SourceLinkEnforcer) -> Result<()> {
        if !slot_in_range(slot) {
            return Err(SpatError::InvalidPresetSlot(slot));
        }
        let mut anchored = enforcer.clone();
        anchored.anchor_moved(sources);
        let cube = sources.primary().spat_mode() == SpatMode::Cube;
        let stored_z = |elevation: Radians| cube.then(|| elevation / MAX_ELEVATION);

        let entries = (0..sources.size())
            .map(|index| {
                let snapshot = anchored.initial_state_from_final_state(sources, SourceIndex::new(index));
                PresetSource {
                    x: snapshot.position.x,
                    y: snapshot.position.y,
                    z: stored_z(snapshot.z),
                }
            })
            .collect();
        let primary = sources.primary();
        let record = PresetRecord {
            id: slot,
            sources: entries,
            terminal: PresetSource {
                x: primary.x(),
                y: primary.y(),
                z: stored_z(primary.elevation()),
            },
        };

        self.bank.insert(record);
        self.current_preset = slot;
        info!(slot, sources = sources.size(), "preset saved");
        Ok(())
    }

    /// Recalls `slot` unless it is already the current preset. Slot 0 only
    /// clears the current preset. Returns whether a preset was applied.
    pub fn load_if_preset_changed(&mut self, slot: i32, sources: &mut Sources, enforcer: &mut SourceLinkEnforcer) -> bool {
        if slot == self.current_preset {
            return false;
        }
        if slot == 0 {
            self.current_preset = 0;
            return false;
        }
        self.force_load(slot, sources, enforcer)
    }

    /// Recalls `slot` even if it is the current preset. A missing slot leaves
    /// everything untouched.
    pub fn force_load(&mut self, slot: i32, sources: &mut Sources, enforcer: &mut SourceLinkEnforcer) -> bool {
        let Some(record) = self.bank.get(slot).cloned() else {
            warn!(slot, "no preset saved in slot");
            return false;
        };

        let mut snapshots = enforcer.snapshots();
        for (index, entry) in record.sources.iter().enumerate().take(MAX_NUMBER_OF_SOURCES) {
            let index = SourceIndex::new(index);
            snapshots[index].position = entry.position();
            snapshots[index].z = stored_elevation(entry, &sources[index]);
        }
        enforcer.load_snapshots(&snapshots);

        let terminal = record.terminal;
        let _ = sources.primary_mut().set_position(terminal.position(), OriginOfChange::PresetRecall);
        enforcer.source_moved(ChangeType::Position, sources, SourceIndex::PRIMARY);
        if let Some(z) = terminal.z.filter(|_| sources.primary().spat_mode() == SpatMode::Cube) {
            let change = sources
                .primary_mut()
                .set_elevation(MAX_ELEVATION * z, OriginOfChange::PresetRecall);
            if let Some(change) = change {
                enforcer.source_moved(change.change_type, sources, SourceIndex::PRIMARY);
            }
        }

        self.current_preset = slot;
        info!(slot, "preset loaded");
        true
    }

    /// Removes `slot` from the bank. The live layout is not touched.
    pub fn delete_preset(&mut self, slot: i32) -> bool {
        if !self.bank.remove(slot) {
            return false;
        }
        if self.current_preset == slot {
            self.current_preset = 0;
        }
        info!(slot, "preset deleted");
        true
    }

    /// A source moved away from the recalled layout. Returns whether the
    /// current preset was cleared.
    pub fn source_moved(&mut self) -> bool {
        std::mem::take(&mut self.current_preset) != 0
    }

    pub fn number_of_sources_changed(&mut self) -> bool {
        self.source_moved()
    }
}

fn stored_elevation(entry: &PresetSource, source: &Source) -> Radians {
    entry
        .z
        .map(|z| MAX_ELEVATION * z)
        .unwrap_or_else(|| source.elevation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::PositionSourceLink;
    use pretty_assertions::assert_eq;

    fn layout() -> (Sources, SourceLinkEnforcer) {
        let mut sources = Sources::new();
        sources.set_size(3).unwrap();
        for (index, degrees) in [0.0, 120.0, 240.0].into_iter().enumerate() {
            let position = Point::from_angle(Radians::from_degrees(degrees), 0.5);
            let _ = sources[SourceIndex::new(index)].set_position(position, OriginOfChange::None);
        }
        let enforcer = SourceLinkEnforcer::new(&sources);
        (sources, enforcer)
    }

    fn positions(sources: &Sources) -> Vec<Point> {
        sources.iter().map(|source| source.position()).collect()
    }

    fn assert_layout(actual: &[Point], expected: &[Point]) {
        assert_eq!(actual.len(), expected.len());
        for (a, b) in actual.iter().zip(expected) {
            assert!(a.distance_to(*b) < 1e-4, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn save_records_every_active_source() {
        let (sources, enforcer) = layout();
        let mut presets = PresetsManager::new();

        presets.save(7, &sources, &enforcer).unwrap();

        let record = presets.bank().get(7).unwrap();
        assert_eq!(record.sources.len(), 3);
        assert_eq!(record.terminal.z, None);
        assert_eq!(presets.current_preset(), 7);
        assert!(presets.saved_presets()[6]);
    }

    #[test]
    fn rejects_slots_outside_the_bank() {
        let (sources, enforcer) = layout();
        let mut presets = PresetsManager::new();
        assert!(matches!(
            presets.save(51, &sources, &enforcer),
            Err(SpatError::InvalidPresetSlot(51))
        ));
        assert!(matches!(
            presets.save(0, &sources, &enforcer),
            Err(SpatError::InvalidPresetSlot(0))
        ));
    }

    #[test]
    fn recall_restores_the_saved_layout() {
        let (mut sources, mut enforcer) = layout();
        let mut presets = PresetsManager::new();
        presets.save(3, &sources, &enforcer).unwrap();
        let saved = positions(&sources);

        for index in 0..3 {
            let _ = sources[SourceIndex::new(index)].set_position(Point::new(0.1, 0.1), OriginOfChange::None);
        }
        assert!(presets.source_moved());

        assert!(presets.load_if_preset_changed(3, &mut sources, &mut enforcer));
        assert_layout(&positions(&sources), &saved);
        assert!(!presets.load_if_preset_changed(3, &mut sources, &mut enforcer));
    }

    #[test]
    fn recall_under_a_link_rebuilds_the_relation() {
        let (mut sources, mut enforcer) = layout();
        enforcer.set_position_link(PositionSourceLink::Circular, &sources);
        let mut presets = PresetsManager::new();
        presets.save(1, &sources, &enforcer).unwrap();
        let saved = positions(&sources);

        let moved = sources.primary().position().rotated(Radians::from_degrees(70.0));
        let _ = sources.primary_mut().set_position(moved, OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);
        presets.source_moved();

        assert!(presets.load_if_preset_changed(1, &mut sources, &mut enforcer));
        assert_layout(&positions(&sources), &saved);
    }

    #[test]
    fn saving_after_a_linked_move_keeps_absolute_positions() {
        let (mut sources, mut enforcer) = layout();
        enforcer.set_position_link(PositionSourceLink::CircularFixedRadius, &sources);
        let moved = sources.primary().position().rotated(Radians::from_degrees(40.0));
        let _ = sources.primary_mut().set_position(moved, OriginOfChange::UserMove);
        enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);

        let mut presets = PresetsManager::new();
        presets.save(5, &sources, &enforcer).unwrap();

        let stored: Vec<Point> = presets.bank().get(5).unwrap().sources.iter().map(PresetSource::position).collect();
        assert_layout(&stored, &positions(&sources));
    }

    #[test]
    fn saving_mid_drag_leaves_the_links_alone() {
        let drag = |save: bool| {
            let (mut sources, mut enforcer) = layout();
            sources.set_spat_mode(SpatMode::Cube);
            enforcer.set_position_link(PositionSourceLink::Circular, &sources);
            let before = positions(&sources);
            let start = sources.primary().position();
            let mut presets = PresetsManager::new();

            let _ = sources.primary_mut().set_position(Point::ORIGIN, OriginOfChange::UserMove);
            enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);
            if save {
                presets.save(3, &sources, &enforcer).unwrap();
            }
            let _ = sources.primary_mut().set_position(start, OriginOfChange::UserMove);
            enforcer.source_moved(ChangeType::Position, &mut sources, SourceIndex::PRIMARY);
            (before, positions(&sources))
        };

        let (before, saved) = drag(true);
        let (_, unsaved) = drag(false);
        assert_layout(&saved, &unsaved);
        assert_layout(&saved, &before);
    }

    #[test]
    fn missing_and_empty_slots_do_not_mutate() {
        let (mut sources, mut enforcer) = layout();
        let mut presets = PresetsManager::new();
        let before = positions(&sources);

        assert!(!presets.load_if_preset_changed(12, &mut sources, &mut enforcer));
        assert!(!presets.load_if_preset_changed(0, &mut sources, &mut enforcer));
        assert!(!presets.delete_preset(12));
        assert_eq!(positions(&sources), before);
    }

    #[test]
    fn delete_keeps_the_live_layout() {
        let (mut sources, mut enforcer) = layout();
        let mut presets = PresetsManager::new();
        presets.save(2, &sources, &enforcer).unwrap();
        let before = positions(&sources);

        assert!(presets.delete_preset(2));
        assert_eq!(presets.current_preset(), 0);
        assert_eq!(positions(&sources), before);
        assert!(!presets.force_load(2, &mut sources, &mut enforcer));
    }

    #[test]
    fn bank_stays_sorted_and_round_trips_through_json() {
        let (sources, enforcer) = layout();
        let mut presets = PresetsManager::new();
        for slot in [9, 2, 30, 2] {
            presets.save(slot, &sources, &enforcer).unwrap();
        }
        let ids: Vec<i32> = presets.bank().presets().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![2, 9, 30]);

        let json = presets.bank().to_json_string().unwrap();
        assert_eq!(PresetBank::from_json_str(&json).unwrap(), *presets.bank());
    }
}
