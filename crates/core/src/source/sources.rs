use std::ops::{Index, IndexMut};

use super::{Source, SourceId, SourceIndex, SpatMode};
use crate::{Result, SpatError};

/// Number of pre-allocated sources.
pub const MAX_NUMBER_OF_SOURCES: usize = 8;

/// Fixed-capacity collection of sources. Index 0 is the primary source.
///
/// Every slot is allocated up front; changing the number of sources only
/// changes which slots are iterated.
#[derive(Debug, Clone)]
pub struct Sources {
    size: usize,
    sources: [Source; MAX_NUMBER_OF_SOURCES],
}

impl Sources {
    pub fn new() -> Self {
        let mut sources = std::array::from_fn(|index| Source::new(SourceIndex::new(index)));
        for source in &mut sources {
            source.set_colour_from_index(2);
        }
        Self { size: 2, sources }
    }

    /// Number of active sources.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if !(1..=MAX_NUMBER_OF_SOURCES).contains(&size) {
            return Err(SpatError::InvalidSourceCount(size));
        }
        self.size = size;
        for (index, source) in self.sources.iter_mut().enumerate() {
            source.set_index(SourceIndex::new(index));
            source.set_colour_from_index(size);
        }
        Ok(())
    }

    pub fn get(&self, index: SourceIndex) -> Option<&Source> {
        self.sources.get(index.get())
    }

    pub fn get_mut(&mut self, index: SourceIndex) -> Option<&mut Source> {
        self.sources.get_mut(index.get())
    }

    pub fn primary(&self) -> &Source {
        &self.sources[0]
    }

    pub fn primary_mut(&mut self) -> &mut Source {
        &mut self.sources[0]
    }

    /// Active sources, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources[..self.size].iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Source> {
        self.sources[..self.size].iter_mut()
    }

    pub fn set_spat_mode(&mut self, spat_mode: SpatMode) {
        for source in &mut self.sources {
            source.set_spat_mode(spat_mode);
        }
    }

    /// Relabels every source so that the primary carries `first_source_id`.
    pub fn set_first_source_id(&mut self, first_source_id: SourceId) {
        for (offset, source) in self.sources.iter_mut().enumerate() {
            source.set_id(SourceId::new(first_source_id.get() + offset as i32));
        }
    }

    /// Indices of the active sources whose state changed since the last call.
    pub fn drain_gui_updates(&mut self) -> Vec<SourceIndex> {
        self.iter_mut()
            .filter_map(|source| source.take_gui_update().then(|| source.index()))
            .collect()
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<SourceIndex> for Sources {
    type Output = Source;

    fn index(&self, index: SourceIndex) -> &Source {
        &self.sources[index.get()]
    }
}

impl IndexMut<SourceIndex> for Sources {
    fn index_mut(&mut self, index: SourceIndex) -> &mut Source {
        &mut self.sources[index.get()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OriginOfChange;

    #[test]
    fn resizing_changes_iteration_not_allocation() {
        let mut sources = Sources::new();
        sources[SourceIndex::new(5)].set_x(0.5, OriginOfChange::None);

        sources.set_size(4).unwrap();
        assert_eq!(sources.iter().count(), 4);

        sources.set_size(6).unwrap();
        assert_eq!(sources[SourceIndex::new(5)].x(), 0.5);
    }

    #[test]
    fn rejects_unsupported_sizes() {
        let mut sources = Sources::new();
        assert!(matches!(sources.set_size(0), Err(SpatError::InvalidSourceCount(0))));
        assert!(matches!(sources.set_size(9), Err(SpatError::InvalidSourceCount(9))));
        assert_eq!(sources.size(), 2);
    }

    #[test]
    fn first_source_id_only_relabels() {
        let mut sources = Sources::new();
        sources.set_first_source_id(SourceId::new(11));
        assert_eq!(sources.primary().id(), SourceId::new(11));
        assert_eq!(sources[SourceIndex::new(3)].id(), SourceId::new(14));
        assert!(sources[SourceIndex::new(3)].index() == SourceIndex::new(3));
    }

    #[test]
    fn drains_pending_gui_updates_once() {
        let mut sources = Sources::new();
        sources.drain_gui_updates();
        sources[SourceIndex::new(1)].set_y(0.2, OriginOfChange::Link);

        assert_eq!(sources.drain_gui_updates(), vec![SourceIndex::new(1)]);
        assert!(sources.drain_gui_updates().is_empty());
    }
}
