use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::{BoxStr, SensorId};

/// Sensor ids whose position was confirmed by changing one tire at a time.
const CALIBRATED_LOCATIONS: [(SensorId, &str); 5] = [
    (0, "Front Left (FL)"),
    (1, "Front Right (FR)"),
    (5, "Internal/Reference (receiver)"),
    (16, "Rear Left (RL)"),
    (17, "Rear Right (RR)"),
];

/// Maps sensor ids to physical location labels.
///
/// The registry is built once and shared read-only. Lookups never fail:
/// ids without an entry get a synthesized `Unknown Sensor N` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRegistry {
    locations: BTreeMap<SensorId, BoxStr>,
}

impl SensorRegistry {
    pub fn empty() -> Self {
        Self {
            locations: BTreeMap::new(),
        }
    }

    /// Registry holding the calibrated wheel and receiver positions.
    pub fn calibrated() -> Self {
        Self::empty().extend_from(
            CALIBRATED_LOCATIONS
                .iter()
                .map(|(id, label)| (*id, (*label).into())),
        )
    }

    /// Adds or replaces the label for `id`.
    pub fn with_location(mut self, id: SensorId, label: impl Into<BoxStr>) -> Self {
        self.locations.insert(id, label.into());
        self
    }

    /// Overlays every entry from `entries`; later entries win.
    pub fn extend_from(mut self, entries: impl IntoIterator<Item = (SensorId, BoxStr)>) -> Self {
        self.extend(entries);
        self
    }

    pub fn location(&self, id: SensorId) -> Cow<'_, str> {
        match self.locations.get(&id) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(format!("Unknown Sensor {id}")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &str)> + '_ {
        self.locations.iter().map(|(id, label)| (*id, label.as_ref()))
    }
}

impl Extend<(SensorId, BoxStr)> for SensorRegistry {
    fn extend<T: IntoIterator<Item = (SensorId, BoxStr)>>(&mut self, iter: T) {
        self.locations.extend(iter);
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::calibrated()
    }
}
