//! Tunables for the spatial item index.

use serde::Deserialize;

use crate::error::IndexError;

/// Spatial index configuration.
///
/// Deserialized from the `index` section of the engine config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexConfig {
    /// Edge length of one grid cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    /// Hard cap on tracked items per zone; further adds are dropped.
    #[serde(default = "default_max_items_per_zone")]
    pub max_items_per_zone: usize,

    /// Items examined per rebuild step (one step per cache miss).
    #[serde(default = "default_rebuild_chunk")]
    pub rebuild_chunk: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            max_items_per_zone: default_max_items_per_zone(),
            rebuild_chunk: default_rebuild_chunk(),
        }
    }
}

impl IndexConfig {
    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] for a non-finite or
    /// non-positive cell size, a zero item cap, or a zero rebuild chunk.
    pub fn validate(&self) -> Result<(), IndexError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(IndexError::InvalidConfig {
                reason: format!("cell_size must be positive, got {}", self.cell_size),
            });
        }
        if self.max_items_per_zone == 0 {
            return Err(IndexError::InvalidConfig {
                reason: "max_items_per_zone must be at least 1".to_owned(),
            });
        }
        if self.rebuild_chunk == 0 {
            return Err(IndexError::InvalidConfig {
                reason: "rebuild_chunk must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

const fn default_cell_size() -> f32 {
    20.0
}

const fn default_max_items_per_zone() -> usize {
    1500
}

const fn default_rebuild_chunk() -> usize {
    250
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(IndexConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_cell_size() {
        let config = IndexConfig {
            cell_size: 0.0,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IndexConfig {
            cell_size: f32::NAN,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_chunk() {
        let config = IndexConfig {
            rebuild_chunk: 0,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
