use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AnnotateError;

/// Fixed ordered palette; its length bounds the number of classes.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Maximum number of registered classes, one per palette slot.
pub const MAX_CLASSES: usize = PALETTE.len();

/// Display name and color for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub color: String,
}

/// Mapping from class id to display name and color.
///
/// Lookups never fail: annotations can transiently reference a class that was
/// renumbered away, so `lookup` returns an "Unknown" placeholder for
/// unregistered ids instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRegistry {
    classes: BTreeMap<u32, ClassInfo>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Create a registry holding the single default class 0.
    pub fn new() -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(
            0,
            ClassInfo {
                name: "Class 0".to_string(),
                color: PALETTE[0].to_string(),
            },
        );
        Self { classes }
    }

    /// Register a new class under `id`, colored by palette slot `id`.
    pub fn add_class(&mut self, id: u32, name: &str) -> Result<(), AnnotateError> {
        if self.classes.contains_key(&id) {
            return Err(AnnotateError::DuplicateClass(id));
        }
        if id as usize >= MAX_CLASSES {
            return Err(AnnotateError::CapacityExceeded(id));
        }
        debug!("Registering class {}: {}", id, name);
        self.classes.insert(
            id,
            ClassInfo {
                name: name.to_string(),
                color: PALETTE[id as usize].to_string(),
            },
        );
        Ok(())
    }

    /// Rename a class and/or move it to a new id, keeping its color.
    ///
    /// The registry does not touch annotations; remapping stored
    /// `class_id` references is the caller's job (`Session::edit_class`
    /// cascades).
    pub fn rename_or_renumber(
        &mut self,
        old_id: u32,
        new_id: u32,
        new_name: &str,
    ) -> Result<(), AnnotateError> {
        if !self.classes.contains_key(&old_id) {
            return Err(AnnotateError::UnknownClass(old_id));
        }
        if new_id != old_id {
            if self.classes.contains_key(&new_id) {
                return Err(AnnotateError::DuplicateClass(new_id));
            }
            if new_id as usize >= MAX_CLASSES {
                return Err(AnnotateError::CapacityExceeded(new_id));
            }
        }
        let Some(old) = self.classes.remove(&old_id) else {
            return Err(AnnotateError::UnknownClass(old_id));
        };
        self.classes.insert(
            new_id,
            ClassInfo {
                name: new_name.to_string(),
                color: old.color,
            },
        );
        Ok(())
    }

    /// Name and color for `id`; a white "Unknown" record for stale ids.
    pub fn lookup(&self, id: u32) -> ClassInfo {
        self.classes.get(&id).cloned().unwrap_or(ClassInfo {
            name: "Unknown".to_string(),
            color: "#ffffff".to_string(),
        })
    }

    pub fn contains(&self, id: u32) -> bool {
        self.classes.contains_key(&id)
    }

    /// Registered ids in ascending order.
    pub fn list_ids(&self) -> Vec<u32> {
        self.classes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
