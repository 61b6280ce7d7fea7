//! Typed item taxonomy for credential checks.
//!
//! Item categories are assigned at item creation time; the checkpoint gate
//! matches on the typed category instead of inspecting display names.

use serde::{Deserialize, Serialize};

/// Disguise mask variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskKind {
    Police,
    Nurse,
    Zombie,
    Government,
}

/// Category of a holdable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Mask(MaskKind),
    Document,
    Weapon,
    Other,
}

/// Descriptor of an item as reported by the host inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub category: ItemCategory,
    /// Display name, presentation only.
    pub name: String,
}

impl ItemDescriptor {
    pub fn new(category: ItemCategory, name: impl Into<String>) -> Self {
        Self { category, name: name.into() }
    }
}
