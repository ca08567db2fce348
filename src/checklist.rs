//! # Checklist Categorization Interface
//!
//! Shapes consumed by the review UI and report rendering. A categorizer
//! groups an inspection's items into the ordered categories of a checklist
//! and reports what each category still needs. It reads repository data and
//! never mutates it.
//!
//! The grouping keys off `InspectionItem::tags`, which the background
//! upload fills in from the server's analysis of each photo.

use serde::{Deserialize, Serialize};

use crate::model::InspectionItem;

/// Tag marking a photo as an equipment datasheet rather than the
/// equipment itself
pub const DATASHEET_TAG: &str = "datasheet";

/// An ordered set of categories an inspection is reviewed against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistDefinition {
    /// Display name of the checklist
    pub name: String,
    /// Categories in review order
    pub categories: Vec<ChecklistCategory>,
}

/// One category of a checklist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistCategory {
    /// Stable identifier, referenced by reports
    pub id: String,
    /// Display title
    pub title: String,
    /// Tags that assign an item to this category
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Named pieces of equipment that must each be photographed
    #[serde(default)]
    pub specific_items: Vec<String>,
    /// Whether each specific item also needs a paired datasheet photo
    #[serde(default)]
    pub requires_datasheet: bool,
}

/// Which of a category's requirements the captured items satisfy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryCompletion {
    /// Requirements with at least one matching item
    pub fulfilled: Vec<String>,
    /// Requirements with no matching item yet
    pub missing: Vec<String>,
}

impl CategoryCompletion {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Item assignments and completion for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryAssignment {
    /// The category this assignment belongs to
    pub category_id: String,
    /// Ids of the items grouped under this category
    pub assigned_items: Vec<String>,
    /// Requirement breakdown
    pub completion: CategoryCompletion,
}

/// The full read-only grouping for an inspection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategorizedReport {
    /// One entry per checklist category, in checklist order
    pub categories: Vec<CategoryAssignment>,
    /// Ids of items no category claimed
    pub unassigned: Vec<String>,
}

/// Groups captured items against a checklist.
///
/// Implementations live with the review UI; the sync layer only promises
/// that `tags` on completed items is populated for them to key off.
pub trait Categorizer {
    fn categorize(
        &self,
        checklist: &ChecklistDefinition,
        items: &[InspectionItem],
    ) -> CategorizedReport;
}
