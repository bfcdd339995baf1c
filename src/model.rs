//! Data models for wizard definitions and the runs that protect them.
//!
//! A [`Wizard`] is stored as one aggregate: it owns its steps, their option
//! sets and options, the option dependency edges, and its flow rules.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

fn new_id() -> Uuid {
    Uuid::new_v4()
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    1
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_layout() -> String {
    "vertical".to_string()
}

fn default_auto_save_interval() -> u32 {
    30
}

fn default_step_increment() -> f64 {
    1.0
}

// =============================================================================
// Enumerations
// =============================================================================

/// Protection classification derived from a wizard's runs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, AsRefStr, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Draft,
    InUse,
    Published,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Option dependency edge kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DependencyType {
    ShowIf,
    HideIf,
    RequireIf,
    DisableIf,
}

/// Input kind of an option set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionType {
    SingleSelect,
    MultipleSelect,
    TextInput,
    NumberInput,
    DateInput,
    TimeInput,
    DatetimeInput,
    FileUpload,
    Rating,
    Slider,
    ColorPicker,
    RichText,
}

impl SelectionType {
    /// Choice kinds answer with one or more declared option values
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultipleSelect)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::NumberInput | Self::Slider | Self::Rating)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::DateInput | Self::TimeInput | Self::DatetimeInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

/// Run status as reported by the run subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    #[default]
    InProgress,
    Completed,
    Abandoned,
}

// =============================================================================
// Wizard aggregate
// =============================================================================

/// Presentation and behaviour settings, copied verbatim by clones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default = "default_true")]
    pub allow_templates: bool,
    #[serde(default = "default_true")]
    pub require_login: bool,
    #[serde(default)]
    pub allow_anonymous: bool,
    #[serde(default = "default_true")]
    pub auto_save: bool,
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: u32,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            category_id: None,
            icon: None,
            cover_image: None,
            allow_templates: true,
            require_login: true,
            allow_anonymous: false,
            auto_save: true,
            auto_save_interval: default_auto_save_interval(),
            estimated_time: None,
            difficulty_level: None,
            tags: vec![],
        }
    }
}

/// Wizard definition (wizards/<id>.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wizard {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(flatten)]
    pub settings: WizardSettings,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow_rules: Vec<FlowRule>,

    // Lifecycle protection
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_wizard_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_stored_run_at: Option<DateTime<Utc>>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency token, bumped by the store on every update
    #[serde(default)]
    pub revision: u64,
}

/// One ordered stage of a wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub step_order: i32,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub is_skippable: bool,
    #[serde(default = "default_true")]
    pub allow_back_navigation: bool,
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default = "empty_object")]
    pub custom_styles: Value,
    #[serde(default = "empty_object")]
    pub validation_rules: Value,
    #[serde(default)]
    pub option_sets: Vec<OptionSet>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// One input field within a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub selection_type: SelectionType,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub min_selections: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_pattern: Option<String>,
    #[serde(default = "empty_object")]
    pub custom_validation: Value,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default = "default_step_increment")]
    pub step_increment: f64,
    #[serde(default)]
    pub options: Vec<WizardOption>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// One selectable value within an option set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardOption {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_recommended: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    /// Outgoing edges: this option depends on other options
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<OptionDependency>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Directed edge `option_id -> depends_on_option_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDependency {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub option_id: Uuid,
    pub depends_on_option_id: Uuid,
    pub dependency_type: DependencyType,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Directed routing edge `from_step_id -> to_step_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRule {
    #[serde(default = "new_id")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub from_step_id: Uuid,
    pub to_step_id: Uuid,
    pub condition: Value,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// One end-user execution of a wizard (owned by the run subsystem)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardRun {
    #[serde(default = "new_id")]
    pub id: Uuid,
    pub wizard_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub is_stored: bool,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WizardRun {
    /// A fresh in-progress run started now
    pub fn start(wizard_id: Uuid, run_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            wizard_id,
            run_name,
            status: RunStatus::InProgress,
            is_stored: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

// =============================================================================
// Aggregate navigation
// =============================================================================

/// Where an option lives inside its wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionLocation {
    pub wizard_id: Uuid,
    pub step_id: Uuid,
    pub option_set_id: Uuid,
}

/// Node and edge counts of a wizard aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StructureCounts {
    pub steps: usize,
    pub option_sets: usize,
    pub options: usize,
    pub dependencies: usize,
    pub flow_rules: usize,
}

impl fmt::Display for StructureCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps, {} option sets, {} options, {} dependencies, {} flow rules",
            self.steps, self.option_sets, self.options, self.dependencies, self.flow_rules
        )
    }
}

impl Wizard {
    /// Iterate over all option sets with their owning step
    pub fn iter_option_sets(&self) -> impl Iterator<Item = (&Step, &OptionSet)> {
        self.steps
            .iter()
            .flat_map(|step| step.option_sets.iter().map(move |set| (step, set)))
    }

    /// Iterate over all options with their owning step and option set
    pub fn iter_options(&self) -> impl Iterator<Item = (&Step, &OptionSet, &WizardOption)> {
        self.iter_option_sets()
            .flat_map(|(step, set)| set.options.iter().map(move |opt| (step, set, opt)))
    }

    /// Iterate over every dependency edge in the aggregate
    pub fn iter_dependencies(&self) -> impl Iterator<Item = &OptionDependency> {
        self.iter_options()
            .flat_map(|(_, _, opt)| opt.dependencies.iter())
    }

    pub fn step(&self, step_id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn option_set(&self, option_set_id: Uuid) -> Option<&OptionSet> {
        self.iter_option_sets()
            .map(|(_, set)| set)
            .find(|set| set.id == option_set_id)
    }

    pub fn option(&self, option_id: Uuid) -> Option<&WizardOption> {
        self.iter_options()
            .map(|(_, _, opt)| opt)
            .find(|opt| opt.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: Uuid) -> Option<&mut WizardOption> {
        self.steps
            .iter_mut()
            .flat_map(|step| step.option_sets.iter_mut())
            .flat_map(|set| set.options.iter_mut())
            .find(|opt| opt.id == option_id)
    }

    /// Locate an option within this wizard
    pub fn locate_option(&self, option_id: Uuid) -> Option<OptionLocation> {
        self.iter_options()
            .find(|(_, _, opt)| opt.id == option_id)
            .map(|(step, set, _)| OptionLocation {
                wizard_id: self.id,
                step_id: step.id,
                option_set_id: set.id,
            })
    }

    pub fn flow_rule(&self, rule_id: Uuid) -> Option<&FlowRule> {
        self.flow_rules.iter().find(|r| r.id == rule_id)
    }

    pub fn counts(&self) -> StructureCounts {
        StructureCounts {
            steps: self.steps.len(),
            option_sets: self.iter_option_sets().count(),
            options: self.iter_options().count(),
            dependencies: self.iter_dependencies().count(),
            flow_rules: self.flow_rules.len(),
        }
    }

    /// Steps in traversal order
    pub fn ordered_steps(&self) -> Vec<&Step> {
        let mut steps: Vec<_> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.step_order);
        steps
    }
}

impl Step {
    /// Option sets in display order
    pub fn ordered_option_sets(&self) -> Vec<&OptionSet> {
        let mut sets: Vec<_> = self.option_sets.iter().collect();
        sets.sort_by_key(|s| s.display_order);
        sets
    }
}

impl OptionSet {
    /// Options in display order
    pub fn ordered_options(&self) -> Vec<&WizardOption> {
        let mut options: Vec<_> = self.options.iter().collect();
        options.sort_by_key(|o| o.display_order);
        options
    }
}
