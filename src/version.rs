//! Linked, monotonically numbered wizard versions.

use crate::clone::build_clone;
use crate::error::{EntityKind, Result, WizardError};
use crate::model::{LifecycleState, Wizard};
use crate::store::WizardStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Which wizards share a version number sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyPolicy {
    /// The whole tree reachable through `parent_wizard_id` links
    #[default]
    Lineage,
    /// The wizard and its direct children only
    Direct,
}

/// Resolve the version family of `source` within `all`.
///
/// The result always contains `source` itself and is free of duplicates,
/// even when parent links form a loop.
pub fn resolve_family<'w>(
    all: &'w [Wizard],
    source: &'w Wizard,
    policy: FamilyPolicy,
) -> Vec<&'w Wizard> {
    match policy {
        FamilyPolicy::Direct => std::iter::once(source)
            .chain(
                all.iter()
                    .filter(|w| w.parent_wizard_id == Some(source.id) && w.id != source.id),
            )
            .collect(),
        FamilyPolicy::Lineage => {
            let by_id: HashMap<Uuid, &Wizard> = all.iter().map(|w| (w.id, w)).collect();
            let mut children: HashMap<Uuid, Vec<&Wizard>> = HashMap::new();
            for w in all {
                if let Some(parent) = w.parent_wizard_id {
                    children.entry(parent).or_default().push(w);
                }
            }

            // Walk up to the root
            let mut root = source;
            let mut seen = HashSet::from([source.id]);
            while let Some(parent) = root.parent_wizard_id.and_then(|id| by_id.get(&id).copied()) {
                if !seen.insert(parent.id) {
                    break;
                }
                root = parent;
            }

            // Then collect every descendant of the root
            let mut family = vec![];
            let mut visited = HashSet::new();
            let mut queue = VecDeque::from([root]);
            while let Some(w) = queue.pop_front() {
                if !visited.insert(w.id) {
                    continue;
                }
                family.push(w);
                if let Some(kids) = children.get(&w.id) {
                    queue.extend(kids.iter().copied());
                }
            }
            if !visited.contains(&source.id) {
                family.push(source);
            }
            family
        }
    }
}

pub struct VersionManager<'a> {
    wizards: &'a dyn WizardStore,
    policy: FamilyPolicy,
}

impl<'a> VersionManager<'a> {
    pub fn new(wizards: &'a dyn WizardStore, policy: FamilyPolicy) -> Self {
        Self { wizards, policy }
    }

    fn load(&self, wizard_id: Uuid) -> Result<Wizard> {
        self.wizards
            .get(wizard_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, wizard_id))
    }

    /// Next free version number in the family of `wizard_id`
    pub fn next_version_number(&self, wizard_id: Uuid) -> Result<u32> {
        let source = self.load(wizard_id)?;
        let all = self.wizards.list()?;
        let max = resolve_family(&all, &source, self.policy)
            .iter()
            .map(|w| w.version_number)
            .max()
            .unwrap_or(source.version_number);
        max.checked_add(1).ok_or_else(|| {
            WizardError::Integrity(format!(
                "version numbers of wizard {wizard_id} are exhausted (highest is {max})"
            ))
        })
    }

    /// Create a new version of `wizard_id` as a linked, draft clone.
    ///
    /// The clone keeps the source's creator. Its name defaults to
    /// `"<source name> v<number>"`.
    pub fn create_version(&self, wizard_id: Uuid, new_name: Option<&str>) -> Result<Wizard> {
        let source = self.load(wizard_id)?;
        let number = self.next_version_number(wizard_id)?;
        let name = match new_name {
            Some(n) => n.to_string(),
            None => format!("{} v{}", source.name, number),
        };

        let mut version = build_clone(&source, &name, &source.created_by, None)?;
        version.parent_wizard_id = Some(source.id);
        version.version_number = number;
        version.lifecycle_state = LifecycleState::Draft;

        self.wizards.insert(&version)?;
        tracing::info!(
            source = %wizard_id,
            version = %version.id,
            number,
            "created wizard version"
        );
        Ok(version)
    }

    /// Every wizard linked to `wizard_id`, oldest version first
    pub fn lineage(&self, wizard_id: Uuid) -> Result<Vec<Wizard>> {
        let source = self.load(wizard_id)?;
        let all = self.wizards.list()?;
        let mut family: Vec<Wizard> = resolve_family(&all, &source, FamilyPolicy::Lineage)
            .into_iter()
            .cloned()
            .collect();
        family.sort_by(|a, b| {
            a.version_number
                .cmp(&b.version_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(family)
    }
}
