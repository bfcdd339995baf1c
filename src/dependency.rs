//! Option dependency edges.
//!
//! An edge `option_id -> depends_on_option_id` says that the visibility or
//! requirement of one option hinges on another. Edges are stored on the
//! owning option and must stay inside one wizard. The edge set of a wizard
//! is kept acyclic.

use crate::error::{EntityKind, Result, WizardError};
use crate::model::{DependencyType, OptionDependency, Wizard};
use crate::store::WizardStore;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

/// Parse a dependency type name, accepting only the four known kinds.
pub fn parse_dependency_type(s: &str) -> Result<DependencyType> {
    DependencyType::from_str(s).map_err(|_| WizardError::InvalidDependencyType(s.to_string()))
}

/// Outgoing adjacency of the dependency graph of one wizard
pub fn adjacency(wizard: &Wizard) -> HashMap<Uuid, Vec<Uuid>> {
    let mut adj: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for dep in wizard.iter_dependencies() {
        adj.entry(dep.option_id)
            .or_default()
            .push(dep.depends_on_option_id);
    }
    adj
}

/// Depth-first search for a path `start -> ... -> target`.
pub fn find_path(adj: &HashMap<Uuid, Vec<Uuid>>, start: Uuid, target: Uuid) -> Option<Vec<Uuid>> {
    let mut stack = vec![start];
    let mut visited = HashSet::new();
    let mut parent: HashMap<Uuid, Uuid> = HashMap::new();

    while let Some(node) = stack.pop() {
        if node == target {
            let mut path = vec![target];
            let mut cur = target;
            while cur != start {
                cur = *parent.get(&cur)?;
                path.push(cur);
            }
            path.reverse();
            return Some(path);
        }
        if !visited.insert(node) {
            continue;
        }
        for &next in adj.get(&node).into_iter().flatten() {
            if !visited.contains(&next) {
                parent.entry(next).or_insert(node);
                stack.push(next);
            }
        }
    }
    None
}

/// Every distinct cycle in a wizard's dependency graph, each as a closed
/// path `a -> ... -> a`.
pub fn cycles(wizard: &Wizard) -> Vec<Vec<Uuid>> {
    let adj = adjacency(wizard);
    let mut seen: HashSet<BTreeSet<Uuid>> = HashSet::new();
    let mut found = vec![];
    for dep in wizard.iter_dependencies() {
        if dep.option_id == dep.depends_on_option_id {
            if seen.insert(BTreeSet::from([dep.option_id])) {
                found.push(vec![dep.option_id, dep.option_id]);
            }
            continue;
        }
        if let Some(back) = find_path(&adj, dep.depends_on_option_id, dep.option_id) {
            let mut cycle = vec![dep.option_id];
            cycle.extend(back);
            if seen.insert(cycle.iter().copied().collect()) {
                found.push(cycle);
            }
        }
    }
    found
}

pub struct DependencyGraph<'a> {
    wizards: &'a dyn WizardStore,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(wizards: &'a dyn WizardStore) -> Self {
        Self { wizards }
    }

    /// Add an edge `option_id -> depends_on_option_id`.
    ///
    /// Both options must exist in the same wizard, and the edge must not
    /// duplicate an existing one or close a cycle. Nothing is written unless
    /// every check passes.
    pub fn create_dependency(
        &self,
        option_id: Uuid,
        depends_on_option_id: Uuid,
        dependency_type: DependencyType,
    ) -> Result<OptionDependency> {
        let (mut wizard, _) = self
            .wizards
            .find_option(option_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Option, option_id))?;
        let (target_wizard, _) = self
            .wizards
            .find_option(depends_on_option_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Option, depends_on_option_id))?;

        if option_id == depends_on_option_id {
            return Err(WizardError::SelfDependency(option_id));
        }
        if wizard.id != target_wizard.id {
            return Err(WizardError::CrossWizardDependency {
                option_id,
                depends_on: depends_on_option_id,
            });
        }
        if wizard.iter_dependencies().any(|d| {
            d.option_id == option_id
                && d.depends_on_option_id == depends_on_option_id
                && d.dependency_type == dependency_type
        }) {
            return Err(WizardError::DuplicateDependency {
                option_id,
                depends_on: depends_on_option_id,
            });
        }
        if let Some(back) = find_path(&adjacency(&wizard), depends_on_option_id, option_id) {
            let mut path = vec![option_id];
            path.extend(back);
            return Err(WizardError::DependencyCycle { path });
        }

        let dep = OptionDependency {
            id: Uuid::new_v4(),
            option_id,
            depends_on_option_id,
            dependency_type,
            created_at: Utc::now(),
        };
        let owner = wizard
            .option_mut(option_id)
            .ok_or_else(|| WizardError::not_found(EntityKind::Option, option_id))?;
        owner.dependencies.push(dep.clone());
        owner.updated_at = Utc::now();
        wizard.updated_at = Utc::now();
        self.wizards.update(&wizard)?;

        tracing::info!(
            wizard = %wizard.id,
            option = %option_id,
            depends_on = %depends_on_option_id,
            kind = dependency_type.as_ref(),
            "added option dependency"
        );
        Ok(dep)
    }

    /// Outgoing edges of an option, in creation order.
    pub fn dependencies_of(&self, option_id: Uuid) -> Result<Vec<OptionDependency>> {
        let (wizard, _) = self
            .wizards
            .find_option(option_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Option, option_id))?;
        Ok(wizard
            .option(option_id)
            .map(|o| o.dependencies.clone())
            .unwrap_or_default())
    }

    pub fn delete_dependency(&self, dependency_id: Uuid) -> Result<OptionDependency> {
        let (mut wizard, dep) = self
            .wizards
            .find_dependency(dependency_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Dependency, dependency_id))?;
        if let Some(owner) = wizard.option_mut(dep.option_id) {
            owner.dependencies.retain(|d| d.id != dependency_id);
            owner.updated_at = Utc::now();
        }
        wizard.updated_at = Utc::now();
        self.wizards.update(&wizard)?;
        tracing::info!(wizard = %wizard.id, dependency = %dependency_id, "removed option dependency");
        Ok(dep)
    }
}
