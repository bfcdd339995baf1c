//! Step-to-step routing rules.
//!
//! Rules are stored and validated here; picking the rule that fires for a
//! given set of answers is left to the client player, which walks
//! [`FlowGraph::rules_of`] from highest to lowest priority.

use crate::condition::Condition;
use crate::error::{EntityKind, Result, WizardError};
use crate::model::{FlowRule, Wizard};
use crate::store::WizardStore;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Input for a new flow rule
#[derive(Debug, Clone)]
pub struct NewFlowRule {
    pub from_step_id: Uuid,
    pub to_step_id: Uuid,
    pub condition: Value,
    pub priority: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl NewFlowRule {
    pub fn new(from_step_id: Uuid, to_step_id: Uuid, condition: Value, priority: i32) -> Self {
        Self {
            from_step_id,
            to_step_id,
            condition,
            priority,
            name: None,
            description: None,
            is_active: true,
        }
    }
}

/// Partial update of a flow rule; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct FlowRulePatch {
    pub from_step_id: Option<Uuid>,
    pub to_step_id: Option<Uuid>,
    pub condition: Option<Value>,
    pub priority: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Sort rules highest priority first, keeping creation order among equals.
pub fn by_priority(rules: &[FlowRule]) -> Vec<FlowRule> {
    let mut sorted = rules.to_vec();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    sorted
}

pub struct FlowGraph<'a> {
    wizards: &'a dyn WizardStore,
}

impl<'a> FlowGraph<'a> {
    pub fn new(wizards: &'a dyn WizardStore) -> Self {
        Self { wizards }
    }

    fn load(&self, wizard_id: Uuid) -> Result<Wizard> {
        self.wizards
            .get(wizard_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, wizard_id))
    }

    fn find(&self, rule_id: Uuid) -> Result<(Wizard, FlowRule)> {
        self.wizards
            .find_flow_rule(rule_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::FlowRule, rule_id))
    }

    fn require_step(&self, wizard: &Wizard, step_id: Uuid) -> Result<()> {
        if wizard.step(step_id).is_some() {
            return Ok(());
        }
        match self.wizards.find_step(step_id)? {
            Some(_) => Err(WizardError::StepNotInWizard {
                step_id,
                wizard_id: wizard.id,
            }),
            None => Err(WizardError::not_found(EntityKind::Step, step_id)),
        }
    }

    fn validate(&self, wizard: &Wizard, from: Uuid, to: Uuid, condition: &Value) -> Result<()> {
        self.require_step(wizard, from)?;
        self.require_step(wizard, to)?;
        if from == to {
            return Err(WizardError::FlowSelfLoop(from));
        }
        Condition::parse_for(condition, wizard).map_err(WizardError::InvalidCondition)?;
        Ok(())
    }

    pub fn create_flow_rule(&self, wizard_id: Uuid, input: NewFlowRule) -> Result<FlowRule> {
        let mut wizard = self.load(wizard_id)?;
        self.validate(&wizard, input.from_step_id, input.to_step_id, &input.condition)?;

        let now = Utc::now();
        let rule = FlowRule {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            from_step_id: input.from_step_id,
            to_step_id: input.to_step_id,
            condition: input.condition,
            priority: input.priority,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        wizard.flow_rules.push(rule.clone());
        wizard.updated_at = now;
        self.wizards.update(&wizard)?;
        tracing::info!(wizard = %wizard_id, rule = %rule.id, priority = rule.priority, "added flow rule");
        Ok(rule)
    }

    /// Rules of a wizard, highest priority first.
    pub fn rules_of(&self, wizard_id: Uuid) -> Result<Vec<FlowRule>> {
        Ok(by_priority(&self.load(wizard_id)?.flow_rules))
    }

    pub fn get_rule(&self, rule_id: Uuid) -> Result<FlowRule> {
        Ok(self.find(rule_id)?.1)
    }

    /// Apply a patch and re-validate the resulting rule as a whole.
    pub fn update_flow_rule(&self, rule_id: Uuid, patch: FlowRulePatch) -> Result<FlowRule> {
        let (mut wizard, mut rule) = self.find(rule_id)?;
        if let Some(from) = patch.from_step_id {
            rule.from_step_id = from;
        }
        if let Some(to) = patch.to_step_id {
            rule.to_step_id = to;
        }
        if let Some(condition) = patch.condition {
            rule.condition = condition;
        }
        if let Some(priority) = patch.priority {
            rule.priority = priority;
        }
        if let Some(name) = patch.name {
            rule.name = Some(name);
        }
        if let Some(description) = patch.description {
            rule.description = Some(description);
        }
        if let Some(active) = patch.is_active {
            rule.is_active = active;
        }
        self.validate(&wizard, rule.from_step_id, rule.to_step_id, &rule.condition)?;

        let now = Utc::now();
        rule.updated_at = now;
        if let Some(slot) = wizard.flow_rules.iter_mut().find(|r| r.id == rule_id) {
            *slot = rule.clone();
        }
        wizard.updated_at = now;
        self.wizards.update(&wizard)?;
        Ok(rule)
    }

    pub fn delete_flow_rule(&self, rule_id: Uuid) -> Result<FlowRule> {
        let (mut wizard, rule) = self.find(rule_id)?;
        wizard.flow_rules.retain(|r| r.id != rule_id);
        wizard.updated_at = Utc::now();
        self.wizards.update(&wizard)?;
        tracing::info!(wizard = %wizard.id, rule = %rule_id, "removed flow rule");
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(priority: i32, name: &str) -> FlowRule {
        serde_json::from_value(json!({
            "name": name,
            "from_step_id": Uuid::nil(),
            "to_step_id": Uuid::nil(),
            "condition": {},
            "priority": priority
        }))
        .expect("test rule should parse")
    }

    #[test]
    fn test_by_priority_is_descending_and_stable() {
        let rules = vec![rule(1, "a"), rule(5, "b"), rule(1, "c"), rule(5, "d")];
        let names: Vec<_> = by_priority(&rules)
            .into_iter()
            .filter_map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }
}
