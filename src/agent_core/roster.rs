//! Rosters: the ordered set of agents taking part in one session.
//!
//! Workflow variants are data: an ordered list of roles, each backed by a
//! built-in contract unless the config overrides it. The default workflow is
//! the six-role vignette panel (coordinator, author, two reviewers, labeler,
//! presenter).

use std::collections::HashSet;

use crate::inference::config::RosterEntry;

use super::errors::EngineError;
use super::types::{Agent, AgentId, AgentRole, Capability};

// ─── Built-in Contracts ─────────────────────────────────────────────────────

const COORDINATOR_CONTRACT: &str = "\
You coordinate the creation and improvement of a USMLE Step 1 clinical vignette. \
Make sure the author drafts first, each reviewer contributes their expertise, \
the labeler classifies the item, and the presenter shows the improved version \
with every accepted suggestion incorporated.";

const GENERATOR_CONTRACT: &str = "\
You write and revise clinical vignettes for USMLE Step 1. Given a topic, draft a \
clinically accurate vignette with a stem, a lead-in question and five answer \
choices. Revise when reviewers give feedback. Format your output exactly as:\n\
{\n\
   'question': ['string'],\n\
   'correct_answer': ['string'],\n\
   'incorrect_answers': ['string'],\n\
   'rationales': ['string'],\n\
   'usmle_content_outline': ['string'],\n\
}";

const CHECKER_CONTENT_CONTRACT: &str = "\
You are a neurology expert reviewing a draft vignette. Evaluate the anatomical \
accuracy of the case, the correlation between symptoms and the proposed lesion \
location, the laterality of symptoms and lesion, and the exam findings. Give \
specific feedback on every inconsistency.";

const CHECKER_FORMAT_CONTRACT: &str = "\
You are an NBME item-writing standards expert. Check that the vignette follows \
NBME style guidelines, that distractors are plausible and educational, and that \
the question tests clinical reasoning rather than recall. Give specific feedback \
on every violation.";

const LABELER_CONTRACT: &str = "\
Classify the vignette according to the NBME content outline. Reply with the \
system, discipline and competency labels only.";

const PRESENTER_CONTRACT: &str = "\
Present the final revised vignette after all improvements have been made. Use \
the same structured format as the author, including the question and the \
correct answer.";

/// Built-in roster id for a role.
pub fn default_agent_id(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Coordinator => "Coordinator",
        AgentRole::Generator => "Vignette-Maker",
        AgentRole::CheckerContent => "Neuro-Evaluator",
        AgentRole::CheckerFormat => "Vignette-Evaluator",
        AgentRole::Labeler => "Vignette-Labeler",
        AgentRole::Presenter => "Show-Vignette",
    }
}

/// Built-in behavioural contract for a role.
pub fn default_contract(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Coordinator => COORDINATOR_CONTRACT,
        AgentRole::Generator => GENERATOR_CONTRACT,
        AgentRole::CheckerContent => CHECKER_CONTENT_CONTRACT,
        AgentRole::CheckerFormat => CHECKER_FORMAT_CONTRACT,
        AgentRole::Labeler => LABELER_CONTRACT,
        AgentRole::Presenter => PRESENTER_CONTRACT,
    }
}

/// Built-in agent for a role.
pub fn default_agent(role: AgentRole) -> Agent {
    let capability = match role {
        AgentRole::Labeler => Capability::Classifier,
        _ => Capability::Responder,
    };
    Agent::new(default_agent_id(role), role, default_contract(role)).with_capability(capability)
}

// ─── Roster ─────────────────────────────────────────────────────────────────

/// Ordered set of agents with unique ids and unique roles.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    agents: Vec<Agent>,
}

impl Roster {
    /// Validate and build a roster.
    pub fn new(agents: Vec<Agent>) -> Result<Self, EngineError> {
        if agents.is_empty() {
            return Err(EngineError::configuration("roster is empty"));
        }

        let mut ids = HashSet::new();
        let mut roles = HashSet::new();
        for agent in &agents {
            if agent.id.as_str().trim().is_empty() {
                return Err(EngineError::configuration("agent id is empty"));
            }
            if !ids.insert(agent.id.clone()) {
                return Err(EngineError::configuration(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
            if !roles.insert(agent.role) {
                return Err(EngineError::configuration(format!(
                    "duplicate role '{}'",
                    agent.role.as_str()
                )));
            }
        }

        Ok(Self { agents })
    }

    /// Build a roster of built-in agents in the given role order.
    pub fn from_roles(roles: &[AgentRole]) -> Result<Self, EngineError> {
        Self::new(roles.iter().copied().map(default_agent).collect())
    }

    /// Build a roster from config entries, filling gaps from the built-ins.
    pub fn from_entries(entries: &[RosterEntry]) -> Result<Self, EngineError> {
        let agents = entries
            .iter()
            .map(|entry| {
                let mut agent = default_agent(entry.role);
                if let Some(id) = &entry.id {
                    agent.id = AgentId::new(id.clone());
                }
                if let Some(prompt) = &entry.prompt {
                    agent.prompt_contract = prompt.clone();
                }
                agent.model = entry.model.clone();
                agent
            })
            .collect();
        Self::new(agents)
    }

    /// The full vignette panel.
    pub fn usmle_vignette() -> Self {
        Self {
            agents: [
                AgentRole::Coordinator,
                AgentRole::Generator,
                AgentRole::CheckerContent,
                AgentRole::CheckerFormat,
                AgentRole::Labeler,
                AgentRole::Presenter,
            ]
            .into_iter()
            .map(default_agent)
            .collect(),
        }
    }

    /// Skip validation. Lets engine tests build rosters that break the
    /// selector's assumptions.
    #[cfg(test)]
    pub(crate) fn unchecked(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| &a.id == id)
    }

    pub fn position(&self, id: &AgentId) -> Option<usize> {
        self.agents.iter().position(|a| &a.id == id)
    }

    pub fn by_role(&self, role: AgentRole) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role == role)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.position(id).is_some()
    }

    /// Opening message for a topic, naming each participant's part in order.
    pub fn framing(&self, topic: &str) -> String {
        let mut lines = vec![format!(
            "Let's create a USMLE Step 1 clinical vignette about {topic}. \
             Each agent will contribute their expertise:"
        )];
        let mut step = 1;
        for agent in &self.agents {
            let part = match agent.role {
                AgentRole::Coordinator => continue,
                AgentRole::Generator => "start by creating an initial draft",
                AgentRole::CheckerContent => "check domain accuracy",
                AgentRole::CheckerFormat => "assess item-writing standards",
                AgentRole::Labeler => "classify the content",
                AgentRole::Presenter => "present the final improved version",
            };
            lines.push(format!("{step}. {}: {part}", agent.id));
            step += 1;
        }
        if let Some(author) = self.by_role(AgentRole::Generator) {
            lines.push(format!(
                "{}, please begin by creating a vignette about this topic.",
                author.id
            ));
        }
        lines.join("\n")
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
