// 👥 Sequential Crew - one deterministic task per role, run before any decision
//
// The crew carries no decision content. Each role acknowledges its task in
// order; the pipeline only starts emitting once kickoff() has returned.

use crate::trace::Actor;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewTask {
    pub actor: Actor,
    pub description: String,
    pub expected_output: &'static str,
}

impl CrewTask {
    /// Local, offline acknowledgement for this task
    pub fn acknowledge(&self) -> &'static str {
        match self.actor {
            Actor::SpendAnalystAgent => "Spend analysis task acknowledged.",
            Actor::OptimizationAgent => "Optimization task acknowledged.",
            Actor::PolicyGuardAgent => "Policy evaluation task acknowledged.",
            Actor::RiskFeasibilityAgent => "Risk evaluation task acknowledged.",
            Actor::PlannerAgent => "Planning task acknowledged.",
        }
    }
}

/// Role goal, used in task descriptions
pub fn goal(actor: Actor) -> &'static str {
    match actor {
        Actor::SpendAnalystAgent => "prepares baseline and drivers",
        Actor::OptimizationAgent => "drafts three plans",
        Actor::PolicyGuardAgent => "checks constraints",
        Actor::RiskFeasibilityAgent => "checks risk",
        Actor::PlannerAgent => "selects final plan",
    }
}

fn expected_output(actor: Actor) -> &'static str {
    match actor {
        Actor::SpendAnalystAgent => "Spend analysis acknowledgment",
        Actor::OptimizationAgent => "Optimization acknowledgment",
        Actor::PolicyGuardAgent => "Policy acknowledgment",
        Actor::RiskFeasibilityAgent => "Risk acknowledgment",
        Actor::PlannerAgent => "Planner acknowledgment",
    }
}

#[derive(Debug, Clone)]
pub struct SequentialCrew {
    tasks: Vec<CrewTask>,
}

impl SequentialCrew {
    pub fn for_persona(persona: &str) -> Self {
        let tasks = Actor::ALL
            .iter()
            .map(|&actor| CrewTask {
                actor,
                description: format!("Persona {}: {} {}.", persona, actor, goal(actor)),
                expected_output: expected_output(actor),
            })
            .collect();

        Self { tasks }
    }

    pub fn tasks(&self) -> &[CrewTask] {
        &self.tasks
    }

    /// Run every task synchronously, in role order
    pub fn kickoff(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .map(|task| {
                let ack = task.acknowledge();
                debug!(actor = %task.actor, task = %task.description, "{}", ack);
                ack
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_follow_role_order() {
        let crew = SequentialCrew::for_persona("foodie");
        let actors: Vec<Actor> = crew.tasks().iter().map(|t| t.actor).collect();

        assert_eq!(actors, Actor::ALL.to_vec());
        assert_eq!(
            crew.tasks()[1].description,
            "Persona foodie: OptimizationAgent drafts three plans."
        );
    }

    #[test]
    fn test_kickoff_is_deterministic() {
        let crew = SequentialCrew::for_persona("movie_buff");
        let first = crew.kickoff();

        assert_eq!(first.len(), 5);
        assert_eq!(first[0], "Spend analysis task acknowledged.");
        assert_eq!(first, crew.kickoff());
    }
}
