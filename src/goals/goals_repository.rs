use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{Error, Result};
use crate::goals::goals_errors::GoalError;
use crate::goals::goals_model::Goal;
use crate::goals::goals_traits::GoalRepositoryTrait;

/// In-memory goal store. The reference implementation of
/// [`GoalRepositoryTrait`]; production deployments substitute a real
/// backend.
#[derive(Default)]
pub struct InMemoryGoalRepository {
    goals: RwLock<HashMap<String, Goal>>,
}

impl InMemoryGoalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GoalRepositoryTrait for InMemoryGoalRepository {
    fn load_goal(&self, goal_id: &str) -> Result<Goal> {
        let goals = self
            .goals
            .read()
            .map_err(|e| Error::Repository(e.to_string()))?;
        goals
            .get(goal_id)
            .cloned()
            .ok_or_else(|| GoalError::NotFound(goal_id.to_string()).into())
    }

    fn load_goals(&self) -> Result<Vec<Goal>> {
        let goals = self
            .goals
            .read()
            .map_err(|e| Error::Repository(e.to_string()))?;
        let mut all: Vec<Goal> = goals.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn save_goal(&self, goal: Goal) -> Result<Goal> {
        let mut goals = self
            .goals
            .write()
            .map_err(|e| Error::Repository(e.to_string()))?;
        goals.insert(goal.id.clone(), goal.clone());
        Ok(goal)
    }

    fn delete_goal(&self, goal_id: &str) -> Result<()> {
        let mut goals = self
            .goals
            .write()
            .map_err(|e| Error::Repository(e.to_string()))?;
        goals
            .remove(goal_id)
            .map(|_| ())
            .ok_or_else(|| GoalError::NotFound(goal_id.to_string()).into())
    }
}
