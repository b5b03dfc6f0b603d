use std::sync::Arc;

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::errors::Result;
use crate::goals::goals_errors::GoalError;
use crate::goals::goals_model::{Goal, NewGoal};
use crate::goals::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::money::MoneyValue;
use crate::portfolio::{Portfolio, Position};
use crate::rebalancing::{rebalance, RebalanceResult, StrategyConfig, TradingConstraints};

pub struct GoalService<R: GoalRepositoryTrait> {
    goal_repo: Arc<R>,
}

impl<R: GoalRepositoryTrait> GoalService<R> {
    pub fn new(goal_repo: Arc<R>) -> Self {
        GoalService { goal_repo }
    }

    fn short_id(prefix: &str) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}_{}", prefix, &hex[..8])
    }
}

impl<R: GoalRepositoryTrait> GoalServiceTrait for GoalService<R> {
    fn create_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        new_goal.validate()?;
        let portfolio = Portfolio::new(&Self::short_id("port"), new_goal.initial_cash)?;
        let goal = Goal {
            id: Self::short_id("goal"),
            name: new_goal.name,
            goal_type: new_goal.goal_type,
            risk_profile: new_goal.risk_profile,
            portfolio,
            target_amount: new_goal.target_amount,
            target_date: new_goal.target_date,
            created_at: Utc::now(),
        };
        debug!("Creating goal '{}' ({})", goal.name, goal.id);
        self.goal_repo.save_goal(goal)
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.goal_repo.load_goal(goal_id)
    }

    fn list_goals(&self) -> Result<Vec<Goal>> {
        self.goal_repo.load_goals()
    }

    fn update_goal(&self, goal: Goal) -> Result<Goal> {
        goal.validate()?;
        // Make sure the goal exists before overwriting it.
        self.goal_repo.load_goal(&goal.id)?;
        self.goal_repo.save_goal(goal)
    }

    fn delete_goal(&self, goal_id: &str) -> Result<()> {
        self.goal_repo.delete_goal(goal_id)
    }

    fn add_position_to_goal(&self, goal_id: &str, position: Position) -> Result<Goal> {
        let mut goal = self.goal_repo.load_goal(goal_id)?;
        goal.portfolio.add_position(position)?;
        goal.validate()?;
        self.goal_repo.save_goal(goal)
    }

    fn deposit(&self, goal_id: &str, amount: MoneyValue) -> Result<Goal> {
        if amount <= MoneyValue::ZERO {
            return Err(GoalError::InvalidAmount(amount).into());
        }
        let mut goal = self.goal_repo.load_goal(goal_id)?;
        goal.portfolio.cash += amount;
        self.goal_repo.save_goal(goal)
    }

    fn withdraw(&self, goal_id: &str, amount: MoneyValue) -> Result<Goal> {
        if amount <= MoneyValue::ZERO {
            return Err(GoalError::InvalidAmount(amount).into());
        }
        let mut goal = self.goal_repo.load_goal(goal_id)?;
        if goal.portfolio.cash < amount {
            return Err(GoalError::InsufficientCash {
                available: goal.portfolio.cash,
                requested: amount,
            }
            .into());
        }
        goal.portfolio.cash -= amount;
        self.goal_repo.save_goal(goal)
    }

    fn validate_allocations(&self, goal_id: &str) -> Result<bool> {
        let goal = self.goal_repo.load_goal(goal_id)?;
        Ok(goal.portfolio.target_invested_fraction() <= rust_decimal::Decimal::ONE)
    }

    fn rebalance_goal(
        &self,
        goal_id: &str,
        config: &StrategyConfig,
        constraints: Option<TradingConstraints>,
    ) -> Result<RebalanceResult> {
        let goal = self.goal_repo.load_goal(goal_id)?;
        let constraints = constraints.unwrap_or_else(|| goal.risk_profile.constraints());
        debug!(
            "Rebalancing goal '{}' with {:?} profile defaults",
            goal.id, goal.risk_profile
        );
        rebalance(&goal.portfolio, config, &constraints)
    }
}
