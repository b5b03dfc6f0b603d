use crate::errors::Result;
use crate::goals::goals_model::{Goal, NewGoal};
use crate::money::MoneyValue;
use crate::portfolio::Position;
use crate::rebalancing::{RebalanceResult, StrategyConfig, TradingConstraints};

/// Trait for goal persistence. The engine only ever consumes snapshots;
/// storage backends implement this to plug in.
pub trait GoalRepositoryTrait: Send + Sync {
    fn load_goal(&self, goal_id: &str) -> Result<Goal>;
    fn load_goals(&self) -> Result<Vec<Goal>>;
    fn save_goal(&self, goal: Goal) -> Result<Goal>;
    fn delete_goal(&self, goal_id: &str) -> Result<()>;
}

/// Trait for goal service operations.
pub trait GoalServiceTrait: Send + Sync {
    fn create_goal(&self, new_goal: NewGoal) -> Result<Goal>;
    fn get_goal(&self, goal_id: &str) -> Result<Goal>;
    fn list_goals(&self) -> Result<Vec<Goal>>;
    fn update_goal(&self, goal: Goal) -> Result<Goal>;
    fn delete_goal(&self, goal_id: &str) -> Result<()>;

    /// Adds or replaces a position in the goal's portfolio.
    fn add_position_to_goal(&self, goal_id: &str, position: Position) -> Result<Goal>;

    /// Deposits cash into the goal.
    fn deposit(&self, goal_id: &str, amount: MoneyValue) -> Result<Goal>;

    /// Withdraws cash from the goal, bounded by the available balance.
    fn withdraw(&self, goal_id: &str, amount: MoneyValue) -> Result<Goal>;

    /// Whether the goal's target allocations sum to at most 1.
    fn validate_allocations(&self, goal_id: &str) -> Result<bool>;

    /// Runs the rebalancing engine on the goal's portfolio. When no
    /// constraints are passed, the goal's risk profile picks the preset.
    fn rebalance_goal(
        &self,
        goal_id: &str,
        config: &StrategyConfig,
        constraints: Option<TradingConstraints>,
    ) -> Result<RebalanceResult>;
}
