//! Goals module - the user-facing investment goal, its repository contract,
//! and the service coordinating goals with the rebalancing engine.

mod goals_errors;
mod goals_model;
mod goals_repository;
mod goals_service;
mod goals_traits;

pub use goals_errors::GoalError;
pub use goals_model::{Goal, GoalType, NewGoal, RiskProfile};
pub use goals_repository::InMemoryGoalRepository;
pub use goals_service::GoalService;
pub use goals_traits::{GoalRepositoryTrait, GoalServiceTrait};

#[cfg(test)]
mod goals_service_tests;
