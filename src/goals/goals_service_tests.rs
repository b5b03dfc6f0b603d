use std::sync::Arc;

use rust_decimal_macros::dec;

use crate::assets::{Asset, AssetType};
use crate::errors::Error;
use crate::goals::{
    GoalError, GoalService, GoalServiceTrait, GoalType, InMemoryGoalRepository, NewGoal,
    RiskProfile,
};
use crate::money::MoneyValue;
use crate::portfolio::Position;
use crate::rebalancing::StrategyConfig;

fn service() -> GoalService<InMemoryGoalRepository> {
    GoalService::new(Arc::new(InMemoryGoalRepository::new()))
}

fn new_goal(name: &str, cash: MoneyValue) -> NewGoal {
    NewGoal {
        name: name.to_string(),
        goal_type: GoalType::Retirement,
        risk_profile: RiskProfile::Moderate,
        initial_cash: cash,
        target_amount: Some(dec!(100000).into()),
        target_date: None,
    }
}

fn sample_position(ticker: &str, price: &str, shares: &str, target: &str) -> Position {
    Position::new(
        Asset::new(
            ticker,
            ticker,
            AssetType::Etf,
            price.parse::<rust_decimal::Decimal>().unwrap().into(),
        )
        .unwrap(),
        shares.parse::<rust_decimal::Decimal>().unwrap().into(),
        target.parse().unwrap(),
        MoneyValue::ZERO,
    )
    .unwrap()
}

#[test]
fn creates_and_fetches_goals() {
    let service = service();
    let goal = service
        .create_goal(new_goal("Retirement 2050", dec!(5000).into()))
        .unwrap();
    assert!(goal.id.starts_with("goal_"));
    assert!(goal.portfolio.id.starts_with("port_"));
    assert_eq!(goal.balance().amount(), dec!(5000));

    let fetched = service.get_goal(&goal.id).unwrap();
    assert_eq!(fetched.name, "Retirement 2050");
    assert_eq!(service.list_goals().unwrap().len(), 1);
}

#[test]
fn unknown_goal_is_not_found() {
    let service = service();
    let error = service.get_goal("goal_missing").unwrap_err();
    assert!(matches!(error, Error::Goal(GoalError::NotFound(_))));
}

#[test]
fn rejects_blank_names() {
    let service = service();
    assert!(service.create_goal(new_goal("   ", dec!(0).into())).is_err());
}

#[test]
fn deposit_and_withdraw_move_cash() {
    let service = service();
    let goal = service
        .create_goal(new_goal("House", dec!(1000).into()))
        .unwrap();

    let after_deposit = service.deposit(&goal.id, dec!(500).into()).unwrap();
    assert_eq!(after_deposit.portfolio.cash.amount(), dec!(1500));

    let after_withdraw = service.withdraw(&goal.id, dec!(200).into()).unwrap();
    assert_eq!(after_withdraw.portfolio.cash.amount(), dec!(1300));
}

#[test]
fn rejects_non_positive_and_excessive_cash_movements() {
    let service = service();
    let goal = service
        .create_goal(new_goal("Vacation", dec!(100).into()))
        .unwrap();

    assert!(matches!(
        service.deposit(&goal.id, dec!(0).into()).unwrap_err(),
        Error::Goal(GoalError::InvalidAmount(_))
    ));
    assert!(matches!(
        service.withdraw(&goal.id, dec!(500).into()).unwrap_err(),
        Error::Goal(GoalError::InsufficientCash { .. })
    ));
}

#[test]
fn fintual_metric_triplet() {
    let service = service();
    let goal = service
        .create_goal(new_goal("Education", dec!(1000).into()))
        .unwrap();
    let goal = service
        .add_position_to_goal(&goal.id, sample_position("VTI", "200", "10", "0.5"))
        .unwrap();

    // Balance 3000, deposited 1000 cash (position deposited 0).
    assert_eq!(goal.balance().amount(), dec!(3000));
    assert_eq!(goal.depositado_neto().amount(), dec!(1000));
    assert_eq!(goal.ganado().amount(), dec!(2000));
    let progress = goal.progress_percentage().unwrap();
    assert_eq!(progress, dec!(3));
}

#[test]
fn rebalance_goal_uses_the_risk_profile_preset() {
    let service = service();
    let goal = service
        .create_goal(new_goal("General", dec!(10000).into()))
        .unwrap();
    service
        .add_position_to_goal(&goal.id, sample_position("VTI", "200", "5", "0.6"))
        .unwrap();
    service
        .add_position_to_goal(&goal.id, sample_position("BND", "80", "10", "0.3"))
        .unwrap();

    let result = service
        .rebalance_goal(&goal.id, &StrategyConfig::Simple, None)
        .unwrap();

    // Moderate preset keeps 10% liquid; the plan cannot spend past that.
    let goal = service.get_goal(&goal.id).unwrap();
    let floor = goal.balance().amount() * dec!(0.10);
    let final_cash = goal.portfolio.cash.amount()
        + result.total_sell_value.amount()
        - result.total_buy_value.amount()
        - result.estimated_cost.amount();
    assert!(final_cash >= floor - dec!(0.000001));
}

#[test]
fn validate_allocations_checks_the_target_sum() {
    let service = service();
    let goal = service
        .create_goal(new_goal("Savings", dec!(1000).into()))
        .unwrap();
    service
        .add_position_to_goal(&goal.id, sample_position("VTI", "200", "1", "0.7"))
        .unwrap();
    service
        .add_position_to_goal(&goal.id, sample_position("BND", "80", "1", "0.3"))
        .unwrap();
    assert!(service.validate_allocations(&goal.id).unwrap());
}

#[test]
fn delete_goal_removes_it() {
    let service = service();
    let goal = service
        .create_goal(new_goal("Temp", dec!(10).into()))
        .unwrap();
    service.delete_goal(&goal.id).unwrap();
    assert!(service.get_goal(&goal.id).is_err());
}
