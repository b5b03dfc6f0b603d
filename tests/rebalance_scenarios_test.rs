//! End-to-end rebalancing scenarios with literal values, driven through the
//! public `rebalance` entry point and the serialized wire shapes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use goalfolio_core::assets::{Asset, AssetType};
use goalfolio_core::money::MoneyValue;
use goalfolio_core::portfolio::{Portfolio, Position};
use goalfolio_core::rebalancing::{
    rebalance, StrategyConfig, TradeAction, TradingConstraints,
};

fn position(ticker: &str, price: Decimal, shares: Decimal, target: Decimal) -> Position {
    Position::new(
        Asset::new(ticker, ticker, AssetType::Stock, price.into()).unwrap(),
        shares.into(),
        target,
        MoneyValue::ZERO,
    )
    .unwrap()
}

/// Scenario A fixture: cash 500, AAPL 10 sh @ 180.50 (target 60%), META
/// 5 sh @ 400 (target 40%); total value 4305.
fn two_asset_portfolio() -> Portfolio {
    let mut portfolio = Portfolio::new("scenario_a", dec!(500).into()).unwrap();
    portfolio
        .add_position(position("AAPL", dec!(180.50), dec!(10), dec!(0.60)))
        .unwrap();
    portfolio
        .add_position(position("META", dec!(400.00), dec!(5), dec!(0.40)))
        .unwrap();
    portfolio
}

#[test]
fn scenario_a_simple_two_asset_drift() {
    let portfolio = two_asset_portfolio();
    assert_eq!(portfolio.total_value().amount(), dec!(4305.00));

    let result = rebalance(
        &portfolio,
        &StrategyConfig::Simple,
        &TradingConstraints::default(),
    )
    .unwrap();

    assert_eq!(result.trades.len(), 2);
    let aapl = &result.trades[0];
    let meta = &result.trades[1];
    assert_eq!(aapl.ticker, "AAPL");
    assert_eq!(aapl.action, TradeAction::Buy);
    assert_eq!(meta.ticker, "META");
    assert_eq!(meta.action, TradeAction::Sell);
    assert!((meta.value.amount() - dec!(278.00)).abs() < dec!(0.0000001));

    // Cost is exactly the configured fraction of traded value.
    let traded = result.total_buy_value + result.total_sell_value;
    assert_eq!(result.estimated_cost, traded * dec!(0.0025));

    // The rebalance lands within the drift threshold.
    assert!(result.metrics.max_drift_after <= 0.02);
    let aapl_final = result.final_allocations["AAPL"];
    let meta_final = result.final_allocations["META"];
    assert!((aapl_final - dec!(0.60)).abs() < dec!(0.02));
    assert!((meta_final - dec!(0.40)).abs() < dec!(0.02));
}

#[test]
fn scenario_b_no_trade_under_threshold() {
    let portfolio = two_asset_portfolio();
    let constraints = TradingConstraints {
        rebalance_threshold: dec!(0.20),
        ..Default::default()
    };
    let result = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.total_buy_value, MoneyValue::ZERO);
    assert_eq!(result.total_sell_value, MoneyValue::ZERO);
}

#[test]
fn scenario_c_cvar_with_balanced_portfolio() {
    let mut portfolio = Portfolio::new("scenario_c", dec!(0.30).into()).unwrap();
    portfolio
        .add_position(position("AAA", dec!(100), dec!(10), dec!(0.3333)))
        .unwrap();
    portfolio
        .add_position(position("BBB", dec!(100), dec!(10), dec!(0.3333)))
        .unwrap();
    portfolio
        .add_position(position("CCC", dec!(100), dec!(10), dec!(0.3334)))
        .unwrap();

    let config = StrategyConfig::CVaR {
        n_scenarios: 200,
        confidence_level: 0.95,
        risk_aversion: 0.1,
        seed: Some(7),
    };
    let result = rebalance(&portfolio, &config, &TradingConstraints::default()).unwrap();

    assert!(result.trades.len() <= 1);
    for (ticker, target) in [("AAA", dec!(0.3333)), ("BBB", dec!(0.3333)), ("CCC", dec!(0.3334))]
    {
        let final_weight = result.final_allocations[ticker];
        assert!((final_weight - target).abs() <= dec!(0.01));
    }
    let cvar = result.metrics.cvar.expect("cvar must be reported");
    assert!(cvar.is_finite());
}

#[test]
fn scenario_d_liquidity_floor_blocks_buys() {
    // 90% invested, half the book must stay liquid: no BUY can survive.
    let mut portfolio = Portfolio::new("scenario_d", dec!(1000).into()).unwrap();
    portfolio
        .add_position(position("AAA", dec!(100), dec!(20), dec!(0.50)))
        .unwrap();
    portfolio
        .add_position(position("BBB", dec!(100), dec!(70), dec!(0.30)))
        .unwrap();
    let constraints = TradingConstraints {
        min_liquidity: dec!(0.50),
        ..Default::default()
    };

    let result = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();

    assert!(result
        .trades
        .iter()
        .all(|t| t.action == TradeAction::Sell));
    // The overweight BBB raises cash toward the floor.
    assert!(result.total_sell_value > MoneyValue::ZERO);

    let final_cash = portfolio.cash + result.total_sell_value
        - result.total_buy_value
        - result.estimated_cost;
    let floor = portfolio.total_value() * dec!(0.50);
    assert!(
        final_cash.amount() >= floor.amount() - dec!(0.000001)
            || result
                .metrics
                .warnings
                .contains(&"liquidity_unreachable".to_string())
    );
}

#[test]
fn scenario_d_warns_when_even_sells_cannot_reach_the_floor() {
    let mut portfolio = Portfolio::new("scenario_d2", dec!(100).into()).unwrap();
    portfolio
        .add_position(position("AAA", dec!(100), dec!(19), dec!(0.90)))
        .unwrap();
    let constraints = TradingConstraints {
        min_liquidity: dec!(0.50),
        ..Default::default()
    };
    let result = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();
    assert!(result.trades.iter().all(|t| t.action == TradeAction::Sell));
    assert!(result
        .metrics
        .warnings
        .contains(&"liquidity_unreachable".to_string()));
}

#[test]
fn scenario_e_high_volatility_low_cash_strategies_diverge() {
    // Three assets mildly off target; cash is nearly exhausted.
    let mut portfolio = Portfolio::new("scenario_e", dec!(100).into()).unwrap();
    portfolio
        .add_position(position("TSLA", dec!(250), dec!(8), dec!(0.43)))
        .unwrap();
    portfolio
        .add_position(position("NVDA", dec!(500), dec!(3), dec!(0.32)))
        .unwrap();
    portfolio
        .add_position(position("AMD", dec!(150), dec!(10), dec!(0.25)))
        .unwrap();

    let constraints = TradingConstraints::default();
    let simple = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();
    let cvar = rebalance(
        &portfolio,
        &StrategyConfig::CVaR {
            n_scenarios: 200,
            confidence_level: 0.95,
            risk_aversion: 0.1,
            seed: Some(11),
        },
        &constraints,
    )
    .unwrap();

    // Both plans respect the dust filter; the CVaR plan may legitimately
    // choose to do nothing at all.
    for result in [&simple, &cvar] {
        for trade in &result.trades {
            assert!(trade.value.amount() >= dec!(10));
        }
    }
    assert!(cvar.metrics.cvar.is_some());
}

#[test]
fn scenario_f_integer_shares_only() {
    let mut portfolio = Portfolio::new("scenario_f", dec!(10000).into()).unwrap();
    portfolio
        .add_position(position("VTI", dec!(100), dec!(1), dec!(0.037)))
        .unwrap();
    // drift 0.037 - 100/10100 = 0.0271 -> value ~274 -> 2.74 shares.
    let constraints = TradingConstraints {
        allow_fractional_shares: false,
        ..Default::default()
    };
    let result = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.shares.amount(), trade.shares.amount().floor());
    assert_eq!(trade.value.amount() % dec!(100), dec!(0));
}

#[test]
fn scenario_f_truncated_dust_is_dropped() {
    let mut portfolio = Portfolio::new("scenario_f2", dec!(1000).into()).unwrap();
    portfolio
        .add_position(position("PENNY", dec!(9), dec!(1), dec!(0.04)))
        .unwrap();
    // drift ~3.1% of 1009 -> ~31.4 -> 3.49 shares -> truncates to 3 shares
    // = 27, below a 30 minimum.
    let constraints = TradingConstraints {
        allow_fractional_shares: false,
        min_trade_value: dec!(30).into(),
        ..Default::default()
    };
    let result = rebalance(&portfolio, &StrategyConfig::Simple, &constraints).unwrap();
    assert!(result.trades.is_empty());
}

#[test]
fn portfolio_wire_shape_is_accepted() {
    let payload = r#"{
        "id": "port_123",
        "cash": "500.00",
        "positions": [
            {
                "ticker": "AAPL",
                "shares": "10",
                "target_allocation": 0.6,
                "deposited": "1750.00",
                "asset": {
                    "ticker": "AAPL",
                    "name": "Apple Inc.",
                    "asset_type": "stock",
                    "current_price": "180.50",
                    "currency": "USD"
                }
            }
        ]
    }"#;
    let portfolio: Portfolio = serde_json::from_str(payload).unwrap();
    assert_eq!(portfolio.total_value().amount(), dec!(2305.00));

    let result = rebalance(
        &portfolio,
        &StrategyConfig::Simple,
        &TradingConstraints::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    // Money serializes as two-digit decimal strings, weights as strings
    // with at least three fractional digits.
    assert!(json["total_buy_value"].as_str().unwrap().contains('.'));
    let aapl_weight = json["final_allocations"]["AAPL"].as_str().unwrap();
    let fractional = aapl_weight.split('.').nth(1).unwrap();
    assert!(fractional.len() >= 3);
    assert!(json["metrics"]["turnover_pct"].is_number());
    for trade in json["trades"].as_array().unwrap() {
        assert!(trade["action"] == "BUY" || trade["action"] == "SELL");
        assert!(trade["shares"].is_string());
        assert!(trade["value"].is_string());
    }
}

#[test]
fn cvar_results_are_reproducible_byte_for_byte() {
    let portfolio = two_asset_portfolio();
    let config = StrategyConfig::CVaR {
        n_scenarios: 200,
        confidence_level: 0.95,
        risk_aversion: 0.1,
        seed: Some(42),
    };
    let constraints = TradingConstraints::default();
    let first = serde_json::to_string(
        &rebalance(&portfolio, &config, &constraints).unwrap(),
    )
    .unwrap();
    let second = serde_json::to_string(
        &rebalance(&portfolio, &config, &constraints).unwrap(),
    )
    .unwrap();
    assert_eq!(first, second);
}
