use log::{debug, warn};
use rust_decimal::Decimal;

use crate::money::MoneyValue;
use crate::portfolio::Portfolio;
use crate::rebalancing::constraints::TradingConstraints;
use crate::rebalancing::rebalancing_model::{Trade, TradeAction};

/// Warning emitted when the liquidity floor cannot be reached even with
/// every BUY dropped.
pub const WARN_LIQUIDITY_UNREACHABLE: &str = "liquidity_unreachable";

const LIQUIDITY_SUFFIX: &str = "(adjusted for liquidity)";
const TURNOVER_SUFFIX: &str = "(scaled by turnover constraint)";

/// Ordered constraint filters applied to a trade list.
///
/// The order is contract: threshold, fractional-share policy, minimum trade
/// value, position cap, liquidity floor, turnover cap. Every step that
/// rescales trade values re-applies the fractional and minimum-value
/// filters afterwards, because scaling can strand dust trades below the
/// minimum; and a turnover rescale re-enters the liquidity step, since
/// shrinking SELLs can reopen the cash shortfall.
pub struct ConstraintPipeline<'a> {
    constraints: &'a TradingConstraints,
    portfolio: &'a Portfolio,
}

impl<'a> ConstraintPipeline<'a> {
    pub fn new(constraints: &'a TradingConstraints, portfolio: &'a Portfolio) -> Self {
        ConstraintPipeline {
            constraints,
            portfolio,
        }
    }

    pub fn apply(&self, trades: Vec<Trade>) -> (Vec<Trade>, Vec<String>) {
        let mut warnings = Vec::new();
        let total_value = self.portfolio.total_value();
        if total_value <= MoneyValue::ZERO {
            return (Vec::new(), warnings);
        }

        let mut trades = self.filter_below_threshold(trades, total_value);
        trades = self.refilter(trades);
        trades = self.cap_position_size(trades, total_value);
        trades = self.refilter(trades);
        trades = self.enforce_liquidity_floor(trades, total_value, &mut warnings);

        let before_turnover = trades.len();
        let (scaled, was_capped) = self.cap_turnover(trades, total_value);
        trades = scaled;
        if was_capped {
            // The turnover rescale may have dropped or shrunk SELLs the
            // liquidity step was counting on.
            trades = self.enforce_liquidity_floor(trades, total_value, &mut warnings);
        }
        debug!(
            "Constraint pipeline kept {} of {} trades after turnover stage",
            trades.len(),
            before_turnover
        );

        (trades, warnings)
    }

    /// Step 1: drop trades whose implied weight delta never cleared the
    /// rebalance threshold.
    fn filter_below_threshold(&self, trades: Vec<Trade>, total_value: MoneyValue) -> Vec<Trade> {
        let threshold = self.constraints.rebalance_threshold;
        trades
            .into_iter()
            .filter(|trade| (trade.value / total_value) >= threshold)
            .collect()
    }

    /// Steps 2 and 3, re-entrant: integer truncation when fractional shares
    /// are off, then the minimum-value filter.
    fn refilter(&self, trades: Vec<Trade>) -> Vec<Trade> {
        let min_value = self.constraints.min_trade_value;
        trades
            .into_iter()
            .filter_map(|trade| {
                let trade = if self.constraints.allow_fractional_shares {
                    trade
                } else {
                    let truncated = trade.shares.floor();
                    if truncated.is_zero() {
                        return None;
                    }
                    trade.with_shares(truncated)
                };
                if trade.value < min_value || trade.value.is_zero() {
                    return None;
                }
                Some(trade)
            })
            .collect()
    }

    /// Step 4: BUYs that would push a position past the cap are reduced,
    /// and the curtailed amount is carried to other BUYs proportionally to
    /// their remaining headroom; whatever no BUY can absorb is dropped.
    fn cap_position_size(&self, trades: Vec<Trade>, total_value: MoneyValue) -> Vec<Trade> {
        let Some(cap) = self.constraints.max_position_size else {
            return trades;
        };

        let mut headrooms: Vec<Option<MoneyValue>> = trades
            .iter()
            .map(|trade| {
                if trade.action != TradeAction::Buy {
                    return None;
                }
                let market_value = self
                    .portfolio
                    .position(&trade.ticker)
                    .map(|p| p.market_value())
                    .unwrap_or(MoneyValue::ZERO);
                let allowed = (total_value * cap - market_value).max(MoneyValue::ZERO);
                Some(allowed)
            })
            .collect();

        // First pass: clamp every BUY to its own headroom.
        let mut excess = MoneyValue::ZERO;
        let mut result: Vec<Trade> = trades
            .into_iter()
            .zip(headrooms.iter_mut())
            .map(|(trade, headroom)| match headroom {
                Some(allowed) if trade.value > *allowed => {
                    excess += trade.value - *allowed;
                    let shares = *allowed / trade.current_price;
                    let clamped = trade.with_shares(shares.into());
                    *headroom = Some(MoneyValue::ZERO);
                    clamped
                }
                Some(allowed) => {
                    let remaining = *allowed - trade.value;
                    *headroom = Some(remaining);
                    trade
                }
                None => trade,
            })
            .collect();

        // Second pass: spread the curtailed value across the remaining
        // headroom, proportionally.
        if excess > MoneyValue::ZERO {
            let open_headroom: MoneyValue = headrooms.iter().flatten().copied().sum();
            if open_headroom > MoneyValue::ZERO {
                let carried = excess.min(open_headroom);
                for (trade, headroom) in result.iter_mut().zip(&headrooms) {
                    let Some(room) = headroom else { continue };
                    if room.is_zero() {
                        continue;
                    }
                    let share_of_excess = carried * (*room / open_headroom);
                    let extra_shares = share_of_excess / trade.current_price;
                    *trade = trade.with_shares(trade.shares + extra_shares.into());
                }
            } else {
                debug!(
                    "Position cap dropped {excess} of BUY value with no headroom left"
                );
            }
        }

        result
            .into_iter()
            .filter(|trade| !trade.shares.is_zero())
            .collect()
    }

    /// Step 5: scale BUYs down until post-trade cash clears the liquidity
    /// floor. When even zero BUYs cannot reach the floor, drop them all and
    /// flag the result.
    fn enforce_liquidity_floor(
        &self,
        trades: Vec<Trade>,
        total_value: MoneyValue,
        warnings: &mut Vec<String>,
    ) -> Vec<Trade> {
        let floor_cash = total_value * self.constraints.min_liquidity;
        let rate = self.constraints.transaction_cost_bps;
        let (total_buy, total_sell) = totals(&trades);
        let post_cash =
            self.portfolio.cash + total_sell - total_buy - (total_buy + total_sell) * rate;
        if post_cash >= floor_cash {
            return trades;
        }

        // B·(1 + rate) ≤ cash + S·(1 − rate) − floor gives the exact
        // feasible BUY volume.
        let available =
            self.portfolio.cash + total_sell * (Decimal::ONE - rate) - floor_cash;
        let buy_budget = total_buy * (Decimal::ONE + rate);

        if available <= MoneyValue::ZERO {
            let kept: Vec<Trade> = trades
                .into_iter()
                .filter(|t| t.action == TradeAction::Sell)
                .collect();
            let (_, sells) = totals(&kept);
            let sells_only_cash =
                self.portfolio.cash + sells - sells * rate;
            if sells_only_cash < floor_cash
                && !warnings.iter().any(|w| w == WARN_LIQUIDITY_UNREACHABLE)
            {
                warn!(
                    "Liquidity floor {} is unreachable even with all BUYs dropped",
                    floor_cash
                );
                warnings.push(WARN_LIQUIDITY_UNREACHABLE.to_string());
            }
            return kept;
        }

        let factor = available / buy_budget;
        debug!("Scaling BUYs by {factor} to restore the liquidity floor");
        let scaled: Vec<Trade> = trades
            .into_iter()
            .map(|trade| match trade.action {
                TradeAction::Buy => trade.scaled(factor, LIQUIDITY_SUFFIX),
                TradeAction::Sell => trade,
            })
            .collect();
        // Rescaling strands dust below the minimum trade value; dropping it
        // only raises post-trade cash further.
        self.refilter(scaled)
    }

    /// Step 6: scale every trade down uniformly when total traded value
    /// exceeds the turnover cap. Returns whether scaling happened.
    fn cap_turnover(
        &self,
        trades: Vec<Trade>,
        total_value: MoneyValue,
    ) -> (Vec<Trade>, bool) {
        let Some(max_turnover) = self.constraints.max_turnover else {
            return (trades, false);
        };
        let (total_buy, total_sell) = totals(&trades);
        let total_traded = total_buy + total_sell;
        let max_allowed = total_value * max_turnover;
        if total_traded <= max_allowed {
            return (trades, false);
        }

        let factor = max_allowed / total_traded;
        debug!("Scaling all trades by {factor} to respect the turnover cap");
        let scaled: Vec<Trade> = trades
            .into_iter()
            .map(|trade| trade.scaled(factor, TURNOVER_SUFFIX))
            .collect();
        (self.refilter(scaled), true)
    }
}

fn totals(trades: &[Trade]) -> (MoneyValue, MoneyValue) {
    let mut buy = MoneyValue::ZERO;
    let mut sell = MoneyValue::ZERO;
    for trade in trades {
        match trade.action {
            TradeAction::Buy => buy += trade.value,
            TradeAction::Sell => sell += trade.value,
        }
    }
    (buy, sell)
}
