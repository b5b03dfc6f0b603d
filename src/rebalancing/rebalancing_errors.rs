use thiserror::Error;

#[derive(Error, Debug)]
pub enum RebalanceError {
    /// The portfolio holds no positions to rebalance against.
    #[error("Portfolio has no positions to rebalance")]
    EmptyPortfolio,

    /// Target allocations are negative or sum past 1.
    #[error("Invalid target allocations: {0}")]
    InvalidTargets(String),
}
