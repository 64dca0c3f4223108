//! Strategy protocol and the catalog of progression algorithms.
//!
//! A strategy is a state machine over its private state: the engine calls
//! [`Strategy::next_bet`] for a proposal, executes it, then feeds the
//! outcome back through [`Strategy::on_result`]. Calls are strictly
//! sequential within a session and strategies never perform I/O: anything
//! that needs the outside world (placing bets, claiming the faucet) is
//! expressed as an [`Action`] for the engine to carry out.

pub mod catalog;
mod common;

mod dalembert;
mod faucet;
mod fibonacci;
mod flat;
mod kelly;
mod labouchere;
mod martingale;
mod max_wager_flow;
mod micro_exponential;
mod one_three_two_six;
mod oscars_grind;
mod paroli;
mod range_random;
mod rng_analysis;
mod streak_hunter;
mod target_aware;

pub use catalog::{build, catalog, CatalogEntry};

use dicebot_models::{
    BetResult, BetSpec, Params, SessionSummary, StrategyContext, StrategyError, StrategyMetadata,
};

/// What a strategy wants the engine to do this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Place this bet (after validation).
    Bet(BetSpec),
    /// Nothing to propose; sleep one tick and ask again.
    Skip,
    /// Ask the API for a faucet claim. Only meaningful in faucet modes;
    /// elsewhere the engine treats it as a strategy stop.
    ClaimFaucet,
    /// Give up with a human-readable reason.
    Stop(String),
}

/// The contract every progression algorithm implements.
///
/// The engine guarantees single-threaded sequential calls: no `next_bet`
/// overlaps another, and every `on_result` follows its matching `next_bet`.
/// `next_bet` must be deterministic in `(context, private state)`.
pub trait Strategy: Send {
    /// Stable catalog identifier.
    fn name(&self) -> &'static str;

    /// Static description: risk, parameter schema, tips.
    fn metadata(&self) -> StrategyMetadata;

    /// Bind schema-checked parameters and reset private state.
    fn init(&mut self, params: &Params, ctx: &StrategyContext) -> Result<(), StrategyError>;

    /// Compute the next proposal. Must not perform I/O.
    fn next_bet(&mut self, ctx: &StrategyContext) -> Action;

    /// Fold one executed bet into private state. Must not perform I/O.
    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult);

    /// Optional finaliser, called once after the session stops.
    fn on_session_end(&mut self, _ctx: &StrategyContext, _summary: &SessionSummary) {}

    /// How many recent results the strategy wants in the context ring
    /// buffer. Zero means it never looks back.
    fn history_window(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicebot_models::{Currency, StrategyContext};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    /// Every catalog entry must initialise from its own schema defaults and
    /// propose something sane on a fresh context.
    #[test]
    fn catalog_defaults_initialise() {
        let ctx = StrategyContext::new(
            Currency::new("btc"),
            dec!(0.03),
            dec!(100),
            64,
            chrono::Utc::now(),
        );
        for entry in catalog() {
            let mut strategy = (entry.build)();
            assert_eq!(strategy.name(), entry.name);
            let schema = strategy.metadata().params;
            let params = Params::parse(&schema, &HashMap::new())
                .unwrap_or_else(|e| panic!("{}: bad default schema: {e}", entry.name));
            strategy
                .init(&params, &ctx)
                .unwrap_or_else(|e| panic!("{}: init failed on defaults: {e}", entry.name));
            match strategy.next_bet(&ctx) {
                Action::Bet(spec) => assert!(
                    spec.amount >= dec!(0),
                    "{}: negative stake proposed",
                    entry.name
                ),
                Action::Skip | Action::ClaimFaucet | Action::Stop(_) => {}
            }
        }
    }

    /// `next_bet` twice with identical context and state must agree.
    #[test]
    fn catalog_proposals_are_pure() {
        let ctx = StrategyContext::new(
            Currency::new("btc"),
            dec!(0.03),
            dec!(100),
            64,
            chrono::Utc::now(),
        );
        for entry in catalog() {
            let mut strategy = (entry.build)();
            let schema = strategy.metadata().params;
            let params = Params::parse(&schema, &HashMap::new()).unwrap();
            strategy.init(&params, &ctx).unwrap();
            let first = strategy.next_bet(&ctx);
            let second = strategy.next_bet(&ctx);
            assert_eq!(first, second, "{}: next_bet is not pure", entry.name);
        }
    }
}
