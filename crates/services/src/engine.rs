use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dicebot_db::{Journal, JournalEvent, SessionRepository};
use dicebot_models::{
    money, ApiError, BetKind, BetResult, BetSpec, BotError, Currency, Params, RejectReason,
    Result, Session, SessionMode, SessionSummary, StopConditions, StopReason, StrategyContext,
};
use dicebot_strategies::{Action, Strategy};

use crate::api::DiceApi;
use crate::clock::Clock;
use crate::validator::{validate, ValidationRules};

const RETRY_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Commands accepted on the engine's control channel. Cooperative: the
/// engine checks before every tick and inside the inter-tick sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Stop,
}

/// Cloneable sender half for pausing, resuming and stopping a session.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl EngineHandle {
    pub fn pause(&self) {
        let _ = self.tx.send(Control::Pause);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(Control::Resume);
    }

    pub fn stop(&self) {
        let _ = self.tx.send(Control::Stop);
    }
}

/// Create the control channel pair for one engine.
pub fn control_channel() -> (EngineHandle, mpsc::UnboundedReceiver<Control>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineHandle { tx }, rx)
}

/// Everything a session run needs beyond the strategy itself.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed session id for reproducible runs; a fresh v4 otherwise.
    pub session_id: Option<Uuid>,
    pub mode: SessionMode,
    pub currency: Currency,
    pub strategy_name: String,
    pub params_json: serde_json::Value,
    pub stop: StopConditions,
    pub min_bet: Decimal,
    pub min_profit: Decimal,
    pub house_edge: Decimal,
    pub chance_ceiling: Decimal,
    pub tick_delay: Duration,
    /// Skip the inter-tick sleep entirely.
    pub turbo: bool,
    pub max_retries: u32,
    /// Cap on any single retry pause, including server-suggested ones.
    pub retry_pause_cap: Duration,
    pub journal_dir: PathBuf,
}

enum RunState {
    Running,
    Paused,
}

/// Drives one strategy against one [`DiceApi`] until a stop condition
/// fires: Idle -> Running <-> Paused -> Stopped. Exactly one bet is in
/// flight at any time; a stop received mid-bet lets that bet finish so the
/// API is never left ambiguous.
pub struct AutoBetEngine {
    api: Arc<dyn DiceApi>,
    clock: Arc<dyn Clock>,
    repository: Option<SessionRepository>,
    control: mpsc::UnboundedReceiver<Control>,
    config: EngineConfig,
}

impl AutoBetEngine {
    pub fn new(
        api: Arc<dyn DiceApi>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        repository: Option<SessionRepository>,
        control: mpsc::UnboundedReceiver<Control>,
    ) -> Self {
        Self {
            api,
            clock,
            repository,
            control,
            config,
        }
    }

    /// Run the session to completion and return its summary.
    pub async fn run(
        mut self,
        mut strategy: Box<dyn Strategy>,
        params: &Params,
    ) -> Result<SessionSummary> {
        let session_id = self.config.session_id.unwrap_or_else(Uuid::new_v4);
        let starting_balance = self
            .api
            .balance(&self.config.currency)
            .await
            .map_err(BotError::Api)?;

        // Parameter problems surface before anything is journaled; the real
        // context is built afterwards because the history window a strategy
        // wants can itself be a parameter.
        let bootstrap = StrategyContext::new(
            self.config.currency.clone(),
            self.config.house_edge,
            starting_balance,
            0,
            self.clock.now(),
        );
        strategy.init(params, &bootstrap)?;
        let mut ctx = StrategyContext::new(
            self.config.currency.clone(),
            self.config.house_edge,
            starting_balance,
            strategy.history_window(),
            self.clock.now(),
        );

        let session = Session {
            session_id,
            start_time: self.clock.now(),
            end_time: None,
            mode: self.config.mode,
            currency: self.config.currency.clone(),
            strategy: self.config.strategy_name.clone(),
            params_json: self.config.params_json.clone(),
            starting_balance,
            ending_balance: None,
            stop_reason: None,
            bet_count: 0,
            win_count: 0,
            profit: Decimal::ZERO,
        };
        let mut journal = Journal::create(&self.config.journal_dir, session_id)?;
        journal.append(JournalEvent::SessionStarted(session.clone()), 0)?;
        if let Some(repo) = &self.repository {
            if let Err(e) = repo.insert_session(&session).await {
                warn!("🗄️ Session index write failed (journal still good): {e}");
            }
        }

        info!(
            "🎲 Session {session_id} started: {} on {} ({}), balance {}",
            self.config.strategy_name,
            self.config.currency,
            self.config.mode,
            money::format_amount(starting_balance)
        );

        let mut state = RunState::Running;
        let mut bet_index: u64 = 0;
        let stop_reason = loop {
            // 1. Controls first, then stop conditions in precedence order.
            if let Some(reason) = self.drain_control(&mut state) {
                break reason;
            }
            if let RunState::Paused = state {
                match self.wait_while_paused().await {
                    Some(reason) => break reason,
                    None => state = RunState::Running,
                }
            }
            if let Some(reason) = check_stop_conditions(&ctx, &self.config.stop) {
                break reason;
            }

            ctx.now = self.clock.now();
            ctx.elapsed = self.clock.monotonic();

            // 2. Ask the strategy.
            let spec = match strategy.next_bet(&ctx) {
                Action::Bet(spec) => spec,
                Action::Skip => {
                    if self.skip_sleep().await {
                        break StopReason::External;
                    }
                    continue;
                }
                Action::ClaimFaucet => {
                    match self.claim_faucet(&mut ctx, &mut journal).await {
                        Ok(()) => continue,
                        Err(reason) => break reason,
                    }
                }
                Action::Stop(detail) => break StopReason::Strategy { detail },
            };

            // 3. Validate, recording every adjustment on the side-channel.
            let rules = ValidationRules {
                balance: ctx.balance,
                min_bet: self.config.min_bet,
                min_profit: self.config.min_profit,
                house_edge: self.config.house_edge,
                chance_ceiling: self.config.chance_ceiling,
            };
            let (spec, adjustments) = match validate(&spec, &rules) {
                Ok(validated) => validated,
                Err(reason @ RejectReason::InsufficientBalance { .. }) => {
                    break StopReason::Bankrupt {
                        detail: reason.to_string(),
                    }
                }
                Err(reason) => {
                    break StopReason::Unreachable {
                        detail: reason.to_string(),
                    }
                }
            };
            for adjustment in &adjustments {
                warn!("⚖️ Bet #{bet_index} adjusted: {adjustment}");
                journal.append(
                    JournalEvent::BetAdjusted {
                        bet_index,
                        detail: serde_json::to_value(adjustment)?,
                    },
                    self.monotonic_ms(),
                )?;
            }

            // 4-5. Submit under an idempotency key, with bounded retries.
            let key = idempotency_key(session_id, bet_index);
            let result = match self.submit_with_retry(&spec, &key).await {
                Ok(result) => result,
                Err(ApiError::InsufficientFunds) => {
                    break StopReason::Bankrupt {
                        detail: format!(
                            "api refused stake {} at balance {}",
                            money::format_amount(spec.amount),
                            money::format_amount(ctx.balance)
                        ),
                    }
                }
                Err(e) => {
                    break StopReason::Api {
                        detail: e.to_string(),
                    }
                }
            };

            // 6. Journal, then fold into context and strategy state.
            journal.append(
                JournalEvent::BetExecuted(result.clone()),
                self.monotonic_ms(),
            )?;
            ctx.record(&result);
            strategy.on_result(&ctx, &result);
            bet_index += 1;
            debug!(
                "🎯 Bet #{bet_index}: roll {} {} profit {} balance {}",
                result.roll,
                if result.won { "won" } else { "lost" },
                result.profit,
                money::format_amount(result.balance_after)
            );

            // 7. Post-bet stop check, then the inter-tick sleep.
            if let Some(reason) = check_stop_conditions(&ctx, &self.config.stop) {
                break reason;
            }
            if self.tick_sleep().await {
                break StopReason::External;
            }
        };

        let summary = SessionSummary {
            session_id,
            stop_reason: stop_reason.clone(),
            bets: ctx.bets,
            wins: ctx.wins,
            losses: ctx.losses,
            starting_balance,
            ending_balance: ctx.balance,
            profit: ctx.total_profit,
            total_wagered: ctx.total_wagered,
            max_win_streak: ctx.max_win_streak,
            max_loss_streak: ctx.max_loss_streak,
            duration: self.clock.monotonic(),
        };
        journal.append(
            JournalEvent::SessionStopped(summary.clone()),
            self.monotonic_ms(),
        )?;
        journal.sync()?;
        strategy.on_session_end(&ctx, &summary);

        if let Some(repo) = &self.repository {
            if let Err(e) = repo.reconcile_journal(journal.path()).await {
                warn!("🗄️ Session index reconcile failed (journal still good): {e}");
            }
        }

        info!(
            "🏁 Session {session_id} stopped ({}): {} bets, {} wins, profit {}",
            summary.stop_reason,
            summary.bets,
            summary.wins,
            money::format_amount(summary.profit)
        );
        Ok(summary)
    }

    /// Drain pending control messages. Returns the stop reason if one of
    /// them was a stop.
    fn drain_control(&mut self, state: &mut RunState) -> Option<StopReason> {
        while let Ok(command) = self.control.try_recv() {
            match command {
                Control::Stop => return Some(StopReason::External),
                Control::Pause => *state = RunState::Paused,
                Control::Resume => *state = RunState::Running,
            }
        }
        None
    }

    /// Block until resumed or stopped. `None` means resume.
    async fn wait_while_paused(&mut self) -> Option<StopReason> {
        info!("⏸️ Session paused");
        loop {
            match self.control.recv().await {
                Some(Control::Resume) => {
                    info!("▶️ Session resumed");
                    return None;
                }
                Some(Control::Stop) => return Some(StopReason::External),
                Some(Control::Pause) => {}
                // All handles dropped: nobody can resume us, keep going.
                None => return None,
            }
        }
    }

    /// Inter-tick sleep, cancellable by a stop command. Returns true when
    /// the sleep was interrupted by a stop.
    async fn tick_sleep(&mut self) -> bool {
        if self.config.turbo || self.config.tick_delay.is_zero() {
            return false;
        }
        self.cancellable_sleep(self.config.tick_delay).await
    }

    /// Sleep after a Skip tick. Never zero, even in turbo mode: a skipping
    /// strategy is waiting on the world (usually a faucet timer), and time
    /// must advance for its condition to ever flip.
    async fn skip_sleep(&mut self) -> bool {
        let delay = if self.config.tick_delay.is_zero() {
            Duration::from_millis(100)
        } else {
            self.config.tick_delay
        };
        self.cancellable_sleep(delay).await
    }

    async fn cancellable_sleep(&mut self, delay: Duration) -> bool {
        tokio::select! {
            () = self.clock.sleep(delay) => false,
            command = self.control.recv() => match command {
                Some(Control::Stop) => true,
                _ => false,
            },
        }
    }

    async fn submit_with_retry(
        &self,
        spec: &BetSpec,
        key: &str,
    ) -> std::result::Result<BetResult, ApiError> {
        let faucet = self.config.mode.uses_faucet_wallet();
        let currency = spec.currency.as_ref().unwrap_or(&self.config.currency);
        let mut attempt = 0;
        loop {
            let outcome = match spec.kind {
                BetKind::Dice { chance, side } => {
                    self.api
                        .place_dice(currency, spec.amount, chance, side, faucet, key)
                        .await
                }
                BetKind::Range { low, high, mode } => {
                    self.api
                        .place_range(currency, spec.amount, low, high, mode, faucet, key)
                        .await
                }
            };
            match outcome {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = RETRY_BACKOFF_BASE * 2u32.saturating_pow(attempt - 1);
                    let pause = e
                        .retry_after()
                        .unwrap_or(backoff)
                        .min(self.config.retry_pause_cap);
                    warn!(
                        "🔁 Bet submit attempt {attempt}/{} failed ({e}), retrying in {pause:?}",
                        self.config.max_retries
                    );
                    self.clock.sleep(pause).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn claim_faucet(
        &self,
        ctx: &mut StrategyContext,
        journal: &mut Journal,
    ) -> std::result::Result<(), StopReason> {
        match self.api.claim_faucet(&self.config.currency).await {
            Ok(claim) => {
                ctx.balance += claim.amount;
                ctx.next_faucet_claim = claim.next_claim_at;
                info!(
                    "🚰 Faucet claimed: +{} -> balance {}",
                    money::format_amount(claim.amount),
                    money::format_amount(ctx.balance)
                );
                journal
                    .append(
                        JournalEvent::FaucetClaimed {
                            amount: claim.amount,
                            balance_after: ctx.balance,
                        },
                        self.monotonic_ms(),
                    )
                    .map_err(|e| StopReason::Api {
                        detail: e.to_string(),
                    })?;
                Ok(())
            }
            Err(ApiError::RateLimited { retry_after }) => {
                // The claim schedule is the API's to enforce; remember when
                // to try again and let the strategy wait it out.
                ctx.next_faucet_claim = Some(
                    ctx.now
                        + chrono::Duration::from_std(retry_after)
                            .unwrap_or_else(|_| chrono::Duration::zero()),
                );
                Ok(())
            }
            Err(e) => Err(StopReason::Api {
                detail: e.to_string(),
            }),
        }
    }

    fn monotonic_ms(&self) -> u64 {
        self.clock.monotonic().as_millis() as u64
    }
}

/// Stop conditions in precedence order; the first that holds wins.
/// (External stop is position 0 and handled by the control channel.)
pub fn check_stop_conditions(ctx: &StrategyContext, stop: &StopConditions) -> Option<StopReason> {
    if let Some(max_bets) = stop.max_bets {
        if ctx.bets >= max_bets {
            return Some(StopReason::MaxBets);
        }
    }
    if let Some(max_losses) = stop.max_losses {
        if ctx.losses >= max_losses {
            return Some(StopReason::MaxLosses);
        }
    }
    if let Some(max_wins) = stop.max_wins {
        if ctx.wins >= max_wins {
            return Some(StopReason::MaxWins);
        }
    }
    if let Some(stop_loss) = stop.stop_loss {
        if ctx.total_profit <= stop_loss {
            return Some(StopReason::StopLoss);
        }
    }
    if let Some(take_profit) = stop.take_profit {
        if ctx.total_profit >= take_profit {
            return Some(StopReason::TakeProfit);
        }
    }
    None
}

/// Idempotency key for one (session, bet) pair: stable across retries,
/// unique across sessions.
pub fn idempotency_key(session_id: Uuid, bet_index: u64) -> String {
    let digest = Sha256::digest(format!("{session_id}:{bet_index}").as_bytes());
    hex::encode(digest)
}
