//! Executor state machine encoding
//!
//! One tagged variant per state, with the data that only exists in that
//! state attached to the variant. The ExecutionContext is the evolving
//! record tied 1:1 to a signal; only the executor mutates it, and every
//! transition is appended to an audit trail.
//!
//! Author: AI-Generated
//! Created: 2026-02-24

use crate::types::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Which venue a leg executed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Cex,
    Dex,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Venue::Cex => write!(f, "CEX"),
            Venue::Dex => write!(f, "DEX"),
        }
    }
}

/// A completed leg
#[derive(Debug, Clone)]
pub struct LegFill {
    pub venue: Venue,
    pub price: Decimal,
    pub size: Decimal,
    /// CEX order id, when the leg was an order
    pub order_id: Option<String>,
    /// DEX route description, when the leg was a swap
    pub route: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ExecutionState {
    Idle,
    Validating,
    Leg1Pending {
        venue: Venue,
        started: DateTime<Utc>,
    },
    Leg1Filled {
        fill: LegFill,
    },
    Leg2Pending {
        venue: Venue,
        started: DateTime<Utc>,
    },
    Unwinding {
        reason: String,
    },
    Done {
        net_pnl: Decimal,
    },
    Failed {
        error: String,
    },
}

impl ExecutionState {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionState::Idle => "IDLE",
            ExecutionState::Validating => "VALIDATING",
            ExecutionState::Leg1Pending { .. } => "LEG1_PENDING",
            ExecutionState::Leg1Filled { .. } => "LEG1_FILLED",
            ExecutionState::Leg2Pending { .. } => "LEG2_PENDING",
            ExecutionState::Unwinding { .. } => "UNWINDING",
            ExecutionState::Done { .. } => "DONE",
            ExecutionState::Failed { .. } => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Done { .. } | ExecutionState::Failed { .. }
        )
    }
}

/// Evolving execution record for one signal
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub signal_id: Uuid,
    pub pair: String,
    pub direction: Direction,
    pub state: ExecutionState,
    pub leg1: Option<LegFill>,
    pub leg2: Option<LegFill>,
    pub actual_net_pnl: Option<Decimal>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// State names in transition order, for the audit log
    pub transitions: Vec<&'static str>,
}

impl ExecutionContext {
    pub fn new(signal_id: Uuid, pair: String, direction: Direction) -> Self {
        Self {
            signal_id,
            pair,
            direction,
            state: ExecutionState::Idle,
            leg1: None,
            leg2: None,
            actual_net_pnl: None,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
            transitions: vec!["IDLE"],
        }
    }

    pub fn transition(&mut self, next: ExecutionState) {
        debug!(
            "execution {}: {} -> {}",
            self.signal_id,
            self.state.name(),
            next.name()
        );
        self.transitions.push(next.name());
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        if let ExecutionState::Failed { error } = &next {
            self.error = Some(error.clone());
        }
        if let ExecutionState::Done { net_pnl } = &next {
            self.actual_net_pnl = Some(*net_pnl);
        }
        self.state = next;
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.state, ExecutionState::Done { .. })
    }

    pub fn execution_time_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }
}
