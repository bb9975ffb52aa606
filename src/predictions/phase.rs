//! 单次预测请求的阶段状态机
//!
//! Pending → ContextFetched → {ContextError | Prompted → Parsed →
//! {Persisted | PersistFailed} → Returned}。ContextError 与 Returned
//! 是仅有的终态；PersistFailed 仍会走到 Returned（带默认预测载荷）。

/// 请求阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Pending,
    ContextFetched,
    ContextError,
    Prompted,
    Parsed,
    Persisted,
    PersistFailed,
    Returned,
}

impl RequestPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestPhase::ContextError | RequestPhase::Returned)
    }

    /// 合法的单步推进
    pub fn can_advance_to(self, next: RequestPhase) -> bool {
        use RequestPhase::*;
        matches!(
            (self, next),
            (Pending, ContextFetched)
                | (ContextFetched, ContextError)
                | (ContextFetched, Prompted)
                | (Prompted, Parsed)
                | (Parsed, Persisted)
                | (Parsed, PersistFailed)
                | (Persisted, Returned)
                | (PersistFailed, Returned)
        )
    }
}

/// 带日志的阶段跟踪器；非法推进记 warn 并保持原阶段
#[derive(Debug)]
pub struct PhaseTracker {
    phase: RequestPhase,
    label: String,
}

impl PhaseTracker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            phase: RequestPhase::Pending,
            label: label.into(),
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn advance(&mut self, next: RequestPhase) -> bool {
        if self.phase.can_advance_to(next) {
            tracing::debug!(request = %self.label, from = ?self.phase, to = ?next, "phase advance");
            self.phase = next;
            true
        } else {
            tracing::warn!(request = %self.label, from = ?self.phase, to = ?next, "illegal phase transition ignored");
            false
        }
    }
}
