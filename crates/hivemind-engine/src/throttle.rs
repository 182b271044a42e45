//! Toast throttle: keeps advisory notifications from cascading.
//!
//! One emission per composite key per cooldown window, a per-session
//! quota per key, and a 24h auto-reset that treats a long-idle process
//! as a new session.

use hivemind_core::ToastConfig;
use std::collections::HashMap;

const SESSION_RESET_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug)]
struct EmitRecord {
    last_emit_ms: i64,
    emit_count: u32,
}

#[derive(Debug)]
pub struct ToastThrottle {
    config: ToastConfig,
    records: HashMap<String, EmitRecord>,
    session_start_ms: i64,
}

impl ToastThrottle {
    pub fn new(config: ToastConfig, now_ms: i64) -> Self {
        Self {
            config,
            records: HashMap::new(),
            session_start_ms: now_ms,
        }
    }

    fn composite(event_type: &str, key: &str) -> String {
        format!("{event_type}:{key}")
    }

    /// Would an emission pass the throttle right now. Read-only.
    pub fn should_emit(&mut self, event_type: &str, key: &str, now_ms: i64) -> bool {
        if now_ms - self.session_start_ms > SESSION_RESET_MS {
            self.reset_all(now_ms);
        }
        let Some(record) = self.records.get(&Self::composite(event_type, key)) else {
            return true;
        };
        if now_ms - record.last_emit_ms < self.config.cooldown_ms {
            return false;
        }
        record.emit_count < self.config.max_per_session
    }

    pub fn record_emit(&mut self, event_type: &str, key: &str, now_ms: i64) {
        self.records
            .entry(Self::composite(event_type, key))
            .and_modify(|r| {
                r.last_emit_ms = now_ms;
                r.emit_count += 1;
            })
            .or_insert(EmitRecord {
                last_emit_ms: now_ms,
                emit_count: 1,
            });
    }

    /// Check and record in one step; true when the caller should emit.
    pub fn check_and_record(&mut self, event_type: &str, key: &str, now_ms: i64) -> bool {
        if self.should_emit(event_type, key, now_ms) {
            self.record_emit(event_type, key, now_ms);
            true
        } else {
            false
        }
    }

    /// Drop throttle state for one event type ("*" clears everything).
    pub fn reset(&mut self, event_type: &str, now_ms: i64) {
        if event_type == "*" {
            self.reset_all(now_ms);
            return;
        }
        let prefix = format!("{event_type}:");
        self.records.retain(|k, _| !k.starts_with(&prefix));
    }

    pub fn reset_all(&mut self, now_ms: i64) {
        self.records.clear();
        self.session_start_ms = now_ms;
    }

    pub fn active_keys(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}
