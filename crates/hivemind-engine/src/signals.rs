//! Tool classification, counters, and keyword scanning.
//!
//! Classification is a static table keyed by tool name, never inferred
//! from arguments. Unknown tools classify as `query`. Counters are
//! monotonic within a session; only a fresh brain document resets them.

use hivemind_core::{BrainState, ToolCategory};
use regex::RegexSet;

/// What one tool invocation reports back to the detection engine.
#[derive(Clone, Debug)]
pub struct ToolCallSignal<'a> {
    pub tool_name: &'a str,
    /// Did the call return an error result.
    pub failed: bool,
    /// Logical section or file the call wrote to, when write-classified.
    pub write_target: Option<&'a str>,
    /// Free text (arguments and result) for keyword scanning.
    pub text: &'a str,
}

/// Static effect classification. New tools get a row here, not a
/// heuristic.
pub fn classify_tool(tool_name: &str) -> ToolCategory {
    match tool_name {
        "read" | "glob" | "grep" | "list" | "cat" => ToolCategory::Read,
        "write" | "edit" | "patch" | "bash" | "multiedit" => ToolCategory::Write,
        "hivemind_session" | "hivemind_inspect" | "save_anchor" | "save_mem" | "recall_mems" => {
            ToolCategory::Governance
        }
        "webfetch" | "websearch" | "task" => ToolCategory::Query,
        other => {
            tracing::debug!(tool = other, "tool not in classification table, treating as query");
            ToolCategory::Query
        }
    }
}

/// Curated frustration/urgency vocabulary. Pure pattern match, not NLP.
const KEYWORD_PATTERNS: [(&str, &str); 8] = [
    ("frustration", r"(?i)\b(damn|dammit|ugh|argh|wtf)\b"),
    ("rage", r"(?i)\b(stupid|idiot|garbage|useless)\b"),
    ("despair", r"(?i)\b(give up|hopeless|impossible)\b"),
    ("urgency", r"(?i)\b(asap|urgent|immediately|right now)\b"),
    ("repetition", r"(?i)\b(again|still broken|still failing)\b"),
    ("confusion", r"(?i)\b(confused|no idea|what is going on)\b"),
    ("blocked", r"(?i)\b(stuck|blocked|dead end)\b"),
    ("regression", r"(?i)\b(broke|regression|worse than before)\b"),
];

/// Compiled keyword matcher. Build once, scan per call.
pub struct KeywordScanner {
    set: RegexSet,
}

impl Default for KeywordScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordScanner {
    pub fn new() -> Self {
        // Static table; a failure here is a bad edit, not runtime input.
        let set = RegexSet::new(KEYWORD_PATTERNS.iter().map(|(_, p)| *p))
            .expect("keyword patterns are valid");
        Self { set }
    }

    /// Tags whose pattern matched anywhere in the text.
    pub fn scan(&self, text: &str) -> Vec<&'static str> {
        self.set
            .matches(text)
            .into_iter()
            .map(|i| KEYWORD_PATTERNS[i].0)
            .collect()
    }
}

/// Fold one tool call into the session metrics.
pub fn record_tool_call(state: &mut BrainState, scanner: &KeywordScanner, signal: &ToolCallSignal) {
    let category = classify_tool(signal.tool_name);
    state.metrics.tool_type_counts.bump(category);

    if signal.failed {
        state.metrics.consecutive_failures += 1;
    } else {
        state.metrics.consecutive_failures = 0;
    }

    if category == ToolCategory::Write {
        match (&state.metrics.last_write_target, signal.write_target) {
            (Some(prev), Some(target)) if prev == target => {
                state.metrics.consecutive_same_section += 1;
            }
            _ => state.metrics.consecutive_same_section = 0,
        }
        state.metrics.last_write_target = signal.write_target.map(str::to_string);
        if let Some(target) = signal.write_target {
            state.add_file_touched(target);
        }
    }

    for tag in scanner.scan(signal.text) {
        if !state.metrics.keyword_flags.iter().any(|f| f == tag) {
            state.metrics.keyword_flags.push(tag.to_string());
        }
    }
}

/// Advance the turn counter and refresh activity.
pub fn record_turn(state: &mut BrainState, now_ms: i64) {
    state.metrics.turn_count += 1;
    state.touch(now_ms);
}
