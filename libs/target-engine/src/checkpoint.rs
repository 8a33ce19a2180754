use std::io::Write;

use serde_json::Value;

/// Latest STATE value that is safe to hand back to the caller.
///
/// Every accepted RECORD clears it: a checkpoint emitted after that point
/// would claim the record is stored, which is not known yet. Only a later
/// STATE message sets it again.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Checkpoint {
    last_safe: Option<Value>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_state(&mut self, value: Value) {
        tracing::debug!(state = %value, "setting state");
        self.last_safe = Some(value);
    }

    pub fn observe_record(&mut self) {
        self.last_safe = None;
    }

    pub fn current(&self) -> Option<&Value> {
        self.last_safe.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.last_safe
    }
}

/// Write the state as a single JSON line. Nothing is written for `None`.
pub fn emit_state<W: Write>(out: &mut W, state: Option<&Value>) -> std::io::Result<()> {
    if let Some(state) = state {
        let line = serde_json::to_string(state).map_err(std::io::Error::other)?;
        tracing::debug!(state = %line, "emitting state");
        writeln!(out, "{line}")?;
        out.flush()?;
    }
    Ok(())
}
