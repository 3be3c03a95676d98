use serde::Serialize;
use serde_json::Value;

/// Outcome of one check, opaque to the engine.
///
/// Implemented for every `Serialize` type, so a plugin returns its own
/// result struct boxed.
pub trait DiagnosisResult {
    fn to_value(&self) -> serde_json::Result<Value>;
}

impl<T: Serialize> DiagnosisResult for T {
    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A self-contained diagnostic check.
///
/// `diagnose` resolves its own endpoints and acquires its own clients.
/// Operational failures belong in the returned result.
pub trait Plugin {
    fn name(&self) -> &str;

    fn diagnose(&self) -> Box<dyn DiagnosisResult>;
}
