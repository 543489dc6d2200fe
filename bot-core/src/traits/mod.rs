/// Outcome of a single API action, produced by every task implementation.
///
/// Actions are best-effort: a `success: false` result is logged by the loop
/// and the cycle keeps going.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
}

impl TaskResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
