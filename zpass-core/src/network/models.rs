//! Wire models returned by the explorer API.

use serde::{Deserialize, Serialize};

/// Output kind of an encrypted record.
pub const RECORD_OUTPUT_KIND: &str = "record";

/// A transaction as returned by `GET /{network}/transaction/{id}`.
///
/// Only the fields the SDK reads are modeled; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction identifier (`at1…`).
    pub id: String,
    /// Transaction kind, `execute` or `deploy`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Execution body, present for `execute` transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionRecord>,
}

impl TransactionRecord {
    /// Whether this is an `execute` transaction.
    #[must_use]
    pub fn is_execution(&self) -> bool {
        self.kind == "execute"
    }

    /// Outputs of every transition in the execution, in order.
    pub fn execution_outputs(&self) -> impl Iterator<Item = &Output> {
        self.execution
            .iter()
            .flat_map(|execution| &execution.transitions)
            .flat_map(|transition| &transition.outputs)
    }

    /// The first output of kind `record`, if any.
    #[must_use]
    pub fn first_record_output(&self) -> Option<&Output> {
        self.execution_outputs()
            .find(|output| output.kind == RECORD_OUTPUT_KIND)
    }
}

/// The execution body of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Transitions, one per function call.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// One function call within an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition identifier (`au1…`).
    pub id: String,
    /// Program that was called.
    pub program: String,
    /// Function that was called.
    pub function: String,
    /// Outputs produced by the call.
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// A transition output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Visibility kind: `public`, `private`, `record`, `future`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Output identifier.
    pub id: String,
    /// Output value; a ciphertext for `record` and `private` outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
