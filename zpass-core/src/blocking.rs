//! Runs proving engine calls on tokio's blocking pool.
//!
//! Synthesis and proving hold a thread for seconds. Running them off the async
//! workers keeps the runtime responsive and lets a caller's
//! `tokio::time::timeout` fire while the engine is still busy. A call whose
//! caller gave up still runs to completion on its blocking thread.

use std::sync::Arc;

use crate::{
    engine::{ExecutionContext, Program, ProgramImports, ProvingEngine},
    error::EngineError,
};

/// Owned arguments of a program function call, shareable across blocking tasks.
#[derive(Debug)]
pub struct EngineCall {
    pub program: Program,
    pub function: String,
    pub inputs: Vec<String>,
    pub imports: ProgramImports,
}

impl EngineCall {
    pub fn new(
        program: Program,
        function: String,
        inputs: Vec<String>,
        imports: ProgramImports,
    ) -> Arc<Self> {
        Arc::new(Self {
            program,
            function,
            inputs,
            imports,
        })
    }

    pub fn context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            program: &self.program,
            function: &self.function,
            inputs: &self.inputs,
            imports: &self.imports,
        }
    }
}

/// Runs `task` against `engine` on the blocking pool.
///
/// A panicking task is reported as an [`EngineError`].
pub async fn spawn_engine<E, T, F>(engine: &Arc<E>, task: F) -> Result<T, EngineError>
where
    E: ProvingEngine,
    T: Send + 'static,
    F: FnOnce(&E) -> Result<T, EngineError> + Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || task(&engine))
        .await
        .map_err(|e| EngineError::new(format!("engine task did not complete: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    #[tokio::test]
    async fn test_panicking_task_is_an_engine_error() {
        let engine = Arc::new(MockEngine::new());
        let result: Result<(), EngineError> =
            spawn_engine(&engine, |_| panic!("engine crashed")).await;
        let error = result.unwrap_err();
        assert!(error.message().starts_with("engine task did not complete"));
    }

    #[tokio::test]
    async fn test_call_context_borrows_owned_arguments() {
        let engine = Arc::new(MockEngine::new());
        let program = engine
            .parse_program("program local.aleo;\n\nfunction check:\n")
            .unwrap();
        let call = EngineCall::new(
            program,
            "check".to_string(),
            vec!["1u32".to_string()],
            ProgramImports::new(),
        );

        let shared = Arc::clone(&call);
        let keys = spawn_engine(&engine, move |engine| {
            engine.synthesize_keys(shared.context(), None)
        })
        .await
        .unwrap();

        assert_eq!(keys, MockEngine::keys_for(call.context()));
        assert_eq!(call.context().inputs, ["1u32".to_string()]);
    }
}
