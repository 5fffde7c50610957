//! Scripted command runner for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::runner::{CommandRunner, RunOptions};
use crate::Result;

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub options: RunOptions,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RecordedCall>,
    results: VecDeque<(i32, Vec<u8>)>,
}

/// Records every call and answers with queued exit codes and stdout
///
/// Clones share the same queue and call log. An exhausted queue answers
/// with exit code 0 and no output.
#[derive(Debug, Clone, Default)]
pub struct StubRunner {
    state: Arc<Mutex<State>>,
}

impl StubRunner {
    pub fn with_codes(codes: Vec<i32>) -> Self {
        Self::with_results(codes.into_iter().map(|c| (c, Vec::new())).collect())
    }

    pub fn with_results(results: Vec<(i32, Vec<u8>)>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                calls: Vec::new(),
                results: VecDeque::from(results),
            })),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().expect("lock").calls.clone()
    }

    fn next(&self, program: &str, args: &[String], options: &RunOptions) -> (i32, Vec<u8>) {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            options: options.clone(),
        });
        state.results.pop_front().unwrap_or((0, Vec::new()))
    }
}

#[async_trait]
impl CommandRunner for StubRunner {
    async fn run(&self, program: &str, args: &[String], options: &RunOptions) -> Result<i32> {
        Ok(self.next(program, args, options).0)
    }

    async fn run_with_stdout(
        &self,
        program: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<(i32, Vec<u8>)> {
        Ok(self.next(program, args, options))
    }
}
