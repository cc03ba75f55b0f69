use crate::backend::ExternalInterpreter;
use crate::engine::judge;
use crate::t_args;
use crate::types::{Summary, TestSuite};
use futures::stream::{self, StreamExt};
use tracing::debug;

/// Run every case concurrently, at most `jobs` interpreter processes at a time.
///
/// Results keep corpus order regardless of completion order.
pub async fn run_suites_async(
    interpreter: &ExternalInterpreter,
    suites: &[TestSuite],
    jobs: usize,
) -> Summary {
    let jobs = jobs.max(1);
    debug!("{}", t_args!("debug-async-jobs", "jobs" => jobs));

    let all_cases = suites
        .iter()
        .flat_map(|s| s.cases.iter().map(move |c| (s.name.as_str(), c)));

    let results = stream::iter(all_cases)
        .map(|(suite, case)| async move {
            let outcome = interpreter.run_async(&case.script).await;
            judge(suite, case, outcome)
        })
        .buffered(jobs)
        .collect::<Vec<_>>()
        .await;

    Summary::from_results(results)
}
