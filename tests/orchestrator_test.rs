mod common;

use common::{fast_flow, targets, FakeAgent, ScriptedOperator};
use console_batch_downloader::models::Batch;
use console_batch_downloader::orchestrator::{
    execute_batch, prepare_ledger, AbortSignal, AutoOperator, BatchDecision, BatchProcessor,
    InterruptReason,
};
use console_batch_downloader::{Config, Outcome, ProgressLedger, RunState, Target};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn processor(
    agent: FakeAgent,
    progress: &Path,
    operator: ScriptedOperator,
    abort: AbortSignal,
    batch_size: usize,
) -> BatchProcessor<FakeAgent> {
    let ledger = ProgressLedger::open(progress, 5).unwrap();
    BatchProcessor::new(
        fast_flow(agent),
        ledger,
        Box::new(operator),
        abort,
        batch_size,
        Duration::ZERO,
    )
}

#[tokio::test]
async fn test_full_run_covers_every_target() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a.pdf", "b.pdf", "a.pdf", "c.pdf", "d.pdf", "e.pdf"]);
    let agent = FakeAgent::with_catalog(["a.pdf", "b.pdf", "d.pdf", "e.pdf"]);

    let mut processor = processor(
        agent.clone(),
        &progress,
        ScriptedOperator::default(),
        AbortSignal::new(),
        2,
    );
    let report = processor.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.total, 5);
    assert_eq!(report.completed, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.batches_run, 3);
    assert_eq!(
        report.failed_preview,
        vec![("c.pdf".to_string(), "ResultLink not found".to_string())]
    );

    let saved = ProgressLedger::load(&progress).unwrap();
    let done: HashSet<&str> = saved.completed_set();
    let expected: HashSet<&str> = all.iter().map(Target::as_str).collect();
    assert_eq!(done, expected);
    assert_eq!(saved.current_batch_index, 3);
    assert_eq!(saved.last_processed_target.as_deref(), Some("e.pdf"));
}

#[tokio::test]
async fn test_pause_then_resume_never_repeats_a_target() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a", "b", "c", "d", "e"]);
    let agent = FakeAgent::with_catalog(["a", "b", "c", "d", "e"]);

    let operator = ScriptedOperator::new([BatchDecision::Pause]);
    let decisions = operator.decision_calls.clone();
    let mut first = processor(agent.clone(), &progress, operator, AbortSignal::new(), 2);
    let report = first.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Interrupted(InterruptReason::Paused));
    assert_eq!(decisions.load(Ordering::SeqCst), 1);
    assert_eq!(agent.downloads(), vec!["a", "b"]);
    let saved = ProgressLedger::load(&progress).unwrap();
    assert_eq!(saved.current_batch_index, 1);
    assert_eq!(saved.completed_count, 2);

    let mut second = processor(
        agent.clone(),
        &progress,
        ScriptedOperator::default(),
        AbortSignal::new(),
        2,
    );
    let report = second.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(agent.downloads(), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(agent.searches(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_abort_choice_between_batches() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a", "b", "c"]);
    let agent = FakeAgent::with_catalog(["a", "b", "c"]);

    let mut processor = processor(
        agent.clone(),
        &progress,
        ScriptedOperator::new([BatchDecision::Abort]),
        AbortSignal::new(),
        1,
    );
    let report = processor.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Interrupted(InterruptReason::Aborted));
    assert_eq!(report.batches_run, 1);
    assert_eq!(agent.downloads(), vec!["a"]);
}

#[tokio::test]
async fn test_signal_mid_batch_finishes_current_target_and_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a", "b", "c", "d", "e"]);
    let abort = AbortSignal::new();
    let agent = FakeAgent::with_catalog(["a", "b", "c", "d", "e"]).abort_after(2, abort.clone());

    let mut first = processor(agent.clone(), &progress, ScriptedOperator::default(), abort, 5);
    let report = first.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Interrupted(InterruptReason::Signal));
    assert_eq!(report.completed, 2);
    // 被中断的文件仍然回到了列表页
    assert_eq!(agent.count_calls("go_back"), 2);

    let saved = ProgressLedger::load(&progress).unwrap();
    assert_eq!(saved.succeeded_targets, vec!["a", "b"]);
    assert_eq!(saved.current_batch_index, 0);

    let resumed_agent = FakeAgent::with_catalog(["a", "b", "c", "d", "e"]);
    let mut second = processor(
        resumed_agent.clone(),
        &progress,
        ScriptedOperator::default(),
        AbortSignal::new(),
        5,
    );
    let report = second.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.succeeded, 5);
    assert_eq!(resumed_agent.downloads(), vec!["c", "d", "e"]);
}

#[tokio::test]
async fn test_signal_before_start_processes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let abort = AbortSignal::new();
    abort.trigger();
    let agent = FakeAgent::with_catalog(["a"]);

    let mut processor = processor(agent.clone(), &progress, ScriptedOperator::default(), abort, 5);
    let report = processor.run(&targets(&["a"])).await.unwrap();

    assert!(matches!(report.state, RunState::Interrupted(_)));
    assert!(agent.downloads().is_empty());
    assert!(progress.exists());
}

#[tokio::test]
async fn test_periodic_and_boundary_flush_write_identical_state() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let agent = FakeAgent::with_catalog(["a", "b", "c", "d", "e"]);
    let flow = fast_flow(agent);
    let mut ledger = ProgressLedger::open(&progress, 5).unwrap();
    ledger.ensure_total(5);
    let batch = Batch {
        index: 0,
        targets: targets(&["a", "b", "c", "d", "e"]),
    };

    let report = execute_batch(&flow, &mut ledger, &batch, &AbortSignal::new())
        .await
        .unwrap();
    assert_eq!(report.processed, 5);
    assert_eq!(ledger.flush_count(), 1);
    let periodic = std::fs::read(&progress).unwrap();

    ledger.flush().unwrap();
    assert_eq!(ledger.flush_count(), 2);
    let boundary = std::fs::read(&progress).unwrap();

    assert_eq!(periodic, boundary);
    let saved = ProgressLedger::load(&progress).unwrap();
    assert_eq!(saved.completed_count, 5);
    assert_eq!(saved.current_batch_index, 1);
}

#[tokio::test]
async fn test_nothing_remaining_completes_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a", "b"]);
    {
        let mut ledger = ProgressLedger::open(&progress, 5).unwrap();
        ledger.record(&all[0], &Outcome::Succeeded);
        ledger.record(&all[1], &Outcome::failed("ResultLink not found"));
        ledger.flush().unwrap();
    }

    let agent = FakeAgent::with_catalog(["a", "b"]);
    let operator = ScriptedOperator::default();
    let ready = operator.ready_calls.clone();
    let mut processor = processor(agent.clone(), &progress, operator, AbortSignal::new(), 5);
    let report = processor.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.batches_run, 0);
    assert_eq!(ready.load(Ordering::SeqCst), 0);
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn test_auto_operator_runs_all_batches() {
    let dir = tempfile::tempdir().unwrap();
    let progress = dir.path().join("progress.json");
    let all = targets(&["a", "b", "c"]);
    let agent = FakeAgent::with_catalog(["a", "b", "c"]);

    let ledger = ProgressLedger::open(&progress, 5).unwrap();
    let mut processor = BatchProcessor::new(
        fast_flow(agent.clone()),
        ledger,
        Box::new(AutoOperator),
        AbortSignal::new(),
        1,
        Duration::ZERO,
    );
    let report = processor.run(&all).await.unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.batches_run, 3);
    assert_eq!(agent.downloads(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_prepare_ledger_skips_existing_downloads_and_requeues_failures() {
    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    std::fs::write(downloads.join("a.pdf"), b"x").unwrap();
    std::fs::write(downloads.join("b.pdf"), b"x").unwrap();
    // 另一个文件的编号副本，不能让 report.pdf 被当成已下载
    std::fs::write(downloads.join("report (2023).pdf"), b"x").unwrap();
    std::fs::write(downloads.join("d.pdf.crdownload"), b"x").unwrap();

    let progress = dir.path().join("progress.json");
    let all = targets(&["a.pdf", "b.pdf", "c.pdf", "d.pdf", "report.pdf"]);
    let mut ledger = ProgressLedger::open(&progress, 5).unwrap();
    ledger.record(&all[2], &Outcome::failed("DownloadTrigger not found"));

    let config = Config {
        download_folder: downloads.to_string_lossy().to_string(),
        retry_failed: true,
        skip_existing_downloads: true,
        ..Config::default()
    };
    prepare_ledger(&config, &mut ledger, &all).unwrap();

    assert!(ledger.is_succeeded(&all[0]));
    assert!(ledger.is_succeeded(&all[1]));
    assert!(!ledger.is_completed(&all[2]));
    assert!(!ledger.is_completed(&all[3]));
    assert!(!ledger.is_completed(&all[4]));
    assert!(!ledger.is_dirty());

    let saved = ProgressLedger::load(&progress).unwrap();
    assert!(saved.failed_targets.is_empty());
    assert_eq!(saved.succeeded_targets, vec!["a.pdf", "b.pdf"]);
}
