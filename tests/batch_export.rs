mod common;

use common::{classroom, profile, RecordingAssembler};
use score_report_export::infrastructure::{InMemoryStore, JsonReportWriter, ReportAssembler};
use score_report_export::models::StudentRef;
use score_report_export::{
    AppError, BatchExporter, Config, ExportError, JobStatus, Phase, ReportFlow, SchedulerOptions,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn students(n: usize) -> Vec<StudentRef> {
    (1..=n)
        .map(|i| StudentRef::new(format!("s{i}"), format!("Estudiante {i}")))
        .collect()
}

fn exporter(
    store: InMemoryStore,
    assembler: Arc<RecordingAssembler>,
    options: SchedulerOptions,
) -> BatchExporter {
    let flow = ReportFlow::new(Arc::new(store), assembler, &Config::default());
    BatchExporter::with_flow(Arc::new(flow), options)
}

#[tokio::test]
async fn test_every_task_is_settled() {
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(4), assembler.clone(), SchedulerOptions::unpaced(3));
    assert_eq!(exporter.get_progress().status, JobStatus::Idle);

    let handle = assert_ok!(exporter.submit_batch(students(4), vec![Phase::First, Phase::Third]));
    let outcome = assert_ok!(handle.wait().await);

    let summary = outcome.summary;
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.total, 8);
    assert_eq!(summary.completed, 8);
    assert_eq!(summary.success, 8);
    assert_eq!(summary.errors, 0);
    assert!(!summary.is_partial());

    let progress = exporter.get_progress();
    assert_eq!(progress.status, JobStatus::Completed);
    assert_eq!(progress.completed, progress.success + progress.errors);
    assert_eq!(progress.percent(), 100.0);

    let mut assembled = assembler.assembled();
    assembled.sort();
    assert_eq!(assembled.len(), 8);
    assert_eq!(assembled[0], "s1:1");
}

#[tokio::test]
async fn test_duplicate_phases_are_collapsed() {
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(2), assembler, SchedulerOptions::unpaced(3));

    let handle = assert_ok!(exporter.submit_batch(students(2), vec![Phase::Second, Phase::Second]));
    let outcome = assert_ok!(handle.wait().await);
    assert_eq!(outcome.summary.total, 2);
}

#[tokio::test]
async fn test_failed_tasks_do_not_stop_their_group() {
    let store = classroom(3).with_student(profile("ghost", "Sin Notas"));
    let assembler = Arc::new(RecordingAssembler::new().failing_for("s2"));
    let exporter = exporter(store, assembler.clone(), SchedulerOptions::unpaced(3));

    let mut selected = students(3);
    selected.push(StudentRef::new("ghost", "Sin Notas"));
    let handle = assert_ok!(exporter.submit_batch(selected, vec![Phase::First]));
    let summary = assert_ok!(handle.wait().await).summary;

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.success + summary.errors, summary.total);

    let mut assembled = assembler.assembled();
    assembled.sort();
    assert_eq!(assembled, vec!["s1:1".to_string(), "s3:1".to_string()]);
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(1), assembler, SchedulerOptions::unpaced(3));

    let err = assert_err!(exporter.submit_batch(Vec::new(), vec![Phase::First]));
    assert!(matches!(err, AppError::Export(ExportError::NoStudentsSelected)));

    let err = assert_err!(exporter.submit_batch(students(1), Vec::new()));
    assert!(matches!(err, AppError::Export(ExportError::NoPhasesSelected)));

    assert_eq!(exporter.get_progress().status, JobStatus::Idle);
}

#[tokio::test]
async fn test_second_batch_is_rejected_while_running() {
    let assembler = Arc::new(RecordingAssembler::new().with_delay(Duration::from_millis(30)));
    let exporter = exporter(classroom(2), assembler, SchedulerOptions::unpaced(2));

    let handle = assert_ok!(exporter.submit_batch(students(2), vec![Phase::First]));
    let err = assert_err!(exporter.submit_batch(students(1), vec![Phase::Second]));
    assert!(matches!(err, AppError::Export(ExportError::AlreadyRunning)));

    assert_ok!(handle.wait().await);

    let again = assert_ok!(exporter.submit_batch(students(1), vec![Phase::Second]));
    let summary = assert_ok!(again.wait().await).summary;
    assert_eq!(summary.total, 1);
    assert_eq!(summary.success, 1);
}

#[tokio::test]
async fn test_cancel_during_first_group_stops_after_it() {
    let token = CancellationToken::new();
    // 第一组的最后一个任务是 s2 的第一阶段
    let assembler = Arc::new(RecordingAssembler::new().cancelling_on("s2", token.clone()));
    let exporter = exporter(classroom(3), assembler.clone(), SchedulerOptions::unpaced(3));

    let handle = assert_ok!(exporter.submit_batch_with_cancellation(
        students(3),
        vec![Phase::First, Phase::Second],
        token,
    ));
    let outcome = assert_ok!(handle.wait().await);

    let summary = outcome.summary;
    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.success, 3);
    assert!(summary.is_partial());
    assert_eq!(assembler.assembled().len(), 3);

    let progress = exporter.get_progress();
    assert!(progress.cancel_requested);
    assert_eq!(progress.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_before_start_dispatches_nothing() {
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(2), assembler.clone(), SchedulerOptions::unpaced(3));
    let token = CancellationToken::new();
    token.cancel();

    let handle = assert_ok!(exporter.submit_batch_with_cancellation(
        students(2),
        vec![Phase::First],
        token,
    ));
    let summary = assert_ok!(handle.wait().await).summary;

    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.completed, 0);
    assert!(assembler.assembled().is_empty());
}

#[tokio::test]
async fn test_cancel_flag_is_visible_before_group_ends() {
    let assembler = Arc::new(RecordingAssembler::new().with_delay(Duration::from_millis(200)));
    let exporter = exporter(classroom(3), assembler, SchedulerOptions::unpaced(3));

    let handle = assert_ok!(exporter.submit_batch(students(3), vec![Phase::First, Phase::Second]));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.get_progress().cancel_requested);

    handle.cancel_batch();

    let progress = exporter.get_progress();
    assert!(progress.cancel_requested);
    assert_eq!(progress.status, JobStatus::Running);
    assert_eq!(progress.completed, 0);
    assert!(handle.get_progress().cancel_requested);

    let summary = assert_ok!(handle.wait().await).summary;
    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.completed, 3);
}

#[tokio::test]
async fn test_external_token_marks_progress() {
    let token = CancellationToken::new();
    let assembler = Arc::new(RecordingAssembler::new().with_delay(Duration::from_millis(200)));
    let exporter = exporter(classroom(3), assembler, SchedulerOptions::unpaced(3));

    let handle = assert_ok!(exporter.submit_batch_with_cancellation(
        students(3),
        vec![Phase::First, Phase::Second],
        token.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let progress = exporter.get_progress();
    assert!(progress.cancel_requested);
    assert_eq!(progress.status, JobStatus::Running);

    let summary = assert_ok!(handle.wait().await).summary;
    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.completed, 3);
}

#[tokio::test]
async fn test_next_group_waits_for_slow_task() {
    // 每组两个任务：第一组是 s1、s2，其中 s1 很慢
    let assembler = Arc::new(RecordingAssembler::new().slow_for("s1", Duration::from_millis(120)));
    let exporter = exporter(classroom(4), assembler.clone(), SchedulerOptions::unpaced(2));

    let handle = assert_ok!(exporter.submit_batch(students(4), vec![Phase::First]));
    assert_ok!(handle.wait().await);

    let (first, second): (Vec<_>, Vec<_>) = assembler
        .timeline()
        .into_iter()
        .partition(|span| span.label == "s1:1" || span.label == "s2:1");
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    let first_done = first.iter().map(|span| span.finished).max().unwrap();
    assert!(second.iter().all(|span| span.started >= first_done));
}

#[tokio::test]
async fn test_tasks_in_a_group_start_apart() {
    let interval = Duration::from_millis(60);
    let options = SchedulerOptions {
        task_start_interval: interval,
        ..SchedulerOptions::unpaced(3)
    };
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(3), assembler.clone(), options);

    let handle = assert_ok!(exporter.submit_batch(students(3), vec![Phase::First]));
    let summary = assert_ok!(handle.wait().await).summary;

    assert_eq!(summary.success, 3);
    assert!(summary.elapsed >= interval * 2);

    // 派发到开始组装之间还有少量计算
    let tolerance = Duration::from_millis(15);
    let timeline = assembler.timeline();
    assert_eq!(timeline.len(), 3);
    for pair in timeline.windows(2) {
        assert!(pair[1].started.duration_since(pair[0].started) + tolerance >= interval);
    }
}

#[tokio::test]
async fn test_groups_are_separated_by_batch_interval() {
    let interval = Duration::from_millis(100);
    let options = SchedulerOptions {
        batch_interval: interval,
        ..SchedulerOptions::unpaced(2)
    };
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(4), assembler.clone(), options);

    let handle = assert_ok!(exporter.submit_batch(students(4), vec![Phase::First]));
    assert_ok!(handle.wait().await);

    let timeline = assembler.timeline();
    assert_eq!(timeline.len(), 4);
    let first_done = timeline[..2].iter().map(|span| span.finished).max().unwrap();
    let second_start = timeline[2..].iter().map(|span| span.started).min().unwrap();
    assert!(second_start.duration_since(first_done) >= interval);
}

#[tokio::test]
async fn test_cancel_during_group_pause_ends_early() {
    let options = SchedulerOptions {
        batch_interval: Duration::from_secs(5),
        ..SchedulerOptions::unpaced(3)
    };
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(classroom(3), assembler.clone(), options);

    let handle = assert_ok!(exporter.submit_batch(students(3), vec![Phase::First, Phase::Second]));
    let mut rx = handle.subscribe();
    while rx.borrow_and_update().completed < 3 {
        assert_ok!(rx.changed().await);
    }

    let requested = Instant::now();
    handle.cancel_batch();
    let summary = assert_ok!(handle.wait().await).summary;

    assert!(requested.elapsed() < Duration::from_secs(1));
    assert_eq!(summary.status, JobStatus::Cancelled);
    assert_eq!(summary.completed, 3);
    assert_eq!(assembler.assembled().len(), 3);
}

#[tokio::test]
async fn test_worker_count_bounds_concurrency() {
    let assembler = Arc::new(RecordingAssembler::new().with_delay(Duration::from_millis(20)));
    let options = SchedulerOptions {
        worker_count: 2,
        ..SchedulerOptions::unpaced(4)
    };
    let exporter = exporter(classroom(4), assembler.clone(), options);

    let handle = assert_ok!(exporter.submit_batch(students(4), vec![Phase::First, Phase::Second]));
    let summary = assert_ok!(handle.wait().await).summary;

    assert_eq!(summary.success, 8);
    assert!(assembler.max_in_flight() <= 2);
    assert!(assembler.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_open_outputs_are_capped() {
    let assembler = Arc::new(RecordingAssembler::new());
    let options = SchedulerOptions {
        max_open_outputs: 2,
        ..SchedulerOptions::unpaced(3)
    };
    let exporter = exporter(classroom(5), assembler, options);

    let handle = assert_ok!(exporter.submit_batch(students(5), vec![Phase::First]));
    let outcome = assert_ok!(handle.wait().await);

    assert_eq!(outcome.summary.success, 5);
    assert_eq!(outcome.summary.evicted_outputs, 3);
    assert_eq!(outcome.outputs.len(), 2);
    assert!(outcome.outputs.iter().all(|o| !o.is_closed()));
}

#[tokio::test]
async fn test_slow_task_times_out_as_error() {
    let assembler = Arc::new(RecordingAssembler::new().with_delay(Duration::from_millis(200)));
    let options = SchedulerOptions {
        task_timeout: Some(Duration::from_millis(20)),
        ..SchedulerOptions::unpaced(2)
    };
    let exporter = exporter(classroom(2), assembler, options);

    let handle = assert_ok!(exporter.submit_batch(students(2), vec![Phase::First]));
    let summary = assert_ok!(handle.wait().await).summary;

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.success, 0);
}

#[tokio::test]
async fn test_progress_never_goes_backwards() {
    let store = classroom(3).with_latency(Duration::from_millis(1));
    let assembler = Arc::new(RecordingAssembler::new());
    let exporter = exporter(store, assembler, SchedulerOptions::unpaced(2));

    let handle = assert_ok!(exporter.submit_batch(students(3), vec![Phase::First, Phase::Third]));
    let mut rx = handle.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            seen.push(state.completed);
            if state.status.is_terminal() {
                break;
            }
        }
        seen
    });

    let summary = assert_ok!(handle.wait().await).summary;
    let seen = assert_ok!(watcher.await);

    assert_eq!(summary.completed, 6);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&6));
}

#[tokio::test]
async fn test_json_writer_creates_report_file() {
    let dir = std::env::temp_dir().join(format!("score-report-export-{}", std::process::id()));
    let writer = JsonReportWriter::new(&dir);
    let flow = ReportFlow::new(
        Arc::new(classroom(2)),
        Arc::new(JsonReportWriter::new(&dir)),
        &Config::default(),
    );

    let report = assert_ok!(flow.build_report("s1", Phase::Second).await);
    let mut output = assert_ok!(writer.assemble(&report).await);
    assert!(!output.is_closed());

    let path = writer.report_path(&report);
    assert!(path.ends_with("s1_fase2.json"));
    let content = assert_ok!(tokio::fs::read_to_string(&path).await);
    let json: serde_json::Value = assert_ok!(serde_json::from_str(&content));
    assert_eq!(json["profile"]["id"], "s1");
    assert_eq!(json["phase"], "second");
    assert!(json["metrics"]["global_score"].is_u64());

    output.close();
    assert!(output.is_closed());
    let _ = tokio::fs::remove_dir_all(&dir).await;
}
