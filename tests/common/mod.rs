#![allow(dead_code)]

use futures::future::BoxFuture;
use score_report_export::infrastructure::{InMemoryStore, OutputResource, ReportAssembler};
use score_report_export::models::{
    CanonicalSubject, EvaluationRecord, StudentProfile, StudentReport,
};
use score_report_export::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const INSTITUTION: &str = "inst-1";

pub fn profile(id: &str, name: &str) -> StudentProfile {
    StudentProfile {
        id: id.to_string(),
        name: name.to_string(),
        id_number: format!("CC-{id}"),
        institution_id: INSTITUTION.to_string(),
        campus_id: "campus-1".to_string(),
        grade_id: "11".to_string(),
        active: true,
    }
}

pub fn record(
    id: &str,
    student_id: &str,
    subject: &str,
    phase: &str,
    pct: f64,
) -> EvaluationRecord {
    EvaluationRecord {
        id: id.to_string(),
        student_id: student_id.to_string(),
        subject: subject.to_string(),
        phase: phase.to_string(),
        overall_percentage: Some(pct),
        completed: true,
        ..Default::default()
    }
}

/// 给学生在某阶段所有 7 科写入同一百分比
pub fn with_all_subjects(
    store: InMemoryStore,
    student_id: &str,
    phase: &str,
    pct: f64,
) -> InMemoryStore {
    CanonicalSubject::ALL.iter().fold(store, |store, subject| {
        store.with_evaluation(record(
            &format!("{student_id}-{phase}-{subject:?}"),
            student_id,
            subject.name(),
            phase,
            pct,
        ))
    })
}

/// 由 n 名学生组成的同学范围，每人三个阶段都有成绩，第 i 名学生得分随 i 递增
pub fn classroom(n: usize) -> InMemoryStore {
    let mut store = InMemoryStore::new().with_institution(INSTITUTION, "Colegio San José");
    for i in 1..=n {
        let id = format!("s{i}");
        store = store.with_student(profile(&id, &format!("Estudiante {i}")));
        for phase in ["Fase I", "fase 2", "third"] {
            store = with_all_subjects(store, &id, phase, (i * 10) as f64);
        }
    }
    store
}

#[derive(Debug)]
pub struct FakeOutput {
    label: String,
    closed: bool,
}

impl OutputResource for FakeOutput {
    fn label(&self) -> &str {
        &self.label
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// 一次组装的起止时间
#[derive(Debug, Clone)]
pub struct Span {
    pub label: String,
    pub started: Instant,
    pub finished: Instant,
}

/// 记录调用情况的报告组装器
#[derive(Default)]
pub struct RecordingAssembler {
    pub assembled: Mutex<Vec<String>>,
    fail_for: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
    delay: Duration,
    slow: HashMap<String, Duration>,
    timeline: Mutex<Vec<Span>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, student_id: &str) -> Self {
        self.fail_for.insert(student_id.to_string());
        self
    }

    /// 组装到该学生时触发取消
    pub fn cancelling_on(mut self, student_id: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((student_id.to_string(), token));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 只让某个学生的组装变慢
    pub fn slow_for(mut self, student_id: &str, delay: Duration) -> Self {
        self.slow.insert(student_id.to_string(), delay);
        self
    }

    /// 按开始时间排序的组装记录
    pub fn timeline(&self) -> Vec<Span> {
        let mut spans = self.timeline.lock().unwrap().clone();
        spans.sort_by_key(|span| span.started);
        spans
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn assembled(&self) -> Vec<String> {
        self.assembled.lock().unwrap().clone()
    }
}

impl ReportAssembler for RecordingAssembler {
    fn assemble<'a>(
        &'a self,
        report: &'a StudentReport,
    ) -> BoxFuture<'a, AppResult<Box<dyn OutputResource>>> {
        Box::pin(async move {
            let started = Instant::now();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self
                .slow
                .get(&report.profile.id)
                .copied()
                .unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some((student_id, token)) = &self.cancel_on {
                if *student_id == report.profile.id {
                    token.cancel();
                }
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.contains(&report.profile.id) {
                return Err(AppError::assembly_failed(report.profile.id.clone(), "render failed"));
            }

            let label = format!("{}:{}", report.profile.id, report.phase.number());
            self.assembled.lock().unwrap().push(label.clone());
            self.timeline.lock().unwrap().push(Span {
                label: label.clone(),
                started,
                finished: Instant::now(),
            });
            let output: Box<dyn OutputResource> = Box::new(FakeOutput { label, closed: false });
            Ok(output)
        })
    }
}
