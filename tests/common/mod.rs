//! 集成测试共用的假实现
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use quiz_submit_sync::clients::{Authenticator, RemoteStore};
use quiz_submit_sync::infrastructure::ConnectivityProbe;
use quiz_submit_sync::services::{BackoffPolicy, DeadLetterWriter};
use quiz_submit_sync::error::StoreError;
use quiz_submit_sync::storage::{DeliveryLedger, EnqueueOutcome, KeyValueStore, MemoryStore, Outbox};
use quiz_submit_sync::workflow::RetryPolicy;
use quiz_submit_sync::{
    PerformanceEntry, RemoteError, ResponseEntry, SubmissionDraft, SubmissionRecord, SyncWorker,
};

/// 让第一次成绩行插入停在半路
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// 按学生姓名预设结果的远端；没有预设时成功，同一学生的成绩行重复写入返回冲突
#[derive(Default)]
pub struct ScriptedRemote {
    performance_script: Mutex<HashMap<String, VecDeque<Result<(), RemoteError>>>>,
    responses_script: Mutex<HashMap<String, VecDeque<Result<(), RemoteError>>>>,
    /// 每次成绩行插入请求（学生姓名）
    pub performance_calls: Mutex<Vec<String>>,
    /// 每次作答行插入请求（学生姓名，行数）
    pub responses_calls: Mutex<Vec<(String, usize)>>,
    /// 成功写入的成绩行
    pub stored_performance: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl ScriptedRemote {
    pub fn fail_performance(&self, student: &str, err: RemoteError) {
        self.performance_script
            .lock()
            .unwrap()
            .entry(student.to_string())
            .or_default()
            .push_back(Err(err));
    }

    pub fn fail_responses(&self, student: &str, err: RemoteError) {
        self.responses_script
            .lock()
            .unwrap()
            .entry(student.to_string())
            .or_default()
            .push_back(Err(err));
    }

    pub fn set_gate(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn performance_calls(&self) -> Vec<String> {
        self.performance_calls.lock().unwrap().clone()
    }

    pub fn responses_calls(&self) -> Vec<(String, usize)> {
        self.responses_calls.lock().unwrap().clone()
    }

    pub fn stored_performance(&self) -> Vec<String> {
        self.stored_performance.lock().unwrap().clone()
    }

    fn next(
        script: &Mutex<HashMap<String, VecDeque<Result<(), RemoteError>>>>,
        student: &str,
    ) -> Result<(), RemoteError> {
        script
            .lock()
            .unwrap()
            .get_mut(student)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn insert_performance(&self, entry: &PerformanceEntry) -> Result<(), RemoteError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.performance_calls
            .lock()
            .unwrap()
            .push(entry.student_name.clone());
        let mut result = Self::next(&self.performance_script, &entry.student_name);
        // 模拟远端唯一约束
        if result.is_ok() && self.stored_performance().contains(&entry.student_name) {
            result = Err(conflict());
        }
        if result.is_ok() {
            self.stored_performance
                .lock()
                .unwrap()
                .push(entry.student_name.clone());
        }
        result
    }

    async fn insert_responses(&self, entries: &[ResponseEntry]) -> Result<(), RemoteError> {
        let student = entries
            .first()
            .and_then(|e| e.student_name.clone())
            .unwrap_or_default();
        self.responses_calls
            .lock()
            .unwrap()
            .push((student.clone(), entries.len()));
        Self::next(&self.responses_script, &student)
    }
}

#[derive(Default)]
pub struct CountingAuth {
    pub sign_outs: AtomicUsize,
}

impl CountingAuth {
    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuth {
    async fn sign_out(&self) {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeNetwork {
    online: AtomicBool,
}

impl FakeNetwork {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for FakeNetwork {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// 某个键的读取故障：先放行 `skip` 次，再失败 `fail` 次
struct ReadFault {
    key: String,
    skip: usize,
    fail: usize,
}

/// 内存存储，可以让指定键的某几次读取失败
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fault: Mutex<Option<ReadFault>>,
}

impl FlakyStore {
    pub fn fail_reads_of(&self, key: &str, skip: usize, fail: usize) {
        *self.fault.lock().unwrap() = Some(ReadFault {
            key: key.to_string(),
            skip,
            fail,
        });
    }

    fn should_fail(&self, key: &str) -> bool {
        let mut fault = self.fault.lock().unwrap();
        let Some(current) = fault.as_mut().filter(|f| f.key == key) else {
            return false;
        };
        if current.skip > 0 {
            current.skip -= 1;
            return false;
        }
        current.fail -= 1;
        if current.fail == 0 {
            *fault = None;
        }
        true
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.should_fail(key) {
            return Err(StoreError::ReadFailed {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk read error"),
            });
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub outbox: Arc<Outbox>,
    pub ledger: Arc<DeliveryLedger>,
    pub remote: Arc<ScriptedRemote>,
    pub auth: Arc<CountingAuth>,
    pub network: Arc<FakeNetwork>,
    pub worker: SyncWorker,
}

/// 不退避、不进死信的默认测试环境
pub fn harness() -> Harness {
    harness_with(
        RetryPolicy {
            backoff: BackoffPolicy::new(Duration::ZERO, Duration::ZERO),
            max_attempts: 0,
        },
        None,
    )
}

pub fn harness_with(policy: RetryPolicy, dead_letters: Option<DeadLetterWriter>) -> Harness {
    let store = Arc::new(FlakyStore::default());
    let outbox = Arc::new(Outbox::new(store.clone(), "quizapp"));
    let ledger = Arc::new(DeliveryLedger::new(store.clone(), "quizapp"));
    let remote = Arc::new(ScriptedRemote::default());
    let auth = Arc::new(CountingAuth::default());
    let network = Arc::new(FakeNetwork {
        online: AtomicBool::new(true),
    });

    let mut worker = SyncWorker::new(
        outbox.clone(),
        ledger.clone(),
        remote.clone(),
        auth.clone(),
        network.clone(),
    )
    .with_policy(policy);
    if let Some(writer) = dead_letters {
        worker = worker.with_dead_letter_writer(writer);
    }

    Harness {
        store,
        outbox,
        ledger,
        remote,
        auth,
        network,
        worker,
    }
}

/// 一次答题
pub fn attempt(section: &str, student: &str, score: f64, responses: usize) -> SubmissionDraft {
    let quiz_id = "quiz-42".to_string();
    let performance = PerformanceEntry {
        quiz_id: quiz_id.clone(),
        score,
        completion_time_seconds: None,
        student_name: student.to_string(),
        section_id: section.to_string(),
    };
    let rows = (0..responses)
        .map(|i| ResponseEntry {
            quiz_id: quiz_id.clone(),
            question_id: format!("q{}", i + 1),
            section_id: section.to_string(),
            student_name: Some(student.to_string()),
            answered_at: Utc::now(),
            time_spent_seconds: 15,
            is_correct: true,
            selected_option: serde_json::json!({ "index": i % 4 }),
            text_answer: None,
        })
        .collect();
    SubmissionDraft::new(performance, rows).unwrap()
}

pub fn enqueue(outbox: &Outbox, draft: SubmissionDraft) -> SubmissionRecord {
    match outbox.enqueue(draft).unwrap() {
        EnqueueOutcome::Admitted(record) => record,
        EnqueueOutcome::Duplicate { signature } => panic!("unexpected duplicate {}", signature),
    }
}

pub fn queued_students(outbox: &Outbox) -> Vec<String> {
    outbox
        .list()
        .iter()
        .map(|r| r.performance_entry().student_name.clone())
        .collect()
}

pub fn network_down() -> RemoteError {
    RemoteError::transport("TypeError: Failed to fetch")
}

pub fn unauthorized() -> RemoteError {
    RemoteError::rejected(401, Some("PGRST301"), "JWT expired")
}

pub fn conflict() -> RemoteError {
    RemoteError::rejected(
        409,
        Some("23505"),
        "duplicate key value violates unique constraint \"quiz_performance_pkey\"",
    )
}

pub fn server_error() -> RemoteError {
    RemoteError::rejected(500, Some("XX000"), "internal error")
}
