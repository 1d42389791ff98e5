//! The iteration store: bounded recency window, score tracking, dual-sink
//! persistence, and relevance retrieval.

use crate::archive::SqliteArchive;
use crate::error::{MemoryError, PersistenceWarning, Sink};
use crate::model::{Evaluation, FeedbackSynthesis, Iteration, UserEvaluation};
use crate::rank::{EmbeddingProvider, RankedIteration, Reranker};
use crate::session_file::SessionFileSink;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

/// Caller-supplied fields for one append.
#[derive(Debug, Clone)]
pub struct AppendRequest {
    /// Objective the content was generated for.
    pub prompt: String,
    /// Generated artifact.
    pub content: String,
    /// Evaluator output.
    pub ai_evaluation: Evaluation,
    /// Human ratings and comments.
    pub user_evaluation: UserEvaluation,
    /// Free-text human feedback on the evaluator.
    pub user_feedback_on_evaluator: String,
    /// Feedback synthesizer output.
    pub feedback_synthesis: FeedbackSynthesis,
}

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct Appended {
    /// The stored iteration.
    pub iteration: Iteration,
    /// Sink failures encountered while persisting; the in-memory append
    /// stands regardless.
    pub warnings: Vec<PersistenceWarning>,
}

/// Read projection consumed by the content creator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatorContext {
    /// Objective of the most recent iteration.
    pub prompt: Option<String>,
    /// Content of the most recent iteration.
    pub last_content: Option<String>,
    /// Content of the highest-scoring iteration so far.
    pub highest_scoring_content: Option<String>,
    /// Synthesized feedback from the most recent iteration.
    pub last_feedback: Option<String>,
    /// Synthesized feedback from the highest-scoring iteration.
    pub highest_scoring_feedback: Option<String>,
}

/// Read projection consumed by the evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluatorContext {
    /// Objective of the most recent iteration.
    pub prompt: Option<String>,
    /// Evaluator output from the most recent iteration.
    pub last_evaluation: Option<Evaluation>,
    /// Content of the most recent iteration.
    pub last_content: Option<String>,
    /// Content of the highest-scoring iteration so far.
    pub highest_scoring_content: Option<String>,
    /// Synthesized feedback from the most recent iteration.
    pub last_feedback: Option<String>,
}

/// Construction options for an [`IterationStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Directory for per-session log files.
    pub root: PathBuf,
    /// Path of the cross-session SQLite archive.
    pub archive_path: PathBuf,
    /// Bound on the in-memory recency window.
    pub max_size: usize,
    /// Criterion names user evaluations are validated against.
    pub criteria: BTreeSet<String>,
}

/// Append-only iteration log with a bounded in-memory recency window.
///
/// There is exactly one logical writer per process; the store performs no
/// internal locking beyond the file sink's write serialization.
pub struct IterationStore {
    session_id: String,
    window: VecDeque<Iteration>,
    max_size: usize,
    next_id: u64,
    highest: Option<Iteration>,
    criteria: BTreeSet<String>,
    files: SessionFileSink,
    archive: SqliteArchive,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
}

impl IterationStore {
    /// Open a store with a fresh session.
    pub fn open(
        options: StoreOptions,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
    ) -> Result<Self, MemoryError> {
        if options.max_size == 0 {
            return Err(MemoryError::Validation(
                "window size must be at least 1".to_string(),
            ));
        }
        if options.criteria.is_empty() {
            return Err(MemoryError::Validation(
                "criteria schema must not be empty".to_string(),
            ));
        }
        let files = SessionFileSink::new(&options.root)?;
        let archive = SqliteArchive::open(&options.archive_path)?;
        let session_id = fresh_session_token();
        info!(
            "opened iteration store (session_id={}, max_size={})",
            session_id, options.max_size
        );
        Ok(Self {
            session_id,
            window: VecDeque::new(),
            max_size: options.max_size,
            next_id: 1,
            highest: None,
            criteria: options.criteria,
            files,
            archive,
            embedder,
            reranker,
        })
    }

    /// Current session token.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of iterations in the in-memory window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the in-memory window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Iterations currently in the window, oldest first.
    pub fn iterations(&self) -> impl Iterator<Item = &Iteration> {
        self.window.iter()
    }

    /// Up to `n` most recent iterations, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&Iteration> {
        let start = self.window.len().saturating_sub(n);
        self.window.iter().skip(start).collect()
    }

    /// The highest-scoring iteration observed this session, if any.
    pub fn highest_scoring(&self) -> Option<&Iteration> {
        self.highest.as_ref()
    }

    /// Append one iteration.
    ///
    /// Validates before any mutation, assigns id and timestamp, updates the
    /// window and the highest-scoring pointer, then persists to both sinks
    /// best-effort. Sink failures are returned as warnings, never rolled
    /// back.
    pub async fn append(&mut self, request: AppendRequest) -> Result<Appended, MemoryError> {
        self.validate(&request)?;

        let iteration = Iteration {
            id: self.next_id,
            session_id: self.session_id.clone(),
            timestamp: Utc::now(),
            prompt: request.prompt,
            content: request.content,
            ai_evaluation: request.ai_evaluation,
            user_evaluation: request.user_evaluation,
            user_feedback_on_evaluator: request.user_feedback_on_evaluator,
            feedback_synthesis: request.feedback_synthesis,
        };
        self.next_id += 1;

        if self.window.len() == self.max_size {
            let evicted = self.window.pop_front();
            if let Some(evicted) = evicted {
                debug!(
                    "evicted oldest window entry (session_id={}, iteration_id={})",
                    self.session_id, evicted.id
                );
            }
        }
        self.window.push_back(iteration.clone());
        self.update_highest(&iteration);

        let mut warnings = Vec::new();
        if let Err(err) = self.persist_session_log(&iteration) {
            warn!(
                "session log write failed (session_id={}, err={err})",
                self.session_id
            );
            warnings.push(PersistenceWarning {
                sink: Sink::SessionFile,
                message: err.to_string(),
            });
        }

        let embedding = match self.embedder.embed(&iteration.content).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(
                    "embedding unavailable, archiving without vector (session_id={}, err={err})",
                    self.session_id
                );
                None
            }
        };
        if let Err(err) = self.archive.insert(&iteration, embedding.as_deref()) {
            warn!(
                "archive insert failed (session_id={}, err={err})",
                self.session_id
            );
            warnings.push(PersistenceWarning {
                sink: Sink::Archive,
                message: err.to_string(),
            });
        }

        debug!(
            "appended iteration (session_id={}, iteration_id={}, total_score={:?})",
            self.session_id,
            iteration.id,
            iteration.total_score()
        );
        Ok(Appended { iteration, warnings })
    }

    /// Context for the content creator's next prompt. Pure read.
    pub fn content_creator_context(&self) -> CreatorContext {
        let last = self.window.back();
        CreatorContext {
            prompt: last.map(|iteration| iteration.prompt.clone()),
            last_content: last.map(|iteration| iteration.content.clone()),
            highest_scoring_content: self
                .highest
                .as_ref()
                .map(|iteration| iteration.content.clone()),
            last_feedback: last.map(|iteration| iteration.feedback_synthesis.display_text()),
            highest_scoring_feedback: self
                .highest
                .as_ref()
                .map(|iteration| iteration.feedback_synthesis.display_text()),
        }
    }

    /// Context for the evaluator's next prompt. Pure read.
    pub fn evaluator_context(&self) -> EvaluatorContext {
        let last = self.window.back();
        EvaluatorContext {
            prompt: last.map(|iteration| iteration.prompt.clone()),
            last_evaluation: last.map(|iteration| iteration.ai_evaluation.clone()),
            last_content: last.map(|iteration| iteration.content.clone()),
            highest_scoring_content: self
                .highest
                .as_ref()
                .map(|iteration| iteration.content.clone()),
            last_feedback: last.map(|iteration| iteration.feedback_synthesis.display_text()),
        }
    }

    /// Restore the window from a session log file.
    ///
    /// With no token, the lexically latest session under the root is
    /// loaded. A missing file leaves the store empty; a malformed file is
    /// reported as a warning and leaves the store empty.
    pub fn load(&mut self, session_id: Option<&str>) -> Vec<PersistenceWarning> {
        let token = match session_id {
            Some(token) => token.to_string(),
            None => match self.files.latest_token() {
                Ok(Some(token)) => token,
                Ok(None) => {
                    debug!("no session logs found, starting empty");
                    return Vec::new();
                }
                Err(err) => {
                    warn!("session log scan failed (err={err})");
                    return vec![PersistenceWarning {
                        sink: Sink::SessionFile,
                        message: err.to_string(),
                    }];
                }
            },
        };

        match self.files.load(&token) {
            Ok(Some(iterations)) => {
                self.reset(token.clone());
                self.next_id = iterations
                    .iter()
                    .map(|iteration| iteration.id)
                    .max()
                    .unwrap_or(0)
                    + 1;
                for iteration in &iterations {
                    self.update_highest(iteration);
                }
                let start = iterations.len().saturating_sub(self.max_size);
                self.window = iterations[start..].iter().cloned().collect();
                info!(
                    "restored session (session_id={}, iterations={}, window={})",
                    self.session_id,
                    self.next_id - 1,
                    self.window.len()
                );
                Vec::new()
            }
            Ok(None) => {
                debug!("session log missing, starting empty (token={token})");
                self.reset(token);
                Vec::new()
            }
            Err(err) => {
                warn!("session log unreadable, starting empty (token={token}, err={err})");
                vec![PersistenceWarning {
                    sink: Sink::SessionFile,
                    message: err.to_string(),
                }]
            }
        }
    }

    /// Start a fresh session: new token, empty window, reset counter.
    ///
    /// Archived rows from earlier sessions are untouched and stay
    /// reachable through relevance retrieval.
    pub fn start_new_session(&mut self) {
        let token = fresh_session_token();
        info!(
            "starting new session (previous={}, session_id={token})",
            self.session_id
        );
        self.reset(token);
    }

    /// Archived iterations most relevant to `query`, best first.
    ///
    /// Ranks across every session in the archive. An empty archive returns
    /// an empty result without consulting the reranker; a reranker failure
    /// degrades to an empty result.
    pub async fn relevant_iterations(&self, query: &str, top_n: usize) -> Vec<RankedIteration> {
        let rows = match self.archive.contents() {
            Ok(rows) => rows,
            Err(err) => {
                warn!("archive scan failed, skipping retrieval (err={err})");
                return Vec::new();
            }
        };
        if rows.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let documents: Vec<String> = rows.iter().map(|(_, content)| content.clone()).collect();
        let ranked = match self.reranker.rerank(query, &documents).await {
            Ok(ranked) => ranked,
            Err(err) => {
                warn!("relevance retrieval unavailable (err={err})");
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for entry in ranked.into_iter().take(top_n) {
            let Some((rowid, _)) = rows.get(entry.index) else {
                warn!(
                    "reranker returned out-of-range index (index={}, documents={})",
                    entry.index,
                    documents.len()
                );
                continue;
            };
            match self.archive.fetch(*rowid) {
                Ok(Some(record)) => results.push(RankedIteration {
                    record,
                    relevance_score: entry.relevance_score,
                }),
                Ok(None) => warn!("archived row vanished during retrieval (rowid={rowid})"),
                Err(err) => warn!("archive fetch failed (rowid={rowid}, err={err})"),
            }
        }
        debug!(
            "relevance retrieval (query_len={}, candidates={}, returned={})",
            query.len(),
            documents.len(),
            results.len()
        );
        results
    }

    /// Validate one append request against the criteria schema.
    fn validate(&self, request: &AppendRequest) -> Result<(), MemoryError> {
        if request.user_evaluation.scores.is_empty() {
            return Err(MemoryError::Validation(
                "user evaluation must score at least one criterion".to_string(),
            ));
        }
        for (criterion, score) in &request.user_evaluation.scores {
            if !self.criteria.contains(criterion) {
                return Err(MemoryError::Validation(format!(
                    "unknown criterion: {criterion}"
                )));
            }
            if !(0.0..=10.0).contains(score) {
                return Err(MemoryError::Validation(format!(
                    "score out of range for {criterion}: {score}"
                )));
            }
        }
        Ok(())
    }

    /// Replace the highest-scoring pointer when strictly exceeded.
    /// Ties keep the earlier holder.
    fn update_highest(&mut self, iteration: &Iteration) {
        let Some(score) = iteration.total_score() else {
            return;
        };
        let current = self.highest.as_ref().and_then(Iteration::total_score);
        if current.is_none_or(|current| score > current) {
            self.highest = Some(iteration.clone());
        }
    }

    /// Rewrite the session log with the new iteration appended.
    ///
    /// The file holds the full session log, not the bounded window, so the
    /// existing log is read back before the rewrite.
    fn persist_session_log(&self, iteration: &Iteration) -> Result<(), MemoryError> {
        let mut log = match self.files.load(&self.session_id) {
            Ok(Some(existing)) => existing,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    "existing session log unreadable, rewriting (session_id={}, err={err})",
                    self.session_id
                );
                Vec::new()
            }
        };
        log.push(iteration.clone());
        self.files.write(&self.session_id, &log)
    }

    /// Clear per-session state and adopt a session token.
    fn reset(&mut self, token: String) {
        self.session_id = token;
        self.window.clear();
        self.highest = None;
        self.next_id = 1;
    }
}

/// Timestamp-derived session token; lexical order is temporal order.
fn fresh_session_token() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::{AppendRequest, IterationStore, StoreOptions};
    use crate::error::RankingError;
    use crate::model::{Evaluation, FeedbackSynthesis, UserEvaluation};
    use crate::rank::{EmbeddingProvider, RankedIndex, Reranker};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RankingError> {
            Ok(vec![0.1, 0.2])
        }
    }

    /// Ranks documents in submission order and counts invocations.
    struct CountingReranker {
        calls: AtomicUsize,
    }

    impl CountingReranker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Reranker for CountingReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
        ) -> Result<Vec<RankedIndex>, RankingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..documents.len())
                .map(|index| RankedIndex {
                    index,
                    relevance_score: 1.0 - index as f32 * 0.1,
                })
                .collect())
        }
    }

    /// Always ranks the last submitted document first.
    struct ReverseReranker;

    #[async_trait]
    impl Reranker for ReverseReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
        ) -> Result<Vec<RankedIndex>, RankingError> {
            Ok((0..documents.len())
                .rev()
                .enumerate()
                .map(|(rank, index)| RankedIndex {
                    index,
                    relevance_score: 1.0 - rank as f32 * 0.1,
                })
                .collect())
        }
    }

    struct FailingReranker;

    #[async_trait]
    impl Reranker for FailingReranker {
        async fn rerank(
            &self,
            _query: &str,
            _documents: &[String],
        ) -> Result<Vec<RankedIndex>, RankingError> {
            Err(RankingError::Transport("connection refused".to_string()))
        }
    }

    fn criteria() -> BTreeSet<String> {
        ["Content Quality", "Structure and Clarity"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn options(root: &Path, max_size: usize) -> StoreOptions {
        StoreOptions {
            root: root.to_path_buf(),
            archive_path: root.join("iterations.sqlite3"),
            max_size,
            criteria: criteria(),
        }
    }

    fn store_with(root: &Path, max_size: usize, reranker: Arc<dyn Reranker>) -> IterationStore {
        IterationStore::open(options(root, max_size), Arc::new(StubEmbedder), reranker)
            .expect("store")
    }

    fn store(root: &Path, max_size: usize) -> IterationStore {
        store_with(root, max_size, Arc::new(ReverseReranker))
    }

    fn request(content: &str, mean: f64) -> AppendRequest {
        // Two criteria straddling the requested mean.
        let mut scores = BTreeMap::new();
        scores.insert("Content Quality".to_string(), (mean + 1.0).min(10.0));
        scores.insert(
            "Structure and Clarity".to_string(),
            mean - ((mean + 1.0).min(10.0) - mean),
        );
        AppendRequest {
            prompt: "write about rust".to_string(),
            content: content.to_string(),
            ai_evaluation: Evaluation::Raw {
                text: "fine".to_string(),
            },
            user_evaluation: UserEvaluation {
                scores,
                feedback: BTreeMap::new(),
            },
            user_feedback_on_evaluator: String::new(),
            feedback_synthesis: FeedbackSynthesis::Raw {
                text: format!("feedback for {content}"),
            },
        }
    }

    #[tokio::test]
    async fn ids_increase_and_timestamps_never_go_backwards() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        for index in 0..3 {
            store
                .append(request(&format!("content {index}"), 5.0))
                .await
                .expect("append");
        }

        let ids: Vec<u64> = store.iterations().map(|iteration| iteration.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let timestamps: Vec<_> = store
            .iterations()
            .map(|iteration| iteration.timestamp)
            .collect();
        assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn append_validates_before_mutating() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        let mut bad_score = request("content", 5.0);
        bad_score
            .user_evaluation
            .scores
            .insert("Content Quality".to_string(), 11.0);
        assert!(store.append(bad_score).await.is_err());

        let mut unknown = request("content", 5.0);
        unknown
            .user_evaluation
            .scores
            .insert("Sense of Humor".to_string(), 5.0);
        assert!(store.append(unknown).await.is_err());

        let mut empty = request("content", 5.0);
        empty.user_evaluation.scores.clear();
        assert!(store.append(empty).await.is_err());

        assert!(store.is_empty());
        assert_eq!(store.highest_scoring(), None);
    }

    #[tokio::test]
    async fn derived_score_equals_recomputed_mean() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        let appended = store.append(request("content", 8.5)).await.expect("append");
        let iteration = appended.iteration;
        assert_eq!(iteration.total_score(), iteration.user_evaluation.mean_score());
        assert_eq!(iteration.total_score(), Some(8.5));
    }

    #[tokio::test]
    async fn window_evicts_oldest_first() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 3);

        for index in 1..=5 {
            store
                .append(request(&format!("content {index}"), 5.0))
                .await
                .expect("append");
        }

        assert_eq!(store.len(), 3);
        let ids: Vec<u64> = store.iterations().map(|iteration| iteration.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn highest_scoring_tracks_maximum_and_ties_keep_earlier() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        store.append(request("first", 8.0)).await.expect("append");
        store.append(request("best", 9.0)).await.expect("append");
        store.append(request("worst", 3.0)).await.expect("append");

        let highest = store.highest_scoring().expect("highest");
        assert_eq!(highest.content, "best");
        assert_eq!(highest.total_score(), Some(9.0));
        let ids: Vec<u64> = store.iterations().map(|iteration| iteration.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        store.append(request("tied", 9.0)).await.expect("append");
        assert_eq!(store.highest_scoring().expect("highest").content, "best");
    }

    #[tokio::test]
    async fn contexts_are_empty_on_a_fresh_store() {
        let temp = tempdir().expect("tempdir");
        let store = store(temp.path(), 10);

        let creator = store.content_creator_context();
        assert_eq!(creator.prompt, None);
        assert_eq!(creator.last_content, None);
        assert_eq!(creator.highest_scoring_content, None);
        assert_eq!(creator.last_feedback, None);
        assert_eq!(creator.highest_scoring_feedback, None);

        let evaluator = store.evaluator_context();
        assert_eq!(evaluator.last_evaluation, None);
        assert_eq!(evaluator.last_content, None);
    }

    #[tokio::test]
    async fn contexts_reflect_last_and_highest_iterations() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        store.append(request("best", 9.0)).await.expect("append");
        store.append(request("latest", 4.0)).await.expect("append");

        let creator = store.content_creator_context();
        assert_eq!(creator.last_content.as_deref(), Some("latest"));
        assert_eq!(creator.highest_scoring_content.as_deref(), Some("best"));
        assert_eq!(
            creator.last_feedback.as_deref(),
            Some("feedback for latest")
        );

        let evaluator = store.evaluator_context();
        assert_eq!(evaluator.last_content.as_deref(), Some("latest"));
        assert_eq!(evaluator.highest_scoring_content.as_deref(), Some("best"));
    }

    #[tokio::test]
    async fn new_session_clears_window_but_archive_survives() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        store.append(request("archived", 7.0)).await.expect("append");
        let previous_session = store.session_id().to_string();

        store.start_new_session();
        assert_ne!(store.session_id(), previous_session);
        assert!(store.is_empty());
        assert_eq!(store.content_creator_context(), Default::default());

        let relevant = store.relevant_iterations("archived", 5).await;
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].record.content, "archived");
        assert_eq!(relevant[0].record.session_id, previous_session);
    }

    #[tokio::test]
    async fn reload_restores_the_session_log() {
        let temp = tempdir().expect("tempdir");
        let token;
        {
            let mut store = store(temp.path(), 10);
            for index in 1..=3 {
                store
                    .append(request(&format!("content {index}"), 5.0 + index as f64))
                    .await
                    .expect("append");
            }
            token = store.session_id().to_string();
        }

        let mut restored = store(temp.path(), 10);
        let warnings = restored.load(None);
        assert!(warnings.is_empty());
        assert_eq!(restored.session_id(), token);
        assert_eq!(restored.len(), 3);

        let contents: Vec<&str> = restored
            .iterations()
            .map(|iteration| iteration.content.as_str())
            .collect();
        assert_eq!(contents, vec!["content 1", "content 2", "content 3"]);
        assert_eq!(
            restored.highest_scoring().expect("highest").content,
            "content 3"
        );

        let appended = restored.append(request("content 4", 5.0)).await.expect("append");
        assert_eq!(appended.iteration.id, 4);
    }

    #[tokio::test]
    async fn reload_with_missing_file_starts_empty() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);
        let warnings = store.load(Some("20200101_000000_000"));
        assert!(warnings.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reload_with_malformed_file_warns_and_stays_empty() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("session_bad.json"), "not json").expect("write");

        let mut store = store(temp.path(), 10);
        let warnings = store.load(Some("bad"));
        assert_eq!(warnings.len(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn empty_store_retrieval_never_calls_the_reranker() {
        let temp = tempdir().expect("tempdir");
        let reranker = CountingReranker::new();
        let store = store_with(temp.path(), 10, reranker.clone());

        let relevant = store.relevant_iterations("anything", 5).await;
        assert!(relevant.is_empty());
        assert_eq!(reranker.calls(), 0);
    }

    #[tokio::test]
    async fn retrieval_orders_by_rank_and_truncates() {
        let temp = tempdir().expect("tempdir");
        let mut store = store(temp.path(), 10);

        for content in ["alpha", "beta", "gamma"] {
            store.append(request(content, 5.0)).await.expect("append");
        }

        // ReverseReranker puts the newest document first.
        let relevant = store.relevant_iterations("query", 2).await;
        let contents: Vec<&str> = relevant
            .iter()
            .map(|ranked| ranked.record.content.as_str())
            .collect();
        assert_eq!(contents, vec!["gamma", "beta"]);
        assert!(relevant[0].relevance_score >= relevant[1].relevance_score);
    }

    #[tokio::test]
    async fn reranker_failure_degrades_to_empty() {
        let temp = tempdir().expect("tempdir");
        let mut store = store_with(temp.path(), 10, Arc::new(FailingReranker));

        store.append(request("content", 5.0)).await.expect("append");
        let relevant = store.relevant_iterations("query", 5).await;
        assert!(relevant.is_empty());
    }

    #[tokio::test]
    async fn session_log_outlives_the_window() {
        let temp = tempdir().expect("tempdir");
        let mut writer = store(temp.path(), 2);

        for index in 1..=4 {
            writer
                .append(request(&format!("content {index}"), 5.0))
                .await
                .expect("append");
        }
        assert_eq!(writer.len(), 2);
        let token = writer.session_id().to_string();

        let mut restored = store(temp.path(), 10);
        restored.load(Some(&token));
        // The file kept all four iterations even though the window held two.
        assert_eq!(restored.len(), 4);
    }
}
