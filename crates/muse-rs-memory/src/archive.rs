//! Cross-session SQLite archive of iterations.
//!
//! One row per iteration across every session this store has ever seen.
//! Rows are insert-only; the surrogate key is independent of the
//! per-session iteration id.

use crate::error::MemoryError;
use crate::model::{Evaluation, FeedbackSynthesis, Iteration, UserEvaluation};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS iterations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    prompt TEXT NOT NULL,
    content TEXT NOT NULL,
    ai_evaluation TEXT NOT NULL,
    user_evaluation TEXT NOT NULL,
    user_feedback_on_evaluator TEXT NOT NULL,
    feedback_synthesis TEXT NOT NULL,
    derived_total_score REAL,
    embedding BLOB
);
";

/// One re-hydrated archive row.
///
/// Carries the denormalized total score as stored; the authoritative value
/// is always recomputable from `user_evaluation`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedIteration {
    /// Session the iteration belonged to.
    pub session_id: String,
    /// Creation time of the iteration.
    pub timestamp: DateTime<Utc>,
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
    /// Mean human score at the time the row was written.
    pub derived_total_score: Option<f64>,
}

/// SQLite-backed iteration archive.
pub struct SqliteArchive {
    conn: Connection,
}

impl SqliteArchive {
    /// Open (or create) the archive at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("opened iteration archive (path={})", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory archive, used by tests.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert one iteration row, returning the surrogate row id.
    ///
    /// The embedding is whatever the embedder produced for this content at
    /// append time; rows are never updated, so it is computed at most once.
    pub fn insert(
        &self,
        iteration: &Iteration,
        embedding: Option<&[f32]>,
    ) -> Result<i64, MemoryError> {
        self.conn.execute(
            "INSERT INTO iterations (
                session_id, timestamp, prompt, content,
                ai_evaluation, user_evaluation, user_feedback_on_evaluator,
                feedback_synthesis, derived_total_score, embedding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                iteration.session_id,
                iteration.timestamp,
                iteration.prompt,
                iteration.content,
                serde_json::to_string(&iteration.ai_evaluation)?,
                serde_json::to_string(&iteration.user_evaluation)?,
                iteration.user_feedback_on_evaluator,
                serde_json::to_string(&iteration.feedback_synthesis)?,
                iteration.total_score(),
                embedding.map(encode_embedding),
            ],
        )?;
        let rowid = self.conn.last_insert_rowid();
        debug!(
            "archived iteration (session_id={}, iteration_id={}, rowid={})",
            iteration.session_id, iteration.id, rowid
        );
        Ok(rowid)
    }

    /// All `(rowid, content)` pairs across every session, in insert order.
    pub fn contents(&self) -> Result<Vec<(i64, String)>, MemoryError> {
        let mut statement = self
            .conn
            .prepare("SELECT id, content FROM iterations ORDER BY id")?;
        let rows = statement.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut contents = Vec::new();
        for row in rows {
            contents.push(row?);
        }
        Ok(contents)
    }

    /// Re-hydrate one row by surrogate id.
    pub fn fetch(&self, rowid: i64) -> Result<Option<ArchivedIteration>, MemoryError> {
        let row = self
            .conn
            .query_row(
                "SELECT session_id, timestamp, prompt, content,
                        ai_evaluation, user_evaluation, user_feedback_on_evaluator,
                        feedback_synthesis, derived_total_score
                 FROM iterations WHERE id = ?1",
                params![rowid],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, DateTime<Utc>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ArchivedIteration {
            session_id: row.0,
            timestamp: row.1,
            prompt: row.2,
            content: row.3,
            ai_evaluation: serde_json::from_str(&row.4)?,
            user_evaluation: serde_json::from_str(&row.5)?,
            user_feedback_on_evaluator: row.6,
            feedback_synthesis: serde_json::from_str(&row.7)?,
            derived_total_score: row.8,
        }))
    }

    /// Stored embedding for one row, when present.
    pub fn embedding(&self, rowid: i64) -> Result<Option<Vec<f32>>, MemoryError> {
        let blob = self
            .conn
            .query_row(
                "SELECT embedding FROM iterations WHERE id = ?1",
                params![rowid],
                |row| row.get::<_, Option<Vec<u8>>>(0),
            )
            .optional()?;
        Ok(blob.flatten().map(|bytes| decode_embedding(&bytes)))
    }

    /// Number of archived rows.
    pub fn len(&self) -> Result<usize, MemoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM iterations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the archive holds no rows.
    pub fn is_empty(&self) -> Result<bool, MemoryError> {
        Ok(self.len()? == 0)
    }
}

/// Encode an embedding as a little-endian f32 blob.
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 blob back into an embedding.
fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{SqliteArchive, decode_embedding, encode_embedding};
    use crate::model::{Evaluation, FeedbackSynthesis, Iteration, UserEvaluation};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn iteration(session_id: &str, content: &str, score: f64) -> Iteration {
        let mut scores = BTreeMap::new();
        scores.insert("Content Quality".to_string(), score);
        Iteration {
            id: 1,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
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
                text: "keep going".to_string(),
            },
        }
    }

    #[test]
    fn insert_and_fetch_round_trip() {
        let archive = SqliteArchive::open_in_memory().expect("archive");
        let original = iteration("s1", "rust ownership essay", 8.0);
        let rowid = archive
            .insert(&original, Some(&[0.25, -1.5]))
            .expect("insert");

        let record = archive.fetch(rowid).expect("fetch").expect("record");
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.prompt, original.prompt);
        assert_eq!(record.content, original.content);
        assert_eq!(record.ai_evaluation, original.ai_evaluation);
        assert_eq!(record.user_evaluation, original.user_evaluation);
        assert_eq!(record.derived_total_score, Some(8.0));

        let embedding = archive.embedding(rowid).expect("embedding");
        assert_eq!(embedding, Some(vec![0.25, -1.5]));
    }

    #[test]
    fn contents_preserves_insert_order() {
        let archive = SqliteArchive::open_in_memory().expect("archive");
        archive
            .insert(&iteration("s1", "first", 5.0), None)
            .expect("insert first");
        archive
            .insert(&iteration("s2", "second", 6.0), None)
            .expect("insert second");

        let contents = archive.contents().expect("contents");
        let texts: Vec<&str> = contents.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(archive.len().expect("len"), 2);
    }

    #[test]
    fn missing_row_fetches_as_none() {
        let archive = SqliteArchive::open_in_memory().expect("archive");
        assert_eq!(archive.fetch(42).expect("fetch"), None);
        assert!(archive.is_empty().expect("is_empty"));
    }

    #[test]
    fn embedding_blob_round_trip() {
        let embedding = vec![1.0_f32, -0.5, 3.25];
        assert_eq!(decode_embedding(&encode_embedding(&embedding)), embedding);
    }
}
