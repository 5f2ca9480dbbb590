//! SQLite-backed catalog and assessment store

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::catalog::{CatalogStore, Chapter, Difficulty, Question, QuestionOption, Tier, Topic};
use crate::session::{Attempt, Learner, QuizSession, SessionStatus, XpLogEntry};

use super::error::StoreError;
use super::migrations::Migrator;
use super::traits::{AssessmentStore, CompletionRecord};

/// SQLite-backed store implementing both [`CatalogStore`] and
/// [`AssessmentStore`] over one database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create database at path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Run migrations
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let migrator = Migrator::new(&conn);
        migrator.migrate()
    }

    // Seed-side inserts used by catalog loading and tests; the engine
    // itself never writes catalog rows or learners.

    pub fn insert_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO topics (id, name, grade_band) VALUES (?1, ?2, ?3)",
            rusqlite::params![topic.id, topic.name, topic.grade_band],
        )?;
        Ok(())
    }

    pub fn insert_chapter(&self, chapter: &Chapter) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chapters (id, topic_id, name) VALUES (?1, ?2, ?3)",
            rusqlite::params![chapter.id, chapter.topic_id, chapter.name],
        )?;
        Ok(())
    }

    pub fn insert_tier(&self, tier: &Tier) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tiers (id, chapter_id, name, order_index) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![tier.id, tier.chapter_id, tier.name, tier.order_index],
        )?;
        Ok(())
    }

    /// Insert a question together with its options
    pub fn insert_question(&self, question: &Question) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO questions (id, tier_id, text, difficulty, correct_option_id, correct_feedback, incorrect_feedback)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                question.id,
                question.tier_id,
                question.text,
                question.difficulty.as_str(),
                question.correct_option_id,
                question.correct_feedback,
                question.incorrect_feedback,
            ],
        )?;
        for (position, option) in question.options.iter().enumerate() {
            tx.execute(
                "INSERT INTO question_options (id, question_id, text, position) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![option.id, question.id, option.text, position as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_learner(&self, learner: &Learner) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO learners (id, name, xp, rank_score, status_tier, streak)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                learner.id,
                learner.name,
                learner.xp as i64,
                learner.rank_score,
                learner.status_tier,
                learner.streak,
            ],
        )?;
        Ok(())
    }

    fn question_options(conn: &Connection, question_id: &str) -> Result<Vec<QuestionOption>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, text FROM question_options WHERE question_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([question_id], |row| {
            Ok(QuestionOption {
                id: row.get(0)?,
                text: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Maps a question row; options are attached separately
    fn row_to_question(row: &rusqlite::Row) -> Result<Question, rusqlite::Error> {
        let difficulty_str: String = row.get(3)?;
        Ok(Question {
            id: row.get(0)?,
            tier_id: row.get(1)?,
            text: row.get(2)?,
            difficulty: Difficulty::parse(&difficulty_str).unwrap_or(Difficulty::Medium),
            options: Vec::new(),
            correct_option_id: row.get(4)?,
            correct_feedback: row.get(5)?,
            incorrect_feedback: row.get(6)?,
        })
    }

    fn row_to_session(row: &rusqlite::Row) -> Result<QuizSession, rusqlite::Error> {
        let status_str: String = row.get(3)?;
        Ok(QuizSession {
            id: row.get(0)?,
            learner_id: row.get(1)?,
            tier_id: row.get(2)?,
            status: SessionStatus::parse(&status_str).unwrap_or(SessionStatus::InProgress),
            score: row.get(4)?,
            attempt_count: row.get(5)?,
            time_spent_seconds: row.get(6)?,
            tab_switches: row.get(7)?,
            flagged: row.get(8)?,
            flag_reason: row.get(9)?,
            feedback: row.get(10)?,
            started_at: row.get(11)?,
            ended_at: row.get(12)?,
        })
    }

    fn row_to_attempt(row: &rusqlite::Row) -> Result<Attempt, rusqlite::Error> {
        Ok(Attempt {
            id: row.get(0)?,
            session_id: row.get(1)?,
            question_id: row.get(2)?,
            selected_option_id: row.get(3)?,
            is_correct: row.get(4)?,
            time_taken_seconds: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn row_to_learner(row: &rusqlite::Row) -> Result<Learner, rusqlite::Error> {
        let xp: i64 = row.get(2)?;
        Ok(Learner {
            id: row.get(0)?,
            name: row.get(1)?,
            xp: xp as u64,
            rank_score: row.get(3)?,
            status_tier: row.get(4)?,
            streak: row.get(5)?,
        })
    }
}

const SESSION_COLUMNS: &str = "id, learner_id, tier_id, status, score, attempt_count, \
     time_spent_seconds, tab_switches, flagged, flag_reason, feedback, started_at, ended_at";

const ATTEMPT_COLUMNS: &str =
    "id, session_id, question_id, selected_option_id, is_correct, time_taken_seconds, created_at";

impl CatalogStore for SqliteStore {
    fn topic(&self, id: &str) -> Result<Option<Topic>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name, grade_band FROM topics WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Topic {
                id: row.get(0)?,
                name: row.get(1)?,
                grade_band: row.get(2)?,
            })),
            None => Ok(None),
        }
    }

    fn chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, topic_id, name FROM chapters WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Chapter {
                id: row.get(0)?,
                topic_id: row.get(1)?,
                name: row.get(2)?,
            })),
            None => Ok(None),
        }
    }

    fn tier(&self, id: &str) -> Result<Option<Tier>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, chapter_id, name, order_index FROM tiers WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Tier {
                id: row.get(0)?,
                chapter_id: row.get(1)?,
                name: row.get(2)?,
                order_index: row.get(3)?,
            })),
            None => Ok(None),
        }
    }

    fn tiers_in_chapter(&self, chapter_id: &str) -> Result<Vec<Tier>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chapter_id, name, order_index FROM tiers
             WHERE chapter_id = ?1 ORDER BY order_index ASC",
        )?;
        let rows = stmt.query_map([chapter_id], |row| {
            Ok(Tier {
                id: row.get(0)?,
                chapter_id: row.get(1)?,
                name: row.get(2)?,
                order_index: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let question = {
            let mut stmt = conn.prepare(
                "SELECT id, tier_id, text, difficulty, correct_option_id, correct_feedback, incorrect_feedback
                 FROM questions WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Some(Self::row_to_question(row)?),
                None => None,
            }
        };
        match question {
            Some(mut question) => {
                question.options = Self::question_options(&conn, &question.id)?;
                Ok(Some(question))
            }
            None => Ok(None),
        }
    }

    fn questions_in_tier(&self, tier_id: &str) -> Result<Vec<Question>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut questions = {
            let mut stmt = conn.prepare(
                "SELECT id, tier_id, text, difficulty, correct_option_id, correct_feedback, incorrect_feedback
                 FROM questions WHERE tier_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([tier_id], |row| Self::row_to_question(row))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        for question in &mut questions {
            question.options = Self::question_options(&conn, &question.id)?;
        }
        Ok(questions)
    }
}

impl AssessmentStore for SqliteStore {
    fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO quiz_sessions (id, learner_id, tier_id, status, score, attempt_count,
                 time_spent_seconds, tab_switches, flagged, flag_reason, feedback, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                session.id,
                session.learner_id,
                session.tier_id,
                session.status.as_str(),
                session.score,
                session.attempt_count,
                session.time_spent_seconds,
                session.tab_switches,
                session.flagged,
                session.flag_reason,
                session.feedback,
                session.started_at,
                session.ended_at,
            ],
        )?;
        Ok(())
    }

    fn session(&self, id: &str) -> Result<Option<QuizSession>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE id = ?1"
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_session(row)?)),
            None => Ok(None),
        }
    }

    fn best_completed_score(
        &self,
        learner_id: &str,
        tier_id: &str,
    ) -> Result<Option<f64>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let best: Option<f64> = conn.query_row(
            "SELECT MAX(score) FROM quiz_sessions
             WHERE learner_id = ?1 AND tier_id = ?2 AND status = 'COMPLETED'",
            rusqlite::params![learner_id, tier_id],
            |row| row.get(0),
        )?;
        Ok(best)
    }

    fn completed_session_count(&self, learner_id: &str) -> Result<u32, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM quiz_sessions WHERE learner_id = ?1 AND status = 'COMPLETED'",
            [learner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn recent_completed_for_learner(
        &self,
        learner_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions
             WHERE learner_id = ?1 AND status = 'COMPLETED'
             ORDER BY ended_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(rusqlite::params![learner_id, limit], |row| {
            Self::row_to_session(row)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn recent_completed_on_tier(
        &self,
        learner_id: &str,
        tier_id: &str,
        exclude_session: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions
             WHERE learner_id = ?1 AND tier_id = ?2 AND id != ?3 AND status = 'COMPLETED'
             ORDER BY ended_at DESC, rowid DESC LIMIT ?4"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![learner_id, tier_id, exclude_session, limit],
            |row| Self::row_to_session(row),
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_attempt(&self, attempt: &Attempt) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE quiz_sessions SET attempt_count = attempt_count + 1 WHERE id = ?1",
            [&attempt.session_id],
        )?;
        if updated == 0 {
            return Err(StoreError::SessionNotFound(attempt.session_id.clone()));
        }
        tx.execute(
            "INSERT INTO attempts (id, session_id, question_id, selected_option_id, is_correct, time_taken_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                attempt.id,
                attempt.session_id,
                attempt.question_id,
                attempt.selected_option_id,
                attempt.is_correct,
                attempt.time_taken_seconds,
                attempt.created_at,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn attempts_for_session(&self, session_id: &str) -> Result<Vec<Attempt>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE session_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map([session_id], |row| Self::row_to_attempt(row))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn recent_attempts(&self, session_id: &str, limit: u32) -> Result<Vec<Attempt>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(rusqlite::params![session_id, limit], |row| {
            Self::row_to_attempt(row)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn learner(&self, id: &str) -> Result<Option<Learner>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, xp, rank_score, status_tier, streak FROM learners WHERE id = ?1")?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_learner(row)?)),
            None => Ok(None),
        }
    }

    fn complete_session(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // The IN_PROGRESS guard makes completion first-write-wins
        let updated = tx.execute(
            "UPDATE quiz_sessions SET status = 'COMPLETED', score = ?2, time_spent_seconds = ?3,
                 tab_switches = ?4, flagged = (flagged OR ?5), flag_reason = ?6, ended_at = ?7
             WHERE id = ?1 AND status = 'IN_PROGRESS'",
            rusqlite::params![
                record.session_id,
                record.score,
                record.time_spent_seconds,
                record.tab_switches,
                record.flagged,
                record.flag_reason,
                record.ended_at,
            ],
        )?;
        if updated == 0 {
            let exists: i32 = tx.query_row(
                "SELECT COUNT(*) FROM quiz_sessions WHERE id = ?1",
                [&record.session_id],
                |row| row.get(0),
            )?;
            return Err(if exists > 0 {
                StoreError::AlreadyCompleted(record.session_id.clone())
            } else {
                StoreError::SessionNotFound(record.session_id.clone())
            });
        }

        let updated = tx.execute(
            "UPDATE learners SET xp = xp + ?2, rank_score = rank_score + ?3, status_tier = ?4
             WHERE id = ?1",
            rusqlite::params![
                record.learner_id,
                record.xp_delta as i64,
                record.rank_score_delta,
                record.new_status_tier,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::LearnerNotFound(record.learner_id.clone()));
        }

        tx.execute(
            "INSERT INTO xp_log (learner_id, amount, reason, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.learner_id,
                record.xp_delta as i64,
                record.xp_reason,
                record.ended_at,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn attach_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE quiz_sessions SET feedback = ?2 WHERE id = ?1",
            rusqlite::params![session_id, feedback],
        )?;
        if updated == 0 {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    fn xp_log_for_learner(&self, learner_id: &str) -> Result<Vec<XpLogEntry>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, learner_id, amount, reason, created_at FROM xp_log
             WHERE learner_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([learner_id], |row| {
            let amount: i64 = row.get(2)?;
            Ok(XpLogEntry {
                id: row.get(0)?,
                learner_id: row.get(1)?,
                amount: amount as u64,
                reason: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
