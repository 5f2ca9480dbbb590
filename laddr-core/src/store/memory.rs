//! In-memory store for tests and demo runs

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::catalog::{CatalogStore, Chapter, Question, Tier, Topic};
use crate::session::{Attempt, Learner, QuizSession, SessionStatus, XpLogEntry};

use super::error::StoreError;
use super::traits::{AssessmentStore, CompletionRecord};

#[derive(Default)]
struct Inner {
    topics: HashMap<String, Topic>,
    chapters: HashMap<String, Chapter>,
    tiers: HashMap<String, Tier>,
    questions: HashMap<String, Question>,
    learners: HashMap<String, Learner>,
    sessions: HashMap<String, QuizSession>,
    /// Insertion order doubles as attempt chronology
    attempts: Vec<Attempt>,
    xp_log: Vec<XpLogEntry>,
}

/// In-memory implementation of both store traits
///
/// A single lock guards all tables so the completion check-and-set is
/// atomic, matching the SQLite transaction semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seed-side inserts used by catalog loading and tests; the engine
    // itself never calls these.

    pub fn insert_topic(&self, topic: Topic) {
        self.inner.lock().unwrap().topics.insert(topic.id.clone(), topic);
    }

    pub fn insert_chapter(&self, chapter: Chapter) {
        self.inner
            .lock()
            .unwrap()
            .chapters
            .insert(chapter.id.clone(), chapter);
    }

    pub fn insert_tier(&self, tier: Tier) {
        self.inner.lock().unwrap().tiers.insert(tier.id.clone(), tier);
    }

    pub fn insert_question(&self, question: Question) {
        self.inner
            .lock()
            .unwrap()
            .questions
            .insert(question.id.clone(), question);
    }

    pub fn insert_learner(&self, learner: Learner) {
        self.inner
            .lock()
            .unwrap()
            .learners
            .insert(learner.id.clone(), learner);
    }
}

impl CatalogStore for MemoryStore {
    fn topic(&self, id: &str) -> Result<Option<Topic>, StoreError> {
        Ok(self.inner.lock().unwrap().topics.get(id).cloned())
    }

    fn chapter(&self, id: &str) -> Result<Option<Chapter>, StoreError> {
        Ok(self.inner.lock().unwrap().chapters.get(id).cloned())
    }

    fn tier(&self, id: &str) -> Result<Option<Tier>, StoreError> {
        Ok(self.inner.lock().unwrap().tiers.get(id).cloned())
    }

    fn tiers_in_chapter(&self, chapter_id: &str) -> Result<Vec<Tier>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut tiers: Vec<Tier> = inner
            .tiers
            .values()
            .filter(|t| t.chapter_id == chapter_id)
            .cloned()
            .collect();
        tiers.sort_by_key(|t| t.order_index);
        Ok(tiers)
    }

    fn question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        Ok(self.inner.lock().unwrap().questions.get(id).cloned())
    }

    fn questions_in_tier(&self, tier_id: &str) -> Result<Vec<Question>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .questions
            .values()
            .filter(|q| q.tier_id == tier_id)
            .cloned()
            .collect())
    }
}

impl AssessmentStore for MemoryStore {
    fn insert_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn session(&self, id: &str) -> Result<Option<QuizSession>, StoreError> {
        Ok(self.inner.lock().unwrap().sessions.get(id).cloned())
    }

    fn best_completed_score(
        &self,
        learner_id: &str,
        tier_id: &str,
    ) -> Result<Option<f64>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let best = inner
            .sessions
            .values()
            .filter(|s| {
                s.learner_id == learner_id
                    && s.tier_id == tier_id
                    && s.status == SessionStatus::Completed
            })
            .map(|s| s.score)
            .fold(None, |acc: Option<f64>, score| {
                Some(acc.map_or(score, |a| a.max(score)))
            });
        Ok(best)
    }

    fn completed_session_count(&self, learner_id: &str) -> Result<u32, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.learner_id == learner_id && s.status == SessionStatus::Completed)
            .count() as u32)
    }

    fn recent_completed_for_learner(
        &self,
        learner_id: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<QuizSession> = inner
            .sessions
            .values()
            .filter(|s| s.learner_id == learner_id && s.status == SessionStatus::Completed)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    fn recent_completed_on_tier(
        &self,
        learner_id: &str,
        tier_id: &str,
        exclude_session: &str,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<QuizSession> = inner
            .sessions
            .values()
            .filter(|s| {
                s.learner_id == learner_id
                    && s.tier_id == tier_id
                    && s.id != exclude_session
                    && s.status == SessionStatus::Completed
            })
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    fn insert_attempt(&self, attempt: &Attempt) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(&attempt.session_id)
            .ok_or_else(|| StoreError::SessionNotFound(attempt.session_id.clone()))?;
        session.attempt_count += 1;
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    fn attempts_for_session(&self, session_id: &str) -> Result<Vec<Attempt>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    fn recent_attempts(&self, session_id: &str, limit: u32) -> Result<Vec<Attempt>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.session_id == session_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn learner(&self, id: &str) -> Result<Option<Learner>, StoreError> {
        Ok(self.inner.lock().unwrap().learners.get(id).cloned())
    }

    fn complete_session(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        // Validate everything before mutating so a failure writes nothing
        match inner.sessions.get(&record.session_id) {
            None => return Err(StoreError::SessionNotFound(record.session_id.clone())),
            Some(s) if s.status == SessionStatus::Completed => {
                return Err(StoreError::AlreadyCompleted(record.session_id.clone()));
            }
            Some(_) => {}
        }
        if !inner.learners.contains_key(&record.learner_id) {
            return Err(StoreError::LearnerNotFound(record.learner_id.clone()));
        }

        let session = inner
            .sessions
            .get_mut(&record.session_id)
            .ok_or_else(|| StoreError::SessionNotFound(record.session_id.clone()))?;
        session.status = SessionStatus::Completed;
        session.score = record.score;
        session.time_spent_seconds = record.time_spent_seconds;
        session.tab_switches = record.tab_switches;
        // Flags are monotonic: OR with any prior value, never cleared
        session.flagged = session.flagged || record.flagged;
        session.flag_reason = record.flag_reason.clone();
        session.ended_at = Some(record.ended_at);

        let learner = inner
            .learners
            .get_mut(&record.learner_id)
            .ok_or_else(|| StoreError::LearnerNotFound(record.learner_id.clone()))?;
        learner.xp += record.xp_delta;
        learner.rank_score += record.rank_score_delta;
        learner.status_tier = record.new_status_tier.clone();

        let entry_id = inner.xp_log.len() as i64 + 1;
        inner.xp_log.push(XpLogEntry {
            id: entry_id,
            learner_id: record.learner_id.clone(),
            amount: record.xp_delta,
            reason: record.xp_reason.clone(),
            created_at: record.ended_at,
        });
        Ok(())
    }

    fn attach_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        session.feedback = Some(feedback.to_string());
        Ok(())
    }

    fn xp_log_for_learner(&self, learner_id: &str) -> Result<Vec<XpLogEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .xp_log
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Difficulty;

    fn completion_record(session_id: &str, learner_id: &str) -> CompletionRecord {
        CompletionRecord {
            session_id: session_id.to_string(),
            learner_id: learner_id.to_string(),
            score: 70.0,
            time_spent_seconds: 200,
            tab_switches: 0,
            flagged: false,
            flag_reason: None,
            ended_at: Utc::now(),
            xp_delta: 70,
            rank_score_delta: 99.0,
            new_status_tier: "Learner".to_string(),
            xp_reason: "Completed Beginner tier".to_string(),
        }
    }

    #[test]
    fn test_session_insert_and_get() {
        let store = MemoryStore::new();
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        let loaded = store.session(&id).unwrap().unwrap();
        assert_eq!(loaded.learner_id, "lrn-1");
        assert_eq!(loaded.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_session_not_found() {
        let store = MemoryStore::new();
        assert!(store.session("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_attempt_bumps_attempt_count() {
        let store = MemoryStore::new();
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        store
            .insert_attempt(&Attempt::new(&id, "q-1", "a", true, 10))
            .unwrap();
        store
            .insert_attempt(&Attempt::new(&id, "q-2", "b", false, 12))
            .unwrap();

        let loaded = store.session(&id).unwrap().unwrap();
        assert_eq!(loaded.attempt_count, 2);
    }

    #[test]
    fn test_insert_attempt_for_missing_session_fails() {
        let store = MemoryStore::new();
        let err = store
            .insert_attempt(&Attempt::new("missing", "q-1", "a", true, 10))
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[test]
    fn test_duplicate_attempts_for_same_question_are_kept() {
        let store = MemoryStore::new();
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        store
            .insert_attempt(&Attempt::new(&id, "q-1", "a", false, 20))
            .unwrap();
        store
            .insert_attempt(&Attempt::new(&id, "q-1", "b", true, 8))
            .unwrap();

        let attempts = store.attempts_for_session(&id).unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.question_id == "q-1"));
    }

    #[test]
    fn test_recent_attempts_newest_first() {
        let store = MemoryStore::new();
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        for q in ["q-1", "q-2", "q-3", "q-4"] {
            store
                .insert_attempt(&Attempt::new(&id, q, "a", true, 10))
                .unwrap();
        }

        let recent = store.recent_attempts(&id, 3).unwrap();
        let ids: Vec<&str> = recent.iter().map(|a| a.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q-4", "q-3", "q-2"]);
    }

    #[test]
    fn test_best_completed_score_takes_max() {
        let store = MemoryStore::new();
        for score in [40.0, 75.0, 62.0] {
            let mut session = QuizSession::start("lrn-1", "tier-1");
            session.status = SessionStatus::Completed;
            session.score = score;
            session.ended_at = Some(Utc::now());
            store.insert_session(&session).unwrap();
        }
        // In-progress sessions never count
        let mut open = QuizSession::start("lrn-1", "tier-1");
        open.score = 99.0;
        store.insert_session(&open).unwrap();

        let best = store.best_completed_score("lrn-1", "tier-1").unwrap();
        assert_eq!(best, Some(75.0));
    }

    #[test]
    fn test_best_completed_score_none_without_history() {
        let store = MemoryStore::new();
        assert_eq!(store.best_completed_score("lrn-1", "tier-1").unwrap(), None);
    }

    #[test]
    fn test_complete_session_applies_all_writes() {
        let store = MemoryStore::new();
        store.insert_learner(Learner::new("lrn-1", "Ada"));
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        store.complete_session(&completion_record(&id, "lrn-1")).unwrap();

        let session = store.session(&id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.score, 70.0);
        assert!(session.ended_at.is_some());

        let learner = store.learner("lrn-1").unwrap().unwrap();
        assert_eq!(learner.xp, 70);
        assert_eq!(learner.rank_score, 99.0);

        let log = store.xp_log_for_learner("lrn-1").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].amount, 70);
        assert_eq!(log[0].reason, "Completed Beginner tier");
    }

    #[test]
    fn test_complete_session_twice_rejected_without_double_grant() {
        let store = MemoryStore::new();
        store.insert_learner(Learner::new("lrn-1", "Ada"));
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        store.complete_session(&completion_record(&id, "lrn-1")).unwrap();
        let err = store
            .complete_session(&completion_record(&id, "lrn-1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyCompleted(_)));

        let learner = store.learner("lrn-1").unwrap().unwrap();
        assert_eq!(learner.xp, 70);
        assert_eq!(store.xp_log_for_learner("lrn-1").unwrap().len(), 1);
    }

    #[test]
    fn test_complete_session_missing_learner_writes_nothing() {
        let store = MemoryStore::new();
        let session = QuizSession::start("ghost", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();

        let err = store
            .complete_session(&completion_record(&id, "ghost"))
            .unwrap_err();
        assert!(matches!(err, StoreError::LearnerNotFound(_)));

        let session = store.session(&id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_attach_feedback_touches_only_feedback() {
        let store = MemoryStore::new();
        store.insert_learner(Learner::new("lrn-1", "Ada"));
        let session = QuizSession::start("lrn-1", "tier-1");
        let id = session.id.clone();
        store.insert_session(&session).unwrap();
        store.complete_session(&completion_record(&id, "lrn-1")).unwrap();

        store.attach_feedback(&id, "Solid grasp of fractions.").unwrap();

        let session = store.session(&id).unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some("Solid grasp of fractions."));
        assert_eq!(session.score, 70.0);
        assert_eq!(store.learner("lrn-1").unwrap().unwrap().xp, 70);
    }

    #[test]
    fn test_recent_completed_for_learner_ordered_and_limited() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut session = QuizSession::start("lrn-1", "tier-1");
            session.id = format!("sess-{i}");
            session.status = SessionStatus::Completed;
            session.ended_at = Some(base + chrono::Duration::seconds(i));
            store.insert_session(&session).unwrap();
        }

        let recent = store.recent_completed_for_learner("lrn-1", 3).unwrap();
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sess-4", "sess-3", "sess-2"]);
    }

    #[test]
    fn test_recent_completed_on_tier_excludes_session() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..3 {
            let mut session = QuizSession::start("lrn-1", "tier-1");
            session.id = format!("sess-{i}");
            session.status = SessionStatus::Completed;
            session.ended_at = Some(base + chrono::Duration::seconds(i));
            store.insert_session(&session).unwrap();
        }

        let recent = store
            .recent_completed_on_tier("lrn-1", "tier-1", "sess-2", 3)
            .unwrap();
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sess-1", "sess-0"]);
    }

    #[test]
    fn test_catalog_tiers_ordered_by_index() {
        let store = MemoryStore::new();
        for (id, name, order) in [
            ("t-int", "Intermediate", 2),
            ("t-diag", "Diagnostic", 0),
            ("t-beg", "Beginner", 1),
        ] {
            store.insert_tier(Tier {
                id: id.into(),
                chapter_id: "ch-1".into(),
                name: name.into(),
                order_index: order,
            });
        }

        let tiers = store.tiers_in_chapter("ch-1").unwrap();
        let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Diagnostic", "Beginner", "Intermediate"]);
    }

    #[test]
    fn test_catalog_question_lookup() {
        let store = MemoryStore::new();
        store.insert_question(Question {
            id: "q-1".into(),
            tier_id: "t-1".into(),
            text: "2 + 2?".into(),
            difficulty: Difficulty::Easy,
            options: vec![],
            correct_option_id: "a".into(),
            correct_feedback: None,
            incorrect_feedback: None,
        });

        assert!(store.question("q-1").unwrap().is_some());
        assert!(store.question("q-2").unwrap().is_none());
        assert_eq!(store.questions_in_tier("t-1").unwrap().len(), 1);
    }
}
