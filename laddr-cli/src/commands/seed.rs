//! Laddr seed command for loading content into a database
//!
//! Plays the content collaborator: reads a TOML file describing topics,
//! chapters, tiers and questions, and inserts everything into a SQLite
//! store. Tier order within a chapter follows the order in the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use laddr_core::{
    Chapter, Difficulty, Learner, Question, QuestionOption, SqliteStore, Tier, Topic,
};
use serde::Deserialize;

/// Arguments for the seed command
#[derive(Debug, Args)]
pub struct SeedArgs {
    /// SQLite database path; created and migrated if missing
    #[arg(long)]
    pub db: PathBuf,

    /// TOML file with topics, chapters, tiers, questions and learners
    #[arg(long)]
    pub catalog: PathBuf,

    /// Additionally create a demo learner with this name
    #[arg(long)]
    pub learner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    topics: Vec<SeedTopic>,
    #[serde(default)]
    learners: Vec<SeedLearner>,
}

#[derive(Debug, Deserialize)]
struct SeedTopic {
    id: String,
    name: String,
    grade_band: Option<String>,
    #[serde(default)]
    chapters: Vec<SeedChapter>,
}

#[derive(Debug, Deserialize)]
struct SeedChapter {
    id: String,
    name: String,
    #[serde(default)]
    tiers: Vec<SeedTier>,
}

#[derive(Debug, Deserialize)]
struct SeedTier {
    id: String,
    name: String,
    #[serde(default)]
    questions: Vec<SeedQuestion>,
}

#[derive(Debug, Deserialize)]
struct SeedQuestion {
    id: String,
    text: String,
    difficulty: String,
    options: Vec<SeedOption>,
    correct_option_id: String,
    correct_feedback: Option<String>,
    incorrect_feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedOption {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SeedLearner {
    id: String,
    name: String,
}

#[derive(Debug, Default)]
struct SeedCounts {
    topics: usize,
    chapters: usize,
    tiers: usize,
    questions: usize,
    learners: usize,
}

/// Run the seed command
pub fn run(args: SeedArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.catalog)
        .with_context(|| format!("reading catalog file {}", args.catalog.display()))?;
    let seed: SeedFile = toml::from_str(&text)
        .with_context(|| format!("parsing catalog file {}", args.catalog.display()))?;

    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    let mut counts = apply(&store, &seed)?;

    if let Some(name) = &args.learner {
        let id = format!("learner-{}", name.to_lowercase().replace(' ', "-"));
        store.insert_learner(&Learner::new(id.as_str(), name.as_str()))?;
        counts.learners += 1;
        println!("Created demo learner {} ({})", name, id);
    }

    println!(
        "Seeded {}: {} topics, {} chapters, {} tiers, {} questions, {} learners",
        args.db.display(),
        counts.topics,
        counts.chapters,
        counts.tiers,
        counts.questions,
        counts.learners,
    );
    Ok(())
}

/// Insert everything the seed file describes
fn apply(store: &SqliteStore, seed: &SeedFile) -> Result<SeedCounts> {
    let mut counts = SeedCounts::default();

    for topic in &seed.topics {
        store.insert_topic(&Topic {
            id: topic.id.clone(),
            name: topic.name.clone(),
            grade_band: topic.grade_band.clone(),
        })?;
        counts.topics += 1;

        for chapter in &topic.chapters {
            store.insert_chapter(&Chapter {
                id: chapter.id.clone(),
                topic_id: topic.id.clone(),
                name: chapter.name.clone(),
            })?;
            counts.chapters += 1;

            for (index, tier) in chapter.tiers.iter().enumerate() {
                store.insert_tier(&Tier {
                    id: tier.id.clone(),
                    chapter_id: chapter.id.clone(),
                    name: tier.name.clone(),
                    order_index: index as u32,
                })?;
                counts.tiers += 1;

                for question in &tier.questions {
                    let difficulty =
                        Difficulty::parse(&question.difficulty).with_context(|| {
                            format!(
                                "question {} has unknown difficulty {}",
                                question.id, question.difficulty
                            )
                        })?;
                    store.insert_question(&Question {
                        id: question.id.clone(),
                        tier_id: tier.id.clone(),
                        text: question.text.clone(),
                        difficulty,
                        options: question
                            .options
                            .iter()
                            .map(|option| QuestionOption {
                                id: option.id.clone(),
                                text: option.text.clone(),
                            })
                            .collect(),
                        correct_option_id: question.correct_option_id.clone(),
                        correct_feedback: question.correct_feedback.clone(),
                        incorrect_feedback: question.incorrect_feedback.clone(),
                    })?;
                    counts.questions += 1;
                }
            }
        }
    }

    for learner in &seed.learners {
        store.insert_learner(&Learner::new(learner.id.as_str(), learner.name.as_str()))?;
        counts.learners += 1;
    }

    Ok(counts)
}
