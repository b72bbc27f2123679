// src/services/exam_engine.rs

//! Mock-exam lifecycle: drawing a paper from the question bank, grading a
//! submission against the stored key and ranking weak topics.

use async_trait::async_trait;
use rand::{Rng, seq::SliceRandom};
use validator::Validate;

use crate::{
    config::{
        CONGRATULATE_SCORE_THRESHOLD, DEFAULT_EXAM_QUESTION_COUNT, DEFAULT_EXAM_TIME_LIMIT_MINUTES,
        FUNDAMENTALS_SCORE_THRESHOLD, WEAK_TOPIC_LIMIT,
    },
    error::AppError,
    models::{
        exam::{
            AnswerMap, CreateExamRequest, ExamAttempt, ExamResultResponse, NewExamAttempt,
            QuestionResult, QuestionSnapshot, SubmitExamRequest,
        },
        past_question::BankQuestion,
    },
    services::sample_bank,
};

/// Label used when a question carries no topic.
pub const UNKNOWN_TOPIC: &str = "Unknown";

/// Which bank entries may seed an exam.
#[derive(Debug, Clone, Copy)]
pub struct BankFilter<'a> {
    pub exam_type: &'a str,
    pub subject: &'a str,
    /// `None` draws from every year.
    pub year: Option<&'a str>,
}

/// Persistence needed by the exam lifecycle.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Uniform sample without replacement of at most `limit` answered
    /// bank questions matching `filter`.
    async fn sample_bank_questions(
        &self,
        filter: &BankFilter<'_>,
        limit: i64,
    ) -> Result<Vec<BankQuestion>, AppError>;

    async fn insert_attempt(&self, attempt: NewExamAttempt) -> Result<ExamAttempt, AppError>;

    async fn find_attempt(&self, user_id: i64, exam_id: i64)
    -> Result<Option<ExamAttempt>, AppError>;

    /// Stores the grading only if the attempt is still open, and bumps the
    /// owner's existing subject counters in the same unit of work.
    /// Returns `None` when another submission completed the attempt first.
    async fn record_grading(
        &self,
        attempt: &ExamAttempt,
        grading: &GradedExam,
        time_taken_seconds: i32,
    ) -> Result<Option<ExamAttempt>, AppError>;
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedExam {
    pub answers: AnswerMap,
    pub correct_count: i32,
    pub score_percentage: i32,
    pub weak_topics: Vec<String>,
    pub results: Vec<QuestionResult>,
}

/// "Random Mix" (or no year at all) means every year is eligible.
pub fn requested_year(year: Option<&str>) -> Option<&str> {
    match year.map(str::trim) {
        None | Some("") => None,
        Some(y) if y.eq_ignore_ascii_case("random mix") || y.eq_ignore_ascii_case("random") => {
            None
        }
        Some(y) => Some(y),
    }
}

/// Generates a mock exam and persists the attempt with its answer key.
pub async fn create_exam<S, R>(
    store: &S,
    rng: &mut R,
    user_id: i64,
    req: &CreateExamRequest,
) -> Result<ExamAttempt, AppError>
where
    S: ExamStore + ?Sized,
    R: Rng + Send,
{
    req.validate()?;

    let question_count = req
        .number_of_questions
        .unwrap_or(DEFAULT_EXAM_QUESTION_COUNT);
    let time_limit_minutes = req
        .time_limit_minutes
        .unwrap_or(DEFAULT_EXAM_TIME_LIMIT_MINUTES);

    let filter = BankFilter {
        exam_type: &req.exam_type,
        subject: &req.subject,
        year: requested_year(req.year.as_deref()),
    };

    let mut picked = store
        .sample_bank_questions(&filter, i64::from(question_count))
        .await?;

    if picked.is_empty() {
        let mut fallback = sample_bank::sample_questions(&req.subject);
        if fallback.is_empty() {
            return Err(AppError::ContentUnavailable(format!(
                "No questions available for {} {}. Please upload past questions first or try a different subject.",
                req.subject, req.exam_type
            )));
        }
        tracing::info!(
            subject = %req.subject,
            exam_type = %req.exam_type,
            "Question bank empty, using built-in sample questions"
        );
        let take = (question_count.max(0) as usize).min(fallback.len());
        let (chosen, _) = fallback.partial_shuffle(rng, take);
        picked = chosen.to_vec();
    }

    let attempt = store
        .insert_attempt(build_attempt(user_id, req, picked, time_limit_minutes))
        .await?;

    tracing::info!(
        exam_id = attempt.id,
        user_id,
        total_questions = attempt.total_questions,
        "Mock exam created"
    );

    Ok(attempt)
}

/// Snapshots the drawn questions and derives the 1-based answer key.
pub fn build_attempt(
    user_id: i64,
    req: &CreateExamRequest,
    picked: Vec<BankQuestion>,
    time_limit_minutes: i32,
) -> NewExamAttempt {
    let mut questions = Vec::with_capacity(picked.len());
    let mut answer_key = AnswerMap::new();

    for (index, q) in picked.into_iter().enumerate() {
        answer_key.insert(index as u32 + 1, q.correct_answer);
        questions.push(QuestionSnapshot {
            question_text: q.question_text,
            options: q.options.0,
            topic: q.topic,
        });
    }

    NewExamAttempt {
        user_id,
        exam_type: req.exam_type.clone(),
        subject: req.subject.clone(),
        year: req.year.clone(),
        questions,
        answer_key,
        time_limit_minutes,
    }
}

/// Grades a submission. The answer map may be sparse; unanswered positions
/// count as missed. Positions outside the paper are rejected.
pub fn grade(
    questions: &[QuestionSnapshot],
    answer_key: &AnswerMap,
    answers: &AnswerMap,
) -> Result<GradedExam, AppError> {
    let total = questions.len() as u32;
    if let Some(position) = answers.keys().find(|&&p| p == 0 || p > total) {
        return Err(AppError::BadRequest(format!(
            "Question {} does not exist in this exam (1-{})",
            position, total
        )));
    }

    let mut correct_count = 0;
    let mut missed_topics = Vec::new();
    let mut results = Vec::with_capacity(questions.len());

    for (index, question) in questions.iter().enumerate() {
        let position = index as u32 + 1;
        let submitted = answers.get(&position);
        let correct = answer_key.get(&position);
        let is_correct = matches!((submitted, correct), (Some(s), Some(c)) if s == c);
        let topic = question.topic.as_deref().unwrap_or(UNKNOWN_TOPIC);

        if is_correct {
            correct_count += 1;
        } else {
            missed_topics.push(topic);
        }

        results.push(QuestionResult {
            question_number: position,
            question_text: question.question_text.clone(),
            user_answer: submitted.cloned(),
            correct_answer: correct.cloned(),
            is_correct,
            topic: topic.to_string(),
        });
    }

    Ok(GradedExam {
        answers: answers.clone(),
        correct_count,
        score_percentage: score_percentage(correct_count, questions.len() as i32),
        weak_topics: rank_weak_topics(missed_topics, WEAK_TOPIC_LIMIT),
        results,
    })
}

/// Whole-number percentage, truncated: 7 of 9 is 77.
pub fn score_percentage(correct_count: i32, total_questions: i32) -> i32 {
    if total_questions <= 0 {
        return 0;
    }
    correct_count * 100 / total_questions
}

/// Ranks topics by miss count, most missed first. Ties keep the order in
/// which topics were first missed.
pub fn rank_weak_topics<'a, I>(missed: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&str, u32)> = Vec::new();
    for topic in missed {
        match counts.iter_mut().find(|(t, _)| *t == topic) {
            Some((_, n)) => *n += 1,
            None => counts.push((topic, 1)),
        }
    }

    // stable: equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(topic, _)| topic.to_string())
        .collect()
}

/// Templated advice, always in the order fundamentals, weak topics,
/// congratulations.
pub fn recommendations(subject: &str, score_percentage: i32, weak_topics: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    if score_percentage < FUNDAMENTALS_SCORE_THRESHOLD {
        out.push(format!(
            "Focus on improving your understanding of {} fundamentals",
            subject
        ));
    }
    if !weak_topics.is_empty() {
        out.push(format!(
            "Spend more time studying: {}",
            weak_topics.join(", ")
        ));
    }
    if score_percentage >= CONGRATULATE_SCORE_THRESHOLD {
        out.push("Great job! Keep practicing to maintain this level".to_string());
    }
    out
}

/// Grades a submission and records it exactly once.
pub async fn submit_exam<S>(
    store: &S,
    user_id: i64,
    req: &SubmitExamRequest,
) -> Result<ExamResultResponse, AppError>
where
    S: ExamStore + ?Sized,
{
    req.validate()?;

    let attempt = store
        .find_attempt(user_id, req.exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if attempt.completed_at.is_some() {
        return Err(AppError::Conflict("Exam already submitted".to_string()));
    }

    let grading = grade(&attempt.questions, &attempt.correct_answers, &req.answers)?;

    let completed = store
        .record_grading(&attempt, &grading, req.time_taken_seconds)
        .await?
        .ok_or(AppError::Conflict("Exam already submitted".to_string()))?;

    tracing::info!(
        exam_id = completed.id,
        user_id,
        score = grading.score_percentage,
        "Mock exam graded"
    );

    Ok(result_response(&completed, grading))
}

/// Rebuilds the full result view of a graded attempt from what was stored.
pub fn graded_result(attempt: &ExamAttempt) -> Result<ExamResultResponse, AppError> {
    if attempt.completed_at.is_none() {
        return Err(AppError::BadRequest(
            "Exam has not been submitted yet".to_string(),
        ));
    }
    let grading = grade(
        &attempt.questions,
        &attempt.correct_answers,
        &attempt.user_answers,
    )?;
    Ok(result_response(attempt, grading))
}

fn result_response(attempt: &ExamAttempt, grading: GradedExam) -> ExamResultResponse {
    let recommendations = recommendations(
        &attempt.subject,
        grading.score_percentage,
        &grading.weak_topics,
    );

    ExamResultResponse {
        exam_id: attempt.id,
        exam_type: attempt.exam_type.clone(),
        subject: attempt.subject.clone(),
        total_questions: attempt.total_questions,
        correct_count: grading.correct_count,
        score_percentage: grading.score_percentage,
        time_taken_seconds: attempt.time_taken_seconds,
        weak_topics: grading.weak_topics,
        detailed_results: grading.results,
        recommendations,
        completed_at: attempt.completed_at,
    }
}
