// src/services/exam_store.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        exam::{EXAM_ATTEMPT_COLUMNS, ExamAttempt, NewExamAttempt},
        past_question::BankQuestion,
    },
    services::exam_engine::{BankFilter, ExamStore, GradedExam},
};

/// Postgres-backed exam storage.
#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Completed attempts of a user, newest first.
    pub async fn list_completed(
        &self,
        user_id: i64,
        subject: Option<&str>,
    ) -> Result<Vec<ExamAttempt>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM exam_attempts WHERE user_id = ",
            EXAM_ATTEMPT_COLUMNS
        ));
        qb.push_bind(user_id);
        qb.push(" AND completed_at IS NOT NULL");
        if let Some(subject) = subject {
            qb.push(" AND subject = ");
            qb.push_bind(subject);
        }
        qb.push(" ORDER BY completed_at DESC");

        let attempts = qb
            .build_query_as::<ExamAttempt>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch exam history: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(attempts)
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn sample_bank_questions(
        &self,
        filter: &BankFilter<'_>,
        limit: i64,
    ) -> Result<Vec<BankQuestion>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT question_text, options, correct_answer, topic FROM past_questions WHERE exam_type = ",
        );
        qb.push_bind(filter.exam_type);
        qb.push(" AND subject = ");
        qb.push_bind(filter.subject);
        qb.push(" AND correct_answer IS NOT NULL AND correct_answer <> ''");
        if let Some(year) = filter.year {
            qb.push(" AND year = ");
            qb.push_bind(year);
        }
        qb.push(" ORDER BY RANDOM() LIMIT ");
        qb.push_bind(limit);

        let questions = qb
            .build_query_as::<BankQuestion>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to sample question bank: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(questions)
    }

    async fn insert_attempt(&self, attempt: NewExamAttempt) -> Result<ExamAttempt, AppError> {
        let total_questions = attempt.questions.len() as i32;

        let sql = format!(
            "INSERT INTO exam_attempts \
                (user_id, exam_type, subject, year, questions, user_answers, correct_answers, \
                 time_limit_minutes, total_questions) \
             VALUES ($1, $2, $3, $4, $5, '{{}}'::jsonb, $6, $7, $8) \
             RETURNING {}",
            EXAM_ATTEMPT_COLUMNS
        );

        let created = sqlx::query_as::<_, ExamAttempt>(&sql)
            .bind(attempt.user_id)
            .bind(&attempt.exam_type)
            .bind(&attempt.subject)
            .bind(&attempt.year)
            .bind(Json(&attempt.questions))
            .bind(Json(&attempt.answer_key))
            .bind(attempt.time_limit_minutes)
            .bind(total_questions)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create exam attempt: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(created)
    }

    async fn find_attempt(
        &self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Option<ExamAttempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM exam_attempts WHERE id = $1 AND user_id = $2",
            EXAM_ATTEMPT_COLUMNS
        );

        let attempt = sqlx::query_as::<_, ExamAttempt>(&sql)
            .bind(exam_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(attempt)
    }

    async fn record_grading(
        &self,
        attempt: &ExamAttempt,
        grading: &GradedExam,
        time_taken_seconds: i32,
    ) -> Result<Option<ExamAttempt>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Only the first submission wins; a concurrent one sees no row.
        let sql = format!(
            "UPDATE exam_attempts SET \
                user_answers = $1, time_taken_seconds = $2, correct_count = $3, \
                score_percentage = $4, weak_topics = $5, completed_at = NOW() \
             WHERE id = $6 AND user_id = $7 AND completed_at IS NULL \
             RETURNING {}",
            EXAM_ATTEMPT_COLUMNS
        );

        let completed = sqlx::query_as::<_, ExamAttempt>(&sql)
            .bind(Json(&grading.answers))
            .bind(time_taken_seconds)
            .bind(grading.correct_count)
            .bind(grading.score_percentage)
            .bind(Json(&grading.weak_topics))
            .bind(attempt.id)
            .bind(attempt.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(completed) = completed else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Counters only move for subjects the user already tracks.
        sqlx::query(
            r#"
            UPDATE user_subjects SET
                total_questions_attempted = total_questions_attempted + $3,
                correct_answers = correct_answers + $4
            WHERE user_id = $1 AND subject_name = $2
            "#,
        )
        .bind(attempt.user_id)
        .bind(&attempt.subject)
        .bind(completed.total_questions)
        .bind(grading.correct_count)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update subject counters: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        tx.commit().await?;

        Ok(Some(completed))
    }
}
