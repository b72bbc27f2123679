// src/services/sample_bank.rs

use sqlx::types::Json;

use crate::models::past_question::BankQuestion;

/// Built-in questions used when the bank has nothing for a subject.
struct SampleQuestion {
    question: &'static str,
    options: &'static [(&'static str, &'static str)],
    correct_answer: &'static str,
    topic: &'static str,
}

const MATHEMATICS: &[SampleQuestion] = &[
    SampleQuestion {
        question: "Simplify: 3x + 5x - 2x",
        options: &[("A", "6x"), ("B", "8x"), ("C", "10x"), ("D", "5x")],
        correct_answer: "A",
        topic: "Algebraic Processes",
    },
    SampleQuestion {
        question: "What is the square root of 144?",
        options: &[("A", "10"), ("B", "11"), ("C", "12"), ("D", "13")],
        correct_answer: "C",
        topic: "Number and Numeration",
    },
    SampleQuestion {
        question: "Solve for x: 2x + 5 = 15",
        options: &[("A", "3"), ("B", "4"), ("C", "5"), ("D", "6")],
        correct_answer: "C",
        topic: "Linear Equations",
    },
];

const ENGLISH_LANGUAGE: &[SampleQuestion] = &[SampleQuestion {
    question: "Choose the correct spelling:",
    options: &[("A", "Recieve"), ("B", "Receive"), ("C", "Receeve"), ("D", "Recive")],
    correct_answer: "B",
    topic: "Spelling",
}];

fn table(subject: &str) -> &'static [SampleQuestion] {
    match subject {
        "Mathematics" => MATHEMATICS,
        "English Language" => ENGLISH_LANGUAGE,
        _ => &[],
    }
}

/// Sample questions for a subject, empty when the subject has none.
pub fn sample_questions(subject: &str) -> Vec<BankQuestion> {
    table(subject)
        .iter()
        .map(|q| BankQuestion {
            question_text: q.question.to_string(),
            options: Json(
                q.options
                    .iter()
                    .map(|(label, text)| (label.to_string(), text.to_string()))
                    .collect(),
            ),
            correct_answer: q.correct_answer.to_string(),
            topic: Some(q.topic.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_subjects_have_answered_questions() {
        let maths = sample_questions("Mathematics");
        assert_eq!(maths.len(), 3);
        assert!(maths.iter().all(|q| q.options.contains_key(&q.correct_answer)));
    }

    #[test]
    fn unknown_subject_is_empty() {
        assert!(sample_questions("Geography").is_empty());
    }
}
