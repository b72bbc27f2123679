// src/services/pdf.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::past_question::{ExtractedQuestion, PaperContext},
    services::ai::{AiTutor, PageImage},
};

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Turns a PDF document into one PNG per page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_pages(&self, pdf: &[u8]) -> Result<Vec<PageImage>, AppError>;
}

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: String,
    dpi: u32,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self {
            binary: "pdftoppm".to_string(),
            dpi: 150,
        }
    }
}

impl PdftoppmRenderer {
    async fn render_in(&self, dir: &Path, pdf: &[u8]) -> Result<Vec<PageImage>, AppError> {
        let input = dir.join("input.pdf");
        tokio::fs::write(&input, pdf)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to stage PDF: {e}")))?;

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(dir.join("page"))
            .output()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!(
                    "Error converting PDF to images: {e}. Make sure poppler is installed."
                ))
            })?;

        if !output.status.success() {
            return Err(AppError::ExternalService(format!(
                "Error converting PDF to images: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut pages: Vec<(i32, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
        {
            let name = entry.file_name();
            if let Some(number) = name.to_str().and_then(page_number) {
                pages.push((number, entry.path()));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        let mut images = Vec::with_capacity(pages.len());
        for (page_number, path) in pages {
            let png = tokio::fs::read(&path)
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            images.push(PageImage { page_number, png });
        }

        Ok(images)
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_pages(&self, pdf: &[u8]) -> Result<Vec<PageImage>, AppError> {
        let dir = std::env::temp_dir().join(format!("past-questions-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        let result = self.render_in(&dir, pdf).await;

        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!("Failed to remove {}: {}", dir.display(), e);
        }

        result
    }
}

/// Page number of a `pdftoppm` output file such as `page-07.png`.
fn page_number(file_name: &str) -> Option<i32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Accepts an upload only when it is named or typed as a PDF and starts
/// with the PDF signature.
pub fn looks_like_pdf(file_name: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> bool {
    let named_pdf = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));
    let typed_pdf = content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));

    (named_pdf || typed_pdf) && bytes.starts_with(PDF_SIGNATURE)
}

/// Sends each page to the tutor in order. A page that fails is logged and
/// contributes nothing; the rest of the document is still processed.
pub async fn extract_questions(
    tutor: &dyn AiTutor,
    pages: &[PageImage],
    paper: &PaperContext,
) -> Vec<ExtractedQuestion> {
    let source = paper.source_name();
    let mut all = Vec::new();

    for page in pages {
        match tutor.extract_questions(page, paper).await {
            Ok(questions) => {
                tracing::info!(
                    page = page.page_number,
                    found = questions.len(),
                    "Extracted questions from page"
                );
                all.extend(questions.into_iter().map(|mut q| {
                    q.page_number = Some(page.page_number);
                    q.source_pdf = Some(source.clone());
                    q
                }));
            }
            Err(e) => {
                tracing::warn!(page = page.page_number, "Error processing page: {:?}", e);
            }
        }
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        lesson::{ChatTurn, Difficulty, LessonContent},
        question::Solution,
        study_plan::{GeneratedPlan, StudyPlanPrompt},
    };
    use crate::services::ai::QuestionInput;

    /// Returns one question per page and fails on page 2.
    struct PageStub;

    #[async_trait]
    impl AiTutor for PageStub {
        async fn solve(&self, _: &QuestionInput, _: Option<&str>) -> Result<Solution, AppError> {
            unimplemented!()
        }
        async fn teach(&self, _: &str, _: &str, _: Difficulty) -> Result<LessonContent, AppError> {
            unimplemented!()
        }
        async fn chat(&self, _: &str, _: &str, _: &[ChatTurn], _: &str) -> Result<String, AppError> {
            unimplemented!()
        }
        async fn simplify(&self, _: &str, _: &str) -> Result<String, AppError> {
            unimplemented!()
        }
        async fn generate_study_plan(
            &self,
            _: &StudyPlanPrompt<'_>,
        ) -> Result<GeneratedPlan, AppError> {
            unimplemented!()
        }
        async fn extract_questions(
            &self,
            page: &PageImage,
            _: &PaperContext,
        ) -> Result<Vec<ExtractedQuestion>, AppError> {
            if page.page_number == 2 {
                return Err(AppError::ExternalService("vision timeout".into()));
            }
            Ok(vec![ExtractedQuestion {
                question_number: page.page_number,
                question_text: format!("Question on page {}", page.page_number),
                options: Default::default(),
                correct_answer: Some("A".into()),
                topic: None,
                page_number: None,
                source_pdf: None,
            }])
        }
    }

    fn paper() -> PaperContext {
        PaperContext {
            exam_type: "WAEC".into(),
            subject: "Chemistry".into(),
            year: "2020".into(),
        }
    }

    fn pages(count: i32) -> Vec<PageImage> {
        (1..=count)
            .map(|page_number| PageImage {
                page_number,
                png: Vec::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn failing_page_is_skipped() {
        let questions = extract_questions(&PageStub, &pages(3), &paper()).await;

        let numbers: Vec<_> = questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(questions[1].page_number, Some(3));
        assert_eq!(
            questions[0].source_pdf.as_deref(),
            Some("WAEC_Chemistry_2020.pdf")
        );
    }

    #[tokio::test]
    async fn all_pages_failing_yields_nothing() {
        let only_bad = vec![PageImage {
            page_number: 2,
            png: Vec::new(),
        }];
        assert!(extract_questions(&PageStub, &only_bad, &paper()).await.is_empty());
    }

    #[test]
    fn pdf_detection_needs_name_or_type_and_signature() {
        let pdf = b"%PDF-1.7\n...";
        assert!(looks_like_pdf(Some("paper.PDF"), None, pdf));
        assert!(looks_like_pdf(None, Some("application/pdf"), pdf));
        assert!(!looks_like_pdf(Some("paper.pdf"), None, b"PK\x03\x04"));
        assert!(!looks_like_pdf(Some("paper.docx"), Some("text/plain"), pdf));
    }

    #[test]
    fn parses_pdftoppm_file_names() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-012.png"), Some(12));
        assert_eq!(page_number("input.pdf"), None);
    }
}
