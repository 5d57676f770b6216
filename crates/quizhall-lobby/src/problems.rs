//! Problem catalog, answer checking, and scoring.
//!
//! The catalog is loaded once at startup and shared read-only by every
//! lobby. Lobbies never look inside a problem themselves; they ask a
//! [`ProblemSource`] whether an answer is right and how much it is worth.

use std::path::Path;

use quizhall_protocol::Problem;
use serde::Deserialize;

use crate::StorageError;

/// Where lobbies get problems, and how answers are judged.
pub trait ProblemSource: Send + Sync + 'static {
    /// The shared catalog, in canonical order.
    fn problems(&self) -> &[Problem];

    /// Returns `true` if `submitted` answers `problem`.
    fn check_answer(&self, problem: &Problem, submitted: &str) -> bool {
        match &problem.answer {
            Some(expected) => normalize(expected) == normalize(submitted),
            None => true,
        }
    }

    /// Points awarded for solving `problem`.
    fn points(&self, problem: &Problem) -> u32 {
        points_for(problem)
    }
}

/// One point per started ten characters of the problem's expression,
/// never less than one.
pub fn points_for(problem: &Problem) -> u32 {
    let len = problem.latex.chars().count() as u32;
    len.div_ceil(10).max(1)
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// An immutable, in-memory problem catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    problems: Vec<Problem>,
}

#[derive(Deserialize)]
struct CatalogFile {
    problems: Vec<Problem>,
}

impl Catalog {
    /// Wraps an already-built problem list.
    pub fn new(problems: Vec<Problem>) -> Self {
        Self { problems }
    }

    /// Parses `{"problems": [...]}`.
    ///
    /// # Errors
    /// [`StorageError::Json`] if the text is not a catalog document.
    pub fn from_json(text: &str) -> Result<Self, StorageError> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Ok(Self::new(file.problems))
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    /// [`StorageError::Io`] if the file cannot be read, or
    /// [`StorageError::Json`] if it does not parse.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            problems = catalog.len(),
            "problem catalog loaded"
        );
        Ok(catalog)
    }

    /// Number of problems in the catalog.
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Returns `true` if the catalog holds no problems.
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl ProblemSource for Catalog {
    fn problems(&self) -> &[Problem] {
        &self.problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(latex: &str, answer: Option<&str>) -> Problem {
        Problem {
            title: "p".into(),
            description: String::new(),
            latex: latex.into(),
            answer: answer.map(str::to_string),
        }
    }

    #[test]
    fn test_points_for_rounds_up_per_ten_chars() {
        assert_eq!(points_for(&problem("1234567890", None)), 1);
        assert_eq!(points_for(&problem("12345678901", None)), 2);
        assert_eq!(points_for(&problem(&"x".repeat(25), None)), 3);
    }

    #[test]
    fn test_points_for_empty_expression_is_one() {
        assert_eq!(points_for(&problem("", None)), 1);
    }

    #[test]
    fn test_check_answer_ignores_case_and_whitespace() {
        let catalog = Catalog::default();
        let p = problem("x", Some("Pi"));
        assert!(catalog.check_answer(&p, "  pi "));
        assert!(!catalog.check_answer(&p, "tau"));
    }

    #[test]
    fn test_check_answer_without_key_accepts_anything() {
        let catalog = Catalog::default();
        assert!(catalog.check_answer(&problem("x", None), "whatever"));
    }

    #[test]
    fn test_from_json_reads_problems_in_order() {
        let catalog = Catalog::from_json(
            r#"{"problems":[
                {"title":"a","description":"","latex":"1"},
                {"title":"b","description":"","latex":"2","answer":"2"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.problems()[0].title, "a");
        assert_eq!(catalog.problems()[1].answer.as_deref(), Some("2"));
    }

    #[test]
    fn test_from_json_wrong_shape_is_json_error() {
        let err = Catalog::from_json(r#"[1,2,3]"#).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let err = Catalog::load("/definitely/not/here.json")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
