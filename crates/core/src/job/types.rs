//! Types for the print job module.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::JobError;

/// One entry of the caller's ordered card list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRequest {
    /// Number of copies to print.
    pub count: u32,
    /// Where the card image is downloaded from.
    pub url: String,
}

impl CardRequest {
    pub fn new(url: impl Into<String>, count: u32) -> Self {
        Self {
            count,
            url: url.into(),
        }
    }
}

/// The single input of the print pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobRequest {
    /// Cards in print order.
    pub cards: Vec<CardRequest>,
    /// Pages per output file. `None` produces a single file.
    #[serde(default)]
    pub split: Option<usize>,
}

impl PrintJobRequest {
    pub fn new(cards: Vec<CardRequest>) -> Self {
        Self { cards, split: None }
    }

    /// Sets the pages-per-file split factor.
    pub fn with_split(mut self, split: usize) -> Self {
        self.split = Some(split);
        self
    }

    /// Total number of printed card units.
    pub fn total_units(&self) -> usize {
        self.cards.iter().map(|c| c.count as usize).sum()
    }

    /// Rejects requests the pipeline cannot do any work for.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.cards.is_empty() {
            return Err(JobError::InvalidRequest("card list is empty".to_string()));
        }
        if let Some(index) = self.cards.iter().position(|c| c.count == 0) {
            return Err(JobError::InvalidRequest(format!(
                "card {} has a count of 0",
                index
            )));
        }
        if self.split == Some(0) {
            return Err(JobError::InvalidRequest(
                "split must be at least 1 page".to_string(),
            ));
        }
        Ok(())
    }
}

/// Event delivered to the caller while a job runs.
#[derive(Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Human readable progress message.
    Progress { message: String },
    /// A finished PDF. `part` is `None` when no split was requested.
    Success { pdf: Vec<u8>, part: Option<usize> },
    /// The job stopped. No further events follow.
    Failed { message: String },
}

impl StatusEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl fmt::Debug for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress { message } => f
                .debug_struct("Progress")
                .field("message", message)
                .finish(),
            Self::Success { pdf, part } => f
                .debug_struct("Success")
                .field("pdf_len", &pdf.len())
                .field("part", part)
                .finish(),
            Self::Failed { message } => f
                .debug_struct("Failed")
                .field("message", message)
                .finish(),
        }
    }
}

/// Where a runner currently is in its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "part", rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Fetching,
    Partitioning,
    Composing(usize),
    Done,
    Failed,
}

/// Outcome of a job whose every partition was delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    /// Number of PDF files produced.
    pub parts: usize,
    /// Card units printed across all parts.
    pub total_units: usize,
    /// Distinct images downloaded.
    pub images_fetched: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_wire_shape() {
        let json = r#"{"cards":[{"count":2,"url":"https://img/a.png"}],"split":null}"#;
        let request: PrintJobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.cards, vec![CardRequest::new("https://img/a.png", 2)]);
        assert_eq!(request.split, None);
    }

    #[test]
    fn test_request_split_is_optional() {
        let json = r#"{"cards":[{"count":1,"url":"a"}]}"#;
        let request: PrintJobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.split, None);
    }

    #[test]
    fn test_total_units() {
        let request = PrintJobRequest::new(vec![
            CardRequest::new("a", 10),
            CardRequest::new("b", 5),
        ]);
        assert_eq!(request.total_units(), 15);
    }

    #[test]
    fn test_validate_rejects_empty_list() {
        let request = PrintJobRequest::new(vec![]);
        assert!(matches!(request.validate(), Err(JobError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let request =
            PrintJobRequest::new(vec![CardRequest::new("a", 1), CardRequest::new("b", 0)]);
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("card 1"));
    }

    #[test]
    fn test_validate_rejects_zero_split() {
        let request = PrintJobRequest::new(vec![CardRequest::new("a", 1)]).with_split(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_status_event_debug_hides_pdf_bytes() {
        let event = StatusEvent::Success {
            pdf: vec![0u8; 4096],
            part: Some(1),
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("pdf_len: 4096"));
    }
}
