use serde::Serialize;

use crate::timing::status::StatusResult;

/// Body of the status only endpoint.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CurrentStatus {
    status: String,
    is_open: bool,
}

impl From<&StatusResult> for CurrentStatus {
    fn from(result: &StatusResult) -> Self {
        Self {
            status: result.label.clone(),
            is_open: result.is_open,
        }
    }
}

/// Acknowledgement of a write.
#[derive(Serialize, Clone, Debug)]
pub struct Updated {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window: Option<String>,
    days: usize,
}

impl Updated {
    pub fn week(days: usize) -> Self {
        Self {
            message: "Operational hours updated".to_string(),
            day: None,
            window: None,
            days,
        }
    }

    pub fn single(day: &str, window: String, days: usize) -> Self {
        Self {
            message: "Operational hours updated".to_string(),
            day: Some(day.to_string()),
            window: Some(window),
            days,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct ErrorBody<'a> {
    error: &'a str,
}

impl<'a> ErrorBody<'a> {
    pub fn new(error: &'a str) -> Self {
        Self { error }
    }
}
