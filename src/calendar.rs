use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A planned date night on the shared calendar. Insert-only: there is
/// no edit or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateNightEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDateNight {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

impl NewDateNight {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("A title is required.".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_is_rejected() {
        let event = NewDateNight {
            title: "  ".into(),
            description: "picnic".into(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        };
        assert!(matches!(event.validate(), Err(AppError::Validation(_))));
    }
}
