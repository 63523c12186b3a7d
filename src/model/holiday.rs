use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Holiday {
    pub id: u64,
    #[schema(example = "2026-12-25", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Christmas")]
    pub label: String,
    /// `None` applies company-wide.
    pub department_id: Option<u64>,
}

impl Holiday {
    pub fn applies_to(&self, department_id: Option<u64>) -> bool {
        match self.department_id {
            None => true,
            Some(scope) => department_id == Some(scope),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewHoliday {
    #[schema(example = "2026-12-25", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Christmas")]
    pub label: String,
    pub department_id: Option<u64>,
}
