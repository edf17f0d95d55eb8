use serde::Deserialize;
use uuid::Uuid;

use crate::common::PageQuery;

#[derive(Debug, Default, Deserialize)]
pub struct ClockInRequest {
    pub location: Option<String>,
}

/// `from`/`to` 为闭区间日期
#[derive(Debug, Deserialize)]
pub struct AttendanceListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub employee: Option<Uuid>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AttendanceListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}
