//! Paged listing parameters and results.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    UploadedAt,
    OriginalName,
    Size,
}

impl SortField {
    /// Fixed `ORDER BY` column for this field.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::UploadedAt => "d.uploaded_at",
            SortField::OriginalName => "d.original_name",
            SortField::Size => "d.size",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploadedAt" => Ok(SortField::UploadedAt),
            "originalName" => Ok(SortField::OriginalName),
            "size" => Ok(SortField::Size),
            other => Err(ValidationError::InvalidSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(ValidationError::InvalidSortOrder(other.to_string())),
        }
    }
}

/// A validated listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    page: u32,
    limit: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort_by: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

impl PageQuery {
    pub fn new(
        page: u32,
        limit: u32,
        sort_by: SortField,
        order: SortOrder,
    ) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ValidationError::InvalidLimit {
                value: limit,
                max: MAX_LIMIT,
            });
        }
        Ok(Self {
            page,
            limit,
            sort_by,
            order,
        })
    }

    /// Builds a query from wire values, applying defaults for missing ones.
    pub fn parse(
        page: Option<u32>,
        limit: Option<u32>,
        sort_by: Option<&str>,
        order: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let sort_by = sort_by.map(str::parse).transpose()?.unwrap_or_default();
        let order = order.map(str::parse).transpose()?.unwrap_or_default();
        Self::new(
            page.unwrap_or(DEFAULT_PAGE),
            limit.unwrap_or(DEFAULT_LIMIT),
            sort_by,
            order,
        )
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}
