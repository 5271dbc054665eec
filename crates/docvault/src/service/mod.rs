//! Ingestion and the read/delete/download operations around it.

pub mod documents;
pub mod pagination;
pub mod upload;

pub use documents::{DocumentService, DownloadedFile};
pub use pagination::{Page, PageMeta, PageQuery, SortField, SortOrder};
pub use upload::UploadRequest;
