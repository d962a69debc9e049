use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown sort order: {0} (expected newest, oldest, or rating)")]
    UnknownSortOrder(String),

    #[error("invalid date range: {after} is later than {before}")]
    InvertedDateRange { after: String, before: String },
}

pub type QueryResult<T> = Result<T, QueryError>;
