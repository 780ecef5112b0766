pub mod memory;
pub mod sqlite;

use futures::future::BoxFuture;

use crate::{outline::Module, progress::ProgressState, student::StudentId};

pub use memory::MemoryProgressStore;
pub use sqlite::SqliteProgressStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt progress list: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Mutation run by [`ProgressStore::update`]. Returns whether the state changed
/// and therefore needs to be written back.
pub type Mutation<'a> = &'a mut (dyn FnMut(&mut ProgressState) -> bool + Send);

/// Per-student persisted progress, one independent state per module
pub trait ProgressStore: Send + Sync {
    fn load(
        &self,
        student: StudentId,
        module: Module,
    ) -> BoxFuture<'_, Result<ProgressState, StoreError>>;

    /// Read-modify-write of one student's state in one module. Implementations
    /// must not let concurrent updates of the same student lose writes.
    fn update<'a>(
        &'a self,
        student: StudentId,
        module: Module,
        mutate: Mutation<'a>,
    ) -> BoxFuture<'a, Result<ProgressState, StoreError>>;

    /// Address the student's notifications go to
    fn recipient(&self, student: StudentId) -> BoxFuture<'_, Result<String, StoreError>>;
}

/// Decode a persisted list. Missing or blank columns are empty lists.
pub(crate) fn parse_list(raw: Option<&str>) -> Result<Vec<u32>, serde_json::Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_treats_missing_as_empty() {
        assert_eq!(parse_list(None).unwrap(), Vec::<u32>::new());
        assert_eq!(parse_list(Some("  ")).unwrap(), Vec::<u32>::new());
        assert_eq!(parse_list(Some("[]")).unwrap(), Vec::<u32>::new());
        assert_eq!(parse_list(Some("[3,1,2]")).unwrap(), vec![3, 1, 2]);
        assert!(parse_list(Some("[\"x\"]")).is_err());
    }
}
