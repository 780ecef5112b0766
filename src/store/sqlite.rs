use futures::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use tracing::debug;

use super::{Mutation, ProgressStore, StoreError, parse_list};
use crate::{outline::Module, progress::ProgressState, student::StudentId};

/// Progress kept as JSON lists on the `student` row, two columns per module
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    database: SqlitePool,
}

fn columns(module: Module) -> (&'static str, &'static str) {
    match module {
        Module::A => ("completed_pages", "completed_quizzes"),
        Module::B => ("completed_pages_b", "completed_quizzes_b"),
    }
}

async fn read_state(
    conn: &mut SqliteConnection,
    student: StudentId,
    module: Module,
) -> Result<ProgressState, StoreError> {
    let (pages, quizzes) = columns(module);
    let sql = format!("SELECT {pages}, {quizzes} FROM student WHERE id = ?");
    let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(&sql)
        .bind(student)
        .fetch_optional(&mut *conn)
        .await?;
    let (pages, quizzes) = row.ok_or(StoreError::StudentNotFound(student))?;
    Ok(ProgressState::from_lists(
        parse_list(pages.as_deref())?,
        parse_list(quizzes.as_deref())?,
    ))
}

async fn write_state(
    conn: &mut SqliteConnection,
    student: StudentId,
    module: Module,
    state: &ProgressState,
) -> Result<(), StoreError> {
    let (pages, quizzes) = columns(module);
    let sql = format!(
        "UPDATE student SET {pages} = ?, {quizzes} = ?, progress_updated_at = ? WHERE id = ?"
    );
    sqlx::query(&sql)
        .bind(serde_json::to_string(&state.pages())?)
        .bind(serde_json::to_string(&state.quizzes())?)
        .bind(OffsetDateTime::now_utc())
        .bind(student)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SqliteProgressStore {
    pub fn new(database: SqlitePool) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &SqlitePool {
        &self.database
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.database).await
    }
}

impl ProgressStore for SqliteProgressStore {
    fn load(
        &self,
        student: StudentId,
        module: Module,
    ) -> BoxFuture<'_, Result<ProgressState, StoreError>> {
        Box::pin(async move {
            let mut conn = self.database.acquire().await?;
            read_state(&mut conn, student, module).await
        })
    }

    fn update<'a>(
        &'a self,
        student: StudentId,
        module: Module,
        mutate: Mutation<'a>,
    ) -> BoxFuture<'a, Result<ProgressState, StoreError>> {
        Box::pin(async move {
            // take the write lock up front so concurrent read-modify-writes queue
            // on the busy timeout instead of failing on lock upgrade. Dropping
            // `tx` before commit, on error or cancellation, rolls back.
            let mut tx = self.database.begin_with("BEGIN IMMEDIATE").await?;
            let mut state = read_state(&mut *tx, student, module).await?;
            if mutate(&mut state) {
                write_state(&mut *tx, student, module, &state).await?;
                debug!("saved module {module} progress for student {student}");
            }
            tx.commit().await?;
            Ok(state)
        })
    }

    fn recipient(&self, student: StudentId) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, String>("SELECT email FROM student WHERE id = ?")
                .bind(student)
                .fetch_optional(&self.database)
                .await?
                .ok_or(StoreError::StudentNotFound(student))
        })
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> SqliteProgressStore {
    let database = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteProgressStore::new(database);
    store.migrate().await.unwrap();
    store
}
