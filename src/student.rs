use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

pub type StudentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StudentInfo {
    pub id: StudentId,
    pub name: String,
    pub email: String,
}

pub async fn get_student_list(database: &SqlitePool) -> anyhow::Result<Vec<StudentInfo>> {
    let students = sqlx::query_as::<_, StudentInfo>("SELECT id, name, email FROM student ORDER BY id")
        .fetch_all(database)
        .await?;
    Ok(students)
}

pub async fn get_student(database: &SqlitePool, id: StudentId) -> anyhow::Result<Option<StudentInfo>> {
    let student =
        sqlx::query_as::<_, StudentInfo>("SELECT id, name, email FROM student WHERE id = ?")
            .bind(id)
            .fetch_optional(database)
            .await?;
    Ok(student)
}

/// Create a student record; its progress starts empty in every module
pub async fn create_student(
    database: &SqlitePool,
    name: &str,
    email: &str,
) -> anyhow::Result<StudentId> {
    let student = sqlx::query("INSERT INTO student (name, email) VALUES (?, ?)")
        .bind(name)
        .bind(email)
        .execute(database)
        .await?;
    Ok(student.last_insert_rowid())
}

pub async fn delete_student(database: &SqlitePool, id: StudentId) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM student WHERE id = ?")
        .bind(id)
        .execute(database)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: StudentId,
    exp: i64,
}

/// Student id carried by a signed `auth-token`
pub fn verify_token(key: &DecodingKey, token: &str) -> anyhow::Result<StudentId> {
    let claims = decode::<Claims>(token, key, &Validation::default())?.claims;
    Ok(claims.sub)
}

/// Sign a token for an existing student. Used by operator tooling only; the
/// service itself never issues tokens.
pub fn sign_token(secret: &[u8], id: StudentId, valid_for: time::Duration) -> anyhow::Result<String> {
    let exp = (time::OffsetDateTime::now_utc() + valid_for).unix_timestamp();
    let token = encode(
        &Header::default(),
        &Claims { sub: id, exp },
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}
