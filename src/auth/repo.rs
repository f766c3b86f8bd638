use crate::auth::repo_types::User;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, face_descriptors, otp, otp_expires_at, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#,
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// All users with at least one enrolled face descriptor, in insertion
    /// order. This is the enumeration order the matcher's first-match
    /// policies observe.
    pub async fn find_all_with_descriptors(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE jsonb_array_length(face_descriptors) > 0
            ORDER BY created_at, id
            "#,
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Create a new user with hashed password and enrolled descriptors.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        descriptors: &[Vec<f32>],
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, face_descriptors)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(Json(descriptors))
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store a freshly issued recovery code, overwriting any prior one.
    pub async fn set_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp = $1, otp_expires_at = $2
            WHERE id = $3
            "#,
        )
        .bind(code)
        .bind(expires_at)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Replace the password hash and clear the recovery code in one
    /// conditional write. The WHERE clause re-checks the code and its
    /// expiry, so of two concurrent resets only one can consume; the
    /// other sees `None`.
    pub async fn consume_otp(
        db: &PgPool,
        email: &str,
        code: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET password_hash = $1, otp = NULL, otp_expires_at = NULL
            WHERE email = $2 AND otp = $3 AND otp_expires_at >= $4
            RETURNING id
            "#,
        )
        .bind(new_password_hash)
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}
