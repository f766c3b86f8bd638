use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                      // unique user ID
    pub name: String,                  // display name
    pub email: String,                 // unique key, stored as supplied
    #[serde(skip_serializing)]
    pub password_hash: String,         // Argon2 hash, not exposed in JSON
    #[serde(skip_serializing)]
    pub face_descriptors: Json<Vec<Vec<f32>>>, // enrolled embedding vectors
    #[serde(skip_serializing)]
    pub otp: Option<String>,           // pending recovery code, if any
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>, // defined iff otp is
    pub created_at: OffsetDateTime,    // creation timestamp
}

impl User {
    /// The stored recovery pair, when a code has been issued. Expiry is not
    /// checked here; a stale code stays stored until overwritten or consumed.
    pub fn pending_otp(&self) -> Option<(&str, OffsetDateTime)> {
        self.otp.as_deref().zip(self.otp_expires_at)
    }
}
