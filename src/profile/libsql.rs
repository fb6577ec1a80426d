//! libSQL profile store — async `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases. Role and step columns are
//! stored as TEXT and parsed fail-closed on read: a corrupted value demotes
//! to the lowest-privilege role / earliest step instead of erroring out.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::OnboardingStep;
use crate::profile::migrations;
use crate::profile::model::{Profile, Role};
use crate::profile::store::ProfileStore;
use crate::session::IdentityId;

/// libSQL profile store backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Profile database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<Uuid>` to a libsql Value.
fn opt_uuid(id: Option<Uuid>) -> libsql::Value {
    match id {
        Some(id) => libsql::Value::Text(id.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a Profile.
///
/// Column order matches PROFILE_COLUMNS:
/// 0:identity, 1:role, 2:display_name, 3:onboarding_step,
/// 4:is_onboarding_complete, 5:group_id, 6:created_at, 7:updated_at
///
/// Unknown role/step strings fail closed (mentee / account_setup).
fn row_to_profile(row: &libsql::Row) -> Result<Profile, libsql::Error> {
    let identity_str: String = row.get(0)?;
    let role_str: String = row.get(1)?;
    let display_name: Option<String> = row.get(2).ok();
    let step_str: String = row.get(3)?;
    let complete: i64 = row.get(4)?;
    let group_str: Option<String> = row.get(5).ok();
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    let role = Role::try_parse(&role_str).unwrap_or_else(|| {
        warn!(identity = %identity_str, role = %role_str, "Unknown role in store, failing closed to mentee");
        Role::Mentee
    });
    let step = OnboardingStep::try_parse(&step_str).unwrap_or_else(|| {
        warn!(identity = %identity_str, step = %step_str, "Unknown onboarding step in store, failing closed to account_setup");
        OnboardingStep::AccountSetup
    });

    Ok(Profile {
        identity: Uuid::parse_str(&identity_str)
            .unwrap_or_else(|_| Uuid::nil())
            .into(),
        role,
        display_name,
        onboarding_step: step,
        is_onboarding_complete: complete != 0,
        group_id: group_str.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const PROFILE_COLUMNS: &str = "identity, role, display_name, onboarding_step, \
     is_onboarding_complete, group_id, created_at, updated_at";

#[async_trait]
impl ProfileStore for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_profile(&self, identity: IdentityId) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE identity = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![identity.to_string()])
            .await
            .map_err(|e| StoreError::Query(format!("get_profile failed: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get_profile row read failed: {e}")))?
        {
            Some(row) => {
                let profile = row_to_profile(&row)
                    .map_err(|e| StoreError::Serialization(format!("Bad profile row: {e}")))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO profiles (identity, role, display_name, onboarding_step, \
                 is_onboarding_complete, group_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    profile.identity.to_string(),
                    profile.role.to_string(),
                    opt_text(profile.display_name.as_deref()),
                    profile.onboarding_step.to_string(),
                    profile.is_onboarding_complete as i64,
                    opt_uuid(profile.group_id),
                    profile.created_at.to_rfc3339(),
                    profile.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert_profile failed: {e}")))?;
        Ok(())
    }

    async fn set_onboarding(
        &self,
        identity: IdentityId,
        step: OnboardingStep,
        complete: bool,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE profiles SET onboarding_step = ?1, is_onboarding_complete = ?2, \
                 updated_at = ?3 WHERE identity = ?4",
                params![
                    step.to_string(),
                    complete as i64,
                    Utc::now().to_rfc3339(),
                    identity.to_string(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_onboarding failed: {e}")))?;

        if changed == 0 {
            return Err(StoreError::NotFound { identity });
        }
        Ok(())
    }

    async fn set_role(&self, identity: IdentityId, role: Role) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE profiles SET role = ?1, updated_at = ?2 WHERE identity = ?3",
                params![role.to_string(), Utc::now().to_rfc3339(), identity.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_role failed: {e}")))?;

        if changed == 0 {
            return Err(StoreError::NotFound { identity });
        }
        Ok(())
    }

    async fn set_group(
        &self,
        identity: IdentityId,
        group_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE profiles SET group_id = ?1, updated_at = ?2 WHERE identity = ?3",
                params![opt_uuid(group_id), Utc::now().to_rfc3339(), identity.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_group failed: {e}")))?;

        if changed == 0 {
            return Err(StoreError::NotFound { identity });
        }
        Ok(())
    }

    async fn set_display_name(
        &self,
        identity: IdentityId,
        display_name: &str,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE profiles SET display_name = ?1, updated_at = ?2 WHERE identity = ?3",
                params![display_name, Utc::now().to_rfc3339(), identity.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("set_display_name failed: {e}")))?;

        if changed == 0 {
            return Err(StoreError::NotFound { identity });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = Profile::new(IdentityId::new(), Role::Mentor);
        store.insert_profile(&profile).await.unwrap();

        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert_eq!(loaded.identity, profile.identity);
        assert_eq!(loaded.role, Role::Mentor);
        assert_eq!(loaded.onboarding_step, OnboardingStep::AccountSetup);
        assert!(!loaded.is_onboarding_complete);
        assert!(loaded.group_id.is_none());
    }

    #[tokio::test]
    async fn get_missing_profile_returns_none() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let loaded = store.get_profile(IdentityId::new()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn set_onboarding_updates_step_and_flag() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = Profile::new(IdentityId::new(), Role::Mentee);
        store.insert_profile(&profile).await.unwrap();

        store
            .set_onboarding(profile.identity, OnboardingStep::GoalSetting, false)
            .await
            .unwrap();
        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert_eq!(loaded.onboarding_step, OnboardingStep::GoalSetting);
        assert!(!loaded.is_onboarding_complete);

        store
            .set_onboarding(profile.identity, OnboardingStep::Completed, true)
            .await
            .unwrap();
        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert_eq!(loaded.onboarding_step, OnboardingStep::Completed);
        assert!(loaded.is_onboarding_complete);
    }

    #[tokio::test]
    async fn set_onboarding_unknown_identity_is_not_found() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let err = store
            .set_onboarding(IdentityId::new(), OnboardingStep::Welcome, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_role_and_group() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = Profile::new(IdentityId::new(), Role::Mentee);
        store.insert_profile(&profile).await.unwrap();

        store.set_role(profile.identity, Role::Mentor).await.unwrap();
        let group = Uuid::new_v4();
        store.set_group(profile.identity, Some(group)).await.unwrap();

        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Mentor);
        assert_eq!(loaded.group_id, Some(group));

        store.set_group(profile.identity, None).await.unwrap();
        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert!(loaded.group_id.is_none());
    }

    #[tokio::test]
    async fn corrupt_role_and_step_fail_closed() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = Profile::new(IdentityId::new(), Role::Admin);
        store.insert_profile(&profile).await.unwrap();

        // Corrupt the row behind the model's back.
        store
            .conn()
            .execute(
                "UPDATE profiles SET role = 'superuser', onboarding_step = 'warp' \
                 WHERE identity = ?1",
                params![profile.identity.to_string()],
            )
            .await
            .unwrap();

        let loaded = store.get_profile(profile.identity).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Mentee);
        assert_eq!(loaded.onboarding_step, OnboardingStep::AccountSetup);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.db");

        let identity = IdentityId::new();
        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            let profile = Profile::new(identity, Role::Mentor);
            store.insert_profile(&profile).await.unwrap();
            store
                .set_onboarding(identity, OnboardingStep::ToolSetup, false)
                .await
                .unwrap();
        }

        let store = LibSqlStore::new_local(&path).await.unwrap();
        let loaded = store.get_profile(identity).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Mentor);
        assert_eq!(loaded.onboarding_step, OnboardingStep::ToolSetup);
    }

    #[test]
    fn parse_datetime_formats() {
        let rfc = parse_datetime("2026-03-01T10:30:00+00:00");
        assert_eq!(rfc.to_rfc3339(), "2026-03-01T10:30:00+00:00");

        let sqlite = parse_datetime("2026-03-01 10:30:00");
        assert_eq!(sqlite, rfc);

        // Garbage falls back to the epoch floor rather than panicking
        assert_eq!(parse_datetime("not a date"), DateTime::<Utc>::MIN_UTC);
    }
}
