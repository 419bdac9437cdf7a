//! User and profile database operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{LegacyText, User, UserProfile};

impl Database {
    /// Insert a user or update its flags
    pub fn upsert_user(
        &self,
        id: &str,
        display_name: Option<&str>,
        analysis_enabled: bool,
        ai_access: bool,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO users (id, display_name, analysis_enabled, ai_access)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, users.display_name),
                analysis_enabled = excluded.analysis_enabled,
                ai_access = excluded.ai_access
            "#,
            params![id, display_name, analysis_enabled, ai_access],
        )?;
        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT id, display_name, analysis_enabled, ai_access, created_at
                FROM users WHERE id = ?
                "#,
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users, ordered by ID
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, display_name, analysis_enabled, ai_access, created_at
            FROM users ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map([], row_to_user)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Users included in population-scope analysis, ordered by ID
    pub fn list_analysis_users(&self) -> Result<Vec<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .filter(|u| u.analysis_enabled)
            .collect())
    }

    /// Store (replace) a user's profile context
    pub fn set_user_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO user_profiles (user_id, goals, struggles, hobbies)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                goals = excluded.goals,
                struggles = excluded.struggles,
                hobbies = excluded.hobbies,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                user_id,
                profile.goals.to_raw(),
                profile.struggles.to_raw(),
                profile.hobbies.to_raw()
            ],
        )?;
        Ok(())
    }

    /// Get a user's profile context (empty when none is stored)
    pub fn get_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT goals, struggles, hobbies FROM user_profiles WHERE user_id = ?",
                params![user_id],
                |row| {
                    let goals: Option<String> = row.get(0)?;
                    let struggles: Option<String> = row.get(1)?;
                    let hobbies: Option<String> = row.get(2)?;
                    Ok(UserProfile {
                        goals: LegacyText::from_raw(goals.as_deref()),
                        struggles: LegacyText::from_raw(struggles.as_deref()),
                        hobbies: LegacyText::from_raw(hobbies.as_deref()),
                    })
                },
            )
            .optional()?;
        Ok(profile.unwrap_or_default())
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at: Option<String> = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        analysis_enabled: row.get(2)?,
        ai_access: row.get(3)?,
        created_at: created_at
            .map(|s| parse_datetime(&s))
            .unwrap_or_else(chrono::Utc::now),
    })
}
