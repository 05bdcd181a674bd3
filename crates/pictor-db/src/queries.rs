use crate::models::{ImageRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

const IMAGE_COLUMNS: &str = "id, prompt, openai_url, s3_url, user_id, created_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` when the username is already taken; the
    /// existing row is left untouched.
    pub fn create_user(&self, name: &str, username: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, username, password) VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO NOTHING",
                (name, username, password_hash),
            )?;

            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(conn.last_insert_rowid()))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Images --

    pub fn insert_image(
        &self,
        prompt: &str,
        openai_url: &str,
        s3_url: Option<&str>,
        user_id: Option<i64>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (prompt, openai_url, s3_url, user_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![prompt, openai_url, s3_url, user_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All images owned by `user_id`, newest first.
    pub fn list_images_for_user(&self, user_id: i64) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {IMAGE_COLUMNS} FROM images
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;

            let rows = stmt
                .query_map([user_id], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Looks up an image by id and owner in one query, so a foreign image and
    /// a missing one are indistinguishable to the caller.
    pub fn get_owned_image(&self, image_id: i64, user_id: i64) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1 AND user_id = ?2"),
                    [image_id, user_id],
                    image_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, password FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                password: row.get(1)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        prompt: row.get(1)?,
        openai_url: row.get(2)?,
        s3_url: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(username: &str) -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("Test", username, "hash").unwrap().unwrap();
        (db, id)
    }

    #[test]
    fn duplicate_username_is_rejected_and_original_kept() {
        let (db, first) = db_with_user("al");

        let second = db.create_user("Other", "al", "other-hash").unwrap();
        assert!(second.is_none());

        let user = db.get_user_by_username("al").unwrap().unwrap();
        assert_eq!(user.id, first);
        assert_eq!(user.password, "hash");

        let name: String = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT name FROM users WHERE id = ?1", [first], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(name, "Test");
    }

    #[test]
    fn unknown_username_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user_by_username("ghost").unwrap().is_none());
    }

    #[test]
    fn list_is_empty_for_user_without_images() {
        let (db, user) = db_with_user("al");
        assert!(db.list_images_for_user(user).unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first_and_scoped_to_owner() {
        let (db, al) = db_with_user("al");
        let bo = db.create_user("Bo", "bo", "hash").unwrap().unwrap();

        let first = db.insert_image("cat", "https://x/1", Some("https://s3/1"), Some(al)).unwrap();
        let second = db.insert_image("dog", "https://x/2", None, Some(al)).unwrap();
        db.insert_image("owl", "https://x/3", None, Some(bo)).unwrap();
        db.insert_image("anon", "https://x/4", None, None).unwrap();

        let ids: Vec<i64> = db.list_images_for_user(al).unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn owned_image_lookup_hides_foreign_rows() {
        let (db, al) = db_with_user("al");
        let bo = db.create_user("Bo", "bo", "hash").unwrap().unwrap();
        let image = db.insert_image("cat", "https://x/1", None, Some(al)).unwrap();

        let owned = db.get_owned_image(image, al).unwrap().unwrap();
        assert_eq!(owned.prompt, "cat");
        assert!(owned.s3_url.is_none());
        assert_eq!(owned.user_id, Some(al));
        assert!(owned.created_at.ends_with('Z'));

        assert!(db.get_owned_image(image, bo).unwrap().is_none());
        assert!(db.get_owned_image(image + 100, al).unwrap().is_none());
    }

    #[test]
    fn image_for_unknown_user_violates_foreign_key() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.insert_image("cat", "https://x/1", None, Some(42)).is_err());
    }
}
