use crate::database::Database;
use eyre::Result;

pub const FAVORITES_KEY: &str = "tally.favorites";

/// Person ids the user pinned to the top of person pickers.
pub struct Favorites<'a> {
    db: &'a Database,
}

impl<'a> Favorites<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(self.db.get_json(FAVORITES_KEY).await?.unwrap_or_default())
    }

    /// Returns false when the id was already a favorite.
    pub async fn add(&self, person_id: &str) -> Result<bool> {
        self.db
            .update_json(FAVORITES_KEY, |ids: &mut Vec<String>| {
                if ids.iter().any(|id| id == person_id) {
                    false
                } else {
                    ids.push(person_id.to_string());
                    true
                }
            })
            .await
    }

    /// Returns false when the id was not a favorite.
    pub async fn remove(&self, person_id: &str) -> Result<bool> {
        self.db
            .update_json(FAVORITES_KEY, |ids: &mut Vec<String>| {
                let before = ids.len();
                ids.retain(|id| id != person_id);
                ids.len() != before
            })
            .await
    }
}
