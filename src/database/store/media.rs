use rusqlite::params;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{MediaItem, MediaKind, NewMedia};
use crate::database::store::ContentStore;

fn media_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaItem> {
    Ok(MediaItem {
        id: row.get(0)?,
        title: row.get(1)?,
        file_path: row.get(2)?,
        kind: MediaKind::from(row.get::<_, String>(3)?.as_str()),
        position: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const MEDIA_COLUMNS: &str = "id, title, file_path, kind, position, created_at";

impl ContentStore {
    pub fn add_media(&self, media: NewMedia) -> StoreResult<MediaItem> {
        let position = match media.position {
            Some(position) => position,
            None => self.next_position("media")?,
        };
        let created_at = Self::now();
        let id: i64 = self.conn.query_row(
            "INSERT INTO media (title, file_path, kind, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![media.title, media.file_path, media.kind.as_str(), position, created_at],
            |row| row.get(0),
        )?;
        Ok(MediaItem {
            id,
            title: media.title,
            file_path: media.file_path,
            kind: media.kind,
            position,
            created_at,
        })
    }

    pub fn media_item(&self, id: i64) -> StoreResult<MediaItem> {
        self.conn
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1"),
                params![id],
                media_from_row,
            )
            .map_err(|err| StoreError::for_missing(err, "media", id))
    }

    pub fn list_media(&self) -> StoreResult<Vec<MediaItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media ORDER BY position ASC, id ASC"
        ))?;
        let items = stmt
            .query_map([], media_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn list_media_by_kind(&self, kind: &MediaKind) -> StoreResult<Vec<MediaItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE kind = ?1 ORDER BY position ASC, id ASC"
        ))?;
        let items = stmt
            .query_map(params![kind.as_str()], media_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn delete_media(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM media WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "media", id });
        }
        Ok(())
    }
}
