use rusqlite::params;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{NewVideo, Video, VideoUpdate};
use crate::database::store::ContentStore;

fn video_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        title: row.get(1)?,
        file_path: row.get(2)?,
        thumbnail_path: row.get(3)?,
        description: row.get(4)?,
        position: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const VIDEO_COLUMNS: &str =
    "id, title, file_path, thumbnail_path, description, position, created_at";

impl ContentStore {
    pub fn add_video(&self, video: NewVideo) -> StoreResult<Video> {
        let position = match video.position {
            Some(position) => position,
            None => self.next_position("videos")?,
        };
        let created_at = Self::now();
        let id: i64 = self.conn.query_row(
            "INSERT INTO videos (title, file_path, thumbnail_path, description, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
            params![
                video.title,
                video.file_path,
                video.thumbnail_path,
                video.description,
                position,
                created_at
            ],
            |row| row.get(0),
        )?;
        Ok(Video {
            id,
            title: video.title,
            file_path: video.file_path,
            thumbnail_path: video.thumbnail_path,
            description: video.description,
            position,
            created_at,
        })
    }

    pub fn video(&self, id: i64) -> StoreResult<Video> {
        self.conn
            .query_row(
                &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"),
                params![id],
                video_from_row,
            )
            .map_err(|err| StoreError::for_missing(err, "video", id))
    }

    pub fn list_videos(&self) -> StoreResult<Vec<Video>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY position ASC, id ASC"
        ))?;
        let videos = stmt
            .query_map([], video_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(videos)
    }

    /// Title, description and thumbnail are always rewritten; the file only
    /// when a replacement is supplied.
    pub fn update_video(&self, id: i64, update: VideoUpdate) -> StoreResult<()> {
        let changed = match update.file_path {
            Some(file_path) => self.conn.execute(
                "UPDATE videos SET title = ?1, description = ?2, file_path = ?3, thumbnail_path = ?4
                 WHERE id = ?5",
                params![update.title, update.description, file_path, update.thumbnail_path, id],
            )?,
            None => self.conn.execute(
                "UPDATE videos SET title = ?1, description = ?2, thumbnail_path = ?3 WHERE id = ?4",
                params![update.title, update.description, update.thumbnail_path, id],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "video", id });
        }
        Ok(())
    }

    pub fn delete_video(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM videos WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "video", id });
        }
        Ok(())
    }
}
