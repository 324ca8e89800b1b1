use rusqlite::params;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{NewTrack, Track};
use crate::database::store::ContentStore;

fn track_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        album_id: row.get(1)?,
        title: row.get(2)?,
        file_path: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const TRACK_COLUMNS: &str = "id, album_id, title, file_path, position, created_at";

impl ContentStore {
    /// Fails with a referential-integrity error when `album_id` names no
    /// existing album.
    pub fn add_track(&self, track: NewTrack) -> StoreResult<Track> {
        let position = match track.position {
            Some(position) => position,
            None => self.next_track_position(track.album_id)?,
        };
        let created_at = Self::now();
        let id: i64 = self.conn.query_row(
            "INSERT INTO tracks (album_id, title, file_path, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![track.album_id, track.title, track.file_path, position, created_at],
            |row| row.get(0),
        )?;
        Ok(Track {
            id,
            album_id: track.album_id,
            title: track.title,
            file_path: track.file_path,
            position,
            created_at,
        })
    }

    pub fn track(&self, id: i64) -> StoreResult<Track> {
        self.conn
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"),
                params![id],
                track_from_row,
            )
            .map_err(|err| StoreError::for_missing(err, "track", id))
    }

    pub fn list_tracks(&self, album_id: i64) -> StoreResult<Vec<Track>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE album_id = ?1 ORDER BY position ASC, id ASC"
        ))?;
        let tracks = stmt
            .query_map(params![album_id], track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    pub fn delete_track(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "track", id });
        }
        Ok(())
    }

    /// Track slots are per-album, unlike every other table.
    fn next_track_position(&self, album_id: i64) -> StoreResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM tracks WHERE album_id = ?1",
            params![album_id],
            |row| row.get(0),
        )?)
    }
}
