use rusqlite::params;
use tracing::info;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{Album, AlbumTrack, AlbumUpdate, AlbumWithTracks, NewAlbum, Track};
use crate::database::store::ContentStore;

fn album_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        cover_path: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const ALBUM_COLUMNS: &str = "id, title, description, cover_path, position, created_at";

impl ContentStore {
    pub fn create_album(&self, album: NewAlbum) -> StoreResult<Album> {
        let position = match album.position {
            Some(position) => position,
            None => self.next_position("albums")?,
        };
        let created_at = Self::now();
        let id: i64 = self.conn.query_row(
            "INSERT INTO albums (title, description, cover_path, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![album.title, album.description, album.cover_path, position, created_at],
            |row| row.get(0),
        )?;
        info!("Created album {} ({:?})", id, album.title);
        Ok(Album {
            id,
            title: album.title,
            description: album.description,
            cover_path: album.cover_path,
            position,
            created_at,
        })
    }

    pub fn album(&self, id: i64) -> StoreResult<Album> {
        self.conn
            .query_row(
                &format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?1"),
                params![id],
                album_from_row,
            )
            .map_err(|err| StoreError::for_missing(err, "album", id))
    }

    pub fn list_albums(&self) -> StoreResult<Vec<Album>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums ORDER BY position ASC, id ASC"
        ))?;
        let albums = stmt
            .query_map([], album_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    pub fn list_albums_with_tracks(&self) -> StoreResult<Vec<AlbumWithTracks>> {
        let albums = self.list_albums()?;
        let mut out = Vec::with_capacity(albums.len());
        for album in albums {
            let tracks = self.list_tracks(album.id)?;
            out.push(AlbumWithTracks { album, tracks });
        }
        Ok(out)
    }

    /// Title and description are always rewritten; the cover only when a new
    /// one is supplied.
    pub fn update_album(&self, id: i64, update: AlbumUpdate) -> StoreResult<()> {
        let changed = match update.cover_path {
            Some(cover_path) => self.conn.execute(
                "UPDATE albums SET title = ?1, description = ?2, cover_path = ?3 WHERE id = ?4",
                params![update.title, update.description, cover_path, id],
            )?,
            None => self.conn.execute(
                "UPDATE albums SET title = ?1, description = ?2 WHERE id = ?3",
                params![update.title, update.description, id],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "album", id });
        }
        Ok(())
    }

    /// Deletes the album row; the declared ON DELETE CASCADE removes every
    /// owned track in the same statement, so the pair can never be observed
    /// half-done.
    pub fn delete_album(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM albums WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "album", id });
        }
        info!("Deleted album {} (tracks cascaded)", id);
        Ok(())
    }

    /// Creates an album and its initial tracks in one transaction, positions
    /// following the order the tracks are given in.
    pub fn create_album_with_tracks(
        &mut self,
        album: NewAlbum,
        tracks: Vec<AlbumTrack>,
    ) -> StoreResult<AlbumWithTracks> {
        let position = match album.position {
            Some(position) => position,
            None => self.next_position("albums")?,
        };
        let created_at = Self::now();

        let tx = self.conn.transaction()?;
        let album_id: i64 = tx.query_row(
            "INSERT INTO albums (title, description, cover_path, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![album.title, album.description, album.cover_path, position, created_at],
            |row| row.get(0),
        )?;

        let mut inserted = Vec::with_capacity(tracks.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tracks (album_id, title, file_path, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
            )?;
            for (index, track) in tracks.into_iter().enumerate() {
                let position = index as i64;
                let track_id: i64 = stmt.query_row(
                    params![album_id, track.title, track.file_path, position, created_at],
                    |row| row.get(0),
                )?;
                inserted.push(Track {
                    id: track_id,
                    album_id,
                    title: track.title,
                    file_path: track.file_path,
                    position,
                    created_at: created_at.clone(),
                });
            }
        }
        tx.commit()?;
        info!("Created album {} with {} tracks", album_id, inserted.len());

        Ok(AlbumWithTracks {
            album: Album {
                id: album_id,
                title: album.title,
                description: album.description,
                cover_path: album.cover_path,
                position,
                created_at,
            },
            tracks: inserted,
        })
    }
}
