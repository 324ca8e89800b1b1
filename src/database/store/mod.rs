mod albums;
mod layout;
mod media;
mod tracks;
mod videos;

use std::collections::HashSet;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::database::error::StoreResult;
use crate::database::schema::SCHEMA;

/// Handle on the content database. Owns a single connection with foreign-key
/// enforcement switched on; only the album->track relationship is declared,
/// so that is the only reference SQLite will police.
pub struct ContentStore {
    conn: Connection,
}

impl ContentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened content database at {:?}", path.as_ref());
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Escape hatch for callers that need raw SQL against the same
    /// connection (ad-hoc queries, tests).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Every filename any row points at, for reconciling the uploads
    /// directory. External URLs are not filenames and are skipped.
    pub fn referenced_files(&self) -> StoreResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT cover_path FROM albums WHERE cover_path IS NOT NULL AND cover_path != ''
             UNION SELECT file_path FROM tracks
             UNION SELECT file_path FROM videos
             UNION SELECT thumbnail_path FROM videos
                   WHERE thumbnail_path IS NOT NULL AND thumbnail_path != ''
             UNION SELECT file_path FROM media",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut files = HashSet::new();
        for row in rows {
            let name = row?;
            if !name.contains("://") {
                files.insert(name);
            }
        }
        Ok(files)
    }

    pub(crate) fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Next free display slot in a table: COALESCE(MAX(position), -1) + 1.
    pub(crate) fn next_position(&self, table: &str) -> StoreResult<i64> {
        let sql = format!("SELECT COALESCE(MAX(position), -1) + 1 FROM {table}");
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

/// Which rows a reorder applies to. Track positions are per-album, so that
/// scope carries the owning album id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderScope {
    Albums,
    Tracks { album_id: i64 },
    Videos,
    Media,
    Layout,
}

impl ContentStore {
    /// Rewrites positions so they follow the given id order (0, 1, 2, ...),
    /// in one transaction. Ids outside the scope are left untouched, matching
    /// the guarded per-album update for tracks.
    pub fn reorder(&mut self, scope: ReorderScope, ids: &[i64]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let (sql, album_id) = match scope {
                ReorderScope::Albums => ("UPDATE albums SET position = ?1 WHERE id = ?2", None),
                ReorderScope::Tracks { album_id } => (
                    "UPDATE tracks SET position = ?1 WHERE id = ?2 AND album_id = ?3",
                    Some(album_id),
                ),
                ReorderScope::Videos => ("UPDATE videos SET position = ?1 WHERE id = ?2", None),
                ReorderScope::Media => ("UPDATE media SET position = ?1 WHERE id = ?2", None),
                ReorderScope::Layout => {
                    ("UPDATE homepage_layout SET position = ?1 WHERE id = ?2", None)
                }
            };
            let mut stmt = tx.prepare(sql)?;
            for (position, id) in ids.iter().enumerate() {
                match album_id {
                    Some(album_id) => {
                        stmt.execute(rusqlite::params![position as i64, id, album_id])?
                    }
                    None => stmt.execute(rusqlite::params![position as i64, id])?,
                };
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::error::StoreError;
    use crate::database::models::{
        AlbumTrack, AlbumUpdate, BlockType, MediaKind, NewAlbum, NewBlock, NewMedia, NewTrack,
        NewVideo,
    };

    fn store() -> ContentStore {
        ContentStore::open_in_memory().unwrap()
    }

    fn make_album(store: &ContentStore, title: &str) -> i64 {
        store
            .create_album(NewAlbum {
                title: title.to_string(),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    fn make_track(store: &ContentStore, album_id: i64, title: &str) -> i64 {
        store
            .add_track(NewTrack {
                album_id,
                title: title.to_string(),
                file_path: format!("{title}.mp3"),
                position: None,
            })
            .unwrap()
            .id
    }

    fn make_video(store: &ContentStore, title: &str) -> i64 {
        store
            .add_video(NewVideo {
                title: title.to_string(),
                file_path: format!("{title}.mp4"),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn tracks_require_an_existing_album() {
        let store = store();
        let err = store
            .add_track(NewTrack {
                album_id: 999,
                title: "orphan".to_string(),
                file_path: "orphan.mp3".to_string(),
                position: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)), "got {err:?}");
    }

    #[test]
    fn deleting_an_album_cascades_to_exactly_its_tracks() {
        let store = store();
        let doomed = make_album(&store, "Doomed");
        let kept = make_album(&store, "Kept");
        let t1 = make_track(&store, doomed, "one");
        let t2 = make_track(&store, doomed, "two");
        let t3 = make_track(&store, kept, "three");

        store.delete_album(doomed).unwrap();

        assert!(matches!(store.album(doomed), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.track(t1), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.track(t2), Err(StoreError::NotFound { .. })));
        assert_eq!(store.track(t3).unwrap().album_id, kept);
    }

    #[test]
    fn missing_required_columns_are_rejected() {
        let store = store();
        make_album(&store, "Host");

        let cases = [
            ("INSERT INTO albums (position) VALUES (5)", "albums", "title"),
            ("INSERT INTO tracks (title, file_path) VALUES ('t', 't.mp3')", "tracks", "album_id"),
            ("INSERT INTO tracks (album_id, file_path) VALUES (1, 't.mp3')", "tracks", "title"),
            ("INSERT INTO tracks (album_id, title) VALUES (1, 't')", "tracks", "file_path"),
            ("INSERT INTO videos (title) VALUES ('v')", "videos", "file_path"),
            ("INSERT INTO videos (file_path) VALUES ('v.mp4')", "videos", "title"),
            ("INSERT INTO media (title) VALUES ('m')", "media", "file_path"),
            ("INSERT INTO homepage_layout (position) VALUES (0)", "homepage_layout", "type"),
        ];
        for (sql, table, column) in cases {
            let err: StoreError = store.connection().execute(sql, []).unwrap_err().into();
            match err {
                StoreError::NotNull { table: t, column: c } => {
                    assert_eq!((t.as_str(), c.as_str()), (table, column), "for {sql}");
                }
                other => panic!("expected NotNull for {sql}, got {other:?}"),
            }
        }
    }

    #[test]
    fn positions_are_unchecked_and_drive_listing_order() {
        let store = store();
        let low = store
            .create_album(NewAlbum {
                title: "Low".to_string(),
                position: Some(-3),
                ..Default::default()
            })
            .unwrap();
        let tied = store
            .create_album(NewAlbum {
                title: "Tied".to_string(),
                position: Some(-3),
                ..Default::default()
            })
            .unwrap();
        // Raw insert without a position lands on the schema default of 0.
        store
            .connection()
            .execute("INSERT INTO albums (title) VALUES ('Default')", [])
            .unwrap();

        let titles: Vec<String> = store
            .list_albums()
            .unwrap()
            .into_iter()
            .map(|album| album.title)
            .collect();
        assert_eq!(titles, ["Low", "Tied", "Default"]);
        assert_eq!(low.position, -3);
        assert_eq!(tied.position, -3);
        assert!(low.id < tied.id);
    }

    #[test]
    fn created_rows_round_trip_exactly() {
        let store = store();
        let album = store
            .create_album(NewAlbum {
                title: "Night Sessions".to_string(),
                description: Some("late takes".to_string()),
                cover_path: Some("night.png".to_string()),
                position: None,
            })
            .unwrap();
        assert_eq!(store.album(album.id).unwrap(), album);

        let track = store
            .add_track(NewTrack {
                album_id: album.id,
                title: "Opener".to_string(),
                file_path: "opener.mp3".to_string(),
                position: None,
            })
            .unwrap();
        assert_eq!(store.track(track.id).unwrap(), track);

        let video = store
            .add_video(NewVideo {
                title: "Live Cut".to_string(),
                file_path: "https://example.com/cut.mp4".to_string(),
                thumbnail_path: Some("cut.jpg".to_string()),
                description: None,
                position: None,
            })
            .unwrap();
        assert_eq!(store.video(video.id).unwrap(), video);

        let media = store
            .add_media(NewMedia {
                title: None,
                file_path: "poster.pdf".to_string(),
                kind: MediaKind::Other("document".to_string()),
                position: None,
            })
            .unwrap();
        assert_eq!(store.media_item(media.id).unwrap(), media);
    }

    #[test]
    fn auto_positions_count_up_within_their_scope() {
        let store = store();
        let first = make_album(&store, "First");
        let second = make_album(&store, "Second");
        assert_eq!(store.album(first).unwrap().position, 0);
        assert_eq!(store.album(second).unwrap().position, 1);

        // Track slots restart per album.
        make_track(&store, first, "a");
        make_track(&store, first, "b");
        make_track(&store, second, "c");
        let first_positions: Vec<i64> = store
            .list_tracks(first)
            .unwrap()
            .into_iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(first_positions, [0, 1]);
        assert_eq!(store.list_tracks(second).unwrap()[0].position, 0);
    }

    #[test]
    fn bundled_album_creation_orders_tracks_by_input() {
        let mut store = store();
        let bundle = store
            .create_album_with_tracks(
                NewAlbum {
                    title: "Bundle".to_string(),
                    ..Default::default()
                },
                vec![
                    AlbumTrack {
                        title: "intro".to_string(),
                        file_path: "intro.mp3".to_string(),
                    },
                    AlbumTrack {
                        title: "outro".to_string(),
                        file_path: "outro.mp3".to_string(),
                    },
                ],
            )
            .unwrap();

        let stored = store.list_tracks(bundle.album.id).unwrap();
        assert_eq!(stored, bundle.tracks);
        assert_eq!(stored[0].position, 0);
        assert_eq!(stored[1].position, 1);
    }

    #[test]
    fn album_update_keeps_the_cover_unless_replaced() {
        let store = store();
        let id = store
            .create_album(NewAlbum {
                title: "Covered".to_string(),
                cover_path: Some("old.png".to_string()),
                ..Default::default()
            })
            .unwrap()
            .id;

        store
            .update_album(id, AlbumUpdate {
                title: "Retitled".to_string(),
                description: Some("notes".to_string()),
                cover_path: None,
            })
            .unwrap();
        let album = store.album(id).unwrap();
        assert_eq!(album.title, "Retitled");
        assert_eq!(album.cover_path.as_deref(), Some("old.png"));

        store
            .update_album(id, AlbumUpdate {
                title: "Retitled".to_string(),
                description: None,
                cover_path: Some("new.png".to_string()),
            })
            .unwrap();
        assert_eq!(store.album(id).unwrap().cover_path.as_deref(), Some("new.png"));

        let missing = store.update_album(999, AlbumUpdate::default());
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn dangling_layout_references_are_stored_and_scanned() {
        let store = store();
        let album_id = make_album(&store, "Real");
        store
            .add_block(NewBlock {
                block_type: BlockType::Album,
                reference_id: Some(album_id),
                position: None,
            })
            .unwrap();
        let dangling = store
            .add_block(NewBlock {
                block_type: BlockType::Video,
                reference_id: Some(4040),
                position: None,
            })
            .unwrap();
        store
            .add_block(NewBlock {
                block_type: BlockType::Hero,
                reference_id: None,
                position: None,
            })
            .unwrap();

        // The write goes through; only the scan notices.
        assert!(store.list_layout().unwrap().contains(&dangling));
        assert_eq!(
            store.list_layout_by_type(&BlockType::Video).unwrap(),
            vec![dangling.clone()]
        );
        let orphans = store.scan_dangling_refs().unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].block_id, dangling.id);
        assert_eq!(orphans[0].reference_id, 4040);
    }

    #[test]
    fn layout_resolution_hydrates_titles_and_tolerates_orphans() {
        let store = store();
        let album_id = make_album(&store, "Philosophy");
        store
            .add_block(NewBlock {
                block_type: BlockType::Album,
                reference_id: Some(album_id),
                position: None,
            })
            .unwrap();
        store
            .add_block(NewBlock {
                block_type: BlockType::Video,
                reference_id: Some(4040),
                position: None,
            })
            .unwrap();

        let resolved = store.resolve_layout().unwrap();
        assert_eq!(resolved[0].title.as_deref(), Some("Philosophy"));
        assert_eq!(resolved[1].title, None);
    }

    #[test]
    fn featured_video_block_is_a_singleton_upsert() {
        let mut store = store();
        assert!(matches!(
            store.set_featured_video(77),
            Err(StoreError::NotFound { .. })
        ));

        let first = make_video(&store, "first");
        let second = make_video(&store, "second");

        let created = store.set_featured_video(first).unwrap();
        assert_eq!(created.block_type, BlockType::FeaturedVideo);
        assert_eq!(created.reference_id, Some(first));

        let updated = store.set_featured_video(second).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.reference_id, Some(second));
        assert_eq!(store.list_layout().unwrap().len(), 1);
    }

    #[test]
    fn reorder_rewrites_positions_in_the_given_order() {
        let mut store = store();
        let a = make_album(&store, "A");
        let b = make_album(&store, "B");
        let c = make_album(&store, "C");

        store.reorder(ReorderScope::Albums, &[c, a, b]).unwrap();

        let titles: Vec<String> = store
            .list_albums()
            .unwrap()
            .into_iter()
            .map(|album| album.title)
            .collect();
        assert_eq!(titles, ["C", "A", "B"]);
    }

    #[test]
    fn track_reorder_stays_inside_its_album() {
        let mut store = store();
        let ours = make_album(&store, "Ours");
        let theirs = make_album(&store, "Theirs");
        let t1 = make_track(&store, ours, "one");
        let t2 = make_track(&store, ours, "two");
        let foreign = make_track(&store, theirs, "foreign");

        store
            .reorder(ReorderScope::Tracks { album_id: ours }, &[t2, t1, foreign])
            .unwrap();

        let ours_order: Vec<i64> = store
            .list_tracks(ours)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ours_order, [t2, t1]);
        // The foreign track never picked up the slot it was offered.
        assert_eq!(store.track(foreign).unwrap().position, 0);
    }

    #[test]
    fn referenced_files_skip_external_urls() {
        let store = store();
        let album_id = store
            .create_album(NewAlbum {
                title: "Covered".to_string(),
                cover_path: Some("cover.png".to_string()),
                ..Default::default()
            })
            .unwrap()
            .id;
        make_track(&store, album_id, "song");
        store
            .add_video(NewVideo {
                title: "Hosted".to_string(),
                file_path: "https://example.com/v.mp4".to_string(),
                thumbnail_path: Some("thumb.jpg".to_string()),
                ..Default::default()
            })
            .unwrap();
        store
            .add_media(NewMedia {
                title: None,
                file_path: "flyer.png".to_string(),
                kind: MediaKind::Image,
                position: None,
            })
            .unwrap();

        let files = store.referenced_files().unwrap();
        let expected: HashSet<String> = ["cover.png", "song.mp3", "thumb.jpg", "flyer.png"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(files, expected);
    }
}
