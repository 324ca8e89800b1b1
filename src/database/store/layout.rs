use rusqlite::{params, OptionalExtension};
use tracing::info;

use crate::database::error::{StoreError, StoreResult};
use crate::database::models::{
    BlockType, DanglingRef, LayoutBlock, LayoutRef, NewBlock, ResolvedBlock,
};
use crate::database::store::ContentStore;

fn block_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LayoutBlock> {
    Ok(LayoutBlock {
        id: row.get(0)?,
        block_type: BlockType::from(row.get::<_, String>(1)?.as_str()),
        reference_id: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const BLOCK_COLUMNS: &str = "id, type, reference_id, position, created_at";

impl ContentStore {
    /// The reference is stored untyped and unchecked: a dangling
    /// `reference_id` is accepted here and only surfaces through
    /// [`ContentStore::scan_dangling_refs`].
    pub fn add_block(&self, block: NewBlock) -> StoreResult<LayoutBlock> {
        let position = match block.position {
            Some(position) => position,
            None => self.next_position("homepage_layout")?,
        };
        let created_at = Self::now();
        let id: i64 = self.conn.query_row(
            "INSERT INTO homepage_layout (type, reference_id, position, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
            params![block.block_type.as_str(), block.reference_id, position, created_at],
            |row| row.get(0),
        )?;
        Ok(LayoutBlock {
            id,
            block_type: block.block_type,
            reference_id: block.reference_id,
            position,
            created_at,
        })
    }

    pub fn remove_block(&self, id: i64) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM homepage_layout WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "layout block", id });
        }
        Ok(())
    }

    pub fn list_layout(&self) -> StoreResult<Vec<LayoutBlock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM homepage_layout ORDER BY position ASC, id ASC"
        ))?;
        let blocks = stmt
            .query_map([], block_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(blocks)
    }

    pub fn list_layout_by_type(&self, block_type: &BlockType) -> StoreResult<Vec<LayoutBlock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM homepage_layout WHERE type = ?1
             ORDER BY position ASC, id ASC"
        ))?;
        let blocks = stmt
            .query_map(params![block_type.as_str()], block_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(blocks)
    }

    /// The homepage feed: every block with the display title of whatever it
    /// points at. Dangling references and reference-free blocks resolve to
    /// `None` rather than failing.
    pub fn resolve_layout(&self) -> StoreResult<Vec<ResolvedBlock>> {
        let blocks = self.list_layout()?;
        let mut resolved = Vec::with_capacity(blocks.len());
        for block in blocks {
            let title = match block.reference() {
                Some(reference) => self.reference_title(reference)?,
                None => None,
            };
            resolved.push(ResolvedBlock { block, title });
        }
        Ok(resolved)
    }

    /// Keeps the single `featured_video` block pointing at the given video,
    /// creating the block if the homepage has none yet. The target is
    /// validated; this is the one layout write that refuses a missing row.
    pub fn set_featured_video(&mut self, video_id: i64) -> StoreResult<LayoutBlock> {
        self.video(video_id)?;

        let tx = self.conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM homepage_layout WHERE type = 'featured_video'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let block = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE homepage_layout SET reference_id = ?1 WHERE id = ?2",
                    params![video_id, id],
                )?;
                tx.query_row(
                    &format!("SELECT {BLOCK_COLUMNS} FROM homepage_layout WHERE id = ?1"),
                    params![id],
                    block_from_row,
                )?
            }
            None => {
                let position: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(position), -1) + 1 FROM homepage_layout",
                    [],
                    |row| row.get(0),
                )?;
                let created_at = Self::now();
                let id: i64 = tx.query_row(
                    "INSERT INTO homepage_layout (type, reference_id, position, created_at)
                     VALUES ('featured_video', ?1, ?2, ?3)
                     RETURNING id",
                    params![video_id, position, created_at],
                    |row| row.get(0),
                )?;
                LayoutBlock {
                    id,
                    block_type: BlockType::FeaturedVideo,
                    reference_id: Some(video_id),
                    position,
                    created_at,
                }
            }
        };
        tx.commit()?;
        info!("Featured video set to {}", video_id);
        Ok(block)
    }

    /// Orphan scan for the unenforced polymorphic reference: every block
    /// whose reference points at no row in the table its type implies.
    /// Blocks of unknown types cannot be checked and are skipped.
    pub fn scan_dangling_refs(&self) -> StoreResult<Vec<DanglingRef>> {
        let mut dangling = Vec::new();
        for block in self.list_layout()? {
            let Some(reference) = block.reference() else {
                continue;
            };
            if !self.reference_exists(reference)? {
                dangling.push(DanglingRef {
                    block_id: block.id,
                    block_type: block.block_type,
                    reference_id: block.reference_id.unwrap_or_default(),
                });
            }
        }
        Ok(dangling)
    }

    fn reference_exists(&self, reference: LayoutRef) -> StoreResult<bool> {
        let (sql, id) = match reference {
            LayoutRef::Album(id) => ("SELECT 1 FROM albums WHERE id = ?1", id),
            LayoutRef::Video(id) => ("SELECT 1 FROM videos WHERE id = ?1", id),
            LayoutRef::Media(id) => ("SELECT 1 FROM media WHERE id = ?1", id),
        };
        let hit = self
            .conn
            .query_row(sql, params![id], |_| Ok(()))
            .optional()?;
        Ok(hit.is_some())
    }

    fn reference_title(&self, reference: LayoutRef) -> StoreResult<Option<String>> {
        let (sql, id) = match reference {
            LayoutRef::Album(id) => ("SELECT title FROM albums WHERE id = ?1", id),
            LayoutRef::Video(id) => ("SELECT title FROM videos WHERE id = ?1", id),
            LayoutRef::Media(id) => ("SELECT title FROM media WHERE id = ?1", id),
        };
        let title: Option<Option<String>> = self
            .conn
            .query_row(sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(title.flatten())
    }
}
