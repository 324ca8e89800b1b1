use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub album_id: i64,
    pub title: String,
    pub file_path: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    /// Local uploads filename or an external URL.
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub description: Option<String>,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub title: Option<String>,
    pub file_path: String,
    pub kind: MediaKind,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub id: i64,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub reference_id: Option<i64>,
    pub position: i64,
    pub created_at: String,
}

impl LayoutBlock {
    /// The cross-table reference this block carries, keyed by its type.
    /// The store never validates it; dangling references are legal rows.
    pub fn reference(&self) -> Option<LayoutRef> {
        let id = self.reference_id?;
        match self.block_type {
            BlockType::Album => Some(LayoutRef::Album(id)),
            BlockType::Video | BlockType::FeaturedVideo => Some(LayoutRef::Video(id)),
            BlockType::Media => Some(LayoutRef::Media(id)),
            _ => None,
        }
    }
}

/// A homepage block together with the display title of whatever it points at.
/// `title` stays `None` for blocks without a reference and for dangling ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBlock {
    #[serde(flatten)]
    pub block: LayoutBlock,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumWithTracks {
    #[serde(flatten)]
    pub album: Album,
    pub tracks: Vec<Track>,
}

/// A `homepage_layout` row whose reference points at no row in the table its
/// type implies. Reported by the orphan scan, never rejected on write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingRef {
    pub block_id: i64,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub reference_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewAlbum {
    pub title: String,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumUpdate {
    pub title: String,
    pub description: Option<String>,
    /// `None` leaves the stored cover untouched.
    pub cover_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub album_id: i64,
    pub title: String,
    pub file_path: String,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub title: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub description: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpdate {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_path: Option<String>,
    /// `None` leaves the stored file untouched.
    pub file_path: Option<String>,
}

/// One track of a bulk album import; position follows list order.
#[derive(Debug, Clone)]
pub struct AlbumTrack {
    pub title: String,
    pub file_path: String,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub title: Option<String>,
    pub file_path: String,
    pub kind: MediaKind,
    pub position: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewBlock {
    pub block_type: BlockType,
    pub reference_id: Option<i64>,
    pub position: Option<i64>,
}

/// Open tag for `media.kind`. The schema does not check it; unknown values
/// round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Other(String),
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for MediaKind {
    fn from(tag: &str) -> Self {
        match tag {
            "image" => MediaKind::Image,
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MediaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(MediaKind::from(tag.as_str()))
    }
}

/// Open tag for `homepage_layout.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    Hero,
    Album,
    Video,
    FeaturedVideo,
    Media,
    Banner,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Hero => "hero",
            BlockType::Album => "album",
            BlockType::Video => "video",
            BlockType::FeaturedVideo => "featured_video",
            BlockType::Media => "media",
            BlockType::Banner => "banner",
            BlockType::Other(tag) => tag,
        }
    }
}

impl From<&str> for BlockType {
    fn from(tag: &str) -> Self {
        match tag {
            "hero" => BlockType::Hero,
            "album" => BlockType::Album,
            "video" => BlockType::Video,
            "featured_video" => BlockType::FeaturedVideo,
            "media" => BlockType::Media,
            "banner" => BlockType::Banner,
            other => BlockType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(BlockType::from(tag.as_str()))
    }
}

/// Typed view of the polymorphic homepage reference: variant keyed by the
/// block's type, payload the referenced row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRef {
    Album(i64),
    Video(i64),
    Media(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_round_trips_unknown_tags() {
        let kind = MediaKind::from("pdf");
        assert_eq!(kind, MediaKind::Other("pdf".to_string()));
        assert_eq!(kind.as_str(), "pdf");
    }

    #[test]
    fn block_reference_follows_type() {
        let block = LayoutBlock {
            id: 1,
            block_type: BlockType::FeaturedVideo,
            reference_id: Some(7),
            position: 0,
            created_at: String::new(),
        };
        assert_eq!(block.reference(), Some(LayoutRef::Video(7)));

        let hero = LayoutBlock {
            block_type: BlockType::Hero,
            ..block
        };
        assert_eq!(hero.reference(), None);
    }
}
