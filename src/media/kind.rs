use std::path::Path;

use crate::database::MediaKind;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "ogg"];

fn extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Gate for uploads: does this filename's extension belong to the requested
/// kind? Note ogg is legal for both audio and video.
pub fn extension_allowed(filename: &str, kind: &MediaKind) -> bool {
    let ext = extension(filename);
    let allowed = match kind {
        MediaKind::Image => IMAGE_EXTENSIONS,
        MediaKind::Audio => AUDIO_EXTENSIONS,
        MediaKind::Video => VIDEO_EXTENSIONS,
        MediaKind::Other(_) => return false,
    };
    allowed.contains(&ext.as_str())
}

/// Best-effort kind detection for a file on disk: content sniffing first,
/// extension fallback for formats the sniffer cannot place (e.g. svg).
pub fn detect_kind(path: &Path) -> MediaKind {
    if let Ok(Some(sniffed)) = infer::get_from_path(path) {
        let mime = sniffed.mime_type();
        if let Some(kind) = kind_from_mime(mime) {
            return kind;
        }
        return MediaKind::Other(mime.to_string());
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    for kind in [MediaKind::Image, MediaKind::Audio, MediaKind::Video] {
        if extension_allowed(&filename, &kind) {
            return kind;
        }
    }
    MediaKind::Other("application/octet-stream".to_string())
}

fn kind_from_mime(mime: &str) -> Option<MediaKind> {
    if mime.starts_with("image/") {
        Some(MediaKind::Image)
    } else if mime.starts_with("audio/") {
        Some(MediaKind::Audio)
    } else if mime.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}
