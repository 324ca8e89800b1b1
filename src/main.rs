use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use philosophy_resurrected::database::{
    AlbumTrack, AlbumUpdate, ContentStore, MediaKind, NewAlbum, NewBlock, NewMedia, NewTrack,
    NewVideo, ReorderScope, VideoUpdate,
};
use philosophy_resurrected::media::kind::{detect_kind, extension_allowed};
use philosophy_resurrected::media::uploads::Uploads;

#[derive(Parser, Debug)]
#[command(author, version, about = "Admin tool for the Philosophy Resurrected content store", long_about = None)]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "site.db")]
    db: PathBuf,

    /// Directory holding uploaded files.
    #[arg(long, default_value = "uploads")]
    uploads: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and uploads directory if they do not exist yet.
    Init,
    #[command(subcommand)]
    Album(AlbumCommand),
    #[command(subcommand)]
    Track(TrackCommand),
    #[command(subcommand)]
    Video(VideoCommand),
    #[command(subcommand)]
    Media(MediaCommand),
    #[command(subcommand)]
    Layout(LayoutCommand),
    /// Rewrite display positions to follow the given id order.
    Reorder {
        #[arg(long, value_enum)]
        scope: Scope,
        /// Owning album; required when reordering tracks.
        #[arg(long)]
        album_id: Option<i64>,
        ids: Vec<i64>,
    },
    /// Report dangling homepage references and uploads-directory drift.
    Scan,
    /// Dump every table as one JSON document.
    Export,
}

#[derive(Subcommand, Debug)]
enum AlbumCommand {
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Image file to upload as the cover.
        #[arg(long)]
        cover: Option<PathBuf>,
    },
    Update {
        id: i64,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
    },
    /// Delete the album, its tracks (cascade) and their files.
    Delete { id: i64 },
    List,
    /// Create an album from a directory of audio files, one track per file.
    Import {
        dir: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum TrackCommand {
    Add {
        album_id: i64,
        title: String,
        /// Audio file to upload, or a filename already in the pool.
        file: String,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum VideoCommand {
    Add {
        title: String,
        /// Video file to upload, or an external URL.
        file: String,
        #[arg(long)]
        thumbnail: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: i64,
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        thumbnail: Option<String>,
        /// Replacement video file; omit to keep the stored one.
        #[arg(long)]
        file: Option<String>,
    },
    Delete { id: i64 },
    List,
}

#[derive(Subcommand, Debug)]
enum MediaCommand {
    /// Upload a file into the generic media pool.
    Import {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// image, audio or video; sniffed from the file when omitted.
        #[arg(long)]
        kind: Option<String>,
    },
    Delete { id: i64 },
    List {
        #[arg(long)]
        kind: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum LayoutCommand {
    /// Append a block; the reference is stored as-is, unchecked.
    Add {
        #[arg(value_name = "TYPE")]
        block_type: String,
        #[arg(long)]
        reference_id: Option<i64>,
    },
    Remove { id: i64 },
    /// The homepage feed with referenced titles resolved.
    List {
        /// Restrict to blocks of one type (raw rows, no title resolution).
        #[arg(long = "type")]
        block_type: Option<String>,
    },
    SetFeatured { video_id: i64 },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Scope {
    Albums,
    Tracks,
    Videos,
    Media,
    Layout,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut store = ContentStore::open(&cli.db)?;
    let uploads = Uploads::new(cli.uploads.clone())?;

    match cli.command {
        Command::Init => {
            info!("Content store ready at {:?}, uploads at {:?}", cli.db, cli.uploads);
        }
        Command::Album(cmd) => run_album(cmd, &mut store, &uploads)?,
        Command::Track(cmd) => run_track(cmd, &store, &uploads)?,
        Command::Video(cmd) => run_video(cmd, &store, &uploads)?,
        Command::Media(cmd) => run_media(cmd, &store, &uploads)?,
        Command::Layout(cmd) => run_layout(cmd, &mut store)?,
        Command::Reorder { scope, album_id, ids } => {
            let scope = match scope {
                Scope::Albums => ReorderScope::Albums,
                Scope::Tracks => match album_id {
                    Some(album_id) => ReorderScope::Tracks { album_id },
                    None => bail!("--album-id is required when reordering tracks"),
                },
                Scope::Videos => ReorderScope::Videos,
                Scope::Media => ReorderScope::Media,
                Scope::Layout => ReorderScope::Layout,
            };
            store.reorder(scope, &ids)?;
            info!("Reordered {} rows", ids.len());
        }
        Command::Scan => {
            let dangling = store.scan_dangling_refs()?;
            let report = uploads.scan(&store.referenced_files()?)?;
            print_json(&json!({
                "dangling_references": dangling,
                "uploads": report,
            }))?;
        }
        Command::Export => {
            print_json(&json!({
                "albums": store.list_albums_with_tracks()?,
                "videos": store.list_videos()?,
                "media": store.list_media()?,
                "homepage": store.resolve_layout()?,
            }))?;
        }
    }

    Ok(())
}

fn run_album(cmd: AlbumCommand, store: &mut ContentStore, uploads: &Uploads) -> Result<()> {
    match cmd {
        AlbumCommand::Add { title, description, cover } => {
            let cover_path = cover.map(|p| upload_gated(uploads, &p, MediaKind::Image)).transpose()?;
            let album = store.create_album(NewAlbum {
                title,
                description,
                cover_path,
                position: None,
            })?;
            print_json(&album)?;
        }
        AlbumCommand::Update { id, title, description, cover } => {
            let cover_path = cover.map(|p| upload_gated(uploads, &p, MediaKind::Image)).transpose()?;
            store.update_album(id, AlbumUpdate { title, description, cover_path })?;
            info!("Updated album {}", id);
        }
        AlbumCommand::Delete { id } => {
            let album = store.album(id)?;
            let tracks = store.list_tracks(id)?;
            store.delete_album(id)?;
            if let Some(cover) = album.cover_path.as_deref() {
                uploads.remove_file(cover);
            }
            for track in tracks {
                uploads.remove_file(&track.file_path);
            }
        }
        AlbumCommand::List => print_json(&store.list_albums_with_tracks()?)?,
        AlbumCommand::Import { dir, title, description, cover } => {
            let audio_files = audio_files_in(&dir)?;
            if audio_files.is_empty() {
                bail!("No audio files found in {dir:?}");
            }
            let cover_path = cover.map(|p| upload_gated(uploads, &p, MediaKind::Image)).transpose()?;

            let bar = ProgressBar::new(audio_files.len() as u64);
            bar.set_style(ProgressStyle::with_template(
                "{bar:40} {pos}/{len} {msg}",
            )?);

            let mut tracks = Vec::with_capacity(audio_files.len());
            for path in audio_files {
                bar.set_message(path.file_name().unwrap_or_default().to_string_lossy().to_string());
                let stored = uploads.store_file(&path)?;
                let track_title = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_else(|| stored.clone());
                tracks.push(AlbumTrack { title: track_title, file_path: stored });
                bar.inc(1);
            }
            bar.finish_and_clear();

            let album_title = match title {
                Some(title) => title,
                None => dir
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .context("Cannot derive an album title from the directory name")?,
            };
            let bundle = store.create_album_with_tracks(
                NewAlbum {
                    title: album_title,
                    description,
                    cover_path,
                    position: None,
                },
                tracks,
            )?;
            print_json(&bundle)?;
        }
    }
    Ok(())
}

fn run_track(cmd: TrackCommand, store: &ContentStore, uploads: &Uploads) -> Result<()> {
    match cmd {
        TrackCommand::Add { album_id, title, file } => {
            // A real path gets uploaded; anything else is stored verbatim,
            // so tracks can point at files already in the pool.
            let file_path = if Path::new(&file).exists() {
                upload_gated(uploads, Path::new(&file), MediaKind::Audio)?
            } else {
                file
            };
            let track = store.add_track(NewTrack {
                album_id,
                title,
                file_path,
                position: None,
            })?;
            print_json(&track)?;
        }
        TrackCommand::Delete { id } => {
            let track = store.track(id)?;
            store.delete_track(id)?;
            uploads.remove_file(&track.file_path);
        }
    }
    Ok(())
}

fn run_video(cmd: VideoCommand, store: &ContentStore, uploads: &Uploads) -> Result<()> {
    match cmd {
        VideoCommand::Add { title, file, thumbnail, description } => {
            let file_path = resolve_video_source(uploads, file)?;
            let video = store.add_video(NewVideo {
                title,
                file_path,
                thumbnail_path: thumbnail,
                description,
                position: None,
            })?;
            print_json(&video)?;
        }
        VideoCommand::Update { id, title, description, thumbnail, file } => {
            let file_path = file.map(|f| resolve_video_source(uploads, f)).transpose()?;
            store.update_video(id, VideoUpdate {
                title,
                description,
                thumbnail_path: thumbnail,
                file_path,
            })?;
            info!("Updated video {}", id);
        }
        VideoCommand::Delete { id } => {
            let video = store.video(id)?;
            store.delete_video(id)?;
            uploads.remove_file(&video.file_path);
            if let Some(thumbnail) = video.thumbnail_path.as_deref() {
                uploads.remove_file(thumbnail);
            }
        }
        VideoCommand::List => print_json(&store.list_videos()?)?,
    }
    Ok(())
}

fn run_media(cmd: MediaCommand, store: &ContentStore, uploads: &Uploads) -> Result<()> {
    match cmd {
        MediaCommand::Import { file, title, kind } => {
            let kind = match kind {
                Some(tag) => MediaKind::from(tag.as_str()),
                None => detect_kind(&file),
            };
            let stored = upload_gated(uploads, &file, kind.clone())?;
            let title = title.or_else(|| {
                file.file_name().map(|name| name.to_string_lossy().to_string())
            });
            let item = store.add_media(NewMedia {
                title,
                file_path: stored,
                kind,
                position: None,
            })?;
            print_json(&item)?;
        }
        MediaCommand::Delete { id } => {
            let item = store.media_item(id)?;
            store.delete_media(id)?;
            uploads.remove_file(&item.file_path);
        }
        MediaCommand::List { kind } => match kind {
            Some(tag) => print_json(&store.list_media_by_kind(&MediaKind::from(tag.as_str()))?)?,
            None => print_json(&store.list_media()?)?,
        },
    }
    Ok(())
}

fn run_layout(cmd: LayoutCommand, store: &mut ContentStore) -> Result<()> {
    match cmd {
        LayoutCommand::Add { block_type, reference_id } => {
            let block = store.add_block(NewBlock {
                block_type: block_type.as_str().into(),
                reference_id,
                position: None,
            })?;
            print_json(&block)?;
        }
        LayoutCommand::Remove { id } => store.remove_block(id)?,
        LayoutCommand::List { block_type } => match block_type {
            Some(tag) => {
                print_json(&store.list_layout_by_type(&tag.as_str().into())?)?
            }
            None => print_json(&store.resolve_layout()?)?,
        },
        LayoutCommand::SetFeatured { video_id } => {
            let block = store.set_featured_video(video_id)?;
            print_json(&block)?;
        }
    }
    Ok(())
}

/// Upload after checking the filename against the per-kind extension gate.
fn upload_gated(uploads: &Uploads, path: &Path, kind: MediaKind) -> Result<String> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    if !extension_allowed(&filename, &kind) {
        bail!("File type not allowed for kind '{kind}': {filename}");
    }
    uploads.store_file(path)
}

/// External URLs are stored verbatim; anything else must be a local video
/// file and goes through the uploads pool.
fn resolve_video_source(uploads: &Uploads, file: String) -> Result<String> {
    if file.contains("://") {
        return Ok(file);
    }
    upload_gated(uploads, Path::new(&file), MediaKind::Video)
}

fn audio_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        let filename = entry.file_name().to_string_lossy().to_string();
        if path.is_file() && extension_allowed(&filename, &MediaKind::Audio) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
