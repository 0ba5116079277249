//! Frame archive packaging.
//!
//! Collects the image files an extraction run produced and packs them
//! into a single deflate-compressed zip with the 64-bit size extension
//! enabled, entries named by path relative to the extraction root and
//! sorted lexicographically.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Recognized image extensions, matched case-insensitively.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

/// Zip entry name for a file under `root`: forward-slash separated,
/// relative to `root`.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel.iter().map(|c| c.to_str()).collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Find every recognized image anywhere under `root`, sorted by
/// relative path. Returns `(absolute_path, entry_name)` pairs.
pub fn collect_images(root: &Path) -> io::Result<Vec<(PathBuf, String)>> {
    let mut images = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        if let Some(name) = entry_name(root, entry.path()) {
            images.push((entry.path().to_path_buf(), name));
        }
    }

    images.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(images)
}

/// Package every image under `root` into a zip at `dest`, returning the
/// entry names in archive order.
pub fn write_archive(root: &Path, dest: &Path) -> Result<Vec<String>, ArchiveError> {
    let images = collect_images(root)?;

    let file = File::create(dest)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let mut entries = Vec::with_capacity(images.len());
    for (path, name) in images {
        writer.start_file(name.as_str(), options)?;
        let mut src = File::open(&path)?;
        io::copy(&mut src, &mut writer)?;
        entries.push(name);
    }

    writer.finish()?;
    Ok(entries)
}
