//! Archive extraction.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Archive extraction capability.
///
/// Implementations are blocking; callers run them on the blocking pool.
pub trait Compressor: Send + Sync + 'static {
    /// Number of entries `extract` will report for `archive`.
    fn count_files(&self, archive: &Path) -> Result<u64>;

    /// Extract `archive` into `out_dir`, calling `on_entry` with the path of
    /// every extracted entry.
    fn extract(
        &self,
        archive: &Path,
        out_dir: &Path,
        on_entry: &mut dyn FnMut(&Path),
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    fn detect(archive: &Path) -> Result<Self> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveKind::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else {
            bail!("unsupported archive format: {}", archive.display())
        }
    }
}

/// [`Compressor`] for `.tar.gz` and `.zip` archives, chosen by file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCompressor;

impl ArchiveCompressor {
    pub fn new() -> Self {
        ArchiveCompressor
    }
}

impl Compressor for ArchiveCompressor {
    fn count_files(&self, archive: &Path) -> Result<u64> {
        match ArchiveKind::detect(archive)? {
            ArchiveKind::TarGz => {
                let mut tar = open_tar(archive)?;
                let mut count = 0;
                for entry in tar.entries().context("failed to read tarball entries")? {
                    entry.context("failed to read tarball entry")?;
                    count += 1;
                }
                Ok(count)
            }
            ArchiveKind::Zip => Ok(open_zip(archive)?.len() as u64),
        }
    }

    fn extract(
        &self,
        archive: &Path,
        out_dir: &Path,
        on_entry: &mut dyn FnMut(&Path),
    ) -> Result<()> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create directory: {}", out_dir.display()))?;

        match ArchiveKind::detect(archive)? {
            ArchiveKind::TarGz => extract_tar(archive, out_dir, on_entry),
            ArchiveKind::Zip => extract_zip(archive, out_dir, on_entry),
        }
        .with_context(|| format!("failed to extract {}", archive.display()))
    }
}

fn open_tar(archive: &Path) -> Result<Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
}

fn open_zip(archive: &Path) -> Result<zip::ZipArchive<BufReader<File>>> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("failed to read zip archive: {}", archive.display()))
}

/// Join an archive entry path onto `out_dir`, rejecting absolute paths and
/// `..` components.
fn safe_join(out_dir: &Path, entry: &Path) -> Result<PathBuf> {
    let mut joined = out_dir.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => bail!("archive entry escapes destination directory: {}", entry.display()),
        }
    }
    Ok(joined)
}

fn extract_tar(archive: &Path, out_dir: &Path, on_entry: &mut dyn FnMut(&Path)) -> Result<()> {
    let mut tar = open_tar(archive)?;
    tar.set_preserve_permissions(true);

    for entry in tar.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();
        let output_path = safe_join(out_dir, &entry_path)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            _ => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
        }

        on_entry(&output_path);
    }
    Ok(())
}

fn extract_zip(archive: &Path, out_dir: &Path, on_entry: &mut dyn FnMut(&Path)) -> Result<()> {
    let mut zip = open_zip(archive)?;

    for i in 0..zip.len() {
        let mut file = zip.by_index(i).context("failed to read zip entry")?;
        let name = file
            .enclosed_name()
            .with_context(|| format!("archive entry escapes destination directory: {}", file.name()))?;
        let output_path = safe_join(out_dir, &name)?;

        if file.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&output_path)
                .with_context(|| format!("failed to create file: {}", output_path.display()))?;
            std::io::copy(&mut file, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    fs::set_permissions(&output_path, fs::Permissions::from_mode(mode))?;
                }
            }
        }

        on_entry(&output_path);
    }
    Ok(())
}
