use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use zip::ZipArchive;

use crate::storage::ArchiveExtractor;

/// Unpacks `.zip` uploads into a directory next to the archive.
///
/// Every entry name is checked before anything is written: an archive with a
/// single entry that would land outside the destination is refused as a whole.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> anyhow::Result<()> {
        let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
        let mut zip = ZipArchive::new(file).with_context(|| format!("reading {}", archive.display()))?;

        let mut targets = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let entry = zip.by_index(index)?;
            targets.push(entry_target(destination, entry.name(), entry.enclosed_name())?);
        }

        fs::create_dir_all(destination)
            .with_context(|| format!("creating {}", destination.display()))?;

        for (index, target) in targets.into_iter().enumerate() {
            let mut entry = zip.by_index(index)?;
            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("creating {}", target.display()))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let mut out = File::create(&target)
                .with_context(|| format!("creating {}", target.display()))?;
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("writing {}", target.display()))?;
        }
        Ok(())
    }
}

fn entry_target(destination: &Path, name: &str, enclosed: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let Some(relative) = enclosed else {
        bail!("archive entry {name:?} escapes the extraction directory");
    };
    let target = destination.join(relative);
    if !target.starts_with(destination) {
        bail!("archive entry {name:?} escapes the extraction directory");
    }
    Ok(target)
}
