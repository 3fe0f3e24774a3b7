use crate::repair::feed_table::FeedTable;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// structural normalization is re-checked after every fix; archives nested
/// deeper than this are left to fail the required-member validation
const NORMALIZE_ROUNDS_LIMIT: usize = 4;

/// member names of the archive, in listing order, directory entries included
pub fn list_members(path: &Path) -> Result<Vec<String>, RepairError> {
    let mut archive = open_archive(path)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let member = archive.by_index(i).map_err(|e| read_error(path, e))?;
        names.push(member.name().to_string());
    }
    Ok(names)
}

/// parse every member recognized as a GTFS table. duplicated member names
/// keep their first occurrence, matching rewrite behavior.
pub fn read_tables(path: &Path) -> Result<FeedBundle, RepairError> {
    let mut archive = open_archive(path)?;
    let mut bundle = FeedBundle::default();
    for i in 0..archive.len() {
        let member = archive.by_index(i).map_err(|e| read_error(path, e))?;
        let name = member.name().to_string();
        let Some(base) = member_basename(&name) else {
            continue;
        };
        let Some(kind) = TableKind::from_member_name(base) else {
            continue;
        };
        let table = FeedTable::from_reader(base, member)?;
        bundle.insert(kind, table);
    }
    Ok(bundle)
}

/// resolve archive-level anomalies before any table rule runs: an archive
/// zipped inside the archive is unwrapped one level, and members placed
/// under a subdirectory are flattened to the root. returns the names of the
/// normalizations applied, in order.
pub fn normalize_archive(path: &Path) -> Result<Vec<String>, RepairError> {
    let mut applied: Vec<String> = Vec::new();
    for _ in 0..NORMALIZE_ROUNDS_LIMIT {
        let names = list_members(path)?;
        let nested = names
            .first()
            .map(|n| n.to_ascii_lowercase().ends_with(".zip"))
            .unwrap_or(false);
        if nested {
            unwrap_nested_archive(path, &names[0])?;
            applied.push(String::from("nested_zip"));
            continue;
        }
        let stops = TableKind::Stops.member_name();
        let at_root = names.iter().any(|n| n == stops);
        let under_directory = names.iter().any(|n| n.contains(stops));
        if !at_root && under_directory {
            rewrite_archive(path, &HashMap::new())?;
            applied.push(String::from("subdirectory_members"));
            continue;
        }
        return Ok(applied);
    }
    log::warn!(
        "archive {} still carries structural anomalies after {NORMALIZE_ROUNDS_LIMIT} normalization rounds",
        path.display()
    );
    Ok(applied)
}

/// reconstruct the archive with the overridden tables replaced and every
/// other member copied byte-for-byte. member order is preserved; names are
/// flattened to their basename and directory entries dropped. the rewrite
/// goes through a scratch workspace beside the target so the final rename
/// is atomic, and the workspace is removed on success and failure alike.
pub fn rewrite_archive(
    path: &Path,
    overrides: &HashMap<TableKind, FeedTable>,
) -> Result<(), RepairError> {
    let mut archive = open_archive(path)?;
    rewrite_members(&mut archive, path, overrides)
}

fn rewrite_members<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    dest: &Path,
    overrides: &HashMap<TableKind, FeedTable>,
) -> Result<(), RepairError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let scratch = tempfile::Builder::new()
        .prefix(".gtfs-mend-")
        .tempdir_in(parent)
        .map_err(|e| write_error(dest, format!("failed creating scratch workspace: {e}")))?;
    let scratch_path = scratch.path().join("rewrite.zip");

    let out = File::create(&scratch_path).map_err(|e| write_error(dest, e))?;
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut written: HashSet<String> = HashSet::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|e| read_error(dest, e))?;
        let name = member.name().to_string();
        let Some(base) = member_basename(&name) else {
            continue;
        };
        if !written.insert(base.to_string()) {
            log::warn!(
                "dropping duplicate member '{base}' while rewriting {}",
                dest.display()
            );
            continue;
        }
        writer
            .start_file(base, options)
            .map_err(|e| write_error(dest, e))?;
        match TableKind::from_member_name(base).and_then(|kind| overrides.get(&kind)) {
            Some(table) => {
                let bytes = table.to_bytes()?;
                writer.write_all(&bytes).map_err(|e| write_error(dest, e))?;
            }
            None => {
                io::copy(&mut member, &mut writer).map_err(|e| write_error(dest, e))?;
            }
        }
    }
    writer.finish().map_err(|e| write_error(dest, e))?;
    std::fs::rename(&scratch_path, dest).map_err(|e| write_error(dest, e))?;
    Ok(())
}

fn unwrap_nested_archive(path: &Path, member: &str) -> Result<(), RepairError> {
    let mut outer = open_archive(path)?;
    let mut inner_bytes: Vec<u8> = Vec::new();
    let mut nested = outer.by_name(member).map_err(|e| read_error(path, e))?;
    nested
        .read_to_end(&mut inner_bytes)
        .map_err(|e| read_error(path, e))?;
    drop(nested);
    let mut inner =
        ZipArchive::new(Cursor::new(inner_bytes)).map_err(|e| read_error(path, e))?;
    rewrite_members(&mut inner, path, &HashMap::new())
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, RepairError> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    ZipArchive::new(file).map_err(|e| read_error(path, e))
}

/// the member's filename with any directory prefix stripped; `None` for
/// pure directory entries
fn member_basename(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}

fn read_error<E: Display>(path: &Path, error: E) -> RepairError {
    RepairError::ArchiveReadError {
        path: path.display().to_string(),
        msg: format!("{error}"),
    }
}

fn write_error<E: Display>(path: &Path, error: E) -> RepairError {
    RepairError::ArchiveWriteError {
        path: path.display().to_string(),
        msg: format!("{error}"),
    }
}
