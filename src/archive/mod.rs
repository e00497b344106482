use std::fs;
use std::io;
use std::path::Path;

use log::info;
use zip::read::ZipArchive;

/// Extract a zip archive into `dest_dir`, creating directories as needed.
/// Entry names are sanitized by the zip crate before they touch the
/// filesystem.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), String> {
    info!(
        "archive: extracting {} into {}",
        archive_path.display(),
        dest_dir.display()
    );
    let file = fs::File::open(archive_path).map_err(|e| format!("zip open error: {e}"))?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("zip parse error: {e}"))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("zip entry error: {e}"))?;
        let out_path = dest_dir.join(entry.mangled_name());
        if entry.name().ends_with('/') {
            fs::create_dir_all(&out_path).map_err(|e| format!("zip dir create error: {e}"))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("zip parent dir error: {e}"))?;
        }
        let mut out_file =
            fs::File::create(&out_path).map_err(|e| format!("zip create file error: {e}"))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| format!("zip write error: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::io::{Cursor, Write};
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Build a small in-memory zip from (name, contents) pairs.
    pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    /// Write a zip fixture to `path`.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        fs::write(path, zip_bytes(entries)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_files_and_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("g12.zip");
        test_support::write_zip(
            &archive_path,
            &[
                ("hlboot.dat", b"boot".as_slice()),
                ("assets/sprites.dat", b"pixels".as_slice()),
            ],
        );

        let dest = dir.path().join("bin").join("latest");
        extract_zip(&archive_path, &dest).unwrap();

        assert_eq!(fs::read(dest.join("hlboot.dat")).unwrap(), b"boot");
        assert_eq!(
            fs::read(dest.join("assets").join("sprites.dat")).unwrap(),
            b"pixels"
        );
    }

    #[test]
    fn rejects_files_that_are_not_archives() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not-a.zip");
        fs::write(&bogus, b"plain text").unwrap();
        assert!(extract_zip(&bogus, dir.path()).is_err());
    }
}
