use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tar::Archive;

use crate::error::ProfileDbError;

pub fn fs_error(path: &Path, err: io::Error) -> ProfileDbError {
    ProfileDbError::Filesystem(format!("{}: {err}", path.display()))
}

/// Decompresses `gz_path` into `target`, replacing whatever is there.
pub fn gunzip(gz_path: &Path, target: &Path) -> Result<(), ProfileDbError> {
    let file = File::open(gz_path).map_err(|err| fs_error(gz_path, err))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));
    let out = File::create(target).map_err(|err| fs_error(target, err))?;
    let mut writer = BufWriter::new(out);
    io::copy(&mut decoder, &mut writer).map_err(|err| fs_error(gz_path, err))?;
    writer.flush().map_err(|err| fs_error(target, err))?;
    Ok(())
}

pub fn untar_gz(archive_path: &Path, target_dir: &Path) -> Result<(), ProfileDbError> {
    let file = File::open(archive_path).map_err(|err| fs_error(archive_path, err))?;
    fs::create_dir_all(target_dir).map_err(|err| fs_error(target_dir, err))?;
    let mut archive = Archive::new(MultiGzDecoder::new(BufReader::new(file)));
    archive
        .unpack(target_dir)
        .map_err(|err| fs_error(archive_path, err))
}

/// Writes the content of every source, in order, into `target`.
pub fn concatenate(sources: &[PathBuf], target: &Path) -> Result<(), ProfileDbError> {
    let out = File::create(target).map_err(|err| fs_error(target, err))?;
    let mut writer = BufWriter::new(out);
    for source in sources {
        let mut reader = File::open(source).map_err(|err| fs_error(source, err))?;
        io::copy(&mut reader, &mut writer).map_err(|err| fs_error(source, err))?;
    }
    writer.flush().map_err(|err| fs_error(target, err))?;
    Ok(())
}

pub fn append_file(source: &Path, target: &Path) -> Result<(), ProfileDbError> {
    let mut reader = File::open(source).map_err(|err| fs_error(source, err))?;
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .map_err(|err| fs_error(target, err))?;
    io::copy(&mut reader, &mut out).map_err(|err| fs_error(target, err))?;
    Ok(())
}

/// Removes a file or a directory tree; a missing path is not an error.
pub fn remove_path(path: &Path) -> Result<(), ProfileDbError> {
    if path.is_dir() {
        fs::remove_dir_all(path).map_err(|err| fs_error(path, err))
    } else if path.exists() {
        fs::remove_file(path).map_err(|err| fs_error(path, err))
    } else {
        Ok(())
    }
}

pub fn fresh_directory(path: &Path, delete_if_exists: bool) -> Result<(), ProfileDbError> {
    if delete_if_exists && path.exists() {
        remove_path(path)?;
    }
    fs::create_dir_all(path).map_err(|err| fs_error(path, err))
}

/// Checks that the parent of `path` exists and can be written to.
pub fn ensure_parent_writable(path: &Path) -> Result<(), ProfileDbError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().map_err(|err| fs_error(path, err))?,
    };
    fs::create_dir_all(&parent).map_err(|err| fs_error(&parent, err))?;
    let metadata = fs::metadata(&parent).map_err(|err| fs_error(&parent, err))?;
    if metadata.permissions().readonly() {
        return Err(ProfileDbError::Filesystem(format!(
            "{} is not writable",
            parent.display()
        )));
    }
    Ok(())
}

pub fn last_nonempty_line(path: &Path) -> Result<Option<String>, ProfileDbError> {
    let file = File::open(path).map_err(|err| fs_error(path, err))?;
    let mut last = None;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|err| fs_error(path, err))?;
        if !line.trim().is_empty() {
            last = Some(line);
        }
    }
    Ok(last)
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn gunzip_restores_content() {
        let dir = tempfile::tempdir().unwrap();
        let gz = dir.path().join("ko_list.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"knum\tthreshold\n").unwrap();
        encoder.finish().unwrap();

        let out = dir.path().join("ko_list");
        gunzip(&gz, &out).unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "knum\tthreshold\n");
    }

    #[test]
    fn last_line_skips_trailing_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("M00001");
        fs::write(&path, "ENTRY M00001\n///\n\n").unwrap();
        assert_eq!(last_nonempty_line(&path).unwrap().as_deref(), Some("///"));
    }

    #[test]
    fn remove_missing_path_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_path(&dir.path().join("nothing")).unwrap();
    }
}
