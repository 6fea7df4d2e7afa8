//! Reading delimited input files and writing the enriched output.

use std::fs;
use std::path::Path;

use csv::StringRecord;

use crate::error::ReconError;

/// Read a file and convert to UTF-8 if needed.
///
/// The athlete-events dataset ships in Latin-1, so anything that is not
/// valid UTF-8 is decoded as Windows-1252 (a superset of Latin-1's
/// printable range).
pub fn read_source(path: &Path) -> Result<String, ReconError> {
    let bytes = fs::read(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    Ok(decode(bytes))
}

pub fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Headerless, flexible reader: width checks are done by the caller so
/// errors can name the offending row.
pub(crate) fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// 1-based line of a record, falling back to its record index.
pub(crate) fn line_of(record: &StringRecord, index: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(index + 1)
}

/// Write `bytes` next to `path` and rename into place, so a failed run never
/// leaves a truncated output behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReconError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", parent.display())))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, bytes)
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", tmp_path.display())))?;
    fs::rename(tmp_path, path).map_err(|e| {
        ReconError::Io(format!(
            "cannot rename {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode("Côte d'Ivoire".as_bytes().to_vec()), "Côte d'Ivoire");
    }

    #[test]
    fn latin1_is_decoded() {
        // "Côte" in Latin-1: 0xF4 is not valid UTF-8 on its own
        let bytes = vec![b'C', 0xF4, b't', b'e'];
        assert_eq!(decode(bytes), "Côte");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/enriched.csv");
        write_atomic(&path, b"a,b\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"a,b\n");
        assert!(!dir.path().join("out/enriched.csv.tmp").exists());
    }

    #[test]
    fn line_numbers_are_one_based() {
        let mut rdr = reader("h1,h2\nx,y\n");
        let records: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(line_of(&records[0], 0), 1);
        assert_eq!(line_of(&records[1], 1), 2);
    }
}
