//! Tab-separated result ledger.
//!
//! One row per distinct record, in processing order, including records whose
//! URL, PDF or download failed. The header is written only when the file is new
//! or empty, so a ledger can be reopened and appended to across runs.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::WriteError;
use crate::models::Record;

/// Fixed ledger header. `relevant` is left empty for manual review.
pub const HEADER: [&str; 11] = [
    "idx", "link", "pdf", "title", "abstract", "venue", "year", "authors", "term", "errors",
    "relevant",
];

/// One ledger line, in [`HEADER`] order minus the trailing review cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub idx: String,
    pub link: String,
    pub pdf: String,
    pub title: String,
    pub r#abstract: String,
    pub venue: String,
    pub year: String,
    pub authors: String,
    pub term: String,
    pub errors: String,
}

impl LedgerRow {
    fn cells(&self) -> [&str; 11] {
        [
            self.idx.as_str(),
            self.link.as_str(),
            self.pdf.as_str(),
            self.title.as_str(),
            self.r#abstract.as_str(),
            self.venue.as_str(),
            self.year.as_str(),
            self.authors.as_str(),
            self.term.as_str(),
            self.errors.as_str(),
            "",
        ]
    }
}

impl From<&Record> for LedgerRow {
    fn from(record: &Record) -> Self {
        let paper = &record.paper;
        Self {
            idx: record.dedup_key.to_string(),
            link: record.canonical_url.clone().unwrap_or_default(),
            pdf: record.pdf_url.clone().unwrap_or_default(),
            title: paper.title.clone().unwrap_or_default(),
            r#abstract: paper.r#abstract.clone().unwrap_or_default(),
            venue: paper.venue.clone().unwrap_or_default(),
            year: paper.year.map(|y| y.to_string()).unwrap_or_default(),
            authors: paper.author_names(),
            term: record.term.clone(),
            errors: record.errors().joined(),
        }
    }
}

/// Open ledger file. Dropping it closes the file.
///
/// Each row is encoded in memory and handed to the file in one write, so an
/// interrupted run can at worst leave one torn row at the end. [`Ledger::open`]
/// cuts such a row off before appending.
pub struct Ledger {
    file: File,
    path: PathBuf,
}

impl Ledger {
    /// Open `path` for appending, writing the header if the file is new or empty.
    ///
    /// Bytes after the last complete row are discarded first.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source: std::io::Error| WriteError::Io { path: path.clone(), source };

        let scan = scan(&path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path).map_err(io_err)?;

        if scan.complete_len < scan.file_len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = scan.file_len - scan.complete_len,
                "discarding incomplete trailing row"
            );
            file.set_len(scan.complete_len).map_err(io_err)?;
        }

        let is_new = scan.complete_len == 0;
        if is_new {
            file.write_all(&encode(HEADER)?).map_err(io_err)?;
        }

        tracing::debug!(path = %path.display(), new = is_new, rows = scan.keys.len(), "ledger opened");
        Ok(Self { file, path })
    }

    /// Append rows in the given order.
    pub fn append<'a, I>(&mut self, rows: I) -> Result<(), WriteError>
    where
        I: IntoIterator<Item = &'a LedgerRow>,
    {
        for row in rows {
            let line = encode(row.cells())?;
            self.file.write_all(&line).map_err(|source| self.io_err(source))?;
        }
        Ok(())
    }

    /// Append the row for one record.
    pub fn append_record(&mut self, record: &Record) -> Result<(), WriteError> {
        self.append([&LedgerRow::from(record)])
    }

    /// Push written rows to disk.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.file.flush().map_err(|source| self.io_err(source))?;
        self.file.sync_data().map_err(|source| self.io_err(source))
    }

    fn io_err(&self, source: std::io::Error) -> WriteError {
        WriteError::Io { path: self.path.clone(), source }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").field("path", &self.path).finish()
    }
}

/// One TSV line, terminator included.
fn encode(cells: [&str; 11]) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(256));
    writer.write_record(cells)?;
    Ok(writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?)
}

/// What an existing ledger file holds.
#[derive(Debug, Default)]
struct Scan {
    /// `idx` of every complete data row.
    keys: Vec<String>,
    /// Byte length up to the end of the last complete row (header included).
    complete_len: u64,
    file_len: u64,
}

/// A row is complete when it has every column and ends in a line terminator.
fn scan(path: &Path) -> Result<Scan, WriteError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Scan::default()),
        Err(source) => return Err(WriteError::Io { path: path.to_path_buf(), source }),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut scan = Scan { file_len: bytes.len() as u64, ..Scan::default() };
    let mut row = csv::ByteRecord::new();
    while reader.read_byte_record(&mut row)? {
        let end = reader.position().byte();
        let terminated = usize::try_from(end)
            .ok()
            .and_then(|end| end.checked_sub(1))
            .and_then(|last| bytes.get(last))
            .is_some_and(|b| *b == b'\n');
        if row.len() != HEADER.len() || !terminated {
            continue;
        }
        scan.complete_len = end;

        let idx = row.get(0).map(String::from_utf8_lossy).unwrap_or_default();
        let idx = idx.trim();
        if !idx.is_empty() && idx != HEADER[0] {
            scan.keys.push(idx.to_string());
        }
    }
    Ok(scan)
}

/// `idx` values of the complete rows already in the ledger at `path`.
///
/// A missing file yields no keys. A torn trailing row is not counted.
pub fn existing_keys(path: impl AsRef<Path>) -> Result<Vec<String>, WriteError> {
    Ok(scan(path.as_ref())?.keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: &str) -> LedgerRow {
        LedgerRow {
            idx: idx.to_string(),
            link: format!("https://pub.example/{idx}"),
            pdf: String::new(),
            title: "A \"quoted\" title".to_string(),
            r#abstract: "line one\nline two\twith tab".to_string(),
            venue: "Interspeech".to_string(),
            year: "2023".to_string(),
            authors: "Ada Lovelace".to_string(),
            term: "ASR".to_string(),
            errors: "PDF URL not found".to_string(),
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader.records().map(|r| r.unwrap().iter().map(str::to_string).collect()).collect()
    }

    #[test]
    fn test_header_written_once_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");

        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger.append([&row("a")]).unwrap();
            ledger.flush().unwrap();
        }
        {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger.append([&row("b"), &row("c")]).unwrap();
        }

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], HEADER.iter().map(|h| (*h).to_string()).collect::<Vec<_>>());
        assert_eq!(rows[1][0], "a");
        assert_eq!(rows[2][0], "b");
        assert_eq!(rows[3][0], "c");
    }

    #[test]
    fn test_relevant_cell_always_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        Ledger::open(&path).unwrap().append([&row("a")]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[1].len(), HEADER.len());
        assert_eq!(rows[1][10], "");
        assert_eq!(rows[1][4], "line one\nline two\twith tab");
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        std::fs::write(&path, "").unwrap();

        drop(Ledger::open(&path).unwrap());
        assert_eq!(read_rows(&path).len(), 1);
    }

    #[test]
    fn test_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        assert!(existing_keys(&path).unwrap().is_empty());

        Ledger::open(&path).unwrap().append([&row("10.1/x"), &row("2101.00001")]).unwrap();
        assert_eq!(existing_keys(&path).unwrap(), vec!["10.1/x", "2101.00001"]);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Ledger::open(dir.path().join("nope").join("results.tsv")).unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }

    /// Header plus `complete` rows, then the first `cut` bytes of `torn`.
    fn write_torn(path: &Path, complete: &[LedgerRow], torn: &LedgerRow, cut: usize) {
        let mut bytes = encode(HEADER).unwrap();
        for row in complete {
            bytes.extend(encode(row.cells()).unwrap());
        }
        let tail = encode(torn.cells()).unwrap();
        bytes.extend_from_slice(&tail[..cut]);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_long_row_is_written_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        let mut long = row("10.1/long");
        long.r#abstract = format!("\"{}\"", "x".repeat(9000));

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.append([&long]).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        std::mem::forget(ledger);

        assert_eq!(on_disk.last(), Some(&b'\n'));
        assert_eq!(read_rows(&path)[1][4], long.r#abstract);
    }

    #[test]
    fn test_torn_quoted_row_is_dropped_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        let mut torn = row("10.1/b");
        torn.r#abstract = format!("\"{}\"", "y".repeat(9000));
        // Cut inside the quoted abstract
        write_torn(&path, &[row("10.1/a")], &torn, 200);

        assert_eq!(existing_keys(&path).unwrap(), vec!["10.1/a"]);

        Ledger::open(&path).unwrap().append([&row("10.1/c")]).unwrap();

        let rows = read_rows(&path);
        let idx: Vec<_> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(idx, vec!["idx", "10.1/a", "10.1/c"]);
        assert!(rows.iter().all(|r| r.len() == HEADER.len()));
        assert_eq!(existing_keys(&path).unwrap(), vec!["10.1/a", "10.1/c"]);
    }

    #[test]
    fn test_row_missing_only_its_newline_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        let torn = row("10.1/b");
        let full = encode(torn.cells()).unwrap().len();
        write_torn(&path, &[row("10.1/a")], &torn, full - 1);

        assert_eq!(existing_keys(&path).unwrap(), vec!["10.1/a"]);
        drop(Ledger::open(&path).unwrap());
        assert_eq!(read_rows(&path).len(), 2);
    }

    #[test]
    fn test_torn_header_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        std::fs::write(&path, "idx\tli").unwrap();

        Ledger::open(&path).unwrap().append([&row("a")]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "idx");
        assert_eq!(rows[1][0], "a");
    }
}
