use super::{Row, StoreError, StoreResult, Table, TableStore};
use crate::config::TableFiles;
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Comma-delimited, header-bearing files in one data directory.
///
/// A missing file is an empty table; its header is written on first save or
/// append. A missing directory is never created implicitly.
#[derive(Debug, Clone)]
pub struct CsvTableStore {
    dir: PathBuf,
    files: TableFiles,
}

impl CsvTableStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self::with_files(dir, TableFiles::default())
    }

    pub fn with_files<P: AsRef<Path>>(dir: P, files: TableFiles) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files,
        }
    }

    pub fn path_for(&self, table: Table) -> PathBuf {
        self.dir.join(self.files.file_name(table))
    }

    fn ensure_dir(&self) -> StoreResult<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        Err(StoreError::unavailable(
            self.dir.display(),
            io::Error::new(io::ErrorKind::NotFound, "data directory does not exist"),
        ))
    }

    fn read_header(&self, table: Table, path: &Path) -> StoreResult<Option<Vec<String>>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::unavailable(path.display(), err)),
        };
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader
            .headers()
            .map_err(|err| csv_error(path, err))?
            .iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        if headers.is_empty() {
            return Ok(None);
        }
        debug!("event=read_header table={table} columns={}", headers.len());
        Ok(Some(headers))
    }

    fn write_rows<W: Write>(
        &self,
        table: Table,
        writer: W,
        rows: &[Row],
        with_header: bool,
    ) -> StoreResult<()> {
        let schema = table.schema();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        if with_header {
            writer.write_record(schema.columns)?;
        }
        for row in rows {
            schema.check_width(table, row)?;
            writer.write_record(row)?;
        }
        writer
            .flush()
            .map_err(|err| StoreError::unavailable(self.path_for(table).display(), err))?;
        Ok(())
    }
}

impl TableStore for CsvTableStore {
    fn load(&self, table: Table) -> StoreResult<Vec<Row>> {
        self.ensure_dir()?;
        let path = self.path_for(table);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("event=load table={table} status=absent");
                return Ok(Vec::new());
            }
            Err(err) => return Err(StoreError::unavailable(path.display(), err)),
        };

        let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(file);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| csv_error(&path, err))?
            .iter()
            .map(ToOwned::to_owned)
            .collect();
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let schema = table.schema();
        let projection = schema
            .projection(&headers)
            .ok_or_else(|| StoreError::SchemaMismatch {
                table,
                expected: schema.header(),
                found: headers.clone(),
            })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| csv_error(&path, err))?;
            let row = projection
                .iter()
                .map(|idx| {
                    idx.and_then(|i| record.get(i))
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                })
                .collect();
            rows.push(row);
        }
        debug!("event=load table={table} rows={}", rows.len());
        Ok(rows)
    }

    fn save(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        self.ensure_dir()?;
        let path = self.path_for(table);
        let tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|err| StoreError::unavailable(self.dir.display(), err))?;
        self.write_rows(table, tmp.as_file(), rows, true)?;
        tmp.as_file()
            .sync_all()
            .map_err(|err| StoreError::unavailable(path.display(), err))?;
        tmp.persist(&path)
            .map_err(|err| StoreError::unavailable(path.display(), err.error))?;
        info!("event=save table={table} rows={}", rows.len());
        Ok(())
    }

    fn append(&self, table: Table, rows: &[Row]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;
        let path = self.path_for(table);
        let schema = table.schema();

        let with_header = match self.read_header(table, &path)? {
            None => true,
            Some(found) if schema.is_canonical(&found) => false,
            Some(found) => {
                if schema.projection(&found).is_none() {
                    return Err(StoreError::SchemaMismatch {
                        table,
                        expected: schema.header(),
                        found,
                    });
                }
                // Column order differs from the canonical layout; rewrite instead.
                let mut existing = self.load(table)?;
                existing.extend(rows.iter().cloned());
                return self.save(table, &existing);
            }
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|err| StoreError::unavailable(path.display(), err))?;
        let unavailable = |err| StoreError::unavailable(path.display(), err);
        if !with_header && !ends_with_newline(&mut file).map_err(unavailable)? {
            file.write_all(b"\n").map_err(unavailable)?;
        }
        if with_header {
            // A header-less file may still contain stray bytes; start clean.
            file.set_len(0).map_err(unavailable)?;
        }
        self.write_rows(table, &mut file, rows, with_header)?;
        info!("event=append table={table} rows={}", rows.len());
        Ok(())
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn csv_error(path: &Path, err: csv::Error) -> StoreError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io_err) = err.into_kind() {
            return StoreError::unavailable(path.display(), io_err);
        }
        return StoreError::InvalidData(format!("unreadable file {}", path.display()));
    }
    StoreError::Csv(err)
}
