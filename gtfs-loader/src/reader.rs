use crate::collection::Collection;
use crate::convert::convert;
use crate::error::{Error, Location, Result};
use crate::feed::Feed;
use crate::field::{FieldSpec, FileKind, FileSpec, Schema};
use crate::tree;
use crate::value::Entity;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Allows to parameterize how a feed directory is loaded
///
/// ```no_run
/// let schema = gtfs_loader::Schema::gtfs_subset()?;
/// let feed = gtfs_loader::FeedLoader::default()
///     .sorted_read(true) // Entities are indexed in canonical order
///     .load("fixtures/basic", &schema)?;
/// assert_eq!(2, feed.get("trips").map_or(0, |c| c.len()));
/// # Ok::<(), gtfs_loader::Error>(())
/// ```
#[derive(Derivative, Debug, Clone)]
#[derivative(Default)]
pub struct FeedLoader {
    /// Sort every collection canonically once it is loaded
    #[derivative(Default(value = "false"))]
    pub sorted_read: bool,
    /// Ignore the spaces following a delimiter in tabular files
    #[derivative(Default(value = "true"))]
    pub skip_initial_space: bool,
}

impl FeedLoader {
    /// Sort collections by primary key, then group key (default: false)
    ///
    /// Returns Self and can be chained
    pub fn sorted_read(mut self, sorted_read: bool) -> Self {
        self.sorted_read = sorted_read;
        self
    }

    /// Ignore the spaces following a delimiter (default: true)
    ///
    /// Returns Self and can be chained
    pub fn skip_initial_space(mut self, skip_initial_space: bool) -> Self {
        self.skip_initial_space = skip_initial_space;
        self
    }

    /// Loads every file of `schema` found in the directory
    ///
    /// Absent optional files give empty collections. The first error aborts the whole load.
    pub fn load<P: AsRef<Path>>(&self, dir: P, schema: &Schema) -> Result<Feed> {
        let dir = dir.as_ref();
        let mut feed = Feed::new();
        for spec in schema.iter() {
            info!("Loading {}", spec.name());
            let path = dir.join(spec.filename());
            let collection = if path.is_file() {
                self.load_file(&path, spec)?
            } else if spec.required() {
                return Err(Error::MissingRequiredFile {
                    file_name: spec.filename().to_owned(),
                    reason: "missing",
                });
            } else {
                Collection::empty(spec.clone())
            };
            feed.insert(collection);
        }
        Ok(feed)
    }

    fn load_file(&self, path: &Path, spec: &Arc<FileSpec>) -> Result<Collection> {
        let file_name = spec.filename();
        let file = File::open(path).map_err(Error::named_io(file_name))?;
        let reader = skip_bom(file, file_name)?;
        match spec.kind() {
            FileKind::Tabular => self.read_tabular(reader, spec),
            FileKind::Tree => {
                let mut collection = tree::read_tree(reader, spec)?;
                if self.sorted_read {
                    collection.sort();
                }
                Ok(collection)
            }
        }
    }

    /// Parses a tabular file: the header row, then one entity per non blank row
    pub(crate) fn read_tabular<R: Read>(&self, reader: R, spec: &Arc<FileSpec>) -> Result<Collection> {
        let file_name = spec.filename();
        let csv_error = |source| Error::CSVError {
            file_name: file_name.to_owned(),
            source,
        };
        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(SkipInitialSpace::new(reader, self.skip_initial_space))
            .into_records();

        let header: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(csv_error)?
                .iter()
                .map(str::to_owned)
                .collect(),
            None => return empty_file(spec),
        };

        let fields = reconcile_header(spec, &header)?;
        let columns = columns(&fields, &header);
        let mut collection = Collection::new(spec.clone(), fields);

        for result in records {
            let record = result.map_err(csv_error)?;
            if record.is_empty() {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let entity = self.parse_row(file_name, &columns, &record, line)?;
            collection.insert(entity);
        }

        if self.sorted_read {
            collection.sort();
        }
        Ok(collection)
    }

    fn parse_row(
        &self,
        file_name: &str,
        columns: &[Column],
        record: &csv::StringRecord,
        line: u64,
    ) -> Result<Entity> {
        let mut entity = Entity::new();
        for column in columns {
            let raw = column.index.and_then(|i| record.get(i));
            let value = match raw {
                Some("") | None if column.field.required => {
                    return Err(Error::EmptyRequiredValue {
                        file_name: file_name.to_owned(),
                        location: Location::Line(line),
                        field: column.name.clone(),
                    })
                }
                Some(raw) => convert(&column.field, raw).map_err(|e| {
                    Error::conversion(file_name, Location::Line(line), &column.name, e)
                })?,
                None => column.field.default.clone(),
            };
            entity.set(column.name.as_str(), value);
        }
        Ok(entity)
    }
}

/// A resolved field and the position of its cell in the rows
struct Column {
    name: String,
    field: FieldSpec,
    index: Option<usize>,
}

fn columns(fields: &IndexMap<String, FieldSpec>, header: &[String]) -> Vec<Column> {
    fields
        .iter()
        .map(|(name, field)| Column {
            name: name.clone(),
            field: field.clone(),
            // a repeated column name keeps the value of its last occurrence
            index: header.iter().rposition(|h| h == name),
        })
        .collect()
}

/// Resolves the fields of a file from its actual header
///
/// Header columns come first, in file order. Unknown columns are read as optional text.
/// Declared optional fields missing from the header follow, so that they are written back.
pub(crate) fn reconcile_header(
    spec: &FileSpec,
    header: &[String],
) -> Result<IndexMap<String, FieldSpec>> {
    let declared = spec.fields();
    let mut fields = IndexMap::with_capacity(header.len());
    for name in header {
        let field = match declared.get(name) {
            Some(field) => field.clone(),
            None => {
                debug!("{}: column {} is not declared, read as text", spec.filename(), name);
                FieldSpec::unknown()
            }
        };
        fields.entry(name.clone()).or_insert(field);
    }

    for (name, field) in declared {
        if fields.contains_key(name) {
            continue;
        }
        if field.required {
            return Err(Error::MissingRequiredField {
                file_name: spec.filename().to_owned(),
                location: Location::Header,
                field: name.clone(),
            });
        }
        fields.insert(name.clone(), field.clone());
    }
    Ok(fields)
}

fn empty_file(spec: &Arc<FileSpec>) -> Result<Collection> {
    if spec.required() {
        return Err(Error::MissingRequiredFile {
            file_name: spec.filename().to_owned(),
            reason: "empty",
        });
    }
    warn!("{} is empty, skipped", spec.filename());
    Ok(Collection::empty(spec.clone()))
}

/// Drops the UTF-8 byte order mark a file might start with
pub(crate) fn skip_bom<R: Read>(mut reader: R, file_name: &str) -> Result<impl Read> {
    let mut head = Vec::with_capacity(UTF8_BOM.len());
    reader
        .by_ref()
        .take(UTF8_BOM.len() as u64)
        .read_to_end(&mut head)
        .map_err(Error::named_io(file_name))?;
    if head == UTF8_BOM {
        head.clear();
    }
    Ok(Cursor::new(head).chain(reader))
}

/// Drops the spaces starting a cell before the csv parser sees them
///
/// A quote following those spaces still opens a quoted cell, and spaces inside quotes are kept.
pub(crate) struct SkipInitialSpace<R> {
    inner: R,
    enabled: bool,
    state: CellState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Start,
    Unquoted,
    Quoted,
    /// A quote inside a quoted cell: either its end or the first half of an escaped quote
    QuoteInQuoted,
}

impl<R: Read> SkipInitialSpace<R> {
    pub(crate) fn new(inner: R, enabled: bool) -> Self {
        Self {
            inner,
            enabled,
            state: CellState::Start,
        }
    }

    fn keep(&mut self, byte: u8) -> bool {
        use CellState::*;
        let (state, keep) = match (self.state, byte) {
            (Start, b' ') => (Start, false),
            (Quoted, b'"') => (QuoteInQuoted, true),
            (Quoted, _) => (Quoted, true),
            (_, b',' | b'\n' | b'\r') => (Start, true),
            (Start | QuoteInQuoted, b'"') => (Quoted, true),
            _ => (Unquoted, true),
        };
        self.state = state;
        keep
    }
}

impl<R: Read> Read for SkipInitialSpace<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.enabled {
            return self.inner.read(buf);
        }
        loop {
            let read = self.inner.read(buf)?;
            if read == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..read {
                let byte = buf[i];
                if self.keep(byte) {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            // a chunk made only of skipped spaces is not the end of the input
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
