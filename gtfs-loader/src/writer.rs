use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::feed::Feed;
use crate::field::{FileKind, Schema};
use crate::value::Value;
use log::{debug, info};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Allows to parameterize how a feed is written back
///
/// The output directory receives a copy of every file of the input directory,
/// then the files of the schema are rewritten from the feed.
#[derive(Derivative, Debug, Clone)]
#[derivative(Default)]
pub struct FeedPatcher {
    /// Write entities in canonical order instead of their current order
    #[derivative(Default(value = "false"))]
    pub sorted_output: bool,
}

impl FeedPatcher {
    /// Write entities sorted by primary key, then group key (default: false)
    ///
    /// Returns Self and can be chained
    pub fn sorted_output(mut self, sorted_output: bool) -> Self {
        self.sorted_output = sorted_output;
        self
    }

    /// Writes `feed` to `out_dir`, starting from a copy of `in_dir`
    ///
    /// `in_dir` and `out_dir` may be the same directory. The file of an empty or absent collection
    /// is deleted from the output, so that no stale data survives.
    pub fn patch<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        feed: &Feed,
        schema: &Schema,
        in_dir: P,
        out_dir: Q,
    ) -> Result<()> {
        let (in_dir, out_dir) = (in_dir.as_ref(), out_dir.as_ref());
        let out_name = out_dir.display().to_string();
        fs::create_dir_all(out_dir).map_err(Error::named_io(&out_name))?;
        copy_files(in_dir, out_dir)?;

        for spec in schema.iter() {
            let path = out_dir.join(spec.filename());
            match feed.get(spec.name()).filter(|c| !c.is_empty()) {
                None => {
                    if path.exists() {
                        info!("Removing {}", spec.filename());
                        fs::remove_file(&path).map_err(Error::named_io(spec.filename()))?;
                    }
                }
                Some(collection) => {
                    info!("Writing {} ({} entities)", spec.filename(), collection.len());
                    match spec.kind() {
                        FileKind::Tabular => self.write_tabular(collection, &path)?,
                        FileKind::Tree => write_tree(collection, &path)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn write_tabular(&self, collection: &Collection, path: &Path) -> Result<()> {
        let file_name = collection.spec().filename();
        let csv_error = |source| Error::CSVError {
            file_name: file_name.to_owned(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        let fields = collection.fields();
        writer.write_record(fields.keys()).map_err(csv_error)?;

        let entities = if self.sorted_output {
            collection.sorted()
        } else {
            collection.iter().collect()
        };
        let mut row = Vec::with_capacity(fields.len());
        for entity in entities {
            row.clear();
            row.extend(
                fields
                    .keys()
                    .map(|name| entity.get(name).map(Value::to_string).unwrap_or_default()),
            );
            writer.write_record(&row).map_err(csv_error)?;
        }
        writer.flush().map_err(Error::named_io(file_name))
    }
}

fn write_tree(collection: &Collection, path: &Path) -> Result<()> {
    let file_name = collection.spec().filename();
    let file = File::create(path).map_err(Error::named_io(file_name))?;
    let mut writer = BufWriter::new(file);
    if let Some(document) = collection.document() {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        document
            .serialize(&mut serializer)
            .map_err(|source| Error::JsonError {
                file_name: file_name.to_owned(),
                source,
            })?;
    }
    writer.flush().map_err(Error::named_io(file_name))
}

/// Copies the regular files of `in_dir`, skipping any file copied onto itself
fn copy_files(in_dir: &Path, out_dir: &Path) -> Result<()> {
    let in_name = in_dir.display().to_string();
    for entry in fs::read_dir(in_dir).map_err(Error::named_io(&in_name))? {
        let source = entry.map_err(Error::named_io(&in_name))?.path();
        if !source.is_file() {
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = out_dir.join(name);
        if same_file(&source, &target) {
            continue;
        }
        debug!("Copying {}", source.display());
        fs::copy(&source, &target).map_err(Error::named_io(&name.to_string_lossy()))?;
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
