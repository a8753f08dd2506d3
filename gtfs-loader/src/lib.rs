/*! Schema driven loading and patching of [GTFS](https://gtfs.org/) feed directories.

A feed directory is loaded into a [Feed]: one [Collection] of typed entities per file,
indexed by primary key (and group key). The feed can be modified in memory, then written
back to a directory with [FeedPatcher], which leaves every other file of the directory untouched.

To get started, see [FeedLoader] and [Schema::gtfs_subset].

## Design decisions

### A declarative schema

What a file holds is described by a [FileSpec]: its fields with their [FieldType], whether they are
required, and their defaults. A single converter interprets every field type, there is no per-file code.
Tabular files (CSV `.txt`) hold flat rows; tree files (`.geojson`) hold a JSON document checked against
nested record specs.

### Lossless round trip

Columns not declared by the schema are kept as text and written back at their position.
Declared optional fields absent from a file are added with their defaults when it is written.
Values are written in their canonical text form, e.g. times as `HH:MM:SS`.

### Indexing

Entities sharing a primary key are kept together when the file declares a group key
(`stop_times.txt` is grouped by `stop_sequence` under each `trip_id`).
Loading and writing can both sort collections canonically, see [FeedLoader::sorted_read()] and
[FeedPatcher::sorted_output()].

### References between files

Entities don't point back to their feed. Derived data that follows references, like the first
departure of a [Trip], goes through views borrowing the whole [Feed].
*/
#![warn(missing_docs)]

#[macro_use]
extern crate derivative;

mod collection;
mod convert;
mod enums;
pub mod error;
mod feed;
mod field;
mod lat_lon;
mod reader;
mod schema;
mod tree;
mod value;
mod views;
mod writer;

#[cfg(test)]
mod tests;

pub use collection::{Collection, Entities};
pub use convert::{convert, parse_date, parse_time};
pub use enums::{DropOffType, ExceptionType, PickupType, TransferType};
pub use error::{ConversionError, Error, Location, Result};
pub use feed::Feed;
pub use field::{
    EnumDef, FieldSpec, FieldType, FileKind, FileSpec, FileSpecBuilder, RecordSpec, ScalarType,
    Schema,
};
pub use lat_lon::{LatLon, EARTH_RADIUS_M};
pub use reader::FeedLoader;
pub use schema::files;
pub use value::{Entity, EnumValue, Key, Value, DATE_FORMAT};
pub use views::{Service, Stop, StopTime, Transfer, Trip, DAY_SEC};
pub use writer::FeedPatcher;
