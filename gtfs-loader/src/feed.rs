use crate::collection::Collection;
use crate::error::Result;
use crate::field::Schema;
use crate::reader::FeedLoader;
use crate::writer::FeedPatcher;
use indexmap::IndexMap;
use log::info;
use std::path::Path;

/// Every collection of a loaded feed directory, by logical file name
///
/// Collections keep the order of the [Schema] they were loaded with.
/// Derived views such as [crate::Trip] borrow the whole feed to follow references between files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    collections: IndexMap<String, Collection>,
}

impl Feed {
    /// A feed without any collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a feed directory with the default [FeedLoader] options
    pub fn load<P: AsRef<Path>>(dir: P, schema: &Schema) -> Result<Self> {
        FeedLoader::default().load(dir, schema)
    }

    /// Writes the feed back with the default [FeedPatcher] options
    pub fn patch<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        schema: &Schema,
        in_dir: P,
        out_dir: Q,
    ) -> Result<()> {
        FeedPatcher::default().patch(self, schema, in_dir, out_dir)
    }

    /// Collection of a logical file name, e.g. `stop_times`
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Mutable collection of a logical file name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// Adds or replaces the collection of its file, returns the replaced one
    pub fn insert(&mut self, collection: Collection) -> Option<Collection> {
        let name = collection.spec().name().to_owned();
        self.collections.insert(name, collection)
    }

    /// Drops a collection; the next patch deletes its file from the output
    pub fn remove(&mut self, name: &str) -> Option<Collection> {
        self.collections.shift_remove(name)
    }

    /// Collections with their logical file names
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Collection)> {
        self.collections.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Number of collections, empty ones included
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Does the feed hold no collection
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Logs the number of entities of each file
    pub fn log_stats(&self) {
        for (name, collection) in self.iter() {
            if collection.is_empty() {
                info!("  {}: none", name);
            } else {
                info!(
                    "  {}: {} entities ({} keys)",
                    name,
                    collection.len(),
                    collection.keys().count()
                );
            }
        }
    }
}
