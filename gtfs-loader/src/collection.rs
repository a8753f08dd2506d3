//! In-memory shape of one loaded file: entities indexed by primary (and group) key
use crate::field::{FieldSpec, FileKind, FileSpec};
use crate::value::{Entity, Key, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Entities of a file, indexed according to its [FileSpec]
#[derive(Debug, Clone, PartialEq)]
pub enum Entities {
    /// One entity per primary key (no group key)
    Flat(IndexMap<Key, Entity>),
    /// Entities sharing a primary key, in insertion (or group key) order
    Grouped(IndexMap<Key, Vec<Entity>>),
    /// Entities sharing a primary key, keyed by their group key
    Nested(IndexMap<Key, IndexMap<Key, Entity>>),
    /// The root record of a tree document, None if the file was absent
    Tree(Option<Entity>),
}

impl Entities {
    fn for_spec(spec: &FileSpec) -> Self {
        match (spec.kind(), spec.group_key(), spec.nested_grouping()) {
            (FileKind::Tree, _, _) => Entities::Tree(None),
            (FileKind::Tabular, None, _) => Entities::Flat(IndexMap::new()),
            (FileKind::Tabular, Some(_), false) => Entities::Grouped(IndexMap::new()),
            (FileKind::Tabular, Some(_), true) => Entities::Nested(IndexMap::new()),
        }
    }
}

/// All entities of one file, with the fields needed to write them back
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    spec: Arc<FileSpec>,
    fields: IndexMap<String, FieldSpec>,
    entities: Entities,
}

impl Collection {
    /// An empty collection whose fields are the resolved `fields`
    pub fn new(spec: Arc<FileSpec>, fields: IndexMap<String, FieldSpec>) -> Self {
        let entities = Entities::for_spec(&spec);
        Self {
            spec,
            fields,
            entities,
        }
    }

    /// An empty collection holding the declared fields of `spec`
    pub fn empty(spec: Arc<FileSpec>) -> Self {
        let fields = spec.fields().clone();
        Self::new(spec, fields)
    }

    /// Description of the file
    pub fn spec(&self) -> &FileSpec {
        &self.spec
    }

    /// Resolved fields: the columns of the source file followed by the declared fields it lacked
    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// Indexed entities
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Mutable indexed entities
    pub fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }

    /// Number of entities, across all groups
    pub fn len(&self) -> usize {
        match &self.entities {
            Entities::Flat(map) => map.len(),
            Entities::Grouped(map) => map.values().map(Vec::len).sum(),
            Entities::Nested(map) => map.values().map(IndexMap::len).sum(),
            Entities::Tree(doc) => usize::from(doc.is_some()),
        }
    }

    /// Does the collection hold no entity
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Primary keys, in the current order
    pub fn keys(&self) -> Box<dyn Iterator<Item = &Key> + '_> {
        match &self.entities {
            Entities::Flat(map) => Box::new(map.keys()),
            Entities::Grouped(map) => Box::new(map.keys()),
            Entities::Nested(map) => Box::new(map.keys()),
            Entities::Tree(_) => Box::new(std::iter::empty()),
        }
    }

    /// Entity of a primary key, for files without group key
    pub fn get(&self, key: impl Into<Key>) -> Option<&Entity> {
        match &self.entities {
            Entities::Flat(map) => map.get(&key.into()),
            _ => None,
        }
    }

    /// Entities sharing a primary key, for files grouped as lists
    pub fn group(&self, key: impl Into<Key>) -> Option<&[Entity]> {
        match &self.entities {
            Entities::Grouped(map) => map.get(&key.into()).map(Vec::as_slice),
            _ => None,
        }
    }

    /// Entities sharing a primary key keyed by group key, for files grouped as maps
    pub fn nested_group(&self, key: impl Into<Key>) -> Option<&IndexMap<Key, Entity>> {
        match &self.entities {
            Entities::Nested(map) => map.get(&key.into()),
            _ => None,
        }
    }

    /// Entities of a primary key whatever the shape of the collection, in the current order
    pub fn select(&self, key: impl Into<Key>) -> Vec<&Entity> {
        let key = key.into();
        match &self.entities {
            Entities::Flat(map) => map.get(&key).into_iter().collect(),
            Entities::Grouped(map) => map.get(&key).map(|g| g.iter().collect()).unwrap_or_default(),
            Entities::Nested(map) => map.get(&key).map(|g| g.values().collect()).unwrap_or_default(),
            Entities::Tree(_) => Vec::new(),
        }
    }

    /// Root record of a tree document
    pub fn document(&self) -> Option<&Entity> {
        match &self.entities {
            Entities::Tree(doc) => doc.as_ref(),
            _ => None,
        }
    }

    /// Indexes an entity under its primary key (and group key)
    ///
    /// A flat entry or a nested (primary, group) entry is overwritten by a later one,
    /// list groups keep every entity in insertion order.
    pub fn insert(&mut self, entity: Entity) {
        let key = entity.key(self.spec.id_key());
        let group_key = self.spec.group_key().map(|g| entity.key(g));
        match (&mut self.entities, group_key) {
            (Entities::Tree(doc), _) => *doc = Some(entity),
            (Entities::Flat(map), _) => {
                map.insert(key, entity);
            }
            (Entities::Grouped(map), _) => map.entry(key).or_default().push(entity),
            (Entities::Nested(map), Some(group_key)) => {
                map.entry(key).or_default().insert(group_key, entity);
            }
            (Entities::Nested(map), None) => {
                map.entry(key).or_default().insert(Key::Null, entity);
            }
        }
    }

    /// Removes every entity of a primary key, returns whether there was any
    pub fn remove(&mut self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match &mut self.entities {
            Entities::Flat(map) => map.shift_remove(&key).is_some(),
            Entities::Grouped(map) => map.shift_remove(&key).is_some(),
            Entities::Nested(map) => map.shift_remove(&key).is_some(),
            Entities::Tree(_) => false,
        }
    }

    /// Reorders the collection canonically: primary keys, then group keys, in natural order
    pub fn sort(&mut self) {
        let group_key = self.spec.group_key().map(str::to_owned);
        match &mut self.entities {
            Entities::Flat(map) => map.sort_keys(),
            Entities::Grouped(map) => {
                if let Some(g) = &group_key {
                    for group in map.values_mut() {
                        group.sort_by(|a, b| a.key(g).cmp(&b.key(g)));
                    }
                }
                map.sort_keys();
            }
            Entities::Nested(map) => {
                for group in map.values_mut() {
                    group.sort_keys();
                }
                map.sort_keys();
            }
            Entities::Tree(_) => {}
        }
    }

    /// All entities, primary key by primary key, in the current order
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        match &self.entities {
            Entities::Flat(map) => Box::new(map.values()),
            Entities::Grouped(map) => Box::new(map.values().flatten()),
            Entities::Nested(map) => Box::new(map.values().flat_map(IndexMap::values)),
            Entities::Tree(doc) => Box::new(doc.iter()),
        }
    }

    /// All entities in canonical order, leaving the collection untouched
    pub fn sorted(&self) -> Vec<&Entity> {
        fn by_key<'a, T>(map: &'a IndexMap<Key, T>) -> Vec<(&'a Key, &'a T)> {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries
        }

        match &self.entities {
            Entities::Flat(map) => by_key(map).into_iter().map(|(_, e)| e).collect(),
            Entities::Grouped(map) => {
                let group_key = self.spec.group_key().unwrap_or_default();
                by_key(map)
                    .into_iter()
                    .flat_map(|(_, group)| {
                        let mut group: Vec<&Entity> = group.iter().collect();
                        group.sort_by(|a, b| a.key(group_key).cmp(&b.key(group_key)));
                        group
                    })
                    .collect()
            }
            Entities::Nested(map) => by_key(map)
                .into_iter()
                .flat_map(|(_, group)| by_key(group).into_iter().map(|(_, e)| e))
                .collect(),
            Entities::Tree(doc) => doc.iter().collect(),
        }
    }

    /// Copies the entities of `key` under `new_id`, rewriting their primary key field
    ///
    /// Returns the number of entities copied, 0 if `key` is unknown
    pub fn clone_entities(&mut self, key: impl Into<Key>, new_id: impl Into<Value>) -> usize {
        let key = key.into();
        let new_id = new_id.into();
        let new_key = Key::from(&new_id);
        let id_key = self.spec.id_key().to_owned();
        let rekey = |entity: &Entity| {
            let mut entity = entity.clone();
            entity.set(id_key.clone(), new_id.clone());
            entity
        };

        match &mut self.entities {
            Entities::Flat(map) => match map.get(&key).map(rekey) {
                Some(entity) => {
                    map.insert(new_key, entity);
                    1
                }
                None => 0,
            },
            Entities::Grouped(map) => match map
                .get(&key)
                .map(|g| g.iter().map(rekey).collect::<Vec<_>>())
            {
                Some(group) => {
                    let len = group.len();
                    map.insert(new_key, group);
                    len
                }
                None => 0,
            },
            Entities::Nested(map) => match map.get(&key).map(|g| {
                g.iter()
                    .map(|(k, e)| (k.clone(), rekey(e)))
                    .collect::<IndexMap<_, _>>()
            }) {
                Some(group) => {
                    let len = group.len();
                    map.insert(new_key, group);
                    len
                }
                None => 0,
            },
            Entities::Tree(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldType, FileSpec};

    fn spec(group: Option<&str>, nested: bool) -> Arc<FileSpec> {
        let mut builder = FileSpec::tabular("stop_times", "trip_id")
            .field("trip_id", FieldSpec::required(FieldType::STR))
            .field("stop_sequence", FieldSpec::required(FieldType::INT))
            .field("stop_id", FieldSpec::required(FieldType::STR))
            .nested_grouping(nested);
        if let Some(group) = group {
            builder = builder.group_by(group);
        }
        Arc::new(builder.build().unwrap())
    }

    fn stop_time(trip: &str, seq: i64, stop: &str) -> Entity {
        [
            ("trip_id".to_owned(), Value::from(trip)),
            ("stop_sequence".to_owned(), Value::from(seq)),
            ("stop_id".to_owned(), Value::from(stop)),
        ]
        .into_iter()
        .collect()
    }

    fn sequences(entities: &[&Entity]) -> Vec<i64> {
        entities
            .iter()
            .filter_map(|e| e.int("stop_sequence"))
            .collect()
    }

    #[test]
    fn flat_last_write_wins() {
        let mut c = Collection::empty(spec(None, false));
        c.insert(stop_time("A", 1, "s1"));
        c.insert(stop_time("A", 2, "s2"));
        assert_eq!(1, c.len());
        assert_eq!(Some("s2"), c.get("A").and_then(|e| e.str("stop_id")));
    }

    #[test]
    fn grouped_ordering() {
        let mut c = Collection::empty(spec(Some("stop_sequence"), false));
        for seq in [3, 1, 2] {
            c.insert(stop_time("A", seq, "s"));
        }
        let in_order: Vec<&Entity> = c.iter().collect();
        assert_eq!(vec![3, 1, 2], sequences(&in_order));
        assert_eq!(vec![1, 2, 3], sequences(&c.sorted()));

        c.sort();
        let group: Vec<&Entity> = c.group("A").unwrap().iter().collect();
        assert_eq!(vec![1, 2, 3], sequences(&group));
    }

    #[test]
    fn list_groups_keep_duplicates_nested_groups_overwrite() {
        let mut list = Collection::empty(spec(Some("stop_sequence"), false));
        let mut nested = Collection::empty(spec(Some("stop_sequence"), true));
        for c in [&mut list, &mut nested] {
            c.insert(stop_time("A", 1, "first"));
            c.insert(stop_time("A", 1, "second"));
        }
        assert_eq!(2, list.group("A").unwrap().len());
        let group = nested.nested_group("A").unwrap();
        assert_eq!(1, group.len());
        assert_eq!(Some("second"), group[&Key::Int(1)].str("stop_id"));
    }

    #[test]
    fn top_level_keys_sort_lexicographically() {
        let mut c = Collection::empty(spec(None, false));
        for trip in ["b", "a", "c"] {
            c.insert(stop_time(trip, 1, "s"));
        }
        c.sort();
        let keys: Vec<String> = c.keys().map(Key::to_string).collect();
        assert_eq!(vec!["a", "b", "c"], keys);
    }

    #[test]
    fn clone_rewrites_primary_key() {
        let mut c = Collection::empty(spec(Some("stop_sequence"), false));
        c.insert(stop_time("A", 1, "s1"));
        c.insert(stop_time("A", 2, "s2"));
        assert_eq!(2, c.clone_entities("A", "B"));
        assert_eq!(0, c.clone_entities("missing", "C"));
        let group = c.group("B").unwrap();
        assert!(group.iter().all(|e| e.str("trip_id") == Some("B")));
        assert_eq!(Some("A"), c.group("A").unwrap()[0].str("trip_id"));
    }
}
