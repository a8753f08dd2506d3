use crate::files;
use crate::{
    Entities, Error, Feed, FeedLoader, FeedPatcher, Key, Location, PickupType, Schema,
    TransferType, Value,
};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

fn schema() -> Schema {
    Schema::gtfs_subset().expect("invalid schema")
}

fn load_sorted(dir: impl AsRef<Path>) -> Feed {
    FeedLoader::default()
        .sorted_read(true)
        .load(dir, &schema())
        .expect("impossible to read gtfs")
}

/// A writable copy of a fixture directory
fn fixture_copy(name: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in fs::read_dir(Path::new("fixtures").join(name)).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    dir
}

fn sequences(feed: &Feed, trip_id: &str) -> Vec<i64> {
    feed.get(files::STOP_TIMES)
        .unwrap()
        .group(trip_id)
        .unwrap()
        .iter()
        .filter_map(|st| st.int("stop_sequence"))
        .collect()
}

#[test]
fn read_trips() {
    let feed = Feed::load("fixtures/basic", &schema()).expect("impossible to read gtfs");
    let trips = feed.get(files::TRIPS).unwrap();
    assert_eq!(2, trips.len());

    // the byte order mark does not end up in the first column name
    let fields: Vec<&str> = trips.fields().keys().map(String::as_str).collect();
    assert_eq!(
        vec!["route_id", "service_id", "trip_id", "trip_headsign", "block_id"],
        fields
    );

    let t1 = trips.get("t1").unwrap();
    assert_eq!(Some("Downtown"), t1.str("trip_headsign"));
    assert_eq!(Some(""), t1.str("block_id"));
}

#[test]
fn read_stops_with_initial_spaces() {
    let feed = load_sorted("fixtures/basic");
    let stops = feed.get(files::STOPS).unwrap();
    assert_eq!(Some("Union"), stops.get("s1").and_then(|s| s.str("stop_name")));
    assert_eq!(Some(43.6453), stops.get("s1").and_then(|s| s.float("stop_lat")));
    assert_eq!(Some(&Value::Null), stops.get("s3").and_then(|s| s.get("stop_lat")));
    assert!(feed.stop("s3").unwrap().location().is_none());
}

#[test]
fn read_stop_times_defaults() {
    let feed = load_sorted("fixtures/basic");
    let stop_times = feed.get(files::STOP_TIMES).unwrap();
    assert_eq!(4, stop_times.len());
    let first = &stop_times.group("t1").unwrap()[0];
    assert_eq!(Some(8 * 3600), first.time("arrival_time"));
    assert_eq!(Some(&Value::Null), first.get("start_pickup_dropoff_window"));
    assert_eq!(Some(-1.0), first.float("mean_duration_factor"));
    assert_eq!(
        Some(PickupType::RegularlyScheduled),
        first.get("pickup_type").and_then(PickupType::from_value)
    );
}

#[test]
fn groups_keep_file_order_unless_sorted() {
    let feed = Feed::load("fixtures/basic", &schema()).unwrap();
    assert_eq!(vec![2, 1], sequences(&feed, "t1"));

    let feed = load_sorted("fixtures/basic");
    assert_eq!(vec![1, 2], sequences(&feed, "t1"));
    assert_eq!(vec![1, 2], sequences(&feed, "t2"));
}

#[test]
fn missing_optional_files() {
    let feed = Feed::load("fixtures/basic", &schema()).unwrap();
    let location_groups = feed.get(files::LOCATION_GROUPS).unwrap();
    assert!(location_groups.is_empty());
    assert!(matches!(location_groups.entities(), Entities::Grouped(map) if map.is_empty()));
    assert!(feed.get(files::LOCATIONS).unwrap().document().is_none());
}

#[test]
fn missing_required_file() {
    let dir = fixture_copy("basic");
    fs::remove_file(dir.path().join("trips.txt")).unwrap();
    match Feed::load(dir.path(), &schema()) {
        Err(Error::MissingRequiredFile { file_name, reason }) => {
            assert_eq!("trips.txt", file_name);
            assert_eq!("missing", reason);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn blank_required_value() {
    let dir = fixture_copy("basic");
    fs::write(dir.path().join("stops.txt"), "stop_id,stop_lat\ns1,1.0\n,2.0\n").unwrap();
    match Feed::load(dir.path(), &schema()) {
        Err(Error::EmptyRequiredValue {
            file_name,
            location,
            field,
        }) => {
            assert_eq!("stops.txt", file_name);
            assert_eq!(Location::Line(3), location);
            assert_eq!("stop_id", field);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn time_out_of_range() {
    let dir = fixture_copy("basic");
    fs::write(
        dir.path().join("stop_times.txt"),
        "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nt1,4294967:00:00,,s1,1\n",
    )
    .unwrap();
    match Feed::load(dir.path(), &schema()) {
        Err(Error::Conversion {
            file_name,
            location,
            field,
            raw,
            ..
        }) => {
            assert_eq!("stop_times.txt", file_name);
            assert_eq!(Location::Line(2), location);
            assert_eq!("arrival_time", field);
            assert_eq!("4294967:00:00", raw);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn read_locations() {
    let feed = load_sorted("fixtures/basic");
    let locations = feed.get(files::LOCATIONS).unwrap();
    let root = locations.document().unwrap();
    let features = root.get("features").and_then(Value::as_list).unwrap();
    assert_eq!(1, features.len());

    let zone = features[0].as_record().unwrap();
    assert_eq!(Some("zone_a"), zone.str("id"));
    let properties = zone.get("properties").and_then(Value::as_record).unwrap();
    assert_eq!(Some("Zone A"), properties.str("stop_name"));
    assert_eq!(Some(&Value::Null), properties.get("stop_desc"));
}

#[test]
fn trip_times() {
    let feed = load_sorted("fixtures/basic");

    let t1 = feed.trip("t1").unwrap();
    assert_eq!(0, t1.shift_days());
    assert_eq!(Some(8 * 3600), t1.first_departure());
    assert_eq!(Some(8 * 3600 + 5 * 60), t1.last_arrival());

    // starts after midnight of the previous service day
    let t2 = feed.trip("t2").unwrap();
    assert_eq!(1, t2.shift_days());
    assert_eq!(Some(10 * 60), t2.first_departure());
    assert_eq!(Some(20 * 60), t2.last_arrival());
}

#[test]
fn trip_geometry() {
    let feed = load_sorted("fixtures/basic");
    let t1 = feed.trip("t1").unwrap();
    let shape = t1.stop_shape().unwrap();
    assert_eq!(2, shape.len());
    assert_eq!(Some(shape[0]), t1.first_point());
    assert_eq!(Some(shape[1]), t1.last_point());

    let length = shape[0].distance_to(&shape[1]);
    assert!(400.0 < length && length < 500.0, "{length}");
    assert_eq!(Some("s2"), t1.last_stop_time().unwrap().stop().map(|s| s.id()));
}

#[test]
fn transfers() {
    let feed = load_sorted("fixtures/basic");
    let from_t1 = feed.transfers_from("t1");
    assert_eq!(1, from_t1.len());
    assert_eq!("t2", from_t1[0].to_trip_id());
    assert_eq!(TransferType::InSeat, from_t1[0].transfer_type());
    assert!(from_t1[0].is_continuation());

    let from_t2 = feed.transfers_from("t2");
    assert_eq!(TransferType::Recommended, from_t2[0].transfer_type());
    assert!(!from_t2[0].is_continuation());
    assert!(feed.transfers_from("t3").is_empty());
}

#[test]
fn service_calendar() {
    let feed = load_sorted("fixtures/basic");
    let service = feed.trip("t1").unwrap().service();
    assert_eq!("weekdays", service.id());
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    assert!(service.runs_on_date(date(2024, 1, 2)));
    // removed by calendar_dates
    assert!(!service.runs_on_date(date(2024, 1, 1)));
    // added by calendar_dates on a saturday
    assert!(service.runs_on_date(date(2024, 1, 6)));
    assert!(!service.runs_on_date(date(2024, 1, 7)));
    assert!(!service.runs_on_date(date(2025, 1, 2)));
    assert!(!feed.service("unknown").runs_on_date(date(2024, 1, 2)));
}

#[test]
fn patch_round_trip() {
    let feed = load_sorted("fixtures/basic");
    let out = tempfile::tempdir().unwrap();
    feed.patch(&schema(), "fixtures/basic", out.path()).unwrap();

    // files outside of the schema are copied
    assert!(out.path().join("agency.txt").exists());
    let trips = fs::read_to_string(out.path().join("trips.txt")).unwrap();
    assert!(trips.starts_with("route_id,service_id,trip_id,trip_headsign,block_id\n"));
    let stop_times = fs::read_to_string(out.path().join("stop_times.txt")).unwrap();
    assert!(stop_times.contains("\nt1,08:00:00,08:00:00,s1,1,,,0,0,-1.0,-1.0,-1.0,-1.0\n"));

    let reloaded = load_sorted(out.path());
    assert_eq!(feed, reloaded);
}

#[test]
fn patch_in_place() {
    let dir = fixture_copy("basic");
    let feed = load_sorted(dir.path());
    feed.patch(&schema(), dir.path(), dir.path()).unwrap();
    assert!(dir.path().join("agency.txt").exists());
    assert_eq!(feed, load_sorted(dir.path()));
}

#[test]
fn patch_deletes_files_of_empty_collections() {
    let mut feed = load_sorted("fixtures/basic");
    feed.remove(files::TRANSFERS);
    let out = tempfile::tempdir().unwrap();
    FeedPatcher::default()
        .patch(&feed, &schema(), "fixtures/basic", out.path())
        .unwrap();
    assert!(!out.path().join("transfers.txt").exists());
    assert!(out.path().join("trips.txt").exists());
}

#[test]
fn patch_deletes_stale_files_of_missing_optional_files() {
    let dir = fixture_copy("basic");
    fs::remove_file(dir.path().join("transfers.txt")).unwrap();
    let feed = load_sorted(dir.path());
    assert!(feed.get(files::TRANSFERS).unwrap().is_empty());

    let out = tempfile::tempdir().unwrap();
    fs::write(
        out.path().join("transfers.txt"),
        "from_trip_id,to_trip_id,transfer_type
old,older,1
",
    )
    .unwrap();
    feed.patch(&schema(), dir.path(), out.path()).unwrap();
    assert!(!out.path().join("transfers.txt").exists());
    assert!(out.path().join("stop_times.txt").exists());
}

#[test]
fn shapes_are_copied_as_is() {
    let dir = fixture_copy("basic");
    let shapes = concat!(
        "shape_id, shape_pt_sequence,shape_pt_lat,shape_pt_lon\n",
        "sh1, 2,43.649,-79.3779\n",
        "sh1, 1,43.6453,-79.3806\n",
    );
    fs::write(dir.path().join("shapes.txt"), shapes).unwrap();
    let feed = load_sorted(dir.path());
    assert!(feed.get("shapes").is_none());

    let out = tempfile::tempdir().unwrap();
    feed.patch(&schema(), dir.path(), out.path()).unwrap();
    assert_eq!(shapes, fs::read_to_string(out.path().join("shapes.txt")).unwrap());
}

#[test]
fn clone_trip() {
    let mut feed = load_sorted("fixtures/basic");
    assert_eq!(1, feed.get_mut(files::TRIPS).unwrap().clone_entities("t1", "t1_copy"));
    assert_eq!(
        2,
        feed.get_mut(files::STOP_TIMES)
            .unwrap()
            .clone_entities("t1", "t1_copy")
    );

    let out = tempfile::tempdir().unwrap();
    feed.patch(&schema(), "fixtures/basic", out.path()).unwrap();
    let reloaded = load_sorted(out.path());
    let copy = reloaded.trip("t1_copy").unwrap();
    assert_eq!(Some("Downtown"), copy.entity().str("trip_headsign"));
    assert_eq!(2, copy.stop_times().len());
    assert_eq!(Some(8 * 3600), copy.first_departure());
    assert!(reloaded
        .get(files::TRIPS)
        .unwrap()
        .keys()
        .any(|k| *k == Key::from("t1")));
}
