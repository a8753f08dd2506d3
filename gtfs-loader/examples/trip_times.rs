use gtfs_loader::{FeedLoader, Schema};

/// prints the first departure and last arrival of every trip of the feed given as a cli argument
fn main() {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fixtures/basic".to_owned());

    let schema = Schema::gtfs_subset().expect("invalid schema");
    let feed = FeedLoader::default()
        .sorted_read(true)
        .load(&dir, &schema)
        .expect("impossible to read gtfs");

    for trip in feed.trips() {
        let stops = trip.stop_times().len();
        match (trip.first_departure(), trip.last_arrival()) {
            (Some(departure), Some(arrival)) => println!(
                "{}: {} stops, {}s -> {}s (+{} day)",
                trip.id(),
                stops,
                departure,
                arrival,
                trip.shift_days()
            ),
            _ => println!("{}: {} stops, no times", trip.id(), stops),
        }
    }
}
