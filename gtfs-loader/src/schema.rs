//! The subset of GTFS files this crate reads and writes
use crate::enums::{DropOffType, ExceptionType, PickupType, TransferType};
use crate::error::Result;
use crate::field::{FieldSpec, FieldType, FileSpec, RecordSpec, Schema};
use crate::value::Value;

/// Logical names of the files in [Schema::gtfs_subset]
pub mod files {
    /// `calendar.txt`
    pub const CALENDAR: &str = "calendar";
    /// `calendar_dates.txt`
    pub const CALENDAR_DATES: &str = "calendar_dates";
    /// `trips.txt`
    pub const TRIPS: &str = "trips";
    /// `stops.txt`
    pub const STOPS: &str = "stops";
    /// `transfers.txt`
    pub const TRANSFERS: &str = "transfers";
    /// `stop_times.txt`
    pub const STOP_TIMES: &str = "stop_times";
    /// `location_groups.txt`
    pub const LOCATION_GROUPS: &str = "location_groups";
    /// `locations.geojson`
    pub const LOCATIONS: &str = "locations";
}

fn req(ty: FieldType) -> FieldSpec {
    FieldSpec::required(ty)
}

fn opt(ty: FieldType, default: Value) -> FieldSpec {
    FieldSpec::optional(ty, default)
}

fn empty_str() -> Value {
    Value::Str(String::new())
}

fn optional_time() -> FieldSpec {
    opt(FieldType::optional(FieldType::TIME), Value::Null)
}

impl Schema {
    /// Files read by [crate::FeedLoader] and rewritten by [crate::FeedPatcher]
    ///
    /// `shapes.txt` is left out: it is the largest file of most feeds and is copied as is.
    pub fn gtfs_subset() -> Result<Schema> {
        let weekday = || req(FieldType::BOOL);
        let calendar = FileSpec::tabular(files::CALENDAR, "service_id")
            .required(false)
            .field("service_id", req(FieldType::STR))
            .field("monday", weekday())
            .field("tuesday", weekday())
            .field("wednesday", weekday())
            .field("thursday", weekday())
            .field("friday", weekday())
            .field("saturday", weekday())
            .field("sunday", weekday())
            .field("start_date", req(FieldType::DATE))
            .field("end_date", req(FieldType::DATE))
            .build()?;

        let calendar_dates = FileSpec::tabular(files::CALENDAR_DATES, "service_id")
            .required(false)
            .group_by("date")
            .field("service_id", req(FieldType::STR))
            .field("date", req(FieldType::DATE))
            .field("exception_type", req(FieldType::Enum(&ExceptionType::DEF)))
            .build()?;

        let trips = FileSpec::tabular(files::TRIPS, "trip_id")
            .field("trip_id", req(FieldType::STR))
            .field("service_id", req(FieldType::STR))
            .field("block_id", opt(FieldType::STR, empty_str()))
            .field("route_id", req(FieldType::STR))
            .build()?;

        let stops = FileSpec::tabular(files::STOPS, "stop_id")
            .field("stop_id", req(FieldType::STR))
            .field(
                "stop_lat",
                opt(FieldType::optional(FieldType::FLOAT), Value::Null),
            )
            .field(
                "stop_lon",
                opt(FieldType::optional(FieldType::FLOAT), Value::Null),
            )
            .build()?;

        let transfers = FileSpec::tabular(files::TRANSFERS, "from_trip_id")
            .required(false)
            .group_by("to_trip_id")
            .field("from_trip_id", opt(FieldType::STR, empty_str()))
            .field("to_trip_id", opt(FieldType::STR, empty_str()))
            .field(
                "transfer_type",
                opt(
                    FieldType::Enum(&TransferType::DEF),
                    TransferType::Recommended.value(),
                ),
            )
            .build()?;

        let stop_times = FileSpec::tabular(files::STOP_TIMES, "trip_id")
            .group_by("stop_sequence")
            .field("trip_id", req(FieldType::STR))
            .field("stop_id", req(FieldType::STR))
            .field("stop_sequence", req(FieldType::INT))
            .field("arrival_time", optional_time())
            .field("departure_time", optional_time())
            .field("start_pickup_dropoff_window", optional_time())
            .field("end_pickup_dropoff_window", optional_time())
            .field(
                "pickup_type",
                opt(
                    FieldType::Enum(&PickupType::DEF),
                    PickupType::RegularlyScheduled.value(),
                ),
            )
            .field(
                "drop_off_type",
                opt(
                    FieldType::Enum(&DropOffType::DEF),
                    DropOffType::RegularlyScheduled.value(),
                ),
            )
            .field("mean_duration_factor", opt(FieldType::FLOAT, Value::Float(-1.0)))
            .field("mean_duration_offset", opt(FieldType::FLOAT, Value::Float(-1.0)))
            .field("safe_duration_factor", opt(FieldType::FLOAT, Value::Float(-1.0)))
            .field("safe_duration_offset", opt(FieldType::FLOAT, Value::Float(-1.0)))
            .build()?;

        let location_groups = FileSpec::tabular(files::LOCATION_GROUPS, "location_group_id")
            .required(false)
            .group_by("location_id")
            .field("location_group_id", req(FieldType::STR))
            .field("location_id", opt(FieldType::STR, empty_str()))
            .field("location_group_name", opt(FieldType::STR, empty_str()))
            .build()?;

        let geometry = RecordSpec::new("Geometry")
            .field("type", req(FieldType::STR))
            .field("coordinates", req(FieldType::JSON));
        let properties = RecordSpec::new("LocationProperties")
            .field("stop_name", opt(FieldType::optional(FieldType::STR), Value::Null))
            .field("stop_desc", opt(FieldType::optional(FieldType::STR), Value::Null));
        let feature = RecordSpec::new("Feature")
            .field("type", req(FieldType::STR))
            .field("id", req(FieldType::STR))
            .field("properties", opt(FieldType::nested(properties), Value::Null))
            .field("geometry", req(FieldType::nested(geometry)));
        let locations = FileSpec::tree(files::LOCATIONS, "id")
            .required(false)
            .field("type", req(FieldType::STR))
            .field("features", req(FieldType::list(FieldType::nested(feature))))
            .build()?;

        Ok(Schema::new([
            calendar,
            calendar_dates,
            trips,
            stops,
            transfers,
            stop_times,
            location_groups,
            locations,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FileKind;

    #[test]
    fn subset_is_well_formed() {
        let schema = Schema::gtfs_subset().unwrap();
        assert_eq!(8, schema.len());
        assert!(schema.get("shapes").is_none());
        let stop_times = schema.get(files::STOP_TIMES).unwrap();
        assert_eq!(Some("stop_sequence"), stop_times.group_key());
        assert!(stop_times.required());
        let locations = schema.get(files::LOCATIONS).unwrap();
        assert_eq!(FileKind::Tree, locations.kind());
        assert_eq!("locations.geojson", locations.filename());
    }
}
