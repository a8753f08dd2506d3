//! Typed, read-only views over entities, following references between files
//!
//! Views borrow the [Feed] they were taken from, nothing is cached.
use crate::enums::{DropOffType, ExceptionType, PickupType, TransferType};
use crate::feed::Feed;
use crate::lat_lon::LatLon;
use crate::schema::files;
use crate::value::Entity;
use chrono::{Datelike, NaiveDate, Weekday};

/// Seconds in a service day
pub const DAY_SEC: i64 = 86_400;

impl Feed {
    fn entities_of<'a>(&'a self, file: &str, key: &str) -> Vec<&'a Entity> {
        self.get(file).map(|c| c.select(key)).unwrap_or_default()
    }

    /// A trip of `trips.txt`
    pub fn trip(&self, trip_id: &str) -> Option<Trip<'_>> {
        let entity = self.get(files::TRIPS)?.get(trip_id)?;
        Some(Trip { feed: self, entity })
    }

    /// Every trip, in the current order
    pub fn trips(&self) -> impl Iterator<Item = Trip<'_>> {
        self.get(files::TRIPS)
            .into_iter()
            .flat_map(|c| c.iter())
            .map(move |entity| Trip { feed: self, entity })
    }

    /// A stop of `stops.txt`
    pub fn stop(&self, stop_id: &str) -> Option<Stop<'_>> {
        let entity = self.get(files::STOPS)?.get(stop_id)?;
        Some(Stop { entity })
    }

    /// Transfers whose `from_trip_id` is `trip_id`
    pub fn transfers_from(&self, trip_id: &str) -> Vec<Transfer<'_>> {
        self.entities_of(files::TRANSFERS, trip_id)
            .into_iter()
            .map(|entity| Transfer { entity })
            .collect()
    }

    /// The calendar of a service id
    pub fn service<'a>(&'a self, service_id: &'a str) -> Service<'a> {
        Service {
            feed: self,
            service_id,
        }
    }
}

/// A trip with its stop times
#[derive(Debug, Clone, Copy)]
pub struct Trip<'a> {
    feed: &'a Feed,
    entity: &'a Entity,
}

impl<'a> Trip<'a> {
    /// The underlying entity
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// `trip_id`
    pub fn id(&self) -> &'a str {
        self.entity.str("trip_id").unwrap_or_default()
    }

    /// `service_id`
    pub fn service(&self) -> Service<'a> {
        self.feed
            .service(self.entity.str("service_id").unwrap_or_default())
    }

    /// Stop times of the trip, in the current collection order
    pub fn stop_times(&self) -> Vec<StopTime<'a>> {
        let feed = self.feed;
        feed.entities_of(files::STOP_TIMES, self.id())
            .into_iter()
            .map(|entity| StopTime { feed, entity })
            .collect()
    }

    /// First stop time, None for a trip without stop times
    pub fn first_stop_time(&self) -> Option<StopTime<'a>> {
        self.stop_times().first().copied()
    }

    /// Last stop time, None for a trip without stop times
    pub fn last_stop_time(&self) -> Option<StopTime<'a>> {
        self.stop_times().last().copied()
    }

    /// Locations of the stops visited, None if one of them has no location
    pub fn stop_shape(&self) -> Option<Vec<LatLon>> {
        self.stop_times()
            .iter()
            .map(|st| st.stop().and_then(|s| s.location()))
            .collect()
    }

    /// 1 when the trip starts on the next service day, 0 otherwise
    pub fn shift_days(&self) -> i64 {
        match self.first_stop_time().and_then(|st| st.departure_time()) {
            Some(departure) if i64::from(departure) >= DAY_SEC => 1,
            _ => 0,
        }
    }

    /// First departure in seconds, relative to the day the trip starts
    pub fn first_departure(&self) -> Option<i64> {
        let departure = self.first_stop_time()?.departure_time()?;
        Some(i64::from(departure) - DAY_SEC * self.shift_days())
    }

    /// Last arrival in seconds, relative to the day the trip starts
    pub fn last_arrival(&self) -> Option<i64> {
        let arrival = self.last_stop_time()?.arrival_time()?;
        Some(i64::from(arrival) - DAY_SEC * self.shift_days())
    }

    /// Location of the first stop
    pub fn first_point(&self) -> Option<LatLon> {
        self.first_stop_time()?.stop()?.location()
    }

    /// Location of the last stop
    pub fn last_point(&self) -> Option<LatLon> {
        self.last_stop_time()?.stop()?.location()
    }
}

/// A row of `stop_times.txt`
#[derive(Debug, Clone, Copy)]
pub struct StopTime<'a> {
    feed: &'a Feed,
    entity: &'a Entity,
}

impl<'a> StopTime<'a> {
    /// The underlying entity
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// `stop_sequence`
    pub fn stop_sequence(&self) -> Option<i64> {
        self.entity.int("stop_sequence")
    }

    /// Arrival in seconds since midnight, None when not given
    pub fn arrival_time(&self) -> Option<u32> {
        self.entity.time("arrival_time")
    }

    /// Departure in seconds since midnight, None when not given
    pub fn departure_time(&self) -> Option<u32> {
        self.entity.time("departure_time")
    }

    /// `pickup_type`
    pub fn pickup_type(&self) -> PickupType {
        self.entity
            .get("pickup_type")
            .and_then(PickupType::from_value)
            .unwrap_or_default()
    }

    /// `drop_off_type`
    pub fn drop_off_type(&self) -> DropOffType {
        self.entity
            .get("drop_off_type")
            .and_then(DropOffType::from_value)
            .unwrap_or_default()
    }

    /// The stop visited, None if `stop_id` is not in `stops.txt`
    pub fn stop(&self) -> Option<Stop<'a>> {
        self.feed.stop(self.entity.str("stop_id")?)
    }
}

/// A row of `stops.txt`
#[derive(Debug, Clone, Copy)]
pub struct Stop<'a> {
    entity: &'a Entity,
}

impl<'a> Stop<'a> {
    /// The underlying entity
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// `stop_id`
    pub fn id(&self) -> &'a str {
        self.entity.str("stop_id").unwrap_or_default()
    }

    /// Position of the stop, None when latitude or longitude is missing
    pub fn location(&self) -> Option<LatLon> {
        let lat = self.entity.float("stop_lat")?;
        let lon = self.entity.float("stop_lon")?;
        Some(LatLon::new(lat, lon))
    }
}

/// A row of `transfers.txt`
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
    entity: &'a Entity,
}

impl<'a> Transfer<'a> {
    /// The underlying entity
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// `to_trip_id`
    pub fn to_trip_id(&self) -> &'a str {
        self.entity.str("to_trip_id").unwrap_or_default()
    }

    /// `transfer_type`
    pub fn transfer_type(&self) -> TransferType {
        self.entity
            .get("transfer_type")
            .and_then(TransferType::from_value)
            .unwrap_or_default()
    }

    /// Do passengers stay in the same vehicle
    pub fn is_continuation(&self) -> bool {
        self.transfer_type().is_continuation()
    }
}

/// The days a service id runs, from `calendar.txt` and `calendar_dates.txt`
#[derive(Debug, Clone, Copy)]
pub struct Service<'a> {
    feed: &'a Feed,
    service_id: &'a str,
}

impl<'a> Service<'a> {
    /// `service_id`
    pub fn id(&self) -> &'a str {
        self.service_id
    }

    /// Does the service run on `date`
    ///
    /// A calendar date exception takes precedence over the weekly calendar.
    pub fn runs_on_date(&self, date: NaiveDate) -> bool {
        let exception = self
            .feed
            .entities_of(files::CALENDAR_DATES, self.service_id)
            .into_iter()
            .rev()
            .find(|e| e.date("date") == Some(date))
            .and_then(|e| e.get("exception_type"))
            .and_then(ExceptionType::from_value);
        match exception {
            Some(ExceptionType::Add) => true,
            Some(ExceptionType::Remove) => false,
            None => self.calendar_runs_on_date(date),
        }
    }

    fn calendar_runs_on_date(&self, date: NaiveDate) -> bool {
        let Some(calendar) = self
            .feed
            .get(files::CALENDAR)
            .and_then(|c| c.get(self.service_id))
        else {
            return false;
        };
        let in_range = calendar.date("start_date").map_or(false, |start| start <= date)
            && calendar.date("end_date").map_or(false, |end| date <= end);
        let weekday = match date.weekday() {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        };
        in_range && calendar.bool(weekday).unwrap_or(false)
    }
}
