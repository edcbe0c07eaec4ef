//! Location, calendar and tag helpers stored as plain metadata.

use crate::entity::Entity;
use crate::session::Session;
use canopy_types::{Scalar, Timestamp, Value, ValueType};

const LOCATION: &str = "location";
const LATITUDE: &str = "geo:lat";
const LONGITUDE: &str = "geo:long";
const CALENDAR_START: &str = "calendar_start";
const CALENDAR_END: &str = "calendar_end";

/// Metadata names read by [`Entity::tags`] when none are given.
pub const DEFAULT_TAG_NAMES: [&str; 1] = ["tags"];

impl Entity {
    pub fn set_location(&mut self, session: &Session, location: &str) -> bool {
        self.set_metadata(session, LOCATION, location, ValueType::Text, false)
    }

    pub fn location(&self, session: &Session) -> Option<String> {
        self.get_metadata(session, LOCATION)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Stores a coordinate pair. Both halves are written even if the first
    /// fails; the result is true only if both were stored.
    pub fn set_lat_long(&mut self, session: &Session, latitude: f64, longitude: f64) -> bool {
        let lat = self.set_metadata(
            session,
            LATITUDE,
            latitude.to_string(),
            ValueType::Text,
            false,
        );
        let long = self.set_metadata(
            session,
            LONGITUDE,
            longitude.to_string(),
            ValueType::Text,
            false,
        );
        lat && long
    }

    pub fn latitude(&self, session: &Session) -> Option<f64> {
        self.coordinate(session, LATITUDE)
    }

    pub fn longitude(&self, session: &Session) -> Option<f64> {
        self.coordinate(session, LONGITUDE)
    }

    fn coordinate(&self, session: &Session, name: &str) -> Option<f64> {
        self.get_metadata(session, name)?.as_str()?.trim().parse().ok()
    }

    /// Records a calendar slot starting at `start` and lasting `duration`
    /// seconds.
    pub fn set_calendar_time_and_duration(
        &mut self,
        session: &Session,
        start: Timestamp,
        duration: i64,
    ) -> bool {
        let end = start.plus(duration);
        let started = self.set_metadata(
            session,
            CALENDAR_START,
            start.secs(),
            ValueType::Integer,
            false,
        );
        let ended = self.set_metadata(
            session,
            CALENDAR_END,
            end.secs(),
            ValueType::Integer,
            false,
        );
        started && ended
    }

    pub fn calendar_start_time(&self, session: &Session) -> Option<Timestamp> {
        self.calendar_time(session, CALENDAR_START)
    }

    pub fn calendar_end_time(&self, session: &Session) -> Option<Timestamp> {
        self.calendar_time(session, CALENDAR_END)
    }

    fn calendar_time(&self, session: &Session, name: &str) -> Option<Timestamp> {
        self.get_metadata(session, name)?
            .as_int()
            .map(Timestamp::from_secs)
    }

    /// Every value stored under the given metadata names, flattened in
    /// order. An empty `names` reads [`DEFAULT_TAG_NAMES`].
    pub fn tags(&self, session: &Session, names: &[&str]) -> Vec<String> {
        let names = if names.is_empty() {
            &DEFAULT_TAG_NAMES[..]
        } else {
            names
        };
        names
            .iter()
            .filter_map(|name| self.get_metadata(session, name))
            .flat_map(Value::into_list)
            .filter(|tag| !tag.is_empty())
            .map(|tag| match tag {
                Scalar::Text(text) => text,
                other => other.to_string(),
            })
            .collect()
    }
}
