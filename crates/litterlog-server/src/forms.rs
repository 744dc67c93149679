use axum::extract::Multipart;
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;

/// Registration input. Missing fields deserialize to empty strings so the
/// handler can answer with a flash instead of a rejection page.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login input.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Raw fields of the multipart cleanup form, one slot per input. Nothing
/// is validated yet; `validate` turns this into a `NewCleanup`.
#[derive(Debug, Default)]
pub struct CleanupForm {
    pub items: String,
    pub location_type: String,
    pub ward: String,
    pub latitude: String,
    pub longitude: String,
    pub start_time: String,
    pub end_time: String,
    pub photo: Option<Photo>,
}

/// An uploaded photo, buffered in memory until it is written out.
#[derive(Debug)]
pub struct Photo {
    pub original_name: Option<String>,
    pub data: Bytes,
}

/// A validated submission, ready to be stored.
#[derive(Debug, PartialEq)]
pub struct NewCleanup {
    pub items: String,
    pub location: Location,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Where a cleanup happened. Only `parse_location` builds one, so a
/// record can never mix a ward label with coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    None,
    Ward(String),
    Coordinates { latitude: f64, longitude: f64 },
}

impl Location {
    /// Column values for storage: (location_type, ward, latitude, longitude).
    pub fn into_columns(self) -> (Option<String>, Option<String>, Option<f64>, Option<f64>) {
        match self {
            Location::None => (None, None, None, None),
            Location::Ward(ward) => (Some("ward".to_string()), Some(ward), None, None),
            Location::Coordinates { latitude, longitude } => {
                (Some("gps".to_string()), None, Some(latitude), Some(longitude))
            }
        }
    }
}

/// Everything wrong with a submission maps to one user-facing sentence,
/// which the route surfaces as an error flash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanupFormError {
    #[error("Items, start time, and end time are required.")]
    MissingRequired,

    #[error("Please provide a valid time range (end after start).")]
    BadTimeRange,

    #[error("Please provide both latitude and longitude.")]
    HalfCoordinates,

    #[error("Latitude and longitude must be decimal numbers.")]
    BadCoordinates,
}

impl CleanupForm {
    /// Drain the multipart stream into typed fields. Unknown fields are
    /// ignored; only the first photo part is kept. Browsers submit an
    /// empty photo part when no file was chosen, which counts as none.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "items" => form.items = field.text().await?,
                "locationType" => form.location_type = field.text().await?,
                "ward" => form.ward = field.text().await?,
                "latitude" => form.latitude = field.text().await?,
                "longitude" => form.longitude = field.text().await?,
                "startTime" => form.start_time = field.text().await?,
                "endTime" => form.end_time = field.text().await?,
                "photo" => {
                    let original_name = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .map(str::to_string);
                    let data = field.bytes().await?;
                    if form.photo.is_none() && !data.is_empty() {
                        form.photo = Some(Photo { original_name, data });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Boundary validation: everything form-shaped is checked here, before
    /// any row is built. The photo passes through untouched.
    pub fn validate(self) -> Result<(NewCleanup, Option<Photo>), CleanupFormError> {
        if self.items.is_empty() || self.start_time.is_empty() || self.end_time.is_empty() {
            return Err(CleanupFormError::MissingRequired);
        }

        let start = parse_datetime(&self.start_time).ok_or(CleanupFormError::BadTimeRange)?;
        let end = parse_datetime(&self.end_time).ok_or(CleanupFormError::BadTimeRange)?;
        if end < start {
            return Err(CleanupFormError::BadTimeRange);
        }

        let location =
            parse_location(&self.location_type, &self.ward, &self.latitude, &self.longitude)?;

        let cleanup = NewCleanup {
            items: self.items,
            location,
            start_time: start,
            end_time: end,
        };
        Ok((cleanup, self.photo))
    }
}

/// Accept both shapes browsers emit for `datetime-local` inputs: with and
/// without seconds.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Single source of truth for the location variant. A ward label only
/// counts under the "ward" kind and coordinates only under "gps"; a lone
/// coordinate is an error rather than a silent drop.
pub fn parse_location(
    kind: &str,
    ward: &str,
    latitude: &str,
    longitude: &str,
) -> Result<Location, CleanupFormError> {
    match kind {
        "ward" => {
            if ward.is_empty() {
                Ok(Location::None)
            } else {
                Ok(Location::Ward(ward.to_string()))
            }
        }
        "gps" => match (latitude.is_empty(), longitude.is_empty()) {
            (true, true) => Ok(Location::None),
            (false, false) => {
                let latitude: f64 =
                    latitude.parse().map_err(|_| CleanupFormError::BadCoordinates)?;
                let longitude: f64 =
                    longitude.parse().map_err(|_| CleanupFormError::BadCoordinates)?;
                Ok(Location::Coordinates { latitude, longitude })
            }
            _ => Err(CleanupFormError::HalfCoordinates),
        },
        _ => Ok(Location::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn form(items: &str, start: &str, end: &str) -> CleanupForm {
        CleanupForm {
            items: items.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            ..CleanupForm::default()
        }
    }

    #[test]
    fn datetime_parses_with_and_without_seconds() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-01T09:30"), Some(expected));
        assert_eq!(parse_datetime("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_datetime(""), None);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let err = form("", "2024-03-01T09:00", "2024-03-01T10:00").validate().unwrap_err();
        assert_eq!(err, CleanupFormError::MissingRequired);

        let err = form("bottles", "", "2024-03-01T10:00").validate().unwrap_err();
        assert_eq!(err, CleanupFormError::MissingRequired);

        let err = form("bottles", "2024-03-01T09:00", "").validate().unwrap_err();
        assert_eq!(err, CleanupFormError::MissingRequired);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = form("bottles", "2024-03-01T10:00", "2024-03-01T09:00").validate().unwrap_err();
        assert_eq!(err, CleanupFormError::BadTimeRange);
    }

    #[test]
    fn equal_start_and_end_is_accepted() {
        let (cleanup, _) = form("bottles", "2024-03-01T09:00", "2024-03-01T09:00")
            .validate()
            .unwrap();
        assert_eq!(cleanup.start_time, cleanup.end_time);
    }

    #[test]
    fn unparseable_times_are_rejected() {
        let err = form("bottles", "soon", "2024-03-01T10:00").validate().unwrap_err();
        assert_eq!(err, CleanupFormError::BadTimeRange);
    }

    #[test]
    fn ward_location_requires_a_label() {
        assert_eq!(
            parse_location("ward", "Ward 3", "", "").unwrap(),
            Location::Ward("Ward 3".to_string())
        );
        assert_eq!(parse_location("ward", "", "", "").unwrap(), Location::None);
    }

    #[test]
    fn gps_location_requires_both_coordinates() {
        assert_eq!(
            parse_location("gps", "", "35.6895", "139.6917").unwrap(),
            Location::Coordinates { latitude: 35.6895, longitude: 139.6917 }
        );
        assert_eq!(parse_location("gps", "", "", "").unwrap(), Location::None);
        assert_eq!(
            parse_location("gps", "", "35.6895", "").unwrap_err(),
            CleanupFormError::HalfCoordinates
        );
        assert_eq!(
            parse_location("gps", "", "", "139.6917").unwrap_err(),
            CleanupFormError::HalfCoordinates
        );
        assert_eq!(
            parse_location("gps", "", "north", "139.6917").unwrap_err(),
            CleanupFormError::BadCoordinates
        );
    }

    #[test]
    fn fields_outside_the_picked_kind_are_ignored() {
        // a ward submission may still carry stale coordinate inputs
        assert_eq!(
            parse_location("ward", "Ward 3", "35.6895", "139.6917").unwrap(),
            Location::Ward("Ward 3".to_string())
        );
        // and no kind at all ignores everything
        assert_eq!(parse_location("", "Ward 3", "35.6895", "139.6917").unwrap(), Location::None);
        assert_eq!(parse_location("teleport", "", "1", "2").unwrap(), Location::None);
    }

    #[test]
    fn location_column_mapping_is_exclusive() {
        assert_eq!(Location::None.into_columns(), (None, None, None, None));
        assert_eq!(
            Location::Ward("Ward 3".to_string()).into_columns(),
            (Some("ward".to_string()), Some("Ward 3".to_string()), None, None)
        );
        assert_eq!(
            Location::Coordinates { latitude: 1.5, longitude: -2.5 }.into_columns(),
            (Some("gps".to_string()), None, Some(1.5), Some(-2.5))
        );
    }
}
