use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Client {
    #[serde(rename = "ClientID")]
    pub client_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Photographer {
    #[serde(rename = "PhotographerID")]
    pub photographer_id: i64,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// The listing omits `PhotographerID`; the single lookup may omit `TimeslotID`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Timeslot {
    #[serde(rename = "TimeslotID", default)]
    pub timeslot_id: Option<i64>,
    #[serde(rename = "PhotographerID", default)]
    pub photographer_id: Option<i64>,
    #[serde(default)]
    pub available_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

/// Row of the by-date availability query: a photographer with one open slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailablePhotographer {
    #[serde(rename = "PhotographerID")]
    pub photographer_id: i64,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(rename = "TimeslotID", default)]
    pub timeslot_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Booking {
    #[serde(rename = "BookingID")]
    pub booking_id: i64,
    #[serde(rename = "ClientID", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(rename = "PhotographerID", default, skip_serializing_if = "Option::is_none")]
    pub photographer_id: Option<i64>,
    #[serde(rename = "TimeslotID", default, skip_serializing_if = "Option::is_none")]
    pub timeslot_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "TransactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
}

/// Display record for a booking. The extra fields are only present once the
/// booking has been joined with its timeslot and photographer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl Session {
    pub fn is_enriched(&self) -> bool {
        self.photographer_name.is_some()
    }
}

impl From<Booking> for Session {
    fn from(booking: Booking) -> Self {
        Session {
            booking,
            photographer_name: None,
            date: None,
            start_time: None,
            end_time: None,
        }
    }
}

/// Wall clock in milliseconds, bumped past the last one handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub i64);

static LAST_TRANSACTION: AtomicI64 = AtomicI64::new(0);

impl TransactionId {
    pub fn now() -> Self {
        let now = Utc::now().timestamp_millis();
        let last = LAST_TRANSACTION
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        TransactionId(now.max(last + 1))
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAvailability {
    #[serde(rename = "TransactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "PhotographerID")]
    pub photographer_id: i64,
    #[serde(rename = "AvailableDate")]
    pub available_date: String,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "EndTime")]
    pub end_time: String,
}

/// Selections left unset on the form go out as `null`; the service decides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    #[serde(rename = "TransactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "ClientID")]
    pub client_id: Option<i64>,
    #[serde(rename = "PhotographerID")]
    pub photographer_id: Option<i64>,
    #[serde(rename = "TimeslotID")]
    pub timeslot_id: Option<i64>,
    #[serde(rename = "Location")]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    #[serde(rename = "TransactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "Location")]
    pub location: String,
}
