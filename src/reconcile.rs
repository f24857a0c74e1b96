use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use log::warn;

use crate::models::{Booking, Photographer, Session, Timeslot};

pub const UNKNOWN_PHOTOGRAPHER: &str = "Unknown";

/// The timeslot's photographer wins over the booking's.
pub fn enrich(booking: Booking, timeslot: &Timeslot, photographers: &[Photographer]) -> Session {
    let photographer_id = timeslot.photographer_id.or(booking.photographer_id);
    let photographer_name = photographers
        .iter()
        .find(|p| Some(p.photographer_id) == photographer_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| UNKNOWN_PHOTOGRAPHER.to_string());

    Session {
        booking: Booking {
            photographer_id,
            ..booking
        },
        photographer_name: Some(photographer_name),
        date: timeslot.available_date.clone(),
        start_time: timeslot.start_time.clone(),
        end_time: timeslot.end_time.clone(),
    }
}

/// One session per booking, in booking order. Failed lookups pass the booking through.
pub async fn reconcile_sessions<F, Fut, E>(
    bookings: Vec<Booking>,
    photographers: &[Photographer],
    fetch_timeslot: F,
) -> Vec<Session>
where
    F: Fn(i64) -> Fut,
    Fut: Future<Output = Result<Timeslot, E>>,
    E: Display,
{
    let fetch = &fetch_timeslot;
    let lookups = bookings.iter().map(|booking| {
        let timeslot_id = booking.timeslot_id;
        async move {
            match timeslot_id {
                Some(id) => fetch(id).await.map_err(|e| e.to_string()),
                None => Err("booking has no timeslot".to_string()),
            }
        }
    });
    let timeslots = join_all(lookups).await;

    bookings
        .into_iter()
        .zip(timeslots)
        .map(|(booking, timeslot)| match timeslot {
            Ok(timeslot) => enrich(booking, &timeslot, photographers),
            Err(e) => {
                warn!("Error fetching session details for booking {}: {}", booking.booking_id, e);
                Session::from(booking)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn booking(id: i64, timeslot_id: Option<i64>, photographer_id: Option<i64>) -> Booking {
        Booking {
            booking_id: id,
            client_id: Some(1),
            photographer_id,
            timeslot_id,
            location: Some(format!("Location {}", id)),
            status: Some("Scheduled".into()),
            transaction_id: None,
        }
    }

    fn timeslot(id: i64, photographer_id: Option<i64>, date: &str) -> Timeslot {
        Timeslot {
            timeslot_id: Some(id),
            photographer_id,
            available_date: Some(date.into()),
            start_time: Some("10:00".into()),
            end_time: Some("11:00".into()),
            status: None,
            photographer_name: None,
            specialty: None,
        }
    }

    fn roster() -> Vec<Photographer> {
        vec![
            Photographer {
                photographer_id: 2,
                name: "Bob".into(),
                specialty: Some("Portrait".into()),
            },
            Photographer {
                photographer_id: 3,
                name: "Carol".into(),
                specialty: None,
            },
        ]
    }

    #[test]
    fn enrich_matches_worked_example() {
        let session = enrich(
            booking(10, Some(5), Some(2)),
            &timeslot(5, Some(2), "2024-06-01"),
            &roster(),
        );
        assert_eq!(session.booking.booking_id, 10);
        assert_eq!(session.booking.photographer_id, Some(2));
        assert_eq!(session.booking.location.as_deref(), Some("Location 10"));
        assert_eq!(session.photographer_name.as_deref(), Some("Bob"));
        assert_eq!(session.date.as_deref(), Some("2024-06-01"));
        assert_eq!(session.start_time.as_deref(), Some("10:00"));
        assert_eq!(session.end_time.as_deref(), Some("11:00"));
    }

    #[test]
    fn timeslot_photographer_wins() {
        let session = enrich(booking(1, Some(5), Some(2)), &timeslot(5, Some(3), "d"), &roster());
        assert_eq!(session.booking.photographer_id, Some(3));
        assert_eq!(session.photographer_name.as_deref(), Some("Carol"));
    }

    #[test]
    fn booking_photographer_is_fallback() {
        let session = enrich(booking(1, Some(5), Some(3)), &timeslot(5, None, "d"), &roster());
        assert_eq!(session.booking.photographer_id, Some(3));
        assert_eq!(session.photographer_name.as_deref(), Some("Carol"));
    }

    #[test]
    fn unknown_photographer_placeholder() {
        let session = enrich(booking(1, Some(5), None), &timeslot(5, Some(99), "d"), &roster());
        assert_eq!(session.photographer_name.as_deref(), Some(UNKNOWN_PHOTOGRAPHER));

        let session = enrich(booking(1, Some(5), None), &timeslot(5, None, "d"), &roster());
        assert_eq!(session.booking.photographer_id, None);
        assert_eq!(session.photographer_name.as_deref(), Some(UNKNOWN_PHOTOGRAPHER));
    }

    #[tokio::test]
    async fn failed_lookup_passes_booking_through() {
        let bookings = vec![booking(1, Some(5), Some(2)), booking(2, Some(6), Some(3))];
        let sessions = reconcile_sessions(bookings.clone(), &roster(), |id| async move {
            if id == 6 {
                Err("Timeslot not found")
            } else {
                Ok(timeslot(id, Some(2), "2024-06-01"))
            }
        })
        .await;

        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].is_enriched());
        assert_eq!(sessions[1], Session::from(bookings[1].clone()));
    }

    #[tokio::test]
    async fn booking_without_timeslot_is_not_fetched() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let bookings = vec![booking(1, None, Some(2))];
        let sessions = reconcile_sessions(bookings.clone(), &roster(), |id| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move { Ok::<_, String>(timeslot(id, None, "d")) }
        })
        .await;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(sessions, vec![Session::from(bookings[0].clone())]);
    }

    #[tokio::test]
    async fn order_survives_out_of_order_completion() {
        let bookings: Vec<Booking> = (1..=5).map(|i| booking(i, Some(100 + i), Some(2))).collect();
        let sessions = reconcile_sessions(bookings, &roster(), |id| async move {
            // earlier bookings settle last
            tokio::time::sleep(Duration::from_millis((110 - id as u64) * 5)).await;
            Ok::<_, String>(timeslot(id, Some(2), &format!("day-{}", id)))
        })
        .await;

        let ids: Vec<i64> = sessions.iter().map(|s| s.booking.booking_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        let dates: Vec<&str> = sessions.iter().filter_map(|s| s.date.as_deref()).collect();
        assert_eq!(dates, vec!["day-101", "day-102", "day-103", "day-104", "day-105"]);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_output() {
        let sessions =
            reconcile_sessions(Vec::new(), &roster(), |id| async move { Ok::<_, String>(timeslot(id, None, "d")) })
                .await;
        assert!(sessions.is_empty());
    }
}
