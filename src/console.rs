use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, BookingApi};
use crate::models::{
    AvailablePhotographer, Client, LocationUpdate, NewAvailability, NewBooking, Photographer,
    Session, Timeslot, TransactionId,
};
use crate::reconcile::reconcile_sessions;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Please select a photographer.")]
    MissingPhotographer,

    #[error("Booking ID is missing!")]
    MissingBookingId,

    #[error("Location update cancelled.")]
    EmptyLocation,

    /// `notice` is the service's own message, or the operation's fallback.
    #[error("{notice}")]
    Service { notice: String, source: ApiError },
}

impl ConsoleError {
    fn service(fallback: &'static str) -> impl FnOnce(ApiError) -> ConsoleError {
        move |source| {
            error!("{}: {}", fallback, source);
            ConsoleError::Service {
                notice: source.user_message(fallback),
                source,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityForm {
    pub photographer_id: Option<i64>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl AvailabilityForm {
    pub fn to_request(&self, transaction_id: TransactionId) -> Result<NewAvailability, ConsoleError> {
        let photographer_id = self.photographer_id.ok_or(ConsoleError::MissingPhotographer)?;
        Ok(NewAvailability {
            transaction_id,
            photographer_id,
            available_date: self.date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionForm {
    pub client_id: Option<i64>,
    pub photographer_id: Option<i64>,
    pub timeslot_id: Option<i64>,
    pub location: String,
}

impl SessionForm {
    pub fn to_request(&self, transaction_id: TransactionId) -> NewBooking {
        NewBooking {
            transaction_id,
            client_id: self.client_id,
            photographer_id: self.photographer_id,
            timeslot_id: self.timeslot_id,
            location: self.location.clone(),
        }
    }
}

/// Which form field the next plain text message fills in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextInput {
    #[default]
    None,
    AvailabilityStart,
    AvailabilityEnd,
    SessionLocation,
}

/// `Closed -> AwaitingInput -> Submitting -> Closed`; an empty answer or cancel closes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationDialog {
    #[default]
    Closed,
    AwaitingInput { booking_id: i64 },
    Submitting { booking_id: i64, location: String },
}

impl LocationDialog {
    pub fn open(&mut self, booking_id: Option<i64>) -> Result<i64, ConsoleError> {
        let booking_id = booking_id.ok_or(ConsoleError::MissingBookingId)?;
        *self = LocationDialog::AwaitingInput { booking_id };
        Ok(booking_id)
    }

    /// Returns what to submit, or `None` when not waiting or the answer is empty.
    pub fn answer(&mut self, input: &str) -> Option<(i64, String)> {
        let LocationDialog::AwaitingInput { booking_id } = *self else {
            return None;
        };
        if input.is_empty() {
            *self = LocationDialog::Closed;
            return None;
        }
        *self = LocationDialog::Submitting {
            booking_id,
            location: input.to_string(),
        };
        Some((booking_id, input.to_string()))
    }

    pub fn close(&mut self) {
        *self = LocationDialog::Closed;
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self, LocationDialog::AwaitingInput { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleState {
    pub clients: Vec<Client>,
    pub photographers: Vec<Photographer>,
    pub timeslots: Vec<Timeslot>,
    pub available_photographers: Vec<AvailablePhotographer>,
    pub sessions: Vec<Session>,
    pub sessions_page: usize,
    pub selected_client: Option<i64>,
    pub selected_date: String,
    pub availability: AvailabilityForm,
    pub session_form: SessionForm,
    pub pending_input: TextInput,
    pub location_dialog: LocationDialog,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, client_id: i64) -> Option<&Client> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }

    pub fn photographer(&self, photographer_id: i64) -> Option<&Photographer> {
        self.photographers
            .iter()
            .find(|p| p.photographer_id == photographer_id)
    }

    pub fn timeslot(&self, timeslot_id: i64) -> Option<&Timeslot> {
        self.timeslots
            .iter()
            .find(|t| t.timeslot_id == Some(timeslot_id))
    }

    pub fn remove_session(&mut self, booking_id: i64) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.booking.booking_id != booking_id);
        self.sessions.len() != before
    }

    pub fn set_session_location(&mut self, booking_id: i64, location: &str) -> bool {
        match self
            .sessions
            .iter_mut()
            .find(|s| s.booking.booking_id == booking_id)
        {
            Some(session) => {
                session.booking.location = Some(location.to_string());
                true
            }
            None => false,
        }
    }

    /// A failure only leaves the affected roster empty.
    pub async fn load_reference_data(&mut self, api: &BookingApi) {
        match api.list_clients().await {
            Ok(clients) => self.clients = clients,
            Err(e) => {
                error!("Error fetching clients: {}", e);
                self.clients.clear();
            }
        }
        match api.list_photographers().await {
            Ok(photographers) => self.photographers = photographers,
            Err(e) => {
                error!("Error fetching photographers: {}", e);
                self.photographers.clear();
            }
        }
        info!(
            "Loaded {} clients and {} photographers",
            self.clients.len(),
            self.photographers.len()
        );
    }

    pub async fn refresh_timeslots(&mut self, api: &BookingApi, photographer_id: i64) {
        match api.available_timeslots(photographer_id).await {
            Ok(timeslots) => self.timeslots = timeslots,
            Err(e) => error!("Error fetching available timeslots: {}", e),
        }
    }

    pub async fn select_booking_photographer(&mut self, api: &BookingApi, photographer_id: i64) {
        self.session_form.photographer_id = Some(photographer_id);
        self.refresh_timeslots(api, photographer_id).await;
    }

    pub async fn find_photographers(&mut self, api: &BookingApi, date: String) {
        match api.available_photographers(&date).await {
            Ok(found) => self.available_photographers = found,
            Err(e) => error!("Error fetching available photographers: {}", e),
        }
        self.selected_date = date;
    }

    pub async fn create_availability(&mut self, api: &BookingApi) -> Result<String, ConsoleError> {
        let request = self.availability.to_request(TransactionId::now())?;
        let message = api
            .create_availability(&request)
            .await
            .map_err(ConsoleError::service("Error creating availability"))?;
        self.refresh_timeslots(api, request.photographer_id).await;
        Ok(message)
    }

    // sessions are not refreshed
    pub async fn schedule_session(&mut self, api: &BookingApi) -> Result<String, ConsoleError> {
        let request = self.session_form.to_request(TransactionId::now());
        api.create_booking(&request)
            .await
            .map_err(ConsoleError::service("Error scheduling session"))
    }

    pub async fn select_client_sessions(
        &mut self,
        api: &BookingApi,
        client_id: i64,
    ) -> Result<(), ConsoleError> {
        let bookings = api
            .client_bookings(client_id)
            .await
            .map_err(ConsoleError::service("Error fetching sessions for client"))?;
        self.sessions =
            reconcile_sessions(bookings, &self.photographers, |id| api.timeslot(id)).await;
        self.selected_client = Some(client_id);
        Ok(())
    }

    pub async fn cancel_session(
        &mut self,
        api: &BookingApi,
        booking_id: Option<i64>,
    ) -> Result<String, ConsoleError> {
        let booking_id = booking_id.ok_or(ConsoleError::MissingBookingId)?;
        let message = api
            .cancel_booking(booking_id, TransactionId::now())
            .await
            .map_err(ConsoleError::service("Error canceling session"))?;
        self.remove_session(booking_id);
        Ok(message)
    }

    pub fn begin_location_update(&mut self, booking_id: Option<i64>) -> Result<i64, ConsoleError> {
        self.location_dialog.open(booking_id)
    }

    pub fn cancel_pending_input(&mut self) {
        self.pending_input = TextInput::None;
        self.location_dialog.close();
    }

    /// The dialog is closed afterwards whatever the outcome.
    pub async fn submit_location(
        &mut self,
        api: &BookingApi,
        input: &str,
    ) -> Result<String, ConsoleError> {
        let (booking_id, location) = self
            .location_dialog
            .answer(input)
            .ok_or(ConsoleError::EmptyLocation)?;
        let request = LocationUpdate {
            transaction_id: TransactionId::now(),
            location,
        };
        let result = api
            .update_booking_location(booking_id, &request)
            .await
            .map_err(ConsoleError::service("Error updating session location"));
        self.location_dialog.close();
        let message = result?;
        self.set_session_location(booking_id, &request.location);
        Ok(message)
    }
}
