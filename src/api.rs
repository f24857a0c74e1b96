use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::models::{
    AvailablePhotographer, Booking, Client, LocationUpdate, NewAvailability, NewBooking,
    Photographer, Timeslot, TransactionId,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to booking service failed: {0}")]
    Request(#[from] reqwest::Error),

    /// `message` is the body's `error` field.
    #[error("booking service returned {status}")]
    Status { status: u16, message: Option<String> },

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientsEnvelope {
    clients: Option<Vec<Client>>,
}

#[derive(Debug, Deserialize)]
struct PhotographersEnvelope {
    photographers: Option<Vec<Photographer>>,
}

#[derive(Debug, Deserialize)]
struct TimeslotsEnvelope {
    available_timeslots: Option<Vec<Timeslot>>,
}

#[derive(Debug, Deserialize)]
struct AvailablePhotographersEnvelope {
    available_photographers: Option<Vec<AvailablePhotographer>>,
}

#[derive(Debug, Deserialize)]
struct BookingsEnvelope {
    bookings: Option<Vec<Booking>>,
}

#[derive(Clone)]
pub struct BookingApi {
    client: reqwest::Client,
    base: Url,
}

impl BookingApi {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let response = self.client.get(self.url("health")?).send().await?;
        Self::parse_response(response).await
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, ApiError> {
        let response = self.client.get(self.url("clients")?).send().await?;
        let envelope: ClientsEnvelope = Self::parse_response(response).await?;
        Ok(envelope.clients.unwrap_or_default())
    }

    pub async fn list_photographers(&self) -> Result<Vec<Photographer>, ApiError> {
        let response = self.client.get(self.url("photographers")?).send().await?;
        let envelope: PhotographersEnvelope = Self::parse_response(response).await?;
        Ok(envelope.photographers.unwrap_or_default())
    }

    pub async fn available_timeslots(&self, photographer_id: i64) -> Result<Vec<Timeslot>, ApiError> {
        let url = self.url(&format!("photographers/{}/available-timeslots", photographer_id))?;
        let response = self.client.get(url).send().await?;
        let envelope: TimeslotsEnvelope = Self::parse_response(response).await?;
        Ok(envelope.available_timeslots.unwrap_or_default())
    }

    pub async fn available_photographers(
        &self,
        date: &str,
    ) -> Result<Vec<AvailablePhotographer>, ApiError> {
        let response = self
            .client
            .get(self.url("photographers/availability")?)
            .query(&[("date", date)])
            .send()
            .await?;
        let envelope: AvailablePhotographersEnvelope = Self::parse_response(response).await?;
        Ok(envelope.available_photographers.unwrap_or_default())
    }

    pub async fn create_availability(&self, request: &NewAvailability) -> Result<String, ApiError> {
        debug!("POST availability, transaction {}", request.transaction_id);
        let response = self
            .client
            .post(self.url("availability")?)
            .json(request)
            .send()
            .await?;
        Self::parse_message(response).await
    }

    pub async fn create_booking(&self, request: &NewBooking) -> Result<String, ApiError> {
        debug!("POST booking, transaction {}", request.transaction_id);
        let response = self
            .client
            .post(self.url("bookings")?)
            .json(request)
            .send()
            .await?;
        Self::parse_message(response).await
    }

    pub async fn client_bookings(&self, client_id: i64) -> Result<Vec<Booking>, ApiError> {
        let url = self.url(&format!("clients/{}/bookings", client_id))?;
        let response = self.client.get(url).send().await?;
        let envelope: BookingsEnvelope = Self::parse_response(response).await?;
        Ok(envelope.bookings.unwrap_or_default())
    }

    pub async fn timeslot(&self, timeslot_id: i64) -> Result<Timeslot, ApiError> {
        let url = self.url(&format!("timeslots/{}", timeslot_id))?;
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        transaction_id: TransactionId,
    ) -> Result<String, ApiError> {
        debug!("DELETE booking {}, transaction {}", booking_id, transaction_id);
        let response = self
            .client
            .delete(self.url(&format!("bookings/{}", booking_id))?)
            .query(&[("TransactionID", transaction_id.0)])
            .send()
            .await?;
        Self::parse_message(response).await
    }

    pub async fn update_booking_location(
        &self,
        booking_id: i64,
        request: &LocationUpdate,
    ) -> Result<String, ApiError> {
        debug!("PUT booking {}, transaction {}", booking_id, request.transaction_id);
        let response = self
            .client
            .put(self.url(&format!("bookings/{}", booking_id))?)
            .json(request)
            .send()
            .await?;
        Self::parse_message(response).await
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn parse_message(response: reqwest::Response) -> Result<String, ApiError> {
        let body: MessageBody = Self::parse_response(response).await?;
        Ok(body.message.unwrap_or_default())
    }
}
