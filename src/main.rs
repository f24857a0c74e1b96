use std::{collections::HashMap, sync::Arc};

use api::BookingApi;
use config::get_config;
use handlers::{handle_callback_query, handle_message, UserSessions};
use tokio::sync::Mutex;
mod api;
mod config;
mod console;
mod handlers;
mod keyboards;
mod models;
mod reconcile;
use teloxide::{
    dispatching::UpdateFilterExt,
    prelude::*,
    types::CallbackQuery,
};

extern crate pretty_env_logger;
#[macro_use] extern crate log;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            error!("BOOKING_API_URL is not a valid url: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using booking service at {}", config.api_url);

    let api = BookingApi::new(config.api_url.clone());
    match api.health().await {
        Ok(health) => info!("Booking service: {}", health.status.unwrap_or_default()),
        Err(e) => warn!("Booking service health check failed: {}", e),
    }

    let bot = Bot::from_env();
    let user_sessions: UserSessions = Arc::new(Mutex::new(HashMap::new()));

    let handler = dptree::entry()
    .branch(
        Update::filter_message().endpoint({
        let api = api.clone();
        let user_sessions = user_sessions.clone();

        move |bot: Bot, msg: Message| {
            let api = api.clone();
            let user_sessions = user_sessions.clone();

            async move {
                if let Err(e) = handle_message(bot, msg, api, user_sessions).await {
                    error!("Error handling message: {}", e);
                }
                respond(())
            }
        }
    }))
    .branch(Update::filter_callback_query().endpoint({
        let api = api.clone();
        let user_sessions = user_sessions.clone();

        move |q: CallbackQuery, bot: Bot| {
            let api = api.clone();
            let user_sessions = user_sessions.clone();

            async move {
                if let Err(e) = handle_callback_query(q, bot, api, user_sessions).await {
                    error!("Error handling callback query: {}", e);
                }
                respond(())
            }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
