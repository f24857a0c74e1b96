use std::{collections::HashMap, error::Error, sync::Arc};

use log::{debug, info, warn};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineKeyboardMarkup, MaybeInaccessibleMessage, Message, ReplyMarkup},
};
use tokio::sync::Mutex;

use crate::api::BookingApi;
use crate::console::{ConsoleError, ConsoleState, TextInput};
use crate::keyboards::{
    availability_card, available_photographers_text, booking_card, client_picker,
    current_month_calendar, generate_calendar, main_menu, photographer_picker, session_page,
    timeslot_picker, Action, CalendarTarget, MENU_AVAILABILITY, MENU_FIND, MENU_SCHEDULE,
    MENU_SESSIONS,
};

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// `None` until the chat's rosters have been loaded.
pub type ChatConsole = Arc<Mutex<Option<ConsoleState>>>;
pub type UserSessions = Arc<Mutex<HashMap<i64, ChatConsole>>>;

/// The map is only locked long enough to find or insert the chat's handle.
pub async fn chat_console(user_sessions: &UserSessions, chat_id: ChatId) -> ChatConsole {
    user_sessions
        .lock()
        .await
        .entry(chat_id.0)
        .or_default()
        .clone()
}

async fn console_for<'a>(slot: &'a mut Option<ConsoleState>, api: &BookingApi) -> &'a mut ConsoleState {
    if slot.is_none() {
        let mut state = ConsoleState::new();
        state.load_reference_data(api).await;
        *slot = Some(state);
    }
    slot.get_or_insert_with(ConsoleState::new)
}

async fn notify(bot: &Bot, chat_id: ChatId, outcome: Result<String, ConsoleError>) -> HandlerResult {
    let text = match outcome {
        Ok(message) if message.is_empty() => "Done.".to_string(),
        Ok(message) => message,
        Err(e) => e.to_string(),
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

fn client_name(state: &ConsoleState) -> String {
    state
        .selected_client
        .map(|id| {
            state
                .client(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("client #{}", id))
        })
        .unwrap_or_default()
}

pub async fn handle_message(
    bot: Bot,
    msg: Message,
    api: BookingApi,
    user_sessions: UserSessions,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat = chat_console(&user_sessions, chat_id).await;
    let mut slot = chat.lock().await;

    if text == "/start" {
        info!("Console opened in chat {}", chat_id.0);
        let mut state = ConsoleState::new();
        state.load_reference_data(&api).await;
        *slot = Some(state);
        bot.send_message(chat_id, "Photo Booking Management. What would you like to do?")
            .reply_markup(ReplyMarkup::Keyboard(main_menu()))
            .await?;
        return Ok(());
    }

    let session = console_for(&mut slot, &api).await;

    match text {
        "/cancel" => {
            session.cancel_pending_input();
            bot.send_message(chat_id, "Cancelled.")
                .reply_markup(ReplyMarkup::Keyboard(main_menu()))
                .await?;
        }
        MENU_AVAILABILITY => {
            session.cancel_pending_input();
            let (text, keyboard) = availability_card(session);
            bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        }
        MENU_SCHEDULE => {
            session.cancel_pending_input();
            let (text, keyboard) = booking_card(session);
            bot.send_message(chat_id, text).reply_markup(keyboard).await?;
        }
        MENU_SESSIONS => {
            session.cancel_pending_input();
            bot.send_message(chat_id, "View scheduled photoshoots of a client:")
                .reply_markup(client_picker(&session.clients, "sessions_client", "ignore"))
                .await?;
        }
        MENU_FIND => {
            session.cancel_pending_input();
            bot.send_message(chat_id, "Find available photographers on:")
                .reply_markup(current_month_calendar(CalendarTarget::Search))
                .await?;
        }
        _ if session.location_dialog.is_awaiting_input() => {
            let outcome = session.submit_location(&api, text).await;
            let updated = outcome.is_ok();
            notify(&bot, chat_id, outcome).await?;
            if updated {
                let (text, keyboard) =
                    session_page(&client_name(session), &session.sessions, session.sessions_page);
                bot.send_message(chat_id, text).reply_markup(keyboard).await?;
            }
        }
        _ => match session.pending_input {
            TextInput::AvailabilityStart | TextInput::AvailabilityEnd => {
                if session.pending_input == TextInput::AvailabilityStart {
                    session.availability.start_time = text.trim().to_string();
                } else {
                    session.availability.end_time = text.trim().to_string();
                }
                session.pending_input = TextInput::None;
                let (text, keyboard) = availability_card(session);
                bot.send_message(chat_id, text).reply_markup(keyboard).await?;
            }
            TextInput::SessionLocation => {
                session.session_form.location = text.trim().to_string();
                session.pending_input = TextInput::None;
                let (text, keyboard) = booking_card(session);
                bot.send_message(chat_id, text).reply_markup(keyboard).await?;
            }
            TextInput::None => {
                debug!("Unhandled text in chat {}: {}", chat_id.0, text);
                bot.send_message(chat_id, "Unknown command")
                    .reply_markup(ReplyMarkup::Keyboard(main_menu()))
                    .await?;
            }
        },
    }
    Ok(())
}

async fn edit(bot: &Bot, msg: &Message, text: String, keyboard: InlineKeyboardMarkup) -> HandlerResult {
    bot.edit_message_text(msg.chat.id, msg.id, text)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

pub async fn handle_callback_query(
    q: CallbackQuery,
    bot: Bot,
    api: BookingApi,
    user_sessions: UserSessions,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(msg) = q
        .message
        .as_ref()
        .and_then(MaybeInaccessibleMessage::regular_message)
        .cloned()
    else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = Action::parse(data) else {
        warn!("Unknown callback data: {}", data);
        return Ok(());
    };
    debug!("Callback {:?} in chat {}", action, chat_id.0);

    let chat = chat_console(&user_sessions, chat_id).await;
    let mut slot = chat.lock().await;
    let session = console_for(&mut slot, &api).await;

    match action {
        Action::Ignore => {}

        Action::AvailabilityCard => {
            let (text, keyboard) = availability_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::AvailabilityChoosePhotographer => {
            edit(
                &bot,
                &msg,
                "Select photographer".to_string(),
                photographer_picker(&session.photographers, "avail_photographer", "avail:card"),
            )
            .await?;
        }
        Action::AvailabilityPhotographer(photographer_id) => {
            session.availability.photographer_id = Some(photographer_id);
            let (text, keyboard) = availability_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::AvailabilityChooseDate => {
            bot.edit_message_reply_markup(chat_id, msg.id)
                .reply_markup(current_month_calendar(CalendarTarget::Availability))
                .await?;
        }
        Action::AvailabilityStartTime => {
            session.pending_input = TextInput::AvailabilityStart;
            bot.send_message(chat_id, "Enter the start time (e.g. 10:00):").await?;
        }
        Action::AvailabilityEndTime => {
            session.pending_input = TextInput::AvailabilityEnd;
            bot.send_message(chat_id, "Enter the end time (e.g. 11:00):").await?;
        }
        Action::AvailabilitySubmit => {
            let outcome = session.create_availability(&api).await;
            notify(&bot, chat_id, outcome).await?;
        }

        Action::BookingCard => {
            let (text, keyboard) = booking_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::BookingChooseClient => {
            edit(
                &bot,
                &msg,
                "Select client".to_string(),
                client_picker(&session.clients, "book_client", "book:card"),
            )
            .await?;
        }
        Action::BookingClient(client_id) => {
            session.session_form.client_id = Some(client_id);
            let (text, keyboard) = booking_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::BookingChoosePhotographer => {
            edit(
                &bot,
                &msg,
                "Select photographer".to_string(),
                photographer_picker(&session.photographers, "book_photographer", "book:card"),
            )
            .await?;
        }
        Action::BookingPhotographer(photographer_id) => {
            session.select_booking_photographer(&api, photographer_id).await;
            let (text, keyboard) = booking_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::BookingChooseTimeslot => {
            let text = if session.timeslots.is_empty() {
                "No available timeslots. Select a photographer first."
            } else {
                "Select timeslot"
            };
            edit(&bot, &msg, text.to_string(), timeslot_picker(&session.timeslots)).await?;
        }
        Action::BookingTimeslot(timeslot_id) => {
            session.session_form.timeslot_id = Some(timeslot_id);
            let (text, keyboard) = booking_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::BookingLocation => {
            session.pending_input = TextInput::SessionLocation;
            bot.send_message(chat_id, "Enter the session location:").await?;
        }
        Action::BookingSubmit => {
            let outcome = session.schedule_session(&api).await;
            notify(&bot, chat_id, outcome).await?;
        }

        Action::SessionsClient(client_id) => {
            match session.select_client_sessions(&api, client_id).await {
                Ok(()) => {
                    session.sessions_page = 0;
                    let (text, keyboard) = session_page(&client_name(session), &session.sessions, 0);
                    edit(&bot, &msg, text, keyboard).await?;
                }
                Err(e) => notify(&bot, chat_id, Err(e)).await?,
            }
        }
        Action::SessionsPage(page) => {
            session.sessions_page = page;
            let (text, keyboard) = session_page(&client_name(session), &session.sessions, page);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::CancelSession(booking_id) => {
            let outcome = session.cancel_session(&api, booking_id).await;
            let cancelled = outcome.is_ok();
            notify(&bot, chat_id, outcome).await?;
            if cancelled {
                let (text, keyboard) =
                    session_page(&client_name(session), &session.sessions, session.sessions_page);
                edit(&bot, &msg, text, keyboard).await?;
            }
        }
        Action::UpdateLocation(booking_id) => match session.begin_location_update(booking_id) {
            Ok(booking_id) => {
                session.pending_input = TextInput::None;
                bot.send_message(
                    chat_id,
                    format!("Enter the new location for booking #{} (or /cancel):", booking_id),
                )
                .await?;
            }
            Err(e) => notify(&bot, chat_id, Err(e)).await?,
        },

        Action::CalendarSelect(CalendarTarget::Availability, date) => {
            session.availability.date = date.format("%Y-%m-%d").to_string();
            let (text, keyboard) = availability_card(session);
            edit(&bot, &msg, text, keyboard).await?;
        }
        Action::CalendarSelect(CalendarTarget::Search, date) => {
            session
                .find_photographers(&api, date.format("%Y-%m-%d").to_string())
                .await;
            bot.send_message(
                chat_id,
                available_photographers_text(&session.selected_date, &session.available_photographers),
            )
            .await?;
        }
        Action::CalendarMonth(target, month, year) => {
            bot.edit_message_reply_markup(chat_id, msg.id)
                .reply_markup(generate_calendar(month, year, target))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_api_url;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn busy_chat_does_not_block_others() {
        let user_sessions: UserSessions = Arc::new(Mutex::new(HashMap::new()));
        let first = chat_console(&user_sessions, ChatId(1)).await;
        let _busy = first.lock().await;

        let other = tokio::time::timeout(Duration::from_millis(200), async {
            let chat = chat_console(&user_sessions, ChatId(2)).await;
            let mut slot = chat.lock().await;
            *slot = Some(ConsoleState::new());
        })
        .await;
        assert!(other.is_ok());

        let again = chat_console(&user_sessions, ChatId(1)).await;
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(user_sessions.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn rosters_load_once_per_chat() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "clients": [{"ClientID": 1, "Name": "Alice"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photographers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"photographers": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = BookingApi::new(parse_api_url(&server.uri()).unwrap());
        let user_sessions: UserSessions = Arc::new(Mutex::new(HashMap::new()));
        let chat = chat_console(&user_sessions, ChatId(7)).await;
        let mut slot = chat.lock().await;
        console_for(&mut slot, &api).await.selected_date = "2024-06-01".into();
        let state = console_for(&mut slot, &api).await;
        assert_eq!(state.client(1).map(|c| c.name.as_str()), Some("Alice"));
        assert_eq!(state.selected_date, "2024-06-01");
    }
}
