use chrono::{Datelike, Local, NaiveDate};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::console::ConsoleState;
use crate::models::{AvailablePhotographer, Client, Photographer, Session, Timeslot};

pub const MENU_AVAILABILITY: &str = "Create availability";
pub const MENU_SCHEDULE: &str = "Schedule session";
pub const MENU_SESSIONS: &str = "Client sessions";
pub const MENU_FIND: &str = "Find photographers";

pub const SESSIONS_PER_PAGE: usize = 3;

/// Where a picked calendar date goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarTarget {
    Availability,
    Search,
}

impl CalendarTarget {
    fn mark(self) -> &'static str {
        match self {
            CalendarTarget::Availability => "avail",
            CalendarTarget::Search => "find",
        }
    }

    fn from_mark(mark: &str) -> Option<Self> {
        match mark {
            "avail" => Some(CalendarTarget::Availability),
            "find" => Some(CalendarTarget::Search),
            _ => None,
        }
    }
}

/// Decoded inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ignore,
    AvailabilityCard,
    AvailabilityChoosePhotographer,
    AvailabilityChooseDate,
    AvailabilityStartTime,
    AvailabilityEndTime,
    AvailabilitySubmit,
    AvailabilityPhotographer(i64),
    BookingCard,
    BookingChooseClient,
    BookingChoosePhotographer,
    BookingChooseTimeslot,
    BookingLocation,
    BookingSubmit,
    BookingClient(i64),
    BookingPhotographer(i64),
    BookingTimeslot(i64),
    SessionsClient(i64),
    SessionsPage(usize),
    CancelSession(Option<i64>),
    UpdateLocation(Option<i64>),
    CalendarSelect(CalendarTarget, NaiveDate),
    CalendarMonth(CalendarTarget, u32, i32),
}

impl Action {
    pub fn parse(data: &str) -> Option<Action> {
        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["ignore"] => Action::Ignore,
            ["avail", "card"] => Action::AvailabilityCard,
            ["avail", "photographer"] => Action::AvailabilityChoosePhotographer,
            ["avail", "date"] => Action::AvailabilityChooseDate,
            ["avail", "start"] => Action::AvailabilityStartTime,
            ["avail", "end"] => Action::AvailabilityEndTime,
            ["avail", "submit"] => Action::AvailabilitySubmit,
            ["avail_photographer", id] => Action::AvailabilityPhotographer(id.parse().ok()?),
            ["book", "card"] => Action::BookingCard,
            ["book", "client"] => Action::BookingChooseClient,
            ["book", "photographer"] => Action::BookingChoosePhotographer,
            ["book", "timeslot"] => Action::BookingChooseTimeslot,
            ["book", "location"] => Action::BookingLocation,
            ["book", "submit"] => Action::BookingSubmit,
            ["book_client", id] => Action::BookingClient(id.parse().ok()?),
            ["book_photographer", id] => Action::BookingPhotographer(id.parse().ok()?),
            ["book_timeslot", id] => Action::BookingTimeslot(id.parse().ok()?),
            ["sessions_client", id] => Action::SessionsClient(id.parse().ok()?),
            ["sessions_page", page] => Action::SessionsPage(page.parse().ok()?),
            // an unparsable id still reaches the console, which rejects it
            ["cancel", id] => Action::CancelSession(id.parse().ok()),
            ["relocate", id] => Action::UpdateLocation(id.parse().ok()),
            ["calendar", mark, "select", date] => Action::CalendarSelect(
                CalendarTarget::from_mark(mark)?,
                NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
            ),
            ["calendar", mark, "month", month, year] => {
                let month: u32 = month.parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                Action::CalendarMonth(CalendarTarget::from_mark(mark)?, month, year.parse().ok()?)
            }
            _ => return None,
        };
        Some(action)
    }
}

pub fn main_menu() -> KeyboardMarkup {
    let buttons: Vec<Vec<KeyboardButton>> = vec![
        vec![KeyboardButton::new(MENU_AVAILABILITY), KeyboardButton::new(MENU_SCHEDULE)],
        vec![KeyboardButton::new(MENU_SESSIONS), KeyboardButton::new(MENU_FIND)],
    ];
    KeyboardMarkup::new(buttons).resize_keyboard()
}

/// One button per row, each calling back `mark:action`, plus a back button.
pub fn generate_inline_markup(
    mark: &str,
    buttons: Vec<String>,
    actions: Vec<String>,
    back: &str,
) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for (i, label) in buttons.into_iter().enumerate() {
        let callback = match actions.get(i) {
            Some(action) => format!("{}:{}", mark, action),
            None => "ignore".to_string(),
        };
        keyboard.push(vec![InlineKeyboardButton::callback(label, callback)]);
    }
    keyboard.push(vec![InlineKeyboardButton::callback("⟵ Back", back.to_string())]);
    InlineKeyboardMarkup::new(keyboard)
}

pub fn photographer_picker(photographers: &[Photographer], mark: &str, back: &str) -> InlineKeyboardMarkup {
    generate_inline_markup(
        mark,
        photographers.iter().map(photographer_label).collect(),
        photographers
            .iter()
            .map(|p| p.photographer_id.to_string())
            .collect(),
        back,
    )
}

pub fn client_picker(clients: &[Client], mark: &str, back: &str) -> InlineKeyboardMarkup {
    generate_inline_markup(
        mark,
        clients.iter().map(|c| c.name.clone()).collect(),
        clients.iter().map(|c| c.client_id.to_string()).collect(),
        back,
    )
}

pub fn timeslot_picker(timeslots: &[Timeslot]) -> InlineKeyboardMarkup {
    let (labels, ids): (Vec<String>, Vec<String>) = timeslots
        .iter()
        .filter_map(|t| Some((timeslot_label(t), t.timeslot_id?.to_string())))
        .unzip();
    generate_inline_markup("book_timeslot", labels, ids, "book:card")
}

fn photographer_label(photographer: &Photographer) -> String {
    match &photographer.specialty {
        Some(specialty) if !specialty.is_empty() => format!("{} ({})", photographer.name, specialty),
        _ => photographer.name.clone(),
    }
}

pub fn timeslot_label(timeslot: &Timeslot) -> String {
    format!(
        "{} {}-{}",
        timeslot.available_date.as_deref().unwrap_or(""),
        timeslot.start_time.as_deref().unwrap_or(""),
        timeslot.end_time.as_deref().unwrap_or("")
    )
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "—"
    } else {
        value
    }
}

pub fn availability_card(state: &ConsoleState) -> (String, InlineKeyboardMarkup) {
    let form = &state.availability;
    let photographer = form
        .photographer_id
        .map(|id| {
            state
                .photographer(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "—".to_string());

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            format!("👤 Photographer: {}", photographer),
            "avail:photographer",
        )],
        vec![InlineKeyboardButton::callback(
            format!("📅 Date: {}", or_dash(&form.date)),
            "avail:date",
        )],
        vec![
            InlineKeyboardButton::callback(format!("🕒 Start: {}", or_dash(&form.start_time)), "avail:start"),
            InlineKeyboardButton::callback(format!("🕒 End: {}", or_dash(&form.end_time)), "avail:end"),
        ],
        vec![InlineKeyboardButton::callback("✅ Create availability", "avail:submit")],
    ]);
    ("Create photographer availability".to_string(), keyboard)
}

pub fn booking_card(state: &ConsoleState) -> (String, InlineKeyboardMarkup) {
    let form = &state.session_form;
    let client = form
        .client_id
        .map(|id| {
            state
                .client(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "—".to_string());
    let photographer = form
        .photographer_id
        .map(|id| {
            state
                .photographer(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "—".to_string());
    let timeslot = form
        .timeslot_id
        .map(|id| {
            state
                .timeslot(id)
                .map(timeslot_label)
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "—".to_string());

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(format!("🙋 Client: {}", client), "book:client")],
        vec![InlineKeyboardButton::callback(
            format!("👤 Photographer: {}", photographer),
            "book:photographer",
        )],
        vec![InlineKeyboardButton::callback(format!("🕒 Timeslot: {}", timeslot), "book:timeslot")],
        vec![InlineKeyboardButton::callback(
            format!("📍 Location: {}", or_dash(&form.location)),
            "book:location",
        )],
        vec![InlineKeyboardButton::callback("✅ Schedule session", "book:submit")],
    ]);
    ("Schedule a session".to_string(), keyboard)
}

pub fn session_card(session: &Session) -> String {
    let mut card = format!(
        "{}\n📅 {}\n🕒 {} - {}\n📍 {}",
        session.photographer_name.as_deref().unwrap_or("Unknown Photographer"),
        session.date.as_deref().unwrap_or("Unknown Date"),
        session.start_time.as_deref().unwrap_or("Unknown Start"),
        session.end_time.as_deref().unwrap_or("Unknown End"),
        session
            .booking
            .location
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or("Unknown Location"),
    );
    if !session.is_enriched() {
        card.push_str("\n⚠️ Session details unavailable");
    }
    card
}

/// Render one page of the client's sessions with cancel/update buttons per
/// booking and page navigation. Out-of-range pages clamp to the last one.
pub fn session_page(client_name: &str, sessions: &[Session], page: usize) -> (String, InlineKeyboardMarkup) {
    if sessions.is_empty() {
        return (
            format!("{} has no scheduled photoshoots.", client_name),
            InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new()),
        );
    }

    let total_pages = sessions.len().div_ceil(SESSIONS_PER_PAGE);
    let page = page.min(total_pages - 1);
    let start_idx = page * SESSIONS_PER_PAGE;
    let end_idx = std::cmp::min(start_idx + SESSIONS_PER_PAGE, sessions.len());

    let mut message = format!("📋 Scheduled photoshoots of {}:\n\n", client_name);
    let mut keyboard = vec![];
    for session in &sessions[start_idx..end_idx] {
        let booking_id = session.booking.booking_id;
        message.push_str(&format!("Booking #{}\n{}\n\n", booking_id, session_card(session)));
        keyboard.push(vec![
            InlineKeyboardButton::callback(format!("🔢 #{}", booking_id), "ignore"),
            InlineKeyboardButton::callback("❌ Cancel", format!("cancel:{}", booking_id)),
            InlineKeyboardButton::callback("✏️ Update location", format!("relocate:{}", booking_id)),
        ]);
    }

    if total_pages > 1 {
        let mut nav_buttons = vec![];
        if page > 0 {
            nav_buttons.push(InlineKeyboardButton::callback("⬅️ Back", format!("sessions_page:{}", page - 1)));
        }
        nav_buttons.push(InlineKeyboardButton::callback(
            format!("📄 {}/{}", page + 1, total_pages),
            "ignore",
        ));
        if page < total_pages - 1 {
            nav_buttons.push(InlineKeyboardButton::callback("Next ➡️", format!("sessions_page:{}", page + 1)));
        }
        keyboard.push(nav_buttons);
    }

    (message, InlineKeyboardMarkup::new(keyboard))
}

pub fn available_photographers_text(date: &str, photographers: &[AvailablePhotographer]) -> String {
    if photographers.is_empty() {
        return "No photographers available for the selected date.".to_string();
    }
    let mut message = format!("Available photographers on {}:\n", date);
    for p in photographers {
        message.push_str(&format!(
            "• {} - Specialty: {}",
            p.name,
            p.specialty.as_deref().unwrap_or("")
        ));
        if let (Some(start), Some(end)) = (&p.start_time, &p.end_time) {
            message.push_str(&format!(" ({}-{})", start, end));
        }
        message.push('\n');
    }
    message
}

pub fn generate_calendar(month: u32, year: i32, target: CalendarTarget) -> InlineKeyboardMarkup {
    let mark = target.mark();
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    keyboard.push(vec![InlineKeyboardButton::callback(
        format!("📅 {} {}", month_name(month), year),
        "ignore",
    )]);

    let weekdays = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
    keyboard.push(
        weekdays
            .iter()
            .map(|day| InlineKeyboardButton::callback(day.to_string(), "ignore"))
            .collect(),
    );

    if let Some(first_day) = NaiveDate::from_ymd_opt(year, month, 1) {
        let today = Local::now().date_naive();
        let mut row: Vec<InlineKeyboardButton> = Vec::new();

        let shift = first_day.weekday().num_days_from_monday() as usize;
        for _ in 0..shift {
            row.push(InlineKeyboardButton::callback(" ", "ignore"));
        }

        for date in first_day.iter_days().take_while(|d| d.month() == month) {
            let label = if date == today {
                format!("•{}", date.day())
            } else {
                date.day().to_string()
            };
            row.push(InlineKeyboardButton::callback(
                label,
                format!("calendar:{}:select:{}", mark, date.format("%Y-%m-%d")),
            ));
            if row.len() == 7 {
                keyboard.push(std::mem::take(&mut row));
            }
        }

        if !row.is_empty() {
            while row.len() < 7 {
                row.push(InlineKeyboardButton::callback(" ", "ignore"));
            }
            keyboard.push(row);
        }
    }

    let (prev_month, prev_year) = if month == 1 { (12, year - 1) } else { (month - 1, year) };
    let (next_month, next_year) = if month == 12 { (1, year + 1) } else { (month + 1, year) };
    keyboard.push(vec![
        InlineKeyboardButton::callback(
            "< Month",
            format!("calendar:{}:month:{}:{}", mark, prev_month, prev_year),
        ),
        InlineKeyboardButton::callback(
            "Month >",
            format!("calendar:{}:month:{}:{}", mark, next_month, next_year),
        ),
    ]);

    if target == CalendarTarget::Availability {
        keyboard.push(vec![InlineKeyboardButton::callback("⟵ Back", "avail:card")]);
    }

    InlineKeyboardMarkup::new(keyboard)
}

pub fn current_month_calendar(target: CalendarTarget) -> InlineKeyboardMarkup {
    let today = Local::now().date_naive();
    generate_calendar(today.month(), today.year(), target)
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January", 2 => "February", 3 => "March", 4 => "April",
        5 => "May", 6 => "June", 7 => "July", 8 => "August",
        9 => "September", 10 => "October", 11 => "November", 12 => "December",
        _ => "",
    }
}
