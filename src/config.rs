use dotenvy::dotenv;
use std::env;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
}

pub fn get_config() -> Result<Config, url::ParseError> {
    dotenv().ok();
    let raw = env::var("BOOKING_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    Ok(Config {
        api_url: parse_api_url(&raw)?,
    })
}

// paths are joined onto it
pub fn parse_api_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{}/", trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_api_url("http://127.0.0.1:5000").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(url.join("clients").unwrap().as_str(), "http://127.0.0.1:5000/clients");
    }

    #[test]
    fn base_path_is_kept() {
        let url = parse_api_url("https://studio.example/api/").unwrap();
        assert_eq!(
            url.join("bookings/3").unwrap().as_str(),
            "https://studio.example/api/bookings/3"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_api_url("not a url").is_err());
    }
}
