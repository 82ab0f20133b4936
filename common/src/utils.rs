use chrono::{DateTime, Utc};

pub fn validate_url(url: &str) -> Result<(), String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err("URL must start with http:// or https://".to_string())
    }
}

/// Age label for an alert card, relative to `now`.
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - created_at).num_minutes();
    if mins < 1 {
        return "Agora".to_string();
    }
    if mins < 60 {
        return format!("{} min atrás", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h atrás", hours);
    }
    format!("{}d atrás", hours / 24)
}
