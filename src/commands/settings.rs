use super::{App, Reply};
use crate::config::{self, SETTING_KEYS};
use crate::llm::{mask_secret, ChatBackend};

pub fn list<B: ChatBackend>(app: &App<B>) -> Reply {
    let mut reply = Reply::default();
    for key in SETTING_KEYS {
        match app.db.get_setting(key) {
            Ok(Some(value)) => {
                // Mask API keys for display
                let shown = if key.ends_with("_api_key") {
                    mask_secret(&value)
                } else {
                    value
                };
                reply.push(format!("{} = {}", key, shown));
            }
            Ok(None) => reply.push(format!("{} (not set)", key)),
            Err(e) => return Reply::error(e),
        }
    }
    reply
}

/// Store a setting. Key and model changes also apply to the running session;
/// a new base URL takes effect on the next start.
pub fn set<B: ChatBackend>(app: &mut App<B>, key: &str, value: &str) -> Reply {
    if let Err(e) = config::validate_setting(key, value) {
        return Reply::error(e);
    }
    if let Err(e) = app.db.set_setting(key, value) {
        return Reply::error(config::SettingsError::from(e));
    }

    match key {
        config::OPENAI_API_KEY => {
            app.controller.set_api_key(value);
            Reply::line(format!("Saved {}.", key))
        }
        config::MODEL => {
            app.controller.set_model(value);
            Reply::line(format!("Saved {}; now using {}.", key, value))
        }
        _ => Reply::line(format!("Saved {}; restart to apply.", key)),
    }
}

pub fn unset<B: ChatBackend>(app: &mut App<B>, key: &str) -> Reply {
    if !SETTING_KEYS.contains(&key) {
        return Reply::error(config::SettingsError::UnknownKey(key.to_string()));
    }
    match app.db.delete_setting(key) {
        Ok(()) => Reply::line(format!("Removed {}.", key)),
        Err(e) => Reply::error(config::SettingsError::from(e)),
    }
}

/// Session-only key, not written to the settings store.
pub fn set_api_key<B: ChatBackend>(app: &mut App<B>, key: &str) -> Reply {
    let view = app.controller.set_api_key(key);
    match view.api_key {
        Some(masked) => Reply::line(format!("API key set: {}", masked)),
        None => Reply::line("API key cleared."),
    }
}
