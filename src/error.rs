use crate::{callback::CallbackError, http::TransportError};
use thiserror::Error;

/// Ошибки обработки одного события. Наружу из обработчика не выходят:
/// превращаются в текст ответа пользователю.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Input(#[from] CallbackError),
    #[error("Not authorized.")]
    Unauthorized,
}

impl BotError {
    /// "TMDB error: ...", "IA error: ..." и т.п. Битые данные кнопки: просто "Error: ...".
    pub fn render(&self, area: &str) -> String {
        match self {
            BotError::Unauthorized => self.to_string(),
            BotError::Input(_) => format!("Error: {self}"),
            _ => format!("{area} error: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefixes_area() {
        let e = BotError::from(TransportError::ContentType("text/html".into()));
        assert_eq!(e.render("Providers"), "Providers error: unexpected content-type: text/html");
        assert_eq!(BotError::Unauthorized.render("Admin"), "Not authorized.");
    }

    #[test]
    fn bad_callback_data_renders_plain_error() {
        let e = BotError::from(CallbackError::Id("x".into()));
        assert_eq!(e.render("Callback"), "Error: bad id \"x\"");
    }
}
