//! Данные inline-кнопок: `tag|kind|id[|title]`.

use crate::tmdb::{MediaKind, UnknownKind};
use std::{fmt, str::FromStr};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

pub const DELIM: char = '|';

/// Telegram не принимает callback_data длиннее 64 байт.
pub const MAX_CALLBACK_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Pick { kind: MediaKind, id: u64 },
    Providers { kind: MediaKind, id: u64 },
    Trailer { kind: MediaKind, id: u64 },
    PublicDomain { kind: MediaKind, id: u64, title: String },
    Recommend { kind: MediaKind, id: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("unknown action {0:?}")]
    UnknownTag(String),
    #[error("action {tag:?} expects {expected} fields, got {got}")]
    Arity { tag: &'static str, expected: usize, got: usize },
    #[error(transparent)]
    Kind(#[from] UnknownKind),
    #[error("bad id {0:?}")]
    Id(String),
}

impl CallbackAction {
    pub fn tag(&self) -> &'static str {
        match self {
            CallbackAction::Pick { .. } => "pick",
            CallbackAction::Providers { .. } => "prov",
            CallbackAction::Trailer { .. } => "trailer",
            CallbackAction::PublicDomain { .. } => "pd",
            CallbackAction::Recommend { .. } => "rec",
        }
    }

    /// Кнопка «Public-Domain Downloads»: разделитель в названии заменяется пробелом.
    pub fn public_domain(kind: MediaKind, id: u64, title: &str) -> Self {
        CallbackAction::PublicDomain { kind, id, title: title.replace(DELIM, " ") }
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Pick { kind, id }
            | CallbackAction::Providers { kind, id }
            | CallbackAction::Trailer { kind, id }
            | CallbackAction::Recommend { kind, id } => {
                format!("{}{DELIM}{}{DELIM}{}", self.tag(), kind, id)
            }
            CallbackAction::PublicDomain { kind, id, title } => {
                let head = format!("{}{DELIM}{}{DELIM}{}{DELIM}", self.tag(), kind, id);
                let title = title.replace(DELIM, " ");
                let mut out = head;
                for g in title.graphemes(true) {
                    if out.len() + g.len() > MAX_CALLBACK_BYTES {
                        break;
                    }
                    out.push_str(g);
                }
                out
            }
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = data.split(DELIM).collect();
        let tag = parts[0];
        let tag: &'static str = match tag {
            "pick" => "pick",
            "prov" => "prov",
            "trailer" => "trailer",
            "pd" => "pd",
            "rec" => "rec",
            other => return Err(CallbackError::UnknownTag(other.to_string())),
        };

        if tag == "pd" {
            if parts.len() < 4 {
                return Err(CallbackError::Arity { tag, expected: 4, got: parts.len() });
            }
            let (kind, id) = kind_and_id(parts[1], parts[2])?;
            // всё после третьего разделителя: название, даже если там есть '|'
            let title = parts[3..].join("|");
            return Ok(CallbackAction::PublicDomain { kind, id, title });
        }

        if parts.len() != 3 {
            return Err(CallbackError::Arity { tag, expected: 3, got: parts.len() });
        }
        let (kind, id) = kind_and_id(parts[1], parts[2])?;
        Ok(match tag {
            "pick" => CallbackAction::Pick { kind, id },
            "prov" => CallbackAction::Providers { kind, id },
            "trailer" => CallbackAction::Trailer { kind, id },
            _ => CallbackAction::Recommend { kind, id },
        })
    }
}

fn kind_and_id(kind: &str, id: &str) -> Result<(MediaKind, u64), CallbackError> {
    let kind = kind.parse::<MediaKind>()?;
    let id = id.parse::<u64>().map_err(|_| CallbackError::Id(id.to_string()))?;
    Ok((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_actions_roundtrip_kind_and_id() {
        let actions = [
            CallbackAction::Pick { kind: MediaKind::Movie, id: 603 },
            CallbackAction::Providers { kind: MediaKind::Series, id: 1399 },
            CallbackAction::Trailer { kind: MediaKind::Movie, id: 1 },
            CallbackAction::Recommend { kind: MediaKind::Series, id: u64::MAX },
        ];
        for a in actions {
            let back: CallbackAction = a.encode().parse().unwrap();
            assert_eq!(back, a);
        }
        assert_eq!(CallbackAction::Pick { kind: MediaKind::Movie, id: 603 }.encode(), "pick|movie|603");
    }

    #[test]
    fn public_domain_title_with_delimiter_is_sanitized() {
        let a = CallbackAction::public_domain(MediaKind::Movie, 603, "Matrix | Reloaded");
        let encoded = a.encode();
        assert_eq!(encoded, "pd|movie|603|Matrix   Reloaded");
        match encoded.parse::<CallbackAction>().unwrap() {
            CallbackAction::PublicDomain { kind, id, title } => {
                assert_eq!(kind, MediaKind::Movie);
                assert_eq!(id, 603);
                assert_eq!(title, "Matrix   Reloaded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn public_domain_decode_rejoins_trailing_segments() {
        let a: CallbackAction = "pd|tv|7|A|B|C".parse().unwrap();
        assert_eq!(a, CallbackAction::PublicDomain { kind: MediaKind::Series, id: 7, title: "A|B|C".into() });
    }

    #[test]
    fn public_domain_fits_telegram_limit() {
        let long = "Очень длинное название фильма ".repeat(10);
        let encoded = CallbackAction::public_domain(MediaKind::Movie, 123456, &long).encode();
        assert!(encoded.len() <= MAX_CALLBACK_BYTES);
        assert!(encoded.parse::<CallbackAction>().is_ok());
    }

    #[test]
    fn rejects_bad_input_at_decode_time() {
        assert_eq!(
            "nope|movie|1".parse::<CallbackAction>(),
            Err(CallbackError::UnknownTag("nope".into()))
        );
        assert!(matches!("pick|movie".parse::<CallbackAction>(), Err(CallbackError::Arity { .. })));
        assert!(matches!("prov|movie|1|2".parse::<CallbackAction>(), Err(CallbackError::Arity { .. })));
        assert!(matches!("rec|person|1".parse::<CallbackAction>(), Err(CallbackError::Kind(_))));
        assert!(matches!("trailer|movie|abc".parse::<CallbackAction>(), Err(CallbackError::Id(_))));
        assert!(matches!("pd|movie|1".parse::<CallbackAction>(), Err(CallbackError::Arity { .. })));
        assert!(matches!("".parse::<CallbackAction>(), Err(CallbackError::UnknownTag(_))));
    }
}
