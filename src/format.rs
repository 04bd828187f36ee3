//! Тексты сообщений и раскладки кнопок. Без побочных эффектов.

use crate::archive::ArchiveItem;
use crate::callback::CallbackAction;
use crate::tmdb::{DetailRecord, MediaKind, ProviderSet, SearchResult, Trending};
use std::collections::BTreeSet;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const BUTTON_LABEL_MAX: usize = 60;
pub const PICKER_MAX: usize = 10;
/// Подпись к фото в Telegram: до 1024 символов; оставляем место под заголовок.
pub const CAPTION_OVERVIEW_MAX: usize = 850;

pub const NO_RESULTS: &str = "No results found.";
pub const SEARCH_USAGE: &str = "Please type: /search <movie/series name>";
pub const PICK_PROMPT: &str = "Select one:";
pub const TRAILER_NOT_FOUND: &str = "Trailer not found.";
pub const ARCHIVE_SEARCHING: &str = "Searching Internet Archive (public-domain/CC) …";
pub const ARCHIVE_EMPTY: &str = "No public-domain/CC results found for this title.";
pub const ARCHIVE_LEGAL: &str = "Only share/use content permitted by the license.";
pub const NO_SIMILAR: &str = "No similar titles found.";
const NO_OVERVIEW: &str = "No overview available.";
const UNTITLED: &str = "Untitled";
const EMPTY_LIST: &str = "—";

pub fn splash(brand: &str, tagline: &str, region: &str) -> String {
    format!(
        "<b>{}</b>\n<i>{}</i>\n\n\
         This bot gives you <b>legal</b> information about movies and series:\n\
         • Search + details + poster\n\
         • Where it streams in {} (legal providers)\n\
         • Legal download links for public-domain/CC licensed videos (Internet Archive)\n\
         • Similar recommendations\n\
         • Today's trending (TMDB)\n\n\
         Use: /search &lt;movie or series name&gt;\n\
         Try: /trending",
        html_escape(brand),
        html_escape(tagline),
        html_escape(region),
    )
}

pub fn help() -> &'static str {
    "To search: /search <query> (example: /search Charlie Chaplin)\nTrending: /trending"
}

/// "Title (Year)" или просто "Title", если года нет.
pub fn one_line_title(title: &str, year: &str) -> String {
    if year.is_empty() {
        title.to_string()
    } else {
        format!("{} ({})", title, year)
    }
}

/// Подпись кнопки: не длиннее 60 символов, пустое название: "Untitled".
pub fn button_label(title: &str, year: &str) -> String {
    let title = if title.trim().is_empty() { UNTITLED } else { title };
    one_line_title(title, year).chars().take(BUTTON_LABEL_MAX).collect()
}

/// По одной кнопке в строке, не больше 10.
pub fn picker_keyboard(results: &[SearchResult]) -> InlineKeyboardMarkup {
    let rows = results
        .iter()
        .take(PICKER_MAX)
        .map(|r| {
            let label = button_label(&r.title, &r.year);
            let data = CallbackAction::Pick { kind: r.kind, id: r.id }.encode();
            vec![InlineKeyboardButton::callback(label, data)]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn detail_text(d: &DetailRecord, overview_limit: usize) -> String {
    let title = html_escape(&d.title);
    let body = if d.overview.trim().is_empty() {
        NO_OVERVIEW.to_string()
    } else {
        html_escape(&clip(&d.overview, overview_limit))
    };
    if d.year.is_empty() {
        format!("<b>{}</b>\n\n{}", title, body)
    } else {
        format!("<b>{}</b> ({})\n\n{}", title, html_escape(&d.year), body)
    }
}

pub fn detail_keyboard(kind: MediaKind, id: u64, title: &str, region: &str) -> InlineKeyboardMarkup {
    let buttons = [
        (format!("Where to Watch ({})", region), CallbackAction::Providers { kind, id }),
        ("Trailer".to_string(), CallbackAction::Trailer { kind, id }),
        ("Public-Domain Downloads".to_string(), CallbackAction::public_domain(kind, id, title)),
        ("Recommendations".to_string(), CallbackAction::Recommend { kind, id }),
    ];
    InlineKeyboardMarkup::new(
        buttons
            .into_iter()
            .map(|(label, action)| vec![InlineKeyboardButton::callback(label, action.encode())]),
    )
}

pub fn providers_text(p: &ProviderSet) -> String {
    let names = |set: &BTreeSet<String>| {
        if set.is_empty() {
            EMPTY_LIST.to_string()
        } else {
            html_escape(&set.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
        }
    };
    format!(
        "<b>Where to Watch ({})</b>\nStreaming: {}\nRent: {}\nBuy: {}\n\nNote: Availability can change. Check in your apps.",
        html_escape(&p.region),
        names(&p.stream),
        names(&p.rent),
        names(&p.buy),
    )
}

pub fn trailer_text(url: Option<&str>) -> String {
    match url {
        Some(u) => format!("Trailer: {}", u),
        None => TRAILER_NOT_FOUND.to_string(),
    }
}

pub fn similar_text(items: &[SearchResult]) -> String {
    if items.is_empty() {
        return NO_SIMILAR.to_string();
    }
    let mut lines = vec!["<b>Similar titles:</b>".to_string()];
    lines.extend(bullets(items));
    lines.join("\n")
}

pub fn trending_text(t: &Trending) -> String {
    let section = |items: &[SearchResult]| {
        if items.is_empty() { EMPTY_LIST.to_string() } else { bullets(items).join("\n") }
    };
    format!(
        "<b>Trending Now</b>\n\n<b>Movies:</b>\n{}\n\n<b>Series:</b>\n{}",
        section(&t.movies),
        section(&t.series),
    )
}

pub fn archive_text(items: &[ArchiveItem]) -> String {
    if items.is_empty() {
        return ARCHIVE_EMPTY.to_string();
    }
    let blocks: Vec<String> = items
        .iter()
        .map(|it| {
            let title = if it.title.trim().is_empty() { UNTITLED } else { it.title.as_str() };
            let head = if it.year.is_empty() {
                format!("<b>{}</b>", html_escape(title))
            } else {
                format!("<b>{}</b> ({})", html_escape(title), html_escape(&it.year))
            };
            let links = it.links.iter().map(|l| html_escape(l)).collect::<Vec<_>>().join("\n");
            format!("{}\nLicense: {}\n{}", head, html_escape(&it.license_url), links)
        })
        .collect();
    format!("{}\n\n{}", blocks.join("\n\n"), ARCHIVE_LEGAL)
}

pub fn stats_text(known_chats: usize, admins: usize) -> String {
    format!("Known chats: {} | Admins: {}", known_chats, admins)
}

/* ====== Вспомогательные ====== */

fn bullets(items: &[SearchResult]) -> Vec<String> {
    items
        .iter()
        .take(PICKER_MAX)
        .map(|s| format!("• {}", html_escape(&one_line_title(&s.title, &s.year))))
        .collect()
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { s.chars().take(max).collect::<String>() + "…" }
}
