use crate::filters::film_type_label;
use crate::kinopoisk::Movie;
use unicode_segmentation::UnicodeSegmentation;

/// Лимиты Telegram (подпись к фото и обычное сообщение).
pub const CAPTION_LIMIT: usize = 1024;
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Card {
    Photo { url: String, caption: String },
    Text(String),
}

impl Card {
    pub fn text(&self) -> &str {
        match self {
            Card::Photo { caption, .. } => caption,
            Card::Text(t) => t,
        }
    }
}

/// Карточка фильма в HTML; отсутствующие поля просто не выводим.
pub fn movie_card(m: &Movie) -> Card {
    let poster = m
        .poster
        .as_ref()
        .and_then(|p| p.preview_url.clone().or_else(|| p.url.clone()))
        .filter(|u| !u.trim().is_empty());
    let limit = if poster.is_some() { CAPTION_LIMIT } else { MESSAGE_LIMIT };
    let text = movie_text(m, limit);
    match poster {
        Some(url) => Card::Photo { url, caption: text },
        None => Card::Text(text),
    }
}

fn movie_text(m: &Movie, limit: usize) -> String {
    let title = m
        .name
        .as_deref()
        .or(m.alternative_name.as_deref())
        .unwrap_or("Без названия");
    let rating = m.rating.as_ref();

    let mut head = format!("<b>{}</b>\n\n", html_escape(title));
    let ratings = [
        rating_line(
            "Кинопоиск",
            rating.and_then(|r| r.kp),
            m.id.map(|id| format!("https://www.kinopoisk.ru/film/{id}")),
        ),
        rating_line(
            "IMDB",
            rating.and_then(|r| r.imdb),
            m.external_id
                .as_ref()
                .and_then(|e| e.imdb.as_deref())
                .filter(|id| !id.is_empty())
                .map(|id| format!("https://www.imdb.com/title/{}", html_escape(id))),
        ),
    ];
    let ratings: String = ratings.into_iter().flatten().collect();
    if !ratings.is_empty() {
        head.push_str(&ratings);
        head.push('\n');
    }

    if let Some(kind) = m.kind.as_deref() {
        head.push_str(&format!("<i>Тип:</i> {}\n", html_escape(film_type_label(kind))));
    }
    let genres = names(m.genres.as_deref());
    if !genres.is_empty() {
        head.push_str(&format!("<i>Жанр:</i> {}\n", html_escape(&genres)));
    }
    let countries = names(m.countries.as_deref());
    if !countries.is_empty() {
        head.push_str(&format!("<i>Страна:</i> {}\n", html_escape(&countries)));
    }
    if let Some(len) = m.movie_length {
        head.push_str(&format!("<i>Продолжительность:</i> {len} мин\n"));
    } else if let Some(len) = m.series_length {
        head.push_str(&format!("<i>Длительность серии:</i> {len} мин\n"));
    }
    if let Some(year) = m.year {
        head.push_str(&format!("<i>Год:</i> {year}\n"));
    }

    let description = m
        .description
        .as_deref()
        .or(m.short_description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty());
    match description {
        Some(d) => {
            let budget = limit.saturating_sub(head.chars().count() + 1);
            format!("{head}\n{}", clip_escaped(d, budget))
        }
        None => head.trim_end().to_string(),
    }
}

/// Нулевой рейтинг API отдаёт для фильмов без оценок; такую строку не выводим.
fn rating_line(source: &str, value: Option<f64>, link: Option<String>) -> Option<String> {
    let value = value.filter(|v| *v > 0.0)?;
    Some(match link {
        Some(href) => format!("<a href=\"{href}\">{source}: {value:.1}</a>\n"),
        None => format!("{source}: {value:.1}\n"),
    })
}

fn names(items: Option<&[crate::kinopoisk::Named]>) -> String {
    items
        .unwrap_or_default()
        .iter()
        .filter_map(|g| g.name.as_deref())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Экранирует и режет по графемам так, чтобы результат (с «…») влез в `max` символов.
fn clip_escaped(s: &str, max: usize) -> String {
    let full = html_escape(s);
    if full.chars().count() <= max {
        return full;
    }
    let mut out = String::new();
    let mut used = 0;
    for g in s.graphemes(true) {
        let piece = html_escape(g);
        let n = piece.chars().count();
        if used + n + 1 > max {
            break;
        }
        out.push_str(&piece);
        used += n;
    }
    out.push('…');
    out
}
