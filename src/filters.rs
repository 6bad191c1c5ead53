use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/* ====== Ошибки ввода ======
   Display — это готовый текст для повторного вопроса пользователю. */
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Неверный формат года, введи год или диапазон годов через дефис (например: 2020 или 2020-2021).")]
    YearFormat,
    #[error("Год начала диапазона должен быть не больше года окончания!")]
    YearOrder,
    #[error("Год или диапазон годов не может быть позже текущего года!")]
    YearInFuture,
    #[error("Пожалуйста, введи число от 1 до 10 или диапазон чисел через дефис (например: 7-10).")]
    RatingFormat,
    #[error("Рейтинг должен быть больше 0 и не больше 10.")]
    RatingOutOfRange,
    #[error("Нижняя граница диапазона не может быть больше верхней. Пожалуйста, введи корректный диапазон.")]
    RatingOrder,
    #[error("Не знаю такой страны. Введи год или выбери страну кнопкой.")]
    UnknownCountry,
    #[error("Выбери вариант кнопкой под сообщением 👆")]
    ExpectedChoice,
}

/* ====== Тип контента ====== */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilmType {
    Movie,
    TvSeries,
    Cartoon,
    AnimatedSeries,
    Anime,
}

impl FilmType {
    pub const ALL: [FilmType; 5] = [
        FilmType::Movie,
        FilmType::TvSeries,
        FilmType::AnimatedSeries,
        FilmType::Cartoon,
        FilmType::Anime,
    ];

    /// Значение, которое понимает API.
    pub fn wire(self) -> &'static str {
        match self {
            FilmType::Movie => "movie",
            FilmType::TvSeries => "tv-series",
            FilmType::Cartoon => "cartoon",
            FilmType::AnimatedSeries => "animated-series",
            FilmType::Anime => "anime",
        }
    }

    pub fn from_wire(wire: &str) -> Option<FilmType> {
        FilmType::ALL.into_iter().find(|t| t.wire() == wire)
    }

    pub fn label_ru(self) -> &'static str {
        match self {
            FilmType::Movie => "фильм",
            FilmType::TvSeries => "сериал",
            FilmType::Cartoon => "мультфильм",
            FilmType::AnimatedSeries => "мультсериал",
            FilmType::Anime => "аниме",
        }
    }
}

/// Перевод типа из ответа API; неизвестные типы показываем как есть.
pub fn film_type_label(wire: &str) -> &str {
    FilmType::from_wire(wire).map(FilmType::label_ru).unwrap_or(wire)
}

/* ====== Год ====== */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    Single(i32),
    Range(i32, i32),
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(19[0-9]{2}|20[0-2][0-9])(?:\s*-\s*(19[0-9]{2}|20[0-2][0-9]))?$")
        .expect("year regex")
});

/// Год 1900..=2029 или диапазон через дефис, не позже `current_year`.
pub fn parse_year(input: &str, current_year: i32) -> Result<YearFilter, InputError> {
    let caps = YEAR_RE.captures(input.trim()).ok_or(InputError::YearFormat)?;
    let start: i32 = caps[1].parse().map_err(|_| InputError::YearFormat)?;
    match caps.get(2) {
        None => {
            if start > current_year {
                return Err(InputError::YearInFuture);
            }
            Ok(YearFilter::Single(start))
        }
        Some(end) => {
            let end: i32 = end.as_str().parse().map_err(|_| InputError::YearFormat)?;
            if start > end {
                return Err(InputError::YearOrder);
            }
            if end > current_year {
                return Err(InputError::YearInFuture);
            }
            Ok(YearFilter::Range(start, end))
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::Single(y) => write!(f, "{y}"),
            YearFilter::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/* ====== Рейтинг ====== */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingFilter {
    Single(f32),
    Range(f32, f32),
}

static RATING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2}(?:[.,][0-9]+)?)(?:\s*-\s*([0-9]{1,2}(?:[.,][0-9]+)?))?$")
        .expect("rating regex")
});

fn rating_value(s: &str) -> Result<f32, InputError> {
    let v: f32 = s.replace(',', ".").parse().map_err(|_| InputError::RatingFormat)?;
    if v > 0.0 && v <= 10.0 {
        Ok(v)
    } else {
        Err(InputError::RatingOutOfRange)
    }
}

/// Число из (0, 10] или диапазон таких чисел через дефис.
pub fn parse_rating(input: &str) -> Result<RatingFilter, InputError> {
    let caps = RATING_RE.captures(input.trim()).ok_or(InputError::RatingFormat)?;
    let low = rating_value(&caps[1])?;
    match caps.get(2) {
        None => Ok(RatingFilter::Single(low)),
        Some(high) => {
            let high = rating_value(high.as_str())?;
            if low > high {
                return Err(InputError::RatingOrder);
            }
            Ok(RatingFilter::Range(low, high))
        }
    }
}

impl fmt::Display for RatingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingFilter::Single(v) => write!(f, "{v}"),
            RatingFilter::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/* ====== Контекст фильтров ====== */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterContext {
    pub kind: Option<FilmType>,
    pub genre: Option<String>,
    pub year: Option<YearFilter>,
    pub country: Option<String>,
    pub rating: Option<RatingFilter>,
}

impl FilterContext {
    /// Параметры запроса только для заданных фильтров.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(t) = self.kind {
            q.push(("type", t.wire().to_string()));
        }
        if let Some(g) = &self.genre {
            q.push(("genres.name", g.clone()));
        }
        if let Some(c) = &self.country {
            q.push(("countries.name", c.clone()));
        }
        if let Some(y) = self.year {
            q.push(("year", y.to_string()));
        }
        if let Some(r) = self.rating {
            q.push(("rating.kp", r.to_string()));
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i32 = 2025;

    #[test]
    fn accepts_every_year_up_to_now() {
        for y in 1900..=NOW {
            assert_eq!(parse_year(&y.to_string(), NOW), Ok(YearFilter::Single(y)));
        }
    }

    #[test]
    fn rejects_years_outside_pattern() {
        for bad in ["1899", "2030", "20", "abc", "2020-", "-2020", "2020-2021-2022", "20201"] {
            assert_eq!(parse_year(bad, NOW), Err(InputError::YearFormat), "{bad}");
        }
    }

    #[test]
    fn rejects_future_years() {
        assert_eq!(parse_year("2026", NOW), Err(InputError::YearInFuture));
        assert_eq!(parse_year("2020-2027", NOW), Err(InputError::YearInFuture));
    }

    #[test]
    fn rejects_reversed_year_ranges() {
        for (a, b) in [(2021, 2020), (2000, 1999), (2025, 1900)] {
            assert_eq!(parse_year(&format!("{a}-{b}"), NOW), Err(InputError::YearOrder));
        }
    }

    #[test]
    fn normalises_year_range() {
        let y = parse_year(" 2020 - 2022 ", NOW).unwrap();
        assert_eq!(y, YearFilter::Range(2020, 2022));
        assert_eq!(y.to_string(), "2020-2022");
    }

    #[test]
    fn rating_ranges_follow_order() {
        let values = [0.5_f32, 1.0, 5.0, 7.0, 7.5, 10.0];
        for &a in &values {
            for &b in &values {
                let res = parse_rating(&format!("{a}-{b}"));
                if a <= b {
                    assert_eq!(res, Ok(RatingFilter::Range(a, b)), "{a}-{b}");
                } else {
                    assert_eq!(res, Err(InputError::RatingOrder), "{a}-{b}");
                }
            }
        }
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(parse_rating("0"), Err(InputError::RatingOutOfRange));
        assert_eq!(parse_rating("0-10"), Err(InputError::RatingOutOfRange));
        assert_eq!(parse_rating("11"), Err(InputError::RatingOutOfRange));
        assert_eq!(parse_rating("10"), Ok(RatingFilter::Single(10.0)));
        assert_eq!(parse_rating("7,5"), Ok(RatingFilter::Single(7.5)));
        assert_eq!(parse_rating("seven"), Err(InputError::RatingFormat));
    }

    #[test]
    fn rating_wire_form() {
        assert_eq!(parse_rating("7-10").unwrap().to_string(), "7-10");
        assert_eq!(parse_rating("7.5").unwrap().to_string(), "7.5");
    }

    #[test]
    fn query_omits_unset_filters() {
        assert!(FilterContext::default().to_query().is_empty());

        let ctx = FilterContext {
            country: Some("Франция".into()),
            ..Default::default()
        };
        assert_eq!(ctx.to_query(), vec![("countries.name", "Франция".to_string())]);

        let ctx = FilterContext {
            kind: Some(FilmType::Anime),
            genre: Some("драма".into()),
            year: Some(YearFilter::Single(2001)),
            rating: Some(RatingFilter::Range(6.0, 9.5)),
            ..Default::default()
        };
        let keys: Vec<_> = ctx.to_query().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["type", "genres.name", "year", "rating.kp"]);
    }

    #[test]
    fn type_labels() {
        assert_eq!(film_type_label("tv-series"), "сериал");
        assert_eq!(film_type_label("mini-series"), "mini-series");
        assert_eq!(FilmType::from_wire("anime"), Some(FilmType::Anime));
        assert_eq!(FilmType::from_wire("Anime"), None);
        for t in FilmType::ALL {
            assert_eq!(FilmType::from_wire(t.wire()), Some(t));
        }
    }
}
