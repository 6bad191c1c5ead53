use crate::filters::{parse_rating, parse_year, FilmType, FilterContext, InputError};

/* ====== Диалог подбора фильма ======
   Тип → жанр → год или страна → рейтинг → запрос к API.
   Модуль ничего не знает о Telegram: на вход — выбор кнопкой или текст,
   на выход — следующий вопрос, ошибка ввода или готовые фильтры. */

pub const GENRES: [&str; 12] = [
    "комедия", "боевик", "драма",
    "ужасы", "детектив", "фантастика",
    "вестерн", "военный", "фэнтези",
    "история", "мелодрама", "криминал",
];

pub const COUNTRIES: [&str; 12] = [
    "США", "Россия", "СССР",
    "Великобритания", "Франция", "Германия",
    "Италия", "Испания", "Япония",
    "Южная Корея", "Индия", "Канада",
];

/// Префиксы callback-данных кнопок.
pub const TYPE_PREFIX: &str = "type:";
pub const GENRE_PREFIX: &str = "genre:";
pub const COUNTRY_PREFIX: &str = "country:";
pub const SKIP_GENRE: &str = "genre:skip";
pub const SKIP_YEAR_OR_COUNTRY: &str = "yc:skip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingType,
    AwaitingGenre,
    AwaitingYearOrCountry,
    AwaitingRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// данные нажатой inline-кнопки
    Choice(&'a str),
    Text(&'a str),
}

/// Что спросить у пользователя дальше.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    ChooseType,
    ChooseGenre,
    EnterYearOrCountry,
    EnterRating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue(Session, Prompt),
    /// ввод не прошёл проверку, остаёмся на том же шаге
    Retry(InputError),
    /// кнопка от другого шага (старое сообщение) — молча игнорируем
    Ignored,
    Complete(FilterContext),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub stage: Stage,
    pub filters: FilterContext,
}

impl Session {
    pub fn start() -> (Self, Prompt) {
        let s = Session { stage: Stage::AwaitingType, filters: FilterContext::default() };
        (s, Prompt::ChooseType)
    }

    pub fn advance(self, input: Input<'_>, current_year: i32) -> Outcome {
        let Session { stage, mut filters } = self;
        match (stage, input) {
            (Stage::AwaitingType, Input::Choice(data)) => {
                let Some(kind) = data.strip_prefix(TYPE_PREFIX).and_then(FilmType::from_wire) else {
                    return Outcome::Ignored;
                };
                filters.kind = Some(kind);
                Outcome::Continue(Session { stage: Stage::AwaitingGenre, filters }, Prompt::ChooseGenre)
            }
            (Stage::AwaitingGenre, Input::Choice(data)) => {
                if data == SKIP_GENRE {
                    filters.genre = None;
                } else {
                    let Some(genre) = data.strip_prefix(GENRE_PREFIX).filter(|g| GENRES.contains(g)) else {
                        return Outcome::Ignored;
                    };
                    filters.genre = Some(genre.to_string());
                }
                Outcome::Continue(
                    Session { stage: Stage::AwaitingYearOrCountry, filters },
                    Prompt::EnterYearOrCountry,
                )
            }
            (Stage::AwaitingType | Stage::AwaitingGenre, Input::Text(_)) => {
                Outcome::Retry(InputError::ExpectedChoice)
            }
            (Stage::AwaitingYearOrCountry, Input::Choice(data)) => {
                if data != SKIP_YEAR_OR_COUNTRY {
                    let Some(country) = data.strip_prefix(COUNTRY_PREFIX).and_then(known_country) else {
                        return Outcome::Ignored;
                    };
                    filters.country = Some(country.to_string());
                }
                Outcome::Continue(Session { stage: Stage::AwaitingRating, filters }, Prompt::EnterRating)
            }
            (Stage::AwaitingYearOrCountry, Input::Text(text)) => {
                let text = text.trim();
                if looks_like_year(text) {
                    match parse_year(text, current_year) {
                        Ok(year) => filters.year = Some(year),
                        Err(e) => return Outcome::Retry(e),
                    }
                } else {
                    let Some(country) = known_country(text) else {
                        return Outcome::Retry(InputError::UnknownCountry);
                    };
                    filters.country = Some(country.to_string());
                }
                Outcome::Continue(Session { stage: Stage::AwaitingRating, filters }, Prompt::EnterRating)
            }
            (Stage::AwaitingRating, Input::Text(text)) => match parse_rating(text) {
                Ok(rating) => {
                    filters.rating = Some(rating);
                    Outcome::Complete(filters)
                }
                Err(e) => Outcome::Retry(e),
            },
            (Stage::AwaitingRating, Input::Choice(_)) => Outcome::Ignored,
        }
    }
}

fn looks_like_year(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit())
}

/// Страна из списка без учёта регистра, в каноническом написании.
fn known_country(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    COUNTRIES.into_iter().find(|c| c.to_lowercase() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{RatingFilter, YearFilter};

    const NOW: i32 = 2025;

    fn step(s: Session, input: Input<'_>) -> Session {
        match s.advance(input, NOW) {
            Outcome::Continue(next, _) => next,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn full_walk_collects_every_filter() {
        let (s, prompt) = Session::start();
        assert_eq!(prompt, Prompt::ChooseType);
        let s = step(s, Input::Choice("type:tv-series"));
        assert_eq!(s.stage, Stage::AwaitingGenre);
        let s = step(s, Input::Choice("genre:драма"));
        assert_eq!(s.stage, Stage::AwaitingYearOrCountry);
        let s = step(s, Input::Text("1999-2005"));
        assert_eq!(s.stage, Stage::AwaitingRating);

        let Outcome::Complete(f) = s.advance(Input::Text("8"), NOW) else { panic!("not complete") };
        assert_eq!(f.kind, Some(FilmType::TvSeries));
        assert_eq!(f.genre.as_deref(), Some("драма"));
        assert_eq!(f.year, Some(YearFilter::Range(1999, 2005)));
        assert_eq!(f.country, None);
        assert_eq!(f.rating, Some(RatingFilter::Single(8.0)));
    }

    #[test]
    fn skips_leave_fields_absent() {
        let (s, _) = Session::start();
        let s = step(s, Input::Choice("type:anime"));
        let s = step(s, Input::Choice(SKIP_GENRE));
        let s = step(s, Input::Choice(SKIP_YEAR_OR_COUNTRY));
        assert_eq!(s.filters.genre, None);
        assert_eq!(s.filters.year, None);
        assert_eq!(s.filters.country, None);
    }

    #[test]
    fn country_by_button_or_text() {
        let (s, _) = Session::start();
        let s = step(s, Input::Choice("type:movie"));
        let s = step(s, Input::Choice(SKIP_GENRE));

        let by_button = step(s.clone(), Input::Choice("country:Япония"));
        assert_eq!(by_button.filters.country.as_deref(), Some("Япония"));

        let by_text = step(s.clone(), Input::Text("  южная корея "));
        assert_eq!(by_text.filters.country.as_deref(), Some("Южная Корея"));

        assert_eq!(s.advance(Input::Text("Атлантида"), NOW), Outcome::Retry(InputError::UnknownCountry));
    }

    #[test]
    fn invalid_input_keeps_stage() {
        let (s, _) = Session::start();
        assert_eq!(s.clone().advance(Input::Text("фильм"), NOW), Outcome::Retry(InputError::ExpectedChoice));

        let s = step(s, Input::Choice("type:movie"));
        let s = step(s, Input::Choice("genre:ужасы"));
        assert_eq!(s.clone().advance(Input::Text("2022-2020"), NOW), Outcome::Retry(InputError::YearOrder));
        assert_eq!(s.clone().advance(Input::Text("3000"), NOW), Outcome::Retry(InputError::YearFormat));

        let s = step(s, Input::Text("2010"));
        assert_eq!(s.clone().advance(Input::Text("9-7"), NOW), Outcome::Retry(InputError::RatingOrder));
        assert_eq!(s.advance(Input::Text("abc"), NOW), Outcome::Retry(InputError::RatingFormat));
    }

    #[test]
    fn stale_buttons_are_ignored() {
        let (s, _) = Session::start();
        assert_eq!(s.clone().advance(Input::Choice("genre:драма"), NOW), Outcome::Ignored);
        assert_eq!(s.clone().advance(Input::Choice("type:documentary"), NOW), Outcome::Ignored);

        let s = step(s, Input::Choice("type:movie"));
        assert_eq!(s.clone().advance(Input::Choice("genre:опера"), NOW), Outcome::Ignored);

        let s = step(s, Input::Choice(SKIP_GENRE));
        let s = step(s, Input::Text("2000"));
        assert_eq!(s.advance(Input::Choice("type:movie"), NOW), Outcome::Ignored);
    }
}
