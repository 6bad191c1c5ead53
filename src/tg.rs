use crate::dialogue::{
    Input, Outcome, Prompt, Session, COUNTRIES, COUNTRY_PREFIX, GENRES, GENRE_PREFIX, SKIP_GENRE,
    SKIP_YEAR_OR_COUNTRY, TYPE_PREFIX,
};
use crate::filters::{current_year, FilmType, FilterContext};
use crate::kinopoisk::KinopoiskClient;
use crate::render::{movie_card, Card};
use crate::storage::SessionStore;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{
        CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
        KeyboardMarkup, KeyboardRemove, ParseMode,
    },
    utils::command::BotCommands,
};

/* ====== Кнопки меню после выдачи фильма ====== */
const MENU_ANOTHER: &str = "Еще один";
const MENU_RESTART: &str = "Начать заново";
const MENU_HOME: &str = "Главное меню";

const HELP_TEXT: &str = "\
<b>/start</b> - <em>Запуск бота</em>
<b>/help</b> - <em>Список команд</em>
<b>/findfilm</b> - <em>Найти фильм или сериал исходя из ваших предпочтений</em>
<b>/randomfilm</b> - <em>Абсолютно рандомный фильм</em>
<b>/cancel</b> - <em>Прервать подбор и вернуться в меню</em>";

/// Всё, что нужно обработчикам; прокидывается через dptree.
#[derive(Clone)]
pub struct Services {
    pub api: KinopoiskClient,
    pub sessions: SessionStore,
    pub operator_chat: ChatId,
}

/* ====== Команды ====== */
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Команды:")]
enum Command {
    #[command(description = "запуск бота")]
    Start,
    #[command(description = "список команд")]
    Help,
    #[command(description = "подобрать фильм или сериал")]
    FindFilm,
    #[command(description = "абсолютно случайный фильм")]
    RandomFilm,
    #[command(description = "вернуться в главное меню")]
    Cancel,
}

pub async fn run(bot: Bot, services: Services) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(on_command))
                .branch(dptree::endpoint(on_text)),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![services])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(bot: Bot, msg: Message, cmd: Command, svc: Services) -> ResponseResult<()> {
    let chat = msg.chat.id;
    match cmd {
        Command::Start => {
            let name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or("друг");
            tracing::info!(chat_id = chat.0, "bot started by {name}");
            bot.send_message(
                chat,
                format!(
                    "❤️ Спасибо, что включил меня, {name}!\n\
                     ❔ Чтобы узнать, что я умею, воспользуйся командой /help\n\
                     ⬇ Для начала воспользуйся кнопкой меню."
                ),
            )
            .await?;
        }
        Command::Help => {
            bot.send_message(chat, HELP_TEXT).parse_mode(ParseMode::Html).await?;
        }
        Command::FindFilm => start_search(&bot, chat, &svc).await?,
        Command::RandomFilm => send_random(&bot, chat, &svc, &FilterContext::default()).await?,
        Command::Cancel => back_to_menu(&bot, chat, &svc).await?,
    }
    Ok(())
}

/* ====== Текст: кнопки меню или ответ на текущий вопрос ====== */
async fn on_text(bot: Bot, msg: Message, svc: Services) -> ResponseResult<()> {
    let Some(text) = msg.text() else { return Ok(()); };
    let chat = msg.chat.id;
    match text.trim() {
        MENU_ANOTHER => return repeat_last(&bot, chat, &svc).await,
        MENU_RESTART => return start_search(&bot, chat, &svc).await,
        MENU_HOME => return back_to_menu(&bot, chat, &svc).await,
        _ => {}
    }

    let Some(session) = svc.sessions.get(chat.0).await else {
        tracing::debug!(chat_id = chat.0, "text outside of dialogue ignored");
        return Ok(());
    };
    tracing::info!(chat_id = chat.0, stage = ?session.stage, input = text, "user answered");
    let outcome = session.advance(Input::Text(text), current_year());
    apply_outcome(&bot, chat, &svc, outcome).await
}

/* ====== Callback-кнопки ======
   type:<тип>, genre:<жанр>, genre:skip, country:<страна>, yc:skip */
async fn on_callback(bot: Bot, q: CallbackQuery, svc: Services) -> ResponseResult<()> {
    let Some(data) = q.data.clone() else { return Ok(()); };
    let Some(chat) = q.message.as_ref().map(|m| m.chat().id) else { return Ok(()); };

    let Some(session) = svc.sessions.get(chat.0).await else {
        answer_cb(&bot, &q, "Подбор устарел, начни заново: /findfilm").await?;
        return Ok(());
    };
    tracing::info!(chat_id = chat.0, stage = ?session.stage, choice = %data, "user chose");
    let outcome = session.advance(Input::Choice(&data), current_year());
    bot.answer_callback_query(q.id.clone()).await?;
    apply_outcome(&bot, chat, &svc, outcome).await
}

async fn apply_outcome(bot: &Bot, chat: ChatId, svc: &Services, outcome: Outcome) -> ResponseResult<()> {
    match outcome {
        Outcome::Continue(session, prompt) => {
            svc.sessions.put(chat.0, session).await;
            send_prompt(bot, chat, prompt).await?;
        }
        Outcome::Retry(err) => {
            bot.send_message(chat, err.to_string()).await?;
        }
        Outcome::Ignored => {}
        Outcome::Complete(filters) => {
            svc.sessions.complete(chat.0, filters.clone()).await;
            send_random(bot, chat, svc, &filters).await?;
            send_follow_up(bot, chat).await?;
        }
    }
    Ok(())
}

async fn start_search(bot: &Bot, chat: ChatId, svc: &Services) -> ResponseResult<()> {
    tracing::info!(chat_id = chat.0, "film search started");
    let (session, prompt) = Session::start();
    svc.sessions.begin(chat.0, session).await;
    send_prompt(bot, chat, prompt).await
}

async fn repeat_last(bot: &Bot, chat: ChatId, svc: &Services) -> ResponseResult<()> {
    let Some(filters) = svc.sessions.last_query(chat.0).await else {
        bot.send_message(chat, "Сначала подбери фильм: /findfilm").await?;
        return Ok(());
    };
    send_random(bot, chat, svc, &filters).await?;
    send_follow_up(bot, chat).await
}

async fn back_to_menu(bot: &Bot, chat: ChatId, svc: &Services) -> ResponseResult<()> {
    svc.sessions.cancel(chat.0).await;
    tracing::info!(chat_id = chat.0, "dialogue cancelled");
    bot.send_message(chat, "Ты вернулся в главное меню")
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

async fn send_prompt(bot: &Bot, chat: ChatId, prompt: Prompt) -> ResponseResult<()> {
    match prompt {
        Prompt::ChooseType => {
            bot.send_message(
                chat,
                "Сейчас подберем тебе что-то интересное 😎\nДавай для начала выберем, что ты хочешь посмотреть:",
            )
            .reply_markup(keyboard_types())
            .await?;
        }
        Prompt::ChooseGenre => {
            bot.send_message(chat, "Отлично, теперь выбери жанр:")
                .reply_markup(keyboard_genres())
                .await?;
        }
        Prompt::EnterYearOrCountry => {
            bot.send_message(
                chat,
                "Теперь введи год выпуска (например: 2020 или 2020-2024) или выбери страну:",
            )
            .reply_markup(keyboard_countries())
            .await?;
        }
        Prompt::EnterRating => {
            bot.send_message(
                chat,
                "Давай выберем рейтинг, введи число или диапазон чисел через дефис (например: 7-10).",
            )
            .await?;
        }
    }
    Ok(())
}

/* ====== Запрос к API и выдача ====== */
async fn send_random(bot: &Bot, chat: ChatId, svc: &Services, filters: &FilterContext) -> ResponseResult<()> {
    match svc.api.random_movie(filters).await {
        Ok(Some(movie)) => {
            tracing::info!(chat_id = chat.0, ?filters, movie_id = ?movie.id, "movie found");
            send_card(bot, chat, movie_card(&movie)).await?;
        }
        Ok(None) => {
            tracing::warn!(chat_id = chat.0, ?filters, "no movies for filters");
            bot.send_message(chat, "К сожалению, фильмов с такими параметрами не найдено.").await?;
        }
        Err(e) => {
            tracing::error!(chat_id = chat.0, ?filters, error = %e, "kinopoisk request failed");
            bot.send_message(chat, "Не удалось найти фильм, попробуй ещё раз.").await?;
            report_to_operator(bot, svc.operator_chat, chat, &e).await;
        }
    }
    Ok(())
}

/// Постер отдаём ссылкой; если Telegram не смог его скачать — шлём текстом.
async fn send_card(bot: &Bot, chat: ChatId, card: Card) -> ResponseResult<()> {
    if let Card::Photo { url, caption } = &card {
        match url.parse::<reqwest::Url>() {
            Ok(u) => {
                let sent = bot
                    .send_photo(chat, InputFile::url(u))
                    .caption(caption.clone())
                    .parse_mode(ParseMode::Html)
                    .await;
                match sent {
                    Ok(_) => return Ok(()),
                    Err(e) => tracing::warn!(chat_id = chat.0, %url, error = %e, "poster not sent"),
                }
            }
            Err(e) => tracing::warn!(chat_id = chat.0, %url, error = %e, "bad poster url"),
        }
    }
    bot.send_message(chat, card.text()).parse_mode(ParseMode::Html).await?;
    Ok(())
}

async fn send_follow_up(bot: &Bot, chat: ChatId) -> ResponseResult<()> {
    bot.send_message(chat, "Если не понравился, всегда можешь повторить свой запрос 😊")
        .reply_markup(keyboard_menu())
        .await?;
    Ok(())
}

async fn report_to_operator(bot: &Bot, operator: ChatId, chat: ChatId, err: &crate::kinopoisk::ApiError) {
    if operator == chat {
        return;
    }
    let text = format!("⚠️ Ошибка API для чата {}: {err}", chat.0);
    if let Err(e) = bot.send_message(operator, text).await {
        tracing::warn!(error = %e, "failed to notify operator chat");
    }
}

async fn answer_cb(bot: &Bot, q: &CallbackQuery, text: &str) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(false)
        .await?;
    Ok(())
}

/* ====== Клавиатуры ====== */

fn type_button_label(t: FilmType) -> &'static str {
    match t {
        FilmType::Movie => "Фильм 🎥",
        FilmType::TvSeries => "Сериал 📺",
        FilmType::AnimatedSeries => "Мультсериал 👧🏻",
        FilmType::Cartoon => "Мультфильм 👶",
        FilmType::Anime => "Аниме 🍜",
    }
}

fn genre_emoji(genre: &str) -> &'static str {
    match genre {
        "комедия" => "😂",
        "боевик" => "🔫",
        "драма" => "😢",
        "ужасы" => "😱",
        "детектив" => "🕵️‍♂️",
        "фантастика" => "👽",
        "вестерн" => "🤠",
        "военный" => "🎖️",
        "фэнтези" => "🧙‍♂️",
        "история" => "🏰",
        "мелодрама" => "❤️",
        "криминал" => "🚔",
        _ => "🎬",
    }
}

fn keyboard_types() -> InlineKeyboardMarkup {
    let rows = FilmType::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|t| InlineKeyboardButton::callback(type_button_label(*t), format!("{TYPE_PREFIX}{}", t.wire())))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

fn keyboard_genres() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = GENRES
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|g| {
                    InlineKeyboardButton::callback(
                        format!("{} {}", capitalize(g), genre_emoji(g)),
                        format!("{GENRE_PREFIX}{g}"),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("Пропустить ⏩", SKIP_GENRE)]);
    InlineKeyboardMarkup::new(rows)
}

fn keyboard_countries() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = COUNTRIES
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|c| InlineKeyboardButton::callback(*c, format!("{COUNTRY_PREFIX}{c}")))
                .collect()
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("Пропустить ⏩", SKIP_YEAR_OR_COUNTRY)]);
    InlineKeyboardMarkup::new(rows)
}

fn keyboard_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(MENU_ANOTHER),
        KeyboardButton::new(MENU_RESTART),
        KeyboardButton::new(MENU_HOME),
    ]])
    .resize_keyboard()
}

/* ====== Вспомогательные ====== */

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callbacks(kb: &InlineKeyboardMarkup) -> Vec<String> {
        kb.inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    fn at_stage(choices: &[&str]) -> Session {
        let (mut s, _) = Session::start();
        for c in choices {
            match s.advance(Input::Choice(c), 2025) {
                Outcome::Continue(next, _) => s = next,
                other => panic!("{c}: {other:?}"),
            }
        }
        s
    }

    #[test]
    fn every_button_is_understood_by_dialogue() {
        for data in callbacks(&keyboard_types()) {
            assert!(matches!(at_stage(&[]).advance(Input::Choice(&data), 2025), Outcome::Continue(..)), "{data}");
        }
        for data in callbacks(&keyboard_genres()) {
            let s = at_stage(&["type:movie"]);
            assert!(matches!(s.advance(Input::Choice(&data), 2025), Outcome::Continue(..)), "{data}");
        }
        for data in callbacks(&keyboard_countries()) {
            let s = at_stage(&["type:movie", SKIP_GENRE]);
            assert!(matches!(s.advance(Input::Choice(&data), 2025), Outcome::Continue(..)), "{data}");
        }
    }

    #[test]
    fn callback_data_fits_telegram_limit() {
        for kb in [keyboard_types(), keyboard_genres(), keyboard_countries()] {
            for data in callbacks(&kb) {
                assert!(data.len() <= 64, "{data}");
            }
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/findfilm", "bot").unwrap(), Command::FindFilm);
        assert_eq!(Command::parse("/randomfilm", "bot").unwrap(), Command::RandomFilm);
        assert_eq!(Command::parse("/cancel@bot", "bot").unwrap(), Command::Cancel);
        assert!(Command::parse("/vote", "bot").is_err());
    }

    #[test]
    fn capitalizes_cyrillic() {
        assert_eq!(capitalize("драма"), "Драма");
        assert_eq!(capitalize(""), "");
    }
}
