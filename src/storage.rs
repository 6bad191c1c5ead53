use crate::dialogue::Session;
use crate::filters::FilterContext;
use moka::future::Cache;
use std::time::Duration;

const MAX_CHATS: u64 = 10_000;
/// moka не принимает time-to-idle больше 1000 лет; `last` живёт в 4 раза дольше.
const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Сессии диалогов по chat_id.
///
/// `active` — незавершённый диалог; удаляется при завершении, отмене
/// или простое дольше `ttl`. `last` — фильтры последнего завершённого
/// запроса, нужны для кнопки «Еще один».
#[derive(Clone)]
pub struct SessionStore {
    active: Cache<i64, Session>,
    last: Cache<i64, FilterContext>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = ttl.min(MAX_TTL);
        Self {
            active: Cache::builder().max_capacity(MAX_CHATS).time_to_idle(ttl).build(),
            last: Cache::builder().max_capacity(MAX_CHATS).time_to_idle(ttl * 4).build(),
        }
    }

    /// Новый диалог; незавершённый предыдущий выбрасываем.
    pub async fn begin(&self, chat_id: i64, session: Session) {
        self.active.insert(chat_id, session).await;
    }

    pub async fn get(&self, chat_id: i64) -> Option<Session> {
        self.active.get(&chat_id).await
    }

    pub async fn put(&self, chat_id: i64, session: Session) {
        self.active.insert(chat_id, session).await;
    }

    /// Диалог закончен: сессию удаляем, фильтры запоминаем для повтора.
    pub async fn complete(&self, chat_id: i64, filters: FilterContext) {
        self.active.invalidate(&chat_id).await;
        self.last.insert(chat_id, filters).await;
    }

    pub async fn cancel(&self, chat_id: i64) {
        self.active.invalidate(&chat_id).await;
        self.last.invalidate(&chat_id).await;
    }

    pub async fn last_query(&self, chat_id: i64) -> Option<FilterContext> {
        self.last.get(&chat_id).await
    }
}
