use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::redis_client::RedisClient;

// Кеш схемы зала для сеанса. Источник истины - БД, кеш только для чтения.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    seat_map_ttl: u64,
}

fn seat_map_key(screening_id: i64) -> String {
    format!("seatmap:{}", screening_id)
}

impl CacheService {
    pub fn new(redis: RedisClient, seat_map_ttl: u64) -> Self {
        Self { redis, seat_map_ttl }
    }

    // Получить готовый JSON схемы зала
    pub async fn get_seat_map(&self, screening_id: i64) -> Option<String> {
        let mut conn = self.redis.conn.clone();
        let cached: redis::RedisResult<Option<String>> = conn.get(seat_map_key(screening_id)).await;
        match cached {
            Ok(cached) => cached,
            Err(e) => {
                warn!("seat map cache read failed for screening {}: {:?}", screening_id, e);
                None
            }
        }
    }

    pub async fn save_seat_map(&self, screening_id: i64, json: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn
            .set_ex(seat_map_key(screening_id), json, self.seat_map_ttl)
            .await;
        if let Err(e) = result {
            warn!("seat map cache write failed for screening {}: {:?}", screening_id, e);
        }
    }

    // Инвалидировать кеш после продажи/отмены билета или изменения сеанса
    pub async fn invalidate_seat_maps(&self, screening_ids: &[i64]) {
        if screening_ids.is_empty() {
            return;
        }
        let keys: Vec<String> = screening_ids.iter().map(|id| seat_map_key(*id)).collect();
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn.del(keys).await;
        match result {
            Ok(()) => debug!("invalidated seat maps for screenings {:?}", screening_ids),
            Err(e) => warn!("failed to invalidate seat maps {:?}: {:?}", screening_ids, e),
        }
    }
}
