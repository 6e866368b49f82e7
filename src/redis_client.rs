use redis::{aio::MultiplexedConnection, Client};
use tracing::info;

// Одно мультиплексированное соединение на процесс, клонируется на каждый запрос
#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    /// Opens the connection and checks it with PING so a bad REDIS_URL fails at startup.
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_tokio_connection().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis connected ({})", pong);

        Ok(RedisClient { conn })
    }
}
