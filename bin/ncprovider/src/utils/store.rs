use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use futures::StreamExt;

use ncp_error::io::{FromIo, IoError, IoResult};

use crate::models::{KeyEventStream, KeyspaceNotification, LeaseStore};

const POOL_SIZE: usize = 8;

/// Lease store backed by redis
pub struct RedisStore {
  pool: Pool,
  client: redis::Client,
  db: i64,
}

fn connection_error(err: impl std::fmt::Display) -> IoError {
  IoError::new(
    "RedisStore",
    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, err.to_string()),
  )
}

/// Client of a redis url with the database index it selects
fn open(url: &str) -> IoResult<(redis::Client, i64)> {
  let client = redis::Client::open(url)
    .map_err(|err| err.map_err_context(|| format!("Redis url {url}")))?;
  let db = client.get_connection_info().redis.db;
  Ok((client, db))
}

impl RedisStore {
  /// Connect to `url` and enable expiration notifications
  pub async fn new(url: &str) -> IoResult<Self> {
    let (client, db) = open(url)?;
    let pool = Config::from_url(url)
      .builder()
      .map_err(connection_error)?
      .max_size(POOL_SIZE)
      .runtime(Runtime::Tokio1)
      .build()
      .map_err(connection_error)?;
    let store = Self { pool, client, db };
    let mut conn = store.conn().await?;
    redis::cmd("PING")
      .query_async::<String>(&mut *conn)
      .await
      .map_err(|err| err.map_err_context(|| "Redis ping"))?;
    if let Err(err) = redis::cmd("CONFIG")
      .arg("SET")
      .arg("notify-keyspace-events")
      .arg("Ex")
      .query_async::<()>(&mut *conn)
      .await
    {
      log::warn!("store::new: unable to enable expiration events: {err}");
    }
    log::info!("store::new: connected to redis db {db}");
    Ok(store)
  }

  async fn conn(&self) -> IoResult<Connection> {
    self.pool.get().await.map_err(connection_error)
  }
}

#[async_trait(?Send)]
impl LeaseStore for RedisStore {
  fn db(&self) -> i64 {
    self.db
  }

  async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> IoResult<()> {
    let mut conn = self.conn().await?;
    redis::cmd("SET")
      .arg(key)
      .arg(value)
      .arg("EX")
      .arg(ttl)
      .query_async::<()>(&mut *conn)
      .await
      .map_err(|err| err.map_err_context(|| format!("SET {key}")))?;
    Ok(())
  }

  async fn hset(&self, key: &str, fields: &[(&str, String)]) -> IoResult<()> {
    let mut conn = self.conn().await?;
    let mut cmd = redis::cmd("HSET");
    cmd.arg(key);
    for (field, value) in fields {
      cmd.arg(*field).arg(value);
    }
    cmd
      .query_async::<()>(&mut *conn)
      .await
      .map_err(|err| err.map_err_context(|| format!("HSET {key}")))?;
    Ok(())
  }

  async fn hmget(
    &self,
    key: &str,
    fields: &[&str],
  ) -> IoResult<Vec<Option<String>>> {
    let mut conn = self.conn().await?;
    let values = redis::cmd("HMGET")
      .arg(key)
      .arg(fields)
      .query_async::<Vec<Option<String>>>(&mut *conn)
      .await
      .map_err(|err| err.map_err_context(|| format!("HMGET {key}")))?;
    Ok(values)
  }

  async fn del(&self, key: &str) -> IoResult<()> {
    let mut conn = self.conn().await?;
    redis::cmd("DEL")
      .arg(key)
      .query_async::<i64>(&mut *conn)
      .await
      .map_err(|err| err.map_err_context(|| format!("DEL {key}")))?;
    Ok(())
  }

  async fn subscribe_expired(&self) -> IoResult<KeyEventStream> {
    let channel = format!("__keyevent@{}__:expired", self.db);
    let mut pubsub = self
      .client
      .get_async_pubsub()
      .await
      .map_err(|err| err.map_err_context(|| "Redis pubsub"))?;
    pubsub
      .psubscribe(&channel)
      .await
      .map_err(|err| err.map_err_context(|| format!("PSUBSCRIBE {channel}")))?;
    log::info!("store::subscribe_expired: listening on {channel}");
    let stream = pubsub.into_on_message().map(|msg| -> IoResult<_> {
      let payload = msg
        .get_payload::<String>()
        .map_err(|err| err.map_err_context(|| "Redis message"))?;
      Ok(KeyspaceNotification {
        channel: msg.get_channel_name().to_owned(),
        payload,
      })
    });
    Ok(Box::pin(stream))
  }
}
