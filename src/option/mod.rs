//! トランスポートの構築時に指定するオプションです。
//!
//! コーデック自身が解釈するのは `marshaler` だけで、それ以外の値はトランスポートにそのまま引き渡されます。

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::DateTime;

use crate::error::Error;
use crate::msg::codec::{Marshal, Marshaler};
use crate::msg::{EventTime, Message, Value};
use crate::Result;

#[cfg(test)]
mod test;

/// Fluentd の Forward 入力プラグインが待ち受ける既定のアドレスです。
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:24224";

/// 送信待ちバッファの既定の上限です (8MiB)。
pub const DEFAULT_BUFFER_LIMIT: usize = 8 * 1024 * 1024;

/// トランスポートが使用するネットワークの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
  Tcp,
  Udp,
  Unix,
}

impl Default for Network {
  fn default() -> Self {
    Network::Tcp
  }
}

impl Display for Network {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Network::Tcp => "tcp",
      Network::Udp => "udp",
      Network::Unix => "unix",
    })
  }
}

impl FromStr for Network {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "tcp" => Ok(Network::Tcp),
      "udp" => Ok(Network::Udp),
      "unix" => Ok(Network::Unix),
      _ => Err(Error::IllegalOptionValue { name: "network", value: s.to_string() }),
    }
  }
}

/// 名前と型付けされた値の組で表されるオプションです。認識できない名前のオプションは構築できません。
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOption {
  Network(Network),
  Address(String),
  /// すべてのメッセージに使用する固定の時刻。
  Timestamp(EventTime),
  Marshaler(Marshaler),
  /// すべてのタグの先頭に `.` 区切りで付加される文字列。
  TagPrefix(String),
  /// `true` の場合、追加操作はデータが送信されるまでブロックする。
  SyncAppend(bool),
  /// 送信待ちバッファのバイト数の上限。
  BufferLimit(usize),
}

impl ClientOption {
  pub fn name(&self) -> &'static str {
    match self {
      ClientOption::Network(_) => "network",
      ClientOption::Address(_) => "address",
      ClientOption::Timestamp(_) => "timestamp",
      ClientOption::Marshaler(_) => "marshaler",
      ClientOption::TagPrefix(_) => "tag_prefix",
      ClientOption::SyncAppend(_) => "sync_append",
      ClientOption::BufferLimit(_) => "buffer_limit",
    }
  }

  /// 設定ファイルなどから得た名前と文字列の値からオプションを構築します。
  ///
  /// `timestamp` は RFC 3339 形式またはエポック秒の整数を受け付けます。
  pub fn parse(name: &str, value: &str) -> Result<ClientOption> {
    match name {
      "network" => Ok(ClientOption::Network(value.parse()?)),
      "address" => Ok(ClientOption::Address(value.to_string())),
      "timestamp" => parse_timestamp(value).map(ClientOption::Timestamp),
      "marshaler" => Ok(ClientOption::Marshaler(value.parse()?)),
      "tag_prefix" => Ok(ClientOption::TagPrefix(value.to_string())),
      "sync_append" => value
        .parse()
        .map(ClientOption::SyncAppend)
        .map_err(|_| Error::IllegalOptionValue { name: "sync_append", value: value.to_string() }),
      "buffer_limit" => value
        .parse()
        .map(ClientOption::BufferLimit)
        .map_err(|_| Error::IllegalOptionValue { name: "buffer_limit", value: value.to_string() }),
      _ => Err(Error::UnknownOption { name: name.to_string() }),
    }
  }
}

impl Display for ClientOption {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}=", self.name())?;
    match self {
      ClientOption::Network(network) => write!(f, "{}", network),
      ClientOption::Address(address) => write!(f, "{}", address),
      ClientOption::Timestamp(time) => write!(f, "{}", time),
      ClientOption::Marshaler(marshaler) => write!(f, "{}", marshaler),
      ClientOption::TagPrefix(prefix) => write!(f, "{}", prefix),
      ClientOption::SyncAppend(sync) => write!(f, "{}", sync),
      ClientOption::BufferLimit(limit) => write!(f, "{}", limit),
    }
  }
}

fn parse_timestamp(value: &str) -> Result<EventTime> {
  if let Ok(seconds) = value.parse::<i64>() {
    return Ok(EventTime::from_unix(seconds));
  }
  DateTime::parse_from_rfc3339(value)
    .map(|datetime| EventTime::new(datetime.timestamp(), datetime.timestamp_subsec_nanos()))
    .map_err(|_| Error::IllegalOptionValue { name: "timestamp", value: value.to_string() })
}

pub fn with_network(network: Network) -> ClientOption {
  ClientOption::Network(network)
}

pub fn with_address<S: Into<String>>(address: S) -> ClientOption {
  ClientOption::Address(address.into())
}

pub fn with_timestamp<T: Into<EventTime>>(time: T) -> ClientOption {
  ClientOption::Timestamp(time.into())
}

pub fn with_json_marshaler() -> ClientOption {
  ClientOption::Marshaler(Marshaler::Json)
}

pub fn with_msgpack_marshaler() -> ClientOption {
  ClientOption::Marshaler(Marshaler::Msgpack)
}

pub fn with_tag_prefix<S: Into<String>>(prefix: S) -> ClientOption {
  ClientOption::TagPrefix(prefix.into())
}

pub fn with_sync_append(sync: bool) -> ClientOption {
  ClientOption::SyncAppend(sync)
}

pub fn with_buffer_limit(limit: usize) -> ClientOption {
  ClientOption::BufferLimit(limit)
}

/// オプションの列を解決したトランスポートの設定です。同じ名前のオプションは後に指定したものが優先されます。
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  network: Network,
  address: String,
  timestamp: Option<EventTime>,
  marshaler: Marshaler,
  tag_prefix: Option<String>,
  sync_append: bool,
  buffer_limit: usize,
}

impl Default for ClientConfig {
  fn default() -> Self {
    ClientConfig {
      network: Network::default(),
      address: DEFAULT_ADDRESS.to_string(),
      timestamp: None,
      marshaler: Marshaler::default(),
      tag_prefix: None,
      sync_append: false,
      buffer_limit: DEFAULT_BUFFER_LIMIT,
    }
  }
}

impl ClientConfig {
  pub fn from_options<I: IntoIterator<Item = ClientOption>>(options: I) -> ClientConfig {
    let mut config = ClientConfig::default();
    for option in options {
      log::debug!("client option: {}", option);
      match option {
        ClientOption::Network(network) => config.network = network,
        ClientOption::Address(address) => config.address = address,
        ClientOption::Timestamp(time) => config.timestamp = Some(time),
        ClientOption::Marshaler(marshaler) => config.marshaler = marshaler,
        ClientOption::TagPrefix(prefix) => config.tag_prefix = Some(prefix).filter(|p| !p.is_empty()),
        ClientOption::SyncAppend(sync) => config.sync_append = sync,
        ClientOption::BufferLimit(limit) => config.buffer_limit = limit,
      }
    }
    config
  }

  pub fn network(&self) -> Network {
    self.network
  }

  pub fn address(&self) -> &str {
    &self.address
  }

  pub fn timestamp(&self) -> Option<EventTime> {
    self.timestamp
  }

  pub fn marshaler(&self) -> Marshaler {
    self.marshaler
  }

  pub fn tag_prefix(&self) -> Option<&str> {
    self.tag_prefix.as_deref()
  }

  pub fn sync_append(&self) -> bool {
    self.sync_append
  }

  pub fn buffer_limit(&self) -> usize {
    self.buffer_limit
  }

  /// この設定に従って送信用のメッセージを構築します。タグにはプレフィクスが付加され、固定の時刻が指定されていれば
  /// 現在時刻の代わりにそれを使用します。
  pub fn message<T: Into<String>, V: Into<Value>>(&self, tag: T, record: V) -> Message {
    let tag = match &self.tag_prefix {
      Some(prefix) => format!("{}.{}", prefix, tag.into()),
      None => tag.into(),
    };
    let time = self.timestamp.unwrap_or_else(EventTime::now);
    Message::new(tag, time, record)
  }

  /// 選択されたマーシャラでメッセージをシリアライズします。
  pub fn marshal(&self, msg: &Message) -> Result<Vec<u8>> {
    self.marshaler.marshal(msg)
  }
}
