use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;
use crate::msg::Message;
use crate::Result;

pub mod json;
pub mod msgpack;

/// メッセージのシリアライズとデシリアライズを行うためのトレイトです。
/// トランスポート層はこのトレイトを通じてコーデックを呼び出すため、どちらの形式が選択されているかを知る必要がありません。
pub trait Marshal {
  fn marshal(&self, msg: &Message) -> Result<Vec<u8>>;
  fn unmarshal(&self, buffer: &[u8]) -> Result<Message>;
}

/// 送信メッセージに使用するワイヤ形式です。トランスポートの構築時に一度だけ選択されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marshaler {
  /// `["tag",time,record,option]` 形式の JSON 配列。秒未満は常に切り捨てられる。
  Json,
  /// MessagePack の 4 要素タプル。
  Msgpack,
}

impl Default for Marshaler {
  fn default() -> Self {
    Marshaler::Msgpack
  }
}

impl Marshal for Marshaler {
  fn marshal(&self, msg: &Message) -> Result<Vec<u8>> {
    match self {
      Marshaler::Json => json::encode(msg),
      Marshaler::Msgpack => msgpack::encode(msg),
    }
  }

  fn unmarshal(&self, buffer: &[u8]) -> Result<Message> {
    match self {
      Marshaler::Json => json::decode(buffer),
      Marshaler::Msgpack => msgpack::decode(buffer),
    }
  }
}

impl Display for Marshaler {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Marshaler::Json => "json",
      Marshaler::Msgpack => "msgpack",
    })
  }
}

impl FromStr for Marshaler {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "json" => Ok(Marshaler::Json),
      "msgpack" => Ok(Marshaler::Msgpack),
      _ => Err(Error::IllegalOptionValue { name: "marshaler", value: s.to_string() }),
    }
  }
}
