use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

pub use value::Value;

pub mod codec;
pub mod value;
#[cfg(test)]
mod test;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Fluentd の EventTime に相当する、UNIX エポックからの秒とナノ秒で表される時刻です。
///
/// バイナリ形式では高精度モードの場合にのみナノ秒まで転送されます。テキスト形式や低精度モードのバイナリ形式では
/// 秒未満は切り捨てられます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventTime {
  seconds: i64,
  /// 常に 0～999,999,999 の範囲に正規化されている。
  nanoseconds: u32,
}

impl EventTime {
  /// 秒とナノ秒から時刻を構築します。10 億以上のナノ秒は秒に繰り上げられます。秒は `i64::MAX` で飽和します。
  pub fn new(seconds: i64, nanoseconds: u32) -> EventTime {
    let carry = (nanoseconds / NANOS_PER_SECOND) as i64;
    EventTime { seconds: seconds.saturating_add(carry), nanoseconds: nanoseconds % NANOS_PER_SECOND }
  }

  /// 秒未満を持たない時刻を構築します。
  pub fn from_unix(seconds: i64) -> EventTime {
    EventTime { seconds, nanoseconds: 0 }
  }

  pub fn now() -> EventTime {
    EventTime::from(Utc::now())
  }

  pub fn seconds(&self) -> i64 {
    self.seconds
  }

  pub fn nanoseconds(&self) -> u32 {
    self.nanoseconds
  }

  /// 秒未満を切り捨てた時刻を返します。
  pub fn truncate(&self) -> EventTime {
    EventTime::from_unix(self.seconds)
  }

  /// chrono の UTC 時刻に変換します。chrono が表現できない範囲の場合は `None` を返します。
  pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
  }
}

impl From<DateTime<Utc>> for EventTime {
  fn from(datetime: DateTime<Utc>) -> EventTime {
    EventTime::new(datetime.timestamp(), datetime.timestamp_subsec_nanos())
  }
}

impl From<SystemTime> for EventTime {
  fn from(time: SystemTime) -> EventTime {
    match time.duration_since(UNIX_EPOCH) {
      Ok(elapsed) => EventTime::new(elapsed.as_secs() as i64, elapsed.subsec_nanos()),
      Err(err) => {
        // エポック以前: ナノ秒を正の値に保つため秒を 1 つ借りる
        let before = err.duration();
        let seconds = -(before.as_secs() as i64);
        match before.subsec_nanos() {
          0 => EventTime::from_unix(seconds),
          nanos => EventTime::new(seconds.saturating_sub(1), NANOS_PER_SECOND - nanos),
        }
      }
    }
  }
}

impl Display for EventTime {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.to_datetime() {
      Some(datetime) => write!(f, "{}", datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
      None => write!(f, "{}.{:09}", self.seconds, self.nanoseconds),
    }
  }
}

/// タグとタイムスタンプを持つ 1 つのイベントです。
///
/// `record` と `option` はコーデックから見て不透明な値であり、エンコード/デコードを通じてそのまま保存されます。
/// `high_precision` はワイヤ上には送信されず、バイナリ形式で時刻をどちらの表現で書き出すかだけを決定します。
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
  /// ルーティングに使用されるドット区切りの識別子。
  tag: String,
  time: EventTime,
  /// イベントのペイロード。
  record: Value,
  /// ペイロードとは別に送られるメタデータ。指定がない場合は `Nil`。
  option: Value,
  /// バイナリ形式でナノ秒精度の EventTime 拡張型を使用する場合 `true`。
  high_precision: bool,
}

impl Message {
  pub fn new<T: Into<String>, V: Into<Value>>(tag: T, time: EventTime, record: V) -> Message {
    Message { tag: tag.into(), time, record: record.into(), option: Value::Nil, high_precision: false }
  }

  pub fn with_option<V: Into<Value>>(mut self, option: V) -> Message {
    self.option = option.into();
    self
  }

  pub fn with_high_precision(mut self, high_precision: bool) -> Message {
    self.high_precision = high_precision;
    self
  }

  pub fn tag(&self) -> &str {
    &self.tag
  }

  pub fn time(&self) -> EventTime {
    self.time
  }

  pub fn record(&self) -> &Value {
    &self.record
  }

  pub fn option(&self) -> &Value {
    &self.option
  }

  pub fn high_precision(&self) -> bool {
    self.high_precision
  }

  /// このメッセージを構成要素に分解します。
  pub fn into_parts(self) -> (String, EventTime, Value, Value) {
    (self.tag, self.time, self.record, self.option)
  }
}
