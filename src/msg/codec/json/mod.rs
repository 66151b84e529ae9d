//! `["tag",time,record,option]` 形式のテキストコーデック。
//!
//! この形式には秒未満を格納する場所がないため、時刻は常に秒単位に切り捨てられます。

use std::convert::TryFrom;
use std::io::Write;

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::Error;
use crate::msg::{EventTime, Message, Value};
use crate::Result;


/// メッセージを空白や改行を含まない JSON 配列にシリアライズします。
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
  let mut buf = Vec::with_capacity(64);
  buf.push(b'[');
  serde_json::to_writer(&mut buf, msg.tag())?;
  write!(buf, ",{},", msg.time().seconds())?;
  serde_json::to_writer(&mut buf, &to_json(msg.record())?)?;
  buf.push(b',');
  serde_json::to_writer(&mut buf, &to_json(msg.option())?)?;
  buf.push(b']');

  if log::log_enabled!(log::Level::Trace) {
    log::trace!("message marshaled to: {}", String::from_utf8_lossy(&buf).escape_debug());
  }
  Ok(buf)
}

/// JSON 配列からメッセージを復元します。復元された時刻のナノ秒は常に 0 です。
pub fn decode(buffer: &[u8]) -> Result<Message> {
  let elements = match serde_json::from_slice::<JsonValue>(buffer)? {
    JsonValue::Array(elements) => elements,
    other => {
      log::debug!("JSON message rejected: not an array");
      return Err(Error::NotAJsonArray { message: kind(&other).to_string() });
    }
  };
  let [tag, time, record, option] = <[JsonValue; 4]>::try_from(elements)
    .map_err(|elements| Error::UnexpectedTupleLength { length: elements.len() })?;

  let tag = match tag {
    JsonValue::String(tag) => tag,
    other => return Err(Error::TagNotJsonString { value: other.to_string() }),
  };
  let time = time.as_i64().ok_or_else(|| Error::TimeNotInteger { value: time.to_string() })?;
  let record = from_json(record)?;
  let option = from_json(option)?;

  Ok(Message::new(tag, EventTime::from_unix(time), record).with_option(option))
}

fn to_json(value: &Value) -> Result<JsonValue> {
  Ok(match value {
    Value::Nil => JsonValue::Null,
    Value::Boolean(b) => JsonValue::Bool(*b),
    Value::Integer(i) => JsonValue::Number(Number::from(*i)),
    Value::Float(f) => {
      JsonValue::Number(Number::from_f64(*f).ok_or_else(|| Error::NonFiniteFloat { value: f.to_string() })?)
    }
    Value::String(s) => JsonValue::String(s.clone()),
    Value::Array(values) => JsonValue::Array(values.iter().map(to_json).collect::<Result<Vec<_>>>()?),
    Value::Map(entries) => {
      let mut map = Map::with_capacity(entries.len());
      for (key, value) in entries {
        if map.insert(key.clone(), to_json(value)?).is_some() {
          return Err(Error::DuplicateKey { key: key.clone() });
        }
      }
      JsonValue::Object(map)
    }
  })
}

fn from_json(value: JsonValue) -> Result<Value> {
  Ok(match value {
    JsonValue::Null => Value::Nil,
    JsonValue::Bool(b) => Value::Boolean(b),
    JsonValue::Number(n) => {
      if let Some(i) = n.as_i64() {
        Value::Integer(i)
      } else if n.is_f64() {
        Value::Float(n.as_f64().unwrap_or(f64::NAN))
      } else {
        return Err(Error::IntegerOverflow { value: n.to_string() });
      }
    }
    JsonValue::String(s) => Value::String(s),
    JsonValue::Array(values) => Value::Array(values.into_iter().map(from_json).collect::<Result<Vec<_>>>()?),
    JsonValue::Object(map) => {
      Value::Map(map.into_iter().map(|(k, v)| from_json(v).map(|v| (k, v))).collect::<Result<Vec<_>>>()?)
    }
  })
}

fn kind(value: &JsonValue) -> &'static str {
  match value {
    JsonValue::Null => "null",
    JsonValue::Bool(_) => "boolean",
    JsonValue::Number(_) => "number",
    JsonValue::String(_) => "string",
    JsonValue::Array(_) => "array",
    JsonValue::Object(_) => "object",
  }
}
