//! Fluentd Forward プロトコルのメッセージを MessagePack の `[tag, time, record, option]` タプルとして扱うコーデック。
//!
//! 時刻には整数の秒と、秒・ナノ秒を持つ EventTime 拡張型 (type 0) の 2 つの表現があります。デコード時は値の
//! 先頭マーカーを消費せずに参照し、どちらの表現で書かれているかを判定します。

use std::convert::TryFrom;
use std::io::Write;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rmp as msgpack;
use rmp::Marker;

use crate::error::Error;
use crate::msg::{EventTime, Message, Value};
use crate::Result;


/// EventTime を表す MessagePack 拡張型の type 値です。
pub const EVENT_TIME_EXT_TYPE: i8 = 0;

/// EventTime 拡張型のペイロード長です。秒とナノ秒をそれぞれビッグエンディアンの u32 で格納します。
pub const EVENT_TIME_EXT_SIZE: u32 = 8;

/// レコードとオプションに許される入れ子の最大深さです。
pub const MAX_NESTING_DEPTH: usize = 128;

const TUPLE_LENGTH: u8 = 4;

/// 時刻フィールドのワイヤ上の表現。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeEncoding {
  /// FixExt8 または Ext8 による EventTime 拡張型。
  Extension,
  /// uint32 または int64 によるエポック秒。
  Seconds,
}

impl TimeEncoding {
  fn classify(marker: Marker) -> Result<TimeEncoding> {
    match marker {
      Marker::FixExt8 | Marker::Ext8 => Ok(TimeEncoding::Extension),
      Marker::U32 | Marker::I64 => Ok(TimeEncoding::Seconds),
      other => Err(Error::UnrecognizedTimeEncoding { marker: other.to_u8() }),
    }
  }
}

/// メッセージを新しいバッファにシリアライズします。失敗した場合に書きかけのバイト列が返されることはありません。
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
  let mut buf = Vec::with_capacity(64);
  encode_to(&mut buf, msg)?;
  if log::log_enabled!(log::Level::Trace) {
    log::trace!("message marshaled to {} bytes: {:02X?}", buf.len(), buf);
  }
  Ok(buf)
}

/// メッセージを指定された出力先に書き込みます。エラーが発生した場合、出力先には途中までのデータが書き込まれて
/// いる可能性があります。
pub fn encode_to<W: Write>(buf: &mut W, msg: &Message) -> Result<()> {
  msgpack::encode::write_array_len(buf, TUPLE_LENGTH as u32)?;
  msgpack::encode::write_str(buf, msg.tag())?;
  if msg.high_precision() {
    write_event_time(buf, msg.time())?;
  } else {
    msgpack::encode::write_i64(buf, msg.time().seconds())?;
  }
  write_value(buf, msg.record())?;
  write_value(buf, msg.option())?;
  Ok(())
}

/// バッファ全体を 1 つのメッセージとしてデコードします。メッセージの後ろにデータが残っている場合はエラーです。
pub fn decode(buffer: &[u8]) -> Result<Message> {
  let mut rd = buffer;
  let msg = decode_from(&mut rd)?;
  if !rd.is_empty() {
    return Err(Error::TrailingBytes { count: rd.len() });
  }
  Ok(msg)
}

/// スライスの先頭から 1 つのメッセージをデコードし、スライスを読み込んだ分だけ進めます。
///
/// 先頭の値が固定長配列でない場合、その値全体を読み飛ばしてから `Error::NotAnArray` を返します。これにより
/// 呼び出し側は次の値から読み込みを再開することができます。
pub fn decode_from(rd: &mut &[u8]) -> Result<Message> {
  let length = match peek_marker(rd)? {
    Marker::FixArray(length) => length,
    other => {
      log::debug!("skipping non-array value: {:#04X}", other.to_u8());
      if skip_value(rd).is_err() {
        *rd = &[];
      }
      return Err(Error::NotAnArray { marker: other.to_u8() });
    }
  };
  skip_bytes(rd, 1)?;
  if length != TUPLE_LENGTH {
    return Err(Error::UnexpectedTupleLength { length: length as usize });
  }

  let marker = msgpack::decode::read_marker(rd)?;
  let tag = match str_len(rd, marker)? {
    Some(length) => read_str_body(rd, length)?,
    None => return Err(Error::TagNotString { marker: marker.to_u8() }),
  };

  let encoding = TimeEncoding::classify(peek_marker(rd)?)?;
  let time = match encoding {
    TimeEncoding::Extension => read_event_time(rd)?,
    TimeEncoding::Seconds => EventTime::from_unix(read_seconds(rd)?),
  };

  let record = read_value(rd, 0)?;
  let option = read_value(rd, 0)?;

  Ok(Message::new(tag, time, record).with_option(option).with_high_precision(encoding == TimeEncoding::Extension))
}

fn write_event_time<W: Write>(buf: &mut W, time: EventTime) -> Result<()> {
  if time.seconds() < 0 || time.seconds() > u32::MAX as i64 {
    return Err(Error::TimeOutOfRange { seconds: time.seconds() });
  }
  msgpack::encode::write_ext_meta(buf, EVENT_TIME_EXT_SIZE, EVENT_TIME_EXT_TYPE)?;
  buf.write_u32::<BigEndian>(time.seconds() as u32)?;
  buf.write_u32::<BigEndian>(time.nanoseconds())?;
  Ok(())
}

fn read_event_time(rd: &mut &[u8]) -> Result<EventTime> {
  let meta = msgpack::decode::read_ext_meta(rd)?;
  if meta.typeid != EVENT_TIME_EXT_TYPE || meta.size != EVENT_TIME_EXT_SIZE {
    return Err(Error::UnexpectedExtension { type_id: meta.typeid, size: meta.size });
  }
  let seconds = rd.read_u32::<BigEndian>()?;
  let nanoseconds = rd.read_u32::<BigEndian>()?;
  Ok(EventTime::new(seconds as i64, nanoseconds))
}

fn read_seconds(rd: &mut &[u8]) -> Result<i64> {
  match msgpack::decode::read_marker(rd)? {
    Marker::U32 => Ok(rd.read_u32::<BigEndian>()? as i64),
    Marker::I64 => Ok(rd.read_i64::<BigEndian>()?),
    other => Err(Error::TypeMismatch { marker: other.to_u8() }),
  }
}

/// 任意の値を MessagePack で書き込みます。整数はその値を表現できる最短の形式で書き出されます。
pub fn write_value<W: Write>(buf: &mut W, value: &Value) -> Result<()> {
  match value {
    Value::Nil => msgpack::encode::write_nil(buf)?,
    Value::Boolean(b) => msgpack::encode::write_bool(buf, *b)?,
    Value::Integer(i) => {
      msgpack::encode::write_sint(buf, *i)?;
    }
    Value::Float(f) => msgpack::encode::write_f64(buf, *f)?,
    Value::String(s) => msgpack::encode::write_str(buf, s)?,
    Value::Array(values) => {
      msgpack::encode::write_array_len(buf, length_u32(values.len())?)?;
      for value in values {
        write_value(buf, value)?;
      }
    }
    Value::Map(entries) => {
      msgpack::encode::write_map_len(buf, length_u32(entries.len())?)?;
      for (key, value) in entries {
        msgpack::encode::write_str(buf, key)?;
        write_value(buf, value)?;
      }
    }
  }
  Ok(())
}

/// スライスの先頭から任意の値を 1 つ読み込みます。バイナリや拡張型など `Value` で表現できない型はエラーになります。
pub fn read_value(rd: &mut &[u8], depth: usize) -> Result<Value> {
  if depth >= MAX_NESTING_DEPTH {
    return Err(Error::NestingTooDeep { maximum: MAX_NESTING_DEPTH });
  }
  let marker = msgpack::decode::read_marker(rd)?;
  if let Some(length) = str_len(rd, marker)? {
    return Ok(Value::String(read_str_body(rd, length)?));
  }
  Ok(match marker {
    Marker::Null => Value::Nil,
    Marker::True => Value::Boolean(true),
    Marker::False => Value::Boolean(false),
    Marker::FixPos(i) => Value::Integer(i as i64),
    Marker::FixNeg(i) => Value::Integer(i as i64),
    Marker::U8 => Value::Integer(rd.read_u8()? as i64),
    Marker::U16 => Value::Integer(rd.read_u16::<BigEndian>()? as i64),
    Marker::U32 => Value::Integer(rd.read_u32::<BigEndian>()? as i64),
    Marker::U64 => {
      let i = rd.read_u64::<BigEndian>()?;
      if i > i64::MAX as u64 {
        return Err(Error::IntegerOverflow { value: i.to_string() });
      }
      Value::Integer(i as i64)
    }
    Marker::I8 => Value::Integer(rd.read_i8()? as i64),
    Marker::I16 => Value::Integer(rd.read_i16::<BigEndian>()? as i64),
    Marker::I32 => Value::Integer(rd.read_i32::<BigEndian>()? as i64),
    Marker::I64 => Value::Integer(rd.read_i64::<BigEndian>()?),
    Marker::F32 => Value::Float(rd.read_f32::<BigEndian>()? as f64),
    Marker::F64 => Value::Float(rd.read_f64::<BigEndian>()?),
    Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
      let length = container_len(rd, marker)?;
      // 要素は最低 1 バイトなので、残りのバイト数を超えて確保する必要はない
      let mut values = Vec::with_capacity(length.min(rd.len()));
      for _ in 0..length {
        values.push(read_value(rd, depth + 1)?);
      }
      Value::Array(values)
    }
    Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
      let length = container_len(rd, marker)?;
      let mut entries = Vec::with_capacity(length.min(rd.len() / 2));
      for _ in 0..length {
        let marker = msgpack::decode::read_marker(rd)?;
        let key = match str_len(rd, marker)? {
          Some(length) => read_str_body(rd, length)?,
          None => return Err(Error::MapKeyNotString { marker: marker.to_u8() }),
        };
        entries.push((key, read_value(rd, depth + 1)?));
      }
      Value::Map(entries)
    }
    other => return Err(Error::UnsupportedMarker { marker: other.to_u8() }),
  })
}

/// スライスの先頭にある値を、型にかかわらず 1 つ読み飛ばします。入れ子の値は再帰せずに数え上げて処理します。
pub fn skip_value(rd: &mut &[u8]) -> Result<()> {
  let mut pending: u64 = 1;
  while pending > 0 {
    pending -= 1;
    let marker = msgpack::decode::read_marker(rd)?;
    let (bytes, children) = match marker {
      Marker::Null | Marker::True | Marker::False | Marker::FixPos(_) | Marker::FixNeg(_) | Marker::Reserved => (0, 0),
      Marker::U8 | Marker::I8 => (1, 0),
      Marker::U16 | Marker::I16 => (2, 0),
      Marker::U32 | Marker::I32 | Marker::F32 => (4, 0),
      Marker::U64 | Marker::I64 | Marker::F64 => (8, 0),
      Marker::FixStr(length) => (length as usize, 0),
      Marker::Str8 | Marker::Bin8 => (rd.read_u8()? as usize, 0),
      Marker::Str16 | Marker::Bin16 => (rd.read_u16::<BigEndian>()? as usize, 0),
      Marker::Str32 | Marker::Bin32 => (rd.read_u32::<BigEndian>()? as usize, 0),
      Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => (0, container_len(rd, marker)? as u64),
      Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => (0, container_len(rd, marker)? as u64 * 2),
      // 拡張型は type を表す 1 バイトを含む
      Marker::FixExt1 => (2, 0),
      Marker::FixExt2 => (3, 0),
      Marker::FixExt4 => (5, 0),
      Marker::FixExt8 => (9, 0),
      Marker::FixExt16 => (17, 0),
      Marker::Ext8 => (rd.read_u8()? as usize + 1, 0),
      Marker::Ext16 => (rd.read_u16::<BigEndian>()? as usize + 1, 0),
      Marker::Ext32 => (rd.read_u32::<BigEndian>()? as usize + 1, 0),
    };
    skip_bytes(rd, bytes)?;
    pending += children;
  }
  Ok(())
}

#[inline]
fn length_u32(length: usize) -> Result<u32> {
  u32::try_from(length).map_err(|_| Error::LengthOverflow { length })
}

#[inline]
fn peek_marker(rd: &[u8]) -> Result<Marker> {
  rd.first().map(|b| Marker::from_u8(*b)).ok_or(Error::BufferUnsatisfied)
}

/// 文字列マーカーであればその後に続く長さを読み込みます。文字列以外のマーカーの場合は `None` を返します。
#[inline]
fn str_len(rd: &mut &[u8], marker: Marker) -> Result<Option<usize>> {
  Ok(Some(match marker {
    Marker::FixStr(length) => length as usize,
    Marker::Str8 => rd.read_u8()? as usize,
    Marker::Str16 => rd.read_u16::<BigEndian>()? as usize,
    Marker::Str32 => rd.read_u32::<BigEndian>()? as usize,
    _ => return Ok(None),
  }))
}

#[inline]
fn container_len(rd: &mut &[u8], marker: Marker) -> Result<usize> {
  match marker {
    Marker::FixArray(length) | Marker::FixMap(length) => Ok(length as usize),
    Marker::Array16 | Marker::Map16 => Ok(rd.read_u16::<BigEndian>()? as usize),
    Marker::Array32 | Marker::Map32 => Ok(rd.read_u32::<BigEndian>()? as usize),
    other => Err(Error::TypeMismatch { marker: other.to_u8() }),
  }
}

#[inline]
fn read_str_body(rd: &mut &[u8], length: usize) -> Result<String> {
  if rd.len() < length {
    return Err(Error::BufferUnsatisfied);
  }
  let (bytes, rest) = rd.split_at(length);
  let s = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?.to_string();
  *rd = rest;
  Ok(s)
}

#[inline]
fn skip_bytes(rd: &mut &[u8], length: usize) -> Result<()> {
  if rd.len() < length {
    return Err(Error::BufferUnsatisfied);
  }
  *rd = &rd[length..];
  Ok(())
}
