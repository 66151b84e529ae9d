use std::time::{Duration, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::msg::{EventTime, Message, Value};
use crate::test::SampleValues;

#[test]
fn test_event_time_normalization() {
  // 10 億以上のナノ秒は秒に繰り上げられる
  let time = EventTime::new(10, 2_500_000_000);
  assert_eq!(12, time.seconds());
  assert_eq!(500_000_000, time.nanoseconds());

  assert_eq!(EventTime::from_unix(12), time.truncate());
  assert_eq!(0, EventTime::from_unix(1609459200).nanoseconds());

  // 秒の上限を超える繰り上げは飽和する
  assert_eq!(EventTime::new(i64::MAX, 0), EventTime::new(i64::MAX, 1_000_000_000));
  assert_eq!(EventTime::new(i64::MAX, 500), EventTime::new(i64::MAX - 1, 1_000_000_500));
  assert_eq!(i64::MAX, EventTime::new(i64::MAX, u32::MAX).seconds());
}

#[test]
fn test_event_time_from_datetime() {
  let datetime = DateTime::parse_from_rfc3339("2021-01-01T00:00:00.123456789Z").unwrap().with_timezone(&Utc);
  let time = EventTime::from(datetime);
  assert_eq!(1609459200, time.seconds());
  assert_eq!(123456789, time.nanoseconds());
  assert_eq!(Some(datetime), time.to_datetime());
  assert_eq!("2021-01-01T00:00:00.123456789Z", time.to_string());
}

#[test]
fn test_event_time_from_system_time() {
  let time = EventTime::from(UNIX_EPOCH + Duration::new(1609459200, 42));
  assert_eq!(EventTime::new(1609459200, 42), time);

  // エポック以前の時刻でもナノ秒は正の値になる
  let time = EventTime::from(UNIX_EPOCH - Duration::new(1, 250_000_000));
  assert_eq!(-2, time.seconds());
  assert_eq!(750_000_000, time.nanoseconds());
  let time = EventTime::from(UNIX_EPOCH - Duration::new(3, 0));
  assert_eq!(EventTime::from_unix(-3), time);

  // 現在時刻は 2021 年以降
  assert!(EventTime::now().seconds() > 1609459200);
}

#[test]
fn test_new_message() {
  let mut sample = SampleValues::new(49087450211597u64);

  // 設定した値と同じ値が参照できる
  let time = sample.next_event_time();
  let record = sample.next_value(2);
  let msg = Message::new("app.log", time, record.clone());
  assert_eq!("app.log", msg.tag());
  assert_eq!(time, msg.time());
  assert_eq!(&record, msg.record());
  assert_eq!(&Value::Nil, msg.option());
  assert!(!msg.high_precision());

  let msg = msg.with_option(Value::map(vec![("chunk", "p8n9gmxTQVC8/nh2wlKKeQ==")])).with_high_precision(true);
  assert_eq!(Some("p8n9gmxTQVC8/nh2wlKKeQ=="), msg.option().get("chunk").and_then(Value::as_str));
  assert!(msg.high_precision());

  let (tag, t, r, o) = msg.into_parts();
  assert_eq!(("app.log", time, record), (tag.as_str(), t, r));
  assert!(!o.is_nil());
}

#[test]
fn test_value_conversions() {
  assert_eq!(Value::Integer(1), Value::from(1));
  assert_eq!(Value::Integer(4294967295), Value::from(u32::MAX));
  assert_eq!(Value::String("hi".to_string()), Value::from("hi"));
  assert_eq!(Value::Nil, Value::from(None::<i64>));
  assert_eq!(Value::Boolean(true), Value::from(Some(true)));
  assert_eq!(Value::Array(vec![Value::Float(0.5), Value::Float(1.5)]), Value::from(vec![0.5, 1.5]));

  // Map はキーの挿入順を保持し、重複時は最初の値を参照する
  let map = Value::Map(vec![("z".to_string(), Value::from(1)), ("a".to_string(), Value::from(2)), ("z".to_string(), Value::from(3))]);
  assert_eq!(Some(1), map.get("z").and_then(Value::as_i64));
  assert_eq!(None, map.get("b"));
  assert_eq!(None, Value::from(1).get("z"));
}
