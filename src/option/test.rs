use crate::error::Error;
use crate::msg::codec::{json, msgpack, Marshal, Marshaler};
use crate::msg::{EventTime, Message, Value};
use crate::option::*;
use crate::test::init_logging;

#[test]
fn test_option_names() {
  let options = vec![
    with_network(Network::Unix),
    with_address("/var/run/fluentd.sock"),
    with_timestamp(EventTime::from_unix(1609459200)),
    with_json_marshaler(),
    with_tag_prefix("web"),
    with_sync_append(true),
    with_buffer_limit(1024),
  ];
  let names = options.iter().map(ClientOption::name).collect::<Vec<_>>();
  assert_eq!(vec!["network", "address", "timestamp", "marshaler", "tag_prefix", "sync_append", "buffer_limit"], names);
  assert_eq!(ClientOption::Marshaler(Marshaler::Msgpack), with_msgpack_marshaler());
}

#[test]
fn test_parse_option() {
  assert_eq!(Ok(with_network(Network::Udp)), ClientOption::parse("network", "udp"));
  assert_eq!(Ok(with_address("fluentd:24224")), ClientOption::parse("address", "fluentd:24224"));
  assert_eq!(Ok(with_json_marshaler()), ClientOption::parse("marshaler", "json"));
  assert_eq!(Ok(with_sync_append(false)), ClientOption::parse("sync_append", "false"));
  assert_eq!(Ok(with_buffer_limit(4096)), ClientOption::parse("buffer_limit", "4096"));
  assert_eq!(Ok(with_timestamp(EventTime::from_unix(1609459200))), ClientOption::parse("timestamp", "1609459200"));
  assert_eq!(
    Ok(with_timestamp(EventTime::new(1609459200, 500_000_000))),
    ClientOption::parse("timestamp", "2021-01-01T09:00:00.5+09:00")
  );

  // 表示形式から同じオプションを復元できる
  for option in vec![with_timestamp(EventTime::new(1609459200, 1)), with_tag_prefix("a.b"), with_msgpack_marshaler()] {
    let text = option.to_string();
    let (name, value) = text.split_at(text.find('=').unwrap());
    assert_eq!(Ok(option), ClientOption::parse(name, &value[1..]));
  }

  assert_eq!(Err(Error::UnknownOption { name: "retry".to_string() }), ClientOption::parse("retry", "3"));
  assert_eq!(
    Err(Error::IllegalOptionValue { name: "network", value: "sctp".to_string() }),
    ClientOption::parse("network", "sctp")
  );
  assert_eq!(
    Err(Error::IllegalOptionValue { name: "marshaler", value: "xml".to_string() }),
    ClientOption::parse("marshaler", "xml")
  );
  assert!(ClientOption::parse("sync_append", "yes").is_err());
  assert!(ClientOption::parse("buffer_limit", "-1").is_err());
  assert!(ClientOption::parse("timestamp", "yesterday").is_err());
}

#[test]
fn test_client_config() {
  init_logging();
  let config = ClientConfig::from_options(vec![]);
  assert_eq!(ClientConfig::default(), config);
  assert_eq!(Network::Tcp, config.network());
  assert_eq!(DEFAULT_ADDRESS, config.address());
  assert_eq!(Marshaler::Msgpack, config.marshaler());
  assert_eq!(DEFAULT_BUFFER_LIMIT, config.buffer_limit());
  assert_eq!(None, config.tag_prefix());
  assert_eq!(None, config.timestamp());
  assert!(!config.sync_append());

  // 後から指定したオプションが優先される
  let config = ClientConfig::from_options(vec![
    with_json_marshaler(),
    with_buffer_limit(1),
    with_msgpack_marshaler(),
    with_sync_append(true),
    with_tag_prefix(""),
  ]);
  assert_eq!(Marshaler::Msgpack, config.marshaler());
  assert_eq!(1, config.buffer_limit());
  assert!(config.sync_append());
  assert_eq!(None, config.tag_prefix());
}

#[test]
fn test_config_message() {
  init_logging();
  let time = EventTime::from_unix(1609459200);
  let config = ClientConfig::from_options(vec![with_tag_prefix("app"), with_timestamp(time), with_json_marshaler()]);
  let msg = config.message("log", Value::map(vec![("msg", "hi")]));
  assert_eq!("app.log", msg.tag());
  assert_eq!(time, msg.time());
  assert_eq!(br#"["app.log",1609459200,{"msg":"hi"},null]"#.to_vec(), config.marshal(&msg).unwrap());

  // 固定の時刻がなければ現在時刻を使用する
  let config = ClientConfig::default();
  let msg = config.message("log", Value::Nil);
  assert_eq!("log", msg.tag());
  assert!(msg.time() >= time);
  assert_eq!(msgpack::encode(&msg).unwrap(), config.marshal(&msg).unwrap());
}

#[test]
fn test_marshaler() {
  let msg = Message::new("app.log", EventTime::new(1609459200, 7), Value::map(vec![("msg", "hi")])).with_high_precision(true);
  for marshaler in [Marshaler::Json, Marshaler::Msgpack].iter() {
    let buf = marshaler.marshal(&msg).unwrap();
    let decoded = marshaler.unmarshal(&buf).unwrap();
    assert_eq!(msg.record(), decoded.record());
    assert_eq!(Ok(*marshaler), marshaler.to_string().parse::<Marshaler>());
  }
  assert_eq!(json::encode(&msg).unwrap(), Marshaler::Json.marshal(&msg).unwrap());
  assert_eq!(msg, Marshaler::Msgpack.unmarshal(&msgpack::encode(&msg).unwrap()).unwrap());

  // トランスポートはトレイトオブジェクトとしてマーシャラを保持できる
  let marshaler: Box<dyn Marshal + Send + Sync> = Box::new(Marshaler::default());
  assert_eq!(msgpack::encode(&msg).unwrap(), marshaler.marshal(&msg).unwrap());
}
