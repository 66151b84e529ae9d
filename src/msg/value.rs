/// レコードやオプションとして運ばれる動的型付けされた値です。テキスト形式とバイナリ形式の双方で表現できる型に
/// 限定されています。
///
/// `Map` はキーの挿入順を保持し、どちらの形式でも同じ順序で書き出されます。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Nil,
  Boolean(bool),
  Integer(i64),
  Float(f64),
  String(String),
  Array(Vec<Value>),
  Map(Vec<(String, Value)>),
}

impl Value {
  /// キーと値の組から `Map` を構築します。
  pub fn map<K, V, I>(entries: I) -> Value
  where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
  {
    Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  pub fn is_nil(&self) -> bool {
    matches!(self, Value::Nil)
  }

  /// `Map` から指定されたキーの値を参照します。同じキーが複数ある場合は最初のものを返します。
  pub fn get(&self, key: &str) -> Option<&Value> {
    match self {
      Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      _ => None,
    }
  }
}

impl Default for Value {
  fn default() -> Self {
    Value::Nil
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Boolean(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Integer(value as i64)
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Integer(value as i64)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Integer(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Float(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(values: Vec<T>) -> Self {
    Value::Array(values.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::Nil)
  }
}
