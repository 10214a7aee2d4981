use thiserror::Error;

/// A bencoded value. Byte strings hold raw bytes and are never assumed to be UTF-8.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Value {
    String(Vec<u8>),
    Integer(i64),
    List(Vec<Value>),
    Dictionary(Dictionary),
}

/// Dictionary entries kept in the order they were decoded or inserted. Encoding writes them
/// back in that same order, which is what keeps the info hash stable.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Dictionary(Vec<(Vec<u8>, Value)>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.0
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value)
    }

    /// Replaces the value of an existing key in place, otherwise appends a new entry.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        let index = self.0.iter().position(|(entry_key, _)| entry_key == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Value)> {
        self.0.iter().map(|(key, value)| (key.as_slice(), value))
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("integer {0} out of range")]
    OutOfRange(i64),

    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

impl Value {
    pub fn string(string: impl AsRef<[u8]>) -> Self {
        Self::String(string.as_ref().to_vec())
    }

    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    pub fn dictionary() -> Self {
        Self::Dictionary(Dictionary::new())
    }

    pub fn with_value(mut self, value: Value) -> Self {
        if let Self::List(values) = &mut self {
            values.push(value);
        }
        self
    }

    pub fn with_entry(mut self, key: &str, value: Value) -> Self {
        if let Self::Dictionary(entries) = &mut self {
            entries.insert(key, value);
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
        }
    }

    pub fn remove_entry(&mut self, key: &str) -> Result<Value, ValueError> {
        self.try_remove_entry(key)?.ok_or(ValueError::Missing)
    }

    pub fn try_remove_entry(&mut self, key: &str) -> Result<Option<Value>, ValueError> {
        match self {
            Self::Dictionary(entries) => Ok(entries.remove(key.as_bytes())),
            other => Err(unexpected("dictionary", other)),
        }
    }

    /// Removes a required entry and converts it.
    pub fn take<T>(&mut self, key: &str) -> Result<T, ValueError>
    where
        T: TryFrom<Value, Error = ValueError>,
    {
        self.remove_entry(key).and_then(T::try_from)
    }
}

fn unexpected(expected: &'static str, value: &Value) -> ValueError {
    ValueError::UnexpectedType {
        expected,
        found: value.kind(),
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(bytes) => Ok(bytes),
            other => Err(unexpected("string", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let bytes: Vec<u8> = value.try_into()?;
        String::from_utf8(bytes).map_err(|_| ValueError::InvalidUtf8)
    }
}

impl TryFrom<Value> for i64 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(integer) => Ok(integer),
            other => Err(unexpected("integer", &other)),
        }
    }
}

impl TryFrom<Value> for usize {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let integer: i64 = value.try_into()?;
        usize::try_from(integer).map_err(|_| ValueError::OutOfRange(integer))
    }
}

impl TryFrom<Value> for Vec<Value> {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::List(values) => Ok(values),
            other => Err(unexpected("list", &other)),
        }
    }
}
