//! The INFO column of a record, kept as text and edited in place.
//!
//! Lookups scan the `;`-separated tokens on demand, so a record whose INFO is
//! never touched costs nothing beyond the copy of its column. All offset
//! arithmetic goes through [`InfoStore::positions`].

use std::fmt;
use std::ops::Range;

use memchr::memchr;

use crate::codec;
use crate::error::{Decoded, VcfError};
use crate::header::{read_header, write_header, SharedHeader};
use crate::types::{FieldType, Value};

/// Ploidy assumed for `Number=G` INFO fields.
pub const INFO_PLOIDY: usize = 2;

/// Location of one `key` or `key=value` token inside the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// The whole token, key included.
    pub token: Range<usize>,
    /// The value after `=`, `None` for a bare flag.
    pub value: Option<Range<usize>>,
}

#[derive(Clone)]
pub struct InfoStore {
    buf: String,
    header: SharedHeader,
    alt_count: usize,
}

impl InfoStore {
    /// Wraps the text of an INFO column; `.` is the empty store.
    pub fn new(text: &str, header: SharedHeader, alt_count: usize) -> Self {
        let buf = if text == "." { String::new() } else { text.to_owned() };
        InfoStore {
            buf,
            header,
            alt_count,
        }
    }

    pub(crate) fn set_alt_count(&mut self, alt_count: usize) {
        self.alt_count = alt_count;
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    fn tokens(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let bytes = self.buf.as_bytes();
        let mut start = 0;
        std::iter::from_fn(move || {
            while start < bytes.len() {
                let end = memchr(b';', &bytes[start..]).map_or(bytes.len(), |i| start + i);
                let token = start..end;
                start = end + 1;
                if !token.is_empty() {
                    return Some(token);
                }
            }
            None
        })
    }

    /// Finds the token whose key is exactly `key`.
    ///
    /// A key that is only a prefix of a longer key (`as` in `asdf=1`) or a
    /// suffix of one (`t` in `asst=1`) does not match.
    pub fn positions(&self, key: &str) -> Option<Span> {
        if key.is_empty() {
            return None;
        }
        let bytes = self.buf.as_bytes();
        self.tokens().find_map(|token| {
            let text = &bytes[token.clone()];
            if !text.starts_with(key.as_bytes()) {
                return None;
            }
            match text.get(key.len()) {
                None => Some(Span {
                    token,
                    value: None,
                }),
                Some(b'=') => Some(Span {
                    value: Some(token.start + key.len() + 1..token.end),
                    token,
                }),
                Some(_) => None,
            }
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions(key).is_some()
    }

    /// Raw text of a value; a bare flag yields its own key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf::header::Header;
    /// use rust_vcf::info::InfoStore;
    ///
    /// let header = Header::new("4.2").into_shared();
    /// let info = InfoStore::new("asdf=123;FLAG;as=22", header, 1);
    /// assert_eq!(info.raw("as"), Some("22"));
    /// assert_eq!(info.raw("FLAG"), Some("FLAG"));
    /// assert_eq!(info.raw("a"), None);
    /// ```
    pub fn raw(&self, key: &str) -> Option<&str> {
        let span = self.positions(key)?;
        Some(&self.buf[span.value.unwrap_or(span.token)])
    }

    /// Keys in buffer order, flags included.
    pub fn keys(&self) -> Vec<&str> {
        let bytes = self.buf.as_bytes();
        self.tokens()
            .map(|token| {
                let end = memchr(b'=', &bytes[token.clone()]).map_or(token.end, |i| token.start + i);
                &self.buf[token.start..end]
            })
            .collect()
    }

    /// Typed value of `key`, decoded through its header declaration.
    ///
    /// An undeclared key is returned as text together with a
    /// [`VcfError::NotDeclared`]; a declared but absent key as the zero value
    /// of its type together with a [`VcfError::NotFound`]. An absent flag is
    /// simply `false`.
    pub fn get(&self, key: &str) -> Decoded<Value> {
        let descriptor = read_header(&self.header).lookup_info(key).cloned();
        let span = self.positions(key);
        let not_found = || VcfError::NotFound {
            key: key.to_owned(),
        };
        let descriptor = match descriptor {
            Some(descriptor) => descriptor,
            None => {
                return match span {
                    None => Decoded::with_error(Value::Text(String::new()), not_found()),
                    Some(Span { value: None, .. }) => Decoded::with_error(
                        Value::Bool(true),
                        VcfError::NotDeclared {
                            key: key.to_owned(),
                        },
                    ),
                    Some(Span {
                        value: Some(range), ..
                    }) => Decoded::with_error(
                        Value::Text(self.buf[range].to_owned()),
                        VcfError::NotDeclared {
                            key: key.to_owned(),
                        },
                    ),
                };
            }
        };

        if *descriptor.kind() == FieldType::Flag {
            return match span {
                Some(Span {
                    value: Some(range), ..
                }) => Decoded::with_error(
                    Value::Bool(true),
                    VcfError::FlagWithValue {
                        key: key.to_owned(),
                        value: self.buf[range].to_owned(),
                    },
                ),
                present => Decoded::ok(Value::Bool(present.is_some())),
            };
        }

        let zero = || Value::zero(*descriptor.kind(), *descriptor.number());
        match span.and_then(|span| span.value) {
            Some(range) if !range.is_empty() => {
                codec::decode_value(&descriptor, &self.buf[range], self.alt_count, INFO_PLOIDY)
            }
            _ => Decoded::with_error(zero(), not_found()),
        }
    }

    /// Writes `value` for `key`, declaring the key if the header lacks it.
    ///
    /// `true` writes a bare flag, `false` removes the key. Keys must be
    /// non-empty without separators or whitespace; encoded values must be
    /// non-empty and free of `;`, `=`, tabs and line breaks. Anything else is
    /// refused with [`VcfError::InvalidInfoToken`] and nothing is written.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf::header::Header;
    /// use rust_vcf::info::InfoStore;
    ///
    /// let header = Header::new("4.2").into_shared();
    /// let mut info = InfoStore::new(".", header.clone(), 1);
    /// info.set("DP", 35).unwrap();
    /// info.set("DB", true).unwrap();
    /// info.set("AF", vec![0.5f32]).unwrap();
    /// assert_eq!(info.to_string(), "DP=35;DB;AF=0.5");
    /// info.set("DB", false).unwrap();
    /// info.set("DP", 7).unwrap();
    /// assert!(info.set("AA", "T;X").is_err());
    /// assert_eq!(info.to_string(), "DP=7;AF=0.5");
    /// assert!(header.read().unwrap().lookup_info("AF").is_some());
    /// ```
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) -> Result<(), VcfError> {
        let value = value.into();
        if value == Value::Bool(false) {
            self.delete(key);
            return Ok(());
        }
        let (text, flag) = match &value {
            Value::Bool(_) => (String::new(), true),
            value => (codec::encode_value(value), false),
        };
        if !valid_key(key) || (!flag && !valid_value(&text)) {
            return Err(VcfError::InvalidInfoToken {
                key: key.to_owned(),
                value: text,
            });
        }
        write_header(&self.header).register_runtime(key, &value);
        self.set_raw(key, &text);
        Ok(())
    }

    /// Writes `text` verbatim as the value of `key`; empty text writes a
    /// bare flag. The header is not consulted.
    pub fn set_raw(&mut self, key: &str, text: &str) {
        match self.positions(key) {
            Some(Span {
                value: Some(range), ..
            }) if text.is_empty() => self.buf.replace_range(range.start - 1..range.end, ""),
            Some(Span {
                value: Some(range), ..
            }) => self.buf.replace_range(range, text),
            Some(Span { value: None, .. }) if text.is_empty() => {}
            Some(Span { token, .. }) => self.buf.insert_str(token.end, &format!("={}", text)),
            None => {
                if !self.buf.is_empty() {
                    self.buf.push(';');
                }
                self.buf.push_str(key);
                if !text.is_empty() {
                    self.buf.push('=');
                    self.buf.push_str(text);
                }
            }
        }
    }

    /// Removes `key` and one adjacent separator. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let token = match self.positions(key) {
            Some(span) => span.token,
            None => return false,
        };
        let range = if token.end < self.buf.len() {
            token.start..token.end + 1
        } else if token.start > 0 {
            token.start - 1..token.end
        } else {
            token
        };
        self.buf.replace_range(range, "");
        true
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(|c: char| c == ';' || c == '=' || c.is_whitespace())
}

fn valid_value(text: &str) -> bool {
    !text.is_empty() && !text.contains(|c: char| matches!(c, ';' | '=' | '\t' | '\n' | '\r'))
}

impl fmt::Display for InfoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.buf.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.buf)
        }
    }
}

impl fmt::Debug for InfoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfoStore")
            .field("buf", &self.buf)
            .field("alt_count", &self.alt_count)
            .finish()
    }
}
