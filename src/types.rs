use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use strum::{Display, EnumString};

use crate::parser;

/// Missing value marker for Integer elements (same value BCF reserves).
pub const MISSING_INTEGER: i32 = i32::MIN;
/// Missing value marker for Float elements, a signalling NaN (same bits BCF reserves).
pub const MISSING_FLOAT: u32 = 0x7F80_0001;

pub fn missing_float() -> f32 {
    f32::from_bits(MISSING_FLOAT)
}

pub fn is_missing_float(value: f32) -> bool {
    value.to_bits() == MISSING_FLOAT
}

/// Declared primitive type of an INFO or FORMAT field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum FieldType {
    Integer,
    Float,
    Flag,
    Character,
    String,
    Unknown,
}

/// Declared cardinality of an INFO or FORMAT field.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum FieldNumber {
    /// A fixed number of values, `Number=<digits>`.
    Count(usize),
    /// One value per alternate allele, `Number=A`.
    AlternateAlleles,
    /// One value per allele including the reference, `Number=R`.
    Alleles,
    /// One value per possible genotype, `Number=G`.
    Genotypes,
    /// Unconstrained, `Number=.`.
    Unknown,
}

impl FromStr for FieldNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parser::field_number(s) {
            Ok(("", number)) => Ok(number),
            _ => Err(format!("invalid Number '{}'", s)),
        }
    }
}

impl fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNumber::Count(n) => write!(f, "{}", n),
            FieldNumber::AlternateAlleles => f.write_str("A"),
            FieldNumber::Alleles => f.write_str("R"),
            FieldNumber::Genotypes => f.write_str("G"),
            FieldNumber::Unknown => f.write_str("."),
        }
    }
}

/// The class of a structured `##<kind>=<...>` header line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum HeaderLineKind {
    #[strum(serialize = "INFO")]
    Info,
    #[strum(serialize = "FORMAT")]
    Format,
    #[strum(serialize = "FILTER")]
    Filter,
    #[strum(serialize = "contig")]
    Contig,
    #[strum(serialize = "SAMPLE")]
    Sample,
    #[strum(serialize = "PEDIGREE")]
    Pedigree,
}

/// Header metadata for one INFO or FORMAT key.
#[derive(Debug, Getters, Clone, PartialEq)]
#[getset(get = "pub")]
pub struct FieldDescriptor {
    id: String,
    number: FieldNumber,
    kind: FieldType,
    description: String,
    // Source, Version, ... in declaration order
    additional: IndexMap<String, String>,
}

impl FieldDescriptor {
    pub fn new<S: Into<String>, D: Into<String>>(
        id: S,
        number: FieldNumber,
        kind: FieldType,
        description: D,
    ) -> Self {
        FieldDescriptor {
            id: id.into(),
            number,
            kind,
            description: description.into(),
            additional: IndexMap::new(),
        }
    }

    /// Descriptor synthesized for a key first seen through a write.
    pub fn for_value(id: &str, value: &Value) -> Self {
        let (number, kind) = match value {
            Value::Bool(_) => (FieldNumber::Count(0), FieldType::Flag),
            Value::Int(_) => (FieldNumber::Count(1), FieldType::Integer),
            Value::Float(_) => (FieldNumber::Count(1), FieldType::Float),
            Value::Text(_) => (FieldNumber::Count(1), FieldType::Character),
            Value::IntList(_) => (FieldNumber::Unknown, FieldType::Integer),
            Value::FloatList(_) => (FieldNumber::Unknown, FieldType::Float),
            Value::TextList(_) => (FieldNumber::Unknown, FieldType::String),
        };
        FieldDescriptor::new(id, number, kind, "")
    }

    pub fn to_header_line(&self, line_kind: HeaderLineKind) -> String {
        let mut line = format!(
            "##{}=<ID={},Number={},Type={},Description=\"{}\"",
            line_kind, self.id, self.number, self.kind, self.description
        );
        for (key, value) in &self.additional {
            line.push_str(&format!(",{}={}", key, value));
        }
        line.push('>');
        line
    }
}

impl<'a> TryFrom<Vec<(&'a str, &'a str)>> for FieldDescriptor {
    type Error = String;

    fn try_from(data: Vec<(&'a str, &'a str)>) -> Result<Self, Self::Error> {
        let mut h: IndexMap<_, _> = data.into_iter().collect();
        // extra attributes stay as written, quotes included
        let mut required = |key: &str| {
            h.shift_remove(key)
                .map(parser::unquote)
                .ok_or_else(|| format!("{} is mandatory", key))
        };
        let id = required("ID")?;
        let number = required("Number")?.parse()?;
        let kind = required("Type")?;
        let kind = FieldType::from_str(kind).map_err(|_| format!("unknown Type '{}'", kind))?;
        let description = required("Description")?;
        let mut descriptor = FieldDescriptor::new(id, number, kind, description);
        descriptor.additional = h
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Ok(descriptor)
    }
}

/// A decoded INFO or FORMAT value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Text(String),
    IntList(Vec<i32>),
    FloatList(Vec<f32>),
    TextList(Vec<String>),
}

impl Value {
    /// The zero value a declared type decodes to when the key carries no data.
    pub fn zero(kind: FieldType, number: FieldNumber) -> Self {
        let scalar = matches!(number, FieldNumber::Count(0) | FieldNumber::Count(1));
        match (kind, scalar) {
            (FieldType::Flag, _) => Value::Bool(false),
            (FieldType::Integer, true) => Value::Int(0),
            (FieldType::Integer, false) => Value::IntList(Vec::new()),
            (FieldType::Float, true) => Value::Float(0.0),
            (FieldType::Float, false) => Value::FloatList(Vec::new()),
            (_, true) => Value::Text(String::new()),
            (_, false) => Value::TextList(Vec::new()),
        }
    }

    pub fn integer(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::IntList(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn integers(&self) -> Option<&[i32]> {
        match self {
            Value::IntList(v) => Some(v.as_slice()),
            Value::Int(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::FloatList(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn floats(&self) -> Option<&[f32]> {
        match self {
            Value::FloatList(v) => Some(v.as_slice()),
            Value::Float(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn flag(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            Value::TextList(v) => v.first().map(String::as_str),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::encode_value(self))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntList(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::FloatList(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextList(v)
    }
}

/// Values substituted for `.` or empty list elements while decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Missing {
    pub integer: i32,
    pub float: f32,
}

impl Default for Missing {
    fn default() -> Self {
        Missing {
            integer: MISSING_INTEGER,
            float: missing_float(),
        }
    }
}
