//! Named Binary Tag tree.
//!
//! Tags are a closed sum type: a [`Tag`] is an optional name plus a [`Value`],
//! composite values own their children and trees are acyclic.
use crate::error::CompoundTagError;
use std::borrow::Cow;

pub mod decode;

pub use decode::{decode, parse_root};

/// Type id of every tag kind, as stored on disk.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
}

impl TagKind {
    /// Returns kind for type id or `None` if id is not known.
    pub fn from_id(type_id: u8) -> Option<TagKind> {
        use TagKind::*;

        let kind = match type_id {
            0 => End,
            1 => Byte,
            2 => Short,
            3 => Int,
            4 => Long,
            5 => Float,
            6 => Double,
            7 => ByteArray,
            8 => String,
            9 => List,
            10 => Compound,
            11 => IntArray,
            _ => return None,
        };

        Some(kind)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    /// Modified UTF-8 is kept as raw bytes.
    String(Vec<u8>),
    List(List),
    Compound(Compound),
    IntArray(Vec<i32>),
}

impl Value {
    /// Zero value of a kind, produced whenever decoding fails.
    pub fn zero(kind: TagKind) -> Value {
        match kind {
            TagKind::End => Value::End,
            TagKind::Byte => Value::Byte(0),
            TagKind::Short => Value::Short(0),
            TagKind::Int => Value::Int(0),
            TagKind::Long => Value::Long(0),
            TagKind::Float => Value::Float(0.0),
            TagKind::Double => Value::Double(0.0),
            TagKind::ByteArray => Value::ByteArray(Vec::new()),
            TagKind::String => Value::String(Vec::new()),
            TagKind::List => Value::List(List::new(TagKind::End.id())),
            TagKind::Compound => Value::Compound(Compound::new()),
            TagKind::IntArray => Value::IntArray(Vec::new()),
        }
    }

    pub fn kind(&self) -> TagKind {
        match self {
            Value::End => TagKind::End,
            Value::Byte(_) => TagKind::Byte,
            Value::Short(_) => TagKind::Short,
            Value::Int(_) => TagKind::Int,
            Value::Long(_) => TagKind::Long,
            Value::Float(_) => TagKind::Float,
            Value::Double(_) => TagKind::Double,
            Value::ByteArray(_) => TagKind::ByteArray,
            Value::String(_) => TagKind::String,
            Value::List(_) => TagKind::List,
            Value::Compound(_) => TagKind::Compound,
            Value::IntArray(_) => TagKind::IntArray,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Value::Compound(compound) => Some(compound),
            _ => None,
        }
    }
}

/// Node of the tree. Compound members are named, list elements are not.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: Option<String>,
    value: Value,
}

impl Tag {
    pub fn new(name: Option<String>, value: Value) -> Tag {
        Tag { name, value }
    }

    pub fn anonymous(value: Value) -> Tag {
        Tag { name: None, value }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> TagKind {
        self.value.kind()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Homogeneous sequence of anonymous values.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// Declared element type id, kept even when it is not a known kind.
    element_type_id: u8,
    values: Vec<Value>,
}

impl List {
    pub fn new(element_type_id: u8) -> List {
        List {
            element_type_id,
            values: Vec::new(),
        }
    }

    pub(crate) fn with_values(element_type_id: u8, values: Vec<Value>) -> List {
        List {
            element_type_id,
            values,
        }
    }

    pub fn element_type_id(&self) -> u8 {
        self.element_type_id
    }

    pub fn element_kind(&self) -> Option<TagKind> {
        TagKind::from_id(self.element_type_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

/// Ordered sequence of named tags.
///
/// Lookup returns the first member with a matching name, duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    tags: Vec<Tag>,
}

macro_rules! copy_getter {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self, name: &str) -> Result<$ty, CompoundTagError> {
            match self.get_value(name)? {
                Value::$variant(value) => Ok(*value),
                value => Err(CompoundTagError::wrong_type(name, value.kind())),
            }
        }
    };
}

macro_rules! ref_getter {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self, name: &str) -> Result<&$ty, CompoundTagError> {
            match self.get_value(name)? {
                Value::$variant(value) => Ok(value),
                value => Err(CompoundTagError::wrong_type(name, value.kind())),
            }
        }
    };
}

impl Compound {
    pub fn new() -> Compound {
        Compound { tags: Vec::new() }
    }

    pub(crate) fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns first member with the given name.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == Some(name))
    }

    fn get_value(&self, name: &str) -> Result<&Value, CompoundTagError> {
        self.get(name)
            .map(Tag::value)
            .ok_or_else(|| CompoundTagError::not_found(name))
    }

    copy_getter!(get_i8, Byte, i8);
    copy_getter!(get_i16, Short, i16);
    copy_getter!(get_i32, Int, i32);
    copy_getter!(get_i64, Long, i64);
    copy_getter!(get_f32, Float, f32);
    copy_getter!(get_f64, Double, f64);

    ref_getter!(get_list, List, List);
    ref_getter!(get_compound, Compound, Compound);

    pub fn get_i8_vec(&self, name: &str) -> Result<&[i8], CompoundTagError> {
        match self.get_value(name)? {
            Value::ByteArray(value) => Ok(value.as_slice()),
            value => Err(CompoundTagError::wrong_type(name, value.kind())),
        }
    }

    pub fn get_i32_vec(&self, name: &str) -> Result<&[i32], CompoundTagError> {
        match self.get_value(name)? {
            Value::IntArray(value) => Ok(value.as_slice()),
            value => Err(CompoundTagError::wrong_type(name, value.kind())),
        }
    }

    /// Raw string bytes.
    pub fn get_string_bytes(&self, name: &str) -> Result<&[u8], CompoundTagError> {
        match self.get_value(name)? {
            Value::String(value) => Ok(value.as_slice()),
            value => Err(CompoundTagError::wrong_type(name, value.kind())),
        }
    }

    /// String member decoded lossily as UTF-8.
    pub fn get_str(&self, name: &str) -> Result<Cow<'_, str>, CompoundTagError> {
        self.get_string_bytes(name).map(String::from_utf8_lossy)
    }
}
