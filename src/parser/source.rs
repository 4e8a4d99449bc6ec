//! Data sources shared by meshes, controllers and animations
//!
//! A `<source>` holds one typed array and an accessor describing how the
//! array is grouped into elements. Consumers look sources up by id and
//! read them through [`Source::floats`] or [`Source::names`].

use super::numbers::{ListParser, value_count};
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::error::{Error, Result};
use crate::grammar::ElementKind;

/// Parsed content of a typed array
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArrayData {
    Float(Vec<f64>),
    Name(Vec<String>),
    /// `<IDREF_array>`: names are element ids
    IdRef(Vec<String>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Float(v) => v.len(),
            ArrayData::Name(v) | ArrayData::IdRef(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    /// Keep `len` values starting at `start`
    fn window(&mut self, start: usize, len: usize) {
        fn cut<T>(values: &mut Vec<T>, start: usize, len: usize) {
            values.drain(..start);
            values.truncate(len);
        }
        match self {
            ArrayData::Float(v) => cut(v, start, len),
            ArrayData::Name(v) | ArrayData::IdRef(v) => cut(v, start, len),
            ArrayData::Int(v) => cut(v, start, len),
            ArrayData::Bool(v) => cut(v, start, len),
        }
    }
}

/// `<param>` content
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ParamData {
    pub reference: Option<String>,
}

/// `<accessor>` content
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Accessor {
    pub count: usize,
    pub offset: usize,
    pub stride: usize,
}

/// A finished `<source>`, windowed by its accessor
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Source {
    pub id: String,
    pub data: ArrayData,
    /// Values per element
    pub stride: usize,
}

impl Source {
    /// Float values, or an error naming `consumer`
    pub fn floats(&self, consumer: &str) -> Result<&[f64]> {
        match &self.data {
            ArrayData::Float(values) => Ok(values),
            _ => Err(Error::InvalidModel(format!(
                "source '{}' used as {} must hold a <float_array>",
                self.id, consumer
            ))),
        }
    }

    /// Name or IDREF values, or an error naming `consumer`
    pub fn names(&self, consumer: &str) -> Result<&[String]> {
        match &self.data {
            ArrayData::Name(values) | ArrayData::IdRef(values) => Ok(values),
            _ => Err(Error::InvalidModel(format!(
                "source '{}' used as {} must hold a <Name_array> or <IDREF_array>",
                self.id, consumer
            ))),
        }
    }

    /// Number of accessor elements
    pub fn count(&self) -> usize {
        self.data.len() / self.stride.max(1)
    }
}

/// Find a source by the `#id` reference of an input
pub(crate) fn find_source<'s>(sources: &'s [Source], reference: &str) -> Result<&'s Source> {
    let id = reference.trim().trim_start_matches('#');
    sources
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| Error::InvalidModel(format!("input refers to unknown source '{}'", reference)))
}

/// `<input>` content, shared or unshared
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Input {
    pub semantic: String,
    pub source: String,
    pub offset: usize,
    pub set: Option<u32>,
}

pub(crate) struct SourceParser {
    id: String,
    data: Option<ArrayData>,
    accessor: Option<Accessor>,
}

impl SourceParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            id: start.required("id")?.to_string(),
            data: None,
            accessor: None,
        })
    }
}

impl ElementParser for SourceParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Array(data) => self.data = Some(data),
            Parsed::Accessor(accessor) => self.accessor = Some(accessor),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let mut data = self.data.unwrap_or(ArrayData::Float(Vec::new()));
        let stride = match self.accessor {
            Some(accessor) => {
                let stride = accessor.stride.max(1);
                let wanted = value_count("accessor", accessor.count, stride)?;
                let end = accessor.offset.checked_add(wanted);
                if end.is_none_or(|end| end > data.len()) {
                    return Err(Error::InvalidModel(format!(
                        "accessor of source '{}' reads {} values from offset {}, array holds {}",
                        self.id,
                        wanted,
                        accessor.offset,
                        data.len()
                    )));
                }
                if accessor.offset > 0 || wanted < data.len() {
                    data.window(accessor.offset, wanted);
                }
                stride
            }
            None => 1,
        };
        Ok(Parsed::Source(Source {
            id: self.id,
            data,
            stride,
        }))
    }
}

enum ArrayValues {
    Float(ListParser<f64>),
    Name(ListParser<String>),
    IdRef(ListParser<String>),
    Int(ListParser<i64>),
    Bool(ListParser<bool>),
}

/// `<float_array>`, `<Name_array>`, `<IDREF_array>`, `<int_array>`, `<bool_array>`
pub(crate) struct ArrayParser {
    name: String,
    count: usize,
    values: ArrayValues,
}

/// Upper bound for preallocation, whatever `count` claims
const MAX_PREALLOCATED: usize = 1 << 20;

impl ArrayParser {
    pub fn new(kind: ElementKind, start: &ElementStart<'_>) -> Result<Self> {
        let count = start
            .attr_usize("count")?
            .ok_or_else(|| Error::missing_attribute(start.name, "count"))?;
        let capacity = count.min(MAX_PREALLOCATED);
        let values = match (kind, start.name) {
            (ElementKind::FloatArray, _) => {
                ArrayValues::Float(ListParser::with_capacity("float_array", capacity))
            }
            (ElementKind::IntArray, _) => {
                ArrayValues::Int(ListParser::with_capacity("int_array", capacity))
            }
            (ElementKind::BoolArray, _) => {
                ArrayValues::Bool(ListParser::with_capacity("bool_array", capacity))
            }
            (_, "IDREF_array") => {
                ArrayValues::IdRef(ListParser::with_capacity("IDREF_array", capacity))
            }
            _ => ArrayValues::Name(ListParser::with_capacity("Name_array", capacity)),
        };
        Ok(Self {
            name: start.name.to_string(),
            count,
            values,
        })
    }
}

impl ElementParser for ArrayParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match &mut self.values {
            ArrayValues::Float(p) => p.feed(text),
            ArrayValues::Name(p) | ArrayValues::IdRef(p) => p.feed(text),
            ArrayValues::Int(p) => p.feed(text),
            ArrayValues::Bool(p) => p.feed(text),
        }
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let data = match self.values {
            ArrayValues::Float(p) => ArrayData::Float(p.finish()?),
            ArrayValues::Name(p) => ArrayData::Name(p.finish()?),
            ArrayValues::IdRef(p) => ArrayData::IdRef(p.finish()?),
            ArrayValues::Int(p) => ArrayData::Int(p.finish()?),
            ArrayValues::Bool(p) => ArrayData::Bool(p.finish()?),
        };
        if data.len() != self.count {
            return Err(Error::InvalidModel(format!(
                "<{}> declares count=\"{}\" but holds {} values",
                self.name,
                self.count,
                data.len()
            )));
        }
        Ok(Parsed::Array(data))
    }
}

pub(crate) struct AccessorParser {
    accessor: Accessor,
}

impl AccessorParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            accessor: Accessor {
                count: start.attr_usize("count")?.unwrap_or(0),
                offset: start.attr_usize("offset")?.unwrap_or(0),
                stride: start.attr_usize("stride")?.unwrap_or(1),
            },
        })
    }
}

impl ElementParser for AccessorParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Accessor(self.accessor))
    }
}

pub(crate) struct InputParser {
    input: Input,
}

impl InputParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        let set = match start.attr("set") {
            Some(value) => Some(value.trim().parse::<u32>().map_err(|_| {
                Error::parse_error_with_context("input@set", value, "non-negative integer")
            })?),
            None => None,
        };
        Ok(Self {
            input: Input {
                semantic: start.required("semantic")?.to_string(),
                source: start.required("source")?.to_string(),
                offset: start.attr_usize("offset")?.unwrap_or(0),
                set,
            },
        })
    }
}

impl ElementParser for InputParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Input(self.input))
    }
}

/// `<p>`, `<vcount>`, `<v>`
pub(crate) struct IndexArrayParser {
    name: String,
    values: ListParser<i64>,
}

impl IndexArrayParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        let label = match start.name {
            "vcount" => "vcount",
            "v" => "v",
            _ => "p",
        };
        Self {
            name: start.name.to_string(),
            values: ListParser::new(label),
        }
    }
}

impl ElementParser for IndexArrayParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.values.feed(text)
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Indices {
            name: self.name,
            values: self.values.finish()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, data: ArrayData, stride: usize) -> Source {
        Source {
            id: id.to_string(),
            data,
            stride,
        }
    }

    #[test]
    fn test_window() {
        let mut data = ArrayData::Float(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        data.window(1, 3);
        assert_eq!(data, ArrayData::Float(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_source_count_uses_stride() {
        let s = source("pos", ArrayData::Float(vec![0.0; 9]), 3);
        assert_eq!(s.count(), 3);
        let empty = source("pos", ArrayData::Float(Vec::new()), 3);
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn test_typed_access() {
        let names = source("joints", ArrayData::IdRef(vec!["hip".into()]), 1);
        assert_eq!(names.names("JOINT").unwrap(), &["hip".to_string()]);
        assert!(names.floats("WEIGHT").is_err());
    }

    #[test]
    fn test_find_source() {
        let sources = vec![
            source("a", ArrayData::Int(vec![1]), 1),
            source("b", ArrayData::Bool(vec![true]), 1),
        ];
        assert_eq!(find_source(&sources, "#b").unwrap().id, "b");
        assert!(find_source(&sources, "#c").is_err());
    }
}
