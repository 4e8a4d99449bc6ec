//! Small parsers shared by several element families

use super::numbers::{ListParser, parse_float};
use super::source::ParamData;
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::error::{Error, Result};
use crate::model::Color;

/// Accepts and drops everything; used for libraries and `<extra>`
pub(crate) struct IgnoreParser;

impl ElementParser for IgnoreParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::None)
    }
}

/// Hands the last child result up unchanged
///
/// Used for wrappers such as `<technique_common>` that add nothing of
/// their own.
#[derive(Default)]
pub(crate) struct PassThroughParser {
    result: Option<Parsed>,
}

impl ElementParser for PassThroughParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.result = Some(child);
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(self.result.unwrap_or(Parsed::None))
    }
}

/// Leaf element whose trimmed text goes to the parent
pub(crate) struct TextFieldParser {
    name: String,
    value: String,
}

impl TextFieldParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            name: start.name.to_string(),
            value: String::new(),
        }
    }
}

impl ElementParser for TextFieldParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.value.push_str(text);
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Text {
            name: self.name,
            value: self.value.trim().to_string(),
        })
    }
}

/// `<color>`: three or four floats
pub(crate) struct ColorParser {
    values: ListParser<f64>,
}

impl Default for ColorParser {
    fn default() -> Self {
        Self {
            values: ListParser::with_capacity("color", 4),
        }
    }
}

impl ElementParser for ColorParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.values.feed(text)
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        let values = self.values.finish()?;
        Color::from_slice(&values).map(Parsed::Color).ok_or_else(|| {
            Error::InvalidModel(format!("<color> holds {} values, expected 3 or 4", values.len()))
        })
    }
}

/// `<float>` and other single number elements
pub(crate) struct FloatParser {
    name: String,
    text: String,
}

impl FloatParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            name: start.name.to_string(),
            text: String::new(),
        }
    }
}

impl ElementParser for FloatParser {
    fn text(&mut self, text: &str, _ctx: &mut LoadContext<'_>) -> Result<()> {
        self.text.push_str(text);
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        parse_float(&self.name, &self.text).map(Parsed::Float)
    }
}

/// `<param>`; only the `ref` indirection is of interest
pub(crate) struct ParamParser {
    param: ParamData,
}

impl ParamParser {
    pub fn new(start: &ElementStart<'_>) -> Self {
        Self {
            param: ParamData {
                reference: start.attr_string("ref"),
            },
        }
    }
}

impl ElementParser for ParamParser {
    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Param(self.param))
    }
}
