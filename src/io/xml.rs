//! Minimal XML element scanner for the map file formats.
//!
//! The persisted formats are line-oriented XML with a fixed element
//! vocabulary: open tags with attributes, self-closing tags, and close
//! tags. Attribute values are plain numbers, so no entity handling is
//! required. The scanner is strict: the caller states which element it
//! expects next, mirroring the tag-match protocol of the writers.

use anyhow::{Context, Result, bail};

/// One scanned element: `<Name k="v" ...>` or `<Name k="v" .../>`.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

impl Element {
    /// The raw value of `name`.
    pub fn attribute(&self, name: &str) -> Result<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .with_context(|| format!("<{}> is missing attribute {name}", self.name))
    }

    /// `name` parsed as an unsigned integer.
    pub fn integer_attribute(&self, name: &str) -> Result<u32> {
        let value = self.attribute(name)?;
        value
            .parse()
            .with_context(|| format!("<{} {name}=\"{value}\"> is not an integer", self.name))
    }

    /// `name` parsed as a float.
    pub fn float_attribute(&self, name: &str) -> Result<f64> {
        let value = self.attribute(name)?;
        value
            .parse()
            .with_context(|| format!("<{} {name}=\"{value}\"> is not a number", self.name))
    }
}

/// Strict forward-only scanner over an XML document.
pub struct XmlScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> XmlScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Scan the next element and require it to be named `name`.
    pub fn expect_element(&mut self, name: &str) -> Result<Element> {
        let element = self.scan_element()?;
        if element.name != name {
            bail!("expected <{name}>, found <{}>", element.name);
        }
        Ok(element)
    }

    /// Scan a close tag `</name>`.
    pub fn expect_close(&mut self, name: &str) -> Result<()> {
        self.skip_whitespace();
        let close = format!("</{name}>");
        if !self.rest().starts_with(&close) {
            bail!("expected {close} at offset {}", self.pos);
        }
        self.pos += close.len();
        Ok(())
    }

    /// True once only whitespace remains.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn take(&mut self, expected: char) -> Result<()> {
        match self.rest().chars().next() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            found => bail!(
                "expected '{expected}' at offset {}, found {found:?}",
                self.pos
            ),
        }
    }

    fn scan_name(&mut self) -> Result<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            bail!("expected a name at offset {}", self.pos);
        }
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn scan_element(&mut self) -> Result<Element> {
        self.skip_whitespace();
        self.take('<')?;
        let name = self.scan_name()?;

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(Element {
                    name,
                    attributes,
                    self_closing: true,
                });
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(Element {
                    name,
                    attributes,
                    self_closing: false,
                });
            }

            let key = self
                .scan_name()
                .with_context(|| format!("in attributes of <{name}>"))?;
            self.take('=')?;
            self.take('"')?;
            let rest = self.rest();
            let end = rest
                .find('"')
                .with_context(|| format!("unterminated value for {key} in <{name}>"))?;
            let value = rest[..end].to_string();
            self.pos += end + 1;
            attributes.push((key, value));
        }
    }
}
