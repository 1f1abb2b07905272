//! Minimal XML text scanner: literal matching and element-content
//! extraction. No grammar of its own beyond what the table envelope needs.

use obsdm_core::error::{Error, Result};

pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Consume `literal` at the cursor if it matches.
    pub fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, literal: &str) -> Result<()> {
        if self.eat(literal) {
            Ok(())
        } else {
            Err(Error::conversion(format!(
                "expected '{}' at offset {}",
                literal, self.pos
            )))
        }
    }

    /// Content up to (excluding) the next occurrence of `literal`, which is
    /// consumed as well.
    pub fn until(&mut self, literal: &str) -> Result<&'a str> {
        match self.rest().find(literal) {
            Some(at) => {
                let content = &self.rest()[..at];
                self.pos += at + literal.len();
                Ok(content)
            }
            None => Err(Error::conversion(format!(
                "missing '{}' after offset {}",
                literal, self.pos
            ))),
        }
    }

    /// `<?xml … ?>` declaration, mandatory.
    pub fn expect_declaration(&mut self) -> Result<()> {
        self.skip_ws();
        self.expect("<?xml")?;
        self.until("?>")?;
        Ok(())
    }

    /// Opening tag without attributes: `<name>`.
    pub fn expect_open(&mut self, name: &str) -> Result<()> {
        self.skip_ws();
        self.expect("<")?;
        self.expect(name)?;
        self.expect(">")
    }

    /// Closing tag: `</name>`.
    pub fn expect_close(&mut self, name: &str) -> Result<()> {
        self.skip_ws();
        self.expect("</")?;
        self.expect(name)?;
        self.expect(">")
    }

    /// The inner content of the next `<name>…</name>` element, if the next
    /// tag is one; leaves the cursor untouched otherwise.
    pub fn next_element(&mut self, name: &str) -> Result<Option<&'a str>> {
        self.skip_ws();
        let open = format!("<{}>", name);
        if !self.eat(&open) {
            return Ok(None);
        }
        let close = format!("</{}>", name);
        Ok(Some(self.until(&close)?))
    }

    /// An empty element `<name attr="…" …/>`; returns its attributes.
    pub fn empty_element(&mut self, name: &str) -> Result<Vec<(String, String)>> {
        self.skip_ws();
        self.expect("<")?;
        self.expect(name)?;
        let mut attrs = Vec::new();
        loop {
            self.skip_ws();
            if self.eat("/>") {
                return Ok(attrs);
            }
            let attr_name = self.until("=")?.trim().to_string();
            if attr_name.is_empty() {
                return Err(Error::conversion(format!(
                    "malformed attribute in <{}>",
                    name
                )));
            }
            self.expect("\"")?;
            let value = self.until("\"")?;
            attrs.push((attr_name, unescape(value)));
        }
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
