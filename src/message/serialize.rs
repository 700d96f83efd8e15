use std::fmt::{Display, Formatter, Result as FmtResult};

use super::tags::write_tags;
use super::types::Message;

impl Display for Message {
    /// Writes the message back in wire format (without CRLF).
    ///
    /// The last param is written as a trailing param when it is empty,
    /// contains a space or starts with `:`.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if !self.tags.is_empty() {
            write_tags(f, &self.tags)?;
            f.write_str(" ")?;
        }
        if let Some(source) = &self.source {
            write!(f, ":{} ", source)?;
        }
        f.write_str(self.command.as_str())?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
