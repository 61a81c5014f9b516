use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

use crate::error::Result;

/// Pretty JSON in the project's emission format: tab indentation, `\n`
/// separators, and every float rendered with exactly eight digits after the
/// decimal point.
pub struct TabFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl TabFormatter<'_> {
    pub fn new() -> Self {
        TabFormatter {
            pretty: PrettyFormatter::with_indent(b"\t"),
        }
    }
}

impl Default for TabFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TabFormatter<'_> {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.pretty.end_object_value(writer)
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        write!(writer, "{value:.8}")
    }
}

/// Serializes `value` as tab-indented pretty JSON with a trailing newline.
pub fn write_pretty<W, T>(mut writer: W, value: &T) -> Result<()>
where
    W: Write,
    T: ?Sized + Serialize,
{
    let mut ser = Serializer::with_formatter(&mut writer, TabFormatter::new());
    value.serialize(&mut ser)?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn to_string_pretty<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let mut buffer = Vec::new();
    write_pretty(&mut buffer, value)?;
    Ok(String::from_utf8(buffer).expect("serde_json emits valid UTF-8"))
}
