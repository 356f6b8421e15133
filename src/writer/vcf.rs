use std::io::Write;

use crate::error::Result;
use crate::header::Header;
use crate::record::Record;

/// Writes the header on construction, then one text line per record.
pub struct VcfWriter<W: Write> {
    inner: W,
}

impl<W: Write> VcfWriter<W> {
    pub fn new(mut inner: W, header: &Header) -> Result<Self> {
        write!(inner, "{}", header)?;
        Ok(Self { inner })
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        writeln!(self.inner, "{}", record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
