use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{ErrorAggregator, VcfError, DEFAULT_ERROR_CAPACITY};
use crate::header::{read_header, write_header, Header, SharedHeader};
use crate::record::Variant;
use crate::types::{FieldDescriptor, FieldNumber, FieldType};

#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Keep sample columns as text until [`VcfReader::parse_samples`].
    pub lazy_samples: bool,
    /// Distinct errors kept before the oldest are dropped.
    pub error_capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            lazy_samples: false,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

/// Streams [`Variant`]s out of VCF text.
///
/// Problems inside records never stop the stream; they are collected and
/// can be inspected with [`VcfReader::error`] at any point.
pub struct VcfReader<R: BufRead> {
    header: SharedHeader,
    inner: R,
    buf: Vec<u8>,
    line_number: u64,
    options: ReaderOptions,
    errors: ErrorAggregator,
}

impl VcfReader<BufReader<Box<dyn Read>>> {
    /// Opens a plain or compressed file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let (reader, format) = niffler::from_path(path)?;
        log::debug!("input compression: {:?}", format);
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> VcfReader<R> {
    pub fn new(inner: R) -> Result<Self, VcfError> {
        Self::with_options(inner, ReaderOptions::default())
    }

    /// Reads the header block. Fails if the first non-blank line is not a
    /// `##fileformat` line, if a header line is neither `##...` nor
    /// `#CHROM...`, or if the `#CHROM` line is malformed or missing.
    pub fn with_options(inner: R, options: ReaderOptions) -> Result<Self, VcfError> {
        let mut reader = VcfReader {
            header: Header::default().into_shared(),
            inner,
            buf: Vec::new(),
            line_number: 0,
            options,
            errors: ErrorAggregator::with_capacity(options.error_capacity),
        };

        let mut header = loop {
            let line = match reader.next_line()? {
                Some(line) => line,
                None => {
                    return Err(VcfError::MissingFileFormat {
                        line: String::new(),
                    })
                }
            };
            if !line.trim().is_empty() {
                break Header::from_file_format_line(&line)?;
            }
        };

        loop {
            let line = match reader.next_line()? {
                Some(line) => line,
                None => return Err(VcfError::MalformedColumnHeader { columns: 0 }),
            };
            if line.starts_with("#CHROM") {
                header.set_column_header(&line)?;
                break;
            } else if line.starts_with("##") {
                if let Err(error) = header.parse_line(&line) {
                    reader.errors.add(error, reader.line_number);
                }
            } else if !line.trim().is_empty() {
                return Err(VcfError::UnexpectedHeaderLine {
                    line_number: reader.line_number,
                    line,
                });
            }
        }
        log::debug!(
            "VCFv{} header: {} INFO, {} FORMAT, {} FILTER, {} contigs, {} samples",
            header.file_format(),
            header.infos().len(),
            header.formats().len(),
            header.filters().len(),
            header.contigs().len(),
            header.sample_names().len()
        );
        reader.header = header.into_shared();
        Ok(reader)
    }

    // next line without its terminator, invalid UTF-8 replaced
    fn next_line(&mut self) -> Result<Option<String>, VcfError> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        while let Some(b'\n') | Some(b'\r') = self.buf.last() {
            self.buf.pop();
        }
        Ok(Some(match String::from_utf8_lossy(&self.buf) {
            Cow::Borrowed(line) => line.to_owned(),
            Cow::Owned(line) => line,
        }))
    }

    pub fn header(&self) -> &SharedHeader {
        &self.header
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// The collected errors, `None` while there are none.
    pub fn error(&self) -> Option<&ErrorAggregator> {
        if self.errors.is_empty() {
            None
        } else {
            Some(&self.errors)
        }
    }

    pub fn errors(&self) -> &ErrorAggregator {
        &self.errors
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Decodes the samples of a variant read lazily, recording problems
    /// against its line.
    pub fn parse_samples(&mut self, variant: &mut Variant) {
        let errors = variant.parse_samples();
        self.errors.extend(errors, variant.line_number());
    }

    pub fn add_info_to_header(&self, id: &str, number: FieldNumber, kind: FieldType, description: &str) {
        write_header(&self.header).add_info(FieldDescriptor::new(id, number, kind, description));
    }

    pub fn add_format_to_header(&self, id: &str, number: FieldNumber, kind: FieldType, description: &str) {
        write_header(&self.header).add_format(FieldDescriptor::new(id, number, kind, description));
    }

    /// Declared type of an INFO key.
    pub fn header_type(&self, id: &str) -> Option<FieldType> {
        read_header(&self.header).lookup_info(id).map(|d| *d.kind())
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Variant;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(error) => {
                    self.errors.add(error, self.line_number);
                    return None;
                }
            };
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match Variant::decode(&self.header, &fields, self.line_number, self.options.lazy_samples) {
                Ok(decoded) => {
                    self.errors.extend(decoded.errors, self.line_number);
                    return Some(decoded.value);
                }
                Err(error) => self.errors.add(error, self.line_number),
            }
        }
    }
}
