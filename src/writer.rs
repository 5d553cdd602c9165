use std::io::{self, Write};

use itertools::Itertools;

use crate::header::Header;
use crate::record::Variant;
use crate::types::HeaderLineKind;

/// Writes a header block followed by records.
pub struct VcfWriter<W: Write> {
    inner: W,
}

impl<W: Write> VcfWriter<W> {
    /// Writes `header` immediately. Later changes to the header are not
    /// reflected in the output.
    pub fn new(mut inner: W, header: &Header) -> io::Result<Self> {
        write_header_block(&mut inner, header)?;
        Ok(VcfWriter { inner })
    }

    pub fn write_variant(&mut self, variant: &Variant) -> io::Result<()> {
        writeln!(self.inner, "{}", variant)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Renders `header` in canonical order: file format, contigs, SAMPLE lines
/// by ID, pedigrees, FILTER, INFO and FORMAT declarations by ID, remaining
/// meta lines, then the `#CHROM` line.
pub fn write_header_block<W: Write>(w: &mut W, header: &Header) -> io::Result<()> {
    writeln!(w, "##fileformat=VCFv{}", header.file_format())?;
    for contig in header.contigs() {
        let id = contig.get("ID").map(String::as_str).unwrap_or_default();
        let rest = contig
            .iter()
            .filter(|(key, _)| key.as_str() != "ID")
            .map(|(key, value)| format!(",{}={}", key, value))
            .join("");
        writeln!(w, "##contig=<ID={}{}>", id, rest)?;
    }
    for (_, line) in header.samples().iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        writeln!(w, "{}", line)?;
    }
    for line in header.pedigrees() {
        writeln!(w, "{}", line)?;
    }
    for (id, description) in header.filters().iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        writeln!(w, "##FILTER=<ID={},Description=\"{}\">", id, description)?;
    }
    for descriptor in header.infos().values().sorted_by(|a, b| a.id().cmp(b.id())) {
        writeln!(w, "{}", descriptor.to_header_line(HeaderLineKind::Info))?;
    }
    for descriptor in header.formats().values().sorted_by(|a, b| a.id().cmp(b.id())) {
        writeln!(w, "{}", descriptor.to_header_line(HeaderLineKind::Format))?;
    }
    for line in header.extras() {
        writeln!(w, "{}", line)?;
    }
    write!(w, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;
    if !header.sample_names().is_empty() {
        write!(w, "\tFORMAT\t{}", header.sample_names().join("\t"))?;
    }
    writeln!(w)
}
