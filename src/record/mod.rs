mod genotype;
mod normalize;
mod split;
mod sv;

use std::fmt;

use getset::{CopyGetters, Getters, MutGetters, Setters};
use itertools::Itertools;

use crate::error::{Decoded, VcfError};
use crate::header::{read_header, SharedHeader};
use crate::info::InfoStore;
use crate::types::Value;

pub use genotype::{decode_sample, SampleGenotype};
pub use normalize::{left_align, left_trim};
pub use split::{biallelic_genotype, genotype_index, split_alts};
pub use sv::ConfidenceInterval;

/// Columns every data line must have, FORMAT and samples being optional.
pub const MANDATORY_COLUMNS: usize = 8;

pub trait Record {
    fn chrom(&self) -> &str;

    fn pos(&self) -> u64;

    fn ref_allele(&self) -> &str;

    fn alt_alleles(&self) -> &[String];

    fn qual(&self) -> Option<f32>;

    fn filters(&self) -> Vec<&str>;

    fn info_field(&self, tag: &str) -> Decoded<Value>;

    fn format_field(&self, tag: &str) -> Vec<Option<&str>>;
}

/// Sample columns, either as read or decoded.
#[derive(Debug, Clone)]
pub enum Samples {
    Raw(Vec<String>),
    Parsed(Vec<SampleGenotype>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Raw(raw) => raw.len(),
            Samples::Parsed(parsed) => parsed.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One data line of a VCF file.
#[derive(Clone, CopyGetters, Getters, MutGetters, Setters)]
pub struct Variant {
    #[getset(set = "pub")]
    pub(crate) chrom: String,
    #[getset(set = "pub")]
    pub(crate) pos: u64,
    #[getset(get = "pub", set = "pub")]
    pub(crate) id: String,
    #[getset(set = "pub")]
    pub(crate) ref_allele: String,
    pub(crate) alt_alleles: Vec<String>,
    #[getset(set = "pub")]
    pub(crate) qual: Option<f32>,
    #[getset(get = "pub", set = "pub")]
    pub(crate) filter: String,
    #[getset(get = "pub", get_mut = "pub")]
    pub(crate) info: InfoStore,
    #[getset(get = "pub")]
    pub(crate) format: Vec<String>,
    pub(crate) samples: Samples,
    #[getset(get_copy = "pub")]
    pub(crate) line_number: u64,
    pub(crate) header: SharedHeader,
}

impl Variant {
    /// A site with no INFO, FILTER `.` and no samples.
    pub fn new<C: Into<String>, R: Into<String>>(
        header: SharedHeader,
        chrom: C,
        pos: u64,
        ref_allele: R,
        alt_alleles: Vec<String>,
    ) -> Self {
        Variant {
            chrom: chrom.into(),
            pos,
            id: ".".to_owned(),
            ref_allele: ref_allele.into(),
            info: InfoStore::new(".", header.clone(), alt_alleles.len()),
            alt_alleles,
            qual: None,
            filter: ".".to_owned(),
            format: Vec::new(),
            samples: Samples::Parsed(Vec::new()),
            line_number: 0,
            header,
        }
    }

    /// Decodes the tab-separated columns of one data line.
    ///
    /// Fails only when fewer than the eight mandatory columns are present;
    /// every other problem is returned alongside a best-effort record.
    /// With `lazy_samples` the sample columns are kept as text until
    /// [`Variant::parse_samples`] is called.
    pub fn decode(
        header: &SharedHeader,
        fields: &[&str],
        line_number: u64,
        lazy_samples: bool,
    ) -> Result<Decoded<Variant>, VcfError> {
        if fields.len() < MANDATORY_COLUMNS {
            return Err(VcfError::TooFewFields {
                expected: MANDATORY_COLUMNS,
                found: fields.len(),
            });
        }
        let mut errors = Vec::new();
        let pos = fields[1].parse().unwrap_or_else(|_| {
            errors.push(VcfError::InvalidNumber {
                field: "POS",
                value: fields[1].to_owned(),
            });
            0
        });
        let qual = match fields[5] {
            "." => None,
            text => match text.parse() {
                Ok(qual) => Some(qual),
                Err(_) => {
                    errors.push(VcfError::InvalidNumber {
                        field: "QUAL",
                        value: text.to_owned(),
                    });
                    None
                }
            },
        };
        let alt_alleles = match fields[4] {
            "." => Vec::new(),
            alts => alts.split(',').map(str::to_owned).collect(),
        };
        let format = match fields.get(8) {
            None | Some(&".") | Some(&"") => Vec::new(),
            Some(format) => format.split(':').map(str::to_owned).collect(),
        };
        let raw_samples: Vec<String> = fields
            .iter()
            .skip(MANDATORY_COLUMNS + 1)
            .map(|sample| (*sample).to_owned())
            .collect();
        let declared = read_header(header).sample_names().len();
        if raw_samples.len() != declared {
            errors.push(VcfError::SampleCount {
                expected: declared,
                found: raw_samples.len(),
            });
        }

        let mut variant = Variant {
            chrom: fields[0].to_owned(),
            pos,
            id: fields[2].to_owned(),
            ref_allele: fields[3].to_owned(),
            info: InfoStore::new(fields[7], header.clone(), alt_alleles.len()),
            alt_alleles,
            qual,
            filter: fields[6].to_owned(),
            format,
            samples: Samples::Raw(raw_samples),
            line_number,
            header: header.clone(),
        };
        if !lazy_samples {
            errors.extend(variant.parse_samples());
        }
        Ok(Decoded {
            value: variant,
            errors,
        })
    }

    pub fn header(&self) -> &SharedHeader {
        &self.header
    }

    pub fn set_alt_alleles(&mut self, alt_alleles: Vec<String>) {
        self.info.set_alt_count(alt_alleles.len());
        self.alt_alleles = alt_alleles;
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Decoded samples, `None` while they are still raw text.
    pub fn genotypes(&self) -> Option<&[SampleGenotype]> {
        match &self.samples {
            Samples::Parsed(parsed) => Some(parsed),
            Samples::Raw(_) => None,
        }
    }

    pub fn genotypes_mut(&mut self) -> Option<&mut Vec<SampleGenotype>> {
        match &mut self.samples {
            Samples::Parsed(parsed) => Some(parsed),
            Samples::Raw(_) => None,
        }
    }

    /// Decodes raw sample columns in place. Returns the problems found;
    /// a second call is a no-op.
    pub fn parse_samples(&mut self) -> Vec<VcfError> {
        let raw = match &self.samples {
            Samples::Raw(raw) => raw,
            Samples::Parsed(_) => return Vec::new(),
        };
        let mut errors = Vec::new();
        let header = read_header(&self.header);
        let parsed: Vec<SampleGenotype> = raw
            .iter()
            .map(|text| decode_sample(&header, &self.format, text).drain_into(&mut errors))
            .collect();
        drop(header);
        self.samples = Samples::Parsed(parsed);
        errors
    }
}

impl Record for Variant {
    fn chrom(&self) -> &str {
        &self.chrom
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    fn alt_alleles(&self) -> &[String] {
        &self.alt_alleles
    }

    fn qual(&self) -> Option<f32> {
        self.qual
    }

    /// # Examples
    ///
    /// ```
    /// use rust_vcf::header::Header;
    /// use rust_vcf::record::{Record, Variant};
    ///
    /// let header = Header::new("4.2").into_shared();
    /// let mut variant = Variant::new(header, "20", 14370, "G", vec!["A".into()]);
    /// assert!(variant.filters().is_empty());
    /// variant.set_filter("q10;s50".into());
    /// assert_eq!(variant.filters(), vec!["q10", "s50"]);
    /// ```
    fn filters(&self) -> Vec<&str> {
        match self.filter.as_str() {
            "." | "" => Vec::new(),
            filter => filter.split(';').collect(),
        }
    }

    fn info_field(&self, tag: &str) -> Decoded<Value> {
        self.info.get(tag)
    }

    /// Raw value of a FORMAT key for every sample.
    fn format_field(&self, tag: &str) -> Vec<Option<&str>> {
        match &self.samples {
            Samples::Parsed(parsed) => parsed.iter().map(|sample| sample.field(tag)).collect(),
            Samples::Raw(raw) => {
                let index = self.format.iter().position(|key| key == tag);
                raw.iter()
                    .map(|sample| index.and_then(|index| sample.split(':').nth(index)))
                    .collect()
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alts = if self.alt_alleles.is_empty() {
            ".".to_owned()
        } else {
            self.alt_alleles.join(",")
        };
        let qual = match self.qual {
            Some(qual) => format!("{:.1}", qual),
            None => ".".to_owned(),
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom, self.pos, self.id, self.ref_allele, alts, qual, self.filter, self.info
        )?;
        if self.format.is_empty() && self.samples.is_empty() {
            return Ok(());
        }
        let format = if self.format.is_empty() {
            ".".to_owned()
        } else {
            self.format.join(":")
        };
        let samples = match &self.samples {
            Samples::Raw(raw) => raw.join("\t"),
            Samples::Parsed(parsed) => parsed
                .iter()
                .map(|sample| sample.render(&self.format))
                .join("\t"),
        };
        if samples.is_empty() {
            write!(f, "\t{}", format)
        } else {
            write!(f, "\t{}\t{}", format, samples)
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("chrom", &self.chrom)
            .field("pos", &self.pos)
            .field("id", &self.id)
            .field("ref_allele", &self.ref_allele)
            .field("alt_alleles", &self.alt_alleles)
            .field("qual", &self.qual)
            .field("filter", &self.filter)
            .field("info", &self.info)
            .field("format", &self.format)
            .field("samples", &self.samples)
            .field("line_number", &self.line_number)
            .finish()
    }
}
