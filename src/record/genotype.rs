use indexmap::IndexMap;
use itertools::Itertools;

use crate::codec;
use crate::error::{Decoded, VcfError};
use crate::header::{read_header, Header};
use crate::record::{Record, Variant};
use crate::types::{missing_float, FieldType, Missing, Value};

/// Ploidy used for `Number=G` when a sample has no called GT.
pub(crate) const DEFAULT_PLOIDY: usize = 2;

/// One sample column. GT, DP, GQ and GL/PL are decoded eagerly; every FORMAT
/// value is also kept as written in `fields`, which is what gets rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleGenotype {
    pub phased: bool,
    /// Allele indices, `-1` for a missing allele.
    pub gt: Vec<i32>,
    pub dp: i32,
    pub gq: i32,
    /// Genotype likelihoods on log10 scale (PL is divided by -10).
    pub gl: Vec<f32>,
    pub fields: IndexMap<String, String>,
}

impl SampleGenotype {
    pub fn ploidy(&self) -> usize {
        self.gt.len()
    }

    /// Ploidy of GT, `None` when GT is absent or every allele is missing.
    pub fn called_ploidy(&self) -> Option<usize> {
        if self.gt.iter().any(|&allele| allele >= 0) {
            Some(self.gt.len())
        } else {
            None
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Reference depth from GATK's `AD` or freebayes' `RO`.
    pub fn ref_depth(&self) -> Result<i32, VcfError> {
        if let Some(ad) = self.field("AD") {
            let first = ad.split(',').next().unwrap_or_default();
            return parse_depth("AD", first);
        }
        if let Some(ro) = self.field("RO") {
            return parse_depth("RO", ro);
        }
        Err(VcfError::NotFound {
            key: "AD or RO".to_owned(),
        })
    }

    /// Alternate depths from GATK's `AD` or freebayes' `AO`.
    pub fn alt_depths(&self) -> Result<Vec<i32>, VcfError> {
        if let Some(ad) = self.field("AD") {
            return ad
                .split(',')
                .skip(1)
                .map(|depth| parse_depth("AD", depth))
                .collect();
        }
        if let Some(ao) = self.field("AO") {
            return ao.split(',').map(|depth| parse_depth("AO", depth)).collect();
        }
        Err(VcfError::NotFound {
            key: "AD or AO".to_owned(),
        })
    }

    /// The sample column for the given FORMAT keys.
    pub fn render(&self, format: &[String]) -> String {
        if format.is_empty() {
            return ".".to_owned();
        }
        format
            .iter()
            .map(|key| self.field(key).unwrap_or_default())
            .join(":")
    }
}

fn parse_depth(field: &'static str, text: &str) -> Result<i32, VcfError> {
    text.parse().map_err(|_| VcfError::InvalidNumber {
        field,
        value: text.to_owned(),
    })
}

fn is_missing(text: &str) -> bool {
    text.is_empty() || text == "."
}

/// Decodes one `:`-separated sample column against the record's FORMAT keys.
///
/// A value count that differs from the key count is reported; the values
/// present are still decoded in order.
///
/// # Examples
///
/// ```
/// use rust_vcf::header::Header;
/// use rust_vcf::record::decode_sample;
///
/// let header = Header::new("4.2");
/// let format = vec!["GT".to_owned(), "DP".to_owned(), "PL".to_owned()];
/// let sample = decode_sample(&header, &format, "0|1:12:10,0,100").value;
/// assert!(sample.phased);
/// assert_eq!(sample.gt, vec![0, 1]);
/// assert_eq!(sample.dp, 12);
/// assert_eq!(sample.gl, vec![-1.0, 0.0, -10.0]);
/// assert_eq!(sample.field("PL"), Some("10,0,100"));
/// ```
pub fn decode_sample(header: &Header, format: &[String], text: &str) -> Decoded<SampleGenotype> {
    let mut sample = SampleGenotype::default();
    let mut errors = Vec::new();
    let values = text.split(':').collect_vec();
    if values.len() != format.len() {
        errors.push(VcfError::FieldCount {
            sample: text.to_owned(),
            expected: format.len(),
            found: values.len(),
        });
    }
    for (key, &value) in format.iter().zip(values.iter()) {
        match key.as_str() {
            "GT" => decode_gt(&mut sample, value, &mut errors),
            "DP" => sample.dp = decode_integer(value, &mut errors),
            "GQ" => {
                let declared = header.lookup_format("GQ").map(|d| *d.kind());
                sample.gq = if declared == Some(FieldType::Float) {
                    decode_float_gq(value, &mut errors)
                } else {
                    decode_integer(value, &mut errors)
                };
            }
            "GL" => sample.gl = decode_likelihoods(value, false, &mut errors),
            "PL" => sample.gl = decode_likelihoods(value, true, &mut errors),
            _ => {}
        }
        sample.fields.insert(key.clone(), value.to_owned());
    }
    Decoded {
        value: sample,
        errors,
    }
}

fn decode_gt(sample: &mut SampleGenotype, value: &str, errors: &mut Vec<VcfError>) {
    sample.phased = value.contains('|');
    let separator = if sample.phased { '|' } else { '/' };
    sample.gt = value
        .split(separator)
        .map(|allele| {
            if is_missing(allele) {
                return -1;
            }
            allele.parse().unwrap_or_else(|_| {
                errors.push(VcfError::InvalidGenotype {
                    token: allele.to_owned(),
                });
                -1
            })
        })
        .collect();
}

fn decode_integer(value: &str, errors: &mut Vec<VcfError>) -> i32 {
    if is_missing(value) {
        return 0;
    }
    value.parse().unwrap_or_else(|_| {
        errors.push(VcfError::TypeMismatch {
            kind: FieldType::Integer,
            value: value.to_owned(),
        });
        0
    })
}

fn decode_float_gq(value: &str, errors: &mut Vec<VcfError>) -> i32 {
    if is_missing(value) {
        return 0;
    }
    match value.parse::<f32>() {
        Ok(v) => {
            errors.push(VcfError::PrecisionLoss {
                key: "GQ".to_owned(),
                value: value.to_owned(),
            });
            (v + 0.5).floor() as i32
        }
        Err(_) => {
            errors.push(VcfError::TypeMismatch {
                kind: FieldType::Float,
                value: value.to_owned(),
            });
            0
        }
    }
}

pub(crate) fn decode_likelihoods(value: &str, phred: bool, errors: &mut Vec<VcfError>) -> Vec<f32> {
    if is_missing(value) {
        return Vec::new();
    }
    value
        .split(',')
        .map(|element| {
            if is_missing(element) {
                return missing_float();
            }
            match element.parse::<f32>() {
                Ok(v) if phred => v / -10.0,
                Ok(v) => v,
                Err(_) => {
                    errors.push(VcfError::TypeMismatch {
                        kind: FieldType::Float,
                        value: element.to_owned(),
                    });
                    missing_float()
                }
            }
        })
        .collect()
}

impl Variant {
    /// Decodes a FORMAT value of `sample` using its header declaration,
    /// substituting `missing` for `.` elements.
    ///
    /// Integer fields need an `Int` missing value and Float fields a `Float`
    /// one; anything else is refused with [`VcfError::UnsupportedMissing`].
    pub fn genotype_field(
        &self,
        sample: &SampleGenotype,
        key: &str,
        missing: Value,
    ) -> Result<Decoded<Value>, VcfError> {
        let descriptor = read_header(&self.header)
            .lookup_format(key)
            .cloned()
            .ok_or_else(|| VcfError::NotDeclared {
                key: key.to_owned(),
            })?;
        let text = sample.field(key).ok_or_else(|| VcfError::NotFound {
            key: key.to_owned(),
        })?;
        let kind = *descriptor.kind();
        let unsupported = || VcfError::UnsupportedMissing {
            key: key.to_owned(),
            kind,
            missing: format!("{:?}", missing),
        };
        let sentinels = match (kind, &missing) {
            (FieldType::Integer, Value::Int(integer)) => Missing {
                integer: *integer,
                ..Missing::default()
            },
            (FieldType::Float, Value::Float(float)) => Missing {
                float: *float,
                ..Missing::default()
            },
            (FieldType::Integer, _) | (FieldType::Float, _) => return Err(unsupported()),
            _ => Missing::default(),
        };
        let ploidy = sample.called_ploidy().unwrap_or(DEFAULT_PLOIDY);
        Ok(codec::decode_list_with(
            *descriptor.number(),
            kind,
            text,
            self.alt_alleles().len(),
            ploidy,
            sentinels,
        ))
    }
}
