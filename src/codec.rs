//! Conversion between VCF value text and [`Value`]s, driven by the header's
//! `Number` and `Type` declarations.

use itertools::Itertools;

use crate::error::{Decoded, VcfError};
use crate::types::{
    is_missing_float, FieldDescriptor, FieldNumber, FieldType, Missing, Value, MISSING_INTEGER,
};

fn is_missing(text: &str) -> bool {
    text.is_empty() || text == "."
}

/// Decodes a single value.
///
/// `.` stands for a missing Integer or Float and decodes to the matching
/// sentinel of [`Missing::default`].
pub fn decode_scalar(kind: FieldType, text: &str) -> Result<Value, VcfError> {
    decode_scalar_with(kind, text, Missing::default())
}

fn decode_scalar_with(kind: FieldType, text: &str, missing: Missing) -> Result<Value, VcfError> {
    let mismatch = || VcfError::TypeMismatch {
        kind,
        value: text.to_owned(),
    };
    match kind {
        FieldType::Integer if is_missing(text) => Ok(Value::Int(missing.integer)),
        FieldType::Integer => text.parse().map(Value::Int).map_err(|_| mismatch()),
        FieldType::Float if is_missing(text) => Ok(Value::Float(missing.float)),
        FieldType::Float => text.parse().map(Value::Float).map_err(|_| mismatch()),
        FieldType::Flag if text.is_empty() => Ok(Value::Bool(true)),
        FieldType::Flag => Err(mismatch()),
        FieldType::String | FieldType::Character | FieldType::Unknown => {
            Ok(Value::Text(text.to_owned()))
        }
    }
}

/// Number of genotypes for `n_alleles` alleles at the given ploidy,
/// i.e. multisets of size `ploidy` drawn from the alleles. `None` if the
/// count does not fit in a `usize`.
pub fn genotype_count(n_alleles: usize, ploidy: usize) -> Option<usize> {
    if ploidy == 0 {
        return Some(1);
    }
    binomial(n_alleles.checked_add(ploidy - 1)?, ploidy)
}

pub(crate) fn binomial(n: usize, k: usize) -> Option<usize> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    (0..k).try_fold(1usize, |acc, i| Some(acc.checked_mul(n - i)? / (i + 1)))
}

/// Number of values a field must carry, `None` when unconstrained or when a
/// `G` count overflows.
pub fn expected_length(number: FieldNumber, alt_count: usize, ploidy: usize) -> Option<usize> {
    match number {
        FieldNumber::Count(n) => Some(n),
        FieldNumber::AlternateAlleles => Some(alt_count),
        FieldNumber::Alleles => Some(alt_count + 1),
        FieldNumber::Genotypes => genotype_count(alt_count + 1, ploidy),
        FieldNumber::Unknown => None,
    }
}

/// Decodes comma-separated text according to `number` and `kind`.
///
/// A length that contradicts `number` is reported but the decoded list is
/// still returned.
///
/// # Examples
///
/// ```
/// use rust_vcf::codec::decode_list;
/// use rust_vcf::types::{FieldNumber, FieldType, Value};
///
/// let af = decode_list(FieldNumber::AlternateAlleles, FieldType::Float, "0.5", 1, 2);
/// assert!(af.is_clean());
/// assert_eq!(af.value, Value::FloatList(vec![0.5]));
///
/// let ad = decode_list(FieldNumber::Alleles, FieldType::Integer, "3,4,5", 1, 2);
/// assert!(!ad.is_clean());
/// assert_eq!(ad.value, Value::IntList(vec![3, 4, 5]));
/// ```
pub fn decode_list(
    number: FieldNumber,
    kind: FieldType,
    text: &str,
    alt_count: usize,
    ploidy: usize,
) -> Decoded<Value> {
    decode_list_with(number, kind, text, alt_count, ploidy, Missing::default())
}

/// [`decode_list`] with caller-chosen values for missing elements.
pub fn decode_list_with(
    number: FieldNumber,
    kind: FieldType,
    text: &str,
    alt_count: usize,
    ploidy: usize,
    missing: Missing,
) -> Decoded<Value> {
    let scalar = matches!(number, FieldNumber::Count(0) | FieldNumber::Count(1));
    if kind == FieldType::Flag || (scalar && !text.contains(',')) {
        return match decode_scalar_with(kind, text, missing) {
            Ok(value) => Decoded::ok(value),
            Err(error) => {
                let fallback = match kind {
                    FieldType::Flag => Value::Bool(true),
                    FieldType::Integer => Value::Int(missing.integer),
                    FieldType::Float => Value::Float(missing.float),
                    _ => Value::Text(text.to_owned()),
                };
                Decoded::with_error(fallback, error)
            }
        };
    }

    let elements = text.split(',').collect_vec();
    let mut errors = Vec::new();
    if let Some(expected) = expected_length(number, alt_count, ploidy) {
        if expected != elements.len() {
            errors.push(VcfError::LengthMismatch {
                expected,
                found: elements.len(),
                value: text.to_owned(),
            });
        }
    }
    let value = match kind {
        FieldType::Integer => Value::IntList(
            elements
                .iter()
                .map(|e| match decode_scalar_with(kind, e, missing) {
                    Ok(Value::Int(v)) => v,
                    Ok(_) => missing.integer,
                    Err(error) => {
                        errors.push(error);
                        missing.integer
                    }
                })
                .collect(),
        ),
        FieldType::Float => Value::FloatList(
            elements
                .iter()
                .map(|e| match decode_scalar_with(kind, e, missing) {
                    Ok(Value::Float(v)) => v,
                    Ok(_) => missing.float,
                    Err(error) => {
                        errors.push(error);
                        missing.float
                    }
                })
                .collect(),
        ),
        _ => Value::TextList(elements.into_iter().map(str::to_owned).collect()),
    };
    Decoded { value, errors }
}

/// Decodes `text` using a header declaration.
pub fn decode_value(
    descriptor: &FieldDescriptor,
    text: &str,
    alt_count: usize,
    ploidy: usize,
) -> Decoded<Value> {
    decode_list(
        *descriptor.number(),
        *descriptor.kind(),
        text,
        alt_count,
        ploidy,
    )
}

/// Formats a float the way VCF writers conventionally do: four decimals
/// above a magnitude of 0.02, five significant digits below, trailing zeros
/// removed.
///
/// # Examples
///
/// ```
/// use rust_vcf::codec::format_float;
///
/// assert_eq!(format_float(0.5), "0.5");
/// assert_eq!(format_float(123.2), "123.2");
/// assert_eq!(format_float(56.86614), "56.8661");
/// assert_eq!(format_float(0.017), "0.017");
/// assert_eq!(format_float(-0.0), "0");
/// ```
pub fn format_float(value: f32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let v = f64::from(value);
    let text = if v.abs() > 0.02 {
        trim_fraction(&format!("{:.4}", v)).to_owned()
    } else {
        significant(v, 5)
    };
    match text.as_str() {
        "" | "-" | "-0" => "0".to_owned(),
        _ => text,
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

// %g-style: scientific notation when the rounded exponent is below -4 or
// at least `digits`
fn significant(v: f64, digits: usize) -> String {
    if v == 0.0 {
        return "0".to_owned();
    }
    let scientific = format!("{:.*e}", digits - 1, v);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if exponent < -4 || exponent >= digits as i32 {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_owned()
    }
}

/// Formats a single value; Flags have no value text.
pub fn encode_scalar(value: &Value) -> String {
    match value {
        Value::Bool(_) => String::new(),
        Value::Int(v) => encode_integer(*v),
        Value::Float(v) => encode_float(*v),
        Value::Text(v) => v.clone(),
        list => encode_list(list),
    }
}

/// Formats a list value as comma-separated text.
pub fn encode_list(value: &Value) -> String {
    match value {
        Value::IntList(v) => v.iter().map(|i| encode_integer(*i)).join(","),
        Value::FloatList(v) => v.iter().map(|f| encode_float(*f)).join(","),
        Value::TextList(v) => v.join(","),
        scalar => encode_scalar(scalar),
    }
}

pub fn encode_value(value: &Value) -> String {
    encode_list(value)
}

fn encode_integer(v: i32) -> String {
    if v == MISSING_INTEGER {
        ".".to_owned()
    } else {
        v.to_string()
    }
}

fn encode_float(v: f32) -> String {
    if is_missing_float(v) {
        ".".to_owned()
    } else {
        format_float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::missing_float;

    #[test]
    fn test_decode_scalar() {
        assert_eq!(
            decode_scalar(FieldType::Integer, "14").unwrap(),
            Value::Int(14)
        );
        assert_eq!(
            decode_scalar(FieldType::Integer, ".").unwrap(),
            Value::Int(MISSING_INTEGER)
        );
        assert_eq!(
            decode_scalar(FieldType::Float, "0.5").unwrap(),
            Value::Float(0.5)
        );
        assert_eq!(
            decode_scalar(FieldType::Flag, "").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decode_scalar(FieldType::String, "a123").unwrap(),
            Value::Text("a123".into())
        );
        assert!(matches!(
            decode_scalar(FieldType::Flag, "asdf"),
            Err(VcfError::TypeMismatch { .. })
        ));
        assert!(matches!(
            decode_scalar(FieldType::Integer, "1.5"),
            Err(VcfError::TypeMismatch { .. })
        ));
        assert!(decode_scalar(FieldType::Float, "x").is_err());
    }

    #[test]
    fn test_genotype_count() {
        assert_eq!(genotype_count(2, 2), Some(3));
        assert_eq!(genotype_count(3, 2), Some(6));
        assert_eq!(genotype_count(4, 2), Some(10));
        assert_eq!(genotype_count(2, 1), Some(2));
        assert_eq!(genotype_count(2, 3), Some(4));
        assert_eq!(genotype_count(3, 3), Some(10));
        assert_eq!(genotype_count(2, 0), Some(1));
    }

    #[test]
    fn test_genotype_count_overflow() {
        assert_eq!(genotype_count(1000, 64), None);
        assert_eq!(genotype_count(usize::MAX, 2), None);
        assert_eq!(expected_length(FieldNumber::Genotypes, 999, 64), None);
        // an unconstrained length is not reported
        let decoded = decode_list(FieldNumber::Genotypes, FieldType::Integer, "1,2,3", 999, 64);
        assert!(decoded.is_clean());
        assert_eq!(decoded.value, Value::IntList(vec![1, 2, 3]));
    }

    #[test]
    fn test_expected_length() {
        assert_eq!(expected_length(FieldNumber::AlternateAlleles, 2, 2), Some(2));
        assert_eq!(expected_length(FieldNumber::Alleles, 2, 2), Some(3));
        assert_eq!(expected_length(FieldNumber::Genotypes, 2, 2), Some(6));
        assert_eq!(expected_length(FieldNumber::Count(2), 5, 2), Some(2));
        assert_eq!(expected_length(FieldNumber::Unknown, 2, 2), None);
    }

    #[test]
    fn test_decode_list_shapes() {
        let dp = decode_list(FieldNumber::Count(1), FieldType::Integer, "14", 1, 2);
        assert!(dp.is_clean());
        assert_eq!(dp.value, Value::Int(14));

        let af = decode_list(
            FieldNumber::AlternateAlleles,
            FieldType::Float,
            "0.333,0.667",
            2,
            2,
        );
        assert!(af.is_clean());
        assert_eq!(af.value, Value::FloatList(vec![0.333, 0.667]));

        let kind = decode_list(FieldNumber::AlternateAlleles, FieldType::String, "snp", 1, 2);
        assert_eq!(kind.value, Value::TextList(vec!["snp".into()]));

        let pl = decode_list(FieldNumber::Genotypes, FieldType::Integer, "0,30,300", 1, 2);
        assert!(pl.is_clean());
    }

    #[test]
    fn test_decode_list_length_mismatch_is_recoverable() {
        let decoded = decode_list(FieldNumber::Alleles, FieldType::String, "ref,alt1,alt2", 1, 2);
        assert_eq!(decoded.errors.len(), 1);
        assert!(matches!(
            decoded.errors[0],
            VcfError::LengthMismatch {
                expected: 2,
                found: 3,
                ..
            }
        ));
        assert_eq!(
            decoded.value,
            Value::TextList(vec!["ref".into(), "alt1".into(), "alt2".into()])
        );
    }

    #[test]
    fn test_decode_list_missing_elements() {
        let decoded = decode_list(FieldNumber::Count(2), FieldType::Integer, ".,.", 1, 2);
        assert!(decoded.is_clean());
        assert_eq!(
            decoded.value,
            Value::IntList(vec![MISSING_INTEGER, MISSING_INTEGER])
        );

        let missing = Missing {
            integer: -1,
            float: -1.0,
        };
        let decoded =
            decode_list_with(FieldNumber::Count(2), FieldType::Integer, ".,7", 1, 2, missing);
        assert_eq!(decoded.value, Value::IntList(vec![-1, 7]));

        let decoded = decode_list(FieldNumber::Count(2), FieldType::Float, "1.5,.", 1, 2);
        let floats = decoded.value.floats().unwrap().to_vec();
        assert_eq!(floats[0], 1.5);
        assert!(is_missing_float(floats[1]));
    }

    #[test]
    fn test_decode_list_bad_element() {
        let decoded = decode_list(FieldNumber::Count(2), FieldType::Integer, "1,x", 1, 2);
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.value, Value::IntList(vec![1, MISSING_INTEGER]));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.333), "0.333");
        assert_eq!(format_float(100.0), "100");
        assert_eq!(format_float(-1.25), "-1.25");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(0.0012345), "0.0012345");
        assert_eq!(format_float(-0.015), "-0.015");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_value(&Value::Int(3)), "3");
        assert_eq!(encode_value(&Value::Bool(true)), "");
        assert_eq!(
            encode_value(&Value::IntList(vec![1, MISSING_INTEGER, 3])),
            "1,.,3"
        );
        assert_eq!(
            encode_value(&Value::FloatList(vec![0.5, missing_float()])),
            "0.5,."
        );
        assert_eq!(
            encode_value(&Value::TextList(vec!["a".into(), "b".into()])),
            "a,b"
        );
        assert_eq!(Value::Float(123.2).to_string(), "123.2");
    }
}
