//! nom grammars for the text of VCF header lines.

use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag};
use nom::character::complete::{char, digit1, none_of, one_of, space0};
use nom::combinator::{map, map_res, opt, recognize, rest, value, verify};
use nom::error::{Error, ErrorKind};
use nom::multi::{many1, separated_list0, separated_list1};
use nom::sequence::{delimited, preceded, separated_pair, tuple};
use nom::IResult;

use crate::types::FieldNumber;

pub(crate) fn field_number(input: &str) -> IResult<&str, FieldNumber> {
    alt((
        map_res(digit1, |digits: &str| digits.parse().map(FieldNumber::Count)),
        value(FieldNumber::AlternateAlleles, char('A')),
        value(FieldNumber::Alleles, char('R')),
        value(FieldNumber::Genotypes, char('G')),
        value(FieldNumber::Unknown, char('.')),
    ))(input)
}

/// `##fileformat=VCFv<version>`, yielding the version.
pub(crate) fn file_format(input: &str) -> IResult<&str, &str> {
    preceded(
        tag("##fileformat=VCFv"),
        verify(rest, |version: &str| !version.trim().is_empty()),
    )(input)
}

/// `##<key>=<<body>>`, yielding key and body without the angle brackets.
pub(crate) fn structured_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = preceded(tag("##"), is_not("=<"))(input)?;
    let (input, _) = tag("=<")(input)?;
    match input.strip_suffix('>') {
        Some(body) => Ok(("", (key, body))),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Tag))),
    }
}

/// `##<key>=<value>` for unstructured meta lines.
pub(crate) fn extra_line(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        tag("##"),
        separated_pair(map(is_not("="), str::trim), char('='), rest),
    )(input)
}

fn string(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        map(
            opt(escaped(none_of("\\\""), '\\', one_of("\\\""))),
            |s: Option<&str>| s.unwrap_or(""),
        ),
        char('"'),
    )(input)
}

/// `key=value,key="quoted, value",...` as found inside INFO/FORMAT/FILTER declarations.
/// Quoted values keep their quotes; see [`unquote`].
pub(crate) fn keys_and_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
        separated_pair(
            is_not("<,=\n"),
            char('='),
            alt((recognize(string), is_not(",>\n"))),
        )(input)
    }
    separated_list0(char(','), key_value)(input)
}

pub(crate) fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

// quotes are kept verbatim and an unterminated quote runs to the end of input
fn lenient_quoted(input: &str) -> IResult<&str, &str> {
    recognize(tuple((char('"'), opt(is_not("\"")), opt(char('"')))))(input)
}

fn csv_field(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((lenient_quoted, is_not(",\"")))))(input)
}

/// CSV-style attribute list used for `##contig` and `##SAMPLE` lines.
pub(crate) fn csv_attributes(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    separated_list1(
        char(','),
        map_res(preceded(space0, csv_field), |field: &str| {
            field.split_once('=').ok_or("attribute without '='")
        }),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_number() {
        assert_eq!(field_number("A"), Ok(("", FieldNumber::AlternateAlleles)));
        assert_eq!(field_number("R"), Ok(("", FieldNumber::Alleles)));
        assert_eq!(field_number("G"), Ok(("", FieldNumber::Genotypes)));
        assert_eq!(field_number("."), Ok(("", FieldNumber::Unknown)));
        assert_eq!(field_number("10"), Ok(("", FieldNumber::Count(10))));
        assert!(field_number("X").is_err());
    }

    #[test]
    fn test_file_format() {
        assert_eq!(file_format("##fileformat=VCFv4.2"), Ok(("", "4.2")));
        assert!(file_format("##fileformat=VFv4.2").is_err());
        assert!(file_format("##fileformat=VCFv").is_err());
    }

    #[test]
    fn test_structured_line() {
        let (_, (key, body)) =
            structured_line("##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">")
                .unwrap();
        assert_eq!(key, "INFO");
        assert_eq!(body, "ID=DP,Number=1,Type=Integer,Description=\"Depth\"");
        assert!(structured_line("##INFO=<ID=DP").is_err());
        assert!(structured_line("##phasing=partial").is_err());
    }

    #[test]
    fn test_keys_and_values() {
        let (rest, kv) =
            keys_and_values("ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership, build 129\"")
                .unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            kv,
            vec![
                ("ID", "DB"),
                ("Number", "0"),
                ("Type", "Flag"),
                ("Description", "\"dbSNP membership, build 129\"")
            ]
        );
        let (rest, kv) = keys_and_values("ID=q0,Description=\"\",Version=3").unwrap();
        assert_eq!(rest, "");
        assert_eq!(kv[1], ("Description", "\"\""));
        assert_eq!(kv[2], ("Version", "3"));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"Total Depth\""), "Total Depth");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("3"), "3");
        assert_eq!(unquote("\"open"), "\"open");
    }

    #[test]
    fn test_csv_attributes() {
        let (rest, kv) = csv_attributes(
            "ID=20,length=62435964,species=\"Homo sapiens, male\", taxonomy=x",
        )
        .unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            kv,
            vec![
                ("ID", "20"),
                ("length", "62435964"),
                ("species", "\"Homo sapiens, male\""),
                ("taxonomy", "x")
            ]
        );
        let (rest, kv) = csv_attributes("ID=1,note=\"unterminated, quote").unwrap();
        assert_eq!(rest, "");
        assert_eq!(kv[1], ("note", "\"unterminated, quote"));
    }

    #[test]
    fn test_extra_line() {
        assert_eq!(extra_line("##phasing=partial"), Ok(("", ("phasing", "partial"))));
        assert!(extra_line("##nokey").is_err());
    }
}
