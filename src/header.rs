//! The header-driven type registry.
//!
//! A [`Header`] is built once from the `##` lines of a stream and then shared
//! by every record decoded from it (see [`SharedHeader`]). Lookups take the
//! read side of the lock; the only writes after the header block are
//! declarations synthesized when a record introduces an undeclared INFO key.

use std::convert::TryFrom;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use getset::Getters;
use indexmap::IndexMap;

use crate::error::VcfError;
use crate::parser;
use crate::types::{FieldDescriptor, HeaderLineKind, Value};

/// Header shared by reference between a reader and its records.
pub type SharedHeader = Arc<RwLock<Header>>;

pub fn read_header(header: &SharedHeader) -> RwLockReadGuard<'_, Header> {
    header.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_header(header: &SharedHeader) -> RwLockWriteGuard<'_, Header> {
    header.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct Header {
    /// Version from `##fileformat=VCFv<version>`.
    file_format: String,
    infos: IndexMap<String, FieldDescriptor>,
    formats: IndexMap<String, FieldDescriptor>,
    /// FILTER id to description.
    filters: IndexMap<String, String>,
    /// Attributes of each `##contig` line in declaration order.
    contigs: Vec<IndexMap<String, String>>,
    /// Verbatim `##SAMPLE` lines keyed by their ID.
    samples: IndexMap<String, String>,
    /// Verbatim `##PEDIGREE` lines.
    pedigrees: Vec<String>,
    /// Sample columns of the `#CHROM` line.
    sample_names: Vec<String>,
    /// Any other `##key=value` line, verbatim.
    extras: Vec<String>,
}

impl Header {
    pub fn new<S: Into<String>>(file_format: S) -> Self {
        Header {
            file_format: file_format.into(),
            ..Default::default()
        }
    }

    /// Builds a header from the first line of a stream.
    pub fn from_file_format_line(line: &str) -> Result<Self, VcfError> {
        match parser::file_format(line.trim_end()) {
            Ok((_, version)) => Ok(Header::new(version)),
            Err(_) => Err(VcfError::MissingFileFormat {
                line: line.to_owned(),
            }),
        }
    }

    pub fn into_shared(self) -> SharedHeader {
        Arc::new(RwLock::new(self))
    }

    /// Parses one `##` meta line, dispatching on its class.
    pub fn parse_line(&mut self, line: &str) -> Result<(), VcfError> {
        let key = match parser::extra_line(line) {
            Ok((_, (key, _))) => key,
            Err(_) => return Err(syntax_error(line, "expected ##key=value")),
        };
        match HeaderLineKind::from_str(key) {
            Ok(kind) => self.declare(kind, line),
            Err(_) => {
                self.extras.push(line.to_owned());
                Ok(())
            }
        }
    }

    /// Parses a structured declaration of the given class and records it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf::header::Header;
    /// use rust_vcf::types::{FieldNumber, FieldType, HeaderLineKind};
    ///
    /// let mut header = Header::new("4.2");
    /// header
    ///     .declare(
    ///         HeaderLineKind::Info,
    ///         "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">",
    ///     )
    ///     .unwrap();
    /// let af = header.lookup_info("AF").unwrap();
    /// assert_eq!(*af.number(), FieldNumber::AlternateAlleles);
    /// assert_eq!(*af.kind(), FieldType::Float);
    /// assert!(header.lookup_info("DP").is_none());
    /// ```
    pub fn declare(&mut self, kind: HeaderLineKind, text: &str) -> Result<(), VcfError> {
        let body = match parser::structured_line(text) {
            Ok((_, (key, body))) if key == kind.to_string() => body,
            _ => return Err(syntax_error(text, &format!("expected ##{}=<...>", kind))),
        };
        match kind {
            HeaderLineKind::Info | HeaderLineKind::Format => {
                let attributes = complete_attributes(text, body)?;
                let descriptor =
                    FieldDescriptor::try_from(attributes).map_err(|reason| syntax_error(text, &reason))?;
                let declarations = if kind == HeaderLineKind::Info {
                    &mut self.infos
                } else {
                    &mut self.formats
                };
                if declarations
                    .insert(descriptor.id().clone(), descriptor)
                    .is_some()
                {
                    log::debug!("redeclared {} field: {}", kind, text);
                }
            }
            HeaderLineKind::Filter => {
                let attributes: IndexMap<_, _> =
                    complete_attributes(text, body)?.into_iter().collect();
                let id = attributes
                    .get("ID")
                    .ok_or_else(|| syntax_error(text, "ID is mandatory"))?;
                let description = attributes
                    .get("Description")
                    .ok_or_else(|| syntax_error(text, "Description is mandatory"))?;
                self.filters.insert(
                    parser::unquote(id).to_owned(),
                    parser::unquote(description).to_owned(),
                );
            }
            HeaderLineKind::Contig => {
                let attributes = csv_attributes(text, body)?;
                if !attributes.contains_key("ID") {
                    return Err(syntax_error(text, "bad contig: ID is mandatory"));
                }
                self.contigs.push(attributes);
            }
            HeaderLineKind::Sample => {
                let attributes = csv_attributes(text, body)?;
                let id = attributes
                    .get("ID")
                    .ok_or_else(|| syntax_error(text, "bad sample: ID is mandatory"))?;
                self.samples.insert(id.clone(), text.to_owned());
            }
            HeaderLineKind::Pedigree => self.pedigrees.push(text.to_owned()),
        }
        Ok(())
    }

    /// Takes the sample order from the `#CHROM` line.
    pub fn set_column_header(&mut self, line: &str) -> Result<(), VcfError> {
        let columns: Vec<&str> = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
        if columns.len() < 8 {
            return Err(VcfError::MalformedColumnHeader {
                columns: columns.len(),
            });
        }
        self.sample_names = columns
            .iter()
            .skip(9)
            .map(|name| (*name).to_owned())
            .collect();
        Ok(())
    }

    pub fn lookup_info(&self, id: &str) -> Option<&FieldDescriptor> {
        self.infos.get(id)
    }

    pub fn lookup_format(&self, id: &str) -> Option<&FieldDescriptor> {
        self.formats.get(id)
    }

    pub fn add_info(&mut self, descriptor: FieldDescriptor) {
        self.infos.insert(descriptor.id().clone(), descriptor);
    }

    pub fn add_format(&mut self, descriptor: FieldDescriptor) {
        self.formats.insert(descriptor.id().clone(), descriptor);
    }

    /// Declares an INFO key from the runtime type of a value written to it.
    /// Returns `false` if the key was already declared.
    pub fn register_runtime(&mut self, id: &str, value: &Value) -> bool {
        if self.infos.contains_key(id) {
            return false;
        }
        log::debug!("declaring INFO {} from its runtime value", id);
        self.add_info(FieldDescriptor::for_value(id, value));
        true
    }

    /// Value of the first retained `##key=value` line with this key.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.iter().find_map(|line| match parser::extra_line(line) {
            Ok((_, (k, v))) if k == key => Some(v),
            _ => None,
        })
    }
}

fn syntax_error(line: &str, reason: &str) -> VcfError {
    VcfError::HeaderSyntax {
        line: line.to_owned(),
        reason: reason.to_owned(),
    }
}

fn complete_attributes<'a>(line: &str, body: &'a str) -> Result<Vec<(&'a str, &'a str)>, VcfError> {
    match parser::keys_and_values(body) {
        Ok(("", attributes)) => Ok(attributes),
        _ => Err(syntax_error(line, "malformed attribute list")),
    }
}

fn csv_attributes(line: &str, body: &str) -> Result<IndexMap<String, String>, VcfError> {
    match parser::csv_attributes(body) {
        Ok(("", attributes)) => Ok(attributes
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()),
        _ => Err(syntax_error(line, "malformed attribute list")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldNumber, FieldType};

    #[test]
    fn test_file_format_line() {
        let header = Header::from_file_format_line("##fileformat=VCFv4.2").unwrap();
        assert_eq!(header.file_format(), "4.2");
        assert!(matches!(
            Header::from_file_format_line("##fileformat=VFv4.2"),
            Err(VcfError::MissingFileFormat { .. })
        ));
    }

    #[test]
    fn test_declare_info_and_format() {
        let mut header = Header::new("4.2");
        header
            .parse_line("##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership, build 129\">")
            .unwrap();
        header
            .parse_line("##FORMAT=<ID=HQ,Number=2,Type=Integer,Description=\"Haplotype Quality\">")
            .unwrap();
        header
            .parse_line("##INFO=<ID=LONG,Number=10,Type=Flag,Description=\"Large number of values\">")
            .unwrap();
        let db = header.lookup_info("DB").unwrap();
        assert_eq!(*db.kind(), FieldType::Flag);
        assert_eq!(db.description(), "dbSNP membership, build 129");
        let hq = header.lookup_format("HQ").unwrap();
        assert_eq!(*hq.number(), FieldNumber::Count(2));
        assert_eq!(
            *header.lookup_info("LONG").unwrap().number(),
            FieldNumber::Count(10)
        );
        assert!(header.lookup_format("DB").is_none());
    }

    #[test]
    fn test_declare_rejects_malformed_lines() {
        let mut header = Header::new("4.2");
        let bad = "##INFO=<ID=NS,Number=1,Type=Int,Description=\"x\">";
        match header.parse_line(bad) {
            Err(VcfError::HeaderSyntax { line, .. }) => assert_eq!(line, bad),
            other => panic!("unexpected {:?}", other),
        }
        assert!(header
            .declare(HeaderLineKind::Format, "##INFO=<ID=X,Number=1,Type=Integer,Description=\"\">")
            .is_err());
        assert!(header.parse_line("##nokeyvalue").is_err());
        assert!(header.parse_line("##INFO=<ID=X,Number=1").is_err());
        assert!(header.infos().is_empty());
        assert!(header.extras().is_empty());
    }

    #[test]
    fn test_filters_contigs_samples_pedigrees() {
        let mut header = Header::new("4.2");
        for line in &[
            "##FILTER=<ID=q10,Description=\"Quality below 10\">",
            "##contig=<ID=20,length=62435964,assembly=B36,md5=f126cdf8a6e0c7f379d618ff66beb2da,species=\"Homo sapiens\",taxonomy=x>",
            "##SAMPLE=<ID=TissueSample,Genomes=Germline;Tumor,Mixture=.3;.7,Description=\"Patient germline genome;Patient tumor genome\">",
            "##PEDIGREE=<Name_0=G0-ID,Name_1=G1-ID,Name_N=GN-ID>",
            "##phasing=partial",
            "##ALT=<ID=DEL,Description=\"Deletion\">",
        ] {
            header.parse_line(line).unwrap();
        }
        assert_eq!(header.filters()["q10"], "Quality below 10");
        let contig = &header.contigs()[0];
        assert_eq!(contig["ID"], "20");
        assert_eq!(contig["species"], "\"Homo sapiens\"");
        assert_eq!(contig.len(), 6);
        assert!(header.samples().contains_key("TissueSample"));
        assert_eq!(header.pedigrees().len(), 1);
        assert_eq!(header.extras().len(), 2);
        assert_eq!(header.extra("phasing"), Some("partial"));
        assert_eq!(header.extra("missing"), None);
    }

    #[test]
    fn test_declaration_attributes_round_trip() {
        let mut header = Header::new("4.2");
        let line = "##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count, in genotypes\",Source=\"bcftools\",Version=3>";
        header.parse_line(line).unwrap();
        let ac = header.lookup_info("AC").unwrap();
        assert_eq!(ac.description(), "Allele count, in genotypes");
        assert_eq!(ac.additional()["Version"], "3");
        assert_eq!(ac.to_header_line(HeaderLineKind::Info), line);
    }

    #[test]
    fn test_contig_without_id() {
        let mut header = Header::new("4.2");
        assert!(header.parse_line("##contig=<length=10>").is_err());
    }

    #[test]
    fn test_column_header() {
        let mut header = Header::new("4.2");
        header
            .set_column_header("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA00001\tNA00002")
            .unwrap();
        assert_eq!(header.sample_names(), &vec!["NA00001", "NA00002"]);
        header
            .set_column_header("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")
            .unwrap();
        assert!(header.sample_names().is_empty());
        assert!(matches!(
            header.set_column_header("#CHROM\tPOS"),
            Err(VcfError::MalformedColumnHeader { columns: 2 })
        ));
    }

    #[test]
    fn test_register_runtime() {
        let mut header = Header::new("4.2");
        assert!(header.register_runtime("asdf", &Value::Int(123)));
        assert!(!header.register_runtime("asdf", &Value::Float(1.0)));
        let asdf = header.lookup_info("asdf").unwrap();
        assert_eq!(*asdf.kind(), FieldType::Integer);
        assert_eq!(*asdf.number(), FieldNumber::Count(1));
    }
}
