use itertools::Itertools;

use crate::codec::{binomial, genotype_count};
use crate::error::VcfError;
use crate::header::read_header;
use crate::record::genotype::{decode_likelihoods, DEFAULT_PLOIDY};
use crate::record::Variant;
use crate::types::FieldNumber;

/// Largest ploidy tried when a sample's GT does not give one.
const MAX_INFERRED_PLOIDY: usize = 8;

/// Position of a genotype in a `Number=G` list, `None` if it does not fit
/// in a `usize`.
///
/// Genotypes are unordered, so `alleles` is sorted first. For sorted allele
/// indices `k_1 <= .. <= k_p` the position is the sum of `C(k_m + m - 1, m)`,
/// which for a diploid `(j, k)` is `k * (k + 1) / 2 + j`.
///
/// # Examples
///
/// ```
/// use rust_vcf::record::genotype_index;
///
/// assert_eq!(genotype_index(&[0, 0]), Some(0));
/// assert_eq!(genotype_index(&[1, 0]), Some(1));
/// assert_eq!(genotype_index(&[2, 2]), Some(5));
/// assert_eq!(genotype_index(&[0, 1, 1]), Some(2));
/// ```
pub fn genotype_index(alleles: &[usize]) -> Option<usize> {
    alleles
        .iter()
        .sorted()
        .enumerate()
        .map(|(m, &k)| binomial(k.checked_add(m)?, m + 1))
        .try_fold(0usize, |sum, term| sum.checked_add(term?))
}

/// Rewrites GT for the record holding only `allele`: the reference stays
/// `0`, `allele` becomes `1`, any other allele becomes missing (`-1`).
pub fn biallelic_genotype(gt: &[i32], allele: i32) -> Vec<i32> {
    gt.iter()
        .map(|&a| match a {
            0 => 0,
            a if a == allele => 1,
            _ => -1,
        })
        .collect()
}

/// Value indices kept for alt allele `index` (0-based) and the list length
/// the source must have. `None` leaves the field as it is.
fn kept_indices(number: FieldNumber, index: usize, n_alts: usize, ploidy: usize) -> Option<(Vec<usize>, usize)> {
    let allele = index + 1;
    match number {
        FieldNumber::AlternateAlleles => Some((vec![index], n_alts)),
        FieldNumber::Alleles => Some((vec![0, allele], n_alts + 1)),
        FieldNumber::Genotypes => {
            let count = genotype_count(n_alts + 1, ploidy)?;
            let indices = (0..=ploidy)
                .map(|copies| {
                    let mut alleles = vec![0; ploidy - copies];
                    alleles.extend(std::iter::repeat(allele).take(copies));
                    genotype_index(&alleles)
                })
                .collect::<Option<Vec<_>>>()?;
            Some((indices, count))
        }
        FieldNumber::Count(_) | FieldNumber::Unknown => None,
    }
}

fn reindex(
    key: &str,
    number: FieldNumber,
    text: &str,
    index: usize,
    n_alts: usize,
    ploidy: usize,
) -> Result<Option<String>, VcfError> {
    let (indices, expected) = match kept_indices(number, index, n_alts, ploidy) {
        Some(kept) => kept,
        None => return Ok(None),
    };
    let values = text.split(',').collect_vec();
    if values.len() != expected {
        return Err(VcfError::Decomposition {
            key: key.to_owned(),
            number,
            expected,
            found: values.len(),
        });
    }
    Ok(Some(indices.iter().map(|&i| values[i]).join(",")))
}

/// Ploidy used to re-index a `Number=G` value: the called ploidy if its
/// length fits, else diploid, else the first ploidy whose genotype count
/// matches. With no fit the called (or diploid) ploidy is returned and the
/// length check reports the mismatch.
fn genotype_ploidy(called: Option<usize>, text: &str, n_alts: usize) -> usize {
    let found = text.split(',').count();
    called
        .into_iter()
        .chain(std::iter::once(DEFAULT_PLOIDY))
        .chain(1..=MAX_INFERRED_PLOIDY)
        .find(|&ploidy| genotype_count(n_alts + 1, ploidy) == Some(found))
        .unwrap_or_else(|| called.unwrap_or(DEFAULT_PLOIDY))
}

fn is_missing(text: &str) -> bool {
    text.is_empty() || text == "."
}

/// Splits a multiallelic record into one record per alternate allele.
///
/// INFO and FORMAT values declared `Number=A`, `R` or `G` (GL and PL always
/// count as `G`) keep only the entries of the retained allele; everything
/// else is copied. GT is left as is, see [`biallelic_genotype`].
///
/// # Examples
///
/// ```
/// use rust_vcf::header::Header;
/// use rust_vcf::record::{split_alts, Record, Variant};
///
/// let mut header = Header::new("4.2");
/// header
///     .parse_line("##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">")
///     .unwrap();
/// let header = header.into_shared();
/// let mut variant = Variant::new(header, "20", 1110696, "A", vec!["G".into(), "T".into()]);
/// variant.info_mut().set_raw("AF", "0.333,0.667");
///
/// let split = split_alts(&variant).unwrap();
/// assert_eq!(split.len(), 2);
/// assert_eq!(split[1].alt_alleles(), &["T".to_owned()]);
/// assert_eq!(split[1].info().as_str(), "AF=0.667");
/// ```
pub fn split_alts(variant: &Variant) -> Result<Vec<Variant>, VcfError> {
    let n_alts = variant.alt_alleles.len();
    let mut source = variant.clone();
    let sample_errors = source.parse_samples();
    if !sample_errors.is_empty() {
        log::debug!(
            "line {}: {} sample errors while splitting",
            variant.line_number,
            sample_errors.len()
        );
    }

    let (info_plan, format_plan) = {
        let header = read_header(&variant.header);
        let info_plan = variant
            .info
            .keys()
            .into_iter()
            .filter_map(|key| {
                let number = *header.lookup_info(key)?.number();
                let value = variant.info.positions(key)?.value?;
                let text = &variant.info.as_str()[value];
                Some((key.to_owned(), number, text.to_owned()))
            })
            .filter(|(_, _, text)| !is_missing(text))
            .collect_vec();
        let format_plan = variant
            .format
            .iter()
            .filter_map(|key| match key.as_str() {
                "GL" | "PL" => Some((key.clone(), FieldNumber::Genotypes)),
                _ => header
                    .lookup_format(key)
                    .map(|descriptor| (key.clone(), *descriptor.number())),
            })
            .collect_vec();
        (info_plan, format_plan)
    };

    let mut split = Vec::with_capacity(n_alts);
    for (index, alt) in variant.alt_alleles.iter().enumerate() {
        let mut copy = source.clone();
        copy.set_alt_alleles(vec![alt.clone()]);
        for (key, number, text) in &info_plan {
            let ploidy = genotype_ploidy(None, text, n_alts);
            if let Some(kept) = reindex(key, *number, text, index, n_alts, ploidy)? {
                copy.info.set_raw(key, &kept);
            }
        }
        if let Some(samples) = copy.genotypes_mut() {
            for sample in samples.iter_mut() {
                let called = sample.called_ploidy();
                for (key, number) in &format_plan {
                    let text = match sample.field(key) {
                        Some(text) if !is_missing(text) => text,
                        _ => continue,
                    };
                    let ploidy = genotype_ploidy(called, text, n_alts);
                    let kept = match reindex(key, *number, text, index, n_alts, ploidy)? {
                        Some(kept) => kept,
                        None => continue,
                    };
                    if key == "GL" || key == "PL" {
                        sample.gl = decode_likelihoods(&kept, key == "PL", &mut Vec::new());
                    }
                    sample.fields.insert(key.clone(), kept);
                }
            }
        }
        split.push(copy);
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Header, SharedHeader};

    fn header() -> SharedHeader {
        let mut header = Header::new("4.2");
        for line in &[
            "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">",
            "##INFO=<ID=AC,Number=R,Type=Integer,Description=\"Allele count\">",
            "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">",
            "##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">",
            "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">",
            "##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">",
        ] {
            header.parse_line(line).unwrap();
        }
        header
            .set_column_header("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2")
            .unwrap();
        header.into_shared()
    }

    fn decode(line: &str, lazy: bool) -> Variant {
        let fields: Vec<&str> = line.split('\t').collect();
        Variant::decode(&header(), &fields, 1, lazy).unwrap().value
    }

    const TRIALLELIC: &str = "1\t100\t.\tA\tC,G,T\t50.0\tPASS\tAF=0.1,0.2,0.3;AC=10,1,2,3;DP=9;DB\tGT:GL:AD\t0/1:281,5,9,58,0,115,338,46,116,809:10,1,2,3\t2/3:.:5,0,3,2";

    #[test]
    fn test_genotype_index() {
        // diploid layout: 00 01 11 02 12 22
        let diploid: [[usize; 2]; 6] = [[0, 0], [0, 1], [1, 1], [0, 2], [1, 2], [2, 2]];
        for (i, pair) in diploid.iter().enumerate() {
            assert_eq!(genotype_index(pair), Some(i));
        }
        // haploid is the allele itself
        assert_eq!(genotype_index(&[3]), Some(3));
        // triploid layout: 000 001 011 111 002
        assert_eq!(genotype_index(&[1, 1, 1]), Some(3));
        assert_eq!(genotype_index(&[0, 0, 2]), Some(4));
        assert_eq!(genotype_index(&[usize::MAX, usize::MAX]), None);
    }

    #[test]
    fn test_genotype_ploidy() {
        // a called GT wins when its length fits
        assert_eq!(genotype_ploidy(Some(3), "1,2,3,4", 1), 3);
        // no-call: diploid first, then whatever fits
        assert_eq!(genotype_ploidy(None, "1,2,3,4,5,6", 2), 2);
        assert_eq!(genotype_ploidy(None, "1,2,3", 2), 1);
        assert_eq!(genotype_ploidy(Some(2), "1,2,3", 2), 1);
        // nothing fits
        assert_eq!(genotype_ploidy(None, "1,2", 2), 2);
        assert_eq!(genotype_ploidy(Some(3), "1,2", 2), 3);
    }

    #[test]
    fn test_split_no_call_sample() {
        let line = "1\t100\t.\tA\tC,G\t50.0\tPASS\t.\tGT:PL\t0/1:0,10,100,20,110,200\t.:0,10,100,20,110,200";
        let split = split_alts(&decode(line, false)).unwrap();
        assert_eq!(split.len(), 2);
        let no_call = &split[0].genotypes().unwrap()[1];
        assert_eq!(no_call.field("PL"), Some("0,10,100"));
        assert_eq!(no_call.gl, vec![0.0, -1.0, -10.0]);
        assert_eq!(split[1].genotypes().unwrap()[1].field("PL"), Some("0,20,200"));
        assert_eq!(
            split[1].to_string(),
            "1\t100\t.\tA\tG\t50.0\tPASS\t.\tGT:PL\t0/1:0,20,200\t.:0,20,200"
        );
    }

    #[test]
    fn test_split_gl_combinatorics() {
        let split = split_alts(&decode(TRIALLELIC, false)).unwrap();
        assert_eq!(split.len(), 3);
        let first = &split[0].genotypes().unwrap()[0];
        assert_eq!(first.field("GL"), Some("281,5,9"));
        assert_eq!(first.gl, vec![281.0, 5.0, 9.0]);
        let second = &split[1].genotypes().unwrap()[0];
        assert_eq!(second.field("GL"), Some("281,58,115"));
        assert_eq!(second.gl, vec![281.0, 58.0, 115.0]);
    }

    #[test]
    fn test_split_lines() {
        let split = split_alts(&decode(TRIALLELIC, true)).unwrap();
        assert_eq!(
            split[1].to_string(),
            "1\t100\t.\tA\tG\t50.0\tPASS\tAF=0.2;AC=10,2;DP=9;DB\tGT:GL:AD\t0/1:281,58,115:10,2\t2/3:.:5,3"
        );
        assert_eq!(
            split[2].to_string(),
            "1\t100\t.\tA\tT\t50.0\tPASS\tAF=0.3;AC=10,3;DP=9;DB\tGT:GL:AD\t0/1:281,338,809:10,3\t2/3:.:5,2"
        );
    }

    #[test]
    fn test_split_rejects_bad_lengths() {
        let line = "1\t100\t.\tA\tC,G,T\t50.0\tPASS\tAF=0.1,0.2\tGT\t0/1\t0/0";
        match split_alts(&decode(line, false)) {
            Err(VcfError::Decomposition {
                key,
                expected,
                found,
                ..
            }) => {
                assert_eq!(key, "AF");
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_biallelic_genotype() {
        assert_eq!(biallelic_genotype(&[0, 2], 2), vec![0, 1]);
        assert_eq!(biallelic_genotype(&[1, 2], 2), vec![-1, 1]);
        assert_eq!(biallelic_genotype(&[-1, 0], 1), vec![-1, 0]);
    }
}
