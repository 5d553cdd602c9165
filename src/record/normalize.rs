use crate::record::{Record, Variant};

/// Removes bases shared at the start of `ref_allele` and `alt`, keeping at
/// least one base in each, and moves `pos` past them.
pub fn left_trim(pos: u64, ref_allele: &[u8], alt: &[u8]) -> (u64, Vec<u8>, Vec<u8>) {
    let shortest = ref_allele.len().min(alt.len());
    let mut shared = 0;
    while shared + 1 < shortest && ref_allele[shared] == alt[shared] {
        shared += 1;
    }
    (
        pos.saturating_add(shared as u64),
        ref_allele[shared..].to_vec(),
        alt[shared..].to_vec(),
    )
}

/// Shifts an indel as far left as `seq` allows.
///
/// `seq` is the reference sequence ending with `ref_allele`; the bases before
/// it are the ones the alleles may slide over.
///
/// # Examples
///
/// ```
/// use rust_vcf::record::left_align;
///
/// let (pos, ref_allele, alt) = left_align(123, b"CAC", b"C", b"GGGCACACAC");
/// assert_eq!(pos, 118);
/// assert_eq!(ref_allele, b"GCA");
/// assert_eq!(alt, b"G");
/// ```
pub fn left_align(pos: u64, ref_allele: &[u8], alt: &[u8], seq: &[u8]) -> (u64, Vec<u8>, Vec<u8>) {
    let prefix = &seq[..seq.len().saturating_sub(ref_allele.len())];
    let mut ref_allele = ref_allele.to_vec();
    let mut alt = alt.to_vec();
    let mut j = prefix.len();
    while j > 0 {
        let mut moved = false;
        if let (Some(r), Some(a)) = (ref_allele.last(), alt.last()) {
            if r == a {
                ref_allele.pop();
                alt.pop();
                moved = true;
            }
        }
        if ref_allele.is_empty() || alt.is_empty() {
            j -= 1;
            ref_allele.insert(0, prefix[j]);
            alt.insert(0, prefix[j]);
            moved = true;
        }
        if !moved {
            break;
        }
    }
    (pos.saturating_sub((prefix.len() - j) as u64), ref_allele, alt)
}

impl Variant {
    /// Same site and at least one alternate allele in common.
    pub fn is_same_site(&self, other: &Variant) -> bool {
        self.pos() == other.pos()
            && self.chrom() == other.chrom()
            && self.ref_allele() == other.ref_allele()
            && self
                .alt_alleles()
                .iter()
                .any(|alt| other.alt_alleles().contains(alt))
    }
}
