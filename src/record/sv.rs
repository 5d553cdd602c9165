use crate::error::{Decoded, VcfError};
use crate::record::Variant;

/// Symbolic alleles whose extent comes from SVLEN or END.
const SIZED_SYMBOLIC: [&str; 5] = ["<DEL", "<DUP", "<INV", "<CN", "<INS"];

/// A half-open, 0-based interval around a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceInterval {
    pub start: u64,
    pub end: u64,
    /// `false` when the record carried no usable CIPOS/CIEND.
    pub declared: bool,
}

impl Variant {
    /// 0-based start.
    pub fn start(&self) -> u64 {
        self.pos.saturating_sub(1)
    }

    /// End coordinate of the variant.
    ///
    /// Literal alleles span the reference allele. Sized symbolic alleles use
    /// `|SVLEN|` past POS, then END, and finally fall back to POS + 1 with a
    /// warning. Other symbolic alleles end at POS.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf::header::Header;
    /// use rust_vcf::record::Variant;
    ///
    /// let header = Header::new("4.2").into_shared();
    /// let mut variant = Variant::new(header, "2", 321682, "T", vec!["<DEL>".into()]);
    /// variant.info_mut().set_raw("SVLEN", "-205");
    /// assert_eq!(variant.end().value, 321887);
    /// ```
    pub fn end(&self) -> Decoded<u64> {
        let alt = match self.alt_alleles.first() {
            Some(alt) if alt.starts_with('<') => alt,
            _ => return Decoded::ok(self.start().saturating_add(self.ref_allele.len() as u64)),
        };
        if !SIZED_SYMBOLIC.iter().any(|prefix| alt.starts_with(prefix)) {
            return Decoded::ok(self.pos);
        }
        if let Some(length) = self.info_integer("SVLEN") {
            return Decoded::ok(self.pos.saturating_add(length.unsigned_abs()));
        }
        if let Some(end) = self.info_integer("END") {
            return Decoded::ok(end.max(0) as u64);
        }
        Decoded::with_error(
            self.pos.saturating_add(1),
            VcfError::UnresolvedSvEnd {
                chrom: self.chrom.clone(),
                pos: self.pos,
            },
        )
    }

    /// Interval around the start from CIPOS.
    pub fn ci_pos(&self) -> ConfidenceInterval {
        let start = self.start();
        match self.info_offsets("CIPOS") {
            Some((left, right)) => ConfidenceInterval {
                start: start.saturating_add_signed(left),
                end: start.saturating_add_signed(right.saturating_add(1)),
                declared: true,
            },
            None => ConfidenceInterval {
                start,
                end: start.saturating_add(1),
                declared: false,
            },
        }
    }

    /// Interval around the end from CIEND.
    pub fn ci_end(&self) -> Decoded<ConfidenceInterval> {
        let offsets = self.info_offsets("CIEND");
        self.end().map(|end| match offsets {
            Some((left, right)) => ConfidenceInterval {
                start: end.saturating_add_signed(left.saturating_sub(1)),
                end: end.saturating_add_signed(right),
                declared: true,
            },
            None => ConfidenceInterval {
                start: end.saturating_sub(1),
                end,
                declared: false,
            },
        })
    }

    // first element of a numeric INFO value, declared or not
    fn info_integer(&self, key: &str) -> Option<i64> {
        self.info.raw(key)?.split(',').next()?.parse().ok()
    }

    fn info_offsets(&self, key: &str) -> Option<(i64, i64)> {
        let mut offsets = self.info.raw(key)?.split(',').map(str::parse::<i64>);
        match (offsets.next(), offsets.next(), offsets.next()) {
            (Some(Ok(left)), Some(Ok(right)), None) => Some((left, right)),
            _ => None,
        }
    }
}
