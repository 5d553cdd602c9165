use std::io::{self, BufWriter};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use itertools::Itertools;

use rust_vcf::header::read_header;
use rust_vcf::record::{biallelic_genotype, split_alts, Record, Variant};
use rust_vcf::{VcfReader, VcfWriter};

// GT text for allele indices, -1 rendered as missing
fn render_gt(gt: &[i32], phased: bool) -> String {
    let separator = if phased { "|" } else { "/" };
    gt.iter()
        .map(|&allele| {
            if allele < 0 {
                ".".to_owned()
            } else {
                allele.to_string()
            }
        })
        .join(separator)
}

fn decompose(variant: &Variant) -> Result<Vec<Variant>> {
    if variant.alt_alleles().len() < 2 {
        return Ok(vec![variant.clone()]);
    }
    let mut split = split_alts(variant)
        .with_context(|| format!("line {}", variant.line_number()))?;
    for (index, record) in split.iter_mut().enumerate() {
        let has_gt = record.format().iter().any(|key| key == "GT");
        if let Some(samples) = record.genotypes_mut().filter(|_| has_gt) {
            for sample in samples.iter_mut() {
                sample.gt = biallelic_genotype(&sample.gt, index as i32 + 1);
                sample
                    .fields
                    .insert("GT".to_owned(), render_gt(&sample.gt, sample.phased));
            }
        }
    }
    Ok(split)
}

/// Splits every multiallelic record of a VCF into biallelic records.
fn main() -> Result<()> {
    env_logger::init();
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => bail!("expected the path of a plain or gzipped VCF file"),
    };

    let now = Instant::now();
    let mut reader = VcfReader::from_path(&path).with_context(|| format!("reading {}", path))?;
    let header = read_header(reader.header()).clone();
    let stdout = io::stdout();
    let mut writer = VcfWriter::new(BufWriter::new(stdout.lock()), &header)?;

    let mut records = 0usize;
    let mut written = 0usize;
    for variant in reader.by_ref() {
        records += 1;
        match decompose(&variant) {
            Ok(split) => {
                for record in &split {
                    writer.write_variant(record)?;
                }
                written += split.len();
            }
            Err(error) => log::warn!("skipping record: {:#}", error),
        }
    }
    writer.flush()?;
    log::info!(
        "{} records in, {} records out in {:?}",
        records,
        written,
        now.elapsed()
    );

    if let Some(errors) = reader.error() {
        eprintln!("{}", errors);
    }
    Ok(())
}
