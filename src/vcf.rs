use bstr::{BStr, BString, ByteSlice};
use log::*;
use rust_htslib::bgzf;
use snafu::prelude::*;
use std::backtrace::Backtrace;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lines starting with this byte are meta-information or header lines
pub const COMMENT_MARKER: u8 = b'#';
pub const FIELD_DELIMITER: &str = "\t";
/// The FORMAT column value after which every field is a sample genotype
pub const GT_MARKER: &[u8] = b"GT";
/// Allele separators removed from genotype fields (phased and unphased)
pub const PHASE_SEPARATORS: &[u8] = b"|/";
/// CHROM, POS, ID, REF, ALT
pub const MIN_FIELDS: usize = 5;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot open variant source {path}"))]
    Open {
        source: rust_htslib::errors::Error,
        path: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("failed to read line {line}"))]
    Io {
        source: std::io::Error,
        line: usize,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("line {line}: expected at least {} fields, found {found}", MIN_FIELDS))]
    TooFewFields {
        line: usize,
        found: usize,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("line {line}: invalid position {value:?}"))]
    InvalidPosition {
        source: std::num::ParseIntError,
        line: usize,
        value: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("line {line}: found {found} genotype calls, expected {expected}"))]
    GenotypeLengthMismatch {
        line: usize,
        expected: usize,
        found: usize,
        backtrace: Option<Backtrace>,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// A biallelic SNP with its genotype calls flattened over samples and
/// chromosome copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    chrom: BString,
    pos: u64,
    ref_allele: u8,
    alt_allele: u8,
    gts: Vec<u8>,
}

impl VariantRecord {
    pub fn new(
        chrom: impl Into<BString>,
        pos: u64,
        ref_allele: u8,
        alt_allele: u8,
        gts: Vec<u8>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            ref_allele,
            alt_allele,
            gts,
        }
    }
    pub fn chrom(&self) -> &BStr {
        self.chrom.as_bstr()
    }
    /// 1-based position as written in the source
    pub fn pos(&self) -> u64 {
        self.pos
    }
    pub fn ref_allele(&self) -> u8 {
        self.ref_allele
    }
    pub fn alt_allele(&self) -> u8 {
        self.alt_allele
    }
    pub fn genotypes(&self) -> &[u8] {
        &self.gts
    }
}

/// Counters describing what the stream has consumed so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: usize,
    /// comment and blank lines
    pub skipped: usize,
    /// multi-allelic sites and indels
    pub non_snp: usize,
    pub emitted: usize,
    /// emitted records whose line had no GT marker
    pub without_genotypes: usize,
}

enum Line {
    Skip,
    NonSnp,
    Record { rec: VariantRecord, has_marker: bool },
}

/// Lazy, single-pass decoder of variant-call text into biallelic SNP records.
///
/// The stream yields `Err` at most once; after a fatal error, or once the
/// source is exhausted, it only yields `None`.
pub struct VariantStream<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    n_gts: Option<usize>,
    stats: StreamStats,
    done: bool,
}

impl VariantStream<BufReader<bgzf::Reader>> {
    /// Open a plain or BGZF-compressed VCF file; `-` reads standard input.
    pub fn from_path(p: impl AsRef<Path>) -> Result<Self> {
        let p = p.as_ref();
        let path = p.to_string_lossy().to_string();
        let reader = if p == Path::new("-") {
            bgzf::Reader::from_stdin()
        } else {
            bgzf::Reader::from_path(p)
        }
        .context(OpenSnafu { path: path.clone() })?;
        info!("reading variants from {path}");
        Ok(Self::new(BufReader::new(reader)))
    }
}

impl<R: BufRead> VariantStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(1024),
            line_no: 0,
            n_gts: None,
            stats: StreamStats::default(),
            done: false,
        }
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Length of the genotype vectors emitted so far, if any had calls
    pub fn n_genotypes(&self) -> Option<usize> {
        self.n_gts
    }

    fn next_record(&mut self) -> Result<Option<VariantRecord>> {
        loop {
            self.buf.clear();
            let nread = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .context(IoSnafu {
                    line: self.line_no + 1,
                })?;
            if nread == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            self.stats.lines += 1;

            match parse_line(&self.buf, self.line_no)? {
                Line::Skip => self.stats.skipped += 1,
                Line::NonSnp => {
                    debug!("line {}: skip non-SNP site", self.line_no);
                    self.stats.non_snp += 1;
                }
                Line::Record { rec, has_marker } => {
                    if !has_marker {
                        warn!(
                            "line {}: no GT column, record at {} carries no genotype calls",
                            self.line_no,
                            rec.pos()
                        );
                        self.stats.without_genotypes += 1;
                    }
                    let found = rec.genotypes().len();
                    if found > 0 {
                        let expected = *self.n_gts.get_or_insert(found);
                        ensure!(
                            expected == found,
                            GenotypeLengthMismatchSnafu {
                                line: self.line_no,
                                expected,
                                found,
                            }
                        );
                    }
                    self.stats.emitted += 1;
                    return Ok(Some(rec));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for VariantStream<R> {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res = self.next_record();
        if !matches!(res, Ok(Some(_))) {
            self.done = true;
        }
        res.transpose()
    }
}

fn parse_line(line: &[u8], line_no: usize) -> Result<Line> {
    let line = line.trim_end();
    if line.is_empty() || line[0] == COMMENT_MARKER {
        return Ok(Line::Skip);
    }

    let mut fields = line.split_str(FIELD_DELIMITER);
    let mut leading: [&[u8]; MIN_FIELDS] = [b""; MIN_FIELDS];
    for (i, slot) in leading.iter_mut().enumerate() {
        *slot = fields.next().context(TooFewFieldsSnafu {
            line: line_no,
            found: i,
        })?;
    }
    let [chrom, pos, _id, ref_allele, alt_allele] = leading;

    let pos_str = pos.to_str_lossy();
    let pos: u64 = pos_str.parse().context(InvalidPositionSnafu {
        line: line_no,
        value: pos_str.to_string(),
    })?;

    if ref_allele.len() != 1 || alt_allele.len() != 1 {
        return Ok(Line::NonSnp);
    }

    let mut gts = Vec::new();
    let mut has_marker = false;
    for field in fields {
        if has_marker {
            gts.extend(
                field
                    .iter()
                    .copied()
                    .filter(|b| !PHASE_SEPARATORS.contains(b)),
            );
        } else if field == GT_MARKER {
            has_marker = true;
        }
    }

    let rec = VariantRecord::new(chrom, pos, ref_allele[0], alt_allele[0], gts);
    Ok(Line::Record { rec, has_marker })
}
