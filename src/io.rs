use crate::corr::curve::{Curve, GROUP_LABEL};
use crate::utils::path;
use arrow::array::*;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use log::*;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use std::backtrace::Backtrace;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot write {path}"))]
    Io {
        source: std::io::Error,
        path: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("cannot write csv {path}"))]
    Csv {
        source: csv::Error,
        path: String,
        backtrace: Option<Backtrace>,
    },
    Arrow {
        #[snafu(source(from(ArrowError, Box::new)))]
        source: Box<ArrowError>,
        backtrace: Option<Backtrace>,
    },
    Parquet {
        #[snafu(source(from(ParquetError, Box::new)))]
        source: Box<ParquetError>,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("cannot derive output path"))]
    OutputPath {
        #[snafu(backtrace)]
        source: path::Error,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// Column names: lag, value, unused, pair count, statistic kind, group
pub const CURVE_HEADER: [&str; 6] = ["l", "m", "n", "v", "t", "b"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "pq",
        }
    }
}

pub trait IntoArrowArray {
    fn into_arrow_array(self) -> ArrayRef;
}

impl IntoArrowArray for Vec<u64> {
    fn into_arrow_array(self) -> ArrayRef {
        Arc::new(UInt64Array::from(self)) as ArrayRef
    }
}
impl IntoArrowArray for Vec<f64> {
    fn into_arrow_array(self) -> ArrayRef {
        Arc::new(Float64Array::from(self)) as ArrayRef
    }
}
impl IntoArrowArray for Vec<String> {
    fn into_arrow_array(self) -> ArrayRef {
        Arc::new(StringArray::from(self)) as ArrayRef
    }
}

/// Format a value the way Go's `%g` verb does: shortest digits, exponent
/// form below 1e-4 or from 1e6 up, and `+Inf`/`-Inf`/`NaN`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let sci = format!("{v:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return v.to_string(),
    };
    if exp < -4 || exp >= 6 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        v.to_string()
    }
}

/// Write the curve as comma-separated rows under [`CURVE_HEADER`]
pub fn write_curve_csv(curve: &Curve, w: impl Write) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(CURVE_HEADER)?;
    for row in curve.rows() {
        writer.write_record([
            row.lag.to_string(),
            format_value(row.value),
            "0".to_string(),
            row.pair_count.to_string(),
            row.kind.to_string(),
            GROUP_LABEL.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Create `p` and write the curve to it as CSV
pub fn write_curve_csv_file(curve: &Curve, p: impl AsRef<Path>) -> Result<()> {
    let path = p.as_ref().to_string_lossy().to_string();
    let file = File::create(p.as_ref()).context(IoSnafu { path: path.clone() })?;
    write_curve_csv(curve, BufWriter::new(file)).context(CsvSnafu { path })
}

pub fn curve_to_record_batch(curve: &Curve) -> Result<RecordBatch> {
    let rows = curve.rows();
    let lags: Vec<u64> = rows.iter().map(|r| r.lag as u64).collect();
    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let unused: Vec<u64> = vec![0; rows.len()];
    let counts: Vec<u64> = rows.iter().map(|r| r.pair_count).collect();
    let kinds: Vec<String> = rows.iter().map(|r| r.kind.to_string()).collect();
    let groups: Vec<String> = vec![GROUP_LABEL.to_string(); rows.len()];

    let [l, m, n, v, t, b] = CURVE_HEADER;
    RecordBatch::try_from_iter(vec![
        (l, lags.into_arrow_array()),
        (m, values.into_arrow_array()),
        (n, unused.into_arrow_array()),
        (v, counts.into_arrow_array()),
        (t, kinds.into_arrow_array()),
        (b, groups.into_arrow_array()),
    ])
    .context(ArrowSnafu {})
}

pub fn write_curve_parquet(curve: &Curve, p: impl AsRef<Path>) -> Result<()> {
    let batch = curve_to_record_batch(curve)?;
    let file = File::create(p.as_ref()).context(IoSnafu {
        path: p.as_ref().to_string_lossy().to_string(),
    })?;
    // default writer properties
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context(ParquetSnafu {})?;
    writer.write(&batch).context(ParquetSnafu {})?;
    // writer must be closed to write footer
    writer.close().context(ParquetSnafu {})?;
    Ok(())
}

/// Write the curve to `<prefix>.<ext>` and return the path written
pub fn write_curve(
    curve: &Curve,
    prefix: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<PathBuf> {
    let p = path::from_prefix(prefix, format.extension()).context(OutputPathSnafu {})?;
    match format {
        OutputFormat::Csv => write_curve_csv_file(curve, &p)?,
        OutputFormat::Parquet => write_curve_parquet(curve, &p)?,
    }
    info!("wrote {} rows to {}", curve.len(), p.to_string_lossy());
    Ok(p)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::corr::Accumulator;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn small_curve() -> Curve {
        let mut acc = Accumulator::new(10);
        acc.add(0, 0.5);
        acc.add(0, 0.5);
        acc.add(5, 0.25);
        Curve::from_accumulator(&acc)
    }

    #[test]
    fn test_csv_rows() {
        let mut buf = Vec::new();
        write_curve_csv(&small_curve(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "l,m,n,v,t,b\n0,0.5,0,2,Ks,all\n5,0.25,0,1,P2,all\n");
    }

    #[test]
    fn test_go_style_values() {
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(123456.0), "123456");
        assert_eq!(format_value(0.0001), "0.0001");
        assert_eq!(format_value(1e-7), "1e-07");
        assert_eq!(format_value(1.5e6), "1.5e+06");
        assert_eq!(format_value(-2.5e-5), "-2.5e-05");
        assert_eq!(format_value(1e100), "1e+100");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn test_csv_zero_lag0_sum() {
        let mut acc = Accumulator::new(5);
        acc.add(0, 0.0);
        acc.add(3, 0.5);
        let mut buf = Vec::new();
        write_curve_csv(&Curve::from_accumulator(&acc), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "l,m,n,v,t,b\n0,0,0,1,Ks,all\n3,+Inf,0,1,P2,all\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_csv_write_error_names_file() {
        let err = write_curve_csv_file(&small_curve(), "/dev/full").unwrap_err();
        match err {
            Error::Csv { path, .. } => assert_eq!(path, "/dev/full"),
            e => panic!("unexpected error: {e:?}"),
        }
    }

    #[test]
    fn test_parquet_roundtrip_shape() {
        let dir = std::env::temp_dir().join(format!("mcorr_test_parquet_{}", std::process::id()));
        let prefix = dir.join("curve");
        let p = write_curve(&small_curve(), &prefix, OutputFormat::Parquet).unwrap();
        assert_eq!(p, dir.join("curve.pq"));

        let file = File::open(&p).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let mut nrows = 0;
        for batch in reader {
            let batch = batch.unwrap();
            assert_eq!(batch.num_columns(), 6);
            let lags = batch
                .column(0)
                .as_any()
                .downcast_ref::<UInt64Array>()
                .unwrap();
            assert_eq!(lags.values().to_vec(), vec![0, 5]);
            nrows += batch.num_rows();
        }
        assert_eq!(nrows, 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}
