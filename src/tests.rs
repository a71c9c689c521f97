use crate::config::CorrConfig;
use crate::corr::{self, CorrelationEngine, Curve, EngineState, StatKind};
use crate::io::write_curve_csv;
use crate::vcf::{self, VariantStream};

#[test]
fn two_sites_end_to_end() {
    let mut stream = VariantStream::from_path("testdata/two_sites.vcf").unwrap();
    let mut engine = CorrelationEngine::new(&CorrConfig::default()).unwrap();
    engine.run(&mut stream).unwrap();

    // the indel and the multi-allelic site never reach the engine
    let st = stream.stats();
    assert_eq!(st.emitted, 2);
    assert_eq!(st.non_snp, 2);
    assert_eq!(st.skipped, 4);
    assert_eq!(st.lines, 8);

    let acc = engine.finish();
    assert_eq!(acc.sum(5), 0.25);
    assert_eq!(acc.count(5), 1);
    assert_eq!(acc.sum(0), 1.0);
    assert_eq!(acc.count(0), 2);

    let curve = Curve::from_accumulator(acc);
    assert_eq!(curve.ks(), Some(0.5));
    let p2 = curve.get(5).unwrap();
    assert_eq!(p2.kind, StatKind::P2);
    assert_eq!(p2.value, 0.25);

    let mut buf = Vec::new();
    write_curve_csv(&curve, &mut buf).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "l,m,n,v,t,b\n0,0.5,0,2,Ks,all\n5,0.25,0,1,P2,all\n"
    );
}

#[test]
fn region_end_stops_reading() {
    let cfg = CorrConfig::from_toml_file("testdata/run.toml").unwrap();
    assert_eq!(cfg.max_lag, 150);
    assert_eq!(cfg.region_end, 500);

    let mut stream = VariantStream::from_path("testdata/region.vcf").unwrap();
    let mut engine = CorrelationEngine::new(&cfg).unwrap();
    // the unsorted and malformed lines after the third record are never read
    engine.run(&mut stream).unwrap();
    assert_eq!(engine.state(), EngineState::Draining);
    assert_eq!(stream.stats().emitted, 3);

    let (acc, stats) = engine.into_parts();
    assert_eq!(stats.admitted, 2);
    assert_eq!(acc.count(0), 2);
    assert_eq!(acc.sum(0), 1.25);
    assert_eq!(acc.count(100), 1);
    assert_eq!(acc.sum(100), 0.5);
    assert_eq!(acc.counts().iter().sum::<u64>(), 3);

    let curve = Curve::from_accumulator(&acc);
    assert_eq!(curve.ks(), Some(0.625));
    assert_eq!(curve.get(100).unwrap().value, 0.4);
}

#[test]
fn malformed_position_aborts_run() {
    let stream = VariantStream::from_path("testdata/malformed.vcf").unwrap();
    let mut engine = CorrelationEngine::new(&CorrConfig::default()).unwrap();
    let err = engine.run(stream).unwrap_err();
    match err {
        corr::Error::Stream {
            source: vcf::Error::InvalidPosition { line, value, .. },
        } => {
            assert_eq!(line, 6);
            assert_eq!(value, "1o1");
        }
        e => panic!("unexpected error: {e:?}"),
    }
}

#[test]
fn run_is_repeatable() {
    let run = || {
        let stream = VariantStream::from_path("testdata/two_sites.vcf").unwrap();
        let mut engine = CorrelationEngine::new(&CorrConfig::default()).unwrap();
        engine.run(stream).unwrap();
        engine.into_parts().0
    };
    assert_eq!(run(), run());
}

#[test]
fn bgzipped_input_matches_plain() {
    let mut stream = VariantStream::from_path("testdata/two_sites.vcf.gz").unwrap();
    let mut engine = CorrelationEngine::new(&CorrConfig::default()).unwrap();
    engine.run(&mut stream).unwrap();
    assert_eq!(stream.stats().emitted, 2);
    assert_eq!(stream.stats().non_snp, 2);

    let acc = engine.finish();
    assert_eq!(acc.sum(5), 0.25);
    assert_eq!(acc.count(5), 1);
    assert_eq!(acc.count(0), 2);
}

struct FailingReader;

impl std::io::Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "read failed"))
    }
}

#[test]
fn read_failure_aborts_run() {
    use std::io::{BufReader, Read};
    let text = std::fs::read("testdata/two_sites.vcf").unwrap();
    let stream = VariantStream::new(BufReader::new(text.as_slice().chain(FailingReader)));
    let mut engine = CorrelationEngine::new(&CorrConfig::default()).unwrap();
    let err = engine.run(stream).unwrap_err();
    match err {
        corr::Error::Stream {
            source: vcf::Error::Io { line, .. },
        } => assert_eq!(line, 9),
        e => panic!("unexpected error: {e:?}"),
    }
    // records read before the failure are still in the window
    assert_eq!(engine.stats().admitted, 2);
}
