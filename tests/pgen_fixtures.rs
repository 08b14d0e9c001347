use std::fs;
use std::path::Path;

use pgenwrite::config::WriterConfig;
use pgenwrite::pgen::{PgenMode, PgenOutputStream};
use pgenwrite::record::VariantRecord;
use pgenwrite::row::TabRow;
use pgenwrite::writer::pvar_path;
use pgenwrite::{GenotypeWriter, open_writer};
use tempfile::tempdir;

fn grouped_writer(pgen_path: &Path) -> GenotypeWriter {
    let config = WriterConfig {
        group: true,
        ..WriterConfig::default()
    };
    open_writer(&config, pgen_path).expect("open grouped writer")
}

fn write_lines(writer: &mut GenotypeWriter, lines: &[&str]) {
    for line in lines {
        let row = TabRow::parse(*line).expect("parse row");
        writer.write_row(&row).expect("write row");
    }
}

#[test]
fn grouped_three_sites_match_reference_bytes() {
    let tmp = tempdir().expect("temporary directory");
    let pgen_path = tmp.path().join("multiAllelic.pgen");
    let mut writer = grouped_writer(&pgen_path);
    write_lines(
        &mut writer,
        &[
            "chr1\t1\tA\tC\trs1\t01010103",
            "chr1\t1\tA\tG\trs1\t00110013",
            "chr1\t1\tA\tT\trs1\t00001113",
            "chr1\t2\tA\tC\trs2\t03030303",
            "chr1\t3\tA\tC\trs3\t01013333",
            "chr1\t3\tA\tG\trs3\t00113333",
        ],
    );
    let summary = writer.close().expect("close").expect("summary");
    assert_eq!(summary.variants, 3);
    assert_eq!(summary.samples, 8);
    assert_eq!(summary.blocks, 1);

    let wanted: [u8; 51] = [
        0x6c, 0x1b, 0x10, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x07, 0x23, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x08, 0x08, 0x00, 0x00, 0x00, 0x02,
        0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x94, 0xe9, 0x00, 0x06, 0x02, 0x07, 0x84,
        0x09, 0xcc, 0xcc, 0x94, 0xff, 0x00, 0x02, 0x01, 0x00,
    ];
    assert_eq!(fs::read(&pgen_path).expect("read pgen"), wanted);

    let pvar = fs::read_to_string(pvar_path(&pgen_path)).expect("read pvar");
    assert_eq!(
        pvar,
        "#CHROM\tID\tPOS\tALT\tREF\n\
         1\trs1\t1\tC,G,T\tA\n\
         1\trs2\t2\tC\tA\n\
         1\trs3\t3\tC,G\tA\n"
    );
}

#[test]
fn grouped_four_alts_match_reference_bytes() {
    let tmp = tempdir().expect("temporary directory");
    let pgen_path = tmp.path().join("fourAlts.pgen");
    let mut writer = grouped_writer(&pgen_path);
    write_lines(
        &mut writer,
        &[
            "chr1\t1\tA\tAA\trs1\t010101001003",
            "chr1\t1\tA\tAC\trs1\t001100100103",
            "chr1\t1\tA\tAG\trs1\t000011100013",
            "chr1\t1\tA\tAT\trs1\t000000011113",
        ],
    );
    writer.close().expect("close");

    let wanted: [u8; 35] = [
        0x6c, 0x1b, 0x10, 0x01, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x07, 0x19, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x94, 0x69, 0xea,
        0x00, 0x0e, 0x24, 0x3f, 0x84, 0xc9, 0xed,
    ];
    assert_eq!(fs::read(&pgen_path).expect("read pgen"), wanted);
}

#[test]
fn grouped_writer_with_no_rows_creates_nothing() {
    let tmp = tempdir().expect("temporary directory");
    let pgen_path = tmp.path().join("ghostFile.pgen");
    let writer = grouped_writer(&pgen_path);
    assert!(writer.close().expect("close").is_none());
    assert!(!pgen_path.exists());
    assert!(!pvar_path(&pgen_path).exists());
    assert_eq!(fs::read_dir(tmp.path()).expect("list").count(), 0);
}

#[test]
fn fixed_streams_with_no_records_create_nothing() {
    let tmp = tempdir().expect("temporary directory");
    for (name, mode) in [
        ("calls.pgen", PgenMode::HardCalls),
        ("dosages.pgen", PgenMode::HardCallsAndDosages),
        ("multi.pgen", PgenMode::VariableWidth),
    ] {
        let path = tmp.path().join(name);
        let stream = PgenOutputStream::create(&path, mode);
        assert!(stream.close().expect("close").is_none());
        assert!(!path.exists(), "{name} should not exist");
    }
}

#[test]
fn grouping_merges_only_matching_sites() {
    let tmp = tempdir().expect("temporary directory");
    let pgen_path = tmp.path().join("sites.pgen");
    let mut writer = grouped_writer(&pgen_path);
    write_lines(
        &mut writer,
        &[
            "chr1\t1\tA\tC\t.\t0120",
            "chr1\t1\tA\tG\t.\t0012",
            "chr1\t2\tA\tC\t.\t1111",
        ],
    );
    let summary = writer.close().expect("close").expect("summary");
    assert_eq!(summary.variants, 2);

    let bytes = fs::read(&pgen_path).expect("read pgen");
    let types_at = 12 + 8;
    assert_eq!(&bytes[types_at..types_at + 2], &[0x08, 0x00]);

    let pvar = fs::read_to_string(pvar_path(&pgen_path)).expect("read pvar");
    let lines: Vec<&str> = pvar.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "1\tchr1:1:C,G:A\t1\tC,G\tA");
    assert_eq!(lines[2], "1\tchr1:2:C:A\t2\tC\tA");
}

#[test]
fn fixed_width_file_shape() {
    let tmp = tempdir().expect("temporary directory");
    for (k, n) in [(1usize, 1usize), (3, 4), (5, 9), (17, 130)] {
        let path = tmp.path().join(format!("shape_{k}_{n}.pgen"));
        let mut stream = PgenOutputStream::create(&path, PgenMode::HardCalls);
        for v in 0..k {
            let calls: Vec<u8> = (0..n).map(|i| ((i + v) % 4) as u8).collect();
            let mut record = VariantRecord::bi_allelic(calls).expect("hard-call record");
            stream.write(&mut record).expect("write record");
        }
        stream.close().expect("close");

        let bytes = fs::read(&path).expect("read pgen");
        assert_eq!(bytes.len(), 12 + k * n.div_ceil(4), "k={k} n={n}");
        assert_eq!(&bytes[..3], &[0x6C, 0x1B, 0x02]);
        assert_eq!(&bytes[3..7], &(k as u32).to_le_bytes());
        assert_eq!(&bytes[7..11], &(n as u32).to_le_bytes());
    }
}

#[test]
fn dosage_example_bytes() {
    let tmp = tempdir().expect("temporary directory");
    let path = tmp.path().join("dosage.pgen");
    let mut stream = PgenOutputStream::create(&path, PgenMode::HardCallsAndDosages);
    let mut record = VariantRecord::bi_allelic_with_dosages(vec![0, 1, 2, 3], &[0.0, 1.0, 2.0, 0.0])
        .expect("dosage record");
    stream.write(&mut record).expect("write");
    stream.close().expect("close");

    let bytes = fs::read(&path).expect("read pgen");
    assert_eq!(bytes[2], 0x03);
    assert_eq!(
        &bytes[12..],
        &[0xE4, 0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0x00, 0x00]
    );
}
