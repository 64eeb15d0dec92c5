//! End-to-end pipeline tests over flat-file fixtures.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use ferro_consensus::{
    export, pipeline, ConsensusLabel, RunConfig, TsvSource,
};

const LAB_HEADER: &str =
    "chromosome\tstart\tstop\tref\talt\tgene\tclassification\ttranscript\tc_dna\tprotein\thgvs\n";

fn write_lab_table(dir: &Path, lab: &str, rows: &[&str]) {
    let mut file = File::create(dir.join(format!("vkgl_{lab}.tsv"))).unwrap();
    file.write_all(LAB_HEADER.as_bytes()).unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
}

fn write_history(dir: &Path, rows: &[&str]) {
    let mut file = File::create(dir.join("vkgl_history.tsv")).unwrap();
    file.write_all(b"id\tgene\ttranscript\tc_dna\n").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
}

fn fixture(dir: &Path) -> RunConfig {
    let input = dir.join("in");
    let output = dir.join("out");
    fs::create_dir_all(&input).unwrap();

    // snp classified benign-side by two labs, present in the 1810 export
    let snp = "11\t108167858\t108167858\tT\tA\tATM\t{tier}\tNM_000051.3\tc.146C>G\t\t";
    // opposite classifications between amc and nki
    let conflict = "1\t100\t100\tA\tC\tBRCA1\t{tier}\t\t\t\t";
    // deletion submitted with a left-anchor base, present pre-anchor in 1806
    let del = "3\t300\t302\tGAG\tG\tMLH1\tb\t\t\t\t";
    // classified by nki only
    let single = "2\t200\t200\tG\tT\tTP53\tvus\t\t\t\t";

    write_lab_table(&input, "amc", &[&snp.replace("{tier}", "b"), &conflict.replace("{tier}", "b"), del]);
    write_lab_table(&input, "lumc", &[&snp.replace("{tier}", "lb")]);
    write_lab_table(
        &input,
        "nki",
        &[&conflict.replace("{tier}", "p"), single],
    );
    write_history(
        &input,
        &[
            "1810_4d11f6c3b0\tATM\tNM_000051.3\tc.146C>G",
            "1806_3_301_AG_._MLH1\t\t\t",
            // stale row from an export that is not configured as previous
            "9999_4d11f6c3b0\tATM\tNM_000051.3\tc.146C>G",
        ],
    );

    RunConfig {
        labs: vec!["amc".to_string(), "lumc".to_string(), "nki".to_string()],
        prefix: "vkgl_".to_string(),
        previous: vec!["1806".to_string(), "1810".to_string()],
        history_file: "vkgl_history.tsv".to_string(),
        input,
        output,
    }
}

fn run_fixture(config: &RunConfig, tag: &str) -> pipeline::RunSummary {
    let source = TsvSource::new(
        &config.input,
        config.prefix.as_str(),
        config.history_file.as_str(),
    );
    pipeline::run_with_source(config, &source, tag).unwrap()
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let summary = run_fixture(&config, "1902");

    assert_eq!(summary.tag, "1902");
    assert_eq!(summary.variants, 4);
    assert_eq!(summary.corrections, 0);
    assert_eq!(summary.classifications["Classified by one lab"], 2);
    assert_eq!(summary.classifications["(Likely) benign"], 1);
    assert_eq!(summary.classifications["Opposite classifications"], 1);
    assert!(config.output.join("vkgl_summary_1902.json").exists());
    assert!(config.output.join("vkgl_log_1902.tsv").exists());

    let records = export::read_consensus(
        &config.output.join("vkgl_consensus_1902.tsv"),
        &config.labs,
    )
    .unwrap();
    assert_eq!(records.len(), 4);

    let by_gene = |gene: &str| {
        records
            .iter()
            .find(|record| record.key.gene == gene)
            .unwrap()
    };

    let snp = by_gene("ATM");
    assert_eq!(snp.classification, ConsensusLabel::LikelyBenign);
    assert_eq!(snp.lab_classifications.len(), 2);
    assert_eq!(snp.history, vec!["1810_4d11f6c3b0".to_string()]);

    let conflict = by_gene("BRCA1");
    assert_eq!(
        conflict.classification,
        ConsensusLabel::OppositeClassifications
    );

    // anchored GAG>G matched against the superseded dot notation
    let del = by_gene("MLH1");
    assert_eq!(del.key.reference, "GAG");
    assert_eq!(del.key.alternate, "G");
    assert_eq!(del.classification, ConsensusLabel::ClassifiedByOneLab);
    assert_eq!(del.history, vec!["1806_3_301_AG_._MLH1".to_string()]);

    let single = by_gene("TP53");
    assert_eq!(single.classification, ConsensusLabel::ClassifiedByOneLab);
}

#[test]
fn test_public_table_excludes_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    run_fixture(&config, "1902");

    let text = fs::read_to_string(config.output.join("vkgl_public_consensus_1902.tsv")).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    // snp, del and single-lab rows; the conflict is withheld
    assert_eq!(rows.len(), 3);
    assert!(!text.contains("BRCA1"));
    assert!(text.contains("11:108167858 ATM T>A\tLB\t2 labs"));
    assert!(text.contains("\tVUS\t1 lab"));
}

#[test]
fn test_lab_order_does_not_change_labels() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path());
    run_fixture(&config, "1902");
    let forward = export::read_consensus(
        &config.output.join("vkgl_consensus_1902.tsv"),
        &config.labs,
    )
    .unwrap();

    config.labs.reverse();
    run_fixture(&config, "1903");
    let reversed = export::read_consensus(
        &config.output.join("vkgl_consensus_1903.tsv"),
        &config.labs,
    )
    .unwrap();

    assert_eq!(forward.len(), reversed.len());
    for (a, b) in forward.iter().zip(&reversed) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.classification, b.classification);
        assert_eq!(a.tally, b.tally);
    }
}

#[test]
fn test_rerun_reports_from_existing_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    run_fixture(&config, "1902");

    let public = config.output.join("vkgl_public_consensus_1902.tsv");
    let before = fs::read_to_string(&public).unwrap();
    fs::remove_file(&public).unwrap();

    let summary = pipeline::rerun_reports(&config, "1902").unwrap();
    assert_eq!(summary.variants, 4);
    assert_eq!(fs::read_to_string(&public).unwrap(), before);
}

#[test]
fn test_invalid_classification_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    write_lab_table(
        &config.input,
        "amc",
        &["1\t100\t100\tA\tC\tBRCA1\tmaybe\t\t\t\t"],
    );
    let source = TsvSource::new(
        &config.input,
        config.prefix.as_str(),
        config.history_file.as_str(),
    );
    let err = pipeline::run_with_source(&config, &source, "1902").unwrap_err();
    assert!(err.is_data_error());
    assert!(!config.output.join("vkgl_consensus_1902.tsv").exists());
}
