use motif_significance::config::{CorrectionFamilies, SignificanceConfig};
use motif_significance::correction::CorrectionMethod;
use motif_significance::statistics::{
    motif_statistics, CollectionStatistics, EffectCounts, MotifCounts, MotifStatistic, COLUMNS,
};
use motif_significance::table::Direction;
use motif_significance::types::{MotifInfo, MotifInfos, Quality};

fn motif_counts(motif: &str, cancer_positive: u64, random_unclassified: u64) -> MotifCounts {
    MotifCounts {
        motif: motif.to_string(),
        disruption: EffectCounts {
            cancer_total: 100,
            cancer_positive,
            random_total: 100,
            random_positive: 5,
        },
        emergence: EffectCounts::default(),
        random_unclassified,
    }
}

fn two_motifs() -> Vec<MotifCounts> {
    vec![motif_counts("STRONG", 20, 0), motif_counts("WEAK", 6, 0)]
}

#[test]
fn test_end_to_end_ordering() {
    let config = SignificanceConfig::default();
    let motifs = motif_statistics(&two_motifs(), &MotifInfos::default(), &config).unwrap();
    assert!(motifs[0].disruption().pvalue() < motifs[1].disruption().pvalue());

    let collection = CollectionStatistics::from_config(motifs, &config);
    let strong = collection.get("STRONG").unwrap();
    let weak = collection.get("WEAK").unwrap();
    assert!(
        strong.disruption().corrected_pvalue().unwrap()
            < weak.disruption().corrected_pvalue().unwrap()
    );
    assert_eq!(strong.disruption().direction(), Direction::Enriched);

    // BH over two tests doubles the smallest p-value
    let raw = strong.disruption().pvalue();
    let corrected = strong.disruption().corrected_pvalue().unwrap();
    assert!((corrected - 2.0 * raw).abs() < 1e-15);
}

#[test]
fn test_degenerate_emergence_is_one() {
    let config = SignificanceConfig::default();
    let motifs = motif_statistics(&two_motifs(), &MotifInfos::default(), &config).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &config);
    for motif in collection.motifs() {
        assert_eq!(motif.emergence().pvalue(), 1.0);
        assert_eq!(motif.emergence().corrected_pvalue(), Some(1.0));
        assert_eq!(motif.emergence().rate_ratio(), None);
    }
}

#[test]
fn test_joint_family() {
    let config = SignificanceConfig {
        correction_method: CorrectionMethod::Bonferroni,
        correction_families: CorrectionFamilies::Joint,
        ..SignificanceConfig::default()
    };
    let motifs = motif_statistics(&two_motifs(), &MotifInfos::default(), &config).unwrap();
    let raw = motifs[0].disruption().pvalue();
    let collection = CollectionStatistics::from_config(motifs, &config);
    let corrected = collection.motifs()[0].disruption().corrected_pvalue().unwrap();
    // four tests in one family
    assert!((corrected - 4.0 * raw).abs() < 1e-15);

    let separate = SignificanceConfig {
        correction_families: CorrectionFamilies::Separate,
        ..config
    };
    let motifs = motif_statistics(&two_motifs(), &MotifInfos::default(), &separate).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &separate);
    let corrected = collection.motifs()[0].disruption().corrected_pvalue().unwrap();
    assert!((corrected - 2.0 * raw).abs() < 1e-15);
}

#[test]
fn test_control_set_multiplier() {
    let doubled = SignificanceConfig {
        control_set_multiplier: 2,
        ..SignificanceConfig::default()
    };
    let scaled = MotifStatistic::from_counts(
        &motif_counts("M", 20, 0),
        MotifInfo::default(),
        &doubled,
    )
    .unwrap();

    let mut manual_counts = motif_counts("M", 20, 0);
    manual_counts.disruption.random_total = 200;
    manual_counts.disruption.random_positive = 10;
    let manual = MotifStatistic::from_counts(
        &manual_counts,
        MotifInfo::default(),
        &SignificanceConfig::default(),
    )
    .unwrap();

    assert_eq!(scaled.disruption().pvalue(), manual.disruption().pvalue());
    assert_eq!(scaled.disruption().table(), manual.disruption().table());
}

#[test]
fn test_underfitting_in_statistics() {
    let config = SignificanceConfig {
        control_set_multiplier: 2,
        ..SignificanceConfig::default()
    };
    let statistic =
        MotifStatistic::from_counts(&motif_counts("M", 20, 5), MotifInfo::default(), &config)
            .unwrap();
    assert_eq!(statistic.random_unclassified(), 10);
    assert_eq!(statistic.disruption().table().class_b_total(), 200);
    assert_eq!(statistic.disruption().adjusted_table().class_b_total(), 210);
    assert_eq!(statistic.disruption().adjusted_table().class_b_positive(), 10);

    let ignoring = SignificanceConfig {
        ignore_underfitting: true,
        ..config
    };
    let statistic =
        MotifStatistic::from_counts(&motif_counts("M", 20, 5), MotifInfo::default(), &ignoring)
            .unwrap();
    assert_eq!(statistic.random_unclassified(), 0);
    assert_eq!(statistic.disruption().adjusted_table().class_b_total(), 200);
}

#[test]
fn test_invalid_counts_fail_the_run() {
    let mut counts = two_motifs();
    counts[1].disruption.cancer_positive = 101;
    let result = motif_statistics(&counts, &MotifInfos::default(), &SignificanceConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_zero_multiplier_fails() {
    let config = SignificanceConfig {
        control_set_multiplier: 0,
        ..SignificanceConfig::default()
    };
    assert!(motif_statistics(&two_motifs(), &MotifInfos::default(), &config).is_err());
}

#[test]
fn test_filter_and_order() {
    let counts = vec![motif_counts("WEAK", 6, 0), motif_counts("STRONG", 20, 0)];
    let config = SignificanceConfig::default();
    let motifs = motif_statistics(&counts, &MotifInfos::default(), &config).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &config);

    let significant: Vec<&str> = collection.significant(0.05).map(|m| m.motif()).collect();
    assert_eq!(significant, vec!["STRONG"]);

    let ordered: Vec<&str> = collection
        .sorted_by_significance()
        .into_iter()
        .map(|m| m.motif())
        .collect();
    assert_eq!(ordered, vec!["STRONG", "WEAK"]);

    // rendering keeps input order
    assert_eq!(collection.motifs()[0].motif(), "WEAK");
}

#[test]
fn test_write_tsv() {
    let mut infos = MotifInfos::default();
    infos.insert(
        "STRONG",
        MotifInfo {
            gene: Some("GENE1,GENE2".to_string()),
            official_gene_name: Some("GENE1".to_string()),
            quality: Some(Quality::B),
            weight: Some(0.5),
        },
    );
    let config = SignificanceConfig::default();
    let motifs = motif_statistics(&two_motifs(), &infos, &config).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &config);

    let mut output = Vec::new();
    collection.write_tsv(&mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], COLUMNS.join("\t"));

    let strong: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(strong.len(), COLUMNS.len());
    assert_eq!(&strong[..5], &["STRONG", "GENE1,GENE2", "GENE1", "B", "0.5"]);
    assert_eq!(&strong[5..10], &["20", "100", "5", "100", "100"]);
    assert_eq!(strong[10], "4");
    assert_eq!(strong[11], "enriched");
    assert_eq!(strong[23], "0");

    // metadata of unknown motifs is absent, not an error
    let weak: Vec<&str> = lines[2].split('\t').collect();
    assert_eq!(&weak[..5], &["WEAK", "NA", "NA", "NA", "NA"]);
    assert_eq!(weak[19], "NA");
    assert_eq!(weak[20], "unchanged");
}

#[test]
fn test_rows_are_self_consistent_with_underfitting() {
    let config = SignificanceConfig::default();
    let motifs =
        motif_statistics(&[motif_counts("M", 20, 5)], &MotifInfos::default(), &config).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &config);

    let mut output = Vec::new();
    collection.write_tsv(&mut output).unwrap();
    let output = String::from_utf8(output).unwrap();
    let header: Vec<&str> = output.lines().next().unwrap().split('\t').collect();
    let row: Vec<&str> = output.lines().nth(1).unwrap().split('\t').collect();
    let field = |name: &str| row[header.iter().position(|c| *c == name).unwrap()];
    let count = |name: &str| field(name).parse::<f64>().unwrap();

    assert_eq!(field("disruption_random_total"), "100");
    assert_eq!(field("disruption_random_total_adjusted"), "105");
    assert_eq!(
        count("disruption_random_total_adjusted"),
        count("disruption_random_total") + count("random_unclassified")
    );

    // the rate ratio follows from the printed cancer cells and adjusted random total
    let expected = (count("disruption_cancer_positive") / count("disruption_cancer_total"))
        / (count("disruption_random_positive") / count("disruption_random_total_adjusted"));
    assert!((count("disruption_rate_ratio") - expected).abs() < 1e-12);
    assert_eq!(field("disruption_direction"), "enriched");
}

#[test]
fn test_to_dataframe() {
    let config = SignificanceConfig::default();
    let motifs = motif_statistics(&two_motifs(), &MotifInfos::default(), &config).unwrap();
    let collection = CollectionStatistics::from_config(motifs, &config);
    let df = collection.to_dataframe().unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(df.width(), COLUMNS.len());
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, COLUMNS.to_vec());
}

#[test]
fn test_empty_collection() {
    let collection =
        CollectionStatistics::new(Vec::new(), CorrectionMethod::Hommel, CorrectionFamilies::Joint);
    assert!(collection.is_empty());
    let mut output = Vec::new();
    collection.write_tsv(&mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
}
