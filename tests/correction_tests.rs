use motif_significance::correction::{adjust_pvalues, CorrectionMethod};
use motif_significance::error::SignificanceError;

const RAW: [f64; 6] = [0.01, 0.04, 0.03, 0.005, 0.2, 0.5];

fn assert_all_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "expected {:?}, got {:?}", expected, actual);
    }
}

fn adjust(method: &str) -> Vec<f64> {
    adjust_pvalues(&RAW, method).unwrap()
}

#[test]
fn test_reference_adjustments() {
    assert_all_close(&adjust("bonferroni"), &[0.06, 0.24, 0.18, 0.03, 1.0, 1.0]);
    assert_all_close(&adjust("holm"), &[0.05, 0.12, 0.12, 0.03, 0.4, 0.5]);
    assert_all_close(&adjust("hochberg"), &[0.05, 0.12, 0.12, 0.03, 0.4, 0.5]);
    assert_all_close(&adjust("BH"), &[0.03, 0.06, 0.06, 0.03, 0.24, 0.5]);
    assert_all_close(&adjust("BY"), &[0.0735, 0.147, 0.147, 0.0735, 0.588, 1.0]);
    assert_all_close(&adjust("hommel"), &[0.05, 0.12, 0.09, 0.03, 0.4, 0.5]);
}

#[test]
fn test_fdr_is_bh() {
    assert_eq!(adjust("fdr"), adjust("BH"));
    assert_eq!(
        CorrectionMethod::from_name("fdr").unwrap(),
        CorrectionMethod::BenjaminiHochberg
    );
}

#[test]
fn test_none_is_identity() {
    assert_eq!(adjust("none"), RAW.to_vec());
}

#[test]
fn test_bonferroni_identical_values() {
    let adjusted = adjust_pvalues(&[0.01; 7], "bonferroni").unwrap();
    assert_all_close(&adjusted, &[0.07; 7]);

    let adjusted = adjust_pvalues(&[0.3; 7], "bonferroni").unwrap();
    assert_all_close(&adjusted, &[1.0; 7]);
}

#[test]
fn test_two_tests_hommel_is_hochberg() {
    let pvalues = [0.02, 0.04];
    assert_eq!(
        adjust_pvalues(&pvalues, "hommel").unwrap(),
        adjust_pvalues(&pvalues, "hochberg").unwrap()
    );
}

#[test]
fn test_empty_and_single() {
    for name in CorrectionMethod::names() {
        assert!(adjust_pvalues(&[], name).unwrap().is_empty());
        assert_eq!(adjust_pvalues(&[0.3], name).unwrap(), vec![0.3]);
    }
}

#[test]
fn test_unknown_method() {
    let result = adjust_pvalues(&RAW, "sidak");
    assert!(matches!(result, Err(SignificanceError::UnknownMethod(name)) if name == "sidak"));

    // names are case sensitive
    assert!("bh".parse::<CorrectionMethod>().is_err());
    assert!("Bonferroni".parse::<CorrectionMethod>().is_err());
}

#[test]
fn test_names_round_trip() {
    let names: Vec<&str> = CorrectionMethod::names().collect();
    assert_eq!(names.len(), 8);
    for name in names {
        let method: CorrectionMethod = name.parse().unwrap();
        assert_eq!(method.to_string().parse::<CorrectionMethod>().unwrap(), method);
    }
}

#[test]
fn test_ties_get_equal_adjustments() {
    let pvalues = [0.02, 0.01, 0.02, 0.02];
    for name in ["holm", "hochberg", "hommel", "BH", "BY"] {
        let adjusted = adjust_pvalues(&pvalues, name).unwrap();
        assert_eq!(adjusted[0], adjusted[2], "{}", name);
        assert_eq!(adjusted[2], adjusted[3], "{}", name);
    }
}
