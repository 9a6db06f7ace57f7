use crate::analysis::analyzer::{analyze_line, DetectionResult};
use crate::prelude::{DetectionConfig, ParseError};
use rayon::prelude::*;

/// Analyzes many sweep lines in parallel. Results come back in input order.
pub fn analyze_batch<S>(lines: &[S], config: &DetectionConfig) -> Vec<Result<DetectionResult, ParseError>>
where
    S: AsRef<str> + Sync,
{
    lines
        .par_iter()
        .map(|line| analyze_line(line.as_ref(), config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::DetectionMode;

    #[test]
    fn batch_preserves_input_order() {
        let lines: Vec<String> = (0..64)
            .map(|i| format!("d,t{},0,10,1,1,-90.0,{}.0", i, -(i as i64)))
            .collect();
        let config = DetectionConfig::new(-10.0, 1, DetectionMode::ThresholdCount).unwrap();
        let results = analyze_batch(&lines, &config);
        assert_eq!(results.len(), 64);
        for (i, result) in results.iter().enumerate() {
            let result = result.as_ref().unwrap();
            assert_eq!(result.timestamp, format!("d t{}", i));
            assert_eq!(result.is_detection, i <= 10);
        }
    }

    #[test]
    fn batch_reports_bad_lines_in_place() {
        let lines = ["d,t,0,1,1,1,-5.0", "garbage", "d,t,0,1,1,1,-7.0"];
        let results = analyze_batch(&lines, &DetectionConfig::default());
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
