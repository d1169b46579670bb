use crate::error::{AnalyzerError, Result};

/// Sequence-likelihood model boundary.
///
/// Scores come back in the order the sequences were given, one per sequence.
pub trait LikelihoodScorer: Send + Sync {
    fn score_sequences(&self, sequences: &[String]) -> Result<Vec<f64>>;
}

/// Rejects a reply whose length does not match the request.
pub fn check_scores(expected: usize, scores: Vec<f64>) -> Result<Vec<f64>> {
    if scores.len() != expected {
        return Err(AnalyzerError::Scoring(format!(
            "model returned {} scores for {} sequences",
            scores.len(),
            expected
        )));
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_reply_is_rejected() {
        assert!(check_scores(2, vec![-1.0, -2.0]).is_ok());
        assert!(matches!(
            check_scores(2, vec![-1.0]),
            Err(AnalyzerError::Scoring(_))
        ));
    }
}
