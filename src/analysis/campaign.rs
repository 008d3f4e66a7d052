//! Sequential, paced analysis of several countries.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::types::{CampaignReport, CountryFailure, CountryResult};
use crate::error::AnalysisError;
use crate::TARGET_CAMPAIGN;

pub struct CountryCampaignRunner {
    pace_delay: Duration,
}

impl CountryCampaignRunner {
    pub fn new(pace_delay: Duration) -> Self {
        Self { pace_delay }
    }

    /// Run `analyze` for each country in order, one at a time.
    ///
    /// A failed country is logged and reported, never raised. Setting
    /// `cancel` to `true` stops the run at the next country boundary and
    /// drops the analysis in flight.
    pub async fn run_all<F, Fut>(
        &self,
        countries: &[String],
        mut cancel: watch::Receiver<bool>,
        mut analyze: F,
    ) -> CampaignReport
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<CountryResult, AnalysisError>>,
    {
        let mut report = CampaignReport::default();

        for (i, code) in countries.iter().enumerate() {
            if *cancel.borrow() {
                warn!(target: TARGET_CAMPAIGN, "Campaign cancelled before {}", code);
                report.cancelled = true;
                break;
            }

            info!(target: TARGET_CAMPAIGN, "Analyzing {} ({}/{})", code, i + 1, countries.len());

            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => {
                    warn!(target: TARGET_CAMPAIGN, "Campaign cancelled while analyzing {}", code);
                    report.cancelled = true;
                    break;
                }
                outcome = analyze(code.clone()) => outcome,
            };

            match outcome {
                Ok(result) => {
                    info!(
                        target: TARGET_CAMPAIGN,
                        country = %code,
                        positive = result.tally.positive,
                        neutral = result.tally.neutral,
                        negative = result.tally.negative,
                        unclassified = result.unclassified,
                        "Recommendation for {}: {}",
                        code,
                        result.recommendation
                    );
                    report.results.push(result);
                }
                Err(err) => {
                    error!(target: TARGET_CAMPAIGN, country = %code, step = err.step(), "Analysis of {} failed: {}", code, err);
                    report.failures.push(CountryFailure {
                        country_code: code.clone(),
                        error: err,
                    });
                }
            }

            if i + 1 < countries.len() && !self.pace_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel) => {
                        report.cancelled = true;
                        break;
                    }
                    _ = sleep(self.pace_delay) => {}
                }
            }
        }

        info!(
            target: TARGET_CAMPAIGN,
            succeeded = report.results.len(),
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Campaign finished"
        );
        report
    }
}

/// Resolves once cancellation is requested; never if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|&stop| stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Recommendation;
    use crate::sentiment::SentimentTally;

    fn result(code: &str) -> CountryResult {
        CountryResult {
            country_code: code.to_string(),
            articles: Vec::new(),
            tally: SentimentTally::default(),
            recommendation: Recommendation::Neutral,
            total_articles: 0,
            unclassified: 0,
            strategy: "fake".to_string(),
        }
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_country_is_skipped_in_order() {
        let (_tx, rx) = watch::channel(false);
        let runner = CountryCampaignRunner::new(Duration::ZERO);

        let report = runner
            .run_all(&codes(&["A", "B", "C"]), rx, |code| async move {
                if code == "B" {
                    Err(AnalysisError::AllStrategiesExhausted {
                        topic: "\"b government\"".to_string(),
                        failures: Vec::new(),
                    })
                } else {
                    Ok(result(&code))
                }
            })
            .await;

        let done: Vec<&str> = report.results.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(done, vec!["A", "C"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].country_code, "B");
        assert!(report.is_partial());
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let runner = CountryCampaignRunner::new(Duration::ZERO);

        let report = runner
            .run_all(&codes(&["A", "B"]), rx, |code| async move { Ok(result(&code)) })
            .await;
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_drops_in_flight_analysis() {
        let (tx, rx) = watch::channel(false);
        let runner = CountryCampaignRunner::new(Duration::ZERO);
        let tx = std::sync::Arc::new(tx);

        let report = runner
            .run_all(&codes(&["A", "B", "C"]), rx, |code| {
                let tx = tx.clone();
                async move {
                    if code == "B" {
                        tx.send(true).unwrap();
                        std::future::pending::<()>().await;
                    }
                    Ok(result(&code))
                }
            })
            .await;

        assert!(report.cancelled);
        let done: Vec<&str> = report.results.iter().map(|r| r.country_code.as_str()).collect();
        assert_eq!(done, vec!["A"]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_sender_does_not_cancel() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let runner = CountryCampaignRunner::new(Duration::from_millis(1));

        let report = runner
            .run_all(&codes(&["A", "B"]), rx, |code| async move { Ok(result(&code)) })
            .await;
        assert!(!report.cancelled);
        assert_eq!(report.results.len(), 2);
    }
}
