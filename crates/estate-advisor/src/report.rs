//! Background report generation
//!
//! Reports are rendered off the request path: [`ReportQueue`] hands each
//! response to a single worker task, and a failed render is logged and
//! counted without ever touching the analysis already returned.

use async_trait::async_trait;
use estate_utils::{format_inr, format_inr_compact};
use minijinja::Environment;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{AdvisorError, Result};
use crate::response::InvestmentResponse;

const REPORT_TEMPLATE: &str = r"# Investment Analysis Report

Request `{{ request_id }}` generated {{ timestamp }}

## Property

| Field | Value |
|---|---|
| Location | {{ property.locality }}, {{ property.city }} |
| Type | {{ property.property_type }} |
| Size | {{ property.size_sqft }} sq ft |
| Bedrooms | {{ property.bedrooms }} |
| Age | {{ property.property_age }} years |

## Valuation

- Predicted price: {{ price }} ({{ price_compact }})
- Price range: {{ price_min }} to {{ price_max }}
- Monthly rent: {{ rent }}
- Rental yield: {{ rental_yield }}%
- Model confidence: {{ confidence }}%

## Recommendation: {{ recommendation }}

Confidence {{ confidence_score }}%

{{ reasoning }}
{% if expected_roi %}
Expected ROI over the horizon: {{ expected_roi }}
{% endif %}
## Drivers
{% for d in positive_drivers %}
- (+) {{ d }}
{%- endfor %}
{% for d in negative_drivers %}
- (-) {{ d }}
{%- endfor %}

## Risk ({{ risk_level }})
{% for r in risk_factors %}
- {{ r }}
{%- endfor %}

### Mitigation
{% for m in mitigation_strategies %}
- {{ m }}
{%- endfor %}

## Assumptions
{% for a in assumptions %}
- {{ a }}
{%- endfor %}

## Limitations
{% for l in limitations %}
- {{ l }}
{%- endfor %}
";

/// Renders a response into a report artifact
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Write the report and return where it was written
    async fn render(&self, report: &InvestmentResponse) -> Result<PathBuf>;
}

/// Writes Markdown reports named `report_{request_id}.md`
#[derive(Debug, Clone)]
pub struct MarkdownReportRenderer {
    reports_dir: PathBuf,
}

impl MarkdownReportRenderer {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Render the Markdown body without writing it
    pub fn to_markdown(&self, report: &InvestmentResponse) -> Result<String> {
        let predictions = &report.predictions;
        let recommendation = &report.recommendation;

        let vars = json!({
            "request_id": report.request_id.to_string(),
            "timestamp": report.timestamp.to_rfc3339(),
            "property": report.property_summary,
            "price": format_inr(predictions.predicted_price),
            "price_compact": format_inr_compact(predictions.predicted_price),
            "price_min": format_inr(predictions.price_range_min),
            "price_max": format_inr(predictions.price_range_max),
            "rent": format_inr(predictions.predicted_rent),
            "rental_yield": format!("{:.2}", predictions.predicted_rental_yield),
            "confidence": format!("{:.1}", predictions.price_confidence * 100.0),
            "recommendation": recommendation.recommendation.as_str(),
            "confidence_score": format!("{:.0}", recommendation.confidence_score * 100.0),
            "reasoning": recommendation.reasoning,
            "expected_roi": recommendation.expected_roi.map(|r| format!("{r:.2}")),
            "positive_drivers": report.investment_drivers.positive_drivers,
            "negative_drivers": report.investment_drivers.negative_drivers,
            "risk_level": report.risk_assessment.risk_level.as_str(),
            "risk_factors": report.risk_assessment.risk_factors,
            "mitigation_strategies": report.risk_assessment.mitigation_strategies,
            "assumptions": report.assumptions,
            "limitations": report.limitations,
        });

        let env = Environment::new();
        Ok(env.render_str(REPORT_TEMPLATE, vars)?)
    }
}

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    async fn render(&self, report: &InvestmentResponse) -> Result<PathBuf> {
        let body = self.to_markdown(report)?;
        tokio::fs::create_dir_all(&self.reports_dir).await?;
        let path = self.reports_dir.join(report.report_file_name());
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

/// Counters shared between a [`ReportQueue`] and its worker task
#[derive(Debug, Default)]
pub struct ReportStats {
    rendered: AtomicUsize,
    failed: AtomicUsize,
}

impl ReportStats {
    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Fire-and-forget report rendering on a background task
pub struct ReportQueue {
    sender: mpsc::Sender<InvestmentResponse>,
    worker: JoinHandle<()>,
    stats: Arc<ReportStats>,
}

impl ReportQueue {
    /// Spawn the worker task; `capacity` bounds the number of queued reports
    pub fn spawn(renderer: Arc<dyn ReportRenderer>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<InvestmentResponse>(capacity.max(1));
        let stats = Arc::new(ReportStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = tokio::spawn(async move {
            while let Some(report) = receiver.recv().await {
                debug!("Rendering report for {}", report.request_id);
                match renderer.render(&report).await {
                    Ok(path) => {
                        worker_stats.rendered.fetch_add(1, Ordering::Relaxed);
                        info!("Report written to {}", path.display());
                    }
                    Err(e) => {
                        worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                        error!("Report generation failed for {}: {}", report.request_id, e);
                    }
                }
            }
            debug!("Report queue drained");
        });

        Self {
            sender,
            worker,
            stats,
        }
    }

    /// Queue a report, waiting if the queue is full
    pub async fn submit(&self, report: InvestmentResponse) -> Result<()> {
        self.sender
            .send(report)
            .await
            .map_err(|_| AdvisorError::Report("report queue closed".to_string()))
    }

    pub fn stats(&self) -> &ReportStats {
        &self.stats
    }

    /// Close the queue and wait for every pending report to finish
    pub async fn shutdown(self) -> Result<Arc<ReportStats>> {
        let Self {
            sender,
            worker,
            stats,
        } = self;
        drop(sender);
        worker
            .await
            .map_err(|e| AdvisorError::Report(format!("report worker panicked: {e}")))?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;
    use crate::workers::fixtures::{andheri, context, prediction};
    use estate_core::Payload;
    use estate_core::protocol::{ExecutionSummary, InvestmentAnalysis};
    use uuid::Uuid;

    fn response() -> InvestmentResponse {
        let analysis = InvestmentAnalysis {
            predictions: prediction(),
            analysis: validate(&Payload::new(), &prediction(), &context()),
            retrieved_documents: Vec::new(),
            agent_execution_summary: ExecutionSummary::default(),
        };
        InvestmentResponse::from_analysis(Uuid::new_v4(), &andheri(), analysis, 5)
    }

    #[test]
    fn test_markdown_contains_sections() {
        let renderer = MarkdownReportRenderer::new("unused");
        let markdown = renderer.to_markdown(&response()).unwrap();

        assert!(markdown.contains("| Location | Andheri, Mumbai |"));
        assert!(markdown.contains("Predicted price: ₹10,260,000"));
        assert!(markdown.contains("## Recommendation: Hold"));
        assert!(markdown.contains("- Model confidence: 85.0%"));
    }

    #[tokio::test]
    async fn test_renderer_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownReportRenderer::new(dir.path().join("reports"));
        let report = response();

        let path = renderer.render(&report).await.unwrap();

        assert_eq!(path, dir.path().join("reports").join(report.report_file_name()));
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("# Investment Analysis Report"));
    }

    #[tokio::test]
    async fn test_queue_counts_outcomes() {
        let mut renderer = MockReportRenderer::new();
        let mut calls = 0;
        renderer.expect_render().times(3).returning(move |report| {
            calls += 1;
            if calls == 2 {
                Err(AdvisorError::Report("disk full".to_string()))
            } else {
                Ok(PathBuf::from(report.report_file_name()))
            }
        });

        let queue = ReportQueue::spawn(Arc::new(renderer), 4);
        for _ in 0..3 {
            queue.submit(response()).await.unwrap();
        }
        let stats = queue.shutdown().await.unwrap();

        assert_eq!(stats.rendered(), 2);
        assert_eq!(stats.failed(), 1);
    }
}
