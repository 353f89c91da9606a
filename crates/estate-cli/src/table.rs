//! Terminal tables

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use estate_advisor::InvestmentResponse;
use estate_advisor::collaborators::IndexStats;
use estate_core::RetrievedDocument;
use estate_utils::{format_inr, format_inr_compact};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(|i| format!("• {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analysis_report(response: &InvestmentResponse) -> String {
    let property = &response.property_summary;
    let predictions = &response.predictions;
    let recommendation = &response.recommendation;
    let risk = &response.risk_assessment;
    let drivers = &response.investment_drivers;
    let summary = &response.agent_execution_summary;

    let mut table = new_table(&["Section", "Detail"]);
    table.add_row(vec![
        "Property".to_string(),
        format!(
            "{} in {}, {}\n{} sq ft, {} BHK, {} years old",
            property.property_type,
            property.locality,
            property.city,
            property.size_sqft,
            property.bedrooms,
            property.property_age
        ),
    ]);
    table.add_row(vec![
        "Valuation".to_string(),
        format!(
            "{} ({})\nRange {} to {}\nRent {}/month, yield {:.2}%\nModel confidence {:.1}%",
            format_inr(predictions.predicted_price),
            format_inr_compact(predictions.predicted_price),
            format_inr(predictions.price_range_min),
            format_inr(predictions.price_range_max),
            format_inr(predictions.predicted_rent),
            predictions.predicted_rental_yield,
            predictions.price_confidence * 100.0
        ),
    ]);
    table.add_row(vec![
        "Recommendation".to_string(),
        format!(
            "{} ({:.0}% confidence)\n{}",
            recommendation.recommendation,
            recommendation.confidence_score * 100.0,
            recommendation.reasoning
        ),
    ]);
    table.add_row(vec![
        "Scores".to_string(),
        format!(
            "Sentiment {}\nLocation {:.1}/10, infrastructure {:.1}/10\nRegulatory compliance {:.2}",
            drivers.market_sentiment,
            drivers.location_score,
            drivers.infrastructure_score,
            risk.regulatory_compliance_score
        ),
    ]);
    if let Some(roi) = recommendation.expected_roi {
        table.add_row(vec!["Expected ROI".to_string(), format!("{roi:.2}")]);
    }
    table.add_row(vec!["Positive drivers".to_string(), bullets(&drivers.positive_drivers)]);
    table.add_row(vec!["Negative drivers".to_string(), bullets(&drivers.negative_drivers)]);
    table.add_row(vec![format!("Risks ({})", risk.risk_level), bullets(&risk.risk_factors)]);
    table.add_row(vec!["Mitigation".to_string(), bullets(&risk.mitigation_strategies)]);
    table.add_row(vec!["Limitations".to_string(), bullets(&response.limitations)]);
    table.add_row(vec![
        "Sources".to_string(),
        bullets(
            &response
                .retrieved_documents
                .iter()
                .map(|d| format!("{} [{}]", d.title, d.category))
                .collect::<Vec<_>>(),
        ),
    ]);
    table.add_row(vec![
        "Stages".to_string(),
        format!(
            "valuation {}, market {}, risk {}, narrative {}{}",
            mark(summary.valuation_completed),
            mark(summary.market_intelligence_completed),
            mark(summary.risk_assessment_completed),
            mark(summary.narrative_completed),
            if summary.fallback_used { " (fallback)" } else { "" }
        ),
    ]);
    if let Some(path) = &response.report_path {
        table.add_row(vec!["Report".to_string(), path.display().to_string()]);
    }

    table.to_string()
}

fn mark(done: bool) -> &'static str {
    if done { "ok" } else { "failed" }
}

pub fn search_results(hits: &[RetrievedDocument]) -> String {
    let mut table = new_table(&["#", "Id", "Title", "Category", "Location", "Score"]);
    for (rank, doc) in hits.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            doc.id.clone(),
            doc.title.clone(),
            doc.category.clone(),
            doc.location_tag.clone(),
            doc.relevance_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.3}")),
        ]);
    }
    table.to_string()
}

pub fn corpus_stats(stats: &IndexStats) -> String {
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec!["Documents".to_string(), stats.documents.to_string()]);
    table.add_row(vec!["Chunks".to_string(), stats.chunks.to_string()]);
    for (category, count) in &stats.categories {
        table.add_row(vec![format!("  {category}"), count.to_string()]);
    }
    table.to_string()
}
