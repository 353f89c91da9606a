//! Prompt assembly for narrative synthesis
//!
//! Rendered with MiniJinja. Numbers are pre-formatted in Rust so the
//! template stays free of formatting logic.

use estate_core::RetrievedDocument;
use estate_core::protocol::NarrativeRequest;
use estate_utils::format_inr;
use minijinja::Environment;
use serde::Serialize;
use serde_json::json;

use crate::Result;

/// Characters of each document included in the prompt
pub const DOCUMENT_EXCERPT_CHARS: usize = 500;
/// Market documents included in the prompt
pub const MAX_MARKET_DOCUMENTS: usize = 3;
/// Regulatory documents included in the prompt
pub const MAX_REGULATORY_DOCUMENTS: usize = 2;

pub const SYSTEM_PROMPT: &str = "You are an expert real estate investment analyst. \
Provide accurate, data-driven analysis in valid JSON format.";

const INVESTMENT_ANALYSIS_TEMPLATE: &str = r#"You are an expert real estate investment analyst for residential property in India.
Your role is to provide data-backed, transparent investment analysis.

PROPERTY DETAILS:
City: {{ property.city }}
Locality: {{ property.locality }}
Type: {{ property.property_type }}
Size: {{ property.size_sqft }} sq ft
Bedrooms: {{ property.bedrooms }}
Age: {{ property.property_age }} years
Distance to Metro: {{ property.distance }} km

PREDICTED METRICS:
- Predicted Price: {{ metrics.price }}
- Price Range: {{ metrics.price_min }} - {{ metrics.price_max }}
- Predicted Monthly Rent: {{ metrics.rent }}
- Predicted Rental Yield: {{ metrics.rental_yield }}%
- Model Confidence: {{ metrics.confidence }}%

INVESTOR CONTEXT:
- Investment Horizon: {{ context.investment_horizon_years }} years
- Primary Goal: {{ context.primary_goal }}
- Risk Tolerance: {{ context.risk_tolerance }}

MARKET INTELLIGENCE:
{% for doc in market_docs %}Document: {{ doc.title }}
{{ doc.excerpt }}{% if not loop.last %}

{% endif %}{% else %}Limited market data available.{% endfor %}

REGULATORY CONTEXT:
{% for doc in regulatory_docs %}Document: {{ doc.title }}
{{ doc.excerpt }}{% if not loop.last %}

{% endif %}{% else %}Standard regulatory compliance applies.{% endfor %}

Based on the above information, provide a comprehensive investment analysis in JSON format:

{
  "recommendation": "Buy/Hold/Avoid",
  "confidence_score": 0.0-1.0,
  "reasoning": "Detailed reasoning in 3-4 sentences",
  "positive_drivers": ["driver1", "driver2", "driver3"],
  "negative_drivers": ["concern1", "concern2"],
  "risk_factors": ["risk1", "risk2", "risk3"],
  "mitigation_strategies": ["strategy1", "strategy2"],
  "market_sentiment": "Bullish/Neutral/Bearish",
  "location_score": 0-10,
  "infrastructure_score": 0-10,
  "regulatory_compliance_score": 0.0-1.0,
  "risk_level": "low/medium/high",
  "expected_appreciation_3yr": percentage,
  "expected_appreciation_5yr": percentage,
  "expected_roi": percentage,
  "assumptions": ["assumption1", "assumption2"],
  "limitations": ["limitation1", "limitation2"]
}

IMPORTANT GUIDELINES:
1. Be conservative and transparent about uncertainties
2. Explicitly state assumptions made
3. Flag any data quality or availability concerns
4. Consider regulatory compliance and legal factors
5. Align analysis with investor's goals and risk tolerance
6. Base reasoning on retrieved market intelligence
7. Avoid hallucination - only use provided data
8. If information is insufficient, state it clearly in limitations
"#;

#[derive(Debug, Serialize)]
struct DocumentExcerpt<'a> {
    title: &'a str,
    excerpt: &'a str,
}

fn excerpts<'a>(
    documents: &'a [RetrievedDocument],
    needles: &[&str],
    limit: usize,
) -> Vec<DocumentExcerpt<'a>> {
    documents
        .iter()
        .filter(|doc| needles.iter().any(|n| doc.category_contains(n)))
        .take(limit)
        .map(|doc| DocumentExcerpt {
            title: &doc.title,
            excerpt: doc.excerpt(DOCUMENT_EXCERPT_CHARS),
        })
        .collect()
}

/// Render the investment-analysis user prompt
pub fn investment_analysis_prompt(request: &NarrativeRequest) -> Result<String> {
    let property = &request.property_data;
    let prediction = &request.predictions;
    let context = &request.investment_context;

    let vars = json!({
        "property": {
            "city": property.city,
            "locality": property.locality,
            "property_type": property.property_type.as_str(),
            "size_sqft": property.size_sqft,
            "bedrooms": property.bedrooms,
            "property_age": property.property_age,
            "distance": property
                .distance_to_transit_km
                .map_or_else(|| "N/A".to_string(), |d| d.to_string()),
        },
        "metrics": {
            "price": format_inr(prediction.predicted_price),
            "price_min": format_inr(prediction.price_range_min),
            "price_max": format_inr(prediction.price_range_max),
            "rent": format_inr(prediction.predicted_rent),
            "rental_yield": format!("{:.2}", prediction.predicted_rental_yield),
            "confidence": format!("{:.1}", prediction.price_confidence * 100.0),
        },
        "context": {
            "investment_horizon_years": context.investment_horizon_years,
            "primary_goal": context.primary_goal.to_string(),
            "risk_tolerance": context.risk_tolerance.as_str(),
        },
        "market_docs": excerpts(&request.retrieved_documents, &["market", "news"], MAX_MARKET_DOCUMENTS),
        "regulatory_docs": excerpts(&request.retrieved_documents, &["reg", "rera"], MAX_REGULATORY_DOCUMENTS),
    });

    let env = Environment::new();
    Ok(env.render_str(INVESTMENT_ANALYSIS_TEMPLATE, vars)?)
}
