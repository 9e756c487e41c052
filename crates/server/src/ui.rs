//! Interactive HTML form, one input per feature

use crate::api::AppState;
use axum::{
    extract::{Form, State},
    response::Html,
};
use classifier_lib::{FeatureSchema, PredictionResult};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Breast Cancer Prediction</title>
<style>
body { font-family: sans-serif; max-width: 52rem; margin: 2rem auto; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 0.5rem 1rem; }
label { display: block; font-size: 0.8rem; color: #444; }
input { width: 100%; }
.result { margin-top: 1.5rem; font-size: 1.4rem; font-weight: bold; }
.error { color: #b00020; }
</style>
</head>
<body>
<h1>Breast Cancer Prediction</h1>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// What to show under the form after a submission
pub enum Outcome {
    Prediction(PredictionResult),
    Error(String),
}

/// Escape text for interpolation into HTML content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the form, echoing submitted values and the outcome if any
pub fn render_page(
    schema: &FeatureSchema,
    values: &HashMap<String, String>,
    outcome: Option<&Outcome>,
) -> String {
    let mut html = String::from(PAGE_HEAD);

    html.push_str("<form method=\"post\" action=\"/\">\n<div class=\"grid\">\n");
    for (index, name) in schema.names().iter().enumerate() {
        let field = FeatureSchema::form_field(index);
        let value = values.get(&field).map(String::as_str).unwrap_or("");
        // Writing to a String cannot fail
        let _ = writeln!(
            html,
            "<div><label for=\"{field}\">{label}</label>\
             <input id=\"{field}\" name=\"{field}\" value=\"{value}\" required></div>",
            field = field,
            label = escape_html(name),
            value = escape_html(value),
        );
    }
    html.push_str("</div>\n<p><button type=\"submit\">Predict</button></p>\n</form>\n");

    match outcome {
        Some(Outcome::Prediction(result)) => {
            let _ = writeln!(
                html,
                "<div class=\"result\">{}</div>\n<p>Probability benign: {:.4}</p>",
                result.diagnosis.display_name(),
                result.probability_benign
            );
        }
        Some(Outcome::Error(message)) => {
            let _ = writeln!(
                html,
                "<div class=\"result error\">Error: {}</div>",
                escape_html(message)
            );
        }
        None => {}
    }

    html.push_str(PAGE_TAIL);
    html
}

pub async fn form_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(state.predictor.schema(), &HashMap::new(), None))
}

pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Html<String> {
    let outcome = match state.predictor.predict_form(&fields) {
        Ok(result) => Outcome::Prediction(result),
        Err(e) => {
            state
                .logger
                .log_prediction_failed("form", &e.to_string(), e.is_client_error());
            Outcome::Error(e.to_string())
        }
    };

    Html(render_page(state.predictor.schema(), &fields, Some(&outcome)))
}
