//! CLI `recommend` command: one query, printed as a table, cards, or JSON.

use anyhow::Result;
use std::fmt::Write;

use shortlist::config::{PresentationStyle, ShortlistConfig};
use shortlist::service::{RecommendResponse, Recommender};

pub async fn recommend(
    config: &ShortlistConfig,
    query: &str,
    top_k: Option<usize>,
    style: Option<PresentationStyle>,
    json: bool,
) -> Result<()> {
    let recommender = Recommender::from_config(config)?;
    let top_k = top_k.unwrap_or(recommender.default_top_k());
    let response = recommender.recommend(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render(&response, style.unwrap_or(config.presentation.style)));
    }
    Ok(())
}

fn render(response: &RecommendResponse, style: PresentationStyle) -> String {
    if response.recommendations.is_empty() {
        return "No recommendations found.\n".to_string();
    }

    let mut out = format!(
        "Top {} recommendation(s) for: {}\n\n",
        response.recommendations.len(),
        response.query
    );
    match style {
        PresentationStyle::Table => render_table(response, &mut out),
        PresentationStyle::Cards => render_cards(response, &mut out),
    }
    out
}

fn render_table(response: &RecommendResponse, out: &mut String) {
    let recs = &response.recommendations;
    let name_width = recs
        .iter()
        .map(|r| r.assessment_name.chars().count())
        .chain(["Assessment Name".len()])
        .max()
        .unwrap_or_default();
    let category_width = recs
        .iter()
        .map(|r| r.category.chars().count())
        .chain(["Category".len()])
        .max()
        .unwrap_or_default();

    let _ = writeln!(
        out,
        "  {:>2}  {:<name_width$}  {:<category_width$}  {:>5}  URL",
        "#", "Assessment Name", "Category", "Score"
    );
    for (i, rec) in recs.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}  {:<name_width$}  {:<category_width$}  {:>5.3}  {}",
            i + 1,
            rec.assessment_name,
            rec.category,
            rec.score,
            rec.url
        );
    }
}

fn render_cards(response: &RecommendResponse, out: &mut String) {
    for (i, rec) in response.recommendations.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, rec.assessment_name);
        if !rec.category.is_empty() {
            let _ = writeln!(out, "     Category:   {}", rec.category);
        }
        let _ = writeln!(out, "     Similarity: {:.3}", rec.score);
        let _ = writeln!(out, "     {}", rec.url);
        out.push('\n');
    }
}
