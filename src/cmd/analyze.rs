use anyhow::Result;

use commentpulse::{AnalysisReport, Analyzer, Config};

pub async fn cmd_analyze(config: &Config, url: &str, json: bool, offline: bool) -> Result<()> {
    let analyzer = if offline {
        Analyzer::offline(rand::random())
    } else {
        Analyzer::from_config(config)
    };

    eprintln!("🔎 Analyzing: {url}");
    let report = analyzer.analyze(url).await?;
    for skipped in &report.skipped_tiers {
        eprintln!("⚠️  {skipped}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let item = &report.item;
    let a = &report.analytics;

    println!("🎬 {} ({})", item.title, item.item_id);
    println!("   Channel: {}", item.channel);
    println!(
        "   Views: {}  Likes: {}  Comments: {}",
        item.view_count, item.like_count, item.comment_count
    );

    println!("\n📊 Sentiment ({} comments):", a.total_comments);
    println!("   Positive: {:>5.1}%", a.positive_percentage);
    println!("   Negative: {:>5.1}%", a.negative_percentage);
    println!("   Neutral:  {:>5.1}%", a.neutral_percentage);
    println!("   Average:  {:+.3}", a.avg_sentiment);
    println!("   Weighted: {:+.3}", a.weighted_sentiment);
    println!("   Engagement: {:.1} likes/comment", a.engagement_score);

    if !a.top_words.is_empty() {
        let words: Vec<String> = a
            .top_words
            .iter()
            .take(10)
            .map(|(term, count)| format!("{term} ({count})"))
            .collect();
        println!("\n🔤 Top words: {}", words.join(", "));
    }

    if !report.recent_comments.is_empty() {
        println!("\n💬 Recent comments:");
        for c in &report.recent_comments {
            println!("   [{:>8}] {}: {}", c.sentiment_label, c.author, truncate(&c.text, 80));
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
