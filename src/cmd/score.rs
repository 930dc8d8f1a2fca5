use anyhow::Result;

use commentpulse::{Config, SentimentScorer};

pub fn cmd_score(config: &Config, text: &str, lexical: bool) -> Result<()> {
    let scorer = if lexical {
        SentimentScorer::lexical()
    } else {
        SentimentScorer::from_config(&config.scoring)
    };
    let result = scorer.score(text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
