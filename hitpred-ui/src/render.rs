//! HTML rendering for the track form and analysis results

use hitpred_common::build_info;
use hitpred_common::{Prediction, PredictionStatus};

use crate::form::{TrackForm, COUNTRIES, GENRES, LABELS, LOUDNESS_RANGE};

/// What to show under the form
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Prediction(Prediction),
    Error(String),
}

/// Escape text for element content and quoted attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<option>` list with `selected` marked; an off-list value is kept selectable
fn options(choices: &[&str], selected: &str) -> String {
    let mut html = String::new();
    let on_list = choices.contains(&selected);
    if !on_list {
        html.push_str(&format!(
            r#"<option value="{0}" selected>{0}</option>"#,
            escape(selected)
        ));
    }
    for choice in choices {
        let marker = if *choice == selected { " selected" } else { "" };
        html.push_str(&format!(
            r#"<option value="{0}"{1}>{0}</option>"#,
            escape(choice),
            marker
        ));
    }
    html
}

fn outcome_html(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Prediction(prediction) => {
            let class = match prediction.status {
                PredictionStatus::PotentialHit => "result-hit",
                PredictionStatus::NicheTrack => "result-niche",
            };
            format!(
                r#"
        <section class="result {}">
            <h2>Result: {}</h2>
            <div class="metric"><span>Hit Probability</span><strong>{:.2}%</strong></div>
        </section>"#,
                class,
                prediction.status,
                prediction.hit_probability * 100.0
            )
        }
        Outcome::Error(message) => format!(
            r#"
        <section class="result result-error">
            <h2>API Error: Unable to get prediction.</h2>
            <p>{}</p>
        </section>"#,
            escape(message)
        ),
    }
}

/// The full page: form prefilled from `form`, plus the outcome if any
pub fn page(form: &TrackForm, outcome: Option<&Outcome>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let short_hash = build_info::short_hash();
    let build_profile = build_info::BUILD_PROFILE;

    let (explicit_no, explicit_yes) = if form.explicit == 1 {
        ("", " checked")
    } else {
        (" checked", "")
    };
    let result = outcome.map(outcome_html).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Spotify Hit Predictor</title>
    <style>
        * {{
            box-sizing: border-box;
        }}
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #1a1a1a;
            color: #e0e0e0;
            line-height: 1.6;
            margin: 0;
        }}
        header {{
            background-color: #2a2a2a;
            border-bottom: 1px solid #3a3a3a;
            padding: 20px;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }}
        h1 {{
            font-size: 26px;
            margin: 0;
            color: #1db954;
        }}
        .build-info {{
            color: #888;
            font-family: 'Courier New', monospace;
            font-size: 14px;
            text-align: right;
        }}
        main {{
            padding: 20px;
            max-width: 1000px;
            margin: 0 auto;
        }}
        .columns {{
            display: flex;
            gap: 40px;
            flex-wrap: wrap;
        }}
        fieldset {{
            flex: 1;
            min-width: 300px;
            border: 1px solid #3a3a3a;
            border-radius: 6px;
            padding: 15px 20px;
        }}
        legend {{
            color: #1db954;
            font-weight: 600;
        }}
        label {{
            display: block;
            margin-top: 12px;
        }}
        select, input[type=number], input[type=range] {{
            width: 100%;
            padding: 6px;
            background: #2a2a2a;
            color: #e0e0e0;
            border: 1px solid #3a3a3a;
            border-radius: 4px;
        }}
        .radio label {{
            display: inline-block;
            margin-right: 15px;
        }}
        button {{
            margin-top: 20px;
            padding: 10px 20px;
            background: #1db954;
            color: #fff;
            border: none;
            border-radius: 4px;
            font-weight: 600;
            cursor: pointer;
        }}
        .result {{
            margin-top: 30px;
            padding: 15px 20px;
            border-radius: 6px;
            display: flex;
            justify-content: space-between;
            align-items: center;
            flex-wrap: wrap;
        }}
        .result h2 {{
            margin: 0;
        }}
        .result-hit {{
            background: #10b981;
            color: #fff;
        }}
        .result-niche {{
            background: #f59e0b;
            color: #fff;
        }}
        .result-error {{
            background: #ef4444;
            color: #fff;
        }}
        .metric span {{
            display: block;
            font-size: 14px;
        }}
        .metric strong {{
            font-size: 28px;
        }}
    </style>
</head>
<body>
    <header>
        <div>
            <h1>Spotify Hit Predictor</h1>
            <div>Estimate whether a track is likely to become popular</div>
        </div>
        <div class="build-info">
            <div>hitpred-ui v{version}</div>
            <div>{short_hash} ({build_profile})</div>
        </div>
    </header>
    <main>
        <form method="post" action="/analyze">
            <div class="columns">
                <fieldset>
                    <legend>Track Metadata</legend>
                    <label for="genre">Genre</label>
                    <select id="genre" name="genre">{genres}</select>
                    <label for="country">Country</label>
                    <select id="country" name="country">{countries}</select>
                    <label for="label">Label</label>
                    <select id="label" name="label">{labels}</select>
                    <label for="duration_ms">Duration (ms)</label>
                    <input type="number" id="duration_ms" name="duration_ms" min="0" step="1" value="{duration_ms}">
                    <label for="stream_count">Current Streams</label>
                    <input type="number" id="stream_count" name="stream_count" min="0" step="1000" value="{stream_count}">
                </fieldset>
                <fieldset>
                    <legend>Audio Features</legend>
                    <label for="danceability">Danceability</label>
                    <input type="range" id="danceability" name="danceability" min="0" max="1" step="0.01" value="{danceability}">
                    <label for="energy">Energy</label>
                    <input type="range" id="energy" name="energy" min="0" max="1" step="0.01" value="{energy}">
                    <label for="loudness">Loudness (dB)</label>
                    <input type="range" id="loudness" name="loudness" min="{loudness_min}" max="{loudness_max}" step="0.1" value="{loudness}">
                    <label for="tempo">Tempo (BPM)</label>
                    <input type="number" id="tempo" name="tempo" min="0" step="any" value="{tempo}">
                    <label>Explicit Content</label>
                    <div class="radio">
                        <label><input type="radio" name="explicit" value="0"{explicit_no}> No</label>
                        <label><input type="radio" name="explicit" value="1"{explicit_yes}> Yes</label>
                    </div>
                </fieldset>
            </div>
            <button type="submit">Analyze Track Popularity</button>
        </form>{result}
    </main>
</body>
</html>
"#,
        genres = options(&GENRES, &form.genre),
        countries = options(&COUNTRIES, &form.country),
        labels = options(&LABELS, &form.label),
        duration_ms = form.duration_ms,
        stream_count = form.stream_count,
        danceability = form.danceability,
        energy = form.energy,
        loudness_min = LOUDNESS_RANGE.0,
        loudness_max = LOUDNESS_RANGE.1,
        loudness = form.loudness,
        tempo = form.tempo,
    )
}
