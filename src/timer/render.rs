// src/timer/render.rs
use chrono::Duration;
use crossterm::style::{style, Stylize};

/// Reference lifetime the tiers are measured against.
pub const USUAL_MAX_TTL_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

impl Tier {
    /// `None` once the token has no time left.
    pub fn classify(ttl: Duration) -> Option<Tier> {
        let millis = ttl.num_milliseconds();
        if millis <= 0 {
            return None;
        }
        let percent = millis * 100 / USUAL_MAX_TTL_MS;
        Some(match percent {
            p if p >= 50 => Tier::Green,
            p if p >= 10 => Tier::Yellow,
            _ => Tier::Red,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Tier word only, for scripts.
    Query,
    /// Coloured `<label><minutes>m ` for the prompt.
    Display,
}

pub fn render(ttl: Duration, label: &str, mode: RenderMode) -> String {
    let tier = match Tier::classify(ttl) {
        Some(tier) => tier,
        None => return String::new(),
    };

    match mode {
        RenderMode::Query => format!("{}\n", tier.as_str()),
        RenderMode::Display => {
            let text = style(format!("{}{:02}m ", label, ttl.num_minutes()));
            match tier {
                Tier::Green => text.green().to_string(),
                Tier::Yellow => text.yellow().to_string(),
                Tier::Red => text.red().to_string(),
            }
        }
    }
}
