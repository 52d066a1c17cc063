//! Telegram delivery and alert formatting.

use crate::channel::AlertChannel;
use crate::error::DeliveryError;
use async_trait::async_trait;
use chrono::Duration;
use launch_core::{RiskAssessment, TokenRecord};
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode, Recipient};

/// Sends HTML alerts to a single chat or channel.
pub struct TelegramChannel {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramChannel {
    /// `chat` is a numeric chat id or an `@channel` username.
    pub fn new(token: &str, chat: &str) -> Result<Self, DeliveryError> {
        Ok(Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat)?,
        })
    }
}

/// Parse a chat id (`-1001234`) or channel username (`@alerts`).
pub fn parse_recipient(chat: &str) -> Result<Recipient, DeliveryError> {
    let chat = chat.trim();
    if let Ok(id) = chat.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat.len() > 1 && chat.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat.to_string()));
    }
    Err(DeliveryError::InvalidRecipient(chat.to_string()))
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            })
            .await?;
        Ok(())
    }
}

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format price with appropriate precision based on magnitude.
pub fn format_price(price: f64) -> String {
    if price == 0.0 {
        return "$0".to_string();
    }
    let abs_price = price.abs();
    if abs_price >= 1000.0 {
        format!("${:.2}", price)
    } else if abs_price >= 1.0 {
        format!("${:.4}", price)
    } else if abs_price >= 0.01 {
        format!("${:.6}", price)
    } else {
        // memecoin prices
        format!("${:.9}", price)
    }
}

/// Whole dollars with thousands separators, e.g. `$1,234,567`.
pub fn format_usd(value: f64) -> String {
    let digits = format!("{:.0}", value.max(0.0));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${}", grouped)
}

pub fn format_age(age: Option<Duration>) -> String {
    match age {
        None => "unknown".to_string(),
        Some(age) if age.num_minutes() < 60 => format!("{} minutes old", age.num_minutes()),
        Some(age) => format!("{}h {}m old", age.num_hours(), age.num_minutes() % 60),
    }
}

fn format_change(pct: f64) -> String {
    let arrow = if pct > 0.0 { "📈" } else { "📉" };
    format!("{} {:.1}%", arrow, pct)
}

/// Short-term momentum label from the 5 minute price change.
pub fn momentum_tag(m5_pct: f64) -> &'static str {
    if m5_pct > 20.0 {
        "🔥 HOT"
    } else if m5_pct > 10.0 {
        "📈 Rising"
    } else if m5_pct < -10.0 {
        "📉 Falling"
    } else {
        "➡️ Stable"
    }
}

/// Render the alert for one newly seen token.
pub fn format_alert_message(record: &TokenRecord, assessment: &RiskAssessment, source: &str) -> String {
    let symbol = if record.symbol.is_empty() {
        "Unknown"
    } else {
        record.symbol.as_str()
    };
    let name = if record.name.is_empty() {
        "New Token"
    } else {
        record.name.as_str()
    };
    let market_cap = record
        .market_cap_usd
        .map(format_usd)
        .unwrap_or_else(|| "unknown".to_string());
    let chart_id = record.pair_address.as_deref().unwrap_or(&record.address);

    let mut msg = format!(
        "🚨 <b>NEW TOKEN ALERT</b>\n\n\
         <b>Token:</b> {} - {}\n\
         <b>Age:</b> ⏱️ {}\n\
         <b>Source:</b> {}\n\
         <b>Contract:</b> <code>{}</code>\n\n\
         💰 <b>Market Data:</b>\n\
         • <b>Price:</b> {}\n\
         • <b>Liquidity:</b> {}\n\
         • <b>Market Cap:</b> {}\n\
         • <b>24h Volume:</b> {}\n\
         • <b>5m Change:</b> {} ({})\n\
         • <b>1h Change:</b> {}\n\n\
         🎯 <b>Risk Assessment:</b>\n\
         • <b>Safety Score:</b> {}/100\n\
         • <b>Risk Level:</b> {} {}",
        escape_html(symbol),
        escape_html(name),
        format_age(record.age()),
        escape_html(source),
        escape_html(&record.address),
        format_price(record.price_usd),
        format_usd(record.liquidity_usd),
        market_cap,
        format_usd(record.volume_24h_usd),
        format_change(record.price_change.m5),
        momentum_tag(record.price_change.m5),
        format_change(record.price_change.h1),
        assessment.score,
        assessment.level.emoji(),
        assessment.level.label(),
    );

    for reason in &assessment.reasons {
        let mark = if reason.tag.is_positive() { "✅" } else { "⚠️" };
        msg.push_str(&format!("\n{} {}", mark, escape_html(&reason.message)));
    }

    msg.push_str(&format!(
        "\n\n📊 <b>Quick Actions:</b>\n\
         • <a href=\"https://dexscreener.com/solana/{}\">View Chart</a>\n\
         • <a href=\"https://birdeye.so/token/{}?chain=solana\">Check on Birdeye</a>",
        escape_html(chart_id),
        escape_html(&record.address),
    ));

    msg.push_str(&format!(
        "\n\n⏰ {}",
        record.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    msg
}

/// Render the "detector online" announcement.
pub fn format_startup_message(sources: &[&str], host: &str, min_liquidity_usd: f64) -> String {
    let mut msg = String::from("🚀 <b>LAUNCH DETECTOR ONLINE</b>\n\n<b>Data Sources:</b>");
    for source in sources {
        msg.push_str(&format!("\n• {}", escape_html(source)));
    }
    msg.push_str(&format!(
        "\n\n<b>Min liquidity:</b> {}\n<b>Host:</b> {}\n\n🔍 Scanning for new launches...",
        format_usd(min_liquidity_usd),
        escape_html(host),
    ));
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use launch_core::{PriceChange, Reason, ReasonTag, RiskLevel};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_recipient() {
        assert!(matches!(
            parse_recipient("-1001234567890"),
            Ok(Recipient::Id(ChatId(-1001234567890)))
        ));
        assert!(matches!(
            parse_recipient("@ClickShiftAlerts"),
            Ok(Recipient::ChannelUsername(name)) if name == "@ClickShiftAlerts"
        ));
        assert!(matches!(
            parse_recipient("ClickShiftAlerts"),
            Err(DeliveryError::InvalidRecipient(_))
        ));
        assert!(parse_recipient("@").is_err());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;");
        assert_eq!(escape_html("BONK"), "BONK");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(45_000.4), "$45,000");
        assert_eq!(format_usd(1_234_567.0), "$1,234,567");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "$0");
        assert_eq!(format_price(1234.5), "$1234.50");
        assert_eq!(format_price(0.0000215), "$0.000021500");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(None), "unknown");
        assert_eq!(format_age(Some(Duration::minutes(30))), "30 minutes old");
        assert_eq!(format_age(Some(Duration::minutes(95))), "1h 35m old");
    }

    #[test]
    fn test_momentum_tag() {
        assert_eq!(momentum_tag(35.0), "🔥 HOT");
        assert_eq!(momentum_tag(20.0), "📈 Rising");
        assert_eq!(momentum_tag(10.5), "📈 Rising");
        assert_eq!(momentum_tag(10.0), "➡️ Stable");
        assert_eq!(momentum_tag(0.0), "➡️ Stable");
        assert_eq!(momentum_tag(-10.0), "➡️ Stable");
        assert_eq!(momentum_tag(-12.0), "📉 Falling");
    }

    #[test]
    fn test_alert_message_shows_momentum() {
        let record = TokenRecord::new("Mint333", "PUMP", "Pump")
            .with_market(0.1, 20_000.0, 40_000.0)
            .with_price_change(PriceChange::new(25.0, 40.0, 0.0));
        let assessment = RiskAssessment::new(50, RiskLevel::Moderate, Vec::new());
        let msg = format_alert_message(&record, &assessment, "Raydium");
        assert!(msg.contains("<b>5m Change:</b> 📈 25.0% (🔥 HOT)"));
        assert!(msg.contains("<b>1h Change:</b> 📈 40.0%\n"));
    }

    #[test]
    fn test_alert_message_contents() {
        let now = Utc::now();
        let record = TokenRecord::new("Mint111", "<SCAM>", "Fake & Co")
            .with_market(0.5, 30_000.0, 80_000.0)
            .with_created_at(Some(now - Duration::minutes(30)))
            .with_pair(Some("Pair111".to_string()), Some("raydium".to_string()))
            .with_fetched_at(now);
        let assessment = RiskAssessment::new(
            65,
            RiskLevel::Moderate,
            vec![
                Reason::new(ReasonTag::DeepLiquidity, "Good liquidity"),
                Reason::new(ReasonTag::VeryNew, "Very new token (<1h)"),
            ],
        );

        let msg = format_alert_message(&record, &assessment, "DexScreener");
        assert!(msg.contains("&lt;SCAM&gt; - Fake &amp; Co"));
        assert!(!msg.contains("<SCAM>"));
        assert!(msg.contains("<code>Mint111</code>"));
        assert!(msg.contains("30 minutes old"));
        assert!(msg.contains("<b>Source:</b> DexScreener"));
        assert!(msg.contains("<b>Liquidity:</b> $30,000"));
        assert!(msg.contains("<b>Market Cap:</b> unknown"));
        assert!(msg.contains("65/100"));
        assert!(msg.contains("MEDIUM RISK"));
        assert!(msg.contains("✅ Good liquidity"));
        assert!(msg.contains("⚠️ Very new token (&lt;1h)"));
        assert!(msg.contains("https://dexscreener.com/solana/Pair111"));
        assert!(msg.contains("https://birdeye.so/token/Mint111?chain=solana"));
    }

    #[test]
    fn test_alert_message_placeholders() {
        let record = TokenRecord::new("Mint222", "", "");
        let assessment = RiskAssessment::new(20, RiskLevel::Extreme, Vec::new());
        let msg = format_alert_message(&record, &assessment, "Shyft");
        assert!(msg.contains("Unknown - New Token"));
        assert!(msg.contains("⏱️ unknown"));
        assert!(msg.contains("https://dexscreener.com/solana/Mint222"));
    }

    #[test]
    fn test_startup_message() {
        let msg = format_startup_message(&["DexScreener", "Raydium"], "worker-1", 100.0);
        assert!(msg.contains("• DexScreener\n• Raydium"));
        assert!(msg.contains("<b>Min liquidity:</b> $100"));
        assert!(msg.contains("worker-1"));
    }
}
