//! Channel-specific message rendering.
//!
//! Localized text comes from [`rockwatch_common::i18n::TRANSLATIONS`]; every
//! field is rendered in the facility's language order and joined with the
//! shared delimiter so that all lines list languages in the same order.
//!
//! SMS is rendered by an ordered list of [`SmsTemplate`] strategies, from the
//! richest form down to a bare one-liner. The SMS channel walks the list and
//! stops at the first variant the gateway accepts.

use crate::utils::{escape_html, title_case, truncate_string};
use rockwatch_common::i18n::{
    self, Language, LANGUAGE_DELIMITER, TRANSLATIONS,
};
use rockwatch_common::types::{Alert, ContributingFactor, RiskExplanation, Severity};
use std::fmt::Write;

/// Factors embedded in the email and messaging bodies.
const TOP_FACTORS: usize = 3;
const MAX_VIOLATIONS: usize = 3;
const EMAIL_RECOMMENDATIONS: usize = 5;
const MESSAGING_RECOMMENDATIONS: usize = 3;
const MESSAGING_ANALYSIS_CHARS: usize = 200;

/// Inputs shared by every SMS strategy.
pub struct SmsContext<'a> {
    pub alert: &'a Alert,
    pub explanation: Option<&'a RiskExplanation>,
    pub languages: &'a [Language],
}

/// One way of rendering an SMS body.
pub trait SmsTemplate: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, ctx: &SmsContext<'_>) -> String;
}

/// Rendered SMS body tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsVariant {
    pub name: &'static str,
    pub body: String,
}

/// Multi-line, multi-language body with the top explanation factor.
pub struct FullLocalizedSms;

/// One English sentence.
pub struct ShortSms;

/// Shortest form: level, facility, score.
pub struct MinimalSms;

/// Strategies in the order they are tried.
pub static SMS_TEMPLATES: [&dyn SmsTemplate; 3] = [&FullLocalizedSms, &ShortSms, &MinimalSms];

impl SmsTemplate for FullLocalizedSms {
    fn name(&self) -> &'static str {
        "full"
    }

    fn render(&self, ctx: &SmsContext<'_>) -> String {
        let t = &*TRANSLATIONS;
        let langs = ctx.languages;
        let alert = ctx.alert;
        let mut lines = Vec::with_capacity(12);

        lines.push(format!("🚨 {}", t.localized("sms.header", langs)));
        lines.push(String::new());
        lines.push(format!(
            "{}: {}",
            t.localized("label.facility", langs),
            alert.facility_name
        ));
        lines.push(format!(
            "{}: {}",
            t.localized("label.risk", langs),
            t.localized(i18n::severity_key(alert.severity), langs)
        ));

        if let Some(factor) = ctx.explanation.and_then(RiskExplanation::top_factor) {
            if let Some(desc) = factor_description(factor, langs) {
                lines.push(format!("📊 {desc}"));
            }
        }

        lines.push(format!(
            "{}: {}",
            t.localized("label.time", langs),
            alert.created_at.format("%H:%M")
        ));
        lines.push(format!(
            "{}: {:.2}",
            t.localized("label.score", langs),
            alert.risk_score
        ));
        lines.push(String::new());
        lines.push(t.localized(i18n::action_key(alert.severity), langs));
        lines.push(String::new());
        lines.push(format!("- {}", t.localized("system.name", langs)));

        lines.join("\n")
    }
}

impl SmsTemplate for ShortSms {
    fn name(&self) -> &'static str {
        "short"
    }

    fn render(&self, ctx: &SmsContext<'_>) -> String {
        format!(
            "MINING ALERT: {} risk at {}. Score: {:.2}. Time: {}. Immediate action required.",
            ctx.alert.severity,
            ctx.alert.facility_name,
            ctx.alert.risk_score,
            ctx.alert.created_at.format("%H:%M"),
        )
    }
}

impl SmsTemplate for MinimalSms {
    fn name(&self) -> &'static str {
        "minimal"
    }

    fn render(&self, ctx: &SmsContext<'_>) -> String {
        format!(
            "ALERT: {} risk - {} - {:.2}",
            ctx.alert.severity, ctx.alert.facility_name, ctx.alert.risk_score
        )
    }
}

/// `"<label>: <value><unit>"` per language that carries a label for this
/// sensor type. `None` if no language does.
pub fn factor_description(factor: &ContributingFactor, languages: &[Language]) -> Option<String> {
    let key = format!("factor.{}", factor.factor);
    let value = match factor.factor.as_str() {
        "vibration" => format!("{:.1}Hz", factor.current_value),
        "temperature" => format!("{:.1}°C", factor.current_value),
        "humidity" => format!("{:.1}%", factor.current_value),
        "pressure" => format!("{:.1}hPa", factor.current_value),
        "acoustic" => format!("{:.1}dB", factor.current_value),
        "slope_stability" => format!("{:.2}", factor.current_value),
        _ => return None,
    };
    let parts: Vec<String> = languages
        .iter()
        .filter_map(|lang| TRANSLATIONS.get_template(lang.code(), &key))
        .map(|label| format!("{label}: {value}"))
        .collect();
    (!parts.is_empty()).then(|| parts.join(LANGUAGE_DELIMITER))
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "#dc3545",
        Severity::Medium => "#ffc107",
        Severity::Low => "#28a745",
    }
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🚨🔴",
        Severity::Medium => "⚠️🟡",
        Severity::Low => "💚✅",
    }
}

/// Renders every channel's content for facilities in one language region.
#[derive(Debug, Clone, Copy)]
pub struct MessageFormatter {
    languages: &'static [Language],
}

impl MessageFormatter {
    pub fn new(languages: &'static [Language]) -> Self {
        Self { languages }
    }

    /// Resolves the language list from a free-text region or location.
    pub fn for_region(region_hint: &str) -> Self {
        Self::new(i18n::languages_for(i18n::region_for(region_hint)))
    }

    pub fn languages(&self) -> &'static [Language] {
        self.languages
    }

    fn loc(&self, key: &str) -> String {
        TRANSLATIONS.localized(key, self.languages)
    }

    pub fn email_subject(&self, alert: &Alert) -> String {
        format!(
            "🚨 {} - {} - {}",
            self.loc("sms.header"),
            self.loc(i18n::severity_key(alert.severity)),
            alert.facility_name
        )
    }

    /// HTML body. With an explanation: primary analysis, top factors,
    /// threshold violations and recommendations as separate sections.
    /// Without one: the predictor's key factors, if any.
    pub fn email_body(&self, alert: &Alert, explanation: Option<&RiskExplanation>) -> String {
        let mut sections = String::new();

        if let Some(exp) = explanation {
            if !exp.primary_explanation.is_empty() {
                let _ = write!(
                    sections,
                    "<div class=\"explanation\"><h3>🤖 {}</h3><p><strong>{}</strong></p></div>",
                    self.loc("email.analysis"),
                    escape_html(&exp.primary_explanation)
                );
            }
            let factors = exp.top_factors(TOP_FACTORS);
            if !factors.is_empty() {
                let _ = write!(
                    sections,
                    "<div class=\"factors\"><h3>🔍 {}</h3><ul>",
                    self.loc("email.factors")
                );
                for f in factors {
                    let _ = write!(
                        sections,
                        "<li><strong>{}:</strong> {} ({} level) - Score: {:.1}</li>",
                        escape_html(&title_case(&f.factor)),
                        f.current_value,
                        escape_html(&f.risk_level),
                        f.contribution_score
                    );
                }
                sections.push_str("</ul></div>");
            }
            if !exp.threshold_violations.is_empty() {
                let _ = write!(
                    sections,
                    "<div class=\"violations\"><h3>⚠️ {}</h3><ul>",
                    self.loc("email.violations")
                );
                for v in exp.threshold_violations.iter().take(MAX_VIOLATIONS) {
                    let _ = write!(
                        sections,
                        "<li><strong>{}:</strong> {:.1} (Threshold: {:.1}) - {:.1}% over limit</li>",
                        escape_html(&title_case(&v.sensor_type)),
                        v.current_value,
                        v.threshold_value,
                        v.percentage_over
                    );
                }
                sections.push_str("</ul></div>");
            }
            if !exp.recommendations.is_empty() {
                let _ = write!(
                    sections,
                    "<div class=\"recommendations\"><h3>📋 {}</h3><ul>",
                    self.loc("email.recommendations")
                );
                for rec in exp.recommendations.iter().take(EMAIL_RECOMMENDATIONS) {
                    let _ = write!(sections, "<li>{}</li>", escape_html(rec));
                }
                sections.push_str("</ul></div>");
            }
        } else if !alert.key_factors.is_empty() {
            let _ = write!(
                sections,
                "<div class=\"factors\"><h3>{}</h3><ul>",
                self.loc("email.key_factors")
            );
            for kf in &alert.key_factors {
                let _ = write!(sections, "<li>{}</li>", escape_html(kf));
            }
            sections.push_str("</ul></div>");
        }

        let mut actions = String::from("<ul>");
        for key in i18n::email_action_keys(alert.severity) {
            let _ = write!(actions, "<li>{}</li>", self.loc(key));
        }
        actions.push_str("</ul>");

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; }}
.header {{ background-color: {color}; color: white; padding: 20px; text-align: center; }}
.content {{ padding: 20px; }}
.mine-info {{ background-color: #f8f9fa; padding: 15px; margin: 10px 0; border-radius: 5px; }}
.explanation {{ background-color: #e7f3ff; padding: 15px; margin: 10px 0; border-left: 4px solid #007bff; }}
.factors {{ background-color: #fff3cd; padding: 15px; margin: 10px 0; }}
.violations {{ background-color: #f8d7da; padding: 15px; margin: 10px 0; }}
.recommendations {{ background-color: #d4edda; padding: 15px; margin: 10px 0; }}
.footer {{ margin-top: 20px; padding-top: 20px; border-top: 1px solid #dee2e6; color: #6c757d; }}
</style>
</head>
<body>
<div class="header">
<h1>🚨 {title}</h1>
<h2>{severity}</h2>
</div>
<div class="content">
<div class="mine-info">
<h3>{info}</h3>
<p><strong>{facility_label}:</strong> {facility}</p>
<p><strong>{location_label}:</strong> {location}</p>
<p><strong>{time_label}:</strong> {time}</p>
<p><strong>{score_label}:</strong> {score:.2}</p>
</div>
{sections}
<div class="actions">
<h3>{actions_label}:</h3>
{actions}
</div>
</div>
<div class="footer">
<p>{footer}</p>
<p>{emergency}</p>
</div>
</body>
</html>
"#,
            color = severity_color(alert.severity),
            title = self.loc("email.title"),
            severity = self.loc(i18n::severity_key(alert.severity)),
            info = self.loc("email.facility_info"),
            facility_label = self.loc("label.facility"),
            facility = escape_html(&alert.facility_name),
            location_label = self.loc("email.location"),
            location = escape_html(&alert.location),
            time_label = self.loc("email.alert_time"),
            time = alert.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            score_label = self.loc("label.score"),
            score = alert.risk_score,
            sections = sections,
            actions_label = self.loc("email.actions"),
            actions = actions,
            footer = self.loc("email.footer"),
            emergency = self.loc("email.emergency"),
        )
    }

    /// Every SMS variant, in the order the channel should try them.
    pub fn sms_variants(&self, alert: &Alert, explanation: Option<&RiskExplanation>) -> Vec<SmsVariant> {
        let ctx = SmsContext {
            alert,
            explanation,
            languages: self.languages,
        };
        SMS_TEMPLATES
            .iter()
            .map(|tpl| SmsVariant {
                name: tpl.name(),
                body: tpl.render(&ctx),
            })
            .collect()
    }

    /// Chat-app body using the app's lightweight `*bold*` markup.
    pub fn messaging_body(&self, alert: &Alert, explanation: Option<&RiskExplanation>) -> String {
        let emoji = severity_emoji(alert.severity);
        let mut msg = format!(
            "{emoji} *MINING SAFETY ALERT* {emoji}\n\n\
             🏔️ *Mine:* {}\n\
             📊 *Risk Level:* {}\n\
             🎯 *Risk Score:* {:.2}\n\
             ⏰ *Time:* {}\n\n\
             *🚨 IMMEDIATE ACTION REQUIRED*\n\n",
            alert.facility_name,
            alert.severity,
            alert.risk_score,
            alert.created_at.format("%H:%M:%S, %d %b %Y"),
        );

        if let Some(exp) = explanation {
            if !exp.primary_explanation.is_empty() {
                let _ = write!(
                    msg,
                    "🤖 *AI Analysis:*\n{}\n\n",
                    truncate_string(&exp.primary_explanation, MESSAGING_ANALYSIS_CHARS, "...")
                );
            }
            let factors = exp.top_factors(TOP_FACTORS);
            if !factors.is_empty() {
                msg.push_str("🔍 *Key Risk Factors:*\n");
                for f in factors {
                    let _ = writeln!(
                        msg,
                        "• {}: {} ({} level)",
                        title_case(&f.factor),
                        f.current_value,
                        f.risk_level
                    );
                }
                msg.push('\n');
            }
            if !exp.recommendations.is_empty() {
                msg.push_str("📋 *Recommended Actions:*\n");
                for (i, rec) in exp
                    .recommendations
                    .iter()
                    .take(MESSAGING_RECOMMENDATIONS)
                    .enumerate()
                {
                    let _ = writeln!(msg, "{}. {}", i + 1, rec);
                }
                msg.push('\n');
            }
        }

        msg.push_str("🆘 *Emergency:* Call 108\n");
        msg.push_str("🏗️ *System:* AI Rockfall Prediction\n");
        msg.push_str("📧 *Email alerts also sent*");
        msg
    }
}
