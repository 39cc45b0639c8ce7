//! Builds the WhatsApp template message for a shift summary.

use serde::{Deserialize, Serialize};

use crate::record::ProductionRecord;

pub const MACHINE_NAME: &str = "TBM 1";
pub const TEMPLATE_NAME: &str = "shift_end_template";
pub const TEMPLATE_LANGUAGE: &str = "en";

/// Request body expected by the messaging provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub mobile_numbers: String,
    pub sender_id: String,
    pub component: Component,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub messaging_product: String,
    pub recipient_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub template: Template,
    #[serde(rename = "qrImageUrl")]
    pub qr_image_url: bool,
    #[serde(rename = "qrLinkUrl")]
    pub qr_link_url: bool,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub language: Language,
    pub components: Vec<TemplateComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub index: u32,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Parameter {
    fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: value.into(),
        }
    }
}

#[cfg(test)]
impl NotificationPayload {
    /// Texts bound to the template header slot.
    pub fn header_texts(&self) -> Vec<&str> {
        self.slot_texts("header")
    }

    /// Texts bound to the template body slots, in order.
    pub fn body_texts(&self) -> Vec<&str> {
        self.slot_texts("body")
    }

    fn slot_texts(&self, kind: &str) -> Vec<&str> {
        self.component
            .template
            .components
            .iter()
            .filter(|c| c.kind == kind)
            .flat_map(|c| c.parameters.iter().map(|p| p.text.as_str()))
            .collect()
    }
}

pub fn render(
    record: &ProductionRecord,
    total_production: i64,
    recipient: &str,
    sender_id: &str,
) -> NotificationPayload {
    let header = vec![Parameter::text(
        record.p_shift.clone().unwrap_or_default(),
    )];

    let body = vec![
        Parameter::text(MACHINE_NAME),
        Parameter::text(record.operator_id.clone().unwrap_or_default()),
        Parameter::text(total_production.to_string()),
        Parameter::text(round_half_up(record.performance.unwrap_or(0.0))),
        Parameter::text(record.drum_changeover.unwrap_or(0).to_string()),
    ];

    NotificationPayload {
        mobile_numbers: recipient.to_string(),
        sender_id: sender_id.to_string(),
        component: Component {
            messaging_product: "whatsapp".to_string(),
            recipient_type: "individual".to_string(),
            kind: "template".to_string(),
            template: Template {
                name: TEMPLATE_NAME.to_string(),
                language: Language {
                    code: TEMPLATE_LANGUAGE.to_string(),
                },
                components: vec![
                    TemplateComponent {
                        kind: "header".to_string(),
                        index: 0,
                        parameters: header,
                    },
                    TemplateComponent {
                        kind: "body".to_string(),
                        index: 0,
                        parameters: body,
                    },
                ],
            },
            qr_image_url: false,
            qr_link_url: false,
            to: recipient.to_string(),
        },
    }
}

/// Formats `value` rounded to the nearest integer, halves going toward
/// positive infinity. Non-finite input renders as "0".
fn round_half_up(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 {
        // -0.0 would print as "-0"
        return "0".to_string();
    }
    format!("{:.0}", rounded)
}
