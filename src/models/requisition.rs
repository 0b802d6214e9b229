use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Legacy records store the old spreadsheet spellings; the aliases below
/// normalize them to the current values the moment a record is deserialized,
/// so nothing past the store boundary ever sees an old spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionStatus {
    #[serde(alias = "Recebida", alias = "Recebido")]
    Received,
    #[serde(alias = "Em Progresso")]
    InProgress,
    #[serde(alias = "Concluída", alias = "Feito")]
    Done,
    #[serde(alias = "Cancelada")]
    Canceled,
}

impl Default for RequisitionStatus {
    fn default() -> Self {
        RequisitionStatus::Received
    }
}

impl RequisitionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RequisitionStatus::Received => "Received",
            RequisitionStatus::InProgress => "In Progress",
            RequisitionStatus::Done => "Done",
            RequisitionStatus::Canceled => "Canceled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionType {
    #[serde(alias = "Produção")]
    Production,
    #[serde(alias = "Fábrica")]
    Factory,
}

/// Defect reason for Factory line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefectReason {
    #[serde(alias = "Batida")]
    Dented,
    #[serde(alias = "Faltante")]
    Missing,
    #[serde(alias = "Medida Errada")]
    WrongMeasure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DefectReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryItem {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub supplier: String,
    /// "Yes" / "No" as entered on the form; kept as free text like the
    /// original sheet did.
    #[serde(default)]
    pub delivery_ok: String,
}

/// Either an inline payload awaiting upload (`data_url` set) or a resolved
/// external reference (`url` set). After a successful save, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAttachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub data_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub caption: String,
}

impl PhotoAttachment {
    pub fn is_inline(&self) -> bool {
        self.data_url.contains("base64,")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RequisitionType,
    #[serde(default)]
    pub requisition_number: String,
    #[serde(default)]
    pub status: RequisitionStatus,
    /// Manually editable "received" date; also stamped at creation.
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_in_progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_done: Option<String>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub fitter: String,
    #[serde(default)]
    pub purchase_order: String,
    #[serde(default)]
    pub responsible: String,
    #[serde(default)]
    pub services: Vec<ServiceItem>,
    #[serde(default)]
    pub delivery_items: Vec<DeliveryItem>,
    #[serde(default)]
    pub photos: Vec<PhotoAttachment>,
    /// Millisecond timestamp in new records; old imports carried strings, so
    /// this stays a raw JSON value.
    #[serde(default)]
    pub created_at: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_by: Option<String>,
}

fn default_quantity() -> f64 {
    1.0
}

impl Requisition {
    /// Field-level requirements lifted from the entry form: Production
    /// services need a description, Factory services need a measurement and a
    /// defect reason, deliveries need a description and only apply to
    /// Production requisitions.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("requisition id is required".into());
        }
        if self.client_name.trim().is_empty() {
            return Err("client name is required".into());
        }
        for (i, item) in self.services.iter().enumerate() {
            match self.kind {
                RequisitionType::Production => {
                    if item.description.trim().is_empty() {
                        return Err(format!("service item {}: description is required", i + 1));
                    }
                }
                RequisitionType::Factory => {
                    if item.specification.trim().is_empty() {
                        return Err(format!("service item {}: specification is required", i + 1));
                    }
                    if item.reason.is_none() {
                        return Err(format!("service item {}: defect reason is required", i + 1));
                    }
                }
            }
        }
        if self.kind == RequisitionType::Factory && !self.delivery_items.is_empty() {
            return Err("delivery items only apply to Production requisitions".into());
        }
        for (i, item) in self.delivery_items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(format!("delivery item {}: description is required", i + 1));
            }
        }
        Ok(())
    }

    pub fn stamp_created_at(&mut self) {
        if self.created_at.is_null() {
            self.created_at = serde_json::json!(Utc::now().timestamp_millis());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(kind: RequisitionType) -> Requisition {
        Requisition {
            id: "a1".into(),
            kind,
            requisition_number: String::new(),
            status: RequisitionStatus::default(),
            date: "2025-01-10".into(),
            date_in_progress: None,
            date_done: None,
            client_name: "Acme".into(),
            environment: "Kitchen".into(),
            fitter: "Jo".into(),
            purchase_order: String::new(),
            responsible: String::new(),
            services: vec![],
            delivery_items: vec![],
            photos: vec![],
            created_at: serde_json::Value::Null,
            created_by: None,
            canceled_by: None,
        }
    }

    #[test]
    fn legacy_status_spellings_normalize() {
        for (raw, want) in [
            ("\"Recebida\"", RequisitionStatus::Received),
            ("\"Recebido\"", RequisitionStatus::Received),
            ("\"Em Progresso\"", RequisitionStatus::InProgress),
            ("\"Concluída\"", RequisitionStatus::Done),
            ("\"Feito\"", RequisitionStatus::Done),
            ("\"Cancelada\"", RequisitionStatus::Canceled),
        ] {
            let got: RequisitionStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(got, want, "input {}", raw);
        }
    }

    #[test]
    fn legacy_type_spellings_normalize() {
        let t: RequisitionType = serde_json::from_str("\"Produção\"").unwrap();
        assert_eq!(t, RequisitionType::Production);
        let t: RequisitionType = serde_json::from_str("\"Fábrica\"").unwrap();
        assert_eq!(t, RequisitionType::Factory);
    }

    #[test]
    fn status_defaults_to_received_when_absent() {
        let record: Requisition =
            serde_json::from_str(r#"{"id":"a1","type":"Production","clientName":"Acme"}"#).unwrap();
        assert_eq!(record.status, RequisitionStatus::Received);
    }

    #[test]
    fn production_service_requires_description() {
        let mut record = base(RequisitionType::Production);
        record.services.push(ServiceItem {
            id: "s1".into(),
            quantity: 1.0,
            specification: "40x60".into(),
            description: String::new(),
            volume: 0.0,
            color: String::new(),
            reason: None,
        });
        assert!(record.validate().is_err());
        record.services[0].description = "Shelf mount".into();
        assert!(record.validate().is_ok());
    }

    #[test]
    fn factory_service_requires_specification_and_reason() {
        let mut record = base(RequisitionType::Factory);
        record.services.push(ServiceItem {
            id: "s1".into(),
            quantity: 1.0,
            specification: "40x60".into(),
            description: String::new(),
            volume: 0.0,
            color: "White".into(),
            reason: None,
        });
        assert!(record.validate().is_err());
        record.services[0].reason = Some(DefectReason::Dented);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn delivery_items_rejected_for_factory() {
        let mut record = base(RequisitionType::Factory);
        record.delivery_items.push(DeliveryItem {
            id: "d1".into(),
            quantity: 1.0,
            description: "Panel".into(),
            color: String::new(),
            supplier: String::new(),
            delivery_ok: "Yes".into(),
        });
        assert!(record.validate().is_err());
    }

    #[test]
    fn missing_client_name_rejected() {
        let mut record = base(RequisitionType::Production);
        record.client_name = "  ".into();
        assert!(record.validate().is_err());
    }
}
