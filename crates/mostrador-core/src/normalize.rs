//! # Upstream Record Normalization
//!
//! Client and proforma records arrive from the document store as loose JSON
//! whose field names vary between endpoints and versions:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  concept          accepted keys (first match wins)                      │
//! │  ───────          ───────────────────────────────                       │
//! │  client name      nombreCliente, NombreCliente, Cliente.Nombre,         │
//! │                   nombre, name                                          │
//! │  client id        clienteId, idCliente, Cliente.Id                      │
//! │  proforma id      proformaId, facturaId, id                             │
//! │  lines            detalles, lineas, lines, items                        │
//! │  unit price       precioUnitario, precio, unitBasePrice (major units)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bare `id` names the client only inside a nested `Cliente` object. At
//! the top level of a proforma it is the proforma's own number.
//!
//! Everything past this module works with the typed records only.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::cart::LineItem;
use crate::document::DocumentBody;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{PricingCalculator, PricingMode};
use crate::proforma::{valid_until, Proforma, ProformaStatus};
use crate::types::{Client, DocumentNumber, PaymentMethod, ProductId};
use crate::validation::{validate_name, ValidationResult};

const CLIENT_NAME_KEYS: &[&str] = &["nombreCliente", "NombreCliente", "nombre", "Nombre", "name"];
const CLIENT_ID_KEYS: &[&str] = &["clienteId", "ClienteId", "idCliente", "IdCliente"];
const NESTED_CLIENT_ID_KEYS: &[&str] = &["Id", "id", "clienteId", "ClienteId", "idCliente", "IdCliente"];
const PROFORMA_ID_KEYS: &[&str] = &["proformaId", "facturaId", "id"];
const LINE_KEYS: &[&str] = &["detalles", "lineas", "lines", "items"];

// =============================================================================
// Field Lookup
// =============================================================================

fn object<'a>(value: &'a Value, what: &str) -> ValidationResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| ValidationError::InvalidFormat {
        field: what.to_string(),
        reason: "expected a JSON object".to_string(),
    })
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn lookup<'a>(sources: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Value> {
    sources.iter().find_map(|obj| first(obj, keys))
}

/// Nested `Cliente` / `cliente` object, if the record has one.
fn nested_client(obj: &Map<String, Value>) -> Option<&Map<String, Value>> {
    first(obj, &["Cliente", "cliente", "client"]).and_then(Value::as_object)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer(value: &Value, field: &str) -> ValidationResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("expected an integer, got {}", value),
    })
}

/// Major-unit amount (e.g. `2100.5`) to cents, rounded half away from zero.
fn money(value: &Value, field: &str) -> ValidationResult<Money> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(major) if major.is_finite() => Ok(Money::from_cents((major * 100.0).round() as i64)),
        _ => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected an amount, got {}", value),
        }),
    }
}

fn timestamp(value: &Value, field: &str) -> ValidationResult<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected an RFC 3339 timestamp".to_string(),
        })
}

fn required<'a>(obj: &'a Map<String, Value>, keys: &[&str], field: &str) -> ValidationResult<&'a Value> {
    first(obj, keys).ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

// =============================================================================
// Client
// =============================================================================

/// Builds a [`Client`] from any of the upstream spellings.
///
/// Fields inside a nested `Cliente` object win over top-level ones. A
/// top-level `id` is never taken as the client id.
pub fn normalize_client(value: &Value) -> ValidationResult<Client> {
    let outer = object(value, "client")?;
    let nested = nested_client(outer);
    let sources: Vec<&Map<String, Value>> = nested.into_iter().chain([outer]).collect();

    let name = lookup(&sources, CLIENT_NAME_KEYS)
        .and_then(text)
        .ok_or_else(|| ValidationError::Required {
            field: "client name".to_string(),
        })?;
    validate_name("client name", &name)?;

    let id_value = nested
        .and_then(|client| first(client, NESTED_CLIENT_ID_KEYS))
        .or_else(|| first(outer, CLIENT_ID_KEYS));
    let id = match id_value {
        Some(v) => integer(v, "client id")?,
        None => {
            return Err(ValidationError::Required {
                field: "client id".to_string(),
            })
        }
    };

    Ok(Client {
        id,
        name,
        identification: lookup(&sources, &["identificacion", "Identificacion", "cedula", "identification"])
            .and_then(text),
        email: lookup(&sources, &["email", "Email", "correo", "Correo"]).and_then(text),
        phone: lookup(&sources, &["telefono", "Telefono", "phone"]).and_then(text),
    })
}

// =============================================================================
// Proforma
// =============================================================================

fn proforma_status(value: Option<&Value>) -> ValidationResult<ProformaStatus> {
    let Some(raw) = value.and_then(Value::as_str) else {
        return Ok(ProformaStatus::Active);
    };
    match raw.trim().to_lowercase().as_str() {
        "active" | "activa" | "vigente" => Ok(ProformaStatus::Active),
        "expired" | "vencida" | "expirada" => Ok(ProformaStatus::Expired),
        "converted" | "converted_to_invoice" | "facturada" | "convertida" => {
            Ok(ProformaStatus::ConvertedToInvoice)
        }
        "cancelled" | "canceled" | "cancelada" | "anulada" => Ok(ProformaStatus::Cancelled),
        _ => Err(ValidationError::NotAllowed {
            field: "proforma status".to_string(),
            allowed: vec![
                "active".to_string(),
                "expired".to_string(),
                "converted".to_string(),
                "cancelled".to_string(),
            ],
        }),
    }
}

fn proforma_line(value: &Value) -> CoreResult<LineItem> {
    let obj = object(value, "proforma line")?;
    let product_id = integer(
        required(obj, &["productoId", "idProducto", "productId"], "product id")?,
        "product id",
    )?;
    let name = required(obj, &["nombreProducto", "nombre", "name"], "product name")
        .map(|v| text(v).unwrap_or_default())?;
    let quantity = integer(required(obj, &["cantidad", "quantity"], "quantity")?, "quantity")?;
    let price = money(
        required(obj, &["precioUnitario", "precio", "unitBasePrice"], "unit price")?,
        "unit price",
    )?;

    LineItem::new(ProductId(product_id), name, price, quantity, 0)
}

/// Builds a [`Proforma`] from an upstream record.
///
/// The identifier is taken from `proformaId`, then `facturaId`, then `id`.
/// Lines are repriced with `pricing` under the record's payment method
/// (cash when absent). A missing expiry defaults to 30 days after issue.
pub fn normalize_proforma(value: &Value, pricing: &PricingCalculator) -> CoreResult<Proforma> {
    let obj = object(value, "proforma")?;

    let number = required(obj, PROFORMA_ID_KEYS, "proforma id")
        .map(|v| text(v).map(DocumentNumber::new))?
        .ok_or_else(|| ValidationError::Required {
            field: "proforma id".to_string(),
        })?;

    let client = normalize_client(value)?;

    let lines = required(obj, LINE_KEYS, "proforma lines")?
        .as_array()
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "proforma lines".to_string(),
            reason: "expected an array".to_string(),
        })?
        .iter()
        .map(proforma_line)
        .collect::<CoreResult<Vec<_>>>()?;

    let method = match first(obj, &["metodoPago", "paymentMethod"]).and_then(Value::as_str) {
        Some(raw) => raw.parse::<PaymentMethod>()?,
        None => PaymentMethod::Cash,
    };
    let mode = PricingMode::Method(method);

    let issued_at = timestamp(
        required(obj, &["fechaEmision", "fecha", "issuedAt"], "issue date")?,
        "issue date",
    )?;
    let valid_until = match first(obj, &["fechaVencimiento", "validUntil"]) {
        Some(v) => timestamp(v, "expiry date")?,
        None => valid_until(issued_at),
    };

    Ok(Proforma {
        number,
        status: proforma_status(first(obj, &["estado", "status"]))?,
        body: DocumentBody {
            client,
            lines: pricing.price_lines(&lines, mode),
            pricing: mode,
            totals: pricing.totals(&lines, mode),
            issued_at,
        },
        valid_until,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_name_spellings() {
        for record in [
            json!({"clienteId": 7, "nombreCliente": "Ferretería Solís"}),
            json!({"idCliente": 7, "NombreCliente": "Ferretería Solís"}),
            json!({"Cliente": {"Id": 7, "Nombre": "Ferretería Solís"}}),
        ] {
            let client = normalize_client(&record).unwrap();
            assert_eq!(client.id, 7);
            assert_eq!(client.name, "Ferretería Solís");
        }
    }

    #[test]
    fn test_client_optional_fields() {
        let client = normalize_client(&json!({
            "clienteId": "12",
            "nombre": "Ana Vargas",
            "cedula": "1-1234-0567",
            "correo": "ana@example.com",
            "telefono": null
        }))
        .unwrap();

        assert_eq!(client.id, 12);
        assert_eq!(client.identification.as_deref(), Some("1-1234-0567"));
        assert_eq!(client.email.as_deref(), Some("ana@example.com"));
        assert_eq!(client.phone, None);
    }

    #[test]
    fn test_client_without_name_is_rejected() {
        assert!(matches!(
            normalize_client(&json!({"clienteId": 1, "nombreCliente": "  "})),
            Err(ValidationError::Required { .. })
        ));
        assert!(normalize_client(&json!("not an object")).is_err());
    }

    #[test]
    fn test_top_level_id_is_not_the_client_id() {
        assert_eq!(
            normalize_client(&json!({"id": 987, "nombreCliente": "Taller Mora"})),
            Err(ValidationError::Required {
                field: "client id".to_string()
            })
        );

        let client = normalize_client(&json!({
            "id": 987,
            "clienteId": 5,
            "nombreCliente": "Taller Mora"
        }))
        .unwrap();
        assert_eq!(client.id, 5);
    }

    #[test]
    fn test_flat_proforma_keeps_ids_apart() {
        let flat = json!({
            "id": 987,
            "clienteId": 41,
            "nombreCliente": "Taller Mora",
            "fechaEmision": "2026-05-02T15:00:00Z",
            "detalles": [
                {"productoId": 10, "nombreProducto": "Filtro de aceite", "cantidad": 1, "precioUnitario": 1250}
            ]
        });
        let p = normalize_proforma(&flat, &PricingCalculator::default()).unwrap();
        assert_eq!(p.number.as_str(), "987");
        assert_eq!(p.body.client.id, 41);

        let mut without_client_id = flat.clone();
        without_client_id.as_object_mut().unwrap().remove("clienteId");
        assert!(normalize_proforma(&without_client_id, &PricingCalculator::default()).is_err());
    }

    fn record(id_key: &str) -> Value {
        json!({
            id_key: "PF-0042",
            "Cliente": {"Id": 3, "Nombre": "Taller El Roble"},
            "estado": "Vigente",
            "fechaEmision": "2026-05-02T15:00:00Z",
            "detalles": [
                {"productoId": 10, "nombreProducto": "Filtro de aceite", "cantidad": 4, "precioUnitario": 1250.5},
                {"productoId": 11, "nombreProducto": "Bujía", "cantidad": "2", "precioUnitario": "800"}
            ]
        })
    }

    #[test]
    fn test_proforma_id_fallbacks() {
        let pricing = PricingCalculator::default();
        for key in ["proformaId", "facturaId", "id"] {
            let p = normalize_proforma(&record(key), &pricing).unwrap();
            assert_eq!(p.number.as_str(), "PF-0042");
        }
    }

    #[test]
    fn test_proforma_id_prefers_proforma_id() {
        let mut value = record("proformaId");
        value["facturaId"] = json!("F-1");
        value["id"] = json!(99);
        let p = normalize_proforma(&value, &PricingCalculator::default()).unwrap();
        assert_eq!(p.number.as_str(), "PF-0042");
    }

    #[test]
    fn test_proforma_lines_and_defaults() {
        let p = normalize_proforma(&record("proformaId"), &PricingCalculator::default()).unwrap();

        assert_eq!(p.status, ProformaStatus::Active);
        assert_eq!(p.body.client.name, "Taller El Roble");
        assert_eq!(p.body.lines.len(), 2);
        assert_eq!(p.body.lines[0].unit_base_price, Money::from_cents(125_050));
        assert_eq!(p.body.lines[1].quantity, 2);
        assert_eq!(p.body.pricing, PricingMode::Method(PaymentMethod::Cash));
        assert_eq!(p.valid_until, valid_until(p.body.issued_at));
        // 4 × 1250.50 + 2 × 800 = 6602.00
        assert_eq!(p.body.totals.subtotal, Money::from_cents(660_200));
    }

    #[test]
    fn test_proforma_status_spellings() {
        let mut value = record("id");
        value["estado"] = json!("Facturada");
        let p = normalize_proforma(&value, &PricingCalculator::default()).unwrap();
        assert_eq!(p.status, ProformaStatus::ConvertedToInvoice);

        value["estado"] = json!("perdida");
        assert!(normalize_proforma(&value, &PricingCalculator::default()).is_err());
    }

    #[test]
    fn test_proforma_without_lines_is_rejected() {
        let mut value = record("id");
        value.as_object_mut().unwrap().remove("detalles");
        assert!(normalize_proforma(&value, &PricingCalculator::default()).is_err());
    }
}
